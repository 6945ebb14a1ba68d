use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use uuid::Uuid;

use super::CalendarError;
use super::client::OAuthProvider;
use super::credentials::CredentialStore;
use crate::error::{AppError, Result};

/// Consent redirect and callback handling. Pending `state` values live in a
/// TTL cache and can be redeemed once.
pub struct OAuthFlow {
    provider: Arc<dyn OAuthProvider>,
    credentials: Arc<CredentialStore>,
    pending: Cache<String, u64>,
}

impl OAuthFlow {
    pub fn new(
        provider: Arc<dyn OAuthProvider>,
        credentials: Arc<CredentialStore>,
        state_ttl: Duration,
    ) -> Self {
        let pending = Cache::builder()
            .max_capacity(10_000)
            .time_to_live(state_ttl)
            .build();
        Self {
            provider,
            credentials,
            pending,
        }
    }

    /// Consent URL for `employee_id`.
    pub async fn begin(&self, employee_id: u64) -> Result<String> {
        if !self.provider.is_configured() {
            return Err(CalendarError::NotConfigured.into());
        }
        let state = Uuid::new_v4().to_string();
        let url = self.provider.authorization_url(&state)?;
        self.pending.insert(state, employee_id).await;
        tracing::debug!(employee_id, "Calendar consent started");
        Ok(url)
    }

    /// Redeems `state`, exchanges `code` and stores the grant. Returns the
    /// employee the grant belongs to.
    pub async fn complete(&self, state: &str, code: &str) -> Result<u64> {
        let Some(employee_id) = self.pending.remove(state).await else {
            return Err(AppError::validation("Invalid or expired authorization state"));
        };
        if code.trim().is_empty() {
            return Err(AppError::validation("Missing authorization code"));
        }

        let bundle = self.provider.exchange_code(code).await.map_err(|e| {
            tracing::warn!(employee_id, error = %e, "Authorization code exchange failed");
            e
        })?;
        self.credentials.store(employee_id, bundle).await?;
        tracing::info!(employee_id, "Google Calendar connected");
        Ok(employee_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::client::MockOAuthProvider;
    use crate::model::calendar::TokenBundle;
    use crate::repository::CredentialRepository;
    use crate::repository::memory::MemoryStore;

    fn provider() -> MockOAuthProvider {
        let mut provider = MockOAuthProvider::new();
        provider.expect_is_configured().return_const(true);
        provider
            .expect_authorization_url()
            .returning(|state| Ok(format!("https://accounts.example/auth?state={state}")));
        provider.expect_exchange_code().returning(|_| {
            Ok(TokenBundle {
                access_token: "access".into(),
                refresh_token: Some("refresh".into()),
                token_uri: "https://oauth2.googleapis.com/token".into(),
                client_id: "id".into(),
                client_secret: "secret".into(),
                scopes: vec!["https://www.googleapis.com/auth/calendar".into()],
                expiry: None,
            })
        });
        provider
    }

    fn flow(provider: MockOAuthProvider) -> (Arc<MemoryStore>, OAuthFlow) {
        let repo = Arc::new(MemoryStore::new());
        let provider: Arc<dyn OAuthProvider> = Arc::new(provider);
        let credentials = Arc::new(CredentialStore::new(repo.clone(), provider.clone()));
        (
            repo,
            OAuthFlow::new(provider, credentials, Duration::from_secs(600)),
        )
    }

    fn state_of(url: &str) -> String {
        url.rsplit("state=").next().unwrap().to_string()
    }

    #[actix_web::test]
    async fn callback_stores_credentials_once() {
        let (repo, flow) = flow(provider());
        let url = flow.begin(9).await.unwrap();
        let state = state_of(&url);

        assert_eq!(flow.complete(&state, "code-1").await.unwrap(), 9);
        let stored = CredentialRepository::find(repo.as_ref(), 9).await.unwrap().unwrap();
        assert_eq!(stored.token, "access");

        assert!(matches!(
            flow.complete(&state, "code-1").await,
            Err(AppError::Validation(_))
        ));
    }

    #[actix_web::test]
    async fn unknown_state_is_rejected() {
        let (_repo, flow) = flow(provider());
        assert!(matches!(
            flow.complete("forged", "code").await,
            Err(AppError::Validation(_))
        ));
    }

    #[actix_web::test]
    async fn unconfigured_provider_cannot_begin() {
        let mut provider = MockOAuthProvider::new();
        provider.expect_is_configured().return_const(false);
        let (_repo, flow) = flow(provider);
        assert!(matches!(
            flow.begin(1).await,
            Err(AppError::Calendar(CalendarError::NotConfigured))
        ));
    }
}
