use std::sync::Arc;

use chrono::Utc;

use super::CalendarError;
use super::client::OAuthProvider;
use crate::model::calendar::{CalendarCredentials, TokenBundle};
use crate::repository::CredentialRepository;

/// Tokens expiring within this window are refreshed before use.
pub const REFRESH_SKEW_SECS: i64 = 60;

/// Per-employee OAuth2 grants, refreshed on demand.
pub struct CredentialStore {
    repo: Arc<dyn CredentialRepository>,
    provider: Arc<dyn OAuthProvider>,
}

impl CredentialStore {
    pub fn new(repo: Arc<dyn CredentialRepository>, provider: Arc<dyn OAuthProvider>) -> Self {
        Self { repo, provider }
    }

    pub fn is_configured(&self) -> bool {
        self.provider.is_configured()
    }

    pub async fn store(
        &self,
        employee_id: u64,
        bundle: TokenBundle,
    ) -> Result<CalendarCredentials, CalendarError> {
        let credentials = CalendarCredentials::from_bundle(employee_id, bundle);
        self.repo.upsert(&credentials).await?;
        tracing::info!(employee_id, "Calendar credentials stored");
        Ok(credentials)
    }

    pub async fn get(&self, employee_id: u64) -> Result<Option<CalendarCredentials>, CalendarError> {
        Ok(self.repo.find(employee_id).await?)
    }

    /// Returns usable credentials, exchanging the refresh token first when the
    /// access token is (nearly) expired. `None` means the calendar is not
    /// available for this employee right now.
    pub async fn refresh_if_expired(
        &self,
        credentials: CalendarCredentials,
    ) -> Option<CalendarCredentials> {
        if !credentials.is_expired(Utc::now(), REFRESH_SKEW_SECS) {
            return Some(credentials);
        }

        let employee_id = credentials.employee_id;
        if credentials.refresh_token.is_none() {
            tracing::warn!(employee_id, "Calendar token expired and no refresh token is stored");
            return None;
        }

        match self.provider.refresh(&credentials).await {
            Ok(refreshed) => {
                if let Err(e) = self
                    .repo
                    .update_token(employee_id, &refreshed.access_token, refreshed.expiry)
                    .await
                {
                    tracing::error!(employee_id, error = %e, "Failed to persist refreshed calendar token");
                }
                tracing::debug!(employee_id, "Calendar token refreshed");
                Some(CalendarCredentials {
                    token: refreshed.access_token,
                    expiry: refreshed.expiry,
                    ..credentials
                })
            }
            Err(e) => {
                tracing::warn!(employee_id, error = %e, "Calendar token refresh failed");
                None
            }
        }
    }

    /// A usable access token for `employee_id`, if connected.
    pub async fn access_token(&self, employee_id: u64) -> Option<String> {
        let credentials = match self.repo.find(employee_id).await {
            Ok(Some(credentials)) => credentials,
            Ok(None) => return None,
            Err(e) => {
                tracing::error!(employee_id, error = %e, "Failed to load calendar credentials");
                return None;
            }
        };
        self.refresh_if_expired(credentials)
            .await
            .map(|credentials| credentials.token)
    }

    /// Revokes the grant with the provider (best effort) and always removes the
    /// local row.
    pub async fn revoke(&self, employee_id: u64) -> Result<(), CalendarError> {
        let Some(credentials) = self.repo.find(employee_id).await? else {
            return Err(CalendarError::NotConnected);
        };

        let token = credentials
            .refresh_token
            .as_deref()
            .unwrap_or(&credentials.token);
        if let Err(e) = self.provider.revoke(token).await {
            tracing::warn!(employee_id, error = %e, "Provider-side token revocation failed");
        }

        self.repo.delete(employee_id).await?;
        tracing::info!(employee_id, "Calendar credentials removed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::client::MockOAuthProvider;
    use crate::model::calendar::RefreshedToken;
    use crate::repository::memory::MemoryStore;
    use chrono::Duration;

    fn bundle(expiry_in_secs: Option<i64>, refresh: Option<&str>) -> TokenBundle {
        TokenBundle {
            access_token: "old-token".into(),
            refresh_token: refresh.map(str::to_string),
            token_uri: "https://oauth2.googleapis.com/token".into(),
            client_id: "id".into(),
            client_secret: "secret".into(),
            scopes: vec!["https://www.googleapis.com/auth/calendar".into()],
            expiry: expiry_in_secs.map(|s| Utc::now() + Duration::seconds(s)),
        }
    }

    fn store_with(provider: MockOAuthProvider) -> (Arc<MemoryStore>, CredentialStore) {
        let repo = Arc::new(MemoryStore::new());
        let store = CredentialStore::new(repo.clone(), Arc::new(provider));
        (repo, store)
    }

    #[actix_web::test]
    async fn refreshes_and_persists_expired_token() {
        let mut provider = MockOAuthProvider::new();
        provider.expect_refresh().times(1).returning(|_| {
            Ok(RefreshedToken {
                access_token: "new-token".into(),
                expiry: Some(Utc::now() + Duration::hours(1)),
            })
        });
        let (repo, store) = store_with(provider);
        store.store(5, bundle(Some(-10), Some("refresh"))).await.unwrap();

        assert_eq!(store.access_token(5).await.as_deref(), Some("new-token"));
        let saved = CredentialRepository::find(repo.as_ref(), 5).await.unwrap().unwrap();
        assert_eq!(saved.token, "new-token");
        assert!(!saved.is_expired(Utc::now(), REFRESH_SKEW_SECS));
    }

    #[actix_web::test]
    async fn rejected_refresh_means_not_available() {
        let mut provider = MockOAuthProvider::new();
        provider
            .expect_refresh()
            .returning(|_| Err(CalendarError::TokenRefresh("invalid_grant".into())));
        let (_repo, store) = store_with(provider);
        store.store(5, bundle(Some(-10), Some("refresh"))).await.unwrap();

        assert_eq!(store.access_token(5).await, None);
    }

    #[actix_web::test]
    async fn expired_without_refresh_token_is_unavailable() {
        let mut provider = MockOAuthProvider::new();
        provider.expect_refresh().never();
        let (_repo, store) = store_with(provider);
        store.store(5, bundle(Some(-10), None)).await.unwrap();

        assert_eq!(store.access_token(5).await, None);
    }

    #[actix_web::test]
    async fn valid_token_is_used_as_is() {
        let mut provider = MockOAuthProvider::new();
        provider.expect_refresh().never();
        let (_repo, store) = store_with(provider);
        store.store(5, bundle(Some(3600), Some("refresh"))).await.unwrap();

        assert_eq!(store.access_token(5).await.as_deref(), Some("old-token"));
        assert_eq!(store.access_token(6).await, None);
    }

    #[actix_web::test]
    async fn revoke_deletes_even_when_provider_fails() {
        let mut provider = MockOAuthProvider::new();
        provider.expect_revoke().times(1).returning(|_| {
            Err(CalendarError::Transport("connection refused".into()))
        });
        let (repo, store) = store_with(provider);
        store.store(5, bundle(None, Some("refresh"))).await.unwrap();

        store.revoke(5).await.unwrap();
        assert!(CredentialRepository::find(repo.as_ref(), 5).await.unwrap().is_none());
        assert!(matches!(store.revoke(5).await, Err(CalendarError::NotConnected)));
    }
}
