//! Outbound ports to Google and their reqwest implementation.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use reqwest::{Client, Response, StatusCode, Url};
use serde::Deserialize;

use super::CalendarError;
use crate::config::GoogleConfig;
use crate::model::calendar::{
    CalendarCredentials, CalendarEvent, RefreshedToken, RemoteEvent, TokenBundle,
};

pub const AUTH_URI: &str = "https://accounts.google.com/o/oauth2/auth";
pub const TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
pub const REVOKE_URI: &str = "https://oauth2.googleapis.com/revoke";
pub const CALENDAR_API_BASE: &str = "https://www.googleapis.com/calendar/v3";
pub const CALENDAR_SCOPE: &str = "https://www.googleapis.com/auth/calendar";
const CALENDAR_ID: &str = "primary";

/// Events endpoints of the Calendar API, always against the user's primary
/// calendar.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CalendarApi: Send + Sync {
    async fn insert_event(
        &self,
        access_token: &str,
        event: &CalendarEvent,
    ) -> Result<RemoteEvent, CalendarError>;

    /// Free-text search over summary/description.
    async fn search_events(
        &self,
        access_token: &str,
        query: &str,
        max_results: u32,
    ) -> Result<Vec<RemoteEvent>, CalendarError>;

    /// Deleting an event that is already gone succeeds.
    async fn delete_event(&self, access_token: &str, event_id: &str) -> Result<(), CalendarError>;
}

/// OAuth2 authorization-code grant against the token endpoint.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait OAuthProvider: Send + Sync {
    fn is_configured(&self) -> bool;

    fn authorization_url(&self, state: &str) -> Result<String, CalendarError>;

    async fn exchange_code(&self, code: &str) -> Result<TokenBundle, CalendarError>;

    async fn refresh(
        &self,
        credentials: &CalendarCredentials,
    ) -> Result<RefreshedToken, CalendarError>;

    async fn revoke(&self, token: &str) -> Result<(), CalendarError>;
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: Option<i64>,
    refresh_token: Option<String>,
    scope: Option<String>,
}

#[derive(Deserialize)]
struct EventList {
    #[serde(default)]
    items: Vec<RemoteEvent>,
}

#[derive(Clone)]
pub struct GoogleClient {
    http: Client,
    oauth: Option<GoogleConfig>,
    api_base: String,
}

impl GoogleClient {
    pub fn new(oauth: Option<GoogleConfig>, timeout: Duration) -> Result<Self, CalendarError> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            oauth,
            api_base: CALENDAR_API_BASE.to_string(),
        })
    }

    fn oauth(&self) -> Result<&GoogleConfig, CalendarError> {
        self.oauth.as_ref().ok_or(CalendarError::NotConfigured)
    }

    fn events_url(&self) -> String {
        format!("{}/calendars/{CALENDAR_ID}/events", self.api_base)
    }
}

async fn ensure_success(response: Response) -> Result<Response, CalendarError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(CalendarError::Api {
        status: status.as_u16(),
        body,
    })
}

fn expiry_from(expires_in: Option<i64>) -> Option<chrono::DateTime<Utc>> {
    expires_in.map(|secs| Utc::now() + ChronoDuration::seconds(secs))
}

#[async_trait]
impl CalendarApi for GoogleClient {
    async fn insert_event(
        &self,
        access_token: &str,
        event: &CalendarEvent,
    ) -> Result<RemoteEvent, CalendarError> {
        let response = self
            .http
            .post(self.events_url())
            .bearer_auth(access_token)
            .json(event)
            .send()
            .await?;
        let created: RemoteEvent = ensure_success(response).await?.json().await?;
        tracing::debug!(event_id = %created.id, summary = %event.summary, "Calendar event created");
        Ok(created)
    }

    async fn search_events(
        &self,
        access_token: &str,
        query: &str,
        max_results: u32,
    ) -> Result<Vec<RemoteEvent>, CalendarError> {
        let max_results = max_results.to_string();
        let response = self
            .http
            .get(self.events_url())
            .bearer_auth(access_token)
            .query(&[("q", query), ("maxResults", max_results.as_str())])
            .send()
            .await?;
        let list: EventList = ensure_success(response).await?.json().await?;
        Ok(list.items)
    }

    async fn delete_event(&self, access_token: &str, event_id: &str) -> Result<(), CalendarError> {
        let response = self
            .http
            .delete(format!("{}/{event_id}", self.events_url()))
            .bearer_auth(access_token)
            .send()
            .await?;
        if matches!(response.status(), StatusCode::NOT_FOUND | StatusCode::GONE) {
            tracing::debug!(event_id, "Calendar event already removed");
            return Ok(());
        }
        ensure_success(response).await?;
        Ok(())
    }
}

#[async_trait]
impl OAuthProvider for GoogleClient {
    fn is_configured(&self) -> bool {
        self.oauth.is_some()
    }

    fn authorization_url(&self, state: &str) -> Result<String, CalendarError> {
        let oauth = self.oauth()?;
        let url = Url::parse_with_params(
            AUTH_URI,
            &[
                ("response_type", "code"),
                ("client_id", oauth.client_id.as_str()),
                ("redirect_uri", oauth.redirect_uri.as_str()),
                ("scope", CALENDAR_SCOPE),
                ("access_type", "offline"),
                ("include_granted_scopes", "true"),
                ("prompt", "consent"),
                ("state", state),
            ],
        )
        .map_err(|e| CalendarError::Decode(e.to_string()))?;
        Ok(url.into())
    }

    async fn exchange_code(&self, code: &str) -> Result<TokenBundle, CalendarError> {
        let oauth = self.oauth()?;
        let response = self
            .http
            .post(TOKEN_URI)
            .form(&[
                ("grant_type", "authorization_code"),
                ("code", code),
                ("redirect_uri", oauth.redirect_uri.as_str()),
                ("client_id", oauth.client_id.as_str()),
                ("client_secret", oauth.client_secret.as_str()),
            ])
            .send()
            .await?;
        let token: TokenResponse = ensure_success(response).await?.json().await?;

        let scopes = token
            .scope
            .map(|s| s.split_whitespace().map(str::to_string).collect())
            .unwrap_or_else(|| vec![CALENDAR_SCOPE.to_string()]);

        Ok(TokenBundle {
            access_token: token.access_token,
            refresh_token: token.refresh_token,
            token_uri: TOKEN_URI.to_string(),
            client_id: oauth.client_id.clone(),
            client_secret: oauth.client_secret.clone(),
            scopes,
            expiry: expiry_from(token.expires_in),
        })
    }

    async fn refresh(
        &self,
        credentials: &CalendarCredentials,
    ) -> Result<RefreshedToken, CalendarError> {
        let refresh_token = credentials
            .refresh_token
            .as_deref()
            .ok_or_else(|| CalendarError::TokenRefresh("no refresh token stored".into()))?;

        let response = self
            .http
            .post(&credentials.token_uri)
            .form(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token),
                ("client_id", credentials.client_id.as_str()),
                ("client_secret", credentials.client_secret.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        if status.is_client_error() {
            let body = response.text().await.unwrap_or_default();
            return Err(CalendarError::TokenRefresh(body));
        }
        let token: TokenResponse = ensure_success(response).await?.json().await?;

        Ok(RefreshedToken {
            access_token: token.access_token,
            expiry: expiry_from(token.expires_in),
        })
    }

    async fn revoke(&self, token: &str) -> Result<(), CalendarError> {
        let response = self
            .http
            .post(REVOKE_URI)
            .form(&[("token", token)])
            .send()
            .await?;
        ensure_success(response).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn configured() -> GoogleClient {
        GoogleClient::new(
            Some(GoogleConfig {
                client_id: "client-123.apps.googleusercontent.com".into(),
                client_secret: "secret".into(),
                redirect_uri: "http://localhost:8080/calendar/callback".into(),
            }),
            Duration::from_secs(5),
        )
        .unwrap()
    }

    #[test]
    fn consent_url_requests_offline_calendar_access() {
        let url = configured().authorization_url("state-abc").unwrap();
        let parsed = Url::parse(&url).unwrap();
        let params: std::collections::HashMap<_, _> = parsed.query_pairs().into_owned().collect();

        assert!(url.starts_with(AUTH_URI));
        assert_eq!(params["access_type"], "offline");
        assert_eq!(params["prompt"], "consent");
        assert_eq!(params["include_granted_scopes"], "true");
        assert_eq!(params["scope"], CALENDAR_SCOPE);
        assert_eq!(params["state"], "state-abc");
        assert_eq!(
            params["redirect_uri"],
            "http://localhost:8080/calendar/callback"
        );
    }

    #[test]
    fn unconfigured_client_refuses_consent() {
        let client = GoogleClient::new(None, Duration::from_secs(5)).unwrap();
        assert!(!client.is_configured());
        assert!(matches!(
            client.authorization_url("s"),
            Err(CalendarError::NotConfigured)
        ));
    }
}
