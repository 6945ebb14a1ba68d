//! Google Calendar integration: OAuth2 credentials per employee and the
//! best-effort mirroring of project/task dates into their calendars.

use thiserror::Error;

use crate::repository::RepositoryError;

pub mod client;
pub mod credentials;
pub mod events;
pub mod oauth;
pub mod retry;
pub mod sync;

#[derive(Error, Debug)]
pub enum CalendarError {
    #[error("Google Calendar integration is not configured")]
    NotConfigured,

    #[error("Google Calendar is not connected")]
    NotConnected,

    #[error("token refresh rejected: {0}")]
    TokenRefresh(String),

    #[error("calendar request failed: {0}")]
    Transport(String),

    #[error("calendar API returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error("unexpected calendar response: {0}")]
    Decode(String),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl CalendarError {
    /// Failures worth another attempt: network trouble, throttling, or a
    /// provider-side error.
    pub fn is_transient(&self) -> bool {
        match self {
            CalendarError::Transport(_) => true,
            CalendarError::Api { status, .. } => *status == 429 || (500..=599).contains(status),
            _ => false,
        }
    }

    /// Messages that can be shown to the caller verbatim.
    pub fn is_user_facing(&self) -> bool {
        matches!(
            self,
            CalendarError::NotConfigured
                | CalendarError::NotConnected
                | CalendarError::TokenRefresh(_)
        )
    }
}

impl From<reqwest::Error> for CalendarError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            CalendarError::Decode(err.to_string())
        } else {
            CalendarError::Transport(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(CalendarError::Transport("reset".into()), true)]
    #[case(CalendarError::Api { status: 429, body: String::new() }, true)]
    #[case(CalendarError::Api { status: 503, body: String::new() }, true)]
    #[case(CalendarError::Api { status: 403, body: String::new() }, false)]
    #[case(CalendarError::TokenRefresh("invalid_grant".into()), false)]
    #[case(CalendarError::NotConnected, false)]
    fn classifies_transient_failures(#[case] error: CalendarError, #[case] transient: bool) {
        assert_eq!(error.is_transient(), transient);
    }
}
