use std::env;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, anyhow};
use dotenvy::dotenv;

/// OAuth2 client registered with Google for the calendar integration.
#[derive(Clone, Debug)]
pub struct GoogleConfig {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
}

#[derive(Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub server_addr: String,
    pub access_token_ttl: usize,
    pub refresh_token_ttl: usize,

    // Rate limiting
    pub rate_login_per_min: u32,
    pub rate_refresh_per_min: u32,
    pub rate_callback_per_min: u32,
    pub rate_protected_per_min: u32,

    pub api_prefix: String,

    // Google Calendar; `None` disables the integration
    pub google: Option<GoogleConfig>,
    pub calendar_time_zone: String,
    pub calendar_http_timeout: Duration,
    pub calendar_retry_attempts: u32,
    pub calendar_retry_base: Duration,
    pub oauth_state_ttl: Duration,

    // Accounts
    pub employee_initial_password: Option<String>,
    pub bootstrap_admin: Option<(String, String)>,
}

fn required(key: &str) -> anyhow::Result<String> {
    env::var(key).with_context(|| format!("{key} must be set"))
}

fn optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parsed<T>(key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match optional(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| anyhow!("{key} has an invalid value {raw:?}: {e}")),
        None => Ok(default),
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenv().ok();

        let google = match (optional("GOOGLE_CLIENT_ID"), optional("GOOGLE_CLIENT_SECRET")) {
            (Some(client_id), Some(client_secret)) => Some(GoogleConfig {
                client_id,
                client_secret,
                redirect_uri: optional("GOOGLE_REDIRECT_URI")
                    .unwrap_or_else(|| "http://localhost:8080/calendar/callback".to_string()),
            }),
            _ => None,
        };

        let bootstrap_admin = match (
            optional("BOOTSTRAP_ADMIN_USERNAME"),
            optional("BOOTSTRAP_ADMIN_PASSWORD"),
        ) {
            (Some(username), Some(password)) => Some((username, password)),
            (None, None) => None,
            _ => {
                return Err(anyhow!(
                    "BOOTSTRAP_ADMIN_USERNAME and BOOTSTRAP_ADMIN_PASSWORD must be set together"
                ));
            }
        };

        Ok(Self {
            server_addr: required("SERVER_ADDR")?,
            database_url: required("DATABASE_URL")?,
            jwt_secret: required("JWT_SECRET")?,
            access_token_ttl: parsed("ACCESS_TOKEN_TTL", 900)?, // 15 min
            refresh_token_ttl: parsed("REFRESH_TOKEN_TTL", 604_800)?, // 7 days

            rate_login_per_min: parsed("RATE_LOGIN_PER_MIN", 60)?,
            rate_refresh_per_min: parsed("RATE_REFRESH_PER_MIN", 30)?,
            rate_callback_per_min: parsed("RATE_CALLBACK_PER_MIN", 30)?,
            rate_protected_per_min: parsed("RATE_PROTECTED_PER_MIN", 1000)?,

            api_prefix: optional("API_PREFIX").unwrap_or_else(|| "/api".to_string()),

            google,
            calendar_time_zone: optional("CALENDAR_TIME_ZONE")
                .unwrap_or_else(|| "Asia/Kolkata".to_string()),
            calendar_http_timeout: Duration::from_secs(parsed("CALENDAR_HTTP_TIMEOUT_SECS", 30)?),
            calendar_retry_attempts: parsed("CALENDAR_RETRY_ATTEMPTS", 3)?,
            calendar_retry_base: Duration::from_millis(parsed("CALENDAR_RETRY_BASE_MS", 200)?),
            oauth_state_ttl: Duration::from_secs(parsed("OAUTH_STATE_TTL_SECS", 600)?),

            employee_initial_password: optional("EMPLOYEE_INITIAL_PASSWORD"),
            bootstrap_admin,
        })
    }
}

#[cfg(test)]
impl Config {
    /// Fixed configuration for handler tests.
    pub fn for_tests() -> Self {
        Self {
            database_url: "mysql://localhost/test".into(),
            jwt_secret: "test-secret".into(),
            server_addr: "127.0.0.1:0".into(),
            access_token_ttl: 900,
            refresh_token_ttl: 3600,
            rate_login_per_min: 60,
            rate_refresh_per_min: 30,
            rate_callback_per_min: 30,
            rate_protected_per_min: 1000,
            api_prefix: "/api".into(),
            google: None,
            calendar_time_zone: "Asia/Kolkata".into(),
            calendar_http_timeout: Duration::from_secs(5),
            calendar_retry_attempts: 1,
            calendar_retry_base: Duration::ZERO,
            oauth_state_ttl: Duration::from_secs(600),
            employee_initial_password: Some("Welcome@123".into()),
            bootstrap_admin: None,
        }
    }
}
