use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use utoipa::ToSchema;

use crate::model::sql_text_enum;

/// Stored OAuth2 grant for one employee's Google Calendar.
#[derive(Clone, sqlx::FromRow)]
pub struct CalendarCredentials {
    pub employee_id: u64,
    pub token: String,
    pub refresh_token: Option<String>,
    pub token_uri: String,
    pub client_id: String,
    pub client_secret: String,
    /// JSON array of granted scopes
    pub scopes: String,
    pub expiry: Option<DateTime<Utc>>,
}

impl CalendarCredentials {
    pub fn from_bundle(employee_id: u64, bundle: TokenBundle) -> Self {
        Self {
            employee_id,
            token: bundle.access_token,
            refresh_token: bundle.refresh_token,
            token_uri: bundle.token_uri,
            client_id: bundle.client_id,
            client_secret: bundle.client_secret,
            scopes: serde_json::to_string(&bundle.scopes).unwrap_or_else(|_| "[]".into()),
            expiry: bundle.expiry,
        }
    }

    pub fn scope_list(&self) -> Vec<String> {
        serde_json::from_str(&self.scopes).unwrap_or_default()
    }

    /// Expired, or expiring within `skew_secs`. Unknown expiry counts as valid.
    pub fn is_expired(&self, now: DateTime<Utc>, skew_secs: i64) -> bool {
        self.expiry
            .is_some_and(|expiry| expiry <= now + chrono::Duration::seconds(skew_secs))
    }
}

impl fmt::Debug for CalendarCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CalendarCredentials")
            .field("employee_id", &self.employee_id)
            .field("token_uri", &self.token_uri)
            .field("client_id", &self.client_id)
            .field("scopes", &self.scopes)
            .field("expiry", &self.expiry)
            .field("has_refresh_token", &self.refresh_token.is_some())
            .finish_non_exhaustive()
    }
}

/// Tokens returned by the provider after a code exchange.
#[derive(Debug, Clone)]
pub struct TokenBundle {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub token_uri: String,
    pub client_id: String,
    pub client_secret: String,
    pub scopes: Vec<String>,
    pub expiry: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct RefreshedToken {
    pub access_token: String,
    pub expiry: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum EventSourceKind {
    Project,
    Task,
}

sql_text_enum!(EventSourceKind);

/// The local record a calendar event mirrors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EventSource {
    pub kind: EventSourceKind,
    pub id: u64,
}

impl EventSource {
    pub fn project(id: u64) -> Self {
        Self {
            kind: EventSourceKind::Project,
            id,
        }
    }

    pub fn task(id: u64) -> Self {
        Self {
            kind: EventSourceKind::Task,
            id,
        }
    }
}

/// External event id recorded when an event is created for a local record.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct EventLink {
    pub employee_id: u64,
    pub source_kind: EventSourceKind,
    pub source_id: u64,
    pub event_id: String,
}

impl EventLink {
    pub fn source(&self) -> EventSource {
        EventSource {
            kind: self.source_kind,
            id: self.source_id,
        }
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, ToSchema,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ReminderMethod {
    Email,
    Popup,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ReminderOverride {
    pub method: ReminderMethod,
    #[schema(example = 60)]
    pub minutes: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reminders {
    pub use_default: bool,
    pub overrides: Vec<ReminderOverride>,
}

impl Reminders {
    pub fn overrides(overrides: Vec<ReminderOverride>) -> Self {
        Self {
            use_default: false,
            overrides,
        }
    }

    pub fn email_and_popup(email_minutes: u32, popup_minutes: u32) -> Self {
        Self::overrides(vec![
            ReminderOverride {
                method: ReminderMethod::Email,
                minutes: email_minutes,
            },
            ReminderOverride {
                method: ReminderMethod::Popup,
                minutes: popup_minutes,
            },
        ])
    }
}

/// Start or end of an event: a whole day, or a local wall-clock time in a
/// named zone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EventTime {
    AllDay {
        date: NaiveDate,
        #[serde(rename = "timeZone")]
        time_zone: String,
    },
    Timed {
        #[serde(rename = "dateTime")]
        date_time: NaiveDateTime,
        #[serde(rename = "timeZone")]
        time_zone: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attendee {
    pub email: String,
}

/// Event payload in the Calendar API's wire shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarEvent {
    pub summary: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    pub start: EventTime,
    pub end: EventTime,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub recurrence: Vec<String>,
    pub reminders: Reminders,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attendees: Vec<Attendee>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color_id: Option<String>,
}

/// Event as returned by the provider's list/insert endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RemoteEvent {
    pub id: String,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub html_link: Option<String>,
}
