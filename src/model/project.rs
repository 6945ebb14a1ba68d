use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use utoipa::ToSchema;

use crate::error::{AppError, Result};
use crate::model::sql_text_enum;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, ToSchema,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ProjectStatus {
    Planning,
    Active,
    OnHold,
    Completed,
    Cancelled,
}

sql_text_enum!(ProjectStatus);

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, ToSchema,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Priority {
    Low,
    Medium,
    High,
    Critical,
}

sql_text_enum!(Priority);

impl Priority {
    /// Human-readable label used in calendar event text.
    pub fn label(self) -> &'static str {
        match self {
            Priority::Low => "Low",
            Priority::Medium => "Medium",
            Priority::High => "High",
            Priority::Critical => "Critical",
        }
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, ToSchema,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum CollaboratorRole {
    Lead,
    Member,
    Viewer,
}

sql_text_enum!(CollaboratorRole);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct Project {
    #[schema(example = 1)]
    pub id: u64,
    #[schema(example = "Payroll revamp")]
    pub name: String,
    pub description: String,
    #[schema(example = "2026-02-01", value_type = String, format = "date")]
    pub start_date: NaiveDate,
    #[schema(example = "2026-03-31", value_type = String, format = "date")]
    pub end_date: NaiveDate,
    pub status: ProjectStatus,
    pub priority: Priority,
    pub created_by: u64,
    #[schema(value_type = String, format = "date-time")]
    pub created_at: DateTime<Utc>,
}

impl Project {
    /// Whether a change from `previous` moves the dates mirrored into
    /// calendars (or the name their text is keyed on).
    pub fn calendar_fields_changed(&self, previous: &Project) -> bool {
        self.start_date != previous.start_date
            || self.end_date != previous.end_date
            || self.name != previous.name
    }
}

pub fn validate_project_dates(start_date: NaiveDate, end_date: NaiveDate) -> Result<()> {
    if end_date < start_date {
        return Err(AppError::validation(
            "Project end_date cannot be before start_date",
        ));
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewProject {
    pub name: String,
    pub description: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub status: ProjectStatus,
    pub priority: Priority,
    pub created_by: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct Collaborator {
    pub project_id: u64,
    pub employee_id: u64,
    pub role: CollaboratorRole,
}
