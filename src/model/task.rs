use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use utoipa::ToSchema;

use crate::error::{AppError, Result};
use crate::model::project::Priority;
use crate::model::sql_text_enum;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, ToSchema,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    InProgress,
    Completed,
}

sql_text_enum!(TaskStatus);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct Task {
    #[schema(example = 1)]
    pub id: u64,
    #[schema(example = "Write migration")]
    pub name: String,
    pub description: String,
    pub project_id: Option<u64>,
    pub assigned_to: u64,
    /// user id of the manager who created the task
    pub created_by: u64,
    #[schema(example = "2026-02-14", value_type = String, format = "date")]
    pub due_date: NaiveDate,
    pub status: TaskStatus,
    pub priority: Priority,
    #[schema(value_type = Option<String>, format = "date-time")]
    pub completed_at: Option<DateTime<Utc>>,
    #[schema(value_type = String, format = "date-time")]
    pub created_at: DateTime<Utc>,
}

impl Task {
    pub fn mark_completed(&mut self, actor_employee_id: u64, at: DateTime<Utc>) -> Result<()> {
        if actor_employee_id != self.assigned_to {
            return Err(AppError::Forbidden(
                "Only the assignee can complete this task".into(),
            ));
        }
        if self.status == TaskStatus::Completed {
            return Err(AppError::Conflict("Task is already completed".into()));
        }
        self.status = TaskStatus::Completed;
        self.completed_at = Some(at);
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewTask {
    pub name: String,
    pub description: String,
    pub project_id: Option<u64>,
    pub assigned_to: u64,
    pub created_by: u64,
    pub due_date: NaiveDate,
    pub priority: Priority,
}

#[derive(Debug, Clone, Default)]
pub struct TaskFilter {
    pub assigned_to: Option<u64>,
    pub project_id: Option<u64>,
    pub status: Option<TaskStatus>,
}
