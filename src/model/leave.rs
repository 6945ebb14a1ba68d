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
pub enum LeaveStatus {
    Pending,
    Approved,
    Rejected,
    Cancelled,
}

sql_text_enum!(LeaveStatus);

impl LeaveStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, LeaveStatus::Pending)
    }
}

/// Reference data: a named leave category with its yearly allocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct LeaveType {
    #[schema(example = 1)]
    pub id: u64,
    #[schema(example = "Sick")]
    pub name: String,
    #[schema(example = 10)]
    pub default_days: u32,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct NewLeaveType {
    #[schema(example = "Sick")]
    pub name: String,
    #[schema(example = 10)]
    pub default_days: u32,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct LeaveBalance {
    pub id: u64,
    pub employee_id: u64,
    pub leave_type_id: u64,
    #[schema(example = 2026)]
    pub year: i32,
    pub total_days: u32,
    pub used_days: u32,
    pub remaining_days: u32,
}

impl LeaveBalance {
    /// Days still available, derived from the allocation and usage.
    pub fn available(&self) -> u32 {
        self.total_days.saturating_sub(self.used_days)
    }

    pub fn recompute(&mut self) {
        self.remaining_days = self.available();
    }

    /// Books `days` against this balance. Refuses to go below zero but does not
    /// lock the row; callers validate sufficiency beforehand.
    pub fn deduct(&mut self, days: u32) -> Result<()> {
        let remaining = self.available();
        if days > remaining {
            return Err(AppError::InsufficientBalance {
                requested: days,
                remaining,
            });
        }
        self.used_days += days;
        self.recompute();
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewLeaveBalance {
    pub employee_id: u64,
    pub leave_type_id: u64,
    pub year: i32,
    pub total_days: u32,
}

/// Inclusive number of calendar days between two dates.
pub fn leave_day_span(start_date: NaiveDate, end_date: NaiveDate) -> Result<u32> {
    if end_date < start_date {
        return Err(AppError::validation(
            "end_date cannot be before start_date",
        ));
    }
    let days = (end_date - start_date).num_days() + 1;
    u32::try_from(days).map_err(|_| AppError::validation("Leave period is too long"))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct LeaveApplication {
    #[schema(example = 1)]
    pub id: u64,
    #[schema(example = 1000)]
    pub employee_id: u64,
    pub leave_type_id: u64,
    #[schema(example = "2026-01-10", format = "date", value_type = String)]
    pub start_date: NaiveDate,
    #[schema(example = "2026-01-12", format = "date", value_type = String)]
    pub end_date: NaiveDate,
    #[schema(example = 3)]
    pub total_days: u32,
    pub reason: String,
    pub status: LeaveStatus,
    pub reviewed_by: Option<u64>,
    #[schema(format = "date-time", value_type = Option<String>)]
    pub reviewed_at: Option<DateTime<Utc>>,
    pub admin_remarks: Option<String>,
    #[schema(format = "date-time", value_type = String)]
    pub created_at: DateTime<Utc>,
}

impl LeaveApplication {
    pub fn recompute_total_days(&mut self) -> Result<()> {
        self.total_days = leave_day_span(self.start_date, self.end_date)?;
        Ok(())
    }

    fn ensure_pending(&self, action: &'static str) -> Result<()> {
        if self.status.is_terminal() {
            return Err(AppError::InvalidTransition {
                status: self.status,
                action,
            });
        }
        Ok(())
    }

    pub fn approve(
        &mut self,
        reviewer: u64,
        remarks: Option<String>,
        at: DateTime<Utc>,
    ) -> Result<()> {
        self.ensure_pending("approved")?;
        self.status = LeaveStatus::Approved;
        self.reviewed_by = Some(reviewer);
        self.reviewed_at = Some(at);
        self.admin_remarks = remarks.filter(|r| !r.trim().is_empty());
        Ok(())
    }

    pub fn reject(&mut self, reviewer: u64, remarks: &str, at: DateTime<Utc>) -> Result<()> {
        self.ensure_pending("rejected")?;
        let remarks = remarks.trim();
        if remarks.is_empty() {
            return Err(AppError::validation(
                "Remarks are required when rejecting a leave application",
            ));
        }
        self.status = LeaveStatus::Rejected;
        self.reviewed_by = Some(reviewer);
        self.reviewed_at = Some(at);
        self.admin_remarks = Some(remarks.to_string());
        Ok(())
    }

    pub fn cancel(&mut self, actor_employee_id: u64) -> Result<()> {
        if actor_employee_id != self.employee_id {
            return Err(AppError::Forbidden(
                "Only the applicant can cancel a leave application".into(),
            ));
        }
        self.ensure_pending("cancelled")?;
        self.status = LeaveStatus::Cancelled;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewLeaveApplication {
    pub employee_id: u64,
    pub leave_type_id: u64,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub total_days: u32,
    pub reason: String,
}

impl NewLeaveApplication {
    pub fn new(
        employee_id: u64,
        leave_type_id: u64,
        start_date: NaiveDate,
        end_date: NaiveDate,
        reason: impl Into<String>,
    ) -> Result<Self> {
        Ok(Self {
            employee_id,
            leave_type_id,
            start_date,
            end_date,
            total_days: leave_day_span(start_date, end_date)?,
            reason: reason.into(),
        })
    }
}

/// Listing filter; pages are 1-based.
#[derive(Debug, Clone, Default)]
pub struct LeaveFilter {
    pub employee_id: Option<u64>,
    pub status: Option<LeaveStatus>,
    pub page: u32,
    pub per_page: u32,
}
