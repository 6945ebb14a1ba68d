use std::sync::Arc;

use chrono::{Datelike, NaiveDate, Utc};

use super::ledger::LeaveLedger;
use crate::error::{AppError, Result};
use crate::model::leave::{LeaveApplication, LeaveFilter, LeaveStatus, NewLeaveApplication};
use crate::repository::LeaveRepository;

/// PENDING -> APPROVED | REJECTED | CANCELLED. Only approval touches the
/// balance.
pub struct LeaveWorkflow {
    repo: Arc<dyn LeaveRepository>,
    ledger: Arc<LeaveLedger>,
}

impl LeaveWorkflow {
    pub fn new(repo: Arc<dyn LeaveRepository>, ledger: Arc<LeaveLedger>) -> Self {
        Self { repo, ledger }
    }

    pub async fn submit(
        &self,
        employee_id: u64,
        leave_type_id: u64,
        start_date: NaiveDate,
        end_date: NaiveDate,
        reason: &str,
    ) -> Result<LeaveApplication> {
        let request =
            NewLeaveApplication::new(employee_id, leave_type_id, start_date, end_date, reason.trim())?;
        if request.reason.is_empty() {
            return Err(AppError::validation("A reason for the leave is required"));
        }

        self.repo
            .find_leave_type(leave_type_id)
            .await?
            .ok_or_else(|| AppError::not_found("Leave type"))?;

        let year = start_date.year();
        let balance = self
            .ledger
            .find(employee_id, leave_type_id, year)
            .await?
            .ok_or_else(|| {
                AppError::validation(format!(
                    "No leave balance found for this leave type in {year}"
                ))
            })?;

        // Checked here only; a concurrent submission can still pass.
        let remaining = balance.available();
        if request.total_days > remaining {
            return Err(AppError::InsufficientBalance {
                requested: request.total_days,
                remaining,
            });
        }

        let application = self.repo.insert_application(&request).await?;
        tracing::info!(
            application_id = application.id,
            employee_id,
            leave_type_id,
            days = application.total_days,
            "Leave application submitted"
        );
        Ok(application)
    }

    pub async fn get(&self, id: u64) -> Result<LeaveApplication> {
        self.repo
            .find_application(id)
            .await?
            .ok_or_else(|| AppError::not_found("Leave application"))
    }

    pub async fn list(&self, filter: &LeaveFilter) -> Result<(Vec<LeaveApplication>, i64)> {
        Ok(self.repo.list_applications(filter).await?)
    }

    /// Reports the stored status when a guarded write found the row already
    /// moved on.
    async fn lost_race(&self, id: u64, action: &'static str) -> AppError {
        match self.repo.find_application(id).await {
            Ok(Some(current)) => AppError::InvalidTransition {
                status: current.status,
                action,
            },
            Ok(None) => AppError::not_found("Leave application"),
            Err(e) => e.into(),
        }
    }

    pub async fn approve(
        &self,
        id: u64,
        reviewer: u64,
        remarks: Option<String>,
    ) -> Result<LeaveApplication> {
        let mut application = self.get(id).await?;
        application.approve(reviewer, remarks, Utc::now())?;

        if !self.ledger.deduct(&application).await? {
            return Err(self.lost_race(id, "approved").await);
        }

        tracing::info!(
            application_id = id,
            reviewer,
            days = application.total_days,
            "Leave application approved"
        );
        Ok(application)
    }

    pub async fn reject(&self, id: u64, reviewer: u64, remarks: &str) -> Result<LeaveApplication> {
        let mut application = self.get(id).await?;
        application.reject(reviewer, remarks, Utc::now())?;

        if !self
            .repo
            .transition_application(&application, LeaveStatus::Pending)
            .await?
        {
            return Err(self.lost_race(id, "rejected").await);
        }

        tracing::info!(application_id = id, reviewer, "Leave application rejected");
        Ok(application)
    }

    pub async fn cancel(&self, id: u64, actor_employee_id: u64) -> Result<LeaveApplication> {
        let mut application = self.get(id).await?;
        application.cancel(actor_employee_id)?;

        if !self
            .repo
            .transition_application(&application, LeaveStatus::Pending)
            .await?
        {
            return Err(self.lost_race(id, "cancelled").await);
        }

        tracing::info!(application_id = id, "Leave application cancelled");
        Ok(application)
    }
}
