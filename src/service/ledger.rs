use std::sync::Arc;

use chrono::Datelike;

use crate::error::{AppError, Result};
use crate::model::leave::{LeaveApplication, LeaveBalance, NewLeaveBalance};
use crate::repository::{ApprovalOutcome, LeaveRepository, RepositoryError};

/// Per employee, leave type and year allocation bookkeeping.
pub struct LeaveLedger {
    repo: Arc<dyn LeaveRepository>,
}

impl LeaveLedger {
    pub fn new(repo: Arc<dyn LeaveRepository>) -> Self {
        Self { repo }
    }

    pub async fn find(
        &self,
        employee_id: u64,
        leave_type_id: u64,
        year: i32,
    ) -> Result<Option<LeaveBalance>> {
        Ok(self
            .repo
            .find_balance(employee_id, leave_type_id, year)
            .await?)
    }

    /// Existing balance, or a fresh one holding the leave type's default
    /// allocation.
    pub async fn get_or_create(
        &self,
        employee_id: u64,
        leave_type_id: u64,
        year: i32,
    ) -> Result<LeaveBalance> {
        if let Some(balance) = self.find(employee_id, leave_type_id, year).await? {
            return Ok(balance);
        }

        let leave_type = self
            .repo
            .find_leave_type(leave_type_id)
            .await?
            .ok_or_else(|| AppError::not_found("Leave type"))?;

        let created = self
            .repo
            .insert_balance(&NewLeaveBalance {
                employee_id,
                leave_type_id,
                year,
                total_days: leave_type.default_days,
            })
            .await;

        match created {
            Ok(balance) => Ok(balance),
            // lost a race with a concurrent creator
            Err(RepositoryError::Duplicate(_)) => self
                .find(employee_id, leave_type_id, year)
                .await?
                .ok_or_else(|| AppError::Internal("Leave balance vanished after insert".into())),
            Err(e) => Err(e.into()),
        }
    }

    /// Books an approved application's days against the balance for its start
    /// year, written together with the status change. The deduction is relative
    /// to the stored row and guarded on its remaining days. `Ok(false)` means
    /// the application was no longer pending and nothing was written.
    pub async fn deduct(&self, application: &LeaveApplication) -> Result<bool> {
        let days = application.total_days;
        let year = application.start_date.year();
        let mut balance = self
            .find(application.employee_id, application.leave_type_id, year)
            .await?
            .ok_or_else(|| AppError::validation("No matching leave balance to deduct from"))?;
        balance.deduct(days)?;

        match self
            .repo
            .approve_application(application, balance.id, days)
            .await?
        {
            ApprovalOutcome::Approved => {
                tracing::info!(balance_id = balance.id, days, "Leave balance deducted");
                Ok(true)
            }
            ApprovalOutcome::NotPending => Ok(false),
            ApprovalOutcome::InsufficientBalance => {
                let remaining = self
                    .find(application.employee_id, application.leave_type_id, year)
                    .await?
                    .map_or(0, |b| b.remaining_days);
                Err(AppError::InsufficientBalance {
                    requested: days,
                    remaining,
                })
            }
        }
    }

    /// Opens a balance for every leave type. Failures are logged and skipped so
    /// employee creation is never blocked.
    pub async fn seed_for_employee(&self, employee_id: u64, year: i32) -> Vec<LeaveBalance> {
        let leave_types = match self.repo.list_leave_types().await {
            Ok(types) => types,
            Err(e) => {
                tracing::error!(employee_id, error = %e, "Could not load leave types for seeding");
                return Vec::new();
            }
        };

        let mut created = Vec::with_capacity(leave_types.len());
        for leave_type in leave_types {
            match self.get_or_create(employee_id, leave_type.id, year).await {
                Ok(balance) => {
                    tracing::info!(
                        employee_id,
                        leave_type = %leave_type.name,
                        days = balance.total_days,
                        "Leave balance opened"
                    );
                    created.push(balance);
                }
                Err(e) => tracing::error!(
                    employee_id,
                    leave_type = %leave_type.name,
                    error = %e,
                    "Failed to open leave balance"
                ),
            }
        }
        created
    }

    pub async fn balances_for(&self, employee_id: u64, year: i32) -> Result<Vec<LeaveBalance>> {
        Ok(self.repo.list_balances(employee_id, year).await?)
    }
}
