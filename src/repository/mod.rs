//! Persistence ports. Services depend only on these traits; `mysql` holds the
//! sqlx adapters and `memory` the in-process fakes used by tests.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::model::calendar::{CalendarCredentials, EventLink, EventSource};
use crate::model::employee::{Employee, EmployeeFilter, NewEmployee};
use crate::model::leave::{
    LeaveApplication, LeaveBalance, LeaveFilter, LeaveStatus, LeaveType, NewLeaveApplication,
    NewLeaveBalance, NewLeaveType,
};
use crate::model::project::{Collaborator, NewProject, Project};
use crate::model::task::{NewTask, Task, TaskFilter};
use crate::model::user::{NewUser, RefreshTokenRecord, User};

#[cfg(test)]
pub mod memory;
pub mod mysql;

#[derive(Error, Debug)]
pub enum RepositoryError {
    #[error("query failed: {0}")]
    Query(String),

    #[error("duplicate entry: {0}")]
    Duplicate(String),

    #[error("stored value could not be decoded: {0}")]
    Decode(String),
}

impl From<sqlx::Error> for RepositoryError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            // MySQL integrity constraint violation
            if db_err.code().as_deref() == Some("23000") {
                return RepositoryError::Duplicate(db_err.message().to_string());
            }
        }
        match err {
            sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) => {
                RepositoryError::Decode(err.to_string())
            }
            other => RepositoryError::Query(other.to_string()),
        }
    }
}

pub type RepoResult<T> = Result<T, RepositoryError>;

/// What the guarded approve-and-deduct write found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApprovalOutcome {
    Approved,
    /// The application had already left `pending`.
    NotPending,
    /// The stored balance no longer covers the requested days.
    InsufficientBalance,
}

#[async_trait]
pub trait EmployeeRepository: Send + Sync {
    async fn insert(&self, employee: &NewEmployee) -> RepoResult<Employee>;

    /// Highest code carrying `prefix`, by sequence number.
    async fn last_employee_code(&self, prefix: &str) -> RepoResult<Option<String>>;

    async fn find(&self, id: u64) -> RepoResult<Option<Employee>>;

    async fn find_many(&self, ids: &[u64]) -> RepoResult<Vec<Employee>>;

    /// Page of employees plus the unpaged total.
    async fn list(&self, filter: &EmployeeFilter) -> RepoResult<(Vec<Employee>, i64)>;

    async fn delete(&self, id: u64) -> RepoResult<bool>;
}

#[async_trait]
pub trait LeaveRepository: Send + Sync {
    async fn insert_leave_type(&self, leave_type: &NewLeaveType) -> RepoResult<LeaveType>;

    async fn list_leave_types(&self) -> RepoResult<Vec<LeaveType>>;

    async fn find_leave_type(&self, id: u64) -> RepoResult<Option<LeaveType>>;

    async fn find_balance(
        &self,
        employee_id: u64,
        leave_type_id: u64,
        year: i32,
    ) -> RepoResult<Option<LeaveBalance>>;

    async fn insert_balance(&self, balance: &NewLeaveBalance) -> RepoResult<LeaveBalance>;

    /// Writes `used_days`; `remaining_days` is derived from total and used.
    async fn list_balances(&self, employee_id: u64, year: i32) -> RepoResult<Vec<LeaveBalance>>;

    async fn insert_application(
        &self,
        application: &NewLeaveApplication,
    ) -> RepoResult<LeaveApplication>;

    async fn find_application(&self, id: u64) -> RepoResult<Option<LeaveApplication>>;

    async fn list_applications(
        &self,
        filter: &LeaveFilter,
    ) -> RepoResult<(Vec<LeaveApplication>, i64)>;

    /// Persists review fields of `application` only if the stored row is
    /// still in `expected`. Returns whether a row changed.
    async fn transition_application(
        &self,
        application: &LeaveApplication,
        expected: LeaveStatus,
    ) -> RepoResult<bool>;

    /// Approval plus balance deduction in one unit of work.
    /// Moves a pending application to approved and books `days` against the
    /// balance in one unit. Nothing is written unless both guards hold.
    async fn approve_application(
        &self,
        application: &LeaveApplication,
        balance_id: u64,
        days: u32,
    ) -> RepoResult<ApprovalOutcome>;
}

#[async_trait]
pub trait ProjectRepository: Send + Sync {
    async fn insert(&self, project: &NewProject) -> RepoResult<Project>;

    async fn find(&self, id: u64) -> RepoResult<Option<Project>>;

    /// All projects, or those `employee_id` collaborates on.
    async fn list(&self, employee_id: Option<u64>) -> RepoResult<Vec<Project>>;

    async fn update(&self, project: &Project) -> RepoResult<()>;

    async fn delete(&self, id: u64) -> RepoResult<bool>;

    async fn collaborators(&self, project_id: u64) -> RepoResult<Vec<Collaborator>>;

    async fn add_collaborator(&self, collaborator: &Collaborator) -> RepoResult<()>;

    async fn remove_collaborator(&self, project_id: u64, employee_id: u64) -> RepoResult<bool>;
}

#[async_trait]
pub trait TaskRepository: Send + Sync {
    async fn insert(&self, task: &NewTask) -> RepoResult<Task>;

    async fn find(&self, id: u64) -> RepoResult<Option<Task>>;

    async fn list(&self, filter: &TaskFilter) -> RepoResult<Vec<Task>>;

    async fn update(&self, task: &Task) -> RepoResult<()>;

    async fn delete(&self, id: u64) -> RepoResult<bool>;
}

#[async_trait]
pub trait CredentialRepository: Send + Sync {
    async fn upsert(&self, credentials: &CalendarCredentials) -> RepoResult<()>;

    async fn find(&self, employee_id: u64) -> RepoResult<Option<CalendarCredentials>>;

    async fn update_token(
        &self,
        employee_id: u64,
        token: &str,
        expiry: Option<DateTime<Utc>>,
    ) -> RepoResult<()>;

    async fn delete(&self, employee_id: u64) -> RepoResult<bool>;
}

#[async_trait]
pub trait EventLinkRepository: Send + Sync {
    async fn record(&self, link: &EventLink) -> RepoResult<()>;

    async fn find(&self, employee_id: u64, source: EventSource) -> RepoResult<Vec<EventLink>>;

    async fn remove(&self, employee_id: u64, event_id: &str) -> RepoResult<()>;
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn insert(&self, user: &NewUser) -> RepoResult<u64>;

    async fn find_by_username(&self, username: &str) -> RepoResult<Option<User>>;

    async fn exists(&self, username: &str) -> RepoResult<bool>;

    async fn touch_last_login(&self, user_id: u64) -> RepoResult<()>;

    async fn store_refresh_token(
        &self,
        user_id: u64,
        jti: &str,
        expires_at: DateTime<Utc>,
    ) -> RepoResult<()>;

    async fn find_refresh_token(&self, jti: &str) -> RepoResult<Option<RefreshTokenRecord>>;

    /// Idempotent.
    async fn revoke_refresh_token(&self, jti: &str) -> RepoResult<()>;
}
