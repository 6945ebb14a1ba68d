use std::sync::Arc;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::current_year;
use super::ledger::LeaveLedger;
use crate::auth::password::hash_password;
use crate::calendar::CalendarError;
use crate::calendar::credentials::CredentialStore;
use crate::error::{AppError, Result};
use crate::model::employee::{
    Department, EMPLOYEE_CODE_PREFIX, Employee, EmployeeFilter, NewEmployee, next_employee_code,
};
use crate::model::leave::{LeaveBalance, LeaveType, NewLeaveType};
use crate::model::role::Role;
use crate::model::user::NewUser;
use crate::repository::{EmployeeRepository, LeaveRepository, RepositoryError, UserRepository};

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateEmployee {
    /// Generated from the `EMP` sequence when omitted.
    #[schema(example = "EMP004")]
    pub employee_code: Option<String>,
    #[schema(example = "John")]
    pub first_name: String,
    #[schema(example = "Doe")]
    pub last_name: String,
    #[schema(example = "john@company.com", format = "email")]
    pub email: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub department: Option<Department>,
    #[schema(example = "Backend Engineer")]
    pub position: Option<String>,
    #[schema(value_type = Option<String>, format = "date")]
    pub date_of_birth: Option<NaiveDate>,
    #[schema(example = "2026-01-01", format = "date", value_type = String)]
    pub joining_date: NaiveDate,
    /// Creates a self-service login with the initial password when set.
    #[schema(example = "john.doe")]
    pub username: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct Onboarded {
    pub employee: Employee,
    pub leave_balances: Vec<LeaveBalance>,
    pub username: Option<String>,
}

pub struct EmployeeService {
    employees: Arc<dyn EmployeeRepository>,
    users: Arc<dyn UserRepository>,
    leave: Arc<dyn LeaveRepository>,
    ledger: Arc<LeaveLedger>,
    credentials: Arc<CredentialStore>,
    initial_password: Option<String>,
}

impl EmployeeService {
    pub fn new(
        employees: Arc<dyn EmployeeRepository>,
        users: Arc<dyn UserRepository>,
        leave: Arc<dyn LeaveRepository>,
        ledger: Arc<LeaveLedger>,
        credentials: Arc<CredentialStore>,
        initial_password: Option<String>,
    ) -> Self {
        Self {
            employees,
            users,
            leave,
            ledger,
            credentials,
            initial_password,
        }
    }

    /// Inserts the employee, opens this year's leave balances and, when asked
    /// for, a linked login.
    pub async fn create(&self, input: CreateEmployee) -> Result<Onboarded> {
        if input.first_name.trim().is_empty() {
            return Err(AppError::validation("first_name is required"));
        }
        let email = input.email.trim().to_lowercase();
        if !email.contains('@') {
            return Err(AppError::validation("A valid email address is required"));
        }

        let username = input
            .username
            .as_deref()
            .map(|u| u.trim().to_lowercase())
            .filter(|u| !u.is_empty());
        let password_hash = match &username {
            Some(username) => {
                let Some(password) = self.initial_password.as_deref() else {
                    return Err(AppError::validation(
                        "Logins cannot be created: no initial password is configured",
                    ));
                };
                if self.users.exists(username).await? {
                    return Err(AppError::Conflict(format!(
                        "Username '{username}' is already taken"
                    )));
                }
                Some(hash_password(password)?)
            }
            None => None,
        };

        let employee_code = match input.employee_code.map(|c| c.trim().to_string()) {
            Some(code) if !code.is_empty() => code,
            _ => {
                let last = self
                    .employees
                    .last_employee_code(EMPLOYEE_CODE_PREFIX)
                    .await?;
                next_employee_code(last.as_deref())?
            }
        };

        let employee = self
            .employees
            .insert(&NewEmployee {
                employee_code,
                first_name: input.first_name.trim().to_string(),
                last_name: input.last_name.trim().to_string(),
                email,
                phone: input.phone,
                address: input.address,
                department: input.department,
                position: input.position,
                date_of_birth: input.date_of_birth,
                joining_date: input.joining_date,
            })
            .await
            .map_err(|e| match e {
                RepositoryError::Duplicate(_) => AppError::Conflict(
                    "An employee with this email or code already exists".into(),
                ),
                other => other.into(),
            })?;
        tracing::info!(
            employee_id = employee.id,
            code = %employee.employee_code,
            "Employee created"
        );

        let leave_balances = self
            .ledger
            .seed_for_employee(employee.id, current_year())
            .await;

        if let (Some(username), Some(password_hash)) = (&username, password_hash) {
            self.users
                .insert(&NewUser {
                    username: username.clone(),
                    password_hash,
                    role: Role::Employee,
                    employee_id: Some(employee.id),
                })
                .await
                .map_err(|e| match e {
                    RepositoryError::Duplicate(_) => {
                        AppError::Conflict(format!("Username '{username}' is already taken"))
                    }
                    other => other.into(),
                })?;
            tracing::info!(employee_id = employee.id, %username, "Employee login created");
        }

        Ok(Onboarded {
            employee,
            leave_balances,
            username,
        })
    }

    pub async fn get(&self, id: u64) -> Result<Employee> {
        self.employees
            .find(id)
            .await?
            .ok_or_else(|| AppError::not_found("Employee"))
    }

    pub async fn list(&self, filter: &EmployeeFilter) -> Result<(Vec<Employee>, i64)> {
        Ok(self.employees.list(filter).await?)
    }

    pub async fn delete(&self, id: u64) -> Result<()> {
        self.get(id).await?;

        match self.credentials.revoke(id).await {
            Ok(()) | Err(CalendarError::NotConnected) => {}
            Err(e) => {
                tracing::warn!(employee_id = id, error = %e, "Calendar revocation failed during delete")
            }
        }

        if !self.employees.delete(id).await? {
            return Err(AppError::not_found("Employee"));
        }
        tracing::info!(employee_id = id, "Employee deleted");
        Ok(())
    }

    pub async fn leave_balances(&self, employee_id: u64, year: i32) -> Result<Vec<LeaveBalance>> {
        self.get(employee_id).await?;
        self.ledger.balances_for(employee_id, year).await
    }

    pub async fn create_leave_type(&self, input: NewLeaveType) -> Result<LeaveType> {
        let name = input.name.trim();
        if name.is_empty() {
            return Err(AppError::validation("Leave type name is required"));
        }
        let leave_type = self
            .leave
            .insert_leave_type(&NewLeaveType {
                name: name.to_string(),
                ..input
            })
            .await
            .map_err(|e| match e {
                RepositoryError::Duplicate(_) => {
                    AppError::Conflict(format!("Leave type '{name}' already exists"))
                }
                other => other.into(),
            })?;
        tracing::info!(leave_type_id = leave_type.id, name = %leave_type.name, "Leave type created");
        Ok(leave_type)
    }

    pub async fn list_leave_types(&self) -> Result<Vec<LeaveType>> {
        Ok(self.leave.list_leave_types().await?)
    }
}
