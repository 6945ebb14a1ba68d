use actix_web::{FromRequest, HttpMessage, HttpRequest, dev::Payload};
use futures::future::{Ready, ready};

use crate::error::{AppError, Result};
use crate::model::role::Role;

/// Caller identity placed in request extensions by `auth_middleware`.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: u64,
    pub username: String,
    pub role: Role,

    /// Present only if this user is linked to an employee record
    pub employee_id: Option<u64>,
}

impl FromRequest for AuthUser {
    type Error = AppError;
    type Future = Ready<Result<Self>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(
            req.extensions()
                .get::<AuthUser>()
                .cloned()
                .ok_or_else(|| AppError::Unauthorized("Missing token".into())),
        )
    }
}

impl AuthUser {
    pub fn require_admin(&self) -> Result<()> {
        if self.role == Role::Admin {
            Ok(())
        } else {
            Err(AppError::Forbidden("Admin only".into()))
        }
    }

    pub fn require_hr_or_admin(&self) -> Result<()> {
        if self.role.is_manager() {
            Ok(())
        } else {
            Err(AppError::Forbidden("HR/Admin only".into()))
        }
    }

    pub fn is_manager(&self) -> bool {
        self.role.is_manager()
    }

    /// The linked employee, required for self-service actions.
    pub fn employee_id(&self) -> Result<u64> {
        self.employee_id.ok_or_else(|| {
            AppError::Forbidden("This account is not linked to an employee record".into())
        })
    }

    /// Managers may act on anyone; others only on their own record.
    pub fn require_self_or_manager(&self, employee_id: u64) -> Result<()> {
        if self.is_manager() || self.employee_id == Some(employee_id) {
            Ok(())
        } else {
            Err(AppError::Forbidden("Not allowed to access another employee's records".into()))
        }
    }

    /// Reviewers decide on other employees' requests, never their own.
    pub fn require_reviewer_of(&self, employee_id: u64) -> Result<()> {
        self.require_hr_or_admin()?;
        if self.employee_id == Some(employee_id) {
            Err(AppError::Forbidden("You cannot review your own leave application".into()))
        } else {
            Ok(())
        }
    }
}
