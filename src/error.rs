//! Service-wide error type and its HTTP mapping.

use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use serde_json::json;
use thiserror::Error;

use crate::calendar::CalendarError;
use crate::model::leave::LeaveStatus;
use crate::repository::RepositoryError;

pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Error, Debug)]
pub enum AppError {
    /// Bad input: date ranges, missing remarks, invalid pairings.
    #[error("{0}")]
    Validation(String),

    #[error("Insufficient leave balance: requested {requested} day(s), {remaining} remaining")]
    InsufficientBalance { requested: u32, remaining: u32 },

    /// Acting on a leave application that is no longer pending.
    #[error("Leave application is {status}; only pending applications can be {action}")]
    InvalidTransition {
        status: LeaveStatus,
        action: &'static str,
    },

    #[error("{0} not found")]
    NotFound(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),

    #[error("Calendar error: {0}")]
    Calendar(#[from] CalendarError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) | AppError::InsufficientBalance { .. } => {
                StatusCode::BAD_REQUEST
            }
            AppError::InvalidTransition { .. } | AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::Calendar(CalendarError::NotConfigured) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Calendar(CalendarError::NotConnected) => StatusCode::NOT_FOUND,
            AppError::Calendar(_) => StatusCode::BAD_GATEWAY,
            AppError::Repository(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        let message = if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
            match self {
                AppError::Calendar(err) if err.is_user_facing() => self.to_string(),
                _ => "Internal Server Error".to_string(),
            }
        } else {
            self.to_string()
        };

        HttpResponse::build(status).json(json!({ "message": message }))
    }
}

impl From<actix_web::Error> for AppError {
    fn from(err: actix_web::Error) -> Self {
        tracing::error!(error = %err, "actix error promoted to application error");
        AppError::Internal("Internal Server Error".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::body::to_bytes;
    use rstest::rstest;

    #[rstest]
    #[case(AppError::validation("bad dates"), StatusCode::BAD_REQUEST)]
    #[case(AppError::InsufficientBalance { requested: 15, remaining: 10 }, StatusCode::BAD_REQUEST)]
    #[case(AppError::InvalidTransition { status: LeaveStatus::Approved, action: "approved" }, StatusCode::CONFLICT)]
    #[case(AppError::not_found("Leave application"), StatusCode::NOT_FOUND)]
    #[case(AppError::Forbidden("HR/Admin only".into()), StatusCode::FORBIDDEN)]
    #[case(AppError::Calendar(CalendarError::NotConfigured), StatusCode::SERVICE_UNAVAILABLE)]
    #[case(AppError::Repository(RepositoryError::Query("boom".into())), StatusCode::INTERNAL_SERVER_ERROR)]
    fn maps_errors_to_status(#[case] error: AppError, #[case] expected: StatusCode) {
        assert_eq!(error.status_code(), expected);
    }

    #[actix_web::test]
    async fn redacts_repository_details() {
        let error = AppError::Repository(RepositoryError::Query("secret table".into()));
        let body = to_bytes(error.error_response().into_body()).await.unwrap();
        let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(value["message"], "Internal Server Error");
    }

    #[actix_web::test]
    async fn exposes_validation_message() {
        let error = AppError::InvalidTransition {
            status: LeaveStatus::Rejected,
            action: "cancelled",
        };
        let body = to_bytes(error.error_response().into_body()).await.unwrap();
        let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(
            value["message"],
            "Leave application is rejected; only pending applications can be cancelled"
        );
    }
}
