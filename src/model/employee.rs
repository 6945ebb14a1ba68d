use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use utoipa::ToSchema;

use crate::error::{AppError, Result};
use crate::model::sql_text_enum;

/// Prefix of generated employee codes (`EMP001`, `EMP002`, ...).
pub const EMPLOYEE_CODE_PREFIX: &str = "EMP";

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, ToSchema,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Department {
    It,
    Finance,
    Marketing,
    Operations,
    Sales,
}

sql_text_enum!(Department);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
#[schema(
    example = json!({
        "id": 1,
        "employee_code": "EMP001",
        "first_name": "John",
        "last_name": "Doe",
        "email": "john.doe@company.com",
        "phone": "+8801712345678",
        "address": null,
        "department": "it",
        "position": "Backend Engineer",
        "date_of_birth": null,
        "joining_date": "2024-01-01",
        "is_active": true
    })
)]
pub struct Employee {
    #[schema(example = 1)]
    pub id: u64,

    #[schema(example = "EMP001")]
    pub employee_code: String,

    #[schema(example = "John")]
    pub first_name: String,

    #[schema(example = "Doe")]
    pub last_name: String,

    #[schema(example = "john.doe@company.com")]
    pub email: String,

    #[schema(example = "+8801712345678", nullable = true)]
    pub phone: Option<String>,

    #[schema(nullable = true)]
    pub address: Option<String>,

    #[schema(nullable = true)]
    pub department: Option<Department>,

    #[schema(example = "Backend Engineer", nullable = true)]
    pub position: Option<String>,

    #[schema(value_type = Option<String>, format = "date")]
    pub date_of_birth: Option<NaiveDate>,

    #[schema(example = "2024-01-01", value_type = String, format = "date")]
    pub joining_date: NaiveDate,

    pub is_active: bool,
}

impl Employee {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewEmployee {
    pub employee_code: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub department: Option<Department>,
    pub position: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub joining_date: NaiveDate,
}

/// Numeric part of a code in the `EMP` sequence. Codes with anything other
/// than digits after the prefix are not part of it.
pub fn employee_code_sequence(code: &str) -> Option<&str> {
    code.strip_prefix(EMPLOYEE_CODE_PREFIX)
        .filter(|digits| !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()))
}

/// Next code in the `EMP` sequence after `last`. Without a sequenced code the
/// sequence starts at 1.
pub fn next_employee_code(last: Option<&str>) -> Result<String> {
    let next = match last.and_then(employee_code_sequence) {
        None => 1,
        Some(digits) => digits
            .parse::<u64>()
            .ok()
            .and_then(|n| n.checked_add(1))
            .ok_or_else(|| AppError::Conflict("Employee code sequence is exhausted".into()))?,
    };
    Ok(format!("{EMPLOYEE_CODE_PREFIX}{next:03}"))
}

#[derive(Debug, Clone, Default)]
pub struct EmployeeFilter {
    pub department: Option<Department>,
    pub search: Option<String>,
    pub page: u32,
    pub per_page: u32,
}
