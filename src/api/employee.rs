use actix_web::{HttpResponse, web};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use super::paging;
use crate::auth::auth::AuthUser;
use crate::error::Result;
use crate::model::employee::{Department, Employee, EmployeeFilter};
use crate::model::leave::LeaveBalance;
use crate::service::current_year;
use crate::service::employee::{CreateEmployee, Onboarded};
use crate::state::AppState;

#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct EmployeeQuery {
    /// Pagination page number (start with 1)
    #[schema(example = 1)]
    pub page: Option<u32>,
    #[schema(example = 10)]
    pub per_page: Option<u32>,
    pub department: Option<Department>,
    /// Matches first name, last name or email
    pub search: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct EmployeeListResponse {
    pub data: Vec<Employee>,
    #[schema(example = 1)]
    pub page: u32,
    #[schema(example = 10)]
    pub per_page: u32,
    #[schema(example = 42)]
    pub total: i64,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct YearQuery {
    /// Defaults to the current year
    pub year: Option<i32>,
}

/// Create Employee
#[utoipa::path(
    post,
    path = "/api/employee",
    request_body = CreateEmployee,
    responses(
        (status = 201, description = "Employee created with leave balances", body = Onboarded),
        (status = 400, description = "Validation failed"),
        (status = 409, description = "Email, code or username already in use")
    ),
    tag = "Employee",
    security(("bearer_auth" = []))
)]
pub async fn create_employee(
    auth: AuthUser,
    state: web::Data<AppState>,
    payload: web::Json<CreateEmployee>,
) -> Result<HttpResponse> {
    auth.require_hr_or_admin()?;
    let created = state.employees.create(payload.into_inner()).await?;
    Ok(HttpResponse::Created().json(created))
}

/// List Employees
#[utoipa::path(
    get,
    path = "/api/employee",
    params(EmployeeQuery),
    responses((status = 200, description = "Page of employees", body = EmployeeListResponse)),
    tag = "Employee",
    security(("bearer_auth" = []))
)]
pub async fn list_employees(
    auth: AuthUser,
    state: web::Data<AppState>,
    query: web::Query<EmployeeQuery>,
) -> Result<HttpResponse> {
    auth.require_hr_or_admin()?;
    let query = query.into_inner();
    let (page, per_page) = paging(query.page, query.per_page);
    let filter = EmployeeFilter {
        department: query.department,
        search: query.search.filter(|s| !s.trim().is_empty()),
        page,
        per_page,
    };

    let (data, total) = state.employees.list(&filter).await?;
    Ok(HttpResponse::Ok().json(EmployeeListResponse {
        data,
        page,
        per_page,
        total,
    }))
}

/// Get Employee
#[utoipa::path(
    get,
    path = "/api/employee/{id}",
    params(("id" = u64, Path, description = "Employee id")),
    responses(
        (status = 200, description = "Employee", body = Employee),
        (status = 404, description = "Employee not found")
    ),
    tag = "Employee",
    security(("bearer_auth" = []))
)]
pub async fn get_employee(
    auth: AuthUser,
    state: web::Data<AppState>,
    path: web::Path<u64>,
) -> Result<HttpResponse> {
    let id = path.into_inner();
    auth.require_self_or_manager(id)?;
    Ok(HttpResponse::Ok().json(state.employees.get(id).await?))
}

/// Delete Employee
#[utoipa::path(
    delete,
    path = "/api/employee/{id}",
    params(("id" = u64, Path, description = "Employee id")),
    responses(
        (status = 204, description = "Employee deleted, calendar access revoked"),
        (status = 404, description = "Employee not found")
    ),
    tag = "Employee",
    security(("bearer_auth" = []))
)]
pub async fn delete_employee(
    auth: AuthUser,
    state: web::Data<AppState>,
    path: web::Path<u64>,
) -> Result<HttpResponse> {
    auth.require_admin()?;
    state.employees.delete(path.into_inner()).await?;
    Ok(HttpResponse::NoContent().finish())
}

/// Employee Leave Balances
#[utoipa::path(
    get,
    path = "/api/employee/{id}/leave-balances",
    params(("id" = u64, Path, description = "Employee id"), YearQuery),
    responses((status = 200, description = "Balances for the year", body = [LeaveBalance])),
    tag = "Employee",
    security(("bearer_auth" = []))
)]
pub async fn employee_leave_balances(
    auth: AuthUser,
    state: web::Data<AppState>,
    path: web::Path<u64>,
    query: web::Query<YearQuery>,
) -> Result<HttpResponse> {
    let id = path.into_inner();
    auth.require_self_or_manager(id)?;
    let year = query.year.unwrap_or_else(current_year);
    Ok(HttpResponse::Ok().json(state.employees.leave_balances(id, year).await?))
}
