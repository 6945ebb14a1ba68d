use actix_web::{HttpResponse, web};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use super::employee::YearQuery;
use super::paging;
use crate::auth::auth::AuthUser;
use crate::error::Result;
use crate::model::leave::{
    LeaveApplication, LeaveBalance, LeaveFilter, LeaveStatus, LeaveType, NewLeaveType,
};
use crate::service::current_year;
use crate::state::AppState;

#[derive(Deserialize, ToSchema)]
pub struct ApplyLeave {
    #[schema(example = 1)]
    pub leave_type_id: u64,
    #[schema(example = "2026-01-10", format = "date", value_type = String)]
    pub start_date: NaiveDate,
    #[schema(example = "2026-01-12", format = "date", value_type = String)]
    pub end_date: NaiveDate,
    #[schema(example = "Flu")]
    pub reason: String,
}

#[derive(Deserialize, ToSchema)]
pub struct ReviewLeave {
    /// Required when rejecting
    #[schema(example = "Enjoy your time off")]
    pub remarks: Option<String>,
}

#[derive(Deserialize, IntoParams, ToSchema)]
pub struct LeaveQuery {
    /// Filter by employee ID (HR/Admin only)
    #[schema(example = 1000)]
    pub employee_id: Option<u64>,
    /// Filter by leave status
    pub status: Option<LeaveStatus>,
    /// Pagination page number (start with 1)
    #[schema(example = 1)]
    pub page: Option<u32>,
    #[schema(example = 10)]
    pub per_page: Option<u32>,
}

#[derive(Serialize, ToSchema)]
pub struct LeaveListResponse {
    pub data: Vec<LeaveApplication>,
    #[schema(example = 1)]
    pub page: u32,
    #[schema(example = 10)]
    pub per_page: u32,
    #[schema(example = 1)]
    pub total: i64,
}

/// Apply for leave
#[utoipa::path(
    post,
    path = "/api/leave",
    request_body = ApplyLeave,
    responses(
        (status = 201, description = "Application created as pending", body = LeaveApplication),
        (status = 400, description = "Invalid dates, missing balance or insufficient balance", body = Object, example = json!({
            "message": "Insufficient leave balance: requested 15 day(s), 10 remaining"
        }))
    ),
    tag = "Leave",
    security(("bearer_auth" = []))
)]
pub async fn apply_leave(
    auth: AuthUser,
    state: web::Data<AppState>,
    payload: web::Json<ApplyLeave>,
) -> Result<HttpResponse> {
    let employee_id = auth.employee_id()?;
    let application = state
        .leave
        .submit(
            employee_id,
            payload.leave_type_id,
            payload.start_date,
            payload.end_date,
            &payload.reason,
        )
        .await?;
    Ok(HttpResponse::Created().json(application))
}

/// List leave applications
#[utoipa::path(
    get,
    path = "/api/leave",
    params(LeaveQuery),
    responses((status = 200, description = "Page of applications", body = LeaveListResponse)),
    tag = "Leave",
    security(("bearer_auth" = []))
)]
pub async fn list_leave(
    auth: AuthUser,
    state: web::Data<AppState>,
    query: web::Query<LeaveQuery>,
) -> Result<HttpResponse> {
    let query = query.into_inner();
    // employees only ever see their own applications
    let employee_id = if auth.is_manager() {
        query.employee_id
    } else {
        Some(auth.employee_id()?)
    };
    let (page, per_page) = paging(query.page, query.per_page);

    let (data, total) = state
        .leave
        .list(&LeaveFilter {
            employee_id,
            status: query.status,
            page,
            per_page,
        })
        .await?;
    Ok(HttpResponse::Ok().json(LeaveListResponse {
        data,
        page,
        per_page,
        total,
    }))
}

/// Get leave application
#[utoipa::path(
    get,
    path = "/api/leave/{id}",
    params(("id" = u64, Path, description = "Leave application id")),
    responses(
        (status = 200, description = "Leave application", body = LeaveApplication),
        (status = 404, description = "Not found")
    ),
    tag = "Leave",
    security(("bearer_auth" = []))
)]
pub async fn get_leave(
    auth: AuthUser,
    state: web::Data<AppState>,
    path: web::Path<u64>,
) -> Result<HttpResponse> {
    let application = state.leave.get(path.into_inner()).await?;
    auth.require_self_or_manager(application.employee_id)?;
    Ok(HttpResponse::Ok().json(application))
}

/// Approve leave
#[utoipa::path(
    put,
    path = "/api/leave/{id}/approve",
    params(("id" = u64, Path, description = "Leave application id")),
    request_body = ReviewLeave,
    responses(
        (status = 200, description = "Approved; balance deducted", body = LeaveApplication),
        (status = 403, description = "Not HR/Admin, or reviewing own application"),
        (status = 409, description = "Application is no longer pending")
    ),
    tag = "Leave",
    security(("bearer_auth" = []))
)]
pub async fn approve_leave(
    auth: AuthUser,
    state: web::Data<AppState>,
    path: web::Path<u64>,
    payload: Option<web::Json<ReviewLeave>>,
) -> Result<HttpResponse> {
    auth.require_hr_or_admin()?;
    let id = path.into_inner();
    auth.require_reviewer_of(state.leave.get(id).await?.employee_id)?;
    let remarks = payload.and_then(|p| p.into_inner().remarks);
    let application = state.leave.approve(id, auth.user_id, remarks).await?;
    Ok(HttpResponse::Ok().json(application))
}

/// Reject leave
#[utoipa::path(
    put,
    path = "/api/leave/{id}/reject",
    params(("id" = u64, Path, description = "Leave application id")),
    request_body = ReviewLeave,
    responses(
        (status = 200, description = "Rejected", body = LeaveApplication),
        (status = 400, description = "Remarks missing"),
        (status = 403, description = "Not HR/Admin, or reviewing own application"),
        (status = 409, description = "Application is no longer pending")
    ),
    tag = "Leave",
    security(("bearer_auth" = []))
)]
pub async fn reject_leave(
    auth: AuthUser,
    state: web::Data<AppState>,
    path: web::Path<u64>,
    payload: web::Json<ReviewLeave>,
) -> Result<HttpResponse> {
    auth.require_hr_or_admin()?;
    let id = path.into_inner();
    auth.require_reviewer_of(state.leave.get(id).await?.employee_id)?;
    let remarks = payload.into_inner().remarks.unwrap_or_default();
    let application = state.leave.reject(id, auth.user_id, &remarks).await?;
    Ok(HttpResponse::Ok().json(application))
}

/// Cancel own leave
#[utoipa::path(
    put,
    path = "/api/leave/{id}/cancel",
    params(("id" = u64, Path, description = "Leave application id")),
    responses(
        (status = 200, description = "Cancelled", body = LeaveApplication),
        (status = 403, description = "Not the applicant"),
        (status = 409, description = "Application is no longer pending")
    ),
    tag = "Leave",
    security(("bearer_auth" = []))
)]
pub async fn cancel_leave(
    auth: AuthUser,
    state: web::Data<AppState>,
    path: web::Path<u64>,
) -> Result<HttpResponse> {
    let employee_id = auth.employee_id()?;
    let application = state.leave.cancel(path.into_inner(), employee_id).await?;
    Ok(HttpResponse::Ok().json(application))
}

/// Own leave balances
#[utoipa::path(
    get,
    path = "/api/leave/balances",
    params(YearQuery),
    responses((status = 200, description = "Balances of the caller", body = [LeaveBalance])),
    tag = "Leave",
    security(("bearer_auth" = []))
)]
pub async fn my_balances(
    auth: AuthUser,
    state: web::Data<AppState>,
    query: web::Query<YearQuery>,
) -> Result<HttpResponse> {
    let employee_id = auth.employee_id()?;
    let year = query.year.unwrap_or_else(current_year);
    Ok(HttpResponse::Ok().json(state.ledger.balances_for(employee_id, year).await?))
}

/// Create leave type
#[utoipa::path(
    post,
    path = "/api/leave-types",
    request_body = NewLeaveType,
    responses(
        (status = 201, description = "Leave type created", body = LeaveType),
        (status = 409, description = "Name already exists")
    ),
    tag = "Leave",
    security(("bearer_auth" = []))
)]
pub async fn create_leave_type(
    auth: AuthUser,
    state: web::Data<AppState>,
    payload: web::Json<NewLeaveType>,
) -> Result<HttpResponse> {
    auth.require_hr_or_admin()?;
    let leave_type = state.employees.create_leave_type(payload.into_inner()).await?;
    Ok(HttpResponse::Created().json(leave_type))
}

/// List leave types
#[utoipa::path(
    get,
    path = "/api/leave-types",
    responses((status = 200, description = "All leave types", body = [LeaveType])),
    tag = "Leave",
    security(("bearer_auth" = []))
)]
pub async fn list_leave_types(_auth: AuthUser, state: web::Data<AppState>) -> Result<HttpResponse> {
    Ok(HttpResponse::Ok().json(state.employees.list_leave_types().await?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::testing::{bearer, init_api, memory_state};
    use crate::model::role::Role;
    use actix_web::{http::StatusCode, test};
    use serde_json::{Value, json};

    #[actix_web::test]
    async fn apply_approve_and_check_balance() {
        let (_store, state) = memory_state();
        let app = init_api!(state);
        let hr = || bearer(Role::Hr, None);

        let req = test::TestRequest::post()
            .uri("/api/leave-types")
            .insert_header(hr())
            .set_json(json!({"name": "Sick", "default_days": 10}))
            .to_request();
        let sick: Value = test::call_and_read_body_json(&app, req).await;

        let req = test::TestRequest::post()
            .uri("/api/employee")
            .insert_header(hr())
            .set_json(json!({
                "first_name": "Asha",
                "last_name": "Rao",
                "email": "asha@company.com",
                "joining_date": "2026-01-05"
            }))
            .to_request();
        let created: Value = test::call_and_read_body_json(&app, req).await;
        let employee_id = created["employee"]["id"].as_u64().unwrap();
        let me = || bearer(Role::Employee, Some(employee_id));
        let year = current_year();

        let too_long = test::TestRequest::post()
            .uri("/api/leave")
            .insert_header(me())
            .set_json(json!({
                "leave_type_id": sick["id"],
                "start_date": format!("{year}-03-01"),
                "end_date": format!("{year}-03-15"),
                "reason": "trip"
            }))
            .to_request();
        let resp = test::call_service(&app, too_long).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let apply = test::TestRequest::post()
            .uri("/api/leave")
            .insert_header(me())
            .set_json(json!({
                "leave_type_id": sick["id"],
                "start_date": format!("{year}-01-10"),
                "end_date": format!("{year}-01-12"),
                "reason": "flu"
            }))
            .to_request();
        let resp = test::call_service(&app, apply).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let application: Value = test::read_body_json(resp).await;
        assert_eq!(application["total_days"], 3);
        let id = application["id"].as_u64().unwrap();

        let self_approve = test::TestRequest::put()
            .uri(&format!("/api/leave/{id}/approve"))
            .insert_header(me())
            .to_request();
        assert_eq!(
            test::call_service(&app, self_approve).await.status(),
            StatusCode::FORBIDDEN
        );

        let approve = test::TestRequest::put()
            .uri(&format!("/api/leave/{id}/approve"))
            .insert_header(hr())
            .set_json(json!({"remarks": "get well"}))
            .to_request();
        let approved: Value = test::call_and_read_body_json(&app, approve).await;
        assert_eq!(approved["status"], "approved");

        let again = test::TestRequest::put()
            .uri(&format!("/api/leave/{id}/approve"))
            .insert_header(hr())
            .to_request();
        assert_eq!(test::call_service(&app, again).await.status(), StatusCode::CONFLICT);

        let balances = test::TestRequest::get()
            .uri("/api/leave/balances")
            .insert_header(me())
            .to_request();
        let balances: Value = test::call_and_read_body_json(&app, balances).await;
        assert_eq!(balances[0]["used_days"], 3);
        assert_eq!(balances[0]["remaining_days"], 7);
    }

    #[actix_web::test]
    async fn hr_staff_cannot_review_their_own_leave() {
        let (_store, state) = memory_state();
        let app = init_api!(state);
        let admin = || bearer(Role::Admin, None);

        let req = test::TestRequest::post()
            .uri("/api/leave-types")
            .insert_header(admin())
            .set_json(json!({"name": "Annual", "default_days": 20}))
            .to_request();
        let annual: Value = test::call_and_read_body_json(&app, req).await;

        let req = test::TestRequest::post()
            .uri("/api/employee")
            .insert_header(admin())
            .set_json(json!({
                "first_name": "Meera",
                "last_name": "Iyer",
                "email": "meera@company.com",
                "joining_date": "2026-01-05"
            }))
            .to_request();
        let created: Value = test::call_and_read_body_json(&app, req).await;
        let hr_employee = created["employee"]["id"].as_u64().unwrap();
        let hr_self = || bearer(Role::Hr, Some(hr_employee));
        let year = current_year();

        let apply = test::TestRequest::post()
            .uri("/api/leave")
            .insert_header(hr_self())
            .set_json(json!({
                "leave_type_id": annual["id"],
                "start_date": format!("{year}-04-06"),
                "end_date": format!("{year}-04-10"),
                "reason": "family visit"
            }))
            .to_request();
        let application: Value = test::call_and_read_body_json(&app, apply).await;
        let id = application["id"].as_u64().unwrap();

        let own_approval = test::TestRequest::put()
            .uri(&format!("/api/leave/{id}/approve"))
            .insert_header(hr_self())
            .to_request();
        assert_eq!(
            test::call_service(&app, own_approval).await.status(),
            StatusCode::FORBIDDEN
        );
        let own_rejection = test::TestRequest::put()
            .uri(&format!("/api/leave/{id}/reject"))
            .insert_header(hr_self())
            .set_json(json!({"remarks": "changed plans"}))
            .to_request();
        assert_eq!(
            test::call_service(&app, own_rejection).await.status(),
            StatusCode::FORBIDDEN
        );

        let balances = test::TestRequest::get()
            .uri("/api/leave/balances")
            .insert_header(hr_self())
            .to_request();
        let balances: Value = test::call_and_read_body_json(&app, balances).await;
        assert_eq!(balances[0]["used_days"], 0);

        let approve = test::TestRequest::put()
            .uri(&format!("/api/leave/{id}/approve"))
            .insert_header(admin())
            .to_request();
        let approved: Value = test::call_and_read_body_json(&app, approve).await;
        assert_eq!(approved["status"], "approved");
    }

    #[actix_web::test]
    async fn unknown_application_and_unlinked_account() {
        let (_store, state) = memory_state();
        let app = init_api!(state);

        let missing = test::TestRequest::put()
            .uri("/api/leave/1/reject")
            .insert_header(bearer(Role::Admin, None))
            .set_json(json!({"remarks": "overlaps release"}))
            .to_request();
        assert_eq!(test::call_service(&app, missing).await.status(), StatusCode::NOT_FOUND);

        let unlinked = test::TestRequest::post()
            .uri("/api/leave")
            .insert_header(bearer(Role::Admin, None))
            .set_json(json!({
                "leave_type_id": 1,
                "start_date": "2026-01-10",
                "end_date": "2026-01-12",
                "reason": "flu"
            }))
            .to_request();
        assert_eq!(test::call_service(&app, unlinked).await.status(), StatusCode::FORBIDDEN);
    }
}
