use actix_web::{HttpResponse, http::StatusCode, web};
use serde::Deserialize;
use serde_json::json;
use utoipa::IntoParams;

use super::synced;
use crate::auth::auth::AuthUser;
use crate::error::Result;
use crate::model::project::Project;
use crate::service::project::{CollaboratorInput, ProjectDetail, ProjectInput, ProjectUpdate};
use crate::state::AppState;

#[derive(Debug, Deserialize, IntoParams)]
pub struct ProjectQuery {
    /// Projects this employee collaborates on (HR/Admin only; others always
    /// see their own)
    pub employee_id: Option<u64>,
}

/// Create project
#[utoipa::path(
    post,
    path = "/api/project",
    request_body = ProjectInput,
    responses(
        (status = 201, description = "`{data: ProjectDetail, warnings?: [string]}`", body = ProjectDetail),
        (status = 400, description = "Invalid dates or unknown collaborator")
    ),
    tag = "Project",
    security(("bearer_auth" = []))
)]
pub async fn create_project(
    auth: AuthUser,
    state: web::Data<AppState>,
    payload: web::Json<ProjectInput>,
) -> Result<HttpResponse> {
    auth.require_hr_or_admin()?;
    let (detail, report) = state
        .projects
        .create(payload.into_inner(), auth.user_id)
        .await?;
    Ok(synced(StatusCode::CREATED, detail, report))
}

/// List projects
#[utoipa::path(
    get,
    path = "/api/project",
    params(ProjectQuery),
    responses((status = 200, description = "Projects", body = [Project])),
    tag = "Project",
    security(("bearer_auth" = []))
)]
pub async fn list_projects(
    auth: AuthUser,
    state: web::Data<AppState>,
    query: web::Query<ProjectQuery>,
) -> Result<HttpResponse> {
    let employee_id = if auth.is_manager() {
        query.employee_id
    } else {
        Some(auth.employee_id()?)
    };
    Ok(HttpResponse::Ok().json(state.projects.list(employee_id).await?))
}

/// Get project
#[utoipa::path(
    get,
    path = "/api/project/{id}",
    params(("id" = u64, Path, description = "Project id")),
    responses(
        (status = 200, description = "Project with collaborators", body = ProjectDetail),
        (status = 404, description = "Project not found")
    ),
    tag = "Project",
    security(("bearer_auth" = []))
)]
pub async fn get_project(
    auth: AuthUser,
    state: web::Data<AppState>,
    path: web::Path<u64>,
) -> Result<HttpResponse> {
    let detail = state.projects.get(path.into_inner()).await?;
    if !auth.is_manager() {
        let me = auth.employee_id()?;
        if !detail.collaborators.iter().any(|c| c.employee_id == me) {
            auth.require_hr_or_admin()?;
        }
    }
    Ok(HttpResponse::Ok().json(detail))
}

/// Update project
#[utoipa::path(
    put,
    path = "/api/project/{id}",
    params(("id" = u64, Path, description = "Project id")),
    request_body = ProjectUpdate,
    responses(
        (status = 200, description = "`{data: ProjectDetail, warnings?: [string]}`", body = ProjectDetail),
        (status = 404, description = "Project not found")
    ),
    tag = "Project",
    security(("bearer_auth" = []))
)]
pub async fn update_project(
    auth: AuthUser,
    state: web::Data<AppState>,
    path: web::Path<u64>,
    payload: web::Json<ProjectUpdate>,
) -> Result<HttpResponse> {
    auth.require_hr_or_admin()?;
    let (detail, report) = state
        .projects
        .update(path.into_inner(), payload.into_inner())
        .await?;
    Ok(synced(StatusCode::OK, detail, report))
}

/// Delete project
#[utoipa::path(
    delete,
    path = "/api/project/{id}",
    params(("id" = u64, Path, description = "Project id")),
    responses(
        (status = 200, description = "Deleted; calendar failures listed as warnings", body = Object, example = json!({
            "data": {"id": 42},
            "warnings": ["Could not remove an event from Ben Tester's calendar: calendar API returned 500: backendError"]
        })),
        (status = 404, description = "Project not found")
    ),
    tag = "Project",
    security(("bearer_auth" = []))
)]
pub async fn delete_project(
    auth: AuthUser,
    state: web::Data<AppState>,
    path: web::Path<u64>,
) -> Result<HttpResponse> {
    auth.require_hr_or_admin()?;
    let id = path.into_inner();
    let report = state.projects.delete(id).await?;
    Ok(synced(StatusCode::OK, json!({ "id": id }), report))
}

/// Add collaborator
#[utoipa::path(
    post,
    path = "/api/project/{id}/collaborators",
    params(("id" = u64, Path, description = "Project id")),
    request_body = CollaboratorInput,
    responses(
        (status = 201, description = "`{data: Collaborator, warnings?: [string]}`"),
        (status = 409, description = "Already a collaborator")
    ),
    tag = "Project",
    security(("bearer_auth" = []))
)]
pub async fn add_collaborator(
    auth: AuthUser,
    state: web::Data<AppState>,
    path: web::Path<u64>,
    payload: web::Json<CollaboratorInput>,
) -> Result<HttpResponse> {
    auth.require_hr_or_admin()?;
    let (collaborator, report) = state
        .projects
        .add_collaborator(path.into_inner(), payload.into_inner())
        .await?;
    Ok(synced(StatusCode::CREATED, collaborator, report))
}

/// Remove collaborator
#[utoipa::path(
    delete,
    path = "/api/project/{id}/collaborators/{employee_id}",
    params(
        ("id" = u64, Path, description = "Project id"),
        ("employee_id" = u64, Path, description = "Collaborator's employee id")
    ),
    responses(
        (status = 200, description = "Removed; calendar failures listed as warnings"),
        (status = 404, description = "Project or collaborator not found")
    ),
    tag = "Project",
    security(("bearer_auth" = []))
)]
pub async fn remove_collaborator(
    auth: AuthUser,
    state: web::Data<AppState>,
    path: web::Path<(u64, u64)>,
) -> Result<HttpResponse> {
    auth.require_hr_or_admin()?;
    let (project_id, employee_id) = path.into_inner();
    let report = state
        .projects
        .remove_collaborator(project_id, employee_id)
        .await?;
    Ok(synced(
        StatusCode::OK,
        json!({ "project_id": project_id, "employee_id": employee_id }),
        report,
    ))
}
