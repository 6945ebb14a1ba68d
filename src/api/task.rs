use actix_web::{HttpResponse, http::StatusCode, web};
use serde::Deserialize;
use serde_json::json;
use utoipa::IntoParams;

use super::synced;
use crate::auth::auth::AuthUser;
use crate::error::Result;
use crate::model::task::{Task, TaskFilter, TaskStatus};
use crate::service::project::{TaskInput, TaskUpdate};
use crate::state::AppState;

#[derive(Debug, Deserialize, IntoParams)]
pub struct TaskQuery {
    /// Assignee filter (HR/Admin only; others always see their own)
    pub assigned_to: Option<u64>,
    pub project_id: Option<u64>,
    pub status: Option<TaskStatus>,
}

/// Create task
#[utoipa::path(
    post,
    path = "/api/task",
    request_body = TaskInput,
    responses(
        (status = 201, description = "`{data: Task, warnings?: [string]}`", body = Task),
        (status = 400, description = "Assignee is not a collaborator on the project"),
        (status = 404, description = "Project or assignee not found")
    ),
    tag = "Task",
    security(("bearer_auth" = []))
)]
pub async fn create_task(
    auth: AuthUser,
    state: web::Data<AppState>,
    payload: web::Json<TaskInput>,
) -> Result<HttpResponse> {
    auth.require_hr_or_admin()?;
    let (task, report) = state
        .projects
        .create_task(payload.into_inner(), auth.user_id, &auth.username)
        .await?;
    Ok(synced(StatusCode::CREATED, task, report))
}

/// List tasks
#[utoipa::path(
    get,
    path = "/api/task",
    params(TaskQuery),
    responses((status = 200, description = "Tasks", body = [Task])),
    tag = "Task",
    security(("bearer_auth" = []))
)]
pub async fn list_tasks(
    auth: AuthUser,
    state: web::Data<AppState>,
    query: web::Query<TaskQuery>,
) -> Result<HttpResponse> {
    let query = query.into_inner();
    let assigned_to = if auth.is_manager() {
        query.assigned_to
    } else {
        Some(auth.employee_id()?)
    };
    let filter = TaskFilter {
        assigned_to,
        project_id: query.project_id,
        status: query.status,
    };
    Ok(HttpResponse::Ok().json(state.projects.list_tasks(&filter).await?))
}

/// Get task
#[utoipa::path(
    get,
    path = "/api/task/{id}",
    params(("id" = u64, Path, description = "Task id")),
    responses(
        (status = 200, description = "Task", body = Task),
        (status = 404, description = "Task not found")
    ),
    tag = "Task",
    security(("bearer_auth" = []))
)]
pub async fn get_task(
    auth: AuthUser,
    state: web::Data<AppState>,
    path: web::Path<u64>,
) -> Result<HttpResponse> {
    let task = state.projects.get_task(path.into_inner()).await?;
    auth.require_self_or_manager(task.assigned_to)?;
    Ok(HttpResponse::Ok().json(task))
}

/// Update task
#[utoipa::path(
    put,
    path = "/api/task/{id}",
    params(("id" = u64, Path, description = "Task id")),
    request_body = TaskUpdate,
    responses(
        (status = 200, description = "Updated task", body = Task),
        (status = 404, description = "Task not found")
    ),
    tag = "Task",
    security(("bearer_auth" = []))
)]
pub async fn update_task(
    auth: AuthUser,
    state: web::Data<AppState>,
    path: web::Path<u64>,
    payload: web::Json<TaskUpdate>,
) -> Result<HttpResponse> {
    auth.require_hr_or_admin()?;
    let task = state
        .projects
        .update_task(path.into_inner(), payload.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(task))
}

/// Complete task
///
/// Only the assignee may mark a task completed.
#[utoipa::path(
    put,
    path = "/api/task/{id}/complete",
    params(("id" = u64, Path, description = "Task id")),
    responses(
        (status = 200, description = "Completed task", body = Task),
        (status = 403, description = "Not the assignee"),
        (status = 409, description = "Already completed")
    ),
    tag = "Task",
    security(("bearer_auth" = []))
)]
pub async fn complete_task(
    auth: AuthUser,
    state: web::Data<AppState>,
    path: web::Path<u64>,
) -> Result<HttpResponse> {
    let task = state
        .projects
        .mark_task_completed(path.into_inner(), auth.employee_id()?)
        .await?;
    Ok(HttpResponse::Ok().json(task))
}

/// Delete task
#[utoipa::path(
    delete,
    path = "/api/task/{id}",
    params(("id" = u64, Path, description = "Task id")),
    responses(
        (status = 200, description = "Deleted; calendar failures listed as warnings"),
        (status = 404, description = "Task not found")
    ),
    tag = "Task",
    security(("bearer_auth" = []))
)]
pub async fn delete_task(
    auth: AuthUser,
    state: web::Data<AppState>,
    path: web::Path<u64>,
) -> Result<HttpResponse> {
    auth.require_hr_or_admin()?;
    let id = path.into_inner();
    let report = state.projects.delete_task(id).await?;
    Ok(synced(StatusCode::OK, json!({ "id": id }), report))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::testing::{bearer, init_api, memory_state};
    use crate::model::employee::NewEmployee;
    use crate::model::role::Role;
    use crate::repository::EmployeeRepository;
    use actix_web::test;
    use chrono::NaiveDate;
    use serde_json::Value;

    fn recruit(first_name: &str) -> NewEmployee {
        NewEmployee {
            employee_code: format!("EMP-{first_name}"),
            first_name: first_name.into(),
            last_name: "Tester".into(),
            email: format!("{}@company.com", first_name.to_lowercase()),
            phone: None,
            address: None,
            department: None,
            position: None,
            date_of_birth: None,
            joining_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        }
    }

    #[actix_web::test]
    async fn assignee_completes_own_task() {
        let (store, state) = memory_state();
        let ana = store.insert(&recruit("Ana")).await.unwrap();
        let ben = store.insert(&recruit("Ben")).await.unwrap();
        let app = init_api!(state);

        let create = test::TestRequest::post()
            .uri("/api/task")
            .insert_header(bearer(Role::Hr, None))
            .set_json(json!({
                "name": "Write migration",
                "assigned_to": ana.id,
                "due_date": "2026-02-14",
                "priority": "high"
            }))
            .to_request();
        let resp = test::call_service(&app, create).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let created: Value = test::read_body_json(resp).await;
        assert_eq!(created["data"]["status"], "pending");
        let id = created["data"]["id"].as_u64().unwrap();

        let by_ben = test::TestRequest::put()
            .uri(&format!("/api/task/{id}/complete"))
            .insert_header(bearer(Role::Employee, Some(ben.id)))
            .to_request();
        assert_eq!(test::call_service(&app, by_ben).await.status(), StatusCode::FORBIDDEN);

        let bens_tasks = test::TestRequest::get()
            .uri(&format!("/api/task?assigned_to={}", ana.id))
            .insert_header(bearer(Role::Employee, Some(ben.id)))
            .to_request();
        let listed: Value = test::call_and_read_body_json(&app, bens_tasks).await;
        assert!(listed.as_array().unwrap().is_empty());

        let by_ana = test::TestRequest::put()
            .uri(&format!("/api/task/{id}/complete"))
            .insert_header(bearer(Role::Employee, Some(ana.id)))
            .to_request();
        let done: Value = test::call_and_read_body_json(&app, by_ana).await;
        assert_eq!(done["status"], "completed");
        assert!(done["completed_at"].is_string());

        let again = test::TestRequest::put()
            .uri(&format!("/api/task/{id}/complete"))
            .insert_header(bearer(Role::Employee, Some(ana.id)))
            .to_request();
        assert_eq!(test::call_service(&app, again).await.status(), StatusCode::CONFLICT);
    }

    #[actix_web::test]
    async fn delete_answers_with_id() {
        let (store, state) = memory_state();
        let ana = store.insert(&recruit("Ana")).await.unwrap();
        let app = init_api!(state);

        let create = test::TestRequest::post()
            .uri("/api/task")
            .insert_header(bearer(Role::Admin, None))
            .set_json(json!({
                "name": "Review PR",
                "assigned_to": ana.id,
                "due_date": "2026-02-20"
            }))
            .to_request();
        let created: Value = test::call_and_read_body_json(&app, create).await;
        let id = created["data"]["id"].as_u64().unwrap();

        let delete = test::TestRequest::delete()
            .uri(&format!("/api/task/{id}"))
            .insert_header(bearer(Role::Admin, None))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, delete).await;
        assert_eq!(body, json!({"data": {"id": id}}));

        let gone = test::TestRequest::get()
            .uri(&format!("/api/task/{id}"))
            .insert_header(bearer(Role::Admin, None))
            .to_request();
        assert_eq!(test::call_service(&app, gone).await.status(), StatusCode::NOT_FOUND);
    }
}
