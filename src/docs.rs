use crate::api::calendar::ConnectResponse;
use crate::api::employee::{EmployeeListResponse, EmployeeQuery};
use crate::api::leave::{ApplyLeave, LeaveListResponse, LeaveQuery, ReviewLeave};
use crate::auth::handlers::{LoginReqDto, LoginResponse};
use crate::calendar::events::CustomEventRequest;
use crate::model::calendar::{ReminderMethod, ReminderOverride, RemoteEvent};
use crate::model::employee::{Department, Employee};
use crate::model::leave::{LeaveApplication, LeaveBalance, LeaveStatus, LeaveType, NewLeaveType};
use crate::model::project::{Collaborator, CollaboratorRole, Priority, Project, ProjectStatus};
use crate::model::task::{Task, TaskStatus};
use crate::service::employee::{CreateEmployee, Onboarded};
use crate::service::project::{
    CollaboratorInput, ProjectDetail, ProjectInput, ProjectUpdate, TaskInput, TaskUpdate,
};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi, openapi};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "HRM Workforce API",
        version = "1.0.0",
        description = r#"
## Workforce Management

Leave balances and applications, projects and tasks, with every project
and task deadline mirrored into the collaborators' Google Calendars.

### Key Features
- **Employees**: onboarding seeds a leave balance per leave type for the current year
- **Leave**: apply, approve, reject and cancel; approval deducts the balance atomically
- **Projects & Tasks**: collaborators, assignments and completion tracking
- **Google Calendar**: OAuth2 connect/disconnect and automatic event sync

### Security
Endpoints under `/api` require a **JWT Bearer** access token from `/auth/login`.
Refresh tokens are single use.

### Calendar warnings
Calendar failures never fail the request. Mutations that touch calendars answer
`{"data": ..., "warnings": [...]}` and omit `warnings` when everything synced.

---
Built with **Rust**, **Actix Web**, **SQLx**, and **Utoipa**.
"#,
    ),
    paths(
        crate::auth::handlers::login,
        crate::auth::handlers::refresh_token,
        crate::auth::handlers::logout,

        crate::api::employee::create_employee,
        crate::api::employee::list_employees,
        crate::api::employee::get_employee,
        crate::api::employee::delete_employee,
        crate::api::employee::employee_leave_balances,

        crate::api::leave::apply_leave,
        crate::api::leave::list_leave,
        crate::api::leave::get_leave,
        crate::api::leave::approve_leave,
        crate::api::leave::reject_leave,
        crate::api::leave::cancel_leave,
        crate::api::leave::my_balances,
        crate::api::leave::create_leave_type,
        crate::api::leave::list_leave_types,

        crate::api::project::create_project,
        crate::api::project::list_projects,
        crate::api::project::get_project,
        crate::api::project::update_project,
        crate::api::project::delete_project,
        crate::api::project::add_collaborator,
        crate::api::project::remove_collaborator,

        crate::api::task::create_task,
        crate::api::task::list_tasks,
        crate::api::task::get_task,
        crate::api::task::update_task,
        crate::api::task::complete_task,
        crate::api::task::delete_task,

        crate::api::calendar::connect,
        crate::api::calendar::callback,
        crate::api::calendar::disconnect,
        crate::api::calendar::create_event
    ),
    components(
        schemas(
            LoginReqDto,
            LoginResponse,
            CreateEmployee,
            Onboarded,
            Employee,
            Department,
            EmployeeQuery,
            EmployeeListResponse,
            LeaveType,
            NewLeaveType,
            LeaveBalance,
            LeaveApplication,
            LeaveStatus,
            ApplyLeave,
            ReviewLeave,
            LeaveQuery,
            LeaveListResponse,
            Project,
            ProjectStatus,
            Priority,
            Collaborator,
            CollaboratorRole,
            CollaboratorInput,
            ProjectInput,
            ProjectUpdate,
            ProjectDetail,
            Task,
            TaskStatus,
            TaskInput,
            TaskUpdate,
            ConnectResponse,
            CustomEventRequest,
            ReminderOverride,
            ReminderMethod,
            RemoteEvent
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Auth", description = "Login and token rotation"),
        (name = "Employee", description = "Employee management APIs"),
        (name = "Leave", description = "Leave balances and applications"),
        (name = "Project", description = "Projects and collaborators"),
        (name = "Task", description = "Task assignment and completion"),
        (name = "Calendar", description = "Google Calendar connection and events"),
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}
