use std::sync::Arc;

use crate::calendar::client::{CalendarApi, OAuthProvider};
use crate::calendar::credentials::CredentialStore;
use crate::calendar::oauth::OAuthFlow;
use crate::calendar::retry::RetryPolicy;
use crate::calendar::sync::CalendarSync;
use crate::config::Config;
use crate::repository::mysql::MySqlStore;
use crate::repository::{
    CredentialRepository, EmployeeRepository, EventLinkRepository, LeaveRepository,
    ProjectRepository, TaskRepository, UserRepository,
};
use crate::service::employee::EmployeeService;
use crate::service::ledger::LeaveLedger;
use crate::service::leave::LeaveWorkflow;
use crate::service::project::ProjectService;

/// Repository handles the services are built from.
pub struct Ports {
    pub employees: Arc<dyn EmployeeRepository>,
    pub users: Arc<dyn UserRepository>,
    pub leave: Arc<dyn LeaveRepository>,
    pub projects: Arc<dyn ProjectRepository>,
    pub tasks: Arc<dyn TaskRepository>,
    pub credentials: Arc<dyn CredentialRepository>,
    pub links: Arc<dyn EventLinkRepository>,
}

impl Ports {
    pub fn mysql(store: MySqlStore) -> Self {
        let store = Arc::new(store);
        Self {
            employees: store.clone(),
            users: store.clone(),
            leave: store.clone(),
            projects: store.clone(),
            tasks: store.clone(),
            credentials: store.clone(),
            links: store,
        }
    }

    #[cfg(test)]
    pub fn memory(store: Arc<crate::repository::memory::MemoryStore>) -> Self {
        Self {
            employees: store.clone(),
            users: store.clone(),
            leave: store.clone(),
            projects: store.clone(),
            tasks: store.clone(),
            credentials: store.clone(),
            links: store,
        }
    }
}

/// Everything handlers reach through `web::Data<AppState>`.
pub struct AppState {
    pub users: Arc<dyn UserRepository>,
    pub employees: EmployeeService,
    pub ledger: Arc<LeaveLedger>,
    pub leave: LeaveWorkflow,
    pub projects: ProjectService,
    pub oauth: OAuthFlow,
    pub credentials: Arc<CredentialStore>,
    pub sync: Arc<CalendarSync>,
}

impl AppState {
    pub fn build(
        ports: Ports,
        provider: Arc<dyn OAuthProvider>,
        api: Arc<dyn CalendarApi>,
        config: &Config,
    ) -> Self {
        let ledger = Arc::new(LeaveLedger::new(ports.leave.clone()));
        let credentials = Arc::new(CredentialStore::new(ports.credentials, provider.clone()));
        let sync = Arc::new(CalendarSync::new(
            credentials.clone(),
            api,
            ports.links,
            RetryPolicy::new(config.calendar_retry_attempts, config.calendar_retry_base),
            config.calendar_time_zone.clone(),
        ));

        Self {
            employees: EmployeeService::new(
                ports.employees.clone(),
                ports.users.clone(),
                ports.leave.clone(),
                ledger.clone(),
                credentials.clone(),
                config.employee_initial_password.clone(),
            ),
            leave: LeaveWorkflow::new(ports.leave, ledger.clone()),
            projects: ProjectService::new(ports.projects, ports.tasks, ports.employees, sync.clone()),
            oauth: OAuthFlow::new(provider, credentials.clone(), config.oauth_state_ttl),
            users: ports.users,
            ledger,
            credentials,
            sync,
        }
    }
}
