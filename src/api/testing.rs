//! Handler test harness: in-memory state, seeded logins and bearer tokens.

use std::sync::Arc;

use actix_web::web;

use crate::auth::jwt::{Subject, generate_access_token};
use crate::auth::password::hash_password;
use crate::calendar::client::{MockCalendarApi, MockOAuthProvider};
use crate::config::Config;
use crate::model::role::Role;
use crate::model::user::NewUser;
use crate::repository::UserRepository;
use crate::repository::memory::MemoryStore;
use crate::state::{AppState, Ports};

/// State over a fresh store with the calendar integration switched off.
pub fn memory_state() -> (Arc<MemoryStore>, web::Data<AppState>) {
    let mut provider = MockOAuthProvider::new();
    provider.expect_is_configured().return_const(false);
    memory_state_with(provider, MockCalendarApi::new())
}

pub fn memory_state_with(
    provider: MockOAuthProvider,
    api: MockCalendarApi,
) -> (Arc<MemoryStore>, web::Data<AppState>) {
    let store = Arc::new(MemoryStore::new());
    let state = AppState::build(
        Ports::memory(store.clone()),
        Arc::new(provider),
        Arc::new(api),
        &Config::for_tests(),
    );
    (store, web::Data::new(state))
}

pub async fn seed_user(
    store: &MemoryStore,
    username: &str,
    password: &str,
    role: Role,
    employee_id: Option<u64>,
) -> u64 {
    store
        .insert(&NewUser {
            username: username.into(),
            password_hash: hash_password(password).unwrap(),
            role,
            employee_id,
        })
        .await
        .unwrap()
}

/// `Authorization` header for a caller with `role`.
pub fn bearer(role: Role, employee_id: Option<u64>) -> (&'static str, String) {
    let token = generate_access_token(
        &Subject {
            user_id: 1,
            username: format!("{role}-user"),
            role: role.id(),
            employee_id,
        },
        &Config::for_tests().jwt_secret,
        300,
    )
    .unwrap();
    ("Authorization", format!("Bearer {token}"))
}

/// Initializes the protected API under `/api` with the auth middleware.
macro_rules! init_api {
    ($state:expr) => {
        actix_web::test::init_service(
            actix_web::App::new()
                .app_data($state)
                .app_data(actix_web::web::Data::new($crate::config::Config::for_tests()))
                .service(
                    actix_web::web::scope("/api")
                        .wrap(actix_web::middleware::from_fn(
                            $crate::auth::middleware::auth_middleware,
                        ))
                        .configure($crate::routes::protected),
                ),
        )
        .await
    };
}

pub(crate) use init_api;
