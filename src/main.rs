use actix_web::middleware::{Logger, NormalizePath};
use actix_web::web::Data;
use actix_web::{App, HttpServer};
use std::sync::Arc;

mod api;
mod auth;
mod calendar;
mod config;
mod db;
mod docs;
mod error;
mod model;
mod repository;
mod routes;
mod service;
mod state;

use auth::password::hash_password;
use calendar::client::GoogleClient;
use config::Config;
use db::init_db;
use model::role::Role;
use model::user::NewUser;
use repository::mysql::MySqlStore;
use routes::RateLimits;
use state::{AppState, Ports};

use crate::docs::ApiDoc;
use tracing::{info, warn};
use tracing_appender::rolling;
use tracing_subscriber::EnvFilter;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// Creates the configured admin login unless the username is taken.
async fn bootstrap_admin(state: &AppState, config: &Config) -> anyhow::Result<()> {
    let Some((username, password)) = &config.bootstrap_admin else {
        return Ok(());
    };
    let username = username.trim().to_lowercase();
    if state.users.find_by_username(&username).await?.is_some() {
        info!(%username, "Bootstrap admin already exists");
        return Ok(());
    }

    state
        .users
        .insert(&NewUser {
            username: username.clone(),
            password_hash: hash_password(password)?,
            role: Role::Admin,
            employee_id: None,
        })
        .await?;
    info!(%username, "Bootstrap admin created");
    Ok(())
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;

    // Rolling daily log
    let file_appender = rolling::daily("logs", "app.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_target(false) // removes module path
        .with_level(true)
        .init();

    info!("Server starting...");

    let pool = init_db(&config.database_url).await?;

    if config.google.is_none() {
        warn!("GOOGLE_CLIENT_ID/GOOGLE_CLIENT_SECRET not set; calendar sync is disabled");
    }
    let google = Arc::new(GoogleClient::new(
        config.google.clone(),
        config.calendar_http_timeout,
    )?);

    let state = Data::new(AppState::build(
        Ports::mysql(MySqlStore::new(pool)),
        google.clone(),
        google,
        &config,
    ));
    bootstrap_admin(&state, &config).await?;

    let limits = RateLimits::from_config(&config)?;
    let server_addr = config.server_addr.clone();
    let config_data = Data::new(config);

    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .wrap(NormalizePath::trim())
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}") // wildcard matches the JS/CSS assets
                    .url("/api-doc/openapi.json", ApiDoc::openapi()),
            )
            .app_data(state.clone())
            .app_data(config_data.clone())
            .configure(|cfg| routes::configure(cfg, &config_data, &limits))
    })
    .bind(server_addr)?
    .run()
    .await?;

    Ok(())
}
