use crate::{
    api::{calendar, employee, leave, project, task},
    auth::{handlers, middleware::auth_middleware},
    config::Config,
};
use actix_governor::{
    Governor, GovernorConfigBuilder, PeerIpKeyExtractor, governor::middleware::NoOpMiddleware,
};
use actix_web::{middleware::from_fn, web};
use anyhow::anyhow;
use std::sync::Arc;

type Limiter = Arc<Governor<PeerIpKeyExtractor, NoOpMiddleware>>;

fn build_limiter(requests_per_min: u32) -> anyhow::Result<Limiter> {
    let requests_per_min = requests_per_min.max(1);
    let cfg = GovernorConfigBuilder::default()
        .per_millisecond(60_000 / u64::from(requests_per_min))
        .burst_size(requests_per_min)
        .key_extractor(PeerIpKeyExtractor)
        .finish()
        .ok_or_else(|| anyhow!("invalid rate limit: {requests_per_min}/min"))?;
    Ok(Arc::new(Governor::new(&cfg)))
}

/// Per-IP limiters, built once and shared by every worker.
#[derive(Clone)]
pub struct RateLimits {
    login: Limiter,
    refresh: Limiter,
    callback: Limiter,
    protected: Limiter,
}

impl RateLimits {
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        Ok(Self {
            login: build_limiter(config.rate_login_per_min)?,
            refresh: build_limiter(config.rate_refresh_per_min)?,
            callback: build_limiter(config.rate_callback_per_min)?,
            protected: build_limiter(config.rate_protected_per_min)?,
        })
    }
}

pub fn configure(cfg: &mut web::ServiceConfig, config: &Config, limits: &RateLimits) {
    // Public routes
    cfg.service(
        web::scope("/auth")
            .service(
                web::resource("/login")
                    .wrap(limits.login.clone())
                    .route(web::post().to(handlers::login)),
            )
            .service(
                web::resource("/refresh")
                    .wrap(limits.refresh.clone())
                    .route(web::post().to(handlers::refresh_token)),
            )
            .service(
                web::resource("/logout")
                    .wrap(limits.login.clone())
                    .route(web::post().to(handlers::logout)),
            ),
    );
    cfg.service(
        web::resource("/calendar/callback")
            .wrap(limits.callback.clone())
            .route(web::get().to(calendar::callback)),
    );

    // Protected routes
    cfg.service(
        web::scope(&config.api_prefix)
            .wrap(from_fn(auth_middleware))
            .wrap(limits.protected.clone())
            .configure(protected),
    );
}

/// Routes behind the bearer-token middleware, relative to the API prefix.
pub fn protected(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/employee")
            .service(
                web::resource("")
                    .route(web::post().to(employee::create_employee))
                    .route(web::get().to(employee::list_employees)),
            )
            .service(
                web::resource("/{id}")
                    .route(web::get().to(employee::get_employee))
                    .route(web::delete().to(employee::delete_employee)),
            )
            .service(
                web::resource("/{id}/leave-balances")
                    .route(web::get().to(employee::employee_leave_balances)),
            ),
    )
    .service(
        web::resource("/leave-types")
            .route(web::post().to(leave::create_leave_type))
            .route(web::get().to(leave::list_leave_types)),
    )
    .service(
        web::scope("/leave")
            .service(
                web::resource("")
                    .route(web::get().to(leave::list_leave))
                    .route(web::post().to(leave::apply_leave)),
            )
            // before /{id}
            .service(web::resource("/balances").route(web::get().to(leave::my_balances)))
            .service(web::resource("/{id}").route(web::get().to(leave::get_leave)))
            .service(web::resource("/{id}/approve").route(web::put().to(leave::approve_leave)))
            .service(web::resource("/{id}/reject").route(web::put().to(leave::reject_leave)))
            .service(web::resource("/{id}/cancel").route(web::put().to(leave::cancel_leave))),
    )
    .service(
        web::scope("/project")
            .service(
                web::resource("")
                    .route(web::post().to(project::create_project))
                    .route(web::get().to(project::list_projects)),
            )
            .service(
                web::resource("/{id}")
                    .route(web::get().to(project::get_project))
                    .route(web::put().to(project::update_project))
                    .route(web::delete().to(project::delete_project)),
            )
            .service(
                web::resource("/{id}/collaborators")
                    .route(web::post().to(project::add_collaborator)),
            )
            .service(
                web::resource("/{id}/collaborators/{employee_id}")
                    .route(web::delete().to(project::remove_collaborator)),
            ),
    )
    .service(
        web::scope("/task")
            .service(
                web::resource("")
                    .route(web::post().to(task::create_task))
                    .route(web::get().to(task::list_tasks)),
            )
            .service(
                web::resource("/{id}")
                    .route(web::get().to(task::get_task))
                    .route(web::put().to(task::update_task))
                    .route(web::delete().to(task::delete_task)),
            )
            .service(web::resource("/{id}/complete").route(web::put().to(task::complete_task))),
    )
    .service(
        web::scope("/calendar")
            .service(web::resource("/connect").route(web::get().to(calendar::connect)))
            .service(web::resource("/disconnect").route(web::post().to(calendar::disconnect)))
            .service(
                web::resource("/events/{employee_id}")
                    .route(web::post().to(calendar::create_event)),
            ),
    );
}

// LOGIN
//  ├─ access_token (15 min)
//  └─ refresh_token (7 days, single use)

// API REQUEST
//  └─ Authorization: Bearer access_token

// ACCESS EXPIRED
//  └─ POST /auth/refresh with refresh_token
//       └─ returns a new pair; the old refresh token is revoked
