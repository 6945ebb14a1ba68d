use crate::{
    auth::{
        jwt::{Claims, Subject, TokenType, generate_access_token, generate_refresh_token, verify_token},
        password::verify_password,
    },
    config::Config,
    error::{AppError, Result},
    state::AppState,
};
use actix_web::{HttpRequest, HttpResponse, web};
use chrono::DateTime;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, instrument};
use utoipa::ToSchema;

#[derive(Deserialize, ToSchema)]
pub struct LoginReqDto {
    #[schema(example = "admin")]
    pub username: String,
    pub password: String,
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct LoginResponse {
    pub access_token: String,
    pub refresh_token: String,
}

fn bearer(req: &HttpRequest) -> Option<&str> {
    req.headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
}

fn token_error(e: jsonwebtoken::errors::Error) -> AppError {
    AppError::Internal(format!("token encoding failed: {e}"))
}

/// Issues an access/refresh pair and records the refresh token's jti.
async fn issue_pair(state: &AppState, config: &Config, subject: &Subject) -> Result<LoginResponse> {
    let access_token =
        generate_access_token(subject, &config.jwt_secret, config.access_token_ttl)
            .map_err(token_error)?;
    let (refresh_token, refresh_claims) =
        generate_refresh_token(subject, &config.jwt_secret, config.refresh_token_ttl)
            .map_err(token_error)?;

    let expires_at = i64::try_from(refresh_claims.exp)
        .ok()
        .and_then(|exp| DateTime::from_timestamp(exp, 0))
        .ok_or_else(|| AppError::Internal("refresh token expiry out of range".into()))?;

    debug!(user_id = subject.user_id, jti = %refresh_claims.jti, "Storing refresh token");
    state
        .users
        .store_refresh_token(subject.user_id, &refresh_claims.jti, expires_at)
        .await?;

    Ok(LoginResponse {
        access_token,
        refresh_token,
    })
}

/// Login
#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginReqDto,
    responses(
        (status = 200, description = "Token pair issued", body = LoginResponse),
        (status = 401, description = "Invalid credentials", body = Object, example = json!({
            "message": "Invalid credentials"
        }))
    ),
    tag = "Auth"
)]
#[instrument(
    name = "auth_login",
    skip(state, config, user),
    fields(username = %user.username)
)]
pub async fn login(
    user: web::Json<LoginReqDto>,
    state: web::Data<AppState>,
    config: web::Data<Config>,
) -> Result<HttpResponse> {
    info!("Login request received");

    if user.username.trim().is_empty() || user.password.is_empty() {
        info!("Validation failed: empty username or password");
        return Err(AppError::validation("Username or password required"));
    }

    let username = user.username.trim().to_lowercase();
    let Some(db_user) = state.users.find_by_username(&username).await? else {
        info!("Invalid credentials: user not found");
        return Err(AppError::Unauthorized("Invalid credentials".into()));
    };

    if !db_user.is_active || !verify_password(&user.password, &db_user.password) {
        info!("Invalid credentials: password mismatch or inactive account");
        return Err(AppError::Unauthorized("Invalid credentials".into()));
    }

    let Some(role) = db_user.role() else {
        error!(user_id = db_user.id, role_id = db_user.role_id, "User has an unknown role");
        return Err(AppError::Unauthorized("Invalid credentials".into()));
    };

    let subject = Subject {
        user_id: db_user.id,
        username: db_user.username.clone(),
        role: role.id(),
        employee_id: db_user.employee_id,
    };
    let tokens = issue_pair(&state, &config, &subject).await?;

    // not fatal for the login itself
    if let Err(e) = state.users.touch_last_login(db_user.id).await {
        error!(error = %e, "Failed to update last_login_at");
    }

    info!(user_id = db_user.id, "Login successful");
    Ok(HttpResponse::Ok().json(tokens))
}

/// Verifies a refresh token from the Authorization header.
fn refresh_claims(req: &HttpRequest, config: &Config) -> Option<Claims> {
    let claims = verify_token(bearer(req)?, &config.jwt_secret).ok()?;
    (claims.token_type == TokenType::Refresh).then_some(claims)
}

/// Refresh tokens
#[utoipa::path(
    post,
    path = "/auth/refresh",
    responses(
        (status = 200, description = "Rotated token pair", body = LoginResponse),
        (status = 401, description = "Refresh token missing, invalid or revoked")
    ),
    tag = "Auth",
    security(("bearer_auth" = []))
)]
pub async fn refresh_token(
    req: HttpRequest,
    state: web::Data<AppState>,
    config: web::Data<Config>,
) -> Result<HttpResponse> {
    let Some(claims) = refresh_claims(&req, &config) else {
        return Err(AppError::Unauthorized("Invalid refresh token".into()));
    };

    match state.users.find_refresh_token(&claims.jti).await? {
        Some(record) if !record.revoked && record.user_id == claims.user_id => {}
        _ => {
            info!(user_id = claims.user_id, "Refresh with unknown or revoked token");
            return Err(AppError::Unauthorized("Invalid refresh token".into()));
        }
    }

    // rotate: the presented token is single use
    state.users.revoke_refresh_token(&claims.jti).await?;
    let tokens = issue_pair(&state, &config, &Subject::from(&claims)).await?;

    debug!(user_id = claims.user_id, "Refresh token rotated");
    Ok(HttpResponse::Ok().json(tokens))
}

/// Logout
#[utoipa::path(
    post,
    path = "/auth/logout",
    responses((status = 204, description = "Refresh token revoked (idempotent)")),
    tag = "Auth",
    security(("bearer_auth" = []))
)]
pub async fn logout(
    req: HttpRequest,
    state: web::Data<AppState>,
    config: web::Data<Config>,
) -> Result<HttpResponse> {
    if let Some(claims) = refresh_claims(&req, &config) {
        if let Err(e) = state.users.revoke_refresh_token(&claims.jti).await {
            error!(error = %e, "Failed to revoke refresh token on logout");
        }
    }
    Ok(HttpResponse::NoContent().finish())
}
