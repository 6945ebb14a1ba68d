use actix_web::{HttpResponse, web};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::auth::auth::AuthUser;
use crate::calendar::events::CustomEventRequest;
use crate::error::{AppError, Result};
use crate::model::calendar::RemoteEvent;
use crate::state::AppState;

#[derive(Serialize, ToSchema)]
pub struct ConnectResponse {
    #[schema(example = "https://accounts.google.com/o/oauth2/auth?client_id=...")]
    pub authorization_url: String,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct CallbackQuery {
    pub code: Option<String>,
    pub state: Option<String>,
    /// Set by Google when the user declines consent
    pub error: Option<String>,
}

/// Connect Google Calendar
///
/// Returns the consent URL the caller should be redirected to.
#[utoipa::path(
    get,
    path = "/api/calendar/connect",
    responses(
        (status = 200, description = "Consent URL", body = ConnectResponse),
        (status = 403, description = "Account is not linked to an employee"),
        (status = 503, description = "Google Calendar integration is not configured")
    ),
    tag = "Calendar",
    security(("bearer_auth" = []))
)]
pub async fn connect(auth: AuthUser, state: web::Data<AppState>) -> Result<HttpResponse> {
    let authorization_url = state.oauth.begin(auth.employee_id()?).await?;
    Ok(HttpResponse::Ok().json(ConnectResponse { authorization_url }))
}

/// OAuth2 callback
#[utoipa::path(
    get,
    path = "/calendar/callback",
    params(CallbackQuery),
    responses(
        (status = 200, description = "Calendar connected", body = Object, example = json!({
            "message": "Google Calendar connected",
            "employee_id": 3
        })),
        (status = 400, description = "Consent declined, or state invalid or expired")
    ),
    tag = "Calendar"
)]
pub async fn callback(
    state: web::Data<AppState>,
    query: web::Query<CallbackQuery>,
) -> Result<HttpResponse> {
    let query = query.into_inner();
    if let Some(error) = query.error {
        tracing::info!(error = %error, "Calendar consent declined");
        return Err(AppError::validation(format!("Authorization failed: {error}")));
    }
    let (Some(oauth_state), Some(code)) = (query.state, query.code) else {
        return Err(AppError::validation("Missing code or state"));
    };

    let employee_id = state.oauth.complete(&oauth_state, &code).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Google Calendar connected",
        "employee_id": employee_id
    })))
}

/// Disconnect Google Calendar
#[utoipa::path(
    post,
    path = "/api/calendar/disconnect",
    responses(
        (status = 204, description = "Grant revoked and credentials removed"),
        (status = 404, description = "Google Calendar is not connected")
    ),
    tag = "Calendar",
    security(("bearer_auth" = []))
)]
pub async fn disconnect(auth: AuthUser, state: web::Data<AppState>) -> Result<HttpResponse> {
    state.credentials.revoke(auth.employee_id()?).await?;
    Ok(HttpResponse::NoContent().finish())
}

/// Add calendar event
///
/// Places an arbitrary event in an employee's connected calendar.
#[utoipa::path(
    post,
    path = "/api/calendar/events/{employee_id}",
    params(("employee_id" = u64, Path, description = "Employee id")),
    request_body = CustomEventRequest,
    responses(
        (status = 201, description = "Event created", body = RemoteEvent),
        (status = 400, description = "Invalid event"),
        (status = 404, description = "Employee not found or calendar not connected"),
        (status = 502, description = "Google rejected the request")
    ),
    tag = "Calendar",
    security(("bearer_auth" = []))
)]
pub async fn create_event(
    auth: AuthUser,
    state: web::Data<AppState>,
    path: web::Path<u64>,
    payload: web::Json<CustomEventRequest>,
) -> Result<HttpResponse> {
    auth.require_admin()?;
    let employee = state.employees.get(path.into_inner()).await?;
    let event = state
        .sync
        .create_custom_event(&employee, payload.into_inner())
        .await?;
    Ok(HttpResponse::Created().json(event))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::testing::{bearer, memory_state, memory_state_with};
    use crate::auth::middleware::auth_middleware;
    use crate::calendar::client::{MockCalendarApi, MockOAuthProvider};
    use crate::config::Config;
    use crate::model::calendar::TokenBundle;
    use crate::model::role::Role;
    use actix_web::{App, http::StatusCode, middleware::from_fn, test};
    use serde_json::{Value, json};

    macro_rules! init_calendar_app {
        ($state:expr) => {
            test::init_service(
                App::new()
                    .app_data($state)
                    .app_data(web::Data::new(Config::for_tests()))
                    .route("/calendar/callback", web::get().to(callback))
                    .service(
                        web::scope("/api")
                            .wrap(from_fn(auth_middleware))
                            .configure(crate::routes::protected),
                    ),
            )
            .await
        };
    }

    fn google() -> MockOAuthProvider {
        let mut provider = MockOAuthProvider::new();
        provider.expect_is_configured().return_const(true);
        provider
            .expect_authorization_url()
            .returning(|state| Ok(format!("https://accounts.example/auth?state={state}")));
        provider.expect_exchange_code().returning(|_| {
            Ok(TokenBundle {
                access_token: "access".into(),
                refresh_token: Some("refresh".into()),
                token_uri: "https://oauth2.googleapis.com/token".into(),
                client_id: "id".into(),
                client_secret: "secret".into(),
                scopes: vec!["https://www.googleapis.com/auth/calendar".into()],
                expiry: None,
            })
        });
        provider.expect_revoke().returning(|_| Ok(()));
        provider
    }

    #[actix_web::test]
    async fn connect_callback_disconnect() {
        let (_store, state) = memory_state_with(google(), MockCalendarApi::new());
        let app = init_calendar_app!(state);

        let connect = test::TestRequest::get()
            .uri("/api/calendar/connect")
            .insert_header(bearer(Role::Employee, Some(7)))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, connect).await;
        let url = body["authorization_url"].as_str().unwrap();
        let oauth_state = url.split("state=").nth(1).unwrap().to_string();

        let bogus = test::TestRequest::get()
            .uri("/calendar/callback?code=abc&state=forged")
            .to_request();
        assert_eq!(test::call_service(&app, bogus).await.status(), StatusCode::BAD_REQUEST);

        let callback = test::TestRequest::get()
            .uri(&format!("/calendar/callback?code=abc&state={oauth_state}"))
            .to_request();
        let connected: Value = test::call_and_read_body_json(&app, callback).await;
        assert_eq!(connected["employee_id"], 7);

        let replay = test::TestRequest::get()
            .uri(&format!("/calendar/callback?code=abc&state={oauth_state}"))
            .to_request();
        assert_eq!(test::call_service(&app, replay).await.status(), StatusCode::BAD_REQUEST);

        let disconnect = || {
            test::TestRequest::post()
                .uri("/api/calendar/disconnect")
                .insert_header(bearer(Role::Employee, Some(7)))
                .to_request()
        };
        assert_eq!(
            test::call_service(&app, disconnect()).await.status(),
            StatusCode::NO_CONTENT
        );
        assert_eq!(
            test::call_service(&app, disconnect()).await.status(),
            StatusCode::NOT_FOUND
        );
    }

    #[actix_web::test]
    async fn unconfigured_integration_and_declined_consent() {
        let (_store, state) = memory_state();
        let app = init_calendar_app!(state);

        let connect = test::TestRequest::get()
            .uri("/api/calendar/connect")
            .insert_header(bearer(Role::Employee, Some(7)))
            .to_request();
        assert_eq!(
            test::call_service(&app, connect).await.status(),
            StatusCode::SERVICE_UNAVAILABLE
        );

        let declined = test::TestRequest::get()
            .uri("/calendar/callback?error=access_denied")
            .to_request();
        let resp = test::call_service(&app, declined).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["message"], json!("Authorization failed: access_denied"));
    }

    #[actix_web::test]
    async fn custom_events_are_admin_only() {
        let (_store, state) = memory_state();
        let app = init_calendar_app!(state);

        let req = test::TestRequest::post()
            .uri("/api/calendar/events/7")
            .insert_header(bearer(Role::Hr, None))
            .set_json(json!({
                "summary": "Quarterly review",
                "start": "2026-02-15T10:00:00",
                "end": "2026-02-15T11:30:00"
            }))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::FORBIDDEN);
    }
}
