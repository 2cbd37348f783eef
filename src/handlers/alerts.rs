//! 알림 메시지 핸들러
//!
//! 방문자는 세션 쿠키로 식별됩니다. 쿠키가 없는 방문자가 메시지를 추가하면
//! 새 세션 ID가 발급됩니다.

use actix_web::cookie::Cookie;
use actix_web::{HttpRequest, HttpResponse, get, post, web};
use serde::Deserialize;
use serde_json::json;
use validator::Validate;

use crate::alerts::{AlertLevel, AlertStream};
use crate::core::errors::{AppError, AppResult};
use crate::core::registry::ServiceContainer;
use crate::handlers::render_error;
use crate::services::core_provider::{ALERTS, SESSION};
use crate::session::Session;

#[derive(Debug, Deserialize, Validate)]
pub struct AddAlertRequest {
    pub level: AlertLevel,

    #[validate(length(min = 1, max = 500, message = "message must be between 1 and 500 characters"))]
    pub message: String,
}

/// 쌓인 알림을 반환하고 비웁니다.
///
/// `GET /api/v1/alerts`
///
/// ```json
/// { "alerts": [ { "level": "success", "message": "Saved", "created_at": "..." } ] }
/// ```
#[get("")]
pub async fn get_alerts(req: HttpRequest, container: web::Data<ServiceContainer>) -> HttpResponse {
    match take_alerts(&req, &container).await {
        Ok(alerts) => HttpResponse::Ok().json(json!({ "alerts": alerts })),
        Err(e) => render_error(&container, &req, &e),
    }
}

/// 알림을 추가합니다.
///
/// `POST /api/v1/alerts`
///
/// ```bash
/// curl -X POST http://localhost:8080/api/v1/alerts \
///   -H "Content-Type: application/json" \
///   -d '{"level":"info","message":"Welcome back"}'
/// ```
#[post("")]
pub async fn add_alert(
    req: HttpRequest,
    container: web::Data<ServiceContainer>,
    payload: web::Json<AddAlertRequest>,
) -> HttpResponse {
    match push_alert(&req, &container, payload.into_inner()).await {
        Ok(response) => response,
        Err(e) => render_error(&container, &req, &e),
    }
}

async fn take_alerts(req: &HttpRequest, container: &ServiceContainer) -> AppResult<Vec<crate::alerts::Alert>> {
    let session = container.get::<Session>(SESSION)?;
    let Some(owner) = req.cookie(session.cookie_name()) else {
        return Ok(Vec::new());
    };

    container
        .get::<AlertStream>(ALERTS)?
        .get_and_clear_messages(owner.value())
        .await
}

async fn push_alert(
    req: &HttpRequest,
    container: &ServiceContainer,
    payload: AddAlertRequest,
) -> AppResult<HttpResponse> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e.to_string()))?;

    let session = container.get::<Session>(SESSION)?;
    let (owner, issued) = match req.cookie(session.cookie_name()) {
        Some(cookie) => (cookie.value().to_string(), false),
        None => (Session::new_id(), true),
    };

    container
        .get::<AlertStream>(ALERTS)?
        .add_message(&owner, payload.level, &payload.message)
        .await?;

    let mut response = HttpResponse::Created();
    if issued {
        response.cookie(
            Cookie::build(session.cookie_name().to_string(), owner)
                .path("/")
                .http_only(true)
                .finish(),
        );
    }
    Ok(response.json(json!({ "status": "queued" })))
}
