//! # HTTP Request Handlers Module
//!
//! 컨테이너 핸들(`web::Data<ServiceContainer>`)을 통해 서비스를 해석하는 HTTP 핸들러입니다.
//! 전역 로케이터를 사용하지 않으며, 각 핸들러는 필요한 서비스를 요청 시점에 꺼냅니다.
//!
//! ## 에러 응답
//!
//! 핸들러 내부의 `AppError`는 [`render_error`]를 거쳐 `exception_handler` 서비스로
//! 렌더링됩니다. 요청의 `Accept` 헤더에 따라 JSON 또는 HTML 응답이 만들어지고,
//! `site.debug.display_errors` 설정이 켜져 있으면 상세 정보가 포함됩니다.
//!
//! 핸들러에 도달하기 전의 실패도 같은 경로를 탑니다.
//! JSON 본문 추출 실패는 [`json_error_handler`]가 `ValidationError`로,
//! 매칭되는 라우트가 없는 요청은 [`not_found`]가 `NotFound`로 렌더링합니다.
//!
//! ## 모듈 구성
//!
//! - **`health`**: `GET /health`
//! - **`alerts`**: `GET /api/v1/alerts`, `POST /api/v1/alerts`

pub mod alerts;
pub mod health;

use actix_web::error::{InternalError, JsonPayloadError};
use actix_web::{HttpRequest, HttpResponse, ResponseError, web};
use log::error;

use crate::config::ConfigRepository;
use crate::core::errors::AppError;
use crate::core::registry::ServiceContainer;
use crate::errors::{ExceptionHandlerManager, RenderContext};
use crate::services::core_provider::{CONFIG, EXCEPTION_HANDLER};

/// `exception_handler` 서비스로 에러 응답을 만듭니다.
///
/// 핸들러 매니저 자체를 해석할 수 없으면 `AppError`의 기본 응답을 사용합니다.
pub fn render_error(container: &ServiceContainer, req: &HttpRequest, err: &AppError) -> HttpResponse {
    let ctx = RenderContext::from_request(req, detailed_errors(container));

    match container.get::<ExceptionHandlerManager>(EXCEPTION_HANDLER) {
        Ok(manager) => manager.handle(err, &ctx),
        Err(resolve_error) => {
            error!("Exception handler unavailable: {}", resolve_error);
            err.error_response()
        }
    }
}

/// `site.debug.display_errors` 설정값
pub fn detailed_errors(container: &ServiceContainer) -> bool {
    container
        .get::<ConfigRepository>(CONFIG)
        .ok()
        .and_then(|config| config.get_bool("site.debug.display_errors"))
        .unwrap_or(false)
}

/// `web::JsonConfig` 에러 핸들러
pub fn json_error_handler(err: JsonPayloadError, req: &HttpRequest) -> actix_web::Error {
    let app_error = AppError::ValidationError(err.to_string());
    let response = match req.app_data::<web::Data<ServiceContainer>>() {
        Some(container) => render_error(container, req, &app_error),
        None => app_error.error_response(),
    };
    InternalError::from_response(err, response).into()
}

/// 기본 서비스. 매칭되는 라우트가 없는 요청을 `NotFound`로 렌더링합니다.
pub async fn not_found(container: web::Data<ServiceContainer>, req: HttpRequest) -> HttpResponse {
    let err = AppError::NotFound(format!("{} {}", req.method(), req.path()));
    render_error(&container, &req, &err)
}
