//! 기본 예외 핸들러
//!
//! - [`GenericExceptionHandler`]: 기본 핸들러. 상세 모드가 아니면 서버 에러 메시지를 숨깁니다.
//! - [`HttpExceptionHandler`]: 클라이언트 에러. 메시지를 그대로 노출합니다.
//! - [`ThrottleExceptionHandler`]: 429와 `Retry-After` 헤더.

use actix_web::HttpResponse;
use actix_web::ResponseError;
use actix_web::http::header::{self, HeaderName};
use chrono::Utc;
use log::{error, warn};

use crate::core::errors::{AppError, AppResult};
use crate::errors::render::{ErrorDetails, ErrorReport, RenderContext, ResponseRenderer};

/// 에러 종류별 응답 생성기
pub trait ExceptionHandler: Send + Sync {
    /// 응답에 담을 내용을 만듭니다.
    fn report(&self, error: &AppError, ctx: &RenderContext) -> ErrorReport;

    /// 추가 응답 헤더
    fn headers(&self, _error: &AppError) -> Vec<(HeaderName, String)> {
        Vec::new()
    }

    fn render(
        &self,
        error: &AppError,
        ctx: &RenderContext,
        renderer: &dyn ResponseRenderer,
    ) -> AppResult<HttpResponse> {
        let report = self.report(error, ctx);
        log_report(error, &report);

        let body = renderer.render(&report)?;
        let mut response = HttpResponse::build(report.status);
        response.insert_header((header::CONTENT_TYPE, renderer.content_type()));
        for pair in self.headers(error) {
            response.insert_header(pair);
        }
        Ok(response.body(body))
    }
}

/// 서버 에러는 `error`, 그 외는 `warn`으로 기록합니다.
pub(crate) fn log_report(error: &AppError, report: &ErrorReport) {
    if report.status.is_server_error() {
        error!("[{}] {} ({}): {}", report.reference, report.code, error.kind(), error);
    } else {
        warn!("[{}] {} ({}): {}", report.reference, report.code, error.kind(), error);
    }
}

fn details_for(error: &AppError, ctx: &RenderContext) -> Option<ErrorDetails> {
    ctx.detailed_errors.then(|| ErrorDetails {
        description: format!("{:?}", error),
        lineage: error.kind().lineage(),
    })
}

fn attach_details(report: ErrorReport, error: &AppError, ctx: &RenderContext) -> ErrorReport {
    match details_for(error, ctx) {
        Some(details) => report.with_details(details),
        None => report,
    }
}

#[derive(Debug, Default)]
pub struct GenericExceptionHandler;

impl ExceptionHandler for GenericExceptionHandler {
    fn report(&self, error: &AppError, ctx: &RenderContext) -> ErrorReport {
        let status = error.status_code();
        let message = if ctx.detailed_errors || !status.is_server_error() {
            error.to_string()
        } else {
            "The server encountered an unexpected error. Please try again later.".to_string()
        };

        attach_details(ErrorReport::new(status, error.kind(), message), error, ctx)
    }
}

#[derive(Debug, Default)]
pub struct HttpExceptionHandler;

impl ExceptionHandler for HttpExceptionHandler {
    fn report(&self, error: &AppError, ctx: &RenderContext) -> ErrorReport {
        attach_details(
            ErrorReport::new(error.status_code(), error.kind(), error.to_string()),
            error,
            ctx,
        )
    }
}

#[derive(Debug, Default)]
pub struct ThrottleExceptionHandler;

impl ExceptionHandler for ThrottleExceptionHandler {
    fn report(&self, error: &AppError, ctx: &RenderContext) -> ErrorReport {
        let message = match error {
            AppError::Throttled { delay_until, .. } => format!(
                "Too many attempts. Please wait until {} before trying again.",
                delay_until.to_rfc3339()
            ),
            other => other.to_string(),
        };

        attach_details(ErrorReport::new(error.status_code(), error.kind(), message), error, ctx)
    }

    fn headers(&self, error: &AppError) -> Vec<(HeaderName, String)> {
        match error {
            AppError::Throttled { delay_until, .. } => {
                let millis = (*delay_until - Utc::now()).num_milliseconds().max(0);
                let seconds = (millis + 999) / 1000;
                vec![(header::RETRY_AFTER, seconds.to_string())]
            }
            _ => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::render::{JsonRenderer, RenderFormat};
    use actix_web::body::to_bytes;
    use actix_web::http::StatusCode;

    fn json_ctx(detailed_errors: bool) -> RenderContext {
        RenderContext::new(detailed_errors, RenderFormat::Json)
    }

    #[test]
    fn test_generic_handler_hides_server_error_messages() {
        let error = AppError::InternalError("db password leaked".to_string());

        let hidden = GenericExceptionHandler.report(&error, &json_ctx(false));
        assert_eq!(hidden.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!hidden.message.contains("password"));
        assert!(hidden.details.is_none());

        let detailed = GenericExceptionHandler.report(&error, &json_ctx(true));
        assert!(detailed.message.contains("password"));
        assert!(detailed.details.is_some());
    }

    #[test]
    fn test_http_handler_exposes_client_message() {
        let error = AppError::NotFound("alert stream".to_string());
        let report = HttpExceptionHandler.report(&error, &json_ctx(false));

        assert_eq!(report.status, StatusCode::NOT_FOUND);
        assert_eq!(report.message, "Not found: alert stream");
    }

    #[actix_web::test]
    async fn test_throttle_handler_sets_retry_after() {
        let error = AppError::Throttled {
            throttle: "sign_in_attempt".to_string(),
            delay_until: Utc::now() + chrono::Duration::seconds(30),
        };

        let response = ThrottleExceptionHandler
            .render(&error, &json_ctx(false), &JsonRenderer)
            .unwrap();

        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        let retry_after: i64 = response
            .headers()
            .get(header::RETRY_AFTER)
            .unwrap()
            .to_str()
            .unwrap()
            .parse()
            .unwrap();
        assert!((29..=30).contains(&retry_after));

        let body = to_bytes(response.into_body()).await.unwrap();
        let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(value["error"], "throttled");
    }
}
