//! 예외 핸들러 디스패치
//!
//! 에러 종류의 계보를 구체적인 것부터 따라가며 처음 만나는 핸들러를 사용하고,
//! 아무것도 없으면 기본 핸들러를 사용합니다.
//!
//! ```text
//! handle(Throttled, ctx)
//!    ├─ Throttled 핸들러?   → 사용
//!    ├─ Http 핸들러?        → 사용
//!    ├─ Any 핸들러?         → 사용
//!    ├─ 기본 핸들러?        → 사용
//!    └─ 없음                → 최소 500 응답 (안전망)
//! ```

use std::collections::HashMap;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, PoisonError, RwLock};

use actix_web::http::{StatusCode, header};
use actix_web::{HttpResponse, ResponseError};
use log::{debug, error};

use crate::core::class_mapper::ClassMapper;
use crate::core::errors::{AppError, AppResult};
use crate::errors::handlers::ExceptionHandler;
use crate::errors::kind::ErrorKind;
use crate::errors::render::{ErrorReport, JsonRenderer, RenderContext, RenderFormat, ResponseRenderer};

type HandlerFactory = Arc<dyn Fn() -> Arc<dyn ExceptionHandler> + Send + Sync>;

/// 에러 종류 → 핸들러 디스패처
pub struct ExceptionHandlerManager {
    handlers: RwLock<HashMap<ErrorKind, HandlerFactory>>,
    default_handler: RwLock<Option<HandlerFactory>>,
    renderers: Arc<ClassMapper>,
}

impl ExceptionHandlerManager {
    /// 렌더러는 `renderers`의 `renderer.<format>` 역할에서 가져옵니다.
    pub fn new(renderers: Arc<ClassMapper>) -> Self {
        Self {
            handlers: RwLock::new(HashMap::new()),
            default_handler: RwLock::new(None),
            renderers,
        }
    }

    /// 종류에 핸들러 팩토리를 등록합니다. 기존 등록은 대체됩니다.
    pub fn register_handler<H, F>(&self, kind: ErrorKind, factory: F)
    where
        H: ExceptionHandler + 'static,
        F: Fn() -> H + Send + Sync + 'static,
    {
        debug!("Exception handler registered for '{}'", kind);
        self.handlers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(kind, erase(factory));
    }

    pub fn set_default_handler<H, F>(&self, factory: F)
    where
        H: ExceptionHandler + 'static,
        F: Fn() -> H + Send + Sync + 'static,
    {
        *self
            .default_handler
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(erase(factory));
    }

    /// 핸들러가 직접 등록된 종류 목록
    pub fn registered_kinds(&self) -> Vec<ErrorKind> {
        let mut kinds: Vec<ErrorKind> = self
            .handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .copied()
            .collect();
        kinds.sort_by_key(|kind| kind.as_str());
        kinds
    }

    /// 이 종류를 처리할 종류. 계보에 없으면 기본 핸들러 여부에 따라 `Any` 또는 `None`.
    pub fn resolve_kind(&self, kind: ErrorKind) -> Option<ErrorKind> {
        self.lookup(kind).map(|(matched, _)| matched)
    }

    fn lookup(&self, kind: ErrorKind) -> Option<(ErrorKind, HandlerFactory)> {
        let handlers = self.handlers.read().unwrap_or_else(PoisonError::into_inner);
        if let Some(found) = kind
            .lineage()
            .into_iter()
            .find_map(|candidate| handlers.get(&candidate).map(|factory| (candidate, factory.clone())))
        {
            return Some(found);
        }
        drop(handlers);

        self.default_handler
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .map(|factory| (ErrorKind::Any, factory))
    }

    fn renderer(&self, format: RenderFormat) -> AppResult<Arc<dyn ResponseRenderer>> {
        self.renderers.create_instance(format.role(), ())
    }

    /// 에러를 처리합니다. 매칭되는 핸들러가 없으면 `NoHandler`로 실패합니다.
    pub fn try_handle(&self, error: &AppError, ctx: &RenderContext) -> AppResult<HttpResponse> {
        let kind = error.kind();
        let (matched, factory) = self
            .lookup(kind)
            .ok_or_else(|| AppError::NoHandler(kind.to_string()))?;

        debug!("Handling '{}' with handler bound to '{}'", kind, matched);
        let handler = factory();
        let renderer = self.renderer(ctx.format)?;
        handler.render(error, ctx, renderer.as_ref())
    }

    /// 에러를 응답으로 바꿉니다. 이 함수 자체는 실패하지 않습니다.
    ///
    /// 디스패치나 핸들러가 실패하면(패닉 포함) 그 사실을 기록하고 최소 응답을 만듭니다.
    pub fn handle(&self, error: &AppError, ctx: &RenderContext) -> HttpResponse {
        match catch_unwind(AssertUnwindSafe(|| self.try_handle(error, ctx))) {
            Ok(Ok(response)) => response,
            Ok(Err(dispatch_error)) => {
                error!(
                    "Exception handling failed for '{}': {} (original error: {})",
                    error.kind(),
                    dispatch_error,
                    error
                );
                fallback_response(error, ctx)
            }
            Err(_) => {
                error!("Exception handler panicked while handling: {}", error);
                fallback_response(error, ctx)
            }
        }
    }

    /// 시작 시점 검증. 모든 `kinds`가 처리 가능하고 렌더러가 바인딩되어 있어야 합니다.
    pub fn validate(&self, kinds: &[ErrorKind]) -> AppResult<()> {
        for kind in kinds {
            if self.lookup(*kind).is_none() {
                return Err(AppError::NoHandler(kind.to_string()));
            }
        }
        for format in [RenderFormat::Json, RenderFormat::Html] {
            self.renderers.get_class(format.role())?;
        }
        Ok(())
    }
}

fn erase<H, F>(factory: F) -> HandlerFactory
where
    H: ExceptionHandler + 'static,
    F: Fn() -> H + Send + Sync + 'static,
{
    Arc::new(move || Arc::new(factory()) as Arc<dyn ExceptionHandler>)
}

/// 안전망 응답. 클래스 매퍼를 거치지 않고 내장 JSON 렌더러를 사용합니다.
fn fallback_response(error: &AppError, ctx: &RenderContext) -> HttpResponse {
    let status = error.status_code();
    let message = if ctx.detailed_errors {
        error.to_string()
    } else {
        status.canonical_reason().unwrap_or("Error").to_string()
    };
    let report = ErrorReport::new(status, error.kind(), message);

    match JsonRenderer.render(&report) {
        Ok(body) => HttpResponse::build(status)
            .insert_header((header::CONTENT_TYPE, JsonRenderer.content_type()))
            .body(body),
        Err(_) => HttpResponse::build(StatusCode::INTERNAL_SERVER_ERROR)
            .insert_header((header::CONTENT_TYPE, "text/plain; charset=utf-8"))
            .body("Internal Server Error"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::class_mapper::ClassBinding;
    use crate::errors::handlers::{GenericExceptionHandler, HttpExceptionHandler, ThrottleExceptionHandler};
    use crate::errors::render::{HtmlRenderer, RenderFormat};
    use actix_web::body::to_bytes;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn renderers() -> Arc<ClassMapper> {
        let mapper = ClassMapper::new();
        mapper.set_mapping(
            "renderer.json",
            ClassBinding::new::<(), _, _>("JsonRenderer", |_| Arc::new(JsonRenderer) as Arc<dyn ResponseRenderer>),
        );
        mapper.set_mapping(
            "renderer.html",
            ClassBinding::new::<(), _, _>("HtmlRenderer", |_| Arc::new(HtmlRenderer) as Arc<dyn ResponseRenderer>),
        );
        Arc::new(mapper)
    }

    fn ctx() -> RenderContext {
        RenderContext::new(false, RenderFormat::Json)
    }

    /// 호출 여부를 기록하는 핸들러
    struct Tagged {
        tag: &'static str,
    }

    impl ExceptionHandler for Tagged {
        fn report(&self, error: &AppError, _ctx: &RenderContext) -> ErrorReport {
            ErrorReport::new(StatusCode::IM_A_TEAPOT, error.kind(), self.tag)
        }
    }

    async fn message_of(response: HttpResponse) -> String {
        let body = to_bytes(response.into_body()).await.unwrap();
        let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
        value["message"].as_str().unwrap_or_default().to_string()
    }

    #[actix_web::test]
    async fn test_most_specific_kind_wins() {
        let manager = ExceptionHandlerManager::new(renderers());
        manager.set_default_handler(|| Tagged { tag: "default" });
        manager.register_handler(ErrorKind::Http, || Tagged { tag: "http" });
        manager.register_handler(ErrorKind::Throttled, || Tagged { tag: "throttled" });

        let throttled = AppError::Throttled {
            throttle: "sign_in_attempt".to_string(),
            delay_until: chrono::Utc::now(),
        };
        let not_found = AppError::NotFound("page".to_string());
        let internal = AppError::InternalError("boom".to_string());

        assert_eq!(message_of(manager.handle(&throttled, &ctx())).await, "throttled");
        assert_eq!(message_of(manager.handle(&not_found, &ctx())).await, "http");
        assert_eq!(message_of(manager.handle(&internal, &ctx())).await, "default");
        assert_eq!(manager.resolve_kind(ErrorKind::Validation), Some(ErrorKind::Http));
    }

    #[test]
    fn test_missing_handler_is_detectable() {
        let manager = ExceptionHandlerManager::new(renderers());
        manager.register_handler(ErrorKind::Http, || HttpExceptionHandler);

        let error = AppError::UnknownService("mailer".to_string());
        assert!(matches!(
            manager.try_handle(&error, &ctx()),
            Err(AppError::NoHandler(kind)) if kind == "unknown_service"
        ));
        assert!(matches!(
            manager.validate(&[ErrorKind::NotFound, ErrorKind::Redis]),
            Err(AppError::NoHandler(kind)) if kind == "redis"
        ));

        manager.set_default_handler(|| GenericExceptionHandler);
        assert!(manager.validate(&[ErrorKind::NotFound, ErrorKind::Redis]).is_ok());
    }

    #[test]
    fn test_validate_requires_renderers() {
        let manager = ExceptionHandlerManager::new(Arc::new(ClassMapper::new()));
        manager.set_default_handler(|| GenericExceptionHandler);

        assert!(matches!(manager.validate(&[]), Err(AppError::UnknownRole(_))));
    }

    #[test]
    fn test_handle_never_fails_without_handlers() {
        let manager = ExceptionHandlerManager::new(renderers());
        let response = manager.handle(&AppError::InternalError("boom".to_string()), &ctx());

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_handle_survives_panicking_handler() {
        struct Panicking;
        impl ExceptionHandler for Panicking {
            fn report(&self, _error: &AppError, _ctx: &RenderContext) -> ErrorReport {
                panic!("handler bug");
            }
        }

        let manager = ExceptionHandlerManager::new(renderers());
        manager.set_default_handler(|| Panicking);
        let response = manager.handle(&AppError::NotFound("x".to_string()), &ctx());

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_handler_factory_runs_per_error() {
        static CREATED: AtomicUsize = AtomicUsize::new(0);

        let manager = ExceptionHandlerManager::new(renderers());
        manager.register_handler(ErrorKind::Throttled, || {
            CREATED.fetch_add(1, Ordering::SeqCst);
            ThrottleExceptionHandler
        });

        let error = AppError::Throttled {
            throttle: "t".to_string(),
            delay_until: chrono::Utc::now(),
        };
        manager.handle(&error, &ctx());
        manager.handle(&error, &ctx());

        assert_eq!(CREATED.load(Ordering::SeqCst), 2);
        assert_eq!(manager.registered_kinds(), vec![ErrorKind::Throttled]);
    }

    #[test]
    fn test_html_format_uses_html_renderer() {
        let manager = ExceptionHandlerManager::new(renderers());
        manager.set_default_handler(|| GenericExceptionHandler);

        let response = manager.handle(
            &AppError::NotFound("x".to_string()),
            &RenderContext::new(false, RenderFormat::Html),
        );

        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "text/html; charset=utf-8"
        );
    }
}
