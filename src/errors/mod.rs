//! 예외 핸들러 디스패치 모듈
//!
//! [`AppError`](crate::core::errors::AppError)를 종류 계층에 따라 핸들러에 연결하고,
//! 요청 형식(JSON/HTML)에 맞는 응답으로 렌더링합니다.
//!
//! # 사용 예제
//!
//! ```rust,ignore
//! use service_bootstrap::errors::{ErrorKind, ExceptionHandlerManager, RenderContext};
//!
//! let manager = container.get::<ExceptionHandlerManager>("exception_handler")?;
//! manager.register_handler(ErrorKind::NotFound, || MyNotFoundHandler);
//!
//! let ctx = RenderContext::from_request(&req, config.get_bool("site.debug.display_errors").unwrap_or(false));
//! let response = manager.handle(&error, &ctx);
//! ```

pub mod dispatch;
pub mod handlers;
pub mod kind;
pub mod render;

pub use dispatch::ExceptionHandlerManager;
pub use handlers::{ExceptionHandler, GenericExceptionHandler, HttpExceptionHandler, ThrottleExceptionHandler};
pub use kind::ErrorKind;
pub use render::{ErrorDetails, ErrorReport, HtmlRenderer, JsonRenderer, RenderContext, RenderFormat, ResponseRenderer};
