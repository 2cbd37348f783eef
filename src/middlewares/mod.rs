//! 미들웨어 모듈
//!
//! ActixWeb 요청 파이프라인에서 사용되는 미들웨어들을 제공합니다.
//!
//! # 제공 미들웨어
//!
//! ### 스로틀 미들웨어 (ThrottleGuard)
//! - 클라이언트 IP로 요청 지문 생성
//! - `throttler` 서비스에 판정과 기록을 한 번에 요청
//! - 거부 시 `exception_handler`로 429 응답 렌더링 (`Retry-After` 포함)
//!
//! # 사용 방법
//!
//! ```rust,ignore
//! use actix_web::{web, App, http::Method};
//! use crate::middlewares::ThrottleGuard;
//!
//! App::new()
//!     .app_data(web::Data::new(container))
//!     .service(
//!         web::scope("/api/v1/alerts")
//!             .wrap(ThrottleGuard::new("alert_request").only(Method::POST))
//!             .service(handlers::alerts::add_alert)
//!     )
//! ```

pub mod throttle_guard;
mod throttle_inner;

pub use throttle_guard::ThrottleGuard;
