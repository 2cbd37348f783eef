//! 서비스 부트스트랩 계층
//!
//! 웹 애플리케이션의 런타임 의존성(설정, 캐시, 세션, 로거, 알림, 스로틀러,
//! 에러 핸들러)을 이름 기반 컨테이너에 등록하고 연결하는 계층입니다.
//! 확장 모듈은 역할 이름이나 서비스 이름으로 코어 구현을 교체하거나 감쌀 수 있습니다.
//!
//! # Features
//!
//! - **Class Mapper**: 역할 이름 → 구현체 바인딩, 나중 등록이 우선
//! - **Service Container**: 지연 생성 싱글톤, `extend`로 팩토리 체인 확장
//! - **Throttle**: 종류별 규칙에 따른 점진적 지연, 판정과 기록의 원자적 수행
//! - **Exception Dispatch**: 가장 구체적인 에러 종류의 핸들러 선택, 기본 핸들러 폴백
//! - **Drivers**: `cache.driver`, `session.handler`, `alert.storage`, `throttle.storage`
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐
//! │   HTTP Routes   │ ← /health, /api/v1/alerts (+ ThrottleGuard)
//! └─────────────────┘
//!          │
//!          ▼
//! ┌─────────────────┐
//! │ServiceContainer │ ← web::Data로 전달되는 명시적 핸들
//! └─────────────────┘
//!          │
//!          ▼
//! ┌─────────────────┐
//! │    Providers    │ ← inventory로 수집, priority 순서로 적용
//! └─────────────────┘
//!          │
//!          ▼
//! ┌─────────────────┐
//! │ Services/Stores │ ← cache, session, alerts, throttler, exception_handler
//! └─────────────────┘
//! ```
//!
//! # Examples
//!
//! ```rust,ignore
//! use service_bootstrap::core::ServiceContainer;
//! use service_bootstrap::throttle::{RequestFingerprint, Throttler};
//!
//! let container = ServiceContainer::discover()?;
//! let throttler = container.get::<Throttler>("throttler")?;
//!
//! let decision = throttler
//!     .attempt("sign_in_attempt", &RequestFingerprint::from_ip("203.0.113.7"), chrono::Utc::now())
//!     .await?;
//! ```

pub mod alerts;
pub mod caching;
pub mod config;
pub mod core;
pub mod errors;
pub mod handlers;
pub mod logging;
pub mod middlewares;
pub mod routes;
pub mod services;
pub mod session;
pub mod throttle;
pub mod utils;
