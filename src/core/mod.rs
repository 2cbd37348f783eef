//! # Core Framework Module
//!
//! 부트스트랩 계층의 핵심 기능을 제공하는 모듈입니다.
//!
//! ## 모듈 구성
//!
//! ### [`registry`] - 의존성 주입 컨테이너
//! - **ServiceContainer**: 이름 기반 지연 생성 싱글톤 컨테이너
//! - **extend**: 기존 팩토리를 감싸는 팩토리 체인
//! - **ServiceProvider**: `inventory` 기반 프로바이더 레이어링
//!
//! ### [`class_mapper`] - 역할 → 구현체 매핑
//! - **ClassMapper**: 확장 모듈이 구현체를 교체할 수 있는 역할 테이블
//!
//! ### [`keyed_lock`] - 키별 비동기 임계 구역
//! - **KeyedLocks**: 스로틀 판정/기록, 알림 추가처럼 읽고-쓰는 작업을 키 단위로 직렬화
//!
//! ### [`errors`] - 에러 처리 시스템
//! - **AppError**: 구성/해석/HTTP 에러를 포괄하는 열거형
//! - **AppResult**: `Result<T, AppError>` 별칭
//!
//! ## 사용 예제
//!
//! ```rust,ignore
//! use service_bootstrap::core::{ServiceContainer, ClassMapper, AppResult};
//!
//! fn bootstrap() -> AppResult<ServiceContainer> {
//!     let container = ServiceContainer::discover()?;
//!     let mapper = container.get::<ClassMapper>("class_mapper")?;
//!     println!("roles: {:?}", mapper.roles());
//!     Ok(container)
//! }
//! ```

pub mod class_mapper;
pub mod errors;
pub mod keyed_lock;
pub mod registry;

pub use class_mapper::{ClassBinding, ClassMapper};
pub use errors::{AppError, AppResult, ErrorContext};
pub use keyed_lock::KeyedLocks;
pub use registry::{ProviderRegistration, ServiceContainer, ServiceProvider};
