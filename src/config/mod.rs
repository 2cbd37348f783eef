//! # Configuration Module
//!
//! 부트스트랩 계층의 설정 관리를 담당하는 모듈입니다.
//! 환경 변수 기반 기본값을 점 표기법 저장소에 모아 두고,
//! 서비스 팩토리는 이 저장소에서 드라이버와 규칙을 읽습니다.
//!
//! ## 모듈 구성
//!
//! - [`data_config`] - 실행 환경 감지, 서버 바인딩 설정
//! - [`repository`] - 점 표기법 설정 저장소 (`cache.driver` 등)
//! - [`drivers`] - 드라이버 이름 → 열거형 해석
//!
//! ## 사용 예제
//!
//! ```rust,ignore
//! use service_bootstrap::config::{ConfigRepository, CacheDriver};
//!
//! let config = ConfigRepository::from_env();
//! let driver = CacheDriver::from_config(&config)?;
//! ```
//!
//! ## 환경 변수 설정 가이드
//!
//! ```bash
//! export ENVIRONMENT="production"   # development, test, staging, production
//! export HOST="0.0.0.0"
//! export PORT="8080"
//! export CACHE_DRIVER="redis"        # array, file, redis
//! export SESSION_HANDLER="file"      # array, file, redis
//! export ALERT_STORAGE="session"     # cache, session
//! export THROTTLE_STORAGE="memory"   # memory, redis
//! export REDIS_URL="redis://localhost:6379"
//! ```

pub mod data_config;
pub mod drivers;
pub mod repository;

pub use data_config::*;
pub use drivers::*;
pub use repository::ConfigRepository;
