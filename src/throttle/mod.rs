//! 요청 스로틀링 모듈
//!
//! 종류별 규칙(`throttles.<type>`)에 따라 같은 주체의 반복 시도를 점진적으로 지연시킵니다.
//!
//! # 사용 예제
//!
//! ```rust,ignore
//! use service_bootstrap::throttle::{RequestFingerprint, Throttler};
//!
//! let throttler = container.get::<Throttler>("throttler")?;
//! let subject = RequestFingerprint::from_ip("203.0.113.7");
//!
//! throttler
//!     .attempt("sign_in_attempt", &subject, Utc::now())
//!     .await?
//!     .into_result("sign_in_attempt")?;
//! ```

pub mod rule;
pub mod store;
pub mod throttler;

pub use rule::{ThrottleMethod, ThrottleRule, ThrottleRuleDefinition};
pub use store::{AttemptKey, AttemptStore, MemoryAttemptStore, RedisAttemptStore, RequestFingerprint, Retention};
pub use throttler::{Decision, Throttler};
