//! 컨테이너에 등록되는 서비스 프로바이더 모듈
//!
//! 코어 프로바이더는 `inventory`로 자동 수집되며, 확장 모듈은 더 높은 `priority`로
//! 자신의 프로바이더를 제출하여 코어 등록을 덮어쓰거나 `extend`로 감쌉니다.
//!
//! # Examples
//!
//! ```rust,ignore
//! struct AccountProvider;
//!
//! impl ServiceProvider for AccountProvider {
//!     fn name(&self) -> &str { "account" }
//!
//!     fn register(&self, container: &ServiceContainer) -> AppResult<()> {
//!         container.extend::<ClassMapper, _>("class_mapper", |mapper, _| {
//!             mapper.set_mapping("user_sprunje", ClassBinding::new::<(), _, _>("UserSprunje", |_| UserSprunje));
//!             Ok(mapper)
//!         })
//!     }
//! }
//!
//! inventory::submit! {
//!     ProviderRegistration { priority: 10, provider: &AccountProvider }
//! }
//! ```

pub mod core_provider;

pub use core_provider::CoreServicesProvider;
