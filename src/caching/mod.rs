//! 캐싱 계층 모듈
//!
//! `cache.driver` 설정에 따라 선택되는 캐시 저장소와
//! 여러 드라이버가 공유하는 Redis 클라이언트를 제공합니다.
//!
//! # 사용 예제
//!
//! ```rust,ignore
//! use service_bootstrap::caching::Cache;
//!
//! let cache = container.get::<Cache>("cache")?;
//! cache.put("user:123", &user_data, Some(Duration::from_secs(3600))).await?;
//!
//! let cached_user: Option<User> = cache.get("user:123").await?;
//! ```
//!
//! # 환경 설정
//!
//! ```bash
//! CACHE_DRIVER=redis                # array, file, redis
//! REDIS_URL=redis://localhost:6379  # 기본값
//! ```

pub mod redis;
pub mod store;

pub use store::{ArrayStore, Cache, CacheStore, FileStore, RedisStore};
