//! 세션 저장소
//!
//! `session.handler` 설정으로 메모리(array), 파일(file), Redis(redis) 핸들러를 고릅니다.
//! 세 핸들러 모두 캐시 드라이버를 저장 매체로 재사용하며, 세션 데이터 하나를
//! `session:<id>` 키의 JSON 객체 하나로 저장합니다.
//!
//! ```rust,ignore
//! let session = container.get::<Session>("session")?;
//! let id = Session::new_id();
//!
//! session.put(&id, "site.alerts", &alerts).await?;
//! let alerts: Option<Vec<Alert>> = session.get(&id, "site.alerts").await?;
//! ```

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::caching::redis::RedisClient;
use crate::caching::store::{ArrayStore, CacheStore, FileStore, RedisStore};
use crate::config::{ConfigRepository, SessionHandler};
use crate::core::errors::{AppError, AppResult, ErrorContext};

/// 세션 하나의 데이터
pub type SessionData = Map<String, Value>;

/// 세션 저장 핸들러 인터페이스
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn read(&self, id: &str) -> AppResult<SessionData>;

    async fn write(&self, id: &str, data: &SessionData, lifetime: Duration) -> AppResult<()>;

    async fn destroy(&self, id: &str) -> AppResult<()>;
}

/// 캐시 저장소 위에 구현된 세션 핸들러
pub struct CacheSessionStore {
    store: Arc<dyn CacheStore>,
}

impl CacheSessionStore {
    pub fn new(store: Arc<dyn CacheStore>) -> Self {
        Self { store }
    }

    fn key(id: &str) -> String {
        format!("session:{}", id)
    }
}

#[async_trait]
impl SessionStore for CacheSessionStore {
    async fn read(&self, id: &str) -> AppResult<SessionData> {
        match self.store.get(&Self::key(id)).await? {
            Some(Value::Object(data)) => Ok(data),
            Some(_) => Err(AppError::InternalError(format!("Session '{}' is corrupted", id))),
            None => Ok(SessionData::new()),
        }
    }

    async fn write(&self, id: &str, data: &SessionData, lifetime: Duration) -> AppResult<()> {
        if data.is_empty() {
            return self.destroy(id).await;
        }
        self.store
            .put(&Self::key(id), Value::Object(data.clone()), Some(lifetime))
            .await
    }

    async fn destroy(&self, id: &str) -> AppResult<()> {
        self.store.forget(&Self::key(id)).await
    }
}

/// 설정된 핸들러를 감싼 세션 서비스
pub struct Session {
    handler: SessionHandler,
    store: Arc<dyn SessionStore>,
    cookie_name: String,
    lifetime: Duration,
}

impl Session {
    pub fn new(
        handler: SessionHandler,
        store: Arc<dyn SessionStore>,
        cookie_name: &str,
        lifetime: Duration,
    ) -> Self {
        Self {
            handler,
            store,
            cookie_name: cookie_name.to_string(),
            lifetime,
        }
    }

    /// `session.*` 설정으로 핸들러를 선택합니다.
    ///
    /// 지원하지 않는 핸들러 이름은 `UnsupportedDriver`로 실패합니다.
    pub fn from_config(config: &ConfigRepository) -> AppResult<Self> {
        let handler = SessionHandler::from_config(config)?;
        let minutes: u64 = config.get_as("session.minutes")?.unwrap_or(120);
        let cookie_name = config.get_string_or("session.name", "bootstrap_session");

        let backend: Arc<dyn CacheStore> = match handler {
            SessionHandler::Array => Arc::new(ArrayStore::new()),
            SessionHandler::File => {
                let path = config
                    .get_str("session.file.path")
                    .ok_or_else(|| AppError::ValidationError("session.file.path is not configured".to_string()))?;
                Arc::new(FileStore::new(path)?)
            }
            SessionHandler::Redis => {
                let url = config.get_string_or("redis.url", "redis://localhost:6379");
                let prefix = config.get_string_or("cache.prefix", "bootstrap");
                Arc::new(RedisStore::new(RedisClient::open(&url)?, &prefix))
            }
        };

        debug!("Session created with '{}' handler", handler);
        Ok(Self::new(
            handler,
            Arc::new(CacheSessionStore::new(backend)),
            &cookie_name,
            Duration::from_secs(minutes * 60),
        ))
    }

    /// 새 세션 ID
    pub fn new_id() -> String {
        uuid::Uuid::new_v4().simple().to_string()
    }

    pub fn handler(&self) -> SessionHandler {
        self.handler
    }

    /// 세션 ID를 담는 쿠키 이름
    pub fn cookie_name(&self) -> &str {
        &self.cookie_name
    }

    pub async fn all(&self, id: &str) -> AppResult<SessionData> {
        self.store.read(id).await
    }

    pub async fn get<T: DeserializeOwned>(&self, id: &str, key: &str) -> AppResult<Option<T>> {
        match self.store.read(id).await?.remove(key) {
            Some(value) => serde_json::from_value(value)
                .map(Some)
                .with_context(|| format!("Session value '{}' has an unexpected shape", key)),
            None => Ok(None),
        }
    }

    pub async fn put<T: Serialize>(&self, id: &str, key: &str, value: &T) -> AppResult<()> {
        let value = serde_json::to_value(value).context("Failed to serialize session value")?;
        let mut data = self.store.read(id).await?;
        data.insert(key.to_string(), value);
        self.store.write(id, &data, self.lifetime).await
    }

    pub async fn forget(&self, id: &str, key: &str) -> AppResult<()> {
        let mut data = self.store.read(id).await?;
        if data.remove(key).is_some() {
            self.store.write(id, &data, self.lifetime).await?;
        }
        Ok(())
    }

    pub async fn destroy(&self, id: &str) -> AppResult<()> {
        self.store.destroy(id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Environment;
    use serde_json::json;

    fn array_session() -> Session {
        Session::new(
            SessionHandler::Array,
            Arc::new(CacheSessionStore::new(Arc::new(ArrayStore::new()))),
            "test_session",
            Duration::from_secs(60),
        )
    }

    #[actix_web::test]
    async fn test_put_get_forget() {
        let session = array_session();
        let id = Session::new_id();

        session.put(&id, "user_id", &42).await.unwrap();
        session.put(&id, "theme", &"dark").await.unwrap();
        assert_eq!(session.get::<i32>(&id, "user_id").await.unwrap(), Some(42));

        session.forget(&id, "user_id").await.unwrap();
        assert_eq!(session.get::<i32>(&id, "user_id").await.unwrap(), None);
        assert_eq!(session.all(&id).await.unwrap().len(), 1);
    }

    #[actix_web::test]
    async fn test_sessions_are_isolated_and_destroyable() {
        let session = array_session();
        let (a, b) = (Session::new_id(), Session::new_id());

        session.put(&a, "k", &json!([1, 2])).await.unwrap();
        assert!(session.all(&b).await.unwrap().is_empty());

        session.destroy(&a).await.unwrap();
        assert!(session.all(&a).await.unwrap().is_empty());
    }

    #[test]
    fn test_from_config_selects_handler() {
        let mut config = ConfigRepository::defaults(&Environment::Test);
        let session = Session::from_config(&config).unwrap();
        assert_eq!(session.handler(), SessionHandler::Array);
        assert_eq!(session.cookie_name(), "bootstrap_session");

        config.merge(json!({ "session": { "handler": "database" } }));
        assert!(matches!(
            Session::from_config(&config),
            Err(AppError::UnsupportedDriver { setting: "session.handler", .. })
        ));
    }
}
