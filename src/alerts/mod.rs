//! 사용자 알림 메시지 스트림
//!
//! 다음 요청에서 보여줄 알림 메시지("저장되었습니다" 등)를 모아둡니다.
//! `alert.storage` 설정에 따라 세션 또는 캐시에 보관하며, 어느 쪽이든
//! 메시지는 방문자(세션 ID)별로 분리됩니다.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::caching::Cache;
use crate::config::AlertStorage;
use crate::core::errors::AppResult;
use crate::core::keyed_lock::KeyedLocks;
use crate::session::Session;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertLevel {
    Success,
    Info,
    Warning,
    Danger,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub level: AlertLevel,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

enum AlertBackend {
    Cache(Arc<Cache>),
    Session(Arc<Session>),
}

/// 방문자별 알림 메시지 저장소
///
/// 추가와 비우기는 읽고-쓰는 작업이므로 방문자별로 직렬화됩니다.
/// 락은 프로세스 안에서만 유효합니다.
pub struct AlertStream {
    key: String,
    backend: AlertBackend,
    locks: KeyedLocks<String>,
}

impl AlertStream {
    /// 캐시에 `<key>:<owner>`로 보관합니다.
    pub fn with_cache(key: &str, cache: Arc<Cache>) -> Self {
        Self {
            key: key.to_string(),
            backend: AlertBackend::Cache(cache),
            locks: KeyedLocks::new(),
        }
    }

    /// 방문자의 세션에 `key` 항목으로 보관합니다.
    pub fn with_session(key: &str, session: Arc<Session>) -> Self {
        Self {
            key: key.to_string(),
            backend: AlertBackend::Session(session),
            locks: KeyedLocks::new(),
        }
    }

    pub fn storage(&self) -> AlertStorage {
        match self.backend {
            AlertBackend::Cache(_) => AlertStorage::Cache,
            AlertBackend::Session(_) => AlertStorage::Session,
        }
    }

    pub async fn add_message(&self, owner: &str, level: AlertLevel, message: &str) -> AppResult<()> {
        let alert = Alert {
            level,
            message: message.to_string(),
            created_at: Utc::now(),
        };

        self.locks
            .with_lock(&owner.to_string(), move || async move {
                let mut alerts = self.messages(owner).await?;
                alerts.push(alert);
                self.save(owner, &alerts).await
            })
            .await
    }

    /// 쌓인 메시지를 지우지 않고 반환합니다.
    pub async fn messages(&self, owner: &str) -> AppResult<Vec<Alert>> {
        let stored: Option<Vec<Alert>> = match &self.backend {
            AlertBackend::Cache(cache) => cache.get(&self.cache_key(owner)).await?,
            AlertBackend::Session(session) => session.get(owner, &self.key).await?,
        };
        Ok(stored.unwrap_or_default())
    }

    pub async fn reset(&self, owner: &str) -> AppResult<()> {
        match &self.backend {
            AlertBackend::Cache(cache) => cache.forget(&self.cache_key(owner)).await,
            AlertBackend::Session(session) => session.forget(owner, &self.key).await,
        }
    }

    /// 메시지를 반환하고 비웁니다.
    pub async fn get_and_clear_messages(&self, owner: &str) -> AppResult<Vec<Alert>> {
        self.locks
            .with_lock(&owner.to_string(), move || async move {
                let alerts = self.messages(owner).await?;
                if !alerts.is_empty() {
                    self.reset(owner).await?;
                }
                Ok(alerts)
            })
            .await
    }

    async fn save(&self, owner: &str, alerts: &[Alert]) -> AppResult<()> {
        match &self.backend {
            AlertBackend::Cache(cache) => cache.put(&self.cache_key(owner), &alerts, None).await,
            AlertBackend::Session(session) => session.put(owner, &self.key, &alerts).await,
        }
    }

    fn cache_key(&self, owner: &str) -> String {
        format!("{}:{}", self.key, owner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::caching::{ArrayStore, CacheStore};
    use crate::config::{CacheDriver, SessionHandler};
    use crate::session::CacheSessionStore;
    use async_trait::async_trait;
    use futures_util::future::join_all;
    use serde_json::Value;
    use std::time::Duration;

    /// 읽기마다 양보하여 읽기와 쓰기 사이에 다른 요청이 끼어들 수 있는 저장소
    struct YieldingStore(ArrayStore);

    #[async_trait]
    impl CacheStore for YieldingStore {
        async fn get(&self, key: &str) -> AppResult<Option<Value>> {
            let value = self.0.get(key).await?;
            actix_web::rt::time::sleep(Duration::from_millis(1)).await;
            Ok(value)
        }

        async fn put(&self, key: &str, value: Value, ttl: Option<Duration>) -> AppResult<()> {
            self.0.put(key, value, ttl).await
        }

        async fn forget(&self, key: &str) -> AppResult<()> {
            self.0.forget(key).await
        }

        async fn flush(&self) -> AppResult<()> {
            self.0.flush().await
        }
    }

    fn streams() -> Vec<AlertStream> {
        let cache = Arc::new(Cache::new(CacheDriver::Array, Arc::new(ArrayStore::new())));
        let session = Arc::new(Session::new(
            SessionHandler::Array,
            Arc::new(CacheSessionStore::new(Arc::new(ArrayStore::new()))),
            "s",
            Duration::from_secs(60),
        ));
        vec![
            AlertStream::with_cache("site.alerts", cache),
            AlertStream::with_session("site.alerts", session),
        ]
    }

    #[actix_web::test]
    async fn test_get_and_clear_messages() {
        for alerts in streams() {
            alerts.add_message("visitor", AlertLevel::Success, "Saved").await.unwrap();
            alerts.add_message("visitor", AlertLevel::Danger, "Oops").await.unwrap();

            let first = alerts.get_and_clear_messages("visitor").await.unwrap();
            assert_eq!(first.len(), 2, "storage {}", alerts.storage());
            assert_eq!(first[0].message, "Saved");
            assert_eq!(first[1].level, AlertLevel::Danger);

            assert!(alerts.get_and_clear_messages("visitor").await.unwrap().is_empty());
        }
    }

    #[actix_web::test]
    async fn test_messages_are_scoped_per_owner() {
        for alerts in streams() {
            alerts.add_message("alice", AlertLevel::Info, "Hi Alice").await.unwrap();

            assert_eq!(alerts.messages("alice").await.unwrap().len(), 1);
            assert!(alerts.messages("bob").await.unwrap().is_empty());
        }
    }

    #[actix_web::test]
    async fn test_concurrent_adds_keep_every_message() {
        let cache = Arc::new(Cache::new(CacheDriver::Array, Arc::new(YieldingStore(ArrayStore::new()))));
        let alerts = AlertStream::with_cache("site.alerts", cache);

        let messages: Vec<String> = (0..10).map(|n| format!("message {}", n)).collect();
        let adds = messages
            .iter()
            .map(|message| alerts.add_message("visitor", AlertLevel::Info, message));
        for result in join_all(adds).await {
            result.unwrap();
        }

        assert_eq!(alerts.get_and_clear_messages("visitor").await.unwrap().len(), 10);
    }
}
