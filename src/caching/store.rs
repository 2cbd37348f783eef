//! 캐시 저장소 드라이버
//!
//! `cache.driver` 설정에 따라 메모리(array), 파일(file), Redis(redis) 저장소 중
//! 하나를 선택합니다. 모든 드라이버는 JSON 값을 저장하며, 타입 변환은
//! [`Cache`]가 담당합니다.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use actix_web::web;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::debug;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::caching::redis::RedisClient;
use crate::config::{CacheDriver, ConfigRepository};
use crate::core::errors::{AppError, AppResult, ErrorContext};

/// 캐시 저장소 드라이버 인터페이스
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, key: &str) -> AppResult<Option<Value>>;

    /// `ttl`이 `None`이면 만료되지 않습니다.
    async fn put(&self, key: &str, value: Value, ttl: Option<Duration>) -> AppResult<()>;

    async fn forget(&self, key: &str) -> AppResult<()>;

    /// 이 저장소의 모든 항목을 삭제합니다.
    async fn flush(&self) -> AppResult<()>;
}

/// 만료 시각이 붙은 저장 항목
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredItem {
    value: Value,
    expires_at: Option<DateTime<Utc>>,
}

impl StoredItem {
    fn new(value: Value, ttl: Option<Duration>) -> AppResult<Self> {
        Self::expiring(value, ttl, Utc::now())
    }

    fn expiring(value: Value, ttl: Option<Duration>, now: DateTime<Utc>) -> AppResult<Self> {
        let expires_at = match ttl {
            Some(ttl) => Some(now + chrono::Duration::from_std(ttl).context("Invalid cache TTL")?),
            None => None,
        };
        Ok(Self { value, expires_at })
    }

    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|expires_at| expires_at <= now)
    }
}

/// 만료 항목 정리 주기 (초)
const SWEEP_INTERVAL_SECONDS: i64 = 60;

#[derive(Default)]
struct ArrayItems {
    entries: HashMap<String, StoredItem>,
    swept_at: Option<DateTime<Utc>>,
}

impl ArrayItems {
    /// 읽히지 않고 남은 만료 항목(예: 버려진 세션)을 삭제합니다.
    fn sweep(&mut self, now: DateTime<Utc>) {
        let due = self
            .swept_at
            .is_none_or(|last| now - last >= chrono::Duration::seconds(SWEEP_INTERVAL_SECONDS));
        if due {
            self.entries.retain(|_, item| !item.is_expired(now));
            self.swept_at = Some(now);
        }
    }
}

/// 프로세스 메모리 저장소 (`array`)
#[derive(Default)]
pub struct ArrayStore {
    items: RwLock<ArrayItems>,
}

impl ArrayStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 저장된 항목 수 (만료되었지만 아직 정리되지 않은 항목 포함)
    pub fn len(&self) -> usize {
        self.items.read().unwrap_or_else(PoisonError::into_inner).entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn write_items(&self) -> std::sync::RwLockWriteGuard<'_, ArrayItems> {
        self.items.write().unwrap_or_else(PoisonError::into_inner)
    }

    async fn put_at(&self, key: &str, value: Value, ttl: Option<Duration>, now: DateTime<Utc>) -> AppResult<()> {
        let item = StoredItem::expiring(value, ttl, now)?;
        let mut items = self.write_items();
        items.sweep(now);
        items.entries.insert(key.to_string(), item);
        Ok(())
    }
}

#[async_trait]
impl CacheStore for ArrayStore {
    async fn get(&self, key: &str) -> AppResult<Option<Value>> {
        let mut items = self.write_items();
        match items.entries.get(key) {
            Some(item) if item.is_expired(Utc::now()) => {
                items.entries.remove(key);
                Ok(None)
            }
            Some(item) => Ok(Some(item.value.clone())),
            None => Ok(None),
        }
    }

    async fn put(&self, key: &str, value: Value, ttl: Option<Duration>) -> AppResult<()> {
        self.put_at(key, value, ttl, Utc::now()).await
    }

    async fn forget(&self, key: &str) -> AppResult<()> {
        self.write_items().entries.remove(key);
        Ok(())
    }

    async fn flush(&self) -> AppResult<()> {
        self.write_items().entries.clear();
        Ok(())
    }
}

/// 디렉터리 기반 저장소 (`file`)
///
/// 키의 SHA-256 해시를 파일 이름으로 사용합니다.
/// 파일 입출력은 `web::block`으로 블로킹 스레드 풀에서 실행됩니다.
pub struct FileStore {
    directory: PathBuf,
}

impl FileStore {
    /// 디렉터리가 없으면 생성합니다.
    pub fn new(directory: impl Into<PathBuf>) -> AppResult<Self> {
        let directory = directory.into();
        fs::create_dir_all(&directory)
            .with_context(|| format!("Failed to create cache directory {}", directory.display()))?;
        Ok(Self { directory })
    }

    fn path_for(&self, key: &str) -> PathBuf {
        let digest = Sha256::digest(key.as_bytes());
        self.directory.join(format!("{:x}.json", digest))
    }
}

/// 파일 입출력을 블로킹 스레드 풀에서 실행합니다.
async fn blocking<F, R>(task: F) -> AppResult<R>
where
    F: FnOnce() -> AppResult<R> + Send + 'static,
    R: Send + 'static,
{
    web::block(task)
        .await
        .map_err(|e| AppError::InternalError(format!("Blocking file task failed: {}", e)))?
}

#[async_trait]
impl CacheStore for FileStore {
    async fn get(&self, key: &str) -> AppResult<Option<Value>> {
        let path = self.path_for(key);

        blocking(move || {
            let contents = match fs::read_to_string(&path) {
                Ok(contents) => contents,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
                Err(e) => return Err(AppError::InternalError(format!("Failed to read cache file: {}", e))),
            };

            let item: StoredItem = serde_json::from_str(&contents).context("Corrupted cache file")?;
            if item.is_expired(Utc::now()) {
                let _ = fs::remove_file(&path);
                return Ok(None);
            }
            Ok(Some(item.value))
        })
        .await
    }

    async fn put(&self, key: &str, value: Value, ttl: Option<Duration>) -> AppResult<()> {
        let item = StoredItem::new(value, ttl)?;
        let contents = serde_json::to_string(&item).context("Failed to serialize cache item")?;
        let path = self.path_for(key);

        blocking(move || fs::write(path, contents).context("Failed to write cache file")).await
    }

    async fn forget(&self, key: &str) -> AppResult<()> {
        let path = self.path_for(key);

        blocking(move || match fs::remove_file(path) {
            Err(e) if e.kind() != std::io::ErrorKind::NotFound => {
                Err(AppError::InternalError(format!("Failed to remove cache file: {}", e)))
            }
            _ => Ok(()),
        })
        .await
    }

    async fn flush(&self) -> AppResult<()> {
        let directory = self.directory.clone();

        blocking(move || {
            let entries = fs::read_dir(&directory).context("Failed to list cache directory")?;
            for entry in entries.flatten() {
                let path = entry.path();
                if path.extension().is_some_and(|ext| ext == "json") {
                    fs::remove_file(&path).context("Failed to remove cache file")?;
                }
            }
            Ok(())
        })
        .await
    }
}

/// Redis 저장소 (`redis`)
///
/// 모든 키 앞에 `prefix:`를 붙여 다른 애플리케이션과 키 공간을 분리합니다.
pub struct RedisStore {
    redis: RedisClient,
    prefix: String,
}

impl RedisStore {
    pub fn new(redis: RedisClient, prefix: &str) -> Self {
        Self {
            redis,
            prefix: prefix.to_string(),
        }
    }

    fn namespaced(&self, key: &str) -> String {
        format!("{}:cache:{}", self.prefix, key)
    }
}

#[async_trait]
impl CacheStore for RedisStore {
    async fn get(&self, key: &str) -> AppResult<Option<Value>> {
        self.redis.get(&self.namespaced(key)).await
    }

    async fn put(&self, key: &str, value: Value, ttl: Option<Duration>) -> AppResult<()> {
        let key = self.namespaced(key);
        match ttl {
            Some(ttl) => self.redis.set_with_expiry(&key, &value, ttl.as_secs().max(1)).await,
            None => self.redis.set(&key, &value).await,
        }
    }

    async fn forget(&self, key: &str) -> AppResult<()> {
        self.redis.del(&self.namespaced(key)).await
    }

    async fn flush(&self) -> AppResult<()> {
        let removed = self.redis.del_matching(&format!("{}:cache:*", self.prefix)).await?;
        debug!("Flushed {} Redis cache keys", removed);
        Ok(())
    }
}

/// 설정된 드라이버를 감싼 타입 안전 캐시
pub struct Cache {
    driver: CacheDriver,
    store: Arc<dyn CacheStore>,
}

impl Cache {
    pub fn new(driver: CacheDriver, store: Arc<dyn CacheStore>) -> Self {
        Self { driver, store }
    }

    /// `cache.driver` 설정으로 저장소를 선택합니다.
    ///
    /// 지원하지 않는 드라이버 이름은 `UnsupportedDriver`로 실패합니다.
    pub fn from_config(config: &ConfigRepository) -> AppResult<Self> {
        let driver = CacheDriver::from_config(config)?;
        let prefix = config.get_string_or("cache.prefix", "bootstrap");

        let store: Arc<dyn CacheStore> = match driver {
            CacheDriver::Array => Arc::new(ArrayStore::new()),
            CacheDriver::File => {
                let path = config
                    .get_str("cache.file.path")
                    .ok_or_else(|| AppError::ValidationError("cache.file.path is not configured".to_string()))?;
                Arc::new(FileStore::new(path)?)
            }
            CacheDriver::Redis => {
                let url = config.get_string_or("redis.url", "redis://localhost:6379");
                Arc::new(RedisStore::new(RedisClient::open(&url)?, &prefix))
            }
        };

        debug!("Cache store created with '{}' driver", driver);
        Ok(Self::new(driver, store))
    }

    pub fn driver(&self) -> CacheDriver {
        self.driver
    }

    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> AppResult<Option<T>> {
        match self.store.get(key).await? {
            Some(value) => serde_json::from_value(value)
                .map(Some)
                .with_context(|| format!("Cached value for '{}' has an unexpected shape", key)),
            None => Ok(None),
        }
    }

    pub async fn put<T: Serialize>(&self, key: &str, value: &T, ttl: Option<Duration>) -> AppResult<()> {
        let value = serde_json::to_value(value).context("Failed to serialize cache value")?;
        self.store.put(key, value, ttl).await
    }

    /// 값을 읽고 삭제합니다.
    pub async fn pull<T: DeserializeOwned>(&self, key: &str) -> AppResult<Option<T>> {
        let value = self.get(key).await?;
        self.store.forget(key).await?;
        Ok(value)
    }

    pub async fn forget(&self, key: &str) -> AppResult<()> {
        self.store.forget(key).await
    }

    pub async fn flush(&self) -> AppResult<()> {
        self.store.flush().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Environment;
    use serde_json::json;

    fn scratch_dir() -> PathBuf {
        std::env::temp_dir().join(format!("service_bootstrap_cache_{}", uuid::Uuid::new_v4()))
    }

    #[actix_web::test]
    async fn test_array_store_put_get_forget() {
        let cache = Cache::new(CacheDriver::Array, Arc::new(ArrayStore::new()));

        cache.put("answer", &42u32, None).await.unwrap();
        assert_eq!(cache.get::<u32>("answer").await.unwrap(), Some(42));

        cache.forget("answer").await.unwrap();
        assert_eq!(cache.get::<u32>("answer").await.unwrap(), None);
    }

    #[actix_web::test]
    async fn test_expired_items_are_not_returned() {
        let store = ArrayStore::new();
        store.put("short", json!("lived"), Some(Duration::from_millis(1))).await.unwrap();
        std::thread::sleep(Duration::from_millis(5));

        assert!(store.get("short").await.unwrap().is_none());
    }

    #[actix_web::test]
    async fn test_abandoned_items_are_swept_on_put() {
        let store = ArrayStore::new();
        let start = Utc::now();

        for n in 0..100 {
            store
                .put_at(&format!("session:{}", n), json!({}), Some(Duration::from_secs(60)), start)
                .await
                .unwrap();
        }
        store.put_at("forever", json!(1), None, start).await.unwrap();
        assert_eq!(store.len(), 101);

        let later = start + chrono::Duration::hours(2);
        store.put_at("session:new", json!({}), Some(Duration::from_secs(60)), later).await.unwrap();

        assert_eq!(store.len(), 2);
        assert_eq!(store.get("forever").await.unwrap(), Some(json!(1)));
    }

    #[actix_web::test]
    async fn test_file_store_round_trip_and_flush() {
        let dir = scratch_dir();
        let cache = Cache::new(CacheDriver::File, Arc::new(FileStore::new(&dir).unwrap()));

        cache.put("user:1", &json!({ "name": "Alex" }), None).await.unwrap();
        let pulled: Option<Value> = cache.pull("user:1").await.unwrap();
        assert_eq!(pulled, Some(json!({ "name": "Alex" })));
        assert!(cache.get::<Value>("user:1").await.unwrap().is_none());

        cache.put("a", &1, None).await.unwrap();
        cache.flush().await.unwrap();
        assert!(cache.get::<i32>("a").await.unwrap().is_none());

        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn test_from_config_selects_driver() {
        let mut config = ConfigRepository::defaults(&Environment::Test);
        assert_eq!(Cache::from_config(&config).unwrap().driver(), CacheDriver::Array);

        config.merge(json!({ "cache": { "driver": "redis" } }));
        assert_eq!(Cache::from_config(&config).unwrap().driver(), CacheDriver::Redis);
    }

    #[test]
    fn test_from_config_rejects_unknown_driver() {
        let mut config = ConfigRepository::defaults(&Environment::Test);
        config.merge(json!({ "cache": { "driver": "memcached" } }));

        assert!(matches!(
            Cache::from_config(&config),
            Err(AppError::UnsupportedDriver { .. })
        ));
    }
}
