//! 스로틀 시도 기록 저장소
//!
//! 스로틀 엔진은 저장소의 종류를 알지 못하며, 아래 읽기/쓰기 계약만 사용합니다.
//! `throttle.storage` 설정으로 메모리 또는 Redis 저장소를 선택합니다.

use std::collections::HashMap;
use std::fmt;
use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use log::debug;
use redis::AsyncCommands;
use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::caching::redis::RedisClient;
use crate::core::errors::{AppError, AppResult};

/// 요청을 식별하는 지문
///
/// 같은 IP에서 오는 요청, 혹은 같은 요청 데이터(예: 같은 이메일로 비밀번호 재설정)를
/// 하나의 주체로 묶습니다. 요청 데이터는 키 순서에 무관하게 SHA-256으로 해시됩니다.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequestFingerprint(String);

impl RequestFingerprint {
    pub fn from_ip(ip: &str) -> Self {
        Self(format!("ip:{}", ip))
    }

    /// 요청 데이터의 키/값 쌍으로 지문을 만듭니다.
    pub fn from_data<'a, I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut pairs: Vec<(&str, &str)> = pairs.into_iter().collect();
        pairs.sort();

        let mut hasher = Sha256::new();
        for (key, value) in pairs {
            hasher.update(key.as_bytes());
            hasher.update([0u8]);
            hasher.update(value.as_bytes());
            hasher.update([0u8]);
        }
        Self(format!("data:{:x}", hasher.finalize()))
    }

    /// 이미 식별자로 쓸 수 있는 문자열
    pub fn raw(value: &str) -> Self {
        Self(value.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// 스로틀 종류와 요청 지문을 합친 기록 키
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct AttemptKey {
    throttle: String,
    subject: String,
}

impl AttemptKey {
    pub fn new(throttle: &str, subject: &RequestFingerprint) -> Self {
        Self {
            throttle: throttle.to_string(),
            subject: subject.as_str().to_string(),
        }
    }

    pub fn throttle(&self) -> &str {
        &self.throttle
    }
}

impl fmt::Display for AttemptKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.throttle, self.subject)
    }
}

/// 기록 보관 정책
///
/// 두 정책 모두 마지막 시도 이후 보관 기간이 지나면 주체의 기록 전체가 삭제됩니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Retention {
    /// 새 시도 기준 `Duration`보다 오래된 시도는 정리
    Window(Duration),
    /// 가장 최근 시도 하나만 `Duration` 동안 보관
    Latest(Duration),
}

impl Retention {
    /// 마지막 시도 이후 기록을 유지할 기간 (최소 1초)
    pub fn ttl(&self) -> Duration {
        let ttl = match self {
            Retention::Window(window) => *window,
            Retention::Latest(ttl) => *ttl,
        };
        ttl.max(Duration::seconds(1))
    }
}

/// 시도 기록 저장소 계약
#[async_trait]
pub trait AttemptStore: Send + Sync {
    /// 주체의 시도 시각 목록 (오름차순)
    async fn attempts(&self, key: &AttemptKey) -> AppResult<Vec<DateTime<Utc>>>;

    /// 새 시도를 기록하고 보관 정책에 따라 오래된 기록을 정리합니다.
    async fn record(&self, key: &AttemptKey, at: DateTime<Utc>, retention: Retention) -> AppResult<()>;

    /// 주체의 기록을 모두 삭제합니다.
    async fn clear(&self, key: &AttemptKey) -> AppResult<()>;
}

/// 만료 주체 정리 주기 (초)
const SWEEP_INTERVAL_SECONDS: i64 = 60;

struct AttemptHistory {
    attempts: Vec<DateTime<Utc>>,
    expires_at: DateTime<Utc>,
}

#[derive(Default)]
struct MemoryRecords {
    subjects: HashMap<AttemptKey, AttemptHistory>,
    swept_at: Option<DateTime<Utc>>,
}

impl MemoryRecords {
    /// 보관 기간이 끝난 주체를 삭제합니다. 시계는 기록되는 시도 시각입니다.
    fn sweep(&mut self, now: DateTime<Utc>) {
        let due = self
            .swept_at
            .is_none_or(|last| now - last >= Duration::seconds(SWEEP_INTERVAL_SECONDS));
        if !due {
            return;
        }

        let before = self.subjects.len();
        self.subjects.retain(|_, history| history.expires_at > now);
        self.swept_at = Some(now);

        let removed = before - self.subjects.len();
        if removed > 0 {
            debug!("Removed {} expired throttle subject(s)", removed);
        }
    }
}

/// 프로세스 메모리 저장소
#[derive(Default)]
pub struct MemoryAttemptStore {
    records: RwLock<MemoryRecords>,
}

impl MemoryAttemptStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 기록이 남아 있는 주체 수
    pub fn tracked_subjects(&self) -> usize {
        self.records
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .subjects
            .len()
    }
}

#[async_trait]
impl AttemptStore for MemoryAttemptStore {
    async fn attempts(&self, key: &AttemptKey) -> AppResult<Vec<DateTime<Utc>>> {
        Ok(self
            .records
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .subjects
            .get(key)
            .map(|history| history.attempts.clone())
            .unwrap_or_default())
    }

    async fn record(&self, key: &AttemptKey, at: DateTime<Utc>, retention: Retention) -> AppResult<()> {
        let mut records = self.records.write().unwrap_or_else(PoisonError::into_inner);
        records.sweep(at);

        let history = records
            .subjects
            .entry(key.clone())
            .or_insert_with(|| AttemptHistory {
                attempts: Vec::new(),
                expires_at: at,
            });

        history.attempts.push(at);
        history.attempts.sort();
        let latest = history.attempts[history.attempts.len() - 1];

        match retention {
            Retention::Window(window) => {
                let cutoff = latest - window;
                history.attempts.retain(|attempt| *attempt > cutoff);
            }
            Retention::Latest(_) => {
                history.attempts.clear();
                history.attempts.push(latest);
            }
        }
        history.expires_at = latest + retention.ttl();
        Ok(())
    }

    async fn clear(&self, key: &AttemptKey) -> AppResult<()> {
        self.records
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .subjects
            .remove(key);
        Ok(())
    }
}

/// Redis sorted set 기반 저장소
///
/// 점수는 밀리초 타임스탬프이며, 보관 기간이 지나면 키 자체가 만료됩니다.
pub struct RedisAttemptStore {
    redis: RedisClient,
    prefix: String,
}

impl RedisAttemptStore {
    pub fn new(redis: RedisClient, prefix: &str) -> Self {
        Self {
            redis,
            prefix: prefix.to_string(),
        }
    }

    fn redis_key(&self, key: &AttemptKey) -> String {
        format!("{}:throttle:{}", self.prefix, key)
    }
}

#[async_trait]
impl AttemptStore for RedisAttemptStore {
    async fn attempts(&self, key: &AttemptKey) -> AppResult<Vec<DateTime<Utc>>> {
        let mut conn = self.redis.connection().await?;
        let entries: Vec<(String, f64)> = conn.zrange_withscores(self.redis_key(key), 0, -1).await?;

        entries
            .into_iter()
            .map(|(_, score)| {
                DateTime::from_timestamp_millis(score as i64)
                    .ok_or_else(|| AppError::RedisError(format!("Invalid attempt timestamp: {}", score)))
            })
            .collect()
    }

    async fn record(&self, key: &AttemptKey, at: DateTime<Utc>, retention: Retention) -> AppResult<()> {
        let redis_key = self.redis_key(key);
        let member = format!("{}:{}", at.timestamp_millis(), uuid::Uuid::new_v4());
        let mut conn = self.redis.connection().await?;

        let _: () = conn.zadd(&redis_key, member, at.timestamp_millis()).await?;
        match retention {
            Retention::Window(window) => {
                let cutoff = (at - window).timestamp_millis();
                let _: () = conn.zrembyscore(&redis_key, "-inf", cutoff).await?;
            }
            Retention::Latest(_) => {
                let _: () = conn.zremrangebyrank(&redis_key, 0, -2).await?;
            }
        }
        let _: () = conn.expire(&redis_key, retention.ttl().num_seconds()).await?;
        Ok(())
    }

    async fn clear(&self, key: &AttemptKey) -> AppResult<()> {
        self.redis.del(&self.redis_key(key)).await
    }
}
