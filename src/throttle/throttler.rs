//! 스로틀 규칙 엔진
//!
//! 주체(스로틀 종류 + 요청 지문)별 상태는 `Allowed → Throttled → Allowed`로 움직입니다.
//! 마지막 시도 이후 규칙이 요구하는 지연이 지나면 다시 `Allowed`가 됩니다.
//!
//! ```text
//! check_attempt(type, subject, now)
//!    ├─ 규칙 없음 / 비활성 규칙   → allowed
//!    ├─ 창 안의 시도 수 count 계산
//!    ├─ required = delays[min(count, len - 1)]
//!    ├─ now - last < required   → denied, delay_until = last + required
//!    └─ 그 외                   → allowed
//! ```
//!
//! `check_attempt`와 `record_attempt`를 따로 호출하면 동시 요청이 둘 다 허용될 수 있습니다.
//! [`Throttler::attempt`]는 주체별 잠금 안에서 판정과 기록을 함께 수행합니다.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use log::{debug, warn};
use serde::Serialize;

use crate::config::ConfigRepository;
use crate::core::errors::{AppError, AppResult};
use crate::core::keyed_lock::KeyedLocks;
use crate::throttle::rule::ThrottleRule;
use crate::throttle::store::{AttemptKey, AttemptStore, RequestFingerprint};

/// 접근 판정 결과
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Decision {
    pub allowed: bool,
    pub delay_until: Option<DateTime<Utc>>,
}

impl Decision {
    pub fn allowed() -> Self {
        Self {
            allowed: true,
            delay_until: None,
        }
    }

    pub fn denied(delay_until: DateTime<Utc>) -> Self {
        Self {
            allowed: false,
            delay_until: Some(delay_until),
        }
    }

    /// 다음 시도까지 남은 초 (올림). 허용된 경우 `None`.
    pub fn retry_after_seconds(&self, now: DateTime<Utc>) -> Option<i64> {
        self.delay_until.map(|until| {
            let millis = (until - now).num_milliseconds().max(0);
            (millis + 999) / 1000
        })
    }

    /// 거부된 판정을 `Throttled` 에러로 바꿉니다.
    pub fn into_result(self, throttle: &str) -> AppResult<()> {
        match self.delay_until {
            Some(delay_until) if !self.allowed => Err(AppError::Throttled {
                throttle: throttle.to_string(),
                delay_until,
            }),
            _ => Ok(()),
        }
    }
}

/// 스로틀 규칙 엔진
pub struct Throttler {
    /// `None` 값은 명시적으로 비활성화된 규칙
    rules: HashMap<String, Option<ThrottleRule>>,
    store: Arc<dyn AttemptStore>,
    locks: KeyedLocks<AttemptKey>,
}

impl Throttler {
    pub fn new(store: Arc<dyn AttemptStore>) -> Self {
        Self {
            rules: HashMap::new(),
            store,
            locks: KeyedLocks::new(),
        }
    }

    /// `throttles.*` 설정의 모든 규칙을 읽어 엔진을 만듭니다.
    pub fn from_config(config: &ConfigRepository, store: Arc<dyn AttemptStore>) -> AppResult<Self> {
        let mut throttler = Self::new(store);

        for throttle in config.keys_under("throttles") {
            let key = format!("throttles.{}", throttle);
            let value = config.get(&key).cloned().unwrap_or_default();
            let rule = ThrottleRule::from_value(&throttle, &value)?;
            throttler.add_rule(&throttle, rule);
        }

        debug!("Throttler configured with {} rule(s)", throttler.rules.len());
        Ok(throttler)
    }

    /// 규칙을 추가하거나 교체합니다. `None`은 해당 종류의 스로틀을 끕니다.
    pub fn add_rule(&mut self, throttle: &str, rule: Option<ThrottleRule>) {
        self.rules.insert(throttle.to_string(), rule);
    }

    /// 활성 규칙. 설정되지 않았거나 비활성이면 `None`.
    pub fn rule(&self, throttle: &str) -> Option<&ThrottleRule> {
        self.rules.get(throttle).and_then(Option::as_ref)
    }

    /// 설정된 스로틀 종류 이름 (정렬됨)
    pub fn throttle_types(&self) -> Vec<String> {
        let mut names: Vec<String> = self.rules.keys().cloned().collect();
        names.sort();
        names
    }

    /// 규칙과 시도 이력만으로 판정합니다.
    pub fn evaluate(rule: &ThrottleRule, attempts: &[DateTime<Utc>], now: DateTime<Utc>) -> Decision {
        let relevant = rule.relevant_attempts(attempts, now);
        let Some(last) = relevant.last().copied() else {
            return Decision::allowed();
        };

        let required = rule.required_delay(relevant.len());
        if now - last < required {
            Decision::denied(last + required)
        } else {
            Decision::allowed()
        }
    }

    /// 현재 시도가 허용되는지 판정합니다. 기록은 하지 않습니다.
    pub async fn check_attempt(
        &self,
        throttle: &str,
        subject: &RequestFingerprint,
        now: DateTime<Utc>,
    ) -> AppResult<Decision> {
        let Some(rule) = self.rule(throttle) else {
            return Ok(Decision::allowed());
        };

        let key = AttemptKey::new(throttle, subject);
        let attempts = self.store.attempts(&key).await?;
        let decision = Self::evaluate(rule, &attempts, now);

        if !decision.allowed {
            warn!(
                "Throttled '{}' for {} until {:?}",
                throttle,
                subject.as_str(),
                decision.delay_until
            );
        }
        Ok(decision)
    }

    /// 보호된 동작의 시도를 기록합니다. 활성 규칙이 없으면 아무것도 하지 않습니다.
    pub async fn record_attempt(
        &self,
        throttle: &str,
        subject: &RequestFingerprint,
        now: DateTime<Utc>,
    ) -> AppResult<()> {
        let Some(rule) = self.rule(throttle) else {
            debug!("No active throttle rule for '{}', attempt not recorded", throttle);
            return Ok(());
        };

        let key = AttemptKey::new(throttle, subject);
        self.store
            .record(&key, now, rule.retention())
            .await
    }

    /// 판정과 기록을 주체별 임계 구역 안에서 함께 수행합니다.
    ///
    /// 허용 여부와 관계없이 시도는 기록되므로, 거부된 뒤 곧바로 다시 시도하면
    /// 대기 시간이 다음 단계로 늘어납니다.
    pub async fn attempt(
        &self,
        throttle: &str,
        subject: &RequestFingerprint,
        now: DateTime<Utc>,
    ) -> AppResult<Decision> {
        if self.rule(throttle).is_none() {
            return Ok(Decision::allowed());
        }

        let key = AttemptKey::new(throttle, subject);
        self.locks
            .with_lock(&key, move || async move {
                let decision = self.check_attempt(throttle, subject, now).await?;
                self.record_attempt(throttle, subject, now).await?;
                Ok(decision)
            })
            .await
    }

    /// 주체의 시도 이력을 지웁니다 (예: 로그인 성공 후).
    pub async fn reset(&self, throttle: &str, subject: &RequestFingerprint) -> AppResult<()> {
        self.store.clear(&AttemptKey::new(throttle, subject)).await
    }
}
