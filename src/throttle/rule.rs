//! 스로틀 규칙 정의
//!
//! 설정의 `throttles.<type>` 항목을 검증된 [`ThrottleRule`]로 변환합니다.
//!
//! ```json
//! {
//!     "method": "interval",
//!     "interval": "1 day",
//!     "delays": [0, 30, 60, 120]
//! }
//! ```
//!
//! `delays[n]`은 창 안에 이미 `n`번의 시도가 있을 때 마지막 시도 이후 기다려야
//! 하는 초 단위 시간입니다. 시도 횟수가 목록 길이를 넘으면 마지막 값이 유지됩니다.

use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use serde_json::Value;
use validator::Validate;

use crate::core::errors::{AppError, AppResult};
use crate::throttle::store::Retention;

/// 시도 횟수를 세는 방식
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThrottleMethod {
    /// 가장 최근 시도 하나만 고려 (고정 쿨다운)
    Single,
    /// 최근 `interval` 동안의 시도 수를 고려
    Interval,
}

/// 정수 초 또는 `"1 day"` 같은 사람이 읽는 기간
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum IntervalSpec {
    Seconds(u64),
    Text(String),
}

impl IntervalSpec {
    pub fn to_duration(&self) -> Result<Duration, String> {
        match self {
            IntervalSpec::Seconds(seconds) => seconds_to_duration(*seconds),
            IntervalSpec::Text(text) => parse_interval(text),
        }
    }
}

/// 설정에 적힌 규칙 원형
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct ThrottleRuleDefinition {
    pub method: ThrottleMethod,

    #[serde(default)]
    pub interval: Option<IntervalSpec>,

    #[validate(length(min = 1, message = "delays must not be empty"))]
    pub delays: Vec<u64>,
}

/// 검증된 스로틀 규칙
#[derive(Debug, Clone, PartialEq)]
pub struct ThrottleRule {
    method: ThrottleMethod,
    interval: Option<Duration>,
    delays: Vec<Duration>,
}

impl ThrottleRule {
    /// `Interval` 방식에는 `interval`이, 활성 규칙에는 비어 있지 않은 `delays`가 필요합니다.
    pub fn new(
        name: &str,
        method: ThrottleMethod,
        interval: Option<Duration>,
        delays: Vec<Duration>,
    ) -> AppResult<Self> {
        if delays.is_empty() {
            return Err(config_error(name, "delays must not be empty"));
        }
        if method == ThrottleMethod::Interval && interval.is_none() {
            return Err(config_error(name, "interval is required for the interval method"));
        }
        if delays.iter().any(|delay| *delay < Duration::zero()) {
            return Err(config_error(name, "delays must not be negative"));
        }

        Ok(Self { method, interval, delays })
    }

    /// 설정 원형을 검증하여 규칙을 만듭니다.
    pub fn from_definition(name: &str, definition: ThrottleRuleDefinition) -> AppResult<Self> {
        definition
            .validate()
            .map_err(|e| config_error(name, &e.to_string()))?;

        let interval = definition
            .interval
            .as_ref()
            .map(IntervalSpec::to_duration)
            .transpose()
            .map_err(|reason| config_error(name, &reason))?;

        let delays = definition
            .delays
            .iter()
            .map(|seconds| seconds_to_duration(*seconds))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|reason| config_error(name, &reason))?;

        Self::new(name, definition.method, interval, delays)
    }

    /// 설정 값에서 규칙을 읽습니다.
    ///
    /// `null`이나 빈 객체는 스로틀 비활성화를 뜻하며 `None`을 반환합니다.
    pub fn from_value(name: &str, value: &Value) -> AppResult<Option<Self>> {
        match value {
            Value::Null => Ok(None),
            Value::Object(map) if map.is_empty() => Ok(None),
            _ => {
                let definition: ThrottleRuleDefinition = serde_json::from_value(value.clone())
                    .map_err(|e| config_error(name, &e.to_string()))?;
                Self::from_definition(name, definition).map(Some)
            }
        }
    }

    pub fn method(&self) -> ThrottleMethod {
        self.method
    }

    pub fn interval(&self) -> Option<Duration> {
        self.interval
    }

    pub fn delays(&self) -> &[Duration] {
        &self.delays
    }

    /// 이미 `count`번 시도했을 때 마지막 시도 이후 필요한 대기 시간
    pub fn required_delay(&self, count: usize) -> Duration {
        let index = count.min(self.delays.len() - 1);
        self.delays[index]
    }

    /// 시도 이력 중 이 규칙이 고려하는 시도들 (오름차순)
    ///
    /// - `Interval`: `now - interval` 이후의 시도
    /// - `Single`: 가장 최근 시도 하나
    pub fn relevant_attempts(&self, attempts: &[DateTime<Utc>], now: DateTime<Utc>) -> Vec<DateTime<Utc>> {
        let mut relevant: Vec<DateTime<Utc>> = match (self.method, self.interval) {
            (ThrottleMethod::Interval, Some(interval)) => {
                let window_start = now - interval;
                attempts
                    .iter()
                    .copied()
                    .filter(|at| *at > window_start && *at <= now)
                    .collect()
            }
            _ => attempts.iter().copied().filter(|at| *at <= now).max().into_iter().collect(),
        };
        relevant.sort();
        relevant
    }

    /// 저장소 보관 정책
    ///
    /// `Single` 방식은 가장 긴 지연이 지나면 기록이 판정에 영향을 주지 않으므로
    /// 그 기간만큼만 최신 시도를 보관합니다.
    pub fn retention(&self) -> Retention {
        match (self.method, self.interval) {
            (ThrottleMethod::Interval, Some(interval)) => Retention::Window(interval),
            _ => Retention::Latest(self.delays.iter().copied().max().unwrap_or_else(Duration::zero)),
        }
    }
}

fn config_error(name: &str, reason: &str) -> AppError {
    AppError::ThrottleConfig {
        rule: name.to_string(),
        reason: reason.to_string(),
    }
}

fn seconds_to_duration(seconds: u64) -> Result<Duration, String> {
    i64::try_from(seconds)
        .ok()
        .and_then(Duration::try_seconds)
        .ok_or_else(|| format!("duration of {} seconds is out of range", seconds))
}

/// `"30 seconds"`, `"1 day"`, `"2 hours"`, `"90"`, `"15m"` 형태의 기간을 해석합니다.
pub fn parse_interval(text: &str) -> Result<Duration, String> {
    let text = text.trim().to_lowercase();
    let split_at = text
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(text.len());
    let (amount, unit) = text.split_at(split_at);

    let amount: u64 = amount
        .parse()
        .map_err(|_| format!("invalid interval '{}'", text))?;

    let unit_seconds = match unit.trim() {
        "" | "s" | "sec" | "secs" | "second" | "seconds" => 1,
        "m" | "min" | "mins" | "minute" | "minutes" => 60,
        "h" | "hr" | "hrs" | "hour" | "hours" => 3_600,
        "d" | "day" | "days" => 86_400,
        "w" | "week" | "weeks" => 604_800,
        other => return Err(format!("unknown interval unit '{}'", other)),
    };

    amount
        .checked_mul(unit_seconds)
        .ok_or_else(|| format!("interval '{}' is too large", text))
        .and_then(seconds_to_duration)
}
