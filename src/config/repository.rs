//! # Config Repository - 점 표기법 설정 저장소
//!
//! `cache.driver`, `throttles.sign_in_attempt` 처럼 점으로 구분된 키로
//! 설정값을 조회하는 저장소입니다. 설정 파일 파싱은 이 모듈의 책임이 아니며,
//! 이미 해석된 `serde_json::Value` 트리를 받아 타입이 있는 조회만 제공합니다.
//!
//! ## 레이어링
//!
//! 기본값 → 환경 변수 → 확장 모듈 오버라이드 순서로 [`ConfigRepository::merge`]가
//! 적용되며, 객체는 깊게 병합되고 그 외 값은 나중 값이 이깁니다.
//!
//! ## 환경 변수 매핑
//!
//! | 환경 변수 | 설정 키 |
//! |-----------|---------|
//! | `CACHE_DRIVER` | `cache.driver` |
//! | `CACHE_PATH` | `cache.file.path` |
//! | `SESSION_HANDLER` | `session.handler` |
//! | `SESSION_PATH` | `session.file.path` |
//! | `ALERT_STORAGE` | `alert.storage` |
//! | `THROTTLE_STORAGE` | `throttle.storage` |
//! | `REDIS_URL` | `redis.url` |
//! | `DISPLAY_ERROR_DETAILS` | `site.debug.display_errors` |

use std::env;

use serde::de::DeserializeOwned;
use serde_json::{Map, Value, json};

use crate::config::data_config::Environment;
use crate::core::errors::{AppError, AppResult};

/// 환경 변수 → 설정 키 바인딩
const ENV_BINDINGS: &[(&str, &str)] = &[
    ("CACHE_DRIVER", "cache.driver"),
    ("CACHE_PATH", "cache.file.path"),
    ("SESSION_HANDLER", "session.handler"),
    ("SESSION_PATH", "session.file.path"),
    ("ALERT_STORAGE", "alert.storage"),
    ("THROTTLE_STORAGE", "throttle.storage"),
    ("REDIS_URL", "redis.url"),
    ("DISPLAY_ERROR_DETAILS", "site.debug.display_errors"),
];

/// 점 표기법 키로 조회하는 설정 저장소
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigRepository {
    items: Value,
}

impl Default for ConfigRepository {
    fn default() -> Self {
        Self::new(Value::Object(Map::new()))
    }
}

impl ConfigRepository {
    /// 주어진 값 트리로 저장소를 만듭니다.
    pub fn new(items: Value) -> Self {
        Self { items }
    }

    /// 내장 기본값
    ///
    /// 스로틀 규칙 기본값은 로그인 시도 4회까지는 지연이 없고,
    /// 이후 5초부터 점차 늘어나 10분에서 고정됩니다.
    pub fn defaults(environment: &Environment) -> Self {
        let storage_root = env::temp_dir().join("service_bootstrap");

        Self::new(json!({
            "cache": {
                "driver": "array",
                "prefix": "bootstrap",
                "file": { "path": storage_root.join("cache") }
            },
            "session": {
                "handler": "array",
                "name": "bootstrap_session",
                "minutes": 120,
                "file": { "path": storage_root.join("sessions") }
            },
            "alert": {
                "storage": "session",
                "key": "site.alerts"
            },
            "redis": {
                "url": "redis://localhost:6379"
            },
            "throttle": {
                "storage": "memory"
            },
            "throttles": {
                "alert_request": {
                    "method": "interval",
                    "interval": "1 minute",
                    "delays": [0, 0, 0, 0, 0, 2, 5, 10]
                },
                "check_username_request": null,
                "registration_attempt": null,
                "password_reset_request": {
                    "method": "interval",
                    "interval": "1 hour",
                    "delays": [0, 0, 5, 10, 20, 40, 80, 600]
                },
                "sign_in_attempt": {
                    "method": "interval",
                    "interval": "1 hour",
                    "delays": [0, 0, 0, 0, 5, 10, 20, 40, 80, 600]
                },
                "verification_request": {
                    "method": "single",
                    "delays": [0, 60]
                }
            },
            "site": {
                "debug": {
                    "display_errors": environment.displays_error_details()
                }
            }
        }))
    }

    /// 현재 환경의 기본값 위에 환경 변수를 덮어쓴 저장소
    pub fn from_env() -> Self {
        let mut config = Self::defaults(&Environment::current());
        config.apply_env_with(|name| env::var(name).ok());
        config
    }

    /// 환경 변수 조회 함수를 받아 바인딩된 키에 값을 씁니다.
    ///
    /// `true`/`false`, 정수로 해석되는 값은 해당 JSON 타입으로 저장됩니다.
    pub fn apply_env_with<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        for &(variable, key) in ENV_BINDINGS {
            if let Some(raw) = lookup(variable) {
                self.set(key, coerce_env_value(&raw));
            }
        }
    }

    /// 점 표기법 키로 값을 조회합니다. `null`은 없는 값과 구분됩니다.
    pub fn get(&self, key: &str) -> Option<&Value> {
        key.split('.')
            .try_fold(&self.items, |node, segment| node.get(segment))
    }

    /// 키가 존재하는지 (값이 `null`이어도 true)
    pub fn has(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    pub fn get_string_or(&self, key: &str, default: &str) -> String {
        self.get_str(key).unwrap_or(default).to_string()
    }

    /// 불리언 조회. `"true"`, `"1"` 같은 문자열도 허용합니다.
    pub fn get_bool(&self, key: &str) -> Option<bool> {
        match self.get(key)? {
            Value::Bool(flag) => Some(*flag),
            Value::String(text) => match text.to_lowercase().as_str() {
                "true" | "1" | "yes" | "on" => Some(true),
                "false" | "0" | "no" | "off" => Some(false),
                _ => None,
            },
            Value::Number(number) => number.as_i64().map(|n| n != 0),
            _ => None,
        }
    }

    /// 값을 원하는 타입으로 역직렬화합니다. 키가 없거나 `null`이면 `None`.
    pub fn get_as<T: DeserializeOwned>(&self, key: &str) -> AppResult<Option<T>> {
        match self.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(value) => serde_json::from_value(value.clone())
                .map(Some)
                .map_err(|e| AppError::ValidationError(format!("Invalid config value '{}': {}", key, e))),
        }
    }

    /// 점 표기법 키에 값을 씁니다. 중간 객체가 없으면 만듭니다.
    pub fn set(&mut self, key: &str, value: Value) {
        let segments: Vec<&str> = key.split('.').collect();
        set_path(&mut self.items, &segments, value);
    }

    /// 다른 설정 트리를 깊게 병합합니다.
    pub fn merge(&mut self, overrides: Value) {
        merge_values(&mut self.items, overrides);
    }

    /// 최상위 키 아래의 모든 항목 이름
    pub fn keys_under(&self, key: &str) -> Vec<String> {
        match self.get(key) {
            Some(Value::Object(map)) => map.keys().cloned().collect(),
            _ => Vec::new(),
        }
    }
}

fn set_path(node: &mut Value, segments: &[&str], value: Value) {
    if !node.is_object() {
        *node = Value::Object(Map::new());
    }
    if let Value::Object(map) = node {
        match segments {
            [] => {}
            [last] => {
                map.insert(last.to_string(), value);
            }
            [head, rest @ ..] => {
                let child = map.entry(head.to_string()).or_insert(Value::Null);
                set_path(child, rest, value);
            }
        }
    }
}

fn merge_values(base: &mut Value, overrides: Value) {
    match (base, overrides) {
        (Value::Object(base_map), Value::Object(override_map)) => {
            for (key, value) in override_map {
                match base_map.get_mut(&key) {
                    Some(existing) => merge_values(existing, value),
                    None => {
                        base_map.insert(key, value);
                    }
                }
            }
        }
        (slot, value) => *slot = value,
    }
}

fn coerce_env_value(raw: &str) -> Value {
    match raw.to_lowercase().as_str() {
        "true" => return Value::Bool(true),
        "false" => return Value::Bool(false),
        _ => {}
    }
    raw.parse::<i64>()
        .map(Value::from)
        .unwrap_or_else(|_| Value::String(raw.to_string()))
}
