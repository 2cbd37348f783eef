//! 드라이버 선택 설정
//!
//! 설정에 문자열로 적힌 드라이버 이름을 열거형으로 해석합니다.
//! 알 수 없는 이름은 기본 드라이버로 대체되지 않고 `UnsupportedDriver` 에러가 됩니다.

use std::fmt;
use std::str::FromStr;

use serde_json::Value;

use crate::config::repository::ConfigRepository;
use crate::core::errors::{AppError, AppResult};

/// 설정 키와 드라이버 이름 목록을 공유하는 열거형 정의
macro_rules! driver_enum {
    (
        $(#[$meta:meta])*
        $name:ident, $setting:literal, $default:ident {
            $($variant:ident => $text:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            /// 이 드라이버를 선택하는 설정 키
            pub const SETTING: &'static str = $setting;

            /// 설정 이름
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }

            /// 설정 저장소에서 드라이버를 읽습니다.
            ///
            /// 키가 없거나 `null`일 때만 기본 드라이버를 씁니다.
            /// 문자열이 아닌 값은 `UnsupportedDriver`입니다.
            pub fn from_config(config: &ConfigRepository) -> AppResult<Self> {
                match config.get(Self::SETTING) {
                    None | Some(Value::Null) => Ok($name::$default),
                    Some(Value::String(value)) => value.parse(),
                    Some(other) => Err(AppError::UnsupportedDriver {
                        setting: Self::SETTING,
                        value: other.to_string(),
                    }),
                }
            }
        }

        impl FromStr for $name {
            type Err = AppError;

            fn from_str(value: &str) -> Result<Self, Self::Err> {
                match value.trim().to_lowercase().as_str() {
                    $($text => Ok($name::$variant),)+
                    _ => Err(AppError::UnsupportedDriver {
                        setting: Self::SETTING,
                        value: value.to_string(),
                    }),
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

driver_enum! {
    /// 캐시 저장소 드라이버 (`cache.driver`)
    CacheDriver, "cache.driver", Array {
        Array => "array",
        File => "file",
        Redis => "redis",
    }
}

driver_enum! {
    /// 세션 저장소 핸들러 (`session.handler`)
    SessionHandler, "session.handler", Array {
        Array => "array",
        File => "file",
        Redis => "redis",
    }
}

driver_enum! {
    /// 알림 메시지 저장 위치 (`alert.storage`)
    AlertStorage, "alert.storage", Session {
        Cache => "cache",
        Session => "session",
    }
}

driver_enum! {
    /// 스로틀 시도 기록 저장소 (`throttle.storage`)
    AttemptStorage, "throttle.storage", Memory {
        Memory => "memory",
        Redis => "redis",
    }
}
