//! 에러 종류 계층
//!
//! 핸들러 디스패치는 에러의 구체적인 종류부터 루트(`Any`)까지 거슬러 올라가며
//! 등록된 핸들러를 찾습니다. 각 종류의 부모는 [`ErrorKind::parent`]에 명시됩니다.
//!
//! ```text
//! Any
//! ├─ Configuration
//! │  ├─ UnknownRole, UnknownService, FrozenService, CircularDependency
//! │  ├─ TypeMismatch, UnsupportedDriver, ThrottleConfig, NoHandler
//! │  └─ ServiceConstruction
//! ├─ Http
//! │  ├─ Validation, NotFound
//! │  └─ Throttled
//! ├─ Storage
//! │  └─ Redis
//! └─ Internal
//! ```

use std::fmt;

use serde::Serialize;

use crate::core::errors::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Any,
    Configuration,
    UnknownRole,
    UnknownService,
    FrozenService,
    CircularDependency,
    TypeMismatch,
    UnsupportedDriver,
    ThrottleConfig,
    NoHandler,
    ServiceConstruction,
    Http,
    Validation,
    NotFound,
    Throttled,
    Storage,
    Redis,
    Internal,
}

impl ErrorKind {
    /// 모든 종류 (루트 포함)
    pub const ALL: [ErrorKind; 18] = [
        ErrorKind::Any,
        ErrorKind::Configuration,
        ErrorKind::UnknownRole,
        ErrorKind::UnknownService,
        ErrorKind::FrozenService,
        ErrorKind::CircularDependency,
        ErrorKind::TypeMismatch,
        ErrorKind::UnsupportedDriver,
        ErrorKind::ThrottleConfig,
        ErrorKind::NoHandler,
        ErrorKind::ServiceConstruction,
        ErrorKind::Http,
        ErrorKind::Validation,
        ErrorKind::NotFound,
        ErrorKind::Throttled,
        ErrorKind::Storage,
        ErrorKind::Redis,
        ErrorKind::Internal,
    ];

    /// 바로 위 종류. 루트는 `None`.
    pub fn parent(self) -> Option<ErrorKind> {
        use ErrorKind::*;

        match self {
            Any => None,
            Configuration | Http | Storage | Internal => Some(Any),
            UnknownRole | UnknownService | FrozenService | CircularDependency | TypeMismatch
            | UnsupportedDriver | ThrottleConfig | NoHandler | ServiceConstruction => Some(Configuration),
            Validation | NotFound | Throttled => Some(Http),
            Redis => Some(Storage),
        }
    }

    /// 자신부터 루트까지의 종류 목록 (가장 구체적인 것이 먼저)
    pub fn lineage(self) -> Vec<ErrorKind> {
        std::iter::successors(Some(self), |kind| kind.parent()).collect()
    }

    /// `ancestor`와 같거나 그 하위 종류인지
    pub fn is_a(self, ancestor: ErrorKind) -> bool {
        self.lineage().contains(&ancestor)
    }

    pub fn as_str(self) -> &'static str {
        use ErrorKind::*;

        match self {
            Any => "any",
            Configuration => "configuration",
            UnknownRole => "unknown_role",
            UnknownService => "unknown_service",
            FrozenService => "frozen_service",
            CircularDependency => "circular_dependency",
            TypeMismatch => "type_mismatch",
            UnsupportedDriver => "unsupported_driver",
            ThrottleConfig => "throttle_config",
            NoHandler => "no_handler",
            ServiceConstruction => "service_construction",
            Http => "http",
            Validation => "validation",
            NotFound => "not_found",
            Throttled => "throttled",
            Storage => "storage",
            Redis => "redis",
            Internal => "internal",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl AppError {
    /// 이 에러의 가장 구체적인 종류
    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::UnknownRole(_) => ErrorKind::UnknownRole,
            AppError::UnknownService(_) => ErrorKind::UnknownService,
            AppError::FrozenService(_) => ErrorKind::FrozenService,
            AppError::CircularDependency(_) => ErrorKind::CircularDependency,
            AppError::TypeMismatch { .. } => ErrorKind::TypeMismatch,
            AppError::UnsupportedDriver { .. } => ErrorKind::UnsupportedDriver,
            AppError::ThrottleConfig { .. } => ErrorKind::ThrottleConfig,
            AppError::NoHandler(_) => ErrorKind::NoHandler,
            AppError::Throttled { .. } => ErrorKind::Throttled,
            AppError::ServiceConstruction { .. } => ErrorKind::ServiceConstruction,
            AppError::ValidationError(_) => ErrorKind::Validation,
            AppError::NotFound(_) => ErrorKind::NotFound,
            AppError::RedisError(_) => ErrorKind::Redis,
            AppError::InternalError(_) => ErrorKind::Internal,
        }
    }
}
