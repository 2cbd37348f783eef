//! # Application Error Handling System
//!
//! 부트스트랩 계층 전체에서 사용하는 통합 에러 타입입니다.
//! 서비스 컨테이너, 클래스 매퍼, 드라이버 선택, 스로틀 규칙 등
//! 구성 단계에서 발생하는 에러와 HTTP 계층으로 전달되는 에러를
//! 하나의 열거형으로 관리합니다.
//!
//! ## 에러 분류
//!
//! | AppError | HTTP Status | 발생 위치 |
//! |----------|-------------|-----------|
//! | `UnknownRole` | 500 | 클래스 매퍼에 바인딩되지 않은 역할 조회 |
//! | `UnknownService` | 500 | 컨테이너에 등록되지 않은 서비스 조회/확장 |
//! | `FrozenService` | 500 | 이미 생성된 서비스를 확장하려는 시도 |
//! | `CircularDependency` | 500 | 팩토리 내부의 재귀적 자기 참조 |
//! | `TypeMismatch` | 500 | 다운캐스트 실패 |
//! | `UnsupportedDriver` | 500 | 설정에 알 수 없는 드라이버 이름 |
//! | `ThrottleConfig` | 500 | 잘못된 스로틀 규칙 정의 |
//! | `NoHandler` | 500 | 매칭되는 예외 핸들러 없음 |
//! | `Throttled` | 429 | 스로틀 규칙에 의해 거부됨 |
//! | `ValidationError` | 400 | 입력값 검증 실패 |
//! | `NotFound` | 404 | 리소스 없음 |
//! | `RedisError` | 500 | Redis 통신 실패 |
//! | `ServiceConstruction` | 500 | 팩토리 패닉 |
//! | `InternalError` | 500 | 예상하지 못한 오류 |
//!
//! 구성 에러(드라이버, 규칙)는 서비스 해석 시점에 즉시 호출자에게 전파되며,
//! 기본 드라이버로 조용히 대체되지 않습니다.

use chrono::{DateTime, Utc};
use thiserror::Error;

/// 애플리케이션 전역 에러 타입
#[derive(Error, Debug)]
pub enum AppError {
    /// 클래스 매퍼에 바인딩되지 않은 역할
    #[error("Unknown role: {0}")]
    UnknownRole(String),

    /// 컨테이너에 등록되지 않은 서비스
    #[error("Unknown service: {0}")]
    UnknownService(String),

    /// 이미 인스턴스가 생성된 서비스에 대한 확장 시도
    #[error("Service '{0}' has already been resolved and can no longer be extended")]
    FrozenService(String),

    /// 동일 스레드에서 생성 중인 서비스를 다시 요청함
    #[error("Circular dependency detected while resolving: {0}")]
    CircularDependency(String),

    /// 등록된 값의 타입이 요청한 타입과 다름
    #[error("Type mismatch for '{name}': expected {expected}")]
    TypeMismatch {
        name: String,
        expected: &'static str,
    },

    /// 설정이 지원하지 않는 드라이버를 지정함
    #[error("Unsupported {setting} driver: {value}")]
    UnsupportedDriver {
        setting: &'static str,
        value: String,
    },

    /// 잘못된 스로틀 규칙 정의
    #[error("Invalid throttle rule '{rule}': {reason}")]
    ThrottleConfig { rule: String, reason: String },

    /// 에러 종류에 매칭되는 핸들러도, 기본 핸들러도 없음
    #[error("No exception handler registered for kind: {0}")]
    NoHandler(String),

    /// 스로틀 규칙에 의해 요청이 거부됨
    #[error("Too many attempts for '{throttle}', retry after {delay_until}")]
    Throttled {
        throttle: String,
        delay_until: DateTime<Utc>,
    },

    /// 서비스 팩토리가 패닉함
    #[error("Failed to construct service '{name}': {reason}")]
    ServiceConstruction { name: String, reason: String },

    /// 입력값 검증 에러 (400 Bad Request)
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// 리소스 찾을 수 없음 에러 (404 Not Found)
    #[error("Not found: {0}")]
    NotFound(String),

    /// Redis 관련 에러 (500 Internal Server Error)
    #[error("Redis error: {0}")]
    RedisError(String),

    /// 내부 서버 에러 (500 Internal Server Error)
    #[error("Internal server error: {0}")]
    InternalError(String),
}

impl From<redis::RedisError> for AppError {
    fn from(e: redis::RedisError) -> Self {
        AppError::RedisError(e.to_string())
    }
}

impl actix_web::ResponseError for AppError {
    fn status_code(&self) -> actix_web::http::StatusCode {
        use actix_web::http::StatusCode;

        match self {
            AppError::ValidationError(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Throttled { .. } => StatusCode::TOO_MANY_REQUESTS,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// HTTP 에러 응답을 생성합니다.
    ///
    /// 상세 렌더링은 [`crate::errors::ExceptionHandlerManager`]가 담당하며,
    /// 이 구현은 핸들러 매니저를 거치지 않은 에러를 위한 최소 응답입니다.
    fn error_response(&self) -> actix_web::HttpResponse {
        actix_web::HttpResponse::build(self.status_code())
            .json(serde_json::json!({
                "error": self.to_string()
            }))
    }
}

/// 편의성을 위한 Result 타입 별칭
pub type AppResult<T> = Result<T, AppError>;

/// 외부 라이브러리 에러를 AppError로 변환하는 확장 trait
pub trait ErrorContext<T> {
    /// 컨텍스트 정보와 함께 에러를 변환합니다.
    fn context(self, msg: &str) -> AppResult<T>;

    /// 클로저를 사용하여 지연 평가된 컨텍스트를 제공합니다.
    fn with_context<F>(self, f: F) -> AppResult<T>
    where
        F: FnOnce() -> String;
}

impl<T, E> ErrorContext<T> for Result<T, E>
where
    E: std::fmt::Display,
{
    fn context(self, msg: &str) -> AppResult<T> {
        self.map_err(|e| AppError::InternalError(format!("{}: {}", msg, e)))
    }

    fn with_context<F>(self, f: F) -> AppResult<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| AppError::InternalError(format!("{}: {}", f(), e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::ResponseError;
    use actix_web::http::StatusCode;

    #[test]
    fn test_validation_error_response() {
        let error = AppError::ValidationError("Email is required".to_string());
        let response = error.error_response();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_throttled_error_response() {
        let error = AppError::Throttled {
            throttle: "sign_in_attempt".to_string(),
            delay_until: Utc::now(),
        };

        assert_eq!(error.error_response().status(), StatusCode::TOO_MANY_REQUESTS);
    }

    #[test]
    fn test_configuration_errors_are_server_errors() {
        let errors = vec![
            AppError::UnknownRole("user_sprunje".to_string()),
            AppError::UnknownService("mailer".to_string()),
            AppError::UnsupportedDriver {
                setting: "cache.driver",
                value: "memcached".to_string(),
            },
            AppError::ThrottleConfig {
                rule: "sign_in_attempt".to_string(),
                reason: "delays must not be empty".to_string(),
            },
        ];

        for error in errors {
            assert_eq!(error.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        }
    }

    #[test]
    fn test_unsupported_driver_message() {
        let error = AppError::UnsupportedDriver {
            setting: "session.handler",
            value: "database".to_string(),
        };

        assert_eq!(error.to_string(), "Unsupported session.handler driver: database");
    }

    #[test]
    fn test_error_context_trait() {
        let result: Result<(), &str> = Err("original error");
        let app_result = result.context("Additional context");

        if let Err(AppError::InternalError(msg)) = app_result {
            assert!(msg.contains("Additional context"));
            assert!(msg.contains("original error"));
        } else {
            panic!("Expected InternalError");
        }
    }
}
