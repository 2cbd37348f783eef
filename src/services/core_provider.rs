//! 코어 서비스 프로바이더
//!
//! 애플리케이션 런타임 의존성을 컨테이너에 등록합니다. 모든 팩토리는 지연 실행되며,
//! 드라이버 선택은 해석 시점의 `config` 서비스를 따릅니다.
//!
//! | 서비스 | 타입 | 의존 |
//! |--------|------|------|
//! | `config` | `ConfigRepository` | - |
//! | `class_mapper` | `ClassMapper` | - |
//! | `cache` | `Cache` | `config` |
//! | `session` | `Session` | `config` |
//! | `alerts` | `AlertStream` | `config`, `cache` 또는 `session` |
//! | `logger.<channel>` | `ChannelLogger` | - |
//! | `throttler` | `Throttler` | `config` |
//! | `exception_handler` | `ExceptionHandlerManager` | `class_mapper` |

use std::sync::Arc;

use log::debug;

use crate::alerts::AlertStream;
use crate::caching::Cache;
use crate::caching::redis::RedisClient;
use crate::config::{AlertStorage, AttemptStorage, ConfigRepository};
use crate::core::class_mapper::{ClassBinding, ClassMapper};
use crate::core::errors::AppResult;
use crate::core::registry::{ProviderRegistration, ServiceContainer, ServiceProvider};
use crate::errors::{
    ErrorKind, ExceptionHandlerManager, GenericExceptionHandler, HtmlRenderer, HttpExceptionHandler, JsonRenderer,
    ResponseRenderer, ThrottleExceptionHandler,
};
use crate::logging::{ChannelLogger, LogChannel};
use crate::session::Session;
use crate::throttle::{AttemptStore, MemoryAttemptStore, RedisAttemptStore, Throttler};

pub const CONFIG: &str = "config";
pub const CLASS_MAPPER: &str = "class_mapper";
pub const CACHE: &str = "cache";
pub const SESSION: &str = "session";
pub const ALERTS: &str = "alerts";
pub const THROTTLER: &str = "throttler";
pub const EXCEPTION_HANDLER: &str = "exception_handler";

/// 기본 서비스 묶음
pub struct CoreServicesProvider;

impl ServiceProvider for CoreServicesProvider {
    fn name(&self) -> &str {
        "core"
    }

    fn register(&self, container: &ServiceContainer) -> AppResult<()> {
        container.register(CONFIG, |_| Ok(ConfigRepository::from_env()));

        container.register(CLASS_MAPPER, |_| Ok(default_class_mapper()));

        container.register(CACHE, |c| {
            let config = c.get::<ConfigRepository>(CONFIG)?;
            Cache::from_config(&config)
        });

        container.register(SESSION, |c| {
            let config = c.get::<ConfigRepository>(CONFIG)?;
            Session::from_config(&config)
        });

        container.register(ALERTS, |c| {
            let config = c.get::<ConfigRepository>(CONFIG)?;
            let key = config.get_string_or("alert.key", "site.alerts");
            match AlertStorage::from_config(&config)? {
                AlertStorage::Cache => Ok(AlertStream::with_cache(&key, c.get::<Cache>(CACHE)?)),
                AlertStorage::Session => Ok(AlertStream::with_session(&key, c.get::<Session>(SESSION)?)),
            }
        });

        for channel in LogChannel::ALL {
            container.register(&channel.service_name(), move |_| Ok(ChannelLogger::new(channel)));
        }

        container.register(THROTTLER, |c| {
            let config = c.get::<ConfigRepository>(CONFIG)?;
            Throttler::from_config(&config, attempt_store(&config)?)
        });

        container.register(EXCEPTION_HANDLER, |c| {
            let manager = ExceptionHandlerManager::new(c.get::<ClassMapper>(CLASS_MAPPER)?);
            manager.set_default_handler(|| GenericExceptionHandler);
            manager.register_handler(ErrorKind::Http, || HttpExceptionHandler);
            manager.register_handler(ErrorKind::Throttled, || ThrottleExceptionHandler);
            Ok(manager)
        });

        Ok(())
    }
}

inventory::submit! {
    ProviderRegistration {
        priority: 0,
        provider: &CoreServicesProvider,
    }
}

/// `renderer.json`, `renderer.html` 역할이 바인딩된 클래스 매퍼
pub fn default_class_mapper() -> ClassMapper {
    let mapper = ClassMapper::new();
    mapper.set_mapping(
        "renderer.json",
        ClassBinding::new::<(), _, _>("JsonRenderer", |_| Arc::new(JsonRenderer) as Arc<dyn ResponseRenderer>),
    );
    mapper.set_mapping(
        "renderer.html",
        ClassBinding::new::<(), _, _>("HtmlRenderer", |_| Arc::new(HtmlRenderer) as Arc<dyn ResponseRenderer>),
    );
    mapper
}

fn attempt_store(config: &ConfigRepository) -> AppResult<Arc<dyn AttemptStore>> {
    let storage = AttemptStorage::from_config(config)?;
    debug!("Throttle attempts stored in '{}'", storage);

    Ok(match storage {
        AttemptStorage::Memory => Arc::new(MemoryAttemptStore::new()),
        AttemptStorage::Redis => {
            let url = config.get_string_or("redis.url", "redis://localhost:6379");
            let prefix = config.get_string_or("cache.prefix", "bootstrap");
            Arc::new(RedisAttemptStore::new(RedisClient::open(&url)?, &prefix))
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Environment;
    use crate::core::errors::AppError;
    use crate::errors::RenderContext;
    use crate::throttle::RequestFingerprint;
    use serde_json::json;

    fn container_with(overrides: serde_json::Value) -> ServiceContainer {
        let container = ServiceContainer::new();
        CoreServicesProvider.register(&container).unwrap();

        let mut config = ConfigRepository::defaults(&Environment::Test);
        config.merge(overrides);
        container.instance(CONFIG, Arc::new(config));
        container
    }

    /// 확장 모듈 역할: HTML 렌더러를 교체
    struct PlainTextRenderer;

    impl ResponseRenderer for PlainTextRenderer {
        fn content_type(&self) -> &'static str {
            "text/plain"
        }

        fn render(&self, report: &crate::errors::ErrorReport) -> AppResult<String> {
            Ok(report.message.clone())
        }
    }

    struct PlainTextProvider;

    impl ServiceProvider for PlainTextProvider {
        fn name(&self) -> &str {
            "plain_text"
        }

        fn register(&self, container: &ServiceContainer) -> AppResult<()> {
            container.extend::<ClassMapper, _>(CLASS_MAPPER, |mapper, _| {
                mapper.set_mapping(
                    "renderer.html",
                    ClassBinding::new::<(), _, _>("PlainTextRenderer", |_| {
                        Arc::new(PlainTextRenderer) as Arc<dyn ResponseRenderer>
                    }),
                );
                Ok(mapper)
            })
        }
    }

    #[test]
    fn test_all_core_services_resolve() {
        let container = container_with(json!({}));

        assert!(container.initialize_all().unwrap() >= 11);
        assert!(container.has("logger.query"));
        assert_eq!(container.get::<Cache>(CACHE).unwrap().driver().as_str(), "array");
        assert_eq!(
            container.get::<AlertStream>(ALERTS).unwrap().storage(),
            AlertStorage::Session
        );
    }

    #[test]
    fn test_alert_storage_follows_config() {
        let container = container_with(json!({ "alert": { "storage": "cache" } }));
        assert_eq!(container.get::<AlertStream>(ALERTS).unwrap().storage(), AlertStorage::Cache);
        assert!(container.is_resolved(CACHE));
        assert!(!container.is_resolved(SESSION));
    }

    #[test]
    fn test_unsupported_driver_surfaces_at_resolution() {
        let container = container_with(json!({ "cache": { "driver": "memcached" } }));

        assert!(matches!(
            container.get::<Cache>(CACHE),
            Err(AppError::UnsupportedDriver { setting: "cache.driver", .. })
        ));
        // 실패는 캐시되지 않음
        assert!(!container.is_resolved(CACHE));
    }

    #[test]
    fn test_invalid_throttle_rule_surfaces_at_resolution() {
        // 기본 규칙이 없는 종류여야 merge로 interval이 채워지지 않음
        let container = container_with(json!({
            "throttles": { "custom_rule": { "method": "interval", "delays": [1] } }
        }));

        assert!(matches!(
            container.get::<Throttler>(THROTTLER),
            Err(AppError::ThrottleConfig { rule, .. }) if rule == "custom_rule"
        ));
        assert!(!container.is_resolved(THROTTLER));
    }

    #[test]
    fn test_later_provider_overrides_renderer_role() {
        let container = container_with(json!({}));
        PlainTextProvider.register(&container).unwrap();

        let manager = container.get::<ExceptionHandlerManager>(EXCEPTION_HANDLER).unwrap();
        let response = manager.handle(
            &AppError::NotFound("page".to_string()),
            &RenderContext::new(false, crate::errors::RenderFormat::Html),
        );

        assert_eq!(response.headers().get("content-type").unwrap(), "text/plain");
        let mapper = container.get::<ClassMapper>(CLASS_MAPPER).unwrap();
        assert_eq!(mapper.get_class("renderer.html").unwrap().implementation(), "PlainTextRenderer");
        assert_eq!(mapper.get_class("renderer.json").unwrap().implementation(), "JsonRenderer");
    }

    #[test]
    fn test_default_exception_handler_covers_every_kind() {
        let container = container_with(json!({}));
        let manager = container.get::<ExceptionHandlerManager>(EXCEPTION_HANDLER).unwrap();

        assert!(manager.validate(&[ErrorKind::Throttled, ErrorKind::UnknownRole, ErrorKind::Redis]).is_ok());
        assert_eq!(manager.resolve_kind(ErrorKind::Throttled), Some(ErrorKind::Throttled));
        assert_eq!(manager.resolve_kind(ErrorKind::NotFound), Some(ErrorKind::Http));
    }

    #[actix_web::test]
    async fn test_throttler_service_uses_configured_rules() {
        let container = container_with(json!({}));
        let throttler = container.get::<Throttler>(THROTTLER).unwrap();
        let subject = RequestFingerprint::from_ip("192.0.2.1");
        let now = chrono::Utc::now();

        let first = throttler.attempt("verification_request", &subject, now).await.unwrap();
        let second = throttler.attempt("verification_request", &subject, now).await.unwrap();

        assert!(first.allowed);
        assert!(!second.allowed);
    }
}
