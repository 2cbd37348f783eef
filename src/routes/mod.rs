//! 라우트 구성 모듈
//!
//! | 메서드 | 경로 | 핸들러 | 미들웨어 |
//! |--------|------|--------|----------|
//! | `GET` | `/health` | `health::health_check` | - |
//! | `GET` | `/api/v1/alerts` | `alerts::get_alerts` | - |
//! | `POST` | `/api/v1/alerts` | `alerts::add_alert` | `ThrottleGuard("alert_request")` |
//!
//! 모든 핸들러는 `web::Data<ServiceContainer>` 앱 데이터가 등록되어 있어야 합니다.
//! JSON 본문 오류와 없는 경로도 `exception_handler` 서비스로 렌더링됩니다.

use actix_web::http::Method;
use actix_web::web;

use crate::handlers;
use crate::middlewares::ThrottleGuard;

/// 모든 라우트를 설정합니다
///
/// ```rust,ignore
/// use actix_web::{web, App};
///
/// let app = App::new()
///     .app_data(web::Data::new(container))
///     .configure(configure_all_routes);
/// ```
pub fn configure_all_routes(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(handlers::json_error_handler))
        .service(handlers::health::health_check);

    configure_alert_routes(cfg);

    cfg.default_service(web::to(handlers::not_found));
}

/// 알림 라우트를 설정합니다
///
/// ```bash
/// curl -X POST http://localhost:8080/api/v1/alerts \
///   -H "Content-Type: application/json" \
///   -d '{"level":"success","message":"Profile saved"}' -c cookies.txt
///
/// curl http://localhost:8080/api/v1/alerts -b cookies.txt
/// ```
fn configure_alert_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1/alerts")
            .wrap(ThrottleGuard::new("alert_request").only(Method::POST))
            .service(handlers::alerts::get_alerts)
            .service(handlers::alerts::add_alert),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ConfigRepository, Environment};
    use crate::core::registry::{ServiceContainer, ServiceProvider};
    use crate::services::CoreServicesProvider;
    use crate::services::core_provider::CONFIG;
    use actix_web::http::StatusCode;
    use actix_web::{App, test};
    use serde_json::{Value, json};
    use std::sync::Arc;

    fn container(overrides: Value) -> web::Data<ServiceContainer> {
        let container = ServiceContainer::new();
        CoreServicesProvider.register(&container).unwrap();

        let mut config = ConfigRepository::defaults(&Environment::Test);
        config.merge(overrides);
        container.instance(CONFIG, Arc::new(config));
        web::Data::new(container)
    }

    #[actix_web::test]
    async fn test_health_check_lists_services() {
        let app = test::init_service(
            App::new()
                .app_data(container(json!({})))
                .configure(configure_all_routes),
        )
        .await;

        let body: Value = test::call_and_read_body_json(&app, test::TestRequest::get().uri("/health").to_request()).await;

        assert_eq!(body["status"], "healthy");
        assert!(body["services"].as_array().unwrap().contains(&json!("throttler")));
    }

    #[actix_web::test]
    async fn test_alert_round_trip_through_session_cookie() {
        let app = test::init_service(
            App::new()
                .app_data(container(json!({})))
                .configure(configure_all_routes),
        )
        .await;

        let created = test::call_service(
            &app,
            test::TestRequest::post()
                .uri("/api/v1/alerts")
                .set_json(json!({ "level": "success", "message": "Profile saved" }))
                .to_request(),
        )
        .await;
        assert_eq!(created.status(), StatusCode::CREATED);
        let cookie = created
            .response()
            .cookies()
            .find(|c| c.name() == "bootstrap_session")
            .unwrap()
            .into_owned();

        let body: Value = test::call_and_read_body_json(
            &app,
            test::TestRequest::get().uri("/api/v1/alerts").cookie(cookie.clone()).to_request(),
        )
        .await;
        assert_eq!(body["alerts"][0]["message"], "Profile saved");

        let emptied: Value = test::call_and_read_body_json(
            &app,
            test::TestRequest::get().uri("/api/v1/alerts").cookie(cookie).to_request(),
        )
        .await;
        assert_eq!(emptied["alerts"], json!([]));
    }

    #[actix_web::test]
    async fn test_validation_error_rendered_by_exception_handler() {
        let app = test::init_service(
            App::new()
                .app_data(container(json!({})))
                .configure(configure_all_routes),
        )
        .await;

        let res = test::call_service(
            &app,
            test::TestRequest::post()
                .uri("/api/v1/alerts")
                .set_json(json!({ "level": "info", "message": "" }))
                .to_request(),
        )
        .await;

        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(res).await;
        assert_eq!(body["error"], "validation");
        assert!(body["reference"].is_string());
        // 테스트 환경은 상세 에러를 노출
        assert!(body["details"]["lineage"].is_array());
    }

    #[actix_web::test]
    async fn test_malformed_json_rendered_by_exception_handler() {
        let app = test::init_service(
            App::new()
                .app_data(container(json!({})))
                .configure(configure_all_routes),
        )
        .await;

        let res = test::call_service(
            &app,
            test::TestRequest::post()
                .uri("/api/v1/alerts")
                .insert_header(("content-type", "application/json"))
                .set_payload("{not json")
                .to_request(),
        )
        .await;

        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        assert_eq!(res.headers().get("content-type").unwrap(), "application/json");
        let body: Value = test::read_body_json(res).await;
        assert_eq!(body["error"], "validation");
        assert!(body["reference"].is_string());
    }

    #[actix_web::test]
    async fn test_unknown_route_rendered_by_exception_handler() {
        let app = test::init_service(
            App::new()
                .app_data(container(json!({})))
                .configure(configure_all_routes),
        )
        .await;

        let res = test::call_service(&app, test::TestRequest::get().uri("/api/v1/missing").to_request()).await;

        assert_eq!(res.status(), StatusCode::NOT_FOUND);
        let body: Value = test::read_body_json(res).await;
        assert_eq!(body["error"], "not_found");
        assert!(body["reference"].is_string());
    }

    #[actix_web::test]
    async fn test_alert_posts_are_throttled() {
        let app = test::init_service(
            App::new()
                .app_data(container(json!({
                    "throttles": { "alert_request": { "method": "single", "delays": [0, 60] } }
                })))
                .configure(configure_all_routes),
        )
        .await;

        let post = || {
            test::TestRequest::post()
                .uri("/api/v1/alerts")
                .set_json(json!({ "level": "info", "message": "hi" }))
                .to_request()
        };

        assert_eq!(test::call_service(&app, post()).await.status(), StatusCode::CREATED);
        let throttled = test::call_service(&app, post()).await;
        assert_eq!(throttled.status(), StatusCode::TOO_MANY_REQUESTS);
        assert!(throttled.headers().contains_key("retry-after"));

        // 조회는 스로틀 대상이 아님
        let read = test::call_service(&app, test::TestRequest::get().uri("/api/v1/alerts").to_request()).await;
        assert_eq!(read.status(), StatusCode::OK);
    }
}
