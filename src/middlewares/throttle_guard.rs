//! 스로틀 미들웨어
//!
//! 요청마다 `throttler` 서비스에 시도를 기록하고, 규칙에 걸리면 핸들러를 호출하지 않고
//! `exception_handler`가 만든 429 응답을 돌려줍니다.

use std::future::{Ready, ready};
use std::rc::Rc;

use actix_web::{
    Error, Result,
    body::EitherBody,
    dev::{Service, ServiceRequest, ServiceResponse, Transform},
    http::Method,
};

use crate::middlewares::throttle_inner::ThrottleGuardService;

/// 스로틀 미들웨어
pub struct ThrottleGuard {
    /// 적용할 스로틀 종류 (`throttles.<type>`)
    throttle: String,
    /// 비어 있으면 모든 메서드에 적용
    methods: Vec<Method>,
}

impl ThrottleGuard {
    pub fn new(throttle: &str) -> Self {
        Self {
            throttle: throttle.to_string(),
            methods: Vec::new(),
        }
    }

    /// 특정 메서드 요청에만 적용
    pub fn only(mut self, method: Method) -> Self {
        self.methods.push(method);
        self
    }

    pub(crate) fn applies_to(methods: &[Method], method: &Method) -> bool {
        methods.is_empty() || methods.contains(method)
    }
}

impl<S, B> Transform<S, ServiceRequest> for ThrottleGuard
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Transform = ThrottleGuardService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(ThrottleGuardService {
            service: Rc::new(service),
            throttle: Rc::from(self.throttle.as_str()),
            methods: Rc::from(self.methods.as_slice()),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::registry::ServiceContainer;
    use crate::services::core_provider::THROTTLER;
    use crate::throttle::{MemoryAttemptStore, ThrottleMethod, ThrottleRule, Throttler};
    use actix_web::http::StatusCode;
    use actix_web::{App, HttpResponse, test, web};
    use chrono::Duration;
    use std::sync::Arc;

    fn container_with_cooldown() -> ServiceContainer {
        let container = ServiceContainer::new();
        container.register(THROTTLER, |_| {
            let mut throttler = Throttler::new(Arc::new(MemoryAttemptStore::new()));
            throttler.add_rule(
                "ping",
                Some(ThrottleRule::new(
                    "ping",
                    ThrottleMethod::Single,
                    None,
                    vec![Duration::zero(), Duration::minutes(5)],
                )?),
            );
            Ok(throttler)
        });
        container
    }

    #[actix_web::test]
    async fn test_method_filter() {
        assert!(ThrottleGuard::applies_to(&[], &Method::GET));
        assert!(ThrottleGuard::applies_to(&[Method::POST], &Method::POST));
        assert!(!ThrottleGuard::applies_to(&[Method::POST], &Method::GET));
    }

    #[actix_web::test]
    async fn test_second_request_is_throttled() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(container_with_cooldown()))
                .service(
                    web::scope("/guarded")
                        .wrap(ThrottleGuard::new("ping"))
                        .route("", web::get().to(HttpResponse::Ok)),
                ),
        )
        .await;

        let first = test::call_service(&app, test::TestRequest::get().uri("/guarded").to_request()).await;
        let second = test::call_service(&app, test::TestRequest::get().uri("/guarded").to_request()).await;

        assert_eq!(first.status(), StatusCode::OK);
        assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);
    }

    #[actix_web::test]
    async fn test_unlisted_method_passes() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(container_with_cooldown()))
                .service(
                    web::scope("/guarded")
                        .wrap(ThrottleGuard::new("ping").only(Method::POST))
                        .route("", web::get().to(HttpResponse::Ok)),
                ),
        )
        .await;

        for _ in 0..3 {
            let res = test::call_service(&app, test::TestRequest::get().uri("/guarded").to_request()).await;
            assert_eq!(res.status(), StatusCode::OK);
        }
    }
}
