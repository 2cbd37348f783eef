//! ThrottleGuard 판정 로직
use std::rc::Rc;

use actix_web::body::EitherBody;
use actix_web::dev::{Service, ServiceRequest, ServiceResponse, forward_ready};
use actix_web::http::Method;
use actix_web::{Error, web};
use chrono::Utc;
use futures_util::future::LocalBoxFuture;

use crate::core::errors::AppResult;
use crate::core::registry::ServiceContainer;
use crate::handlers::render_error;
use crate::middlewares::throttle_guard::ThrottleGuard;
use crate::services::core_provider::THROTTLER;
use crate::throttle::{RequestFingerprint, Throttler};

/// 실제 판정을 수행하는 서비스
pub struct ThrottleGuardService<S> {
    pub service: Rc<S>,
    pub throttle: Rc<str>,
    pub methods: Rc<[Method]>,
}

impl<S, B> Service<ServiceRequest> for ThrottleGuardService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, actix_web::Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = self.service.clone();
        let throttle = self.throttle.clone();
        let methods = self.methods.clone();

        Box::pin(async move {
            if !ThrottleGuard::applies_to(&methods, req.method()) {
                let res = service.call(req).await?;
                return Ok(res.map_into_left_body());
            }

            let Some(container) = req.app_data::<web::Data<ServiceContainer>>().cloned() else {
                log::warn!("No service container registered, '{}' is not enforced", throttle);
                let res = service.call(req).await?;
                return Ok(res.map_into_left_body());
            };

            let subject = fingerprint(&req);
            if let Err(err) = enforce(&container, &throttle, &subject).await {
                let response = render_error(&container, req.request(), &err);
                let (req, _) = req.into_parts();
                return Ok(ServiceResponse::new(req, response).map_into_right_body());
            }

            let res = service.call(req).await?;
            Ok(res.map_into_left_body())
        })
    }
}

/// 시도를 기록하고 거부되면 `Throttled` 에러를 반환
async fn enforce(container: &ServiceContainer, throttle: &str, subject: &RequestFingerprint) -> AppResult<()> {
    let throttler = container.get::<Throttler>(THROTTLER)?;
    throttler
        .attempt(throttle, subject, Utc::now())
        .await?
        .into_result(throttle)
}

/// 클라이언트 IP 기반 지문. 프록시 헤더(`Forwarded`, `X-Forwarded-For`)를 우선합니다.
fn fingerprint(req: &ServiceRequest) -> RequestFingerprint {
    let info = req.connection_info();
    RequestFingerprint::from_ip(info.realip_remote_addr().unwrap_or("unknown"))
}
