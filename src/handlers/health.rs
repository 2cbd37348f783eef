//! 헬스 체크 핸들러

use actix_web::{HttpResponse, get, web};
use serde_json::json;

use crate::core::registry::ServiceContainer;

/// 서버 상태 확인 엔드포인트
///
/// # 응답 (200 OK)
///
/// ```json
/// {
///   "status": "healthy",
///   "service": "service_bootstrap",
///   "version": "0.1.0",
///   "timestamp": "2024-01-01T00:00:00Z",
///   "services": ["alerts", "cache", "class_mapper", "config"]
/// }
/// ```
#[get("/health")]
pub async fn health_check(container: web::Data<ServiceContainer>) -> HttpResponse {
    HttpResponse::Ok().json(json!({
        "status": "healthy",
        "service": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "services": container.service_names(),
    }))
}
