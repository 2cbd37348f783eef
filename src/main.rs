//! 서비스 부트스트랩 메인 애플리케이션
//!
//! 프로바이더를 수집해 서비스 컨테이너를 구성하고, 구성 오류를 트래픽을 받기 전에
//! 드러낸 뒤 Actix-web HTTP 서버를 구동합니다.

use actix_cors::Cors;
use actix_web::http::header;
use actix_web::{App, HttpServer, middleware, web};
use dotenv::dotenv;
use env_logger::Env;
use log::{error, info};
use service_bootstrap::caching::redis::RedisClient;
use service_bootstrap::config::{AttemptStorage, CacheDriver, ConfigRepository, ServerConfig, SessionHandler};
use service_bootstrap::core::{AppResult, ServiceContainer};
use service_bootstrap::errors::{ErrorKind, ExceptionHandlerManager};
use service_bootstrap::routes::configure_all_routes;
use service_bootstrap::services::core_provider::{CONFIG, EXCEPTION_HANDLER};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // 환경 설정 및 로깅 초기화
    load_env_file();
    init_logging();

    info!("🚀 서비스 부트스트랩 시작중...");

    let container = bootstrap_container().await.map_err(|e| {
        error!("❌ 서비스 컨테이너 구성 실패: {}", e);
        std::io::Error::other(e.to_string())
    })?;

    info!("✅ 모든 서비스가 성공적으로 초기화되었습니다!");

    start_http_server(web::Data::new(container)).await
}

/// 컨테이너를 구성하고 시작 시점 검증을 수행합니다
///
/// - 모든 공유 서비스 생성 (드라이버/규칙 설정 오류는 여기서 실패)
/// - 모든 에러 종류에 대한 핸들러 존재 확인
/// - Redis를 사용하는 드라이버가 있으면 연결 확인
async fn bootstrap_container() -> AppResult<ServiceContainer> {
    let container = ServiceContainer::discover()?;

    container
        .get::<ExceptionHandlerManager>(EXCEPTION_HANDLER)?
        .validate(&ErrorKind::ALL)?;

    let config = container.get::<ConfigRepository>(CONFIG)?;
    if uses_redis(&config)? {
        let url = config.get_string_or("redis.url", "redis://localhost:6379");
        RedisClient::open(&url)?.ping().await?;
    }

    Ok(container)
}

fn uses_redis(config: &ConfigRepository) -> AppResult<bool> {
    Ok(CacheDriver::from_config(config)? == CacheDriver::Redis
        || SessionHandler::from_config(config)? == SessionHandler::Redis
        || AttemptStorage::from_config(config)? == AttemptStorage::Redis)
}

/// HTTP 서버를 구성하고 실행합니다
///
/// CORS, 로깅, 경로 정규화 미들웨어를 포함하며, 컨테이너 핸들을 앱 데이터로 공유합니다.
///
/// # Errors
///
/// * `std::io::Error` - 포트 바인딩 실패 또는 서버 실행 오류
async fn start_http_server(container: web::Data<ServiceContainer>) -> std::io::Result<()> {
    let bind_address = ServerConfig::bind_address();

    info!("🌐 서버가 http://{} 에서 실행중입니다", bind_address);
    info!("📍 Health check: http://{}/health", bind_address);
    info!("📍 Alerts: http://{}/api/v1/alerts", bind_address);

    HttpServer::new(move || {
        App::new()
            .app_data(container.clone())
            .wrap(configure_cors())
            .wrap(middleware::Logger::default())
            .wrap(middleware::NormalizePath::trim())
            .configure(configure_all_routes)
    })
    .bind(bind_address)?
    .workers(4)
    .run()
    .await
}

/// 환경별 설정 파일을 로드합니다
///
/// * `PROFILE=dev` - .env.dev 파일 로드 (기본값)
/// * `PROFILE=prod` - .env.prod 파일 로드
/// * 기타 - 기본 .env 파일 로드
fn load_env_file() {
    let profile = std::env::var("PROFILE").unwrap_or_else(|_| "dev".to_string());

    let loaded = match profile.as_str() {
        "prod" => dotenv::from_filename(".env.prod").map(|_| ".env.prod"),
        "dev" => dotenv::from_filename(".env.dev").map(|_| ".env.dev"),
        _ => dotenv().map(|_| ".env"),
    };

    // 로거 초기화 전이므로 표준 출력 사용
    match loaded {
        Ok(file) => println!("Profile '{}': {} 파일 로드 됨", profile, file),
        Err(e) => eprintln!("Profile '{}': 환경 파일 로드 실패: {}", profile, e),
    }
}

/// 로깅 시스템을 초기화합니다
///
/// * `RUST_LOG` - 로깅 레벨 설정 (기본값: "info,actix_web=debug")
///
/// ```bash
/// # 스로틀 판정과 쿼리 채널만 debug
/// RUST_LOG=info,service_bootstrap::throttle=debug,service_bootstrap::query=debug cargo run
/// ```
fn init_logging() {
    env_logger::init_from_env(Env::default().default_filter_or("info,actix_web=debug"));
}

/// CORS 설정을 구성합니다
fn configure_cors() -> Cors {
    Cors::default()
        .allowed_origin("http://localhost:3000")
        .allowed_origin("http://127.0.0.1:3000")
        .allowed_origin("http://localhost:8080")
        .allowed_origin("http://127.0.0.1:8080")
        .allowed_methods(vec!["GET", "POST", "OPTIONS"])
        .allowed_headers(vec![header::ACCEPT, header::CONTENT_TYPE])
        .expose_headers(vec![header::RETRY_AFTER])
        .supports_credentials()
        .max_age(3600)
}
