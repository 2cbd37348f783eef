//! 에러 응답 렌더링
//!
//! 핸들러는 [`ErrorReport`]를 만들고, 렌더러가 요청 형식에 맞춰 본문을 작성합니다.
//! 렌더러는 클래스 매퍼의 `renderer.json`, `renderer.html` 역할로 교체할 수 있습니다.

use actix_web::HttpRequest;
use actix_web::http::{StatusCode, header};
use serde::Serialize;
use uuid::Uuid;

use crate::core::errors::{AppResult, ErrorContext};
use crate::errors::kind::ErrorKind;

/// 응답 본문 형식
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RenderFormat {
    #[default]
    Json,
    Html,
}

impl RenderFormat {
    /// `Accept` 헤더로 형식을 고릅니다. HTML만 명시적으로 원할 때 `Html`.
    pub fn from_accept(accept: Option<&str>) -> Self {
        match accept {
            Some(accept) if accept.contains("text/html") && !accept.contains("application/json") => {
                RenderFormat::Html
            }
            _ => RenderFormat::Json,
        }
    }

    /// 이 형식의 렌더러가 바인딩되는 클래스 매퍼 역할
    pub fn role(self) -> &'static str {
        match self {
            RenderFormat::Json => "renderer.json",
            RenderFormat::Html => "renderer.html",
        }
    }
}

/// 에러 처리 시 전달되는 요청 컨텍스트
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RenderContext {
    /// 응답에 내부 에러 정보를 포함할지
    pub detailed_errors: bool,
    pub format: RenderFormat,
}

impl RenderContext {
    pub fn new(detailed_errors: bool, format: RenderFormat) -> Self {
        Self {
            detailed_errors,
            format,
        }
    }

    pub fn from_request(req: &HttpRequest, detailed_errors: bool) -> Self {
        let accept = req
            .headers()
            .get(header::ACCEPT)
            .and_then(|value| value.to_str().ok());
        Self::new(detailed_errors, RenderFormat::from_accept(accept))
    }
}

/// 상세 에러 정보. `detailed_errors`가 켜진 경우에만 포함됩니다.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorDetails {
    pub description: String,
    pub lineage: Vec<ErrorKind>,
}

/// 렌더링할 에러 응답 내용
#[derive(Debug, Clone, Serialize)]
pub struct ErrorReport {
    #[serde(skip)]
    pub status: StatusCode,
    pub code: u16,
    pub error: ErrorKind,
    pub message: String,
    /// 로그와 응답을 연결하는 참조 ID
    pub reference: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<ErrorDetails>,
}

impl ErrorReport {
    pub fn new(status: StatusCode, error: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            status,
            code: status.as_u16(),
            error,
            message: message.into(),
            reference: Uuid::new_v4(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: ErrorDetails) -> Self {
        self.details = Some(details);
        self
    }
}

/// 에러 응답 본문 작성기
pub trait ResponseRenderer: Send + Sync {
    fn content_type(&self) -> &'static str;

    fn render(&self, report: &ErrorReport) -> AppResult<String>;
}

pub struct JsonRenderer;

impl ResponseRenderer for JsonRenderer {
    fn content_type(&self) -> &'static str {
        "application/json"
    }

    fn render(&self, report: &ErrorReport) -> AppResult<String> {
        serde_json::to_string(report).context("Failed to serialize error report")
    }
}

pub struct HtmlRenderer;

impl ResponseRenderer for HtmlRenderer {
    fn content_type(&self) -> &'static str {
        "text/html; charset=utf-8"
    }

    fn render(&self, report: &ErrorReport) -> AppResult<String> {
        let title = format!(
            "{} {}",
            report.code,
            report.status.canonical_reason().unwrap_or("Error")
        );

        let mut body = format!(
            "<!DOCTYPE html>\n<html><head><title>{title}</title></head><body>\n<h1>{title}</h1>\n<p>{}</p>\n<p><small>Reference: {}</small></p>\n",
            escape_html(&report.message),
            report.reference,
            title = escape_html(&title),
        );

        if let Some(details) = &report.details {
            let lineage: Vec<&str> = details.lineage.iter().map(|kind| kind.as_str()).collect();
            body.push_str(&format!(
                "<pre>{}</pre>\n<p>Kind: {}</p>\n",
                escape_html(&details.description),
                lineage.join(" &lt; ")
            ));
        }

        body.push_str("</body></html>");
        Ok(body)
    }
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
