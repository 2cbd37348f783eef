//! 채널별 로거
//!
//! 컨테이너는 `logger.debug`, `logger.error`, `logger.query`, `logger.mail` 이름으로
//! [`ChannelLogger`]를 등록합니다. 출력은 `log` 파사드를 통해 이루어지므로
//! 채널마다 `RUST_LOG`로 따로 조절할 수 있습니다.
//!
//! ```bash
//! RUST_LOG=info,service_bootstrap::query=debug cargo run
//! ```

use std::fmt;

use log::{Level, log, log_enabled};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogChannel {
    Debug,
    Error,
    Query,
    Mail,
}

impl LogChannel {
    pub const ALL: [LogChannel; 4] = [LogChannel::Debug, LogChannel::Error, LogChannel::Query, LogChannel::Mail];

    pub fn as_str(self) -> &'static str {
        match self {
            LogChannel::Debug => "debug",
            LogChannel::Error => "error",
            LogChannel::Query => "query",
            LogChannel::Mail => "mail",
        }
    }

    /// `log` 타깃 이름
    pub fn target(self) -> &'static str {
        match self {
            LogChannel::Debug => "service_bootstrap::debug",
            LogChannel::Error => "service_bootstrap::error",
            LogChannel::Query => "service_bootstrap::query",
            LogChannel::Mail => "service_bootstrap::mail",
        }
    }

    /// 컨테이너 서비스 이름 (`logger.<channel>`)
    pub fn service_name(self) -> String {
        format!("logger.{}", self.as_str())
    }

    /// 이 채널이 기록하는 가장 낮은 레벨
    fn threshold(self) -> Level {
        match self {
            LogChannel::Error => Level::Warn,
            LogChannel::Debug | LogChannel::Query | LogChannel::Mail => Level::Debug,
        }
    }
}

impl fmt::Display for LogChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 하나의 채널에 기록하는 로거
#[derive(Debug, Clone, Copy)]
pub struct ChannelLogger {
    channel: LogChannel,
}

impl ChannelLogger {
    pub fn new(channel: LogChannel) -> Self {
        Self { channel }
    }

    pub fn channel(&self) -> LogChannel {
        self.channel
    }

    /// 채널 임계값보다 낮은 레벨은 버립니다.
    pub fn accepts(&self, level: Level) -> bool {
        level <= self.channel.threshold()
    }

    /// 기록 여부를 반환합니다.
    pub fn log(&self, level: Level, message: &str) -> bool {
        if !self.accepts(level) {
            return false;
        }
        log!(target: self.channel.target(), level, "{}", message);
        true
    }

    pub fn is_enabled(&self, level: Level) -> bool {
        self.accepts(level) && log_enabled!(target: self.channel.target(), level)
    }

    pub fn debug(&self, message: &str) -> bool {
        self.log(Level::Debug, message)
    }

    pub fn info(&self, message: &str) -> bool {
        self.log(Level::Info, message)
    }

    pub fn warn(&self, message: &str) -> bool {
        self.log(Level::Warn, message)
    }

    pub fn error(&self, message: &str) -> bool {
        self.log(Level::Error, message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_channel_drops_low_levels() {
        let logger = ChannelLogger::new(LogChannel::Error);

        assert!(!logger.debug("ignored"));
        assert!(!logger.info("ignored"));
        assert!(logger.warn("kept"));
        assert!(logger.error("kept"));
    }

    #[test]
    fn test_query_channel_accepts_debug() {
        let logger = ChannelLogger::new(LogChannel::Query);

        assert!(logger.debug("SELECT 1"));
        assert!(!logger.accepts(Level::Trace));
    }

    #[test]
    fn test_channel_names() {
        let names: Vec<String> = LogChannel::ALL.iter().map(|c| c.service_name()).collect();
        assert_eq!(names, vec!["logger.debug", "logger.error", "logger.query", "logger.mail"]);
        assert_eq!(LogChannel::Mail.target(), "service_bootstrap::mail");
    }
}
