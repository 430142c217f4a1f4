//! Tracing subscriber setup for hosts embedding the bridge

use serde::{Deserialize, Serialize};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Log level for the bridge
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Verbose,
    Debug,
    Trace,
}

impl LogLevel {
    /// Filter directive used when `RUST_LOG` is not set
    pub fn filter(&self) -> &'static str {
        match self {
            LogLevel::Error => "rtc_bridge=error,webrtc=error",
            LogLevel::Warn => "rtc_bridge=warn,webrtc=warn",
            LogLevel::Info => "rtc_bridge=info,webrtc=warn",
            LogLevel::Verbose => "rtc_bridge=debug,webrtc=warn",
            LogLevel::Debug => "rtc_bridge=debug,webrtc=info",
            LogLevel::Trace => "rtc_bridge=trace,webrtc=debug",
        }
    }
}

/// Install the global tracing subscriber.
///
/// `RUST_LOG` takes precedence over `level`. Calling this twice is harmless;
/// the second installation attempt is reported on stderr.
pub fn init_logging(level: LogLevel) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| level.filter().into());

    if let Err(err) = tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init()
    {
        eprintln!("failed to initialize tracing: {}", err);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_from_str() {
        let level: LogLevel = serde_json::from_str("\"verbose\"").unwrap();
        assert_eq!(level, LogLevel::Verbose);
        assert!(level.filter().starts_with("rtc_bridge=debug"));
    }

    #[test]
    fn test_double_init_does_not_panic() {
        init_logging(LogLevel::Warn);
        init_logging(LogLevel::Debug);
    }
}
