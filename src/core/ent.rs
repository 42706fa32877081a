use std::fmt::Debug;
use std::time::Duration;

use serde::Serialize;

/// One polled endpoint: a device address or a URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub identity: String,
    pub interval: Option<String>,
    pub param: Option<String>,
}

impl Target {
    pub fn new(identity: impl Into<String>) -> Target {
        Target {
            identity: identity.into(),
            interval: None,
            param: None,
        }
    }

    pub fn with_interval(mut self, interval: impl Into<String>) -> Target {
        self.interval = Some(interval.into());
        self
    }

    pub fn with_param(mut self, param: impl Into<String>) -> Target {
        self.param = Some(param.into());
        self
    }

    /// The per-target override when it parses, otherwise `default`.
    pub fn effective_interval(&self, default: Duration) -> Duration {
        self.interval
            .as_deref()
            .and_then(parse_interval)
            .unwrap_or(default)
    }
}

/// Parses `"10s"`, `"1m 30s"`, `"500ms"`; a bare integer is seconds.
/// Zero is rejected so a watcher never spins.
pub fn parse_interval(raw: &str) -> Option<Duration> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    let parsed = match raw.parse::<u64>() {
        Ok(secs) => Duration::from_secs(secs),
        Err(_) => humantime::parse_duration(raw).ok()?,
    };
    if parsed.is_zero() {
        None
    } else {
        Some(parsed)
    }
}

/// A probe outcome. Results carry their own identity so the aggregator never
/// relies on arrival order.
pub trait Report: Serialize + Debug + Send + 'static {
    fn identity(&self) -> &str;
    fn is_alive(&self) -> bool;
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct DeviceResult {
    pub host: String,
    #[serde(rename = "isAlive")]
    pub is_alive: bool,
    pub message: String,
}

impl Report for DeviceResult {
    fn identity(&self) -> &str {
        &self.host
    }

    fn is_alive(&self) -> bool {
        self.is_alive
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct HttpResult {
    pub url: String,
    /// 0 when the request never got a response.
    pub status: u16,
    pub body: String,
    pub message: String,
}

impl Report for HttpResult {
    fn identity(&self) -> &str {
        &self.url
    }

    fn is_alive(&self) -> bool {
        self.status == 200
    }
}
