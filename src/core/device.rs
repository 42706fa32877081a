use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::time;

use crate::core::ent::{DeviceResult, Target};
use crate::core::probe::{Probe, Worker};
use crate::error::{Error, Result};

pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(5);
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(1);
pub const DEFAULT_PORT: u16 = 161;

/// sysName.0, answered by every managed device.
pub const SYS_NAME_OID: &[u64] = &[1, 3, 6, 1, 2, 1, 1, 5, 0];

/// Shared, authentication-only credentials for every device.
#[derive(Clone)]
pub struct DeviceCredentials {
    pub username: String,
    pub passphrase: String,
    pub timeout: Duration,
    pub port: u16,
}

impl DeviceCredentials {
    /// A zero timeout means "unset" and becomes [`DEFAULT_TIMEOUT`].
    pub fn new(
        username: impl Into<String>,
        passphrase: impl Into<String>,
        timeout: Duration,
        port: u16,
    ) -> DeviceCredentials {
        DeviceCredentials {
            username: username.into(),
            passphrase: passphrase.into(),
            timeout: if timeout.is_zero() {
                DEFAULT_TIMEOUT
            } else {
                timeout
            },
            port,
        }
    }
}

impl fmt::Debug for DeviceCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceCredentials")
            .field("username", &self.username)
            .field("passphrase", &"<redacted>")
            .field("timeout", &self.timeout)
            .field("port", &self.port)
            .finish()
    }
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("connect failed: {0}")]
    Connect(String),

    #[error("query failed: {0}")]
    Query(String),

    #[error("no answer within {0:?}")]
    Timeout(Duration),
}

/// Opens management sessions to devices. The wire protocol lives behind this
/// trait.
#[async_trait]
pub trait DeviceConnector: Send + Sync + 'static {
    async fn connect(
        &self,
        host: &str,
        credentials: &DeviceCredentials,
    ) -> std::result::Result<Box<dyn DeviceSession>, SessionError>;
}

#[async_trait]
pub trait DeviceSession: Send {
    /// One round-trip read of `oid`.
    async fn get(&mut self, oid: &[u64]) -> std::result::Result<(), SessionError>;
}

pub struct DeviceWorker {
    credentials: Arc<DeviceCredentials>,
    connector: Arc<dyn DeviceConnector>,
    interval: Duration,
}

impl DeviceWorker {
    /// Missing credentials are a configuration error, not a probe failure.
    pub fn new(
        credentials: DeviceCredentials,
        connector: Arc<dyn DeviceConnector>,
    ) -> Result<DeviceWorker> {
        if credentials.username.is_empty() {
            return Err(Error::MissingSetting {
                section: "snmp",
                key: "username",
            });
        }
        if credentials.passphrase.is_empty() {
            return Err(Error::MissingSetting {
                section: "snmp",
                key: "password",
            });
        }
        Ok(DeviceWorker {
            credentials: Arc::new(credentials),
            connector,
            interval: DEFAULT_INTERVAL,
        })
    }

    pub fn interval(mut self, interval: Duration) -> DeviceWorker {
        self.interval = interval;
        self
    }
}

impl Worker for DeviceWorker {
    type Probe = DeviceProbe;

    fn name(&self) -> &'static str {
        "snmp"
    }

    fn default_interval(&self) -> Duration {
        self.interval
    }

    fn probe_for(&self, _target: &Target) -> Result<DeviceProbe> {
        Ok(DeviceProbe {
            credentials: self.credentials.clone(),
            connector: self.connector.clone(),
        })
    }
}

/// Connects fresh on every probe, so a collapsed session only costs one
/// failed result.
pub struct DeviceProbe {
    credentials: Arc<DeviceCredentials>,
    connector: Arc<dyn DeviceConnector>,
}

impl DeviceProbe {
    async fn query(&self, host: &str) -> std::result::Result<(), String> {
        let timeout = self.credentials.timeout;
        let mut session = match time::timeout(
            timeout,
            self.connector.connect(host, &self.credentials),
        )
        .await
        {
            Ok(Ok(session)) => session,
            Ok(Err(e)) => return Err(format!("connection to {host} fail. error: {e}")),
            Err(_) => {
                let e = SessionError::Timeout(timeout);
                return Err(format!("connection to {host} fail. error: {e}"));
            }
        };
        let outcome = match time::timeout(timeout, session.get(SYS_NAME_OID)).await {
            Ok(outcome) => outcome,
            Err(_) => Err(SessionError::Timeout(timeout)),
        };
        outcome.map_err(|e| format!("host:{host} get {} fail. error: {e}", oid_string(SYS_NAME_OID)))
    }
}

#[async_trait]
impl Probe for DeviceProbe {
    type Output = DeviceResult;

    async fn probe(&self, target: &Target) -> DeviceResult {
        match self.query(&target.identity).await {
            Ok(()) => DeviceResult {
                host: target.identity.clone(),
                is_alive: true,
                message: String::new(),
            },
            Err(message) => {
                tracing::warn!("{message}");
                DeviceResult {
                    host: target.identity.clone(),
                    is_alive: false,
                    message,
                }
            }
        }
    }
}

pub fn oid_string(oid: &[u64]) -> String {
    oid.iter()
        .map(u64::to_string)
        .collect::<Vec<_>>()
        .join(".")
}
