//! SNMPv3 sessions for [`DeviceWorker`](crate::core::device::DeviceWorker):
//! user security model, MD5 authentication, no privacy, no retries.

use async_trait::async_trait;
use snmp2::{v3, AsyncSession, Oid};

use crate::core::device::{DeviceConnector, DeviceCredentials, DeviceSession, SessionError};

#[derive(Debug, Default, Clone, Copy)]
pub struct Snmp3Connector;

#[async_trait]
impl DeviceConnector for Snmp3Connector {
    async fn connect(
        &self,
        host: &str,
        credentials: &DeviceCredentials,
    ) -> Result<Box<dyn DeviceSession>, SessionError> {
        let security = v3::Security::new(
            credentials.username.as_bytes(),
            credentials.passphrase.as_bytes(),
        )
        .with_auth_protocol(v3::AuthProtocol::Md5)
        .with_auth(v3::Auth::AuthNoPriv);

        let addr = format!("{host}:{}", credentials.port);
        let mut session = AsyncSession::new_v3(addr.as_str(), 0, security)
            .await
            .map_err(|e| SessionError::Connect(e.to_string()))?;
        // Engine discovery is the first round-trip; a dead agent fails here.
        session
            .init()
            .await
            .map_err(|e| SessionError::Connect(format!("{e:?}")))?;
        Ok(Box::new(Snmp3Session { session }))
    }
}

struct Snmp3Session {
    session: AsyncSession,
}

#[async_trait]
impl DeviceSession for Snmp3Session {
    async fn get(&mut self, oid: &[u64]) -> Result<(), SessionError> {
        let oid = Oid::from(oid).map_err(|e| SessionError::Query(format!("{e:?}")))?;
        self.session
            .get(&oid)
            .await
            .map(|_| ())
            .map_err(|e| SessionError::Query(format!("{e:?}")))
    }
}
