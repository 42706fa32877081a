pub mod aggregator;
pub mod device;
pub mod ent;
pub mod http;
pub mod probe;
#[cfg(feature = "snmp")]
pub mod snmp;
pub mod state;
pub mod supervisor;
pub mod watcher;
pub use aggregator::Aggregator;
pub use device::{DeviceConnector, DeviceCredentials, DeviceSession, DeviceWorker, SessionError};
pub use ent::*;
pub use http::HttpWorker;
pub use probe::{Probe, Worker};
pub use state::EngineState;
pub use supervisor::{Engine, Supervisor};
pub use watcher::Watcher;
