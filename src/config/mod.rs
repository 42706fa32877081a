pub mod discovery;
pub mod model;
pub use discovery::{fetch_agent_setting, AgentSetting};
pub use model::Settings;
