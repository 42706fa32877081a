use std::time::Duration;

use reqwest::{header::CONTENT_TYPE, Client, StatusCode};
use serde::Deserialize;

use crate::config::model::scalar_string;
use crate::core::ent::Target;
use crate::error::{Error, Result};

pub const FETCH_TIMEOUT: Duration = Duration::from_secs(1);

/// The target lists served by the agent setting endpoint, i.e. the `data`
/// member of `{"status": 0, "data": {...}}`.
#[derive(Deserialize, Debug, Default)]
pub struct AgentSetting {
    #[serde(default)]
    pub snmp: Vec<DeviceTargetSpec>,
    #[serde(default)]
    pub url: Vec<UrlTargetSpec>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct DeviceTargetSpec {
    pub host: String,
    #[serde(default, deserialize_with = "scalar_string")]
    pub interval: Option<String>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct UrlTargetSpec {
    pub url: String,
    #[serde(default, deserialize_with = "scalar_string")]
    pub interval: Option<String>,
    #[serde(default)]
    pub param: Option<String>,
}

impl AgentSetting {
    pub fn device_targets(&self) -> Vec<Target> {
        self.snmp
            .iter()
            .map(|spec| Target {
                identity: spec.host.clone(),
                interval: spec.interval.clone(),
                param: None,
            })
            .collect()
    }

    pub fn url_targets(&self) -> Vec<Target> {
        self.url
            .iter()
            .map(|spec| Target {
                identity: spec.url.clone(),
                interval: spec.interval.clone(),
                param: spec.param.clone(),
            })
            .collect()
    }
}

/// Fetches the target lists once, at boot. Every failure is fatal: there
/// is nothing to poll without them.
pub async fn fetch_agent_setting(url: &str) -> Result<AgentSetting> {
    let discovery_error = |reason: String| Error::Discovery {
        url: url.to_string(),
        reason,
    };

    let client = Client::builder().timeout(FETCH_TIMEOUT).build()?;
    let response = client.get(url).send().await?;

    let status = response.status();
    if status != StatusCode::OK {
        return Err(discovery_error(format!("StatusCode:{}", status.as_u16())));
    }

    let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    if !content_type.starts_with("application/json") {
        return Err(discovery_error(format!("content-type:{content_type}")));
    }

    let body = response.bytes().await?;
    if body.is_empty() {
        return Err(discovery_error("response body empty".to_string()));
    }

    let envelope: serde_json::Value = serde_json::from_slice(&body)?;
    let api_status = envelope
        .get("status")
        .and_then(serde_json::Value::as_i64)
        .unwrap_or(0);
    let data = envelope.get("data").cloned().unwrap_or_default();
    if api_status != 0 || data.is_null() {
        return Err(discovery_error(format!(
            "api response error. status:{api_status}, body:{data}"
        )));
    }

    let setting: AgentSetting = serde_json::from_value(data)?;
    tracing::info!(
        snmp = setting.snmp.len(),
        url = setting.url.len(),
        "fetched agent setting"
    );
    Ok(setting)
}
