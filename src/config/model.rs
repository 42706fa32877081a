use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Deserializer};
use tracing::info;

use crate::core::device::{self, DeviceCredentials};
use crate::core::ent::parse_interval;
use crate::core::http::{self, HttpWorker};
use crate::error::{Error, Result};

#[derive(Deserialize, Debug, Default)]
pub struct Profiles {
    pub active: String,
}

/// The settings file. When `profiles.active` is set the real settings live
/// in the sibling `<stem>-<active>.<ext>` file.
#[derive(Deserialize, Debug, Default)]
pub struct Settings {
    pub profiles: Option<Profiles>,
    pub api: Option<ApiSettings>,
    pub snmp: Option<SnmpSettings>,
    pub url: Option<UrlSettings>,
}

#[derive(Deserialize, Debug, Default)]
pub struct ApiSettings {
    /// Where the target lists are fetched from.
    pub setting: Option<String>,
}

#[derive(Deserialize, Debug, Default)]
pub struct SnmpSettings {
    pub username: Option<String>,
    pub password: Option<String>,
    #[serde(default, deserialize_with = "scalar_string")]
    pub timeout: Option<String>,
    pub port: Option<u16>,
}

#[derive(Deserialize, Debug, Default)]
pub struct UrlSettings {
    #[serde(default, deserialize_with = "scalar_string")]
    pub timeout: Option<String>,
    #[serde(default, deserialize_with = "scalar_string")]
    pub interval: Option<String>,
}

fn read_settings(path: &Path) -> Result<Settings> {
    let raw = std::fs::read_to_string(path).map_err(|source| Error::ReadSettings {
        path: path.to_path_buf(),
        source,
    })?;
    serde_yaml::from_str(&raw).map_err(|source| Error::ParseSettings {
        path: path.to_path_buf(),
        source,
    })
}

/// `etc/poller.yml` with profile `dev` becomes `etc/poller-dev.yml`.
pub fn profile_path(path: &Path, active: &str) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = match path.extension() {
        Some(ext) => format!("{stem}-{active}.{}", ext.to_string_lossy()),
        None => format!("{stem}-{active}"),
    };
    path.with_file_name(name)
}

impl Settings {
    pub fn load(path: &Path) -> Result<Settings> {
        let settings = read_settings(path)?;
        match settings.profiles.as_ref().map(|p| p.active.trim()) {
            Some(active) if !active.is_empty() => {
                let profile = profile_path(path, active);
                info!("loading profile {active} from {}", profile.display());
                read_settings(&profile)
            }
            _ => Ok(settings),
        }
    }

    pub fn agent_setting_url(&self) -> Result<&str> {
        let api = self.api.as_ref().ok_or(Error::MissingSection("api"))?;
        match api.setting.as_deref().map(str::trim) {
            Some(url) if !url.is_empty() => Ok(url),
            _ => Err(Error::MissingSetting {
                section: "api",
                key: "setting",
            }),
        }
    }

    pub fn snmp(&self) -> Result<&SnmpSettings> {
        self.snmp.as_ref().ok_or(Error::MissingSection("snmp"))
    }

    pub fn url(&self) -> Result<&UrlSettings> {
        self.url.as_ref().ok_or(Error::MissingSection("url"))
    }
}

impl SnmpSettings {
    pub fn credentials(&self) -> DeviceCredentials {
        let timeout = self
            .timeout
            .as_deref()
            .and_then(parse_interval)
            .unwrap_or(device::DEFAULT_TIMEOUT);
        DeviceCredentials::new(
            self.username.clone().unwrap_or_default(),
            self.password.clone().unwrap_or_default(),
            timeout,
            self.port.unwrap_or(device::DEFAULT_PORT),
        )
    }
}

impl UrlSettings {
    pub fn worker(&self) -> HttpWorker {
        let parse = |raw: &Option<String>, default: Duration| {
            raw.as_deref().and_then(parse_interval).unwrap_or(default)
        };
        HttpWorker::new(
            parse(&self.timeout, http::DEFAULT_TIMEOUT),
            parse(&self.interval, http::DEFAULT_INTERVAL),
        )
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Scalar {
    Text(String),
    Int(u64),
    Float(f64),
}

/// Durations show up both as `"5s"` and as bare numbers.
pub(crate) fn scalar_string<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Scalar>::deserialize(deserializer)?.map(|scalar| match scalar {
        Scalar::Text(s) => s,
        Scalar::Int(n) => n.to_string(),
        Scalar::Float(f) => f.to_string(),
    }))
}
