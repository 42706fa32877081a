use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Boot-time failures. Anything that happens once watchers are running is
/// carried inside a probe result instead.
#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to read {}: {source}", path.display())]
    ReadSettings {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse {}: {source}", path.display())]
    ParseSettings {
        path: PathBuf,
        source: serde_yaml::Error,
    },

    #[error("not found {0} section in settings")]
    MissingSection(&'static str),

    #[error("missing setting {section}.{key}")]
    MissingSetting {
        section: &'static str,
        key: &'static str,
    },

    #[error("{url} response error: {reason}")]
    Discovery { url: String, reason: String },

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error("watch {0} target list empty")]
    EmptyTargets(&'static str),

    #[error("duplicate {kind} target {identity}")]
    DuplicateTarget {
        kind: &'static str,
        identity: String,
    },

    #[error("invalid target {identity}: {reason}")]
    InvalidTarget { identity: String, reason: String },

    #[error("failed to build http client: {0}")]
    HttpClient(#[source] reqwest::Error),
}

impl Error {
    /// Process exit code for a failure that aborts boot.
    pub fn exit_code(&self) -> u8 {
        match self {
            Error::ReadSettings { .. } => 2,
            Error::Discovery { .. } | Error::Http(_) | Error::Json(_) => 5,
            _ => 4,
        }
    }
}
