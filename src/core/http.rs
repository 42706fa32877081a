use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};

use crate::core::ent::{HttpResult, Target};
use crate::core::probe::{Probe, Worker};
use crate::error::{Error, Result};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(5);

/// Polls URLs with a GET; only a 200 counts as alive.
#[derive(Debug, Clone)]
pub struct HttpWorker {
    timeout: Duration,
    interval: Duration,
}

impl Default for HttpWorker {
    fn default() -> Self {
        HttpWorker {
            timeout: DEFAULT_TIMEOUT,
            interval: DEFAULT_INTERVAL,
        }
    }
}

impl HttpWorker {
    pub fn new(timeout: Duration, interval: Duration) -> HttpWorker {
        HttpWorker { timeout, interval }
    }
}

impl Worker for HttpWorker {
    type Probe = HttpProbe;

    fn name(&self) -> &'static str {
        "url"
    }

    fn default_interval(&self) -> Duration {
        self.interval
    }

    fn probe_for(&self, target: &Target) -> Result<HttpProbe> {
        let request_url = match target.param.as_deref() {
            Some(param) if !param.is_empty() => combine_query(&target.identity, param)?,
            _ => target.identity.clone(),
        };
        let client = Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(Error::HttpClient)?;
        Ok(HttpProbe {
            client,
            request_url,
        })
    }
}

/// Appends `param` verbatim to the query string of `raw`. No key merging:
/// `http://x/y?z=1` with `&w=2` becomes `http://x/y?z=1&w=2`.
pub fn combine_query(raw: &str, param: &str) -> Result<String> {
    let mut url = Url::parse(raw).map_err(|e| Error::InvalidTarget {
        identity: raw.to_string(),
        reason: format!("parse url error: {e}"),
    })?;
    let query = format!("{}{}", url.query().unwrap_or_default(), param);
    url.set_query(Some(&query));
    Ok(url.into())
}

/// The per-watcher half of [`HttpWorker`]: one client, reused for every
/// probe of its target.
#[derive(Debug)]
pub struct HttpProbe {
    client: Client,
    request_url: String,
}

impl HttpProbe {
    pub fn request_url(&self) -> &str {
        &self.request_url
    }
}

#[async_trait]
impl Probe for HttpProbe {
    type Output = HttpResult;

    async fn probe(&self, target: &Target) -> HttpResult {
        let mut result = HttpResult {
            url: target.identity.clone(),
            status: 0,
            body: String::new(),
            message: String::new(),
        };
        let response = match self.client.get(&self.request_url).send().await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(url = %self.request_url, "request failed. error: {e}");
                result.message = e.to_string();
                return result;
            }
        };

        let status = response.status();
        result.status = status.as_u16();
        if status != StatusCode::OK {
            result.message = status.to_string();
            return result;
        }
        match response.text().await {
            Ok(body) => result.body = body,
            Err(e) => result.message = e.to_string(),
        }
        result
    }
}
