use std::time::{Duration, Instant};

use async_trait::async_trait;

use super::Prober;
use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scheme {
    Http,
    Https,
}

impl Scheme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Scheme::Http => "http",
            Scheme::Https => "https",
        }
    }
}

/// A named process endpoint being probed for metrics. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    name: String,
    address: String,
    path: String,
}

impl Target {
    pub fn new(
        name: impl Into<String>,
        address: impl Into<String>,
        path: impl Into<String>,
    ) -> Result<Self> {
        let name = name.into();
        let address = address.into();
        let path = path.into();

        if name.is_empty() {
            return Err(Error::InvalidTarget("name must not be empty".to_string()));
        }
        if address.is_empty() {
            return Err(Error::InvalidTarget(format!(
                "target '{name}' has an empty address"
            )));
        }
        if !path.starts_with('/') {
            return Err(Error::InvalidTarget(format!(
                "target '{name}' path '{path}' must start with '/'"
            )));
        }

        Ok(Self {
            name,
            address,
            path,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn url(&self, scheme: Scheme) -> String {
        format!("{}://{}{}", scheme.as_str(), self.address, self.path)
    }
}

#[derive(Debug, Clone)]
pub struct ProbeClientConfig {
    pub scheme: Scheme,
    pub accept_invalid_certs: bool,
    pub request_timeout: Duration,
    pub connect_timeout: Duration,
}

impl Default for ProbeClientConfig {
    fn default() -> Self {
        // The agent serves its metrics over HTTPS with a self-signed
        // certificate, so the default client skips verification.
        Self {
            scheme: Scheme::Https,
            accept_invalid_certs: true,
            request_timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(5),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ProbeResult {
    pub body_bytes: usize,
    pub elapsed: Duration,
}

/// One scrape-equivalent HTTPS GET per call. Cheap to clone; the underlying
/// client is shared and never mutated after construction.
#[derive(Clone)]
pub struct ProbeClient {
    inner: reqwest::Client,
    scheme: Scheme,
}

impl ProbeClient {
    pub fn new(config: ProbeClientConfig) -> Result<Self> {
        let inner = reqwest::Client::builder()
            .danger_accept_invalid_certs(config.accept_invalid_certs)
            .timeout(config.request_timeout)
            .connect_timeout(config.connect_timeout)
            .build()
            .map_err(Error::Client)?;

        Ok(Self {
            inner,
            scheme: config.scheme,
        })
    }

    pub async fn probe(&self, target: &Target) -> Result<ProbeResult> {
        let url = target.url(self.scheme);
        let start = Instant::now();

        let response = self
            .inner
            .get(&url)
            .send()
            .await
            .map_err(|source| Error::Transport {
                target: target.name().to_string(),
                source,
            })?;

        let status = response.status();
        if status.as_u16() != 200 {
            return Err(Error::UnexpectedStatus {
                target: target.name().to_string(),
                url,
                status: status.as_u16(),
            });
        }

        let body = response.bytes().await.map_err(|source| Error::Transport {
            target: target.name().to_string(),
            source,
        })?;

        Ok(ProbeResult {
            body_bytes: body.len(),
            elapsed: start.elapsed(),
        })
    }
}

#[async_trait]
impl Prober for ProbeClient {
    async fn probe(&self, target: &Target) -> Result<ProbeResult> {
        ProbeClient::probe(self, target).await
    }
}
