use std::time::Duration;

use reqwest::header::{CONNECTION, HeaderMap, HeaderValue};
use reqwest::{Client, Proxy};

use crate::error::HttpError;

pub const DEFAULT_USER_AGENT: &str = concat!("latbench/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientSettings {
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    /// Accept invalid TLS certificates and hostnames.
    pub insecure: bool,
    pub user_agent: String,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(20),
            insecure: false,
            user_agent: DEFAULT_USER_AGENT.to_owned(),
        }
    }
}

/// Builds one client per request so every measurement pays for a fresh
/// connection (and proxy handshake) and nothing is pooled between requests.
#[derive(Debug, Clone)]
pub struct ConnectionFactory {
    settings: ClientSettings,
}

impl ConnectionFactory {
    #[must_use]
    pub const fn new(settings: ClientSettings) -> Self {
        Self { settings }
    }

    #[must_use]
    pub const fn settings(&self) -> &ClientSettings {
        &self.settings
    }

    /// Builds a non-pooled client, routed through `proxy` when given.
    ///
    /// # Errors
    ///
    /// Returns an error when the proxy URL is malformed or the TLS backend
    /// cannot be initialised.
    pub fn fresh_client(&self, proxy: Option<&str>) -> Result<Client, HttpError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONNECTION, HeaderValue::from_static("close"));

        let mut builder = Client::builder()
            .default_headers(headers)
            .user_agent(self.settings.user_agent.as_str())
            .connect_timeout(self.settings.connect_timeout)
            .timeout(self.settings.request_timeout)
            .pool_max_idle_per_host(0)
            .pool_idle_timeout(Some(Duration::from_secs(0)))
            .http1_only();

        if self.settings.insecure {
            builder = builder
                .danger_accept_invalid_certs(true)
                .danger_accept_invalid_hostnames(true);
        }

        builder = match proxy {
            Some(proxy_url) => {
                let proxy =
                    Proxy::all(proxy_url).map_err(|err| HttpError::InvalidProxy { source: err })?;
                builder.proxy(proxy)
            }
            None => builder.no_proxy(),
        };

        builder
            .build()
            .map_err(|err| HttpError::BuildClientFailed { source: err })
    }

    /// Builds one direct client up front so TLS setup problems fail the run
    /// before any request is issued.
    ///
    /// # Errors
    ///
    /// Returns an error when the client cannot be built.
    pub fn validate(&self) -> Result<(), HttpError> {
        self.fresh_client(None).map(drop)
    }
}
