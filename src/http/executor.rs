use std::fmt::Write as _;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::{Client, Request};
use tokio::time::Instant;
use tracing::debug;

use super::body::{ReceivedBody, read_body};
use super::client::ConnectionFactory;
use crate::classify::Classifier;
use crate::domain::{Outcome, RequestDescriptor, RequestResult, TransportErrorKind};
use crate::shutdown::AbandonReceiver;

/// Runs one descriptor end to end. Implementations never fail: every problem
/// is folded into the returned result's outcome.
#[async_trait]
pub trait Executor: Send + Sync + 'static {
    async fn execute(
        &self,
        descriptor: RequestDescriptor,
        abandon: AbandonReceiver,
    ) -> RequestResult;
}

#[derive(Debug)]
pub struct HttpExecutor {
    factory: ConnectionFactory,
    classifier: Arc<dyn Classifier>,
    cache_bust_param: Option<String>,
    max_body_bytes: usize,
}

impl HttpExecutor {
    #[must_use]
    pub fn new(
        factory: ConnectionFactory,
        classifier: Arc<dyn Classifier>,
        cache_bust_param: Option<String>,
        max_body_bytes: usize,
    ) -> Self {
        Self {
            factory,
            classifier,
            cache_bust_param,
            max_body_bytes,
        }
    }

    fn prepare(&self, descriptor: &RequestDescriptor) -> Result<(Client, Request), String> {
        let client = self
            .factory
            .fresh_client(descriptor.proxy.as_deref())
            .map_err(|err| error_chain(&err))?;
        let mut builder = client
            .get(descriptor.target.as_ref())
            .query(descriptor.query.as_ref());
        if let Some(name) = self.cache_bust_param.as_deref() {
            let value = format!("{}_{}", Utc::now().timestamp_micros(), descriptor.index);
            builder = builder.query(&[(name, value.as_str())]);
        }
        let request = builder.build().map_err(|err| error_chain(&err))?;
        Ok((client, request))
    }

    /// A prefix cut at the cap cannot be parsed; that is reported against the
    /// cap instead of as a malformed response.
    fn classify(&self, status: u16, body: &ReceivedBody) -> Outcome {
        let outcome = self.classifier.classify(status, &body.retained);
        if body.truncated && matches!(outcome, Outcome::ParseError { .. }) {
            return Outcome::validation(&format!(
                "response body of {} bytes exceeded max_body_bytes ({})",
                body.total_bytes, self.max_body_bytes
            ));
        }
        outcome
    }

    async fn fetch(
        &self,
        client: &Client,
        request: Request,
    ) -> Result<(u16, ReceivedBody), (Option<u16>, reqwest::Error)> {
        let response = client.execute(request).await.map_err(|err| (None, err))?;
        let status = response.status().as_u16();
        let body = read_body(response, self.max_body_bytes)
            .await
            .map_err(|err| (Some(status), err))?;
        Ok((status, body))
    }
}

#[async_trait]
impl Executor for HttpExecutor {
    async fn execute(
        &self,
        descriptor: RequestDescriptor,
        mut abandon: AbandonReceiver,
    ) -> RequestResult {
        let timestamp = Utc::now();
        let (client, request) = match self.prepare(&descriptor) {
            Ok(prepared) => prepared,
            Err(detail) => {
                debug!("Request {} could not be built: {}", descriptor.index, detail);
                return RequestResult::new(
                    &descriptor,
                    timestamp,
                    Duration::ZERO,
                    Outcome::transport(TransportErrorKind::Config, &detail),
                );
            }
        };

        let start = Instant::now();
        let attempt = tokio::select! {
            fetched = self.fetch(&client, request) => Some(fetched),
            () = wait_for_abandon(&mut abandon) => None,
        };
        let latency = start.elapsed();

        match attempt {
            Some(Ok((status, body))) => {
                let outcome = self.classify(status, &body);
                RequestResult::new(&descriptor, timestamp, latency, outcome)
                    .with_response(Some(status), body.total_bytes)
            }
            Some(Err((status, err))) => {
                debug!("Request {} failed: {}", descriptor.index, err);
                RequestResult::new(&descriptor, timestamp, latency, outcome_for_error(&err))
                    .with_response(status, 0)
            }
            None => RequestResult::new(&descriptor, timestamp, latency, Outcome::Timeout),
        }
    }
}

/// Resolves once the abandon flag is raised; never resolves if the sender
/// goes away without raising it.
async fn wait_for_abandon(abandon: &mut AbandonReceiver) {
    loop {
        if *abandon.borrow_and_update() {
            return;
        }
        if abandon.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

pub(super) fn outcome_for_error(err: &reqwest::Error) -> Outcome {
    if err.is_timeout() {
        return Outcome::Timeout;
    }
    let kind = if err.is_connect() {
        TransportErrorKind::Connect
    } else if err.is_redirect() {
        TransportErrorKind::Redirect
    } else if err.is_body() {
        TransportErrorKind::Body
    } else if err.is_decode() {
        TransportErrorKind::Decode
    } else if err.is_request() {
        TransportErrorKind::Request
    } else {
        TransportErrorKind::Other
    };
    Outcome::transport(kind, &error_chain(err))
}

/// `err` followed by each of its sources, separated by `: `.
fn error_chain(err: &dyn std::error::Error) -> String {
    let mut text = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        if write!(text, ": {}", cause).is_err() {
            break;
        }
        source = cause.source();
    }
    text
}
