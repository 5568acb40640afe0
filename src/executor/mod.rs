use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use serde::Serialize;
use thiserror::Error;
use tokio::time::Instant;
use tracing::debug;

use crate::generator::Combination;
use crate::template::{RenderedRequest, RequestTemplate};

pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

const DEBUG_BODY_PREVIEW: usize = 500;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("invalid header '{name}'")]
    InvalidHeader { name: String },

    #[error("{source}")]
    Request {
        #[source]
        source: reqwest::Error,
    },

    // for transports that are not backed by reqwest
    #[error("{0}")]
    Other(String),
}

#[derive(Clone, Debug)]
pub struct RawResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
    pub elapsed: Duration,
}

// A single HTTP exchange. Implementations must report transport failures as
// `Err` and never panic.
pub trait Transport: Send + Sync {
    fn send(&self, request: RenderedRequest) -> BoxFuture<'_, Result<RawResponse, TransportError>>;
}

#[derive(Clone, Debug, Default)]
pub struct TransportOptions {
    pub timeout_seconds: u64,
    pub proxy: Option<String>,
}

#[derive(Debug, Error)]
pub enum TransportBuildError {
    #[error("failed to build HTTP client: {source}")]
    HttpClientBuild {
        #[source]
        source: reqwest::Error,
    },

    #[error("failed to setup proxy: {proxy}: {source}")]
    ProxySetup {
        proxy: String,
        #[source]
        source: reqwest::Error,
    },
}

// reqwest backed transport. Redirects are never followed and certificate
// validation is disabled for the whole run.
#[derive(Clone, Debug)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(options: &TransportOptions) -> Result<Self, TransportBuildError> {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            reqwest::header::USER_AGENT,
            reqwest::header::HeaderValue::from_static(DEFAULT_USER_AGENT),
        );

        let timeout = Duration::from_secs(options.timeout_seconds.max(1));
        let mut builder = reqwest::Client::builder()
            .default_headers(headers)
            .redirect(reqwest::redirect::Policy::none())
            .timeout(timeout)
            .danger_accept_invalid_hostnames(true)
            .danger_accept_invalid_certs(true);

        if let Some(proxy) = options.proxy.as_deref().filter(|p| !p.trim().is_empty()) {
            let proxy = reqwest::Proxy::all(proxy).map_err(|e| TransportBuildError::ProxySetup {
                proxy: proxy.to_string(),
                source: e,
            })?;
            builder = builder.proxy(proxy);
        }

        let client = builder
            .build()
            .map_err(|e| TransportBuildError::HttpClientBuild { source: e })?;
        Ok(Self { client })
    }
}

impl Transport for HttpTransport {
    fn send(&self, request: RenderedRequest) -> BoxFuture<'_, Result<RawResponse, TransportError>> {
        Box::pin(async move {
            let mut builder = self.client.request(request.method, request.url.as_str());
            for (k, v) in request.headers.iter() {
                let key = reqwest::header::HeaderName::from_str(k.trim())
                    .map_err(|_| TransportError::InvalidHeader { name: k.clone() })?;
                let value = reqwest::header::HeaderValue::from_str(v.trim())
                    .map_err(|_| TransportError::InvalidHeader { name: k.clone() })?;
                // template headers replace defaults such as the user agent
                builder = builder.header(key, value);
            }
            if let Some(body) = request.body {
                builder = builder.body(body);
            }

            let start = Instant::now();
            let resp = builder
                .send()
                .await
                .map_err(|e| TransportError::Request { source: e })?;
            let status = resp.status().as_u16();
            let headers = resp
                .headers()
                .iter()
                .map(|(k, v)| {
                    (
                        k.as_str().to_string(),
                        String::from_utf8_lossy(v.as_bytes()).to_string(),
                    )
                })
                .collect();
            let body = resp
                .bytes()
                .await
                .map_err(|e| TransportError::Request { source: e })?
                .to_vec();
            Ok(RawResponse {
                status,
                headers,
                body,
                elapsed: start.elapsed(),
            })
        })
    }
}

// The normalized result of one unit of work. A transport failure is still an
// outcome: status 0, length 0, zero elapsed time and an error description.
#[derive(Clone, Debug, Serialize)]
pub struct Outcome {
    pub combination: Combination,
    pub url: String,
    pub status: u16,
    pub length: usize,
    #[serde(serialize_with = "serialize_secs")]
    pub elapsed: Duration,
    #[serde(skip)]
    pub body: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

fn serialize_secs<S: serde::Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_f64(d.as_secs_f64())
}

impl Outcome {
    pub fn is_transport_error(&self) -> bool {
        self.error.is_some()
    }
}

pub struct RequestExecutor {
    transport: Arc<dyn Transport>,
    template: RequestTemplate,
    // per-request and per-response debug events
    debug: bool,
}

impl RequestExecutor {
    pub fn new(transport: Arc<dyn Transport>, template: RequestTemplate) -> Self {
        Self {
            transport,
            template,
            debug: false,
        }
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn template(&self) -> &RequestTemplate {
        &self.template
    }

    pub fn debug(&self) -> bool {
        self.debug
    }

    pub async fn execute(&self, combination: Combination) -> Outcome {
        let rendered = self.template.render(&combination);
        let url = rendered.url.clone();

        if self.debug {
            debug!(
                method = %rendered.method,
                url = %rendered.url,
                headers = ?rendered.headers,
                body = ?rendered.body,
                "request [{}]",
                combination.describe()
            );
        }

        match self.transport.send(rendered).await {
            Ok(resp) => {
                let body = String::from_utf8_lossy(&resp.body).to_string();
                if self.debug {
                    debug!(
                        status = resp.status,
                        length = resp.body.len(),
                        elapsed_secs = resp.elapsed.as_secs_f64(),
                        headers = ?resp.headers,
                        "response: {}",
                        body.chars().take(DEBUG_BODY_PREVIEW).collect::<String>()
                    );
                }
                Outcome {
                    combination,
                    url,
                    status: resp.status,
                    length: resp.body.len(),
                    elapsed: resp.elapsed,
                    body,
                    error: None,
                }
            }
            Err(e) => {
                if self.debug {
                    debug!(url = %url, "request error [{}]: {e}", combination.describe());
                }
                Outcome {
                    combination,
                    url,
                    status: 0,
                    length: 0,
                    elapsed: Duration::ZERO,
                    body: String::new(),
                    error: Some(e.to_string()),
                }
            }
        }
    }
}
