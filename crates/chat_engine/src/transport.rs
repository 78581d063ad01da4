use std::fmt;
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};
use std::time::Duration;

use bytes::{Bytes, BytesMut};
use futures_util::stream::BoxStream;
use futures_util::{StreamExt, TryStreamExt};
use reqwest::header::{HeaderMap, CONTENT_LENGTH};
use reqwest::StatusCode;
use worker_logging::worker_trace;

use crate::{FailureKind, FetchError};

pub type BodyStream = BoxStream<'static, Result<Bytes, FetchError>>;

pub enum Body {
    Empty,
    /// Fully materialised in memory.
    Buffered(Bytes),
    Stream(BodyStream),
}

impl fmt::Debug for Body {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Body::Empty => write!(f, "Empty"),
            Body::Buffered(bytes) => write!(f, "Buffered({} bytes)", bytes.len()),
            Body::Stream(_) => write!(f, "Stream"),
        }
    }
}

/// A fetched response.
///
/// `status_text` is the canonical reason phrase for `status` (empty for
/// unregistered codes), not the phrase the server put on the status line.
#[derive(Debug)]
pub struct Response {
    pub status: StatusCode,
    pub status_text: String,
    pub headers: HeaderMap,
    pub body: Body,
}

impl Response {
    pub fn new(status: StatusCode, headers: HeaderMap, body: Body) -> Self {
        Self {
            status,
            status_text: status.canonical_reason().unwrap_or_default().to_string(),
            headers,
            body,
        }
    }

    /// Declared `Content-Length`, if present and parseable.
    pub fn content_length(&self) -> Option<u64> {
        self.headers
            .get(CONTENT_LENGTH)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.trim().parse().ok())
    }

    /// Drains the body into memory.
    pub async fn bytes(self) -> Result<Bytes, FetchError> {
        match self.body {
            Body::Empty => Ok(Bytes::new()),
            Body::Buffered(bytes) => Ok(bytes),
            Body::Stream(stream) => {
                let buffer = stream
                    .try_fold(BytesMut::new(), |mut acc, chunk| async move {
                        acc.extend_from_slice(&chunk);
                        Ok(acc)
                    })
                    .await?;
                Ok(buffer.freeze())
            }
        }
    }
}

/// Request options handed through to the transport untouched.
#[derive(Debug, Clone, Default)]
pub struct FetchOptions {
    pub headers: HeaderMap,
}

/// The network fetch capability: url in, status + headers + body out.
///
/// Non-success statuses are returned as responses, not errors.
#[async_trait::async_trait]
pub trait Transport: Send + Sync {
    async fn fetch(&self, url: &str, options: &FetchOptions) -> Result<Response, FetchError>;
}

#[derive(Debug, Clone)]
pub struct TransportSettings {
    pub connect_timeout: Duration,
    /// Longest silence tolerated between two reads, headers and body alike.
    pub read_timeout: Duration,
    /// Cap on the whole request including the body. Off by default: model
    /// weights are hundreds of megabytes and a slow link must not fail them.
    pub request_timeout: Option<Duration>,
    pub redirect_limit: usize,
}

impl Default for TransportSettings {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            read_timeout: Duration::from_secs(30),
            request_timeout: None,
            redirect_limit: 10,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
    redirects: Arc<AtomicUsize>,
}

impl ReqwestTransport {
    pub fn new(settings: TransportSettings) -> Result<Self, FetchError> {
        let redirects = Arc::new(AtomicUsize::new(0));
        let redirect_counter = redirects.clone();
        let redirect_limit = settings.redirect_limit;
        let policy = reqwest::redirect::Policy::custom(move |attempt| {
            let count = attempt.previous().len();
            if count >= redirect_limit {
                attempt.error("redirect limit exceeded")
            } else {
                redirect_counter.fetch_add(1, Ordering::Relaxed);
                attempt.follow()
            }
        });

        let mut builder = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .read_timeout(settings.read_timeout)
            .redirect(policy);
        if let Some(timeout) = settings.request_timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|err| FetchError::new(FailureKind::Network, err.to_string()))?;

        Ok(Self { client, redirects })
    }

    /// Redirects followed by this transport so far.
    pub fn redirects_followed(&self) -> usize {
        self.redirects.load(Ordering::Relaxed)
    }
}

#[async_trait::async_trait]
impl Transport for ReqwestTransport {
    async fn fetch(&self, url: &str, options: &FetchOptions) -> Result<Response, FetchError> {
        let parsed = reqwest::Url::parse(url)
            .map_err(|err| FetchError::new(FailureKind::InvalidUrl, err.to_string()))?;

        let response = self
            .client
            .get(parsed)
            .headers(options.headers.clone())
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        let headers = response.headers().clone();
        worker_trace!("GET {} -> {}", url, status);

        let stream = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(map_reqwest_error))
            .boxed();

        Ok(Response::new(status, headers, Body::Stream(stream)))
    }
}

fn map_reqwest_error(err: reqwest::Error) -> FetchError {
    if err.is_timeout() {
        return FetchError::new(FailureKind::Timeout, err.to_string());
    }
    if err.is_redirect() {
        return FetchError::new(FailureKind::RedirectLimitExceeded, err.to_string());
    }
    if err.is_body() || err.is_decode() {
        return FetchError::new(FailureKind::Stream, err.to_string());
    }
    FetchError::new(FailureKind::Network, err.to_string())
}
