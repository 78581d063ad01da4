use std::sync::{mpsc, Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use bytes::BytesMut;
use chat_core::{DownloadProgress, ProgressState, WorkerEvent};
use futures_util::StreamExt;
use worker_logging::{worker_debug, worker_error, worker_warn};

use crate::transport::{Body, FetchOptions, Response, Transport};
use crate::{DownloadError, FailureKind, FetchError, SinkError};

#[derive(Debug, Clone)]
pub struct DownloadSettings {
    pub max_attempts: u32,
    pub backoff_base: Duration,
}

impl Default for DownloadSettings {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_base: Duration::from_millis(1000),
        }
    }
}

impl DownloadSettings {
    /// Delay after failed attempt `attempt` (1-based): linear in the attempt number.
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        self.backoff_base * attempt
    }
}

/// Receives whole-percent progress updates. Errors are logged by the caller and
/// never abort a download.
pub trait ProgressSink: Send + Sync {
    fn emit(&self, progress: DownloadProgress) -> Result<(), SinkError>;
}

/// Receives protocol events destined for the client.
pub trait EventSink: Send + Sync {
    fn emit_event(&self, event: WorkerEvent) -> Result<(), SinkError>;
}

/// Forwards both progress and protocol events into one channel.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::Sender<WorkerEvent>,
}

impl ChannelSink {
    pub fn new(tx: mpsc::Sender<WorkerEvent>) -> Self {
        Self { tx }
    }
}

impl EventSink for ChannelSink {
    fn emit_event(&self, event: WorkerEvent) -> Result<(), SinkError> {
        self.tx
            .send(event)
            .map_err(|_| SinkError("event receiver dropped".to_string()))
    }
}

impl ProgressSink for ChannelSink {
    fn emit(&self, progress: DownloadProgress) -> Result<(), SinkError> {
        self.emit_event(WorkerEvent::DownloadProgress(progress))
    }
}

/// Wraps a [`Transport`] with retries, body buffering and session-wide progress.
///
/// Every fetch through one `ProgressFetcher` (or through fetchers built with
/// [`ProgressFetcher::with_state`] on the same state) feeds a single percentage.
pub struct ProgressFetcher {
    inner: Arc<dyn Transport>,
    settings: DownloadSettings,
    state: Arc<Mutex<ProgressState>>,
    sink: Arc<dyn ProgressSink>,
}

impl ProgressFetcher {
    pub fn new(
        inner: Arc<dyn Transport>,
        settings: DownloadSettings,
        sink: Arc<dyn ProgressSink>,
    ) -> Self {
        Self::with_state(inner, settings, sink, Arc::new(Mutex::new(ProgressState::new())))
    }

    pub fn with_state(
        inner: Arc<dyn Transport>,
        settings: DownloadSettings,
        sink: Arc<dyn ProgressSink>,
        state: Arc<Mutex<ProgressState>>,
    ) -> Self {
        Self {
            inner,
            settings,
            state,
            sink,
        }
    }

    pub fn settings(&self) -> &DownloadSettings {
        &self.settings
    }

    /// Copy of the session counters.
    pub fn progress(&self) -> ProgressState {
        self.lock_state().clone()
    }

    /// Fetches `url`, retrying the whole request on failure, and returns a
    /// response whose body is fully buffered. Bodies that are not streamed are
    /// passed through untouched and do not count towards progress.
    pub async fn fetch_resource(
        &self,
        url: &str,
        options: &FetchOptions,
    ) -> Result<Response, DownloadError> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.try_fetch(url, options).await {
                Ok(response) => return Ok(response),
                Err(err) => {
                    worker_warn!("Download attempt {} failed for {}: {}", attempt, url, err);
                    if attempt >= self.settings.max_attempts {
                        worker_error!("Giving up on {} after {} attempts", url, attempt);
                        return Err(DownloadError::Exhausted {
                            url: url.to_string(),
                            attempts: attempt,
                            last: err,
                        });
                    }
                    tokio::time::sleep(self.settings.backoff_for(attempt)).await;
                }
            }
        }
    }

    async fn try_fetch(&self, url: &str, options: &FetchOptions) -> Result<Response, FetchError> {
        let response = self.inner.fetch(url, options).await?;
        if !response.status.is_success() {
            return Err(FetchError::new(
                FailureKind::HttpStatus(response.status.as_u16()),
                format!(
                    "Failed to fetch {}: {} {}",
                    url,
                    response.status.as_u16(),
                    response.status_text
                ),
            ));
        }

        let declared_len = response.content_length();
        let Response {
            status,
            status_text,
            headers,
            body,
        } = response;
        let mut stream = match body {
            Body::Stream(stream) => stream,
            other => {
                return Ok(Response {
                    status,
                    status_text,
                    headers,
                    body: other,
                })
            }
        };

        if let Some(len) = declared_len {
            let mut state = self.lock_state();
            if state.register(url, len) {
                worker_debug!(
                    "Registered {} ({} bytes), session total {} bytes",
                    url,
                    len,
                    state.total_bytes_declared()
                );
            }
        }

        let mut buffer = BytesMut::new();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            buffer.extend_from_slice(&chunk);
            self.record_chunk(chunk.len() as u64);
        }

        Ok(Response {
            status,
            status_text,
            headers,
            body: Body::Buffered(buffer.freeze()),
        })
    }

    /// Counter update, gate and emission happen under one lock so concurrent
    /// streams can never surface percents out of order.
    fn record_chunk(&self, len: u64) {
        let mut state = self.lock_state();
        let fraction = state.record_chunk(len);
        if let Some(progress) = state.report(fraction) {
            if let Err(err) = self.sink.emit(progress) {
                worker_error!("Progress callback failed: {}", err);
            }
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, ProgressState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait::async_trait]
impl Transport for ProgressFetcher {
    async fn fetch(&self, url: &str, options: &FetchOptions) -> Result<Response, FetchError> {
        Ok(self.fetch_resource(url, options).await?)
    }
}
