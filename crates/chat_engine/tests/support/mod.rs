#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, Once};

use bytes::Bytes;
use chat_engine::{
    Body, EventSink, FailureKind, FetchError, FetchOptions, ProgressSink, Response, SinkError,
    Transport,
};
use chat_core::{DownloadProgress, WorkerEvent};
use futures_util::StreamExt;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_LENGTH, CONTENT_TYPE};
use reqwest::StatusCode;
use tokio::time::Instant;

pub fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(worker_logging::initialize_for_tests);
}

/// What the scripted transport answers for one request.
#[derive(Debug, Clone)]
pub enum Reply {
    Status(u16),
    Unreachable,
    Stream {
        declared_len: Option<u64>,
        chunks: Vec<Vec<u8>>,
        /// Break the stream after this many chunks.
        fail_after: Option<usize>,
    },
    Buffered(Vec<u8>),
}

impl Reply {
    pub fn ok(body: &[u8], chunk_size: usize) -> Self {
        Reply::Stream {
            declared_len: Some(body.len() as u64),
            chunks: body.chunks(chunk_size).map(<[u8]>::to_vec).collect(),
            fail_after: None,
        }
    }
}

/// In-memory transport. Each url answers its queued replies in order; the
/// last reply repeats forever.
#[derive(Default)]
pub struct ScriptedTransport {
    replies: Mutex<HashMap<String, VecDeque<Reply>>>,
    calls: Mutex<Vec<(String, Instant)>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, url: &str, reply: Reply) -> &Self {
        self.replies
            .lock()
            .unwrap()
            .entry(url.to_string())
            .or_default()
            .push_back(reply);
        self
    }

    pub fn calls_to(&self, url: &str) -> Vec<Instant> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(called, _)| called == url)
            .map(|(_, at)| *at)
            .collect()
    }

    fn next_reply(&self, url: &str) -> Option<Reply> {
        let mut replies = self.replies.lock().unwrap();
        let queue = replies.get_mut(url)?;
        if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        }
    }
}

#[async_trait::async_trait]
impl Transport for ScriptedTransport {
    async fn fetch(&self, url: &str, _options: &FetchOptions) -> Result<Response, FetchError> {
        self.calls
            .lock()
            .unwrap()
            .push((url.to_string(), Instant::now()));
        let reply = self
            .next_reply(url)
            .ok_or_else(|| FetchError::new(FailureKind::Network, format!("no route to {url}")))?;

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/octet-stream"));
        match reply {
            Reply::Status(code) => Ok(Response::new(
                StatusCode::from_u16(code).unwrap(),
                headers,
                Body::Empty,
            )),
            Reply::Unreachable => Err(FetchError::new(FailureKind::Network, "connection refused")),
            Reply::Buffered(bytes) => Ok(Response::new(
                StatusCode::OK,
                headers,
                Body::Buffered(Bytes::from(bytes)),
            )),
            Reply::Stream {
                declared_len,
                chunks,
                fail_after,
            } => {
                if let Some(len) = declared_len {
                    headers.insert(CONTENT_LENGTH, HeaderValue::from(len));
                }
                let limit = fail_after.unwrap_or(chunks.len());
                let mut items: Vec<Result<Bytes, FetchError>> = chunks
                    .into_iter()
                    .take(limit)
                    .map(|chunk| Ok(Bytes::from(chunk)))
                    .collect();
                if fail_after.is_some() {
                    items.push(Err(FetchError::new(FailureKind::Stream, "connection reset")));
                }
                // Yield between chunks so concurrent downloads interleave.
                let stream = futures_util::stream::iter(items)
                    .then(|item| async move {
                        tokio::task::yield_now().await;
                        item
                    })
                    .boxed();
                Ok(Response::new(StatusCode::OK, headers, Body::Stream(stream)))
            }
        }
    }
}

/// Collects every event it is given.
#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<WorkerEvent>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn take(&self) -> Vec<WorkerEvent> {
        self.events.lock().unwrap().drain(..).collect()
    }

    pub fn progress_values(&self) -> Vec<u8> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter_map(|event| match event {
                WorkerEvent::DownloadProgress(progress) => Some(progress.progress),
                _ => None,
            })
            .collect()
    }
}

impl ProgressSink for RecordingSink {
    fn emit(&self, progress: DownloadProgress) -> Result<(), SinkError> {
        self.emit_event(WorkerEvent::DownloadProgress(progress))
    }
}

impl EventSink for RecordingSink {
    fn emit_event(&self, event: WorkerEvent) -> Result<(), SinkError> {
        self.events.lock().unwrap().push(event);
        Ok(())
    }
}

/// A progress listener that always fails.
pub struct BrokenSink;

impl ProgressSink for BrokenSink {
    fn emit(&self, _progress: DownloadProgress) -> Result<(), SinkError> {
        Err(SinkError("listener went away".to_string()))
    }
}

pub fn assert_strictly_increasing(values: &[u8]) {
    assert!(values.len() <= 101, "{} progress events", values.len());
    for pair in values.windows(2) {
        assert!(pair[0] < pair[1], "progress went from {} to {}", pair[0], pair[1]);
    }
    assert!(values.iter().all(|value| *value <= 100));
}
