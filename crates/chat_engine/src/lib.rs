//! Chat engine: network transport, the progress-reporting download
//! aggregator, model loading seams and the worker dispatcher.
mod assets;
mod fetch;
mod inference;
mod transport;
mod types;
mod worker;

pub use assets::{fetch_assets, ModelAsset, ModelSource};
pub use fetch::{ChannelSink, DownloadSettings, EventSink, ProgressFetcher, ProgressSink};
pub use inference::{extract_reply, render_prompt, ChatModel, ModelLoader, PromptOptions};
pub use transport::{
    Body, BodyStream, FetchOptions, ReqwestTransport, Response, Transport, TransportSettings,
};
pub use types::{DownloadError, FailureKind, FetchError, SinkError};
pub use worker::{Dispatcher, WorkerConfig, WorkerError, WorkerHandle};
