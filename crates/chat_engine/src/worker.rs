use std::collections::VecDeque;
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;

use chat_core::{
    decode_request, update, ChatState, Effect, Msg, PersonaId, ProtocolError, Rejection, Request,
    Transcript, WorkerEvent, DEFAULT_HISTORY_LIMIT,
};
use thiserror::Error;
use worker_logging::{worker_error, worker_info, worker_warn};

use crate::assets::ModelSource;
use crate::fetch::{ChannelSink, DownloadSettings, EventSink, ProgressFetcher, ProgressSink};
use crate::inference::{extract_reply, render_prompt, ChatModel, ModelLoader};
use crate::transport::{ReqwestTransport, Transport, TransportSettings};
use crate::{FetchError, SinkError};

#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub persona: PersonaId,
    pub history_limit: usize,
    pub model: ModelSource,
    pub download: DownloadSettings,
    pub transport: TransportSettings,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            persona: PersonaId::default(),
            history_limit: DEFAULT_HISTORY_LIMIT,
            model: ModelSource::default(),
            download: DownloadSettings::default(),
            transport: TransportSettings::default(),
        }
    }
}

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("model failed to load: {0:#}")]
    ModelLoad(#[source] anyhow::Error),
    #[error("inference failed: {0:#}")]
    Inference(#[source] anyhow::Error),
    #[error("model is not loaded; send init first")]
    NotReady,
    #[error(transparent)]
    EventChannelClosed(#[from] SinkError),
}

/// Runs one request at a time against the chat state, the model loader and
/// the inference capability.
pub struct Dispatcher {
    config: WorkerConfig,
    state: ChatState,
    fetcher: Arc<ProgressFetcher>,
    loader: Arc<dyn ModelLoader>,
    events: Arc<dyn EventSink>,
    model: Option<Arc<dyn ChatModel>>,
}

impl Dispatcher {
    pub fn new<S>(
        config: WorkerConfig,
        transport: Arc<dyn Transport>,
        loader: Arc<dyn ModelLoader>,
        sink: Arc<S>,
    ) -> Self
    where
        S: EventSink + ProgressSink + 'static,
    {
        let progress: Arc<dyn ProgressSink> = sink.clone();
        let fetcher = Arc::new(ProgressFetcher::new(
            transport,
            config.download.clone(),
            progress,
        ));
        Self {
            state: ChatState::new(config.persona, config.history_limit),
            config,
            fetcher,
            loader,
            events: sink,
            model: None,
        }
    }

    pub fn state(&self) -> &ChatState {
        &self.state
    }

    pub fn transcript(&self) -> &Transcript {
        self.state.transcript()
    }

    /// Session progress counters of the download aggregator.
    pub fn fetcher(&self) -> &ProgressFetcher {
        &self.fetcher
    }

    /// Resolves `request` completely, including every follow-up message it causes.
    pub async fn handle(&mut self, request: Request) -> Result<(), WorkerError> {
        let mut pending = VecDeque::from([Msg::from(request)]);
        while let Some(msg) = pending.pop_front() {
            let (next, effects) = update(self.state.clone(), msg);
            self.state = next;
            for effect in effects {
                if let Some(follow_up) = self.run_effect(effect).await? {
                    pending.push_back(follow_up);
                }
            }
        }
        Ok(())
    }

    async fn run_effect(&mut self, effect: Effect) -> Result<Option<Msg>, WorkerError> {
        match effect {
            Effect::Emit(event) => {
                self.events.emit_event(event)?;
                Ok(None)
            }
            Effect::LoadModel => {
                worker_info!("Loading model {}", self.config.model.model_id);
                let transport: Arc<dyn Transport> = self.fetcher.clone();
                match self.loader.load(transport, &self.config.model).await {
                    Ok(model) => {
                        worker_info!("Model {} ready", self.config.model.model_id);
                        self.model = Some(model);
                        Ok(Some(Msg::ModelReady))
                    }
                    Err(err) => {
                        let (next, _) = update(self.state.clone(), Msg::ModelFailed);
                        self.state = next;
                        Err(WorkerError::ModelLoad(err))
                    }
                }
            }
            Effect::RequestCompletion { turns, tone } => {
                let model = self.model.as_ref().ok_or(WorkerError::NotReady)?;
                let prompt = render_prompt(model.as_ref(), &turns).map_err(WorkerError::Inference)?;
                let generated = model
                    .generate(&prompt, &tone)
                    .await
                    .map_err(WorkerError::Inference)?;
                Ok(Some(Msg::ReplyReady(extract_reply(&prompt, &generated))))
            }
            Effect::Reject(Rejection::ModelNotReady) => Err(WorkerError::NotReady),
        }
    }
}

/// Owns a dispatcher running on a dedicated thread with its own runtime.
pub struct WorkerHandle {
    request_tx: mpsc::Sender<Request>,
    event_rx: mpsc::Receiver<WorkerEvent>,
}

impl WorkerHandle {
    /// Starts a worker fetching over HTTP.
    pub fn spawn(config: WorkerConfig, loader: Arc<dyn ModelLoader>) -> Result<Self, FetchError> {
        let transport = Arc::new(ReqwestTransport::new(config.transport.clone())?);
        Ok(Self::spawn_with_transport(config, transport, loader))
    }

    pub fn spawn_with_transport(
        config: WorkerConfig,
        transport: Arc<dyn Transport>,
        loader: Arc<dyn ModelLoader>,
    ) -> Self {
        let (request_tx, request_rx) = mpsc::channel::<Request>();
        let (event_tx, event_rx) = mpsc::channel();
        let sink = Arc::new(ChannelSink::new(event_tx));

        thread::spawn(move || {
            let runtime = match tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
            {
                Ok(runtime) => runtime,
                Err(err) => {
                    worker_error!("Failed to start worker runtime: {}", err);
                    return;
                }
            };
            let mut dispatcher = Dispatcher::new(config, transport, loader, sink.clone());
            while let Ok(request) = request_rx.recv() {
                if let Err(err) = runtime.block_on(dispatcher.handle(request)) {
                    worker_error!("Request failed: {}", err);
                    if matches!(err, WorkerError::EventChannelClosed(_)) {
                        break;
                    }
                    let _ = sink.emit_event(WorkerEvent::Error {
                        message: err.to_string(),
                    });
                }
            }
        });

        Self {
            request_tx,
            event_rx,
        }
    }

    pub fn post(&self, request: Request) {
        let _ = self.request_tx.send(request);
    }

    /// Decodes a JSON message and queues it. Unknown message types are
    /// rejected here and never reach the dispatcher.
    pub fn post_raw(&self, raw: &str) -> Result<(), ProtocolError> {
        match decode_request(raw) {
            Ok(request) => {
                self.post(request);
                Ok(())
            }
            Err(err) => {
                worker_warn!("Dropping inbound message: {}", err);
                Err(err)
            }
        }
    }

    pub fn try_recv(&self) -> Option<WorkerEvent> {
        self.event_rx.try_recv().ok()
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Option<WorkerEvent> {
        self.event_rx.recv_timeout(timeout).ok()
    }
}
