//! Chat core: conversation history, wire protocol, progress accounting and
//! the pure state machine driving the worker.
mod effect;
mod history;
mod msg;
mod persona;
mod progress;
mod protocol;
mod state;
mod update;

pub use effect::{Effect, Rejection};
pub use history::{HistoryError, Role, Transcript, Turn, DEFAULT_HISTORY_LIMIT};
pub use msg::Msg;
pub use persona::{Persona, PersonaId, Tone, ToneProfile};
pub use progress::{bytes_for_human, DownloadProgress, ProgressState};
pub use protocol::{
    decode_request, encode_event, ProtocolError, Request, WorkerEvent, HISTORY_RESET_ACK,
    RESET_HISTORY_COMMAND,
};
pub use state::{ChatState, ModelStatus};
pub use update::update;
