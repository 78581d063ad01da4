use crate::{ToneProfile, Turn, WorkerEvent};

#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Send an event to the client.
    Emit(WorkerEvent),
    /// Fetch model assets and build the model.
    LoadModel,
    /// Render `turns` into a prompt and run inference with `tone`.
    RequestCompletion { turns: Vec<Turn>, tone: ToneProfile },
    /// Fail the current request.
    Reject(Rejection),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    ModelNotReady,
}
