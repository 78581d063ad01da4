use crate::Request;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Msg {
    /// Client asked the worker to load the model.
    Init,
    /// Client sent a line of chat.
    Generate(String),
    /// Model assets were fetched and the model is usable.
    ModelReady,
    /// Loading the model failed; the next `Init` retries.
    ModelFailed,
    /// Inference produced the assistant's reply.
    ReplyReady(String),
}

impl From<Request> for Msg {
    fn from(request: Request) -> Self {
        match request {
            Request::Init => Msg::Init,
            Request::Generate { text } => Msg::Generate(text),
        }
    }
}
