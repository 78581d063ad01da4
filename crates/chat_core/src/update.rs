use crate::{
    ChatState, Effect, ModelStatus, Msg, Rejection, WorkerEvent, HISTORY_RESET_ACK,
    RESET_HISTORY_COMMAND,
};

/// Pure update function: applies a message to state and returns any effects.
pub fn update(mut state: ChatState, msg: Msg) -> (ChatState, Vec<Effect>) {
    let effects = match msg {
        Msg::Init => match state.model_status() {
            ModelStatus::Ready => vec![Effect::Emit(WorkerEvent::Ready)],
            ModelStatus::Loading => Vec::new(),
            ModelStatus::Unloaded | ModelStatus::Failed => {
                state.set_model_status(ModelStatus::Loading);
                vec![Effect::LoadModel]
            }
        },
        Msg::ModelReady => {
            state.set_model_status(ModelStatus::Ready);
            vec![Effect::Emit(WorkerEvent::Ready)]
        }
        Msg::ModelFailed => {
            state.set_model_status(ModelStatus::Failed);
            Vec::new()
        }
        Msg::Generate(text) => {
            if text == RESET_HISTORY_COMMAND {
                let reset = state.transcript().reset();
                state.set_transcript(reset);
                return (
                    state,
                    vec![Effect::Emit(WorkerEvent::Response {
                        data: HISTORY_RESET_ACK.to_string(),
                    })],
                );
            }
            if state.model_status() != ModelStatus::Ready {
                return (state, vec![Effect::Reject(Rejection::ModelNotReady)]);
            }
            state.transcript_mut().push_user(text);
            vec![
                Effect::Emit(WorkerEvent::Thinking),
                Effect::RequestCompletion {
                    turns: state.transcript().turns().to_vec(),
                    tone: state.persona().persona().tone.profile(),
                },
            ]
        }
        Msg::ReplyReady(reply) => {
            state.transcript_mut().push_assistant(reply.as_str());
            let compacted = state.transcript().compact_to_window(state.window_limit());
            state.set_transcript(compacted);
            vec![Effect::Emit(WorkerEvent::Response { data: reply })]
        }
    };

    (state, effects)
}
