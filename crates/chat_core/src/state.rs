use crate::{PersonaId, Transcript, DEFAULT_HISTORY_LIMIT};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ModelStatus {
    #[default]
    Unloaded,
    Loading,
    Ready,
    Failed,
}

/// Everything the worker remembers between requests, apart from the loaded model itself.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatState {
    transcript: Transcript,
    persona: PersonaId,
    history_limit: usize,
    model: ModelStatus,
}

impl Default for ChatState {
    fn default() -> Self {
        Self::new(PersonaId::default(), DEFAULT_HISTORY_LIMIT)
    }
}

impl ChatState {
    pub fn new(persona: PersonaId, history_limit: usize) -> Self {
        Self {
            transcript: Transcript::new(persona.persona().system_prompt),
            persona,
            history_limit,
            model: ModelStatus::Unloaded,
        }
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn persona(&self) -> PersonaId {
        self.persona
    }

    pub fn model_status(&self) -> ModelStatus {
        self.model
    }

    /// Window applied after each reply.
    pub fn window_limit(&self) -> usize {
        self.history_limit
    }

    pub(crate) fn transcript_mut(&mut self) -> &mut Transcript {
        &mut self.transcript
    }

    pub(crate) fn set_transcript(&mut self, transcript: Transcript) {
        self.transcript = transcript;
    }

    pub(crate) fn set_model_status(&mut self, status: ModelStatus) {
        self.model = status;
    }
}
