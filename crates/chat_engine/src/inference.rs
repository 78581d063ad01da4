use std::sync::Arc;

use chat_core::{ToneProfile, Turn};

use crate::assets::ModelSource;
use crate::transport::Transport;

/// How the chat template should be applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PromptOptions {
    /// Return token ids instead of text.
    pub tokenize: bool,
    /// End the prompt with the marker that hands the turn to the assistant.
    pub add_generation_prompt: bool,
}

impl PromptOptions {
    pub const fn assistant_turn() -> Self {
        Self {
            tokenize: false,
            add_generation_prompt: true,
        }
    }
}

/// A loaded model: renders chat templates and generates text.
#[async_trait::async_trait]
pub trait ChatModel: Send + Sync {
    fn apply_chat_template(&self, turns: &[Turn], options: PromptOptions) -> anyhow::Result<String>;

    /// Returns the generated text; it may still contain the prompt.
    async fn generate(&self, prompt: &str, tone: &ToneProfile) -> anyhow::Result<String>;
}

/// Builds a [`ChatModel`], pulling its files through `transport`.
#[async_trait::async_trait]
pub trait ModelLoader: Send + Sync {
    async fn load(
        &self,
        transport: Arc<dyn Transport>,
        source: &ModelSource,
    ) -> anyhow::Result<Arc<dyn ChatModel>>;
}

pub fn render_prompt(model: &dyn ChatModel, turns: &[Turn]) -> anyhow::Result<String> {
    model.apply_chat_template(turns, PromptOptions::assistant_turn())
}

/// Strips the echoed prompt from generated text and trims whitespace.
pub fn extract_reply(prompt: &str, generated: &str) -> String {
    generated.replacen(prompt, "", 1).trim().to_string()
}
