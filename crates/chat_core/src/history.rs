//! Bounded conversation history anchored on a single system turn.
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Number of non-system turns kept after each assistant reply.
pub const DEFAULT_HISTORY_LIMIT: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// One role-tagged message. Fields are private so a turn cannot change after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    role: Role,
    content: String,
}

impl Turn {
    fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn content(&self) -> &str {
        &self.content
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HistoryError {
    #[error("cannot append a {0:?} turn; only user and assistant turns follow the system turn")]
    InvalidRole(Role),
}

/// Ordered turns. Index 0 is always the system turn the transcript was created with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transcript {
    turns: Vec<Turn>,
}

impl Transcript {
    pub fn new(system_prompt: impl Into<String>) -> Self {
        Self {
            turns: vec![Turn::new(Role::System, system_prompt)],
        }
    }

    pub fn system(&self) -> &Turn {
        &self.turns[0]
    }

    /// All turns, system turn first.
    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    /// Turns after the system turn, oldest first.
    pub fn conversation(&self) -> &[Turn] {
        &self.turns[1..]
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    /// Always false: a transcript holds at least its system turn.
    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn append(&mut self, role: Role, content: impl Into<String>) -> Result<(), HistoryError> {
        if role == Role::System {
            return Err(HistoryError::InvalidRole(role));
        }
        self.turns.push(Turn::new(role, content));
        Ok(())
    }

    pub fn push_user(&mut self, content: impl Into<String>) {
        self.turns.push(Turn::new(Role::User, content));
    }

    pub fn push_assistant(&mut self, content: impl Into<String>) {
        self.turns.push(Turn::new(Role::Assistant, content));
    }

    /// Keeps the system turn plus the last `limit` turns of the conversation.
    pub fn compact_to_window(&self, limit: usize) -> Transcript {
        let start = self.turns.len().saturating_sub(limit).max(1);
        let mut turns = Vec::with_capacity(1 + self.turns.len() - start);
        turns.push(self.turns[0].clone());
        turns.extend_from_slice(&self.turns[start..]);
        Transcript { turns }
    }

    pub fn reset(&self) -> Transcript {
        Transcript {
            turns: vec![self.turns[0].clone()],
        }
    }
}
