//! One request/response cycle of the chat session.

use serde::{Deserialize, Serialize};

use crate::Command;

/// Lifecycle status of a [`ChatTurn`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TurnStatus {
    /// Chunks are still arriving; the assistant draft is growing.
    Streaming,
    /// The transport signaled end-of-stream; the turn is immutable.
    Complete,
    /// The transport or extractor failed; the turn is immutable.
    Failed,
}

/// One user-submission-to-response cycle.
///
/// Created when the user submits input, mutated as chunks arrive, and
/// frozen once the status leaves `Streaming`. The assistant draft is
/// updated in place (identity-stable, one growing message), and
/// `commands` preserves discovery order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatTurn {
    user_message: String,
    assistant_draft: String,
    commands: Vec<Command>,
    status: TurnStatus,
}

impl ChatTurn {
    #[must_use]
    pub fn new(user_message: String) -> Self {
        Self {
            user_message,
            assistant_draft: String::new(),
            commands: Vec::new(),
            status: TurnStatus::Streaming,
        }
    }

    #[must_use]
    pub fn user_message(&self) -> &str {
        &self.user_message
    }

    #[must_use]
    pub fn assistant_draft(&self) -> &str {
        &self.assistant_draft
    }

    /// Commands emitted so far, in discovery order.
    #[must_use]
    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    #[must_use]
    pub fn status(&self) -> TurnStatus {
        self.status
    }

    #[must_use]
    pub fn is_streaming(&self) -> bool {
        self.status == TurnStatus::Streaming
    }

    /// Append streamed text to the assistant draft.
    ///
    /// No-op once the turn has left `Streaming`.
    pub fn append_draft(&mut self, chunk: &str) {
        if self.is_streaming() {
            self.assistant_draft.push_str(chunk);
        }
    }

    /// Record a command discovered in this turn's response.
    pub fn record_command(&mut self, command: Command) {
        if self.is_streaming() {
            self.commands.push(command);
        }
    }

    /// Mark the turn complete. Idempotent; a failed turn stays failed.
    pub fn complete(&mut self) {
        if self.is_streaming() {
            self.status = TurnStatus::Complete;
        }
    }

    /// Mark the turn failed, replacing the draft with a failure notice.
    ///
    /// Commands already applied are deliberately retained: this core
    /// makes no transactional guarantee across a failed turn.
    pub fn fail(&mut self, notice: String) {
        if self.is_streaming() {
            self.assistant_draft = notice;
            self.status = TurnStatus::Failed;
        }
    }
}
