//! Session orchestration: one chat history, one file store, one
//! in-flight turn at a time.

use futures_util::future::{AbortHandle, Abortable};
use tokio::sync::mpsc;

use quill_providers::{ApiConfig, ChatMessage};
use quill_store::{FileStore, StoreError, apply_batch, build_snapshot};
use quill_types::{ChatTurn, ProjectSnapshot, StreamEvent};

use crate::config::EngineConfig;
use crate::context;
use crate::extract::Extractor;

/// Canned opening message shown before the first user turn.
pub const GREETING: &str =
    "Hi! Tell me what you want to build and I'll create and edit the project files as we go.";

const FAILURE_NOTICE: &str = "Sorry, something went wrong while generating a response. \
                              Files already written this turn have been kept.";

const EVENT_CHANNEL_CAPACITY: usize = 64;

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("a turn is already streaming; wait for it to finish")]
    TurnInFlight,
    #[error("empty user message")]
    EmptyMessage,
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// A chat session bound to a file store.
///
/// `send` drives a whole turn to completion: it streams the model
/// response, extracts commands as chunks arrive, and applies each one
/// to the store the moment it is complete. There is no rollback; a
/// failed turn keeps whatever it already wrote.
pub struct Session<S: FileStore> {
    store: S,
    api: ApiConfig,
    config: EngineConfig,
    snapshot: ProjectSnapshot,
    history: Vec<ChatTurn>,
}

impl<S: FileStore> Session<S> {
    /// Open a session over `store`, snapshotting its current contents.
    pub async fn open(store: S, api: ApiConfig, config: EngineConfig) -> Result<Self, SessionError> {
        let api = api.with_generation(config.generation());
        let snapshot = build_snapshot(&store).await?;
        Ok(Self {
            store,
            api,
            config,
            snapshot,
            history: Vec::new(),
        })
    }

    #[must_use]
    pub fn snapshot(&self) -> &ProjectSnapshot {
        &self.snapshot
    }

    /// Past turns, oldest first.
    #[must_use]
    pub fn history(&self) -> &[ChatTurn] {
        &self.history
    }

    /// Run one full turn and return it.
    ///
    /// Always returns `Ok` once a turn has started, even if streaming
    /// or extraction fails mid-way; inspect [`ChatTurn::status`] for
    /// the outcome. Errors are returned only when no turn could start.
    pub async fn send(&mut self, user_message: &str) -> Result<&ChatTurn, SessionError> {
        if self.history.last().is_some_and(ChatTurn::is_streaming) {
            return Err(SessionError::TurnInFlight);
        }
        let user_message = user_message.trim();
        if user_message.is_empty() {
            return Err(SessionError::EmptyMessage);
        }

        let messages = self.wire_messages(user_message);
        self.history.push(ChatTurn::new(user_message.to_string()));

        let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let (abort_handle, abort_registration) = AbortHandle::new_pair();
        let api = self.api.clone();
        tokio::spawn(Abortable::new(
            async move {
                if let Err(e) = quill_providers::send_message(&api, &messages, tx).await {
                    tracing::warn!(error = %e, "provider request failed");
                }
            },
            abort_registration,
        ));

        self.drive_turn(rx, &abort_handle).await;
        abort_handle.abort();

        // Refresh the model's view of the project for the next turn.
        // Applied files survive even when the refresh itself fails.
        match build_snapshot(&self.store).await {
            Ok(snapshot) => self.snapshot = snapshot,
            Err(e) => tracing::warn!(error = %e, "snapshot refresh failed; keeping stale view"),
        }

        Ok(self.history.last().expect("turn was pushed above"))
    }

    /// Consume stream events until the turn reaches a terminal status.
    ///
    /// The turn is awaiting its first byte until a `TextDelta` arrives,
    /// then streaming; failure is possible from either phase.
    async fn drive_turn(&mut self, mut rx: mpsc::Receiver<StreamEvent>, abort: &AbortHandle) {
        let mut extractor = Extractor::new(self.config.root_marker.clone());
        let mut received_text = false;
        loop {
            let Some(event) = rx.recv().await else {
                // Channel closed with no Done marker: transport died.
                self.fail_turn(if received_text {
                    "the response stream ended unexpectedly"
                } else {
                    "no response was received"
                });
                return;
            };
            match event {
                StreamEvent::TextDelta(chunk) => {
                    received_text = true;
                    self.turn_mut().append_draft(&chunk);
                    match extractor.feed(&chunk) {
                        Ok(commands) => self.apply_commands(&commands).await,
                        Err(e) => {
                            abort.abort();
                            self.fail_turn(&e.to_string());
                            return;
                        }
                    }
                }
                StreamEvent::Done => {
                    match extractor.finalize() {
                        Ok(commands) => {
                            self.apply_commands(&commands).await;
                            self.turn_mut().complete();
                        }
                        Err(e) => self.fail_turn(&e.to_string()),
                    }
                    return;
                }
                StreamEvent::Error(message) => {
                    abort.abort();
                    self.fail_turn(&message);
                    return;
                }
            }
        }
    }

    /// Apply commands strictly in discovery order, recording each on
    /// the turn. Failures are logged by the store layer and never stop
    /// later commands.
    async fn apply_commands(&mut self, commands: &[quill_types::Command]) {
        if commands.is_empty() {
            return;
        }
        for command in commands {
            self.turn_mut().record_command(command.clone());
        }
        let report = apply_batch(&self.store, commands).await;
        if !report.all_ok() {
            tracing::warn!(
                failed = report.failures().count(),
                total = commands.len(),
                "some commands did not apply cleanly"
            );
        }
    }

    fn fail_turn(&mut self, detail: &str) {
        tracing::warn!(detail, "turn failed");
        self.turn_mut().fail(format!("{FAILURE_NOTICE} ({detail})"));
    }

    fn turn_mut(&mut self) -> &mut ChatTurn {
        // A turn is pushed before streaming starts, so this always
        // points at the in-flight turn.
        self.history.last_mut().expect("a turn is in flight")
    }

    /// Assemble the wire conversation: greeting, prior turns, then the
    /// new user message with the project context folded in front.
    fn wire_messages(&self, user_message: &str) -> Vec<ChatMessage> {
        let mut messages = vec![ChatMessage::model(GREETING)];
        for turn in &self.history {
            messages.push(ChatMessage::user(turn.user_message()));
            messages.push(ChatMessage::model(turn.assistant_draft()));
        }
        let current = match context::project_context(&self.snapshot) {
            Some(ctx) => format!("{ctx}\nUser: {user_message}"),
            None => user_message.to_string(),
        };
        messages.push(ChatMessage::user(current));
        messages
    }
}
