//! Core domain types for Quill - no IO, no async.
//!
//! This crate holds the values that cross crate boundaries: the
//! [`Command`] extracted from model output, the [`ChatTurn`] lifecycle,
//! the [`ProjectSnapshot`] handed to the model as context, and the
//! [`StreamEvent`]s emitted by the transport.

mod command;
mod snapshot;
mod turn;

pub use command::{Command, CommandKind};
pub use snapshot::ProjectSnapshot;
pub use turn::{ChatTurn, TurnStatus};

/// An event emitted by a provider while streaming one response.
///
/// Providers normalize their wire formats to this enum; the session
/// coordinator consumes events strictly in arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// Incremental text content from the model.
    TextDelta(String),
    /// Stream completed successfully.
    Done,
    /// Stream terminated with an error.
    Error(String),
}
