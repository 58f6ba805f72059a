//! Streaming command extraction and session orchestration.
//!
//! The core loop: model text streams in as chunks, the [`Extractor`]
//! pulls complete file commands out of the accumulated buffer, and the
//! [`Session`] applies each command to its file store in order before
//! the stream has even finished. Consumed command text is removed from
//! the buffer, which is what makes every command fire exactly once no
//! matter how the stream was chunked.

pub mod config;
pub mod context;
pub mod diff;
pub mod extract;
pub mod grammar;
pub mod path;
pub mod session;

pub use config::EngineConfig;
pub use extract::{ExtractError, Extractor};
pub use session::{GREETING, Session, SessionError};
