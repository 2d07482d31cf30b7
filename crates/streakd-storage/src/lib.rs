//! Storage layer for streakd.
//!
//! An append-only occurrence log per chat plus a cached state projection,
//! both in SQLite, with the trigger registry layered on top. The log is
//! the source of truth; `chat_state` is a projection that can always be
//! rebuilt by replay.

pub mod database;
pub mod error;
pub mod models;
pub mod pool;
pub mod projector;
pub mod registry;
pub mod repository;
pub mod schema;

pub use database::Database;
pub use error::{Result, StorageError};
pub use models::{
    ChatState, NewOccurrence, Occurrence, OccurrenceDetails, OccurrenceKind, StateSnapshot,
    UserStats,
};
pub use projector::{ResetOutcome, UndoOutcome};
pub use registry::{TriggerRegistry, DEFAULT_TTL};
