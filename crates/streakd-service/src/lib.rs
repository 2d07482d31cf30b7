//! Service layer for streakd.
//!
//! Composes the detection engine, trigger registry and event store into
//! the operations a chat frontend calls: process a message, reset, undo,
//! report, manage triggers. All read-modify-write paths are serialized
//! per chat.

pub mod config;
pub mod error;
pub mod format;
pub mod service;

pub use config::ServiceConfig;
pub use error::{Result, ServiceError};
pub use service::{InboundMessage, StreakBroken, StreakReport, StreakService};
