//! Core trigger-word detection for streakd.
//!
//! This crate is pure computation: given a message and a set of trigger
//! lemmas/rules it decides whether the message breaks a streak. Storage
//! and chat transport live in sibling crates.

pub mod detect;
pub mod duration;
pub mod evasion;
pub mod exclusions;
pub mod lemma;
pub mod patterns;
pub mod text;

pub use detect::{ChatTriggers, DetectionResult, Detector, MatchDetail, MatchKind};
pub use evasion::{generate_variants, transliterate, Transliteration, VariantSpec};
pub use lemma::{IdentityLemmatizer, Lemmatizer, TableLemmatizer};
pub use patterns::PatternCache;
