//! Detection engine.
//!
//! Combines the lemma layer (tokenize, lemmatize, set lookup) with the
//! regex layer (compiled evasion rules) behind a single `detect` call.

mod engine;
mod types;

pub use engine::Detector;
pub use types::{ChatTriggers, DetectionResult, MatchDetail, MatchKind};
