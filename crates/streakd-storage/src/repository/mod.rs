//! Repositories over the SQLite schema.
//!
//! Each repository is a stateless namespace of queries taking an
//! explicit connection, so callers control transaction scope.

mod events;
mod state;
mod stats;
mod triggers;

pub use events::EventsRepo;
pub use state::StateRepo;
pub use stats::StatsRepo;
pub use triggers::TriggersRepo;
