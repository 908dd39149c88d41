//! HTTP backend for shared households: membership, chore schedules,
//! container turns, and the beer ledger.

pub mod api;
pub mod db;
pub mod router;
pub mod state;
pub mod store;

pub use router::build_router;
pub use state::AppState;
