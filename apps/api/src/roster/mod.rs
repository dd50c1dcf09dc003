// Roster balancing engine.
// Implements: table import/export, priority tiers, serpentine allocation, bounded rebalancing.
// CPU-bound work; handlers run it inside tokio::task::spawn_blocking.

pub mod allocator;
pub mod classifier;
pub mod codec;
pub mod engine;
pub mod handlers;
pub mod models;
pub mod rebalancer;

// Re-export the public API consumed by handlers.
pub use codec::{from_table, parse_table, to_table};
pub use engine::{RosterBalancer, RosterError, DEFAULT_MAX_PLAYERS_PER_TEAM};
pub use models::{Attribute, Participant, Team, TeamSummary};
