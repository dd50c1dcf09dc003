//! Roster Engine — single entry point: classify → allocate → rebalance.
//!
//! The random source is injected so tier shuffling is reproducible under a
//! fixed seed. Create one balancer per call; it holds no state between runs
//! apart from the generator.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use thiserror::Error;
use tracing::{info, warn};

use crate::roster::allocator::allocate;
use crate::roster::classifier::classify;
use crate::roster::models::{Participant, Team};
use crate::roster::rebalancer::rebalance;

pub const DEFAULT_MAX_PLAYERS_PER_TEAM: i64 = 22;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RosterError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

pub struct RosterBalancer<R: Rng> {
    rng: R,
}

impl<R: Rng> RosterBalancer<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }

    /// Partitions `participants` into teams of at most `max_players_per_team`.
    ///
    /// Returns an empty list for an empty roster. Team sizes end within one of
    /// each other; priority attributes and level sums are balanced best-effort.
    /// Levels must be positive and names non-blank without surrounding
    /// whitespace, so every assignment can be exported and read back as is.
    pub fn assign_teams(
        &mut self,
        participants: Vec<Participant>,
        max_players_per_team: i64,
    ) -> Result<Vec<Team>, RosterError> {
        if max_players_per_team <= 0 {
            return Err(RosterError::InvalidArgument(format!(
                "max_players_per_team must be positive, got {max_players_per_team}"
            )));
        }
        validate_participants(&participants)?;
        if participants.is_empty() {
            return Ok(Vec::new());
        }

        let cap = usize::try_from(max_players_per_team).unwrap_or(usize::MAX);
        let total = participants.len();

        let ordered = classify(participants, &mut self.rng);
        let mut allocation = allocate(ordered, cap);
        if !allocation.unplaced.is_empty() {
            warn!(
                dropped = allocation.unplaced.len(),
                cap, "Participants left without a team"
            );
        }

        let report = rebalance(&mut allocation.teams, cap);
        info!(
            participants = total,
            teams = allocation.teams.len(),
            moves = report.total_moves(),
            "Roster balanced"
        );

        Ok(allocation.teams)
    }
}

fn validate_participants(participants: &[Participant]) -> Result<(), RosterError> {
    for p in participants {
        if p.level == 0 {
            return Err(RosterError::InvalidArgument(format!(
                "participant '{}' has level 0; levels must be positive",
                p.name
            )));
        }
        if p.name.trim().is_empty() {
            return Err(RosterError::InvalidArgument(
                "participant names must not be blank".to_string(),
            ));
        }
        if p.name.trim() != p.name {
            return Err(RosterError::InvalidArgument(format!(
                "participant name '{}' has leading or trailing whitespace",
                p.name
            )));
        }
    }
    Ok(())
}

impl RosterBalancer<StdRng> {
    /// Reproducible balancer: the same seed and roster give the same teams.
    pub fn seeded(seed: u64) -> Self {
        Self::new(StdRng::seed_from_u64(seed))
    }

    pub fn from_entropy() -> Self {
        Self::new(StdRng::from_entropy())
    }
}
