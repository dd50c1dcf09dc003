//! Priority Classifier — orders participants into priority tiers.
//!
//! Tier order: Prelive → Gira50x (not Prelive) → Descanso (neither of the
//! former) → everyone else. Within a tier participants are grouped by
//! descending level; participants sharing a level are shuffled with the
//! caller's random source.

use rand::seq::SliceRandom;
use rand::Rng;

use crate::roster::models::Participant;

/// Allocation tier of a participant. A participant belongs to exactly one tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Tier {
    Prelive,
    Gira50x,
    /// Descanso holders without Prelive or Gira50x. Descanso holders that also
    /// carry one of those flags were already placed in an earlier tier.
    Descanso,
    Plain,
}

impl Tier {
    pub fn of(participant: &Participant) -> Tier {
        if participant.prelive {
            Tier::Prelive
        } else if participant.gira50x {
            Tier::Gira50x
        } else if participant.descanso {
            Tier::Descanso
        } else {
            Tier::Plain
        }
    }
}

/// Returns a permutation of `participants` in tier order, each tier sorted by
/// descending level with equal-level runs shuffled.
pub fn classify<R: Rng + ?Sized>(participants: Vec<Participant>, rng: &mut R) -> Vec<Participant> {
    let mut ordered = Vec::with_capacity(participants.len());
    let mut tiers: [Vec<Participant>; 4] = Default::default();
    for participant in participants {
        tiers[Tier::of(&participant) as usize].push(participant);
    }

    for mut tier in tiers {
        tier.sort_by(|a, b| b.level.cmp(&a.level));
        shuffle_equal_levels(&mut tier, rng);
        ordered.extend(tier);
    }

    ordered
}

/// Shuffles each run of equal levels in a slice already sorted by level.
fn shuffle_equal_levels<R: Rng + ?Sized>(sorted: &mut [Participant], rng: &mut R) {
    let mut start = 0;
    while start < sorted.len() {
        let level = sorted[start].level;
        let end = sorted[start..]
            .iter()
            .position(|p| p.level != level)
            .map_or(sorted.len(), |offset| start + offset);
        sorted[start..end].shuffle(rng);
        start = end;
    }
}
