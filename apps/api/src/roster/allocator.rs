//! Initial Allocator — seeds every team from the classified sequence.
//!
//! Steps:
//! 1. `team_count = max(1, ceil(n / cap))`, target sizes differ by at most one
//! 2. Prelive, Gira50x and Descanso tiers placed by serpentine assignment,
//!    counting every holder of the tier's attribute already on a team
//! 3. Plain tier fills the remaining slots, highest level first, in snake rounds
//! 4. Any team over the cap hands its lowest-level members to teams with room

use std::collections::VecDeque;

use tracing::{debug, warn};

use crate::roster::classifier::Tier;
use crate::roster::models::{Attribute, Participant, Team};

/// Seeded teams plus anyone who could not be placed under the cap.
#[derive(Debug, Clone, Default)]
pub struct Allocation {
    pub teams: Vec<Team>,
    pub unplaced: Vec<Participant>,
}

/// Per-team target sizes for `total` participants under `cap`.
///
/// The first `total % team_count` teams get one extra slot.
pub fn target_sizes(total: usize, cap: usize) -> Vec<usize> {
    let cap = cap.max(1);
    let team_count = total.div_ceil(cap).max(1);
    let base = total / team_count;
    let remainder = total - base * team_count;
    (0..team_count)
        .map(|i| if i < remainder { base + 1 } else { base })
        .collect()
}

/// Builds the initial teams from a classified sequence.
pub fn allocate(ordered: Vec<Participant>, cap: usize) -> Allocation {
    let targets = target_sizes(ordered.len(), cap);
    let mut teams: Vec<Team> = (1..=targets.len()).map(Team::new).collect();

    let mut tiers: [Vec<Participant>; 4] = Default::default();
    for participant in ordered {
        tiers[Tier::of(&participant) as usize].push(participant);
    }
    let [prelive, gira50x, descanso, plain] = tiers;

    let mut leftover: Vec<Participant> = Vec::new();
    let mut forward = true;
    for (attribute, members) in [
        (Attribute::Prelive, prelive),
        (Attribute::Gira50x, gira50x),
        (Attribute::Descanso, descanso),
    ] {
        debug!(attribute = attribute.label(), count = members.len(), "Serpentine placement");
        leftover.extend(place_serpentine(
            &mut teams, &targets, attribute, members, &mut forward,
        ));
    }

    leftover.extend(plain);
    let leftover = fill_remaining(&mut teams, &targets, leftover);

    let unplaced = enforce_cap(&mut teams, cap, leftover);
    Allocation { teams, unplaced }
}

/// Places one tier: each participant (highest level first) goes to the team
/// below target holding the fewest `attribute` holders, then the fewest
/// members. Holders placed by an earlier tier count too, so a Gira50x holder
/// seeded with the Prelive tier is offset by the Gira50x tier.
/// Traversal direction flips after every placement so equal candidates
/// alternate between the low and high end of the team list.
///
/// Returns participants for whom no team had an open slot.
fn place_serpentine(
    teams: &mut [Team],
    targets: &[usize],
    attribute: Attribute,
    mut members: Vec<Participant>,
    forward: &mut bool,
) -> Vec<Participant> {
    members.sort_by(|a, b| b.level.cmp(&a.level));
    let mut holders: Vec<usize> = teams.iter().map(|t| t.count(attribute)).collect();
    let mut unplaced = Vec::new();

    for participant in members {
        let mut best: Option<usize> = None;
        for idx in traversal(teams.len(), *forward) {
            if teams[idx].size() >= targets[idx] {
                continue;
            }
            let better = match best {
                None => true,
                Some(b) => {
                    (holders[idx], teams[idx].size()) < (holders[b], teams[b].size())
                }
            };
            if better {
                best = Some(idx);
            }
        }

        match best {
            Some(idx) => {
                holders[idx] += 1;
                teams[idx].push(participant);
                *forward = !*forward;
            }
            None => unplaced.push(participant),
        }
    }

    unplaced
}

/// Fills open slots in rounds: every team below target takes the highest-level
/// remaining participant, alternating the round direction.
fn fill_remaining(
    teams: &mut [Team],
    targets: &[usize],
    mut pool: Vec<Participant>,
) -> Vec<Participant> {
    pool.sort_by(|a, b| b.level.cmp(&a.level));
    let mut pool: VecDeque<Participant> = pool.into();
    let mut forward = true;

    loop {
        let mut placed_any = false;
        for idx in traversal(teams.len(), forward) {
            if teams[idx].size() >= targets[idx] {
                continue;
            }
            match pool.pop_front() {
                Some(participant) => {
                    teams[idx].push(participant);
                    placed_any = true;
                }
                None => return Vec::new(),
            }
        }
        if !placed_any {
            break;
        }
        forward = !forward;
    }

    pool.into()
}

/// Trims teams above `cap` (lowest levels first) and reassigns the overflow,
/// together with `pending`, to the smallest team still under the cap.
/// Returns whoever found no room.
fn enforce_cap(teams: &mut [Team], cap: usize, pending: Vec<Participant>) -> Vec<Participant> {
    let mut overflow = pending;
    for team in teams.iter_mut() {
        while team.size() > cap {
            let lowest = team
                .members
                .iter()
                .enumerate()
                .min_by_key(|(_, p)| p.level)
                .map(|(i, _)| i);
            match lowest {
                Some(i) => overflow.push(team.remove_at(i)),
                None => break,
            }
        }
    }

    overflow.sort_by(|a, b| b.level.cmp(&a.level));
    let mut unplaced = Vec::new();
    for participant in overflow {
        let target = teams
            .iter_mut()
            .filter(|t| t.size() < cap)
            .min_by_key(|t| t.size());
        match target {
            Some(team) => {
                debug!(team = team.number, name = %participant.name, "Reassigned overflow participant");
                team.push(participant);
            }
            None => {
                warn!(name = %participant.name, cap, "No team has room for participant");
                unplaced.push(participant);
            }
        }
    }
    unplaced
}

fn traversal(len: usize, forward: bool) -> Box<dyn Iterator<Item = usize>> {
    if forward {
        Box::new(0..len)
    } else {
        Box::new((0..len).rev())
    }
}
