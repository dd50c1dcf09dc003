//! Rebalancer — bounded local search over seeded teams.
//!
//! Three passes, in order, each capped at `MAX_PASS_ITERATIONS` rounds and
//! stopping as soon as its own condition holds:
//! - size: move plain, low-level members from the fullest to the emptiest team
//! - feature (Prelive, Gira50x, Descanso): swap holders toward the team with fewest
//! - level: swap members between the strongest and weakest team by level sum
//!
//! A pass never undoes what an earlier pass settled: an attribute whose counts
//! are within one of each other stays that way through every later feature
//! swap and level swap. Level swaps also require equal Prelive and Gira50x
//! flags; feature moves are only one-directional when the receiving team is
//! the smaller one.

use tracing::debug;

use crate::roster::models::{Attribute, Participant, Team};

pub const MAX_PASS_ITERATIONS: usize = 5;
/// Allowed spread of level sums as a fraction of the strongest team's sum.
pub const LEVEL_TOLERANCE: f64 = 0.10;

/// Number of changes each pass applied.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RebalanceReport {
    pub size_moves: usize,
    pub feature_moves: usize,
    pub level_swaps: usize,
}

impl RebalanceReport {
    pub fn total_moves(&self) -> usize {
        self.size_moves + self.feature_moves + self.level_swaps
    }
}

/// Runs the size, feature and level passes in sequence.
pub fn rebalance(teams: &mut [Team], cap: usize) -> RebalanceReport {
    let size_moves = balance_sizes(teams);
    let feature_moves = Attribute::ALL
        .into_iter()
        .map(|attribute| balance_feature(teams, attribute, cap))
        .sum();
    let level_swaps = balance_levels(teams);

    let report = RebalanceReport {
        size_moves,
        feature_moves,
        level_swaps,
    };
    debug!(?report, "Rebalance finished");
    report
}

// ────────────────────────────────────────────────────────────────────────────
// Size pass
// ────────────────────────────────────────────────────────────────────────────

/// Moves members from the fullest to the emptiest team until sizes differ by
/// at most one. The member moved is the one with the lowest priority rank,
/// then the lowest level.
pub fn balance_sizes(teams: &mut [Team]) -> usize {
    let mut moves = 0;
    for _ in 0..MAX_PASS_ITERATIONS {
        let Some((fullest, emptiest)) = extremes(teams, |t| t.size() as u64) else {
            break;
        };
        if teams[fullest].size() - teams[emptiest].size() <= 1 {
            break;
        }

        let candidate = teams[fullest]
            .members
            .iter()
            .enumerate()
            .min_by_key(|(_, p)| (p.priority_rank(), p.level))
            .map(|(i, _)| i);
        let Some(index) = candidate else {
            break;
        };

        let participant = teams[fullest].remove_at(index);
        debug!(
            from = teams[fullest].number,
            to = teams[emptiest].number,
            name = %participant.name,
            "Size move"
        );
        teams[emptiest].push(participant);
        moves += 1;
    }
    moves
}

// ────────────────────────────────────────────────────────────────────────────
// Feature pass
// ────────────────────────────────────────────────────────────────────────────

/// Equalizes how many holders of `attribute` each team has.
///
/// A holder of the team with the most holders (lowest level first) is swapped
/// with a non-holder of the team with the fewest. Without an acceptable
/// partner, the holder is only moved when the receiving team is smaller and
/// below `cap`. Neither may push an attribute earlier in `Attribute::ALL` past
/// a spread of one; a round with no such candidate changes nothing and still
/// counts toward the iteration budget.
pub fn balance_feature(teams: &mut [Team], attribute: Attribute, cap: usize) -> usize {
    let earlier: Vec<Attribute> = Attribute::ALL
        .into_iter()
        .take_while(|a| *a != attribute)
        .collect();
    let mut moves = 0;
    for _ in 0..MAX_PASS_ITERATIONS {
        let Some((most, fewest)) = extremes(teams, |t| t.count(attribute) as u64) else {
            break;
        };
        if teams[most].count(attribute) - teams[fewest].count(attribute) <= 1 {
            break;
        }

        let settled = settled_attributes(teams, earlier.iter().copied());
        let mut holders: Vec<usize> = teams[most]
            .members
            .iter()
            .enumerate()
            .filter(|(_, p)| p.has(attribute))
            .map(|(i, _)| i)
            .collect();
        holders.sort_by_key(|i| teams[most].members[*i].level);

        if let Some((holder, partner)) =
            find_feature_swap(teams, (most, fewest), &holders, attribute, &settled)
        {
            swap_members(teams, (most, holder), (fewest, partner));
            debug!(attribute = attribute.label(), "Feature swap");
            moves += 1;
            continue;
        }

        let has_room = teams[most].size() > teams[fewest].size() && teams[fewest].size() < cap;
        let movable = if has_room {
            let view: &[Team] = teams;
            holders.into_iter().find(|&h| {
                keeps_settled(view, &settled, (most, &view[most].members[h]), (fewest, None))
            })
        } else {
            None
        };
        match movable {
            Some(holder) => {
                let participant = teams[most].remove_at(holder);
                teams[fewest].push(participant);
                debug!(attribute = attribute.label(), "Feature move");
                moves += 1;
            }
            None => debug!(attribute = attribute.label(), "Feature round skipped"),
        }
    }
    moves
}

/// First holder (in `holders` order) with an acceptable partner, paired with
/// its best partner: fewest other-flag mismatches, then the closest level.
fn find_feature_swap(
    teams: &[Team],
    (most, fewest): (usize, usize),
    holders: &[usize],
    attribute: Attribute,
    settled: &[Attribute],
) -> Option<(usize, usize)> {
    holders.iter().find_map(|&holder| {
        let moved = &teams[most].members[holder];
        teams[fewest]
            .members
            .iter()
            .enumerate()
            .filter(|(_, p)| !p.has(attribute))
            .filter(|(_, p)| keeps_settled(teams, settled, (most, moved), (fewest, Some(*p))))
            .min_by_key(|(_, p)| {
                (
                    other_flag_mismatches(moved, p, attribute),
                    moved.level.abs_diff(p.level),
                )
            })
            .map(|(partner, _)| (holder, partner))
    })
}

fn other_flag_mismatches(a: &Participant, b: &Participant, skip: Attribute) -> usize {
    Attribute::ALL
        .into_iter()
        .filter(|attr| *attr != skip && a.has(*attr) != b.has(*attr))
        .count()
}

// ────────────────────────────────────────────────────────────────────────────
// Level pass
// ────────────────────────────────────────────────────────────────────────────

/// Narrows the gap between the strongest and weakest team by level sum.
///
/// Only acts when both teams have the same size. Pairs are tried from the
/// strongest team's highest level against the weakest team's lowest level; a
/// pair is accepted when it strictly shrinks the gap, both members share
/// their Prelive and Gira50x flags, and no attribute within a spread of one
/// is pushed past it.
pub fn balance_levels(teams: &mut [Team]) -> usize {
    let mut swaps = 0;
    for _ in 0..MAX_PASS_ITERATIONS {
        let Some((strong, weak)) = extremes(teams, Team::level_sum) else {
            break;
        };
        let strong_sum = teams[strong].level_sum();
        let gap = strong_sum - teams[weak].level_sum();
        if gap as f64 <= LEVEL_TOLERANCE * strong_sum as f64 {
            break;
        }
        if teams[strong].size() != teams[weak].size() {
            debug!(strong = teams[strong].number, weak = teams[weak].number, "Level pass skipped, sizes differ");
            break;
        }

        let settled = settled_attributes(teams, Attribute::ALL);
        let Some((s, w)) = find_level_swap(teams, (strong, weak), gap, &settled) else {
            break;
        };
        swap_members(teams, (strong, s), (weak, w));
        swaps += 1;
    }
    swaps
}

fn find_level_swap(
    teams: &[Team],
    (strong_idx, weak_idx): (usize, usize),
    gap: u64,
    settled: &[Attribute],
) -> Option<(usize, usize)> {
    let (strong, weak) = (&teams[strong_idx], &teams[weak_idx]);
    let mut strong_order: Vec<usize> = (0..strong.size()).collect();
    strong_order.sort_by(|a, b| strong.members[*b].level.cmp(&strong.members[*a].level));
    let mut weak_order: Vec<usize> = (0..weak.size()).collect();
    weak_order.sort_by_key(|i| weak.members[*i].level);

    let gap = gap as i64;
    for &s in &strong_order {
        for &w in &weak_order {
            let (hi, lo) = (&strong.members[s], &weak.members[w]);
            let delta = i64::from(hi.level) - i64::from(lo.level);
            let new_gap = (gap - 2 * delta).abs();
            if new_gap < gap
                && hi.prelive == lo.prelive
                && hi.gira50x == lo.gira50x
                && keeps_settled(teams, settled, (strong_idx, hi), (weak_idx, Some(lo)))
            {
                return Some((s, w));
            }
        }
    }
    None
}

// ────────────────────────────────────────────────────────────────────────────
// Helpers
// ────────────────────────────────────────────────────────────────────────────

/// Indices of the teams with the highest and lowest `key` (first occurrence
/// wins ties). `None` with fewer than two teams.
fn extremes<F>(teams: &[Team], key: F) -> Option<(usize, usize)>
where
    F: Fn(&Team) -> u64,
{
    if teams.len() < 2 {
        return None;
    }
    let mut high = 0;
    let mut low = 0;
    for (i, team) in teams.iter().enumerate().skip(1) {
        if key(team) > key(&teams[high]) {
            high = i;
        }
        if key(team) < key(&teams[low]) {
            low = i;
        }
    }
    Some((high, low))
}

/// Spread of `attribute` holder counts across teams.
fn count_spread(teams: &[Team], attribute: Attribute) -> usize {
    let counts = teams.iter().map(|t| t.count(attribute));
    let max = counts.clone().max().unwrap_or(0);
    let min = counts.min().unwrap_or(0);
    max - min
}

/// The subset of `candidates` whose holder counts are within one of each other.
fn settled_attributes(
    teams: &[Team],
    candidates: impl IntoIterator<Item = Attribute>,
) -> Vec<Attribute> {
    candidates
        .into_iter()
        .filter(|a| count_spread(teams, *a) <= 1)
        .collect()
}

/// Whether sending `leaving` from team `a` to team `b`, and `entering` (if
/// any) the other way, keeps every `settled` attribute within a spread of one.
fn keeps_settled(
    teams: &[Team],
    settled: &[Attribute],
    (a, leaving): (usize, &Participant),
    (b, entering): (usize, Option<&Participant>),
) -> bool {
    settled.iter().all(|&attribute| {
        let shift = i64::from(leaving.has(attribute))
            - entering.map_or(0, |p| i64::from(p.has(attribute)));
        let counts: Vec<i64> = teams
            .iter()
            .enumerate()
            .map(|(i, t)| {
                let count = t.count(attribute) as i64;
                if i == a {
                    count - shift
                } else if i == b {
                    count + shift
                } else {
                    count
                }
            })
            .collect();
        match (counts.iter().min(), counts.iter().max()) {
            (Some(min), Some(max)) => max - min <= 1,
            _ => true,
        }
    })
}

fn swap_members(teams: &mut [Team], (a, ai): (usize, usize), (b, bi): (usize, usize)) {
    let from_a = teams[a].remove_at(ai);
    let from_b = teams[b].remove_at(bi);
    teams[a].push(from_b);
    teams[b].push(from_a);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn team(number: usize, members: Vec<Participant>) -> Team {
        Team { number, members }
    }

    fn p(name: &str, level: u32) -> Participant {
        Participant::new(name, level)
    }

    fn pre(name: &str, level: u32) -> Participant {
        Participant::new(name, level).with_prelive(true)
    }

    #[test]
    fn test_size_pass_moves_plain_low_level_member() {
        let mut teams = vec![
            team(1, vec![pre("a", 1), p("b", 5), p("c", 2), p("d", 9), p("e", 3)]),
            team(2, vec![p("f", 1), p("g", 1)]),
        ];
        let moves = balance_sizes(&mut teams);
        assert_eq!(moves, 1);
        assert_eq!(teams[0].size(), 4);
        assert_eq!(teams[1].size(), 3);
        assert_eq!(teams[1].members[2].name, "c", "Plain, lowest-level member moves first");
    }

    #[test]
    fn test_size_pass_noop_when_balanced() {
        let mut teams = vec![team(1, vec![p("a", 1), p("b", 1)]), team(2, vec![p("c", 1)])];
        assert_eq!(balance_sizes(&mut teams), 0);
    }

    #[test]
    fn test_feature_swap_keeps_sizes() {
        let mut teams = vec![
            team(1, vec![pre("a", 5), pre("b", 2), pre("c", 7), p("d", 4)]),
            team(2, vec![p("e", 3), p("f", 6), p("g", 1), p("h", 2)]),
        ];
        let moves = balance_feature(&mut teams, Attribute::Prelive, 22);
        assert_eq!(moves, 1);
        assert_eq!(teams[0].count(Attribute::Prelive), 2);
        assert_eq!(teams[1].count(Attribute::Prelive), 1);
        assert_eq!((teams[0].size(), teams[1].size()), (4, 4));
        assert!(
            teams[1].members.iter().any(|m| m.name == "b"),
            "Lowest-level holder is the one swapped"
        );
        assert!(
            teams[0].members.iter().any(|m| m.name == "h"),
            "Partner with the closest level is chosen"
        );
    }

    #[test]
    fn test_feature_swap_prefers_matching_other_flags() {
        let mut teams = vec![
            team(
                1,
                vec![
                    pre("a", 3).with_descanso(true),
                    pre("b", 9),
                    pre("c", 9),
                ],
            ),
            team(2, vec![p("d", 3), p("e", 8).with_descanso(true), p("f", 1)]),
        ];
        balance_feature(&mut teams, Attribute::Prelive, 22);
        assert!(
            teams[0].members.iter().any(|m| m.name == "e"),
            "Descanso partner should be preferred over the closer level"
        );
        assert_eq!(teams[0].count(Attribute::Descanso), 1);
    }

    #[test]
    fn test_feature_swap_keeps_earlier_attribute_balanced() {
        let gira = |name: &str, level: u32| Participant::new(name, level).with_gira50x(true);
        let mut teams = vec![
            team(
                1,
                vec![
                    pre("a", 1).with_gira50x(true),
                    gira("c", 2),
                    gira("g", 3),
                    gira("i", 4),
                ],
            ),
            team(2, vec![pre("h", 5).with_gira50x(true), p("e", 6), p("f", 7), p("j", 8)]),
        ];

        // Every Gira50x partner for "a" lacks Prelive, so "a" must stay put.
        let moves = balance_feature(&mut teams, Attribute::Gira50x, 22);
        assert_eq!(moves, 1);
        assert_eq!(teams[0].count(Attribute::Prelive), 1, "Prelive must stay 1/1");
        assert_eq!(teams[1].count(Attribute::Prelive), 1, "Prelive must stay 1/1");
        assert!(teams[0].count(Attribute::Gira50x).abs_diff(teams[1].count(Attribute::Gira50x)) <= 1);
        assert!(teams[1].members.iter().any(|m| m.name == "c"));
        assert!(teams[0].members.iter().any(|m| m.name == "e"));
    }

    #[test]
    fn test_feature_move_into_smaller_team() {
        let mut teams = vec![team(1, vec![pre("a", 1), pre("b", 2)]), team(2, vec![])];
        let moves = balance_feature(&mut teams, Attribute::Prelive, 22);
        assert_eq!(moves, 1);
        assert_eq!(teams[0].count(Attribute::Prelive), 1);
        assert_eq!(teams[1].count(Attribute::Prelive), 1);
    }

    #[test]
    fn test_feature_no_move_when_it_would_unbalance_sizes() {
        let mut teams = vec![
            team(1, vec![pre("a", 1), pre("b", 2), pre("c", 3)]),
            team(2, vec![pre("d", 1)]),
            team(3, vec![p("e", 1), p("f", 1), p("g", 1)]),
        ];
        // Team 3 has non-holders, so the holder is swapped rather than moved.
        balance_feature(&mut teams, Attribute::Prelive, 22);
        let sizes: Vec<usize> = teams.iter().map(Team::size).collect();
        assert_eq!(sizes, vec![3, 1, 3], "Swaps never change sizes");
    }

    #[test]
    fn test_level_pass_narrows_gap() {
        let mut teams = vec![
            team(1, vec![p("a", 10), p("b", 8)]),
            team(2, vec![p("c", 1), p("d", 2)]),
        ];
        let swaps = balance_levels(&mut teams);
        assert!(swaps >= 1);
        let (s1, s2) = (teams[0].level_sum(), teams[1].level_sum());
        let max = s1.max(s2) as f64;
        assert!(
            (s1.abs_diff(s2) as f64) <= LEVEL_TOLERANCE * max,
            "Sums {s1} and {s2} still too far apart"
        );
    }

    #[test]
    fn test_level_pass_requires_matching_flags() {
        let mut teams = vec![
            team(1, vec![pre("a", 10), pre("b", 9)]),
            team(2, vec![p("c", 1), p("d", 2)]),
        ];
        assert_eq!(balance_levels(&mut teams), 0);
        assert_eq!(teams[0].count(Attribute::Prelive), 2);
    }

    #[test]
    fn test_level_pass_keeps_balanced_descanso() {
        let mut teams = vec![
            team(1, vec![p("a", 10).with_descanso(true), p("b", 9)]),
            team(2, vec![p("c", 1), p("d", 2).with_descanso(true)]),
        ];
        // a↔c would shrink the gap most directly but leave Descanso at 0/2.
        let swaps = balance_levels(&mut teams);
        assert_eq!(swaps, 1);
        assert_eq!(teams[0].count(Attribute::Descanso), 1);
        assert_eq!(teams[1].count(Attribute::Descanso), 1);
        assert_eq!(teams[0].level_sum(), teams[1].level_sum());
    }

    #[test]
    fn test_level_pass_ignores_unequal_sizes() {
        let mut teams = vec![
            team(1, vec![p("a", 10), p("b", 9), p("c", 9)]),
            team(2, vec![p("d", 1), p("e", 2)]),
        ];
        assert_eq!(balance_levels(&mut teams), 0);
    }

    #[test]
    fn test_rebalance_is_idempotent() {
        let mut teams = vec![
            team(1, vec![pre("a", 4), pre("b", 3), pre("c", 6), p("d", 9), p("e", 1)]),
            team(2, vec![p("f", 2), p("g", 7), p("h", 5)]),
        ];
        let first = rebalance(&mut teams, 22);
        assert!(first.total_moves() > 0);

        let snapshot = teams.clone();
        let second = rebalance(&mut teams, 22);
        assert_eq!(second.total_moves(), 0, "Second run must not move anyone: {second:?}");
        assert_eq!(teams, snapshot);
    }

    #[test]
    fn test_single_team_untouched() {
        let mut teams = vec![team(1, vec![pre("a", 1), pre("b", 1), p("c", 9)])];
        assert_eq!(rebalance(&mut teams, 22), RebalanceReport::default());
    }
}
