#![allow(dead_code)]

use serde::{Deserialize, Serialize};

// ────────────────────────────────────────────────────────────────────────────
// Attributes
// ────────────────────────────────────────────────────────────────────────────

/// A boolean priority attribute a participant may carry.
///
/// Balancing treats each attribute independently, in the order of `ALL`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Attribute {
    Prelive,
    Gira50x,
    Descanso,
}

impl Attribute {
    pub const ALL: [Attribute; 3] = [Attribute::Prelive, Attribute::Gira50x, Attribute::Descanso];

    pub fn held_by(self, participant: &Participant) -> bool {
        match self {
            Attribute::Prelive => participant.prelive,
            Attribute::Gira50x => participant.gira50x,
            Attribute::Descanso => participant.descanso,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Attribute::Prelive => "Prelive",
            Attribute::Gira50x => "Gira50x",
            Attribute::Descanso => "Descanso",
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Participant
// ────────────────────────────────────────────────────────────────────────────

/// A roster entry. Never mutated once built; moving a participant between
/// teams removes it from one member list and pushes it onto another.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Participant {
    pub name: String,
    pub level: u32,
    #[serde(default)]
    pub prelive: bool,
    #[serde(default)]
    pub gira50x: bool,
    #[serde(default)]
    pub descanso: bool,
}

impl Participant {
    pub fn new(name: impl Into<String>, level: u32) -> Self {
        Self {
            name: name.into(),
            level,
            prelive: false,
            gira50x: false,
            descanso: false,
        }
    }

    pub fn with_prelive(mut self, prelive: bool) -> Self {
        self.prelive = prelive;
        self
    }

    pub fn with_gira50x(mut self, gira50x: bool) -> Self {
        self.gira50x = gira50x;
        self
    }

    pub fn with_descanso(mut self, descanso: bool) -> Self {
        self.descanso = descanso;
        self
    }

    pub fn has(&self, attribute: Attribute) -> bool {
        attribute.held_by(self)
    }

    /// Rank of the strongest attribute held: Prelive=3, Gira50x=2, Descanso=1, none=0.
    pub fn priority_rank(&self) -> u8 {
        if self.prelive {
            3
        } else if self.gira50x {
            2
        } else if self.descanso {
            1
        } else {
            0
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Team
// ────────────────────────────────────────────────────────────────────────────

/// A numbered team. Size, attribute counts and level sum are always derived
/// from `members`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Team {
    pub number: usize,
    pub members: Vec<Participant>,
}

impl Team {
    pub fn new(number: usize) -> Self {
        Self {
            number,
            members: Vec::new(),
        }
    }

    pub fn size(&self) -> usize {
        self.members.len()
    }

    pub fn count(&self, attribute: Attribute) -> usize {
        self.members.iter().filter(|p| p.has(attribute)).count()
    }

    pub fn level_sum(&self) -> u64 {
        self.members.iter().map(|p| u64::from(p.level)).sum()
    }

    pub fn push(&mut self, participant: Participant) {
        self.members.push(participant);
    }

    pub fn remove_at(&mut self, index: usize) -> Participant {
        self.members.remove(index)
    }
}

/// Read-only projection of a team returned alongside assignments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamSummary {
    pub team_number: usize,
    pub size: usize,
    pub level_sum: u64,
    pub prelive: usize,
    pub gira50x: usize,
    pub descanso: usize,
}

impl From<&Team> for TeamSummary {
    fn from(team: &Team) -> Self {
        Self {
            team_number: team.number,
            size: team.size(),
            level_sum: team.level_sum(),
            prelive: team.count(Attribute::Prelive),
            gira50x: team.count(Attribute::Gira50x),
            descanso: team.count(Attribute::Descanso),
        }
    }
}
