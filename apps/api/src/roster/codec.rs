//! Roster Codec — `;`-separated table import/export of participants.
//!
//! Export layout: `Time;Nickname;Level;Gira50x;Descanso;Prelive`, one row per
//! participant, ordered by team number then Prelive, Gira50x, Descanso and Level
//! (all descending). Import accepts that layout or the 5-column layout without
//! the team column, with or without a header row.
//!
//! Parsing never fails as a whole: rows that cannot be read are skipped.
#![allow(dead_code)]

use csv::{ReaderBuilder, StringRecord, Terminator, Trim, WriterBuilder};
use serde::Serialize;
use thiserror::Error;

use crate::roster::models::{Participant, Team};

pub const FIELD_SEPARATOR: u8 = b';';
pub const EXPORT_COLUMNS: [&str; 6] = ["Time", "Nickname", "Level", "Gira50x", "Descanso", "Prelive"];

const YES: &str = "Sim";
const NO: &str = "Não";
const TRUTHY: &[&str] = &["sim", "s", "yes", "y", "true", "1"];

const TEAM_ALIASES: &[&str] = &["time", "team", "teamnumber", "team_number", "equipe"];
const NAME_ALIASES: &[&str] = &["nickname", "name", "nome", "player", "jogador"];
const LEVEL_ALIASES: &[&str] = &["level", "nivel", "nível"];
const FLAG_HEADERS: &[&str] = &["gira50x", "descanso", "prelive"];

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("CSV write failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("CSV output is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

// ────────────────────────────────────────────────────────────────────────────
// Export
// ────────────────────────────────────────────────────────────────────────────

/// Serializes teams into the export table (header + one row per participant).
///
/// Names containing `;`, quotes or line breaks are quoted by the writer.
pub fn to_table(teams: &[Team]) -> Result<String, CodecError> {
    let mut ordered: Vec<&Team> = teams.iter().collect();
    ordered.sort_by_key(|t| t.number);

    let mut writer = WriterBuilder::new()
        .delimiter(FIELD_SEPARATOR)
        .terminator(Terminator::Any(b'\n'))
        .from_writer(Vec::new());
    writer.write_record(EXPORT_COLUMNS)?;

    for team in ordered {
        let mut members: Vec<&Participant> = team.members.iter().collect();
        members.sort_by(|a, b| {
            b.prelive
                .cmp(&a.prelive)
                .then(b.gira50x.cmp(&a.gira50x))
                .then(b.descanso.cmp(&a.descanso))
                .then(b.level.cmp(&a.level))
        });

        let number = team.number.to_string();
        for p in members {
            let level = p.level.to_string();
            writer.write_record([
                number.as_str(),
                p.name.as_str(),
                level.as_str(),
                yes_no(p.gira50x),
                yes_no(p.descanso),
                yes_no(p.prelive),
            ])?;
        }
    }

    let bytes = writer
        .into_inner()
        .map_err(|err| csv::Error::from(err.into_error()))?;
    Ok(String::from_utf8(bytes)?)
}

fn yes_no(value: bool) -> &'static str {
    if value {
        YES
    } else {
        NO
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Import
// ────────────────────────────────────────────────────────────────────────────

/// Result of parsing a table: the participants read plus the 1-based line
/// numbers of rows that were skipped.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ParsedRoster {
    pub participants: Vec<Participant>,
    pub skipped_rows: Vec<usize>,
}

/// Parses a table into participants, silently dropping unreadable rows.
pub fn from_table(text: &str) -> Vec<Participant> {
    parse_table(text).participants
}

/// Same as [`from_table`] but also reports which rows were skipped.
pub fn parse_table(text: &str) -> ParsedRoster {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let mut reader = ReaderBuilder::new()
        .delimiter(FIELD_SEPARATOR)
        .has_headers(false)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(text.as_bytes());

    let mut parsed = ParsedRoster::default();
    let mut header_columns: Option<Columns> = None;
    let mut first_row = true;

    for result in reader.records() {
        let record = match result {
            Ok(record) => record,
            Err(err) => {
                if let Some(position) = err.position() {
                    parsed.skipped_rows.push(position.line() as usize);
                }
                continue;
            }
        };
        let line_number = record.position().map_or(0, |p| p.line() as usize);
        if record.iter().all(str::is_empty) {
            continue;
        }

        if first_row {
            first_row = false;
            if looks_like_header(&record) {
                header_columns = Columns::from_header(&record);
                continue;
            }
        }

        let columns = match header_columns.clone().or_else(|| Columns::infer(&record)) {
            Some(c) => c,
            None => {
                parsed.skipped_rows.push(line_number);
                continue;
            }
        };

        match columns.read(&record) {
            Some(participant) => parsed.participants.push(participant),
            None => parsed.skipped_rows.push(line_number),
        }
    }

    parsed
}

/// Column positions within a row. Flag columns are optional when a header
/// names the columns explicitly.
#[derive(Debug, Clone, PartialEq)]
struct Columns {
    name: usize,
    level: Option<usize>,
    gira50x: Option<usize>,
    descanso: Option<usize>,
    prelive: Option<usize>,
}

impl Columns {
    fn from_header(record: &StringRecord) -> Option<Self> {
        let find = |aliases: &[&str]| {
            record
                .iter()
                .position(|f| aliases.contains(&normalize(f).as_str()))
        };
        Some(Self {
            name: find(NAME_ALIASES)?,
            level: find(LEVEL_ALIASES),
            gira50x: find(&["gira50x"]),
            descanso: find(&["descanso"]),
            prelive: find(&["prelive"]),
        })
    }

    /// Picks the headerless layout for a row: the 5-column import layout or the
    /// export layout led by a numeric team column. Trailing empty fields left
    /// by a closing `;` do not count towards the width.
    fn infer(record: &StringRecord) -> Option<Self> {
        if record.len() < 5 {
            return None;
        }
        let width = (0..record.len())
            .rev()
            .find(|&i| record.get(i).is_some_and(|f| !f.is_empty()))
            .map_or(0, |i| i + 1);
        let numeric = |i: usize| record.get(i).is_some_and(|f| f.parse::<u32>().is_ok());
        let export_shape = numeric(0) && numeric(2);
        let import_shape = numeric(1);

        let offset = if export_shape && (width >= 6 || !import_shape) {
            1
        } else if import_shape || width <= 5 {
            0
        } else {
            1
        };
        Some(Self {
            name: offset,
            level: Some(offset + 1),
            gira50x: Some(offset + 2),
            descanso: Some(offset + 3),
            prelive: Some(offset + 4),
        })
    }

    fn required_fields(&self) -> usize {
        [
            Some(self.name),
            self.level,
            self.gira50x,
            self.descanso,
            self.prelive,
        ]
        .into_iter()
        .flatten()
        .max()
        .map_or(0, |i| i + 1)
    }

    fn read(&self, record: &StringRecord) -> Option<Participant> {
        if record.len() < self.required_fields() {
            return None;
        }
        let name = record.get(self.name).filter(|n| !n.is_empty())?;
        let field = |column: Option<usize>| column.and_then(|i| record.get(i));
        let flag = |column: Option<usize>| field(column).is_some_and(is_truthy);

        Some(Participant {
            name: name.to_string(),
            level: field(self.level).map_or(1, parse_level),
            prelive: flag(self.prelive),
            gira50x: flag(self.gira50x),
            descanso: flag(self.descanso),
        })
    }
}

/// A header row names at least two known columns and carries no numbers, so a
/// player called "Player" in the first data row is still read as data.
fn looks_like_header(record: &StringRecord) -> bool {
    let known = record
        .iter()
        .filter(|f| {
            let token = normalize(f);
            TEAM_ALIASES.contains(&token.as_str())
                || NAME_ALIASES.contains(&token.as_str())
                || LEVEL_ALIASES.contains(&token.as_str())
                || FLAG_HEADERS.contains(&token.as_str())
        })
        .count();
    known >= 2 && !record.iter().any(|f| f.parse::<u32>().is_ok())
}

fn normalize(token: &str) -> String {
    token.trim().to_lowercase()
}

fn is_truthy(token: &str) -> bool {
    TRUTHY.contains(&normalize(token).as_str())
}

/// Non-numeric or non-positive levels fall back to 1.
fn parse_level(token: &str) -> u32 {
    token
        .trim()
        .parse::<u32>()
        .ok()
        .filter(|level| *level > 0)
        .unwrap_or(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::roster::RosterBalancer;

    fn team(number: usize, members: Vec<Participant>) -> Team {
        Team { number, members }
    }

    #[test]
    fn test_parses_import_layout_with_header() {
        let parsed = from_table("Nickname;Level;Gira50x;Descanso;Prelive\nAna;10;Sim;Não;Não");
        assert_eq!(
            parsed,
            vec![Participant::new("Ana", 10).with_gira50x(true)],
            "Header must be skipped and Sim read as true"
        );
    }

    #[test]
    fn test_parses_headerless_rows_with_crlf() {
        let parsed = from_table("Ana;3;n;s;yes\r\nBia;7;TRUE;0;no\r\n");
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0], Participant::new("Ana", 3).with_descanso(true).with_prelive(true));
        assert_eq!(parsed[1], Participant::new("Bia", 7).with_gira50x(true));
    }

    #[test]
    fn test_short_and_empty_rows_are_skipped() {
        let text = "Nickname;Level;Gira50x;Descanso;Prelive\nAna;1\n\n;4;Sim;Sim;Sim\nCaio;2;Não;Não;Não";
        let parsed = parse_table(text);
        assert_eq!(parsed.participants.len(), 1);
        assert_eq!(parsed.participants[0].name, "Caio");
        assert_eq!(parsed.skipped_rows, vec![2, 4]);
    }

    #[test]
    fn test_non_numeric_level_defaults_to_one() {
        let parsed = from_table("Ana;abc;Não;Não;Não\nBia;0;Não;Não;Não");
        assert!(parsed.iter().all(|p| p.level == 1), "Got {parsed:?}");
    }

    #[test]
    fn test_header_columns_located_by_name() {
        let parsed = from_table("Prelive;Level;Name\nsim;8;Duda");
        assert_eq!(parsed, vec![Participant::new("Duda", 8).with_prelive(true)]);
    }

    #[test]
    fn test_unknown_tokens_are_false() {
        let parsed = from_table("Ana;5;maybe;talvez;x");
        assert_eq!(parsed, vec![Participant::new("Ana", 5)]);
    }

    #[test]
    fn test_export_row_order_and_format() {
        let teams = vec![
            team(
                2,
                vec![Participant::new("Zé", 9)],
            ),
            team(
                1,
                vec![
                    Participant::new("Low", 1),
                    Participant::new("Desc", 2).with_descanso(true),
                    Participant::new("Gira", 3).with_gira50x(true),
                    Participant::new("Pre", 1).with_prelive(true),
                    Participant::new("High", 8),
                ],
            ),
        ];

        let table = to_table(&teams).unwrap();
        let header = EXPORT_COLUMNS.join(";");
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(
            lines,
            vec![
                header.as_str(),
                "1;Pre;1;Não;Não;Sim",
                "1;Gira;3;Sim;Não;Não",
                "1;Desc;2;Não;Sim;Não",
                "1;High;8;Não;Não;Não",
                "1;Low;1;Não;Não;Não",
                "2;Zé;9;Não;Não;Não",
            ]
        );
    }

    #[test]
    fn test_export_then_import_preserves_participants() {
        let members = vec![
            Participant::new("Ana", 4).with_prelive(true).with_descanso(true),
            Participant::new("Semi;colon \"quoted\"", 2),
            Participant::new("two\nlines", 6).with_gira50x(true),
        ];
        let teams = vec![team(1, members.clone())];

        let table = to_table(&teams).unwrap();
        assert!(
            table.contains("\"Semi;colon \"\"quoted\"\"\""),
            "Separator and quotes must be escaped, got {table}"
        );

        let mut parsed = from_table(&table);
        let mut expected = members;
        parsed.sort_by(|a, b| a.name.cmp(&b.name));
        expected.sort_by(|a, b| a.name.cmp(&b.name));
        assert_eq!(parsed, expected);
    }

    #[test]
    fn test_assigned_roster_survives_export_and_import() {
        let roster: Vec<Participant> = (0..40u32)
            .map(|i| {
                Participant::new(format!("player {i}; \"#{i}\""), i % 9 + 1)
                    .with_prelive(i % 7 == 0)
                    .with_gira50x(i % 5 == 0)
                    .with_descanso(i % 3 == 0)
            })
            .collect();
        let teams = RosterBalancer::seeded(3).assign_teams(roster, 12).unwrap();
        let mut assigned: Vec<Participant> =
            teams.iter().flat_map(|t| t.members.clone()).collect();

        let mut parsed = from_table(&to_table(&teams).unwrap());
        assigned.sort_by(|a, b| a.name.cmp(&b.name));
        parsed.sort_by(|a, b| a.name.cmp(&b.name));
        assert_eq!(parsed, assigned, "Every assigned participant must read back unchanged");
    }

    #[test]
    fn test_trailing_separator_keeps_import_layout() {
        let parsed = from_table("Ana;10;Sim;Não;Não;\nBia;7;Não;Não;Sim;");
        assert_eq!(
            parsed,
            vec![
                Participant::new("Ana", 10).with_gira50x(true),
                Participant::new("Bia", 7).with_prelive(true),
            ],
            "A closing ';' must not shift the columns"
        );
    }

    #[test]
    fn test_export_rows_without_header_are_read() {
        let parsed = from_table("1;Ana;1;Sim;Não;Não\n2;Bia;8;Não;Não;\n");
        assert_eq!(
            parsed,
            vec![
                Participant::new("Ana", 1).with_gira50x(true),
                Participant::new("Bia", 8),
            ]
        );
    }

    #[test]
    fn test_first_row_with_one_alias_is_data() {
        let parsed = from_table("Player;10;Sim;Não;Não\nBia;7;Não;Não;Sim");
        assert_eq!(
            parsed,
            vec![
                Participant::new("Player", 10).with_gira50x(true),
                Participant::new("Bia", 7).with_prelive(true),
            ],
            "A player named like a column must not be taken for a header"
        );
    }

    #[test]
    fn test_bom_before_header_is_ignored() {
        let parsed = from_table("\u{feff}Nickname;Level;Gira50x;Descanso;Prelive\nAna;2;Não;Não;Não");
        assert_eq!(parsed.len(), 1);
    }
}
