use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use super::rules::RawPerformance;
use crate::season::{MatchStatus, TossDecision};

/// Raw match scorecard as delivered by a provider. Players and teams are
/// referenced by name and resolved against the season catalog on ingest.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Scorecard {
    pub external_match_id: String,
    #[serde(default)]
    pub status: Option<MatchStatus>,
    #[serde(default)]
    pub toss_winner: Option<String>,
    #[serde(default)]
    pub toss_decision: Option<TossDecision>,
    #[serde(default)]
    pub winner: Option<String>,
    #[serde(default)]
    pub player_of_match: Option<String>,
    /// Playing elevens; a listed player scores participation even without
    /// batting or bowling
    #[serde(default)]
    pub teams: Vec<TeamSheet>,
    #[serde(default)]
    pub innings: Vec<Innings>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TeamSheet {
    pub team: String,
    pub players: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Innings {
    pub batting_team: String,
    pub total_runs: i32,
    pub total_wickets: i32,
    pub overs: String,
    #[serde(default)]
    pub batting: Vec<BattingEntry>,
    #[serde(default)]
    pub bowling: Vec<BowlingEntry>,
    #[serde(default)]
    pub fielding: Vec<FieldingEntry>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BattingEntry {
    pub player: String,
    pub runs: i32,
    pub balls: i32,
    #[serde(default)]
    pub fours: i32,
    #[serde(default)]
    pub sixes: i32,
    #[serde(default)]
    pub not_out: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BowlingEntry {
    pub player: String,
    /// Cricket overs notation, `"3.4"` is three overs and four balls
    pub overs: String,
    #[serde(default)]
    pub maidens: i32,
    pub runs: i32,
    pub wickets: i32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldingEntry {
    pub player: String,
    #[serde(default)]
    pub catches: i32,
    #[serde(default)]
    pub wk_catches: i32,
    #[serde(default)]
    pub stumpings: i32,
    #[serde(default)]
    pub run_out_solo: i32,
    #[serde(default)]
    pub run_out_collab: i32,
}

/// Converts overs notation to legal balls. Returns `None` for malformed input
/// such as `"3.7"` or `"-1"`.
pub fn balls_from_overs(overs: &str) -> Option<i32> {
    let overs = overs.trim();
    let (whole, part) = match overs.split_once('.') {
        Some((whole, part)) => (whole, part),
        None => (overs, "0"),
    };

    let whole: i32 = whole.parse().ok()?;
    let part: i32 = if part.is_empty() { 0 } else { part.parse().ok()? };
    if whole < 0 || !(0..6).contains(&part) {
        return None;
    }

    Some(whole * 6 + part)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    UnknownPlayer,
    UnknownTeam,
    MalformedRow,
    IllegalTransition,
}

/// A scorecard row that was reported and skipped while ingestion continued
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkippedRow {
    pub reason: SkipReason,
    pub detail: String,
}

impl SkippedRow {
    pub fn new(reason: SkipReason, detail: impl Into<String>) -> Self {
        Self {
            reason,
            detail: detail.into(),
        }
    }
}

impl fmt::Display for SkippedRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {}", self.reason, self.detail)
    }
}

/// Raw performance for one named player merged across all innings
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NamedPerformance {
    pub player: String,
    /// Team sheet the player appeared on, if any
    pub team: Option<String>,
    pub raw: RawPerformance,
}

fn name_key(name: &str) -> String {
    name.trim().to_lowercase()
}

fn entry<'a>(
    merged: &'a mut BTreeMap<String, NamedPerformance>,
    name: &str,
) -> Option<&'a mut NamedPerformance> {
    if name.trim().is_empty() {
        return None;
    }
    Some(
        merged
            .entry(name_key(name))
            .or_insert_with(|| NamedPerformance {
                player: name.trim().to_string(),
                ..NamedPerformance::default()
            }),
    )
}

fn add(slot: &mut Option<i32>, value: i32) {
    *slot = Some(slot.unwrap_or(0) + value);
}

impl Scorecard {
    /// Merges batting, bowling and fielding entries per player (names compare
    /// case-insensitively). Malformed rows are returned separately.
    pub fn performances(&self) -> (Vec<NamedPerformance>, Vec<SkippedRow>) {
        let mut merged: BTreeMap<String, NamedPerformance> = BTreeMap::new();
        let mut skipped = Vec::new();

        for sheet in &self.teams {
            for player in &sheet.players {
                match entry(&mut merged, player) {
                    Some(perf) => perf.team = Some(sheet.team.clone()),
                    None => skipped.push(SkippedRow::new(
                        SkipReason::MalformedRow,
                        format!("blank player name on team sheet {}", sheet.team),
                    )),
                }
            }
        }

        for innings in &self.innings {
            for bat in &innings.batting {
                if bat.runs < 0 || bat.balls < 0 {
                    skipped.push(SkippedRow::new(
                        SkipReason::MalformedRow,
                        format!("negative batting figures for {}", bat.player),
                    ));
                    continue;
                }
                let Some(perf) = entry(&mut merged, &bat.player) else {
                    skipped.push(SkippedRow::new(SkipReason::MalformedRow, "blank batter name"));
                    continue;
                };
                let raw = &mut perf.raw;
                add(&mut raw.bat_runs, bat.runs);
                add(&mut raw.bat_balls, bat.balls);
                add(&mut raw.bat_fours, bat.fours);
                add(&mut raw.bat_sixes, bat.sixes);
                raw.bat_not_out = Some(raw.bat_not_out.unwrap_or(false) || bat.not_out);
            }

            for bowl in &innings.bowling {
                let Some(balls) = balls_from_overs(&bowl.overs) else {
                    skipped.push(SkippedRow::new(
                        SkipReason::MalformedRow,
                        format!("unreadable overs {:?} for {}", bowl.overs, bowl.player),
                    ));
                    continue;
                };
                let Some(perf) = entry(&mut merged, &bowl.player) else {
                    skipped.push(SkippedRow::new(SkipReason::MalformedRow, "blank bowler name"));
                    continue;
                };
                let raw = &mut perf.raw;
                add(&mut raw.bowl_balls, balls);
                add(&mut raw.bowl_maidens, bowl.maidens);
                add(&mut raw.bowl_runs, bowl.runs);
                add(&mut raw.bowl_wickets, bowl.wickets);
            }

            for field in &innings.fielding {
                let Some(perf) = entry(&mut merged, &field.player) else {
                    skipped.push(SkippedRow::new(SkipReason::MalformedRow, "blank fielder name"));
                    continue;
                };
                let raw = &mut perf.raw;
                add(&mut raw.field_catch, field.catches);
                add(&mut raw.wk_catch, field.wk_catches);
                add(&mut raw.wk_stumping, field.stumpings);
                add(&mut raw.run_out_solo, field.run_out_solo);
                add(&mut raw.run_out_collab, field.run_out_collab);
            }
        }

        if let Some(perf) = self
            .player_of_match
            .as_deref()
            .and_then(|potm| entry(&mut merged, potm))
        {
            perf.raw.player_of_match = Some(true);
        }

        (merged.into_values().collect(), skipped)
    }
}
