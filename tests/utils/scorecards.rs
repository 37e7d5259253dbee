#![allow(dead_code)]

use fantasy_cricket::scoring::{
    BattingEntry, BowlingEntry, FieldingEntry, Innings, Scorecard, TeamSheet,
};
use fantasy_cricket::season::MatchStatus;

/// Fluent builder for provider scorecards. Batting, bowling and fielding rows
/// go into the most recently opened innings.
pub struct ScorecardBuilder {
    scorecard: Scorecard,
}

impl ScorecardBuilder {
    pub fn new(external_match_id: &str) -> Self {
        Self {
            scorecard: Scorecard {
                external_match_id: external_match_id.to_string(),
                ..Scorecard::default()
            },
        }
    }

    pub fn status(mut self, status: MatchStatus) -> Self {
        self.scorecard.status = Some(status);
        self
    }

    pub fn winner(mut self, team: &str) -> Self {
        self.scorecard.winner = Some(team.to_string());
        self
    }

    pub fn team_sheet(mut self, team: &str, players: &[&str]) -> Self {
        self.scorecard.teams.push(TeamSheet {
            team: team.to_string(),
            players: players.iter().map(|p| p.to_string()).collect(),
        });
        self
    }

    pub fn innings(mut self, batting_team: &str, total_runs: i32, overs: &str) -> Self {
        self.scorecard.innings.push(Innings {
            batting_team: batting_team.to_string(),
            total_runs,
            total_wickets: 0,
            overs: overs.to_string(),
            ..Innings::default()
        });
        self
    }

    pub fn batting(mut self, player: &str, runs: i32, balls: i32, fours: i32, sixes: i32) -> Self {
        self.current_innings().batting.push(BattingEntry {
            player: player.to_string(),
            runs,
            balls,
            fours,
            sixes,
            not_out: false,
        });
        self
    }

    pub fn bowling(mut self, player: &str, overs: &str, runs: i32, wickets: i32) -> Self {
        self.current_innings().bowling.push(BowlingEntry {
            player: player.to_string(),
            overs: overs.to_string(),
            maidens: 0,
            runs,
            wickets,
        });
        self
    }

    pub fn catches(mut self, player: &str, catches: i32) -> Self {
        self.current_innings().fielding.push(FieldingEntry {
            player: player.to_string(),
            catches,
            ..FieldingEntry::default()
        });
        self
    }

    pub fn build(self) -> Scorecard {
        self.scorecard
    }

    fn current_innings(&mut self) -> &mut Innings {
        if self.scorecard.innings.is_empty() {
            self.scorecard.innings.push(Innings {
                overs: "20".to_string(),
                ..Innings::default()
            });
        }
        let last = self.scorecard.innings.len() - 1;
        &mut self.scorecard.innings[last]
    }
}
