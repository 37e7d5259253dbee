use serde::{Deserialize, Serialize};

use crate::season::PlayerRole;

/// Raw per-player match statistics. Missing counts score as zero and
/// missing flags as false.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawPerformance {
    pub bat_runs: Option<i32>,
    pub bat_balls: Option<i32>,
    pub bat_fours: Option<i32>,
    pub bat_sixes: Option<i32>,
    pub bat_not_out: Option<bool>,
    pub bowl_balls: Option<i32>,
    pub bowl_maidens: Option<i32>,
    pub bowl_runs: Option<i32>,
    pub bowl_wickets: Option<i32>,
    pub field_catch: Option<i32>,
    pub wk_catch: Option<i32>,
    pub wk_stumping: Option<i32>,
    pub run_out_solo: Option<i32>,
    pub run_out_collab: Option<i32>,
    pub player_of_match: Option<bool>,
    pub player_role: Option<PlayerRole>,
}

/// Points per scoring component for one player in one match
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PointsBreakdown {
    pub batting: i32,
    pub bowling: i32,
    pub fielding: i32,
    pub other: i32,
    pub total: i32,
}

/// Fine-grained decomposition of base points; boost multipliers act on these
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScoreComponents {
    pub runs: i32,
    pub fours: i32,
    pub sixes: i32,
    pub bat_milestones: i32,
    pub strike_rate: i32,
    pub duck: i32,
    pub wickets: i32,
    pub maidens: i32,
    pub bowl_milestones: i32,
    pub economy: i32,
    pub catches: i32,
    pub stumpings: i32,
    pub run_outs: i32,
    pub potm: i32,
    pub playing: i32,
}

impl ScoreComponents {
    pub fn breakdown(&self) -> PointsBreakdown {
        let batting = self.runs
            + self.fours
            + self.sixes
            + self.bat_milestones
            + self.strike_rate
            + self.duck;
        let bowling = self.wickets + self.maidens + self.bowl_milestones + self.economy;
        let fielding = self.catches + self.stumpings + self.run_outs;
        let other = self.potm + self.playing;

        PointsBreakdown {
            batting,
            bowling,
            fielding,
            other,
            total: batting + bowling + fielding + other,
        }
    }
}

pub const PARTICIPATION_POINTS: i32 = 4;
pub const PLAYER_OF_MATCH_POINTS: i32 = 50;

/// Minimum balls faced (or bowled) before strike-rate (or economy) applies
const RATE_BONUS_MIN_BALLS: i32 = 10;

pub fn components(raw: &RawPerformance) -> ScoreComponents {
    let runs = count(raw.bat_runs);
    let balls = count(raw.bat_balls);
    let wickets = count(raw.bowl_wickets);

    let mut bat_milestones = 0;
    if runs >= 50 {
        bat_milestones += 8;
    }
    if runs >= 100 {
        bat_milestones += 16;
    }

    let duck = if runs == 0 && !flag(raw.bat_not_out) && raw.player_role != Some(PlayerRole::Bowl)
    {
        -2
    } else {
        0
    };

    let mut bowl_milestones = 0;
    if wickets >= 3 {
        bowl_milestones += 8;
    }
    if wickets >= 5 {
        bowl_milestones += 16;
    }

    ScoreComponents {
        runs,
        fours: count(raw.bat_fours),
        sixes: 2 * count(raw.bat_sixes),
        bat_milestones,
        strike_rate: strike_rate_bonus(runs, balls),
        duck,
        wickets: 25 * wickets,
        maidens: 8 * count(raw.bowl_maidens),
        bowl_milestones,
        economy: economy_bonus(count(raw.bowl_runs), count(raw.bowl_balls)),
        catches: 8 * (count(raw.field_catch) + count(raw.wk_catch)),
        stumpings: 12 * count(raw.wk_stumping),
        run_outs: 8 * count(raw.run_out_solo) + 4 * count(raw.run_out_collab),
        potm: if flag(raw.player_of_match) {
            PLAYER_OF_MATCH_POINTS
        } else {
            0
        },
        playing: PARTICIPATION_POINTS,
    }
}

/// Base points for a raw performance. Total; never fails.
pub fn score(raw: &RawPerformance) -> PointsBreakdown {
    components(raw).breakdown()
}

fn count(value: Option<i32>) -> i32 {
    value.unwrap_or(0)
}

fn flag(value: Option<bool>) -> bool {
    value.unwrap_or(false)
}

/// `numerator / denominator` rounded half-up to two decimals, in hundredths.
/// Rates are compared as integers so boundary equalities are exact.
fn rate_hundredths(numerator: i64, denominator: i64) -> i64 {
    (2 * numerator + denominator).div_euclid(2 * denominator)
}

fn strike_rate_bonus(runs: i32, balls: i32) -> i32 {
    if balls < RATE_BONUS_MIN_BALLS {
        return 0;
    }

    // runs * 100 / balls, kept in hundredths
    let sr = rate_hundredths(runs as i64 * 10_000, balls as i64);
    match sr {
        10_000 => 0,
        sr if sr >= 20_000 => 6,
        sr if sr >= 17_500 => 4,
        sr if sr >= 15_000 => 2,
        sr if sr < 5_000 => -6,
        sr if sr < 7_500 => -4,
        sr if sr < 10_000 => -2,
        _ => 0,
    }
}

fn economy_bonus(runs_conceded: i32, balls: i32) -> i32 {
    if balls < RATE_BONUS_MIN_BALLS {
        return 0;
    }

    // runs / (balls / 6), kept in hundredths
    let eco = rate_hundredths(runs_conceded as i64 * 600, balls as i64);
    match eco {
        700 => 0,
        eco if eco < 500 => 6,
        eco if eco < 600 => 4,
        eco if eco < 700 => 2,
        eco if eco >= 1_200 => -6,
        eco if eco >= 1_100 => -4,
        eco if eco >= 1_000 => -2,
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn batting(runs: i32, balls: i32, not_out: bool) -> RawPerformance {
        RawPerformance {
            bat_runs: Some(runs),
            bat_balls: Some(balls),
            bat_not_out: Some(not_out),
            player_role: Some(PlayerRole::Bat),
            ..RawPerformance::default()
        }
    }

    fn bowling(balls: i32, runs: i32, wickets: i32) -> RawPerformance {
        RawPerformance {
            bowl_balls: Some(balls),
            bowl_runs: Some(runs),
            bowl_wickets: Some(wickets),
            player_role: Some(PlayerRole::Bowl),
            ..RawPerformance::default()
        }
    }

    #[test]
    fn empty_performance_scores_participation_only() {
        let points = score(&RawPerformance::default());
        // Role unknown, zero runs, not marked not-out: duck applies
        assert_eq!(points.batting, -2);
        assert_eq!(points.other, 4);
        assert_eq!(points.total, 2);
    }

    #[test]
    fn fifty_at_exactly_run_a_ball_gets_no_strike_rate_adjustment() {
        let points = score(&batting(50, 50, false));
        assert_eq!(points.batting, 58);
    }

    #[test]
    fn forty_nine_at_just_under_run_a_ball_is_penalised() {
        let points = score(&batting(49, 50, false));
        assert_eq!(points.batting, 47);
    }

    #[test]
    fn economy_of_exactly_seven_is_neutral() {
        let points = score(&bowling(12, 14, 3));
        assert_eq!(points.bowling, 83);
    }

    #[test]
    fn bowlers_are_not_penalised_for_ducks() {
        let raw = RawPerformance {
            bat_runs: Some(0),
            bat_balls: Some(2),
            bat_not_out: Some(false),
            player_role: Some(PlayerRole::Bowl),
            ..RawPerformance::default()
        };
        assert_eq!(score(&raw).batting, 0);
    }

    #[test]
    fn not_out_zero_is_not_a_duck() {
        assert_eq!(score(&batting(0, 1, true)).batting, 0);
    }

    #[test]
    fn century_with_potm_and_catch() {
        let raw = RawPerformance {
            bat_runs: Some(100),
            bat_balls: Some(50),
            bat_not_out: Some(true),
            field_catch: Some(1),
            player_of_match: Some(true),
            player_role: Some(PlayerRole::Bat),
            ..RawPerformance::default()
        };
        let points = score(&raw);
        assert_eq!(points.batting, 130);
        assert_eq!(points.bowling, 0);
        assert_eq!(points.fielding, 8);
        assert_eq!(points.other, 54);
        assert_eq!(points.total, 192);
    }

    #[rstest]
    #[case(9, 2, 0)] // fewer than ten balls: no bonus at all
    #[case(20, 10, 6)] // 200.00
    #[case(35, 20, 4)] // 175.00
    #[case(30, 20, 2)] // 150.00
    #[case(29, 20, 0)] // 145.00
    #[case(101, 100, 0)] // 101.00
    #[case(10, 10, 0)] // exactly 100.00
    #[case(99, 100, -2)] // 99.00
    #[case(74, 100, -4)] // 74.00
    #[case(49, 100, -6)] // 49.00
    #[case(1, 3, 0)] // under ten balls
    fn strike_rate_bands(#[case] runs: i32, #[case] balls: i32, #[case] expected: i32) {
        assert_eq!(strike_rate_bonus(runs, balls), expected);
    }

    #[rstest]
    #[case(12, 9, 6)] // 4.50
    #[case(12, 11, 4)] // 5.50
    #[case(12, 13, 2)] // 6.50
    #[case(12, 14, 0)] // 7.00
    #[case(12, 18, 0)] // 9.00
    #[case(12, 20, -2)] // 10.00
    #[case(12, 22, -4)] // 11.00
    #[case(12, 24, -6)] // 12.00
    #[case(9, 30, 0)] // under ten balls
    fn economy_bands(#[case] balls: i32, #[case] runs: i32, #[case] expected: i32) {
        assert_eq!(economy_bonus(runs, balls), expected);
    }

    #[test]
    fn rounding_to_two_decimals_decides_the_boundary() {
        // 467 runs from 400 balls is an economy of 7.005, rounded up to 7.01
        assert_eq!(rate_hundredths(467 * 600, 400), 701);
        // 1000 runs off 1001 balls is 99.90
        assert_eq!(rate_hundredths(1000 * 10_000, 1001), 9_990);
    }

    #[test]
    fn milestones_and_fielding_stack() {
        let raw = RawPerformance {
            bowl_balls: Some(24),
            bowl_runs: Some(18),
            bowl_wickets: Some(5),
            bowl_maidens: Some(1),
            wk_catch: Some(1),
            wk_stumping: Some(1),
            run_out_solo: Some(1),
            run_out_collab: Some(1),
            player_role: Some(PlayerRole::All),
            bat_not_out: Some(true),
            ..RawPerformance::default()
        };
        let points = score(&raw);
        // wickets, maiden, both milestones, economy of 4.50
        assert_eq!(points.bowling, 125 + 8 + 24 + 6);
        assert_eq!(points.fielding, 8 + 12 + 8 + 4);
        assert_eq!(points.total, points.batting + points.bowling + points.fielding + points.other);
    }
}
