use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};
use std::collections::HashMap;
use std::sync::{Mutex, RwLock};
use tokio::sync::RwLock as AsyncRwLock;
use tracing::debug;

use crate::scoring::Scorecard;
use crate::shared::{AppError, SquadId};

/// Source of the current time for draft-window bounds and run timestamps
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock frozen at a settable instant
pub struct FixedClock {
    now: RwLock<DateTime<Utc>>,
}

impl FixedClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: RwLock::new(now),
        }
    }

    pub fn set(&self, now: DateTime<Utc>) {
        let mut guard = self.now.write().unwrap_or_else(|e| e.into_inner());
        *guard = now;
    }

    pub fn advance(&self, by: Duration) {
        let mut guard = self.now.write().unwrap_or_else(|e| e.into_inner());
        *guard += by;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.read().unwrap_or_else(|e| e.into_inner())
    }
}

/// Randomness used only to generate a pre-season snake seed order
pub trait RandomSource: Send + Sync {
    fn shuffle_squads(&self, squads: &mut [SquadId]);
}

pub struct ThreadRandomSource;

impl RandomSource for ThreadRandomSource {
    fn shuffle_squads(&self, squads: &mut [SquadId]) {
        squads.shuffle(&mut rand::rng());
    }
}

/// Deterministic random source for reproducible drafts
pub struct SeededRandomSource {
    rng: Mutex<StdRng>,
}

impl SeededRandomSource {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl RandomSource for SeededRandomSource {
    fn shuffle_squads(&self, squads: &mut [SquadId]) {
        let mut rng = self.rng.lock().unwrap_or_else(|e| e.into_inner());
        squads.shuffle(&mut *rng);
    }
}

/// Upstream source of raw match scorecards
#[async_trait]
pub trait ScorecardProvider: Send + Sync {
    async fn fetch(&self, external_match_id: &str) -> Result<Scorecard, AppError>;
}

/// Scorecards held in memory, keyed by external match id.
/// Backs tests and replays of previously captured scorecards.
#[derive(Default)]
pub struct InMemoryScorecardProvider {
    scorecards: AsyncRwLock<HashMap<String, Scorecard>>,
}

impl InMemoryScorecardProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, scorecard: Scorecard) {
        let mut guard = self.scorecards.write().await;
        guard.insert(scorecard.external_match_id.clone(), scorecard);
    }
}

#[async_trait]
impl ScorecardProvider for InMemoryScorecardProvider {
    async fn fetch(&self, external_match_id: &str) -> Result<Scorecard, AppError> {
        let guard = self.scorecards.read().await;
        let scorecard = guard.get(external_match_id).cloned();
        debug!(external_match_id, found = scorecard.is_some(), "Scorecard lookup");
        scorecard.ok_or_else(|| {
            AppError::Provider(format!("No scorecard available for {}", external_match_id))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn seeded_source_is_reproducible() {
        let mut first = vec![1, 2, 3, 4, 5, 6, 7, 8];
        let mut second = first.clone();

        SeededRandomSource::new(42).shuffle_squads(&mut first);
        SeededRandomSource::new(42).shuffle_squads(&mut second);

        assert_eq!(first, second);
        let mut sorted = first.clone();
        sorted.sort();
        assert_eq!(sorted, vec![1, 2, 3, 4, 5, 6, 7, 8]);
    }

    #[test]
    fn fixed_clock_moves_only_when_told() {
        let start = Utc.with_ymd_and_hms(2024, 4, 1, 12, 0, 0).unwrap();
        let clock = FixedClock::new(start);
        assert_eq!(clock.now(), start);

        clock.advance(Duration::hours(2));
        assert_eq!(clock.now(), start + Duration::hours(2));
    }

    #[tokio::test]
    async fn missing_scorecard_is_a_provider_error() {
        let provider = InMemoryScorecardProvider::new();
        let result = provider.fetch("ipl-2024-01").await;
        assert!(matches!(result, Err(AppError::Provider(_))));
    }
}
