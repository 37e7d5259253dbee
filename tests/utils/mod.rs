pub mod scorecards;
pub mod setup;

// Re-export main utilities for use by test files
#[allow(unused_imports)]
pub use scorecards::ScorecardBuilder;
#[allow(unused_imports)]
pub use setup::{day, TestSetup, TestSetupBuilder};
