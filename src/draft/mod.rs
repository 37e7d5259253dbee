// Pre-season and mid-season snake drafts, draft windows and retention

pub use handlers::{
    compile_pool, create_window, execute_window, run_preseason_draft, set_team_remaining,
    submit_preferences,
};
pub use models::{
    DraftCommit, DraftPick, DraftResultPayload, DraftWindow, DraftWindowLeagueRun,
    DraftWindowTeamEligibility, RetentionMode, SquadDraftOutcome, StandingSnapshot, WindowKind,
};
pub use preseason::{PreSeasonDraftOptions, PreSeasonDraftResult, PreSeasonDraftService};
pub use repository::DraftRepository;
pub use retention::{resolve_retention_phase, RetentionResolver};
pub use snake::{round_order, SnakeDraft, SnakePass, ROLE_PASSES};
pub use window::{DraftWindowService, ExecuteOptions};

mod handlers;
pub mod midseason;
pub mod models;
pub mod preferences;
mod preseason;
pub mod repository;
mod retention;
pub mod snake;
mod window;
