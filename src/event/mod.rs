// League-scoped event infrastructure
//
// Units of work publish facts here after they commit; read-side components
// (the stats cache) subscribe instead of being called from write paths.

pub use bus::EventBus;
pub use events::{LeagueEnvelope, LeagueEvent};
pub use handler::{LeagueEventError, LeagueEventHandler};
pub use subscription::EventSubscription;

mod bus;
mod events;
mod handler;
mod subscription;
