pub use handlers::{decide_trade, list_trades, process_ready_trades, process_trade, propose_trade};
pub use models::{
    DecisionOutcome, FantasyTrade, NewTrade, ProcessReport, TradeDecision, TradeStatus,
};
pub use processor_task::{start_trade_processor, TradeProcessorConfig};
pub use repository::TradeRepository;
pub use service::{swap_players, TradeService};

mod handlers;
pub mod models;
mod processor_task;
pub mod repository;
mod service;
