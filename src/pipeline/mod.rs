//! Per-symbol pipelines and the system that runs them side by side

pub mod symbol;
pub mod system;

pub use symbol::{PipelineHandle, PipelineReport, SharedServices, SymbolPipeline};
pub use system::{TradingSystem, DEMO_OWNER_BALANCE};
