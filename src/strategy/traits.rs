use crate::common::types::Prediction;
use crate::strategy::types::{Decision, StrategyContext};

/// Core strategy trait
///
/// Strategies turn a prediction into a Go/NoGo decision given the current
/// account state. They must not perform I/O: the engine calls them inside
/// the portfolio's critical section.
///
/// # Example
///
/// ```ignore
/// struct AlwaysFlat;
///
/// impl Strategy for AlwaysFlat {
///     fn name(&self) -> &str { "always_flat" }
///
///     fn evaluate(&self, _prediction: &Prediction, ctx: &StrategyContext) -> Decision {
///         if ctx.has_position() {
///             Decision::go_sell("flatten")
///         } else {
///             Decision::no_go(NoGoReason::NoPosition)
///         }
///     }
/// }
/// ```
pub trait Strategy: Send + Sync {
    /// Unique identifier for this strategy
    fn name(&self) -> &str;

    /// Decide what to do with a freshly arrived prediction
    fn evaluate(&self, prediction: &Prediction, ctx: &StrategyContext) -> Decision;
}

/// Boxed strategy for dynamic dispatch
pub type BoxedStrategy = Box<dyn Strategy>;
