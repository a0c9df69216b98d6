//! Confidence-gated two-state trading policy

use rust_decimal::Decimal;

use crate::common::types::{Prediction, TrendClass};
use crate::config::types::PipelineSettings;
use crate::strategy::traits::Strategy;
use crate::strategy::types::{Decision, NoGoReason, StrategyContext};

/// Buy on a confident UP while flat, sell everything on a confident DOWN
/// while holding.
///
/// Rules are applied in order:
/// 1. `confidence < min_confidence` never trades.
/// 2. UP with `P(UP) > min_confidence`, cash available and no position buys.
/// 3. DOWN with `P(DOWN) > min_confidence` and an open position sells.
/// 4. Anything else is a no-op.
#[derive(Debug, Clone)]
pub struct TradingPolicy {
    min_confidence: f64,
    /// Not consulted yet; kept for magnitude gating
    min_change_percent: f64,
}

impl TradingPolicy {
    pub fn new(min_confidence: f64) -> Self {
        Self {
            min_confidence,
            min_change_percent: 1.0,
        }
    }

    pub fn from_settings(settings: &PipelineSettings) -> Self {
        Self {
            min_confidence: settings.min_confidence,
            min_change_percent: settings.min_change_percent,
        }
    }

    pub fn min_confidence(&self) -> f64 {
        self.min_confidence
    }

    pub fn min_change_percent(&self) -> f64 {
        self.min_change_percent
    }
}

impl Default for TradingPolicy {
    fn default() -> Self {
        Self::new(0.65)
    }
}

impl Strategy for TradingPolicy {
    fn name(&self) -> &str {
        "confidence_gate"
    }

    fn evaluate(&self, prediction: &Prediction, ctx: &StrategyContext) -> Decision {
        if prediction.confidence < self.min_confidence {
            return Decision::no_go(NoGoReason::LowConfidence);
        }

        match prediction.trend {
            TrendClass::Up => {
                if prediction.probability(TrendClass::Up) <= self.min_confidence {
                    Decision::no_go(NoGoReason::WeakDirection)
                } else if ctx.has_position() {
                    Decision::no_go(NoGoReason::AlreadyInPosition)
                } else if ctx.cash_balance <= Decimal::ZERO {
                    Decision::no_go(NoGoReason::NoCash)
                } else {
                    Decision::go_buy(format!(
                        "UP with confidence {:.2}",
                        prediction.confidence
                    ))
                }
            }
            TrendClass::Down => {
                if prediction.probability(TrendClass::Down) <= self.min_confidence {
                    Decision::no_go(NoGoReason::WeakDirection)
                } else if !ctx.has_position() {
                    Decision::no_go(NoGoReason::NoPosition)
                } else {
                    Decision::go_sell(format!(
                        "DOWN with confidence {:.2}",
                        prediction.confidence
                    ))
                }
            }
            TrendClass::Neutral => Decision::no_go(NoGoReason::NeutralTrend),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::types::TradeKind;
    use crate::strategy::types::EngineState;
    use rust_decimal_macros::dec;
    use std::collections::HashMap;

    fn prediction(trend: TrendClass, probability: f64) -> Prediction {
        let rest = (1.0 - probability) / 2.0;
        let probabilities = [TrendClass::Neutral, TrendClass::Up, TrendClass::Down]
            .into_iter()
            .map(|c| (c, if c == trend { probability } else { rest }))
            .collect::<HashMap<_, _>>();
        Prediction::from_probabilities(probabilities, dec!(100))
    }

    fn flat() -> StrategyContext {
        StrategyContext::new(dec!(1000), dec!(0), dec!(100))
    }

    fn holding() -> StrategyContext {
        StrategyContext::new(dec!(50), dec!(9.5), dec!(110))
    }

    #[test]
    fn test_confident_up_while_flat_buys() {
        let decision = TradingPolicy::default().evaluate(&prediction(TrendClass::Up, 0.8), &flat());
        assert_eq!(decision.next_state(), EngineState::ExecutingBuy);
        match decision {
            Decision::Go(intent) => assert_eq!(intent.kind, TradeKind::Buy),
            other => panic!("expected buy, got {:?}", other),
        }
    }

    #[test]
    fn test_low_confidence_never_trades() {
        let policy = TradingPolicy::default();
        for trend in [TrendClass::Up, TrendClass::Down, TrendClass::Neutral] {
            for ctx in [flat(), holding()] {
                let mut p = prediction(trend, 0.8);
                p.confidence = 0.5;
                assert_eq!(
                    policy.evaluate(&p, &ctx),
                    Decision::NoGo(NoGoReason::LowConfidence)
                );
            }
        }
    }

    #[test]
    fn test_confidence_equal_to_minimum_passes_gate_but_not_direction() {
        // Exactly 0.65 clears rule 1 (strict less-than) but not rule 2
        // (strict greater-than on the directional probability).
        let decision = TradingPolicy::default().evaluate(&prediction(TrendClass::Up, 0.65), &flat());
        assert_eq!(decision, Decision::NoGo(NoGoReason::WeakDirection));
    }

    #[test]
    fn test_up_while_holding_is_no_action() {
        let decision =
            TradingPolicy::default().evaluate(&prediction(TrendClass::Up, 0.9), &holding());
        assert_eq!(decision, Decision::NoGo(NoGoReason::AlreadyInPosition));
    }

    #[test]
    fn test_up_without_cash_is_no_action() {
        let ctx = StrategyContext::new(dec!(0), dec!(0), dec!(100));
        let decision = TradingPolicy::default().evaluate(&prediction(TrendClass::Up, 0.9), &ctx);
        assert_eq!(decision, Decision::NoGo(NoGoReason::NoCash));
    }

    #[test]
    fn test_confident_down_while_holding_sells() {
        let decision =
            TradingPolicy::default().evaluate(&prediction(TrendClass::Down, 0.7), &holding());
        assert_eq!(decision.next_state(), EngineState::ExecutingSell);
    }

    #[test]
    fn test_down_while_flat_is_no_action() {
        let decision = TradingPolicy::default().evaluate(&prediction(TrendClass::Down, 0.7), &flat());
        assert_eq!(decision, Decision::NoGo(NoGoReason::NoPosition));
    }

    #[test]
    fn test_neutral_is_no_action() {
        let decision =
            TradingPolicy::default().evaluate(&prediction(TrendClass::Neutral, 0.9), &holding());
        assert_eq!(decision, Decision::NoGo(NoGoReason::NeutralTrend));
        assert!(!decision.is_go());
    }

    #[test]
    fn test_custom_threshold() {
        let policy = TradingPolicy::new(0.75);
        let decision = policy.evaluate(&prediction(TrendClass::Up, 0.7), &flat());
        assert_eq!(decision, Decision::NoGo(NoGoReason::LowConfidence));
    }
}
