//! RSI momentum heuristic standing in for a trained trend model

use async_trait::async_trait;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::time::Instant;
use tracing::debug;

use crate::common::errors::{PipelineError, Result};
use crate::common::traits::Predictor;
use crate::common::types::{Prediction, TrendClass};

/// RSI above which the short and long windows signal an overbought market
const OVERBOUGHT_LONG: f64 = 70.0;
const OVERBOUGHT_SHORT: f64 = 75.0;
/// RSI below which the short and long windows signal an oversold market
const OVERSOLD_LONG: f64 = 30.0;
const OVERSOLD_SHORT: f64 = 25.0;

/// Classifies a window by comparing RSI(14) and RSI(7) against fixed bands.
///
/// Overbought maps to DOWN (expected correction), oversold to UP (expected
/// rebound), anything else to NEUTRAL.
#[derive(Debug, Clone)]
pub struct MomentumPredictor {
    sequence_length: usize,
    long_period: usize,
    short_period: usize,
}

impl MomentumPredictor {
    pub fn new(sequence_length: usize) -> Self {
        Self {
            sequence_length,
            long_period: 14,
            short_period: 7,
        }
    }

    /// Classify a window of prices without the length check
    pub fn classify(&self, prices: &[f64]) -> HashMap<TrendClass, f64> {
        let rsi_long = rsi(prices, self.long_period);
        let rsi_short = rsi(prices, self.short_period);
        debug!(rsi_long, rsi_short, "Momentum indicators");

        let (neutral, up, down) = if rsi_long > OVERBOUGHT_LONG && rsi_short > OVERBOUGHT_SHORT {
            (0.2, 0.1, 0.7)
        } else if rsi_long < OVERSOLD_LONG && rsi_short < OVERSOLD_SHORT {
            (0.2, 0.7, 0.1)
        } else {
            (0.6, 0.2, 0.2)
        };

        HashMap::from([
            (TrendClass::Neutral, neutral),
            (TrendClass::Up, up),
            (TrendClass::Down, down),
        ])
    }
}

#[async_trait]
impl Predictor for MomentumPredictor {
    async fn predict(&self, symbol: &str, window: &[Decimal]) -> Result<Prediction> {
        if window.len() < self.sequence_length || window.is_empty() {
            return Err(PipelineError::InsufficientData {
                available: window.len(),
                required: self.sequence_length,
            });
        }

        let started = Instant::now();
        let recent = &window[window.len() - self.sequence_length..];
        let prices: Vec<f64> = recent
            .iter()
            .map(|p| {
                p.to_f64().ok_or_else(|| {
                    PipelineError::Predictor(format!("{}: price {} out of range", symbol, p))
                })
            })
            .collect::<Result<_>>()?;

        let probabilities = self.classify(&prices);
        let last_price = recent[recent.len() - 1];
        let latency_ms = started.elapsed().as_secs_f64() * 1000.0;

        Ok(Prediction::from_probabilities(probabilities, last_price).with_latency_ms(latency_ms))
    }

    fn sequence_length(&self) -> usize {
        self.sequence_length
    }

    fn name(&self) -> &str {
        "momentum-rsi"
    }
}

/// Simple-average relative strength index over the last `period` changes.
///
/// Returns 50 when fewer than `period + 1` prices are available and 100 when
/// the window has no losses.
pub fn rsi(prices: &[f64], period: usize) -> f64 {
    if period == 0 || prices.len() < period + 1 {
        return 50.0;
    }

    let (gains, losses) = prices[prices.len() - period - 1..]
        .windows(2)
        .map(|pair| pair[1] - pair[0])
        .fold((0.0, 0.0), |(gains, losses), change| {
            if change > 0.0 {
                (gains + change, losses)
            } else {
                (gains, losses - change)
            }
        });

    let avg_gain = gains / period as f64;
    let avg_loss = losses / period as f64;
    if avg_loss == 0.0 {
        return 100.0;
    }

    let rs = avg_gain / avg_loss;
    100.0 - 100.0 / (1.0 + rs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn ramp(start: f64, step: f64, n: usize) -> Vec<Decimal> {
        (0..n)
            .map(|i| Decimal::try_from(start + step * i as f64).unwrap())
            .collect()
    }

    #[test]
    fn test_rsi_bounds() {
        assert_eq!(rsi(&[1.0, 2.0], 14), 50.0);
        assert_eq!(rsi(&[1.0, 2.0, 3.0, 4.0], 3), 100.0);
        assert_eq!(rsi(&[4.0, 3.0, 2.0, 1.0], 3), 0.0);
        let mixed = rsi(&[10.0, 11.0, 10.0, 11.0, 10.0], 4);
        assert!((mixed - 50.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_rising_window_predicts_down() {
        let predictor = MomentumPredictor::new(20);
        let prediction = predictor
            .predict("btcusdt", &ramp(100.0, 1.0, 20))
            .await
            .unwrap();

        assert_eq!(prediction.trend, TrendClass::Down);
        assert_eq!(prediction.confidence, 0.7);
        assert_eq!(prediction.price_at_prediction, dec!(119));
    }

    #[tokio::test]
    async fn test_falling_window_predicts_up() {
        let predictor = MomentumPredictor::new(20);
        let prediction = predictor
            .predict("btcusdt", &ramp(200.0, -1.0, 20))
            .await
            .unwrap();

        assert_eq!(prediction.trend, TrendClass::Up);
        assert_eq!(prediction.class_id, 1);
        assert_eq!(prediction.probability(TrendClass::Up), 0.7);
    }

    #[tokio::test]
    async fn test_choppy_window_is_neutral() {
        let predictor = MomentumPredictor::new(20);
        let window: Vec<Decimal> = (0..20)
            .map(|i| if i % 2 == 0 { dec!(100) } else { dec!(101) })
            .collect();
        let prediction = predictor.predict("btcusdt", &window).await.unwrap();

        assert_eq!(prediction.trend, TrendClass::Neutral);
        assert_eq!(prediction.confidence, 0.6);
    }

    #[tokio::test]
    async fn test_short_window_is_insufficient() {
        let predictor = MomentumPredictor::new(60);
        let result = predictor.predict("btcusdt", &ramp(1.0, 1.0, 59)).await;
        assert!(matches!(
            result,
            Err(PipelineError::InsufficientData {
                available: 59,
                required: 60
            })
        ));
    }
}
