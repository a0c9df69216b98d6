//! Decision engine
//!
//! Merges a symbol's price and prediction streams. Prices only update the
//! latest known price; each prediction runs one evaluation of the
//! [`Strategy`](crate::strategy::Strategy) against the portfolio while the ledger's write guard is held,
//! so the precondition check and the mutation cannot interleave with
//! anything else. The stored entry buy is looked up before the guard is
//! taken; persistence, audit and presentation happen after it is released.

use chrono::Utc;
use rust_decimal::Decimal;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::audit::dispatcher::AuditDispatcher;
use crate::common::channels::{EventBus, PriceRelay, RelayReceiver};
use crate::common::traits::SharedTradeStore;
use crate::common::types::{PipelineEvent, Prediction, PriceTick, Trade, TradeKind};
use crate::strategy::journal::TradeJournal;
use crate::strategy::ledger::{Portfolio, PortfolioLedger};
use crate::strategy::sizing::{BoxedSizeCalculator, SizedOrder};
use crate::strategy::traits::BoxedStrategy;
use crate::strategy::types::{Decision, EngineState, NoGoReason, StrategyContext};

/// Decision engine for one symbol
pub struct DecisionEngine {
    symbol: String,
    strategy: BoxedStrategy,
    sizer: BoxedSizeCalculator,
    ledger: Arc<PortfolioLedger>,
    journal: Arc<TradeJournal>,
    store: SharedTradeStore,
    auditor: AuditDispatcher,
    events: Option<EventBus>,
    quotes: Option<PriceRelay>,
    current_price: Option<Decimal>,
}

impl DecisionEngine {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        symbol: impl Into<String>,
        strategy: BoxedStrategy,
        sizer: BoxedSizeCalculator,
        ledger: Arc<PortfolioLedger>,
        journal: Arc<TradeJournal>,
        store: SharedTradeStore,
        auditor: AuditDispatcher,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            strategy,
            sizer,
            ledger,
            journal,
            store,
            auditor,
            events: None,
            quotes: None,
            current_price: None,
        }
    }

    /// Push trades to the presentation fan-in
    pub fn with_events(mut self, events: EventBus) -> Self {
        self.events = Some(events);
        self
    }

    /// Forward observed prices to the shared quote bus
    pub fn with_quotes(mut self, quotes: PriceRelay) -> Self {
        self.quotes = Some(quotes);
        self
    }

    pub fn current_price(&self) -> Option<Decimal> {
        self.current_price
    }

    /// Record the latest observed price
    pub fn on_price(&mut self, tick: PriceTick) {
        self.current_price = Some(tick.price);
        if let Some(quotes) = &self.quotes {
            quotes.offer(tick);
        }
    }

    /// Evaluate a prediction and execute the resulting trade, if any.
    ///
    /// Predictions arriving before any price are discarded.
    pub async fn on_prediction(&mut self, prediction: &Prediction) -> Option<Trade> {
        let Some(price) = self.current_price else {
            debug!(symbol = %self.symbol, "No price observed yet, prediction discarded");
            return None;
        };

        let stored_entry = self.stored_entry().await;

        let trade = {
            let mut portfolio = self.ledger.write().await;
            debug!(symbol = %self.symbol, state = %EngineState::Evaluating, trend = %prediction.trend, "Prediction received");

            let ctx = StrategyContext::new(
                portfolio.cash_balance(),
                portfolio.position_quantity(),
                price,
            );
            let decision = self.strategy.evaluate(prediction, &ctx);
            let next_state = decision.next_state();
            let order = match &decision {
                Decision::NoGo(_) => None,
                Decision::Go(intent) => match intent.kind {
                    TradeKind::Buy => self.sizer.size_buy(ctx.cash_balance, price),
                    TradeKind::Sell => self.sizer.size_sell(ctx.position_quantity, price),
                },
            };

            match (decision, order) {
                (Decision::NoGo(reason), _) => {
                    debug!(
                        symbol = %self.symbol,
                        state = %next_state,
                        confidence = prediction.confidence,
                        "No trade: {}",
                        reason
                    );
                    return None;
                }
                (Decision::Go(_), None) => {
                    debug!(
                        symbol = %self.symbol,
                        state = %EngineState::NoAction,
                        "No trade: {}",
                        NoGoReason::ZeroQuantity
                    );
                    return None;
                }
                (Decision::Go(intent), Some(order)) => {
                    debug!(symbol = %self.symbol, state = %next_state, "{}", intent.reason);
                    self.execute(&mut portfolio, order, prediction, stored_entry.as_ref())
                }
            }
        };

        self.settle(trade.clone()).await;
        debug!(symbol = %self.symbol, state = %EngineState::Idle, "Trade settled");
        Some(trade)
    }

    /// Apply a sized order to the guarded portfolio
    fn execute(
        &self,
        portfolio: &mut Portfolio,
        order: SizedOrder,
        prediction: &Prediction,
        stored_entry: Option<&Trade>,
    ) -> Trade {
        let executed_at = Utc::now();
        let realized_profit = match order.kind {
            TradeKind::Buy => {
                portfolio.apply_buy(&order, executed_at);
                Decimal::ZERO
            }
            TradeKind::Sell => {
                let cost_basis = self.cost_basis(portfolio, stored_entry, order.price);
                let profit = (order.price - cost_basis) * order.quantity;
                portfolio.apply_sell(&order, profit, executed_at);
                profit
            }
        };

        let trade = Trade {
            id: None,
            owner_id: portfolio.owner_id(),
            symbol: self.symbol.clone(),
            kind: order.kind,
            price: order.price,
            quantity: order.quantity,
            realized_profit,
            audit_hash: None,
            executed_at,
            prediction_confidence: prediction.confidence,
        };

        info!(
            symbol = %self.symbol,
            kind = %trade.kind,
            price = %trade.price,
            quantity = %trade.quantity,
            realized_profit = %trade.realized_profit,
            cash = %portfolio.cash_balance(),
            position = %portfolio.position_quantity(),
            "Trade executed"
        );
        trade
    }

    /// Latest stored buy while a persisted position is open. Runs without
    /// the ledger guard so a slow store never blocks snapshot readers.
    async fn stored_entry(&self) -> Option<Trade> {
        let (owner_id, _) = self.ledger.open_entry().await?;
        match self
            .store
            .last_trade_of_kind(owner_id, &self.symbol, TradeKind::Buy)
            .await
        {
            Ok(buy) => buy,
            Err(e) => {
                warn!(symbol = %self.symbol, "Stored entry lookup failed: {}", e);
                None
            }
        }
    }

    /// Price of the buy that opened the current position.
    ///
    /// The store's latest buy is used when it is the one this ledger
    /// recorded; otherwise the in-memory entry price is authoritative.
    fn cost_basis(
        &self,
        portfolio: &Portfolio,
        stored_entry: Option<&Trade>,
        sell_price: Decimal,
    ) -> Decimal {
        let entry_price = portfolio.entry_price();

        if let Some(entry_id) = portfolio.entry_trade_id() {
            match stored_entry {
                Some(buy) if buy.id == Some(entry_id) => return buy.price,
                _ => warn!(
                    symbol = %self.symbol,
                    "Stored last buy does not match open position, using entry price"
                ),
            }
        }

        entry_price.unwrap_or_else(|| {
            error!(symbol = %self.symbol, "Open position without entry price, profit set to zero");
            sell_price
        })
    }

    /// Persist, journal, audit and publish an executed trade
    async fn settle(&self, mut trade: Trade) {
        match self.store.save_trade(&trade).await {
            Ok(id) => {
                trade.id = Some(id);
                if trade.kind == TradeKind::Buy {
                    self.ledger.set_entry_trade_id(trade.executed_at, id).await;
                }
            }
            Err(e) => {
                warn!(
                    symbol = %self.symbol,
                    kind = %trade.kind,
                    divergence = true,
                    "Trade not persisted, in-memory portfolio stays authoritative: {}",
                    e
                );
            }
        }

        self.journal.push(trade.clone()).await;
        self.auditor.dispatch(trade.clone());

        if let Some(events) = &self.events {
            events.offer(PipelineEvent::Trade(trade));
        }
    }

    /// Consume prices and predictions until shutdown or until both inputs
    /// close. Returns the number of trades executed.
    pub async fn run(
        mut self,
        mut prices: RelayReceiver<PriceTick>,
        mut predictions: RelayReceiver<Prediction>,
        mut shutdown: watch::Receiver<bool>,
    ) -> u64 {
        let mut trades = 0;
        let mut prices_open = true;
        let mut predictions_open = true;

        info!(symbol = %self.symbol, strategy = self.strategy.name(), "Decision engine started");

        while prices_open || predictions_open {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
                tick = prices.recv(), if prices_open => match tick {
                    Some(tick) => self.on_price(tick),
                    None => prices_open = false,
                },
                prediction = predictions.recv(), if predictions_open => match prediction {
                    Some(prediction) => {
                        if self.on_prediction(&prediction).await.is_some() {
                            trades += 1;
                        }
                    }
                    None => predictions_open = false,
                },
            }
        }

        if prices.dropped() > 0 || predictions.dropped() > 0 {
            info!(
                symbol = %self.symbol,
                dropped_prices = prices.dropped(),
                dropped_predictions = predictions.dropped(),
                "Engine skipped stale items"
            );
        }
        info!(symbol = %self.symbol, trades, "Decision engine stopped");
        trades
    }
}
