use rust_decimal::Decimal;

use crate::common::types::TradeKind;

/// Order sized for execution at a known price
#[derive(Debug, Clone, PartialEq)]
pub struct SizedOrder {
    pub kind: TradeKind,
    pub price: Decimal,
    pub quantity: Decimal,
    /// Cash moved by the order (`price * quantity` for sells, the invested
    /// amount for buys)
    pub notional: Decimal,
}

impl SizedOrder {
    pub fn is_valid(&self) -> bool {
        self.quantity > Decimal::ZERO && self.price > Decimal::ZERO
    }
}

/// SizeCalculator trait
///
/// Converts a Go decision into a concrete quantity. Called inside the
/// portfolio critical section, so implementations must be pure.
pub trait SizeCalculator: Send + Sync {
    /// Size a buy given the available cash
    fn size_buy(&self, cash_balance: Decimal, price: Decimal) -> Option<SizedOrder>;

    /// Size a sell given the open position
    fn size_sell(&self, position_quantity: Decimal, price: Decimal) -> Option<SizedOrder>;
}

/// Invests a fixed fraction of cash on every buy and liquidates the whole
/// position on every sell
#[derive(Debug, Clone)]
pub struct FractionalSizer {
    buy_fraction: Decimal,
}

impl FractionalSizer {
    pub fn new(buy_fraction: Decimal) -> Self {
        Self { buy_fraction }
    }

    pub fn buy_fraction(&self) -> Decimal {
        self.buy_fraction
    }
}

impl Default for FractionalSizer {
    fn default() -> Self {
        Self::new(Decimal::new(95, 2))
    }
}

impl SizeCalculator for FractionalSizer {
    fn size_buy(&self, cash_balance: Decimal, price: Decimal) -> Option<SizedOrder> {
        if price <= Decimal::ZERO || cash_balance <= Decimal::ZERO {
            return None;
        }
        let invested = cash_balance * self.buy_fraction;
        let order = SizedOrder {
            kind: TradeKind::Buy,
            price,
            quantity: invested / price,
            notional: invested,
        };
        order.is_valid().then_some(order)
    }

    fn size_sell(&self, position_quantity: Decimal, price: Decimal) -> Option<SizedOrder> {
        let order = SizedOrder {
            kind: TradeKind::Sell,
            price,
            quantity: position_quantity,
            notional: position_quantity * price,
        };
        order.is_valid().then_some(order)
    }
}

/// Boxed size calculator for dynamic dispatch
pub type BoxedSizeCalculator = Box<dyn SizeCalculator>;

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_buy_invests_fraction_of_cash() {
        let order = FractionalSizer::default().size_buy(dec!(1000), dec!(100)).unwrap();
        assert_eq!(order.notional, dec!(950));
        assert_eq!(order.quantity, dec!(9.5));
    }

    #[test]
    fn test_sell_liquidates_everything() {
        let order = FractionalSizer::default().size_sell(dec!(9.5), dec!(110)).unwrap();
        assert_eq!(order.quantity, dec!(9.5));
        assert_eq!(order.notional, dec!(1045));
    }

    #[test]
    fn test_empty_orders_rejected() {
        let sizer = FractionalSizer::new(dec!(0.5));
        assert!(sizer.size_buy(dec!(0), dec!(100)).is_none());
        assert!(sizer.size_buy(dec!(100), dec!(0)).is_none());
        assert!(sizer.size_sell(dec!(0), dec!(100)).is_none());
    }
}
