// Ladder level pricing and sizing

use std::collections::HashMap;

use rust_decimal::{Decimal, RoundingStrategy};

use crate::config::GridConfig;
use crate::core::types::GridLevel;
use crate::error::{TradingError, TradingResult};

/// Maps a ladder index to its price and order size.
///
/// `price(i) = round(reference × (1 + growth_rate)^i, decimal_places)`
/// `size(i)  = (order_size × reference / price(i) + order_size) / 2`
///
/// Both are memoized per index: once computed for a reference price, an index
/// always yields the same level, so order sizes stay stable across cycles.
/// A level whose price rounds to zero has no size.
#[derive(Debug, Clone)]
pub struct GridCalculator {
    reference_price: Decimal,
    growth_rate: Decimal,
    order_size: Decimal,
    decimal_places: u32,
    size_decimal_places: u32,
    prices: HashMap<i64, Decimal>,
    sizes: HashMap<i64, Decimal>,
}

impl GridCalculator {
    pub fn new(reference_price: Decimal, config: &GridConfig) -> Self {
        Self {
            reference_price,
            growth_rate: config.growth_rate,
            order_size: config.order_size,
            decimal_places: config.decimal_places,
            size_decimal_places: config.size_decimal_places,
            prices: HashMap::new(),
            sizes: HashMap::new(),
        }
    }

    pub fn reference_price(&self) -> Decimal {
        self.reference_price
    }

    pub fn price(&mut self, index: i64) -> Decimal {
        if let Some(price) = self.prices.get(&index) {
            return *price;
        }

        let step = Decimal::ONE + self.growth_rate;
        let mut factor = Decimal::ONE;
        for _ in 0..index.unsigned_abs() {
            factor *= step;
        }

        let raw = if index >= 0 {
            self.reference_price * factor
        } else {
            self.reference_price / factor
        };
        let price = raw
            .round_dp_with_strategy(self.decimal_places, RoundingStrategy::MidpointAwayFromZero)
            .normalize();

        self.prices.insert(index, price);
        price
    }

    pub fn size(&mut self, index: i64) -> TradingResult<Decimal> {
        if let Some(size) = self.sizes.get(&index) {
            return Ok(*size);
        }

        let price = self.price(index);
        let ratio = self.reference_price.checked_div(price).ok_or_else(|| {
            TradingError::SanityCheckFailed(format!(
                "level {} has price {} at {} decimal places",
                index, price, self.decimal_places
            ))
        })?;
        let size = ((self.order_size * ratio + self.order_size) / Decimal::TWO)
            .round_dp_with_strategy(self.size_decimal_places, RoundingStrategy::MidpointAwayFromZero)
            .normalize();

        self.sizes.insert(index, size);
        Ok(size)
    }

    pub fn level(&mut self, index: i64) -> TradingResult<GridLevel> {
        Ok(GridLevel {
            index,
            price: self.price(index),
            size: self.size(index)?,
        })
    }

    /// Number of memoized levels
    pub fn cached_levels(&self) -> usize {
        self.prices.len()
    }
}
