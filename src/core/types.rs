// Common types shared by the ladder, the watchers and the gateways

use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::TradingError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Buy => "buy",
            Side::Sell => "sell",
        }
    }

    pub fn opposite(&self) -> Side {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Buy => write!(f, "Buy"),
            Side::Sell => write!(f, "Sell"),
        }
    }
}

impl FromStr for Side {
    type Err = TradingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "buy" | "bid" => Ok(Side::Buy),
            "sell" | "ask" => Ok(Side::Sell),
            other => Err(TradingError::InvalidOrderSide(other.to_string())),
        }
    }
}

/// One rung of the ladder, derived from the reference price
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridLevel {
    pub index: i64,
    pub price: Decimal,
    pub size: Decimal,
}

/// An order the ladder placed and still believes is resting
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackedOrder {
    pub index: i64,
    pub exchange_order_id: String,
    pub side: Side,
    pub price: Decimal,
    pub size: Decimal,
}

/// An order as reported by the venue's open-order list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenOrder {
    pub id: String,
    pub side: Side,
    pub price: Decimal,
    #[serde(alias = "amount")]
    pub size: Decimal,
}

impl OpenOrder {
    /// Venues report already-closed orders with a marker prefix on the id
    pub fn is_inactive(&self, inactive_prefix: &str) -> bool {
        !inactive_prefix.is_empty() && self.id.starts_with(inactive_prefix)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Balances {
    pub base: Decimal,
    pub quote: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ticker {
    pub last: Decimal,
    pub bid: Decimal,
    pub ask: Decimal,
}

/// Balances and open orders fetched together once per reconciliation pass
#[derive(Debug, Clone, Default)]
pub struct TradeData {
    pub balances: Balances,
    pub orders: Vec<OpenOrder>,
}
