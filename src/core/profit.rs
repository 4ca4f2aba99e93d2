// Session profit tracking and the append-only profit log

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::config::GridConfig;
use crate::core::types::Balances;
use crate::error::{TradingError, TradingResult};

/// Balances and price captured once when the ladder is built
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionBaseline {
    pub start_time: DateTime<Utc>,
    pub start_price: Decimal,
    pub start_base_balance: Decimal,
    pub start_quote_balance: Decimal,
}

impl SessionBaseline {
    pub fn new(start_price: Decimal, balances: Balances) -> Self {
        Self {
            start_time: Utc::now(),
            start_price,
            start_base_balance: balances.base,
            start_quote_balance: balances.quote,
        }
    }

    /// Profit relative to this baseline given the current balances
    pub fn report(&self, balances: Balances, trade_price: Decimal) -> ProfitReport {
        self.report_at(balances, trade_price, Utc::now())
    }

    pub fn report_at(&self, balances: Balances, trade_price: Decimal, now: DateTime<Utc>) -> ProfitReport {
        let base_profit = balances.base - self.start_base_balance;
        let quote_profit = balances.quote - self.start_quote_balance;
        let elapsed = now.signed_duration_since(self.start_time);

        ProfitReport {
            base_profit,
            quote_profit,
            implied_price: quote_profit.abs().checked_div(base_profit.abs()),
            trade_price,
            elapsed_secs: elapsed.num_milliseconds().max(0) as f64 / 1000.0,
        }
    }
}

/// Cumulative profit at the time of a fill.
///
/// `implied_price` is `|quote_profit| / |base_profit|` and is `None` while the
/// base balance is unchanged. It is informational only.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProfitReport {
    pub base_profit: Decimal,
    pub quote_profit: Decimal,
    pub implied_price: Option<Decimal>,
    pub trade_price: Decimal,
    pub elapsed_secs: f64,
}

impl ProfitReport {
    pub fn implied_price_display(&self) -> String {
        match self.implied_price {
            Some(price) => price.round_dp(8).normalize().to_string(),
            None => "NaN".to_string(),
        }
    }

    pub fn to_csv_record(&self) -> String {
        format!(
            "{},{},{},{:.3}",
            self.base_profit.normalize(),
            self.quote_profit.normalize(),
            self.trade_price.normalize(),
            self.elapsed_secs
        )
    }
}

/// Append-only CSV of profit records, one header block per run
#[derive(Debug, Clone)]
pub struct ProfitLog {
    path: PathBuf,
}

impl ProfitLog {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn write_run_header(&self, grid: &GridConfig) -> TradingResult<()> {
        let header = format!(
            "\n\n\nNew run {}\nORDER_PAIRS,ORDER_SIZE,INTERVAL\n{},{},{}\nbase_profit,quote_profit,last_trade_price,time\n",
            Utc::now().format("%Y-%m-%d %H:%M:%S UTC"),
            grid.order_pairs,
            grid.order_size.normalize(),
            grid.growth_rate.normalize()
        );
        self.write(&header)
    }

    pub fn append(&self, report: &ProfitReport) -> TradingResult<()> {
        self.write(&format!("{}\n", report.to_csv_record()))
    }

    fn write(&self, text: &str) -> TradingResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| {
                    TradingError::FileWrite(format!("{}: {}", parent.display(), e))
                })?;
            }
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| TradingError::FileWrite(format!("{}: {}", self.path.display(), e)))?;

        file.write_all(text.as_bytes())
            .map_err(|e| TradingError::FileWrite(format!("{}: {}", self.path.display(), e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use rust_decimal_macros::dec;

    fn baseline() -> SessionBaseline {
        SessionBaseline::new(dec!(100), Balances { base: dec!(2), quote: dec!(500) })
    }

    #[test]
    fn test_report_profit_and_implied_price() {
        let baseline = baseline();
        let later = baseline.start_time + Duration::seconds(90);
        let report = baseline.report_at(
            Balances { base: dec!(1.5), quote: dec!(551) },
            dec!(102),
            later,
        );

        assert_eq!(report.base_profit, dec!(-0.5));
        assert_eq!(report.quote_profit, dec!(51));
        assert_eq!(report.implied_price, Some(dec!(102)));
        assert_eq!(report.elapsed_secs, 90.0);
        assert_eq!(report.to_csv_record(), "-0.5,51,102,90.000");
    }

    #[test]
    fn test_implied_price_undefined_without_base_change() {
        let baseline = baseline();
        let report = baseline.report(Balances { base: dec!(2), quote: dec!(503) }, dec!(101));
        assert_eq!(report.implied_price, None);
        assert_eq!(report.implied_price_display(), "NaN");
    }
}
