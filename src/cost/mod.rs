//! Cost estimation and spend aggregation for metered API calls.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

mod estimator;
mod ledger;
pub mod pricing;

pub use estimator::{
    approximate_tokens, CostEstimator, TokenCountError, TokenCounter, UsageReport,
    APPROX_CHARS_PER_TOKEN,
};
pub use ledger::{DailyLedger, GlobalDailyLedger, LedgerError};
pub use pricing::{ModelPricing, PricingTable, PricingTableBuilder};

/// Scale factor for storing Decimal costs as AtomicU64 (6 decimal places precision).
pub(crate) const COST_SCALE_FACTOR: Decimal = dec!(1_000_000);
