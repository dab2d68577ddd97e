//! Token and cost estimation with graceful degradation.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use super::{DailyLedger, PricingTable};

/// Heuristic: roughly four English characters per token.
pub const APPROX_CHARS_PER_TOKEN: usize = 4;

/// Character-based token estimate, used whenever no tokenizer is available.
/// Deterministic and side-effect-free.
pub fn approximate_tokens(text: &str) -> usize {
    text.chars().count() / APPROX_CHARS_PER_TOKEN
}

/// Token counting failed; the estimator falls back to [`approximate_tokens`].
#[derive(Debug, Error)]
#[error("token counting unavailable: {reason}")]
pub struct TokenCountError {
    pub reason: String,
}

impl TokenCountError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// External tokenizer lookup keyed by model identifier.
///
/// Implementations may fail (unknown model family, tokenizer data missing);
/// the estimator recovers locally and never surfaces the error.
pub trait TokenCounter: Send + Sync {
    fn count_tokens(&self, model: &str, text: &str) -> Result<usize, TokenCountError>;
}

/// Actual token usage reported back after a generation call completes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageReport {
    pub input_tokens: u64,
    pub output_tokens: u64,
}

impl UsageReport {
    pub fn new(input_tokens: u64, output_tokens: u64) -> Self {
        Self {
            input_tokens,
            output_tokens,
        }
    }

    pub fn total(&self) -> u64 {
        self.input_tokens.saturating_add(self.output_tokens)
    }
}

/// Converts token counts into money and aggregates spend into the shared
/// daily ledger.
pub struct CostEstimator {
    pricing: PricingTable,
    counter: Option<Arc<dyn TokenCounter>>,
    daily_ledger: Arc<dyn DailyLedger>,
}

impl std::fmt::Debug for CostEstimator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CostEstimator")
            .field("pricing", &self.pricing)
            .field("has_token_counter", &self.counter.is_some())
            .finish_non_exhaustive()
    }
}

impl CostEstimator {
    pub fn new(pricing: PricingTable, daily_ledger: Arc<dyn DailyLedger>) -> Self {
        Self {
            pricing,
            counter: None,
            daily_ledger,
        }
    }

    /// Attach an external tokenizer; without one the character heuristic is
    /// used for every estimate.
    pub fn with_token_counter(mut self, counter: Arc<dyn TokenCounter>) -> Self {
        self.counter = Some(counter);
        self
    }

    pub fn pricing(&self) -> &PricingTable {
        &self.pricing
    }

    pub fn daily_ledger(&self) -> &Arc<dyn DailyLedger> {
        &self.daily_ledger
    }

    /// Token count for `text`, preferring the external tokenizer.
    pub fn estimate_tokens(&self, model: &str, text: &str) -> usize {
        match &self.counter {
            Some(counter) => match counter.count_tokens(model, text) {
                Ok(count) => count,
                Err(err) => {
                    warn!(model, error = %err, "tokenizer failed, using character heuristic");
                    approximate_tokens(text)
                }
            },
            None => approximate_tokens(text),
        }
    }

    /// Monetary cost for a request; zero for models missing from the table.
    pub fn estimate_cost(&self, input_tokens: u64, output_tokens: u64, model: &str) -> Decimal {
        self.pricing.calculate(model, input_tokens, output_tokens)
    }

    /// What sending `text` as the prompt would cost, before any output.
    pub fn prompt_cost_preview(&self, model: &str, text: &str) -> Decimal {
        let tokens = self.estimate_tokens(model, text) as u64;
        self.estimate_cost(tokens, 0, model)
    }

    /// Price the completed call and fold it into the daily ledger.
    ///
    /// Ledger failures must not block the response: they are logged and the
    /// cost is still returned to the caller.
    pub fn record(&self, model: &str, usage: &UsageReport, now: DateTime<Utc>) -> Decimal {
        let cost = self.estimate_cost(usage.input_tokens, usage.output_tokens, model);
        if let Err(err) = self.daily_ledger.record(now.date_naive(), cost) {
            warn!(model, %cost, error = %err, "daily ledger update failed, continuing");
        }
        cost
    }
}
