//! Gate configuration surface.

use serde::{Deserialize, Serialize};

use crate::quota::{BudgetPolicy, RateWindowPolicy};
use crate::validation::ValidationPolicy;
use crate::Error;

/// Full configuration for an [`AdmissionGate`](crate::AdmissionGate).
///
/// Every field has a sensible default; a config deserialized from an empty
/// object is the stock policy (10min/5 and 1h/15 windows, 50K session
/// tokens, 500-char prompts, $1.00 daily ceiling).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GateConfig {
    pub validation: ValidationPolicy,
    pub windows: RateWindowPolicy,
    pub budget: BudgetPolicy,
}

impl GateConfig {
    /// Load and validate a configuration from JSON.
    pub fn from_json(json: &str) -> Result<Self, Error> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations that would make the gate meaningless or
    /// divide-by-zero its way through the spam heuristic.
    pub fn validate(&self) -> Result<(), Error> {
        if self.windows.is_empty() {
            return Err(Error::Config("at least one rate window is required".into()));
        }
        for window in self.windows.windows() {
            if window.duration.is_zero() {
                return Err(Error::Config("rate window duration must be non-zero".into()));
            }
            if window.max_requests == 0 {
                return Err(Error::Config(
                    "rate window max_requests must be non-zero".into(),
                ));
            }
        }
        if self.validation.prompt_char_ceiling == 0 {
            return Err(Error::Config("prompt_char_ceiling must be non-zero".into()));
        }
        if self.validation.spam_ratio.denominator == 0 {
            return Err(Error::Config(
                "spam_ratio denominator must be non-zero".into(),
            ));
        }
        if self.budget.session_token_ceiling == 0 {
            return Err(Error::Config(
                "session_token_ceiling must be non-zero".into(),
            ));
        }
        if self.budget.daily_spend_ceiling.is_sign_negative() {
            return Err(Error::Config(
                "daily_spend_ceiling must not be negative".into(),
            ));
        }
        Ok(())
    }
}
