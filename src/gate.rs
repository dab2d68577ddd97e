//! The single decision surface composing validation, quota, and cost.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tracing::debug;

use crate::config::GateConfig;
use crate::cost::{
    CostEstimator, DailyLedger, GlobalDailyLedger, PricingTable, TokenCounter, UsageReport,
};
use crate::quota::{AdmissionVerdict, DenyReason, ReservationToken, SessionQuotaTracker};
use crate::session::Session;
use crate::validation::{InputValidator, RejectReason, ValidationVerdict};
use crate::Error;

/// Outcome of asking the gate whether a request may proceed.
///
/// Input rejections and quota denials are distinct so callers can tell "fix
/// your prompt" apart from "slow down" when messaging the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    /// Proceed to the costed call; report usage back via commit.
    Admitted(ReservationToken),
    /// The prompt itself is unacceptable.
    RejectedInput(RejectReason),
    /// The prompt is fine but a quota or budget forbids it right now.
    Denied(DenyReason),
}

impl GateDecision {
    pub fn is_admitted(&self) -> bool {
        matches!(self, Self::Admitted(_))
    }

    pub fn reservation(&self) -> Option<ReservationToken> {
        match self {
            Self::Admitted(token) => Some(*token),
            _ => None,
        }
    }
}

/// Orchestrates the admission pipeline in front of a metered generation API.
///
/// Composition only: validate the prompt, then check-and-reserve against the
/// session's quotas. The external call itself happens outside the gate, after
/// an [`Admitted`](GateDecision::Admitted) decision.
#[derive(Debug)]
pub struct AdmissionGate {
    validator: InputValidator,
    tracker: SessionQuotaTracker,
    estimator: CostEstimator,
}

impl AdmissionGate {
    pub fn builder() -> GateBuilder {
        GateBuilder::new()
    }

    /// Decide whether `prompt` may be sent to `model` for this session.
    pub fn admit(
        &self,
        session: &Session,
        prompt: &str,
        model: &str,
        now: DateTime<Utc>,
    ) -> GateDecision {
        match self.validator.validate(prompt) {
            ValidationVerdict::Rejected(reason) => {
                debug!(session = %session.id(), model, ?reason, "prompt rejected");
                GateDecision::RejectedInput(reason)
            }
            ValidationVerdict::Accepted => match self.tracker.check_and_reserve(session, now) {
                AdmissionVerdict::Admitted(token) => GateDecision::Admitted(token),
                AdmissionVerdict::Denied(reason) => GateDecision::Denied(reason),
            },
        }
    }

    /// Report actual usage for an admitted request that completed.
    ///
    /// Prices the usage, folds it into the global daily ledger, and adds it
    /// to the session's cumulative counters. Returns the cost. For failed
    /// downstream calls simply do not commit; no partial charge occurs.
    pub fn commit(
        &self,
        session: &Session,
        model: &str,
        usage: &UsageReport,
        now: DateTime<Utc>,
    ) -> Decimal {
        let cost = self.estimator.record(model, usage, now);
        self.tracker.commit(session, usage.total(), cost);
        cost
    }

    pub fn validator(&self) -> &InputValidator {
        &self.validator
    }

    pub fn tracker(&self) -> &SessionQuotaTracker {
        &self.tracker
    }

    pub fn estimator(&self) -> &CostEstimator {
        &self.estimator
    }
}

/// Builder for [`AdmissionGate`].
#[derive(Default)]
pub struct GateBuilder {
    config: Option<GateConfig>,
    pricing: Option<PricingTable>,
    token_counter: Option<Arc<dyn TokenCounter>>,
    daily_ledger: Option<Arc<dyn DailyLedger>>,
}

impl GateBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn config(mut self, config: GateConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn pricing(mut self, pricing: PricingTable) -> Self {
        self.pricing = Some(pricing);
        self
    }

    pub fn token_counter(mut self, counter: Arc<dyn TokenCounter>) -> Self {
        self.token_counter = Some(counter);
        self
    }

    pub fn daily_ledger(mut self, ledger: Arc<dyn DailyLedger>) -> Self {
        self.daily_ledger = Some(ledger);
        self
    }

    pub fn build(self) -> Result<AdmissionGate, Error> {
        let config = self.config.unwrap_or_default();
        config.validate()?;

        let ledger = self
            .daily_ledger
            .unwrap_or_else(|| Arc::new(GlobalDailyLedger::new()));
        let pricing = self.pricing.unwrap_or_else(PricingTable::from_env);

        let mut estimator = CostEstimator::new(pricing, Arc::clone(&ledger));
        if let Some(counter) = self.token_counter {
            estimator = estimator.with_token_counter(counter);
        }

        Ok(AdmissionGate {
            validator: InputValidator::new(config.validation),
            tracker: SessionQuotaTracker::new(config.windows, config.budget, ledger),
            estimator,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_validation_runs_before_quota() {
        let gate = AdmissionGate::builder().build().unwrap();
        let session = Session::new();

        // An invalid prompt is rejected without consuming a window slot.
        for _ in 0..10 {
            let decision = gate.admit(&session, "", "gpt-4", now());
            assert_eq!(decision, GateDecision::RejectedInput(RejectReason::Empty));
        }
        assert_eq!(session.usage().recent_requests, 0);
    }

    #[test]
    fn test_admit_then_commit_updates_ledgers() {
        let ledger = Arc::new(GlobalDailyLedger::new());
        let gate = AdmissionGate::builder()
            .daily_ledger(ledger.clone())
            .build()
            .unwrap();
        let session = Session::new();

        let decision = gate.admit(&session, "Explain entropy briefly", "gpt-3.5-turbo", now());
        assert!(decision.is_admitted());

        let cost = gate.commit(&session, "gpt-3.5-turbo", &UsageReport::new(1000, 1000), now());
        assert_eq!(cost, dec!(0.0030));

        let usage = session.usage();
        assert_eq!(usage.cumulative_tokens, 2000);
        assert_eq!(usage.cumulative_cost, dec!(0.0030));
        assert_eq!(ledger.spent(now().date_naive()).unwrap(), dec!(0.0030));
    }

    #[test]
    fn test_decisions_distinguish_input_from_quota() {
        let gate = AdmissionGate::builder().build().unwrap();
        let session = Session::new();

        for _ in 0..5 {
            assert!(gate.admit(&session, "a fine prompt", "gpt-4", now()).is_admitted());
        }

        let denied = gate.admit(&session, "a fine prompt", "gpt-4", now());
        assert_eq!(
            denied,
            GateDecision::Denied(DenyReason::TenMinuteCapExceeded)
        );

        let rejected = gate.admit(&session, "write a book about dogs", "gpt-4", now());
        assert_eq!(
            rejected,
            GateDecision::RejectedInput(RejectReason::BlockedKeyword)
        );
    }
}
