//! Sliding-window quota enforcement over session ledgers.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tracing::{debug, warn};

use super::{AdmissionVerdict, BudgetPolicy, DenyReason, RateWindowPolicy, ReservationToken};
use crate::cost::DailyLedger;
use crate::session::Session;

/// Evaluates a session ledger against the configured windows and budgets.
///
/// Reservation and commit are separate steps: the rate-limit slot is taken
/// at admission time, before the external call runs, while token and cost
/// totals are only known (and recorded) once the response returns.
pub struct SessionQuotaTracker {
    windows: RateWindowPolicy,
    budget: BudgetPolicy,
    daily_ledger: Arc<dyn DailyLedger>,
}

impl std::fmt::Debug for SessionQuotaTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionQuotaTracker")
            .field("windows", &self.windows)
            .field("budget", &self.budget)
            .finish_non_exhaustive()
    }
}

impl SessionQuotaTracker {
    pub fn new(
        windows: RateWindowPolicy,
        budget: BudgetPolicy,
        daily_ledger: Arc<dyn DailyLedger>,
    ) -> Self {
        // Re-sort: a deserialized policy arrives in file order, and the
        // narrowest window must report its reason first.
        let windows = RateWindowPolicy::new(windows.windows().to_vec());
        Self {
            windows,
            budget,
            daily_ledger,
        }
    }

    pub fn windows(&self) -> &RateWindowPolicy {
        &self.windows
    }

    pub fn budget(&self) -> &BudgetPolicy {
        &self.budget
    }

    /// Atomically check every limit and, on success, log the attempt.
    ///
    /// The timestamp is appended before the verdict is returned, under the
    /// session lock, so two overlapping calls racing for the last slot in a
    /// window can never both be admitted.
    pub fn check_and_reserve(&self, session: &Session, now: DateTime<Utc>) -> AdmissionVerdict {
        let mut ledger = session.ledger();

        if let Some(longest) = self.windows.longest() {
            prune_locked(&mut ledger.timestamps, now, longest);
        }

        for window in self.windows.windows() {
            let in_window = match window_cutoff(now, window.duration) {
                Some(cutoff) => ledger.timestamps.iter().filter(|t| **t > cutoff).count(),
                // A window wider than representable time covers everything.
                None => ledger.timestamps.len(),
            };
            if in_window >= window.max_requests {
                debug!(
                    session = %session.id(),
                    reason = ?window.deny_reason,
                    in_window,
                    cap = window.max_requests,
                    "request denied by rate window"
                );
                return AdmissionVerdict::Denied(window.deny_reason);
            }
        }

        if ledger.cumulative_tokens > self.budget.session_token_ceiling {
            debug!(
                session = %session.id(),
                used = ledger.cumulative_tokens,
                ceiling = self.budget.session_token_ceiling,
                "request denied by session token budget"
            );
            return AdmissionVerdict::Denied(DenyReason::SessionTokenBudgetExceeded);
        }

        match self.daily_ledger.spent(now.date_naive()) {
            Ok(spent) if spent >= self.budget.daily_spend_ceiling => {
                debug!(
                    session = %session.id(),
                    %spent,
                    ceiling = %self.budget.daily_spend_ceiling,
                    "request denied by daily global budget"
                );
                return AdmissionVerdict::Denied(DenyReason::DailyGlobalBudgetExceeded);
            }
            Ok(_) => {}
            // An unreadable ledger must not block users; degrade open.
            Err(err) => warn!(error = %err, "daily ledger read failed, skipping global check"),
        }

        ledger.timestamps.push_back(now);
        let token = ReservationToken::new();
        debug!(session = %session.id(), reservation = %token, "request admitted");
        AdmissionVerdict::Admitted(token)
    }

    /// Record actual usage after the external call completed.
    ///
    /// Never called for failed downstream calls; the attempt already counted
    /// toward the rate window at reservation time and nothing else is owed.
    pub fn commit(&self, session: &Session, tokens_consumed: u64, cost: Decimal) {
        let mut ledger = session.ledger();
        ledger.cumulative_tokens = ledger.cumulative_tokens.saturating_add(tokens_consumed);
        ledger.cumulative_cost += cost;
        debug!(
            session = %session.id(),
            tokens_consumed,
            %cost,
            cumulative_tokens = ledger.cumulative_tokens,
            "usage committed"
        );
    }

    /// Drop timestamps that no longer affect any window. Idempotent for a
    /// fixed `now`; safe to call on every check.
    pub fn prune(&self, session: &Session, now: DateTime<Utc>) {
        if let Some(longest) = self.windows.longest() {
            let mut ledger = session.ledger();
            prune_locked(&mut ledger.timestamps, now, longest);
        }
    }
}

fn window_cutoff(now: DateTime<Utc>, duration: Duration) -> Option<DateTime<Utc>> {
    chrono::Duration::from_std(duration)
        .ok()
        .and_then(|d| now.checked_sub_signed(d))
}

fn prune_locked(
    timestamps: &mut std::collections::VecDeque<DateTime<Utc>>,
    now: DateTime<Utc>,
    longest: Duration,
) {
    let Some(cutoff) = window_cutoff(now, longest) else {
        return;
    };
    while let Some(oldest) = timestamps.front() {
        if *oldest > cutoff {
            break;
        }
        timestamps.pop_front();
    }
}
