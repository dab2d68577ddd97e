//! Sliding-window rate limits and cumulative budget gates.

mod policy;
mod tracker;

pub use policy::{BudgetPolicy, RateWindow, RateWindowPolicy};
pub use tracker::SessionQuotaTracker;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Why an otherwise valid request was refused admission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DenyReason {
    /// Too many requests inside the ten-minute window.
    TenMinuteCapExceeded,
    /// Too many requests inside the one-hour window.
    HourlyCapExceeded,
    /// The session has consumed its lifetime token allowance.
    SessionTokenBudgetExceeded,
    /// Aggregate spend across all sessions hit the daily ceiling.
    DailyGlobalBudgetExceeded,
}

/// Opaque handle returned for an admitted request.
///
/// Carries no entitlement by itself; it exists so callers can correlate the
/// admission with the usage they later commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReservationToken(Uuid);

impl ReservationToken {
    pub(crate) fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl std::fmt::Display for ReservationToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Outcome of a quota check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdmissionVerdict {
    Admitted(ReservationToken),
    Denied(DenyReason),
}

impl AdmissionVerdict {
    pub fn is_admitted(&self) -> bool {
        matches!(self, Self::Admitted(_))
    }

    pub fn deny_reason(&self) -> Option<DenyReason> {
        match self {
            Self::Admitted(_) => None,
            Self::Denied(reason) => Some(*reason),
        }
    }
}
