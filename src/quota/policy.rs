//! Quota policy value objects.

use std::time::Duration;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use super::DenyReason;

/// One sliding-window cap: at most `max_requests` admitted attempts within
/// any trailing `duration`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateWindow {
    #[serde(with = "humantime_serde")]
    pub duration: Duration,
    pub max_requests: usize,
    /// Reason reported when this window is the one that denies.
    pub deny_reason: DenyReason,
}

impl RateWindow {
    pub const fn new(duration: Duration, max_requests: usize, deny_reason: DenyReason) -> Self {
        Self {
            duration,
            max_requests,
            deny_reason,
        }
    }
}

/// The full set of sliding windows, evaluated independently against one
/// shared timestamp sequence. A request is denied if it would exceed any
/// window's cap.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RateWindowPolicy {
    windows: Vec<RateWindow>,
}

impl Default for RateWindowPolicy {
    fn default() -> Self {
        Self::new(vec![
            RateWindow::new(
                Duration::from_secs(10 * 60),
                5,
                DenyReason::TenMinuteCapExceeded,
            ),
            RateWindow::new(
                Duration::from_secs(60 * 60),
                15,
                DenyReason::HourlyCapExceeded,
            ),
        ])
    }
}

impl RateWindowPolicy {
    /// Build a policy; windows are kept sorted narrowest-first so the most
    /// specific cap reports its reason.
    pub fn new(mut windows: Vec<RateWindow>) -> Self {
        windows.sort_by_key(|w| w.duration);
        Self { windows }
    }

    pub fn windows(&self) -> &[RateWindow] {
        &self.windows
    }

    /// The widest window; timestamps older than this are prunable.
    pub fn longest(&self) -> Option<Duration> {
        self.windows.iter().map(|w| w.duration).max()
    }

    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }
}

/// Cumulative spend and size limits, independent of request timing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BudgetPolicy {
    /// Lifetime token allowance per session.
    pub session_token_ceiling: u64,
    /// Aggregate spend ceiling across all sessions per calendar day.
    pub daily_spend_ceiling: Decimal,
}

impl Default for BudgetPolicy {
    fn default() -> Self {
        Self {
            session_token_ceiling: 50_000,
            daily_spend_ceiling: dec!(1.00),
        }
    }
}
