//! Session identity and ledger state.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique session identifier.
#[derive(Clone, Debug, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub struct SessionId(pub String);

impl SessionId {
    /// Generate a new random session ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Create from an existing string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for SessionId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Point-in-time view of a session's consumption, for display.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SessionUsage {
    /// Admitted attempts still inside the longest rate window.
    pub recent_requests: usize,
    pub cumulative_tokens: u64,
    pub cumulative_cost: Decimal,
}

/// Mutable ledger guarded by the session mutex.
///
/// Timestamps are append-only except for lazy pruning; token and cost
/// counters only ever grow between explicit resets.
#[derive(Debug, Default)]
pub(crate) struct LedgerState {
    pub(crate) timestamps: VecDeque<DateTime<Utc>>,
    pub(crate) cumulative_tokens: u64,
    pub(crate) cumulative_cost: Decimal,
}

/// One admission-control ledger, scoped to a single user session.
///
/// All mutation happens under the internal mutex so a check-and-reserve is
/// atomic even when one session issues overlapping requests.
#[derive(Debug)]
pub struct Session {
    id: SessionId,
    ledger: Mutex<LedgerState>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        Self::with_id(SessionId::new())
    }

    pub fn with_id(id: SessionId) -> Self {
        Self {
            id,
            ledger: Mutex::new(LedgerState::default()),
        }
    }

    pub fn id(&self) -> &SessionId {
        &self.id
    }

    /// Snapshot of current consumption.
    pub fn usage(&self) -> SessionUsage {
        let ledger = self.ledger();
        SessionUsage {
            recent_requests: ledger.timestamps.len(),
            cumulative_tokens: ledger.cumulative_tokens,
            cumulative_cost: ledger.cumulative_cost,
        }
    }

    /// User-initiated "clear": zero the token and cost counters.
    ///
    /// Rate-window timestamps are deliberately kept; clearing a cosmetic
    /// history must not hand out a fresh burst allowance.
    pub fn reset_usage(&self) {
        let mut ledger = self.ledger();
        ledger.cumulative_tokens = 0;
        ledger.cumulative_cost = Decimal::ZERO;
    }

    // A poisoned mutex only means another thread panicked mid-update of
    // plain counters; the data is still usable.
    pub(crate) fn ledger(&self) -> MutexGuard<'_, LedgerState> {
        self.ledger.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_session_ids_unique() {
        let a = SessionId::new();
        let b = SessionId::new();
        assert_ne!(a, b);
    }

    #[test]
    fn test_reset_keeps_timestamps() {
        let session = Session::new();
        {
            let mut ledger = session.ledger();
            ledger.timestamps.push_back(Utc::now());
            ledger.cumulative_tokens = 1200;
            ledger.cumulative_cost = dec!(0.05);
        }

        session.reset_usage();

        let usage = session.usage();
        assert_eq!(usage.cumulative_tokens, 0);
        assert_eq!(usage.cumulative_cost, Decimal::ZERO);
        assert_eq!(usage.recent_requests, 1);
    }
}
