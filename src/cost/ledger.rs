//! Process-wide daily spend accounting.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};

use chrono::NaiveDate;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use thiserror::Error;

use super::COST_SCALE_FACTOR;

/// Daily ledger store failure.
///
/// The gate treats these as non-fatal: writes are logged and swallowed,
/// reads degrade open.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("ledger store unavailable: {0}")]
    Unavailable(String),
}

/// Aggregate spend for the current calendar day, shared by all sessions.
///
/// The trait seam exists so a durable store can stand in for the in-memory
/// ledger; implementations must be safe for concurrent use.
pub trait DailyLedger: Send + Sync {
    /// Add `amount` to `day`'s running total; returns the new total.
    fn record(&self, day: NaiveDate, amount: Decimal) -> Result<Decimal, LedgerError>;

    /// Spend recorded so far for `day`.
    fn spent(&self, day: NaiveDate) -> Result<Decimal, LedgerError>;
}

/// In-memory [`DailyLedger`]: one atomic micro-USD counter plus the day it
/// belongs to. Rolls over (and zeroes) when a newer date is observed.
pub struct GlobalDailyLedger {
    day: Mutex<NaiveDate>,
    spent_micros: AtomicU64,
}

impl fmt::Debug for GlobalDailyLedger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GlobalDailyLedger")
            .field("day", &*self.day_guard())
            .field("spent_micros", &self.spent_micros.load(Ordering::Relaxed))
            .finish()
    }
}

impl Default for GlobalDailyLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl GlobalDailyLedger {
    pub fn new() -> Self {
        Self {
            // Sentinel start; the first record or read rolls forward to the
            // caller's date.
            day: Mutex::new(NaiveDate::MIN),
            spent_micros: AtomicU64::new(0),
        }
    }

    fn day_guard(&self) -> MutexGuard<'_, NaiveDate> {
        self.day.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn total(&self) -> Decimal {
        Decimal::from(self.spent_micros.load(Ordering::Acquire)) / COST_SCALE_FACTOR
    }
}

impl DailyLedger for GlobalDailyLedger {
    fn record(&self, day: NaiveDate, amount: Decimal) -> Result<Decimal, LedgerError> {
        // The day guard is held across the add so a concurrent rollover
        // cannot lose the increment.
        let mut current = self.day_guard();
        if day > *current {
            *current = day;
            self.spent_micros.store(0, Ordering::Release);
        } else if day < *current {
            // Late commit for an already-closed day; nothing to aggregate.
            return Ok(self.total());
        }
        let micros = (amount.max(Decimal::ZERO) * COST_SCALE_FACTOR)
            .to_u64()
            .unwrap_or(0);
        self.spent_micros.fetch_add(micros, Ordering::AcqRel);
        Ok(self.total())
    }

    fn spent(&self, day: NaiveDate) -> Result<Decimal, LedgerError> {
        let mut current = self.day_guard();
        if day > *current {
            *current = day;
            self.spent_micros.store(0, Ordering::Release);
            return Ok(Decimal::ZERO);
        }
        if day < *current {
            return Ok(Decimal::ZERO);
        }
        Ok(self.total())
    }
}
