//! Convenience re-exports for the common admission-control flow.
//!
//! ```rust
//! use prompt_gate::prelude::*;
//! ```

pub use crate::config::GateConfig;
pub use crate::cost::{CostEstimator, GlobalDailyLedger, PricingTable, UsageReport};
pub use crate::gate::{AdmissionGate, GateDecision};
pub use crate::quota::{AdmissionVerdict, DenyReason, ReservationToken};
pub use crate::session::{Session, SessionId, SessionRegistry};
pub use crate::validation::{RejectReason, ValidationVerdict};
pub use crate::Error;
