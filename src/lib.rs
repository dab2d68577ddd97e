//! # prompt-gate
//!
//! Admission control for expensive, externally metered text-generation APIs.
//!
//! Every costed call is fronted by three checks, composed in order by the
//! [`AdmissionGate`]: input screening ([`InputValidator`]), per-session
//! sliding-window and budget quotas ([`SessionQuotaTracker`]), and cost
//! accounting ([`CostEstimator`]) against a process-wide daily spend ledger.
//! Rejections and denials are typed verdict values, never errors: they are a
//! primary return path, not an exceptional one.
//!
//! ## Quick Start
//!
//! ```rust
//! use chrono::Utc;
//! use prompt_gate::{AdmissionGate, GateDecision, Session, UsageReport};
//!
//! # fn main() -> Result<(), prompt_gate::Error> {
//! let gate = AdmissionGate::builder().build()?;
//! let session = Session::new();
//!
//! match gate.admit(&session, "Explain token budgets briefly", "gpt-3.5-turbo", Utc::now()) {
//!     GateDecision::Admitted(reservation) => {
//!         // Invoke the metered API here, then report what it consumed.
//!         let usage = UsageReport::new(12, 180);
//!         let cost = gate.commit(&session, "gpt-3.5-turbo", &usage, Utc::now());
//!         println!("{reservation}: ${cost}");
//!     }
//!     GateDecision::RejectedInput(reason) => println!("bad input: {reason:?}"),
//!     GateDecision::Denied(reason) => println!("over quota: {reason:?}"),
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Reservation and commit
//!
//! The rate-limit slot is consumed at admission time, before the external
//! call runs, so overlapping or retried attempts still count toward the
//! window. Token and cost totals are only committed once actual usage is
//! known. If the downstream call fails, simply do not commit: the attempt
//! stays logged in the window and nothing is charged.
//!
//! Limiter state is in-memory only; nothing survives a process restart and
//! no cross-process quota sharing is attempted.

#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod config;
pub mod cost;
pub mod gate;
pub mod prelude;
pub mod quota;
pub mod session;
pub mod validation;

// Re-exports for convenience
pub use config::GateConfig;
pub use cost::{
    approximate_tokens, CostEstimator, DailyLedger, GlobalDailyLedger, LedgerError, ModelPricing,
    PricingTable, PricingTableBuilder, TokenCountError, TokenCounter, UsageReport,
    APPROX_CHARS_PER_TOKEN,
};
pub use gate::{AdmissionGate, GateBuilder, GateDecision};
pub use quota::{
    AdmissionVerdict, BudgetPolicy, DenyReason, RateWindow, RateWindowPolicy, ReservationToken,
    SessionQuotaTracker,
};
pub use session::{Session, SessionId, SessionRegistry, SessionUsage};
pub use validation::{
    InputValidator, RejectReason, SpamRatio, ValidationPolicy, ValidationVerdict,
};

/// Error type for prompt-gate operations.
///
/// Policy rejections and quota denials are NOT errors; they are verdict
/// values. This enum covers the crate's few genuinely fallible surfaces.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// Invalid or missing configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Daily ledger store failed.
    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),

    /// Token counting failed.
    #[error("Token counting failed: {0}")]
    TokenCount(#[from] TokenCountError),

    /// JSON parsing failed.
    #[error("JSON parsing failed: {0}")]
    Json(#[from] serde_json::Error),
}
