//! Per-session admission ledgers.

mod registry;
mod state;

pub use registry::SessionRegistry;
pub use state::{Session, SessionId, SessionUsage};
