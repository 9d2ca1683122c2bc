//! The ask flow and the application context that owns it.
//!
//! - [`ask::AskService`]: saves the question, builds a context window,
//!   calls the completion provider, charges the ledger and logs the answer.
//!   Start here.
//! - [`app::AppContext`]: opens the storage root once and exposes the
//!   operations a gateway needs (log, ask, spend totals, history, shutdown).

pub mod app;
pub mod ask;

pub use app::AppContext;
pub use ask::{Answer, AskError, AskRequest, AskService};
