//! Durable per-chat storage: the record log and the typed stores over it.
//!
//! 1. **[`log`]**: [`RecordLog`], append-only comma-separated partitions with
//!    a lazily populated registry of append handles, backward bounded scans
//!    and forward full scans.
//!
//! 2. **[`messages`]**: [`MessageStore`], chat messages keyed by chat id,
//!    queried by closed time range and depth limit.
//!
//! 3. **[`spend`]**: [`SpendLedger`], cost entries with an exact all-time
//!    total.
//!
//! Both typed stores share one [`RecordLog`] through an `Arc`; their
//! partitions never collide (`chat_<id>` vs `spend_<id>`).

pub mod error;
pub mod log;
pub mod messages;
pub mod reverse;
pub mod spend;

pub use error::StoreError;
pub use log::{MAX_HISTORY_DEPTH, Record, RecordLog, TimeWindow};
pub use messages::{Message, MessageStore};
pub use spend::{SpendEntry, SpendLedger};
