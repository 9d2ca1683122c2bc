//! Per-chat spend entries on top of [`RecordLog`].
//!
//! Partition `spend_<chat_id>` holds `epoch_seconds,amount` lines. The total
//! is always all-time: every entry is read and summed exactly.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use super::error::StoreError;
use super::log::{Record, RecordLog, parse_epoch_seconds};
use crate::usd::Usd;

/// Cost of one completed completion request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpendEntry {
    pub chat_id: i64,
    pub timestamp: DateTime<Utc>,
    pub amount: Usd,
}

struct SpendRecord {
    timestamp: DateTime<Utc>,
    amount: Usd,
}

impl Record for SpendRecord {
    const FIELD_COUNT: usize = 2;

    fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    fn to_fields(&self) -> Vec<String> {
        vec![
            self.timestamp.timestamp().to_string(),
            self.amount.to_string(),
        ]
    }

    fn from_fields(fields: &[&str]) -> Result<Self, String> {
        Ok(Self {
            timestamp: parse_epoch_seconds(fields[0])?,
            amount: fields[1].parse().map_err(|e| format!("{e}"))?,
        })
    }
}

/// Partition key holding a chat's spend entries.
pub fn spend_partition(chat_id: i64) -> String {
    format!("spend_{chat_id}")
}

/// Append-only cost ledger over a shared [`RecordLog`].
#[derive(Debug, Clone)]
pub struct SpendLedger {
    log: Arc<RecordLog>,
}

impl SpendLedger {
    pub fn new(log: Arc<RecordLog>) -> Self {
        Self { log }
    }

    /// Append a cost entry for `chat_id`.
    pub fn record(&self, chat_id: i64, amount: Usd, when: DateTime<Utc>) -> Result<(), StoreError> {
        self.log.append_record(
            &spend_partition(chat_id),
            &SpendRecord {
                timestamp: when,
                amount,
            },
        )
    }

    /// All entries of `chat_id` in append order.
    pub fn entries(&self, chat_id: i64) -> Result<Vec<SpendEntry>, StoreError> {
        let records: Vec<SpendRecord> = self.log.scan_forward(&spend_partition(chat_id))?;
        Ok(records
            .into_iter()
            .map(|r| SpendEntry {
                chat_id,
                timestamp: r.timestamp,
                amount: r.amount,
            })
            .collect())
    }

    /// All-time spend of `chat_id`; zero when nothing was recorded.
    ///
    /// A total that does not fit in [`Usd`] is reported as a parse error on
    /// the entry that overflowed it.
    pub fn total(&self, chat_id: i64) -> Result<Usd, StoreError> {
        let partition = spend_partition(chat_id);
        let records: Vec<SpendRecord> = self.log.scan_forward(&partition)?;
        records.into_iter().try_fold(Usd::ZERO, |total, r| {
            total.checked_add(r.amount).ok_or_else(|| StoreError::Parse {
                partition: partition.clone(),
                line: r.to_fields().join(","),
                reason: format!("total spend overflows after adding {}", r.amount),
            })
        })
    }
}
