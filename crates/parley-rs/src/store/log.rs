//! Append-only, per-partition record log.
//!
//! Every partition is a UTF-8 text file `<root>/<partition_key>.txt` holding
//! one comma-separated record per line. Appends go through a long-lived
//! handle per partition and are synced to disk before returning. Reads open
//! their own handles: [`RecordLog::scan_backward`] walks the file from its
//! end and stops at the first record outside the requested time window,
//! [`RecordLog::scan_forward`] reads everything.
//!
//! Directory layout:
//! ```text
//! data/
//!   chat_42.txt     1760659200,7,alice,hi there
//!   spend_42.txt    1760659260,0.00021
//! ```

use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use tracing::{debug, trace};

use super::error::StoreError;
use super::reverse::ReverseLines;

/// Hard cap on records returned by one backward scan, whatever the caller asks.
pub const MAX_HISTORY_DEPTH: usize = 10_000;

/// Field separator inside a record line.
pub const FIELD_SEPARATOR: char = ',';

/// Longest excerpt of an offending line carried in a parse error.
const ERROR_LINE_EXCERPT: usize = 120;

// ── Record ─────────────────────────────────────────────────────────

/// A flat record stored as one line of a partition.
///
/// Lines are split with `splitn(FIELD_COUNT, ',')`, so only the last field
/// may contain commas. No field may contain a newline.
pub trait Record: Sized {
    /// Number of comma-separated fields in a line.
    const FIELD_COUNT: usize;

    /// Instant the record was appended at; drives range filtering.
    fn timestamp(&self) -> DateTime<Utc>;

    /// Serialize into ordered field strings.
    fn to_fields(&self) -> Vec<String>;

    /// Parse from exactly [`FIELD_COUNT`](Self::FIELD_COUNT) fields.
    fn from_fields(fields: &[&str]) -> Result<Self, String>;
}

/// Parse unix epoch seconds as stored in the first field of every record.
pub fn parse_epoch_seconds(field: &str) -> Result<DateTime<Utc>, String> {
    let secs: i64 = field
        .trim()
        .parse()
        .map_err(|e| format!("bad timestamp '{field}': {e}"))?;
    DateTime::from_timestamp(secs, 0).ok_or_else(|| format!("timestamp out of range: {secs}"))
}

// ── TimeWindow ─────────────────────────────────────────────────────

/// Closed time interval `[start, end]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, ts: DateTime<Utc>) -> bool {
        self.start <= ts && ts <= self.end
    }
}

// ── RecordLog ──────────────────────────────────────────────────────

/// Durable, append-only record sequences keyed by partition.
///
/// Holds one open append handle per partition for the lifetime of the log.
/// The registry mutex serializes appends inside this process; running two
/// processes against the same directory is not supported.
///
/// # Ordering precondition
///
/// Records appended to one partition must carry non-decreasing timestamps.
/// [`scan_backward`](Self::scan_backward) treats the first out-of-range record
/// as the end of the range, so an out-of-order partition silently yields a
/// truncated result.
#[derive(Debug)]
pub struct RecordLog {
    root: PathBuf,
    max_depth: usize,
    handles: Mutex<HashMap<String, File>>,
}

impl RecordLog {
    /// Open a log rooted at `root`, creating the directory if needed.
    pub fn open(root: impl Into<PathBuf>, max_depth: usize) -> Result<Self, StoreError> {
        let root = root.into();
        std::fs::create_dir_all(&root).map_err(|e| StoreError::io(&root, e))?;
        Ok(Self {
            root,
            max_depth,
            handles: Mutex::new(HashMap::new()),
        })
    }

    /// Root directory holding the partition files.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Fixed maximum depth of a backward scan.
    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Backing file of a partition.
    pub fn partition_path(&self, key: &str) -> PathBuf {
        self.root.join(format!("{key}.txt"))
    }

    /// Whether the partition's backing file exists.
    pub fn has_partition(&self, key: &str) -> bool {
        self.partition_path(key).exists()
    }

    /// Number of append handles currently held open.
    pub fn open_handles(&self) -> usize {
        self.handles.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    // ── Writes ─────────────────────────────────────────────────────

    /// Append one record made of `fields` to a partition and sync it to disk.
    ///
    /// Creates the partition on first use. Fields are joined with `,` and
    /// terminated with `\n`; any field containing a newline, or any field
    /// but the last containing a comma, is rejected.
    pub fn append<S: AsRef<str>>(&self, key: &str, fields: &[S]) -> Result<(), StoreError> {
        let line = encode_line(fields)?;

        let mut handles = self.handles.lock().unwrap_or_else(|e| e.into_inner());
        let path = self.partition_path(key);
        let file = match handles.entry(key.to_string()) {
            std::collections::hash_map::Entry::Occupied(entry) => entry.into_mut(),
            std::collections::hash_map::Entry::Vacant(entry) => {
                let file = OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(&path)
                    .map_err(|e| StoreError::io(&path, e))?;
                debug!("Opened append handle for partition '{key}'");
                entry.insert(file)
            }
        };

        file.write_all(line.as_bytes()).map_err(|e| StoreError::io(&path, e))?;
        file.sync_data().map_err(|e| StoreError::io(&path, e))?;
        trace!("Appended {} bytes to partition '{key}'", line.len());
        Ok(())
    }

    /// Append a typed record. See [`append`](Self::append).
    pub fn append_record<R: Record>(&self, key: &str, record: &R) -> Result<(), StoreError> {
        self.append(key, &record.to_fields())
    }

    /// Flush and release every open append handle.
    ///
    /// Dropping the log releases the handles too; this variant reports sync
    /// failures. Later appends reopen handles lazily.
    pub fn close_all(&self) -> Result<(), StoreError> {
        let mut handles = self.handles.lock().unwrap_or_else(|e| e.into_inner());
        for (key, file) in handles.drain() {
            file.sync_all()
                .map_err(|e| StoreError::io(self.partition_path(&key), e))?;
        }
        Ok(())
    }

    // ── Reads ──────────────────────────────────────────────────────

    /// Collect records inside `window`, reading from the end of the partition.
    ///
    /// Returns at most `min(depth_limit, max_depth)` records, oldest first:
    /// the most recent ones within the window. The scan ends at the first
    /// record outside the window. A missing partition yields an empty vector;
    /// a malformed line fails the whole scan. Blank lines are skipped.
    pub fn scan_backward<R: Record>(
        &self,
        key: &str,
        window: TimeWindow,
        depth_limit: usize,
    ) -> Result<Vec<R>, StoreError> {
        let path = self.partition_path(key);
        let Some(file) = open_existing(&path)? else {
            return Ok(Vec::new());
        };

        let cap = depth_limit.min(self.max_depth);
        let mut records = Vec::new();
        if cap == 0 {
            return Ok(records);
        }

        let lines = ReverseLines::new(file).map_err(|e| StoreError::io(&path, e))?;
        for line in lines {
            let line = line.map_err(|e| StoreError::io(&path, e))?;
            if line.is_empty() {
                continue;
            }
            let record: R = parse_line(key, &line)?;
            if !window.contains(record.timestamp()) {
                break;
            }
            records.push(record);
            if records.len() >= cap {
                break;
            }
        }

        records.reverse();
        debug!(
            "Backward scan of '{key}' returned {} record(s) (cap {cap})",
            records.len()
        );
        Ok(records)
    }

    /// Read every record of a partition in append order.
    pub fn scan_forward<R: Record>(&self, key: &str) -> Result<Vec<R>, StoreError> {
        let path = self.partition_path(key);
        let Some(file) = open_existing(&path)? else {
            return Ok(Vec::new());
        };

        let mut records = Vec::new();
        for line in BufReader::new(file).lines() {
            let line = line.map_err(|e| StoreError::io(&path, e))?;
            if line.is_empty() {
                continue;
            }
            records.push(parse_line(key, &line)?);
        }
        Ok(records)
    }
}

// ── Helpers ────────────────────────────────────────────────────────

fn open_existing(path: &Path) -> Result<Option<File>, StoreError> {
    match File::open(path) {
        Ok(file) => Ok(Some(file)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(StoreError::io(path, e)),
    }
}

fn encode_line<S: AsRef<str>>(fields: &[S]) -> Result<String, StoreError> {
    let last = fields.len().saturating_sub(1);
    let mut line = String::new();
    for (idx, field) in fields.iter().enumerate() {
        let field = field.as_ref();
        if field.contains('\n') {
            return Err(StoreError::InvalidField {
                field: idx,
                reason: "contains a newline".into(),
            });
        }
        if idx < last && field.contains(FIELD_SEPARATOR) {
            return Err(StoreError::InvalidField {
                field: idx,
                reason: "contains the field separator".into(),
            });
        }
        if idx > 0 {
            line.push(FIELD_SEPARATOR);
        }
        line.push_str(field);
    }
    line.push('\n');
    Ok(line)
}

fn parse_line<R: Record>(key: &str, line: &str) -> Result<R, StoreError> {
    let fields: Vec<&str> = line.splitn(R::FIELD_COUNT, FIELD_SEPARATOR).collect();
    let parsed = if fields.len() == R::FIELD_COUNT {
        R::from_fields(&fields)
    } else {
        Err(format!(
            "expected {} fields, found {}",
            R::FIELD_COUNT,
            fields.len()
        ))
    };
    parsed.map_err(|reason| StoreError::Parse {
        partition: key.to_string(),
        line: line.chars().take(ERROR_LINE_EXCERPT).collect(),
        reason,
    })
}

// ── Tests ──────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    /// Minimal record used to exercise the log directly.
    #[derive(Debug, Clone, PartialEq)]
    struct Note {
        at: DateTime<Utc>,
        body: String,
    }

    impl Record for Note {
        const FIELD_COUNT: usize = 2;

        fn timestamp(&self) -> DateTime<Utc> {
            self.at
        }

        fn to_fields(&self) -> Vec<String> {
            vec![self.at.timestamp().to_string(), self.body.clone()]
        }

        fn from_fields(fields: &[&str]) -> Result<Self, String> {
            Ok(Self {
                at: parse_epoch_seconds(fields[0])?,
                body: fields[1].to_string(),
            })
        }
    }

    fn at(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(secs, 0).unwrap()
    }

    fn note(secs: i64, body: &str) -> Note {
        Note {
            at: at(secs),
            body: body.into(),
        }
    }

    fn everything() -> TimeWindow {
        TimeWindow::new(at(0), at(i32::MAX as i64))
    }

    #[test]
    fn append_creates_partition_lazily() {
        let dir = tempfile::tempdir().unwrap();
        let log = RecordLog::open(dir.path(), MAX_HISTORY_DEPTH).unwrap();
        assert!(!log.has_partition("p"));
        assert_eq!(log.open_handles(), 0);

        log.append("p", &["1", "x"]).unwrap();
        assert!(log.has_partition("p"));
        assert_eq!(log.open_handles(), 1);

        log.append("p", &["2", "y"]).unwrap();
        assert_eq!(log.open_handles(), 1, "handle is reused");

        let raw = std::fs::read_to_string(log.partition_path("p")).unwrap();
        assert_eq!(raw, "1,x\n2,y\n");
    }

    #[test]
    fn open_creates_missing_root() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("nested/data");
        let log = RecordLog::open(&root, 10).unwrap();
        assert!(root.is_dir());
        assert_eq!(log.root(), root.as_path());
    }

    #[test]
    fn scan_missing_partition_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let log = RecordLog::open(dir.path(), MAX_HISTORY_DEPTH).unwrap();
        let back: Vec<Note> = log.scan_backward("nope", everything(), 10).unwrap();
        let fwd: Vec<Note> = log.scan_forward("nope").unwrap();
        assert!(back.is_empty());
        assert!(fwd.is_empty());
    }

    #[test]
    fn backward_scan_returns_window_oldest_first() {
        let dir = tempfile::tempdir().unwrap();
        let log = RecordLog::open(dir.path(), MAX_HISTORY_DEPTH).unwrap();
        for (secs, body) in [(10, "a"), (20, "b"), (30, "c"), (40, "d")] {
            log.append_record("p", &note(secs, body)).unwrap();
        }

        let got: Vec<Note> = log
            .scan_backward("p", TimeWindow::new(at(20), at(30)), 10)
            .unwrap();
        // 40 is newer than the window, so the scan stops before reaching 30.
        assert!(got.is_empty());

        let got: Vec<Note> = log
            .scan_backward("p", TimeWindow::new(at(20), at(40)), 10)
            .unwrap();
        assert_eq!(got, vec![note(20, "b"), note(30, "c"), note(40, "d")]);
    }

    #[test]
    fn window_bounds_are_inclusive() {
        let dir = tempfile::tempdir().unwrap();
        let log = RecordLog::open(dir.path(), MAX_HISTORY_DEPTH).unwrap();
        log.append_record("p", &note(10, "a")).unwrap();
        log.append_record("p", &note(20, "b")).unwrap();

        let got: Vec<Note> = log
            .scan_backward("p", TimeWindow::new(at(10), at(20)), 10)
            .unwrap();
        assert_eq!(got.len(), 2);
    }

    #[test]
    fn depth_limit_keeps_most_recent() {
        let dir = tempfile::tempdir().unwrap();
        let log = RecordLog::open(dir.path(), MAX_HISTORY_DEPTH).unwrap();
        for secs in 1..=10 {
            log.append_record("p", &note(secs, &format!("m{secs}")))
                .unwrap();
        }

        let got: Vec<Note> = log.scan_backward("p", everything(), 3).unwrap();
        let bodies: Vec<&str> = got.iter().map(|n| n.body.as_str()).collect();
        assert_eq!(bodies, vec!["m8", "m9", "m10"]);
    }

    #[test]
    fn max_depth_caps_caller_limit() {
        let dir = tempfile::tempdir().unwrap();
        let log = RecordLog::open(dir.path(), 2).unwrap();
        for secs in 1..=5 {
            log.append_record("p", &note(secs, "x")).unwrap();
        }
        let got: Vec<Note> = log.scan_backward("p", everything(), 100).unwrap();
        assert_eq!(got.len(), 2);
        assert_eq!(got[0].at, at(4));
    }

    #[test]
    fn zero_limit_returns_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let log = RecordLog::open(dir.path(), MAX_HISTORY_DEPTH).unwrap();
        log.append_record("p", &note(1, "x")).unwrap();
        let got: Vec<Note> = log.scan_backward("p", everything(), 0).unwrap();
        assert!(got.is_empty());
    }

    #[test]
    fn out_of_order_append_truncates_silently() {
        let dir = tempfile::tempdir().unwrap();
        let log = RecordLog::open(dir.path(), MAX_HISTORY_DEPTH).unwrap();
        log.append_record("p", &note(20, "in-range")).unwrap();
        log.append_record("p", &note(5, "too-old")).unwrap();

        let got: Vec<Note> = log
            .scan_backward("p", TimeWindow::new(at(10), at(30)), 10)
            .unwrap();
        assert!(got.is_empty(), "early termination hides older in-range rows");
    }

    #[test]
    fn last_field_may_contain_commas() {
        let dir = tempfile::tempdir().unwrap();
        let log = RecordLog::open(dir.path(), MAX_HISTORY_DEPTH).unwrap();
        log.append_record("p", &note(1, "a, b, c")).unwrap();
        let got: Vec<Note> = log.scan_forward("p").unwrap();
        assert_eq!(got[0].body, "a, b, c");
    }

    #[test]
    fn rejects_newlines_and_inner_separators() {
        let dir = tempfile::tempdir().unwrap();
        let log = RecordLog::open(dir.path(), MAX_HISTORY_DEPTH).unwrap();

        let err = log.append("p", &["1", "two\nlines"]).unwrap_err();
        assert!(matches!(err, StoreError::InvalidField { field: 1, .. }));

        let err = log.append("p", &["1,5", "x"]).unwrap_err();
        assert!(matches!(err, StoreError::InvalidField { field: 0, .. }));

        assert!(!log.has_partition("p"), "rejected append writes nothing");
    }

    #[test]
    fn malformed_line_fails_fast() {
        let dir = tempfile::tempdir().unwrap();
        let log = RecordLog::open(dir.path(), MAX_HISTORY_DEPTH).unwrap();
        std::fs::write(log.partition_path("p"), "1,ok\nnot-a-number,x\n").unwrap();

        let err = log.scan_backward::<Note>("p", everything(), 10).unwrap_err();
        match err {
            StoreError::Parse {
                partition, line, ..
            } => {
                assert_eq!(partition, "p");
                assert_eq!(line, "not-a-number,x");
            }
            other => panic!("unexpected error: {other}"),
        }

        assert!(log.scan_forward::<Note>("p").is_err());
    }

    #[test]
    fn wrong_field_count_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let log = RecordLog::open(dir.path(), MAX_HISTORY_DEPTH).unwrap();
        std::fs::write(log.partition_path("p"), "12345\n").unwrap();
        let err = log.scan_forward::<Note>("p").unwrap_err();
        assert!(err.to_string().contains("expected 2 fields"));
    }

    #[test]
    fn blank_lines_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let log = RecordLog::open(dir.path(), MAX_HISTORY_DEPTH).unwrap();
        std::fs::write(log.partition_path("p"), "1,a\n\n2,b\n\n").unwrap();

        let back: Vec<Note> = log.scan_backward("p", everything(), 10).unwrap();
        assert_eq!(back, vec![note(1, "a"), note(2, "b")]);
        let fwd: Vec<Note> = log.scan_forward("p").unwrap();
        assert_eq!(fwd, back);
    }

    #[test]
    fn close_all_releases_handles_and_appends_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let log = RecordLog::open(dir.path(), MAX_HISTORY_DEPTH).unwrap();
        log.append_record("a", &note(1, "x")).unwrap();
        log.append_record("b", &note(1, "y")).unwrap();
        assert_eq!(log.open_handles(), 2);

        log.close_all().unwrap();
        assert_eq!(log.open_handles(), 0);

        log.append_record("a", &note(2, "z")).unwrap();
        let got: Vec<Note> = log.scan_forward("a").unwrap();
        assert_eq!(got.len(), 2);
    }

    #[test]
    fn reads_see_appends_from_the_same_process() {
        let dir = tempfile::tempdir().unwrap();
        let log = RecordLog::open(dir.path(), MAX_HISTORY_DEPTH).unwrap();
        log.append_record("p", &note(1, "first")).unwrap();
        assert_eq!(log.scan_forward::<Note>("p").unwrap().len(), 1);
        log.append_record("p", &note(2, "second")).unwrap();
        assert_eq!(log.scan_forward::<Note>("p").unwrap().len(), 2);
    }
}
