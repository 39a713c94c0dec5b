//! Domain models representing the core entities of the export process.
//!
//! These models are used across application, ports, and infrastructure layers
//! to maintain a consistent data representation.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::num::NonZeroU64;
use std::path::PathBuf;
use std::time::Duration;

/// Everything a driver needs to open one connection.
#[derive(Clone)]
pub struct ConnectionDescriptor {
    /// Driver identifier (e.g. `oracle`, `sqlite`).
    pub driver: String,
    /// Driver-specific URL or connect string.
    pub url: String,
    pub username: String,
    pub password: String,
}

// Keeps the password out of log lines that print the descriptor.
impl fmt::Debug for ConnectionDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionDescriptor")
            .field("driver", &self.driver)
            .field("url", &self.url)
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

/// Maximum number of data rows per output file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RowLimit {
    /// All rows go to a single file.
    Unlimited,
    /// Rows are split across `name_1.ext`, `name_2.ext`, ...
    PerFile(NonZeroU64),
}

impl RowLimit {
    /// Interprets the configured per-file record count, where `-1` (or absence) means unlimited.
    pub fn from_record_num(value: Option<i64>) -> Option<Self> {
        match value {
            None | Some(-1) => Some(RowLimit::Unlimited),
            Some(n) if n > 0 => NonZeroU64::new(n as u64).map(RowLimit::PerFile),
            Some(_) => None,
        }
    }
}

impl fmt::Display for RowLimit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RowLimit::Unlimited => write!(f, "unlimited"),
            RowLimit::PerFile(n) => write!(f, "{} rows per file", n),
        }
    }
}

/// Immutable, validated description of one export job.
#[derive(Debug, Clone)]
pub struct ExportJobConfig {
    /// Identifier used in progress messages and the final fatal error.
    pub job_id: String,
    pub connection: ConnectionDescriptor,
    pub sql: String,
    /// Directory the output files are written to.
    pub dest_dir: PathBuf,
    /// Base file name, e.g. `orders.csv`.
    pub dest_name: String,
    pub row_limit: RowLimit,
    /// Single-byte field separator.
    pub separator: u8,
    /// Output text encoding; only UTF-8 is produced.
    pub encoding: String,
    /// Additional attempts permitted after the first failure.
    pub retry_count: u32,
    pub retry_delay: Duration,
    /// Rows fetched per round-trip by drivers that support it.
    pub prefetch_rows: u32,
}

impl ExportJobConfig {
    /// Full path of the (unchunked) destination file.
    pub fn destination(&self) -> PathBuf {
        self.dest_dir.join(&self.dest_name)
    }
}

/// Outcome of a single attempt, created fresh every time the runner enters `Running`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportAttemptResult {
    pub success: bool,
    /// Data rows written by this attempt (0 for a failed attempt).
    pub rows_written: u64,
    /// Failures counted so far across the job, including this attempt.
    pub failure_count: u32,
}

impl ExportAttemptResult {
    pub fn success(rows_written: u64, failure_count: u32) -> Self {
        Self {
            success: true,
            rows_written,
            failure_count,
        }
    }

    pub fn failure(failure_count: u32) -> Self {
        Self {
            success: false,
            rows_written: 0,
            failure_count,
        }
    }
}

/// Captures the outcome of a whole job, suitable for the JSON run report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobResult {
    pub job_id: String,
    /// Total rows exported by the successful attempt.
    pub rows: u64,
    /// Number of attempts made, including the successful one.
    pub attempts: u32,
    /// Number of failed attempts.
    pub failures: u32,
    /// Wall-clock time taken for the whole job in seconds, including retry waits.
    pub duration: f64,
    /// Outcome status: SUCCESS or FAILED.
    pub status: String,
    /// Detailed error message if the job failed.
    pub error: Option<String>,
    /// One entry per attempt, in order.
    pub history: Vec<ExportAttemptResult>,
}

impl JobResult {
    /// Creates a successful JobResult from the attempt history.
    pub fn success(job_id: String, history: Vec<ExportAttemptResult>, duration: f64) -> Self {
        let rows = history
            .last()
            .filter(|a| a.success)
            .map(|a| a.rows_written)
            .unwrap_or(0);
        Self {
            job_id,
            rows,
            attempts: history.len() as u32,
            failures: Self::count_failures(&history),
            duration,
            status: "SUCCESS".to_string(),
            error: None,
            history,
        }
    }

    /// Creates a failed JobResult with an error message.
    pub fn failure(
        job_id: String,
        history: Vec<ExportAttemptResult>,
        duration: f64,
        error: String,
    ) -> Self {
        Self {
            job_id,
            rows: 0,
            attempts: history.len() as u32,
            failures: Self::count_failures(&history),
            duration,
            status: "FAILED".to_string(),
            error: Some(error),
            history,
        }
    }

    fn count_failures(history: &[ExportAttemptResult]) -> u32 {
        history.iter().filter(|a| !a.success).count() as u32
    }
}
