//! Transfer progress tracking

use std::fmt;

/// Report at least every 4 MiB when the total size is unknown
const UNKNOWN_TOTAL_REPORT_BYTES: u64 = 4 * 1024 * 1024;

const MIB: f64 = 1024.0 * 1024.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Download,
    Upload,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Download => f.write_str("download"),
            Direction::Upload => f.write_str("upload"),
        }
    }
}

/// One in-flight transfer. Lives only for the duration of a single
/// download or upload call.
#[derive(Debug, Clone)]
pub struct TransferJob {
    pub direction: Direction,
    pub source: String,
    pub destination: String,
    pub transferred: u64,
    /// Expected size; `None` when the remote did not announce one
    pub total: Option<u64>,
    last_reported: Option<u64>,
}

impl TransferJob {
    pub fn new(
        direction: Direction,
        source: impl Into<String>,
        destination: impl Into<String>,
        total: Option<u64>,
    ) -> Self {
        Self {
            direction,
            source: source.into(),
            destination: destination.into(),
            transferred: 0,
            total: total.filter(|t| *t > 0),
            last_reported: None,
        }
    }

    /// Percentage complete, if the total is known
    #[allow(clippy::cast_precision_loss)]
    pub fn percent(&self) -> Option<f64> {
        self.total
            .map(|total| (self.transferred as f64 / total as f64) * 100.0)
    }

    #[allow(clippy::cast_precision_loss)]
    pub fn transferred_mib(&self) -> f64 {
        self.transferred as f64 / MIB
    }

    #[allow(clippy::cast_precision_loss)]
    pub fn total_mib(&self) -> Option<f64> {
        self.total.map(|t| t as f64 / MIB)
    }

    /// Count `bytes` more and return whether a progress report is due.
    ///
    /// Reports are throttled to whole-percent steps, or to fixed byte
    /// intervals when the total is unknown.
    pub fn record(&mut self, bytes: usize) -> bool {
        self.transferred += bytes as u64;

        let bucket = match self.total {
            Some(total) => self.transferred.saturating_mul(100) / total,
            None => self.transferred / UNKNOWN_TOTAL_REPORT_BYTES,
        };

        if self.last_reported == Some(bucket) {
            return false;
        }
        self.last_reported = Some(bucket);
        true
    }
}

/// Receives progress observations. Purely informational.
pub trait ProgressObserver: Send + Sync {
    fn on_progress(&self, job: &TransferJob);
}

/// Writes progress to the log
#[derive(Debug, Default, Clone, Copy)]
pub struct LogProgress;

impl ProgressObserver for LogProgress {
    fn on_progress(&self, job: &TransferJob) {
        match (job.percent(), job.total_mib()) {
            (Some(percent), Some(total_mib)) => tracing::debug!(
                direction = %job.direction,
                source = %job.source,
                destination = %job.destination,
                "Transferring... {:.2}% ({:.2} MB / {:.2} MB)",
                percent,
                job.transferred_mib(),
                total_mib,
            ),
            _ => tracing::debug!(
                direction = %job.direction,
                source = %job.source,
                destination = %job.destination,
                "Transferring... {:.2} MB",
                job.transferred_mib(),
            ),
        }
    }
}
