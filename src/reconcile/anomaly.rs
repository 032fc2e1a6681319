//! Append-only sink for anomalies met while reconciling imported data
//!
//! Entries go to a plain-text log that staff review after an import run, and are
//! mirrored to `tracing`. Recording never fails from the caller's point of view.

use chrono::{DateTime, SecondsFormat, Utc};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{error, warn};

pub const DEFAULT_ANOMALY_LOG: &str = "errors-and-warnings.log";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AnomalyLevel {
    Warning,
    Error,
}

impl AnomalyLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnomalyLevel::Warning => "WARNING",
            AnomalyLevel::Error => "ERROR",
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Anomaly {
    pub level: AnomalyLevel,
    pub message: String,
    pub recorded_at: DateTime<Utc>,
}

impl Anomaly {
    pub fn new(level: AnomalyLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
            recorded_at: Utc::now(),
        }
    }

    /// Block format read by the staff tooling
    pub fn to_block(&self) -> String {
        format!(
            "\n---\n{} - {}\n{}",
            self.recorded_at.to_rfc3339_opts(SecondsFormat::Millis, true),
            self.level.as_str(),
            self.message
        )
    }
}

pub trait AnomalySink: Send + Sync {
    fn record(&self, anomaly: Anomaly);

    fn warning(&self, message: String) {
        self.record(Anomaly::new(AnomalyLevel::Warning, message));
    }

    fn error(&self, message: String) {
        self.record(Anomaly::new(AnomalyLevel::Error, message));
    }
}

fn mirror_to_tracing(anomaly: &Anomaly) {
    match anomaly.level {
        AnomalyLevel::Warning => warn!("{}", anomaly.message),
        AnomalyLevel::Error => error!("{}", anomaly.message),
    }
}

pub struct FileAnomalyLog {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileAnomalyLog {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn append(&self, block: &str) -> std::io::Result<()> {
        let _guard = self
            .write_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(block.as_bytes())
    }
}

impl AnomalySink for FileAnomalyLog {
    fn record(&self, anomaly: Anomaly) {
        mirror_to_tracing(&anomaly);
        if let Err(e) = self.append(&anomaly.to_block()) {
            error!(
                "Failed to write anomaly log {}: {}",
                self.path.display(),
                e
            );
        }
    }
}

/// Keeps anomalies in memory; used by tests and API-triggered imports
#[derive(Default)]
pub struct MemoryAnomalyLog {
    entries: Mutex<Vec<Anomaly>>,
}

impl MemoryAnomalyLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<Anomaly> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn count(&self, level: AnomalyLevel) -> usize {
        self.entries().iter().filter(|a| a.level == level).count()
    }
}

impl AnomalySink for MemoryAnomalyLog {
    fn record(&self, anomaly: Anomaly) {
        mirror_to_tracing(&anomaly);
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(anomaly);
    }
}
