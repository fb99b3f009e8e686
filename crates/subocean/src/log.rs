//! Structured processing log owned by the caller.
//!
//! Stages append records instead of mutating shared state, so parallel
//! batch workers never cross-talk.

use serde::{Deserialize, Serialize};

/// Pipeline stage that produced a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Loader,
    Validator,
    Segmenter,
    Derived,
    Gridder,
    Pipeline,
}

/// Severity of a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordLevel {
    Info,
    Warning,
}

/// One logged processing action.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageRecord {
    pub stage: Stage,
    pub level: RecordLevel,
    pub action: String,
    pub detail: String,
}

/// Ordered log of stage records for one profile run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProcessingLog {
    records: Vec<StageRecord>,
}

impl ProcessingLog {
    /// Create an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an informational record.
    pub fn info(&mut self, stage: Stage, action: impl Into<String>, detail: impl Into<String>) {
        self.push(stage, RecordLevel::Info, action, detail);
    }

    /// Append a warning record (non-fatal skip, absent channel, ...).
    pub fn warn(&mut self, stage: Stage, action: impl Into<String>, detail: impl Into<String>) {
        self.push(stage, RecordLevel::Warning, action, detail);
    }

    fn push(
        &mut self,
        stage: Stage,
        level: RecordLevel,
        action: impl Into<String>,
        detail: impl Into<String>,
    ) {
        let action = action.into();
        let detail = detail.into();
        match level {
            RecordLevel::Info => tracing::debug!(?stage, %action, %detail, "stage record"),
            RecordLevel::Warning => tracing::warn!(?stage, %action, %detail, "stage record"),
        }
        self.records.push(StageRecord {
            stage,
            level,
            action,
            detail,
        });
    }

    /// All records in order.
    pub fn records(&self) -> &[StageRecord] {
        &self.records
    }

    /// Records at warning level.
    pub fn warnings(&self) -> impl Iterator<Item = &StageRecord> {
        self.records
            .iter()
            .filter(|r| r.level == RecordLevel::Warning)
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the log is empty.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_records_keep_order_and_level() {
        let mut log = ProcessingLog::new();
        log.info(Stage::Loader, "load", "42 rows");
        log.warn(Stage::Validator, "skip", "channel absent");

        assert_eq!(log.len(), 2);
        assert_eq!(log.records()[0].stage, Stage::Loader);
        assert_eq!(log.warnings().count(), 1);
    }
}
