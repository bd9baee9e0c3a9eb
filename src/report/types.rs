use serde::{Deserialize, Serialize};

/// Result of a single named assertion
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OutcomeStatus {
    Passed,
    Failed,
    /// Informational: the check could not run because a prerequisite was absent
    Skipped,
}

/// One assertion result. Immutable once recorded.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TestOutcome {
    pub name: String,
    pub status: OutcomeStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
}

impl TestOutcome {
    pub fn new(name: impl Into<String>, passed: bool, detail: Option<String>) -> Self {
        Self {
            name: name.into(),
            status: if passed {
                OutcomeStatus::Passed
            } else {
                OutcomeStatus::Failed
            },
            detail: detail.filter(|d| !d.is_empty()),
            group: None,
            duration_ms: None,
        }
    }

    pub fn skipped(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: OutcomeStatus::Skipped,
            detail: Some(reason.into()),
            group: None,
            duration_ms: None,
        }
    }

    pub fn in_group(mut self, group: &str) -> Self {
        self.group = Some(group.to_string());
        self
    }

    pub fn with_duration_ms(mut self, ms: u64) -> Self {
        self.duration_ms = Some(ms);
        self
    }

    pub fn passed(&self) -> bool {
        self.status == OutcomeStatus::Passed
    }

    pub fn failed(&self) -> bool {
        self.status == OutcomeStatus::Failed
    }
}

/// Counts derived from the recorded outcomes
///
/// Skipped outcomes are reported but do not count towards `total`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    pub passed: u32,
    pub failed: u32,
    pub skipped: u32,
    pub total: u32,
}

impl RunSummary {
    /// Rounded percentage of passed outcomes; `None` when nothing was checked
    pub fn success_rate(&self) -> Option<u32> {
        if self.total == 0 {
            return None;
        }
        Some(((self.passed as f64 / self.total as f64) * 100.0).round() as u32)
    }
}

/// Serializable form of a whole run, used by the JSON and JUnit writers
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunReport {
    pub run_id: String,
    pub suite: String,
    pub outcomes: Vec<TestOutcome>,
    pub summary: RunSummary,
    pub generated_at: String,
}
