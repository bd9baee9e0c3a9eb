pub mod console;
pub mod json;
pub mod junit;
pub mod types;

use uuid::Uuid;

pub use types::{OutcomeStatus, RunReport, RunSummary, TestOutcome};

/// Accumulates assertion outcomes for one run
///
/// Constructed once per run and handed to the scenario runner; outcomes are
/// only ever appended, in the order they were evaluated.
#[derive(Debug)]
pub struct Report {
    run_id: String,
    suite: String,
    outcomes: Vec<TestOutcome>,
}

impl Report {
    pub fn new(suite: &str) -> Self {
        Self {
            run_id: Uuid::new_v4().to_string(),
            suite: suite.to_string(),
            outcomes: Vec::new(),
        }
    }

    pub fn suite(&self) -> &str {
        &self.suite
    }

    /// Append an outcome and echo it as a progress line
    pub fn record(&mut self, outcome: TestOutcome) {
        console::print_outcome(&outcome);
        self.outcomes.push(outcome);
    }

    pub fn outcomes(&self) -> &[TestOutcome] {
        &self.outcomes
    }

    pub fn summarize(&self) -> RunSummary {
        let mut summary = RunSummary::default();
        for outcome in &self.outcomes {
            match outcome.status {
                OutcomeStatus::Passed => summary.passed += 1,
                OutcomeStatus::Failed => summary.failed += 1,
                OutcomeStatus::Skipped => summary.skipped += 1,
            }
        }
        summary.total = summary.passed + summary.failed;
        summary
    }

    /// Non-zero iff at least one outcome failed
    pub fn exit_code(&self) -> i32 {
        if self.outcomes.iter().any(TestOutcome::failed) {
            1
        } else {
            0
        }
    }

    pub fn render(&self) -> String {
        console::render_summary(self)
    }

    pub fn to_run_report(&self) -> RunReport {
        RunReport {
            run_id: self.run_id.clone(),
            suite: self.suite.clone(),
            outcomes: self.outcomes.clone(),
            summary: self.summarize(),
            generated_at: chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
        }
    }
}
