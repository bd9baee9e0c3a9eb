use colored::Colorize;
use std::collections::HashMap;
use std::time::{Duration, Instant};

use super::compare::{all_match, display_value, mismatches, values_match};
use super::context::RunContext;
use super::wait::settle;
use crate::driver::traits::{
    is_truthy, BrowserDriver, PageEvent, PageSession, ScreenshotOptions,
};
use crate::error::{DriverError, HarnessError, WaitError};
use crate::parser::types::{Group, Step, Suite};
use crate::report::{Report, TestOutcome};

/// Navigation bound when a step does not set its own
const NAVIGATION_TIMEOUT: Duration = Duration::from_secs(30);

/// How a scenario group ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupResult {
    Passed,
    /// Ran every step, but some assertions failed
    Failed,
    /// A gate did not hold; the remaining steps were skipped
    Gated,
    /// A driver error stopped the group
    Aborted,
    /// Never started
    Skipped,
}

impl GroupResult {
    /// Every step ran, so state a later group depends on is in place
    pub fn completed(self) -> bool {
        matches!(self, GroupResult::Passed | GroupResult::Failed)
    }
}

/// What the group loop does after a step
enum StepFlow {
    Continue,
    /// Skip the rest of the group for this reason
    Gate(String),
    CloseSession,
}

/// Appends outcomes for one group, tagging them and tracking failures
struct GroupRecorder<'r> {
    report: &'r mut Report,
    group: &'r str,
    failed: bool,
}

impl<'r> GroupRecorder<'r> {
    fn new(report: &'r mut Report, group: &'r str) -> Self {
        Self {
            report,
            group,
            failed: false,
        }
    }

    fn record(&mut self, outcome: TestOutcome, started: Instant) {
        if outcome.failed() {
            self.failed = true;
        }
        self.report.record(
            outcome
                .in_group(self.group)
                .with_duration_ms(started.elapsed().as_millis() as u64),
        );
    }
}

/// Runs scenario groups in order against page sessions from one browser
pub struct ScenarioRunner<'a> {
    browser: &'a dyn BrowserDriver,
    context: RunContext,
    report: Report,
    sessions: HashMap<String, Box<dyn PageSession>>,
    results: HashMap<String, GroupResult>,
    interrupt_recorded: bool,
}

impl<'a> ScenarioRunner<'a> {
    pub fn new(browser: &'a dyn BrowserDriver, context: RunContext, report: Report) -> Self {
        Self {
            browser,
            context,
            report,
            sessions: HashMap::new(),
            results: HashMap::new(),
            interrupt_recorded: false,
        }
    }

    pub fn group_result(&self, name: &str) -> Option<GroupResult> {
        self.results.get(name).copied()
    }

    /// Run every group of the suite in order
    pub async fn run(&mut self, suite: &Suite) {
        for group in &suite.groups {
            if self.check_interrupt() {
                break;
            }
            let result = self.run_group(suite, group).await;
            self.results.insert(group.name.clone(), result);
        }
        self.check_interrupt();
    }

    /// Close any open sessions and hand back the report
    pub async fn finish(mut self) -> Report {
        let mut names: Vec<String> = self.sessions.keys().cloned().collect();
        names.sort();
        for name in names {
            self.close_session(&name).await;
        }
        self.report
    }

    fn check_interrupt(&mut self) -> bool {
        if !self.context.is_interrupted() {
            return false;
        }
        if !self.interrupt_recorded {
            self.interrupt_recorded = true;
            self.report.record(TestOutcome::new(
                "Run interrupted",
                false,
                Some("Stopped by Ctrl+C before all steps ran".to_string()),
            ));
        }
        true
    }

    fn unmet_requirement(&self, group: &Group) -> Option<String> {
        if let Some(ref fixture) = group.requires.fixture {
            let path = self.context.fixture_path(fixture);
            if !path.exists() {
                return Some(HarnessError::FixtureMissing(path).to_string());
            }
        }
        if let Some(ref dep) = group.requires.group {
            if !self.group_result(dep).is_some_and(GroupResult::completed) {
                return Some(format!("prerequisite group '{}' did not complete", dep));
            }
        }
        None
    }

    async fn ensure_session(&mut self, suite: &Suite, name: &str) -> Result<(), DriverError> {
        if self.sessions.contains_key(name) {
            return Ok(());
        }
        let viewport = suite.session(name).map(|s| s.viewport).unwrap_or_default();
        let page = self.browser.new_page(name, viewport).await?;
        log::debug!("Opened session '{}' ({}x{})", name, viewport.width, viewport.height);
        self.sessions.insert(name.to_string(), page);
        Ok(())
    }

    async fn close_session(&mut self, name: &str) {
        if let Some(page) = self.sessions.remove(name) {
            if let Err(e) = page.close().await {
                log::warn!("Failed to close session '{}': {}", name, e);
            }
        }
    }

    /// Run one group. Requirements are checked first; a driver error or a
    /// failed gate stops the group and the runner moves on.
    pub async fn run_group(&mut self, suite: &Suite, group: &Group) -> GroupResult {
        println!("\n{} {}", "▶".cyan(), group.name.bold());

        if let Some(reason) = self.unmet_requirement(group) {
            self.report
                .record(TestOutcome::skipped(&group.name, reason).in_group(&group.name));
            return GroupResult::Skipped;
        }

        if let Err(e) = self.ensure_session(suite, &group.session).await {
            self.report.record(
                TestOutcome::new(
                    format!("Open session '{}'", group.session),
                    false,
                    Some(e.to_string()),
                )
                .in_group(&group.name),
            );
            return GroupResult::Aborted;
        }

        let Some(page) = self.sessions.get(&group.session) else {
            return GroupResult::Aborted;
        };
        let page = page.as_ref();
        let context = &self.context;
        let mut recorder = GroupRecorder::new(&mut self.report, &group.name);
        let mut stopped = None;
        let mut close = false;

        for step in &group.steps {
            if context.is_interrupted() {
                break;
            }

            let started = Instant::now();
            let flow = execute_step(context, page, &mut recorder, step, started).await;
            forward_events(page).await;

            match flow {
                Ok(StepFlow::Continue) => {}
                Ok(StepFlow::Gate(reason)) => {
                    recorder.record(
                        TestOutcome::skipped(format!("Remaining steps of '{}'", group.name), reason),
                        started,
                    );
                    stopped = Some(GroupResult::Gated);
                    break;
                }
                Ok(StepFlow::CloseSession) => {
                    close = true;
                    break;
                }
                Err(e) => {
                    log::debug!("Step '{}' aborted group '{}'", step.describe(), group.name);
                    recorder.record(
                        TestOutcome::new(step.describe(), false, Some(e.to_string())),
                        started,
                    );
                    stopped = Some(GroupResult::Aborted);
                    break;
                }
            }
        }

        let failed = recorder.failed;
        if close {
            self.close_session(&group.session).await;
        }

        match stopped {
            Some(result) => result,
            None if failed => GroupResult::Failed,
            None => GroupResult::Passed,
        }
    }
}

/// Log console lines and page errors collected since the last step
async fn forward_events(page: &dyn PageSession) {
    for event in page.drain_events().await {
        match event {
            PageEvent::Console(text) => log::info!("[Browser] {}", text),
            PageEvent::Error(text) => log::warn!("[Error] {}", text),
        }
    }
}

async fn poll_truthy(
    context: &RunContext,
    page: &dyn PageSession,
    expression: &str,
    timeout: Duration,
) -> Result<Duration, WaitError> {
    context
        .waiter
        .wait_until(
            move || async move { page.evaluate(expression).await.map(|v| is_truthy(&v)) },
            timeout,
        )
        .await
}

/// Evaluate a detail expression; its own failure becomes the detail text
async fn render_detail(page: &dyn PageSession, expression: &str) -> String {
    match page.evaluate(expression).await {
        Ok(value) => display_value(&value),
        Err(e) => format!("(detail unavailable: {})", e),
    }
}

async fn execute_step(
    context: &RunContext,
    page: &dyn PageSession,
    recorder: &mut GroupRecorder<'_>,
    step: &Step,
    started: Instant,
) -> Result<StepFlow, DriverError> {
    match step {
        Step::Navigate(p) => {
            let url = context.url_for(p.path.as_deref());
            let timeout = p
                .timeout_ms
                .map(Duration::from_millis)
                .unwrap_or(NAVIGATION_TIMEOUT);
            log::info!("[{}] Navigating to {}", page.label(), url);
            page.navigate(&url, p.wait_until, timeout).await?;
        }

        Step::SetViewport(viewport) => page.set_viewport(*viewport).await?,

        Step::Click(selector) => page.click(selector).await?,

        Step::Select(p) => page.select(&p.selector, &p.value).await?,

        Step::Upload(p) => {
            let path = context.fixture_path(&p.fixture);
            if !path.exists() {
                return Ok(StepFlow::Gate(HarnessError::FixtureMissing(path).to_string()));
            }
            page.upload_file(&p.selector, &path).await?;
        }

        Step::Type(p) => page.type_text(&p.selector, &p.text).await?,

        Step::Evaluate(expression) => {
            page.evaluate(expression).await?;
        }

        Step::WaitFor(p) => {
            let timeout = context.timeout_or_default(p.timeout_ms);
            match poll_truthy(context, page, &p.predicate, timeout).await {
                Ok(elapsed) => log::debug!("Condition met after {}ms", elapsed.as_millis()),
                Err(e @ WaitError::Timeout { .. }) => {
                    let name = p.name.as_deref().unwrap_or("Wait for condition");
                    recorder.record(TestOutcome::new(name, false, Some(e.to_string())), started);
                    if p.gate {
                        return Ok(StepFlow::Gate(format!("'{}' timed out", name)));
                    }
                }
                Err(WaitError::Driver(e)) => return Err(e),
            }
        }

        Step::Sleep(ms) => settle(Duration::from_millis(*ms)).await,

        Step::Screenshot(p) => {
            let path = context.output_path(&p.path);
            let options = ScreenshotOptions {
                full_page: p.full_page,
            };
            page.screenshot(&path, &options).await?;
            println!("  📸 Screenshot saved to {}", path.display());
        }

        Step::Assert(p) => {
            let (passed, wait_detail) = match p.within_ms {
                Some(ms) => {
                    match poll_truthy(context, page, &p.expression, Duration::from_millis(ms)).await
                    {
                        Ok(_) => (true, None),
                        Err(e @ WaitError::Timeout { .. }) => (false, Some(e.to_string())),
                        Err(WaitError::Driver(e)) => return Err(e),
                    }
                }
                None => (is_truthy(&page.evaluate(&p.expression).await?), None),
            };

            let detail = match (&p.detail, passed) {
                (_, true) => None,
                (Some(expression), false) => Some(render_detail(page, expression).await),
                (None, false) => wait_detail,
            };
            recorder.record(TestOutcome::new(&p.name, passed, detail), started);

            if !passed && p.gate {
                return Ok(StepFlow::Gate(format!("'{}' failed", p.name)));
            }
        }

        Step::AssertEquals(p) => {
            if let Some(ms) = p.within_ms {
                let expression = p.expression.as_str();
                let expected = &p.expected;
                let waited = context
                    .waiter
                    .wait_until(
                        move || async move {
                            page.evaluate(expression)
                                .await
                                .map(|v| values_match(&v, expected))
                        },
                        Duration::from_millis(ms),
                    )
                    .await;
                if let Err(WaitError::Driver(e)) = waited {
                    return Err(e);
                }
            }

            let actual = page.evaluate(&p.expression).await?;
            let passed = values_match(&actual, &p.expected);
            let detail = (!passed).then(|| {
                format!(
                    "Expected \"{}\", got \"{}\"",
                    display_value(&p.expected),
                    display_value(&actual)
                )
            });
            recorder.record(TestOutcome::new(&p.name, passed, detail), started);
        }

        Step::AssertFixture(p) => {
            let path = context.fixture_path(&p.fixture);
            let exists = path.exists();
            let detail = (!exists).then(|| HarnessError::FixtureMissing(path).to_string());
            recorder.record(TestOutcome::new(&p.name, exists, detail.clone()), started);
            if let (false, true, Some(reason)) = (exists, p.gate, detail) {
                return Ok(StepFlow::Gate(reason));
            }
        }

        Step::PresetTable(table) => {
            let timeout = context.timeout_or_default(table.timeout_ms);
            for row in &table.rows {
                let row_started = Instant::now();
                let label = table.label_for(row);

                if let Err(e) = page.select(&table.selector, &row.name).await {
                    recorder.record(TestOutcome::new(label, false, Some(e.to_string())), row_started);
                    continue;
                }

                let read = table.read.as_str();
                let expected = &row.expected;
                let waited = context
                    .waiter
                    .wait_until(
                        move || async move { page.evaluate(read).await.map(|v| all_match(&v, expected)) },
                        timeout,
                    )
                    .await;
                if let Err(WaitError::Driver(e)) = waited {
                    return Err(e);
                }

                let actual = page.evaluate(read).await?;
                let diffs = mismatches(&actual, expected);
                let detail = (!diffs.is_empty()).then(|| diffs.join(", "));
                recorder.record(TestOutcome::new(label, diffs.is_empty(), detail), row_started);
            }
        }

        Step::Log(message) => println!("  {} {}", "ℹ".blue(), message),

        Step::CloseSession => return Ok(StepFlow::CloseSession),
    }

    Ok(StepFlow::Continue)
}
