use super::types::{OutcomeStatus, RunReport, TestOutcome};
use anyhow::Result;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use std::io::Cursor;
use std::path::Path;

const UNGROUPED: &str = "ungrouped";

/// Generate JUnit XML, one testsuite per scenario group
pub fn generate_junit_xml(report: &RunReport) -> Result<String> {
    let mut writer = Writer::new(Cursor::new(Vec::new()));
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

    let total_time: u64 = report.outcomes.iter().filter_map(|o| o.duration_ms).sum();

    let mut suites_start = BytesStart::new("testsuites");
    suites_start.push_attribute(("name", report.suite.as_str()));
    suites_start.push_attribute(("tests", report.outcomes.len().to_string().as_str()));
    suites_start.push_attribute(("failures", report.summary.failed.to_string().as_str()));
    suites_start.push_attribute(("skipped", report.summary.skipped.to_string().as_str()));
    suites_start.push_attribute(("time", seconds(total_time).as_str()));
    writer.write_event(Event::Start(suites_start))?;

    // Groups keep first-seen order
    let mut groups: Vec<(&str, Vec<&TestOutcome>)> = Vec::new();
    for outcome in &report.outcomes {
        let group = outcome.group.as_deref().unwrap_or(UNGROUPED);
        match groups.iter_mut().find(|(name, _)| *name == group) {
            Some((_, list)) => list.push(outcome),
            None => groups.push((group, vec![outcome])),
        }
    }

    for (index, (group, outcomes)) in groups.iter().enumerate() {
        let failures = outcomes.iter().filter(|o| o.failed()).count();
        let skipped = outcomes
            .iter()
            .filter(|o| o.status == OutcomeStatus::Skipped)
            .count();
        let time: u64 = outcomes.iter().filter_map(|o| o.duration_ms).sum();

        let mut suite_start = BytesStart::new("testsuite");
        suite_start.push_attribute(("name", *group));
        suite_start.push_attribute(("id", index.to_string().as_str()));
        suite_start.push_attribute(("tests", outcomes.len().to_string().as_str()));
        suite_start.push_attribute(("failures", failures.to_string().as_str()));
        suite_start.push_attribute(("skipped", skipped.to_string().as_str()));
        suite_start.push_attribute(("time", seconds(time).as_str()));
        suite_start.push_attribute(("timestamp", report.generated_at.as_str()));
        writer.write_event(Event::Start(suite_start))?;

        for outcome in outcomes {
            write_test_case(&mut writer, group, outcome)?;
        }

        writer.write_event(Event::End(BytesEnd::new("testsuite")))?;
    }

    writer.write_event(Event::End(BytesEnd::new("testsuites")))?;

    let xml = String::from_utf8(writer.into_inner().into_inner())?;
    Ok(xml)
}

fn write_test_case<W: std::io::Write>(
    writer: &mut Writer<W>,
    group: &str,
    outcome: &TestOutcome,
) -> Result<()> {
    let mut case_start = BytesStart::new("testcase");
    case_start.push_attribute(("name", outcome.name.as_str()));
    case_start.push_attribute(("classname", group));
    case_start.push_attribute(("time", seconds(outcome.duration_ms.unwrap_or(0)).as_str()));
    writer.write_event(Event::Start(case_start))?;

    match outcome.status {
        OutcomeStatus::Failed => {
            let message = outcome.detail.as_deref().unwrap_or("Assertion failed");
            let mut fail_start = BytesStart::new("failure");
            fail_start.push_attribute(("message", message));
            fail_start.push_attribute(("type", "AssertionError"));
            writer.write_event(Event::Start(fail_start))?;
            writer.write_event(Event::Text(BytesText::new(message)))?;
            writer.write_event(Event::End(BytesEnd::new("failure")))?;
        }
        OutcomeStatus::Skipped => {
            let mut skip = BytesStart::new("skipped");
            if let Some(ref reason) = outcome.detail {
                skip.push_attribute(("message", reason.as_str()));
            }
            writer.write_event(Event::Empty(skip))?;
        }
        OutcomeStatus::Passed => {}
    }

    writer.write_event(Event::End(BytesEnd::new("testcase")))?;
    Ok(())
}

fn seconds(ms: u64) -> String {
    (ms as f64 / 1000.0).to_string()
}

/// Write the JUnit report to `path`
pub fn write_report(report: &RunReport, path: &Path) -> Result<()> {
    let xml = generate_junit_xml(report)?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, xml)?;
    println!("    Generated JUnit report: {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::types::RunSummary;

    #[test]
    fn test_generate_junit_xml() {
        let report = RunReport {
            run_id: "run".to_string(),
            suite: "Comprehensive Test Suite".to_string(),
            outcomes: vec![
                TestOutcome::new("Title is correct", true, None)
                    .in_group("Desktop Layout and Branding")
                    .with_duration_ms(120),
                TestOutcome::new(
                    "Preset \"raw\" sets correct parameters",
                    false,
                    Some("expected hp=20, got hp=25".into()),
                )
                .in_group("Preset Parameter Changes"),
                TestOutcome::skipped("WAV Rendering", "sample.mp3 not found")
                    .in_group("WAV Rendering"),
            ],
            summary: RunSummary {
                passed: 1,
                failed: 1,
                skipped: 1,
                total: 2,
            },
            generated_at: "2024-01-01 12:00:00".to_string(),
        };

        let xml = generate_junit_xml(&report).expect("Failed to generate XML");

        assert!(xml.contains(r#"<testsuites name="Comprehensive Test Suite""#));
        assert!(xml.contains(r#"failures="1""#));
        assert!(xml.contains(r#"<testsuite name="Desktop Layout and Branding""#));
        assert!(xml.contains(r#"<testcase name="Title is correct""#));
        assert!(xml.contains(r#"message="expected hp=20, got hp=25""#));
        assert!(xml.contains(r#"<skipped message="sample.mp3 not found"/>"#));
        assert_eq!(xml.matches("<testsuite ").count(), 3);
    }
}
