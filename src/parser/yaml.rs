use serde::Deserialize;
use serde_yaml::Value;
use std::path::Path;

use super::types::{
    AssertEqualsParams, AssertFixtureParams, AssertParams, BrowserSettings, Group,
    NavigateParams, PresetTableParams, Requires, ScreenshotParams, SelectParams, SessionSpec,
    Step, Suite, Target, TypeParams, UploadParams, WaitForParams,
};
use crate::driver::traits::Viewport;
use crate::error::{HarnessError, Result};

/// Suites compiled into the binary: (command name, YAML source)
pub const BUILTIN_SUITES: &[(&str, &str)] = &[
    ("full-suite", include_str!("../../suites/full_suite.yaml")),
    ("serve-and-test", include_str!("../../suites/serve_and_test.yaml")),
    ("upload", include_str!("../../suites/upload.yaml")),
];

fn default_port() -> u16 {
    8888
}

fn default_entry() -> String {
    "index.html".to_string()
}

/// On-disk shape; steps stay raw until `parse_step_value`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SuiteFile {
    name: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    target: Target,
    #[serde(default = "default_port")]
    port: u16,
    #[serde(default = "default_entry")]
    entry: String,
    #[serde(default)]
    browser: BrowserSettings,
    #[serde(default)]
    sessions: Vec<SessionSpec>,
    #[serde(default)]
    groups: Vec<GroupFile>,
}

#[derive(Debug, Deserialize)]
struct GroupFile {
    name: String,
    #[serde(default)]
    session: Option<String>,
    #[serde(default)]
    requires: Requires,
    #[serde(default)]
    steps: Vec<Value>,
}

fn invalid(message: impl Into<String>) -> HarnessError {
    HarnessError::Suite(message.into())
}

/// Load a built-in suite by command name
pub fn builtin_suite(name: &str) -> Result<Suite> {
    let (_, source) = BUILTIN_SUITES
        .iter()
        .find(|(n, _)| *n == name)
        .ok_or_else(|| invalid(format!("No built-in suite named '{}'", name)))?;
    parse_suite_str(source)
}

/// Parse a suite file from disk
pub fn parse_suite_file(path: &Path) -> Result<Suite> {
    let content = std::fs::read_to_string(path)?;
    parse_suite_str(&content).map_err(|e| match e {
        HarnessError::Suite(msg) => invalid(format!("{}: {}", path.display(), msg)),
        other => other,
    })
}

/// Parse suite YAML and check its cross references
pub fn parse_suite_str(content: &str) -> Result<Suite> {
    let file: SuiteFile = serde_yaml::from_str(content).map_err(|e| invalid(e.to_string()))?;

    let mut sessions = file.sessions;
    if sessions.is_empty() {
        sessions.push(SessionSpec {
            name: "main".to_string(),
            viewport: Viewport::default(),
        });
    }
    let default_session = sessions[0].name.clone();

    let mut groups: Vec<Group> = Vec::with_capacity(file.groups.len());
    for raw in file.groups {
        let session = raw.session.unwrap_or_else(|| default_session.clone());
        if !sessions.iter().any(|s| s.name == session) {
            return Err(invalid(format!(
                "Group '{}' uses unknown session '{}'",
                raw.name, session
            )));
        }
        if let Some(ref dep) = raw.requires.group {
            if !groups.iter().any(|g| &g.name == dep) {
                return Err(invalid(format!(
                    "Group '{}' requires '{}', which is not an earlier group",
                    raw.name, dep
                )));
            }
        }

        let steps = raw
            .steps
            .iter()
            .enumerate()
            .map(|(i, value)| {
                parse_step_value(value).map_err(|e| match e {
                    HarnessError::Suite(msg) => {
                        invalid(format!("group '{}', step {}: {}", raw.name, i + 1, msg))
                    }
                    other => other,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        groups.push(Group {
            name: raw.name,
            session,
            requires: raw.requires,
            steps,
        });
    }

    Ok(Suite {
        name: file.name,
        description: file.description,
        target: file.target,
        port: file.port,
        entry: file.entry,
        browser: file.browser,
        sessions,
        groups,
    })
}

/// Parse a single step: a bare name or a single-key mapping
pub fn parse_step_value(value: &Value) -> Result<Step> {
    match value {
        // "- closeSession"
        Value::String(name) => parse_step_with_params(name, &Value::Null),

        // "- click: '#renderBtn'"
        Value::Mapping(map) => {
            let mut entries = map.iter();
            let (key, params) = match (entries.next(), entries.next()) {
                (Some(entry), None) => entry,
                _ => return Err(invalid("Invalid step format: expected single key mapping")),
            };
            let name = key
                .as_str()
                .ok_or_else(|| invalid("Step name must be a string"))?;
            parse_step_with_params(name, params)
        }

        _ => Err(invalid(format!("Invalid step format: {:?}", value))),
    }
}

fn params<T: serde::de::DeserializeOwned>(name: &str, value: &Value) -> Result<T> {
    serde_yaml::from_value(value.clone()).map_err(|e| invalid(format!("{}: {}", name, e)))
}

fn string_param(name: &str, value: &Value) -> Result<String> {
    match value {
        Value::String(s) => Ok(s.clone()),
        _ => Err(invalid(format!("{} expects a string", name))),
    }
}

fn parse_step_with_params(name: &str, value: &Value) -> Result<Step> {
    let empty = value.is_null() || value.as_mapping().map(|m| m.is_empty()).unwrap_or(false);

    let step = match name {
        "navigate" | "goto" => {
            if empty {
                Step::Navigate(NavigateParams::default())
            } else if let Value::String(path) = value {
                Step::Navigate(NavigateParams {
                    path: Some(path.clone()),
                    ..NavigateParams::default()
                })
            } else {
                Step::Navigate(params(name, value)?)
            }
        }

        "setViewport" | "viewport" => Step::SetViewport(params::<Viewport>(name, value)?),

        "click" | "tapOn" => Step::Click(string_param(name, value)?),

        "select" => Step::Select(params::<SelectParams>(name, value)?),

        "upload" | "uploadFile" => Step::Upload(params::<UploadParams>(name, value)?),

        "type" | "inputText" => Step::Type(params::<TypeParams>(name, value)?),

        "evaluate" | "eval" => Step::Evaluate(string_param(name, value)?),

        "waitFor" | "waitUntil" => {
            if let Value::String(predicate) = value {
                Step::WaitFor(WaitForParams {
                    name: None,
                    predicate: predicate.clone(),
                    timeout_ms: None,
                    gate: false,
                })
            } else {
                Step::WaitFor(params(name, value)?)
            }
        }

        "sleep" | "wait" => Step::Sleep(params::<u64>(name, value)?),

        "screenshot" | "takeScreenshot" => {
            if let Value::String(path) = value {
                Step::Screenshot(ScreenshotParams {
                    path: path.clone(),
                    full_page: false,
                })
            } else {
                Step::Screenshot(params(name, value)?)
            }
        }

        "assert" => Step::Assert(params::<AssertParams>(name, value)?),

        "assertEquals" => Step::AssertEquals(params::<AssertEqualsParams>(name, value)?),

        "assertFixture" => Step::AssertFixture(params::<AssertFixtureParams>(name, value)?),

        "presetTable" => {
            let table: PresetTableParams = params(name, value)?;
            if table.rows.is_empty() {
                return Err(invalid("presetTable needs at least one row"));
            }
            Step::PresetTable(table)
        }

        "log" => Step::Log(string_param(name, value)?),

        "closeSession" | "close" if empty => Step::CloseSession,

        _ => return Err(invalid(format!("Unknown step: {}", name))),
    };

    Ok(step)
}
