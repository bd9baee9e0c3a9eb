use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::driver::traits::{ReadyState, Viewport};

/// Where the page under test is loaded from
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Target {
    /// `file://<app_root>/<entry>`
    #[default]
    File,
    /// `http://localhost:<port>/` served by the asset server
    Http,
}

/// Browser launch overrides for a suite
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BrowserSettings {
    #[serde(default)]
    pub headless: Option<bool>,
    #[serde(default)]
    pub args: Vec<String>,
}

/// A named page session and the viewport it opens with
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSpec {
    pub name: String,
    #[serde(default)]
    pub viewport: Viewport,
}

/// What a group needs before it can run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Requires {
    /// File under the app root that must exist
    #[serde(default)]
    pub fixture: Option<String>,
    /// Earlier group that must have finished without failures
    #[serde(default)]
    pub group: Option<String>,
}

/// A parsed scenario suite
#[derive(Debug, Clone)]
pub struct Suite {
    pub name: String,
    pub description: Option<String>,
    pub target: Target,
    pub port: u16,
    pub entry: String,
    pub browser: BrowserSettings,
    pub sessions: Vec<SessionSpec>,
    pub groups: Vec<Group>,
}

impl Suite {
    pub fn session(&self, name: &str) -> Option<&SessionSpec> {
        self.sessions.iter().find(|s| s.name == name)
    }
}

/// An ordered list of steps run against one session
#[derive(Debug, Clone)]
pub struct Group {
    pub name: String,
    pub session: String,
    pub requires: Requires,
    pub steps: Vec<Step>,
}

/// One scripted interaction or assertion
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    Navigate(NavigateParams),
    SetViewport(Viewport),
    Click(String),
    Select(SelectParams),
    Upload(UploadParams),
    Type(TypeParams),
    Evaluate(String),
    WaitFor(WaitForParams),
    Sleep(u64),
    Screenshot(ScreenshotParams),
    Assert(AssertParams),
    AssertEquals(AssertEqualsParams),
    AssertFixture(AssertFixtureParams),
    PresetTable(PresetTableParams),
    Log(String),
    CloseSession,
}

impl Step {
    /// Short human description used when a step fails outright
    pub fn describe(&self) -> String {
        match self {
            Step::Navigate(p) => format!("navigate to {}", p.path.as_deref().unwrap_or("entry")),
            Step::SetViewport(v) => format!("set viewport {}x{}", v.width, v.height),
            Step::Click(selector) => format!("click '{}'", selector),
            Step::Select(p) => format!("select '{}' in '{}'", p.value, p.selector),
            Step::Upload(p) => format!("upload {} to '{}'", p.fixture, p.selector),
            Step::Type(p) => format!("type into '{}'", p.selector),
            Step::Evaluate(_) => "evaluate script".to_string(),
            Step::WaitFor(p) => p.name.clone().unwrap_or_else(|| "wait for condition".to_string()),
            Step::Sleep(ms) => format!("sleep {}ms", ms),
            Step::Screenshot(p) => format!("screenshot {}", p.path),
            Step::Assert(p) => p.name.clone(),
            Step::AssertEquals(p) => p.name.clone(),
            Step::AssertFixture(p) => p.name.clone(),
            Step::PresetTable(p) => format!("preset table on '{}'", p.selector),
            Step::Log(_) => "log".to_string(),
            Step::CloseSession => "close session".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NavigateParams {
    /// Path relative to the target origin; the suite entry when absent
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub wait_until: ReadyState,
    #[serde(default)]
    pub timeout_ms: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectParams {
    pub selector: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadParams {
    pub selector: String,
    /// File under the app root
    pub fixture: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeParams {
    pub selector: String,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WaitForParams {
    /// Outcome name recorded when the wait times out
    #[serde(default)]
    pub name: Option<String>,
    pub predicate: String,
    #[serde(default)]
    pub timeout_ms: Option<u64>,
    /// A timeout skips the rest of the group
    #[serde(default)]
    pub gate: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScreenshotParams {
    pub path: String,
    #[serde(default)]
    pub full_page: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssertParams {
    pub name: String,
    pub expression: String,
    /// Expression whose value explains a failure
    #[serde(default)]
    pub detail: Option<String>,
    /// Keep polling for up to this long before failing
    #[serde(default)]
    pub within_ms: Option<u64>,
    /// A failure skips the rest of the group
    #[serde(default)]
    pub gate: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssertEqualsParams {
    pub name: String,
    pub expression: String,
    pub expected: Value,
    #[serde(default)]
    pub within_ms: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssertFixtureParams {
    pub name: String,
    pub fixture: String,
    #[serde(default)]
    pub gate: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresetTableParams {
    /// The `<select>` holding preset names
    pub selector: String,
    /// Outcome name template; `{name}` is replaced by the row name
    #[serde(default)]
    pub label: Option<String>,
    /// Expression returning an object of current parameter values
    pub read: String,
    pub rows: Vec<PresetRow>,
    #[serde(default)]
    pub timeout_ms: Option<u64>,
}

impl PresetTableParams {
    pub fn label_for(&self, row: &PresetRow) -> String {
        self.label
            .as_deref()
            .unwrap_or("Preset \"{name}\" applies correct values")
            .replace("{name}", &row.name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PresetRow {
    pub name: String,
    pub expected: BTreeMap<String, Value>,
}
