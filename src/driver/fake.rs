//! Scripted in-memory browser used by runner tests

use async_trait::async_trait;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use super::traits::{
    BrowserDriver, DriverResult, PageEvent, PageSession, ReadyState, ScreenshotOptions, Viewport,
};
use crate::error::DriverError;

/// Everything the fake saw, shared by the browser and its pages
#[derive(Debug, Default)]
pub struct FakeState {
    /// `"<page>: <action>"` in call order
    pub calls: Vec<String>,
    /// Current `<select>` values by selector
    pub selected: HashMap<String, String>,
    /// How many times each expression was evaluated
    pub evaluations: HashMap<String, usize>,
    pub events: Vec<PageEvent>,
    pub opened: Vec<String>,
    pub closed_pages: Vec<String>,
    pub browser_closed: bool,
}

impl FakeState {
    pub fn evaluations_of(&self, expression: &str) -> usize {
        self.evaluations.get(expression).copied().unwrap_or(0)
    }

    pub fn has_call(&self, needle: &str) -> bool {
        self.calls.iter().any(|c| c.contains(needle))
    }
}

type EvalFn = dyn Fn(&str, &FakeState) -> DriverResult<Value> + Send + Sync;

#[derive(Clone)]
pub struct FakeBrowser {
    state: Arc<Mutex<FakeState>>,
    eval: Arc<EvalFn>,
    missing: Arc<HashSet<String>>,
}

impl FakeBrowser {
    /// `eval` answers every `evaluate` call from the expression and current state
    pub fn new(eval: impl Fn(&str, &FakeState) -> DriverResult<Value> + Send + Sync + 'static) -> Self {
        Self {
            state: Arc::new(Mutex::new(FakeState::default())),
            eval: Arc::new(eval),
            missing: Arc::new(HashSet::new()),
        }
    }

    /// Make interactions with `selector` fail as if the element did not exist
    pub fn with_missing(mut self, selector: &str) -> Self {
        let mut missing = (*self.missing).clone();
        missing.insert(selector.to_string());
        self.missing = Arc::new(missing);
        self
    }

    pub fn push_event(&self, event: PageEvent) {
        self.state.lock().unwrap().events.push(event);
    }

    pub fn state(&self) -> std::sync::MutexGuard<'_, FakeState> {
        self.state.lock().unwrap()
    }
}

#[async_trait]
impl BrowserDriver for FakeBrowser {
    async fn new_page(&self, label: &str, viewport: Viewport) -> DriverResult<Box<dyn PageSession>> {
        let mut state = self.state.lock().unwrap();
        state.opened.push(label.to_string());
        state
            .calls
            .push(format!("{}: open {}x{}", label, viewport.width, viewport.height));
        Ok(Box::new(FakePage {
            label: label.to_string(),
            browser: self.clone(),
        }))
    }

    async fn close(&self) -> DriverResult<()> {
        self.state.lock().unwrap().browser_closed = true;
        Ok(())
    }
}

pub struct FakePage {
    label: String,
    browser: FakeBrowser,
}

impl FakePage {
    fn record(&self, action: String) {
        self.record_locked(action);
    }

    /// Record `action` and keep the state locked for a follow-up change
    fn record_locked(&self, action: String) -> std::sync::MutexGuard<'_, FakeState> {
        let mut state = self.browser.state.lock().unwrap();
        state.calls.push(format!("{}: {}", self.label, action));
        state
    }

    fn check(&self, action: &'static str, selector: &str) -> DriverResult<()> {
        if self.browser.missing.contains(selector) {
            return Err(DriverError::element(action, selector, "No node found for selector"));
        }
        Ok(())
    }
}

#[async_trait]
impl PageSession for FakePage {
    fn label(&self) -> &str {
        &self.label
    }

    async fn navigate(&self, url: &str, _ready: ReadyState, _timeout: Duration) -> DriverResult<()> {
        self.record(format!("navigate {}", url));
        Ok(())
    }

    async fn set_viewport(&self, viewport: Viewport) -> DriverResult<()> {
        self.record(format!("viewport {}x{}", viewport.width, viewport.height));
        Ok(())
    }

    async fn click(&self, selector: &str) -> DriverResult<()> {
        self.record(format!("click {}", selector));
        self.check("click", selector)
    }

    async fn select(&self, selector: &str, value: &str) -> DriverResult<()> {
        let mut state = self.record_locked(format!("select {} {}", selector, value));
        self.check("select", selector)?;
        state.selected.insert(selector.to_string(), value.to_string());
        Ok(())
    }

    async fn upload_file(&self, selector: &str, path: &Path) -> DriverResult<()> {
        self.record(format!("upload {} {}", selector, path.display()));
        self.check("upload", selector)
    }

    async fn type_text(&self, selector: &str, text: &str) -> DriverResult<()> {
        self.record(format!("type {} {}", selector, text));
        self.check("type", selector)
    }

    async fn evaluate(&self, expression: &str) -> DriverResult<Value> {
        let mut state = self.browser.state.lock().unwrap();
        *state.evaluations.entry(expression.to_string()).or_insert(0) += 1;
        (self.browser.eval)(expression, &state)
    }

    async fn screenshot(&self, path: &Path, options: &ScreenshotOptions) -> DriverResult<()> {
        self.record(format!("screenshot {} full={}", path.display(), options.full_page));
        Ok(())
    }

    async fn drain_events(&self) -> Vec<PageEvent> {
        std::mem::take(&mut self.browser.state.lock().unwrap().events)
    }

    async fn close(&self) -> DriverResult<()> {
        let mut state = self.record_locked("close".to_string());
        state.closed_pages.push(self.label.clone());
        Ok(())
    }
}
