//! Browser driver backed by Playwright
//!
//! Each page session gets its own browser context so that desktop and mobile
//! viewports (and device scale factors) stay independent.

use async_trait::async_trait;
use playwright::api::{Browser, BrowserContext, DocumentLoadState, Page};
use playwright::Playwright;
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

use crate::driver::traits::{
    prepare_output_path, BrowserDriver, DriverResult, LaunchOptions, PageEvent, PageSession,
    ReadyState, ScreenshotOptions, UploadPayload, Viewport,
};
use crate::error::DriverError;

/// Console lines the browser emits on its own
const NOISY_CONSOLE: &[&str] = &["DevTools", "Autofill"];

/// Console/error recorder, registered as a context init script so it runs in
/// every document before the page's own scripts; drained by `drain_events`
const EVENT_HOOK_SCRIPT: &str = r#"(() => {
    if (window.__murwrenEvents) return;
    window.__murwrenEvents = [];
    for (const level of ['log', 'info', 'warn', 'error']) {
        const original = console[level].bind(console);
        console[level] = (...args) => {
            try { window.__murwrenEvents.push({ kind: 'console', text: args.map(String).join(' ') }); } catch (_) {}
            original(...args);
        };
    }
    window.addEventListener('error', (e) => {
        window.__murwrenEvents.push({ kind: 'error', text: String(e.message || e) });
    });
    window.addEventListener('unhandledrejection', (e) => {
        window.__murwrenEvents.push({ kind: 'error', text: String(e.reason) });
    });
})();"#;

const DRAIN_EVENTS_JS: &str = r#"() => {
    const events = window.__murwrenEvents || [];
    if (window.__murwrenEvents) window.__murwrenEvents = [];
    return events;
}"#;

const SELECT_JS: &str = r#"([selector, value]) => {
    const el = document.querySelector(selector);
    if (!el) throw new Error('No element matches ' + selector);
    if (el.tagName !== 'SELECT') throw new Error('Element is not a <select>: ' + selector);
    const option = Array.from(el.options).find((o) => o.value === value);
    if (!option) throw new Error('No option with value ' + value);
    el.value = value;
    el.dispatchEvent(new Event('input', { bubbles: true }));
    el.dispatchEvent(new Event('change', { bubbles: true }));
    return el.value;
}"#;

const UPLOAD_JS: &str = r#"([selector, name, mime, data]) => {
    const input = document.querySelector(selector);
    if (!input) throw new Error('No element matches ' + selector);
    const bytes = Uint8Array.from(atob(data), (c) => c.charCodeAt(0));
    const transfer = new DataTransfer();
    transfer.items.add(new File([bytes], name, { type: mime }));
    input.files = transfer.files;
    input.dispatchEvent(new Event('input', { bubbles: true }));
    input.dispatchEvent(new Event('change', { bubbles: true }));
    return input.files.length;
}"#;

/// Playwright-backed browser
pub struct PlaywrightDriver {
    #[allow(dead_code)]
    playwright: Arc<Playwright>,
    browser: Arc<Browser>,
}

impl PlaywrightDriver {
    /// Start Playwright and launch Chromium
    pub async fn launch(options: &LaunchOptions) -> DriverResult<Self> {
        let playwright = Playwright::initialize()
            .await
            .map_err(|e| DriverError::Launch(format!("Failed to initialize Playwright: {}", e)))?;

        let chromium = playwright.chromium();
        let mut launcher = chromium.launcher().headless(options.headless);

        let browser_path = find_browser_executable();
        if let Some(path) = &browser_path {
            log::info!("Using browser: {}", path.display());
            launcher = launcher.executable(path);
        }

        let mut args = vec![
            "--no-sandbox".to_string(),
            "--disable-dev-shm-usage".to_string(),
        ];
        args.extend(options.args.iter().cloned());
        launcher = launcher.args(&args);

        let browser = launcher
            .launch()
            .await
            .map_err(|e| DriverError::Launch(e.to_string()))?;

        log::info!(
            "Browser launched ({})",
            if options.headless { "headless" } else { "headed" }
        );

        Ok(Self {
            playwright: Arc::new(playwright),
            browser: Arc::new(browser),
        })
    }
}

#[async_trait]
impl BrowserDriver for PlaywrightDriver {
    async fn new_page(&self, label: &str, viewport: Viewport) -> DriverResult<Box<dyn PageSession>> {
        let mut builder = self
            .browser
            .context_builder()
            .viewport(Some(to_playwright_viewport(viewport)));
        if let Some(scale) = viewport.device_scale_factor {
            builder = builder.device_scale_factor(scale);
        }
        let context = builder
            .build()
            .await
            .map_err(|e| DriverError::Other(format!("Failed to create browser context: {}", e)))?;

        context
            .add_init_script(EVENT_HOOK_SCRIPT)
            .await
            .map_err(|e| DriverError::Other(format!("Failed to install console recorder: {}", e)))?;

        let page = context
            .new_page()
            .await
            .map_err(|e| DriverError::Other(format!("Failed to open page: {}", e)))?;

        Ok(Box::new(PlaywrightPage {
            label: label.to_string(),
            context,
            page: Mutex::new(page),
        }))
    }

    async fn close(&self) -> DriverResult<()> {
        self.browser
            .close()
            .await
            .map_err(|e| DriverError::Other(format!("Failed to close browser: {}", e)))
    }
}

/// One Playwright page in its own context
pub struct PlaywrightPage {
    label: String,
    context: BrowserContext,
    page: Mutex<Page>,
}

impl PlaywrightPage {
    async fn eval_with(&self, expression: &str, arg: Value) -> DriverResult<Value> {
        let page = self.page.lock().await;
        page.evaluate::<Value, Value>(expression, arg)
            .await
            .map_err(|e| DriverError::Evaluate(e.to_string()))
    }
}

#[async_trait]
impl PageSession for PlaywrightPage {
    fn label(&self) -> &str {
        &self.label
    }

    async fn navigate(&self, url: &str, ready: ReadyState, timeout: Duration) -> DriverResult<()> {
        let page = self.page.lock().await;
        page.goto_builder(url)
            .wait_until(to_load_state(ready))
            .timeout(timeout.as_millis() as f64)
            .goto()
            .await
            .map_err(|e| DriverError::Navigation {
                url: url.to_string(),
                message: e.to_string(),
            })?;
        Ok(())
    }

    async fn set_viewport(&self, viewport: Viewport) -> DriverResult<()> {
        let page = self.page.lock().await;
        page.set_viewport_size(to_playwright_viewport(viewport))
            .await
            .map_err(|e| DriverError::Other(format!("Failed to set viewport: {}", e)))
    }

    async fn click(&self, selector: &str) -> DriverResult<()> {
        let page = self.page.lock().await;
        page.click_builder(selector)
            .click()
            .await
            .map_err(|e| DriverError::element("click", selector, e))
    }

    async fn select(&self, selector: &str, value: &str) -> DriverResult<()> {
        self.eval_with(SELECT_JS, json!([selector, value]))
            .await
            .map(|_| ())
            .map_err(|e| DriverError::element("select", selector, e))
    }

    async fn upload_file(&self, selector: &str, path: &Path) -> DriverResult<()> {
        let payload = UploadPayload::read(path)?;
        self.eval_with(
            UPLOAD_JS,
            json!([selector, payload.name, payload.mime, payload.base64]),
        )
        .await
        .map(|_| ())
        .map_err(|e| DriverError::element("upload", selector, e))
    }

    async fn type_text(&self, selector: &str, text: &str) -> DriverResult<()> {
        let page = self.page.lock().await;
        let element = page
            .query_selector(selector)
            .await
            .map_err(|e| DriverError::element("type", selector, e))?
            .ok_or_else(|| DriverError::element("type", selector, "element not found"))?;
        element
            .fill_builder(text)
            .fill()
            .await
            .map_err(|e| DriverError::element("type", selector, e))
    }

    async fn evaluate(&self, expression: &str) -> DriverResult<Value> {
        self.eval_with(expression, Value::Null).await
    }

    async fn screenshot(&self, path: &Path, options: &ScreenshotOptions) -> DriverResult<()> {
        let path_buf = prepare_output_path(path)?;
        let page = self.page.lock().await;
        page.screenshot_builder()
            .path(path_buf.clone())
            .full_page(options.full_page)
            .screenshot()
            .await
            .map(|_| ())
            .map_err(|e| DriverError::Screenshot {
                path: path_buf,
                message: e.to_string(),
            })
    }

    async fn drain_events(&self) -> Vec<PageEvent> {
        let value = match self.eval_with(DRAIN_EVENTS_JS, Value::Null).await {
            Ok(v) => v,
            Err(_) => return Vec::new(),
        };
        parse_events(&value)
    }

    async fn close(&self) -> DriverResult<()> {
        {
            let page = self.page.lock().await;
            page.close(None)
                .await
                .map_err(|e| DriverError::Other(format!("Failed to close page: {}", e)))?;
        }
        self.context
            .close()
            .await
            .map_err(|e| DriverError::Other(format!("Failed to close context: {}", e)))
    }
}

fn to_playwright_viewport(viewport: Viewport) -> playwright::api::Viewport {
    playwright::api::Viewport {
        width: viewport.width as i32,
        height: viewport.height as i32,
    }
}

fn to_load_state(ready: ReadyState) -> DocumentLoadState {
    match ready {
        ReadyState::Load => DocumentLoadState::Load,
        ReadyState::DomContentLoaded => DocumentLoadState::DomContentLoaded,
        ReadyState::NetworkIdle => DocumentLoadState::NetworkIdle,
    }
}

/// Turn recorded `{kind, text}` entries into events, dropping browser noise
fn parse_events(value: &Value) -> Vec<PageEvent> {
    value
        .as_array()
        .map(|entries| {
            entries
                .iter()
                .filter_map(|entry| {
                    let text = entry.get("text")?.as_str()?.to_string();
                    match entry.get("kind")?.as_str()? {
                        "error" => Some(PageEvent::Error(text)),
                        _ if NOISY_CONSOLE.iter().any(|n| text.contains(n)) => None,
                        _ => Some(PageEvent::Console(text)),
                    }
                })
                .collect()
        })
        .unwrap_or_default()
}

/// Browser binary: explicit env override first, then common install locations
fn find_browser_executable() -> Option<PathBuf> {
    if let Some(path) = std::env::var_os("PLAYWRIGHT_CHROMIUM_EXECUTABLE_PATH") {
        return Some(PathBuf::from(path));
    }

    let common_paths = [
        "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
        "/usr/bin/google-chrome",
        "/usr/bin/google-chrome-stable",
        "/Applications/Chromium.app/Contents/MacOS/Chromium",
        "/usr/bin/chromium",
        "/usr/bin/chromium-browser",
    ];

    common_paths
        .iter()
        .map(Path::new)
        .find(|p| p.exists())
        .map(Path::to_path_buf)
}
