use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::DriverError;

pub type DriverResult<T> = std::result::Result<T, DriverError>;

/// Page size in CSS pixels
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
    #[serde(default)]
    pub device_scale_factor: Option<f64>,
}

impl Viewport {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            device_scale_factor: None,
        }
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(1920, 1080)
    }
}

/// Readiness condition a navigation waits for
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum ReadyState {
    Load,
    DomContentLoaded,
    #[default]
    #[serde(alias = "networkidle2", alias = "networkidle")]
    NetworkIdle,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScreenshotOptions {
    #[serde(default)]
    pub full_page: bool,
}

/// Browser launch options
#[derive(Debug, Clone)]
pub struct LaunchOptions {
    pub headless: bool,
    pub args: Vec<String>,
}

impl Default for LaunchOptions {
    fn default() -> Self {
        Self {
            headless: false,
            args: vec![
                "--autoplay-policy=no-user-gesture-required".to_string(),
                "--use-fake-ui-for-media-stream".to_string(),
                "--use-fake-device-for-media-stream".to_string(),
            ],
        }
    }
}

/// Console message or uncaught error surfaced by a page
#[derive(Debug, Clone, PartialEq)]
pub enum PageEvent {
    Console(String),
    Error(String),
}

/// A controllable browser instance
#[async_trait]
pub trait BrowserDriver: Send + Sync {
    /// Open a new page (tab) with its own viewport
    async fn new_page(&self, label: &str, viewport: Viewport) -> DriverResult<Box<dyn PageSession>>;

    /// Close the browser and every page it owns
    async fn close(&self) -> DriverResult<()>;
}

/// One browser tab
///
/// All reads go through [`PageSession::evaluate`], which returns plain JSON
/// data; no live page references cross this boundary.
#[async_trait]
pub trait PageSession: Send + Sync {
    /// Name used in logs and outcome details
    fn label(&self) -> &str;

    /// Navigate and wait for `ready`, bounded by `timeout`
    async fn navigate(&self, url: &str, ready: ReadyState, timeout: Duration) -> DriverResult<()>;

    async fn set_viewport(&self, viewport: Viewport) -> DriverResult<()>;

    async fn click(&self, selector: &str) -> DriverResult<()>;

    /// Choose `value` in a `<select>` and fire `input`/`change`
    async fn select(&self, selector: &str, value: &str) -> DriverResult<()>;

    /// Attach a local file to an `<input type=file>`
    async fn upload_file(&self, selector: &str, path: &Path) -> DriverResult<()>;

    async fn type_text(&self, selector: &str, text: &str) -> DriverResult<()>;

    /// Evaluate an expression (or function source) in the page
    async fn evaluate(&self, expression: &str) -> DriverResult<serde_json::Value>;

    async fn screenshot(&self, path: &Path, options: &ScreenshotOptions) -> DriverResult<()>;

    /// Console and error events seen since the last call
    async fn drain_events(&self) -> Vec<PageEvent> {
        Vec::new()
    }

    async fn close(&self) -> DriverResult<()>;
}

/// A file attached through [`PageSession::upload_file`]
#[derive(Debug, Clone)]
pub struct UploadPayload {
    pub name: String,
    pub mime: &'static str,
    pub base64: String,
}

impl UploadPayload {
    pub fn read(path: &Path) -> DriverResult<Self> {
        use base64::Engine;

        let bytes = std::fs::read(path)
            .map_err(|e| DriverError::Other(format!("Cannot read {}: {}", path.display(), e)))?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "upload.bin".to_string());

        Ok(Self {
            name,
            mime: crate::server::files::content_type_for(path),
            base64: base64::engine::general_purpose::STANDARD.encode(bytes),
        })
    }
}

/// Resolve a screenshot path, creating its parent directory
pub fn prepare_output_path(path: &Path) -> DriverResult<PathBuf> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| DriverError::Screenshot {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
    }
    Ok(path.to_path_buf())
}

/// JavaScript truthiness of an evaluated value
pub fn is_truthy(value: &serde_json::Value) -> bool {
    use serde_json::Value;
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0 && !f.is_nan()).unwrap_or(false),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}
