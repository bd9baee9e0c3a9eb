pub mod compare;
pub mod context;
pub mod executor;
pub mod wait;

use std::future::Future;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;

pub use context::RunContext;
pub use executor::{GroupResult, ScenarioRunner};
pub use wait::ConditionWaiter;

use crate::driver::traits::{BrowserDriver, DriverResult, LaunchOptions};
use crate::driver::web::PlaywrightDriver;
use crate::error::Result;
use crate::parser::types::{Suite, Target};
use crate::report::{console, Report};
use crate::server::{AssetServer, ServerHandle};
use crate::utils::config::HarnessConfig;

/// Launch options for a suite: a CLI/env headless setting wins over the
/// suite's, which wins over the headed default; suite args are appended
pub fn launch_options(suite: &Suite, config: &HarnessConfig) -> LaunchOptions {
    let mut options = LaunchOptions {
        headless: config.headless.or(suite.browser.headless).unwrap_or(false),
        ..LaunchOptions::default()
    };
    options.args.extend(suite.browser.args.iter().cloned());
    options
}

/// Run every group with an already-launched browser, then release its pages
pub async fn execute_suite(
    browser: &dyn BrowserDriver,
    suite: &Suite,
    context: RunContext,
    linger: Duration,
) -> Report {
    let mut runner = ScenarioRunner::new(browser, context, Report::new(&suite.name));
    runner.run(suite).await;

    if !linger.is_zero() {
        println!("\nBrowser will close in {} seconds...", linger.as_secs_f32());
        tokio::time::sleep(linger).await;
    }

    runner.finish().await
}

async fn stop_server(server: Option<ServerHandle>) {
    if let Some(mut handle) = server {
        handle.stop().await;
    }
}

/// Full lifecycle with Chromium through Playwright.
///
/// Bind and launch failures are returned as errors after whatever was
/// already started has been stopped. Everything that happens inside the
/// scenarios ends up in the report instead.
pub async fn run_suite(
    suite: &Suite,
    config: &HarnessConfig,
    interrupted: Arc<AtomicBool>,
) -> Result<Report> {
    run_suite_with(suite, config, interrupted, |options| async move {
        PlaywrightDriver::launch(&options).await
    })
    .await
}

/// Serve (if needed), launch through `launch`, run, and always tear down
pub async fn run_suite_with<B, F, Fut>(
    suite: &Suite,
    config: &HarnessConfig,
    interrupted: Arc<AtomicBool>,
    launch: F,
) -> Result<Report>
where
    B: BrowserDriver,
    F: FnOnce(LaunchOptions) -> Fut,
    Fut: Future<Output = DriverResult<B>>,
{
    console::print_banner(&suite.name);
    if let Some(ref description) = suite.description {
        log::debug!("{}", description.trim());
    }

    let app_root = tokio::fs::canonicalize(&config.app_root).await?;

    let mut server = None;
    let (origin, entry_url) = match suite.target {
        Target::Http => {
            let port = config.port_override.unwrap_or(suite.port);
            let handle = AssetServer::new(&app_root)
                .with_index(&suite.entry)
                .start(port)
                .await?;
            let base = handle.base_url();
            server = Some(handle);
            (base.clone(), base)
        }
        Target::File => {
            let origin = context::file_origin(&app_root);
            let entry = format!("{}{}", origin, suite.entry);
            (origin, entry)
        }
    };

    let browser = match launch(launch_options(suite, config)).await {
        Ok(browser) => browser,
        Err(e) => {
            stop_server(server).await;
            return Err(e.into());
        }
    };

    let context = RunContext::new(config, &app_root, origin, entry_url).with_interrupt(interrupted);
    let report = execute_suite(&browser, suite, context, config.linger).await;

    if let Err(e) = browser.close().await {
        log::warn!("Failed to close browser: {}", e);
    }
    stop_server(server).await;

    Ok(report)
}
