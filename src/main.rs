use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use murwren_e2e::parser::{self, Suite};
use murwren_e2e::server::AssetServer;
use murwren_e2e::utils::HarnessConfig;
use murwren_e2e::{report, runner};

#[derive(Parser)]
#[command(name = "murwren-e2e")]
#[command(version = "0.1.0")]
#[command(about = "End-to-end browser tests for the Edward R. Mur-Wren page", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Options shared by every suite command
#[derive(Args, Debug, Clone, Default)]
struct RunArgs {
    /// Directory holding index.html and the sample fixture
    #[arg(long)]
    root: Option<PathBuf>,

    /// Directory for screenshots
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Run the browser without a window
    #[arg(long, default_value = "false")]
    headless: bool,

    /// Show the browser window even if the suite or environment asks for headless
    #[arg(long, default_value = "false", conflicts_with = "headless")]
    headed: bool,

    /// Asset server port (suites served over HTTP)
    #[arg(short, long)]
    port: Option<u16>,

    /// Also write the outcomes as JSON
    #[arg(long)]
    json: Option<PathBuf>,

    /// Also write a JUnit XML report
    #[arg(long)]
    junit: Option<PathBuf>,
}

impl RunArgs {
    fn config(&self) -> HarnessConfig {
        let mut config = HarnessConfig::default();
        if let Some(ref root) = self.root {
            config.app_root = root.clone();
        }
        if let Some(ref output) = self.output {
            config.output_dir = output.clone();
        }
        if self.headless {
            config.headless = Some(true);
        } else if self.headed {
            config.headless = Some(false);
        }
        if self.port.is_some() {
            config.port_override = self.port;
        }
        config
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Layout, controls, presets, playback, rendering and styling (file://)
    FullSuite(RunArgs),

    /// Sample loading, presets, playback and rendering over a local HTTP server
    ServeAndTest(RunArgs),

    /// Playback and rendering after uploading the sample through the file input
    Upload(RunArgs),

    /// Run a suite from a YAML file
    Run {
        /// Path to the suite file
        path: PathBuf,

        #[command(flatten)]
        args: RunArgs,
    },

    /// Serve the app directory until Ctrl+C
    Serve {
        /// Directory to serve
        #[arg(long)]
        root: Option<PathBuf>,

        /// Server port
        #[arg(short, long, default_value = "8888")]
        port: u16,
    },

    /// List built-in suites
    List,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    let code = match execute(cli.command).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("\n{} {:#}", "Fatal error:".red().bold(), e);
            1
        }
    };

    std::process::exit(code)
}

async fn execute(command: Commands) -> anyhow::Result<i32> {
    match command {
        Commands::FullSuite(args) => run_and_report(parser::builtin_suite("full-suite")?, args).await,
        Commands::ServeAndTest(args) => {
            run_and_report(parser::builtin_suite("serve-and-test")?, args).await
        }
        Commands::Upload(args) => run_and_report(parser::builtin_suite("upload")?, args).await,

        Commands::Run { path, args } => {
            println!(
                "{} Running suite from: {}",
                "▶".green().bold(),
                path.display()
            );
            run_and_report(parser::parse_suite_file(&path)?, args).await
        }

        Commands::Serve { root, port } => {
            let root = root.unwrap_or_else(|| HarnessConfig::default().app_root);
            let mut handle = AssetServer::new(root).start(port).await?;
            println!(
                "{} Serving {} at {}",
                "🌐".to_string().blue(),
                handle.root().display(),
                handle.base_url().cyan()
            );
            println!("   Press Ctrl+C to stop.");

            tokio::signal::ctrl_c().await?;
            handle.stop().await;
            Ok(0)
        }

        Commands::List => {
            println!("{} Built-in suites:", "📋".to_string().blue());
            for (name, _) in parser::BUILTIN_SUITES {
                let suite = parser::builtin_suite(name)?;
                println!(
                    "  {:<16} {} ({} groups)",
                    name.cyan(),
                    suite.name,
                    suite.groups.len()
                );
            }
            Ok(0)
        }
    }
}

async fn run_and_report(suite: Suite, args: RunArgs) -> anyhow::Result<i32> {
    let config = args.config();

    let interrupted = Arc::new(AtomicBool::new(false));
    let handler_flag = interrupted.clone();
    ctrlc::set_handler(move || {
        println!("\n{} Interrupted, finishing current step...", "⏹️ ".yellow());
        handler_flag.store(true, Ordering::SeqCst);
    })?;

    let report = runner::run_suite(&suite, &config, interrupted).await?;
    print!("{}", report.render());

    let run_report = report.to_run_report();
    if let Some(ref path) = args.json {
        report::json::write_report(&run_report, path)?;
        println!("{} JSON report: {}", "📊".to_string().blue(), path.display());
    }
    if let Some(ref path) = args.junit {
        report::junit::write_report(&run_report, path)?;
        println!("{} JUnit report: {}", "📊".to_string().blue(), path.display());
    }

    println!("\n👋 {} complete!\n", suite.name);
    Ok(report.exit_code())
}
