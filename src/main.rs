use clap::Parser;
use std::error::Error;
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use page_checks::browser::{DriverService, WebDriverProvider, webdriver_runtime};
use page_checks::config::{Config, ENV_TARGET_URL};
use page_checks::harness::{CheckContext, Runner, default_registry, select};
use page_checks::snapshot::CapturePipeline;

/// Page Checks - structural and visual checks against a live web page
#[derive(Parser, Debug)]
#[command(
    name = "page-checks",
    about = "Run the check battery against a web page through WebDriver",
    after_help = "ENVIRONMENT VARIABLES:\n\
        PAGE_CHECKS_URL                  Page under test\n\
        PAGE_CHECKS_WEBDRIVER_URL        WebDriver endpoint\n\
        PAGE_CHECKS_DRIVER_PATH          Driver binary launched when the endpoint is down\n\
        PAGE_CHECKS_HEADLESS             Run the browser headless\n\
        PAGE_CHECKS_DOWNLOADS_DIR        Capture and reference image directory\n\
        PAGE_CHECKS_ZOOM                 Zoom-out percentage before capture (0 disables)\n\
        PAGE_CHECKS_SETTLE_INTERVAL_MS   Delay between layout samples\n\
        PAGE_CHECKS_SETTLE_TIMEOUT_MS    Give up waiting for layout after\n\
        PAGE_CHECKS_DEBUG                Emit DEBUG diagnostics\n\
        RUST_LOG                         Operational log filter (stderr)"
)]
struct Args {
    /// Page to check (default: the challenging-DOM demo page)
    #[arg(long, env = ENV_TARGET_URL)]
    url: Option<String>,

    /// Run only this check; repeat to select several
    #[arg(long = "only", value_name = "ID")]
    only: Vec<String>,

    /// List registered checks and exit
    #[arg(long)]
    list: bool,

    /// Write a JSON report of the run
    #[arg(long, value_name = "PATH")]
    report: Option<PathBuf>,

    /// Suppress DEBUG diagnostics
    #[arg(long)]
    no_debug: bool,
}

/// Report lines already go to stdout; keep their `tracing` mirror off stderr
const DEFAULT_LOG_FILTER: &str = "warn,diagnostics=off";

fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .with_writer(io::stderr)
        .init();
}

fn main() -> ExitCode {
    init_logging();
    let args = Args::parse();

    match run(args) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::from(2)
        }
    }
}

fn run(args: Args) -> Result<ExitCode, Box<dyn Error>> {
    let descriptors = select(default_registry(), &args.only)?;

    if args.list {
        for descriptor in &descriptors {
            println!("{:<32} {}", descriptor.id, descriptor.summary);
        }
        return Ok(ExitCode::SUCCESS);
    }

    let mut config = Config::from_env();
    if let Some(url) = args.url {
        config.target.url = url;
    }
    if args.no_debug {
        config.diagnostics.allow_debug = false;
    }

    // Without a listening driver every check fails construction on its own.
    let _driver = match DriverService::ensure(&config.driver) {
        Ok(service) => Some(service),
        Err(e) => {
            tracing::warn!(error = %e, "WebDriver service unavailable");
            None
        }
    };

    let runtime = Arc::new(webdriver_runtime()?);
    let provider = WebDriverProvider::new(runtime, config.driver.clone());
    let context = CheckContext::new(config.target.url.clone(), CapturePipeline::new(config.capture));

    let mut runner = Runner::new(
        descriptors,
        context,
        Box::new(provider),
        io::stdout(),
        config.diagnostics.allow_debug,
    );
    let report = runner.run();

    if let Some(path) = args.report {
        report.write_json(&path)?;
        tracing::info!(path = %path.display(), "report written");
    }

    Ok(ExitCode::from(report.exit_code()))
}
