//! Invoke the compiled lambda handler directly for a table of routes.
//!
//! Exits with status 1 when any case fails.

use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;

use lambda_dev_server::config::resolve_config;
use lambda_dev_server::handler::WasmArtifactLoader;
use lambda_dev_server::harness::{self, Summary};
use lambda_dev_server::loader::ArtifactLoader;
use lambda_dev_server::observability;

#[derive(Parser)]
#[command(name = "test-lambda")]
#[command(about = "Run the lambda handler against synthetic GET events", long_about = None)]
#[command(after_help = "Examples:\n  \
    test-lambda                    # Run all tests\n  \
    test-lambda --filter=post      # Run only tests with \"post\" in description\n  \
    test-lambda /about /drafts     # Run ad-hoc routes")]
struct Cli {
    /// Run only tests whose description contains <TEXT> (case-insensitive)
    #[arg(long, value_name = "TEXT")]
    filter: Option<String>,

    /// Configuration file (defaults to ./lambda-dev.toml when present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Route paths to test instead of the configured table
    routes: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = resolve_config(cli.config.as_deref())?;
    observability::init(&config.observability);

    let table = &config.harness.routes;
    let cases = harness::select_cases(table, cli.filter.as_deref(), &cli.routes);

    let stdout = io::stdout();
    let mut out = stdout.lock();

    if cases.is_empty() {
        harness::render_no_match(&mut out, cli.filter.as_deref().unwrap_or_default(), table)?;
        return Ok(ExitCode::SUCCESS);
    }

    let artifact = Path::new(&config.artifact.path);
    let handler = WasmArtifactLoader::new().load(artifact)?;

    harness::render_header(
        &mut out,
        cli.filter.as_deref(),
        cases.len(),
        harness::candidate_count(table, &cli.routes),
    )?;

    let mut summary = Summary::default();
    for case in &cases {
        let report = harness::run_case(handler.clone(), case, &config.function).await;
        harness::render_case(&mut out, &report)?;
        summary.record(&report);
    }
    harness::render_summary(&mut out, &summary)?;
    out.flush()?;

    Ok(if summary.all_passed() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
