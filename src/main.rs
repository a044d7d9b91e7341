mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use log::{error, info};

use cdk_bootstrap::bootstrap::diagnostics::Reporter;
use cdk_bootstrap::bootstrap::executor::ProcessRunner;
use cdk_bootstrap::{BootstrapError, Outcome, ProcessEnv, RunOptions, ToolSettings, bootstrap};

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format(|buf, record| {
            use std::io::Write;
            writeln!(
                buf,
                "[{} {} {}:{}] {}",
                buf.timestamp_millis(),
                record.level(),
                record.file().unwrap_or("unknown"),
                record.line().unwrap_or(0),
                record.args()
            )
        })
        .init();

    let args = cli::Args::parse();

    let rt = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("FATAL: Failed to create Tokio runtime: {e}");
            std::process::exit(1);
        }
    };

    if let Err(e) = rt.block_on(real_main(args)) {
        error!("{e:#}");
        let code = e
            .downcast_ref::<BootstrapError>()
            .map_or(1, BootstrapError::exit_code);
        std::process::exit(code);
    }
}

async fn real_main(args: cli::Args) -> Result<()> {
    let tools = match &args.config {
        Some(path) => ToolSettings::load(path).map_err(BootstrapError::from)?,
        None => ToolSettings::default(),
    };
    let verbosity = args.verbosity.or(tools.verbosity).unwrap_or_default();
    let runner = ProcessRunner::new(tools.step_timeout());

    let options = RunOptions {
        work_dir: args.dir,
        tools,
        dry_run: args.dry_run,
    };

    let mut reporter = Reporter::stdout(verbosity);
    let outcome = bootstrap(&options, &ProcessEnv, &runner, &mut reporter)
        .await
        .with_context(|| format!("Bootstrap in {} failed", options.work_dir.display()))?;

    match outcome {
        Outcome::Skipped { .. } => {}
        Outcome::Planned(commands) => info!("Dry run planned {} commands", commands.len()),
        Outcome::Completed => info!("Bootstrap completed"),
    }
    Ok(())
}
