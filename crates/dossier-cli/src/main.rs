//! Dossier CLI: operator commands against the configured storage and database.
//!
//! Configuration comes from the environment (and `.env`), as for the service.

use anyhow::Context;
use clap::{Parser, Subcommand};
use dossier_cli::{health_exit_code, to_pretty_json};
use dossier_core::{Config, RequestContext};
use dossier_infra::{init_telemetry, shutdown_telemetry};
use dossier_services::{JobScheduler, Services};

#[derive(Parser)]
#[command(name = "dossier", about = "Dossier file storage operations")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Probe every storage backend and the metadata store
    Health,
    /// Run one reconciliation pass over all metadata
    Reconcile,
    /// Run the periodic jobs until Ctrl-C.
    ///
    /// The notification digest only covers notices recorded in this process.
    /// Services hosting the orchestrator should schedule jobs in-process with
    /// `Services::schedule_jobs` so their notices reach the digest.
    RunJobs,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_telemetry()?;
    let cli = Cli::parse();

    let config = Config::from_env().context("Failed to load configuration")?;
    let services = Services::from_config(&config)
        .await
        .context("Failed to initialize services")?;

    let ctx = RequestContext::new();
    let cancel = ctx.token().clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Ctrl-C received, shutting down");
            cancel.cancel();
        }
    });

    let mut exit_code = 0;
    match cli.command {
        Commands::Health => {
            let report = services.orchestrator.check_health(&ctx).await;
            println!("{}", to_pretty_json(&report)?);
            exit_code = health_exit_code(&report);
        }
        Commands::Reconcile => {
            let report = services.reconciliation.run(&ctx).await;
            println!("{}", to_pretty_json(&report)?);
        }
        Commands::RunJobs => {
            let mut scheduler = JobScheduler::with_shutdown(ctx.token().clone());
            services.schedule_jobs(&config, &mut scheduler);
            tracing::info!(jobs = scheduler.job_count(), "Jobs running, press Ctrl-C to stop");

            ctx.token().cancelled().await;
            scheduler.shutdown().await;
        }
    }

    shutdown_telemetry().await;
    if exit_code != 0 {
        std::process::exit(exit_code);
    }
    Ok(())
}
