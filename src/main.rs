//! vault-deploy: fetch cluster credentials from Vault and deploy an app

use clap::{Parser, Subcommand};
use color_eyre::Result;
use color_eyre::eyre::eyre;
use std::fs::File;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::Level;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::{EnvFilter, prelude::*};
use vault_deploy_core::{DeployConfig, KubeConnector, deployment, fetch};
use vault_deploy_jobs::{DeployContext, JobSpec, Pipeline, RunReport, standard_pipeline};

/// vault-deploy: run the Vault → Kubernetes deployment jobs
#[derive(Parser, Debug)]
#[command(name = "vault-deploy")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to config file (default: <config_dir>/vault-deploy/config.yaml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// Log file path (default: stderr)
    #[arg(long)]
    log_file: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List registered jobs in execution order
    Jobs {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// Run all jobs in priority order
    Run {
        /// Print the run report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Read both secrets from Vault without writing files or touching the cluster
    Check,
    /// Print the effective configuration (token redacted)
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize error handling
    color_eyre::install()?;

    init_logging(cli.debug, cli.log_file.as_deref())?;

    // Install the ring crypto provider for rustls
    if rustls::crypto::ring::default_provider()
        .install_default()
        .is_err()
    {
        tracing::debug!("rustls crypto provider already installed");
    }

    let config = Arc::new(DeployConfig::load(cli.config.as_deref())?);
    tracing::debug!(
        "Deploying {} to namespace {} from {}",
        config.app.name,
        config.app.namespace(),
        config.vault.address
    );

    match cli.command {
        Commands::Jobs { json } => {
            let jobs = pipeline(&config)?.jobs();
            if json {
                println!("{}", serde_json::to_string_pretty(&jobs)?);
            } else {
                print_jobs(&jobs);
            }
        }
        Commands::Run { json } => {
            tracing::info!("Starting deployment of {}", config.app.name);
            let report = pipeline(&config)?.run_all().await;

            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print_report(&report);
            }

            if let Some(failed) = report.failure() {
                return Err(eyre!(
                    "job '{}' failed: {}",
                    failed.spec.title,
                    failed.error.as_deref().unwrap_or("unknown error")
                ));
            }
            tracing::info!("Deployment finished");
        }
        Commands::Check => {
            let vault = fetch::connect(&config.vault)?;
            let record = fetch::fetch_secrets(&vault, &config).await?;
            println!(
                "kubeconfig: {} bytes from {}",
                record.kube_config.len(),
                config.vault.kube_conf_path
            );
            println!(
                "version:    {:?} from {}",
                record.version, config.vault.app_version_path
            );
            let image = deployment::image_reference(&config.app.name, record.version.as_bytes())?;
            println!("image:      {}", image);
        }
        Commands::Config => {
            print!("{}", config.to_redacted_yaml()?);
        }
    }

    Ok(())
}

fn pipeline(config: &Arc<DeployConfig>) -> Result<Pipeline> {
    let vault = fetch::connect(&config.vault)?;
    let ctx = DeployContext::new(config.clone(), Arc::new(vault), Arc::new(KubeConnector));
    Ok(standard_pipeline(ctx)?)
}

fn init_logging(debug: bool, log_file: Option<&str>) -> Result<()> {
    // Build filter: set base level, but quiet down noisy HTTP libraries
    let filter = if debug {
        EnvFilter::from_default_env()
            .add_directive(Level::DEBUG.into())
            .add_directive("h2=info".parse()?)
            .add_directive("hyper=info".parse()?)
            .add_directive("hyper_util=info".parse()?)
            .add_directive("tower=info".parse()?)
            .add_directive("rustls=info".parse()?)
            .add_directive("kube_client=info".parse()?)
            .add_directive("reqwest=info".parse()?)
    } else {
        EnvFilter::from_default_env().add_directive(Level::INFO.into())
    };

    let writer = match log_file {
        Some(path) => BoxMakeWriter::new(Arc::new(File::create(path)?)),
        None => BoxMakeWriter::new(std::io::stderr),
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(log_file.is_none())
                .with_target(false),
        )
        .with(filter)
        .init();

    Ok(())
}

fn print_jobs(jobs: &[JobSpec]) {
    println!("{:>8}  {:<20}  {}", "PRIORITY", "ID", "TITLE");
    for job in jobs {
        println!("{:>8}  {:<20}  {}", job.priority, job.id, job.title);
        println!("{:>8}  {:<20}  {}", "", "", job.description);
    }
}

fn print_report(report: &RunReport) {
    println!("{:-<60}", "");
    for record in &report.records {
        let timing = record
            .duration_ms()
            .map(|ms| format!("{} ms", ms))
            .unwrap_or_else(|| "skipped".to_string());
        println!(
            "{} {:<36} {:<10} {}",
            record.state.symbol(),
            record.spec.title,
            record.state,
            timing
        );
        if let Some(err) = &record.error {
            println!("    {}", err);
        }
    }
    println!("{:-<60}", "");
}
