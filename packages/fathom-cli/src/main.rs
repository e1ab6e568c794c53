//! Fathom CLI - network infrastructure inventory agent
//!
//! This binary drives the discovery pipeline from the command line:
//! - Sweep address ranges and fingerprint what answers
//! - Rediscover a device's record, interfaces, VLANs or port scan
//! - Remove an endpoint and everything keyed to it
//! - Inspect the job registry and manage the document store indices
//! - Run as a periodic re-sweeping daemon (for systemd integration)

mod daemon;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use std::sync::Arc;

use fathom_core::pipeline::Pipeline;
use fathom_core::queue::{JobQueue, JobStatus};
use fathom_core::store::{DocumentStore, HttpDocStore};
use fathom_core::{config, credentials};

#[derive(Parser)]
#[command(name = "fathom")]
#[command(version)]
#[command(about = "Network infrastructure inventory agent")]
#[command(long_about = "
Fathom inventories network infrastructure by sweeping address ranges,
fingerprinting devices over SSH, scraping their CLI/API into structured
records and persisting those records to a search index.

Quick start:
  1. Review configuration:  fathom config
  2. Create the indices:    fathom init-store
  3. Sweep a network:       fathom sweep 10.0.0.0/24
  4. Start the daemon:      fathom daemon

For systemd integration, see: fathom daemon --help
")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format
    #[arg(short, long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output
    Text,
    /// JSON output for scripting
    Json,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum RediscoverCategory {
    /// Re-fingerprint the device and update its base record
    Info,
    /// Refresh the interface rows
    Interfaces,
    /// Refresh the VLAN rows
    Vlans,
    /// Append a fresh port scan
    Portscan,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Sweep a network and fingerprint every responding host
    Sweep {
        /// Network to sweep, e.g. 10.0.0.0/24
        network: String,
    },

    /// List persisted endpoints
    Endpoints,

    /// Re-run discovery for one endpoint
    Rediscover {
        /// Hostname of the endpoint record
        hostname: String,

        /// Which category to refresh
        #[arg(short, long, default_value = "info")]
        category: RediscoverCategory,
    },

    /// Remove an endpoint and all rows keyed to its hostname
    Remove {
        /// Hostname of the endpoint record
        hostname: String,
    },

    /// List queue jobs and their outcomes
    Jobs,

    /// Drop finished and failed jobs from the registry
    ClearJobs,

    /// Create the document store indices
    InitStore,

    /// Delete and recreate every document store index
    ClearStore {
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// Run as a periodic re-sweeping daemon
    Daemon {
        /// Sweep interval in minutes
        #[arg(short, long, default_value = "60")]
        interval: u64,

        /// Networks to sweep (defaults to the configured list)
        #[arg(short, long)]
        network: Vec<String>,
    },

    /// Show configuration paths and settings
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("fathom={},fathom_core={}", log_level, log_level).into()),
        )
        .with_target(false)
        .init();

    match cli.command {
        Commands::Sweep { ref network } => cmd_sweep(&cli, network).await,
        Commands::Endpoints => cmd_endpoints(&cli).await,
        Commands::Rediscover { ref hostname, category } => {
            cmd_rediscover(&cli, hostname, category).await
        }
        Commands::Remove { ref hostname } => cmd_remove(&cli, hostname).await,
        Commands::Jobs => cmd_jobs(&cli).await,
        Commands::ClearJobs => cmd_clear_jobs(&cli).await,
        Commands::InitStore => cmd_init_store(&cli).await,
        Commands::ClearStore { yes } => cmd_clear_store(&cli, yes).await,
        Commands::Daemon { interval, network } => daemon::run_daemon(interval, network).await,
        Commands::Config => cmd_config(&cli).await,
    }
}

/// Build the store, queue and pipeline from configuration. Every
/// command shares this wiring.
fn build_pipeline() -> Result<(Pipeline, JobQueue, Arc<config::AppConfig>)> {
    let app_config = Arc::new(config::load_config());
    let store = Arc::new(HttpDocStore::new(&app_config.store_url)?);
    let queue = JobQueue::new(app_config.high_workers, app_config.default_workers);
    let pipeline = Pipeline::new(store, queue.clone(), app_config.clone());
    Ok((pipeline, queue, app_config))
}

async fn cmd_sweep(cli: &Cli, network: &str) -> Result<()> {
    let (pipeline, queue, _config) = build_pipeline()?;

    let enqueued = pipeline.enqueue_sweep(network)?;

    match cli.format {
        OutputFormat::Text => println!("Sweeping {} ({} hosts)...", network, enqueued),
        OutputFormat::Json => {}
    }

    queue.wait_until_idle().await;

    let jobs = queue.jobs();
    let failed = queue.failed();
    let discovered = jobs
        .iter()
        .filter(|j| j.description.starts_with("Record device info"))
        .count();

    match cli.format {
        OutputFormat::Text => {
            println!();
            println!(
                "Sweep complete: {} hosts answered, {} jobs failed",
                discovered,
                failed.len()
            );
            for job in &failed {
                if let JobStatus::Failed(error) = &job.status {
                    eprintln!("  failed: {} - {}", job.description, error);
                }
            }
        }
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::json!({
                    "network": network,
                    "hosts_swept": enqueued,
                    "hosts_responding": discovered,
                    "jobs_failed": failed.len(),
                })
            );
        }
    }

    Ok(())
}

async fn cmd_endpoints(cli: &Cli) -> Result<()> {
    let (pipeline, _queue, _config) = build_pipeline()?;
    let endpoints = pipeline.list_endpoints().await?;

    match cli.format {
        OutputFormat::Text => {
            if endpoints.is_empty() {
                println!("No endpoints recorded.");
                return Ok(());
            }
            println!("{} endpoints:", endpoints.len());
            println!();
            for record in &endpoints {
                println!(
                    "  {:15} {:15} {:30} (credential {})",
                    record.ip,
                    record.device_type.to_string(),
                    record.hostname,
                    record.credential_id
                );
            }
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&endpoints)?);
        }
    }

    Ok(())
}

async fn cmd_rediscover(cli: &Cli, hostname: &str, category: RediscoverCategory) -> Result<()> {
    let (pipeline, queue, _config) = build_pipeline()?;

    let Some(record) = pipeline.find_endpoint(hostname).await? else {
        match cli.format {
            OutputFormat::Text => eprintln!("No endpoint record for '{}'.", hostname),
            OutputFormat::Json => {
                println!("{}", serde_json::json!({"error": "endpoint not found", "hostname": hostname}));
            }
        }
        std::process::exit(1);
    };

    match category {
        RediscoverCategory::Info => pipeline.enqueue_rediscover_device_info(record),
        RediscoverCategory::Interfaces => pipeline.enqueue_rediscover_interfaces(record),
        RediscoverCategory::Vlans => pipeline.enqueue_rediscover_vlans(record),
        RediscoverCategory::Portscan => pipeline.enqueue_rediscover_portscan(record),
    }

    queue.wait_until_idle().await;
    report_outcome(cli, &queue, hostname)
}

async fn cmd_remove(cli: &Cli, hostname: &str) -> Result<()> {
    let (pipeline, queue, _config) = build_pipeline()?;

    let Some(record) = pipeline.find_endpoint(hostname).await? else {
        match cli.format {
            OutputFormat::Text => eprintln!("No endpoint record for '{}'.", hostname),
            OutputFormat::Json => {
                println!("{}", serde_json::json!({"error": "endpoint not found", "hostname": hostname}));
            }
        }
        std::process::exit(1);
    };

    pipeline.enqueue_remove(record);
    queue.wait_until_idle().await;
    report_outcome(cli, &queue, hostname)
}

fn report_outcome(cli: &Cli, queue: &JobQueue, hostname: &str) -> Result<()> {
    let failed = queue.failed();

    match cli.format {
        OutputFormat::Text => {
            if failed.is_empty() {
                println!("Done.");
            } else {
                for job in &failed {
                    if let JobStatus::Failed(error) = &job.status {
                        eprintln!("failed: {} - {}", job.description, error);
                    }
                }
            }
        }
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::json!({
                    "hostname": hostname,
                    "jobs_run": queue.jobs().len(),
                    "jobs_failed": failed.len(),
                })
            );
        }
    }

    if failed.is_empty() { Ok(()) } else { std::process::exit(1) }
}

async fn cmd_jobs(cli: &Cli) -> Result<()> {
    // Jobs live in the invoking process; this lists the current
    // process's registry, which is what the daemon exposes in its logs
    // and what one-shot commands print after their run.
    let (_pipeline, queue, _config) = build_pipeline()?;
    let jobs = queue.jobs();

    match cli.format {
        OutputFormat::Text => {
            if jobs.is_empty() {
                println!("No jobs in the registry.");
                return Ok(());
            }
            for job in &jobs {
                let status = match &job.status {
                    JobStatus::Queued => "queued".to_string(),
                    JobStatus::Started => "started".to_string(),
                    JobStatus::Finished => "finished".to_string(),
                    JobStatus::Failed(error) => format!("failed: {}", error),
                };
                println!(
                    "  {} [{}] {:40} {}",
                    job.enqueued_at.format("%Y-%m-%d %H:%M:%S"),
                    job.queue,
                    job.description,
                    status
                );
            }
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&jobs)?);
        }
    }

    Ok(())
}

async fn cmd_clear_jobs(cli: &Cli) -> Result<()> {
    let (_pipeline, queue, _config) = build_pipeline()?;
    let cleared = queue.clear_registry();

    match cli.format {
        OutputFormat::Text => println!("Cleared {} finished/failed jobs.", cleared),
        OutputFormat::Json => {
            println!("{}", serde_json::json!({"cleared": cleared}));
        }
    }

    Ok(())
}

async fn cmd_init_store(cli: &Cli) -> Result<()> {
    let (_pipeline, _queue, app_config) = build_pipeline()?;
    let store = HttpDocStore::new(&app_config.store_url)?;

    for index in app_config.indices.all() {
        store.create_index(index).await?;
        match cli.format {
            OutputFormat::Text => println!("Created index '{}'", index),
            OutputFormat::Json => {}
        }
    }

    if let OutputFormat::Json = cli.format {
        println!(
            "{}",
            serde_json::json!({"created": app_config.indices.all()})
        );
    }

    Ok(())
}

async fn cmd_clear_store(cli: &Cli, yes: bool) -> Result<()> {
    let (_pipeline, _queue, app_config) = build_pipeline()?;

    if !yes {
        eprintln!("This deletes every inventory index. Re-run with --yes to confirm.");
        std::process::exit(1);
    }

    let store = HttpDocStore::new(&app_config.store_url)?;

    for index in app_config.indices.all() {
        store.delete_index(index).await?;
        store.create_index(index).await?;
        match cli.format {
            OutputFormat::Text => println!("Rebuilt index '{}'", index),
            OutputFormat::Json => {}
        }
    }

    if let OutputFormat::Json = cli.format {
        println!(
            "{}",
            serde_json::json!({"rebuilt": app_config.indices.all()})
        );
    }

    Ok(())
}

async fn cmd_config(cli: &Cli) -> Result<()> {
    let app_config = config::load_config();
    let config_path = config::get_config_file_path_string();

    match cli.format {
        OutputFormat::Text => {
            println!("Configuration");
            println!("=============");
            println!();
            println!("Config file:      {}", config_path);
            println!("Store URL:        {} (from {})", app_config.store_url, app_config.source);
            println!("Credentials:      {}", app_config.credentials_path.display());
            println!("Scan ports:       {:?}", app_config.scan_ports);
            println!("Workers:          {} high / {} default", app_config.high_workers, app_config.default_workers);
            println!("Daemon networks:  {:?}", app_config.networks);
            println!();
            println!("Environment variables:");
            println!("  FATHOM_STORE_URL   - Override the document store URL");
            println!("  FATHOM_CREDENTIALS - Override the credentials file path");
            println!();
            println!("Example config.toml:");
            println!();
            println!("{}", config::generate_example_config());
            println!("Example credentials.toml:");
            println!();
            println!("{}", credentials::generate_example_credentials());
        }
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::json!({
                    "config_file": config_path,
                    "store_url": app_config.store_url,
                    "store_url_source": format!("{}", app_config.source),
                    "credentials_file": app_config.credentials_path.display().to_string(),
                    "scan_ports": app_config.scan_ports,
                    "high_workers": app_config.high_workers,
                    "default_workers": app_config.default_workers,
                    "networks": app_config.networks,
                })
            );
        }
    }

    Ok(())
}
