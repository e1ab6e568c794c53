//! Background daemon mode for continuous re-discovery
//!
//! This module implements a background service that:
//! - Periodically sweeps the configured networks
//! - Runs every queued job to completion between sweeps
//! - Handles graceful shutdown via SIGTERM/SIGINT

use anyhow::Result;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::time::{Duration, interval};

use fathom_core::config;
use fathom_core::pipeline::Pipeline;
use fathom_core::queue::JobQueue;
use fathom_core::store::HttpDocStore;

/// Run the background sweeping daemon
pub async fn run_daemon(interval_minutes: u64, networks: Vec<String>) -> Result<()> {
    let app_config = Arc::new(config::load_config());

    let networks = if networks.is_empty() {
        app_config.networks.clone()
    } else {
        networks
    };

    if networks.is_empty() {
        eprintln!("Error: no networks to sweep.");
        eprintln!("Pass --network or set `networks` under [discovery] in the config file.");
        std::process::exit(1);
    }

    if !app_config.credentials_path.exists() {
        eprintln!(
            "Error: credentials file {} does not exist.",
            app_config.credentials_path.display()
        );
        eprintln!("See 'fathom config' for the expected format.");
        std::process::exit(1);
    }

    tracing::info!(
        "Starting daemon: sweeping {:?} every {} minutes, store at {}",
        networks,
        interval_minutes,
        app_config.store_url
    );

    // Set up signal handlers
    let shutdown = Arc::new(AtomicBool::new(false));
    setup_signal_handlers(shutdown.clone());

    let store = Arc::new(HttpDocStore::new(&app_config.store_url)?);
    let queue = JobQueue::new(app_config.high_workers, app_config.default_workers);
    let pipeline = Pipeline::new(store, queue.clone(), app_config);

    // Run an initial sweep immediately
    tracing::info!("Running initial sweep...");
    if let Err(e) = run_sweep_cycle(&pipeline, &queue, &networks).await {
        tracing::error!("Initial sweep failed: {}", e);
    }

    // Set up interval timer
    let mut sweep_interval = interval(Duration::from_secs(interval_minutes * 60));
    // Skip the first tick since we just ran
    sweep_interval.tick().await;

    // Main daemon loop
    loop {
        tokio::select! {
            _ = sweep_interval.tick() => {
                if shutdown.load(Ordering::Relaxed) {
                    tracing::info!("Shutdown requested, stopping daemon");
                    break;
                }

                if let Err(e) = run_sweep_cycle(&pipeline, &queue, &networks).await {
                    tracing::error!("Sweep failed: {}", e);
                }
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Received Ctrl+C, shutting down");
                break;
            }
        }
    }

    // Let in-flight jobs finish; no cancellation mid-job.
    queue.wait_until_idle().await;
    tracing::info!("Daemon stopped");
    Ok(())
}

/// Set up SIGTERM and SIGINT handlers for graceful shutdown
fn setup_signal_handlers(shutdown: Arc<AtomicBool>) {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let shutdown_term = shutdown.clone();
        tokio::spawn(async move {
            let mut sigterm =
                signal(SignalKind::terminate()).expect("Failed to register SIGTERM handler");
            sigterm.recv().await;
            tracing::info!("Received SIGTERM");
            shutdown_term.store(true, Ordering::SeqCst);
        });

        let shutdown_int = shutdown.clone();
        tokio::spawn(async move {
            let mut sigint =
                signal(SignalKind::interrupt()).expect("Failed to register SIGINT handler");
            sigint.recv().await;
            tracing::info!("Received SIGINT");
            shutdown_int.store(true, Ordering::SeqCst);
        });
    }

    #[cfg(not(unix))]
    {
        // On non-Unix platforms, rely on tokio::signal::ctrl_c() in the main loop
        let _ = shutdown;
    }
}

/// Sweep every configured network and drain the queue.
async fn run_sweep_cycle(pipeline: &Pipeline, queue: &JobQueue, networks: &[String]) -> Result<()> {
    let start = std::time::Instant::now();

    for network in networks {
        match pipeline.enqueue_sweep(network) {
            Ok(hosts) => tracing::info!("sweeping {} ({} hosts)", network, hosts),
            Err(e) => tracing::error!("skipping {}: {}", network, e),
        }
    }

    queue.wait_until_idle().await;

    let failed = queue.failed().len();
    tracing::info!(
        "Sweep cycle complete in {:.1}s ({} failed jobs)",
        start.elapsed().as_secs_f64(),
        failed
    );

    // Keep the registry bounded across a long-running daemon.
    queue.clear_registry();

    Ok(())
}
