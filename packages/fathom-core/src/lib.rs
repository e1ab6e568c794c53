//! Fathom Core Library
//!
//! This crate provides the core functionality for the Fathom inventory
//! agent:
//! - Reachability probing (ping liveness, bounded TCP port scans)
//! - Device fingerprinting by trial SSH authentication
//! - Per-family CLI/API scraping into normalized inventory records
//! - A two-lane job queue driving the discovery pipeline
//! - A document store client for persistence and search
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use fathom_core::{config, pipeline::Pipeline, queue::JobQueue, store::HttpDocStore};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Arc::new(config::load_config());
//!     let store = Arc::new(HttpDocStore::new(&config.store_url)?);
//!     let queue = JobQueue::new(config.high_workers, config.default_workers);
//!
//!     let pipeline = Pipeline::new(store, queue.clone(), config);
//!     pipeline.enqueue_sweep("10.0.0.0/24")?;
//!     queue.wait_until_idle().await;
//!
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod credentials;
pub mod fingerprint;
pub mod pipeline;
pub mod plugin;
pub mod probe;
pub mod queue;
pub mod records;
pub mod scrape;
pub mod session;
pub mod store;

// Re-export commonly used types
pub use config::{AppConfig, ConfigSource, IndexNames, load_config};
pub use credentials::{Credential, CredentialStore};
pub use pipeline::Pipeline;
pub use queue::{JobInfo, JobQueue, JobStatus, Priority};
pub use records::{DeviceRecord, DeviceType};
pub use session::SessionError;
pub use store::{DocumentStore, HttpDocStore, MemoryStore};
