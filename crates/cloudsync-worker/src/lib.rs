//! # cloudsync-worker
//!
//! Hosts the CloudSync engine as a long-running process: loads configuration,
//! initializes logging, starts the task worker pool and the periodic
//! scheduler, and drains both on Ctrl+C.

pub mod bootstrap;
pub mod config;
pub mod observability;

pub use bootstrap::{Worker, run};
pub use config::AppConfig;
pub use observability::init_tracing;
