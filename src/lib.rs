//! Mirror a gallery user's completed image-generation jobs to local disk.

pub mod api;
pub mod cli;
pub mod config;
pub mod downloader;
pub mod layout;
pub mod model;
pub mod persist;

/// Install the compact `tracing` subscriber used by the binaries. Defaults to
/// `info` when `RUST_LOG` is unset.
pub fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}
