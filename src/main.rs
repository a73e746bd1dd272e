use anyhow::{bail, Result};
use clap::Parser;
use tracing::info;

use mjdl::api::GalleryClient;
use mjdl::cli::RunArgs;
use mjdl::downloader::{Downloader, StopReason};

#[derive(Debug, Parser)]
#[command(author, version, about = "Download images from your Midjourney gallery")]
struct Args {
    #[command(flatten)]
    run: RunArgs,
}

#[tokio::main]
async fn main() -> Result<()> {
    mjdl::init_tracing();

    let args = Args::parse();
    let cfg = args.run.resolve()?;
    let gallery = GalleryClient::new(cfg.account.clone())?;

    info!(out = %cfg.out_dir.display(), "Starting download...");
    let summary = Downloader::new(&gallery, &cfg).run().await?;
    info!(
        pages = summary.pages,
        saved = summary.saved,
        skipped_existing = summary.skipped_existing,
        skipped_low_rated = summary.skipped_low_rated,
        stop_reason = ?summary.stop_reason,
        "download finished"
    );

    if let StopReason::FetchFailed(reason) = summary.stop_reason {
        bail!("stopped early, gallery unreachable: {}", reason);
    }
    Ok(())
}
