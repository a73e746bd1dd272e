use anyhow::{bail, Result};
use clap::Parser;

use mjdl::api::{Gallery, GalleryClient, Page, PageQuery};
use mjdl::cli::RunArgs;
use mjdl::layout;

/// Print where each job of one page would be saved, without writing anything.
#[derive(Debug, Parser)]
#[command(author, version)]
struct Args {
    #[command(flatten)]
    run: RunArgs,

    /// Page number to inspect (1-based)
    #[arg(long, default_value = "1")]
    page: u32,
}

#[tokio::main]
async fn main() -> Result<()> {
    mjdl::init_tracing();

    let args = Args::parse();
    if args.page == 0 {
        bail!("--page must be at least 1");
    }
    let cfg = args.run.resolve()?;
    let gallery = GalleryClient::new(cfg.account.clone())?;
    let query = PageQuery {
        kind: cfg.kind,
        sort_order: cfg.sort_order,
    };

    match gallery.fetch_page(&query, args.page).await? {
        Page::Jobs(jobs) => {
            println!("Page {} ({} jobs):", args.page, jobs.len());
            for job in jobs {
                match layout::derive(&job, cfg.aggregation, &cfg.out_dir) {
                    Ok(loc) => {
                        let done = layout::is_complete(&loc).await;
                        println!(
                            "  {} -> {} [{} images]{}",
                            job.id,
                            loc.primary_image().display(),
                            job.image_paths.len(),
                            if done { " (saved)" } else { "" }
                        );
                    }
                    Err(err) => println!("  {} -> error: {}", job.id, err),
                }
            }
        }
        Page::EndOfResults => println!("Page {}: end of results", args.page),
        Page::Empty => println!("Page {}: empty", args.page),
    }
    Ok(())
}
