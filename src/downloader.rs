use anyhow::{Context, Result};
use tracing::{error, info, instrument};

use crate::api::{Gallery, Page, PageQuery};
use crate::config::RunConfig;
use crate::layout;
use crate::model::Job;
use crate::persist::{self, Outcome, PersistOptions};

/// Why pagination ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    EndOfResults,
    EmptyPage,
    StopIdReached,
    FetchFailed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub pages: u32,
    pub saved: usize,
    pub skipped_existing: usize,
    pub skipped_low_rated: usize,
    pub stop_reason: StopReason,
}

impl RunSummary {
    fn new() -> Self {
        Self {
            pages: 0,
            saved: 0,
            skipped_existing: 0,
            skipped_low_rated: 0,
            stop_reason: StopReason::EmptyPage,
        }
    }
}

/// Mirrors a user's completed jobs to disk, one page and one job at a time.
pub struct Downloader<'a> {
    gallery: &'a dyn Gallery,
    config: &'a RunConfig,
}

impl<'a> Downloader<'a> {
    pub fn new(gallery: &'a dyn Gallery, config: &'a RunConfig) -> Self {
        Self { gallery, config }
    }

    /// Walk pages from 1 until the gallery runs out of results, a fetch
    /// fails, or the configured stop id shows up.
    #[instrument(skip_all, fields(user = %self.config.account.user_id))]
    pub async fn run(&self) -> Result<RunSummary> {
        let query = PageQuery {
            kind: self.config.kind,
            sort_order: self.config.sort_order,
        };
        let mut summary = RunSummary::new();
        let mut page = 1u32;

        loop {
            let jobs = match self.gallery.fetch_page(&query, page).await {
                Ok(Page::Jobs(jobs)) => jobs,
                Ok(Page::EndOfResults) => {
                    info!("Reached end of available results");
                    summary.stop_reason = StopReason::EndOfResults;
                    break;
                }
                Ok(Page::Empty) => {
                    info!(page, "empty page; stopping");
                    summary.stop_reason = StopReason::EmptyPage;
                    break;
                }
                Err(err) => {
                    error!(%err, page, "HTTP request failed");
                    summary.stop_reason = StopReason::FetchFailed(err.to_string());
                    break;
                }
            };

            info!(
                page,
                order_by = self.config.sort_order.as_str(),
                "Downloading page #{}",
                page
            );
            summary.pages += 1;
            if self.process_page(&jobs, &mut summary).await? {
                summary.stop_reason = StopReason::StopIdReached;
                break;
            }
            page += 1;
        }

        Ok(summary)
    }

    /// Returns `true` when the stop id was reached.
    async fn process_page(&self, jobs: &[Job], summary: &mut RunSummary) -> Result<bool> {
        let opts = PersistOptions {
            sidecars: self.config.sidecars,
            skip_low_rated: self.config.skip_low_rated,
        };
        let total = jobs.len();

        for (idx, job) in jobs.iter().enumerate() {
            if let Some(stop_id) = &self.config.stop_id {
                if job.id.eq_ignore_ascii_case(&stop_id.to_string()) {
                    info!(job = %job.id, "reached stop id");
                    return Ok(true);
                }
            }

            let location = layout::derive(job, self.config.aggregation, &self.config.out_dir)?;
            let outcome = persist::persist(self.gallery, job, &location, &opts)
                .await
                .with_context(|| format!("failed to persist job {}", job.id))?;
            match outcome {
                Outcome::Saved(path) => {
                    summary.saved += 1;
                    info!("{}/{} Downloaded {}", idx + 1, total, path.display());
                }
                Outcome::SkippedExisting => summary.skipped_existing += 1,
                Outcome::SkippedLowRated => summary.skipped_low_rated += 1,
            }
        }
        Ok(false)
    }
}
