use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info, instrument, warn};

use crate::api::Gallery;
use crate::config::Sidecars;
use crate::layout::{self, JobLocation};
use crate::model::Job;

pub const MODEL_FILE: &str = "model.json";
pub const PROMPT_FILE: &str = "prompt.txt";
pub const COMMAND_FILE: &str = "command.txt";

/// What persisting a single job did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Images written; holds the primary image path.
    Saved(PathBuf),
    SkippedLowRated,
    SkippedExisting,
}

/// Options for [`persist`] taken from the run configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PersistOptions {
    pub sidecars: Sidecars,
    pub skip_low_rated: bool,
}

/// Download every image of `job` into `location` and write the requested
/// sidecars, unless the job is low rated (and those are skipped) or was
/// already fully written by an earlier run.
#[instrument(skip_all, fields(job = %job.id))]
pub async fn persist(
    gallery: &dyn Gallery,
    job: &Job,
    location: &JobLocation,
    opts: &PersistOptions,
) -> Result<Outcome> {
    if opts.skip_low_rated && job.is_low_rated() {
        debug!("skipping low rated job");
        return Ok(Outcome::SkippedLowRated);
    }

    if layout::exists(&location.dir, &location.base_name).await {
        if layout::is_complete(location).await {
            info!(path = %location.primary_image().display(), "already exists");
            return Ok(Outcome::SkippedExisting);
        }
        warn!(
            path = %location.primary_image().display(),
            "found image without completion marker; downloading again"
        );
    }

    fs::create_dir_all(&location.dir)
        .await
        .with_context(|| format!("failed to create {}", location.dir.display()))?;

    for (idx, url) in job.image_paths.iter().enumerate() {
        let target = location.image_path(idx);
        let bytes = gallery
            .download_image(url)
            .await
            .with_context(|| format!("failed to download {} for job {}", url, job.id))?;
        write_file(&target, &bytes).await?;
        debug!(path = %target.display(), size = bytes.len(), "image written");
    }

    if opts.sidecars.model_json {
        let json = serde_json::to_string_pretty(job).context("failed to serialize job")?;
        write_file(&location.dir.join(MODEL_FILE), json.as_bytes()).await?;
    }
    if opts.sidecars.prompt_text {
        write_file(&location.dir.join(PROMPT_FILE), job.prompt.as_bytes()).await?;
    }
    if opts.sidecars.command_text {
        let command = job.full_command().unwrap_or_default();
        write_file(&location.dir.join(COMMAND_FILE), command.as_bytes()).await?;
    }

    write_file(&location.marker_path(), b"").await?;
    Ok(Outcome::Saved(location.primary_image()))
}

async fn write_file(path: &Path, contents: &[u8]) -> Result<()> {
    fs::write(path, contents)
        .await
        .with_context(|| format!("failed to write {}", path.display()))
}
