//! Maps a job onto its place on disk: output directory, base file name and
//! the files derived from them.
use chrono::{Datelike, NaiveDateTime};
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::warn;

use crate::model::{Aggregation, Job};

pub const ENQUEUE_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

/// Longest directory name produced from a prompt.
pub const PROMPT_DIR_MAX: usize = 100;
/// Longest base file name produced from a prompt, leaving room for `-N.png`.
pub const PROMPT_FILE_MAX: usize = 97;

/// Byte limit for a directory name on common filesystems.
pub const PROMPT_DIR_MAX_BYTES: usize = 255;
/// Byte budget for a base file name: 255 minus room for `-NNN.png` and the
/// `.{base}.done` marker.
pub const PROMPT_FILE_MAX_BYTES: usize = 240;

const STRIPPED_CHARS: &[char] = &[',', '*', '\'', ':', '<', '>', '/', '.'];

static REPEATED_UNDERSCORES: Lazy<Regex> =
    Lazy::new(|| Regex::new("_{2,}").expect("valid underscore regex"));

#[derive(Debug, Error)]
pub enum LayoutError {
    #[error("job {id}: malformed enqueue_time {value:?}: {source}")]
    EnqueueTime {
        id: String,
        value: String,
        #[source]
        source: chrono::ParseError,
    },
}

/// Where a job's files live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobLocation {
    pub dir: PathBuf,
    pub base_name: String,
}

impl JobLocation {
    /// File name for the image at `index`: the base name for the first image,
    /// `{base}-{index}` afterwards.
    pub fn image_name(&self, index: usize) -> String {
        if index == 0 {
            format!("{}.png", self.base_name)
        } else {
            format!("{}-{}.png", self.base_name, index)
        }
    }

    pub fn image_path(&self, index: usize) -> PathBuf {
        self.dir.join(self.image_name(index))
    }

    pub fn primary_image(&self) -> PathBuf {
        self.image_path(0)
    }

    /// Marker written once every file of the job is on disk.
    pub fn marker_path(&self) -> PathBuf {
        self.dir.join(format!(".{}.done", self.base_name))
    }
}

/// Turn a prompt into a lowercase, filesystem-safe slug (untruncated).
pub fn sanitize_prompt(prompt: &str) -> String {
    let replaced: String = prompt
        .chars()
        .filter(|c| !STRIPPED_CHARS.contains(c))
        .map(|c| if c == ' ' { '_' } else { c })
        .collect();
    let collapsed = REPEATED_UNDERSCORES.replace_all(&replaced, "_");
    collapsed
        .to_lowercase()
        .trim_matches(|c| c == '_' || c == '*')
        .to_string()
}

/// Keep at most `max` characters (not bytes) of `s`.
pub fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

/// Keep at most `max_chars` characters and at most `max_bytes` bytes of `s`,
/// cutting on a character boundary.
pub fn truncate_name(s: &str, max_chars: usize, max_bytes: usize) -> &str {
    let s = truncate_chars(s, max_chars);
    if s.len() <= max_bytes {
        return s;
    }
    let mut end = max_bytes;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

fn slug_or_id(job: &Job, max_chars: usize, max_bytes: usize) -> String {
    let slug = sanitize_prompt(&job.prompt);
    let slug = truncate_name(&slug, max_chars, max_bytes);
    if slug.is_empty() {
        job.id.clone()
    } else {
        slug.to_string()
    }
}

/// Compute the output directory and base file name for `job` under `base`.
pub fn derive(job: &Job, aggregation: Aggregation, base: &Path) -> Result<JobLocation, LayoutError> {
    let enqueued = NaiveDateTime::parse_from_str(&job.enqueue_time, ENQUEUE_TIME_FORMAT)
        .map_err(|source| LayoutError::EnqueueTime {
            id: job.id.clone(),
            value: job.enqueue_time.clone(),
            source,
        })?;
    let year = enqueued.year().to_string();
    let month = enqueued.month().to_string();

    let location = match aggregation {
        Aggregation::Prompt => JobLocation {
            dir: base.join(slug_or_id(job, PROMPT_DIR_MAX, PROMPT_DIR_MAX_BYTES)),
            base_name: job.id.clone(),
        },
        Aggregation::Month => JobLocation {
            dir: base.join(year).join(month),
            base_name: slug_or_id(job, PROMPT_FILE_MAX, PROMPT_FILE_MAX_BYTES),
        },
        Aggregation::Day => JobLocation {
            dir: base.join(year).join(month).join(enqueued.day().to_string()),
            base_name: slug_or_id(job, PROMPT_FILE_MAX, PROMPT_FILE_MAX_BYTES),
        },
    };
    Ok(location)
}

/// Treats an unreadable path as absent, after logging why.
async fn path_exists(path: &Path) -> bool {
    match tokio::fs::try_exists(path).await {
        Ok(found) => found,
        Err(err) => {
            warn!(%err, path = %path.display(), "cannot check path; treating as missing");
            false
        }
    }
}

/// True iff `{dir}/{base_name}.png` is present.
pub async fn exists(dir: &Path, base_name: &str) -> bool {
    path_exists(&dir.join(format!("{}.png", base_name))).await
}

/// True when the primary image and the completion marker are both present.
pub async fn is_complete(location: &JobLocation) -> bool {
    exists(&location.dir, &location.base_name).await && path_exists(&location.marker_path()).await
}
