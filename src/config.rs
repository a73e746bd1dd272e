//! Run configuration: optional YAML file layer, validation and the immutable
//! [`RunConfig`] handed to the downloader.
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use uuid::Uuid;

use crate::model::{Aggregation, JobKind, SortOrder};

pub const DEFAULT_OUT_DIR: &str = "jobs";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parse error: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(&'static str),
    #[error("Invalid stop id {0:?}: expected a version 4 UUID")]
    StopId(String),
}

/// Settings that may be supplied through a YAML file. Every key is optional;
/// values given on the command line win.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct FileConfig {
    pub user_id: Option<String>,
    pub token: Option<String>,
    pub kind: Option<JobKind>,
    pub sort_order: Option<SortOrder>,
    pub aggregate: Option<Aggregation>,
    pub save_model: Option<bool>,
    pub save_prompt: Option<bool>,
    pub save_command: Option<bool>,
    pub skip_low_rated: Option<bool>,
    pub out: Option<PathBuf>,
    pub stop_id: Option<String>,
}

impl FileConfig {
    /// Overlay `other` on top of `self`; set fields in `other` take precedence.
    pub fn merge(self, other: FileConfig) -> FileConfig {
        FileConfig {
            user_id: other.user_id.or(self.user_id),
            token: other.token.or(self.token),
            kind: other.kind.or(self.kind),
            sort_order: other.sort_order.or(self.sort_order),
            aggregate: other.aggregate.or(self.aggregate),
            save_model: other.save_model.or(self.save_model),
            save_prompt: other.save_prompt.or(self.save_prompt),
            save_command: other.save_command.or(self.save_command),
            skip_low_rated: other.skip_low_rated.or(self.skip_low_rated),
            out: other.out.or(self.out),
            stop_id: other.stop_id.or(self.stop_id),
        }
    }
}

/// Account credentials used by the HTTP client.
#[derive(Clone, PartialEq, Eq)]
pub struct Account {
    pub user_id: String,
    pub session_token: String,
}

impl std::fmt::Debug for Account {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Account")
            .field("user_id", &self.user_id)
            .finish_non_exhaustive()
    }
}

/// Which sidecar files to write next to the images of a job.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Sidecars {
    pub model_json: bool,
    pub prompt_text: bool,
    pub command_text: bool,
}

/// Fully resolved configuration for one run. Built once, never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfig {
    pub account: Account,
    pub kind: JobKind,
    pub sort_order: SortOrder,
    pub aggregation: Aggregation,
    pub sidecars: Sidecars,
    pub skip_low_rated: bool,
    pub out_dir: PathBuf,
    pub stop_id: Option<Uuid>,
}

impl RunConfig {
    /// Resolve a layered [`FileConfig`] into a validated run configuration.
    pub fn resolve(layered: FileConfig) -> Result<RunConfig, ConfigError> {
        let user_id = layered.user_id.unwrap_or_default();
        if user_id.trim().is_empty() {
            return Err(ConfigError::Invalid("user_id must be non-empty"));
        }
        let token = layered.token.unwrap_or_default();
        if token.trim().is_empty() {
            return Err(ConfigError::Invalid("token must be non-empty"));
        }
        let out_dir = layered
            .out
            .unwrap_or_else(|| PathBuf::from(DEFAULT_OUT_DIR));
        if out_dir.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("out must be non-empty"));
        }
        let stop_id = layered
            .stop_id
            .as_deref()
            .map(parse_stop_id)
            .transpose()?;

        Ok(RunConfig {
            account: Account {
                user_id: user_id.trim().to_string(),
                session_token: token.trim().to_string(),
            },
            kind: layered.kind.unwrap_or(JobKind::All),
            sort_order: layered.sort_order.unwrap_or(SortOrder::New),
            aggregation: layered.aggregate.unwrap_or(Aggregation::Month),
            sidecars: Sidecars {
                model_json: layered.save_model.unwrap_or(false),
                prompt_text: layered.save_prompt.unwrap_or(false),
                command_text: layered.save_command.unwrap_or(false),
            },
            skip_low_rated: layered.skip_low_rated.unwrap_or(false),
            out_dir,
            stop_id,
        })
    }
}

/// Parse a stop id, accepting only version 4 UUIDs.
pub fn parse_stop_id(raw: &str) -> Result<Uuid, ConfigError> {
    match Uuid::parse_str(raw.trim()) {
        Ok(id) if id.get_version_num() == 4 => Ok(id),
        _ => Err(ConfigError::StopId(raw.to_string())),
    }
}

/// Load a YAML config file.
pub fn load(path: &Path) -> Result<FileConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    let cfg: FileConfig = serde_yaml::from_str(&content)?;
    Ok(cfg)
}

/// Example YAML content accepted by [`load`].
pub fn example() -> &'static str {
    r#"user_id: "00000000-0000-0000-0000-000000000000"
token: "YOUR_SESSION_TOKEN"
kind: all
sort_order: new
aggregate: month
save_model: true
save_prompt: false
save_command: false
skip_low_rated: true
out: "./jobs"
"#
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn minimal() -> FileConfig {
        FileConfig {
            user_id: Some("user-1".into()),
            token: Some("secret".into()),
            ..Default::default()
        }
    }

    #[test]
    fn parse_example_ok() {
        let cfg: FileConfig = serde_yaml::from_str(example()).unwrap();
        let run = RunConfig::resolve(cfg).unwrap();
        assert_eq!(run.kind, JobKind::All);
        assert_eq!(run.sort_order, SortOrder::New);
        assert_eq!(run.aggregation, Aggregation::Month);
        assert!(run.sidecars.model_json);
        assert!(!run.sidecars.prompt_text);
        assert!(run.skip_low_rated);
        assert_eq!(run.out_dir, PathBuf::from("./jobs"));
        assert!(run.stop_id.is_none());
    }

    #[test]
    fn defaults_apply_when_unset() {
        let run = RunConfig::resolve(minimal()).unwrap();
        assert_eq!(run.kind, JobKind::All);
        assert_eq!(run.aggregation, Aggregation::Month);
        assert_eq!(run.sidecars, Sidecars::default());
        assert!(!run.skip_low_rated);
        assert_eq!(run.out_dir, PathBuf::from(DEFAULT_OUT_DIR));
    }

    #[test]
    fn missing_credentials_rejected() {
        let mut cfg = minimal();
        cfg.user_id = Some("  ".into());
        let err = RunConfig::resolve(cfg).unwrap_err();
        match err {
            ConfigError::Invalid(msg) => assert!(msg.contains("user_id")),
            _ => panic!("wrong error"),
        }

        let mut cfg = minimal();
        cfg.token = None;
        let err = RunConfig::resolve(cfg).unwrap_err();
        match err {
            ConfigError::Invalid(msg) => assert!(msg.contains("token")),
            _ => panic!("wrong error"),
        }
    }

    #[test]
    fn stop_id_must_be_uuid_v4() {
        assert!(parse_stop_id("8f0c2a8e-3c1d-4b7a-9f7e-2d4f6a8b0c1e").is_ok());
        assert!(matches!(
            parse_stop_id("not-a-uuid"),
            Err(ConfigError::StopId(_))
        ));
        // Version 1 UUID.
        assert!(matches!(
            parse_stop_id("c232ab00-9414-11ec-b3c8-9f6bdeced846"),
            Err(ConfigError::StopId(_))
        ));

        let mut cfg = minimal();
        cfg.stop_id = Some("nope".into());
        assert!(matches!(
            RunConfig::resolve(cfg),
            Err(ConfigError::StopId(_))
        ));
    }

    #[test]
    fn merge_prefers_overlay() {
        let file = FileConfig {
            user_id: Some("from-file".into()),
            token: Some("file-token".into()),
            aggregate: Some(Aggregation::Day),
            save_prompt: Some(true),
            ..Default::default()
        };
        let cli = FileConfig {
            user_id: Some("from-cli".into()),
            aggregate: Some(Aggregation::Prompt),
            ..Default::default()
        };
        let merged = file.merge(cli);
        assert_eq!(merged.user_id.as_deref(), Some("from-cli"));
        assert_eq!(merged.token.as_deref(), Some("file-token"));
        assert_eq!(merged.aggregate, Some(Aggregation::Prompt));
        assert_eq!(merged.save_prompt, Some(true));
    }

    #[test]
    fn debug_hides_session_token() {
        let run = RunConfig::resolve(minimal()).unwrap();
        let rendered = format!("{:?}", run);
        assert!(rendered.contains("user-1"));
        assert!(!rendered.contains("secret"));
    }

    #[test]
    fn load_from_file_ok() {
        let td = tempdir().unwrap();
        let p = td.path().join("mjdl.yaml");
        fs::write(&p, example()).unwrap();
        let cfg = load(&p).unwrap();
        assert_eq!(cfg.sort_order, Some(SortOrder::New));
        assert_eq!(cfg.skip_low_rated, Some(true));
    }
}
