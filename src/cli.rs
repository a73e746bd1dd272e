//! Command-line flags shared by the binaries.
use clap::Args;
use std::path::PathBuf;

use crate::config::{self, ConfigError, FileConfig, RunConfig};
use crate::model::{Aggregation, JobKind, SortOrder};

#[derive(Debug, Clone, Args)]
pub struct RunArgs {
    /// Optional YAML file with the same keys as these flags
    #[arg(long, env = "MJDL_CONFIG")]
    pub config: Option<PathBuf>,

    /// Gallery user id
    #[arg(long, short = 'u', env = "MJDL_USER_ID")]
    pub user_id: Option<String>,

    /// Session token (`__Secure-next-auth.session-token` cookie)
    #[arg(long, short = 't', env = "MJDL_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Which jobs to download [default: all]
    #[arg(long, short = 'k', value_enum, ignore_case = true, env = "MJDL_KIND")]
    pub kind: Option<JobKind>,

    /// Sort order used when paging through jobs [default: new]
    #[arg(long, short = 's', value_enum, ignore_case = true, env = "MJDL_SORT_ORDER")]
    pub sort_order: Option<SortOrder>,

    /// Group files by prompt, month or day [default: month]
    #[arg(long, short = 'a', value_enum, ignore_case = true, env = "MJDL_AGGREGATE")]
    pub aggregate: Option<Aggregation>,

    /// Save the job JSON as model.json
    #[arg(long, short = 'm', env = "MJDL_SAVE_MODEL")]
    pub save_model: bool,

    /// Save the prompt as prompt.txt
    #[arg(long, short = 'p', env = "MJDL_SAVE_PROMPT")]
    pub save_prompt: bool,

    /// Save the full command as command.txt
    #[arg(long, short = 'c', env = "MJDL_SAVE_COMMAND")]
    pub save_command: bool,

    /// Skip jobs rated 1 or 2
    #[arg(long, short = 'r', env = "MJDL_SKIP_LOW_RATED")]
    pub skip_low_rated: bool,

    /// Base path where images are saved [default: ./jobs]
    #[arg(long, short = 'o', env = "MJDL_OUT")]
    pub out: Option<PathBuf>,

    /// Stop once the job with this id (UUIDv4) is reached
    #[arg(long, env = "MJDL_STOP_ID")]
    pub stop_id: Option<String>,
}

impl RunArgs {
    fn as_file_config(&self) -> FileConfig {
        let flag = |set: bool| set.then_some(true);
        FileConfig {
            user_id: self.user_id.clone(),
            token: self.token.clone(),
            kind: self.kind,
            sort_order: self.sort_order,
            aggregate: self.aggregate,
            save_model: flag(self.save_model),
            save_prompt: flag(self.save_prompt),
            save_command: flag(self.save_command),
            skip_low_rated: flag(self.skip_low_rated),
            out: self.out.clone(),
            stop_id: self.stop_id.clone(),
        }
    }

    /// Layer the flags over the optional config file and validate the result.
    pub fn resolve(&self) -> Result<RunConfig, ConfigError> {
        let file = match &self.config {
            Some(path) => config::load(path)?,
            None => FileConfig::default(),
        };
        RunConfig::resolve(file.merge(self.as_file_config()))
    }
}
