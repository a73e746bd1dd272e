use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Job kinds accepted by the `jobType` filter of the listing endpoint.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum JobKind {
    Grids,
    Upscales,
    All,
}

impl JobKind {
    /// Value of the `jobType` query parameter, `None` when unfiltered.
    pub fn job_type(&self) -> Option<&'static str> {
        match self {
            JobKind::Grids => Some("grid"),
            JobKind::Upscales => Some("upscale"),
            JobKind::All => None,
        }
    }
}

/// Orderings supported by the listing endpoint's `orderBy` parameter.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, clap::ValueEnum)]
pub enum SortOrder {
    #[serde(rename = "new")]
    #[value(name = "new")]
    New,
    #[serde(rename = "oldest")]
    #[value(name = "oldest")]
    Oldest,
    #[serde(rename = "hot")]
    #[value(name = "hot")]
    Hot,
    #[serde(rename = "rising")]
    #[value(name = "rising")]
    Rising,
    #[serde(rename = "top-today")]
    #[value(name = "top-today")]
    TopToday,
    #[serde(rename = "top-week")]
    #[value(name = "top-week")]
    TopWeek,
    #[serde(rename = "top-month")]
    #[value(name = "top-month")]
    TopMonth,
    #[serde(rename = "top-all")]
    #[value(name = "top-all")]
    TopAll,
    #[serde(rename = "like_count")]
    #[value(name = "like_count")]
    LikeCount,
}

impl SortOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::New => "new",
            SortOrder::Oldest => "oldest",
            SortOrder::Hot => "hot",
            SortOrder::Rising => "rising",
            SortOrder::TopToday => "top-today",
            SortOrder::TopWeek => "top-week",
            SortOrder::TopMonth => "top-month",
            SortOrder::TopAll => "top-all",
            SortOrder::LikeCount => "like_count",
        }
    }
}

/// How jobs are grouped into directories on disk.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Aggregation {
    Prompt,
    Month,
    Day,
}

/// One completed generation job as returned by the listing endpoint.
///
/// Fields the downloader does not need typed (including `ranking_by_user`
/// and `full_command`, which are often `null`) stay in `extra`, so the record
/// is written back out as received in `model.json`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Job {
    pub id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub prompt: String,
    pub enqueue_time: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub image_paths: Vec<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

impl Job {
    pub fn ranking_by_user(&self) -> Option<&Value> {
        self.extra.get("ranking_by_user").filter(|v| !v.is_null())
    }

    pub fn full_command(&self) -> Option<&str> {
        self.extra.get("full_command").and_then(Value::as_str)
    }

    /// True when the user rated the job 1 or 2. Non-integer rankings never count.
    pub fn is_low_rated(&self) -> bool {
        matches!(
            self.ranking_by_user().and_then(Value::as_i64),
            Some(1) | Some(2)
        )
    }
}
