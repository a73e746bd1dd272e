use async_trait::async_trait;
use reqwest::{header, Client, Url};
use serde_json::Value;
use std::fmt;
use thiserror::Error;
use tracing::debug;

use crate::config::Account;
use crate::model::{Job, JobKind, SortOrder};

const GALLERY_API_BASE: &str = "https://www.midjourney.com/";
const RECENT_JOBS_PATH: &str = "api/app/recent-jobs/";
const SESSION_COOKIE: &str = "__Secure-next-auth.session-token";
pub const PAGE_SIZE: u32 = 50;

/// The gallery gates access on a browser-looking client.
pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/110.0.0.0 Safari/537.36";

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("gallery returned {status} for {url}: {body}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
        body: String,
    },
    #[error("unexpected response body: {0}")]
    Malformed(String),
}

/// What one page request yielded.
#[derive(Debug, Clone, PartialEq)]
pub enum Page {
    Jobs(Vec<Job>),
    /// The server's "no jobs" sentinel.
    EndOfResults,
    /// An empty array or empty body.
    Empty,
}

/// Query parameters that stay fixed for the whole pagination run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageQuery {
    pub kind: JobKind,
    pub sort_order: SortOrder,
}

/// Network seam between the downloader and the gallery.
#[async_trait]
pub trait Gallery: Send + Sync {
    async fn fetch_page(&self, query: &PageQuery, page: u32) -> Result<Page, FetchError>;

    async fn download_image(&self, url: &str) -> Result<Vec<u8>, FetchError>;
}

#[derive(Clone)]
pub struct GalleryClient {
    http: Client,
    base_url: Url,
    account: Account,
}

impl fmt::Debug for GalleryClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GalleryClient")
            .field("base_url", &self.base_url)
            .field("user_id", &self.account.user_id)
            .finish_non_exhaustive()
    }
}

impl GalleryClient {
    pub fn new(account: Account) -> Result<Self, FetchError> {
        let base_url = Url::parse(GALLERY_API_BASE)
            .map_err(|e| FetchError::Malformed(format!("invalid gallery URL: {e}")))?;
        Self::with_base_url(account, base_url)
    }

    pub fn with_base_url(account: Account, base_url: Url) -> Result<Self, FetchError> {
        let http = Client::builder()
            .user_agent(BROWSER_USER_AGENT)
            .build()
            .map_err(|source| FetchError::Transport {
                url: base_url.to_string(),
                source,
            })?;
        Ok(Self {
            http,
            base_url,
            account,
        })
    }

    /// Build the listing request for `page` (1-based).
    pub fn build_page_request(&self, query: &PageQuery, page: u32) -> Result<reqwest::Request, FetchError> {
        let endpoint = self
            .base_url
            .join(RECENT_JOBS_PATH)
            .map_err(|e| FetchError::Malformed(format!("invalid gallery URL: {e}")))?;

        let mut params: Vec<(&str, String)> = vec![
            ("orderBy", query.sort_order.as_str().to_string()),
            ("jobStatus", "completed".to_string()),
            ("userId", self.account.user_id.clone()),
            ("dedupe", "true".to_string()),
            ("refreshApi", "0".to_string()),
            ("amount", PAGE_SIZE.to_string()),
            ("page", page.to_string()),
        ];
        if let Some(job_type) = query.kind.job_type() {
            params.push(("jobType", job_type.to_string()));
        }

        self.http
            .get(endpoint.clone())
            .query(&params)
            .header(
                header::COOKIE,
                format!("{}={}", SESSION_COOKIE, self.account.session_token),
            )
            .build()
            .map_err(|source| FetchError::Transport {
                url: endpoint.to_string(),
                source,
            })
    }
}

#[async_trait]
impl Gallery for GalleryClient {
    async fn fetch_page(&self, query: &PageQuery, page: u32) -> Result<Page, FetchError> {
        let request = self.build_page_request(query, page)?;
        let url = request.url().to_string();
        debug!(%url, page, "fetching job page");

        let res = self
            .http
            .execute(request)
            .await
            .map_err(|source| FetchError::Transport {
                url: url.clone(),
                source,
            })?;
        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(FetchError::Status { url, status, body });
        }

        let body = res
            .text()
            .await
            .map_err(|source| FetchError::Transport { url, source })?;
        classify_page(&body)
    }

    async fn download_image(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        debug!(%url, "downloading image");
        let res = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|source| FetchError::Transport {
                url: url.to_string(),
                source,
            })?;
        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(FetchError::Status {
                url: url.to_string(),
                status,
                body,
            });
        }
        let bytes = res.bytes().await.map_err(|source| FetchError::Transport {
            url: url.to_string(),
            source,
        })?;
        Ok(bytes.to_vec())
    }
}

/// True when `value` is the one-element `[{"msg": "... no jobs ..."}]` sentinel.
pub fn is_end_sentinel(value: &Value) -> bool {
    value
        .as_array()
        .and_then(|items| items.first())
        .and_then(|first| first.get("msg"))
        .and_then(Value::as_str)
        .map(|msg| msg.to_lowercase().contains("no jobs"))
        .unwrap_or(false)
}

/// Interpret a listing response body.
pub fn classify_page(body: &str) -> Result<Page, FetchError> {
    if body.trim().is_empty() {
        return Ok(Page::Empty);
    }
    let value: Value =
        serde_json::from_str(body).map_err(|e| FetchError::Malformed(e.to_string()))?;
    if is_end_sentinel(&value) {
        return Ok(Page::EndOfResults);
    }
    match value {
        Value::Array(items) if items.is_empty() => Ok(Page::Empty),
        Value::Array(items) => {
            let jobs = items
                .into_iter()
                .map(serde_json::from_value::<Job>)
                .collect::<Result<Vec<_>, _>>()
                .map_err(|e| FetchError::Malformed(format!("invalid job record: {e}")))?;
            Ok(Page::Jobs(jobs))
        }
        Value::Null => Ok(Page::Empty),
        other => Err(FetchError::Malformed(format!(
            "expected a JSON array, got {}",
            truncate_for_log(&other.to_string())
        ))),
    }
}

fn truncate_for_log(s: &str) -> String {
    s.chars().take(200).collect()
}
