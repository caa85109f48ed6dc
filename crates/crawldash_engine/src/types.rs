use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub type JobId = u64;

/// Correlates an [`EngineCommand`](crate::EngineCommand) with its
/// [`EngineEvent`].
pub type RequestTag = u64;

/// A job as the server sends it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrawledUrl {
    pub id: JobId,
    pub url: String,
    #[serde(default)]
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct UrlList {
    pub items: Vec<CrawledUrl>,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrokenLink {
    pub link_url: String,
    #[serde(default)]
    pub status_code: u16,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct UrlAnalysis {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub html_version: Option<String>,
    #[serde(default)]
    pub h1_count: u32,
    #[serde(default)]
    pub h2_count: u32,
    #[serde(default)]
    pub h3_count: u32,
    #[serde(default)]
    pub h4_count: u32,
    #[serde(default)]
    pub h5_count: u32,
    #[serde(default)]
    pub h6_count: u32,
    #[serde(default)]
    pub internal_links_count: u32,
    #[serde(default)]
    pub external_links_count: u32,
    #[serde(default)]
    pub inaccessible_links_count: u32,
    #[serde(default)]
    pub has_login_form: bool,
    #[serde(default)]
    pub broken_links: Vec<BrokenLink>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct UrlStats {
    pub total: u64,
    #[serde(default)]
    pub by_status: BTreeMap<String, u64>,
}

/// Query string of `GET /urls`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ListQuery {
    pub skip: u64,
    pub limit: u32,
    pub status: Option<String>,
    pub search: Option<String>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    UrlsListed {
        tag: RequestTag,
        result: Result<UrlList, ApiError>,
    },
    AnalysisFetched {
        tag: RequestTag,
        id: JobId,
        /// `Ok(None)`: the job exists but has no analysis yet.
        result: Result<Option<UrlAnalysis>, ApiError>,
    },
    StatsFetched {
        tag: RequestTag,
        result: Result<UrlStats, ApiError>,
    },
    UrlAdded {
        tag: RequestTag,
        result: Result<CrawledUrl, ApiError>,
    },
    CrawlStarted {
        tag: RequestTag,
        id: JobId,
        result: Result<Option<CrawledUrl>, ApiError>,
    },
    CrawlStopped {
        tag: RequestTag,
        id: JobId,
        result: Result<Option<CrawledUrl>, ApiError>,
    },
    /// Carries the ids the server confirmed as deleted.
    UrlsDeleted {
        tag: RequestTag,
        result: Result<Vec<JobId>, ApiError>,
    },
    /// Carries the ids the server confirmed as queued again.
    UrlsReanalyzed {
        tag: RequestTag,
        result: Result<Vec<JobId>, ApiError>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {message}")]
pub struct ApiError {
    pub kind: FailureKind,
    pub message: String,
}

impl ApiError {
    pub(crate) fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    InvalidUrl,
    NotFound,
    /// 400/409/422: the server understood and refused the request.
    Rejected { status: u16 },
    HttpStatus(u16),
    Timeout,
    Network,
    Decode,
}

impl FailureKind {
    pub(crate) fn from_status(status: u16) -> Self {
        match status {
            404 => FailureKind::NotFound,
            400 | 409 | 422 => FailureKind::Rejected { status },
            other => FailureKind::HttpStatus(other),
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::InvalidUrl => write!(f, "invalid url"),
            FailureKind::NotFound => write!(f, "not found"),
            FailureKind::Rejected { status } => write!(f, "rejected with status {status}"),
            FailureKind::HttpStatus(code) => write!(f, "http status {code}"),
            FailureKind::Timeout => write!(f, "timeout"),
            FailureKind::Network => write!(f, "network error"),
            FailureKind::Decode => write!(f, "unreadable response"),
        }
    }
}
