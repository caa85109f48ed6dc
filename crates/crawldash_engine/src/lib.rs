//! Crawl dashboard engine: REST client, in-process backend and the
//! background runtime that executes requests.
mod api;
mod engine;
mod memory;
mod types;

pub use api::{ApiSettings, CrawlApi, ReqwestApi, ANALYSIS_NOT_FOUND};
pub use engine::{EngineCommand, EngineHandle, EngineStopped};
pub use memory::{MemoryApi, MAX_LIMIT};
pub use types::{
    ApiError, BrokenLink, CrawledUrl, EngineEvent, FailureKind, JobId, ListQuery, RequestTag,
    UrlAnalysis, UrlList, UrlStats,
};
