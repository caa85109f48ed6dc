//! In-process crawl backend.
//!
//! `MemoryApi` answers every [`CrawlApi`] call from a table held in memory,
//! with the same filtering, sorting, paging and error rules as the HTTP
//! server. It backs the demo mode and the end-to-end tests. The crawler
//! itself is simulated through [`MemoryApi::finish_crawl`] and
//! [`MemoryApi::fail_crawl`].

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::sync::Mutex;

use dash_logging::dash_debug;

use crate::api::{CrawlApi, ANALYSIS_NOT_FOUND};
use crate::{
    ApiError, BrokenLink, CrawledUrl, FailureKind, JobId, ListQuery, UrlAnalysis, UrlList,
    UrlStats,
};

/// Largest `limit` the server accepts.
pub const MAX_LIMIT: u32 = 100;

const URL_NOT_FOUND: &str = "URL not found";

#[derive(Debug, Clone)]
struct StoredJob {
    url: CrawledUrl,
    analysis: Option<UrlAnalysis>,
}

#[derive(Debug, Default)]
struct Store {
    jobs: BTreeMap<JobId, StoredJob>,
    last_id: JobId,
}

impl Store {
    fn insert(&mut self, url: &str, status: &str) -> CrawledUrl {
        self.last_id += 1;
        let crawled = CrawledUrl {
            id: self.last_id,
            url: url.to_string(),
            status: status.to_string(),
        };
        self.jobs.insert(
            crawled.id,
            StoredJob {
                url: crawled.clone(),
                analysis: None,
            },
        );
        crawled
    }

    fn job_mut(&mut self, id: JobId) -> Result<&mut StoredJob, ApiError> {
        self.jobs
            .get_mut(&id)
            .ok_or_else(|| ApiError::new(FailureKind::NotFound, URL_NOT_FOUND))
    }
}

#[derive(Debug, Default)]
pub struct MemoryApi {
    store: Mutex<Store>,
}

impl MemoryApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds one job per `(url, status)` pair; ids are assigned in order
    /// starting at 1.
    pub fn with_jobs<U, S>(jobs: impl IntoIterator<Item = (U, S)>) -> Self
    where
        U: AsRef<str>,
        S: AsRef<str>,
    {
        let api = Self::new();
        {
            let mut store = api.lock();
            for (url, status) in jobs {
                store.insert(url.as_ref(), status.as_ref());
            }
        }
        api
    }

    /// A small data set for demo mode.
    pub fn demo() -> Self {
        let api = Self::with_jobs([
            ("https://www.rust-lang.org", "done"),
            ("https://docs.rs", "done"),
            ("https://crates.io", "running"),
            ("https://example.com/missing", "error"),
            ("https://news.ycombinator.com", "queued"),
            ("https://github.com/rust-lang/rust", "queued"),
        ]);
        api.finish_crawl(
            1,
            UrlAnalysis {
                title: Some("Rust Programming Language".to_string()),
                html_version: Some("HTML5".to_string()),
                h1_count: 1,
                h2_count: 6,
                h3_count: 4,
                internal_links_count: 42,
                external_links_count: 9,
                ..UrlAnalysis::default()
            },
        );
        api.finish_crawl(
            2,
            UrlAnalysis {
                title: Some("Docs.rs".to_string()),
                html_version: Some("HTML5".to_string()),
                h1_count: 1,
                internal_links_count: 120,
                external_links_count: 4,
                inaccessible_links_count: 1,
                has_login_form: true,
                broken_links: vec![BrokenLink {
                    link_url: "https://docs.rs/gone".to_string(),
                    status_code: 404,
                }],
                ..UrlAnalysis::default()
            },
        );
        api
    }

    /// Stores `analysis` for `id` and marks the job done.
    pub fn finish_crawl(&self, id: JobId, analysis: UrlAnalysis) -> bool {
        let mut store = self.lock();
        match store.jobs.get_mut(&id) {
            Some(job) => {
                job.url.status = "done".to_string();
                job.analysis = Some(analysis);
                true
            }
            None => false,
        }
    }

    /// Marks the job failed without an analysis.
    pub fn fail_crawl(&self, id: JobId) -> bool {
        let mut store = self.lock();
        match store.jobs.get_mut(&id) {
            Some(job) => {
                job.url.status = "error".to_string();
                true
            }
            None => false,
        }
    }

    pub fn status_of(&self, id: JobId) -> Option<String> {
        self.lock().jobs.get(&id).map(|job| job.url.status.clone())
    }

    pub fn len(&self) -> usize {
        self.lock().jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Store> {
        self.store.lock().expect("memory api lock")
    }

    fn set_status(&self, id: JobId, status: &str) -> Result<Option<CrawledUrl>, ApiError> {
        let mut store = self.lock();
        let job = store.job_mut(id)?;
        job.url.status = status.to_string();
        dash_debug!("Job {} is now {}", id, status);
        Ok(Some(job.url.clone()))
    }
}

fn compare(a: &CrawledUrl, b: &CrawledUrl, sort_by: &str) -> Ordering {
    match sort_by {
        "url" => a.url.cmp(&b.url).then(a.id.cmp(&b.id)),
        "status" => a.status.cmp(&b.status).then(a.id.cmp(&b.id)),
        _ => a.id.cmp(&b.id),
    }
}

#[async_trait::async_trait]
impl CrawlApi for MemoryApi {
    async fn list_urls(&self, query: &ListQuery) -> Result<UrlList, ApiError> {
        if query.limit > MAX_LIMIT {
            return Err(ApiError::new(
                FailureKind::Rejected { status: 422 },
                format!("limit must be at most {MAX_LIMIT}"),
            ));
        }
        let sort_by = query.sort_by.as_deref().unwrap_or("created_at");
        if !matches!(sort_by, "url" | "status" | "created_at") {
            return Err(ApiError::new(
                FailureKind::Rejected { status: 422 },
                format!("cannot sort by {sort_by}"),
            ));
        }
        let descending = query.sort_order.as_deref().unwrap_or("desc") == "desc";
        let needle = query
            .search
            .as_deref()
            .map(str::trim)
            .filter(|term| !term.is_empty())
            .map(str::to_lowercase);

        let store = self.lock();
        let mut matching: Vec<CrawledUrl> = store
            .jobs
            .values()
            .map(|job| &job.url)
            .filter(|url| query.status.as_deref().is_none_or(|status| url.status == status))
            .filter(|url| {
                needle
                    .as_deref()
                    .is_none_or(|needle| url.url.to_lowercase().contains(needle))
            })
            .cloned()
            .collect();
        matching.sort_by(|a, b| {
            let ordering = compare(a, b, sort_by);
            if descending {
                ordering.reverse()
            } else {
                ordering
            }
        });

        let count = matching.len() as u64;
        let items = matching
            .into_iter()
            .skip(usize::try_from(query.skip).unwrap_or(usize::MAX))
            .take(query.limit as usize)
            .collect();
        Ok(UrlList { items, count })
    }

    async fn add_url(&self, url: &str) -> Result<CrawledUrl, ApiError> {
        let mut store = self.lock();
        if store.jobs.values().any(|job| job.url.url == url) {
            return Err(ApiError::new(
                FailureKind::Rejected { status: 400 },
                "URL already submitted.",
            ));
        }
        Ok(store.insert(url, "queued"))
    }

    async fn start_crawl(&self, id: JobId) -> Result<Option<CrawledUrl>, ApiError> {
        self.set_status(id, "running")
    }

    async fn stop_crawl(&self, id: JobId) -> Result<Option<CrawledUrl>, ApiError> {
        self.set_status(id, "stopped")
    }

    async fn bulk_delete_urls(&self, ids: &[JobId]) -> Result<Vec<JobId>, ApiError> {
        let mut store = self.lock();
        Ok(ids
            .iter()
            .filter(|id| store.jobs.remove(*id).is_some())
            .copied()
            .collect())
    }

    async fn bulk_reanalyze_urls(&self, ids: &[JobId]) -> Result<Vec<JobId>, ApiError> {
        let mut store = self.lock();
        let mut confirmed = Vec::new();
        for id in ids {
            if let Some(job) = store.jobs.get_mut(id) {
                job.url.status = "queued".to_string();
                job.analysis = None;
                confirmed.push(*id);
            }
        }
        Ok(confirmed)
    }

    async fn get_url_analysis(&self, id: JobId) -> Result<Option<UrlAnalysis>, ApiError> {
        let store = self.lock();
        let job = store
            .jobs
            .get(&id)
            .ok_or_else(|| ApiError::new(FailureKind::NotFound, URL_NOT_FOUND))?;
        if job.analysis.is_none() {
            dash_debug!("Job {}: {}", id, ANALYSIS_NOT_FOUND);
        }
        Ok(job.analysis.clone())
    }

    async fn url_stats(&self) -> Result<UrlStats, ApiError> {
        let store = self.lock();
        let mut by_status = BTreeMap::new();
        for job in store.jobs.values() {
            *by_status.entry(job.url.status.clone()).or_insert(0) += 1;
        }
        Ok(UrlStats {
            total: store.jobs.len() as u64,
            by_status,
        })
    }
}
