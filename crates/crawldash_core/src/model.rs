use std::collections::BTreeMap;
use std::fmt;

/// Server-assigned job identity. Immutable once assigned.
pub type JobId = u64;

/// Crawl status of a job.
///
/// The server owns the set of statuses. The four well-known ones get their own
/// variants; anything else (for example `stopped` after a stop request) is
/// carried verbatim in `Other` so a post-stop state is never rejected.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum JobStatus {
    Queued,
    Running,
    Done,
    Error,
    Other(String),
}

impl JobStatus {
    /// Statuses offered by the status filter, in display order.
    pub const FILTERABLE: [JobStatus; 4] = [
        JobStatus::Queued,
        JobStatus::Running,
        JobStatus::Done,
        JobStatus::Error,
    ];

    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "queued" => JobStatus::Queued,
            "running" => JobStatus::Running,
            "done" => JobStatus::Done,
            "error" => JobStatus::Error,
            _ => JobStatus::Other(raw.trim().to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            JobStatus::Queued => "queued",
            JobStatus::Running => "running",
            JobStatus::Done => "done",
            JobStatus::Error => "error",
            JobStatus::Other(name) => name,
        }
    }

    pub fn is_running(&self) -> bool {
        matches!(self, JobStatus::Running)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawledUrl {
    pub id: JobId,
    pub url: String,
    pub status: JobStatus,
}

/// A link found during a crawl pass that answered with an error status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrokenLink {
    pub link_url: String,
    pub status_code: u16,
}

/// HTML analysis of one job's last crawl pass.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AnalysisResult {
    pub title: Option<String>,
    pub html_version: Option<String>,
    /// Heading counts for `h1` through `h6`, index 0 is `h1`.
    pub heading_counts: [u32; 6],
    pub internal_links_count: u32,
    pub external_links_count: u32,
    pub inaccessible_links_count: u32,
    pub has_login_form: bool,
    /// In crawl discovery order.
    pub broken_links: Vec<BrokenLink>,
}

impl AnalysisResult {
    /// Count for heading level `1..=6`; other levels count as zero.
    pub fn heading_count(&self, level: usize) -> u32 {
        match level {
            1..=6 => self.heading_counts[level - 1],
            _ => 0,
        }
    }
}

/// Per-job analysis state as seen by the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Analysis {
    /// The job exists but no crawl pass has produced an analysis yet.
    NotYetAnalyzed,
    Analyzed(AnalysisResult),
}

/// One page of the job list plus the total number of matching jobs.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct UrlPage {
    pub items: Vec<CrawledUrl>,
    pub count: u64,
}

/// Fleet-wide job counts.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Stats {
    pub total: u64,
    /// Keyed by status name. Missing keys mean zero.
    pub by_status: BTreeMap<String, u64>,
}

impl Stats {
    pub fn count(&self, status: &JobStatus) -> u64 {
        self.by_status.get(status.as_str()).copied().unwrap_or(0)
    }

    /// The four well-known statuses first (zero-filled), then any others the
    /// server reported, sorted by name.
    pub fn breakdown(&self) -> Vec<(JobStatus, u64)> {
        let mut rows: Vec<(JobStatus, u64)> = JobStatus::FILTERABLE
            .iter()
            .map(|status| (status.clone(), self.count(status)))
            .collect();
        for (name, count) in &self.by_status {
            let status = JobStatus::parse(name);
            if matches!(status, JobStatus::Other(_)) {
                rows.push((status, *count));
            }
        }
        rows
    }

    pub fn by_status_sum(&self) -> u64 {
        self.by_status.values().sum()
    }
}
