use crate::{JobId, JobStatus};

pub const DEFAULT_PAGE_SIZE: u32 = 10;
/// The server rejects `limit` above this value.
pub const MAX_PAGE_SIZE: u32 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum SortField {
    Url,
    Status,
    #[default]
    CreatedAt,
}

impl SortField {
    pub fn as_str(self) -> &'static str {
        match self {
            SortField::Url => "url",
            SortField::Status => "status",
            SortField::CreatedAt => "created_at",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    pub fn as_str(self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }
}

/// Parameters of a job list query. Also its cache identity: two distinct
/// parameter sets never share a cache entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListParams {
    /// 1-based.
    pub page: u32,
    pub page_size: u32,
    pub filter_status: Option<JobStatus>,
    /// Empty means no search filter.
    pub search: String,
    pub sort_by: SortField,
    pub sort_order: SortOrder,
}

impl ListParams {
    pub fn first_page(page_size: u32) -> Self {
        Self {
            page: 1,
            page_size: clamp_page_size(page_size),
            filter_status: None,
            search: String::new(),
            sort_by: SortField::default(),
            sort_order: SortOrder::default(),
        }
    }

    pub fn skip(&self) -> u64 {
        u64::from(self.page.max(1) - 1) * u64::from(self.page_size)
    }

    pub fn limit(&self) -> u32 {
        self.page_size
    }

    /// Search term to send, or `None` when the box is blank.
    pub fn search_term(&self) -> Option<&str> {
        let trimmed = self.search.trim();
        (!trimmed.is_empty()).then_some(trimmed)
    }

    pub fn total_pages(&self, count: u64) -> u32 {
        total_pages(count, self.page_size)
    }
}

impl Default for ListParams {
    fn default() -> Self {
        Self::first_page(DEFAULT_PAGE_SIZE)
    }
}

pub fn clamp_page_size(page_size: u32) -> u32 {
    page_size.clamp(1, MAX_PAGE_SIZE)
}

/// `max(1, ceil(count / page_size))`.
pub fn total_pages(count: u64, page_size: u32) -> u32 {
    let page_size = u64::from(page_size.max(1));
    let pages = count.div_ceil(page_size).max(1);
    u32::try_from(pages).unwrap_or(u32::MAX)
}

/// Canonical identity of a cached query.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum QueryKey {
    Urls(ListParams),
    Analysis(JobId),
    Stats,
}

/// Selects a set of cache keys for invalidation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyPattern {
    /// Every job list entry regardless of parameters.
    AllUrls,
    AnalysisOf(Vec<JobId>),
    Stats,
    Everything,
}

impl KeyPattern {
    pub fn matches(&self, key: &QueryKey) -> bool {
        match (self, key) {
            (KeyPattern::Everything, _) => true,
            (KeyPattern::AllUrls, QueryKey::Urls(_)) => true,
            (KeyPattern::AnalysisOf(ids), QueryKey::Analysis(id)) => ids.contains(id),
            (KeyPattern::Stats, QueryKey::Stats) => true,
            _ => false,
        }
    }
}
