use crate::{AnalysisResult, JobId, JobStatus, NotificationLevel, SortField, SortOrder};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DashboardView {
    pub list: JobListView,
    pub stats: StatsView,
    /// Present while an analysis view is open.
    pub detail: Option<DetailView>,
    pub form: AddUrlFormView,
    pub pending_mutations: usize,
    pub notifications: Vec<NotificationView>,
    pub dirty: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct JobListView {
    pub rows: Vec<JobRowView>,
    pub page: u32,
    pub page_size: u32,
    pub total_pages: u32,
    /// Total matching jobs, once known.
    pub count: Option<u64>,
    pub filter_status: Option<JobStatus>,
    pub search: String,
    pub sort_by: SortField,
    pub sort_order: SortOrder,
    pub loading: bool,
    pub error: Option<String>,
    pub has_prev: bool,
    pub has_next: bool,
    pub selected: Vec<JobId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobRowView {
    pub id: JobId,
    pub url: String,
    pub status: JobStatus,
    pub selected: bool,
    /// A mutation targeting this job is waiting for the server.
    pub busy: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StatsView {
    pub total: Option<u64>,
    pub breakdown: Vec<(JobStatus, u64)>,
    pub loading: bool,
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetailView {
    pub id: JobId,
    pub state: DetailState,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DetailState {
    Loading,
    /// The job exists but has not finished a crawl pass.
    NoAnalysis,
    Analyzed(AnalysisResult),
    /// The server does not know the job.
    Unknown,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AddUrlFormView {
    pub input: String,
    pub field_error: Option<String>,
    pub submitting: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationView {
    pub id: u64,
    pub level: NotificationLevel,
    pub text: String,
}
