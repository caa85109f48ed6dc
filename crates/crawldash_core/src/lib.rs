//! Crawldash core: pure dashboard state machine, query cache and
//! mutation invalidation table.
mod cache;
mod effect;
mod error;
mod model;
mod msg;
mod mutation;
mod query;
mod state;
mod update;
mod view_model;

pub use cache::{
    FetchRequest, QueryCache, QuerySnapshot, QueryValue, RequestId, MAX_IDLE_ENTRIES,
};
pub use effect::Effect;
pub use error::{ErrorKind, QueryError};
pub use model::{
    Analysis, AnalysisResult, BrokenLink, CrawledUrl, JobId, JobStatus, Stats, UrlPage,
};
pub use msg::Msg;
pub use mutation::{
    unconfirmed_ids, validate_url, Mutation, MutationId, MutationOutcome, ValidationError,
};
pub use query::{
    clamp_page_size, total_pages, KeyPattern, ListParams, QueryKey, SortField, SortOrder,
    DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE,
};
pub use state::{DashboardState, Notification, NotificationLevel, NOTIFICATION_TICKS};
pub use update::update;
pub use view_model::{
    AddUrlFormView, DashboardView, DetailState, DetailView, JobListView, JobRowView,
    NotificationView, StatsView,
};
