use crate::{
    JobId, JobStatus, MutationId, MutationOutcome, QueryError, QueryValue, RequestId, SortField,
    SortOrder,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Msg {
    /// Dashboard became visible: start observing the list and the stats.
    Mounted,
    /// Dashboard went away: drop every subscription and the cache with it.
    Unmounted,
    /// User asked for a specific 1-based page.
    PageRequested(u32),
    NextPage,
    PrevPage,
    /// `None` clears the status filter.
    FilterChanged(Option<JobStatus>),
    SearchChanged(String),
    SortChanged {
        sort_by: SortField,
        sort_order: SortOrder,
    },
    /// User edited the add-URL input box.
    UrlInputChanged(String),
    /// User submitted the add-URL form.
    UrlSubmitted,
    StartClicked(JobId),
    StopClicked(JobId),
    DeleteClicked(JobId),
    ReanalyzeClicked(JobId),
    SelectionToggled(JobId),
    SelectionCleared,
    DeleteSelectedClicked,
    ReanalyzeSelectedClicked,
    /// User opened the analysis view of a job.
    DetailOpened(JobId),
    DetailClosed,
    /// Re-fetch everything currently on screen.
    RefreshClicked,
    NotificationDismissed(u64),
    /// A fetch issued through `Effect::Fetch` finished.
    QueryLoaded {
        request_id: RequestId,
        result: Result<QueryValue, QueryError>,
    },
    /// A mutation issued through `Effect::Mutate` finished.
    MutationSettled {
        mutation_id: MutationId,
        result: Result<MutationOutcome, QueryError>,
    },
    /// UI/render tick to coalesce rendering.
    Tick,
    NoOp,
}
