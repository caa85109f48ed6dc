use std::collections::{BTreeMap, BTreeSet};

use dash_logging::{dash_debug, dash_info};

use crate::view_model::{
    AddUrlFormView, DashboardView, DetailState, DetailView, JobListView, JobRowView,
    NotificationView, StatsView,
};
use crate::{
    Analysis, Effect, ErrorKind, JobId, KeyPattern, ListParams, Mutation, MutationId,
    MutationOutcome, QueryCache, QueryError, QueryKey, QueryValue, RequestId, ValidationError,
    DEFAULT_PAGE_SIZE,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationLevel {
    Success,
    Warning,
    Error,
}

/// Ticks a notification stays visible unless dismissed first.
pub const NOTIFICATION_TICKS: u64 = 50;

/// Transient, dismissible message about a settled mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub id: u64,
    pub level: NotificationLevel,
    pub text: String,
    /// Tick at which the notification is dropped.
    pub expires_at: u64,
}

/// Dashboard session state. Owns the query cache; dropping the state drops
/// the cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DashboardState {
    cache: QueryCache,
    mounted: bool,
    params: ListParams,
    detail: Option<JobId>,
    url_input: String,
    field_error: Option<ValidationError>,
    selected: BTreeSet<JobId>,
    pending: BTreeMap<MutationId, Mutation>,
    next_mutation_id: MutationId,
    notifications: Vec<Notification>,
    next_notification_id: u64,
    ticks: u64,
    dirty: bool,
}

impl Default for DashboardState {
    fn default() -> Self {
        Self::with_page_size(DEFAULT_PAGE_SIZE)
    }
}

impl DashboardState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Page size is fixed for the whole session.
    pub fn with_page_size(page_size: u32) -> Self {
        Self {
            cache: QueryCache::new(),
            mounted: false,
            params: ListParams::first_page(page_size),
            detail: None,
            url_input: String::new(),
            field_error: None,
            selected: BTreeSet::new(),
            pending: BTreeMap::new(),
            next_mutation_id: 0,
            notifications: Vec::new(),
            next_notification_id: 0,
            ticks: 0,
            dirty: false,
        }
    }

    pub fn params(&self) -> &ListParams {
        &self.params
    }

    pub fn cache(&self) -> &QueryCache {
        &self.cache
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted
    }

    /// Returns whether a re-render is due and clears the flag.
    pub fn consume_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    pub(crate) fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub(crate) fn mount(&mut self) -> Vec<Effect> {
        if self.mounted {
            return Vec::new();
        }
        self.mounted = true;
        self.mark_dirty();
        let mut keys = vec![QueryKey::Urls(self.params.clone()), QueryKey::Stats];
        if let Some(id) = self.detail {
            keys.push(QueryKey::Analysis(id));
        }
        keys.into_iter()
            .filter_map(|key| self.cache.subscribe(key))
            .map(Effect::from)
            .collect()
    }

    pub(crate) fn unmount(&mut self) {
        if !self.mounted {
            return;
        }
        dash_info!(
            "Dashboard unmounted, dropping cache with {} request(s) in flight",
            self.cache.in_flight_count()
        );
        self.mounted = false;
        self.cache.clear();
        self.mark_dirty();
    }

    /// Switches the list to `params`, moving the subscription along.
    pub(crate) fn set_params(&mut self, params: ListParams) -> Vec<Effect> {
        if params == self.params {
            return Vec::new();
        }
        let old = std::mem::replace(&mut self.params, params);
        self.mark_dirty();
        if !self.mounted {
            return Vec::new();
        }
        self.cache.unsubscribe(&QueryKey::Urls(old));
        self.cache
            .subscribe(QueryKey::Urls(self.params.clone()))
            .map(Effect::from)
            .into_iter()
            .collect()
    }

    /// Total pages of the current list, once its count is known.
    pub(crate) fn known_total_pages(&self) -> Option<u32> {
        match self.cache.get(&QueryKey::Urls(self.params.clone())) {
            Some(QueryValue::Urls(page)) => Some(self.params.total_pages(page.count)),
            _ => None,
        }
    }

    pub(crate) fn open_detail(&mut self, id: JobId) -> Vec<Effect> {
        if self.detail == Some(id) {
            return Vec::new();
        }
        self.close_detail();
        self.detail = Some(id);
        self.mark_dirty();
        if !self.mounted {
            return Vec::new();
        }
        self.cache
            .subscribe(QueryKey::Analysis(id))
            .map(Effect::from)
            .into_iter()
            .collect()
    }

    pub(crate) fn close_detail(&mut self) {
        if let Some(id) = self.detail.take() {
            if self.mounted {
                self.cache.unsubscribe(&QueryKey::Analysis(id));
            }
            self.mark_dirty();
        }
    }

    pub(crate) fn set_url_input(&mut self, input: String) {
        self.url_input = input;
        self.field_error = None;
        self.mark_dirty();
    }

    pub(crate) fn url_input(&self) -> &str {
        &self.url_input
    }

    pub(crate) fn set_field_error(&mut self, error: ValidationError) {
        self.field_error = Some(error);
        self.mark_dirty();
    }

    pub(crate) fn toggle_selected(&mut self, id: JobId) {
        if !self.selected.remove(&id) {
            self.selected.insert(id);
        }
        self.mark_dirty();
    }

    pub(crate) fn clear_selection(&mut self) {
        if !self.selected.is_empty() {
            self.selected.clear();
            self.mark_dirty();
        }
    }

    pub(crate) fn selected_ids(&self) -> Vec<JobId> {
        self.selected.iter().copied().collect()
    }

    /// Registers a mutation as pending. Returns `None` when an identical
    /// mutation is already waiting for the server.
    pub(crate) fn begin_mutation(&mut self, mutation: Mutation) -> Option<Effect> {
        if self.pending.values().any(|pending| *pending == mutation) {
            dash_debug!("Ignoring duplicate {} while one is pending", mutation.label());
            return None;
        }
        self.next_mutation_id += 1;
        let mutation_id = self.next_mutation_id;
        self.pending.insert(mutation_id, mutation.clone());
        self.mark_dirty();
        Some(Effect::Mutate {
            mutation_id,
            mutation,
        })
    }

    /// Applies a settled mutation. On success the invalidation table for the
    /// mutation runs; on failure the cache is left untouched.
    pub(crate) fn settle_mutation(
        &mut self,
        mutation_id: MutationId,
        result: Result<MutationOutcome, QueryError>,
    ) -> Vec<Effect> {
        let Some(mutation) = self.pending.remove(&mutation_id) else {
            dash_debug!("Ignoring settlement of unknown mutation {}", mutation_id);
            return Vec::new();
        };
        self.mark_dirty();

        let outcome = match result {
            Ok(outcome) => outcome,
            Err(err) => {
                let text = failure_text(&mutation, &err);
                self.notify(NotificationLevel::Error, text);
                return Vec::new();
            }
        };

        let requested = mutation.targets();
        if let Some(confirmed) = outcome.confirmed_ids() {
            if confirmed.is_empty() {
                let err = QueryError::not_found("none of the selected URLs exist");
                let text = failure_text(&mutation, &err);
                self.notify(NotificationLevel::Error, text);
                return Vec::new();
            }
            let missing = crate::unconfirmed_ids(&requested, confirmed);
            if !missing.is_empty() {
                self.notify(
                    NotificationLevel::Warning,
                    format!(
                        "{}: {} of {} URL(s) not found ({})",
                        mutation.label(),
                        missing.len(),
                        requested.len(),
                        join_ids(&missing)
                    ),
                );
            }
        }

        match &outcome {
            MutationOutcome::Added(job) => {
                if self.url_input.trim() == job.url {
                    self.url_input.clear();
                }
                self.notify(NotificationLevel::Success, "URL added!".to_string());
            }
            MutationOutcome::Deleted(_) => {
                // Unconfirmed ids are gone as far as the server knows.
                for id in &requested {
                    self.selected.remove(id);
                }
            }
            MutationOutcome::Started(_)
            | MutationOutcome::Stopped(_)
            | MutationOutcome::Reanalyzed(_) => {}
        }

        self.invalidate_all(&mutation.invalidations())
    }

    pub(crate) fn invalidate_all(&mut self, patterns: &[KeyPattern]) -> Vec<Effect> {
        patterns
            .iter()
            .flat_map(|pattern| self.cache.invalidate(pattern))
            .map(Effect::from)
            .collect()
    }

    pub(crate) fn apply_query_result(
        &mut self,
        request_id: RequestId,
        result: Result<QueryValue, QueryError>,
    ) {
        if self.cache.complete(request_id, result).is_some() {
            self.mark_dirty();
        }
    }

    pub(crate) fn notify(&mut self, level: NotificationLevel, text: String) {
        self.next_notification_id += 1;
        self.notifications.push(Notification {
            id: self.next_notification_id,
            level,
            text,
            expires_at: self.ticks + NOTIFICATION_TICKS,
        });
        self.mark_dirty();
    }

    /// Advances the tick clock and drops expired notifications.
    pub(crate) fn tick(&mut self) {
        self.ticks += 1;
        let now = self.ticks;
        let before = self.notifications.len();
        self.notifications.retain(|n| n.expires_at > now);
        if self.notifications.len() != before {
            self.mark_dirty();
        }
    }

    pub(crate) fn dismiss(&mut self, id: u64) {
        let before = self.notifications.len();
        self.notifications.retain(|n| n.id != id);
        if self.notifications.len() != before {
            self.mark_dirty();
        }
    }

    pub fn view(&self) -> DashboardView {
        DashboardView {
            list: self.list_view(),
            stats: self.stats_view(),
            detail: self.detail.map(|id| self.detail_view(id)),
            form: AddUrlFormView {
                input: self.url_input.clone(),
                field_error: self.field_error.map(|e| e.to_string()),
                submitting: self
                    .pending
                    .values()
                    .any(|m| matches!(m, Mutation::AddUrl { .. })),
            },
            pending_mutations: self.pending.len(),
            notifications: self
                .notifications
                .iter()
                .map(|n| NotificationView {
                    id: n.id,
                    level: n.level,
                    text: n.text.clone(),
                })
                .collect(),
            dirty: self.dirty,
        }
    }

    fn list_view(&self) -> JobListView {
        let snapshot = self.cache.snapshot(&QueryKey::Urls(self.params.clone()));
        let busy: BTreeSet<JobId> = self.pending.values().flat_map(|m| m.targets()).collect();
        let (rows, count): (Vec<JobRowView>, Option<u64>) = match snapshot.value {
            Some(QueryValue::Urls(page)) => (
                page.items
                    .iter()
                    .map(|job| JobRowView {
                        id: job.id,
                        url: job.url.clone(),
                        status: job.status.clone(),
                        selected: self.selected.contains(&job.id),
                        busy: busy.contains(&job.id),
                    })
                    .collect(),
                Some(page.count),
            ),
            _ => (Vec::new(), None),
        };
        let total_pages = self.params.total_pages(count.unwrap_or(0));
        JobListView {
            rows,
            page: self.params.page,
            page_size: self.params.page_size,
            total_pages,
            count,
            filter_status: self.params.filter_status.clone(),
            search: self.params.search.clone(),
            sort_by: self.params.sort_by,
            sort_order: self.params.sort_order,
            loading: snapshot.fetching,
            error: snapshot.error.map(|e| e.to_string()),
            has_prev: self.params.page > 1,
            has_next: count.is_some() && self.params.page < total_pages,
            selected: self.selected_ids(),
        }
    }

    fn stats_view(&self) -> StatsView {
        let snapshot = self.cache.snapshot(&QueryKey::Stats);
        let stats = match snapshot.value {
            Some(QueryValue::Stats(stats)) => Some(stats),
            _ => None,
        };
        StatsView {
            total: stats.map(|s| s.total),
            breakdown: stats.map(|s| s.breakdown()).unwrap_or_default(),
            loading: snapshot.fetching,
            error: snapshot.error.map(|e| e.to_string()),
        }
    }

    fn detail_view(&self, id: JobId) -> DetailView {
        let snapshot = self.cache.snapshot(&QueryKey::Analysis(id));
        // Only a valid analysis is shown; an invalidated one waits for the refetch.
        let state = match (snapshot.error, snapshot.value) {
            (Some(err), _) if err.kind == ErrorKind::NotFound => DetailState::Unknown,
            (_, Some(QueryValue::Analysis(analysis))) if snapshot.valid => match analysis {
                Analysis::NotYetAnalyzed => DetailState::NoAnalysis,
                Analysis::Analyzed(result) => DetailState::Analyzed(result.clone()),
            },
            (Some(err), _) if !snapshot.fetching => DetailState::Failed(err.to_string()),
            _ => DetailState::Loading,
        };
        DetailView { id, state }
    }
}

fn failure_text(mutation: &Mutation, err: &QueryError) -> String {
    match (mutation, err.kind) {
        (Mutation::AddUrl { .. }, ErrorKind::Rejected) if !err.message.is_empty() => {
            err.message.clone()
        }
        (Mutation::AddUrl { .. }, _) => "Failed to add URL".to_string(),
        (_, ErrorKind::NotFound) => format!(
            "Failed to {}: URL {} not found",
            mutation.label(),
            join_ids(&mutation.targets())
        ),
        _ => format!("Failed to {}: {}", mutation.label(), err),
    }
}

fn join_ids(ids: &[JobId]) -> String {
    ids.iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
