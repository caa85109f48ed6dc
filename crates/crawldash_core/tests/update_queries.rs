use std::sync::Once;

use crawldash_core::{
    update, Analysis, AnalysisResult, BrokenLink, CrawledUrl, DashboardState, DetailState, Effect,
    JobStatus, ListParams, Msg, QueryError, QueryKey, QueryValue, RequestId, SortField, SortOrder,
    Stats, UrlPage,
};
use pretty_assertions::assert_eq;

fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(dash_logging::initialize_for_tests);
}

fn job(id: u64, status: JobStatus) -> CrawledUrl {
    CrawledUrl {
        id,
        url: format!("https://site{id}.example.com"),
        status,
    }
}

fn page_of(range: std::ops::RangeInclusive<u64>, count: u64) -> QueryValue {
    QueryValue::Urls(UrlPage {
        items: range.map(|id| job(id, JobStatus::Queued)).collect(),
        count,
    })
}

fn fetches(effects: &[Effect]) -> Vec<(RequestId, QueryKey)> {
    effects
        .iter()
        .filter_map(|effect| match effect {
            Effect::Fetch { request_id, key } => Some((*request_id, key.clone())),
            Effect::Mutate { .. } => None,
        })
        .collect()
}

fn loaded(
    state: DashboardState,
    request_id: RequestId,
    result: Result<QueryValue, QueryError>,
) -> DashboardState {
    let (state, effects) = update(state, Msg::QueryLoaded { request_id, result });
    assert!(effects.is_empty());
    state
}

#[test]
fn mount_fetches_list_and_stats() {
    init_logging();
    let (mut state, effects) = update(DashboardState::new(), Msg::Mounted);

    assert_eq!(
        effects,
        vec![
            Effect::Fetch {
                request_id: 1,
                key: QueryKey::Urls(ListParams::default()),
            },
            Effect::Fetch {
                request_id: 2,
                key: QueryKey::Stats,
            },
        ]
    );
    let view = state.view();
    assert!(view.list.loading);
    assert!(view.stats.loading);
    assert!(state.consume_dirty());

    let (_state, effects) = update(state, Msg::Mounted);
    assert!(effects.is_empty());
}

#[test]
fn pagination_over_twenty_five_jobs() {
    init_logging();
    let (state, _) = update(DashboardState::with_page_size(10), Msg::Mounted);
    let state = loaded(state, 1, Ok(page_of(1..=10, 25)));

    let view = state.view();
    assert_eq!(view.list.rows.len(), 10);
    assert_eq!(view.list.total_pages, 3);
    assert_eq!(view.list.count, Some(25));
    assert!(!view.list.has_prev);
    assert!(view.list.has_next);

    let (state, effects) = update(state, Msg::NextPage);
    let requests = fetches(&effects);
    assert_eq!(requests.len(), 1);
    let QueryKey::Urls(params) = &requests[0].1 else {
        panic!("expected a list fetch");
    };
    assert_eq!(params.page, 2);
    assert_eq!(params.skip(), 10);
    let state = loaded(state, requests[0].0, Ok(page_of(11..=20, 25)));

    let (state, effects) = update(state, Msg::NextPage);
    let requests = fetches(&effects);
    let state = loaded(state, requests[0].0, Ok(page_of(21..=25, 25)));

    let view = state.view();
    assert_eq!(view.list.page, 3);
    assert_eq!(view.list.rows.len(), 5);
    assert!(!view.list.has_next);

    let (state, effects) = update(state, Msg::NextPage);
    assert!(effects.is_empty());
    assert_eq!(state.params().page, 3);
}

#[test]
fn going_back_to_a_cached_page_does_not_refetch() {
    init_logging();
    let (state, _) = update(DashboardState::new(), Msg::Mounted);
    let state = loaded(state, 1, Ok(page_of(1..=10, 25)));
    let (state, effects) = update(state, Msg::NextPage);
    let state = loaded(state, fetches(&effects)[0].0, Ok(page_of(11..=20, 25)));

    let (state, effects) = update(state, Msg::PrevPage);
    assert!(effects.is_empty());
    assert_eq!(state.view().list.rows[0].id, 1);
}

#[test]
fn page_request_is_clamped_to_known_pages() {
    init_logging();
    let (state, _) = update(DashboardState::new(), Msg::Mounted);
    let state = loaded(state, 1, Ok(page_of(1..=10, 25)));

    let (state, _) = update(state, Msg::PageRequested(9));
    assert_eq!(state.params().page, 3);
    let (state, _) = update(state, Msg::PageRequested(0));
    assert_eq!(state.params().page, 1);
}

#[test]
fn filter_and_search_reset_to_first_page() {
    init_logging();
    let (state, _) = update(DashboardState::new(), Msg::Mounted);
    let state = loaded(state, 1, Ok(page_of(1..=10, 25)));
    let (state, _) = update(state, Msg::NextPage);
    assert_eq!(state.params().page, 2);

    let (state, effects) = update(state, Msg::FilterChanged(Some(JobStatus::Error)));
    assert_eq!(state.params().page, 1);
    let requests = fetches(&effects);
    let QueryKey::Urls(params) = &requests[0].1 else {
        panic!("expected a list fetch");
    };
    assert_eq!(params.filter_status, Some(JobStatus::Error));

    let (state, _) = update(state, Msg::NextPage);
    let (state, effects) = update(state, Msg::SearchChanged("site".to_string()));
    assert_eq!(state.params().page, 1);
    assert_eq!(fetches(&effects).len(), 1);

    let (state, effects) = update(
        state,
        Msg::SortChanged {
            sort_by: SortField::Url,
            sort_order: SortOrder::Asc,
        },
    );
    assert_eq!(state.params().sort_by, SortField::Url);
    assert_eq!(fetches(&effects).len(), 1);

    let (_state, effects) = update(state, Msg::SearchChanged("site".to_string()));
    assert!(effects.is_empty());
}

#[test]
fn search_is_trimmed_before_keying() {
    init_logging();
    let (state, _) = update(DashboardState::new(), Msg::Mounted);
    let state = loaded(state, 1, Ok(page_of(1..=10, 25)));

    let (state, effects) = update(state, Msg::SearchChanged("   ".to_string()));
    assert!(effects.is_empty());
    assert_eq!(state.params().search, "");

    let (state, effects) = update(state, Msg::SearchChanged("abc".to_string()));
    assert_eq!(fetches(&effects).len(), 1);
    let (state, effects) = update(state, Msg::SearchChanged(" abc ".to_string()));
    assert!(effects.is_empty());
    assert_eq!(state.params().search, "abc");
}

#[test]
fn superseded_search_result_is_discarded() {
    init_logging();
    let (state, _) = update(DashboardState::new(), Msg::Mounted);
    let state = loaded(state, 1, Ok(page_of(1..=10, 25)));

    let (state, effects) = update(state, Msg::SearchChanged("a".to_string()));
    let stale = fetches(&effects)[0].0;
    let (mut state, effects) = update(state, Msg::SearchChanged("ab".to_string()));
    let current = fetches(&effects)[0].0;
    state.consume_dirty();

    // The answer for "a" arrives after the user moved on and must not be shown.
    let (mut state, _) = update(
        state,
        Msg::QueryLoaded {
            request_id: stale,
            result: Ok(page_of(1..=3, 3)),
        },
    );
    assert!(!state.consume_dirty());
    assert!(state.view().list.rows.is_empty());
    assert!(state.view().list.loading);

    let state = loaded(state, current, Ok(page_of(4..=4, 1)));
    let view = state.view();
    assert_eq!(view.list.search, "ab");
    assert_eq!(view.list.rows.len(), 1);
    assert_eq!(view.list.rows[0].id, 4);
    assert!(!view.list.loading);
}

#[test]
fn empty_result_is_not_an_error() {
    init_logging();
    let (state, _) = update(DashboardState::new(), Msg::Mounted);
    let state = loaded(state, 1, Ok(QueryValue::Urls(UrlPage::default())));

    let view = state.view();
    assert!(view.list.rows.is_empty());
    assert_eq!(view.list.count, Some(0));
    assert_eq!(view.list.total_pages, 1);
    assert_eq!(view.list.error, None);
}

#[test]
fn failed_refresh_keeps_previous_list() {
    init_logging();
    let (state, _) = update(DashboardState::new(), Msg::Mounted);
    let state = loaded(state, 1, Ok(page_of(1..=3, 3)));
    let state = loaded(state, 2, Ok(QueryValue::Stats(Stats::default())));

    let (state, effects) = update(state, Msg::RefreshClicked);
    let requests = fetches(&effects);
    assert_eq!(requests.len(), 2);
    let state = loaded(
        state,
        requests[0].0,
        Err(QueryError::transport("connection refused")),
    );

    let view = state.view();
    assert_eq!(view.list.rows.len(), 3);
    assert_eq!(
        view.list.error.as_deref(),
        Some("transport error: connection refused")
    );
    assert!(view.stats.loading);
}

#[test]
fn stats_view_zero_fills_missing_statuses() {
    init_logging();
    let (state, _) = update(DashboardState::new(), Msg::Mounted);
    let stats = Stats {
        total: 25,
        by_status: [("queued", 10), ("running", 2), ("done", 11), ("error", 2)]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect(),
    };
    let state = loaded(state, 2, Ok(QueryValue::Stats(stats)));

    let view = state.view();
    assert_eq!(view.stats.total, Some(25));
    let sum: u64 = view.stats.breakdown.iter().map(|(_, n)| n).sum();
    assert_eq!(sum, 25);

    let (state, effects) = update(state, Msg::RefreshClicked);
    let stats_request = fetches(&effects)
        .into_iter()
        .find(|(_, key)| *key == QueryKey::Stats)
        .unwrap();
    let partial = Stats {
        total: 1,
        by_status: [("done".to_string(), 1)].into_iter().collect(),
    };
    let state = loaded(state, stats_request.0, Ok(QueryValue::Stats(partial)));
    let breakdown = state.view().stats.breakdown;
    assert_eq!(breakdown[0], (JobStatus::Queued, 0));
    assert_eq!(breakdown[2], (JobStatus::Done, 1));
}

#[test]
fn detail_distinguishes_loading_no_analysis_and_unknown() {
    init_logging();
    let (state, _) = update(DashboardState::new(), Msg::Mounted);

    let (state, effects) = update(state, Msg::DetailOpened(5));
    let requests = fetches(&effects);
    assert_eq!(requests, vec![(3, QueryKey::Analysis(5))]);
    assert_eq!(state.view().detail.unwrap().state, DetailState::Loading);

    let state = loaded(state, 3, Ok(QueryValue::Analysis(Analysis::NotYetAnalyzed)));
    assert_eq!(state.view().detail.unwrap().state, DetailState::NoAnalysis);

    let (state, effects) = update(state, Msg::DetailOpened(404));
    let request = fetches(&effects)[0].0;
    let state = loaded(state, request, Err(QueryError::not_found("URL not found")));
    let detail = state.view().detail.unwrap();
    assert_eq!(detail.id, 404);
    assert_eq!(detail.state, DetailState::Unknown);

    let (state, effects) = update(state, Msg::DetailOpened(6));
    let request = fetches(&effects)[0].0;
    let state = loaded(state, request, Err(QueryError::transport("timeout")));
    assert!(matches!(
        state.view().detail.unwrap().state,
        DetailState::Failed(_)
    ));
}

#[test]
fn detail_shows_analysis_with_broken_links_in_order() {
    init_logging();
    let (state, _) = update(DashboardState::new(), Msg::Mounted);
    let (state, effects) = update(state, Msg::DetailOpened(8));
    let analysis = AnalysisResult {
        title: Some("Example".to_string()),
        html_version: Some("HTML5".to_string()),
        heading_counts: [1, 3, 0, 0, 0, 0],
        internal_links_count: 12,
        external_links_count: 4,
        inaccessible_links_count: 2,
        has_login_form: true,
        broken_links: vec![
            BrokenLink {
                link_url: "https://example.com/b".to_string(),
                status_code: 404,
            },
            BrokenLink {
                link_url: "https://example.com/a".to_string(),
                status_code: 500,
            },
        ],
    };
    let state = loaded(
        state,
        fetches(&effects)[0].0,
        Ok(QueryValue::Analysis(Analysis::Analyzed(analysis.clone()))),
    );

    assert_eq!(
        state.view().detail.unwrap().state,
        DetailState::Analyzed(analysis)
    );

    let (state, effects) = update(state, Msg::DetailClosed);
    assert!(effects.is_empty());
    assert!(state.view().detail.is_none());
}

#[test]
fn unmount_drops_cache_and_late_results() {
    init_logging();
    let (state, _) = update(DashboardState::new(), Msg::Mounted);
    let (mut state, _) = update(state, Msg::Unmounted);
    assert!(!state.is_mounted());
    state.consume_dirty();

    let (mut state, _) = update(
        state,
        Msg::QueryLoaded {
            request_id: 1,
            result: Ok(page_of(1..=3, 3)),
        },
    );
    assert!(!state.consume_dirty());
    assert_eq!(state.cache().in_flight_count(), 0);

    let (state, effects) = update(state, Msg::Mounted);
    let ids: Vec<_> = fetches(&effects).into_iter().map(|(id, _)| id).collect();
    assert_eq!(ids, vec![3, 4]);

    // A response from before the remount still finds no taker.
    let (state, _) = update(
        state,
        Msg::QueryLoaded {
            request_id: 2,
            result: Ok(QueryValue::Stats(Stats::default())),
        },
    );
    assert!(state.view().stats.loading);
}
