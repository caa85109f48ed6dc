use crate::{validate_url, DashboardState, Effect, KeyPattern, Msg, Mutation, NotificationLevel};

/// Pure update function: applies a message to state and returns any effects.
pub fn update(mut state: DashboardState, msg: Msg) -> (DashboardState, Vec<Effect>) {
    let effects = match msg {
        Msg::Mounted => state.mount(),
        Msg::Unmounted => {
            state.unmount();
            Vec::new()
        }
        Msg::PageRequested(page) => {
            let last = state.known_total_pages().unwrap_or(u32::MAX);
            let mut params = state.params().clone();
            params.page = page.clamp(1, last.max(1));
            state.set_params(params)
        }
        Msg::NextPage => match state.known_total_pages() {
            Some(total) if state.params().page < total => {
                let mut params = state.params().clone();
                params.page += 1;
                state.set_params(params)
            }
            _ => Vec::new(),
        },
        Msg::PrevPage => {
            if state.params().page > 1 {
                let mut params = state.params().clone();
                params.page -= 1;
                state.set_params(params)
            } else {
                Vec::new()
            }
        }
        Msg::FilterChanged(filter_status) => {
            let mut params = state.params().clone();
            if params.filter_status == filter_status {
                return (state, Vec::new());
            }
            params.filter_status = filter_status;
            params.page = 1;
            state.set_params(params)
        }
        Msg::SearchChanged(search) => {
            let search = search.trim().to_string();
            let mut params = state.params().clone();
            if params.search == search {
                return (state, Vec::new());
            }
            params.search = search;
            params.page = 1;
            state.set_params(params)
        }
        Msg::SortChanged {
            sort_by,
            sort_order,
        } => {
            let mut params = state.params().clone();
            if params.sort_by == sort_by && params.sort_order == sort_order {
                return (state, Vec::new());
            }
            params.sort_by = sort_by;
            params.sort_order = sort_order;
            params.page = 1;
            state.set_params(params)
        }
        Msg::UrlInputChanged(input) => {
            state.set_url_input(input);
            Vec::new()
        }
        Msg::UrlSubmitted => match validate_url(state.url_input()) {
            Ok(url) => mutate(&mut state, Mutation::AddUrl { url }),
            Err(err) => {
                state.set_field_error(err);
                Vec::new()
            }
        },
        Msg::StartClicked(id) => mutate(&mut state, Mutation::StartCrawl { id }),
        Msg::StopClicked(id) => mutate(&mut state, Mutation::StopCrawl { id }),
        Msg::DeleteClicked(id) => mutate(&mut state, Mutation::BulkDelete { ids: vec![id] }),
        Msg::ReanalyzeClicked(id) => {
            mutate(&mut state, Mutation::BulkReanalyze { ids: vec![id] })
        }
        Msg::SelectionToggled(id) => {
            state.toggle_selected(id);
            Vec::new()
        }
        Msg::SelectionCleared => {
            state.clear_selection();
            Vec::new()
        }
        Msg::DeleteSelectedClicked => {
            let ids = state.selected_ids();
            if ids.is_empty() {
                state.notify(NotificationLevel::Warning, NOTHING_SELECTED.to_string());
                Vec::new()
            } else {
                mutate(&mut state, Mutation::BulkDelete { ids })
            }
        }
        Msg::ReanalyzeSelectedClicked => {
            let ids = state.selected_ids();
            if ids.is_empty() {
                state.notify(NotificationLevel::Warning, NOTHING_SELECTED.to_string());
                Vec::new()
            } else {
                mutate(&mut state, Mutation::BulkReanalyze { ids })
            }
        }
        Msg::DetailOpened(id) => state.open_detail(id),
        Msg::DetailClosed => {
            state.close_detail();
            Vec::new()
        }
        Msg::RefreshClicked => {
            let effects = state.invalidate_all(&[KeyPattern::Everything]);
            state.mark_dirty();
            effects
        }
        Msg::NotificationDismissed(id) => {
            state.dismiss(id);
            Vec::new()
        }
        Msg::QueryLoaded { request_id, result } => {
            state.apply_query_result(request_id, result);
            Vec::new()
        }
        Msg::MutationSettled {
            mutation_id,
            result,
        } => state.settle_mutation(mutation_id, result),
        Msg::Tick => {
            state.tick();
            Vec::new()
        }
        Msg::NoOp => Vec::new(),
    };

    (state, effects)
}

const NOTHING_SELECTED: &str = "Select at least one URL first";

fn mutate(state: &mut DashboardState, mutation: Mutation) -> Vec<Effect> {
    state.begin_mutation(mutation).into_iter().collect()
}
