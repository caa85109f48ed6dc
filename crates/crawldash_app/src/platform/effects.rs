use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use crawldash_core::{
    Analysis, AnalysisResult, BrokenLink, CrawledUrl, Effect, ErrorKind, JobStatus, ListParams,
    Msg, Mutation, MutationOutcome, QueryError, QueryKey, QueryValue, Stats, UrlPage,
};
use crawldash_engine::{
    ApiError, EngineCommand, EngineEvent, EngineHandle, FailureKind, ListQuery, UrlAnalysis,
};
use dash_logging::{dash_error, dash_info};

/// Executes core effects on the engine and turns engine events back into
/// messages.
pub struct EffectRunner {
    engine: EngineHandle,
}

impl EffectRunner {
    pub fn new(engine: EngineHandle) -> Self {
        Self { engine }
    }

    pub fn run(&self, effects: Vec<Effect>) {
        for effect in effects {
            self.engine.submit(command_for(effect));
        }
    }

    /// Waits up to `timeout` for the next engine event.
    pub fn next_msg(&self, timeout: Duration) -> Option<Msg> {
        self.engine.recv_timeout(timeout).map(msg_for)
    }

    /// Forwards every engine event to `msg_tx` until the receiver is gone
    /// or the engine stops.
    pub fn spawn_event_loop(&self, msg_tx: mpsc::Sender<Msg>) -> thread::JoinHandle<()> {
        let engine = self.engine.clone();
        thread::spawn(move || loop {
            match engine.poll_event(Duration::from_millis(100)) {
                Ok(Some(event)) => {
                    if msg_tx.send(msg_for(event)).is_err() {
                        break;
                    }
                }
                Ok(None) => {}
                Err(err) => {
                    dash_error!("{}", err);
                    break;
                }
            }
        })
    }
}

fn command_for(effect: Effect) -> EngineCommand {
    match effect {
        Effect::Fetch { request_id, key } => {
            dash_info!("Fetch request_id={} key={:?}", request_id, key);
            let tag = request_id;
            match key {
                QueryKey::Urls(params) => EngineCommand::ListUrls {
                    tag,
                    query: list_query(&params),
                },
                QueryKey::Analysis(id) => EngineCommand::GetAnalysis { tag, id },
                QueryKey::Stats => EngineCommand::GetStats { tag },
            }
        }
        Effect::Mutate {
            mutation_id,
            mutation,
        } => {
            dash_info!("Mutate mutation_id={} {:?}", mutation_id, mutation);
            let tag = mutation_id;
            match mutation {
                Mutation::AddUrl { url } => EngineCommand::AddUrl { tag, url },
                Mutation::StartCrawl { id } => EngineCommand::StartCrawl { tag, id },
                Mutation::StopCrawl { id } => EngineCommand::StopCrawl { tag, id },
                Mutation::BulkDelete { ids } => EngineCommand::BulkDelete { tag, ids },
                Mutation::BulkReanalyze { ids } => EngineCommand::BulkReanalyze { tag, ids },
            }
        }
    }
}

pub fn list_query(params: &ListParams) -> ListQuery {
    ListQuery {
        skip: params.skip(),
        limit: params.limit(),
        status: params
            .filter_status
            .as_ref()
            .map(|status| status.as_str().to_string()),
        search: params.search_term().map(str::to_string),
        sort_by: Some(params.sort_by.as_str().to_string()),
        sort_order: Some(params.sort_order.as_str().to_string()),
    }
}

pub fn msg_for(event: EngineEvent) -> Msg {
    match event {
        EngineEvent::UrlsListed { tag, result } => Msg::QueryLoaded {
            request_id: tag,
            result: result
                .map(|list| {
                    QueryValue::Urls(UrlPage {
                        items: list.items.into_iter().map(map_url).collect(),
                        count: list.count,
                    })
                })
                .map_err(map_error),
        },
        EngineEvent::AnalysisFetched { tag, result, .. } => Msg::QueryLoaded {
            request_id: tag,
            result: result
                .map(|analysis| {
                    QueryValue::Analysis(match analysis {
                        Some(analysis) => Analysis::Analyzed(map_analysis(analysis)),
                        None => Analysis::NotYetAnalyzed,
                    })
                })
                .map_err(map_error),
        },
        EngineEvent::StatsFetched { tag, result } => Msg::QueryLoaded {
            request_id: tag,
            result: result
                .map(|stats| {
                    QueryValue::Stats(Stats {
                        total: stats.total,
                        by_status: stats.by_status,
                    })
                })
                .map_err(map_error),
        },
        EngineEvent::UrlAdded { tag, result } => settled(
            tag,
            result.map(|url| MutationOutcome::Added(map_url(url))),
        ),
        EngineEvent::CrawlStarted { tag, id, result } => {
            settled(tag, result.map(|_| MutationOutcome::Started(id)))
        }
        EngineEvent::CrawlStopped { tag, id, result } => {
            settled(tag, result.map(|_| MutationOutcome::Stopped(id)))
        }
        EngineEvent::UrlsDeleted { tag, result } => {
            settled(tag, result.map(MutationOutcome::Deleted))
        }
        EngineEvent::UrlsReanalyzed { tag, result } => {
            settled(tag, result.map(MutationOutcome::Reanalyzed))
        }
    }
}

fn settled(mutation_id: u64, result: Result<MutationOutcome, ApiError>) -> Msg {
    match &result {
        Ok(outcome) => dash_info!("Mutation {} settled: {:?}", mutation_id, outcome),
        Err(err) => dash_info!("Mutation {} settled with error: {}", mutation_id, err),
    }
    Msg::MutationSettled {
        mutation_id,
        result: result.map_err(map_error),
    }
}

fn map_url(url: crawldash_engine::CrawledUrl) -> CrawledUrl {
    CrawledUrl {
        id: url.id,
        status: JobStatus::parse(&url.status),
        url: url.url,
    }
}

fn map_analysis(analysis: UrlAnalysis) -> AnalysisResult {
    AnalysisResult {
        title: analysis.title,
        html_version: analysis.html_version,
        heading_counts: [
            analysis.h1_count,
            analysis.h2_count,
            analysis.h3_count,
            analysis.h4_count,
            analysis.h5_count,
            analysis.h6_count,
        ],
        internal_links_count: analysis.internal_links_count,
        external_links_count: analysis.external_links_count,
        inaccessible_links_count: analysis.inaccessible_links_count,
        has_login_form: analysis.has_login_form,
        broken_links: analysis
            .broken_links
            .into_iter()
            .map(|link| BrokenLink {
                link_url: link.link_url,
                status_code: link.status_code,
            })
            .collect(),
    }
}

pub fn map_error(err: ApiError) -> QueryError {
    let kind = match err.kind {
        FailureKind::NotFound => ErrorKind::NotFound,
        FailureKind::Rejected { .. } => ErrorKind::Rejected,
        FailureKind::Decode => ErrorKind::Decode,
        FailureKind::InvalidUrl
        | FailureKind::HttpStatus(_)
        | FailureKind::Timeout
        | FailureKind::Network => ErrorKind::Transport,
    };
    let message = match err.kind {
        FailureKind::NotFound | FailureKind::Rejected { .. } => err.message,
        _ => err.to_string(),
    };
    QueryError::new(kind, message)
}
