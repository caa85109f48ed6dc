use std::sync::mpsc::RecvTimeoutError;
use std::sync::{mpsc, Arc, Mutex};
use std::thread;
use std::time::Duration;

use dash_logging::{dash_debug, dash_warn};
use thiserror::Error;

use crate::api::{ApiSettings, CrawlApi, ReqwestApi};
use crate::{ApiError, EngineEvent, JobId, ListQuery, RequestTag};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineCommand {
    ListUrls { tag: RequestTag, query: ListQuery },
    GetAnalysis { tag: RequestTag, id: JobId },
    GetStats { tag: RequestTag },
    AddUrl { tag: RequestTag, url: String },
    StartCrawl { tag: RequestTag, id: JobId },
    StopCrawl { tag: RequestTag, id: JobId },
    BulkDelete { tag: RequestTag, ids: Vec<JobId> },
    BulkReanalyze { tag: RequestTag, ids: Vec<JobId> },
}

/// The engine thread is gone; no further events will arrive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("engine thread has stopped")]
pub struct EngineStopped;

/// Runs API calls on a background tokio runtime. Every command produces
/// exactly one [`EngineEvent`] carrying the same tag, in completion order.
#[derive(Clone)]
pub struct EngineHandle {
    cmd_tx: mpsc::Sender<EngineCommand>,
    event_rx: Arc<Mutex<mpsc::Receiver<EngineEvent>>>,
}

impl EngineHandle {
    pub fn new(settings: ApiSettings) -> Result<Self, ApiError> {
        let api = ReqwestApi::new(settings)?;
        Ok(Self::with_api(Arc::new(api)))
    }

    pub fn with_api(api: Arc<dyn CrawlApi>) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::channel();
        let (event_tx, event_rx) = mpsc::channel();

        thread::spawn(move || {
            let runtime = tokio::runtime::Runtime::new().expect("tokio runtime");
            while let Ok(command) = cmd_rx.recv() {
                let api = api.clone();
                let event_tx = event_tx.clone();
                runtime.spawn(async move {
                    let event = handle_command(api.as_ref(), command).await;
                    let _ = event_tx.send(event);
                });
            }
        });

        Self {
            cmd_tx,
            event_rx: Arc::new(Mutex::new(event_rx)),
        }
    }

    pub fn submit(&self, command: EngineCommand) {
        dash_debug!("Engine command {:?}", command);
        let _ = self.cmd_tx.send(command);
    }

    pub fn try_recv(&self) -> Option<EngineEvent> {
        self.event_rx.lock().ok()?.try_recv().ok()
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Option<EngineEvent> {
        self.poll_event(timeout).ok().flatten()
    }

    /// Like [`recv_timeout`](Self::recv_timeout), but tells a quiet engine
    /// (`Ok(None)`) apart from one whose thread has exited.
    pub fn poll_event(&self, timeout: Duration) -> Result<Option<EngineEvent>, EngineStopped> {
        let event_rx = self.event_rx.lock().map_err(|_| EngineStopped)?;
        match event_rx.recv_timeout(timeout) {
            Ok(event) => Ok(Some(event)),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => Err(EngineStopped),
        }
    }
}

async fn handle_command(api: &dyn CrawlApi, command: EngineCommand) -> EngineEvent {
    match command {
        EngineCommand::ListUrls { tag, query } => EngineEvent::UrlsListed {
            tag,
            result: logged(tag, api.list_urls(&query).await),
        },
        EngineCommand::GetAnalysis { tag, id } => EngineEvent::AnalysisFetched {
            tag,
            id,
            result: logged(tag, api.get_url_analysis(id).await),
        },
        EngineCommand::GetStats { tag } => EngineEvent::StatsFetched {
            tag,
            result: logged(tag, api.url_stats().await),
        },
        EngineCommand::AddUrl { tag, url } => EngineEvent::UrlAdded {
            tag,
            result: logged(tag, api.add_url(&url).await),
        },
        EngineCommand::StartCrawl { tag, id } => EngineEvent::CrawlStarted {
            tag,
            id,
            result: logged(tag, api.start_crawl(id).await),
        },
        EngineCommand::StopCrawl { tag, id } => EngineEvent::CrawlStopped {
            tag,
            id,
            result: logged(tag, api.stop_crawl(id).await),
        },
        EngineCommand::BulkDelete { tag, ids } => EngineEvent::UrlsDeleted {
            tag,
            result: logged(tag, api.bulk_delete_urls(&ids).await),
        },
        EngineCommand::BulkReanalyze { tag, ids } => EngineEvent::UrlsReanalyzed {
            tag,
            result: logged(tag, api.bulk_reanalyze_urls(&ids).await),
        },
    }
}

fn logged<T>(tag: RequestTag, result: Result<T, ApiError>) -> Result<T, ApiError> {
    if let Err(err) = &result {
        dash_warn!("Request {} failed: {}", tag, err);
    }
    result
}
