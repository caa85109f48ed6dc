use std::time::Duration;

use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::{
    ApiError, CrawledUrl, FailureKind, JobId, ListQuery, UrlAnalysis, UrlList, UrlStats,
};

/// Detail text the server sends when a job exists but was never analyzed.
pub const ANALYSIS_NOT_FOUND: &str = "Analysis not found";

#[derive(Debug, Clone)]
pub struct ApiSettings {
    /// Prefix every endpoint path is appended to, e.g. `http://host/api/v1`.
    pub base_url: String,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000/api/v1".to_string(),
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
        }
    }
}

/// The crawl backend's REST surface, one method per endpoint.
#[async_trait::async_trait]
pub trait CrawlApi: Send + Sync {
    async fn list_urls(&self, query: &ListQuery) -> Result<UrlList, ApiError>;

    async fn add_url(&self, url: &str) -> Result<CrawledUrl, ApiError>;

    /// `Ok(None)` when the server confirmed without a readable body.
    async fn start_crawl(&self, id: JobId) -> Result<Option<CrawledUrl>, ApiError>;

    async fn stop_crawl(&self, id: JobId) -> Result<Option<CrawledUrl>, ApiError>;

    /// Returns the ids the server reports as deleted.
    async fn bulk_delete_urls(&self, ids: &[JobId]) -> Result<Vec<JobId>, ApiError>;

    /// Returns the ids the server reports as queued again.
    async fn bulk_reanalyze_urls(&self, ids: &[JobId]) -> Result<Vec<JobId>, ApiError>;

    /// `Ok(None)` when the job exists but has no analysis yet.
    async fn get_url_analysis(&self, id: JobId) -> Result<Option<UrlAnalysis>, ApiError>;

    async fn url_stats(&self) -> Result<UrlStats, ApiError>;
}

#[derive(Serialize)]
struct AddUrlBody<'a> {
    url: &'a str,
}

#[derive(Serialize)]
struct BulkIds<'a> {
    ids: &'a [JobId],
}

#[derive(Deserialize)]
struct DeletedResponse {
    #[serde(default)]
    deleted: Option<Vec<JobId>>,
}

#[derive(Deserialize)]
struct ReanalyzedResponse {
    #[serde(default)]
    reanalyzed: Option<Vec<JobId>>,
}

#[derive(Deserialize)]
struct ErrorBody {
    detail: serde_json::Value,
}

#[derive(Debug, Clone)]
pub struct ReqwestApi {
    client: reqwest::Client,
    base_url: String,
}

impl ReqwestApi {
    pub fn new(settings: ApiSettings) -> Result<Self, ApiError> {
        Url::parse(&settings.base_url)
            .map_err(|err| ApiError::new(FailureKind::InvalidUrl, err.to_string()))?;
        let client = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.request_timeout)
            .build()
            .map_err(|err| ApiError::new(FailureKind::Network, err.to_string()))?;
        Ok(Self {
            client,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
        let raw = format!("{}/{}", self.base_url, path);
        Url::parse(&raw).map_err(|err| ApiError::new(FailureKind::InvalidUrl, err.to_string()))
    }

    async fn send(
        &self,
        method: Method,
        url: Url,
        body: Option<Vec<u8>>,
    ) -> Result<(StatusCode, Vec<u8>), ApiError> {
        let mut request = self
            .client
            .request(method, url)
            .header(ACCEPT, "application/json");
        if let Some(body) = body {
            request = request.header(CONTENT_TYPE, "application/json").body(body);
        }
        let response = request.send().await.map_err(map_reqwest_error)?;
        let status = response.status();
        let bytes = response.bytes().await.map_err(map_reqwest_error)?;
        Ok((status, bytes.to_vec()))
    }

    /// Sends the request and decodes a successful body as `T`.
    async fn call<T: DeserializeOwned>(
        &self,
        method: Method,
        url: Url,
        body: Option<Vec<u8>>,
    ) -> Result<T, ApiError> {
        let (status, bytes) = self.send(method, url, body).await?;
        if !status.is_success() {
            return Err(status_error(status, &bytes));
        }
        decode(&bytes)
    }

    /// Like [`call`](Self::call) but tolerates an empty or unexpected body.
    async fn call_lenient<T: DeserializeOwned>(
        &self,
        method: Method,
        url: Url,
        body: Option<Vec<u8>>,
    ) -> Result<Option<T>, ApiError> {
        let (status, bytes) = self.send(method, url, body).await?;
        if !status.is_success() {
            return Err(status_error(status, &bytes));
        }
        Ok(serde_json::from_slice(&bytes).ok())
    }
}

#[async_trait::async_trait]
impl CrawlApi for ReqwestApi {
    async fn list_urls(&self, query: &ListQuery) -> Result<UrlList, ApiError> {
        let mut url = self.endpoint("urls")?;
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("skip", &query.skip.to_string());
            pairs.append_pair("limit", &query.limit.to_string());
            if let Some(status) = &query.status {
                pairs.append_pair("status", status);
            }
            if let Some(search) = &query.search {
                pairs.append_pair("search", search);
            }
            if let Some(sort_by) = &query.sort_by {
                pairs.append_pair("sort_by", sort_by);
            }
            if let Some(sort_order) = &query.sort_order {
                pairs.append_pair("sort_order", sort_order);
            }
        }
        self.call(Method::GET, url, None).await
    }

    async fn add_url(&self, url: &str) -> Result<CrawledUrl, ApiError> {
        let endpoint = self.endpoint("urls")?;
        let body = encode(&AddUrlBody { url })?;
        self.call(Method::POST, endpoint, Some(body)).await
    }

    async fn start_crawl(&self, id: JobId) -> Result<Option<CrawledUrl>, ApiError> {
        let endpoint = self.endpoint(&format!("urls/{id}/start"))?;
        self.call_lenient(Method::POST, endpoint, None).await
    }

    async fn stop_crawl(&self, id: JobId) -> Result<Option<CrawledUrl>, ApiError> {
        let endpoint = self.endpoint(&format!("urls/{id}/stop"))?;
        self.call_lenient(Method::POST, endpoint, None).await
    }

    async fn bulk_delete_urls(&self, ids: &[JobId]) -> Result<Vec<JobId>, ApiError> {
        let endpoint = self.endpoint("urls/bulk-delete")?;
        let body = encode(&BulkIds { ids })?;
        let response: Option<DeletedResponse> =
            self.call_lenient(Method::POST, endpoint, Some(body)).await?;
        Ok(response
            .and_then(|response| response.deleted)
            .unwrap_or_else(|| ids.to_vec()))
    }

    async fn bulk_reanalyze_urls(&self, ids: &[JobId]) -> Result<Vec<JobId>, ApiError> {
        let endpoint = self.endpoint("urls/bulk-reanalyze")?;
        let body = encode(&BulkIds { ids })?;
        let response: Option<ReanalyzedResponse> =
            self.call_lenient(Method::POST, endpoint, Some(body)).await?;
        Ok(response
            .and_then(|response| response.reanalyzed)
            .unwrap_or_else(|| ids.to_vec()))
    }

    async fn get_url_analysis(&self, id: JobId) -> Result<Option<UrlAnalysis>, ApiError> {
        let endpoint = self.endpoint(&format!("urls/{id}/analysis"))?;
        match self.call(Method::GET, endpoint, None).await {
            Ok(analysis) => Ok(Some(analysis)),
            Err(err) if err.kind == FailureKind::NotFound && err.message == ANALYSIS_NOT_FOUND => {
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }

    async fn url_stats(&self) -> Result<UrlStats, ApiError> {
        let endpoint = self.endpoint("urls/stats")?;
        self.call(Method::GET, endpoint, None).await
    }
}

fn encode<T: Serialize>(body: &T) -> Result<Vec<u8>, ApiError> {
    serde_json::to_vec(body).map_err(|err| ApiError::new(FailureKind::Decode, err.to_string()))
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, ApiError> {
    serde_json::from_slice(bytes).map_err(|err| ApiError::new(FailureKind::Decode, err.to_string()))
}

fn status_error(status: StatusCode, bytes: &[u8]) -> ApiError {
    let message = match serde_json::from_slice::<ErrorBody>(bytes) {
        Ok(ErrorBody {
            detail: serde_json::Value::String(text),
        }) => text,
        Ok(ErrorBody { detail }) => detail.to_string(),
        Err(_) => status.to_string(),
    };
    ApiError::new(FailureKind::from_status(status.as_u16()), message)
}

fn map_reqwest_error(err: reqwest::Error) -> ApiError {
    if err.is_timeout() {
        return ApiError::new(FailureKind::Timeout, err.to_string());
    }
    ApiError::new(FailureKind::Network, err.to_string())
}
