use std::time::Duration;

use crawldash_engine::{
    ApiSettings, CrawlApi, CrawledUrl, FailureKind, ListQuery, ReqwestApi, UrlAnalysis,
};
use pretty_assertions::assert_eq;
use serde_json::json;
use wiremock::matchers::{body_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn api_for(server: &MockServer) -> ReqwestApi {
    ReqwestApi::new(ApiSettings {
        base_url: format!("{}/api/v1", server.uri()),
        ..ApiSettings::default()
    })
    .expect("client")
}

#[tokio::test]
async fn list_urls_sends_every_query_parameter() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/urls"))
        .and(query_param("skip", "10"))
        .and(query_param("limit", "10"))
        .and(query_param("status", "error"))
        .and(query_param("search", "a b&c"))
        .and(query_param("sort_by", "url"))
        .and(query_param("sort_order", "asc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [{"id": 3, "url": "https://a b&c.example", "status": "error"}],
            "count": 11
        })))
        .expect(1)
        .mount(&server)
        .await;

    let query = ListQuery {
        skip: 10,
        limit: 10,
        status: Some("error".to_string()),
        search: Some("a b&c".to_string()),
        sort_by: Some("url".to_string()),
        sort_order: Some("asc".to_string()),
    };
    let list = api_for(&server).list_urls(&query).await.expect("list");
    assert_eq!(list.count, 11);
    assert_eq!(list.items[0].id, 3);
    assert_eq!(list.items[0].status, "error");
}

#[tokio::test]
async fn add_url_posts_json_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/urls"))
        .and(body_json(json!({"url": "https://example.com"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 26,
            "url": "https://example.com",
            "status": "queued"
        })))
        .mount(&server)
        .await;

    let added = api_for(&server)
        .add_url("https://example.com")
        .await
        .expect("added");
    assert_eq!(
        added,
        CrawledUrl {
            id: 26,
            url: "https://example.com".to_string(),
            status: "queued".to_string(),
        }
    );
}

#[tokio::test]
async fn duplicate_add_surfaces_server_detail() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/urls"))
        .respond_with(
            ResponseTemplate::new(400).set_body_json(json!({"detail": "URL already submitted."})),
        )
        .mount(&server)
        .await;

    let err = api_for(&server)
        .add_url("https://example.com")
        .await
        .unwrap_err();
    assert_eq!(err.kind, FailureKind::Rejected { status: 400 });
    assert_eq!(err.message, "URL already submitted.");
}

#[tokio::test]
async fn start_and_stop_tolerate_empty_bodies() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/urls/4/start"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 4, "url": "https://example.com", "status": "running"
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/v1/urls/4/stop"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    let api = api_for(&server);
    let started = api.start_crawl(4).await.expect("start");
    assert_eq!(started.map(|url| url.status), Some("running".to_string()));
    assert_eq!(api.stop_crawl(4).await.expect("stop"), None);
}

#[tokio::test]
async fn stop_of_unknown_job_is_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/urls/99/stop"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"detail": "URL not found"})))
        .mount(&server)
        .await;

    let err = api_for(&server).stop_crawl(99).await.unwrap_err();
    assert_eq!(err.kind, FailureKind::NotFound);
    assert_eq!(err.message, "URL not found");
}

#[tokio::test]
async fn bulk_delete_reports_confirmed_ids() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/urls/bulk-delete"))
        .and(body_json(json!({"ids": [7, 9]})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"deleted": [7]})))
        .mount(&server)
        .await;

    let deleted = api_for(&server).bulk_delete_urls(&[7, 9]).await.expect("delete");
    assert_eq!(deleted, vec![7]);
}

#[tokio::test]
async fn bulk_reanalyze_without_body_confirms_all_ids() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/urls/bulk-reanalyze"))
        .and(body_json(json!({"ids": [1, 2]})))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let queued = api_for(&server)
        .bulk_reanalyze_urls(&[1, 2])
        .await
        .expect("reanalyze");
    assert_eq!(queued, vec![1, 2]);
}

#[tokio::test]
async fn analysis_is_decoded_with_missing_fields_defaulted() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/urls/1/analysis"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "title": "Home",
            "html_version": "HTML5",
            "h1_count": 1,
            "h2_count": 3,
            "internal_links_count": 12,
            "external_links_count": 2,
            "inaccessible_links_count": 1,
            "has_login_form": true,
            "broken_links": [{"link_url": "https://example.com/gone", "status_code": 404}]
        })))
        .mount(&server)
        .await;

    let analysis = api_for(&server)
        .get_url_analysis(1)
        .await
        .expect("analysis")
        .expect("present");
    assert_eq!(analysis.title.as_deref(), Some("Home"));
    assert_eq!(analysis.h2_count, 3);
    assert_eq!(analysis.h6_count, 0);
    assert!(analysis.has_login_form);
    assert_eq!(analysis.broken_links[0].status_code, 404);
}

#[tokio::test]
async fn analysis_404_distinguishes_missing_analysis_from_missing_job() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/urls/5/analysis"))
        .respond_with(
            ResponseTemplate::new(404).set_body_json(json!({"detail": "Analysis not found"})),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/urls/6/analysis"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"detail": "URL not found"})))
        .mount(&server)
        .await;

    let api = api_for(&server);
    let pending: Option<UrlAnalysis> = api.get_url_analysis(5).await.expect("no analysis yet");
    assert_eq!(pending, None);
    let err = api.get_url_analysis(6).await.unwrap_err();
    assert_eq!(err.kind, FailureKind::NotFound);
}

#[tokio::test]
async fn stats_are_decoded() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/urls/stats"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "total": 25,
            "by_status": {"queued": 10, "running": 2, "done": 11, "error": 2}
        })))
        .mount(&server)
        .await;

    let stats = api_for(&server).url_stats().await.expect("stats");
    assert_eq!(stats.total, 25);
    assert_eq!(stats.by_status.values().sum::<u64>(), 25);
}

#[tokio::test]
async fn malformed_body_is_a_decode_failure() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/urls/stats"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let err = api_for(&server).url_stats().await.unwrap_err();
    assert_eq!(err.kind, FailureKind::Decode);
}

#[tokio::test]
async fn slow_server_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/urls/stats"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"total": 0, "by_status": {}}))
                .set_delay(Duration::from_millis(500)),
        )
        .mount(&server)
        .await;

    let api = ReqwestApi::new(ApiSettings {
        base_url: format!("{}/api/v1", server.uri()),
        request_timeout: Duration::from_millis(50),
        ..ApiSettings::default()
    })
    .expect("client");
    let err = api.url_stats().await.unwrap_err();
    assert_eq!(err.kind, FailureKind::Timeout);
}

#[tokio::test]
async fn server_error_keeps_status_code() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/urls"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let err = api_for(&server)
        .list_urls(&ListQuery {
            limit: 10,
            ..ListQuery::default()
        })
        .await
        .unwrap_err();
    assert_eq!(err.kind, FailureKind::HttpStatus(500));
}
