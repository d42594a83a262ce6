//! End-to-end tests against a mock HTTP server.

use std::time::Duration;

use async_trait::async_trait;
use pixiv_app_api::model::{
    Illust, IllustSearchResult, Paged, Quality, QualityUrl, UgoiraFrame, UgoiraMetadata,
};
use pixiv_app_api::{
    DownloadOutput, Error, IllustSearchOptions, PixivClient, ProgressHandler, RetryPolicy,
    SearchSort, SearchTarget, UgoiraContent, UgoiraKind, ugoira,
};
use wiremock::matchers::{method, path, query_param, query_param_is_missing};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

fn quick_client() -> PixivClient {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
    PixivClient::builder()
        .unlimited()
        .retry(RetryPolicy::new(3, Duration::from_millis(1)))
        .build()
        .unwrap()
}

fn api_client(server: &MockServer) -> PixivClient {
    PixivClient::builder()
        .unlimited()
        .retry(RetryPolicy::none())
        .api_base(server.uri())
        .build()
        .unwrap()
}

struct WithoutHeader(&'static str);

impl wiremock::Match for WithoutHeader {
    fn matches(&self, request: &Request) -> bool {
        !request.headers.contains_key(self.0)
    }
}

#[tokio::test]
async fn test_mobile_identity_headers_are_sent() {
    use wiremock::matchers::header;

    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/probe"))
        .and(header("app-os", "IOS"))
        .and(header("app-os-version", "17.5.1"))
        .and(header("app-version", "7.20.6"))
        .and(header(
            "user-agent",
            "PixivAndroidApp/5.0.234 (Android 11; Pixel 5)",
        ))
        .and(header("referer", "https://www.pixiv.net/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
        .expect(1)
        .mount(&server)
        .await;

    let client = quick_client();
    let response = client
        .get(&format!("{}/v1/probe", server.uri()), &[])
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);
}

#[tokio::test]
async fn test_unauthenticated_requests_omit_authorization() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/probe"))
        .and(WithoutHeader("authorization"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
        .expect(1)
        .mount(&server)
        .await;

    let client = quick_client();
    client
        .get(&format!("{}/v1/probe", server.uri()), &[])
        .await
        .unwrap();
}

#[tokio::test]
async fn test_none_and_empty_params_are_dropped() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/search/illust"))
        .and(query_param("word", "sagiri"))
        .and(query_param("sort", "date_desc"))
        .and(query_param_is_missing("offset"))
        .and(query_param_is_missing("duration"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
        .expect(1)
        .mount(&server)
        .await;

    let client = quick_client();
    client
        .get(
            &format!("{}/v1/search/illust", server.uri()),
            &[
                ("word", Some("sagiri".to_string())),
                ("sort", Some("date_desc".to_string())),
                ("offset", None),
                ("duration", Some(String::new())),
            ],
        )
        .await
        .unwrap();
}

#[tokio::test]
async fn test_server_errors_retry_up_to_the_bound() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/probe"))
        .respond_with(ResponseTemplate::new(500))
        .expect(3)
        .mount(&server)
        .await;

    let client = quick_client();
    let error = client
        .get(&format!("{}/v1/probe", server.uri()), &[])
        .await
        .unwrap_err();
    assert!(matches!(error, Error::HttpStatus { status: 500, .. }));
}

#[tokio::test]
async fn test_rate_limited_body_retries_then_succeeds() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/probe"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({"error": {"message": "Rate Limit"}})),
        )
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/probe"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"ok": true})))
        .mount(&server)
        .await;

    let client = quick_client();
    let response = client
        .get(&format!("{}/v1/probe", server.uri()), &[])
        .await
        .unwrap();
    assert!(response.check().is_ok());
}

#[tokio::test]
async fn test_missing_resource_maps_to_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/illust/detail"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let client = quick_client();
    let error = client
        .get(&format!("{}/v1/illust/detail", server.uri()), &[])
        .await
        .unwrap_err();
    assert!(matches!(error, Error::NotFound { .. }));
}

#[tokio::test]
async fn test_platform_errors_field_is_typed() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/probe"))
        .respond_with(ResponseTemplate::new(200).set_body_json(
            serde_json::json!({"errors": {"system": {"message": "invalid parameter"}}}),
        ))
        .mount(&server)
        .await;

    let client = quick_client();
    let error = client
        .get(&format!("{}/v1/probe", server.uri()), &[])
        .await
        .unwrap_err();
    assert!(matches!(error, Error::Platform { .. }));
}

struct Recorder {
    events: Vec<(u64, Option<u64>)>,
}

#[async_trait]
impl ProgressHandler for Recorder {
    async fn on_progress(&mut self, received: u64, total: Option<u64>) {
        self.events.push((received, total));
    }
}

#[tokio::test]
async fn test_download_streams_to_file_with_progress() {
    let body = vec![7u8; 4096];
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/img/frame.jpg"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(body.clone()))
        .mount(&server)
        .await;

    let scratch = tempfile::tempdir().unwrap();
    let target = scratch.path().join("nested/dir/frame.jpg");
    let client = quick_client();
    let mut recorder = Recorder { events: Vec::new() };
    let returned = client
        .download_with(
            &format!("{}/img/frame.jpg", server.uri()),
            DownloadOutput::File(&target),
            Some(&mut recorder),
        )
        .await
        .unwrap();

    assert!(returned.is_none());
    assert_eq!(std::fs::read(&target).unwrap(), body);
    let (received, total) = *recorder.events.last().unwrap();
    assert_eq!(received, 4096);
    assert_eq!(total, Some(4096));
}

#[tokio::test]
async fn test_download_into_memory_returns_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/img/frame.jpg"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"image-bytes".to_vec()))
        .mount(&server)
        .await;

    let client = quick_client();
    let body = client
        .download(&format!("{}/img/frame.jpg", server.uri()))
        .await
        .unwrap();
    assert_eq!(&body[..], b"image-bytes");
}

#[tokio::test]
async fn test_next_page_follows_next_url() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/page2"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({"illusts": [], "next_url": null})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let first: IllustSearchResult = serde_json::from_value(serde_json::json!({
        "illusts": [],
        "next_url": format!("{}/v1/page2", server.uri()),
    }))
    .unwrap();

    let client = quick_client();
    let second = first.next_page(&client).await.unwrap().unwrap();
    assert!(second.next_url().is_none());
    assert!(second.next_page(&client).await.unwrap().is_none());
}

#[tokio::test]
async fn test_stream_reads_body_incrementally() {
    let body = vec![3u8; 8192];
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/img/big.bin"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(body.clone()))
        .mount(&server)
        .await;

    let client = quick_client();
    let mut response = client
        .stream(
            reqwest::Method::GET,
            &format!("{}/img/big.bin", server.uri()),
            &[],
        )
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);
    let mut received = Vec::new();
    while let Some(chunk) = response.chunk().await.unwrap() {
        received.extend_from_slice(&chunk);
    }
    assert_eq!(received, body);
}

#[tokio::test]
async fn test_stream_maps_status_errors() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/img/missing.bin"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let client = quick_client();
    let error = client
        .stream(
            reqwest::Method::GET,
            &format!("{}/img/missing.bin", server.uri()),
            &[],
        )
        .await
        .unwrap_err();
    assert!(matches!(error, Error::NotFound { .. }));
}

#[tokio::test]
async fn test_illust_search_builds_params() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/search/illust"))
        .and(query_param("word", "sagiri"))
        .and(query_param("sort", "date_desc"))
        .and(query_param("search_target", "partial_match_for_tags"))
        .and(query_param("bookmark_num_min", "50"))
        .and(query_param_is_missing("duration"))
        .and(query_param_is_missing("offset"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({"illusts": [], "next_url": null})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = api_client(&server);
    let options = IllustSearchOptions {
        sort: Some(SearchSort::DateDesc),
        target: Some(SearchTarget::PartialMatchForTags),
        min_bookmarks: Some(50),
        ..Default::default()
    };
    let result = client.illust().search("sagiri", &options).await.unwrap();
    assert!(result.illusts.is_empty());
}

#[tokio::test]
async fn test_illust_follow_uses_v2_path() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v2/illust/follow"))
        .and(query_param("restrict", "public"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({"illusts": [], "next_url": null})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = api_client(&server);
    client.illust().follow(None).await.unwrap();
}

fn ugoira_illust() -> Illust {
    serde_json::from_value(serde_json::json!({
        "id": 77,
        "title": "loop",
        "type": "ugoira",
        "image_urls": {},
        "user": {"id": 2, "name": "n", "account": "a"},
        "create_date": "2024-05-01T12:00:00+09:00",
        "page_count": 1,
        "width": 100,
        "height": 100
    }))
    .unwrap()
}

#[tokio::test]
async fn test_ugoira_metadata_is_fetched_once_per_illust() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/ugoira/metadata"))
        .and(query_param("illust_id", "77"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "ugoira_metadata": {
                "zip_urls": {"medium": "https://i.pximg.net/x_ugoira600x600.zip"},
                "frames": [{"file": "000000.jpg", "delay": 100}]
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = api_client(&server);
    let illust = ugoira_illust();
    let first = illust.ugoira_metadata(&client).await.unwrap();
    assert_eq!(first.frames.len(), 1);
    // The second call must come from the cache, not the wire.
    let second = illust.ugoira_metadata(&client).await.unwrap();
    assert_eq!(second.frames[0].delay, 100);
}

fn ugoira_archive() -> Vec<u8> {
    use std::io::Write;

    let mut writer = zip::ZipWriter::new(std::io::Cursor::new(Vec::new()));
    let options = zip::write::SimpleFileOptions::default();
    writer.start_file("000001.jpg", options).unwrap();
    writer.write_all(b"frame-two").unwrap();
    writer.start_file("000000.jpg", options).unwrap();
    writer.write_all(b"frame-one").unwrap();
    writer.finish().unwrap().into_inner()
}

fn ugoira_metadata(server: &MockServer) -> UgoiraMetadata {
    UgoiraMetadata {
        zip_urls: QualityUrl {
            square: None,
            medium: Some(format!("{}/ugoira/archive.zip", server.uri())),
            large: None,
            original: None,
        },
        frames: vec![
            UgoiraFrame {
                file: "000000.jpg".to_string(),
                delay: 100,
            },
            UgoiraFrame {
                file: "000001.jpg".to_string(),
                delay: 200,
            },
        ],
    }
}

#[tokio::test]
async fn test_ugoira_zip_passthrough_is_byte_identical() {
    let archive = ugoira_archive();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/ugoira/archive.zip"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(archive.clone()))
        .mount(&server)
        .await;

    let client = quick_client();
    let content = ugoira::decode(
        &client,
        &ugoira_metadata(&server),
        Quality::Original,
        UgoiraKind::Zip,
    )
    .await
    .unwrap()
    .unwrap();
    match content {
        UgoiraContent::Zip(bytes) => assert_eq!(&bytes[..], &archive[..]),
        other => panic!("expected zip content, got {other:?}"),
    }
}

#[tokio::test]
async fn test_ugoira_frames_follow_manifest_order() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/ugoira/archive.zip"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(ugoira_archive()))
        .mount(&server)
        .await;

    let client = quick_client();
    let content = ugoira::decode(
        &client,
        &ugoira_metadata(&server),
        Quality::Original,
        UgoiraKind::Frames,
    )
    .await
    .unwrap()
    .unwrap();
    match content {
        UgoiraContent::Frames(frames) => {
            assert_eq!(frames.len(), 2);
            assert_eq!(&frames[0][..], b"frame-one");
            assert_eq!(&frames[1][..], b"frame-two");
        }
        other => panic!("expected frames, got {other:?}"),
    }
}

#[tokio::test]
async fn test_empty_ugoira_download_short_circuits() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/ugoira/archive.zip"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let client = quick_client();
    let content = ugoira::decode(
        &client,
        &ugoira_metadata(&server),
        Quality::Original,
        UgoiraKind::Zip,
    )
    .await
    .unwrap();
    assert!(content.is_none());
}
