//! AudD client against a local fake of the recognition endpoint.

mod fixtures;

use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::routing::post;
use axum::Router;
use fixtures::*;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use set_decoder::models::track::SegmentResult;
use set_decoder::services::identify::{AuddClient, IdentifyError, TrackIdentifier};

/// What the fake endpoint saw and how it answers.
#[derive(Clone)]
struct FakeAudd {
    status: StatusCode,
    body: &'static str,
    delay: Duration,
    seen: Arc<Mutex<Vec<HashMap<String, String>>>>,
}

impl FakeAudd {
    fn new(status: StatusCode, body: &'static str) -> Self {
        Self {
            status,
            body,
            delay: Duration::ZERO,
            seen: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

async fn recognize(State(fake): State<FakeAudd>, mut form: Multipart) -> (StatusCode, String) {
    let mut fields = HashMap::new();
    while let Ok(Some(field)) = form.next_field().await {
        let name = field.name().unwrap_or_default().to_string();
        let file_name = field.file_name().map(str::to_string);
        let value = match file_name {
            Some(file_name) => {
                let bytes = field.bytes().await.unwrap_or_default();
                format!("{}:{}", file_name, bytes.len())
            }
            None => field.text().await.unwrap_or_default(),
        };
        fields.insert(name, value);
    }
    fake.seen.lock().push(fields);

    if !fake.delay.is_zero() {
        tokio::time::sleep(fake.delay).await;
    }
    (fake.status, fake.body.to_string())
}

/// Serve `fake` on an ephemeral port and return its URL.
async fn serve(fake: FakeAudd) -> String {
    let app = Router::new().route("/", post(recognize)).with_state(fake);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}/", addr)
}

fn client(endpoint: &str, timeout: Duration) -> AuddClient {
    AuddClient::new(endpoint, "test-token", "spotify,apple_music,deezer", timeout).unwrap()
}

#[tokio::test]
async fn test_match_with_links() {
    let fake = FakeAudd::new(StatusCode::OK, AUDD_MATCH);
    let seen = fake.seen.clone();
    let endpoint = serve(fake).await;

    let result = client(&endpoint, Duration::from_secs(5))
        .identify(vec![0u8; 2048], "segment_3.mp3")
        .await;

    let SegmentResult::Found(track) = result else {
        panic!("expected a match, got {:?}", result);
    };
    assert_eq!(track.artist, "Bicep");
    assert_eq!(track.title, "Glue");
    assert_eq!(track.album.as_deref(), Some("Bicep"));
    assert_eq!(
        track.links.spotify_url.as_deref(),
        Some("https://open.spotify.com/track/2aJDlirz6v2a4HREki98cP")
    );
    assert_eq!(
        track.links.deezer_url.as_deref(),
        Some("https://www.deezer.com/track/390532012")
    );
    assert!(track.links.apple_music_url.is_some());

    let seen = seen.lock();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0]["api_token"], "test-token");
    assert_eq!(seen[0]["return"], "spotify,apple_music,deezer");
    assert_eq!(seen[0]["file"], "segment_3.mp3:2048");
}

#[tokio::test]
async fn test_no_match_is_clean_miss() {
    let endpoint = serve(FakeAudd::new(StatusCode::OK, AUDD_NO_MATCH)).await;

    let result = client(&endpoint, Duration::from_secs(5))
        .identify(vec![1, 2, 3], "segment_0.mp3")
        .await;

    assert_eq!(result, SegmentResult::miss());
}

#[tokio::test]
async fn test_provider_error_is_reported_as_miss() {
    let endpoint = serve(FakeAudd::new(StatusCode::OK, AUDD_ERROR)).await;
    let audd = client(&endpoint, Duration::from_secs(5));

    let err = audd.lookup(vec![1], "segment_0.mp3").await.unwrap_err();
    assert!(matches!(err, IdentifyError::Provider(ref m) if m.contains("901")));

    match audd.identify(vec![1], "segment_0.mp3").await {
        SegmentResult::NotFound { error: Some(e) } => assert!(e.contains("no api_token")),
        other => panic!("expected failed lookup, got {:?}", other),
    }
}

#[tokio::test]
async fn test_http_error_status() {
    let endpoint = serve(FakeAudd::new(StatusCode::SERVICE_UNAVAILABLE, "busy")).await;
    let audd = client(&endpoint, Duration::from_secs(5));

    let err = audd.lookup(vec![1], "segment_0.mp3").await.unwrap_err();
    assert!(matches!(err, IdentifyError::Status(503)));
    assert!(matches!(
        audd.identify(vec![1], "segment_0.mp3").await,
        SegmentResult::NotFound { error: Some(_) }
    ));
}

#[tokio::test]
async fn test_non_json_body() {
    let endpoint = serve(FakeAudd::new(StatusCode::OK, "<html>gateway</html>")).await;

    let err = client(&endpoint, Duration::from_secs(5))
        .lookup(vec![1], "segment_0.mp3")
        .await
        .unwrap_err();
    assert!(matches!(err, IdentifyError::Parse(_)));
}

#[tokio::test]
async fn test_timeout_becomes_miss() {
    let mut fake = FakeAudd::new(StatusCode::OK, AUDD_MATCH);
    fake.delay = Duration::from_secs(2);
    let endpoint = serve(fake).await;

    let result = client(&endpoint, Duration::from_millis(200))
        .identify(vec![1], "segment_0.mp3")
        .await;

    assert!(matches!(result, SegmentResult::NotFound { error: Some(_) }));
}

#[tokio::test]
async fn test_unreachable_endpoint() {
    // Nothing listens on the discard port.
    let result = client("http://127.0.0.1:9/", Duration::from_secs(2))
        .identify(vec![1], "segment_0.mp3")
        .await;

    assert!(matches!(result, SegmentResult::NotFound { error: Some(_) }));
}
