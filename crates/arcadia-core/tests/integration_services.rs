#![allow(unused_crate_dependencies)]
#![allow(clippy::tests_outside_test_module, reason = "integration tests live in tests/ dir")]
#![allow(clippy::expect_used, reason = "integration test: panics are the assertion mechanism")]

use std::sync::Arc;
use std::time::Duration;

use arcadia_core::clients::SteamClient;
use arcadia_core::modules::data_manager::Document;
use arcadia_core::{GuardedCall, RetryPolicy, Services, SharedHttpClient, SlidingWindowLimiter};
use arcadia_types::{AppConfig, HttpClientConfig};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config_in(dir: &std::path::Path) -> AppConfig {
    let mut config = AppConfig::default();
    config.data_dir = dir.to_path_buf();
    config
}

#[tokio::test]
async fn test_data_survives_restart() {
    let dir = tempfile::tempdir().expect("tempdir");

    let services = Services::new(config_in(dir.path()));
    services.data.load_all().await;
    assert!(services.data.mark_seen("post-1"));
    assert!(!services.data.mark_seen("post-1"));
    assert_eq!(services.shutdown().await, 0);
    assert!(services.is_shut_down());
    assert!(!services.http.is_open().await);

    let restarted = Services::new(config_in(dir.path()));
    restarted.data.load_all().await;
    let seen = restarted
        .data
        .counts()
        .into_iter()
        .find(|(doc, _)| *doc == Document::SeenRssPosts)
        .map(|(_, n)| n);
    assert_eq!(seen, Some(1));
    assert!(dir.path().join(Document::SeenRssPosts.file_name()).exists());
}

#[tokio::test]
async fn test_steam_call_retries_through_limiter() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/ISteamUser/GetPlayerSummaries/v0002/"))
        .respond_with(ResponseTemplate::new(503).set_body_string("busy"))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/ISteamUser/GetPlayerSummaries/v0002/"))
        .and(query_param("key", "secret"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "response": {"players": [{"steamid": "76561197960435530", "personaname": "Robin"}]}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let limiter = Arc::new(SlidingWindowLimiter::new("steam", 5, Duration::from_secs(1)));
    let http = SharedHttpClient::new(HttpClientConfig::default());
    let call = GuardedCall::new(http.clone(), RetryPolicy::new(3, Duration::from_millis(10)))
        .with_limiter(Arc::clone(&limiter));
    let steam =
        SteamClient::new(Some("secret".to_string()), call).with_base_url(server.uri());

    let player = steam
        .get_player_summaries("76561197960435530")
        .await
        .expect("second attempt succeeds");

    assert_eq!(
        player.and_then(|p| p["personaname"].as_str().map(str::to_string)),
        Some("Robin".to_string())
    );
    assert_eq!(limiter.in_window(), 2);
    assert_eq!(http.creations(), 1);
}
