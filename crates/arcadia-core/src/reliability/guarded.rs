use std::future::Future;
use std::sync::Arc;

use reqwest::Client;

use super::{retry_async, RetryPolicy, SlidingWindowLimiter};
use crate::error::AppResult;
use crate::http::SharedHttpClient;

/// Retry outside, admission and session access inside.
///
/// Every attempt, including retries, waits on the limiter and then fetches the shared
/// session before running the caller's request.
#[derive(Clone)]
pub struct GuardedCall {
    policy: RetryPolicy,
    limiter: Option<Arc<SlidingWindowLimiter>>,
    http: SharedHttpClient,
}

impl GuardedCall {
    pub fn new(http: SharedHttpClient, policy: RetryPolicy) -> Self {
        Self { policy, limiter: None, http }
    }

    pub fn with_limiter(mut self, limiter: Arc<SlidingWindowLimiter>) -> Self {
        self.limiter = Some(limiter);
        self
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn http(&self) -> &SharedHttpClient {
        &self.http
    }

    pub async fn run<T, F, Fut>(&self, op: F) -> AppResult<T>
    where
        F: Fn(Client) -> Fut,
        Fut: Future<Output = AppResult<T>>,
    {
        let op = &op;
        let limiter = self.limiter.as_deref();
        let http = &self.http;

        retry_async(&self.policy, move || async move {
            if let Some(limiter) = limiter {
                limiter.wait().await;
            }
            let session = http.get_session().await?;
            op(session).await
        })
        .await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use arcadia_types::{ApiError, ConfigError, HttpClientConfig};
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn guarded(limiter: Arc<SlidingWindowLimiter>) -> GuardedCall {
        let policy = RetryPolicy::new(3, Duration::from_millis(1));
        GuardedCall::new(SharedHttpClient::new(HttpClientConfig::default()), policy)
            .with_limiter(limiter)
    }

    #[tokio::test]
    async fn test_each_attempt_reenters_admission() {
        let limiter = Arc::new(SlidingWindowLimiter::new("test", 100, Duration::from_secs(60)));
        let call = guarded(limiter.clone());
        let calls = AtomicU32::new(0);

        let result: AppResult<()> = call
            .run(|_client| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(AppError::Api(ApiError::Timeout { provider: "steam".to_string() })) }
            })
            .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(limiter.in_window(), 3);
    }

    #[tokio::test]
    async fn test_config_failure_is_immediate() {
        let limiter = Arc::new(SlidingWindowLimiter::new("test", 100, Duration::from_secs(60)));
        let call = guarded(limiter.clone());

        let result: AppResult<()> = call
            .run(|_client| async { Err(ConfigError::missing("igdb", "TWITCH_CLIENT_ID").into()) })
            .await;

        assert!(result.unwrap_err().is_config());
        assert_eq!(limiter.in_window(), 1);
    }

    #[tokio::test]
    async fn test_request_through_shared_session() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"ok": true})))
            .mount(&server)
            .await;

        let limiter = Arc::new(SlidingWindowLimiter::new("test", 10, Duration::from_secs(60)));
        let call = guarded(limiter);
        let http = call.http().clone();
        let uri = server.uri();

        let body: serde_json::Value = call
            .run(|client| {
                let http = http.clone();
                let request = client.get(&uri);
                async move { http.fetch_json("test", request).await }
            })
            .await
            .unwrap();

        assert_eq!(body["ok"], true);
        assert_eq!(call.http().creations(), 1);
    }
}
