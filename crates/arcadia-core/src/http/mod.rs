//! Process-wide pooled HTTP session.
//!
//! One `reqwest::Client` (and therefore one connection pool) is shared by every outbound
//! call. It is built lazily on first use, exactly once even under concurrent first
//! callers, and dropped by [`SharedHttpClient::close`] at shutdown. A closed client is
//! rebuilt transparently by the next [`SharedHttpClient::get_session`].

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use arcadia_types::{ApiError, HttpClientConfig};
use dashmap::DashMap;
use reqwest::header::RETRY_AFTER;
use reqwest::{Client, RequestBuilder, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use tokio::sync::{OwnedSemaphorePermit, RwLock, Semaphore, SemaphorePermit};
use tracing::{debug, info};

use crate::error::{AppError, AppResult};

/// Longest error body kept in [`ApiError::HttpStatus`].
const MAX_ERROR_BODY: usize = 512;

#[derive(Clone)]
pub struct SharedHttpClient {
    inner: Arc<Inner>,
}

struct Inner {
    config: HttpClientConfig,
    session: RwLock<Option<Client>>,
    /// Bounds requests in flight across the whole process.
    in_flight: Semaphore,
    /// Bounds requests in flight per `host:port`.
    per_host: DashMap<String, Arc<Semaphore>>,
    creations: AtomicU64,
}

/// Permits held while a request and its body are in flight.
struct Slot<'a> {
    _host: OwnedSemaphorePermit,
    _total: SemaphorePermit<'a>,
}

impl SharedHttpClient {
    pub fn new(config: HttpClientConfig) -> Self {
        let permits = config.max_connections.max(1);
        Self {
            inner: Arc::new(Inner {
                config,
                session: RwLock::new(None),
                in_flight: Semaphore::new(permits),
                per_host: DashMap::new(),
                creations: AtomicU64::new(0),
            }),
        }
    }

    pub fn config(&self) -> &HttpClientConfig {
        &self.inner.config
    }

    /// The shared session, created on first call.
    pub async fn get_session(&self) -> AppResult<Client> {
        // Fast path: check read lock
        {
            let session = self.inner.session.read().await;
            if let Some(client) = session.as_ref() {
                return Ok(client.clone());
            }
        }

        // Slow path: create under write lock
        let mut session = self.inner.session.write().await;
        // Double-check after acquiring write lock
        if let Some(client) = session.as_ref() {
            return Ok(client.clone());
        }

        let config = self.inner.config.clone();
        let client = tokio::task::spawn_blocking(move || build_client(&config))
            .await
            .map_err(|e| AppError::Unknown(format!("spawn_blocking panicked: {e}")))??;

        let generation = self.inner.creations.fetch_add(1, Ordering::SeqCst) + 1;
        info!(generation, "Created shared HTTP session");
        *session = Some(client.clone());
        Ok(client)
    }

    /// Drop the shared session. Safe to call repeatedly.
    pub async fn close(&self) {
        let previous = self.inner.session.write().await.take();
        if previous.is_some() {
            info!("Closed shared HTTP session");
        } else {
            debug!("Shared HTTP session already closed");
        }
    }

    pub async fn is_open(&self) -> bool {
        self.inner.session.read().await.is_some()
    }

    /// How many sessions have been built over the lifetime of this handle.
    pub fn creations(&self) -> u64 {
        self.inner.creations.load(Ordering::SeqCst)
    }

    /// Requests that could start right now without waiting for a slot.
    pub fn available_slots(&self) -> usize {
        self.inner.in_flight.available_permits()
    }

    /// Send `request` while holding an in-flight slot until the response head arrives.
    pub async fn execute(&self, request: RequestBuilder) -> AppResult<Response> {
        let (response, _slot) = self.send(request).await?;
        Ok(response)
    }

    /// Send `request` and decode a JSON body, holding the in-flight slot until the body
    /// has been read. Non-2xx answers become [`ApiError`]s attributed to `provider`.
    pub async fn fetch_json<T: DeserializeOwned>(
        &self,
        provider: &str,
        request: RequestBuilder,
    ) -> AppResult<T> {
        let (response, _slot) = self.send(request).await?;
        let response = check_status(provider, response).await?;
        let body = response.bytes().await?;

        serde_json::from_slice(&body).map_err(|e| {
            AppError::Api(ApiError::InvalidResponse {
                provider: provider.to_string(),
                message: e.to_string(),
            })
        })
    }

    /// Free per-host slots for `url`'s host. Full capacity for a host never contacted.
    pub fn available_host_slots(&self, url: &Url) -> usize {
        self.inner
            .per_host
            .get(&host_key(url))
            .map_or(self.per_host_limit(), |sem| sem.available_permits())
    }

    fn per_host_limit(&self) -> usize {
        self.inner.config.max_connections_per_host.max(1)
    }

    async fn send(&self, request: RequestBuilder) -> AppResult<(Response, Slot<'_>)> {
        let (client, request) = request.build_split();
        let request = request?;
        let slot = self.acquire_slot(request.url()).await?;
        let response = client.execute(request).await?;
        Ok((response, slot))
    }

    /// Host slot first, so a request queued behind a busy host does not hold a
    /// process-wide slot while it waits.
    async fn acquire_slot(&self, url: &Url) -> AppResult<Slot<'_>> {
        let host = {
            let limit = self.per_host_limit();
            let entry = self.inner.per_host.entry(host_key(url)).or_insert_with(|| Arc::new(Semaphore::new(limit)));
            Arc::clone(entry.value())
        };
        let host = host
            .acquire_owned()
            .await
            .map_err(|_| AppError::Unknown("per-host semaphore closed".to_string()))?;
        let total = self
            .inner
            .in_flight
            .acquire()
            .await
            .map_err(|_| AppError::Unknown("HTTP request semaphore closed".to_string()))?;
        Ok(Slot { _host: host, _total: total })
    }
}

fn host_key(url: &Url) -> String {
    format!("{}:{}", url.host_str().unwrap_or_default(), url.port_or_known_default().unwrap_or_default())
}

fn build_client(config: &HttpClientConfig) -> AppResult<Client> {
    Ok(Client::builder()
        .timeout(config.total_timeout())
        .connect_timeout(config.connect_timeout())
        .pool_max_idle_per_host(config.max_connections_per_host)
        .tcp_nodelay(true)
        .user_agent(config.user_agent.as_str())
        .build()?)
}

/// Map a non-success response to the matching [`ApiError`].
pub async fn check_status(provider: &str, response: Response) -> AppResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    if status == StatusCode::TOO_MANY_REQUESTS {
        let retry_after_secs = response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok());
        return Err(ApiError::RateLimited { provider: provider.to_string(), retry_after_secs }.into());
    }

    let mut body = response.text().await.unwrap_or_default();
    if body.len() > MAX_ERROR_BODY {
        let mut cut = MAX_ERROR_BODY;
        while !body.is_char_boundary(cut) {
            cut -= 1;
        }
        body.truncate(cut);
    }
    Err(ApiError::HttpStatus { provider: provider.to_string(), status: status.as_u16(), body }.into())
}
