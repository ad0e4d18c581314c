use serde::Deserialize;
use tokio::sync::RwLock;
use tracing::{debug, info};

use arcadia_types::ApiError;

use super::{require, GameInfo};
use crate::error::{AppError, AppResult};
use crate::modules::validators::clean_game_name;
use crate::reliability::GuardedCall;

const PROVIDER: &str = "igdb";
pub const TWITCH_TOKEN_URL: &str = "https://id.twitch.tv/oauth2/token";
pub const IGDB_API_URL: &str = "https://api.igdb.com/v4";
const SIMILAR_LIMIT: usize = 5;

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Deserialize)]
struct SimilarGames {
    #[serde(default)]
    similar_games: Vec<GameInfo>,
}

/// IGDB v4 with a cached Twitch client-credentials token.
pub struct IgdbClient {
    client_id: Option<String>,
    client_secret: Option<String>,
    token_url: String,
    api_url: String,
    /// Rate-limited calls against the IGDB API.
    call: GuardedCall,
    /// Token requests go to Twitch and skip the IGDB limiter.
    token_call: GuardedCall,
    token: RwLock<Option<String>>,
}

impl IgdbClient {
    /// `call` should carry the igdb limiter; `token_call` no limiter.
    pub fn new(
        client_id: Option<String>,
        client_secret: Option<String>,
        call: GuardedCall,
        token_call: GuardedCall,
    ) -> Self {
        Self {
            client_id,
            client_secret,
            token_url: TWITCH_TOKEN_URL.to_string(),
            api_url: IGDB_API_URL.to_string(),
            call,
            token_call,
            token: RwLock::new(None),
        }
    }

    pub fn with_urls(mut self, token_url: impl Into<String>, api_url: impl Into<String>) -> Self {
        self.token_url = token_url.into();
        self.api_url = api_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn is_configured(&self) -> bool {
        self.credentials().is_ok()
    }

    fn credentials(&self) -> AppResult<(&str, &str)> {
        let id = require(self.client_id.as_deref(), PROVIDER, "TWITCH_CLIENT_ID")?;
        let secret = require(self.client_secret.as_deref(), PROVIDER, "TWITCH_CLIENT_SECRET")?;
        Ok((id, secret))
    }

    /// Cached OAuth token, fetched on first use.
    pub async fn access_token(&self) -> AppResult<String> {
        let (client_id, client_secret) = self.credentials()?;

        // Fast path: check read lock
        {
            let token = self.token.read().await;
            if let Some(token) = token.as_ref() {
                return Ok(token.clone());
            }
        }

        // Slow path: fetch under write lock
        let mut token = self.token.write().await;
        // Double-check after acquiring write lock
        if let Some(existing) = token.as_ref() {
            return Ok(existing.clone());
        }

        let http = self.token_call.http();
        let params = [
            ("client_id", client_id),
            ("client_secret", client_secret),
            ("grant_type", "client_credentials"),
        ];
        let response: TokenResponse = self
            .token_call
            .run(|client| {
                let request = client.post(&self.token_url).query(&params);
                http.fetch_json("twitch", request)
            })
            .await?;

        info!("IGDB access token obtained");
        *token = Some(response.access_token.clone());
        Ok(response.access_token)
    }

    /// Forget the cached token so the next call fetches a new one.
    pub async fn invalidate_token(&self) {
        self.token.write().await.take();
    }

    /// Runs the query; a 401 drops the cached token and retries once with a fresh one.
    async fn query<T: serde::de::DeserializeOwned>(&self, endpoint: &str, body: String) -> AppResult<T> {
        match self.query_once(endpoint, &body).await {
            Err(AppError::Api(ApiError::HttpStatus { status: 401, .. })) => {
                debug!("IGDB rejected the token, fetching a new one");
                self.invalidate_token().await;
                self.query_once(endpoint, &body).await
            },
            result => result,
        }
    }

    async fn query_once<T: serde::de::DeserializeOwned>(&self, endpoint: &str, body: &str) -> AppResult<T> {
        let (client_id, _) = self.credentials()?;
        let url = format!("{}/{}", self.api_url, endpoint);
        let http = self.call.http();

        self.call
            .run(|client| {
                let body = body.to_string();
                let url = &url;
                async move {
                    let token = self.access_token().await?;
                    let request = client
                        .post(url)
                        .header("Client-ID", client_id)
                        .bearer_auth(token)
                        .body(body);
                    http.fetch_json(PROVIDER, request).await
                }
            })
            .await
    }

    /// Best match for `name`.
    pub async fn search_game_by_name(&self, name: &str) -> AppResult<Option<GameInfo>> {
        let name = clean_game_name(name);
        let body = format!(
            "search \"{name}\"; fields name,summary,genres.name,platforms.name,cover.image_id; limit 1;"
        );
        let results: Vec<GameInfo> = self.query("games", body).await?;
        Ok(results.into_iter().next())
    }

    /// Up to five games IGDB lists as similar to `game_id`.
    pub async fn get_similar_games(&self, game_id: u64) -> AppResult<Vec<GameInfo>> {
        let body = format!(
            "fields similar_games.name,similar_games.summary,similar_games.cover.image_id; where id = {game_id}; limit 1;"
        );
        let results: Vec<SimilarGames> = self.query("games", body).await?;
        Ok(results
            .into_iter()
            .next()
            .map(|r| r.similar_games.into_iter().take(SIMILAR_LIMIT).collect())
            .unwrap_or_default())
    }
}
