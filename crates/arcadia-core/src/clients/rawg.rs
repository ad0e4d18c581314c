use serde::Deserialize;

use super::{require, Cover, GameInfo, NamedRef};
use crate::error::AppResult;
use crate::reliability::GuardedCall;

const PROVIDER: &str = "rawg";
pub const RAWG_API_URL: &str = "https://api.rawg.io/api";

#[derive(Debug, Deserialize)]
struct SearchPage {
    #[serde(default)]
    results: Vec<RawgGame>,
}

#[derive(Debug, Deserialize)]
struct RawgGame {
    id: Option<u64>,
    #[serde(default)]
    name: String,
    #[serde(default)]
    description_raw: Option<String>,
    #[serde(default)]
    genres: Vec<NamedRef>,
    #[serde(default)]
    platforms: Vec<PlatformEntry>,
    #[serde(default)]
    background_image: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PlatformEntry {
    #[serde(default)]
    platform: NamedRef,
}

impl From<RawgGame> for GameInfo {
    fn from(game: RawgGame) -> Self {
        GameInfo {
            id: game.id,
            name: game.name,
            summary: game.description_raw.unwrap_or_default(),
            genres: game.genres,
            platforms: game.platforms.into_iter().map(|p| p.platform).collect(),
            cover: Some(Cover { image_id: game.background_image.unwrap_or_default() }),
        }
    }
}

/// RAWG, used as the IGDB fallback.
#[derive(Clone)]
pub struct RawgClient {
    api_key: Option<String>,
    base_url: String,
    call: GuardedCall,
}

impl RawgClient {
    pub fn new(api_key: Option<String>, call: GuardedCall) -> Self {
        Self { api_key, base_url: RAWG_API_URL.to_string(), call }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.as_deref().is_some_and(|k| !k.is_empty())
    }

    /// Best match for `name`, converted to IGDB's shape.
    pub async fn search_game_by_name(&self, name: &str) -> AppResult<Option<GameInfo>> {
        let key = require(self.api_key.as_deref(), PROVIDER, "RAWG_API_KEY")?;
        let url = format!("{}/games", self.base_url);
        let http = self.call.http();

        let page: SearchPage = self
            .call
            .run(|client| {
                let request =
                    client.get(&url).query(&[("key", key), ("search", name), ("page_size", "1")]);
                http.fetch_json(PROVIDER, request)
            })
            .await?;

        Ok(page.results.into_iter().next().map(GameInfo::from))
    }
}
