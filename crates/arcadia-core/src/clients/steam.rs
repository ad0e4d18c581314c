use serde_json::Value;
use tracing::debug;

use super::require;
use crate::error::AppResult;
use crate::reliability::GuardedCall;

const PROVIDER: &str = "steam";
pub const STEAM_API_URL: &str = "https://api.steampowered.com";

/// Steam Web API.
#[derive(Clone)]
pub struct SteamClient {
    api_key: Option<String>,
    base_url: String,
    call: GuardedCall,
}

impl SteamClient {
    /// `call` should carry the steam limiter.
    pub fn new(api_key: Option<String>, call: GuardedCall) -> Self {
        Self { api_key, base_url: STEAM_API_URL.to_string(), call }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.as_deref().is_some_and(|k| !k.is_empty())
    }

    async fn get(&self, endpoint: &str, params: &[(&str, String)]) -> AppResult<Value> {
        let key = require(self.api_key.as_deref(), PROVIDER, "STEAM_API_KEY")?;
        let url = format!("{}/{}", self.base_url, endpoint);
        let http = self.call.http();
        debug!(endpoint, "Steam API request");

        self.call
            .run(|client| {
                let request = client.get(&url).query(&[("key", key)]).query(params);
                http.fetch_json(PROVIDER, request)
            })
            .await
    }

    /// Profile of one player, `None` if Steam does not know the ID.
    pub async fn get_player_summaries(&self, steam_id: &str) -> AppResult<Option<Value>> {
        let body = self
            .get("ISteamUser/GetPlayerSummaries/v0002/", &[("steamids", steam_id.to_string())])
            .await?;
        Ok(body.pointer("/response/players/0").cloned())
    }

    pub async fn get_owned_games(&self, steam_id: &str, include_appinfo: bool) -> AppResult<Vec<Value>> {
        let body = self
            .get(
                "IPlayerService/GetOwnedGames/v0001/",
                &[
                    ("steamid", steam_id.to_string()),
                    ("include_appinfo", u8::from(include_appinfo).to_string()),
                    ("include_played_free_games", "1".to_string()),
                ],
            )
            .await?;
        Ok(list_at(&body, "/response/games"))
    }

    pub async fn get_recently_played_games(&self, steam_id: &str) -> AppResult<Vec<Value>> {
        let body = self
            .get(
                "IPlayerService/GetRecentlyPlayedGames/v0001/",
                &[("steamid", steam_id.to_string()), ("count", "10".to_string())],
            )
            .await?;
        Ok(list_at(&body, "/response/games"))
    }

    pub async fn get_friend_list(&self, steam_id: &str) -> AppResult<Vec<Value>> {
        let body = self
            .get(
                "ISteamUser/GetFriendList/v0001/",
                &[("steamid", steam_id.to_string()), ("relationship", "friend".to_string())],
            )
            .await?;
        Ok(list_at(&body, "/friendslist/friends"))
    }

    /// Steam ID behind a custom profile URL name.
    pub async fn resolve_vanity_url(&self, vanity: &str) -> AppResult<Option<String>> {
        let body = self
            .get("ISteamUser/ResolveVanityURL/v0001/", &[("vanityurl", vanity.to_string())])
            .await?;
        if body.pointer("/response/success").and_then(Value::as_i64) != Some(1) {
            return Ok(None);
        }
        Ok(body.pointer("/response/steamid").and_then(Value::as_str).map(str::to_string))
    }
}

fn list_at(body: &Value, pointer: &str) -> Vec<Value> {
    body.pointer(pointer).and_then(Value::as_array).cloned().unwrap_or_default()
}

/// `42 min`, `3.5 hrs`, `250 hrs`.
pub fn format_playtime(minutes: u64) -> String {
    if minutes < 60 {
        return format!("{minutes} min");
    }
    let hours = minutes as f64 / 60.0;
    if hours < 100.0 {
        format!("{hours:.1} hrs")
    } else {
        format!("{} hrs", minutes / 60)
    }
}

pub fn persona_state_name(state: u8) -> &'static str {
    match state {
        0 => "Offline",
        1 => "Online",
        2 => "Busy",
        3 => "Away",
        4 => "Snooze",
        5 => "Looking to trade",
        6 => "Looking to play",
        _ => "Unknown",
    }
}
