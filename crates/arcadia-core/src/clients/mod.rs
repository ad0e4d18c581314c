//! External API consumers: game metadata and the chat assistant.
//!
//! Each client composes the reliability layer the same way: a [`GuardedCall`] with the
//! provider's named limiter around requests sent through the shared session. Missing
//! credentials fail before any request is made.
//!
//! [`GuardedCall`]: crate::reliability::GuardedCall

mod ai;
mod igdb;
mod rawg;
mod steam;

pub use ai::{AiClient, AskScope, ChatContext, ChatContexts, ChatMessage};
pub use igdb::IgdbClient;
pub use rawg::RawgClient;
pub use steam::{format_playtime, persona_state_name, SteamClient};

use serde::{Deserialize, Serialize};

use arcadia_types::ConfigError;

use crate::error::AppResult;

/// `{"name": ...}` reference as used for genres and platforms.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedRef {
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cover {
    #[serde(default)]
    pub image_id: String,
}

/// Game metadata in IGDB's shape; RAWG results are converted into it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameInfo {
    #[serde(default)]
    pub id: Option<u64>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub genres: Vec<NamedRef>,
    #[serde(default)]
    pub platforms: Vec<NamedRef>,
    #[serde(default)]
    pub cover: Option<Cover>,
}

impl GameInfo {
    pub fn genre_names(&self) -> Vec<&str> {
        self.genres.iter().filter_map(|g| g.name.as_deref()).collect()
    }
}

/// The credential, or the configuration error naming the variable that supplies it.
fn require<'a>(value: Option<&'a str>, provider: &str, variable: &str) -> AppResult<&'a str> {
    match value {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(ConfigError::missing(provider, variable).into()),
    }
}
