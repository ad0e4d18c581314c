//! The bot's domain documents, persisted through the JSON store.
//!
//! Every document lives in its own file under the data directory. ID-keyed maps are
//! stored with decimal string keys (JSON objects only have string keys) and come back
//! as `u64` keys; anything that is not a plain decimal number is dropped on load.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::path::{Path, PathBuf};

use futures::future::join_all;
use parking_lot::RwLock;
use serde_json::{Map, Value};
use tracing::{info, warn};

use crate::modules::storage::JsonStore;

/// Map keyed by a Discord or game ID.
pub type IdMap = BTreeMap<u64, Value>;

/// One persisted document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Document {
    SeenRssPosts,
    BotState,
    UserData,
    Reviews,
    Tags,
    LinkHealth,
    Webhooks,
    Collections,
    Compatibility,
    SteamLinks,
}

impl Document {
    pub const ALL: [Document; 10] = [
        Document::SeenRssPosts,
        Document::BotState,
        Document::UserData,
        Document::Reviews,
        Document::Tags,
        Document::LinkHealth,
        Document::Webhooks,
        Document::Collections,
        Document::Compatibility,
        Document::SteamLinks,
    ];

    pub fn file_name(&self) -> &'static str {
        match self {
            Document::SeenRssPosts => "fitgirl_seen_posts.json",
            Document::BotState => "bot_state.json",
            Document::UserData => "user_data.json",
            Document::Reviews => "reviews_data.json",
            Document::Tags => "tags_data.json",
            Document::LinkHealth => "link_health_data.json",
            Document::Webhooks => "webhooks_data.json",
            Document::Collections => "collections_data.json",
            Document::Compatibility => "compatibility_data.json",
            Document::SteamLinks => "steam_links.json",
        }
    }
}

impl fmt::Display for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Document::SeenRssPosts => "seen_rss_posts",
            Document::BotState => "bot_state",
            Document::UserData => "user_data",
            Document::Reviews => "reviews",
            Document::Tags => "tags",
            Document::LinkHealth => "link_health",
            Document::Webhooks => "webhooks",
            Document::Collections => "collections",
            Document::Compatibility => "compatibility",
            Document::SteamLinks => "steam_links",
        };
        f.write_str(name)
    }
}

/// In-memory contents of every document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Documents {
    pub seen_rss_posts: HashSet<String>,
    pub bot_state: Map<String, Value>,
    pub user_data: Map<String, Value>,
    pub reviews: IdMap,
    pub tags: IdMap,
    pub link_health: IdMap,
    pub webhooks: IdMap,
    pub collections: IdMap,
    pub compatibility: IdMap,
    pub steam_links: IdMap,
}

impl Documents {
    fn id_map(&self, doc: Document) -> Option<&IdMap> {
        match doc {
            Document::Reviews => Some(&self.reviews),
            Document::Tags => Some(&self.tags),
            Document::LinkHealth => Some(&self.link_health),
            Document::Webhooks => Some(&self.webhooks),
            Document::Collections => Some(&self.collections),
            Document::Compatibility => Some(&self.compatibility),
            Document::SteamLinks => Some(&self.steam_links),
            Document::SeenRssPosts | Document::BotState | Document::UserData => None,
        }
    }

    fn id_map_mut(&mut self, doc: Document) -> Option<&mut IdMap> {
        match doc {
            Document::Reviews => Some(&mut self.reviews),
            Document::Tags => Some(&mut self.tags),
            Document::LinkHealth => Some(&mut self.link_health),
            Document::Webhooks => Some(&mut self.webhooks),
            Document::Collections => Some(&mut self.collections),
            Document::Compatibility => Some(&mut self.compatibility),
            Document::SteamLinks => Some(&mut self.steam_links),
            Document::SeenRssPosts | Document::BotState | Document::UserData => None,
        }
    }

    /// Number of entries in `doc`.
    pub fn len_of(&self, doc: Document) -> usize {
        match doc {
            Document::SeenRssPosts => self.seen_rss_posts.len(),
            Document::BotState => self.bot_state.len(),
            Document::UserData => self.user_data.len(),
            other => self.id_map(other).map_or(0, BTreeMap::len),
        }
    }

    /// On-disk JSON for `doc`.
    fn to_json(&self, doc: Document) -> Value {
        match doc {
            Document::SeenRssPosts => {
                let mut posts: Vec<&String> = self.seen_rss_posts.iter().collect();
                posts.sort();
                Value::from(posts.into_iter().cloned().collect::<Vec<_>>())
            },
            Document::BotState => Value::Object(self.bot_state.clone()),
            Document::UserData => Value::Object(self.user_data.clone()),
            other => {
                let map = self.id_map(other).map(encode_id_map).unwrap_or_default();
                Value::Object(map)
            },
        }
    }
}

fn encode_id_map(map: &IdMap) -> Map<String, Value> {
    map.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
}

fn decode_id_map(raw: HashMap<String, Value>) -> IdMap {
    raw.into_iter()
        .filter(|(k, _)| !k.is_empty() && k.bytes().all(|b| b.is_ascii_digit()))
        .filter_map(|(k, v)| k.parse::<u64>().ok().map(|id| (id, v)))
        .collect()
}

/// Owns the documents and knows where they live.
pub struct DataManager {
    store: JsonStore,
    data_dir: PathBuf,
    docs: RwLock<Documents>,
}

impl DataManager {
    pub fn new(store: JsonStore, data_dir: impl Into<PathBuf>) -> Self {
        Self { store, data_dir: data_dir.into(), docs: RwLock::new(Documents::default()) }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn path_of(&self, doc: Document) -> PathBuf {
        self.data_dir.join(doc.file_name())
    }

    /// Load every document, replacing the in-memory copy.
    ///
    /// Missing or unreadable files yield empty documents; this never fails.
    pub async fn load_all(&self) {
        info!(dir = %self.data_dir.display(), "Loading all data files");
        let mut loaded = Documents::default();

        let seen: Value = self.store.load_async(self.path_of(Document::SeenRssPosts), Value::Null).await;
        loaded.seen_rss_posts = match seen {
            Value::Array(items) => {
                items.into_iter().filter_map(|v| v.as_str().map(str::to_string)).collect()
            },
            Value::Null => HashSet::new(),
            _ => {
                warn!("Seen RSS posts file is not a list, starting empty");
                HashSet::new()
            },
        };

        loaded.bot_state = self.store.load_async(self.path_of(Document::BotState), Map::new()).await;
        loaded.user_data = self.store.load_async(self.path_of(Document::UserData), Map::new()).await;

        for doc in Document::ALL {
            let path = self.path_of(doc);
            let Some(slot) = loaded.id_map_mut(doc) else {
                continue;
            };
            let raw: HashMap<String, Value> = self.store.load_async(path, HashMap::new()).await;
            *slot = decode_id_map(raw);
        }

        for doc in Document::ALL {
            info!(document = %doc, entries = loaded.len_of(doc), "Loaded document");
        }
        *self.docs.write() = loaded;
    }

    /// Save every document. Returns how many files failed to save.
    pub async fn save_all(&self) -> usize {
        info!("Saving all data files");
        let results = join_all(Document::ALL.map(|doc| self.save(doc))).await;
        let failed = results.into_iter().filter(|saved| !saved).count();
        if failed == 0 {
            info!("All data files saved");
        } else {
            warn!(failed, "Some data files could not be saved");
        }
        failed
    }

    /// Save a single document immediately.
    pub async fn save(&self, doc: Document) -> bool {
        let body = self.docs.read().to_json(doc);
        self.store.save_async(body, self.path_of(doc)).await
    }

    /// Run `f` against the current documents.
    pub fn read<R>(&self, f: impl FnOnce(&Documents) -> R) -> R {
        f(&self.docs.read())
    }

    /// Mutate the documents in memory. Call [`DataManager::save`] to persist.
    pub fn update<R>(&self, f: impl FnOnce(&mut Documents) -> R) -> R {
        f(&mut self.docs.write())
    }

    /// Record an RSS post; `true` if it was not seen before.
    pub fn mark_seen(&self, post_id: &str) -> bool {
        self.docs.write().seen_rss_posts.insert(post_id.to_string())
    }

    pub fn counts(&self) -> Vec<(Document, usize)> {
        let docs = self.docs.read();
        Document::ALL.iter().map(|d| (*d, docs.len_of(*d))).collect()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_load_all_on_empty_dir() {
        let dir = tempfile::tempdir().unwrap();
        let manager = DataManager::new(JsonStore::new(), dir.path());

        manager.load_all().await;

        assert!(manager.counts().iter().all(|(_, n)| *n == 0));
    }

    #[tokio::test]
    async fn test_non_numeric_keys_are_dropped() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(Document::Reviews.file_name()),
            r#"{"123": {"score": 9}, "abc": 1, "-4": 2, "": 3}"#,
        )
        .unwrap();
        let manager = DataManager::new(JsonStore::new(), dir.path());

        manager.load_all().await;

        manager.read(|docs| {
            assert_eq!(docs.reviews.len(), 1);
            assert_eq!(docs.reviews[&123], json!({"score": 9}));
        });
    }

    #[tokio::test]
    async fn test_save_all_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let manager = DataManager::new(JsonStore::new(), dir.path());
        assert!(manager.mark_seen("post-1"));
        assert!(!manager.mark_seen("post-1"));
        manager.update(|docs| {
            docs.tags.insert(42, json!(["rpg"]));
            docs.bot_state.insert("last_run".to_string(), json!("today"));
        });

        assert_eq!(manager.save_all().await, 0);

        let on_disk: Value = serde_json::from_str(
            &std::fs::read_to_string(dir.path().join(Document::Tags.file_name())).unwrap(),
        )
        .unwrap();
        assert_eq!(on_disk, json!({"42": ["rpg"]}));

        let reloaded = DataManager::new(JsonStore::new(), dir.path());
        reloaded.load_all().await;
        assert_eq!(reloaded.read(Documents::clone), manager.read(Documents::clone));
    }

    #[tokio::test]
    async fn test_save_all_counts_failures() {
        let dir = tempfile::tempdir().unwrap();
        // A file where the data directory should be makes every save fail.
        let blocker = dir.path().join("data");
        std::fs::write(&blocker, "x").unwrap();
        let manager = DataManager::new(JsonStore::new(), &blocker);

        assert_eq!(manager.save_all().await, Document::ALL.len());
    }
}
