use super::*;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use tempfile::tempdir;

#[test]
fn test_missing_file_returns_default_without_creating_it() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("nonexistent.json");
    let store = JsonStore::new();

    let value: Value = store.load(&path, json!({"a": 1}));

    assert_eq!(value, json!({"a": 1}));
    assert!(!path.exists());
}

#[test]
fn test_save_then_load_returns_saved_value() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("state.json");
    let store = JsonStore::new();

    let mut reviews = BTreeMap::new();
    reviews.insert("123".to_string(), json!({"score": 9, "text": "great"}));
    assert!(store.save(&reviews, &path));

    let loaded: BTreeMap<String, Value> = store.load(&path, BTreeMap::new());
    assert_eq!(loaded, reviews);
    assert!(!temp_path(&path).exists());
}

#[test]
fn test_backup_exists_after_first_overwrite() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("tags.json");
    let store = JsonStore::new();

    assert!(store.save(&json!({"v": 1}), &path));
    assert!(!backup_path(&path).exists());

    assert!(store.save(&json!({"v": 2}), &path));
    let backup: Value = serde_json::from_str(&fs::read_to_string(backup_path(&path)).unwrap()).unwrap();
    assert_eq!(backup, json!({"v": 1}));
}

#[test]
fn test_corrupted_primary_falls_back_to_backup() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("webhooks.json");
    fs::write(&path, "{ not json").unwrap();
    fs::write(backup_path(&path), r#"{"42": "https://example.com/hook"}"#).unwrap();

    let value: Value = JsonStore::new().load(&path, json!({}));

    assert_eq!(value, json!({"42": "https://example.com/hook"}));
}

#[test]
fn test_corrupted_primary_without_backup_returns_default() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("health.json");
    fs::write(&path, "[1, 2,").unwrap();

    let value: Vec<u32> = JsonStore::new().load(&path, vec![7]);

    assert_eq!(value, vec![7]);
}

#[test]
fn test_corrupted_backup_returns_default() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("collections.json");
    fs::write(&path, "garbage").unwrap();
    fs::write(backup_path(&path), "also garbage").unwrap();

    let value: Value = JsonStore::new().load(&path, json!(null));

    assert_eq!(value, Value::Null);
}

#[test]
fn test_shape_mismatch_is_treated_like_corruption() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("seen.json");
    fs::write(&path, r#"{"unexpected": true}"#).unwrap();

    let value: Vec<String> = JsonStore::new().load(&path, Vec::new());

    assert!(value.is_empty());
}

#[test]
fn test_failed_rename_returns_false_and_removes_temp() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("occupied");
    fs::create_dir(&path).unwrap();
    fs::write(path.join("child"), "x").unwrap();

    let saved = JsonStore::new().save(&json!({"x": 1}), &path);

    assert!(!saved);
    assert!(!temp_path(&path).exists());
    assert!(path.is_dir());
}

#[test]
fn test_save_creates_missing_parent_directories() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("nested").join("bot_state.json");

    assert!(JsonStore::with_locking(FileLocking::Disabled).save(&json!({"ready": true}), &path));
    assert!(path.exists());
}

#[test]
fn test_concurrent_saves_leave_exactly_one_complete_body() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("contended.json");
    let store = JsonStore::new();

    let bodies: Vec<Value> = (0..8)
        .map(|writer| {
            let entries: BTreeMap<String, String> =
                (0..500).map(|i| (format!("{i}"), format!("writer-{writer}-{i}"))).collect();
            serde_json::to_value(entries).unwrap()
        })
        .collect();

    std::thread::scope(|scope| {
        for body in &bodies {
            let store = store.clone();
            let path = path.clone();
            scope.spawn(move || {
                for _ in 0..5 {
                    assert!(store.save(body, &path));
                }
            });
        }
    });

    let on_disk: Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    assert!(bodies.contains(&on_disk));
    assert_eq!(store.tracked_paths(), 0);
}

#[test]
fn test_relative_and_absolute_paths_share_a_lock() {
    let store = JsonStore::new();
    let relative = PathBuf::from("shared-lock-target.json");
    let absolute = std::env::current_dir().unwrap().join("shared-lock-target.json");

    let a = store.lock_for(&relative);
    let b = store.lock_for(&absolute);

    assert!(Arc::ptr_eq(&a.lock, &b.lock));
    assert_eq!(store.tracked_paths(), 1);

    drop(a);
    drop(b);
    assert_eq!(store.tracked_paths(), 0);
}

#[test]
fn test_lock_registry_only_holds_paths_in_use() {
    let dir = tempdir().unwrap();
    let store = JsonStore::new();

    for i in 0..20 {
        let path = dir.path().join(format!("doc_{i}.json"));
        assert!(store.save(&json!({ "i": i }), &path));
        assert_eq!(store.load(&path, Value::Null), json!({ "i": i }));
    }
    assert_eq!(store.tracked_paths(), 0);

    let path = dir.path().join("doc_0.json");
    let held = store.lock_for(&path);
    let _reader = held.read();
    assert_eq!(store.tracked_paths(), 1);
}

#[tokio::test]
async fn test_async_variants_round_trip() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("user_data.json");
    let store = JsonStore::new();

    assert!(store.save_async(json!({"user": "alice"}), path.clone()).await);
    let value: Value = store.load_async(path.clone(), json!({})).await;

    assert_eq!(value, json!({"user": "alice"}));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_async_saves_are_serialized() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("async_contended.json");
    let store = JsonStore::new();

    let mut handles = Vec::new();
    for writer in 0..16u32 {
        let store = store.clone();
        let path = path.clone();
        handles.push(tokio::spawn(async move {
            let body: Vec<u32> = vec![writer; 2_000];
            store.save_async(body, path).await
        }));
    }
    for handle in handles {
        assert!(handle.await.unwrap());
    }

    let on_disk: Vec<u32> = store.load_async(path, Vec::new()).await;
    assert_eq!(on_disk.len(), 2_000);
    assert!(on_disk.iter().all(|v| *v == on_disk[0]));
}
