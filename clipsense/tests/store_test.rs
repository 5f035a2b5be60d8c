//! ClipHistoryApi contract against an on-disk database

use chrono::{Duration, Utc};
use clipsense::clipboard::MemoryClipboard;
use clipsense::database::{Database, DatabaseError};
use clipsense::{
    ClipHistoryApi, ClipSense, ClipSenseConfig, ClipSenseError, ContentType, DateRange, SearchFilters,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

fn open_at(path: &Path) -> ClipSense {
    let config = ClipSenseConfig {
        database_path: Some(path.to_path_buf()),
        ..Default::default()
    };
    ClipSense::open(config, Arc::new(MemoryClipboard::new())).unwrap()
}

fn temp_db() -> (TempDir, PathBuf) {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested").join("history.db");
    (dir, path)
}

#[test]
fn test_history_survives_reopen() {
    let (_dir, path) = temp_db();
    let id = {
        let store = open_at(&path);
        store.capture_text("persist me").unwrap().unwrap()
    };

    let store = open_at(&path);
    let clip = store.get_item(&id).unwrap().unwrap();
    assert_eq!(clip.content, "persist me");
    assert_eq!(clip.content_type, ContentType::Text);
    assert!(!clip.is_favorite);
    assert!(clip.tags.is_empty());
}

#[test]
fn test_history_is_newest_first_and_limited() {
    let (_dir, path) = temp_db();
    let store = open_at(&path);
    for text in ["one", "two", "three"] {
        store.capture_text(text).unwrap();
    }
    let history: Vec<String> = store.get_history(2).unwrap().into_iter().map(|c| c.content).collect();
    assert_eq!(history, vec!["three", "two"]);
    assert!(store.get_history(0).unwrap().is_empty());
}

#[test]
fn test_soft_delete_hides_but_keeps_row() {
    let (_dir, path) = temp_db();
    let store = open_at(&path);
    let id = store.capture_text("to delete").unwrap().unwrap();
    store.delete_item(&id).unwrap();

    assert!(store.get_item(&id).unwrap().is_none());
    assert!(store.get_history(10).unwrap().is_empty());
    let row = store.database().get_clip_including_deleted(&id).unwrap().unwrap();
    assert!(row.is_deleted);
    assert!(matches!(store.delete_item(&id), Err(ClipSenseError::NotFound(_))));
}

#[test]
fn test_tags_and_favorites() {
    let (_dir, path) = temp_db();
    let store = open_at(&path);
    let id = store.capture_text("tagged").unwrap().unwrap();

    store
        .add_tags(&id, &["work".to_string(), "urgent".to_string(), "work".to_string()])
        .unwrap();
    store.remove_tags(&id, &["urgent".to_string(), "absent".to_string()]).unwrap();
    assert!(store.toggle_favorite(&id).unwrap());

    let clip = store.get_item(&id).unwrap().unwrap();
    assert_eq!(clip.tags.into_iter().collect::<Vec<_>>(), vec!["work"]);
    assert!(clip.is_favorite);
    assert!(clip.updated_at >= clip.created_at);

    assert!(!store.toggle_favorite(&id).unwrap());
}

#[tokio::test]
async fn test_search_filters_combine() {
    let (_dir, path) = temp_db();
    let store = open_at(&path);
    let url = store.capture_text("https://example.com/docs").unwrap().unwrap();
    let email = store.capture_text("docs@example.com").unwrap().unwrap();
    store.capture_text("plain docs note").unwrap();
    store.add_tags(&email, &["contact".to_string()]).unwrap();
    store.toggle_favorite(&url).unwrap();

    let all = store.search("docs".to_string(), SearchFilters::default()).await.unwrap();
    assert_eq!(all.len(), 3);

    let urls = store
        .search(
            "example".to_string(),
            SearchFilters {
                detected_types: Some(vec!["url".to_string()]),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(urls.iter().map(|c| c.id.as_str()).collect::<Vec<_>>(), vec![url.as_str()]);

    let tagged = store
        .search(
            String::new(),
            SearchFilters {
                tags: Some(vec!["contact".to_string()]),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(tagged.len(), 1);
    assert_eq!(tagged[0].id, email);

    let favorites = store
        .search(
            String::new(),
            SearchFilters {
                is_favorite: Some(true),
                content_types: Some(vec![ContentType::Text]),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(favorites.len(), 1);
    assert_eq!(favorites[0].id, url);

    let past = Utc::now() - Duration::days(2);
    let none = store
        .search(
            String::new(),
            SearchFilters {
                date_range: Some(DateRange {
                    start: past - Duration::days(1),
                    end: past,
                }),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert!(none.is_empty());
}

#[tokio::test]
async fn test_search_treats_wildcards_literally() {
    let (_dir, path) = temp_db();
    let store = open_at(&path);
    store.capture_text("100% done").unwrap();
    store.capture_text("1000 done").unwrap();
    let found = store.search("0%".to_string(), SearchFilters::default()).await.unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].content, "100% done");
}

#[test]
fn test_corrupt_json_columns_fall_back_to_defaults() {
    let (_dir, path) = temp_db();
    let id = {
        let store = open_at(&path);
        let id = store.capture_text("https://example.com").unwrap().unwrap();
        store.add_tags(&id, &["keep".to_string()]).unwrap();
        id
    };

    {
        let conn = rusqlite::Connection::open(&path).unwrap();
        conn.execute(
            "UPDATE clips SET detected_types = 'not json', tags = '{', metadata = NULL WHERE id = ?1",
            [&id],
        )
        .unwrap();
    }

    let store = open_at(&path);
    let clip = store.get_item(&id).unwrap().unwrap();
    assert_eq!(clip.content, "https://example.com");
    assert!(clip.detected_types.is_empty());
    assert!(clip.tags.is_empty());
    assert_eq!(clip.metadata.original_length, 0);
}

#[test]
fn test_newer_schema_is_rejected() {
    let (_dir, path) = temp_db();
    drop(open_at(&path));

    {
        let conn = rusqlite::Connection::open(&path).unwrap();
        conn.execute("INSERT INTO schema_version (version) VALUES (2)", []).unwrap();
    }

    match Database::open(&path) {
        Err(DatabaseError::UnsupportedSchema { found, supported }) => {
            assert_eq!(found, 2);
            assert_eq!(supported, 1);
        }
        other => panic!("expected UnsupportedSchema, got {:?}", other.map(|_| ())),
    }

    let config = ClipSenseConfig {
        database_path: Some(path.clone()),
        ..Default::default()
    };
    let result = ClipSense::open(config, Arc::new(MemoryClipboard::new()));
    assert!(matches!(result, Err(ClipSenseError::DatabaseError(_))));
}

#[test]
fn test_settings_persist_and_unknown_keys_survive() {
    let (_dir, path) = temp_db();
    {
        let store = open_at(&path);
        let mut partial = serde_json::Map::new();
        partial.insert("theme".to_string(), serde_json::json!("light"));
        partial.insert("futureOption".to_string(), serde_json::json!({"x": 1}));
        store.update_settings(partial).unwrap();
    }

    let store = open_at(&path);
    let settings = store.get_settings().unwrap();
    assert_eq!(settings.theme, "light");
    assert_eq!(settings.extra.get("futureOption"), Some(&serde_json::json!({"x": 1})));
    assert_eq!(settings.max_history_items, 1000);
}
