//! On-disk store tests.
//!
//! Exercise the full write-behind path (stage, commit, background persist,
//! reopen, load) against the SQLite and redb backends in temp directories.
//!
//! Run with:
//! ```bash
//! cargo test --test store_tests
//! ```

use prefstore::backend::{BackendKind, SqliteBackend, TableBackend};
use prefstore::crypto::NonceMode;
use prefstore::{LoadState, PrefsStore, Value};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tempfile::TempDir;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct User {
    name: String,
    age: u32,
    tags: Vec<String>,
}

fn user(name: &str, age: u32) -> User {
    User {
        name: name.to_string(),
        age,
        tags: vec!["admin".to_string()],
    }
}

fn open(path: &Path, kind: BackendKind) -> PrefsStore {
    PrefsStore::builder()
        .kind(kind)
        .path(path)
        .workers(2)
        .build()
        .unwrap()
}

fn round_trip(kind: BackendKind, file: &str) {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join(file);

    {
        let store = open(&path, kind);
        store
            .put("name", "Sami")
            .put("age", 23)
            .put("premium", true)
            .put("balance", 120.5f64)
            .put("visits", 836_876_786_845i64)
            .put("ratio", 8.5f32)
            .commit();
        store.put_object("user", &user("Sami", 23)).commit();
        store
            .put_list_object("friends", &[user("Lina", 31), user("Omar", 40)])
            .commit();
        store.flush();
    }

    let store = open(&path, kind);
    store.load(true);
    assert_eq!(store.load_state(), LoadState::Loaded);
    assert_eq!(store.get_str("name", "?"), "Sami");
    assert_eq!(store.get("age", 0), 23);
    assert!(store.get("premium", false));
    assert_eq!(store.get("balance", 0.0f64), 120.5);
    assert_eq!(store.get("visits", 0i64), 836_876_786_845);
    assert_eq!(store.get("ratio", 0.0f32), 8.5);
    assert_eq!(store.get_object::<User>("user"), Some(user("Sami", 23)));
    assert_eq!(
        store.get_list_object::<User>("friends"),
        Some(vec![user("Lina", 31), user("Omar", 40)])
    );
}

#[test]
fn test_sqlite_round_trip() {
    round_trip(BackendKind::Sqlite, "prefs.db");
}

#[test]
fn test_redb_round_trip() {
    round_trip(BackendKind::Redb, "prefs.redb");
}

#[test]
fn test_sqlite_rows_match_table_format() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("prefs.db");

    let store = open(&path, BackendKind::Sqlite);
    store.put("age", 23).put("premium", false).commit();
    store.flush();

    let mut rows = SqliteBackend::open(&path).unwrap().scan().unwrap();
    rows.sort_by(|a, b| a.key.cmp(&b.key));
    let tuples: Vec<_> = rows
        .iter()
        .map(|r| (r.key.as_str(), r.type_tag.as_str(), r.value.as_str()))
        .collect();
    assert_eq!(
        tuples,
        vec![("age", "Integer", "23"), ("premium", "Boolean", "false")]
    );
}

#[test]
fn test_remove_and_clear_reach_disk() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("prefs.db");

    {
        let store = open(&path, BackendKind::Sqlite);
        store.put("a", 1).put("b", 2).put("c", 3).commit();
        store.flush();
        store.remove("b");
    }
    {
        let store = open(&path, BackendKind::Sqlite);
        assert_eq!(store.keys(), vec!["a".to_string(), "c".to_string()]);
        store.clear();
    }

    let store = open(&path, BackendKind::Sqlite);
    store.load(true);
    assert!(store.is_empty());
}

#[test]
fn test_encrypted_sqlite_store() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("secret.db");
    let open_with = |secret: &str| {
        PrefsStore::builder()
            .path(&path)
            .encryption(secret, NonceMode::Fixed)
            .build()
            .unwrap()
    };

    {
        let store = open_with("Ser5@3h6K#t5?f&58");
        store.put("name", "Sami").commit();
    }

    let raw = SqliteBackend::open(&path).unwrap().scan().unwrap();
    assert_eq!(raw.len(), 1);
    assert_eq!(raw[0].type_tag, "String");
    assert_ne!(raw[0].value, "Sami");

    assert_eq!(open_with("Ser5@3h6K#t5?f&58").get_str("name", "?"), "Sami");
    assert_eq!(open_with("not the secret").get_str("name", "?"), "?");
}

#[test]
fn test_uncommitted_writes_are_not_persisted() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("prefs.db");

    {
        let store = open(&path, BackendKind::Sqlite);
        store.put("kept", 1).commit();
        store.put("lost", 2);
    }

    let store = open(&path, BackendKind::Sqlite);
    assert!(store.contains("kept"));
    assert!(!store.contains("lost"));
}

#[test]
fn test_background_load_then_read() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("prefs.db");
    {
        let store = open(&path, BackendKind::Sqlite);
        store.put("greeting", "hello").commit();
    }

    let store = open(&path, BackendKind::Sqlite);
    store.load(false);
    store.load(true);
    assert_eq!(store.get_value("greeting"), Some(Value::from("hello")));
}

#[test]
fn test_two_stores_share_one_file_sequentially() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("prefs.db");

    let first = open(&path, BackendKind::Sqlite);
    first.put("k", "from first").commit();
    first.flush();

    let second = open(&path, BackendKind::Sqlite);
    assert_eq!(second.get_str("k", "?"), "from first");
}

#[test]
fn test_unwritable_path_fails_construction() {
    let tmp = TempDir::new().unwrap();
    let blocker = tmp.path().join("file");
    std::fs::write(&blocker, b"not a directory").unwrap();

    let result = PrefsStore::builder()
        .path(blocker.join("prefs.db"))
        .build();
    assert!(result.is_err());
}

/// Many writers committing against one SQLite file.
///
/// Run with:
/// ```bash
/// cargo test --test store_tests -- --ignored
/// ```
#[test]
#[ignore = "stress test"]
fn stress_concurrent_writers_sqlite() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("stress.db");
    let store = Arc::new(
        PrefsStore::builder()
            .path(&path)
            .workers(8)
            .build()
            .unwrap(),
    );

    let handles: Vec<_> = (0..16)
        .map(|t| {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                for i in 0..200 {
                    store.put(format!("w{t}_{i}"), i).commit();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert!(store.flush_timeout(Duration::from_secs(60)));
    assert_eq!(store.len(), 3200);

    let reopened = open(&path, BackendKind::Sqlite);
    assert_eq!(reopened.len(), 3200);
}
