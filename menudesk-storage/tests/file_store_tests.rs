use menudesk_storage::{FileStore, KeyValueStore, StorageError};
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use tempfile::tempdir;

#[test]
fn missing_file_reads_as_empty() {
    let dir = tempdir().unwrap();
    let store = FileStore::new(dir.path().join("session.json"));
    assert_eq!(store.get("accessToken").unwrap(), None);
}

#[test]
fn values_survive_reopen() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("nested").join("session.json");

    let store = FileStore::new(&path);
    store
        .set_many(&[("accessToken", "at"), ("refreshToken", "rt")])
        .unwrap();
    drop(store);

    let reopened = FileStore::new(&path);
    assert_eq!(reopened.get("accessToken").unwrap().as_deref(), Some("at"));
    assert_eq!(reopened.get("refreshToken").unwrap().as_deref(), Some("rt"));
}

#[test]
fn set_many_writes_one_document() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("session.json");
    let store = FileStore::new(&path);
    store
        .set_many(&[("accessToken", "at"), ("refreshToken", "rt"), ("user", "{}")])
        .unwrap();

    let raw = std::fs::read_to_string(&path).unwrap();
    let doc: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(
        doc,
        serde_json::json!({ "accessToken": "at", "refreshToken": "rt", "user": "{}" })
    );
    assert!(!path.with_extension("json.tmp").exists());
}

#[test]
fn removing_last_key_deletes_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("session.json");
    let store = FileStore::new(&path);
    store.set("accessToken", "at").unwrap();
    assert!(path.exists());

    store.remove("accessToken").unwrap();
    assert!(!path.exists());
    assert_eq!(store.get("accessToken").unwrap(), None);
}

#[test]
fn remove_many_keeps_other_keys() {
    let dir = tempdir().unwrap();
    let store = FileStore::new(dir.path().join("session.json"));
    store.set_many(&[("a", "1"), ("b", "2")]).unwrap();
    store.remove_many(&["a"]).unwrap();
    assert_eq!(store.get("a").unwrap(), None);
    assert_eq!(store.get("b").unwrap().as_deref(), Some("2"));
}

#[test]
fn corrupt_document_is_reported_on_read() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("session.json");
    std::fs::write(&path, "{ not json").unwrap();

    let store = FileStore::new(&path);
    assert!(matches!(store.get("accessToken"), Err(StorageError::Corrupt(_))));
}

#[test]
fn corrupt_document_is_replaced_on_write() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("session.json");
    std::fs::write(&path, "[1, 2, 3]").unwrap();

    let store = FileStore::new(&path);
    store.set("accessToken", "at").unwrap();
    assert_eq!(store.get("accessToken").unwrap().as_deref(), Some("at"));
}

#[test]
fn clearing_corrupt_document_leaves_store_readable() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("session.json");
    std::fs::write(&path, "garbage").unwrap();

    let store = FileStore::new(&path);
    store.remove_many(&["accessToken", "refreshToken", "user"]).unwrap();
    assert_eq!(store.get("accessToken").unwrap(), None);
}

#[test]
fn default_path_ends_with_app_and_file() {
    let path = FileStore::default_path("menudesk");
    assert!(path.ends_with("menudesk/session.json"));
}

proptest! {
    #[test]
    fn arbitrary_values_roundtrip(key in "[a-zA-Z]{1,16}", value in ".*") {
        let dir = tempdir().unwrap();
        let store = FileStore::new(dir.path().join("session.json"));
        store.set(&key, &value).unwrap();
        prop_assert_eq!(store.get(&key).unwrap(), Some(value));
    }
}
