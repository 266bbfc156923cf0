use std::fs;

use tempfile::tempdir;
use tokio::sync::broadcast::error::TryRecvError;

use showcall::auth::{CredentialKey, CredentialStore, FileCredentialStore, TokenPair};

#[test]
fn file_store_round_trips_both_keys() {
    let dir = tempdir().expect("tempdir should create");
    let store = FileCredentialStore::at_path(dir.path().join("creds.json"));

    store.set(CredentialKey::AccessToken, "access-1").unwrap();
    store.set(CredentialKey::RefreshToken, "refresh-1").unwrap();

    assert_eq!(store.access_token().unwrap().as_deref(), Some("access-1"));
    assert_eq!(store.refresh_token().unwrap().as_deref(), Some("refresh-1"));
}

#[test]
fn file_uses_the_wire_key_names() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("creds.json");
    let store = FileCredentialStore::at_path(path.clone());

    store
        .store_pair(&TokenPair {
            access_token: "access-2".to_string(),
            refresh_token: Some("refresh-2".to_string()),
        })
        .unwrap();

    let raw = fs::read_to_string(&path).unwrap();
    assert!(raw.contains("\"accessToken\""));
    assert!(raw.contains("\"refreshToken\""));
}

#[cfg(unix)]
#[test]
fn credential_file_is_owner_readable_only() {
    use std::os::unix::fs::PermissionsExt;

    let dir = tempdir().unwrap();
    let path = dir.path().join("creds.json");
    let store = FileCredentialStore::at_path(path.clone());

    store.set(CredentialKey::AccessToken, "secret").unwrap();

    let mode = fs::metadata(&path).unwrap().permissions().mode();
    assert_eq!(mode & 0o777, 0o600);
}

#[test]
fn clear_removes_the_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("creds.json");
    let store = FileCredentialStore::at_path(path.clone());

    store.set(CredentialKey::AccessToken, "access-3").unwrap();
    assert!(path.exists());

    store.clear().unwrap();
    assert!(!path.exists());
    assert_eq!(store.access_token().unwrap(), None);
}

#[test]
fn removing_the_last_key_removes_the_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("creds.json");
    let store = FileCredentialStore::at_path(path.clone());

    store.set(CredentialKey::AccessToken, "access-4").unwrap();
    store.remove(CredentialKey::AccessToken).unwrap();

    assert!(!path.exists());
}

#[test]
fn local_writes_notify_subscribers() {
    let dir = tempdir().unwrap();
    let store = FileCredentialStore::at_path(dir.path().join("creds.json"));
    let mut changes = store.subscribe();

    store.set(CredentialKey::AccessToken, "access-5").unwrap();
    store.remove(CredentialKey::AccessToken).unwrap();

    let login = changes.try_recv().expect("set should notify");
    assert_eq!(login.key, CredentialKey::AccessToken);
    assert_eq!(login.new_value.as_deref(), Some("access-5"));
    assert_eq!(login.old_value, None);

    let logout = changes.try_recv().expect("remove should notify");
    assert_eq!(logout.new_value, None);
    assert_eq!(logout.old_value.as_deref(), Some("access-5"));
}

#[test]
fn sync_external_surfaces_writes_from_another_process() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("creds.json");
    let store = FileCredentialStore::at_path(path.clone());
    let mut changes = store.subscribe();

    // Simulates a second process completing a login.
    fs::write(
        &path,
        r#"{"accessToken":"external-access","refreshToken":"external-refresh"}"#,
    )
    .unwrap();

    store.sync_external().unwrap();

    let first = changes.try_recv().expect("external write should notify");
    assert_eq!(first.key, CredentialKey::AccessToken);
    assert_eq!(first.new_value.as_deref(), Some("external-access"));

    let second = changes.try_recv().expect("both keys changed");
    assert_eq!(second.key, CredentialKey::RefreshToken);
    assert_eq!(second.new_value.as_deref(), Some("external-refresh"));

    // A second reconcile with no drift is silent.
    store.sync_external().unwrap();
    assert!(matches!(changes.try_recv(), Err(TryRecvError::Empty)));
}

#[test]
fn clones_share_state_and_notifications() {
    let dir = tempdir().unwrap();
    let store = FileCredentialStore::at_path(dir.path().join("creds.json"));
    let clone = store.clone();
    let mut changes = clone.subscribe();

    store.set(CredentialKey::RefreshToken, "shared").unwrap();

    assert_eq!(clone.refresh_token().unwrap().as_deref(), Some("shared"));
    assert!(changes.try_recv().is_ok());
}
