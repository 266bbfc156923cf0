use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::config::AppPaths;
use crate::error::AppResult;

use super::token::TokenPair;

const CHANGE_CHANNEL_CAPACITY: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CredentialKey {
    AccessToken,
    RefreshToken,
}

/// Notification emitted when a credential changes, including changes made by
/// another process sharing the same store.
#[derive(Debug, Clone)]
pub struct CredentialChange {
    pub key: CredentialKey,
    pub new_value: Option<String>,
    pub old_value: Option<String>,
}

/// Durable storage for the access/refresh token pair, with a change feed so a
/// session manager can react to logins and logouts it did not perform itself.
pub trait CredentialStore {
    fn get(&self, key: CredentialKey) -> AppResult<Option<String>>;
    fn set(&self, key: CredentialKey, value: &str) -> AppResult<()>;
    fn remove(&self, key: CredentialKey) -> AppResult<()>;
    fn clear(&self) -> AppResult<()>;
    fn subscribe(&self) -> broadcast::Receiver<CredentialChange>;

    fn access_token(&self) -> AppResult<Option<String>> {
        self.get(CredentialKey::AccessToken)
    }

    fn refresh_token(&self) -> AppResult<Option<String>> {
        self.get(CredentialKey::RefreshToken)
    }

    /// Stores a freshly issued pair. When the backend did not rotate the
    /// refresh token, the previously stored one stays in place.
    fn store_pair(&self, pair: &TokenPair) -> AppResult<()> {
        self.set(CredentialKey::AccessToken, &pair.access_token)?;
        if let Some(refresh_token) = &pair.refresh_token {
            self.set(CredentialKey::RefreshToken, refresh_token)?;
        }

        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CredentialFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    access_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    refresh_token: Option<String>,
}

impl CredentialFile {
    fn value(&self, key: CredentialKey) -> Option<&String> {
        match key {
            CredentialKey::AccessToken => self.access_token.as_ref(),
            CredentialKey::RefreshToken => self.refresh_token.as_ref(),
        }
    }

    fn slot(&mut self, key: CredentialKey) -> &mut Option<String> {
        match key {
            CredentialKey::AccessToken => &mut self.access_token,
            CredentialKey::RefreshToken => &mut self.refresh_token,
        }
    }

    fn is_empty(&self) -> bool {
        self.access_token.is_none() && self.refresh_token.is_none()
    }
}

/// JSON file per profile, `{"accessToken": ..., "refreshToken": ...}`, mode
/// 0600 on Unix. Local mutations notify subscribers directly; external writes
/// (another process) are picked up by the polling watcher.
#[derive(Debug, Clone)]
pub struct FileCredentialStore {
    path: PathBuf,
    notifier: broadcast::Sender<CredentialChange>,
    last_seen: Arc<Mutex<CredentialFile>>,
}

impl FileCredentialStore {
    pub fn new(paths: &AppPaths, profile: &str) -> Self {
        Self::at_path(paths.credentials_file(profile))
    }

    pub fn at_path(path: PathBuf) -> Self {
        let (notifier, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        let last_seen = read_credential_file(&path).unwrap_or_default();

        Self {
            path,
            notifier,
            last_seen: Arc::new(Mutex::new(last_seen)),
        }
    }

    /// Polls the backing file for writes made by other processes and emits
    /// change notifications for any drift. Eventually consistent: a change
    /// overwritten within one interval is never observed, which is fine for
    /// session credentials.
    pub fn spawn_watcher(&self, interval: Duration) -> JoinHandle<()> {
        let store = self.clone();
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(interval).await;
                if let Err(err) = store.sync_external() {
                    warn!(error = %err, "credential file poll failed");
                }
            }
        })
    }

    /// Reconciles the in-memory snapshot against the file, notifying
    /// subscribers of any externally made change.
    pub fn sync_external(&self) -> AppResult<()> {
        let current = read_credential_file(&self.path)?;
        let previous = {
            let mut snapshot = self.snapshot();
            if *snapshot == current {
                return Ok(());
            }
            std::mem::replace(&mut *snapshot, current.clone())
        };

        for key in [CredentialKey::AccessToken, CredentialKey::RefreshToken] {
            self.notify(key, previous.value(key).cloned(), current.value(key).cloned());
        }

        Ok(())
    }

    fn snapshot(&self) -> MutexGuard<'_, CredentialFile> {
        self.last_seen.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn notify(&self, key: CredentialKey, old_value: Option<String>, new_value: Option<String>) {
        if old_value == new_value {
            return;
        }

        debug!(?key, present = new_value.is_some(), "credential changed");
        let _ = self.notifier.send(CredentialChange {
            key,
            new_value,
            old_value,
        });
    }

    fn mutate(&self, key: CredentialKey, value: Option<String>) -> AppResult<()> {
        let mut file = read_credential_file(&self.path)?;
        let old_value = std::mem::replace(file.slot(key), value.clone());

        if file.is_empty() {
            if self.path.exists() {
                fs::remove_file(&self.path)?;
            }
        } else {
            write_credential_file(&self.path, &file)?;
        }

        *self.snapshot() = file;
        self.notify(key, old_value, value);
        Ok(())
    }
}

impl CredentialStore for FileCredentialStore {
    fn get(&self, key: CredentialKey) -> AppResult<Option<String>> {
        let file = read_credential_file(&self.path)?;
        Ok(file.value(key).cloned())
    }

    fn set(&self, key: CredentialKey, value: &str) -> AppResult<()> {
        self.mutate(key, Some(value.to_string()))
    }

    fn remove(&self, key: CredentialKey) -> AppResult<()> {
        self.mutate(key, None)
    }

    fn clear(&self) -> AppResult<()> {
        let previous = read_credential_file(&self.path)?;
        if self.path.exists() {
            fs::remove_file(&self.path)?;
        }

        *self.snapshot() = CredentialFile::default();
        for key in [CredentialKey::AccessToken, CredentialKey::RefreshToken] {
            self.notify(key, previous.value(key).cloned(), None);
        }

        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<CredentialChange> {
        self.notifier.subscribe()
    }
}

fn read_credential_file(path: &PathBuf) -> AppResult<CredentialFile> {
    if !path.exists() {
        return Ok(CredentialFile::default());
    }

    let raw = fs::read_to_string(path)?;
    let file = serde_json::from_str(&raw)?;
    Ok(file)
}

fn write_credential_file(path: &PathBuf, file: &CredentialFile) -> AppResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let payload = serde_json::to_string_pretty(file)?;
    fs::write(path, payload)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;

        let mut perms = fs::metadata(path)?.permissions();
        perms.set_mode(0o600);
        fs::set_permissions(path, perms)?;
    }

    Ok(())
}

/// In-process store for embedding and tests. Same notification semantics as
/// the file store, minus durability.
#[derive(Debug, Clone)]
pub struct MemoryCredentialStore {
    values: Arc<Mutex<HashMap<CredentialKey, String>>>,
    notifier: broadcast::Sender<CredentialChange>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        let (notifier, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self {
            values: Arc::new(Mutex::new(HashMap::new())),
            notifier,
        }
    }

    fn values(&self) -> MutexGuard<'_, HashMap<CredentialKey, String>> {
        self.values.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn notify(&self, key: CredentialKey, old_value: Option<String>, new_value: Option<String>) {
        if old_value == new_value {
            return;
        }

        let _ = self.notifier.send(CredentialChange {
            key,
            new_value,
            old_value,
        });
    }
}

impl Default for MemoryCredentialStore {
    fn default() -> Self {
        Self::new()
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn get(&self, key: CredentialKey) -> AppResult<Option<String>> {
        Ok(self.values().get(&key).cloned())
    }

    fn set(&self, key: CredentialKey, value: &str) -> AppResult<()> {
        let old_value = self.values().insert(key, value.to_string());
        self.notify(key, old_value, Some(value.to_string()));
        Ok(())
    }

    fn remove(&self, key: CredentialKey) -> AppResult<()> {
        let old_value = self.values().remove(&key);
        self.notify(key, old_value, None);
        Ok(())
    }

    fn clear(&self) -> AppResult<()> {
        let mut removed = {
            let mut values = self.values();
            std::mem::take(&mut *values)
        };

        for key in [CredentialKey::AccessToken, CredentialKey::RefreshToken] {
            self.notify(key, removed.remove(&key), None);
        }

        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<CredentialChange> {
        self.notifier.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_store_round_trips_pair() {
        let store = MemoryCredentialStore::new();
        store
            .store_pair(&TokenPair {
                access_token: "access-1".to_string(),
                refresh_token: Some("refresh-1".to_string()),
            })
            .expect("store should accept pair");

        assert_eq!(store.access_token().unwrap().as_deref(), Some("access-1"));
        assert_eq!(store.refresh_token().unwrap().as_deref(), Some("refresh-1"));
    }

    #[test]
    fn pair_without_rotation_keeps_refresh_token() {
        let store = MemoryCredentialStore::new();
        store
            .set(CredentialKey::RefreshToken, "refresh-original")
            .unwrap();

        store
            .store_pair(&TokenPair {
                access_token: "access-2".to_string(),
                refresh_token: None,
            })
            .unwrap();

        assert_eq!(
            store.refresh_token().unwrap().as_deref(),
            Some("refresh-original")
        );
    }

    #[tokio::test]
    async fn set_notifies_subscribers() {
        let store = MemoryCredentialStore::new();
        let mut changes = store.subscribe();

        store.set(CredentialKey::AccessToken, "access-3").unwrap();

        let change = changes.recv().await.expect("change should arrive");
        assert_eq!(change.key, CredentialKey::AccessToken);
        assert_eq!(change.new_value.as_deref(), Some("access-3"));
        assert_eq!(change.old_value, None);
    }

    #[tokio::test]
    async fn rewriting_same_value_is_silent() {
        let store = MemoryCredentialStore::new();
        store.set(CredentialKey::AccessToken, "same").unwrap();

        let mut changes = store.subscribe();
        store.set(CredentialKey::AccessToken, "same").unwrap();

        assert!(matches!(
            changes.try_recv(),
            Err(broadcast::error::TryRecvError::Empty)
        ));
    }
}
