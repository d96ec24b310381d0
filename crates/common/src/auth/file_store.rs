//! JSON file credential store
//!
//! Durable storage for hosts without a platform keychain. The pair is kept in
//! a single JSON document; writes go to a sibling temp file that is then
//! renamed over the original so a crash never leaves half a pair on disk.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use carelink_domain::CredentialPair;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::debug;

use super::traits::CredentialStore;
use super::types::StorageError;

/// Credential store persisted as a JSON file
#[derive(Debug)]
pub struct FileCredentialStore {
    path: PathBuf,
    // Serializes writers so two saves never race on the temp file.
    write_lock: Mutex<()>,
}

impl FileCredentialStore {
    /// Store the pair at `path`; nothing is touched until the first save.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), write_lock: Mutex::new(()) }
    }

    /// Location of the credentials document.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self.path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    fn decode(contents: &str) -> Result<CredentialPair, StorageError> {
        let pair: CredentialPair = serde_json::from_str(contents)
            .map_err(|e| StorageError::Corrupt(format!("invalid credentials document: {e}")))?;

        if pair.access_token.is_empty() || pair.refresh_token.is_empty() {
            return Err(StorageError::Corrupt("credentials document holds an empty token".into()));
        }

        Ok(pair)
    }
}

#[async_trait]
impl CredentialStore for FileCredentialStore {
    async fn load(&self) -> Result<Option<CredentialPair>, StorageError> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => Self::decode(&contents).map(Some),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    async fn save(&self, pair: &CredentialPair) -> Result<(), StorageError> {
        let _guard = self.write_lock.lock().await;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let body = serde_json::to_vec_pretty(pair)
            .map_err(|e| StorageError::Io(format!("failed to encode credentials: {e}")))?;

        let temp = self.temp_path();
        // A leftover from an interrupted save keeps whatever mode it had.
        match tokio::fs::remove_file(&temp).await {
            Ok(()) => {}
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
            Err(err) => return Err(err.into()),
        }

        let mut options = tokio::fs::OpenOptions::new();
        options.write(true).create_new(true);
        #[cfg(unix)]
        options.mode(0o600);

        let mut file = options.open(&temp).await?;
        file.write_all(&body).await?;
        file.sync_all().await?;
        drop(file);

        tokio::fs::rename(&temp, &self.path).await?;

        debug!(path = %self.path.display(), "credentials written");
        Ok(())
    }

    async fn clear(&self) -> Result<(), StorageError> {
        let _guard = self.write_lock.lock().await;

        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => {
                debug!(path = %self.path.display(), "credentials removed");
                Ok(())
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    fn store_in(dir: &TempDir) -> FileCredentialStore {
        FileCredentialStore::new(dir.path().join("session").join("credentials.json"))
    }

    #[tokio::test]
    async fn missing_file_is_absent() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        assert_eq!(store.load().await.unwrap(), None);
    }

    #[tokio::test]
    async fn save_creates_parent_and_persists() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        store.save(&CredentialPair::new("A1", "R1")).await.unwrap();

        let reopened = store_in(&dir);
        assert_eq!(reopened.load().await.unwrap(), Some(CredentialPair::new("A1", "R1")));
        assert!(!store.temp_path().exists());
    }

    #[tokio::test]
    async fn save_replaces_previous_pair() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        store.save(&CredentialPair::new("A1", "R1")).await.unwrap();
        store.save(&CredentialPair::new("A2", "R1")).await.unwrap();

        assert_eq!(store.load().await.unwrap(), Some(CredentialPair::new("A2", "R1")));
    }

    #[tokio::test]
    async fn clear_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        store.save(&CredentialPair::new("A1", "R1")).await.unwrap();
        store.clear().await.unwrap();
        store.clear().await.unwrap();

        assert_eq!(store.load().await.unwrap(), None);
    }

    #[tokio::test]
    async fn corrupt_document_is_reported() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        std::fs::create_dir_all(store.path().parent().unwrap()).unwrap();

        std::fs::write(store.path(), "{not json").unwrap();
        assert!(matches!(store.load().await, Err(StorageError::Corrupt(_))));

        std::fs::write(store.path(), r#"{"access_token":"A1","refresh_token":""}"#).unwrap();
        assert!(matches!(store.load().await, Err(StorageError::Corrupt(_))));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn file_is_private_to_owner() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        store.save(&CredentialPair::new("A1", "R1")).await.unwrap();

        let mode = std::fs::metadata(store.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn leftover_temp_file_does_not_widen_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        std::fs::create_dir_all(store.path().parent().unwrap()).unwrap();
        std::fs::write(store.temp_path(), "stale").unwrap();
        std::fs::set_permissions(store.temp_path(), std::fs::Permissions::from_mode(0o644))
            .unwrap();

        store.save(&CredentialPair::new("A1", "R1")).await.unwrap();

        let mode = std::fs::metadata(store.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
        assert_eq!(store.load().await.unwrap(), Some(CredentialPair::new("A1", "R1")));
        assert!(!store.temp_path().exists());
    }
}
