//! File-backed state store.
//!
//! Each workspace gets its own JSON document under the data directory, so
//! values survive restarts but go away with the workspace's directory.

use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

use async_trait::async_trait;
use tokio::{io::AsyncWriteExt, sync::Mutex};

use crate::domain::{ports::outbound::StateStore, StoreError};

const STATE_FILE: &str = "state.json";

pub struct FileStateStore {
    path: PathBuf,
    // Serializes read-modify-write cycles on the document.
    write_lock: Mutex<()>,
}

impl FileStateStore {
    /// Store for `workspace`, kept under `<root>/workspaces/<slug>/state.json`.
    pub fn for_workspace(root: impl AsRef<Path>, workspace: impl AsRef<Path>) -> Self {
        let path = root
            .as_ref()
            .join("workspaces")
            .join(workspace_slug(workspace.as_ref()))
            .join(STATE_FILE);
        Self::at(path)
    }

    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_document(&self) -> Result<BTreeMap<String, String>, StoreError> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(e) => return Err(e.into()),
        };
        if raw.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        Ok(serde_json::from_str(&raw)?)
    }

    async fn write_document(&self, document: &BTreeMap<String, String>) -> Result<(), StoreError> {
        if document.is_empty() {
            return match tokio::fs::remove_file(&self.path).await {
                Ok(()) => Ok(()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
                Err(e) => Err(e.into()),
            };
        }

        let content = serde_json::to_string_pretty(document)?;
        secure_write(&self.path, content.as_bytes()).await
    }
}

async fn secure_write(path: &Path, content: &[u8]) -> Result<(), StoreError> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    let mut options = tokio::fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    options.mode(0o600);

    let mut file = options.open(path).await?;
    file.write_all(content).await?;
    file.flush().await?;
    Ok(())
}

#[async_trait]
impl StateStore for FileStateStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let mut document = self.read_document().await?;
        Ok(document.remove(key))
    }

    async fn set(&self, key: &str, value: String) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;
        let mut document = self.read_document().await?;
        document.insert(key.to_string(), value);
        self.write_document(&document).await
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;
        let mut document = self.read_document().await?;
        if document.remove(key).is_none() {
            return Ok(());
        }
        self.write_document(&document).await
    }
}

/// Directory-safe name for a workspace path.
pub fn workspace_slug(workspace: &Path) -> String {
    let mut slug = String::new();
    for c in workspace.to_string_lossy().chars() {
        if c.is_ascii_alphanumeric() || c == '_' || c == '.' {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.ends_with('-') {
            slug.push('-');
        }
    }

    let slug = slug.trim_matches(|c| c == '-' || c == '.').to_string();
    if slug.is_empty() {
        "default".to_string()
    } else {
        slug
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slug_flattens_paths() {
        assert_eq!(
            workspace_slug(Path::new("/home/ada/Projects/Time Sheet")),
            "home-ada-projects-time-sheet"
        );
        assert_eq!(workspace_slug(Path::new("/")), "default");
        assert_eq!(workspace_slug(Path::new("C:\\work\\repo")), "c-work-repo");
    }

    #[tokio::test]
    async fn values_survive_a_new_store_instance() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStateStore::for_workspace(dir.path(), "/tmp/project");
        store.set("stint.timer", "{\"a\":1}".to_string()).await.unwrap();
        store.set("other", "x".to_string()).await.unwrap();

        let reopened = FileStateStore::for_workspace(dir.path(), "/tmp/project");
        assert_eq!(
            reopened.get("stint.timer").await.unwrap().as_deref(),
            Some("{\"a\":1}")
        );
        assert!(reopened.path().ends_with("workspaces/tmp-project/state.json"));
    }

    #[tokio::test]
    async fn workspaces_do_not_share_values() {
        let dir = tempfile::tempdir().unwrap();
        let first = FileStateStore::for_workspace(dir.path(), "/a");
        let second = FileStateStore::for_workspace(dir.path(), "/b");

        first.set("k", "1".to_string()).await.unwrap();
        assert_eq!(second.get("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn deleting_last_key_removes_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStateStore::for_workspace(dir.path(), "ws");
        store.set("k", "1".to_string()).await.unwrap();
        assert!(store.path().exists());

        store.delete("k").await.unwrap();
        store.delete("k").await.unwrap();
        assert!(!store.path().exists());
        assert_eq!(store.get("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn corrupt_document_is_an_encoding_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStateStore::at(dir.path().join("state.json"));
        tokio::fs::write(store.path(), "not json").await.unwrap();

        assert!(matches!(
            store.get("k").await,
            Err(StoreError::Encoding(_))
        ));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn file_is_private_to_the_user() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let store = FileStateStore::at(dir.path().join("nested").join("state.json"));
        store.set("k", "1".to_string()).await.unwrap();

        let mode = std::fs::metadata(store.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
