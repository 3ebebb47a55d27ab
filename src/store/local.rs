//! [`RemoteStore`] over a plain directory, for running without a repository.

use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
};

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use tokio::{fs, io::AsyncWriteExt};

use super::{RemoteStore, StoreError, StoredObject};

pub struct LocalStore {
    root: PathBuf,
}

fn version_of(content: &str) -> String {
    format!("{:x}", Sha256::digest(content.as_bytes()))
}

impl LocalStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, path: &str) -> PathBuf {
        self.root.join(path.trim_start_matches('/'))
    }

    async fn read(&self, path: &Path) -> Result<Option<String>, StoreError> {
        match fs::read(path).await {
            Ok(bytes) => String::from_utf8(bytes).map(Some).map_err(|e| StoreError::Decode {
                path: path.display().to_string(),
                reason: e.to_string(),
            }),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn write(&self, path: &Path, content: &str) -> Result<String, StoreError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let temp_path = path.with_extension("tmp");
        let mut file = fs::File::create(&temp_path).await?;
        file.write_all(content.as_bytes()).await?;
        file.flush().await?;
        fs::rename(&temp_path, path).await?;

        Ok(version_of(content))
    }
}

#[async_trait]
impl RemoteStore for LocalStore {
    async fn get(&self, path: &str) -> Result<Option<StoredObject>, StoreError> {
        Ok(self
            .read(&self.resolve(path))
            .await?
            .map(|content| StoredObject {
                path: path.to_string(),
                version: version_of(&content),
                content,
            }))
    }

    async fn create(
        &self,
        path: &str,
        content: &str,
        _message: &str,
    ) -> Result<String, StoreError> {
        let full = self.resolve(path);
        if fs::try_exists(&full).await? {
            return Err(StoreError::Conflict {
                path: path.to_string(),
                version: String::new(),
            });
        }
        self.write(&full, content).await
    }

    async fn update(
        &self,
        path: &str,
        content: &str,
        version: &str,
        _message: &str,
    ) -> Result<String, StoreError> {
        let full = self.resolve(path);
        let current = self.read(&full).await?.map(|c| version_of(&c));
        if current.as_deref() != Some(version) {
            return Err(StoreError::Conflict {
                path: path.to_string(),
                version: version.to_string(),
            });
        }
        self.write(&full, content).await
    }
}
