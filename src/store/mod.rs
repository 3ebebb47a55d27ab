//! Versioned object storage the channel list is read from and the playlist
//! is written to.

use async_trait::async_trait;

pub mod github;
pub mod local;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub path: String,
    pub content: String,
    /// Opaque token naming this revision, required to update it.
    pub version: String,
}

#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    #[error("http error: {0}")]
    Http(#[from] crate::util::HttpError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("could not decode {path}: {reason}")]
    Decode { path: String, reason: String },
    #[error("{path} was modified concurrently, version {version} is stale")]
    Conflict { path: String, version: String },
    #[error("not authorized to access {0}")]
    Unauthorized(String),
    #[error("store answered {status} for {path}: {message}")]
    Status {
        status: u16,
        path: String,
        message: String,
    },
}

#[async_trait]
pub trait RemoteStore: Send + Sync {
    async fn get(&self, path: &str) -> Result<Option<StoredObject>, StoreError>;

    /// Creates a new object and returns its version. Fails with
    /// [`StoreError::Conflict`] when the object appeared in the meantime.
    async fn create(&self, path: &str, content: &str, message: &str)
        -> Result<String, StoreError>;

    /// Replaces the object only if it is still at `version`.
    async fn update(
        &self,
        path: &str,
        content: &str,
        version: &str,
        message: &str,
    ) -> Result<String, StoreError>;
}
