//! The metadata extraction seam.
//!
//! Both the channel lister and the live resolver talk to the video host only
//! through [`Extractor`], so the orchestration can be exercised with fakes.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::util;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoCandidate {
    pub id: String,
    pub title: Option<String>,
}

impl VideoCandidate {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiveStatus {
    Live,
    Upcoming,
    NotLive,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StreamFormat {
    pub format_id: Option<String>,
    pub url: String,
    pub height: Option<u32>,
    /// Manifest based (HLS) rather than a single progressive file.
    pub adaptive: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VideoMetadata {
    pub id: String,
    pub title: Option<String>,
    pub channel: Option<String>,
    pub status: LiveStatus,
    pub formats: Vec<StreamFormat>,
    /// The single best playable URL reported by the source, if any.
    pub best_url: Option<String>,
    pub scheduled_start: Option<DateTime<Utc>>,
}

impl VideoMetadata {
    pub fn new(id: impl Into<String>, status: LiveStatus) -> Self {
        Self {
            id: id.into(),
            title: None,
            channel: None,
            status,
            formats: Vec::new(),
            best_url: None,
            scheduled_start: None,
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum ExtractError {
    #[error("http error: {0}")]
    Http(#[from] util::HttpError),
    #[error("extractor process failed: {0}")]
    Process(String),
    #[error("extractor timed out after {0:?}")]
    Timeout(std::time::Duration),
    #[error("could not parse extractor output: {0}")]
    Parse(String),
    #[error("video unavailable: {0}")]
    Unavailable(String),
    /// A scheduled broadcast that the source refuses to resolve yet.
    #[error("scheduled broadcast not yet available: {0}")]
    NotYetAvailable(String),
}

impl From<serde_json::Error> for ExtractError {
    fn from(e: serde_json::Error) -> Self {
        ExtractError::Parse(e.to_string())
    }
}

#[async_trait]
pub trait Extractor: Send + Sync {
    /// Lists up to `limit` videos reachable from a channel page, a `/live`
    /// redirect or a listing tab.
    async fn list_candidates(
        &self,
        url: &str,
        limit: usize,
    ) -> Result<Vec<VideoCandidate>, ExtractError>;

    async fn fetch_metadata(&self, video_id: &str) -> Result<VideoMetadata, ExtractError>;
}

/// Plain YouTube video ids are 11 characters of the url-safe base64 alphabet.
pub fn is_video_id(id: &str) -> bool {
    id.len() == 11
        && id
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
}
