//! In-memory collaborators for unit tests.

use std::{collections::HashMap, sync::Mutex};

use async_trait::async_trait;

use crate::{
    extractor::{ExtractError, Extractor, StreamFormat, VideoCandidate, VideoMetadata},
    store::{RemoteStore, StoreError, StoredObject},
};

pub fn hls(url: &str, height: Option<u32>) -> StreamFormat {
    StreamFormat {
        format_id: None,
        url: url.to_string(),
        height,
        adaptive: true,
    }
}

enum FakeVideo {
    Metadata(VideoMetadata),
    NotYetAvailable,
}

#[derive(Default)]
pub struct FakeExtractor {
    listings: HashMap<String, Option<Vec<String>>>,
    videos: HashMap<String, FakeVideo>,
    listed: Mutex<Vec<String>>,
    fetched: Mutex<Vec<String>>,
}

impl FakeExtractor {
    pub fn with_listing(mut self, target: &str, ids: &[&str]) -> Self {
        self.listings.insert(
            target.to_string(),
            Some(ids.iter().map(|id| id.to_string()).collect()),
        );
        self
    }

    pub fn with_listing_failure(mut self, target: &str) -> Self {
        self.listings.insert(target.to_string(), None);
        self
    }

    pub fn with_metadata(mut self, metadata: VideoMetadata) -> Self {
        self.videos
            .insert(metadata.id.clone(), FakeVideo::Metadata(metadata));
        self
    }

    pub fn with_not_yet_available(mut self, id: &str) -> Self {
        self.videos.insert(id.to_string(), FakeVideo::NotYetAvailable);
        self
    }

    pub fn listed_targets(&self) -> Vec<String> {
        self.listed.lock().unwrap().clone()
    }

    pub fn fetched_ids(&self) -> Vec<String> {
        self.fetched.lock().unwrap().clone()
    }
}

#[async_trait]
impl Extractor for FakeExtractor {
    async fn list_candidates(
        &self,
        url: &str,
        limit: usize,
    ) -> Result<Vec<VideoCandidate>, ExtractError> {
        self.listed.lock().unwrap().push(url.to_string());
        match self.listings.get(url) {
            Some(Some(ids)) => Ok(ids
                .iter()
                .take(limit)
                .map(|id| VideoCandidate::new(id.as_str()))
                .collect()),
            Some(None) => Err(ExtractError::Process(format!("probe of {} failed", url))),
            None => Ok(Vec::new()),
        }
    }

    async fn fetch_metadata(&self, video_id: &str) -> Result<VideoMetadata, ExtractError> {
        self.fetched.lock().unwrap().push(video_id.to_string());
        match self.videos.get(video_id) {
            Some(FakeVideo::Metadata(metadata)) => Ok(metadata.clone()),
            Some(FakeVideo::NotYetAvailable) => Err(ExtractError::NotYetAvailable(
                "This live event will begin in 3 hours.".to_string(),
            )),
            None => Err(ExtractError::Unavailable("unknown video".to_string())),
        }
    }
}

#[derive(Default)]
struct FakeStoreState {
    objects: HashMap<String, StoredObject>,
    next_version: u64,
    messages: Vec<String>,
    /// Path and content another writer stores right after the next lookup.
    concurrent_write: Option<(String, String)>,
}

impl FakeStoreState {
    fn put(&mut self, path: &str, content: &str) -> String {
        self.next_version += 1;
        let version = format!("v{}", self.next_version);
        self.objects.insert(
            path.to_string(),
            StoredObject {
                path: path.to_string(),
                content: content.to_string(),
                version: version.clone(),
            },
        );
        version
    }
}

#[derive(Default)]
pub struct FakeStore {
    state: Mutex<FakeStoreState>,
}

impl FakeStore {
    pub fn with_object(self, path: &str, content: &str) -> Self {
        self.state.lock().unwrap().put(path, content);
        self
    }

    pub fn with_concurrent_writer(self, path: &str, content: &str) -> Self {
        self.state.lock().unwrap().concurrent_write = Some((path.to_string(), content.to_string()));
        self
    }

    pub fn content(&self, path: &str) -> Option<String> {
        self.state
            .lock()
            .unwrap()
            .objects
            .get(path)
            .map(|o| o.content.clone())
    }

    pub fn messages(&self) -> Vec<String> {
        self.state.lock().unwrap().messages.clone()
    }
}

#[async_trait]
impl RemoteStore for FakeStore {
    async fn get(&self, path: &str) -> Result<Option<StoredObject>, StoreError> {
        let mut state = self.state.lock().unwrap();
        let object = state.objects.get(path).cloned();

        if state.concurrent_write.as_ref().map(|(p, _)| p == path) == Some(true) {
            if let Some((p, content)) = state.concurrent_write.take() {
                state.put(&p, &content);
            }
        }

        Ok(object)
    }

    async fn create(
        &self,
        path: &str,
        content: &str,
        message: &str,
    ) -> Result<String, StoreError> {
        let mut state = self.state.lock().unwrap();
        if state.objects.contains_key(path) {
            return Err(StoreError::Conflict {
                path: path.to_string(),
                version: String::new(),
            });
        }
        state.messages.push(message.to_string());
        Ok(state.put(path, content))
    }

    async fn update(
        &self,
        path: &str,
        content: &str,
        version: &str,
        message: &str,
    ) -> Result<String, StoreError> {
        let mut state = self.state.lock().unwrap();
        if state.objects.get(path).map(|o| o.version.as_str()) != Some(version) {
            return Err(StoreError::Conflict {
                path: path.to_string(),
                version: version.to_string(),
            });
        }
        state.messages.push(message.to_string());
        Ok(state.put(path, content))
    }
}
