use crate::{
    lister::ChannelRef,
    playlist::Playlist,
    store::{RemoteStore, StoreError},
};

pub const CREATE_MESSAGE: &str = "Create Live Playlist";
pub const UPDATE_MESSAGE: &str = "Update Live Playlist";

#[derive(thiserror::Error, Debug)]
pub enum PublishError {
    #[error("input {0} does not exist")]
    InputMissing(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishOutcome {
    Created { version: String },
    Updated { version: String },
}

pub struct Publisher<'a> {
    store: &'a dyn RemoteStore,
    input: String,
    output: String,
}

/// Splits the input resource into channel references, skipping blank lines.
pub fn parse_channels(text: &str) -> Vec<ChannelRef> {
    text.lines().filter_map(ChannelRef::parse).collect()
}

impl<'a> Publisher<'a> {
    pub fn new(store: &'a dyn RemoteStore, input: &str, output: &str) -> Self {
        Self {
            store,
            input: input.to_string(),
            output: output.to_string(),
        }
    }

    pub async fn read_channels(&self) -> Result<Vec<ChannelRef>, PublishError> {
        let object = self
            .store
            .get(&self.input)
            .await?
            .ok_or_else(|| PublishError::InputMissing(self.input.clone()))?;

        Ok(parse_channels(&object.content))
    }

    /// Writes the whole document, replacing whatever is stored. A concurrent
    /// modification between the lookup and the write fails the publish.
    pub async fn publish(&self, playlist: &Playlist) -> Result<PublishOutcome, PublishError> {
        match self.store.get(&self.output).await? {
            Some(existing) => {
                let version = self
                    .store
                    .update(&self.output, &playlist.text, &existing.version, UPDATE_MESSAGE)
                    .await?;
                Ok(PublishOutcome::Updated { version })
            }
            None => {
                let version = self
                    .store
                    .create(&self.output, &playlist.text, CREATE_MESSAGE)
                    .await?;
                Ok(PublishOutcome::Created { version })
            }
        }
    }
}
