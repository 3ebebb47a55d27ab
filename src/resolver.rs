use std::fmt;

use crate::{
    extractor::{ExtractError, Extractor, LiveStatus, StreamFormat, VideoCandidate, VideoMetadata},
    lister::ChannelRef,
    util,
};

const PLACEHOLDER_CHANNEL: &str = "Unknown channel";
const PLACEHOLDER_TITLE: &str = "Scheduled live stream";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamStatus {
    Live,
    Upcoming,
}

impl fmt::Display for StreamStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamStatus::Live => write!(f, "LIVE"),
            StreamStatus::Upcoming => write!(f, "UPCOMING"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamEntry {
    pub id: String,
    pub status: StreamStatus,
    pub url: String,
    pub channel: String,
    pub title: String,
}

#[derive(thiserror::Error, Debug)]
pub enum ResolveError {
    #[error("{0}")]
    Extract(#[from] ExtractError),
    #[error("no playable URL for a live broadcast")]
    NoPlayableUrl,
}

/// Outcome for one candidate. Failures never propagate past the candidate.
#[derive(Debug)]
pub enum Resolution {
    Resolved(StreamEntry),
    Empty(LiveStatus),
    Failed(ResolveError),
}

#[derive(Debug, Clone, Default)]
pub struct ResolverOptions {
    /// Skip scheduled broadcasts and only emit running ones.
    pub live_only: bool,
    /// Emit a placeholder upcoming entry when the extractor reports a
    /// scheduled broadcast it cannot resolve yet.
    pub scheduled_error_as_upcoming: bool,
}

pub struct LiveResolver<'a> {
    extractor: &'a dyn Extractor,
    options: ResolverOptions,
}

/// The adaptive format with the greatest height. Missing heights count as
/// zero and ties keep the earliest format.
pub fn select_adaptive(formats: &[StreamFormat]) -> Option<&StreamFormat> {
    formats
        .iter()
        .filter(|f| f.adaptive && !f.url.trim().is_empty())
        .fold(None, |best: Option<&StreamFormat>, f| match best {
            Some(b) if b.height.unwrap_or(0) >= f.height.unwrap_or(0) => Some(b),
            _ => Some(f),
        })
}

impl<'a> LiveResolver<'a> {
    pub fn new(extractor: &'a dyn Extractor, options: ResolverOptions) -> Self {
        Self { extractor, options }
    }

    pub async fn resolve(&self, candidate: &VideoCandidate, channel: &ChannelRef) -> Resolution {
        match self.extractor.fetch_metadata(&candidate.id).await {
            Ok(metadata) => self.classify(metadata, candidate, channel),
            Err(ExtractError::NotYetAvailable(message))
                if self.options.scheduled_error_as_upcoming && !self.options.live_only =>
            {
                debug!("{} is scheduled: {}", candidate.id, message);
                Resolution::Resolved(StreamEntry {
                    id: candidate.id.clone(),
                    status: StreamStatus::Upcoming,
                    url: util::watch_url(&candidate.id),
                    channel: channel
                        .name
                        .clone()
                        .unwrap_or_else(|| PLACEHOLDER_CHANNEL.to_string()),
                    title: candidate
                        .title
                        .clone()
                        .unwrap_or_else(|| PLACEHOLDER_TITLE.to_string()),
                })
            }
            Err(e) => Resolution::Failed(e.into()),
        }
    }

    fn classify(
        &self,
        metadata: VideoMetadata,
        candidate: &VideoCandidate,
        channel: &ChannelRef,
    ) -> Resolution {
        let status = match metadata.status {
            LiveStatus::Live => StreamStatus::Live,
            LiveStatus::Upcoming if !self.options.live_only => StreamStatus::Upcoming,
            other => return Resolution::Empty(other),
        };

        let url = match select_adaptive(&metadata.formats) {
            Some(format) => {
                debug!(
                    "{} using format {} ({}p)",
                    candidate.id,
                    format.format_id.as_deref().unwrap_or("?"),
                    format.height.unwrap_or(0)
                );
                format.url.trim().to_string()
            }
            None => match (status, metadata.best_url.as_deref().map(str::trim)) {
                (_, Some(best)) if !best.is_empty() => best.to_string(),
                (StreamStatus::Upcoming, _) => util::watch_url(&candidate.id),
                (StreamStatus::Live, _) => return Resolution::Failed(ResolveError::NoPlayableUrl),
            },
        };

        if let Some(start) = metadata.scheduled_start {
            debug!("{} scheduled for {}", candidate.id, start);
        }

        Resolution::Resolved(StreamEntry {
            id: candidate.id.clone(),
            status,
            url,
            channel: channel
                .name
                .clone()
                .or(metadata.channel)
                .unwrap_or_else(|| PLACEHOLDER_CHANNEL.to_string()),
            title: metadata
                .title
                .or_else(|| candidate.title.clone())
                .unwrap_or_else(|| candidate.id.clone()),
        })
    }
}
