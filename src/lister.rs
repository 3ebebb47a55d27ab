use crate::{
    extractor::{Extractor, VideoCandidate},
    util,
};

/// A channel line from the input resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelRef {
    pub name: Option<String>,
    pub url: String,
}

impl ChannelRef {
    /// Parses `name,url` or a bare URL. Returns `None` for blank lines.
    pub fn parse(line: &str) -> Option<Self> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }

        match line.split_once(',') {
            Some((name, url)) if !name.contains("://") && !url.trim().is_empty() => {
                let name = name.trim();
                Some(Self {
                    name: (!name.is_empty()).then(|| name.to_string()),
                    url: url.trim().to_string(),
                })
            }
            _ => Some(Self {
                name: None,
                url: line.to_string(),
            }),
        }
    }

    pub fn label(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.url)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ProbePath {
    Home,
    Live,
    Streams,
}

impl ProbePath {
    pub fn target(&self, base: &str) -> String {
        match self {
            ProbePath::Home => base.to_string(),
            ProbePath::Live => format!("{}/live", base),
            ProbePath::Streams => format!("{}/streams", base),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ListerOptions {
    pub probe_paths: Vec<ProbePath>,
    pub limit: usize,
}

impl Default for ListerOptions {
    fn default() -> Self {
        Self {
            probe_paths: vec![ProbePath::Home, ProbePath::Live, ProbePath::Streams],
            limit: 5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeFailure {
    pub target: String,
    pub reason: String,
}

#[derive(Debug, Default)]
pub struct ChannelListing {
    pub candidates: Vec<VideoCandidate>,
    pub failures: Vec<ProbeFailure>,
}

pub struct ChannelLister<'a> {
    extractor: &'a dyn Extractor,
    options: ListerOptions,
}

impl<'a> ChannelLister<'a> {
    pub fn new(extractor: &'a dyn Extractor, options: ListerOptions) -> Self {
        Self { extractor, options }
    }

    pub fn targets(&self, channel: &ChannelRef) -> Vec<String> {
        let base = util::normalize_channel_url(&channel.url);
        if util::is_video_url(&base) {
            return vec![base];
        }

        let mut targets: Vec<String> = Vec::new();
        for probe in &self.options.probe_paths {
            let target = probe.target(&base);
            if !targets.contains(&target) {
                targets.push(target);
            }
        }
        targets
    }

    /// Probes every target of the channel. A failing target only costs its
    /// own results.
    pub async fn list(&self, channel: &ChannelRef) -> ChannelListing {
        let mut listing = ChannelListing::default();
        if channel.url.trim().is_empty() {
            return listing;
        }

        for target in self.targets(channel) {
            match self
                .extractor
                .list_candidates(&target, self.options.limit)
                .await
            {
                Ok(found) => {
                    debug!("{} yielded {} candidate(s)", target, found.len());
                    for candidate in found.into_iter().take(self.options.limit) {
                        if !listing.candidates.iter().any(|c| c.id == candidate.id) {
                            listing.candidates.push(candidate);
                        }
                    }
                }
                Err(e) => {
                    warn!("Could not probe {}: {}", target, e);
                    listing.failures.push(ProbeFailure {
                        target,
                        reason: e.to_string(),
                    });
                }
            }
        }

        listing
    }
}
