use std::fmt;

use crate::{
    extractor::LiveStatus,
    resolver::{Resolution, StreamStatus},
};

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunStatistics {
    pub channels_scanned: u64,
    pub probe_failures: u64,
    pub candidates_found: u64,
    pub duplicates_skipped: u64,
    pub live: u64,
    pub upcoming: u64,
    pub not_live: u64,
    pub skipped: u64,
    pub failed: u64,
    /// Resolved entries the playlist refused, e.g. for an unusable URL.
    pub rejected: u64,
}

impl RunStatistics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Counts a resolution. Resolved entries should only be recorded once
    /// they are in the playlist.
    pub fn record(&mut self, resolution: &Resolution) {
        match resolution {
            Resolution::Resolved(entry) => match entry.status {
                StreamStatus::Live => self.live += 1,
                StreamStatus::Upcoming => self.upcoming += 1,
            },
            Resolution::Empty(LiveStatus::NotLive) => self.not_live += 1,
            Resolution::Empty(_) => self.skipped += 1,
            Resolution::Failed(_) => self.failed += 1,
        }
    }

    pub fn print(&self) {
        info!("{}", self);
    }
}

impl fmt::Display for RunStatistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Scanned {} channel(s) ({} failed probe(s)): {} candidate(s), {} live, {} upcoming, {} not live, {} skipped, {} failed, {} rejected, {} duplicate(s)",
            self.channels_scanned,
            self.probe_failures,
            self.candidates_found,
            self.live,
            self.upcoming,
            self.not_live,
            self.skipped,
            self.failed,
            self.rejected,
            self.duplicates_skipped,
        )
    }
}
