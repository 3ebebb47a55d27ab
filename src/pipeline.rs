use crate::{
    config::RunConfig,
    extractor::Extractor,
    lister::ChannelLister,
    playlist::{Playlist, PlaylistBuilder},
    publisher::{PublishError, PublishOutcome, Publisher},
    resolver::{LiveResolver, Resolution},
    stats::RunStatistics,
    store::RemoteStore,
};

#[derive(thiserror::Error, Debug)]
pub enum RunError {
    #[error("could not read the channel list: {0}")]
    Input(PublishError),
    #[error("could not publish the playlist: {0}")]
    Publish(PublishError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// No live or upcoming stream was found; the stored playlist is untouched.
    NothingFound,
    DryRun(Playlist),
    Published {
        count: usize,
        outcome: PublishOutcome,
    },
}

#[derive(Debug)]
pub struct RunReport {
    pub statistics: RunStatistics,
    pub outcome: RunOutcome,
}

/// Builds the playlist for every channel in the input resource and
/// publishes it. Failures of single channels or videos are logged and
/// skipped; only reading the input and publishing can fail the run.
pub async fn run(
    config: &RunConfig,
    extractor: &dyn Extractor,
    store: &dyn RemoteStore,
) -> Result<RunReport, RunError> {
    let publisher = Publisher::new(store, &config.input, &config.output);
    let channels = publisher.read_channels().await.map_err(RunError::Input)?;
    info!("Loaded {} channel(s) from {}", channels.len(), config.input);

    let lister = ChannelLister::new(extractor, config.lister.clone());
    let resolver = LiveResolver::new(extractor, config.resolver.clone());
    let mut playlist = PlaylistBuilder::new(config.playlist.clone());
    let mut statistics = RunStatistics::new();

    for channel in &channels {
        info!("Scanning: {}", channel.label());
        statistics.channels_scanned += 1;

        let listing = lister.list(channel).await;
        statistics.probe_failures += listing.failures.len() as u64;
        statistics.candidates_found += listing.candidates.len() as u64;

        for candidate in &listing.candidates {
            if playlist.contains(&candidate.id) {
                statistics.duplicates_skipped += 1;
                continue;
            }

            let resolution = resolver.resolve(candidate, channel).await;

            match &resolution {
                Resolution::Resolved(entry) => {
                    if !playlist.push(entry) {
                        statistics.rejected += 1;
                        continue;
                    }
                    info!("  [+] Added {}: {}", entry.status, entry.title);
                }
                Resolution::Empty(status) => debug!("  {} is {:?}", candidate.id, status),
                Resolution::Failed(e) => warn!("  Could not resolve {}: {}", candidate.id, e),
            }
            statistics.record(&resolution);
        }
    }

    let playlist = playlist.finish();
    statistics.print();

    if playlist.is_empty() {
        info!("No live content found. Verify cookies/channels.");
        return Ok(RunReport {
            statistics,
            outcome: RunOutcome::NothingFound,
        });
    }

    if config.dry_run {
        return Ok(RunReport {
            statistics,
            outcome: RunOutcome::DryRun(playlist),
        });
    }

    let outcome = publisher
        .publish(&playlist)
        .await
        .map_err(RunError::Publish)?;
    info!("Success: {} streams added.", playlist.count);

    Ok(RunReport {
        statistics,
        outcome: RunOutcome::Published {
            count: playlist.count,
            outcome,
        },
    })
}
