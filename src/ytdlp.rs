//! [`Extractor`] backed by the `yt-dlp` program.

use std::{path::PathBuf, process::Stdio, time::Duration};

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use serde::Deserialize;
use tokio::process::Command;
use tokio_retry::{strategy::ExponentialBackoff, RetryIf};

use crate::{
    extractor::{
        is_video_id, ExtractError, Extractor, LiveStatus, StreamFormat, VideoCandidate,
        VideoMetadata,
    },
    util,
};

/// Messages yt-dlp prints for scheduled broadcasts it will not resolve yet.
const NOT_YET_AVAILABLE_MARKERS: &[&str] = &[
    "This live event will begin",
    "Premieres in",
    "will begin in a few moments",
];

/// Failures that repeat on every attempt, so they are never retried.
const UNAVAILABLE_MARKERS: &[&str] = &[
    "Video unavailable",
    "Private video",
    "This video has been removed",
    "members-only",
    "Requested format is not available",
    "Sign in to confirm",
];

#[derive(Debug, Clone)]
pub struct YtDlpOptions {
    pub program: PathBuf,
    pub cookies: Option<PathBuf>,
    /// Values for `--extractor-args youtube:player_client=...`.
    pub player_clients: Vec<String>,
    pub format: String,
    pub timeout: Duration,
    pub max_retries: usize,
}

impl Default for YtDlpOptions {
    fn default() -> Self {
        Self {
            program: PathBuf::from("yt-dlp"),
            cookies: None,
            player_clients: vec!["ios".to_string(), "mweb".to_string()],
            format: "best".to_string(),
            timeout: Duration::from_secs(30),
            max_retries: 2,
        }
    }
}

pub struct YtDlpExtractor {
    options: YtDlpOptions,
}

#[derive(Debug, Deserialize)]
struct FlatInfo {
    id: Option<String>,
    title: Option<String>,
    // Unavailable entries show up as null
    #[serde(default)]
    entries: Option<Vec<Option<FlatInfo>>>,
}

#[derive(Debug, Deserialize)]
struct VideoInfo {
    id: String,
    title: Option<String>,
    uploader: Option<String>,
    channel: Option<String>,
    live_status: Option<String>,
    is_live: Option<bool>,
    release_timestamp: Option<i64>,
    url: Option<String>,
    #[serde(default)]
    formats: Vec<FormatInfo>,
}

#[derive(Debug, Deserialize)]
struct FormatInfo {
    format_id: Option<String>,
    url: Option<String>,
    protocol: Option<String>,
    height: Option<u32>,
}

impl YtDlpExtractor {
    pub fn new(options: YtDlpOptions) -> Self {
        Self { options }
    }

    fn command(&self) -> Command {
        let mut child = Command::new(&self.options.program);

        child
            .arg("--quiet")
            .arg("--no-warnings")
            .arg("--no-progress")
            .stdin(Stdio::null())
            .kill_on_drop(true);

        if let Some(cookies) = &self.options.cookies {
            child.arg("--cookies").arg(cookies);
        }
        if !self.options.player_clients.is_empty() {
            child.arg("--extractor-args").arg(format!(
                "youtube:player_client={}",
                self.options.player_clients.join(",")
            ));
        }

        child
    }

    fn list_command(&self, url: &str, limit: usize) -> Command {
        let mut child = self.command();
        child
            .arg("--flat-playlist")
            .arg("--dump-single-json")
            .arg("--playlist-end")
            .arg(limit.to_string())
            .arg(url);
        child
    }

    fn metadata_command(&self, video_id: &str) -> Command {
        let mut child = self.command();
        child
            .arg("--dump-single-json")
            .arg("--skip-download")
            .arg("--no-playlist")
            .arg("--ignore-no-formats-error")
            .arg("-f")
            .arg(&self.options.format)
            .arg(util::watch_url(video_id));
        child
    }

    async fn run(&self, mut child: Command) -> Result<String, ExtractError> {
        let output = tokio::time::timeout(self.options.timeout, child.output())
            .await
            .map_err(|_| ExtractError::Timeout(self.options.timeout))?
            .map_err(|e| {
                ExtractError::Process(format!(
                    "could not run {}: {}",
                    self.options.program.display(),
                    e
                ))
            })?;

        if !output.status.success() {
            return Err(classify_failure(&String::from_utf8_lossy(&output.stderr)));
        }

        String::from_utf8(output.stdout).map_err(|e| ExtractError::Parse(e.to_string()))
    }

    async fn fetch_metadata_once(&self, video_id: &str) -> Result<VideoMetadata, ExtractError> {
        let stdout = self.run(self.metadata_command(video_id)).await?;
        let info: VideoInfo = serde_json::from_str(&stdout)?;
        Ok(metadata_from_info(info))
    }
}

/// Maps a failed run to an error kind from the last `ERROR:` line. yt-dlp
/// only reports "scheduled, too early" through its message text.
fn classify_failure(stderr: &str) -> ExtractError {
    let message = stderr
        .lines()
        .rev()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .unwrap_or("exited without output")
        .to_string();

    if NOT_YET_AVAILABLE_MARKERS.iter().any(|m| stderr.contains(m)) {
        ExtractError::NotYetAvailable(message)
    } else if UNAVAILABLE_MARKERS.iter().any(|m| stderr.contains(m)) {
        ExtractError::Unavailable(message)
    } else {
        ExtractError::Process(message)
    }
}

fn collect_candidates(info: FlatInfo, limit: usize, out: &mut Vec<VideoCandidate>) {
    match info.entries {
        Some(entries) => {
            for entry in entries.into_iter().flatten() {
                if out.len() >= limit {
                    return;
                }
                collect_candidates(entry, limit, out);
            }
        }
        None => {
            let Some(id) = info.id.filter(|id| is_video_id(id)) else {
                return;
            };
            if out.len() < limit && !out.iter().any(|c| c.id == id) {
                out.push(VideoCandidate {
                    id,
                    title: info.title,
                });
            }
        }
    }
}

fn parse_listing(stdout: &str, limit: usize) -> Result<Vec<VideoCandidate>, ExtractError> {
    let stdout = stdout.trim();
    if stdout.is_empty() || stdout == "null" {
        return Ok(Vec::new());
    }

    let info: FlatInfo = serde_json::from_str(stdout)?;
    let mut candidates = Vec::new();
    collect_candidates(info, limit, &mut candidates);
    Ok(candidates)
}

fn live_status(info: &VideoInfo) -> LiveStatus {
    match info.live_status.as_deref() {
        Some("is_live") | Some("live") => LiveStatus::Live,
        Some("is_upcoming") => LiveStatus::Upcoming,
        None if info.is_live == Some(true) => LiveStatus::Live,
        _ => LiveStatus::NotLive,
    }
}

fn metadata_from_info(info: VideoInfo) -> VideoMetadata {
    let status = live_status(&info);
    let formats = info
        .formats
        .into_iter()
        .filter_map(|f| {
            let url = f.url.filter(|u| !u.is_empty())?;
            Some(StreamFormat {
                format_id: f.format_id,
                url,
                height: f.height,
                adaptive: f
                    .protocol
                    .as_deref()
                    .map(|p| p.contains("m3u8"))
                    .unwrap_or(false),
            })
        })
        .collect();

    VideoMetadata {
        id: info.id,
        title: info.title,
        channel: info.uploader.or(info.channel),
        status,
        formats,
        best_url: info.url.filter(|u| !u.is_empty()),
        scheduled_start: info
            .release_timestamp
            .and_then(|ts| Utc.timestamp_opt(ts, 0).single()),
    }
}

#[async_trait]
impl Extractor for YtDlpExtractor {
    async fn list_candidates(
        &self,
        url: &str,
        limit: usize,
    ) -> Result<Vec<VideoCandidate>, ExtractError> {
        let stdout = self.run(self.list_command(url, limit)).await?;
        parse_listing(&stdout, limit)
    }

    async fn fetch_metadata(&self, video_id: &str) -> Result<VideoMetadata, ExtractError> {
        let strategy = ExponentialBackoff::from_millis(2)
            .factor(250)
            .max_delay(Duration::from_secs(5))
            .take(self.options.max_retries);

        RetryIf::start(
            strategy,
            || self.fetch_metadata_once(video_id),
            |e: &ExtractError| {
                matches!(e, ExtractError::Process(_) | ExtractError::Timeout(_))
            },
        )
        .await
    }
}
