use std::sync::LazyLock;

use chrono::{DateTime, TimeZone, Utc};
use regex::Regex;
use serde::Deserialize;
use serde_aux::prelude::*;

use crate::extractor::LiveStatus;

// Only the fields needed to classify a broadcast are modelled, and most of
// them are optional because the page omits them depending on the video state.

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitialPlayerResponse {
    pub playability_status: PlayabilityStatus,
    pub streaming_data: Option<StreamingData>,
    pub video_details: Option<VideoDetails>,
    pub microformat: Option<Microformat>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayabilityStatus {
    pub status: Status,
    pub reason: Option<String>,
    pub live_streamability: Option<LiveStreamability>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
    Ok,
    LiveStreamOffline,
    Unplayable,
    LoginRequired,
    Error,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveStreamability {
    pub live_streamability_renderer: LiveStreamabilityRenderer,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveStreamabilityRenderer {
    pub offline_slate: Option<OfflineSlate>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OfflineSlate {
    pub live_stream_offline_slate_renderer: LiveStreamOfflineSlateRenderer,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveStreamOfflineSlateRenderer {
    #[serde(default, deserialize_with = "deserialize_option_number_from_string")]
    pub scheduled_start_time: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamingData {
    pub hls_manifest_url: Option<String>,
    pub dash_manifest_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoDetails {
    pub video_id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub is_live: bool,
    #[serde(default)]
    pub is_upcoming: bool,
    #[serde(default)]
    pub author: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Microformat {
    pub player_microformat_renderer: PlayerMicroformatRenderer,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerMicroformatRenderer {
    pub owner_channel_name: Option<String>,
    pub live_broadcast_details: Option<LiveBroadcastDetails>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveBroadcastDetails {
    #[serde(default)]
    pub is_live_now: bool,
}

#[derive(thiserror::Error, Debug)]
pub enum PlayerResponseError {
    #[error("Could not find initial player response")]
    NoInitialPlayerResponse,
    #[error("Could not parse initial player response")]
    ParseInitialPlayerResponse(#[from] serde_json::Error),
}

const IPR_STR: &str = "var ytInitialPlayerResponse =";
const INITIAL_DATA_STR: &str = "var ytInitialData =";

static VIDEO_ID_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""videoId"\s*:\s*"([A-Za-z0-9_-]{11})""#).unwrap());

/// Finds the JSON object assigned to a script variable, e.g.
/// `var ytInitialPlayerResponse = {...};`.
fn get_json_var<'a>(html: &'a str, marker: &str) -> Option<&'a str> {
    // Find the start of the assignment
    let idx_var = html.find(marker)? + marker.len();

    // Find the start and end of the JSON object
    let idx_start = html[idx_var..].find('{')? + idx_var;
    let idx_end = html[idx_start..].find("};")? + idx_start + 1;

    // Bounds check
    if idx_start >= idx_end || idx_start >= html.len() || idx_end >= html.len() {
        return None;
    }

    Some(&html[idx_start..idx_end])
}

/// Video ids referenced by a channel or listing page, in page order and
/// without repeats. Only the `ytInitialData` blob is searched when present.
pub fn video_ids_from_html(html: &str, limit: usize) -> Vec<String> {
    let haystack = get_json_var(html, INITIAL_DATA_STR).unwrap_or(html);

    let mut ids: Vec<String> = Vec::new();
    for caps in VIDEO_ID_REGEX.captures_iter(haystack) {
        if ids.len() >= limit {
            break;
        }
        let id = &caps[1];
        if !ids.iter().any(|seen| seen == id) {
            ids.push(id.to_string());
        }
    }
    ids
}

impl InitialPlayerResponse {
    pub fn from_html(html: &str) -> Result<Self, PlayerResponseError> {
        // Find the initial player response
        let ipr_str =
            get_json_var(html, IPR_STR).ok_or(PlayerResponseError::NoInitialPlayerResponse)?;

        // Parse the JSON
        serde_json::from_str(ipr_str).map_err(PlayerResponseError::ParseInitialPlayerResponse)
    }

    pub fn video_id(&self) -> Option<&str> {
        self.video_details
            .as_ref()
            .map(|v| v.video_id.as_str())
            .filter(|id| !id.is_empty())
    }

    pub fn title(&self) -> Option<&str> {
        self.video_details
            .as_ref()
            .map(|v| v.title.as_str())
            .filter(|t| !t.is_empty())
    }

    pub fn author(&self) -> Option<&str> {
        self.video_details
            .as_ref()
            .map(|v| v.author.as_str())
            .filter(|a| !a.is_empty())
            .or_else(|| {
                self.microformat
                    .as_ref()?
                    .player_microformat_renderer
                    .owner_channel_name
                    .as_deref()
            })
    }

    fn live_broadcast_details(&self) -> Option<&LiveBroadcastDetails> {
        self.microformat
            .as_ref()?
            .player_microformat_renderer
            .live_broadcast_details
            .as_ref()
    }

    fn offline_slate(&self) -> Option<&LiveStreamOfflineSlateRenderer> {
        self.playability_status
            .live_streamability
            .as_ref()?
            .live_streamability_renderer
            .offline_slate
            .as_ref()
            .map(|slate| &slate.live_stream_offline_slate_renderer)
    }

    pub fn is_live(&self) -> bool {
        self.playability_status.status == Status::Ok
            && (self.video_details.as_ref().map(|v| v.is_live).unwrap_or(false)
                || self
                    .live_broadcast_details()
                    .map(|lbd| lbd.is_live_now)
                    .unwrap_or(false))
    }

    pub fn is_upcoming(&self) -> bool {
        if self.is_live() {
            return false;
        }

        self.video_details
            .as_ref()
            .map(|v| v.is_upcoming)
            .unwrap_or(false)
            || (self.playability_status.status == Status::LiveStreamOffline
                && self.offline_slate().is_some())
    }

    pub fn live_status(&self) -> LiveStatus {
        if self.is_live() {
            LiveStatus::Live
        } else if self.is_upcoming() {
            LiveStatus::Upcoming
        } else {
            LiveStatus::NotLive
        }
    }

    pub fn scheduled_start(&self) -> Option<DateTime<Utc>> {
        let secs = self.offline_slate()?.scheduled_start_time?;
        Utc.timestamp_opt(secs, 0).single()
    }

    /// Why the page refuses playback, for videos that are neither live nor
    /// upcoming. Offline or ended broadcasts are not treated as failures.
    pub fn unavailable_reason(&self) -> Option<String> {
        match self.playability_status.status {
            Status::Ok | Status::LiveStreamOffline => None,
            _ if self.live_status() != LiveStatus::NotLive => None,
            ref status => Some(
                self.playability_status
                    .reason
                    .clone()
                    .unwrap_or_else(|| format!("{:?}", status)),
            ),
        }
    }

    pub fn hls_manifest_url(&self) -> Option<&str> {
        self.streaming_data.as_ref()?.hls_manifest_url.as_deref()
    }

    pub fn dash_manifest_url(&self) -> Option<&str> {
        self.streaming_data.as_ref()?.dash_manifest_url.as_deref()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn watch_page(ipr: &str) -> String {
        format!(
            r#"<html><script>var ytInitialPlayerResponse = {};var meta = 1;</script></html>"#,
            ipr
        )
    }

    pub(crate) const LIVE_IPR: &str = r#"{
        "playabilityStatus": {
            "status": "OK",
            "liveStreamability": {"liveStreamabilityRenderer": {"videoId": "liveVideo01", "pollDelayMs": "5000"}}
        },
        "streamingData": {
            "expiresInSeconds": "21540",
            "adaptiveFormats": [
                {"itag": 137, "url": "https://rr.example/137", "mimeType": "video/mp4", "bitrate": 4000000, "height": 1080},
                {"signatureCipher": "s=abc&sp=sig", "bitrate": 2500000}
            ],
            "hlsManifestUrl": "https://manifest.example/hls_variant/master.m3u8"
        },
        "videoDetails": {
            "videoId": "liveVideo01",
            "title": "Morning news",
            "isLive": true,
            "channelId": "UC123",
            "author": "Channel A",
            "isLiveContent": true
        },
        "microformat": {"playerMicroformatRenderer": {
            "ownerChannelName": "Channel A",
            "liveBroadcastDetails": {"isLiveNow": true, "startTimestamp": "2024-02-15T08:00:00+00:00"}
        }}
    }"#;

    pub(crate) const SCHEDULED_IPR: &str = r#"{
        "playabilityStatus": {
            "status": "LIVE_STREAM_OFFLINE",
            "reason": "Live stream offline",
            "liveStreamability": {"liveStreamabilityRenderer": {
                "videoId": "upcoming001",
                "offlineSlate": {"liveStreamOfflineSlateRenderer": {"scheduledStartTime": "1707984900"}}
            }}
        },
        "videoDetails": {
            "videoId": "upcoming001",
            "title": "Premiere",
            "isUpcoming": true,
            "author": "Channel B",
            "isLiveContent": true
        }
    }"#;

    const VOD_IPR: &str = r#"{
        "playabilityStatus": {"status": "OK"},
        "streamingData": {"adaptiveFormats": []},
        "videoDetails": {"videoId": "ordinary001", "title": "Just a video", "author": "Channel C"},
        "microformat": {"playerMicroformatRenderer": {}}
    }"#;

    #[test]
    fn ipr_str() {
        let test_str = r#"<script>var ytInitialPlayerResponse = {"response": "test"};</script>"#;
        let result = get_json_var(test_str, IPR_STR).expect("Could not find IPR");
        assert_eq!(result, r#"{"response": "test"}"#);

        let test_str = r#"<script>var ytInitialPlayerResponse = {"#;
        assert!(get_json_var(test_str, IPR_STR).is_none());

        let test_str = r#"<script>var ytInitialPlayerResponse = "#;
        assert!(get_json_var(test_str, IPR_STR).is_none());

        let test_str = r#"<script>var ytInitialPlayerResponse ="#;
        assert!(get_json_var(test_str, IPR_STR).is_none());
    }

    #[test]
    fn ipr_live() {
        let ipr = InitialPlayerResponse::from_html(&watch_page(LIVE_IPR)).expect("Could not parse IPR");

        assert_eq!(ipr.live_status(), LiveStatus::Live);
        assert_eq!(ipr.video_id(), Some("liveVideo01"));
        assert_eq!(ipr.title(), Some("Morning news"));
        assert_eq!(ipr.author(), Some("Channel A"));
        assert_eq!(
            ipr.hls_manifest_url(),
            Some("https://manifest.example/hls_variant/master.m3u8")
        );
        assert!(ipr.unavailable_reason().is_none());
    }

    #[test]
    fn ipr_scheduled() {
        let ipr =
            InitialPlayerResponse::from_html(&watch_page(SCHEDULED_IPR)).expect("Could not parse IPR");

        assert_eq!(ipr.live_status(), LiveStatus::Upcoming);
        assert_eq!(
            ipr.scheduled_start(),
            Some(Utc.with_ymd_and_hms(2024, 2, 15, 8, 15, 0).unwrap()),
            "Video schedule does not match"
        );
        assert!(ipr.unavailable_reason().is_none());
    }

    #[test]
    fn ipr_live_with_incomplete_formats() {
        // Format entries are not modelled, so odd ones never break parsing
        let ipr = InitialPlayerResponse::from_html(&watch_page(
            r#"{
                "playabilityStatus": {"status": "OK"},
                "streamingData": {
                    "adaptiveFormats": [{"bitrate": 1}, {"itag": "x", "mimeType": null}],
                    "hlsManifestUrl": "https://manifest.example/master.m3u8"
                },
                "videoDetails": {"videoId": "liveVideo02", "isLive": true}
            }"#,
        ))
        .expect("Could not parse IPR");

        assert_eq!(ipr.live_status(), LiveStatus::Live);
        assert_eq!(
            ipr.hls_manifest_url(),
            Some("https://manifest.example/master.m3u8")
        );
    }

    #[test]
    fn ipr_ordinary_video() {
        let ipr = InitialPlayerResponse::from_html(&watch_page(VOD_IPR)).expect("Could not parse IPR");

        assert_eq!(ipr.live_status(), LiveStatus::NotLive);
        assert!(ipr.hls_manifest_url().is_none());
    }

    #[test]
    fn ipr_unknown_status_is_unavailable() {
        let ipr = InitialPlayerResponse::from_html(&watch_page(
            r#"{"playabilityStatus": {"status": "AGE_CHECK_REQUIRED", "reason": "Sign in to confirm your age"}}"#,
        ))
        .expect("Could not parse IPR");

        assert_eq!(ipr.playability_status.status, Status::Other);
        assert_eq!(
            ipr.unavailable_reason().as_deref(),
            Some("Sign in to confirm your age")
        );
    }

    #[test]
    fn initial_data_video_ids() {
        let html = r#"<script>var ytInitialData = {"contents": [
            {"videoId": "aaaaaaaaaaa"}, {"videoId":"bbbbbbbbbbb"},
            {"videoId": "aaaaaaaaaaa"}, {"videoId": "ccccccccccc"}
        ]};</script><script>{"videoId": "ddddddddddd"}</script>"#;

        assert_eq!(
            video_ids_from_html(html, 10),
            vec!["aaaaaaaaaaa", "bbbbbbbbbbb", "ccccccccccc"]
        );
        assert_eq!(video_ids_from_html(html, 2), vec!["aaaaaaaaaaa", "bbbbbbbbbbb"]);
        assert!(video_ids_from_html("<html></html>", 5).is_empty());
    }
}
