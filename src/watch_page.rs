//! [`Extractor`] that scrapes YouTube pages directly instead of shelling out.

use async_trait::async_trait;
use m3u8_rs::MasterPlaylist;
use reqwest::Url;

use crate::{
    extractor::{ExtractError, Extractor, LiveStatus, StreamFormat, VideoCandidate, VideoMetadata},
    player_response::{self, InitialPlayerResponse, PlayerResponseError},
    util::{self, HttpClient},
};

pub struct WatchPageExtractor {
    client: HttpClient,
    base_url: String,
}

impl WatchPageExtractor {
    pub fn new(client: HttpClient) -> Self {
        Self::with_base_url(client, util::YOUTUBE_BASE_URL)
    }

    pub fn with_base_url(client: HttpClient, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    async fn fetch_variants(&self, master_url: &str) -> Result<Vec<StreamFormat>, ExtractError> {
        let body = self.client.fetch_text(master_url).await?;
        let playlist = m3u8_rs::parse_master_playlist_res(body.as_bytes())
            .map_err(|_| ExtractError::Parse(format!("invalid HLS master playlist {}", master_url)))?;

        Ok(variant_formats(master_url, &playlist))
    }
}

fn variant_formats(master_url: &str, playlist: &MasterPlaylist) -> Vec<StreamFormat> {
    let base = Url::parse(master_url).ok();

    playlist
        .variants
        .iter()
        .filter(|v| !v.is_i_frame)
        .filter_map(|v| {
            let url = match &base {
                Some(base) => base.join(&v.uri).ok()?.to_string(),
                None => v.uri.clone(),
            };
            Some(StreamFormat {
                format_id: Some(format!("hls-{}", v.bandwidth)),
                url,
                height: v.resolution.and_then(|r| u32::try_from(r.height).ok()),
                adaptive: true,
            })
        })
        .collect()
}

impl From<PlayerResponseError> for ExtractError {
    fn from(e: PlayerResponseError) -> Self {
        ExtractError::Parse(e.to_string())
    }
}

#[async_trait]
impl Extractor for WatchPageExtractor {
    async fn list_candidates(
        &self,
        url: &str,
        limit: usize,
    ) -> Result<Vec<VideoCandidate>, ExtractError> {
        let html = self.client.fetch_text(url).await?;

        // `/live` redirects to the watch page of the current broadcast
        if let Ok(ipr) = InitialPlayerResponse::from_html(&html) {
            if let Some(id) = ipr.video_id() {
                return Ok(vec![VideoCandidate {
                    id: id.to_string(),
                    title: ipr.title().map(str::to_string),
                }]);
            }
        }

        Ok(player_response::video_ids_from_html(&html, limit)
            .into_iter()
            .map(VideoCandidate::new)
            .collect())
    }

    async fn fetch_metadata(&self, video_id: &str) -> Result<VideoMetadata, ExtractError> {
        let html = self
            .client
            .fetch_text(&format!("{}/watch?v={}", self.base_url, video_id))
            .await?;
        let ipr = InitialPlayerResponse::from_html(&html)?;

        if let Some(reason) = ipr.unavailable_reason() {
            return Err(ExtractError::Unavailable(reason));
        }

        let mut metadata = VideoMetadata::new(video_id, ipr.live_status());
        metadata.title = ipr.title().map(str::to_string);
        metadata.channel = ipr.author().map(str::to_string);
        metadata.scheduled_start = ipr.scheduled_start();
        metadata.best_url = ipr
            .hls_manifest_url()
            .or_else(|| ipr.dash_manifest_url())
            .map(str::to_string);

        if metadata.status != LiveStatus::NotLive {
            if let Some(master_url) = ipr.hls_manifest_url() {
                match self.fetch_variants(master_url).await {
                    Ok(formats) => metadata.formats = formats,
                    Err(e) => warn!("Could not list HLS variants of {}: {}", video_id, e),
                }
            }
        }

        Ok(metadata)
    }
}

#[cfg(test)]
mod tests {
    use wiremock::{
        matchers::{method, path, query_param},
        Mock, MockServer, ResponseTemplate,
    };

    use super::*;
    use crate::{player_response::tests::watch_page, util::HttpOptions};

    fn extractor(server: &MockServer) -> WatchPageExtractor {
        let options = HttpOptions {
            max_retries: 0,
            ..HttpOptions::default()
        };
        WatchPageExtractor::with_base_url(HttpClient::new(&options).unwrap(), &server.uri())
    }

    fn master_playlist() -> &'static str {
        "#EXTM3U\n\
         #EXT-X-STREAM-INF:BANDWIDTH=1000000,RESOLUTION=854x480\n\
         variant/480.m3u8\n\
         #EXT-X-STREAM-INF:BANDWIDTH=5000000,RESOLUTION=1920x1080\n\
         variant/1080.m3u8\n"
    }

    #[tokio::test]
    async fn live_metadata_lists_hls_variants() {
        let server = MockServer::start().await;
        let master_url = format!("{}/hls/master.m3u8", server.uri());
        let ipr = format!(
            r#"{{"playabilityStatus": {{"status": "OK"}},
                "streamingData": {{"hlsManifestUrl": "{}"}},
                "videoDetails": {{"videoId": "liveVideo01", "title": "Morning news", "isLive": true, "author": "Channel A"}}}}"#,
            master_url
        );

        Mock::given(method("GET"))
            .and(path("/watch"))
            .and(query_param("v", "liveVideo01"))
            .respond_with(ResponseTemplate::new(200).set_body_string(watch_page(&ipr)))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/hls/master.m3u8"))
            .respond_with(ResponseTemplate::new(200).set_body_string(master_playlist()))
            .mount(&server)
            .await;

        let metadata = extractor(&server)
            .fetch_metadata("liveVideo01")
            .await
            .expect("metadata");

        assert_eq!(metadata.status, LiveStatus::Live);
        assert_eq!(metadata.channel.as_deref(), Some("Channel A"));
        assert_eq!(metadata.best_url.as_deref(), Some(master_url.as_str()));
        assert_eq!(metadata.formats.len(), 2);
        assert_eq!(metadata.formats[1].height, Some(1080));
        assert_eq!(metadata.formats[1].format_id.as_deref(), Some("hls-5000000"));
        assert_eq!(
            metadata.formats[1].url,
            format!("{}/hls/variant/1080.m3u8", server.uri())
        );
        assert!(metadata.formats.iter().all(|f| f.adaptive));
    }

    #[tokio::test]
    async fn broken_master_playlist_keeps_best_url() {
        let server = MockServer::start().await;
        let master_url = format!("{}/hls/master.m3u8", server.uri());
        let ipr = format!(
            r#"{{"playabilityStatus": {{"status": "OK"}},
                "streamingData": {{"hlsManifestUrl": "{}"}},
                "videoDetails": {{"videoId": "liveVideo01", "isLive": true}}}}"#,
            master_url
        );

        Mock::given(method("GET"))
            .and(path("/watch"))
            .respond_with(ResponseTemplate::new(200).set_body_string(watch_page(&ipr)))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/hls/master.m3u8"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let metadata = extractor(&server)
            .fetch_metadata("liveVideo01")
            .await
            .expect("metadata");

        assert!(metadata.formats.is_empty());
        assert_eq!(metadata.best_url.as_deref(), Some(master_url.as_str()));
    }

    #[tokio::test]
    async fn unplayable_video_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/watch"))
            .respond_with(ResponseTemplate::new(200).set_body_string(watch_page(
                r#"{"playabilityStatus": {"status": "ERROR", "reason": "Video unavailable"}}"#,
            )))
            .mount(&server)
            .await;

        let result = extractor(&server).fetch_metadata("gone0000000").await;
        assert!(matches!(result, Err(ExtractError::Unavailable(reason)) if reason == "Video unavailable"));
    }

    #[tokio::test]
    async fn channel_listing() {
        let server = MockServer::start().await;
        let streams = r#"<script>var ytInitialData = {"tabs": [
            {"videoId": "aaaaaaaaaaa"}, {"videoId": "bbbbbbbbbbb"}, {"videoId": "aaaaaaaaaaa"}
        ]};</script>"#;
        let live = watch_page(
            r#"{"playabilityStatus": {"status": "OK"}, "videoDetails": {"videoId": "ccccccccccc", "title": "On air"}}"#,
        );

        Mock::given(method("GET"))
            .and(path("/@chan/streams"))
            .respond_with(ResponseTemplate::new(200).set_body_string(streams))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/@chan/live"))
            .respond_with(ResponseTemplate::new(200).set_body_string(live))
            .mount(&server)
            .await;

        let extractor = extractor(&server);
        let listed = extractor
            .list_candidates(&format!("{}/@chan/streams", server.uri()), 5)
            .await
            .unwrap();
        assert_eq!(
            listed,
            vec![VideoCandidate::new("aaaaaaaaaaa"), VideoCandidate::new("bbbbbbbbbbb")]
        );

        let live = extractor
            .list_candidates(&format!("{}/@chan/live", server.uri()), 5)
            .await
            .unwrap();
        assert_eq!(live.len(), 1);
        assert_eq!(live[0].id, "ccccccccccc");
        assert_eq!(live[0].title.as_deref(), Some("On air"));
    }
}
