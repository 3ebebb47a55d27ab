use std::{path::Path, sync::Arc, time::Duration};

use reqwest::{
    header::{HeaderMap, HeaderValue, ACCEPT_LANGUAGE, USER_AGENT},
    Url,
};
use reqwest_cookie_store::CookieStoreMutex;
use reqwest_middleware::ClientWithMiddleware;
use reqwest_retry::{policies::ExponentialBackoff, RetryTransientMiddleware};

pub const YOUTUBE_BASE_URL: &str = "https://www.youtube.com";

const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

#[derive(Clone)]
pub struct HttpClient {
    pub client: ClientWithMiddleware,
    pub cookies: Arc<CookieStoreMutex>,
}

#[derive(thiserror::Error, Debug)]
pub enum HttpError {
    #[error("reqwest error: {0}")]
    ReqwestError(#[from] reqwest::Error),
    #[error("reqwest middleware error: {0}")]
    ReqwestMiddlewareError(#[from] reqwest_middleware::Error),
    #[error("io error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("unexpected status {status} from {url}")]
    Status {
        status: reqwest::StatusCode,
        url: String,
    },
}

#[derive(Debug, Clone)]
pub struct HttpOptions {
    pub timeout: Duration,
    pub max_retries: u32,
}

impl Default for HttpOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            max_retries: 3,
        }
    }
}

impl HttpClient {
    pub fn new(options: &HttpOptions) -> reqwest::Result<HttpClient> {
        let cookies = Arc::new(CookieStoreMutex::default());
        let retry_policy =
            ExponentialBackoff::builder().build_with_max_retries(options.max_retries);

        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(BROWSER_USER_AGENT));
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));

        let client = reqwest::Client::builder()
            .cookie_provider(cookies.clone())
            .default_headers(headers)
            .timeout(options.timeout)
            .connect_timeout(options.timeout.min(Duration::from_secs(10)))
            .build()?;

        let client = reqwest_middleware::ClientBuilder::new(client)
            .with(RetryTransientMiddleware::new_with_policy(retry_policy))
            .build();

        Ok(HttpClient { client, cookies })
    }

    /// Seeds the cookie jar from a Netscape formatted `cookies.txt`, the same
    /// file handed to yt-dlp. Returns the number of cookies loaded.
    pub fn load_cookie_file(&self, path: &Path) -> Result<usize, HttpError> {
        let text = std::fs::read_to_string(path)?;
        let mut store = match self.cookies.lock() {
            Ok(store) => store,
            Err(poisoned) => poisoned.into_inner(),
        };

        let mut loaded = 0;
        for cookie in parse_netscape_cookies(&text) {
            let Ok(url) = Url::parse(&cookie.origin()) else {
                continue;
            };
            if store.parse(&cookie.header(), &url).is_ok() {
                loaded += 1;
            }
        }

        Ok(loaded)
    }

    pub async fn fetch_text(&self, url: &str) -> Result<String, HttpError> {
        let resp = self.client.get(url).send().await?;
        if !resp.status().is_success() {
            return Err(HttpError::Status {
                status: resp.status(),
                url: url.to_string(),
            });
        }

        resp.text().await.map_err(|e| e.into())
    }
}

#[derive(Debug, PartialEq)]
pub struct NetscapeCookie {
    pub domain: String,
    pub path: String,
    pub secure: bool,
    pub name: String,
    pub value: String,
}

impl NetscapeCookie {
    fn host(&self) -> &str {
        self.domain.trim_start_matches('.')
    }

    fn origin(&self) -> String {
        let scheme = if self.secure { "https" } else { "http" };
        format!("{}://{}{}", scheme, self.host(), self.path)
    }

    fn header(&self) -> String {
        let mut header = format!("{}={}; Path={}", self.name, self.value, self.path);
        if self.domain.starts_with('.') {
            header.push_str(&format!("; Domain={}", self.host()));
        }
        if self.secure {
            header.push_str("; Secure");
        }
        header
    }
}

pub fn parse_netscape_cookies(text: &str) -> Vec<NetscapeCookie> {
    text.lines()
        .filter_map(|line| {
            // curl marks HttpOnly cookies with this prefix instead of a comment
            let line = line.strip_prefix("#HttpOnly_").unwrap_or(line);
            if line.trim().is_empty() || line.starts_with('#') {
                return None;
            }

            let fields: Vec<&str> = line.split('\t').collect();
            if fields.len() < 7 {
                return None;
            }

            Some(NetscapeCookie {
                domain: fields[0].to_string(),
                path: fields[2].to_string(),
                secure: fields[3].eq_ignore_ascii_case("TRUE"),
                name: fields[5].to_string(),
                value: fields[6].trim_end().to_string(),
            })
        })
        .collect()
}

/// Canonical watch page of a video.
pub fn watch_url(video_id: &str) -> String {
    format!("{}/watch?v={}", YOUTUBE_BASE_URL, video_id)
}

/// Trims a channel reference and makes it an absolute URL. `@handle` is
/// expanded to the channel page; a missing scheme defaults to https.
pub fn normalize_channel_url(raw: &str) -> String {
    let url = raw.trim().trim_end_matches('/');
    if url.starts_with('@') {
        format!("{}/{}", YOUTUBE_BASE_URL, url)
    } else if url.contains("://") {
        url.to_string()
    } else {
        format!("https://{}", url)
    }
}

/// Whether the URL already points at a single video rather than a channel.
pub fn is_video_url(url: &str) -> bool {
    url.contains("watch?v=")
        || url.contains("youtu.be/")
        || url.contains("/shorts/")
        || url
            .split_once("/live/")
            .map(|(_, id)| !id.is_empty())
            .unwrap_or(false)
}
