//! [`RemoteStore`] over the GitHub repository contents API.

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use reqwest::{header::ACCEPT, StatusCode};
use serde::{Deserialize, Serialize};

use super::{RemoteStore, StoreError, StoredObject};
use crate::util::{HttpClient, HttpError};

pub const DEFAULT_API_URL: &str = "https://api.github.com";

#[derive(Debug, Clone)]
pub struct GitHubConfig {
    pub token: String,
    /// `owner/name`
    pub repository: String,
    pub branch: String,
    pub api_url: String,
}

pub struct GitHubStore {
    client: HttpClient,
    config: GitHubConfig,
}

#[derive(Debug, Deserialize)]
struct ContentsResponse {
    path: String,
    sha: String,
    #[serde(default)]
    content: String,
}

#[derive(Debug, Serialize)]
struct PutContentsRequest<'a> {
    message: &'a str,
    content: String,
    branch: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    sha: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct PutContentsResponse {
    content: PutContent,
}

#[derive(Debug, Deserialize)]
struct PutContent {
    sha: String,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    message: String,
}

async fn error_message(resp: reqwest::Response) -> String {
    let text = resp.text().await.unwrap_or_default();
    serde_json::from_str::<ErrorResponse>(&text)
        .map(|e| e.message)
        .unwrap_or(text)
}

impl GitHubStore {
    pub fn new(client: HttpClient, config: GitHubConfig) -> Self {
        Self { client, config }
    }

    fn contents_url(&self, path: &str) -> String {
        format!(
            "{}/repos/{}/contents/{}",
            self.config.api_url.trim_end_matches('/'),
            self.config.repository,
            path.trim_start_matches('/')
        )
    }

    async fn put(
        &self,
        path: &str,
        content: &str,
        sha: Option<&str>,
        message: &str,
    ) -> Result<String, StoreError> {
        let body = PutContentsRequest {
            message,
            content: BASE64.encode(content),
            branch: &self.config.branch,
            sha,
        };
        let body = serde_json::to_vec(&body).map_err(|e| StoreError::Decode {
            path: path.to_string(),
            reason: e.to_string(),
        })?;

        let resp = self
            .client
            .client
            .put(self.contents_url(path))
            .bearer_auth(&self.config.token)
            .header(ACCEPT, "application/vnd.github+json")
            .header("X-GitHub-Api-Version", "2022-11-28")
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .map_err(HttpError::from)?;

        match resp.status() {
            StatusCode::OK | StatusCode::CREATED => {
                let created: PutContentsResponse = resp.json().await.map_err(HttpError::from)?;
                Ok(created.content.sha)
            }
            StatusCode::CONFLICT => Err(StoreError::Conflict {
                path: path.to_string(),
                version: sha.unwrap_or_default().to_string(),
            }),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                Err(StoreError::Unauthorized(self.config.repository.clone()))
            }
            status => {
                let message = error_message(resp).await;
                // Creating over an object that appeared since the lookup
                if status == StatusCode::UNPROCESSABLE_ENTITY
                    && sha.is_none()
                    && message.contains("sha")
                {
                    return Err(StoreError::Conflict {
                        path: path.to_string(),
                        version: String::new(),
                    });
                }
                Err(StoreError::Status {
                    status: status.as_u16(),
                    path: path.to_string(),
                    message,
                })
            }
        }
    }
}

#[async_trait]
impl RemoteStore for GitHubStore {
    async fn get(&self, path: &str) -> Result<Option<StoredObject>, StoreError> {
        let resp = self
            .client
            .client
            .get(self.contents_url(path))
            .query(&[("ref", self.config.branch.as_str())])
            .bearer_auth(&self.config.token)
            .header(ACCEPT, "application/vnd.github+json")
            .header("X-GitHub-Api-Version", "2022-11-28")
            .send()
            .await
            .map_err(HttpError::from)?;

        match resp.status() {
            StatusCode::NOT_FOUND => return Ok(None),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                return Err(StoreError::Unauthorized(self.config.repository.clone()))
            }
            status if !status.is_success() => {
                return Err(StoreError::Status {
                    status: status.as_u16(),
                    path: path.to_string(),
                    message: error_message(resp).await,
                })
            }
            _ => (),
        }

        let text = resp.text().await.map_err(HttpError::from)?;
        let contents: ContentsResponse =
            serde_json::from_str(&text).map_err(|e| StoreError::Decode {
                path: path.to_string(),
                reason: e.to_string(),
            })?;

        // The API wraps the base64 payload every 60 characters
        let encoded: String = contents
            .content
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect();
        let bytes = BASE64.decode(encoded).map_err(|e| StoreError::Decode {
            path: path.to_string(),
            reason: e.to_string(),
        })?;
        let content = String::from_utf8(bytes).map_err(|e| StoreError::Decode {
            path: path.to_string(),
            reason: e.to_string(),
        })?;

        Ok(Some(StoredObject {
            path: contents.path,
            content,
            version: contents.sha,
        }))
    }

    async fn create(
        &self,
        path: &str,
        content: &str,
        message: &str,
    ) -> Result<String, StoreError> {
        self.put(path, content, None, message).await
    }

    async fn update(
        &self,
        path: &str,
        content: &str,
        version: &str,
        message: &str,
    ) -> Result<String, StoreError> {
        self.put(path, content, Some(version), message).await
    }
}
