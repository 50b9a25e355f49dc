//! GitHub repository store.
//!
//! Mirrors blobs as files in a GitHub repository through the contents API.
//! The blob SHA GitHub reports for a file is used as the version token; the
//! API rejects a write carrying a stale SHA, which gives optimistic
//! concurrency for free.

use crate::error::{StoreError, StoreResult};
use crate::store::{DurableStore, VersionToken, VersionedBlob};
use async_trait::async_trait;
use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};

/// GitHub store configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubStoreConfig {
    /// Repository in `owner/name` form.
    pub repository: String,
    /// Branch that holds the blobs.
    pub branch: String,
    /// Personal access or app token with contents read/write scope.
    #[serde(skip_serializing)]
    pub token: String,
    /// Base URL for the REST API (e.g. `https://api.github.com`).
    pub api_base_url: String,
    /// Commit message used for every write.
    pub commit_message: String,
    /// Per-request timeout.
    pub request_timeout_secs: u64,
}

impl Default for GitHubStoreConfig {
    fn default() -> Self {
        Self {
            repository: String::new(),
            branch: "main".to_string(),
            token: String::new(),
            api_base_url: "https://api.github.com".to_string(),
            commit_message: "Update authorization ledger".to_string(),
            request_timeout_secs: 10,
        }
    }
}

/// Contents API file response.
#[derive(Debug, Deserialize)]
struct ContentsFile {
    sha: String,
    #[serde(default)]
    content: String,
    /// `"none"` when the file is too large to inline.
    #[serde(default)]
    encoding: String,
}

#[derive(Debug, Deserialize)]
struct WrittenFile {
    sha: String,
}

#[derive(Debug, Serialize)]
struct PutContents<'a> {
    message: &'a str,
    content: String,
    branch: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    sha: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct PutContentsResponse {
    content: WrittenFile,
}

/// Store backed by a GitHub repository.
pub struct GitHubStore {
    config: GitHubStoreConfig,
    client: Client,
}

impl GitHubStore {
    /// Creates a new GitHub store.
    pub fn new(config: GitHubStoreConfig) -> StoreResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .user_agent(concat!("hwgate/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| StoreError::Unavailable(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { config, client })
    }

    /// Returns the configuration.
    pub fn config(&self) -> &GitHubStoreConfig {
        &self.config
    }

    fn contents_url(&self, key: &str) -> String {
        format!(
            "{}/repos/{}/contents/{}",
            self.config.api_base_url.trim_end_matches('/'),
            self.config.repository,
            key
        )
    }

    fn request(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        let builder = builder.header("Accept", "application/vnd.github+json");
        if self.config.token.is_empty() {
            builder
        } else {
            builder.bearer_auth(&self.config.token)
        }
    }
}

#[async_trait]
impl DurableStore for GitHubStore {
    fn provider_name(&self) -> &'static str {
        "GitHub"
    }

    async fn get(&self, key: &str) -> StoreResult<Option<VersionedBlob>> {
        debug!("Fetching {} from {}", key, self.config.repository);

        let response = self
            .request(self.client.get(self.contents_url(key)))
            .query(&[("ref", self.config.branch.as_str())])
            .send()
            .await
            .map_err(|e| StoreError::Unavailable(format!("fetch failed: {e}")))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            let status = response.status();
            let error = response.text().await.unwrap_or_default();
            return Err(StoreError::Unavailable(format!(
                "fetch failed ({status}): {error}"
            )));
        }

        let file: ContentsFile = response
            .json()
            .await
            .map_err(|e| StoreError::Unavailable(format!("parse fetch response failed: {e}")))?;

        if file.encoding != "base64" {
            return Err(StoreError::Unavailable(format!(
                "{key} not inlined by the contents API (encoding {:?})",
                file.encoding
            )));
        }

        // The API wraps base64 at 60 columns.
        let packed: String = file.content.split_whitespace().collect();
        let content = BASE64
            .decode(packed)
            .map_err(|e| StoreError::Unavailable(format!("invalid base64 content: {e}")))?;

        Ok(Some(VersionedBlob {
            content,
            version: VersionToken::new(file.sha),
        }))
    }

    async fn put(
        &self,
        key: &str,
        content: &[u8],
        expected: Option<&VersionToken>,
    ) -> StoreResult<VersionToken> {
        let body = PutContents {
            message: &self.config.commit_message,
            content: BASE64.encode(content),
            branch: &self.config.branch,
            sha: expected.map(VersionToken::as_str),
        };

        let response = self
            .request(self.client.put(self.contents_url(key)))
            .json(&body)
            .send()
            .await
            .map_err(|e| StoreError::Unavailable(format!("write failed: {e}")))?;

        match response.status() {
            StatusCode::CONFLICT => {
                debug!("GitHub rejected write to {}: stale sha", key);
                Err(StoreError::Conflict {
                    key: key.to_string(),
                })
            }
            // A 422 naming the sha means it was missing for an existing file
            // or present for a missing one. Anything else is a bad request.
            StatusCode::UNPROCESSABLE_ENTITY => {
                let error = response.text().await.unwrap_or_default();
                if error.contains("sha") {
                    debug!("GitHub rejected write to {}: {}", key, error);
                    Err(StoreError::Conflict {
                        key: key.to_string(),
                    })
                } else {
                    Err(StoreError::Unavailable(format!(
                        "write rejected (422): {error}"
                    )))
                }
            }
            status if status.is_success() => {
                let written: PutContentsResponse = response.json().await.map_err(|e| {
                    StoreError::Unavailable(format!("parse write response failed: {e}"))
                })?;
                info!("Mirrored {} to {} ({} bytes)", key, self.config.repository, content.len());
                Ok(VersionToken::new(written.content.sha))
            }
            status => {
                let error = response.text().await.unwrap_or_default();
                Err(StoreError::Unavailable(format!(
                    "write failed ({status}): {error}"
                )))
            }
        }
    }
}
