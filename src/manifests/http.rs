use std::path::Path;

use async_trait::async_trait;
use serde_json::Value;
use tokio::{fs::File, io::AsyncWriteExt};
use tokio_stream::StreamExt;
use tracing::debug;

use super::UpstreamClient;
use crate::error::{Error, ResolutionError, Result};

/// [`UpstreamClient`] backed by a shared `reqwest` client.
#[derive(Debug, Clone)]
pub struct HttpUpstream {
    client: reqwest::Client,
}

impl HttpUpstream {
    pub fn new(user_agent: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .build()
            .map_err(|e| ResolutionError::Unreachable {
                url: String::new(),
                message: format!("failed to build HTTP client: {}", e),
            })?;

        Ok(Self { client })
    }

    async fn send(&self, url: &str) -> std::result::Result<reqwest::Response, ResolutionError> {
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| ResolutionError::Unreachable {
                url: url.to_string(),
                message: e.to_string(),
            })?;

        let status = resp.status();
        if !status.is_success() {
            return Err(ResolutionError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        Ok(resp)
    }
}

#[async_trait]
impl UpstreamClient for HttpUpstream {
    async fn get_json(&self, url: &str) -> std::result::Result<Value, ResolutionError> {
        debug!(%url, "fetching upstream metadata");
        self.send(url)
            .await?
            .json::<Value>()
            .await
            .map_err(|e| ResolutionError::Malformed {
                url: url.to_string(),
                message: e.to_string(),
            })
    }

    async fn download(&self, url: &str, dest: &Path) -> Result<u64> {
        debug!(%url, dest = %dest.display(), "downloading artifact");
        let resp = self.send(url).await?;

        let mut out = File::create(dest)
            .await
            .map_err(|e| Error::fs_at("creating", dest, e))?;

        let mut written = 0u64;
        let mut stream = std::pin::pin!(resp.bytes_stream());
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| ResolutionError::Unreachable {
                url: url.to_string(),
                message: e.to_string(),
            })?;
            out.write_all(&chunk)
                .await
                .map_err(|e| Error::fs_at("writing", dest, e))?;
            written += chunk.len() as u64;
        }

        out.flush()
            .await
            .map_err(|e| Error::fs_at("flushing", dest, e))?;

        Ok(written)
    }
}
