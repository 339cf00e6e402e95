use async_trait::async_trait;
use bytes::Bytes;
use futures_util::{Stream, StreamExt};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, header};
use std::pin::Pin;
use std::time::Duration;
use tracing::debug;

use super::job::TranslationJob;
use crate::config::ApiConfig;
use crate::error::{Result, SubliftError};

/// Raw bytes of a progress event stream
pub type ProgressStream = Pin<Box<dyn Stream<Item = Result<Bytes>> + Send>>;

/// Transport to the remote translation service
#[async_trait]
pub trait TranslationApi: Send + Sync {
    /// Upload `content` for `job` and return the translated payload
    async fn submit(&self, job: &TranslationJob, content: Bytes) -> Result<Bytes>;

    /// Open the progress event stream keyed by `token`
    async fn subscribe_progress(&self, token: &str) -> Result<ProgressStream>;
}

/// reqwest implementation of the translation API
pub struct HttpTranslationApi {
    client: Client,
    stream_client: Client,
    base_url: String,
}

impl HttpTranslationApi {
    pub fn new(config: &ApiConfig) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        // The progress stream stays open for the whole job, so only the
        // connect phase is bounded
        let stream_client = Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .build()?;

        Ok(Self {
            client,
            stream_client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// GET /healthz
    pub async fn check_health(&self) -> Result<()> {
        let response = self.client.get(self.url("/healthz")).send().await?;
        if !response.status().is_success() {
            return Err(SubliftError::Api {
                status: response.status().as_u16(),
                message: "health check failed".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl TranslationApi for HttpTranslationApi {
    async fn submit(&self, job: &TranslationJob, content: Bytes) -> Result<Bytes> {
        let url = self.url("/translate");
        debug!("Submitting {} to {} (token {})", job.input.display(), url, job.token);

        let file = Part::bytes(content.to_vec())
            .file_name(job.upload_name())
            .mime_str("application/x-subrip")?;

        // Library file names carry spaces; keep them as a plain `filename`
        let form = Form::new()
            .percent_encode_noop()
            .part("file", file)
            .text("source", job.source.clone())
            .text("target", job.target.clone())
            .text("engine", job.engine.as_str())
            .text("progress_key", job.token.clone());

        let response = self.client.post(&url).multipart(form).send().await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(SubliftError::Api {
                status: status.as_u16(),
                message: message.trim().to_string(),
            });
        }

        Ok(response.bytes().await?)
    }

    async fn subscribe_progress(&self, token: &str) -> Result<ProgressStream> {
        let response = self
            .stream_client
            .get(self.url("/translate_sse"))
            .query(&[("key", token)])
            .header(header::ACCEPT, "text/event-stream")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(SubliftError::Api {
                status: status.as_u16(),
                message: "progress subscription rejected".to_string(),
            });
        }

        Ok(Box::pin(response.bytes_stream().map(|chunk| chunk.map_err(SubliftError::from))))
    }
}
