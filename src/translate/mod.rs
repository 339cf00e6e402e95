// Translation service client
//
// This module talks to the remote subtitle translation service:
// - Job: job token, lifecycle state machine and engine selector
// - Api: HTTP transport for /translate, /translate_sse and /healthz
// - Progress: incremental progress frames from the event stream
// - Client: idempotent submission with retries and concurrent observation

pub mod api;
pub mod client;
pub mod job;
pub mod progress;

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub use api::{HttpTranslationApi, ProgressStream, TranslationApi};
pub use client::{RetryPolicy, TranslationJobClient};
pub use job::{Engine, JobState, TranslationJob};
pub use progress::{ProgressMonitor, ProgressSnapshot};

use crate::config::ApiConfig;
use crate::error::Result;

/// Result of a successful translation request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslationOutcome {
    /// Deterministic `<basename>.<target>.srt` path
    pub output: PathBuf,
    /// The output already existed and nothing was submitted
    pub skipped_existing: bool,
}

/// Main trait for subtitle translation
#[async_trait]
pub trait SubtitleTranslator: Send + Sync {
    /// Translate the subtitle at `input` and return where the result lives
    async fn translate(&self, input: &Path, source: &str, target: &str, engine: Engine) -> Result<TranslationOutcome>;
}

/// Factory for creating translator instances
pub struct TranslatorFactory;

impl TranslatorFactory {
    /// Create a job client on top of `api`, configured from `config`
    pub fn create_translator(api: Arc<dyn TranslationApi>, config: &ApiConfig) -> Box<dyn SubtitleTranslator> {
        Box::new(TranslationJobClient::new(
            api,
            RetryPolicy::from_config(config),
            config.observe_progress,
        ))
    }
}
