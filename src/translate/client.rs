use async_trait::async_trait;
use bytes::Bytes;
use indicatif::ProgressBar;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::api::TranslationApi;
use super::job::{Engine, JobState, TranslationJob};
use super::progress::ProgressMonitor;
use super::{SubtitleTranslator, TranslationOutcome};
use crate::config::ApiConfig;
use crate::error::{Result, SubliftError};
use crate::library::{is_nonempty_file, translated_output_path};

/// Retry behaviour for transient submission failures
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub delay: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &ApiConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            delay: Duration::from_secs(config.retry_delay_secs),
        }
    }
}

/// Drives one translation job end to end: idempotence check, upload with
/// retries, optional progress observation and writing the result.
pub struct TranslationJobClient<A: TranslationApi + ?Sized> {
    api: Arc<A>,
    retry: RetryPolicy,
    observe_progress: bool,
}

impl<A: TranslationApi + ?Sized + 'static> TranslationJobClient<A> {
    pub fn new(api: Arc<A>, retry: RetryPolicy, observe_progress: bool) -> Self {
        Self {
            api,
            retry,
            observe_progress,
        }
    }

    async fn run_job(&self, mut job: TranslationJob) -> Result<TranslationOutcome> {
        if is_nonempty_file(&job.output).await {
            job.advance(JobState::Finished)?;
            return Ok(TranslationOutcome {
                output: job.output,
                skipped_existing: true,
            });
        }

        let content = tokio::fs::read(&job.input).await?;
        if content.is_empty() {
            return Err(SubliftError::Translation(format!("{} is empty", job.input.display())));
        }

        job.advance(JobState::Submitted)?;
        let submission = tokio::spawn(submit_with_retries(
            self.api.clone(),
            job.clone(),
            Bytes::from(content),
            self.retry,
        ));

        let joined = if self.observe_progress {
            job.advance(JobState::Polling)?;
            let bar = ProgressBar::new(0).with_prefix(job.upload_name());
            let monitor = ProgressMonitor::new(self.api.clone(), bar.clone());
            let mut submission = submission;

            // Whichever side ends first, the submission is always awaited.
            // Dropping the observer closes its connection.
            let joined = tokio::select! {
                joined = &mut submission => joined,
                last = monitor.watch(&job.token) => {
                    debug!("Progress stream for {} ended: {:?}", job.token, last);
                    submission.await
                }
            };
            bar.finish_and_clear();
            joined
        } else {
            submission.await
        };

        let result = match joined {
            Ok(Ok(body)) => write_output(&job.output, &body),
            Ok(Err(e)) => Err(e),
            Err(e) => Err(SubliftError::Translation(format!("submission task failed: {}", e))),
        };

        match result {
            Ok(()) => {
                job.advance(JobState::Finished)?;
                Ok(TranslationOutcome {
                    output: job.output,
                    skipped_existing: false,
                })
            }
            Err(e) => {
                remove_partial_output(&job.output).await;
                job.advance(JobState::Failed)?;
                Err(e)
            }
        }
    }
}

#[async_trait]
impl<A: TranslationApi + ?Sized + 'static> SubtitleTranslator for TranslationJobClient<A> {
    async fn translate(&self, input: &Path, source: &str, target: &str, engine: Engine) -> Result<TranslationOutcome> {
        let output = translated_output_path(input, target)?;
        let job = TranslationJob::new(input.to_path_buf(), output, source, target, engine);
        self.run_job(job).await
    }
}

async fn submit_with_retries<A: TranslationApi + ?Sized>(
    api: Arc<A>,
    job: TranslationJob,
    content: Bytes,
    retry: RetryPolicy,
) -> Result<Bytes> {
    let mut attempt = 0;
    loop {
        attempt += 1;
        match api.submit(&job, content.clone()).await {
            Ok(body) => return Ok(body),
            Err(e) if e.is_transient() && attempt <= retry.max_retries => {
                warn!(
                    "Submission of {} failed (attempt {}/{}): {}; retrying in {}s",
                    job.upload_name(),
                    attempt,
                    retry.max_retries + 1,
                    e,
                    retry.delay.as_secs()
                );
                tokio::time::sleep(retry.delay).await;
            }
            Err(e) => return Err(e),
        }
    }
}

/// Write `body` beside `output` and rename it into place.
fn write_output(output: &Path, body: &[u8]) -> Result<()> {
    if body.iter().all(|b| b.is_ascii_whitespace()) {
        return Err(SubliftError::Translation("service returned an empty subtitle".to_string()));
    }

    let dir = output.parent().unwrap_or_else(|| Path::new("."));
    let mut temp = tempfile::NamedTempFile::new_in(dir)?;
    temp.write_all(body)?;
    temp.flush()?;
    temp.persist(output).map_err(|e| SubliftError::Io(e.error))?;

    info!("Wrote {} ({} bytes)", output.display(), body.len());
    Ok(())
}

async fn remove_partial_output(output: &Path) {
    match tokio::fs::remove_file(output).await {
        Ok(()) => debug!("Removed partial output {}", output.display()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!("Failed to remove partial output {}: {}", output.display(), e),
    }
}
