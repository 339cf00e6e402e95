use chrono::{DateTime, Local, TimeDelta};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::Result;
use crate::language;
use crate::library::{self, MediaFile, is_nonempty_file, translated_output_path};
use crate::media::{MediaToolsFactory, MediaToolsTrait};
use crate::selection::{self, SatisfiedBy, SelectionDecision, SelectionPolicy, UnavailableReason};
use crate::sidecar;
use crate::translate::{HttpTranslationApi, SubtitleTranslator, TranslationApi, TranslatorFactory};

/// What happened to one media file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileOutcome {
    Translated,
    Skipped,
    Failed,
}

/// Totals for one pass over the library
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub scanned: usize,
    pub translated: usize,
    pub skipped: usize,
    pub failed: usize,
    pub started_at: DateTime<Local>,
    pub elapsed: TimeDelta,
}

impl RunSummary {
    fn start() -> Self {
        Self {
            scanned: 0,
            translated: 0,
            skipped: 0,
            failed: 0,
            started_at: Local::now(),
            elapsed: TimeDelta::zero(),
        }
    }

    fn record(&mut self, outcome: FileOutcome) {
        self.scanned += 1;
        match outcome {
            FileOutcome::Translated => self.translated += 1,
            FileOutcome::Skipped => self.skipped += 1,
            FileOutcome::Failed => self.failed += 1,
        }
    }

    fn finish(&mut self) {
        self.elapsed = Local::now() - self.started_at;
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} scanned, {} translated, {} skipped, {} failed (started {}, took {}s)",
            self.scanned,
            self.translated,
            self.skipped,
            self.failed,
            self.started_at.format("%Y-%m-%d %H:%M:%S"),
            self.elapsed.num_seconds()
        )
    }
}

pub struct Workflow {
    config: Config,
    policy: SelectionPolicy,
    media: Box<dyn MediaToolsTrait>,
    translator: Box<dyn SubtitleTranslator>,
}

impl Workflow {
    /// Build the production workflow. Fails if ffprobe or ffmpeg cannot run;
    /// an unreachable translation service is only reported.
    pub async fn new(config: Config) -> Result<Self> {
        let media = MediaToolsFactory::create(config.media.clone());

        // Check dependencies
        media.check_availability().await?;

        let api = Arc::new(HttpTranslationApi::new(&config.api)?);
        if config.api.check_health {
            match api.check_health().await {
                Ok(()) => info!("Translation service is up at {}", config.api.base_url),
                Err(e) => warn!("Translation service at {} did not answer /healthz: {}", config.api.base_url, e),
            }
        }

        let api: Arc<dyn TranslationApi> = api;
        let translator = TranslatorFactory::create_translator(api, &config.api);
        Ok(Self::with_components(config, media, translator))
    }

    pub fn with_components(
        config: Config,
        media: Box<dyn MediaToolsTrait>,
        translator: Box<dyn SubtitleTranslator>,
    ) -> Self {
        let policy = SelectionPolicy::from_config(&config.languages);
        Self {
            config,
            policy,
            media,
            translator,
        }
    }

    /// Process every media file below `root`, one at a time
    pub async fn process_directory<P: AsRef<Path>>(&self, root: P) -> Result<RunSummary> {
        let root = root.as_ref();
        info!("Processing directory: {}", root.display());

        let files = library::discover(root, &self.config.library.extensions, self.config.library.follow_links)?;
        info!("Found {} media files to process", files.len());

        let mut summary = RunSummary::start();
        for media in &files {
            let outcome = self.process_media_file(media, root).await;
            summary.record(outcome);
        }
        summary.finish();

        info!("Run complete: {}", summary);
        Ok(summary)
    }

    /// Run the per-file pipeline. Failures are logged and folded into the
    /// returned outcome, never propagated.
    pub async fn process_media_file(&self, media: &MediaFile, root: &Path) -> FileOutcome {
        let label = display_path(media.path(), root);

        let sidecars = sidecar::scan(media.directory(), media.basename(), &self.policy.sidecar_codes()).await;
        let streams = if self.policy.has_usable_sidecar(&sidecars) {
            debug!("{}: usable sidecar present, not probing", label);
            Vec::new()
        } else {
            self.media.probe_subtitles(media.path()).await
        };

        match selection::select(&sidecars, &streams, &self.policy) {
            SelectionDecision::AlreadySatisfied(SatisfiedBy::Sidecar { code, .. }) => {
                info!("{}: HAS {} SIDECAR - skip", label, code.to_uppercase());
                FileOutcome::Skipped
            }
            SelectionDecision::AlreadySatisfied(SatisfiedBy::Embedded { index }) => {
                info!("{}: HAS TARGET STREAM #{} - skip", label, index);
                FileOutcome::Skipped
            }
            SelectionDecision::Unavailable(UnavailableReason::NeedsOcr) => {
                warn!("{}: NEEDS OCR - only bitmap subtitles in the source language", label);
                FileOutcome::Skipped
            }
            SelectionDecision::Unavailable(reason) => {
                info!("{}: NO SOURCE ({})", label, reason);
                FileOutcome::Skipped
            }
            SelectionDecision::UseSidecar(path) => {
                info!("{}: USE SIDECAR {}", label, file_name(&path));
                self.translate_source(&label, &path, false).await
            }
            SelectionDecision::UseEmbedded(stream) => {
                let output = media.subtitle_path(&language::filename_suffix(&self.config.languages.source));
                info!(
                    "{}: EXTRACT stream #{} ({}) -> {}",
                    label,
                    stream.index,
                    stream.codec,
                    file_name(&output)
                );
                match self.media.extract_subtitle(media.path(), stream.index, &output).await {
                    Ok(extracted) => self.translate_source(&label, &extracted, true).await,
                    Err(e) => {
                        warn!("{}: FAIL extract: {}", label, e);
                        FileOutcome::Failed
                    }
                }
            }
        }
    }

    async fn translate_source(&self, label: &str, input: &Path, extracted: bool) -> FileOutcome {
        let languages = &self.config.languages;

        let output = match translated_output_path(input, &languages.target) {
            Ok(output) => output,
            Err(e) => {
                warn!("{}: FAIL xlate: {}", label, e);
                return FileOutcome::Failed;
            }
        };
        if is_nonempty_file(&output).await {
            info!("{}: SKIP exists {}", label, file_name(&output));
            return FileOutcome::Skipped;
        }

        info!(
            "{}: XLATE {} ({} -> {}, engine {})",
            label,
            file_name(input),
            languages.source,
            languages.target,
            self.config.api.engine
        );
        let result = self
            .translator
            .translate(input, &languages.source, &languages.target, self.config.api.engine)
            .await;

        match result {
            Ok(outcome) if outcome.skipped_existing => {
                info!("{}: SKIP exists {}", label, file_name(&outcome.output));
                FileOutcome::Skipped
            }
            Ok(outcome) => {
                info!("{}: wrote {}", label, file_name(&outcome.output));
                if extracted && self.config.library.cleanup_extracted {
                    remove_extracted(label, input).await;
                }
                FileOutcome::Translated
            }
            Err(e) => {
                warn!("{}: FAIL xlate: {}", label, e);
                FileOutcome::Failed
            }
        }
    }
}

async fn remove_extracted(label: &str, path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => info!("{}: removed extracted {}", label, file_name(path)),
        Err(e) => warn!("{}: could not remove {}: {}", label, path.display(), e),
    }
}

fn display_path(path: &Path, root: &Path) -> String {
    pathdiff::diff_paths(path, root)
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(path))
        .display()
        .to_string()
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SubliftError;
    use crate::media::{MockMediaToolsTrait, SubtitleStreamDescriptor};
    use crate::translate::{ProgressStream, TranslationJob};
    use assert_fs::prelude::*;
    use async_trait::async_trait;
    use bytes::Bytes;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const SOURCE: &str = "1\n00:00:01,000 --> 00:00:02,000\nHello\n";
    const TRANSLATED: &str = "1\n00:00:01,000 --> 00:00:02,000\nHei\n";

    /// Service that answers every submission with `TRANSLATED`, or with a
    /// client error when `reject` is set.
    #[derive(Default)]
    struct CountingApi {
        submissions: AtomicUsize,
        reject: bool,
    }

    impl CountingApi {
        fn submissions(&self) -> usize {
            self.submissions.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl TranslationApi for CountingApi {
        async fn submit(&self, _job: &TranslationJob, _content: Bytes) -> Result<Bytes> {
            self.submissions.fetch_add(1, Ordering::SeqCst);
            if self.reject {
                return Err(SubliftError::Api {
                    status: 400,
                    message: "unsupported language".to_string(),
                });
            }
            Ok(Bytes::from(TRANSLATED))
        }

        async fn subscribe_progress(&self, _token: &str) -> Result<ProgressStream> {
            Ok(Box::pin(futures_util::stream::empty()))
        }
    }

    fn test_config() -> Config {
        let mut config = Config::default();
        config.api.observe_progress = false;
        config
    }

    fn workflow(config: Config, media: MockMediaToolsTrait, api: Arc<CountingApi>) -> Workflow {
        let translator = TranslatorFactory::create_translator(api, &config.api);
        Workflow::with_components(config, Box::new(media), translator)
    }

    fn stream(index: u32, codec: &str, language: &str, title: Option<&str>) -> SubtitleStreamDescriptor {
        SubtitleStreamDescriptor {
            index,
            codec: codec.to_string(),
            language: Some(language.to_string()),
            title: title.map(|t| t.to_string()),
            hearing_impaired: false,
        }
    }

    #[tokio::test]
    async fn test_target_sidecar_skips_without_probe_or_submission() {
        let temp = assert_fs::TempDir::new().unwrap();
        temp.child("Movie.mkv").touch().unwrap();
        temp.child("Movie.nor.srt").write_str(TRANSLATED).unwrap();

        let mut media = MockMediaToolsTrait::new();
        media.expect_probe_subtitles().never();
        media.expect_extract_subtitle().never();
        let api = Arc::new(CountingApi::default());

        let summary = workflow(test_config(), media, api.clone())
            .process_directory(temp.path())
            .await
            .unwrap();

        assert_eq!(summary.scanned, 1);
        assert_eq!(summary.skipped, 1);
        assert_eq!(api.submissions(), 0);
    }

    #[tokio::test]
    async fn test_source_sidecar_is_translated() {
        let temp = assert_fs::TempDir::new().unwrap();
        temp.child("Show - S01E03.mkv").touch().unwrap();
        temp.child("Show - S01E03.eng.srt").write_str(SOURCE).unwrap();

        let mut media = MockMediaToolsTrait::new();
        media.expect_probe_subtitles().never();
        let api = Arc::new(CountingApi::default());

        let summary = workflow(test_config(), media, api.clone())
            .process_directory(temp.path())
            .await
            .unwrap();

        assert_eq!(summary.translated, 1);
        assert_eq!(api.submissions(), 1);
        temp.child("Show - S01E03.nb.srt").assert(TRANSLATED);
    }

    #[tokio::test]
    async fn test_second_run_submits_nothing() {
        let temp = assert_fs::TempDir::new().unwrap();
        temp.child("a/Movie.mkv").touch().unwrap();
        temp.child("a/Movie.en.srt").write_str(SOURCE).unwrap();
        temp.child("b/Other.mp4").touch().unwrap();
        temp.child("b/Other.eng.srt").write_str(SOURCE).unwrap();

        let api = Arc::new(CountingApi::default());

        let first = workflow(test_config(), MockMediaToolsTrait::new(), api.clone())
            .process_directory(temp.path())
            .await
            .unwrap();
        assert_eq!(first.translated, 2);
        assert_eq!(api.submissions(), 2);

        let second = workflow(test_config(), MockMediaToolsTrait::new(), api.clone())
            .process_directory(temp.path())
            .await
            .unwrap();
        assert_eq!(second.translated, 0);
        assert_eq!(second.skipped, 2);
        assert_eq!(api.submissions(), 2);
    }

    #[tokio::test]
    async fn test_embedded_stream_is_extracted_then_translated() {
        let temp = assert_fs::TempDir::new().unwrap();
        temp.child("Movie.mkv").touch().unwrap();

        let mut media = MockMediaToolsTrait::new();
        media.expect_probe_subtitles().times(1).returning(|_| {
            vec![
                stream(2, "subrip", "eng", Some("English SDH")),
                stream(5, "subrip", "eng", Some("English")),
            ]
        });
        media
            .expect_extract_subtitle()
            .withf(|_, index, output| *index == 5 && output.ends_with("Movie.en.srt"))
            .times(1)
            .returning(|_, _, output| {
                std::fs::write(output, SOURCE).unwrap();
                Ok(output.to_path_buf())
            });
        let api = Arc::new(CountingApi::default());

        let summary = workflow(test_config(), media, api.clone())
            .process_directory(temp.path())
            .await
            .unwrap();

        assert_eq!(summary.translated, 1);
        temp.child("Movie.nb.srt").assert(TRANSLATED);
        assert!(temp.child("Movie.en.srt").path().exists());
    }

    #[tokio::test]
    async fn test_cleanup_removes_only_extracted_source() {
        let temp = assert_fs::TempDir::new().unwrap();
        temp.child("Movie.mkv").touch().unwrap();
        temp.child("Show.mkv").touch().unwrap();
        temp.child("Show.en.srt").write_str(SOURCE).unwrap();

        let mut media = MockMediaToolsTrait::new();
        media
            .expect_probe_subtitles()
            .times(1)
            .returning(|_| vec![stream(3, "ass", "eng", None)]);
        media.expect_extract_subtitle().times(1).returning(|_, _, output| {
            std::fs::write(output, SOURCE).unwrap();
            Ok(output.to_path_buf())
        });
        let mut config = test_config();
        config.library.cleanup_extracted = true;
        let api = Arc::new(CountingApi::default());

        let summary = workflow(config, media, api)
            .process_directory(temp.path())
            .await
            .unwrap();

        assert_eq!(summary.translated, 2);
        assert!(!temp.child("Movie.en.srt").path().exists());
        temp.child("Show.en.srt").assert(SOURCE);
    }

    #[tokio::test]
    async fn test_extraction_failure_does_not_stop_run() {
        let temp = assert_fs::TempDir::new().unwrap();
        temp.child("A.mkv").touch().unwrap();
        temp.child("B.mkv").touch().unwrap();
        temp.child("B.eng.srt").write_str(SOURCE).unwrap();

        let mut media = MockMediaToolsTrait::new();
        media
            .expect_probe_subtitles()
            .times(1)
            .returning(|_| vec![stream(0, "subrip", "eng", None)]);
        media
            .expect_extract_subtitle()
            .times(1)
            .returning(|_, _, _| Err(SubliftError::Extraction("ffmpeg exited with 1".to_string())));
        let api = Arc::new(CountingApi::default());

        let summary = workflow(test_config(), media, api.clone())
            .process_directory(temp.path())
            .await
            .unwrap();

        assert_eq!(summary.scanned, 2);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.translated, 1);
        assert_eq!(api.submissions(), 1);
    }

    #[tokio::test]
    async fn test_bitmap_only_is_skipped_without_extraction() {
        let temp = assert_fs::TempDir::new().unwrap();
        temp.child("Movie.mkv").touch().unwrap();

        let mut media = MockMediaToolsTrait::new();
        media
            .expect_probe_subtitles()
            .times(1)
            .returning(|_| vec![stream(4, "hdmv_pgs_subtitle", "eng", None)]);
        media.expect_extract_subtitle().never();
        let api = Arc::new(CountingApi::default());

        let summary = workflow(test_config(), media, api.clone())
            .process_directory(temp.path())
            .await
            .unwrap();

        assert_eq!(summary.skipped, 1);
        assert_eq!(api.submissions(), 0);
    }

    #[tokio::test]
    async fn test_rejected_translation_counts_as_failed() {
        let temp = assert_fs::TempDir::new().unwrap();
        temp.child("Movie.mkv").touch().unwrap();
        temp.child("Movie.en.srt").write_str(SOURCE).unwrap();

        let api = Arc::new(CountingApi {
            reject: true,
            ..Default::default()
        });

        let summary = workflow(test_config(), MockMediaToolsTrait::new(), api)
            .process_directory(temp.path())
            .await
            .unwrap();

        assert_eq!(summary.failed, 1);
        assert!(!temp.child("Movie.nb.srt").path().exists());
    }

    #[tokio::test]
    async fn test_missing_root_is_an_error() {
        let api = Arc::new(CountingApi::default());
        let result = workflow(test_config(), MockMediaToolsTrait::new(), api)
            .process_directory("/definitely/not/here")
            .await;
        assert!(matches!(result, Err(SubliftError::FileNotFound(_))));
    }

    #[test]
    fn test_display_path_is_relative_to_root() {
        let root = Path::new("/library");
        assert_eq!(display_path(Path::new("/library/Show/E01.mkv"), root), "Show/E01.mkv");
        assert_eq!(display_path(Path::new("/library"), root), "/library");
    }
}
