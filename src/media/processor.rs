use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

use super::probe::{SubtitleStreamDescriptor, parse_ffprobe_output};
use super::{MediaCommandBuilder, MediaToolsTrait};
use crate::config::MediaConfig;
use crate::error::{Result, SubliftError};
use crate::library::is_nonempty_file;

/// ffprobe/ffmpeg backed implementation of the media tools
pub struct FfmpegTools {
    config: MediaConfig,
    command_builder: MediaCommandBuilder,
}

impl FfmpegTools {
    pub fn new(config: MediaConfig) -> Self {
        let command_builder = MediaCommandBuilder::new(&config.ffprobe_path, &config.ffmpeg_path);

        Self {
            config,
            command_builder,
        }
    }

    async fn try_probe(&self, media_path: &Path) -> Result<Vec<SubtitleStreamDescriptor>> {
        let output = self
            .command_builder
            .probe_subtitles(media_path)
            .timeout(Duration::from_secs(self.config.probe_timeout_secs))
            .run()
            .await?;

        if !output.success {
            return Err(SubliftError::Probe(format!(
                "exit {}: {}",
                output.code.map_or_else(|| "signal".to_string(), |c| c.to_string()),
                output.stderr
            )));
        }

        parse_ffprobe_output(&output.stdout)
    }
}

#[async_trait]
impl MediaToolsTrait for FfmpegTools {
    async fn probe_subtitles(&self, media_path: &Path) -> Vec<SubtitleStreamDescriptor> {
        match self.try_probe(media_path).await {
            Ok(streams) => {
                debug!("Probed {} subtitle stream(s) in {}", streams.len(), media_path.display());
                streams
            }
            Err(e) => {
                debug!("Probe of {} found nothing: {}", media_path.display(), e);
                Vec::new()
            }
        }
    }

    async fn extract_subtitle(&self, media_path: &Path, stream_index: u32, output_path: &Path) -> Result<PathBuf> {
        if is_nonempty_file(output_path).await {
            info!("Reusing extracted subtitle {}", output_path.display());
            return Ok(output_path.to_path_buf());
        }

        let command = self
            .command_builder
            .extract_subtitle(media_path, stream_index, output_path)
            .timeout(Duration::from_secs(self.config.extract_timeout_secs));

        let result = match command.execute().await {
            Ok(_) if is_nonempty_file(output_path).await => Ok(output_path.to_path_buf()),
            Ok(_) => Err(SubliftError::Extraction(format!(
                "stream {} produced an empty subtitle",
                stream_index
            ))),
            Err(e @ SubliftError::Extraction(_)) => Err(e),
            Err(e) => Err(SubliftError::Extraction(e.to_string())),
        };

        if result.is_err() {
            if let Err(e) = tokio::fs::remove_file(output_path).await {
                if e.kind() != std::io::ErrorKind::NotFound {
                    warn!("Failed to remove {}: {}", output_path.display(), e);
                }
            }
        }

        result
    }

    async fn check_availability(&self) -> Result<()> {
        for command in self.command_builder.version_checks() {
            let description = command.description.clone();
            let output = command
                .timeout(Duration::from_secs(self.config.probe_timeout_secs))
                .run()
                .await
                .map_err(|e| SubliftError::Precondition(format!("{}: {}", description, e)))?;

            if !output.success {
                return Err(SubliftError::Precondition(format!("{} failed: {}", description, output.stderr)));
            }

            let version = String::from_utf8_lossy(&output.stdout);
            info!("{}", version.lines().next().unwrap_or("unknown version"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::os::unix::fs::PermissionsExt;

    fn tools(ffprobe: &str, ffmpeg: &str) -> FfmpegTools {
        FfmpegTools::new(MediaConfig {
            ffprobe_path: ffprobe.to_string(),
            ffmpeg_path: ffmpeg.to_string(),
            probe_timeout_secs: 5,
            extract_timeout_secs: 5,
        })
    }

    fn write_script(dir: &Path, name: &str, body: &str) -> String {
        let path = dir.join(name);
        std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path.to_string_lossy().to_string()
    }

    #[tokio::test]
    async fn test_probe_missing_tool_is_empty() {
        let tools = tools("/definitely/not/ffprobe", "ffmpeg");
        assert!(tools.probe_subtitles(Path::new("/tv/a.mkv")).await.is_empty());
    }

    #[tokio::test]
    async fn test_probe_parses_tool_output() {
        let dir = tempfile::tempdir().unwrap();
        let ffprobe = write_script(
            dir.path(),
            "ffprobe",
            r#"echo '{"streams":[{"index":3,"codec_name":"subrip","tags":{"language":"eng"}}]}'"#,
        );
        let tools = tools(&ffprobe, "ffmpeg");

        let streams = tools.probe_subtitles(Path::new("/tv/a.mkv")).await;
        assert_eq!(streams.len(), 1);
        assert_eq!(streams[0].index, 3);
        assert_eq!(streams[0].language.as_deref(), Some("eng"));
    }

    #[tokio::test]
    async fn test_probe_non_zero_exit_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let ffprobe = write_script(dir.path(), "ffprobe", "echo 'moov atom not found' >&2; exit 1");
        let tools = tools(&ffprobe, "ffmpeg");
        assert!(tools.probe_subtitles(Path::new("/tv/a.mkv")).await.is_empty());
    }

    #[tokio::test]
    async fn test_extract_reuses_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("a.en.srt");
        std::fs::write(&output, "1\n00:00:01,000 --> 00:00:02,000\nHello\n").unwrap();

        // The tool would fail to spawn if it were invoked
        let tools = tools("ffprobe", "/definitely/not/ffmpeg");
        let path = tools.extract_subtitle(Path::new("/tv/a.mkv"), 2, &output).await.unwrap();
        assert_eq!(path, output);
    }

    #[tokio::test]
    async fn test_extract_writes_output() {
        let dir = tempfile::tempdir().unwrap();
        let ffmpeg = write_script(
            dir.path(),
            "ffmpeg",
            r#"for last; do :; done; printf '1\n00:00:01,000 --> 00:00:02,000\nHello\n' > "$last""#,
        );
        let output = dir.path().join("a.en.srt");
        let tools = tools("ffprobe", &ffmpeg);

        let path = tools.extract_subtitle(Path::new("/tv/a.mkv"), 2, &output).await.unwrap();
        assert_eq!(path, output);
        assert!(std::fs::read_to_string(&output).unwrap().contains("Hello"));
    }

    #[tokio::test]
    async fn test_extract_empty_result_fails_and_cleans_up() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("a.en.srt");
        std::fs::write(&output, "").unwrap();
        // `true` exits cleanly without writing anything
        let tools = tools("ffprobe", "true");

        let err = tools.extract_subtitle(Path::new("/tv/a.mkv"), 2, &output).await.unwrap_err();
        assert!(matches!(err, SubliftError::Extraction(_)));
        assert!(!output.exists());
    }

    #[tokio::test]
    async fn test_extract_non_zero_exit_fails() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("a.en.srt");
        let tools = tools("ffprobe", "false");

        let err = tools.extract_subtitle(Path::new("/tv/a.mkv"), 2, &output).await.unwrap_err();
        assert!(matches!(err, SubliftError::Extraction(_)));
    }

    #[tokio::test]
    async fn test_check_availability_missing_tool() {
        let tools = tools("/definitely/not/ffprobe", "/definitely/not/ffmpeg");
        assert!(matches!(tools.check_availability().await, Err(SubliftError::Precondition(_))));
    }
}
