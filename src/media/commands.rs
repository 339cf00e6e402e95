use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::debug;

use crate::error::{Result, SubliftError};

/// Abstract external tool invocation
#[derive(Debug, Clone)]
pub struct MediaCommand {
    pub binary_path: String,
    pub args: Vec<String>,
    pub description: String,
    pub timeout: Option<Duration>,
}

/// Captured result of a finished command
#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub success: bool,
    pub code: Option<i32>,
    pub stdout: Vec<u8>,
    pub stderr: String,
}

impl MediaCommand {
    /// Create a new command
    pub fn new<S1: Into<String>, S2: Into<String>>(binary_path: S1, description: S2) -> Self {
        Self {
            binary_path: binary_path.into(),
            args: Vec::new(),
            description: description.into(),
            timeout: None,
        }
    }

    /// Add an argument
    pub fn arg<S: Into<String>>(mut self, arg: S) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Add multiple arguments
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(|s| s.into()));
        self
    }

    /// Add input file
    pub fn input<P: AsRef<Path>>(self, path: P) -> Self {
        self.arg("-i").arg(path.as_ref().to_string_lossy().to_string())
    }

    /// Add output file
    pub fn output<P: AsRef<Path>>(self, path: P) -> Self {
        self.arg(path.as_ref().to_string_lossy().to_string())
    }

    /// Force overwrite output
    pub fn overwrite(self) -> Self {
        self.arg("-y")
    }

    /// Only report errors on stderr
    pub fn quiet(self) -> Self {
        self.arg("-v").arg("error")
    }

    /// Map a single absolute stream index from the first input
    pub fn map_stream(self, index: u32) -> Self {
        self.arg("-map").arg(format!("0:{}", index))
    }

    /// Set subtitle codec
    pub fn subtitle_codec<S: Into<String>>(self, codec: S) -> Self {
        self.arg("-c:s").arg(codec)
    }

    /// Kill the process if it runs longer than `timeout`
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Run the command and capture its output.
    ///
    /// A non-zero exit is reported in the returned output, not as an error.
    /// Errors are reserved for spawn failures and timeouts.
    pub async fn run(&self) -> Result<CommandOutput> {
        debug!("Executing {}: {} {:?}", self.description, self.binary_path, self.args);

        let child = Command::new(&self.binary_path)
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| SubliftError::Precondition(format!("Failed to execute {}: {}", self.binary_path, e)))?;

        let output = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, child.wait_with_output())
                .await
                .map_err(|_| {
                    SubliftError::ToolTimeout(format!("{} timed out after {}s", self.description, limit.as_secs()))
                })??,
            None => child.wait_with_output().await?,
        };

        Ok(CommandOutput {
            success: output.status.success(),
            code: output.status.code(),
            stdout: output.stdout,
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        })
    }

    /// Run the command and fail on a non-zero exit
    pub async fn execute(&self) -> Result<CommandOutput> {
        let output = self.run().await?;
        if !output.success {
            return Err(SubliftError::Extraction(format!(
                "{} failed ({}): {}",
                self.description,
                output.code.map_or_else(|| "signal".to_string(), |c| c.to_string()),
                output.stderr
            )));
        }
        Ok(output)
    }
}

/// Builder for the ffprobe/ffmpeg invocations the pipeline needs
pub struct MediaCommandBuilder {
    ffprobe_path: String,
    ffmpeg_path: String,
}

impl MediaCommandBuilder {
    /// Create a new command builder
    pub fn new<S1: Into<String>, S2: Into<String>>(ffprobe_path: S1, ffmpeg_path: S2) -> Self {
        Self {
            ffprobe_path: ffprobe_path.into(),
            ffmpeg_path: ffmpeg_path.into(),
        }
    }

    /// List subtitle streams with the fields the selector needs
    pub fn probe_subtitles<P: AsRef<Path>>(&self, media_path: P) -> MediaCommand {
        MediaCommand::new(&self.ffprobe_path, "Subtitle probe")
            .quiet()
            .args(["-select_streams", "s"])
            .args([
                "-show_entries",
                "stream=index,codec_name,codec_type:stream_tags=language,title:stream_disposition=hearing_impaired",
            ])
            .args(["-of", "json"])
            .output(media_path)
    }

    /// Demux one subtitle stream into a standalone SRT file
    pub fn extract_subtitle<P: AsRef<Path>>(&self, media_path: P, stream_index: u32, output_path: P) -> MediaCommand {
        MediaCommand::new(&self.ffmpeg_path, format!("Subtitle extraction (stream {})", stream_index))
            .arg("-nostdin")
            .quiet()
            .overwrite()
            .input(media_path)
            .map_stream(stream_index)
            .subtitle_codec("srt")
            .output(output_path)
    }

    /// Build version check commands for both tools
    pub fn version_checks(&self) -> [MediaCommand; 2] {
        [
            MediaCommand::new(&self.ffprobe_path, "ffprobe version check").arg("-version"),
            MediaCommand::new(&self.ffmpeg_path, "ffmpeg version check").arg("-version"),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_probe_args() {
        let builder = MediaCommandBuilder::new("ffprobe", "ffmpeg");
        let cmd = builder.probe_subtitles("/tv/a.mkv");
        assert_eq!(cmd.binary_path, "ffprobe");
        assert_eq!(&cmd.args[..4], &["-v", "error", "-select_streams", "s"]);
        assert_eq!(cmd.args.last().map(String::as_str), Some("/tv/a.mkv"));
        assert!(cmd.args.contains(&"json".to_string()));
    }

    #[test]
    fn test_extract_args() {
        let builder = MediaCommandBuilder::new("ffprobe", "/opt/ffmpeg");
        let cmd = builder.extract_subtitle("/tv/a.mkv", 5, "/tv/a.en.srt");
        assert_eq!(cmd.binary_path, "/opt/ffmpeg");
        let expected = [
            "-nostdin", "-v", "error", "-y", "-i", "/tv/a.mkv", "-map", "0:5", "-c:s", "srt", "/tv/a.en.srt",
        ];
        assert_eq!(cmd.args, expected);
    }

    #[tokio::test]
    async fn test_missing_binary_is_precondition_error() {
        let cmd = MediaCommand::new("/definitely/not/a/tool", "missing").arg("-version");
        assert!(matches!(cmd.run().await, Err(SubliftError::Precondition(_))));
    }
}
