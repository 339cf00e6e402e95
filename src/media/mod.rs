// External media tooling
//
// This module wraps the two external collaborators the pipeline depends on:
// - Probe: ffprobe inventory of embedded subtitle streams
// - Extract: ffmpeg demux of one stream into a standalone SRT
// - Commands: command builders and process execution

pub mod commands;
pub mod probe;
pub mod processor;

use async_trait::async_trait;
use std::path::{Path, PathBuf};

pub use commands::*;
pub use probe::SubtitleStreamDescriptor;
pub use processor::*;

use crate::config::MediaConfig;
use crate::error::Result;

/// Main trait for media tool operations
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MediaToolsTrait: Send + Sync {
    /// List embedded subtitle streams. Never fails: an unreadable file,
    /// a timeout or a non-zero exit all yield an empty list.
    async fn probe_subtitles(&self, media_path: &Path) -> Vec<SubtitleStreamDescriptor>;

    /// Materialize `stream_index` as an SRT file at `output_path`.
    /// A non-empty file already at `output_path` is reused as-is.
    async fn extract_subtitle(&self, media_path: &Path, stream_index: u32, output_path: &Path) -> Result<PathBuf>;

    /// Check that the probing and demuxing tools can be executed
    async fn check_availability(&self) -> Result<()>;
}

/// Factory for creating media tool instances
pub struct MediaToolsFactory;

impl MediaToolsFactory {
    /// Create the default implementation (ffprobe + ffmpeg)
    pub fn create(config: MediaConfig) -> Box<dyn MediaToolsTrait> {
        Box::new(processor::FfmpegTools::new(config))
    }
}
