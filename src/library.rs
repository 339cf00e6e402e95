//! Media file discovery and the deterministic naming scheme for subtitles
//! stored beside them.

use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

use crate::error::{Result, SubliftError};
use crate::language;

/// A media file found in the library.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaFile {
    path: PathBuf,
    extension: String,
    basename: String,
}

impl MediaFile {
    /// Build a `MediaFile` if `path` carries one of the allowed extensions.
    pub fn from_path<P: AsRef<Path>>(path: P, extensions: &[String]) -> Option<Self> {
        let path = path.as_ref();
        let extension = path.extension()?.to_str()?.to_lowercase();
        if !extensions.iter().any(|e| e.eq_ignore_ascii_case(&extension)) {
            return None;
        }
        let basename = path.file_stem()?.to_str()?.to_string();

        Some(Self {
            path: path.to_path_buf(),
            extension,
            basename,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn extension(&self) -> &str {
        &self.extension
    }

    pub fn basename(&self) -> &str {
        &self.basename
    }

    pub fn directory(&self) -> &Path {
        self.path.parent().unwrap_or_else(|| Path::new("."))
    }

    /// `<dir>/<basename>.<code>.srt`
    pub fn subtitle_path(&self, code: &str) -> PathBuf {
        self.directory().join(subtitle_file_name(&self.basename, code))
    }
}

pub fn subtitle_file_name(basename: &str, code: &str) -> String {
    format!("{}.{}.srt", basename, code)
}

/// Output path for translating the subtitle at `input` into `target`.
///
/// A trailing language segment on the input (`Show.eng.srt`) is dropped, so
/// the translation lands at `Show.<suffix>.srt` next to it.
pub fn translated_output_path(input: &Path, target: &str) -> Result<PathBuf> {
    let stem = input
        .file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(|| SubliftError::Config(format!("Invalid subtitle filename: {}", input.display())))?;

    let basename = match stem.rsplit_once('.') {
        Some((base, code)) if language::is_known_alias(code) || language::is_flores_code(code) => base,
        _ => stem,
    };

    let dir = input.parent().unwrap_or_else(|| Path::new("."));
    Ok(dir.join(subtitle_file_name(basename, &language::filename_suffix(target))))
}

/// Whether `path` exists as a regular file with at least one byte.
pub async fn is_nonempty_file(path: &Path) -> bool {
    match tokio::fs::metadata(path).await {
        Ok(meta) => meta.is_file() && meta.len() > 0,
        Err(_) => false,
    }
}

/// Walk `root` and collect media files, sorted by path.
pub fn discover<P: AsRef<Path>>(root: P, extensions: &[String], follow_links: bool) -> Result<Vec<MediaFile>> {
    let root = root.as_ref();
    if !root.is_dir() {
        return Err(SubliftError::FileNotFound(root.display().to_string()));
    }

    let mut files: Vec<MediaFile> = WalkDir::new(root)
        .follow_links(follow_links)
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                debug!("Skipping unreadable entry: {}", e);
                None
            }
        })
        .filter(|entry| entry.file_type().is_file())
        .filter_map(|entry| MediaFile::from_path(entry.path(), extensions))
        .collect();

    files.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(files)
}
