use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{Result, SubliftError};
use crate::language;
use crate::translate::Engine;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub api: ApiConfig,
    pub languages: LanguageConfig,
    pub media: MediaConfig,
    pub library: LibraryConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Base URL of the translation service
    pub base_url: String,
    /// Translation engine requested from the service
    pub engine: Engine,
    /// Retries after a transient network failure
    pub max_retries: u32,
    /// Fixed delay between retries, in seconds
    pub retry_delay_secs: u64,
    /// Upper bound for a single /translate request
    pub request_timeout_secs: u64,
    pub connect_timeout_secs: u64,
    /// Subscribe to the progress stream while a job runs
    pub observe_progress: bool,
    /// Probe /healthz before processing the library
    pub check_health: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LanguageConfig {
    /// Language submitted as `source`
    pub source: String,
    /// Language submitted as `target`
    pub target: String,
    /// Codes that identify a usable source track or sidecar
    pub source_aliases: Vec<String>,
    /// Codes that mean the target language is already present
    pub target_aliases: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaConfig {
    /// Path to ffprobe binary
    pub ffprobe_path: String,
    /// Path to ffmpeg binary
    pub ffmpeg_path: String,
    pub probe_timeout_secs: u64,
    pub extract_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LibraryConfig {
    /// Container extensions considered media files (lowercase, no dot)
    pub extensions: Vec<String>,
    /// Delete extracted source subtitles once their translation succeeded
    pub cleanup_extracted: bool,
    /// Follow symbolic links while walking the library
    pub follow_links: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            engine: Engine::Auto,
            max_retries: 3,
            retry_delay_secs: 5,
            request_timeout_secs: 900,
            connect_timeout_secs: 10,
            observe_progress: true,
            check_health: true,
        }
    }
}

impl Default for LanguageConfig {
    fn default() -> Self {
        Self {
            source: "en".to_string(),
            target: "nb".to_string(),
            source_aliases: vec!["en".to_string(), "eng".to_string()],
            target_aliases: ["no", "nor", "nob", "nb"].iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            ffprobe_path: "ffprobe".to_string(),
            ffmpeg_path: "ffmpeg".to_string(),
            probe_timeout_secs: 60,
            extract_timeout_secs: 600,
        }
    }
}

impl Default for LibraryConfig {
    fn default() -> Self {
        Self {
            extensions: ["mkv", "mp4", "m4v", "avi", "mov", "wmv", "ts", "webm"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            cleanup_extracted: false,
            follow_links: false,
        }
    }
}

/// Values supplied on the command line or through the environment.
/// Anything left as `None` keeps the value from the file or the default.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub base_url: Option<String>,
    pub source: Option<String>,
    pub target: Option<String>,
    pub engine: Option<Engine>,
    pub cleanup_extracted: Option<bool>,
    pub observe_progress: Option<bool>,
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| SubliftError::Config(format!("Failed to read config file: {}", e)))?;

        toml::from_str(&content)
            .map_err(|e| SubliftError::Config(format!("Failed to parse config file: {}", e)))
    }

    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| SubliftError::Config(format!("Failed to serialize config: {}", e)))
    }

    /// Apply command-line/environment values. Overriding a language also
    /// replaces its alias list, so sidecars are matched against the new one.
    pub fn apply_overrides(&mut self, overrides: &Overrides) {
        if let Some(url) = &overrides.base_url {
            self.api.base_url = url.clone();
        }
        if let Some(source) = &overrides.source {
            self.languages.source = source.clone();
            self.languages.source_aliases = language::aliases_for(source);
        }
        if let Some(target) = &overrides.target {
            self.languages.target = target.clone();
            self.languages.target_aliases = language::aliases_for(target);
        }
        if let Some(engine) = overrides.engine {
            self.api.engine = engine;
        }
        if let Some(cleanup) = overrides.cleanup_extracted {
            self.library.cleanup_extracted = cleanup;
        }
        if let Some(observe) = overrides.observe_progress {
            self.api.observe_progress = observe;
        }
    }

    pub fn validate(&self) -> Result<()> {
        let langs = &self.languages;
        if langs.source.trim().is_empty() || langs.target.trim().is_empty() {
            return Err(SubliftError::Config("Source and target languages must be set".to_string()));
        }
        if language::same_language(&langs.source, &langs.target) {
            return Err(SubliftError::Config(format!(
                "Source and target language are the same: {}",
                langs.source
            )));
        }
        if langs.source_aliases.is_empty() || langs.target_aliases.is_empty() {
            return Err(SubliftError::Config("Language alias lists must not be empty".to_string()));
        }
        if self.library.extensions.is_empty() {
            return Err(SubliftError::Config("No media extensions configured".to_string()));
        }
        if !(self.api.base_url.starts_with("http://") || self.api.base_url.starts_with("https://")) {
            return Err(SubliftError::Config(format!(
                "API base URL must be http(s): {}",
                self.api.base_url
            )));
        }
        Ok(())
    }
}
