use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use uuid::Uuid;

use crate::error::{Result, SubliftError};

/// Translation engine requested from the service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Engine {
    /// Let the service pick, falling back between engines
    Auto,
    Nllb,
    Libre,
    Argos,
    Ct2,
}

impl Engine {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::Nllb => "nllb",
            Self::Libre => "libre",
            Self::Argos => "argos",
            Self::Ct2 => "ct2",
        }
    }
}

impl fmt::Display for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Created,
    Submitted,
    Polling,
    Finished,
    Failed,
}

impl JobState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Finished | Self::Failed)
    }

    fn can_advance_to(&self, next: JobState) -> bool {
        use JobState::*;
        matches!(
            (*self, next),
            (Created, Submitted)
                // idempotent skip: output already present
                | (Created, Finished)
                | (Submitted, Polling)
                | (Submitted, Finished)
                | (Submitted, Failed)
                | (Polling, Finished)
                | (Polling, Failed)
        )
    }
}

/// One submission of a subtitle file to the translation service.
#[derive(Debug, Clone)]
pub struct TranslationJob {
    pub token: String,
    pub input: PathBuf,
    pub output: PathBuf,
    pub source: String,
    pub target: String,
    pub engine: Engine,
    state: JobState,
}

impl TranslationJob {
    pub fn new(input: PathBuf, output: PathBuf, source: &str, target: &str, engine: Engine) -> Self {
        Self {
            token: Uuid::new_v4().simple().to_string(),
            input,
            output,
            source: source.to_string(),
            target: target.to_string(),
            engine,
            state: JobState::Created,
        }
    }

    pub fn state(&self) -> JobState {
        self.state
    }

    pub fn advance(&mut self, next: JobState) -> Result<()> {
        if !self.state.can_advance_to(next) {
            return Err(SubliftError::Translation(format!(
                "invalid job transition {:?} -> {:?}",
                self.state, next
            )));
        }
        self.state = next;
        Ok(())
    }

    /// File name sent with the multipart upload
    pub fn upload_name(&self) -> String {
        self.input
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "subtitle.srt".to_string())
    }
}
