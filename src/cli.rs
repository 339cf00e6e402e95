use clap::builder::FalseyValueParser;
use clap::{ArgAction, Parser};
use std::path::PathBuf;

use crate::config::Overrides;
use crate::translate::Engine;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Root directory of the media library to scan
    #[arg(required_unless_present = "dump_config")]
    pub root: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Configuration file path (defaults to ./sublift.toml when present)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Base URL of the translation service
    #[arg(long, env = "SUBLIFT_API_URL")]
    pub api_url: Option<String>,

    /// Source language code (e.g. en, eng_Latn)
    #[arg(long, env = "SUBLIFT_SOURCE")]
    pub source: Option<String>,

    /// Target language code (e.g. nb, nob_Latn)
    #[arg(long, env = "SUBLIFT_TARGET")]
    pub target: Option<String>,

    /// Translation engine requested from the service
    #[arg(long, value_enum, env = "SUBLIFT_ENGINE")]
    pub engine: Option<Engine>,

    /// Delete extracted source subtitles after a successful translation
    #[arg(long, env = "SUBLIFT_CLEANUP", action = ArgAction::SetTrue, value_parser = FalseyValueParser::new())]
    pub cleanup: bool,

    /// Do not subscribe to the progress stream
    #[arg(long, env = "SUBLIFT_NO_PROGRESS", action = ArgAction::SetTrue, value_parser = FalseyValueParser::new())]
    pub no_progress: bool,

    /// Print the effective configuration as TOML and exit
    #[arg(long)]
    pub dump_config: bool,
}

impl Args {
    /// Values that take precedence over the configuration file
    pub fn overrides(&self) -> Overrides {
        Overrides {
            base_url: self.api_url.clone(),
            source: self.source.clone(),
            target: self.target.clone(),
            engine: self.engine,
            cleanup_extracted: self.cleanup.then_some(true),
            observe_progress: self.no_progress.then_some(false),
        }
    }
}
