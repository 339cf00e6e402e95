//! Sublift - Unattended subtitle acquisition and translation
//!
//! Finds a source-language subtitle for every file in a media library, either
//! beside it or embedded in the container, and has it translated by a remote
//! translation service.

pub mod cli;
pub mod config;
pub mod error;
pub mod language;
pub mod library;
pub mod media;
pub mod selection;
pub mod sidecar;
pub mod translate;
pub mod workflow;
