//! Track selection
//!
//! Decides, per media file, where the source subtitle text comes from. The
//! decision is a pure function of the sidecar inventory, the probed streams and
//! the [`SelectionPolicy`]; it performs no I/O.

pub mod policy;

use std::fmt;
use std::path::PathBuf;

pub use policy::{CaptionKind, CodecClass, SelectionPolicy};

use crate::media::SubtitleStreamDescriptor;
use crate::sidecar::SidecarMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SatisfiedBy {
    Sidecar { code: String, path: PathBuf },
    Embedded { index: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnavailableReason {
    /// The container carries no subtitle streams at all
    NoSubtitleStreams,
    /// No stream is tagged with a source language
    NoSourceLanguage,
    /// Source-language streams exist but are all bitmap codecs
    NeedsOcr,
    /// Source-language streams exist but none has a convertible codec
    UnsupportedCodec,
}

impl fmt::Display for UnavailableReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::NoSubtitleStreams => "no subtitle streams",
            Self::NoSourceLanguage => "no source-language subtitles",
            Self::NeedsOcr => "needs OCR, unsupported",
            Self::UnsupportedCodec => "unsupported subtitle codec",
        };
        f.write_str(text)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionDecision {
    /// The target language is already present, nothing to do
    AlreadySatisfied(SatisfiedBy),
    /// Translate an existing source-language sidecar
    UseSidecar(PathBuf),
    /// Extract this embedded stream, then translate it
    UseEmbedded(SubtitleStreamDescriptor),
    Unavailable(UnavailableReason),
}

/// Choose the subtitle source for one media file.
///
/// Priority: target language present anywhere, then a source-language sidecar,
/// then the best text-codec embedded stream in the source language. Among
/// embedded candidates normal captions beat hearing-impaired ones and ties go
/// to the lowest stream index.
pub fn select(sidecars: &SidecarMap, streams: &[SubtitleStreamDescriptor], policy: &SelectionPolicy) -> SelectionDecision {
    if let Some((code, path)) = sidecars.iter().find(|(code, _)| policy.is_target(code)) {
        return SelectionDecision::AlreadySatisfied(SatisfiedBy::Sidecar {
            code: code.clone(),
            path: path.clone(),
        });
    }

    if let Some(stream) = streams.iter().find(|s| policy.is_target(language_tag(s))) {
        return SelectionDecision::AlreadySatisfied(SatisfiedBy::Embedded { index: stream.index });
    }

    // Configured alias order decides between e.g. `en` and `eng` sidecars
    if let Some(path) = policy.source_codes().iter().find_map(|code| sidecars.get(code)) {
        return SelectionDecision::UseSidecar(path.clone());
    }

    if streams.is_empty() {
        return SelectionDecision::Unavailable(UnavailableReason::NoSubtitleStreams);
    }

    let source_streams: Vec<&SubtitleStreamDescriptor> = streams
        .iter()
        .filter(|s| policy.is_source(language_tag(s)))
        .collect();

    if source_streams.is_empty() {
        return SelectionDecision::Unavailable(UnavailableReason::NoSourceLanguage);
    }

    let best = source_streams
        .iter()
        .filter(|s| s.codec_class() == CodecClass::Text)
        .min_by_key(|s| (s.caption_kind(), s.index));

    match best {
        Some(stream) => SelectionDecision::UseEmbedded((*stream).clone()),
        None if source_streams.iter().any(|s| s.codec_class() == CodecClass::Bitmap) => {
            SelectionDecision::Unavailable(UnavailableReason::NeedsOcr)
        }
        None => SelectionDecision::Unavailable(UnavailableReason::UnsupportedCodec),
    }
}

fn language_tag(stream: &SubtitleStreamDescriptor) -> &str {
    stream.language.as_deref().unwrap_or("")
}
