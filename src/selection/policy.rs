//! Pure classification rules used by the track selector.
//!
//! Nothing here touches the filesystem or spawns processes, so every rule can
//! be exercised directly from unit tests.

use std::collections::HashSet;

use crate::config::LanguageConfig;
use crate::sidecar::SidecarMap;

/// Whether a caption track transcribes dialogue only or also sound cues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum CaptionKind {
    Normal,
    HearingImpaired,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodecClass {
    /// Convertible to SRT text
    Text,
    /// Rendered images, would need OCR
    Bitmap,
    Other,
}

#[derive(Debug, Clone, Copy)]
enum MarkerMatch {
    /// Marker may appear anywhere in the text
    Substring,
    /// Marker must be a whole word, short markers would hit ordinary words
    Word,
}

const CAPTION_MARKERS: &[(&str, MarkerMatch)] = &[
    ("sdh", MarkerMatch::Substring),
    ("hearing", MarkerMatch::Substring),
    ("hearing-impaired", MarkerMatch::Substring),
    ("closed caption", MarkerMatch::Substring),
    ("hi", MarkerMatch::Word),
    ("cc", MarkerMatch::Word),
];

const TEXT_CODECS: &[&str] = &[
    "subrip", "srt", "ass", "ssa", "webvtt", "mov_text", "text", "ttml", "microdvd", "subviewer",
    "subviewer1", "realtext", "sami", "mpl2", "pjs", "vplayer", "stl", "jacosub",
];

const BITMAP_CODECS: &[&str] = &[
    "hdmv_pgs_subtitle", "pgssub", "dvd_subtitle", "dvdsub", "dvb_subtitle", "dvbsub", "xsub",
    "vobsub",
];

pub fn classify_codec(codec: &str) -> CodecClass {
    let codec = codec.trim().to_lowercase();
    if TEXT_CODECS.contains(&codec.as_str()) {
        CodecClass::Text
    } else if BITMAP_CODECS.contains(&codec.as_str()) {
        CodecClass::Bitmap
    } else {
        CodecClass::Other
    }
}

/// Classify from free-text tags plus the container's hearing-impaired flag.
pub fn classify_caption(title: Option<&str>, language: Option<&str>, hearing_impaired: bool) -> CaptionKind {
    if hearing_impaired {
        return CaptionKind::HearingImpaired;
    }

    let marked = [title, language]
        .into_iter()
        .flatten()
        .any(has_caption_marker);

    if marked {
        CaptionKind::HearingImpaired
    } else {
        CaptionKind::Normal
    }
}

fn has_caption_marker(text: &str) -> bool {
    let lowered = text.to_lowercase();
    let words: Vec<&str> = lowered.split(|c: char| !c.is_alphanumeric()).collect();

    CAPTION_MARKERS.iter().any(|(marker, mode)| match mode {
        MarkerMatch::Substring => lowered.contains(marker),
        MarkerMatch::Word => words.contains(marker),
    })
}

/// Primary subtag of a language tag, lowercased (`en-US` -> `en`).
pub fn primary_language(tag: &str) -> String {
    tag.trim()
        .split(['-', '_'])
        .next()
        .unwrap_or("")
        .to_lowercase()
}

/// Language preferences the selector works against. Built once per run and
/// passed by reference, never mutated.
#[derive(Debug, Clone)]
pub struct SelectionPolicy {
    source_codes: Vec<String>,
    target_codes: Vec<String>,
}

impl SelectionPolicy {
    pub fn new<S: AsRef<str>>(source_codes: &[S], target_codes: &[S]) -> Self {
        let lower = |codes: &[S]| codes.iter().map(|c| c.as_ref().trim().to_lowercase()).collect();
        Self {
            source_codes: lower(source_codes),
            target_codes: lower(target_codes),
        }
    }

    pub fn from_config(config: &LanguageConfig) -> Self {
        Self::new(&config.source_aliases, &config.target_aliases)
    }

    pub fn source_codes(&self) -> &[String] {
        &self.source_codes
    }

    pub fn target_codes(&self) -> &[String] {
        &self.target_codes
    }

    pub fn is_source(&self, code: &str) -> bool {
        let code = primary_language(code);
        self.source_codes.iter().any(|c| *c == code)
    }

    pub fn is_target(&self, code: &str) -> bool {
        let code = primary_language(code);
        self.target_codes.iter().any(|c| *c == code)
    }

    /// Codes the sidecar scanner should pick up.
    pub fn sidecar_codes(&self) -> HashSet<String> {
        self.source_codes.iter().chain(&self.target_codes).cloned().collect()
    }

    /// A sidecar in either language settles the file without probing.
    pub fn has_usable_sidecar(&self, sidecars: &SidecarMap) -> bool {
        sidecars.keys().any(|code| self.is_source(code) || self.is_target(code))
    }
}

impl Default for SelectionPolicy {
    fn default() -> Self {
        Self::from_config(&LanguageConfig::default())
    }
}
