use serde::Deserialize;

use crate::error::Result;
use crate::selection::policy::{CaptionKind, CodecClass, classify_caption, classify_codec};

/// One subtitle stream inside a media container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubtitleStreamDescriptor {
    /// Absolute stream index within the container
    pub index: u32,
    /// Codec name as reported by the prober
    pub codec: String,
    pub language: Option<String>,
    pub title: Option<String>,
    /// Container disposition flag
    pub hearing_impaired: bool,
}

impl SubtitleStreamDescriptor {
    pub fn codec_class(&self) -> CodecClass {
        classify_codec(&self.codec)
    }

    pub fn caption_kind(&self) -> CaptionKind {
        classify_caption(self.title.as_deref(), self.language.as_deref(), self.hearing_impaired)
    }
}

// Structs for parsing ffprobe JSON output
#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    #[serde(default)]
    streams: Vec<FfprobeStream>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    index: u32,
    #[serde(default)]
    codec_name: Option<String>,
    #[serde(default)]
    codec_type: Option<String>,
    #[serde(default)]
    tags: FfprobeTags,
    #[serde(default)]
    disposition: FfprobeDisposition,
}

#[derive(Debug, Default, Deserialize)]
struct FfprobeTags {
    #[serde(default, alias = "LANGUAGE")]
    language: Option<String>,
    #[serde(default, alias = "TITLE")]
    title: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct FfprobeDisposition {
    #[serde(default)]
    hearing_impaired: u8,
}

/// Decode `ffprobe -of json` output into subtitle descriptors.
///
/// Streams that are explicitly typed as something other than subtitles are
/// dropped. Blank tags are treated as absent.
pub fn parse_ffprobe_output(stdout: &[u8]) -> Result<Vec<SubtitleStreamDescriptor>> {
    let output: FfprobeOutput = serde_json::from_slice(stdout)?;

    let mut streams: Vec<SubtitleStreamDescriptor> = output
        .streams
        .into_iter()
        .filter(|s| s.codec_type.as_deref().map_or(true, |t| t == "subtitle"))
        .map(|s| SubtitleStreamDescriptor {
            index: s.index,
            codec: s.codec_name.unwrap_or_default(),
            language: non_blank(s.tags.language),
            title: non_blank(s.tags.title),
            hearing_impaired: s.disposition.hearing_impaired != 0,
        })
        .collect();

    streams.sort_by_key(|s| s.index);
    streams.dedup_by_key(|s| s.index);
    Ok(streams)
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "streams": [
            {
                "index": 5,
                "codec_name": "subrip",
                "codec_type": "subtitle",
                "disposition": { "default": 0, "hearing_impaired": 0 },
                "tags": { "language": "eng", "title": "English" }
            },
            {
                "index": 2,
                "codec_name": "hdmv_pgs_subtitle",
                "codec_type": "subtitle",
                "disposition": { "hearing_impaired": 1 },
                "tags": { "language": "eng" }
            },
            {
                "index": 7,
                "codec_name": "ass",
                "codec_type": "subtitle",
                "tags": { "title": "  " }
            }
        ]
    }"#;

    #[test]
    fn test_parse_sample() {
        let streams = parse_ffprobe_output(SAMPLE.as_bytes()).unwrap();
        assert_eq!(streams.len(), 3);

        assert_eq!(streams[0].index, 2);
        assert!(streams[0].hearing_impaired);
        assert_eq!(streams[0].codec_class(), CodecClass::Bitmap);
        assert_eq!(streams[0].caption_kind(), CaptionKind::HearingImpaired);

        assert_eq!(streams[1].index, 5);
        assert_eq!(streams[1].title.as_deref(), Some("English"));
        assert_eq!(streams[1].caption_kind(), CaptionKind::Normal);

        assert_eq!(streams[2].language, None);
        assert_eq!(streams[2].title, None);
    }

    #[test]
    fn test_parse_without_streams() {
        assert!(parse_ffprobe_output(b"{}").unwrap().is_empty());
    }

    #[test]
    fn test_parse_skips_non_subtitle_streams() {
        let json = r#"{"streams":[{"index":0,"codec_name":"h264","codec_type":"video"}]}"#;
        assert!(parse_ffprobe_output(json.as_bytes()).unwrap().is_empty());
    }

    #[test]
    fn test_parse_garbage_is_error() {
        assert!(parse_ffprobe_output(b"not json").is_err());
    }
}
