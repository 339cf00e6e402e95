//! Progress observation for a running translation job.
//!
//! The service streams frames of the form
//! `{"total": 120, "done": 64, "remaining": 56, "finished": false}`, either as
//! server-sent events (`data: {...}`) or as bare JSON lines. Frames only drive
//! the progress display; they never decide whether a job succeeded.

use futures_util::StreamExt;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Deserialize;
use std::sync::Arc;
use tracing::debug;

use super::api::{ProgressStream, TranslationApi};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ProgressSnapshot {
    pub total: u64,
    pub done: u64,
    pub remaining: u64,
    pub finished: bool,
}

#[derive(Debug, Deserialize)]
struct ProgressFrame {
    total: Option<u64>,
    done: Option<u64>,
    remaining: Option<u64>,
    #[serde(default)]
    finished: bool,
}

/// Decode one frame payload. Returns `None` for anything that is not a
/// consistent progress frame.
pub fn decode_frame(payload: &str) -> Option<ProgressSnapshot> {
    let frame: ProgressFrame = serde_json::from_str(payload.trim()).ok()?;

    let done = frame.done.unwrap_or(0);
    let total = match (frame.total, frame.remaining) {
        (Some(total), _) => total,
        (None, Some(remaining)) => done.checked_add(remaining)?,
        (None, None) => 0,
    };
    if total > 0 && done > total {
        return None;
    }
    let remaining = total.saturating_sub(done);
    if let Some(reported) = frame.remaining {
        if total > 0 && reported != remaining {
            debug!("Progress frame reports remaining={} but total-done={}", reported, remaining);
        }
    }

    Some(ProgressSnapshot {
        total,
        done,
        remaining,
        finished: frame.finished,
    })
}

/// Longest line kept while waiting for its newline. Longer lines are dropped.
const MAX_LINE_BYTES: usize = 64 * 1024;

/// Splits a byte stream into lines and extracts frame payloads.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    buffer: Vec<u8>,
    // Inside an oversized line, dropping bytes until its newline
    discarding: bool,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk, returning the payloads of every complete line in it.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        let mut payloads = Vec::new();
        let mut rest = chunk;

        while let Some(pos) = rest.iter().position(|b| *b == b'\n') {
            let (head, tail) = rest.split_at(pos + 1);
            rest = tail;

            if self.discarding {
                self.discarding = false;
                continue;
            }
            self.buffer.extend_from_slice(head);
            let line = std::mem::take(&mut self.buffer);
            if let Some(payload) = line_payload(&String::from_utf8_lossy(&line)) {
                payloads.push(payload);
            }
        }

        if !self.discarding {
            self.buffer.extend_from_slice(rest);
            if self.buffer.len() > MAX_LINE_BYTES {
                debug!("Dropping progress line longer than {} bytes", MAX_LINE_BYTES);
                self.buffer.clear();
                self.discarding = true;
            }
        }
        payloads
    }

    /// Payload left in the buffer when the stream closes without a newline.
    pub fn finish(&mut self) -> Option<String> {
        let rest = std::mem::take(&mut self.buffer);
        if std::mem::take(&mut self.discarding) {
            return None;
        }
        line_payload(&String::from_utf8_lossy(&rest))
    }
}

fn line_payload(line: &str) -> Option<String> {
    let line = line.trim_end_matches(['\r', '\n']);
    if let Some(data) = line.strip_prefix("data:") {
        let data = data.strip_prefix(' ').unwrap_or(data);
        return (!data.trim().is_empty()).then(|| data.to_string());
    }
    // SSE comments, event/id fields and blank separators
    if line.trim_start().starts_with('{') {
        return Some(line.trim().to_string());
    }
    None
}

/// Observes the progress stream of one job and renders it.
pub struct ProgressMonitor<A: TranslationApi + ?Sized> {
    api: Arc<A>,
    bar: ProgressBar,
}

impl<A: TranslationApi + ?Sized> ProgressMonitor<A> {
    pub fn new(api: Arc<A>, bar: ProgressBar) -> Self {
        bar.set_style(
            ProgressStyle::with_template("{prefix} [{bar:30}] {pos}/{len} cues")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=> "),
        );
        Self { api, bar }
    }

    /// Subscribe on `token` and follow the stream until a finished frame or
    /// the end of the stream. A failed subscription is not an error.
    pub async fn watch(&self, token: &str) -> Option<ProgressSnapshot> {
        match self.api.subscribe_progress(token).await {
            Ok(stream) => self.follow(stream).await,
            Err(e) => {
                debug!("Progress stream unavailable for {}: {}", token, e);
                None
            }
        }
    }

    /// Consume `stream`, returning the last snapshot seen.
    pub async fn follow(&self, mut stream: ProgressStream) -> Option<ProgressSnapshot> {
        let mut decoder = FrameDecoder::new();
        let mut last = None;

        while let Some(chunk) = stream.next().await {
            let chunk = match chunk {
                Ok(chunk) => chunk,
                Err(e) => {
                    debug!("Progress stream interrupted: {}", e);
                    break;
                }
            };

            for payload in decoder.push(&chunk) {
                if let Some(snapshot) = self.apply(&payload) {
                    last = Some(snapshot);
                    if snapshot.finished {
                        self.bar.finish_and_clear();
                        return last;
                    }
                }
            }
        }

        if let Some(snapshot) = decoder.finish().and_then(|p| self.apply(&p)) {
            last = Some(snapshot);
        }
        self.bar.finish_and_clear();
        last
    }

    fn apply(&self, payload: &str) -> Option<ProgressSnapshot> {
        match decode_frame(payload) {
            Some(snapshot) => {
                if snapshot.total > 0 {
                    self.bar.set_length(snapshot.total);
                }
                self.bar.set_position(snapshot.done);
                Some(snapshot)
            }
            None => {
                debug!("Skipping malformed progress frame: {}", payload);
                None
            }
        }
    }
}
