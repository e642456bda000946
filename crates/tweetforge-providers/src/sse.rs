//! Incremental SSE decoding — bytes in, text deltas out.
//!
//! The wire format is the usual chat-completions streaming convention:
//! `data:`-prefixed lines, one JSON object per line carrying an incremental
//! content delta, and a terminal `data: [DONE]` sentinel.
//!
//! [`DeltaDecoder`] is pure and incremental so it can be fed from any byte
//! source and unit-tested without a socket. Two invariants it maintains:
//!
//! - a multi-byte character may straddle two reads, so undecoded trailing
//!   bytes are carried to the next `feed`;
//! - an unterminated trailing line is carried until its newline arrives.
//!
//! [`delta_stream`] wraps a live response body into the decoder's native
//! contract: a lazy, cancellable, forward-only sequence of deltas. Dropping
//! the stream releases the connection.

use std::pin::Pin;

use async_stream::try_stream;
use futures::Stream;
use reqwest::Response;
use tracing::debug;

use tweetforge_core::error::GenerationError;

/// A lazy, forward-only sequence of text deltas.
pub type DeltaStream = Pin<Box<dyn Stream<Item = Result<String, GenerationError>> + Send>>;

// ─────────────────────────────────────────────
// DeltaDecoder
// ─────────────────────────────────────────────

/// Incremental decoder from SSE bytes to content deltas.
#[derive(Debug, Default)]
pub struct DeltaDecoder {
    /// Bytes that did not decode to complete UTF-8 yet.
    carry: Vec<u8>,
    /// Decoded text not yet terminated by a newline.
    line_buf: String,
    /// Set once `[DONE]` is seen; later lines drain without yielding.
    done: bool,
}

impl DeltaDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one read's worth of bytes; returns the deltas completed by it,
    /// in receipt order.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<String> {
        self.carry.extend_from_slice(chunk);
        self.drain_carry();

        let mut deltas = Vec::new();
        while let Some(pos) = self.line_buf.find('\n') {
            let line: String = self.line_buf.drain(..=pos).collect();
            if let Some(delta) = self.process_line(&line) {
                deltas.push(delta);
            }
        }
        deltas
    }

    /// Flush at end of stream: the trailing unterminated line, if any,
    /// is processed as a final line. Incomplete trailing bytes are dropped.
    pub fn finish(&mut self) -> Vec<String> {
        self.carry.clear();
        if self.line_buf.is_empty() {
            return Vec::new();
        }
        let line = std::mem::take(&mut self.line_buf);
        self.process_line(&line).into_iter().collect()
    }

    /// Move every complete UTF-8 prefix of `carry` into `line_buf`.
    /// An incomplete multi-byte tail stays in `carry`; genuinely invalid
    /// sequences are replaced and skipped so the stream can't stall.
    fn drain_carry(&mut self) {
        loop {
            if self.carry.is_empty() {
                return;
            }
            match std::str::from_utf8(&self.carry) {
                Ok(s) => {
                    self.line_buf.push_str(s);
                    self.carry.clear();
                    return;
                }
                Err(e) => {
                    let valid = e.valid_up_to();
                    if valid > 0 {
                        self.line_buf
                            .push_str(&String::from_utf8_lossy(&self.carry[..valid]));
                    }
                    match e.error_len() {
                        Some(bad) => {
                            self.carry.drain(..valid + bad);
                            self.line_buf.push('\u{FFFD}');
                        }
                        None => {
                            // Incomplete tail — keep for the next read
                            self.carry.drain(..valid);
                            return;
                        }
                    }
                }
            }
        }
    }

    /// One complete line → at most one delta. Never fails: lines that are
    /// not `data:` lines, or whose payload doesn't parse, are skipped.
    fn process_line(&mut self, line: &str) -> Option<String> {
        let payload = line.trim().strip_prefix("data:")?.trim();

        if payload == "[DONE]" {
            self.done = true;
            return None;
        }
        if self.done || payload.is_empty() {
            return None;
        }

        let value: serde_json::Value = match serde_json::from_str(payload) {
            Ok(v) => v,
            Err(e) => {
                debug!(error = %e, "skipping unparseable stream line");
                return None;
            }
        };

        let delta = value
            .get("choices")?
            .get(0)?
            .get("delta")?
            .get("content")?
            .as_str()?;

        if delta.is_empty() {
            None
        } else {
            Some(delta.to_string())
        }
    }
}

// ─────────────────────────────────────────────
// Stream adapters
// ─────────────────────────────────────────────

/// Decode a live SSE response body into a delta stream.
///
/// Deltas surface strictly in receipt order. Dropping the stream stops
/// reading and releases the connection; text the caller already took is
/// unaffected.
pub fn delta_stream(mut response: Response) -> DeltaStream {
    Box::pin(try_stream! {
        let mut decoder = DeltaDecoder::new();
        loop {
            let chunk = response
                .chunk()
                .await
                .map_err(|e| GenerationError::Network(e.to_string()))?;
            match chunk {
                Some(bytes) => {
                    for delta in decoder.feed(&bytes) {
                        yield delta;
                    }
                }
                None => break,
            }
        }
        for delta in decoder.finish() {
            yield delta;
        }
    })
}

/// The non-streaming fallback: one full result as a single terminal delta,
/// so streaming and non-streaming callers observe identical eventual
/// content.
pub fn one_shot(text: String) -> DeltaStream {
    Box::pin(futures::stream::once(async move { Ok(text) }))
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
