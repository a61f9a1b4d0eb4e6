//! Response redaction
//!
//! [`censor`] works on one self-contained response buffer. [`ResponseCensor`]
//! applies the same rules to a response arriving as a sequence of chunks and
//! decides from the response headers whether the body is text at all.
//!
//! Matching is literal and case-insensitive, using Unicode simple case
//! folding (`spam` also matches `ſpam`). It runs on raw bytes: a term matches
//! wherever its UTF-8 encoding appears, even between invalid UTF-8 bytes, and
//! all other bytes pass through unchanged. Terms are applied one after
//! another in list order, so a later term may match text produced by an
//! earlier replacement.
//!
//! Known limits of the streaming censor: a term split across two chunks is
//! not matched, and only the first header block is inspected, so a response
//! preceded by an interim `100 Continue` block is never redacted.

use super::words::WordList;
use regex::bytes::NoExpand;
use std::borrow::Cow;

/// Replacement written over every matched term
pub const REDACTION_MARKER: &[u8] = b"---";

/// Longest unterminated header line held back before giving up on headers
pub const DEFAULT_MAX_HEADER_LINE: usize = 16 * 1024;

/// Redact the body lines of a complete response buffer
///
/// Lines before the first blank line are headers and are copied verbatim.
/// The blank line and everything after it are redacted. A buffer with no
/// blank line is returned unchanged.
pub fn censor(response: &[u8], words: &WordList) -> Vec<u8> {
    if words.is_empty() {
        return response.to_vec();
    }

    let mut offset = 0;
    for line in response.split_inclusive(|&b| b == b'\n') {
        if is_blank(line) {
            let mut out = response[..offset].to_vec();
            out.extend(redact_lines(&response[offset..], words));
            return out;
        }
        offset += line.len();
    }

    response.to_vec()
}

/// Redact each line of `body` independently
pub fn redact_lines(body: &[u8], words: &WordList) -> Vec<u8> {
    let mut out = Vec::with_capacity(body.len());
    for line in body.split_inclusive(|&b| b == b'\n') {
        out.extend(redact(line, words));
    }
    out
}

fn redact(line: &[u8], words: &WordList) -> Vec<u8> {
    let mut current = line.to_vec();
    for pattern in words.patterns() {
        let replaced = match pattern.replace_all(&current, NoExpand(REDACTION_MARKER)) {
            Cow::Borrowed(_) => continue,
            Cow::Owned(replaced) => replaced,
        };
        current = replaced;
    }
    current
}

fn is_blank(line: &[u8]) -> bool {
    line.iter().all(|b| b.is_ascii_whitespace())
}

/// Whether a `Content-Type` value names a format that is safe to rewrite
pub fn is_textual_media_type(content_type: &str) -> bool {
    let media = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();

    media.starts_with("text/")
        || matches!(
            media.as_str(),
            "application/json"
                | "application/xml"
                | "application/javascript"
                | "application/xhtml+xml"
        )
        || media.ends_with("+xml")
        || media.ends_with("+json")
}

/// What the header block has told us so far
#[derive(Debug, Default)]
struct HeaderScan {
    /// Header line split across chunks, held until its newline arrives
    partial: Vec<u8>,
    textual: bool,
    encoded: bool,
}

impl HeaderScan {
    fn observe(&mut self, line: &[u8]) {
        let line = String::from_utf8_lossy(line);
        let Some((name, value)) = line.split_once(':') else {
            return;
        };
        let name = name.trim();
        let value = value.trim();

        if name.eq_ignore_ascii_case("content-type") {
            self.textual = is_textual_media_type(value);
        } else if name.eq_ignore_ascii_case("content-encoding") {
            self.encoded = !value.is_empty() && !value.eq_ignore_ascii_case("identity");
        }
    }

    fn body_is_redactable(&self) -> bool {
        self.textual && !self.encoded
    }
}

#[derive(Debug)]
enum Phase {
    Headers(HeaderScan),
    Body { redact: bool },
}

/// Streaming censor for one upstream response
///
/// Header lines are forwarded as soon as they are complete. Once the blank
/// separator line has passed, every chunk is body and is redacted only if
/// the headers declared a textual, unencoded payload.
#[derive(Debug)]
pub struct ResponseCensor<'a> {
    words: &'a WordList,
    phase: Phase,
    max_header_line: usize,
}

impl<'a> ResponseCensor<'a> {
    pub fn new(words: &'a WordList) -> Self {
        Self::with_header_limit(words, DEFAULT_MAX_HEADER_LINE)
    }

    /// Like [`ResponseCensor::new`], holding back at most `max_header_line`
    /// bytes of an unterminated header line
    ///
    /// Once exceeded the response is treated as having no headers: the held
    /// bytes are flushed and the rest is forwarded unredacted.
    pub fn with_header_limit(words: &'a WordList, max_header_line: usize) -> Self {
        Self {
            words,
            phase: Phase::Headers(HeaderScan::default()),
            max_header_line,
        }
    }

    /// True once the header block has been fully seen
    pub fn in_body(&self) -> bool {
        matches!(self.phase, Phase::Body { .. })
    }

    /// Transform the next chunk of the response
    pub fn process(&mut self, chunk: &[u8]) -> Vec<u8> {
        let mut out = Vec::with_capacity(chunk.len());
        let mut rest = chunk;

        while let Phase::Headers(scan) = &mut self.phase {
            let Some(pos) = rest.iter().position(|&b| b == b'\n') else {
                if scan.partial.len() + rest.len() <= self.max_header_line {
                    scan.partial.extend_from_slice(rest);
                    return out;
                }
                tracing::debug!("Header line exceeds {} bytes, relaying as is", self.max_header_line);
                out.append(&mut scan.partial);
                self.phase = Phase::Body { redact: false };
                break;
            };
            let (head, tail) = rest.split_at(pos + 1);
            rest = tail;

            let mut line = std::mem::take(&mut scan.partial);
            line.extend_from_slice(head);
            out.extend_from_slice(&line);

            if is_blank(&line) {
                let redact = scan.body_is_redactable() && !self.words.is_empty();
                tracing::debug!("Response headers complete, redacting body: {}", redact);
                self.phase = Phase::Body { redact };
            } else {
                scan.observe(&line);
            }
        }

        match self.phase {
            Phase::Body { redact: true } => out.extend(redact_lines(rest, self.words)),
            _ => out.extend_from_slice(rest),
        }
        out
    }

    /// Flush anything still held back when the upstream closes
    pub fn finish(self) -> Vec<u8> {
        match self.phase {
            Phase::Headers(scan) => scan.partial,
            Phase::Body { .. } => Vec::new(),
        }
    }
}
