//! Reassembling frames from a byte stream.
//!
//! The server writes one JSON object per frame with no delimiter and no
//! length prefix. TCP does not preserve write boundaries: one read can
//! carry half a frame, or two frames glued together. [`FrameDecoder`]
//! buffers reads and hands out each complete top-level JSON value as it
//! becomes available.

use serde::de::IgnoredAny;

use crate::{Codec, CommandBatch, JsonCodec, ProtocolError};

/// Upper bound on a buffered partial frame.
///
/// A real frame is a few hundred bytes. A buffer that grows past this
/// without closing a JSON value means the stream is lost.
pub const DEFAULT_MAX_FRAME_BYTES: usize = 64 * 1024;

/// Every frame the server writes starts with these bytes.
const FRAME_START: &[u8] = br#"{"commands""#;

/// Accumulates transport reads and splits them into decoded batches.
///
/// The decoder only finds where each top-level JSON value begins and
/// ends; the bytes of each value are then decoded with the codec `K`.
///
/// Each complete value yields one `Result`: a good frame is
/// `Ok(batch)`, a bad one is `Err(..)` and is discarded without
/// affecting frames before or after it. An incomplete trailing value
/// stays buffered until the next [`push`](Self::push).
///
/// After a syntax error or invalid UTF-8 the decoder skips ahead to the
/// next `{"commands"`. A read that itself starts with `{"commands"`
/// while a partial frame is buffered means that frame was cut short:
/// it is reported and dropped, and the new read is decoded on its own.
#[derive(Debug)]
pub struct FrameDecoder<K = JsonCodec> {
    codec: K,
    pending: Vec<u8>,
    max_frame_bytes: usize,
}

impl Default for FrameDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameDecoder {
    /// Creates a JSON decoder with [`DEFAULT_MAX_FRAME_BYTES`].
    pub fn new() -> Self {
        Self::with_max_frame_bytes(DEFAULT_MAX_FRAME_BYTES)
    }

    /// Creates a JSON decoder that gives up on partial frames larger
    /// than `max`.
    pub fn with_max_frame_bytes(max: usize) -> Self {
        Self::with_codec(JsonCodec, max)
    }
}

/// How far one scan of the buffered text got.
enum Scan {
    /// Only whitespace is left.
    Exhausted,
    /// The last value is cut off and needs more bytes.
    Incomplete,
    /// The text stops parsing as JSON.
    Syntax(String),
}

impl<K: Codec> FrameDecoder<K> {
    /// Creates a decoder that hands each frame to `codec`.
    pub fn with_codec(codec: K, max_frame_bytes: usize) -> Self {
        Self {
            codec,
            pending: Vec::new(),
            max_frame_bytes,
        }
    }

    /// Bytes buffered but not yet part of a complete frame.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Feeds one read and returns every frame it completed.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<Result<CommandBatch, ProtocolError>> {
        let mut frames = Vec::new();

        if !self.pending.is_empty() && opens_frame(chunk) {
            frames.push(Err(ProtocolError::MalformedPayload(format!(
                "frame cut off after {} bytes",
                self.pending.len()
            ))));
            self.pending.clear();
        }
        self.pending.extend_from_slice(chunk);

        let mut start = 0;
        while start < self.pending.len() {
            let rest = &self.pending[start..];
            // `corrupt` is the bad UTF-8 error and the offset just past
            // the bad bytes. A character merely cut off at the end of the
            // read is not corrupt; it waits for the next read.
            let (text, corrupt) = match std::str::from_utf8(rest) {
                Ok(text) => (text, None),
                Err(e) => {
                    let text = std::str::from_utf8(&rest[..e.valid_up_to()]).unwrap_or_default();
                    (text, e.error_len().map(|len| (e, e.valid_up_to() + len)))
                }
            };

            let (consumed, stop) = scan(&self.codec, text, &mut frames);
            let text_len = text.len();
            match (stop, corrupt) {
                (Scan::Syntax(msg), _) => {
                    frames.push(Err(ProtocolError::MalformedPayload(msg)));
                    start = resync(&self.pending, start + consumed + 1);
                }
                (_, Some((e, end))) => {
                    frames.push(Err(ProtocolError::MalformedEncoding(e)));
                    start = resync(&self.pending, start + end);
                }
                (Scan::Incomplete, None) => {
                    start += consumed;
                    break;
                }
                (Scan::Exhausted, None) => {
                    start += text_len;
                    break;
                }
            }
        }

        self.pending.drain(..start.min(self.pending.len()));
        if self.pending.iter().all(u8::is_ascii_whitespace) {
            self.pending.clear();
        }

        if self.pending.len() > self.max_frame_bytes {
            let size = self.pending.len();
            self.pending.clear();
            frames.push(Err(ProtocolError::MalformedPayload(format!(
                "partial frame of {size} bytes exceeds limit of {}",
                self.max_frame_bytes
            ))));
        }

        frames
    }
}

/// Decodes every complete value in `text` into `frames`.
///
/// Returns the byte offset just past the last complete value and why
/// the scan stopped.
fn scan<K: Codec>(
    codec: &K,
    text: &str,
    frames: &mut Vec<Result<CommandBatch, ProtocolError>>,
) -> (usize, Scan) {
    let mut values = serde_json::Deserializer::from_str(text).into_iter::<IgnoredAny>();
    let mut consumed = 0;
    loop {
        match values.next() {
            Some(Ok(IgnoredAny)) => {
                let end = values.byte_offset();
                frames.push(codec.decode(text[consumed..end].as_bytes()));
                consumed = end;
            }
            Some(Err(e)) if e.is_eof() => return (consumed, Scan::Incomplete),
            Some(Err(e)) => return (consumed, Scan::Syntax(e.to_string())),
            None => return (consumed, Scan::Exhausted),
        }
    }
}

/// Returns `true` if `chunk` begins a new frame.
fn opens_frame(chunk: &[u8]) -> bool {
    let first = chunk.iter().position(|b| !b.is_ascii_whitespace());
    first.is_some_and(|i| chunk[i..].starts_with(FRAME_START))
}

/// The offset of the next frame start at or after `from`, or `buf.len()`.
///
/// A trailing prefix of a frame start (`{"comm`) is kept, since the rest
/// of it may arrive with the next read.
fn resync(buf: &[u8], from: usize) -> usize {
    let Some(rest) = buf.get(from..) else {
        return buf.len();
    };
    if let Some(i) = rest.windows(FRAME_START.len()).position(|w| w == FRAME_START) {
        return from + i;
    }
    match rest.iter().rposition(|b| *b == b'{') {
        Some(i) if FRAME_START.starts_with(&rest[i..]) => from + i,
        _ => buf.len(),
    }
}
