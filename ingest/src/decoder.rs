//! Incremental decoder for a JSON array arriving as a byte stream.
//!
//! The decoder never materializes the whole array: it frames one element at
//! a time in a small working buffer and hands the raw bytes to serde_json.
//! Peak memory is one element plus lookahead slack regardless of how many
//! elements the array holds.

use bytes::{Buf, BytesMut};
use http_body_util::BodyExt;
use hyper::body::{Body, Bytes};
use serde::de::DeserializeOwned;
use thiserror::Error;

/// Initial working-buffer capacity. Big enough that typical elements never
/// reallocate, small enough to keep per-request memory flat.
pub const READ_BUFFER_SIZE: usize = 32 * 1024;

/// Result type alias for decoder operations
pub type Result<T, E = DecodeError> = std::result::Result<T, E>;

#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("unexpected token at byte {offset}: got {found:?}, expected {expected:?}")]
    UnexpectedToken {
        expected: char,
        found: char,
        offset: u64,
    },

    #[error("unexpected end of input at byte {offset}")]
    UnexpectedEof { offset: u64 },

    #[error("malformed element: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("error reading request body: {0}")]
    Body(String),
}

/// Streaming decoder over a `[...]` array of JSON values.
///
/// Call order per request: `expect_open`, then `decode_next` while
/// `has_more`, then `expect_close`. The sequence is lazy, finite and not
/// restartable; failure ordering matches element ordering in the source.
pub struct ArrayDecoder<B> {
    body: B,
    buf: BytesMut,
    /// Bytes of input consumed so far, for best-effort error positions.
    offset: u64,
    /// Body frames are exhausted.
    at_end: bool,
    /// No element decoded yet, so no separator is due before the next one.
    first: bool,
}

impl<B> ArrayDecoder<B>
where
    B: Body<Data = Bytes> + Unpin,
    B::Error: std::fmt::Display,
{
    pub fn new(body: B) -> Self {
        Self {
            body,
            buf: BytesMut::with_capacity(READ_BUFFER_SIZE),
            offset: 0,
            at_end: false,
            first: true,
        }
    }

    /// Consumes the opening `[`.
    pub async fn expect_open(&mut self) -> Result<()> {
        self.expect_delimiter('[').await
    }

    /// Consumes the closing `]`.
    pub async fn expect_close(&mut self) -> Result<()> {
        self.expect_delimiter(']').await
    }

    async fn expect_delimiter(&mut self, expected: char) -> Result<()> {
        match self.peek_token().await? {
            Some(byte) if byte as char == expected => {
                self.consume(1);
                Ok(())
            }
            Some(byte) => Err(DecodeError::UnexpectedToken {
                expected,
                found: byte as char,
                offset: self.offset,
            }),
            None => Err(DecodeError::UnexpectedEof {
                offset: self.offset,
            }),
        }
    }

    /// Reports whether another element precedes the closing `]`, consuming
    /// the separator if one is due. Lookahead only; the element itself is
    /// not parsed.
    pub async fn has_more(&mut self) -> Result<bool> {
        match self.peek_token().await? {
            None | Some(b']') => Ok(false),
            Some(b',') if !self.first => {
                self.consume(1);
                match self.peek_token().await? {
                    Some(_) => Ok(true),
                    None => Err(DecodeError::UnexpectedEof {
                        offset: self.offset,
                    }),
                }
            }
            Some(_) if self.first => Ok(true),
            Some(byte) => Err(DecodeError::UnexpectedToken {
                expected: ',',
                found: byte as char,
                offset: self.offset,
            }),
        }
    }

    /// Consumes and decodes exactly one array element.
    pub async fn decode_next<T: DeserializeOwned>(&mut self) -> Result<T> {
        let end = self.scan_value_end().await?;
        let raw = self.buf.split_to(end);
        self.offset += end as u64;
        self.first = false;
        Ok(serde_json::from_slice(&raw)?)
    }

    /// Finds the end of the next JSON value: one past its final byte for
    /// strings and containers, the first delimiter byte for bare scalars.
    /// Tracks string/escape state and container depth across body frames.
    async fn scan_value_end(&mut self) -> Result<usize> {
        let first = match self.peek_token().await? {
            Some(byte) => byte,
            None => {
                return Err(DecodeError::UnexpectedEof {
                    offset: self.offset,
                });
            }
        };
        let container = matches!(first, b'{' | b'[');
        let quoted = first == b'"';

        let mut index = 0;
        let mut depth = 0usize;
        let mut in_string = false;
        let mut escaped = false;
        loop {
            while index < self.buf.len() {
                let byte = self.buf[index];
                if in_string {
                    if escaped {
                        escaped = false;
                    } else if byte == b'\\' {
                        escaped = true;
                    } else if byte == b'"' {
                        in_string = false;
                        if quoted {
                            return Ok(index + 1);
                        }
                    }
                } else {
                    match byte {
                        b'"' => in_string = true,
                        b'{' | b'[' => depth += 1,
                        b'}' | b']' if container => {
                            depth -= 1;
                            if depth == 0 {
                                return Ok(index + 1);
                            }
                        }
                        // a bare scalar ends at the enclosing array's
                        // delimiter or at whitespace
                        b'}' | b']' | b',' | b' ' | b'\t' | b'\n' | b'\r' if !container => {
                            return Ok(index);
                        }
                        _ => {}
                    }
                }
                index += 1;
            }
            if !self.fill().await? {
                if !container && !quoted && !in_string && index > 0 {
                    // end of input legitimately terminates a bare scalar
                    return Ok(index);
                }
                return Err(DecodeError::UnexpectedEof {
                    offset: self.offset + index as u64,
                });
            }
        }
    }

    /// First byte of the next token, with insignificant whitespace skipped.
    async fn peek_token(&mut self) -> Result<Option<u8>> {
        loop {
            while let Some(&byte) = self.buf.first() {
                if matches!(byte, b' ' | b'\t' | b'\n' | b'\r') {
                    self.consume(1);
                } else {
                    return Ok(Some(byte));
                }
            }
            if !self.fill().await? {
                return Ok(None);
            }
        }
    }

    fn consume(&mut self, n: usize) {
        self.buf.advance(n);
        self.offset += n as u64;
    }

    /// Pulls body frames until at least one data byte is buffered or the
    /// body is exhausted. Returns whether new bytes arrived.
    async fn fill(&mut self) -> Result<bool> {
        while !self.at_end {
            match self.body.frame().await {
                None => self.at_end = true,
                Some(Err(err)) => return Err(DecodeError::Body(err.to_string())),
                Some(Ok(frame)) => {
                    // trailer and empty frames are skipped
                    if let Ok(data) = frame.into_data() {
                        if !data.is_empty() {
                            self.buf.extend_from_slice(&data);
                            return Ok(true);
                        }
                    }
                }
            }
        }
        Ok(false)
    }
}
