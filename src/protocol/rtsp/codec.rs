use bytes::{Buf, BytesMut};
use thiserror::Error;

use super::{Headers, RtspResponse, StatusCode};

/// Errors during RTSP response parsing
#[derive(Debug, Error)]
pub enum RtspCodecError {
    #[error("invalid status line: {0}")]
    InvalidStatusLine(String),

    #[error("invalid header: {0}")]
    InvalidHeader(String),

    #[error("response too large: {size} bytes")]
    ResponseTooLarge { size: usize },
}

/// Sans-IO RTSP response codec
///
/// Feed bytes with [`feed`](Self::feed) and poll [`decode`](Self::decode)
/// for complete responses. The body length comes from `Content-Length`
/// only; a missing or unparsable value means an empty body.
#[derive(Debug)]
pub struct RtspCodec {
    buffer: BytesMut,
    max_size: usize,
    state: ParseState,
}

#[derive(Debug)]
enum ParseState {
    StatusLine,
    Headers {
        version: String,
        status: StatusCode,
        reason: String,
    },
    Body {
        version: String,
        status: StatusCode,
        reason: String,
        headers: Headers,
        content_length: usize,
    },
}

impl Default for RtspCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl RtspCodec {
    /// Create a new codec with a 1 MiB response limit
    #[must_use]
    pub fn new() -> Self {
        Self {
            buffer: BytesMut::with_capacity(4096),
            max_size: 1024 * 1024,
            state: ParseState::StatusLine,
        }
    }

    /// Set maximum buffered response size
    #[must_use]
    pub fn with_max_size(mut self, size: usize) -> Self {
        self.max_size = size;
        self
    }

    /// Feed bytes into the codec
    ///
    /// # Errors
    /// Returns `RtspCodecError::ResponseTooLarge` if the buffer would exceed
    /// the configured limit.
    pub fn feed(&mut self, bytes: &[u8]) -> Result<(), RtspCodecError> {
        let size = self.buffer.len() + bytes.len();
        if size > self.max_size {
            return Err(RtspCodecError::ResponseTooLarge { size });
        }
        self.buffer.extend_from_slice(bytes);
        Ok(())
    }

    /// Try to decode a complete response
    ///
    /// Returns `Ok(None)` while more bytes are needed.
    ///
    /// # Errors
    /// Returns `RtspCodecError` if the status line or a header is malformed.
    pub fn decode(&mut self) -> Result<Option<RtspResponse>, RtspCodecError> {
        loop {
            match std::mem::replace(&mut self.state, ParseState::StatusLine) {
                ParseState::StatusLine => {
                    // Tolerate stray blank lines between responses.
                    while self.buffer.starts_with(b"\r\n") {
                        self.buffer.advance(2);
                    }
                    let Some(line_end) = self.find_line_end() else {
                        return Ok(None);
                    };
                    let line = String::from_utf8_lossy(&self.buffer[..line_end]).into_owned();
                    let (version, status, reason) = Self::parse_status_line(&line)?;
                    self.buffer.advance(line_end + 2);
                    self.state = ParseState::Headers {
                        version,
                        status,
                        reason,
                    };
                }

                ParseState::Headers {
                    version,
                    status,
                    reason,
                } => {
                    let Some((headers, body_start)) = self.parse_headers()? else {
                        self.state = ParseState::Headers {
                            version,
                            status,
                            reason,
                        };
                        return Ok(None);
                    };
                    self.buffer.advance(body_start);
                    let content_length = headers.content_length().unwrap_or(0);

                    if content_length == 0 {
                        return Ok(Some(RtspResponse {
                            version,
                            status,
                            reason,
                            headers,
                            body: Vec::new(),
                        }));
                    }

                    self.state = ParseState::Body {
                        version,
                        status,
                        reason,
                        headers,
                        content_length,
                    };
                }

                ParseState::Body {
                    version,
                    status,
                    reason,
                    headers,
                    content_length,
                } => {
                    if self.buffer.len() < content_length {
                        self.state = ParseState::Body {
                            version,
                            status,
                            reason,
                            headers,
                            content_length,
                        };
                        return Ok(None);
                    }
                    let body = self.buffer.split_to(content_length).to_vec();
                    return Ok(Some(RtspResponse {
                        version,
                        status,
                        reason,
                        headers,
                        body,
                    }));
                }
            }
        }
    }

    /// Flush whatever was received once the peer has closed the stream
    ///
    /// A response whose headers are complete but whose body is short is
    /// returned with the bytes that did arrive. Anything less complete than
    /// that yields `None`.
    pub fn finish(&mut self) -> Option<RtspResponse> {
        match std::mem::replace(&mut self.state, ParseState::StatusLine) {
            ParseState::Body {
                version,
                status,
                reason,
                headers,
                content_length,
            } => {
                tracing::debug!(
                    expected = content_length,
                    received = self.buffer.len(),
                    "RTSP body truncated by end of stream"
                );
                let body = self.buffer.split().to_vec();
                Some(RtspResponse {
                    version,
                    status,
                    reason,
                    headers,
                    body,
                })
            }
            _ => {
                self.buffer.clear();
                None
            }
        }
    }

    /// Clear the codec buffer and reset state
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.state = ParseState::StatusLine;
    }

    /// Get current buffer length
    #[must_use]
    pub fn buffered_len(&self) -> usize {
        self.buffer.len()
    }

    fn find_line_end(&self) -> Option<usize> {
        self.buffer.windows(2).position(|w| w == b"\r\n")
    }

    fn parse_status_line(line: &str) -> Result<(String, StatusCode, String), RtspCodecError> {
        // "RTSP/1.0 200 OK"
        let mut parts = line.splitn(3, ' ');

        let version = parts
            .next()
            .filter(|v| v.starts_with("RTSP/") || v.starts_with("HTTP/"))
            .ok_or_else(|| RtspCodecError::InvalidStatusLine(line.to_string()))?
            .to_string();

        let status = parts
            .next()
            .and_then(|code| code.trim().parse::<u16>().ok())
            .ok_or_else(|| RtspCodecError::InvalidStatusLine(line.to_string()))?;

        let reason = parts.next().unwrap_or("").trim().to_string();

        Ok((version, StatusCode(status), reason))
    }

    fn parse_headers(&self) -> Result<Option<(Headers, usize)>, RtspCodecError> {
        if self.buffer.starts_with(b"\r\n") {
            return Ok(Some((Headers::new(), 2)));
        }

        let Some(header_end) = self.buffer.windows(4).position(|w| w == b"\r\n\r\n") else {
            return Ok(None);
        };

        let header_str = String::from_utf8_lossy(&self.buffer[..header_end]);
        let mut headers = Headers::new();

        for line in header_str.split("\r\n").filter(|l| !l.is_empty()) {
            let (name, value) = line
                .split_once(':')
                .ok_or_else(|| RtspCodecError::InvalidHeader(line.to_string()))?;
            headers.insert(name.trim(), value.trim());
        }

        Ok(Some((headers, header_end + 4)))
    }
}
