use super::headers::{content_types, names};
use super::{Headers, Method};

/// An RTSP request message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RtspRequest {
    /// RTSP method
    pub method: Method,
    /// Request URI (e.g., "rtsp://192.168.1.5/3141592653" or "*")
    pub uri: String,
    /// Request headers, in wire order
    pub headers: Headers,
    /// Request body (empty when absent)
    pub body: Vec<u8>,
}

impl RtspRequest {
    /// Create a new request
    pub fn new(method: Method, uri: impl Into<String>) -> Self {
        Self {
            method,
            uri: uri.into(),
            headers: Headers::new(),
            body: Vec::new(),
        }
    }

    /// Create a builder for constructing requests
    pub fn builder(method: Method, uri: impl Into<String>) -> RtspRequestBuilder {
        RtspRequestBuilder::new(method, uri)
    }

    /// Encode request to bytes
    ///
    /// Headers are written in insertion order. `Content-Length` is appended
    /// when a body is present and the caller did not set one.
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let mut output = Vec::with_capacity(256 + self.body.len());

        output.extend_from_slice(self.method.as_str().as_bytes());
        output.push(b' ');
        output.extend_from_slice(self.uri.as_bytes());
        output.extend_from_slice(b" RTSP/1.0\r\n");

        for (name, value) in self.headers.iter() {
            output.extend_from_slice(name.as_bytes());
            output.extend_from_slice(b": ");
            output.extend_from_slice(value.as_bytes());
            output.extend_from_slice(b"\r\n");
        }

        if !self.body.is_empty() && !self.headers.contains(names::CONTENT_LENGTH) {
            let len_header = format!("{}: {}\r\n", names::CONTENT_LENGTH, self.body.len());
            output.extend_from_slice(len_header.as_bytes());
        }

        output.extend_from_slice(b"\r\n");
        output.extend_from_slice(&self.body);

        output
    }
}

/// Builder for RTSP requests
#[derive(Debug)]
pub struct RtspRequestBuilder {
    request: RtspRequest,
}

impl RtspRequestBuilder {
    /// Create a new builder
    pub fn new(method: Method, uri: impl Into<String>) -> Self {
        Self {
            request: RtspRequest::new(method, uri),
        }
    }

    /// Add a header
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.request.headers.insert(name, value);
        self
    }

    /// Add every header from `headers`, in order
    #[must_use]
    pub fn headers(mut self, headers: Headers) -> Self {
        for (k, v) in headers.iter() {
            self.request.headers.insert(k, v);
        }
        self
    }

    /// Set `CSeq` header
    #[must_use]
    pub fn cseq(self, seq: u32) -> Self {
        self.header(names::CSEQ, seq.to_string())
    }

    /// Set Content-Type header
    #[must_use]
    pub fn content_type(self, content_type: &str) -> Self {
        self.header(names::CONTENT_TYPE, content_type)
    }

    /// Set User-Agent header
    #[must_use]
    pub fn user_agent(self, agent: &str) -> Self {
        self.header(names::USER_AGENT, agent)
    }

    /// Set Session header
    #[must_use]
    pub fn session(self, session_id: &str) -> Self {
        self.header(names::SESSION, session_id)
    }

    /// Set body as raw bytes
    #[must_use]
    pub fn body(mut self, body: Vec<u8>) -> Self {
        self.request.body = body;
        self
    }

    /// Set a UTF-8 text body with the given content type
    #[must_use]
    pub fn text_body(self, content_type: &str, body: impl Into<String>) -> Self {
        self.content_type(content_type)
            .body(body.into().into_bytes())
    }

    /// Set a binary plist body
    #[must_use]
    pub fn plist_body(self, body: Vec<u8>) -> Self {
        self.content_type(content_types::BINARY_PLIST).body(body)
    }

    /// Build the request
    #[must_use]
    pub fn build(self) -> RtspRequest {
        self.request
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_encode_simple() {
        let request = RtspRequest::builder(Method::Options, "*")
            .cseq(1)
            .user_agent("test/1.0")
            .build();

        let encoded = request.encode();
        let encoded_str = String::from_utf8_lossy(&encoded);

        assert_eq!(
            encoded_str,
            "OPTIONS * RTSP/1.0\r\nCSeq: 1\r\nUser-Agent: test/1.0\r\n\r\n"
        );
    }

    #[test]
    fn test_request_encode_with_body() {
        let request = RtspRequest::builder(Method::SetParameter, "rtsp://10.0.0.2/1")
            .cseq(5)
            .text_body("text/parameters", "volume: -15.000000\r\n")
            .build();

        let encoded = request.encode();
        let encoded_str = String::from_utf8_lossy(&encoded);

        assert!(encoded_str.contains("Content-Type: text/parameters\r\n"));
        assert!(encoded_str.contains("Content-Length: 20\r\n"));
        assert!(encoded_str.ends_with("\r\n\r\nvolume: -15.000000\r\n"));
    }

    #[test]
    fn test_request_keeps_header_order() {
        let request = RtspRequest::builder(Method::Announce, "rtsp://h/1")
            .header("Zeta", "1")
            .header("Alpha", "2")
            .header("Mid", "3")
            .build();

        let names: Vec<&str> = request.headers.iter().map(|(k, _)| k).collect();
        assert_eq!(names, ["Zeta", "Alpha", "Mid"]);
    }

    #[test]
    fn test_request_binary_body_untouched() {
        let body = vec![0x01, 0x00, 0xFF, 0x0D, 0x0A];
        let request = RtspRequest::builder(Method::Post, "/auth-setup")
            .content_type("application/octet-stream")
            .body(body.clone())
            .build();

        let encoded = request.encode();
        assert!(encoded.ends_with(&body));
    }

    #[test]
    fn test_method_as_str() {
        assert_eq!(Method::Options.as_str(), "OPTIONS");
        assert_eq!(Method::Setup.as_str(), "SETUP");
        assert_eq!(Method::SetParameter.as_str(), "SET_PARAMETER");
        assert_eq!(Method::Get.to_string(), "GET");
    }

    #[test]
    fn test_method_parse() {
        assert_eq!(Method::parse("OPTIONS"), Some(Method::Options));
        assert_eq!(Method::parse("teardown"), Some(Method::Teardown));
        assert_eq!(Method::parse("INVALID"), None);
    }
}
