//! HTTP response values.
//!
//! The body is fully buffered as [`Bytes`]. Cloning a response, or its body,
//! shares the underlying buffer instead of copying or draining it, which is
//! what lets middleware inspect a body and still hand the caller an untouched
//! response.

use bytes::Bytes;
use http::header::{self, HeaderMap};

use crate::MediaType;

/// HTTP response with status, headers, and body.
#[derive(Debug, Clone)]
pub struct Response<B = Bytes> {
    status: u16,
    headers: HeaderMap,
    body: B,
}

impl<B> Response<B> {
    /// Creates a new response.
    #[must_use]
    pub fn new(status: u16, headers: HeaderMap, body: B) -> Self {
        Self {
            status,
            headers,
            body,
        }
    }

    /// HTTP status code.
    #[must_use]
    pub const fn status(&self) -> u16 {
        self.status
    }

    /// Response headers.
    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// First value of a header, if present and visible ASCII.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|value| value.to_str().ok())
    }

    /// Parsed `Content-Type` header.
    ///
    /// `None` when the header is missing or is not a valid media type.
    #[must_use]
    pub fn content_type(&self) -> Option<MediaType> {
        self.headers
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .and_then(MediaType::parse)
    }

    /// Response body.
    #[must_use]
    pub const fn body(&self) -> &B {
        &self.body
    }

    /// Consume into body.
    #[must_use]
    pub fn into_body(self) -> B {
        self.body
    }

    /// Consume into (status, headers, body).
    #[must_use]
    pub fn into_parts(self) -> (u16, HeaderMap, B) {
        (self.status, self.headers, self.body)
    }

    /// Status is 2xx.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }

    /// Status is 4xx.
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        self.status >= 400 && self.status < 500
    }

    /// Status is 5xx.
    #[must_use]
    pub const fn is_server_error(&self) -> bool {
        self.status >= 500 && self.status < 600
    }
}

impl Response<Bytes> {
    /// Deserialize the response body as JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if deserialization fails.
    pub fn json<T: serde::de::DeserializeOwned>(&self) -> crate::Result<T> {
        serde_json::from_slice(&self.body).map_err(Into::into)
    }

    /// Decode the body as text using the declared charset (UTF-8 by default).
    ///
    /// Malformed sequences are replaced with U+FFFD. Returns `None` when the
    /// declared charset is not supported.
    #[must_use]
    pub fn text(&self) -> Option<String> {
        let charset = match self.content_type() {
            Some(media_type) => media_type.charset().ok()?,
            None => crate::Charset::utf8(),
        };
        Some(charset.decode(&self.body))
    }
}
