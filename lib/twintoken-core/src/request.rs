//! HTTP request values.
//!
//! Requests are immutable once built. Middleware that needs a different header
//! derives a new request with [`Request::with_header`] instead of mutating the
//! one it was given.
//!
//! # Example
//!
//! ```
//! use twintoken_core::{Method, Request, header};
//!
//! let request: Request = Request::builder(Method::GET, "https://api.example.com".parse().unwrap())
//!     .header(header::ACCEPT, header::HeaderValue::from_static("application/json"))
//!     .build();
//!
//! let authorized = request.with_header("X-Access-Token", "abc").unwrap();
//! assert_eq!(authorized.header("x-access-token"), Some("abc"));
//! assert!(request.header("x-access-token").is_none());
//! ```

use bytes::Bytes;
use http::header::{HeaderMap, HeaderName, HeaderValue};
use http::Method;

use crate::{Error, Result};

/// An HTTP request with method, URL, headers, and optional body.
#[derive(Debug, Clone)]
pub struct Request<B = Bytes> {
    method: Method,
    url: url::Url,
    headers: HeaderMap,
    body: Option<B>,
}

impl<B> Request<B> {
    /// Creates a new [`RequestBuilder`].
    #[must_use]
    pub fn builder(method: Method, url: url::Url) -> RequestBuilder<B> {
        RequestBuilder::new(method, url)
    }

    /// HTTP method.
    #[must_use]
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Request URL.
    #[must_use]
    pub fn url(&self) -> &url::Url {
        &self.url
    }

    /// Request headers.
    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// First value of a header, if present and visible ASCII.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|value| value.to_str().ok())
    }

    /// Whether the request carries at least one value for `name`.
    ///
    /// Names are compared case-insensitively; a name that is not a legal
    /// header name is never present.
    #[must_use]
    pub fn has_header(&self, name: &str) -> bool {
        self.headers.contains_key(name)
    }

    /// Request body.
    #[must_use]
    pub const fn body(&self) -> Option<&B> {
        self.body.as_ref()
    }

    /// Consume into (method, url, headers, body).
    #[must_use]
    pub fn into_parts(self) -> (Method, url::Url, HeaderMap, Option<B>) {
        (self.method, self.url, self.headers, self.body)
    }
}

impl<B: Clone> Request<B> {
    /// Derive a copy of this request where every value of `name` is replaced
    /// by the single `value`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidHeader`] if `name` or `value` is not valid HTTP.
    pub fn with_header(&self, name: &str, value: &str) -> Result<Self> {
        let header_name =
            HeaderName::try_from(name).map_err(|err| Error::invalid_header(name, err))?;
        let value = HeaderValue::try_from(value).map_err(|err| Error::invalid_header(name, err))?;

        let mut derived = self.clone();
        // `insert` drops every previous value for the name
        derived.headers.insert(header_name, value);
        Ok(derived)
    }
}

/// Builder for constructing [`Request`] instances.
#[derive(Debug, Clone)]
pub struct RequestBuilder<B = Bytes> {
    method: Method,
    url: url::Url,
    headers: HeaderMap,
    body: Option<B>,
}

impl<B> RequestBuilder<B> {
    /// Creates a new builder.
    #[must_use]
    pub fn new(method: Method, url: url::Url) -> Self {
        Self {
            method,
            url,
            headers: HeaderMap::new(),
            body: None,
        }
    }

    /// Sets a header, replacing previous values.
    #[must_use]
    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Appends a header value, keeping previous values.
    #[must_use]
    pub fn append_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.append(name, value);
        self
    }

    /// Extends the headers with another map.
    #[must_use]
    pub fn headers(mut self, headers: HeaderMap) -> Self {
        self.headers.extend(headers);
        self
    }

    /// Sets the request body.
    #[must_use]
    pub fn body(mut self, body: B) -> Self {
        self.body = Some(body);
        self
    }

    /// Builds the [`Request`].
    #[must_use]
    pub fn build(self) -> Request<B> {
        Request {
            method: self.method,
            url: self.url,
            headers: self.headers,
            body: self.body,
        }
    }
}

impl RequestBuilder<Bytes> {
    /// Set a JSON body.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn json<T: serde::Serialize>(self, value: &T) -> Result<Self> {
        let body = serde_json::to_vec(value)?;
        Ok(self
            .header(
                http::header::CONTENT_TYPE,
                HeaderValue::from_static("application/json"),
            )
            .body(Bytes::from(body)))
    }
}

#[cfg(test)]
mod tests {
    use assert2::{check, let_assert};
    use http::header;

    use super::*;

    fn url() -> url::Url {
        url::Url::parse("https://api.example.com/users").expect("valid URL")
    }

    #[test]
    fn request_builder_basic() {
        let request = Request::<Bytes>::builder(Method::GET, url())
            .header(header::ACCEPT, HeaderValue::from_static("application/json"))
            .build();

        check!(request.method() == Method::GET);
        check!(request.url().as_str() == "https://api.example.com/users");
        check!(request.header("accept") == Some("application/json"));
        check!(request.body().is_none());
    }

    #[test]
    fn header_lookup_is_case_insensitive() {
        let request = Request::<Bytes>::builder(Method::GET, url())
            .header(
                HeaderName::from_static("x-refresh-token"),
                HeaderValue::from_static("old"),
            )
            .build();

        check!(request.has_header("X-Refresh-Token"));
        check!(request.has_header("x-refresh-token"));
        check!(!request.has_header("X-Access-Token"));
        check!(!request.has_header("not a header"));
    }

    #[test]
    fn with_header_replaces_every_value() {
        let name = HeaderName::from_static("x-refresh-token");
        let original = Request::<Bytes>::builder(Method::GET, url())
            .append_header(name.clone(), HeaderValue::from_static("stale-1"))
            .append_header(name.clone(), HeaderValue::from_static("stale-2"))
            .build();

        let_assert!(Ok(derived) = original.with_header("X-Refresh-Token", "fresh"));

        let values: Vec<&str> = derived
            .headers()
            .get_all(&name)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .collect();
        check!(values == ["fresh"]);
        // the original is left untouched
        check!(original.headers().get_all(&name).iter().count() == 2);
    }

    #[test]
    fn with_header_rejects_invalid_input() {
        let request = Request::<Bytes>::builder(Method::GET, url()).build();

        let_assert!(Err(Error::InvalidHeader { name, .. }) = request.with_header("bad name", "v"));
        check!(name == "bad name");

        let_assert!(Err(Error::InvalidHeader { .. }) = request.with_header("X-Token", "a\nb"));
    }

    #[test]
    fn request_builder_json() {
        #[derive(serde::Serialize)]
        struct Login {
            user: String,
        }

        let request = Request::builder(Method::POST, url())
            .json(&Login {
                user: "alice".to_string(),
            })
            .expect("json")
            .build();

        check!(request.header("content-type") == Some("application/json"));
        check!(request.body() == Some(&Bytes::from_static(br#"{"user":"alice"}"#)));
    }
}
