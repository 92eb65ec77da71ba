//! Core types and traits for the twintoken dual-token HTTP middleware.
//!
//! This crate provides the foundational types used by twintoken:
//! - [`Request`] and [`RequestBuilder`] - immutable HTTP request values
//! - [`Response`] - buffered HTTP response
//! - [`MediaType`] and [`Charset`] - `Content-Type` parsing and text decoding
//! - [`Error`] and [`Result`] - Error handling
//! - [`HttpClient`] - Core client trait for HTTP execution
//! - [`CredentialProvider`] - Source of the long and short credentials
//! - [`Method`] and [`header`] - re-exported from the `http` crate

mod client;
mod credentials;
mod error;
mod media_type;
pub mod prelude;
mod request;
mod response;

pub use client::HttpClient;
pub use credentials::CredentialProvider;
pub use error::{Error, Result};
pub use media_type::{Charset, MediaType, UnsupportedCharset};
pub use request::{Request, RequestBuilder};
pub use response::Response;

// Re-export http crate types for methods and headers
pub use http::{Method, header};
