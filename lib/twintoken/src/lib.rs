//! Transparent dual-token authentication for HTTP clients.
//!
//! Every ordinary request carries a short-lived credential. When a response
//! body says that credential has expired, the [`DualTokenLayer`] refreshes it
//! through your [`CredentialProvider`] and replays the request once, so
//! callers only ever see the final response.
//!
//! # Example
//!
//! ```ignore
//! use twintoken::prelude::*;
//!
//! struct Tokens { /* your storage */ }
//!
//! impl CredentialProvider for Tokens {
//!     fn long_credential_header(&self) -> &str { "X-Refresh-Token" }
//!     fn long_credential(&self) -> String { self.refresh_token() }
//!     fn short_credential_header(&self) -> &str { "X-Access-Token" }
//!     fn short_credential(&self) -> String { self.access_token() }
//!     fn is_short_credential_expired(&self, body: &str) -> bool {
//!         body.contains("TOKEN_EXPIRED")
//!     }
//!     async fn refresh_short_credential(&self) -> twintoken::Result<()> {
//!         self.renew().await
//!     }
//! }
//!
//! let client = HyperClient::builder().with_dual_token(Tokens::load()?).build();
//! let response = client.execute(Request::builder(Method::GET, url).build()).await?;
//! ```
//!
//! [`DualTokenLayer`]: middleware::DualTokenLayer

mod client;
mod config;
mod connector;
pub mod middleware;
pub mod prelude;

// Re-export client types
pub use client::{BoxedService, HyperClient, HyperClientBuilder, ServiceFuture};
pub use config::{ClientConfig, ClientConfigBuilder};

// Re-export tower for middleware composition
pub use tower;

// Re-export core types
pub use twintoken_core::{
    Charset, CredentialProvider, Error, HttpClient, MediaType, Method, Request, RequestBuilder,
    Response, Result, UnsupportedCharset,
};

// Re-export http types for headers
pub use twintoken_core::header;

pub use url;
