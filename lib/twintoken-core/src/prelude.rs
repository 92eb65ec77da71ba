//! Prelude module for convenient imports.
//!
//! ```ignore
//! use twintoken_core::prelude::*;
//! ```

pub use crate::{
    Charset, CredentialProvider, Error, HttpClient, MediaType, Method, Request, RequestBuilder,
    Response, Result, header,
};
