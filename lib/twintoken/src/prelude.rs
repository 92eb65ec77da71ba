//! Prelude module for convenient imports.
//!
//! ```ignore
//! use twintoken::prelude::*;
//! ```

pub use crate::middleware::{DualTokenLayer, RefreshStrategy};
pub use crate::{
    ClientConfig, CredentialProvider, Error, HttpClient, HyperClient, Method, Request,
    RequestBuilder, Response, Result, header,
};
