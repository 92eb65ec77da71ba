//! Credential provider capability.
//!
//! The dual-token middleware never stores credentials itself. It asks a
//! [`CredentialProvider`] for header names and current values on every call,
//! asks it whether a response body means "short credential expired", and asks
//! it to refresh.

use std::future::Future;
use std::sync::Arc;

use crate::Result;

/// Source of the long-lived and short-lived credentials.
///
/// # Example
///
/// ```ignore
/// use std::sync::RwLock;
/// use twintoken_core::{CredentialProvider, Result};
///
/// struct Tokens {
///     refresh_token: String,
///     access_token: RwLock<String>,
/// }
///
/// impl CredentialProvider for Tokens {
///     fn long_credential_header(&self) -> &str { "X-Refresh-Token" }
///     fn long_credential(&self) -> String { self.refresh_token.clone() }
///     fn short_credential_header(&self) -> &str { "X-Access-Token" }
///     fn short_credential(&self) -> String { self.access_token.read().unwrap().clone() }
///
///     fn is_short_credential_expired(&self, body: &str) -> bool {
///         body.contains("TOKEN_EXPIRED")
///     }
///
///     async fn refresh_short_credential(&self) -> Result<()> {
///         let fresh = call_refresh_endpoint(&self.refresh_token).await?;
///         *self.access_token.write().unwrap() = fresh;
///         Ok(())
///     }
/// }
/// ```
pub trait CredentialProvider: Send + Sync + 'static {
    /// Header carrying the long credential.
    fn long_credential_header(&self) -> &str;

    /// Current long credential.
    fn long_credential(&self) -> String;

    /// Header carrying the short credential.
    fn short_credential_header(&self) -> &str;

    /// Current short credential.
    fn short_credential(&self) -> String;

    /// Whether a decoded response body reports that the short credential
    /// has expired.
    fn is_short_credential_expired(&self, body: &str) -> bool;

    /// Obtain a new short credential.
    ///
    /// Once the returned future resolves with `Ok`, [`short_credential`]
    /// must return the new value.
    ///
    /// # Errors
    ///
    /// Implementations should report failures as
    /// [`Error::CredentialRefresh`](crate::Error::CredentialRefresh) or a
    /// transport error.
    ///
    /// [`short_credential`]: CredentialProvider::short_credential
    fn refresh_short_credential(&self) -> impl Future<Output = Result<()>> + Send;
}

impl<P: CredentialProvider> CredentialProvider for Arc<P> {
    fn long_credential_header(&self) -> &str {
        (**self).long_credential_header()
    }

    fn long_credential(&self) -> String {
        (**self).long_credential()
    }

    fn short_credential_header(&self) -> &str {
        (**self).short_credential_header()
    }

    fn short_credential(&self) -> String {
        (**self).short_credential()
    }

    fn is_short_credential_expired(&self, body: &str) -> bool {
        (**self).is_short_credential_expired(body)
    }

    fn refresh_short_credential(&self) -> impl Future<Output = Result<()>> + Send {
        (**self).refresh_short_credential()
    }
}
