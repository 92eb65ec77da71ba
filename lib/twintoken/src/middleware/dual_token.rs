//! Dual-token authentication middleware.
//!
//! Ordinary requests carry a short-lived credential. When a response body
//! says that credential has expired, the middleware refreshes it through the
//! [`CredentialProvider`] and replays the original request once with the new
//! value.
//!
//! Requests that already carry the long-credential header are refresh calls
//! issued by the application itself: they get the current long credential
//! and are dispatched once, with no inspection and no retry, so a refresh
//! call can travel through the same pipeline without recursing.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use bytes::Bytes;
use tower::{Layer, Service, ServiceExt};
use tracing::{Instrument, debug, info, info_span, warn};
use twintoken_core::CredentialProvider;

use super::refresh::{RefreshCoordinator, RefreshStrategy};
use super::sniff::{Verdict, sniff};
use crate::{Error, Request, Response, Result};

/// Layer that adds dual-token authentication to requests.
///
/// All services produced by one layer share the provider and the refresh
/// lock.
///
/// # Example
///
/// ```ignore
/// use twintoken::middleware::{DualTokenLayer, RefreshStrategy};
/// use tower::ServiceBuilder;
///
/// let service = ServiceBuilder::new()
///     .layer(DualTokenLayer::new(tokens).refresh_strategy(RefreshStrategy::SingleFlight))
///     .service(client);
/// ```
pub struct DualTokenLayer<P> {
    provider: Arc<P>,
    coordinator: Arc<RefreshCoordinator>,
}

impl<P> DualTokenLayer<P> {
    /// Create a new dual-token layer around a credential provider.
    pub fn new(provider: P) -> Self {
        Self {
            provider: Arc::new(provider),
            coordinator: Arc::new(RefreshCoordinator::default()),
        }
    }

    /// Use a different refresh coordination strategy.
    ///
    /// Replaces the refresh lock, so call it before building services.
    #[must_use]
    pub fn refresh_strategy(mut self, strategy: RefreshStrategy) -> Self {
        self.coordinator = Arc::new(RefreshCoordinator::new(strategy));
        self
    }

    /// The refresh coordinator shared by services from this layer.
    #[must_use]
    pub fn coordinator(&self) -> &Arc<RefreshCoordinator> {
        &self.coordinator
    }
}

impl<P> Clone for DualTokenLayer<P> {
    fn clone(&self) -> Self {
        Self {
            provider: Arc::clone(&self.provider),
            coordinator: Arc::clone(&self.coordinator),
        }
    }
}

impl<P> std::fmt::Debug for DualTokenLayer<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DualTokenLayer")
            .field("coordinator", &self.coordinator)
            .finish_non_exhaustive()
    }
}

impl<S, P> Layer<S> for DualTokenLayer<P> {
    type Service = DualToken<S, P>;

    fn layer(&self, inner: S) -> Self::Service {
        DualToken {
            inner,
            provider: Arc::clone(&self.provider),
            coordinator: Arc::clone(&self.coordinator),
        }
    }
}

/// Service that applies dual-token authentication to requests.
pub struct DualToken<S, P> {
    inner: S,
    provider: Arc<P>,
    coordinator: Arc<RefreshCoordinator>,
}

impl<S: Clone, P> Clone for DualToken<S, P> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            provider: Arc::clone(&self.provider),
            coordinator: Arc::clone(&self.coordinator),
        }
    }
}

impl<S: std::fmt::Debug, P> std::fmt::Debug for DualToken<S, P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DualToken")
            .field("inner", &self.inner)
            .field("coordinator", &self.coordinator)
            .finish_non_exhaustive()
    }
}

impl<S, P> DualToken<S, P> {
    /// Create a new dual-token service wrapping the given service.
    pub fn new(inner: S, provider: P) -> Self {
        DualTokenLayer::new(provider).layer(inner)
    }

    /// The refresh coordinator shared with sibling services.
    #[must_use]
    pub fn coordinator(&self) -> &Arc<RefreshCoordinator> {
        &self.coordinator
    }
}

impl<S, P> Service<Request<Bytes>> for DualToken<S, P>
where
    S: Service<Request<Bytes>, Response = Response<Bytes>, Error = Error> + Clone + Send + 'static,
    S::Future: Send,
    P: CredentialProvider,
{
    type Response = Response<Bytes>;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<()>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: Request<Bytes>) -> Self::Future {
        let span = info_span!(
            "dual_token",
            method = %request.method(),
            url = %request.url(),
        );

        // the instance readied by `poll_ready` is the one that gets called
        let clone = self.inner.clone();
        let inner = std::mem::replace(&mut self.inner, clone);
        let provider = Arc::clone(&self.provider);
        let coordinator = Arc::clone(&self.coordinator);

        Box::pin(
            async move {
                if request.has_header(provider.long_credential_header()) {
                    return refresh_call(inner, provider.as_ref(), &request).await;
                }
                authorized_call(inner, provider.as_ref(), &coordinator, request).await
            }
            .instrument(span),
        )
    }
}

/// Dispatch a request once, waiting for the service to be ready first.
async fn dispatch<S>(mut inner: S, request: Request<Bytes>) -> Result<Response<Bytes>>
where
    S: Service<Request<Bytes>, Response = Response<Bytes>, Error = Error>,
{
    inner.ready().await?.call(request).await
}

/// Refresh-flavoured call: swap in the current long credential, no retry.
async fn refresh_call<S, P>(
    inner: S,
    provider: &P,
    request: &Request<Bytes>,
) -> Result<Response<Bytes>>
where
    S: Service<Request<Bytes>, Response = Response<Bytes>, Error = Error>,
    P: CredentialProvider,
{
    let request = request.with_header(
        provider.long_credential_header(),
        &provider.long_credential(),
    )?;

    debug!("dispatching credential refresh call");
    dispatch(inner, request).await
}

/// Ordinary call: attach the short credential, sniff, refresh and retry once.
async fn authorized_call<S, P>(
    inner: S,
    provider: &P,
    coordinator: &RefreshCoordinator,
    original: Request<Bytes>,
) -> Result<Response<Bytes>>
where
    S: Service<Request<Bytes>, Response = Response<Bytes>, Error = Error> + Clone,
    P: CredentialProvider,
{
    let short_header = provider.short_credential_header();
    let retry_inner = inner.clone();

    // read before the credential so a refresh racing with this call is seen
    let observed = coordinator.generation();
    let request = original.with_header(short_header, &provider.short_credential())?;
    let response = dispatch(inner, request).await?;

    match sniff(provider, response.body(), response.content_type().as_ref()) {
        Verdict::Expired => {}
        Verdict::Valid => {
            debug!(status = response.status(), "short credential accepted");
            return Ok(response);
        }
        Verdict::Inconclusive(reason) => {
            debug!(?reason, status = response.status(), "response body not inspected");
            return Ok(response);
        }
    }

    info!(status = response.status(), "short credential expired, refreshing");
    let outcome = coordinator
        .refresh(observed, || provider.refresh_short_credential())
        .await
        .inspect_err(|err| warn!(error = %err, "short credential refresh failed"))?;
    debug!(?outcome, "retrying with refreshed short credential");

    let retry = original.with_header(short_header, &provider.short_credential())?;
    dispatch(retry_inner, retry).await
}
