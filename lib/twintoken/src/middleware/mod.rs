//! Tower middleware layers for the twintoken HTTP client.
//!
//! # Available Layers
//!
//! - [`DualTokenLayer`] - Attaches the short credential, detects expiry in
//!   response bodies, refreshes and retries once
//!
//! # Building Blocks
//!
//! - [`sniff`](sniff::sniff) - Non-destructive body inspection behind the
//!   layer's expiry detection
//! - [`RefreshCoordinator`] / [`RefreshStrategy`] - Mutual exclusion around
//!   the provider's refresh operation
//!
//! # Example: Using the Builder API
//!
//! ```ignore
//! use twintoken::HyperClient;
//!
//! let client = HyperClient::builder()
//!     .with_dual_token(tokens)
//!     .build();
//!
//! // Power users: raw layer access
//! use twintoken::middleware::{DualTokenLayer, RefreshStrategy};
//! let client = HyperClient::builder()
//!     .with_dual_token_layer(
//!         DualTokenLayer::new(tokens).refresh_strategy(RefreshStrategy::SingleFlight),
//!     )
//!     .build();
//! ```

mod dual_token;
mod refresh;
pub mod sniff;

pub use dual_token::{DualToken, DualTokenLayer};
pub use refresh::{RefreshCoordinator, RefreshOutcome, RefreshStrategy};
pub use sniff::{InconclusiveReason, Verdict};

// Re-export tower types for convenience
pub use tower::{Layer, ServiceBuilder};
