//! Remote authentication service interface.
//!
//! The wire protocol is owned by the implementation; the core only needs a
//! connect step followed by a token-bag authentication step.

use std::sync::Arc;

use async_trait::async_trait;
use idflow_models::TokenBag;

use crate::error::RemoteFailure;

/// A client session with the remote authentication service.
#[async_trait]
pub trait RemoteClient: Send + Sync {
    /// Connect to the service at `address`.
    async fn connect(&self, address: &str) -> Result<(), RemoteFailure>;

    /// Authenticate the connected session with every token gathered during sign-in.
    async fn authenticate_with_token_bag(&self, tokens: &TokenBag) -> Result<(), RemoteFailure>;
}

/// Creates a fresh client for each sign-in attempt.
pub trait RemoteClientFactory: Send + Sync {
    fn create(&self) -> Arc<dyn RemoteClient>;
}
