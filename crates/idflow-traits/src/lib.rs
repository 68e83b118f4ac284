//! idflow Traits - collaborator interfaces.
//!
//! The core never implements these; hosts register implementations with the
//! profile manager:
//! - `SuggestionProvider` discovers candidate profiles
//! - `IdentityProvider` exchanges one identifier for a token
//! - `RemoteClientFactory` / `RemoteClient` reach the authentication service

pub mod error;
pub mod provider;
pub mod remote;

pub use error::{ProviderError, RemoteFailure};
pub use provider::{IdentityProvider, IdentityResult, SuggestionProvider};
pub use remote::{RemoteClient, RemoteClientFactory};
