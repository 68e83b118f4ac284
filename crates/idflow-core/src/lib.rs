//! idflow Core - profile manager for multi-provider sign-in.
//!
//! Keeps the user's profiles (display name, tile URI and a set of third-party
//! identifiers), merges profiles discovered by suggestion providers into the
//! stored set, and signs a profile in by exchanging each identifier for a token
//! and presenting the tokens to the remote authentication service.

pub mod auth;
pub mod config;
pub mod logging;

pub use auth::{
    AuthenticatedSession, InitializeSummary, ManagerError, MergeOutcome, ProfileCollection,
    ProfileManager,
};
pub use config::{IdflowConfig, LoggingConfig, ManagerConfig, PersistenceMode, UnknownProviderPolicy};

// Re-exported for hosts that only depend on the core crate.
pub use idflow_models::{Profile, ProfileIdentifier, ProfileTaskResult, TokenBag};
pub use idflow_storage::{ProfileStore, paths};
pub use idflow_traits::{
    IdentityProvider, ProviderError, RemoteClient, RemoteClientFactory, RemoteFailure,
    SuggestionProvider,
};
