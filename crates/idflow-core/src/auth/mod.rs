//! Profile management and sign-in.
//!
//! - `collection` - ordered, identity-keyed profile set
//! - `resolver` - identity matching and merge rules
//! - `signin` - the per-attempt sign-in state machine
//! - `manager` - the `ProfileManager` facade

pub mod collection;
pub mod error;
pub mod manager;
pub mod resolver;
pub mod signin;
#[cfg(any(test, feature = "test-utils"))]
pub mod testkit;

pub use collection::ProfileCollection;
pub use error::{ManagerError, Result};
pub use manager::{InitializeSummary, ProfileManager};
pub use resolver::{MergeOutcome, merge_confirmed, merge_suggestion};
pub use signin::{AuthenticatedSession, CANCELLED_MESSAGE, CollectionPersister, SignInOutcome};
