//! idflow Models - shared data primitives.
//!
//! - `ProfileIdentifier` and the order-independent identity key
//! - `Profile`, a display bundle keyed by its identifier set
//! - `TokenBag`, the per-sign-in token accumulator
//! - `ProfileTaskResult` / `IdentityToken`, values returned across async boundaries

pub mod identifier;
pub mod profile;
pub mod result;
pub mod token_bag;

pub use identifier::{ProfileIdentifier, identity_key, stable_hash};
pub use profile::Profile;
pub use result::{IdentityToken, ProfileTaskResult};
pub use token_bag::TokenBag;
