//! idflow Storage - confidential persistence of the profile set.
//!
//! A single document (`profiles.json`) in the per-user idflow directory holds
//! every profile's display fields and identifiers. The document is sealed with
//! AES-256-GCM under a master key that only the local user can read, so the
//! file is only recoverable by the principal that wrote it.
//!
//! # Layout
//!
//! - `~/.idflow/profiles.json` - sealed profile document
//! - `~/.idflow/master.key` - 32-byte master key (mode 0600)
//! - `~/.idflow/config.toml` - manager configuration
//!
//! `IDFLOW_DIR` overrides the directory.

pub mod document;
pub mod error;
pub mod keychain;
pub mod keystore;
pub mod paths;
pub mod profile_store;

mod encryption;

pub use document::{DOCUMENT_VERSION, parse_document, serialize_document};
pub use error::{Result, StorageError};
pub use keystore::{LocalKeystore, MasterKeyKeystore};
pub use profile_store::{PROFILES_ASSOCIATED_DATA, ProfileStore};
