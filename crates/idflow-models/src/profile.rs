//! User profiles: display metadata plus a set of third-party identifiers.

use crate::identifier::{ProfileIdentifier, identity_key};

/// A user identity bundle.
///
/// The internal identifier is derived from the identifier set and recomputed on
/// every change to it, so it can serve as the storage key for the profile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Profile {
    display_name: String,
    tile_uri: String,
    identifiers: Vec<ProfileIdentifier>,
    internal_identifier: u32,
    is_suggestion: bool,
}

impl Profile {
    /// Create a confirmed (non-suggestion) profile.
    pub fn new(
        display_name: impl Into<String>,
        tile_uri: impl Into<String>,
        identifiers: Vec<ProfileIdentifier>,
    ) -> Self {
        let internal_identifier = identity_key(&identifiers);
        Self {
            display_name: display_name.into(),
            tile_uri: tile_uri.into(),
            identifiers,
            internal_identifier,
            is_suggestion: false,
        }
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn tile_uri(&self) -> &str {
        &self.tile_uri
    }

    /// Identifiers in their stored order.
    pub fn identifiers(&self) -> &[ProfileIdentifier] {
        &self.identifiers
    }

    pub fn num_identifiers(&self) -> usize {
        self.identifiers.len()
    }

    pub fn identifier(&self, index: usize) -> Option<&ProfileIdentifier> {
        self.identifiers.get(index)
    }

    pub fn internal_identifier(&self) -> u32 {
        self.internal_identifier
    }

    /// Whether the profile came from a suggestion source and was never confirmed.
    pub fn is_suggestion(&self) -> bool {
        self.is_suggestion
    }

    pub fn set_display_name(&mut self, display_name: impl Into<String>) {
        self.display_name = display_name.into();
    }

    pub fn set_tile_uri(&mut self, tile_uri: impl Into<String>) {
        self.tile_uri = tile_uri.into();
    }

    /// Replace the identifier set and recompute the internal identifier.
    pub fn set_identifiers(&mut self, identifiers: Vec<ProfileIdentifier>) {
        self.internal_identifier = identity_key(&identifiers);
        self.identifiers = identifiers;
    }

    pub fn set_suggestion(&mut self, is_suggestion: bool) {
        self.is_suggestion = is_suggestion;
    }

    /// Builder-style variant of [`Profile::set_suggestion`].
    pub fn with_suggestion(mut self, is_suggestion: bool) -> Self {
        self.is_suggestion = is_suggestion;
        self
    }

    /// True when at least one identifier is present in both profiles.
    pub fn shares_identifier_with(&self, other: &Profile) -> bool {
        self.identifiers
            .iter()
            .any(|identifier| other.identifiers.contains(identifier))
    }

    /// Copy display fields from `other`, leaving identity untouched.
    pub fn refresh_display_from(&mut self, other: &Profile) {
        self.display_name.clone_from(&other.display_name);
        self.tile_uri.clone_from(&other.tile_uri);
    }
}
