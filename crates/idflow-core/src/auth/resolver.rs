//! Identity resolution
//!
//! Decides whether an incoming profile is a new identity or another view of a
//! known one. Two profiles are the same identity when they share at least one
//! identifier; the first such profile in enumeration order wins.

use idflow_models::Profile;
use tracing::debug;

use super::collection::ProfileCollection;

pub use idflow_models::{identity_key, stable_hash};

/// What a merge did to the collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    /// An existing profile matched; the value is its key.
    Refreshed(u32),
    /// No profile matched; the value is the key the new profile was stored under.
    Inserted(u32),
}

impl MergeOutcome {
    pub fn key(&self) -> u32 {
        match self {
            MergeOutcome::Refreshed(key) | MergeOutcome::Inserted(key) => *key,
        }
    }
}

/// Merge a suggested profile.
///
/// A match only has its display name and tile URI refreshed; its identifiers,
/// key and suggestion flag are kept. A new profile is stored as a suggestion.
pub fn merge_suggestion(collection: &mut ProfileCollection, profile: Profile) -> MergeOutcome {
    if let Some(key) = collection.find_sharing(&profile)
        && let Some(existing) = collection.get_mut(key)
    {
        existing.refresh_display_from(&profile);
        debug!(key, display_name = %existing.display_name(), "Refreshed known profile from suggestion");
        return MergeOutcome::Refreshed(key);
    }

    let key = collection.insert(profile.with_suggestion(true));
    debug!(key, "Inserted suggested profile");
    MergeOutcome::Inserted(key)
}

/// Merge a profile the user confirmed.
///
/// Same matching rule as [`merge_suggestion`], but the resulting profile is
/// always a confirmed one.
pub fn merge_confirmed(collection: &mut ProfileCollection, profile: Profile) -> MergeOutcome {
    if let Some(key) = collection.find_sharing(&profile)
        && let Some(existing) = collection.get_mut(key)
    {
        existing.refresh_display_from(&profile);
        existing.set_suggestion(false);
        debug!(key, "Confirmed known profile");
        return MergeOutcome::Refreshed(key);
    }

    let key = collection.insert(profile.with_suggestion(false));
    debug!(key, "Inserted confirmed profile");
    MergeOutcome::Inserted(key)
}

/// Insert persisted profiles directly, without matching them against each
/// other. Returns how many new keys were added; a stored profile whose key is
/// already present replaces the earlier one and is not counted.
pub fn load_stored(collection: &mut ProfileCollection, profiles: Vec<Profile>) -> usize {
    let before = collection.len();
    for profile in profiles {
        collection.insert(profile.with_suggestion(false));
    }
    collection.len() - before
}
