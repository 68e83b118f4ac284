use idflow_models::Profile;
use std::collections::HashMap;

/// Profiles keyed by identity key, enumerated in first-insertion order.
#[derive(Debug, Clone, Default)]
pub struct ProfileCollection {
    profiles: HashMap<u32, Profile>,
    order: Vec<u32>,
}

impl ProfileCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn contains(&self, key: u32) -> bool {
        self.profiles.contains_key(&key)
    }

    pub fn get(&self, key: u32) -> Option<&Profile> {
        self.profiles.get(&key)
    }

    pub fn get_mut(&mut self, key: u32) -> Option<&mut Profile> {
        self.profiles.get_mut(&key)
    }

    /// Profile at `index` in enumeration order.
    pub fn get_by_index(&self, index: usize) -> Option<&Profile> {
        self.order.get(index).and_then(|key| self.profiles.get(key))
    }

    /// Insert under the profile's own identity key.
    ///
    /// An existing profile with the same key is replaced in place and keeps
    /// its position.
    pub fn insert(&mut self, profile: Profile) -> u32 {
        let key = profile.internal_identifier();
        if self.profiles.insert(key, profile).is_none() {
            self.order.push(key);
        }
        key
    }

    /// Key of the first profile, in enumeration order, sharing at least one
    /// identifier with `candidate`.
    pub fn find_sharing(&self, candidate: &Profile) -> Option<u32> {
        self.order.iter().copied().find(|key| {
            self.profiles
                .get(key)
                .is_some_and(|existing| existing.shares_identifier_with(candidate))
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = &Profile> {
        self.order.iter().filter_map(|key| self.profiles.get(key))
    }

    /// Owned copy of every profile in enumeration order.
    pub fn snapshot(&self) -> Vec<Profile> {
        self.iter().cloned().collect()
    }
}
