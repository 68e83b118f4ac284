//! Profile Manager
//!
//! Owns the profile collection and wires suggestion providers, identity
//! providers, the remote authentication service and the profile store
//! together.

use async_trait::async_trait;
use futures::StreamExt;
use futures::stream::select_all;
use idflow_models::{Profile, ProfileTaskResult};
use idflow_storage::{MasterKeyKeystore, ProfileStore, StorageError, paths};
use idflow_traits::{IdentityProvider, RemoteClientFactory, SuggestionProvider};
use parking_lot::{Mutex as SyncMutex, RwLock as SyncRwLock};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::collection::ProfileCollection;
use super::error::Result;
use super::resolver::{self, MergeOutcome};
use super::signin::{
    AuthenticatedSession, CollectionPersister, SignInContext, SignInFlow, SignInOutcome,
};
use crate::config::{ManagerConfig, PersistenceMode};

/// Counts reported by [`ProfileManager::initialize`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InitializeSummary {
    /// Distinct profiles loaded from the store
    pub loaded: usize,
    /// Suggestions that became new profiles
    pub suggested: usize,
    /// Suggestions that refreshed a known profile
    pub refreshed: usize,
}

/// Whether the stored document may be replaced by the next save.
#[derive(Debug, Clone, PartialEq, Eq)]
enum StoreState {
    Writable,
    /// The document could not be opened; move it aside before writing.
    PreserveBeforeWrite,
    /// The document was written by a newer version; never replace it.
    ReadOnly(String),
}

/// Profile Manager
///
/// Providers are registered through `&mut self` before the manager is shared;
/// every other operation takes `&self` and may run concurrently.
pub struct ProfileManager {
    config: ManagerConfig,
    store: Arc<ProfileStore>,
    profiles: Arc<RwLock<ProfileCollection>>,
    save_lock: Mutex<()>,
    store_state: SyncMutex<StoreState>,
    suggestion_providers: Vec<Arc<dyn SuggestionProvider>>,
    identity_providers: HashMap<String, Arc<dyn IdentityProvider>>,
    remote: Arc<dyn RemoteClientFactory>,
    primary: SyncRwLock<Option<u32>>,
    active_session: SyncRwLock<Option<AuthenticatedSession>>,
}

impl ProfileManager {
    pub fn new(
        config: ManagerConfig,
        store: Arc<ProfileStore>,
        remote: Arc<dyn RemoteClientFactory>,
    ) -> Self {
        Self {
            config,
            store,
            profiles: Arc::new(RwLock::new(ProfileCollection::new())),
            save_lock: Mutex::new(()),
            store_state: SyncMutex::new(StoreState::Writable),
            suggestion_providers: Vec::new(),
            identity_providers: HashMap::new(),
            remote,
            primary: SyncRwLock::new(None),
            active_session: SyncRwLock::new(None),
        }
    }

    /// Manager over the per-user store, sealed with the user's master key.
    ///
    /// `config.profiles_path` overrides the document location.
    pub fn open_default(
        config: ManagerConfig,
        remote: Arc<dyn RemoteClientFactory>,
    ) -> Result<Self> {
        let path = match &config.profiles_path {
            Some(path) => path.clone(),
            None => paths::profiles_path()?,
        };
        let keystore = MasterKeyKeystore::load_default()?;
        let store = ProfileStore::new(path, Arc::new(keystore));
        Ok(Self::new(config, Arc::new(store), remote))
    }

    pub fn config(&self) -> &ManagerConfig {
        &self.config
    }

    pub fn add_suggestion_provider(&mut self, provider: Arc<dyn SuggestionProvider>) {
        debug!(provider = provider.name(), "Registered suggestion provider");
        self.suggestion_providers.push(provider);
    }

    /// Register an identity provider under its key. A later registration for
    /// the same key replaces the earlier one.
    pub fn add_identity_provider(&mut self, provider: Arc<dyn IdentityProvider>) {
        let key = provider.provider_key().to_string();
        if self.identity_providers.insert(key.clone(), provider).is_some() {
            warn!(provider_key = %key, "Replaced identity provider");
        } else {
            debug!(provider_key = %key, "Registered identity provider");
        }
    }

    /// Load stored profiles, then merge every suggestion.
    ///
    /// In lenient mode an unreadable store starts the manager empty; in strict
    /// mode the load error is returned. Either way an unreadable document is
    /// never overwritten: one from a newer version blocks every save, any
    /// other is moved aside before the first save.
    pub async fn initialize(&self) -> Result<InitializeSummary> {
        let loaded = self.store.load().await;
        *self.store_state.lock() = match &loaded {
            Ok(_) => StoreState::Writable,
            Err(error @ StorageError::UnsupportedVersion { .. }) => {
                StoreState::ReadOnly(error.to_string())
            }
            Err(_) => StoreState::PreserveBeforeWrite,
        };

        let stored = match loaded {
            Ok(stored) => stored,
            Err(error) => match self.config.persistence {
                PersistenceMode::Lenient => {
                    warn!(
                        path = %self.store.path().display(),
                        error = %error,
                        "Failed to load stored profiles, starting empty"
                    );
                    Vec::new()
                }
                PersistenceMode::Strict => return Err(error.into()),
            },
        };

        let mut summary = InitializeSummary {
            loaded: resolver::load_stored(&mut *self.profiles.write().await, stored),
            ..Default::default()
        };

        let mut suggestions = select_all(
            self.suggestion_providers
                .iter()
                .map(|provider| provider.profiles()),
        );
        while let Some(profile) = suggestions.next().await {
            let outcome = resolver::merge_suggestion(&mut *self.profiles.write().await, profile);
            match outcome {
                MergeOutcome::Inserted(_) => summary.suggested += 1,
                MergeOutcome::Refreshed(_) => summary.refreshed += 1,
            }
        }

        info!(
            loaded = summary.loaded,
            suggested = summary.suggested,
            refreshed = summary.refreshed,
            total_profiles = self.num_profiles().await,
            "Profile manager initialized"
        );
        Ok(summary)
    }

    pub async fn num_profiles(&self) -> usize {
        self.profiles.read().await.len()
    }

    /// Profile at `index` in enumeration order.
    pub async fn profile(&self, index: usize) -> Option<Profile> {
        self.profiles.read().await.get_by_index(index).cloned()
    }

    pub async fn profiles(&self) -> Vec<Profile> {
        self.profiles.read().await.snapshot()
    }

    /// Add (or confirm) a profile and persist the collection.
    pub async fn add_profile(&self, profile: Profile) -> ProfileTaskResult {
        let outcome = resolver::merge_confirmed(&mut *self.profiles.write().await, profile);
        debug!(key = outcome.key(), ?outcome, "Merged confirmed profile");

        match self.persist().await {
            Ok(()) => ProfileTaskResult::success(),
            Err(error) => {
                warn!(error = %error, "Failed to persist profiles after add");
                ProfileTaskResult::failure(format!("Failed to persist profiles: {error}"))
            }
        }
    }

    /// Select the profile used by [`ProfileManager::sign_in_primary`].
    ///
    /// The profile must already be known, either by key or by a shared
    /// identifier.
    pub async fn set_primary_profile(&self, profile: &Profile) -> ProfileTaskResult {
        let key = {
            let profiles = self.profiles.read().await;
            let key = profile.internal_identifier();
            if profiles.contains(key) {
                Some(key)
            } else {
                profiles.find_sharing(profile)
            }
        };

        match key {
            Some(key) => {
                *self.primary.write() = Some(key);
                info!(key, "Primary profile selected");
                ProfileTaskResult::success()
            }
            None => ProfileTaskResult::failure("Profile is not known to the profile manager"),
        }
    }

    pub async fn primary_profile(&self) -> Option<Profile> {
        let key = (*self.primary.read())?;
        self.profiles.read().await.get(key).cloned()
    }

    /// Sign in as `profile`, forwarding `parameters` to every identity provider.
    pub async fn sign_in(
        &self,
        profile: &Profile,
        parameters: &HashMap<String, String>,
    ) -> ProfileTaskResult {
        self.run_sign_in(profile, parameters, None).await
    }

    /// Like [`ProfileManager::sign_in`]; cancelling `cancel` abandons the
    /// attempt unless it already authenticated.
    pub async fn sign_in_with_cancellation(
        &self,
        profile: &Profile,
        parameters: &HashMap<String, String>,
        cancel: &CancellationToken,
    ) -> ProfileTaskResult {
        self.run_sign_in(profile, parameters, Some(cancel)).await
    }

    pub async fn sign_in_primary(&self, parameters: &HashMap<String, String>) -> ProfileTaskResult {
        match self.primary_profile().await {
            Some(profile) => self.sign_in(&profile, parameters).await,
            None => ProfileTaskResult::failure("No primary profile selected"),
        }
    }

    /// Session of the most recent successful sign-in.
    pub fn active_session(&self) -> Option<AuthenticatedSession> {
        self.active_session.read().clone()
    }

    async fn run_sign_in(
        &self,
        profile: &Profile,
        parameters: &HashMap<String, String>,
        cancel: Option<&CancellationToken>,
    ) -> ProfileTaskResult {
        let persister = StoreWriter { manager: self };
        let ctx = SignInContext {
            identity_providers: &self.identity_providers,
            remote: self.remote.as_ref(),
            persister: &persister,
            remote_address: &self.config.remote_address,
            unknown_provider: self.config.unknown_provider,
            persistence: self.config.persistence,
        };

        info!(
            key = profile.internal_identifier(),
            identifiers = profile.num_identifiers(),
            "Starting sign-in"
        );
        let outcome = SignInFlow::new(ctx, profile, parameters).run(cancel).await;

        let result = outcome.to_task_result();
        if let SignInOutcome::Succeeded(session) = outcome {
            *self.active_session.write() = Some(session);
        }
        result
    }

    /// Snapshot the collection and save it. Writers are serialized so the
    /// last save always carries the newest snapshot.
    async fn persist(&self) -> std::result::Result<(), StorageError> {
        let _guard = self.save_lock.lock().await;

        let state = self.store_state.lock().clone();
        match state {
            StoreState::Writable => {}
            StoreState::ReadOnly(reason) => return Err(StorageError::ReadOnly(reason)),
            StoreState::PreserveBeforeWrite => {
                self.store.preserve_unreadable().await?;
                *self.store_state.lock() = StoreState::Writable;
            }
        }

        let snapshot = self.profiles.read().await.snapshot();
        self.store.save(&snapshot).await
    }
}

struct StoreWriter<'a> {
    manager: &'a ProfileManager,
}

#[async_trait]
impl CollectionPersister for StoreWriter<'_> {
    async fn persist(&self) -> std::result::Result<(), StorageError> {
        self.manager.persist().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::testkit::{
        RecordingRemoteFactory, ScriptedIdentityProvider, StaticSuggestionProvider,
        create_test_manager, profile,
    };

    #[tokio::test]
    async fn test_initialize_empty_store() {
        let harness = create_test_manager(ManagerConfig::default(), RecordingRemoteFactory::new());
        let summary = harness.manager.initialize().await.unwrap();

        assert_eq!(summary, InitializeSummary::default());
        assert_eq!(harness.manager.num_profiles().await, 0);
        assert!(harness.manager.profile(0).await.is_none());
    }

    #[tokio::test]
    async fn test_initialize_merges_suggestions_over_stored() {
        let mut harness = create_test_manager(ManagerConfig::default(), RecordingRemoteFactory::new());
        harness
            .store
            .save(&[profile("alice", &[("steam", "1")])])
            .await
            .unwrap();
        harness
            .manager
            .add_suggestion_provider(Arc::new(StaticSuggestionProvider::new(
                "launcher",
                vec![
                    profile("Alice", &[("steam", "1")]),
                    profile("bob", &[("steam", "2")]),
                ],
            )));

        let summary = harness.manager.initialize().await.unwrap();

        assert_eq!(
            summary,
            InitializeSummary {
                loaded: 1,
                suggested: 1,
                refreshed: 1
            }
        );
        let first = harness.manager.profile(0).await.unwrap();
        assert_eq!(first.display_name(), "Alice");
        assert!(!first.is_suggestion());
        assert!(harness.manager.profile(1).await.unwrap().is_suggestion());
    }

    #[tokio::test]
    async fn test_set_primary_requires_known_profile() {
        let harness = create_test_manager(ManagerConfig::default(), RecordingRemoteFactory::new());
        let alice = profile("alice", &[("steam", "1")]);

        let result = harness.manager.set_primary_profile(&alice).await;
        assert!(!result.has_succeeded());
        assert!(harness.manager.primary_profile().await.is_none());

        harness.manager.add_profile(alice.clone()).await;
        assert!(harness.manager.set_primary_profile(&alice).await.has_succeeded());
        assert_eq!(
            harness.manager.primary_profile().await.unwrap().display_name(),
            "alice"
        );
    }

    #[tokio::test]
    async fn test_set_primary_by_shared_identifier() {
        let harness = create_test_manager(ManagerConfig::default(), RecordingRemoteFactory::new());
        harness
            .manager
            .add_profile(profile("alice", &[("steam", "1"), ("ros", "alice")]))
            .await;

        let partial = profile("alice", &[("steam", "1")]);
        assert!(harness.manager.set_primary_profile(&partial).await.has_succeeded());
        assert_eq!(
            harness.manager.primary_profile().await.unwrap().num_identifiers(),
            2
        );
    }

    #[tokio::test]
    async fn test_sign_in_primary() {
        let mut harness = create_test_manager(ManagerConfig::default(), RecordingRemoteFactory::new());
        harness
            .manager
            .add_identity_provider(Arc::new(ScriptedIdentityProvider::succeeding(
                "steam", "steam_ticket", "t",
            )));
        let parameters = HashMap::new();

        let result = harness.manager.sign_in_primary(&parameters).await;
        assert_eq!(result.error_message(), Some("No primary profile selected"));

        let alice = profile("alice", &[("steam", "1")]);
        harness.manager.add_profile(alice.clone()).await;
        harness.manager.set_primary_profile(&alice).await;

        assert!(harness.manager.sign_in_primary(&parameters).await.has_succeeded());
        assert_eq!(
            harness.manager.active_session().unwrap().internal_identifier,
            alice.internal_identifier()
        );
    }

    #[tokio::test]
    async fn test_identity_provider_replaced_by_key() {
        let mut harness = create_test_manager(ManagerConfig::default(), RecordingRemoteFactory::new());
        let first = Arc::new(ScriptedIdentityProvider::failing("steam", "old"));
        let second = Arc::new(ScriptedIdentityProvider::succeeding("steam", "steam_ticket", "t"));
        harness.manager.add_identity_provider(first.clone());
        harness.manager.add_identity_provider(second.clone());

        let result = harness
            .manager
            .sign_in(&profile("alice", &[("steam", "1")]), &HashMap::new())
            .await;

        assert!(result.has_succeeded());
        assert_eq!(first.call_count(), 0);
        assert_eq!(second.call_count(), 1);
    }
}
