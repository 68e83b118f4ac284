//! Test doubles for deterministic profile-manager tests.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use futures::StreamExt;
use futures::stream::{self, BoxStream};
use idflow_models::{IdentityToken, Profile, ProfileIdentifier, TokenBag};
use idflow_storage::{LocalKeystore, MasterKeyKeystore, ProfileStore, StorageError};
use idflow_traits::{
    IdentityProvider, IdentityResult, ProviderError, RemoteClient, RemoteClientFactory,
    RemoteFailure, SuggestionProvider,
};
use parking_lot::Mutex;
use tokio::time::{Duration, sleep};

use super::manager::ProfileManager;
use super::signin::CollectionPersister;
use crate::config::ManagerConfig;

/// Build a profile from `(provider_key, provider_value)` pairs.
pub fn profile(display_name: &str, pairs: &[(&str, &str)]) -> Profile {
    Profile::new(
        display_name,
        format!("tile://{display_name}"),
        pairs
            .iter()
            .map(|&(key, value)| ProfileIdentifier::new(key, value))
            .collect(),
    )
}

/// Identity provider that returns a fixed result.
pub struct ScriptedIdentityProvider {
    provider_key: String,
    result: IdentityResult,
    delay: Option<Duration>,
    call_count: AtomicU32,
}

impl ScriptedIdentityProvider {
    pub fn succeeding(provider_key: &str, token_type: &str, token: &str) -> Self {
        Self::new(provider_key, Ok(IdentityToken::new(token_type, token)))
    }

    pub fn failing(provider_key: &str, message: &str) -> Self {
        Self::new(provider_key, Err(ProviderError::new(message)))
    }

    fn new(provider_key: &str, result: IdentityResult) -> Self {
        Self {
            provider_key: provider_key.to_string(),
            result,
            delay: None,
            call_count: AtomicU32::new(0),
        }
    }

    /// Wait before answering, to keep a sign-in in flight.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn call_count(&self) -> u32 {
        self.call_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl IdentityProvider for ScriptedIdentityProvider {
    fn provider_key(&self) -> &str {
        &self.provider_key
    }

    async fn process_identity(
        &self,
        _profile: &Profile,
        _parameters: &HashMap<String, String>,
    ) -> IdentityResult {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            sleep(delay).await;
        }
        self.result.clone()
    }
}

/// Suggestion provider yielding a fixed list.
pub struct StaticSuggestionProvider {
    name: String,
    profiles: Vec<Profile>,
}

impl StaticSuggestionProvider {
    pub fn new(name: &str, profiles: Vec<Profile>) -> Self {
        Self {
            name: name.to_string(),
            profiles,
        }
    }
}

impl SuggestionProvider for StaticSuggestionProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn profiles(&self) -> BoxStream<'_, Profile> {
        stream::iter(self.profiles.clone()).boxed()
    }
}

/// Remote client that records every call and fails with configured codes.
#[derive(Default)]
pub struct RecordingRemoteClient {
    connect_failure: Option<i32>,
    authenticate_failure: Option<i32>,
    connect_calls: AtomicU32,
    authenticate_calls: AtomicU32,
    last_address: Mutex<Option<String>>,
    last_token_bag: Mutex<Option<TokenBag>>,
}

impl RecordingRemoteClient {
    pub fn connect_calls(&self) -> u32 {
        self.connect_calls.load(Ordering::SeqCst)
    }

    pub fn authenticate_calls(&self) -> u32 {
        self.authenticate_calls.load(Ordering::SeqCst)
    }

    pub fn last_address(&self) -> Option<String> {
        self.last_address.lock().clone()
    }

    pub fn last_token_bag(&self) -> Option<TokenBag> {
        self.last_token_bag.lock().clone()
    }
}

#[async_trait]
impl RemoteClient for RecordingRemoteClient {
    async fn connect(&self, address: &str) -> Result<(), RemoteFailure> {
        self.connect_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_address.lock() = Some(address.to_string());
        match self.connect_failure {
            Some(code) => Err(RemoteFailure::new(code)),
            None => Ok(()),
        }
    }

    async fn authenticate_with_token_bag(&self, tokens: &TokenBag) -> Result<(), RemoteFailure> {
        self.authenticate_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_token_bag.lock() = Some(tokens.clone());
        match self.authenticate_failure {
            Some(code) => Err(RemoteFailure::new(code)),
            None => Ok(()),
        }
    }
}

/// Factory handing out one shared [`RecordingRemoteClient`].
pub struct RecordingRemoteFactory {
    client: Arc<RecordingRemoteClient>,
    created: AtomicU32,
}

impl RecordingRemoteFactory {
    pub fn new() -> Self {
        Self::with_client(RecordingRemoteClient::default())
    }

    pub fn failing_connect(code: i32) -> Self {
        Self::with_client(RecordingRemoteClient {
            connect_failure: Some(code),
            ..Default::default()
        })
    }

    pub fn failing_authenticate(code: i32) -> Self {
        Self::with_client(RecordingRemoteClient {
            authenticate_failure: Some(code),
            ..Default::default()
        })
    }

    fn with_client(client: RecordingRemoteClient) -> Self {
        Self {
            client: Arc::new(client),
            created: AtomicU32::new(0),
        }
    }

    pub fn client(&self) -> Arc<RecordingRemoteClient> {
        self.client.clone()
    }

    pub fn created_count(&self) -> u32 {
        self.created.load(Ordering::SeqCst)
    }
}

impl Default for RecordingRemoteFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl RemoteClientFactory for RecordingRemoteFactory {
    fn create(&self) -> Arc<dyn RemoteClient> {
        self.created.fetch_add(1, Ordering::SeqCst);
        self.client.clone()
    }
}

/// Persister that only counts calls.
#[derive(Default)]
pub struct RecordingPersister {
    count: AtomicU32,
}

impl RecordingPersister {
    pub fn count(&self) -> u32 {
        self.count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CollectionPersister for RecordingPersister {
    async fn persist(&self) -> Result<(), StorageError> {
        self.count.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Persister whose every write fails.
pub struct FailingPersister;

#[async_trait]
impl CollectionPersister for FailingPersister {
    async fn persist(&self) -> Result<(), StorageError> {
        Err(StorageError::Io(std::io::Error::other("disk unavailable")))
    }
}

/// Master-key keystore that counts seal and open calls.
pub struct CountingKeystore {
    inner: MasterKeyKeystore,
    seals: AtomicU32,
    opens: AtomicU32,
}

impl CountingKeystore {
    pub fn new(master_key: [u8; 32]) -> Self {
        Self {
            inner: MasterKeyKeystore::from_key(&master_key).expect("32-byte key is valid"),
            seals: AtomicU32::new(0),
            opens: AtomicU32::new(0),
        }
    }

    /// Number of documents written.
    pub fn seal_count(&self) -> u32 {
        self.seals.load(Ordering::SeqCst)
    }

    pub fn open_count(&self) -> u32 {
        self.opens.load(Ordering::SeqCst)
    }
}

impl LocalKeystore for CountingKeystore {
    fn seal(&self, associated_data: &[u8], plaintext: &[u8]) -> idflow_storage::Result<Vec<u8>> {
        self.seals.fetch_add(1, Ordering::SeqCst);
        self.inner.seal(associated_data, plaintext)
    }

    fn open(&self, associated_data: &[u8], ciphertext: &[u8]) -> idflow_storage::Result<Vec<u8>> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        self.inner.open(associated_data, ciphertext)
    }
}

/// Test key shared by every store created through this module.
pub const TEST_MASTER_KEY: [u8; 32] = [0x5A; 32];

/// Creates a profile store in a fresh temporary directory.
pub fn create_test_store() -> (Arc<ProfileStore>, Arc<CountingKeystore>, tempfile::TempDir) {
    let temp_dir = tempfile::tempdir().expect("failed to create temp dir");
    let keystore = Arc::new(CountingKeystore::new(TEST_MASTER_KEY));
    let store = Arc::new(ProfileStore::new(
        temp_dir.path().join("profiles.json"),
        keystore.clone(),
    ));
    (store, keystore, temp_dir)
}

/// A manager wired to test doubles; providers can still be registered.
pub struct TestManager {
    pub manager: ProfileManager,
    pub store: Arc<ProfileStore>,
    pub keystore: Arc<CountingKeystore>,
    pub remote: Arc<RecordingRemoteFactory>,
    pub temp_dir: tempfile::TempDir,
}

/// Creates a manager over a temporary store and the given remote factory.
pub fn create_test_manager(config: ManagerConfig, remote: RecordingRemoteFactory) -> TestManager {
    let (store, keystore, temp_dir) = create_test_store();
    let remote = Arc::new(remote);
    let manager = ProfileManager::new(config, store.clone(), remote.clone());
    TestManager {
        manager,
        store,
        keystore,
        remote,
        temp_dir,
    }
}
