//! Sign-in orchestration
//!
//! A sign-in walks the profile's identifiers in order, asking the matching
//! identity provider for a token each time, then presents the collected
//! tokens to the authentication service and finally persists the profile set.
//! Every transition is one awaited step:
//!
//! ```text
//! Start -> PerIdentifier(0) -> ... -> PerIdentifier(n) -> Connecting
//!       -> Authenticating -> Persisting -> Succeeded
//! ```
//!
//! Any step may end in `Failed`. Identity providers are never invoked
//! concurrently and a failed step never reaches the remote service.

use async_trait::async_trait;
use idflow_models::{Profile, ProfileTaskResult, TokenBag};
use idflow_storage::StorageError;
use idflow_traits::{IdentityProvider, RemoteClient, RemoteClientFactory};
use std::collections::HashMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::{PersistenceMode, UnknownProviderPolicy};

/// Failure message for a sign-in abandoned through its cancellation token.
pub const CANCELLED_MESSAGE: &str = "Sign-in cancelled";

/// Writes the current profile set to durable storage.
#[async_trait]
pub trait CollectionPersister: Send + Sync {
    async fn persist(&self) -> Result<(), StorageError>;
}

/// Client that completed authentication for a profile.
#[derive(Clone)]
pub struct AuthenticatedSession {
    pub internal_identifier: u32,
    pub client: Arc<dyn RemoteClient>,
}

impl std::fmt::Debug for AuthenticatedSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthenticatedSession")
            .field("internal_identifier", &self.internal_identifier)
            .finish_non_exhaustive()
    }
}

/// Terminal state of a sign-in.
#[derive(Debug)]
pub enum SignInOutcome {
    Succeeded(AuthenticatedSession),
    Failed(String),
}

impl SignInOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, SignInOutcome::Succeeded(_))
    }

    pub fn to_task_result(&self) -> ProfileTaskResult {
        match self {
            SignInOutcome::Succeeded(_) => ProfileTaskResult::success(),
            SignInOutcome::Failed(message) => ProfileTaskResult::failure(message.clone()),
        }
    }
}

/// Collaborators and policies a sign-in runs against.
#[derive(Clone, Copy)]
pub struct SignInContext<'a> {
    pub identity_providers: &'a HashMap<String, Arc<dyn IdentityProvider>>,
    pub remote: &'a dyn RemoteClientFactory,
    pub persister: &'a dyn CollectionPersister,
    pub remote_address: &'a str,
    pub unknown_provider: UnknownProviderPolicy,
    pub persistence: PersistenceMode,
}

enum SignInState {
    Start,
    PerIdentifier(usize),
    Connecting,
    Authenticating(Arc<dyn RemoteClient>),
    Persisting(Arc<dyn RemoteClient>),
    Succeeded(AuthenticatedSession),
    Failed(String),
}

impl SignInState {
    fn name(&self) -> &'static str {
        match self {
            SignInState::Start => "start",
            SignInState::PerIdentifier(_) => "per_identifier",
            SignInState::Connecting => "connecting",
            SignInState::Authenticating(_) => "authenticating",
            SignInState::Persisting(_) => "persisting",
            SignInState::Succeeded(_) => "succeeded",
            SignInState::Failed(_) => "failed",
        }
    }

    /// Once the service accepted the tokens the flow always commits.
    fn is_cancellable(&self) -> bool {
        !matches!(self, SignInState::Persisting(_))
    }
}

/// A single sign-in attempt. The collected tokens live only as long as the flow.
pub struct SignInFlow<'a> {
    ctx: SignInContext<'a>,
    profile: &'a Profile,
    parameters: &'a HashMap<String, String>,
    tokens: TokenBag,
}

impl<'a> SignInFlow<'a> {
    pub fn new(
        ctx: SignInContext<'a>,
        profile: &'a Profile,
        parameters: &'a HashMap<String, String>,
    ) -> Self {
        Self {
            ctx,
            profile,
            parameters,
            tokens: TokenBag::new(),
        }
    }

    /// Drive the flow to a terminal state.
    pub async fn run(mut self, cancel: Option<&CancellationToken>) -> SignInOutcome {
        let key = self.profile.internal_identifier();
        let mut state = SignInState::Start;

        loop {
            state = match state {
                SignInState::Succeeded(session) => {
                    info!(key, "Sign-in succeeded");
                    return SignInOutcome::Succeeded(session);
                }
                SignInState::Failed(message) => {
                    info!(key, error = %message, "Sign-in failed");
                    return SignInOutcome::Failed(message);
                }
                current => {
                    debug!(key, state = current.name(), "Sign-in step");
                    match cancel {
                        Some(token) if current.is_cancellable() => {
                            tokio::select! {
                                biased;
                                _ = token.cancelled() => {
                                    SignInState::Failed(CANCELLED_MESSAGE.to_string())
                                }
                                next = self.step(current) => next,
                            }
                        }
                        _ => self.step(current).await,
                    }
                }
            };
        }
    }

    async fn step(&mut self, state: SignInState) -> SignInState {
        match state {
            SignInState::Start => SignInState::PerIdentifier(0),
            SignInState::PerIdentifier(index) => self.process_identifier(index).await,
            SignInState::Connecting => self.connect().await,
            SignInState::Authenticating(client) => self.authenticate(client).await,
            SignInState::Persisting(client) => self.persist(client).await,
            terminal @ (SignInState::Succeeded(_) | SignInState::Failed(_)) => terminal,
        }
    }

    async fn process_identifier(&mut self, index: usize) -> SignInState {
        let profile = self.profile;
        let Some(identifier) = profile.identifier(index) else {
            return SignInState::Connecting;
        };

        let providers = self.ctx.identity_providers;
        let Some(provider) = providers.get(&identifier.provider_key) else {
            return match self.ctx.unknown_provider {
                UnknownProviderPolicy::Skip => {
                    warn!(
                        provider_key = %identifier.provider_key,
                        "No identity provider registered, skipping identifier"
                    );
                    SignInState::PerIdentifier(index + 1)
                }
                UnknownProviderPolicy::Fail => SignInState::Failed(format!(
                    "No identity provider registered for '{}'",
                    identifier.provider_key
                )),
            };
        };

        match provider.process_identity(profile, self.parameters).await {
            Ok(token) => {
                debug!(
                    provider_key = %identifier.provider_key,
                    token_type = %token.token_type,
                    "Identity provider issued token"
                );
                self.tokens.add_token(token.token_type, token.token);
                SignInState::PerIdentifier(index + 1)
            }
            Err(error) => {
                debug!(provider_key = %identifier.provider_key, "Identity provider failed");
                SignInState::Failed(error.message)
            }
        }
    }

    async fn connect(&mut self) -> SignInState {
        let client = self.ctx.remote.create();
        match client.connect(self.ctx.remote_address).await {
            Ok(()) => SignInState::Authenticating(client),
            Err(failure) => SignInState::Failed(format!(
                "Connecting to the authentication service failed - error code {}.",
                failure.code
            )),
        }
    }

    async fn authenticate(&mut self, client: Arc<dyn RemoteClient>) -> SignInState {
        debug!(tokens = ?self.tokens, "Presenting token bag");
        match client.authenticate_with_token_bag(&self.tokens).await {
            Ok(()) => SignInState::Persisting(client),
            Err(failure) => SignInState::Failed(format!(
                "Authenticating to the authentication service failed - error code {}.",
                failure.code
            )),
        }
    }

    async fn persist(&mut self, client: Arc<dyn RemoteClient>) -> SignInState {
        if let Err(error) = self.ctx.persister.persist().await {
            match self.ctx.persistence {
                PersistenceMode::Lenient => {
                    warn!(error = %error, "Failed to persist profiles after sign-in");
                }
                PersistenceMode::Strict => {
                    return SignInState::Failed(format!("Failed to persist profiles: {error}"));
                }
            }
        }

        SignInState::Succeeded(AuthenticatedSession {
            internal_identifier: self.profile.internal_identifier(),
            client,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::testkit::{
        FailingPersister, RecordingPersister, RecordingRemoteFactory, ScriptedIdentityProvider,
    };
    use idflow_models::ProfileIdentifier;

    fn profile(pairs: &[(&str, &str)]) -> Profile {
        Profile::new(
            "alice",
            "",
            pairs.iter().map(|&(k, v)| ProfileIdentifier::new(k, v)).collect(),
        )
    }

    fn providers(
        list: Vec<Arc<ScriptedIdentityProvider>>,
    ) -> HashMap<String, Arc<dyn IdentityProvider>> {
        list.into_iter()
            .map(|p| (p.provider_key().to_string(), p as Arc<dyn IdentityProvider>))
            .collect()
    }

    fn context<'a>(
        identity_providers: &'a HashMap<String, Arc<dyn IdentityProvider>>,
        remote: &'a RecordingRemoteFactory,
        persister: &'a dyn CollectionPersister,
    ) -> SignInContext<'a> {
        SignInContext {
            identity_providers,
            remote,
            persister,
            remote_address: "layer1://test:1",
            unknown_provider: UnknownProviderPolicy::Fail,
            persistence: PersistenceMode::Lenient,
        }
    }

    #[tokio::test]
    async fn test_tokens_from_every_provider_reach_the_service() {
        let steam = Arc::new(ScriptedIdentityProvider::succeeding("steam", "steam_ticket", "t1"));
        let ros = Arc::new(ScriptedIdentityProvider::succeeding("ros", "ros_ticket", "t2"));
        let registered = providers(vec![steam.clone(), ros.clone()]);
        let remote = RecordingRemoteFactory::new();
        let persister = RecordingPersister::default();
        let target = profile(&[("steam", "1"), ("ros", "alice")]);
        let parameters = HashMap::new();

        let outcome = SignInFlow::new(context(&registered, &remote, &persister), &target, &parameters)
            .run(None)
            .await;

        let SignInOutcome::Succeeded(session) = outcome else {
            panic!("expected success");
        };
        assert_eq!(session.internal_identifier, target.internal_identifier());
        assert_eq!(steam.call_count(), 1);
        assert_eq!(ros.call_count(), 1);
        assert_eq!(remote.client().last_address().as_deref(), Some("layer1://test:1"));
        let bag = remote.client().last_token_bag().unwrap();
        assert_eq!(bag.get("steam_ticket"), Some("t1"));
        assert_eq!(bag.get("ros_ticket"), Some("t2"));
        assert_eq!(persister.count(), 1);
    }

    #[tokio::test]
    async fn test_provider_failure_stops_the_flow() {
        let steam = Arc::new(ScriptedIdentityProvider::failing("steam", "bad creds"));
        let ros = Arc::new(ScriptedIdentityProvider::succeeding("ros", "ros_ticket", "t2"));
        let registered = providers(vec![steam, ros.clone()]);
        let remote = RecordingRemoteFactory::new();
        let persister = RecordingPersister::default();
        let target = profile(&[("steam", "1"), ("ros", "alice")]);
        let parameters = HashMap::new();

        let outcome = SignInFlow::new(context(&registered, &remote, &persister), &target, &parameters)
            .run(None)
            .await;

        assert_eq!(outcome.to_task_result().error_message(), Some("bad creds"));
        assert_eq!(ros.call_count(), 0);
        assert_eq!(remote.created_count(), 0);
        assert_eq!(persister.count(), 0);
    }

    #[tokio::test]
    async fn test_unknown_provider_policy() {
        let registered = providers(vec![]);
        let remote = RecordingRemoteFactory::new();
        let persister = RecordingPersister::default();
        let target = profile(&[("xbox", "1")]);
        let parameters = HashMap::new();

        let outcome = SignInFlow::new(context(&registered, &remote, &persister), &target, &parameters)
            .run(None)
            .await;
        assert_eq!(
            outcome.to_task_result().error_message(),
            Some("No identity provider registered for 'xbox'")
        );

        let mut skipping = context(&registered, &remote, &persister);
        skipping.unknown_provider = UnknownProviderPolicy::Skip;
        let outcome = SignInFlow::new(skipping, &target, &parameters).run(None).await;
        assert!(outcome.is_success());
        assert!(remote.client().last_token_bag().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_remote_failure_codes_are_reported() {
        let registered = providers(vec![]);
        let persister = RecordingPersister::default();
        let target = profile(&[]);
        let parameters = HashMap::new();

        let remote = RecordingRemoteFactory::failing_connect(42);
        let outcome = SignInFlow::new(context(&registered, &remote, &persister), &target, &parameters)
            .run(None)
            .await;
        assert_eq!(
            outcome.to_task_result().error_message(),
            Some("Connecting to the authentication service failed - error code 42.")
        );

        let remote = RecordingRemoteFactory::failing_authenticate(7);
        let outcome = SignInFlow::new(context(&registered, &remote, &persister), &target, &parameters)
            .run(None)
            .await;
        assert_eq!(
            outcome.to_task_result().error_message(),
            Some("Authenticating to the authentication service failed - error code 7.")
        );
        assert_eq!(persister.count(), 0);
    }

    #[tokio::test]
    async fn test_persistence_mode_governs_save_failures() {
        let registered = providers(vec![]);
        let remote = RecordingRemoteFactory::new();
        let persister = FailingPersister;
        let target = profile(&[]);
        let parameters = HashMap::new();

        let outcome = SignInFlow::new(context(&registered, &remote, &persister), &target, &parameters)
            .run(None)
            .await;
        assert!(outcome.is_success());

        let mut strict = context(&registered, &remote, &persister);
        strict.persistence = PersistenceMode::Strict;
        let outcome = SignInFlow::new(strict, &target, &parameters).run(None).await;
        let message = outcome.to_task_result().error_message().unwrap().to_string();
        assert!(message.starts_with("Failed to persist profiles"));
    }

    #[tokio::test]
    async fn test_cancelled_before_start() {
        let steam = Arc::new(ScriptedIdentityProvider::succeeding("steam", "steam_ticket", "t1"));
        let registered = providers(vec![steam.clone()]);
        let remote = RecordingRemoteFactory::new();
        let persister = RecordingPersister::default();
        let target = profile(&[("steam", "1")]);
        let parameters = HashMap::new();
        let token = CancellationToken::new();
        token.cancel();

        let outcome = SignInFlow::new(context(&registered, &remote, &persister), &target, &parameters)
            .run(Some(&token))
            .await;

        assert_eq!(outcome.to_task_result().error_message(), Some(CANCELLED_MESSAGE));
        assert_eq!(steam.call_count(), 0);
        assert_eq!(persister.count(), 0);
    }
}
