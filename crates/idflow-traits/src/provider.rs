//! Suggestion and identity provider interfaces.

use std::collections::HashMap;

use async_trait::async_trait;
use futures::stream::BoxStream;
use idflow_models::{IdentityToken, Profile};

use crate::error::ProviderError;

/// Result of exchanging one identifier for a token.
pub type IdentityResult = Result<IdentityToken, ProviderError>;

/// Source of candidate profiles discovered without an explicit sign-in
/// (e.g. a locally running launcher that knows the current account).
pub trait SuggestionProvider: Send + Sync {
    /// Human-readable name used in logs.
    fn name(&self) -> &str;

    /// Lazily yield zero or more discovered profiles.
    fn profiles(&self) -> BoxStream<'_, Profile>;
}

/// Exchanges an identifier for a token during sign-in.
///
/// Registered under [`IdentityProvider::provider_key`]; the sign-in flow invokes
/// the provider whose key matches each identifier of the profile. Calls may be
/// interactive, so they are always made one at a time.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Key matched against `ProfileIdentifier::provider_key`.
    fn provider_key(&self) -> &str;

    /// Produce a token for `profile` using the caller-supplied parameters.
    async fn process_identity(
        &self,
        profile: &Profile,
        parameters: &HashMap<String, String>,
    ) -> IdentityResult;
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use idflow_models::ProfileIdentifier;

    struct FixedProvider;

    #[async_trait]
    impl IdentityProvider for FixedProvider {
        fn provider_key(&self) -> &str {
            "steam"
        }

        async fn process_identity(
            &self,
            profile: &Profile,
            parameters: &HashMap<String, String>,
        ) -> IdentityResult {
            match parameters.get("password") {
                Some(_) => Ok(IdentityToken::new(
                    "steam_ticket",
                    format!("ticket-for-{}", profile.display_name()),
                )),
                None => Err(ProviderError::new("password required")),
            }
        }
    }

    struct OneShotSuggestions(Vec<Profile>);

    impl SuggestionProvider for OneShotSuggestions {
        fn name(&self) -> &str {
            "one-shot"
        }

        fn profiles(&self) -> BoxStream<'_, Profile> {
            futures::stream::iter(self.0.clone()).boxed()
        }
    }

    fn alice() -> Profile {
        Profile::new("alice", "", vec![ProfileIdentifier::new("steam", "1")])
    }

    #[tokio::test]
    async fn test_identity_provider_success_and_failure_are_values() {
        let provider = FixedProvider;
        let mut params = HashMap::new();

        let failed = provider.process_identity(&alice(), &params).await;
        assert_eq!(failed, Err(ProviderError::new("password required")));

        params.insert("password".to_string(), "hunter2".to_string());
        let token = provider.process_identity(&alice(), &params).await.unwrap();
        assert_eq!(token.token_type, "steam_ticket");
        assert_eq!(token.token, "ticket-for-alice");
    }

    #[tokio::test]
    async fn test_suggestion_provider_streams_profiles() {
        let provider = OneShotSuggestions(vec![alice(), alice()]);
        let collected: Vec<_> = provider.profiles().collect().await;
        assert_eq!(collected.len(), 2);
    }
}
