//! Result values crossing async boundaries.

use serde::{Deserialize, Serialize};

/// Outcome of a public profile operation (`add_profile`, `sign_in`, ...).
///
/// Failures are values: an operation never panics across the facade, it resolves
/// to `success: false` with a human-readable message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileTaskResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ProfileTaskResult {
    pub fn success() -> Self {
        Self {
            success: true,
            error: None,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
        }
    }

    pub fn has_succeeded(&self) -> bool {
        self.success
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error.as_deref()
    }
}

/// Token produced by an identity provider for one identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityToken {
    pub token_type: String,
    pub token: String,
}

impl IdentityToken {
    pub fn new(token_type: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            token_type: token_type.into(),
            token: token.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_result_success() {
        let result = ProfileTaskResult::success();
        assert!(result.has_succeeded());
        assert_eq!(result.error_message(), None);
    }

    #[test]
    fn test_task_result_failure() {
        let result = ProfileTaskResult::failure("bad creds");
        assert!(!result.has_succeeded());
        assert_eq!(result.error_message(), Some("bad creds"));
    }

    #[test]
    fn test_task_result_serializes_without_null_error() {
        let json = serde_json::to_string(&ProfileTaskResult::success()).unwrap();
        assert_eq!(json, r#"{"success":true}"#);
    }
}
