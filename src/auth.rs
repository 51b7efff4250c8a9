//! Credential collaborator interface.
//!
//! The supervisor consumes credentials through the narrow
//! [`CredentialProvider`] trait rather than reaching into a global
//! authentication store: the provider is injected at session construction,
//! so credential storage and refresh mechanics stay outside the engine.

use async_trait::async_trait;
use tokio::sync::RwLock;

/// Source of bearer tokens for the transport endpoint.
///
/// Both methods return `None` when no usable token exists. The supervisor
/// calls [`get_token`](Self::get_token) before each connect attempt and
/// falls back to [`refresh_token`](Self::refresh_token) after a transport
/// error while connecting; if refresh also yields nothing, the session
/// surfaces a terminal re-authentication-required state.
#[async_trait]
pub trait CredentialProvider: Send + Sync + std::fmt::Debug {
    /// Returns the current bearer token, if any.
    async fn get_token(&self) -> Option<String>;

    /// Attempts to refresh the credential, returning the new token on
    /// success. Implementations should leave the old token in place when
    /// refresh fails.
    async fn refresh_token(&self) -> Option<String>;
}

/// Fixed-token provider: refresh re-yields the same token.
///
/// Useful for tests and for deployments where token rotation happens
/// outside the process.
#[derive(Debug)]
pub struct StaticCredentials {
    token: RwLock<Option<String>>,
}

impl StaticCredentials {
    /// Creates a provider that always yields `token`.
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: RwLock::new(Some(token.into())),
        }
    }

    /// Creates a provider with no token at all; both methods yield `None`.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            token: RwLock::new(None),
        }
    }

    /// Replaces the stored token.
    pub async fn set_token(&self, token: Option<String>) {
        *self.token.write().await = token;
    }
}

#[async_trait]
impl CredentialProvider for StaticCredentials {
    async fn get_token(&self) -> Option<String> {
        self.token.read().await.clone()
    }

    async fn refresh_token(&self) -> Option<String> {
        self.token.read().await.clone()
    }
}

/// Provider reading the token from the `CHAT_AUTH_TOKEN` environment
/// variable on every call, so an external refresher process can rotate it.
#[derive(Debug, Default)]
pub struct EnvCredentials;

#[async_trait]
impl CredentialProvider for EnvCredentials {
    async fn get_token(&self) -> Option<String> {
        std::env::var("CHAT_AUTH_TOKEN").ok().filter(|t| !t.is_empty())
    }

    async fn refresh_token(&self) -> Option<String> {
        self.get_token().await
    }
}
