//! Historical-message collaborator interface.
//!
//! The one-shot history batch comes from an external REST endpoint; the
//! engine consumes it through [`HistoryProvider`] so tests can substitute
//! an in-memory source. [`RestHistoryProvider`] is the production
//! implementation over `reqwest`.

use async_trait::async_trait;

use crate::domain::{Message, RegionId, decode_content};
use crate::error::ChatError;

/// Read-only source of the most recent messages of a region.
#[async_trait]
pub trait HistoryProvider: Send + Sync + std::fmt::Debug {
    /// Returns up to `limit` most-recent messages of `region_id`,
    /// oldest-first, each tagged with its authoring identity.
    ///
    /// # Errors
    ///
    /// Returns [`ChatError::History`] when the batch cannot be fetched.
    /// Individual malformed entries are not an error: implementations log
    /// and skip them.
    async fn recent_messages(
        &self,
        region_id: RegionId,
        limit: usize,
    ) -> Result<Vec<Message>, ChatError>;
}

/// History provider backed by the chat hub's REST endpoint:
/// `GET {base}/api/chat/region/{regionId}/messages?limit={n}`.
#[derive(Debug, Clone)]
pub struct RestHistoryProvider {
    client: reqwest::Client,
    base_url: String,
}

impl RestHistoryProvider {
    /// Creates a provider rooted at `base_url` (no trailing slash needed).
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl HistoryProvider for RestHistoryProvider {
    async fn recent_messages(
        &self,
        region_id: RegionId,
        limit: usize,
    ) -> Result<Vec<Message>, ChatError> {
        let url = format!(
            "{}/api/chat/region/{region_id}/messages?limit={limit}",
            self.base_url.trim_end_matches('/')
        );

        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(ChatError::History(format!(
                "history endpoint returned {}",
                response.status()
            )));
        }

        let entries: Vec<serde_json::Value> = response.json().await?;
        let mut messages = Vec::with_capacity(entries.len());
        for entry in entries {
            match decode_content(entry) {
                Ok(message) => messages.push(message),
                Err(err) => {
                    tracing::warn!(%region_id, error = %err, "skipping malformed history entry");
                }
            }
        }

        tracing::debug!(%region_id, count = messages.len(), "history batch fetched");
        Ok(messages)
    }
}
