//! region-chat-engine demo entry point.
//!
//! Connects a session to the configured chat hub and logs every event
//! until Ctrl-C.

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use region_chat_engine::auth::EnvCredentials;
use region_chat_engine::config::ChatConfig;
use region_chat_engine::history::RestHistoryProvider;
use region_chat_engine::session::{ChatSession, SessionEvent};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Load configuration
    let config = ChatConfig::from_env()?;
    tracing::info!(region = %config.region_id, url = %config.ws_base_url, "starting chat session");

    let credentials = Arc::new(EnvCredentials);
    let history = Arc::new(RestHistoryProvider::new(config.history_base_url.clone()));

    let (session, mut events) = ChatSession::spawn(config, credentials, history);

    loop {
        tokio::select! {
            event = events.recv() => {
                match event {
                    Some(SessionEvent::MessageAdmitted(message)) => {
                        tracing::info!(id = %message.id, sender = %message.sender_id, "message");
                    }
                    Some(SessionEvent::HistoryMerged(batch)) => {
                        tracing::info!(count = batch.len(), "history merged");
                    }
                    Some(SessionEvent::PresenceChanged(users)) => {
                        tracing::info!(online = users.len(), "presence snapshot");
                    }
                    Some(SessionEvent::Closed) | None => break,
                    Some(event) => tracing::info!(?event, "session event"),
                }
            }
            result = tokio::signal::ctrl_c() => {
                result?;
                tracing::info!("shutting down");
                session.close();
            }
        }
    }

    Ok(())
}
