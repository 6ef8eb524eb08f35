// SPDX-FileCopyrightText: © 2026 PrivKey LLC
// SPDX-License-Identifier: AGPL-3.0-or-later

#![forbid(unsafe_code)]

use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use nostr_sdk::prelude::*;
use tokio::sync::{broadcast, mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::error::{NwcError, Result};
use crate::relay::{validate_relay_urls, RelayTransport, Subscription};

pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Install the process-wide rustls provider used by the websocket transport.
/// Safe to call more than once.
pub fn install_default_crypto_provider() {
    let _ = rustls::crypto::ring::default_provider().install_default();
}

fn default_relay_opts() -> RelayOptions {
    RelayOptions::default()
        .reconnect(true)
        .ping(true)
        .retry_interval(Duration::from_secs(10))
        .adjust_retry_interval(true)
}

/// Relay pool backed by `nostr-sdk`.
#[derive(Clone)]
pub struct NostrRelayPool {
    client: Client,
    relay_urls: Vec<String>,
    connect_timeout: Duration,
}

impl NostrRelayPool {
    pub async fn new(keys: Keys, relay_urls: &[String]) -> Result<Self> {
        Self::with_connect_timeout(keys, relay_urls, DEFAULT_CONNECT_TIMEOUT).await
    }

    pub async fn with_connect_timeout(
        keys: Keys,
        relay_urls: &[String],
        connect_timeout: Duration,
    ) -> Result<Self> {
        validate_relay_urls(relay_urls)?;

        let client = Client::new(keys);
        for url in relay_urls {
            client
                .pool()
                .add_relay(url.as_str(), default_relay_opts())
                .await
                .map_err(|e| NwcError::Network(format!("add relay {url}: {e}")))?;
        }

        Ok(Self {
            client,
            relay_urls: relay_urls.to_vec(),
            connect_timeout,
        })
    }

    async fn any_connected(&self) -> bool {
        self.client
            .relays()
            .await
            .values()
            .any(|relay| matches!(relay.status(), RelayStatus::Connected))
    }
}

#[async_trait]
impl RelayTransport for NostrRelayPool {
    fn relay_urls(&self) -> Vec<String> {
        self.relay_urls.clone()
    }

    async fn ensure_connected(&self) -> Result<()> {
        if self.any_connected().await {
            return Ok(());
        }

        self.client.connect().await;

        tokio::time::timeout(self.connect_timeout, async {
            while !self.any_connected().await {
                tokio::time::sleep(Duration::from_millis(100)).await;
            }
        })
        .await
        .map_err(|_| {
            warn!(relays = ?self.relay_urls, "failed to connect to any relay");
            NwcError::Network(format!("failed to connect to {}", self.relay_urls.join(",")))
        })
    }

    async fn is_connected(&self) -> bool {
        self.any_connected().await
    }

    async fn publish(&self, event: &Event) -> Result<()> {
        let output = self
            .client
            .send_event(event)
            .await
            .map_err(|e| NwcError::Publish(e.to_string()))?;

        if output.success.is_empty() {
            let reasons: Vec<String> = output
                .failed
                .iter()
                .map(|(url, reason)| format!("{url}: {reason}"))
                .collect();
            return Err(NwcError::Publish(reasons.join("; ")));
        }

        debug!(event_id = %event.id, accepted = output.success.len(), "event published");
        Ok(())
    }

    async fn subscribe(&self, filter: Filter) -> Result<Subscription> {
        let mut notifications = self.client.notifications();
        let output = self
            .client
            .subscribe(filter, None)
            .await
            .map_err(|e| NwcError::Network(format!("subscribe: {e}")))?;
        let subscription_id = output.val;

        let (tx, rx) = mpsc::unbounded_channel();
        let (cancel_tx, mut cancel_rx) = oneshot::channel::<()>();
        let client = self.client.clone();

        tokio::spawn(async move {
            let wanted = subscription_id.to_string();
            let mut seen = HashSet::new();
            loop {
                tokio::select! {
                    _ = &mut cancel_rx => break,
                    notification = notifications.recv() => match notification {
                        Ok(RelayPoolNotification::Event { subscription_id, event, .. }) => {
                            if subscription_id.to_string() != wanted || !seen.insert(event.id) {
                                continue;
                            }
                            if tx.send(*event).is_err() {
                                break;
                            }
                        }
                        Ok(RelayPoolNotification::Message {
                            message: RelayMessage::Closed { subscription_id, message },
                            ..
                        }) => {
                            if subscription_id.to_string() == wanted {
                                info!(reason = %message, "relay closed subscription");
                                break;
                            }
                        }
                        Ok(RelayPoolNotification::Shutdown) => break,
                        Ok(_) => {}
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            warn!(skipped, "subscription lagged");
                        }
                        Err(broadcast::error::RecvError::Closed) => break,
                    },
                }
            }
            client.unsubscribe(&subscription_id).await;
        });

        Ok(Subscription::new(rx, move || {
            let _ = cancel_tx.send(());
        }))
    }

    async fn fetch_event(&self, filter: Filter, timeout: Duration) -> Result<Option<Event>> {
        let events = self
            .client
            .fetch_events(filter, timeout)
            .await
            .map_err(|e| NwcError::Network(format!("fetch events: {e}")))?;
        Ok(events.into_iter().max_by_key(|e| e.created_at))
    }

    async fn close(&self) {
        self.client.disconnect().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_rejects_invalid_relays() {
        let keys = Keys::generate();
        assert!(matches!(
            NostrRelayPool::new(keys.clone(), &[]).await,
            Err(NwcError::InvalidInput(_))
        ));
        assert!(matches!(
            NostrRelayPool::new(keys, &["https://relay.example.com".into()]).await,
            Err(NwcError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_install_provider_twice() {
        install_default_crypto_provider();
        install_default_crypto_provider();
    }
}
