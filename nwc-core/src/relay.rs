// SPDX-FileCopyrightText: © 2026 PrivKey LLC
// SPDX-License-Identifier: AGPL-3.0-or-later

#![forbid(unsafe_code)]

use std::time::Duration;

use async_trait::async_trait;
use nostr_sdk::prelude::*;
use tokio::sync::mpsc;

use crate::error::{NwcError, Result};

/// Maximum length of a relay URL.
pub const MAX_RELAY_URL_LENGTH: usize = 256;

type CloseFn = Box<dyn FnOnce() + Send>;

/// A live, filtered stream of events.
///
/// `next()` yields `None` once the relay side has closed the subscription.
/// `close()` is idempotent and also runs on drop.
pub struct Subscription {
    events: mpsc::UnboundedReceiver<Event>,
    on_close: Option<CloseFn>,
}

impl Subscription {
    pub fn new(events: mpsc::UnboundedReceiver<Event>, on_close: impl FnOnce() + Send + 'static) -> Self {
        Self {
            events,
            on_close: Some(Box::new(on_close)),
        }
    }

    pub async fn next(&mut self) -> Option<Event> {
        self.events.recv().await
    }

    pub fn close(&mut self) {
        if let Some(on_close) = self.on_close.take() {
            on_close();
        }
        self.events.close();
    }

    pub fn is_closed(&self) -> bool {
        self.on_close.is_none()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.close();
    }
}

/// A pool of relay connections shared by every component built on it.
#[async_trait]
pub trait RelayTransport: Send + Sync {
    fn relay_urls(&self) -> Vec<String>;

    /// Succeeds once any configured relay is connected.
    async fn ensure_connected(&self) -> Result<()>;

    async fn is_connected(&self) -> bool;

    /// Resolves once any relay acknowledges the event.
    async fn publish(&self, event: &Event) -> Result<()>;

    async fn subscribe(&self, filter: Filter) -> Result<Subscription>;

    /// Newest stored event matching `filter`.
    async fn fetch_event(&self, filter: Filter, timeout: Duration) -> Result<Option<Event>>;

    async fn close(&self);
}

/// Validate a relay URL.
///
/// Accepts `ws://` and `wss://` URLs with a non-empty host.
pub fn validate_relay_url(url: &str) -> Result<()> {
    if url.len() > MAX_RELAY_URL_LENGTH {
        return Err(NwcError::InvalidInput("relay URL too long".into()));
    }

    let rest = url
        .strip_prefix("wss://")
        .or_else(|| url.strip_prefix("ws://"))
        .ok_or_else(|| NwcError::InvalidInput(format!("relay must use ws:// or wss://: {url}")))?;

    let host_port = rest.split(['/', '?']).next().unwrap_or(rest);
    let host = match host_port.rfind(':') {
        Some(pos) if !host_port.ends_with(']') => {
            let port = &host_port[pos + 1..];
            if port.parse::<u16>().map(|p| p == 0).unwrap_or(true) {
                return Err(NwcError::InvalidInput(format!("invalid relay port: {url}")));
            }
            &host_port[..pos]
        }
        _ => host_port,
    };

    if host.is_empty() {
        return Err(NwcError::InvalidInput(format!("relay URL missing host: {url}")));
    }

    if !host
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '[' | ']' | ':'))
    {
        return Err(NwcError::InvalidInput(format!(
            "invalid relay host characters: {url}"
        )));
    }

    Ok(())
}

pub fn validate_relay_urls(urls: &[String]) -> Result<()> {
    if urls.is_empty() {
        return Err(NwcError::InvalidInput("at least one relay required".into()));
    }
    urls.iter().try_for_each(|url| validate_relay_url(url))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_validate_relay_url() {
        assert!(validate_relay_url("wss://relay.example.com").is_ok());
        assert!(validate_relay_url("wss://relay.example.com/").is_ok());
        assert!(validate_relay_url("ws://localhost:7777").is_ok());
        assert!(validate_relay_url("https://relay.example.com").is_err());
        assert!(validate_relay_url("wss://").is_err());
        assert!(validate_relay_url("wss://relay.example.com:0").is_err());
        assert!(validate_relay_url("wss://bad host").is_err());
        let long = format!("wss://{}.com", "a".repeat(MAX_RELAY_URL_LENGTH));
        assert!(validate_relay_url(&long).is_err());
        assert!(validate_relay_urls(&[]).is_err());
    }

    #[tokio::test]
    async fn test_subscription_close_is_idempotent() {
        let closes = Arc::new(AtomicUsize::new(0));
        let (_tx, rx) = mpsc::unbounded_channel();
        let counter = closes.clone();
        let mut sub = Subscription::new(rx, move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        sub.close();
        sub.close();
        drop(sub);
        assert_eq!(closes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_subscription_ends_when_sender_drops() {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut sub = Subscription::new(rx, || {});
        drop(tx);
        assert!(sub.next().await.is_none());
    }
}
