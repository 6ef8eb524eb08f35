// SPDX-FileCopyrightText: © 2026 PrivKey LLC
// SPDX-License-Identifier: AGPL-3.0-or-later

//! In-process relay.
//!
//! `MemoryRelay` applies the usual relay storage rules: ephemeral kinds
//! (20000..30000) are delivered but never stored, replaceable kinds
//! (10000..20000) keep only the newest event per author and kind. It also
//! exposes fault controls for exercising timeout and reconnect paths.
//! `MemoryRelayPool` groups several of them behind [`RelayTransport`].

#![forbid(unsafe_code)]

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use nostr_sdk::prelude::*;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tracing::debug;

use crate::error::{NwcError, Result};
use crate::relay::{RelayTransport, Subscription};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishMode {
    Accept,
    Reject(String),
    /// Never acknowledge.
    Hang,
}

struct Sink {
    tx: mpsc::UnboundedSender<Event>,
    seen: Arc<Mutex<HashSet<EventId>>>,
}

impl Sink {
    fn deliver(&self, event: &Event) -> bool {
        if !self.seen.lock().insert(event.id) {
            return !self.tx.is_closed();
        }
        self.tx.send(event.clone()).is_ok()
    }
}

struct Listener {
    id: u64,
    filter: Filter,
    sink: Sink,
}

struct RelayState {
    reachable: bool,
    publish_mode: PublishMode,
    events: Vec<Event>,
    listeners: Vec<Listener>,
    next_listener: u64,
}

#[derive(Clone)]
pub struct MemoryRelay {
    url: String,
    state: Arc<Mutex<RelayState>>,
}

enum PublishOutcome {
    Accepted,
    Rejected(String),
    Pending,
}

impl MemoryRelay {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            state: Arc::new(Mutex::new(RelayState {
                reachable: true,
                publish_mode: PublishMode::Accept,
                events: Vec::new(),
                listeners: Vec::new(),
                next_listener: 0,
            })),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// An unreachable relay refuses connections and drops its live subscriptions.
    pub fn set_reachable(&self, reachable: bool) {
        let mut state = self.state.lock();
        state.reachable = reachable;
        if !reachable {
            state.listeners.clear();
        }
    }

    pub fn is_reachable(&self) -> bool {
        self.state.lock().reachable
    }

    pub fn set_publish_mode(&self, mode: PublishMode) {
        self.state.lock().publish_mode = mode;
    }

    /// Close every live subscription, as a relay restart would.
    pub fn drop_subscriptions(&self) {
        let dropped = {
            let mut state = self.state.lock();
            std::mem::take(&mut state.listeners).len()
        };
        debug!(relay = %self.url, dropped, "dropped subscriptions");
    }

    pub fn subscription_count(&self) -> usize {
        let mut state = self.state.lock();
        state.listeners.retain(|l| !l.sink.tx.is_closed());
        state.listeners.len()
    }

    pub fn stored_events(&self) -> Vec<Event> {
        self.state.lock().events.clone()
    }

    fn publish(&self, event: &Event) -> PublishOutcome {
        let mut state = self.state.lock();
        if !state.reachable {
            return PublishOutcome::Rejected(format!("{}: unreachable", self.url));
        }
        match state.publish_mode.clone() {
            PublishMode::Reject(reason) => return PublishOutcome::Rejected(reason),
            PublishMode::Hang => return PublishOutcome::Pending,
            PublishMode::Accept => {}
        }
        store(&mut state.events, event);
        state
            .listeners
            .retain(|l| !matches_filter(&l.filter, event) || l.sink.deliver(event));
        PublishOutcome::Accepted
    }

    fn listen(&self, filter: Filter, sink: Sink) -> Option<u64> {
        let mut state = self.state.lock();
        if !state.reachable {
            return None;
        }
        let mut backlog: Vec<&Event> = state
            .events
            .iter()
            .filter(|e| matches_filter(&filter, e))
            .collect();
        backlog.sort_by_key(|e| e.created_at);
        for event in backlog {
            sink.deliver(event);
        }
        let id = state.next_listener;
        state.next_listener += 1;
        state.listeners.push(Listener { id, filter, sink });
        Some(id)
    }

    fn unlisten(&self, id: u64) {
        self.state.lock().listeners.retain(|l| l.id != id);
    }

    fn newest(&self, filter: &Filter) -> Option<Event> {
        let state = self.state.lock();
        if !state.reachable {
            return None;
        }
        state
            .events
            .iter()
            .filter(|e| matches_filter(filter, e))
            .max_by_key(|e| e.created_at)
            .cloned()
    }
}

fn store(events: &mut Vec<Event>, event: &Event) {
    let kind = event.kind.as_u16();
    if (20000..30000).contains(&kind) || events.iter().any(|e| e.id == event.id) {
        return;
    }
    if (10000..20000).contains(&kind) {
        let newer_exists = events.iter().any(|e| {
            e.kind == event.kind && e.pubkey == event.pubkey && e.created_at > event.created_at
        });
        if newer_exists {
            return;
        }
        events.retain(|e| !(e.kind == event.kind && e.pubkey == event.pubkey));
    }
    events.push(event.clone());
}

/// NIP-01 filter semantics over ids, authors, kinds, time bounds and `#x` tags.
pub fn matches_filter(filter: &Filter, event: &Event) -> bool {
    if filter.ids.as_ref().is_some_and(|ids| !ids.contains(&event.id)) {
        return false;
    }
    if filter
        .authors
        .as_ref()
        .is_some_and(|authors| !authors.contains(&event.pubkey))
    {
        return false;
    }
    if filter
        .kinds
        .as_ref()
        .is_some_and(|kinds| !kinds.contains(&event.kind))
    {
        return false;
    }
    if filter.since.is_some_and(|since| event.created_at < since) {
        return false;
    }
    if filter.until.is_some_and(|until| event.created_at > until) {
        return false;
    }
    filter.generic_tags.iter().all(|(letter, values)| {
        let name = letter.as_char().to_string();
        event.tags.iter().any(|tag| match tag.as_slice() {
            [key, value, ..] => *key == name && values.contains(value),
            _ => false,
        })
    })
}

/// Several in-process relays behind one transport.
#[derive(Clone)]
pub struct MemoryRelayPool {
    relays: Vec<MemoryRelay>,
}

impl MemoryRelayPool {
    pub fn new(relays: Vec<MemoryRelay>) -> Self {
        Self { relays }
    }

    pub fn single(url: impl Into<String>) -> (Self, MemoryRelay) {
        let relay = MemoryRelay::new(url);
        (Self::new(vec![relay.clone()]), relay)
    }

    pub fn relays(&self) -> &[MemoryRelay] {
        &self.relays
    }
}

#[async_trait]
impl RelayTransport for MemoryRelayPool {
    fn relay_urls(&self) -> Vec<String> {
        self.relays.iter().map(|r| r.url.clone()).collect()
    }

    async fn ensure_connected(&self) -> Result<()> {
        if self.relays.iter().any(MemoryRelay::is_reachable) {
            return Ok(());
        }
        Err(NwcError::Network(format!(
            "failed to connect to {}",
            self.relay_urls().join(",")
        )))
    }

    async fn is_connected(&self) -> bool {
        self.relays.iter().any(MemoryRelay::is_reachable)
    }

    async fn publish(&self, event: &Event) -> Result<()> {
        let mut accepted = false;
        let mut pending = false;
        let mut failures = Vec::new();
        for relay in &self.relays {
            match relay.publish(event) {
                PublishOutcome::Accepted => accepted = true,
                PublishOutcome::Pending => pending = true,
                PublishOutcome::Rejected(reason) => failures.push(reason),
            }
        }
        if accepted {
            return Ok(());
        }
        if pending {
            std::future::pending::<()>().await;
        }
        Err(NwcError::Publish(failures.join("; ")))
    }

    async fn subscribe(&self, filter: Filter) -> Result<Subscription> {
        let (tx, rx) = mpsc::unbounded_channel();
        let seen = Arc::new(Mutex::new(HashSet::new()));
        let mut registered = Vec::new();
        for relay in &self.relays {
            let sink = Sink {
                tx: tx.clone(),
                seen: seen.clone(),
            };
            if let Some(id) = relay.listen(filter.clone(), sink) {
                registered.push((relay.clone(), id));
            }
        }
        drop(tx);
        if registered.is_empty() {
            return Err(NwcError::Network("no reachable relay to subscribe".into()));
        }
        Ok(Subscription::new(rx, move || {
            for (relay, id) in registered {
                relay.unlisten(id);
            }
        }))
    }

    async fn fetch_event(&self, filter: Filter, _timeout: Duration) -> Result<Option<Event>> {
        self.ensure_connected().await?;
        Ok(self
            .relays
            .iter()
            .filter_map(|r| r.newest(&filter))
            .max_by_key(|e| e.created_at))
    }

    async fn close(&self) {
        for relay in &self.relays {
            relay.drop_subscriptions();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{sign_event, tag, EventTemplate, INFO_KIND, REQUEST_KIND};

    fn event(keys: &Keys, kind: u16, ts: u64) -> Event {
        sign_event(
            EventTemplate::new(Kind::Custom(kind), format!("at {ts}"))
                .created_at(Timestamp::from(ts)),
            keys,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_replaceable_keeps_latest() {
        let (pool, relay) = MemoryRelayPool::single("wss://a.example");
        let keys = Keys::generate();
        pool.publish(&event(&keys, INFO_KIND, 10)).await.unwrap();
        pool.publish(&event(&keys, INFO_KIND, 20)).await.unwrap();
        pool.publish(&event(&keys, INFO_KIND, 15)).await.unwrap();
        let stored = relay.stored_events();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].created_at, Timestamp::from(20));
    }

    #[tokio::test]
    async fn test_ephemeral_not_stored_but_delivered() {
        let (pool, relay) = MemoryRelayPool::single("wss://a.example");
        let keys = Keys::generate();
        let mut sub = pool
            .subscribe(Filter::new().kind(Kind::Custom(REQUEST_KIND)))
            .await
            .unwrap();
        let ev = event(&keys, REQUEST_KIND, 1);
        pool.publish(&ev).await.unwrap();
        assert!(relay.stored_events().is_empty());
        assert_eq!(sub.next().await.unwrap().id, ev.id);
    }

    #[tokio::test]
    async fn test_duplicate_delivery_across_relays() {
        let a = MemoryRelay::new("wss://a.example");
        let b = MemoryRelay::new("wss://b.example");
        let pool = MemoryRelayPool::new(vec![a, b]);
        let keys = Keys::generate();
        let mut sub = pool.subscribe(Filter::new().author(keys.public_key())).await.unwrap();
        let first = event(&keys, REQUEST_KIND, 1);
        let second = event(&keys, REQUEST_KIND, 2);
        pool.publish(&first).await.unwrap();
        pool.publish(&second).await.unwrap();
        assert_eq!(sub.next().await.unwrap().id, first.id);
        assert_eq!(sub.next().await.unwrap().id, second.id);
    }

    #[tokio::test]
    async fn test_tag_filter() {
        let (pool, _relay) = MemoryRelayPool::single("wss://a.example");
        let keys = Keys::generate();
        let target = Keys::generate().public_key();
        let tagged = sign_event(
            EventTemplate::new(Kind::Custom(REQUEST_KIND), "x").tag(Tag::public_key(target)),
            &keys,
        )
        .unwrap();
        let untagged = sign_event(
            EventTemplate::new(Kind::Custom(REQUEST_KIND), "y").tag(tag("d", &["1"])),
            &keys,
        )
        .unwrap();
        let filter = Filter::new().pubkey(target);
        assert!(matches_filter(&filter, &tagged));
        assert!(!matches_filter(&filter, &untagged));
    }

    #[tokio::test]
    async fn test_fault_controls() {
        let a = MemoryRelay::new("wss://a.example");
        let b = MemoryRelay::new("wss://b.example");
        let pool = MemoryRelayPool::new(vec![a.clone(), b.clone()]);
        let keys = Keys::generate();

        a.set_reachable(false);
        assert!(pool.ensure_connected().await.is_ok());
        b.set_reachable(false);
        assert!(matches!(
            pool.ensure_connected().await,
            Err(NwcError::Network(_))
        ));

        a.set_reachable(true);
        a.set_publish_mode(PublishMode::Reject("blocked".into()));
        assert!(matches!(
            pool.publish(&event(&keys, REQUEST_KIND, 1)).await,
            Err(NwcError::Publish(_))
        ));

        a.set_publish_mode(PublishMode::Hang);
        let hung = tokio::time::timeout(
            Duration::from_millis(20),
            pool.publish(&event(&keys, REQUEST_KIND, 2)),
        )
        .await;
        assert!(hung.is_err());
    }

    #[tokio::test]
    async fn test_dropped_subscription_ends_stream() {
        let (pool, relay) = MemoryRelayPool::single("wss://a.example");
        let mut sub = pool.subscribe(Filter::new()).await.unwrap();
        assert_eq!(relay.subscription_count(), 1);
        relay.drop_subscriptions();
        assert!(sub.next().await.is_none());
    }

    #[tokio::test]
    async fn test_close_unregisters() {
        let (pool, relay) = MemoryRelayPool::single("wss://a.example");
        let mut sub = pool.subscribe(Filter::new()).await.unwrap();
        sub.close();
        assert_eq!(relay.subscription_count(), 0);
    }
}
