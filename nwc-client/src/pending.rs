// SPDX-FileCopyrightText: © 2026 PrivKey LLC
// SPDX-License-Identifier: AGPL-3.0-or-later

#![forbid(unsafe_code)]

use std::collections::HashSet;
use std::sync::Arc;

use nwc_core::nostr_sdk::prelude::*;
use parking_lot::Mutex;

/// Ids of requests still waiting on their replies.
#[derive(Debug, Clone, Default)]
pub struct PendingRequests {
    ids: Arc<Mutex<HashSet<EventId>>>,
}

impl PendingRequests {
    pub fn new() -> Self {
        Self::default()
    }

    /// Track a request until the returned guard drops, so only the
    /// request's own completion path ever forgets it.
    pub fn register(&self, id: EventId) -> PendingGuard {
        self.ids.lock().insert(id);
        PendingGuard {
            id,
            ids: self.ids.clone(),
        }
    }

    pub fn len(&self) -> usize {
        self.ids.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.lock().is_empty()
    }
}

pub struct PendingGuard {
    id: EventId,
    ids: Arc<Mutex<HashSet<EventId>>>,
}

impl Drop for PendingGuard {
    fn drop(&mut self) {
        self.ids.lock().remove(&self.id);
    }
}
