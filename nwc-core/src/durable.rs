// SPDX-FileCopyrightText: © 2026 PrivKey LLC
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Subscription loops that outlive relay disconnects.
//!
//! A durable loop opens a subscription, drains it until the relay closes it,
//! waits a fixed delay and opens it again. It runs until its [`StopHandle`]
//! is stopped or dropped, or until the event callback asks it to break.

#![forbid(unsafe_code)]

use std::future::Future;
use std::ops::ControlFlow;
use std::time::Duration;

use nostr_sdk::prelude::*;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::relay::Subscription;

pub const RECONNECT_DELAY: Duration = Duration::from_secs(1);

/// Stops a background loop. Stopping twice is a no-op.
#[derive(Debug)]
pub struct StopHandle {
    tx: watch::Sender<bool>,
}

impl StopHandle {
    pub fn new() -> (Self, watch::Receiver<bool>) {
        let (tx, rx) = watch::channel(false);
        (Self { tx }, rx)
    }

    pub fn stop(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_stopped(&self) -> bool {
        *self.tx.borrow()
    }
}

impl Drop for StopHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn stopped(stop: &mut watch::Receiver<bool>) {
    // A dropped sender counts as a stop request.
    let _ = stop.wait_for(|stopped| *stopped).await;
}

fn is_stopped(stop: &watch::Receiver<bool>) -> bool {
    *stop.borrow()
}

#[tracing::instrument(skip_all, fields(label = label))]
pub async fn run_durable<O, OF, E, EF>(
    label: &'static str,
    mut stop: watch::Receiver<bool>,
    reconnect_delay: Duration,
    mut open: O,
    mut on_event: E,
) where
    O: FnMut() -> OF,
    OF: Future<Output = Result<Subscription>>,
    E: FnMut(Event) -> EF,
    EF: Future<Output = ControlFlow<()>>,
{
    while !is_stopped(&stop) {
        let opened = tokio::select! {
            _ = stopped(&mut stop) => break,
            opened = open() => opened,
        };

        match opened {
            Ok(mut subscription) => {
                debug!("subscription open");
                loop {
                    let next = tokio::select! {
                        _ = stopped(&mut stop) => {
                            subscription.close();
                            return;
                        }
                        next = subscription.next() => next,
                    };
                    match next {
                        Some(event) => {
                            if on_event(event).await.is_break() {
                                subscription.close();
                                return;
                            }
                        }
                        None => {
                            info!("relay connection closed");
                            break;
                        }
                    }
                }
            }
            Err(e) => warn!(error = %e, "failed to open subscription"),
        }

        tokio::select! {
            _ = stopped(&mut stop) => break,
            _ = tokio::time::sleep(reconnect_delay) => {}
        }
    }
    debug!("loop stopped");
}
