// SPDX-FileCopyrightText: © 2026 PrivKey LLC
// SPDX-License-Identifier: AGPL-3.0-or-later

#![forbid(unsafe_code)]

use std::ops::ControlFlow;
use std::sync::Arc;

use nwc_core::nostr_sdk::prelude::*;
use nwc_core::types::Notification;
use nwc_core::{run_durable, NotificationType, StopHandle, RECONNECT_DELAY};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::client::NwcClient;

/// Live notification listener. Dropping it stops the listener.
pub struct NotificationSubscription {
    stop: StopHandle,
    task: JoinHandle<()>,
}

impl NotificationSubscription {
    /// Stop listening and close the live subscription. Idempotent.
    pub fn unsubscribe(&self) {
        self.stop.stop();
    }

    pub fn is_active(&self) -> bool {
        !self.stop.is_stopped() && !self.task.is_finished()
    }

    /// Wait for the listener task to finish after `unsubscribe`.
    pub async fn join(self) {
        self.stop.stop();
        let _ = self.task.await;
    }
}

impl NwcClient {
    /// Deliver wallet notifications to `on_notification` until unsubscribed.
    ///
    /// `types` narrows delivery to the listed notification types; `None`
    /// delivers everything. Notifications that fail to decrypt or parse are
    /// logged and dropped.
    pub fn subscribe_notifications<F>(
        &self,
        on_notification: F,
        types: Option<Vec<NotificationType>>,
    ) -> NotificationSubscription
    where
        F: Fn(Notification) + Send + Sync + 'static,
    {
        let (stop, stop_rx) = StopHandle::new();
        let on_notification = Arc::new(on_notification);
        let types = Arc::new(types);
        let open_client = self.clone();
        let event_client = self.clone();

        let task = tokio::spawn(run_durable(
            "notifications",
            stop_rx,
            RECONNECT_DELAY,
            move || {
                let client = open_client.clone();
                async move {
                    let transport = client.transport();
                    transport.ensure_connected().await?;
                    let scheme = client.encryption_scheme().await?;
                    let filter = Filter::new()
                        .kind(scheme.notification_kind())
                        .author(client.wallet_pubkey())
                        .pubkey(client.public_key());
                    transport.subscribe(filter).await
                }
            },
            move |event| {
                let client = event_client.clone();
                let on_notification = on_notification.clone();
                let types = types.clone();
                async move {
                    client.deliver_notification(&event, types.as_deref(), on_notification.as_ref());
                    ControlFlow::Continue(())
                }
            },
        ));

        NotificationSubscription { stop, task }
    }

    fn deliver_notification<F>(&self, event: &Event, types: Option<&[NotificationType]>, on_notification: &F)
    where
        F: Fn(Notification),
    {
        let Some(scheme) = self.encryption() else {
            warn!("notification received before encryption was negotiated");
            return;
        };
        let plaintext = match self.decrypt_from_wallet(&event.content, scheme) {
            Ok(plaintext) => plaintext,
            Err(e) => {
                warn!(error = %e, "failed to decrypt notification");
                return;
            }
        };
        let notification: Notification = match serde_json::from_str(&plaintext) {
            Ok(notification) => notification,
            Err(e) => {
                warn!(error = %e, "failed to parse notification");
                return;
            }
        };
        if types.is_some_and(|types| !types.contains(&notification.notification_type)) {
            debug!(kind = %notification.notification_type, "notification filtered");
            return;
        }
        on_notification(notification);
    }
}
