// SPDX-FileCopyrightText: © 2026 PrivKey LLC
// SPDX-License-Identifier: AGPL-3.0-or-later

#![forbid(unsafe_code)]

use nostr_sdk::prelude::*;

use crate::crypto::EncryptionScheme;
use crate::event::{info_kind, tag, tag_value, EventTemplate};
use crate::method::{Method, NotificationType};

/// Capabilities a wallet service advertises in its info event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalletServiceInfo {
    /// Scheme names as advertised, including ones this crate does not speak.
    pub encryptions: Vec<String>,
    pub capabilities: Vec<Method>,
    pub notifications: Vec<NotificationType>,
}

impl WalletServiceInfo {
    pub fn new(
        encryptions: &[EncryptionScheme],
        capabilities: Vec<Method>,
        notifications: Vec<NotificationType>,
    ) -> Self {
        Self {
            encryptions: encryptions.iter().map(|e| e.as_str().to_string()).collect(),
            capabilities,
            notifications,
        }
    }

    /// Read an info event. Without an `encryption` tag the wallet is assumed
    /// to speak NIP-04, plus NIP-44 when its `v` tag lists `1.0`.
    pub fn from_event(event: &Event) -> Self {
        let mut encryptions = vec![EncryptionScheme::Nip04.as_str().to_string()];
        if tag_value(event, "v").is_some_and(|v| v.split_whitespace().any(|v| v == "1.0")) {
            encryptions.push(EncryptionScheme::Nip44V2.as_str().to_string());
        }
        if let Some(list) = tag_value(event, "encryption") {
            encryptions = list.split_whitespace().map(str::to_string).collect();
        }

        let capabilities = event
            .content
            .split([' ', '|', ','])
            .filter(|s| !s.is_empty())
            .map(Method::from)
            .collect();

        let notifications = tag_value(event, "notifications")
            .map(|list| list.split_whitespace().map(NotificationType::from).collect())
            .unwrap_or_default();

        Self {
            encryptions,
            capabilities,
            notifications,
        }
    }

    pub fn supports(&self, method: &Method) -> bool {
        self.capabilities.contains(method)
    }

    pub fn supports_notification(&self, notification: &NotificationType) -> bool {
        self.notifications.contains(notification)
    }

    /// Unsigned info event; `recipient` turns it into a wallet-auth acknowledgement.
    pub fn to_template(&self, recipient: Option<PublicKey>) -> EventTemplate {
        let content = self
            .capabilities
            .iter()
            .map(Method::as_str)
            .collect::<Vec<_>>()
            .join(" ");
        let encryptions = self.encryptions.join(" ");
        let notifications = self
            .notifications
            .iter()
            .map(NotificationType::as_str)
            .collect::<Vec<_>>()
            .join(" ");
        let version = if self
            .encryptions
            .iter()
            .any(|e| e == EncryptionScheme::Nip44V2.as_str())
        {
            "1.0"
        } else {
            "0.0"
        };

        let mut template = EventTemplate::new(info_kind(), content)
            .tag(tag("encryption", &[encryptions.as_str()]))
            .tag(tag("v", &[version]));
        if !notifications.is_empty() {
            template = template.tag(tag("notifications", &[notifications.as_str()]));
        }
        if let Some(recipient) = recipient {
            template = template.tag(Tag::public_key(recipient));
        }
        template
    }
}
