// SPDX-FileCopyrightText: © 2026 PrivKey LLC
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Nostr Wallet Connect client.
//!
//! [`NwcClient`] sends encrypted requests to a wallet service and correlates
//! the replies, including batched payments answered item by item.
//! Notifications, wallet-auth provisioning ([`NwaClient`]) and waiting for an
//! invoice to be paid ([`ReceiveInvoice`]) are built on the same relay
//! transport.

#![forbid(unsafe_code)]

pub mod client;
pub mod config;
pub mod notifications;
pub mod nwa;
pub mod pending;
pub mod receive;
pub mod uri;

pub use client::{ClientOptions, NwcClient};
pub use config::{ClientConfig, Timeouts};
pub use notifications::NotificationSubscription;
pub use nwa::{NwaClient, NwaOptions, NwaSubscription, ParsedWalletAuth};
pub use receive::{DecodedInvoice, InvoiceDecoder, ReceiveInvoice};
pub use uri::{authorization_url, AuthorizationUrlOptions, ConnectUri};

pub use nwc_core::{NwcError, Result};
