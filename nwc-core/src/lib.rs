// SPDX-FileCopyrightText: © 2026 PrivKey LLC
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Shared building blocks for Nostr Wallet Connect (NIP-47).
//!
//! Key handling, payload encryption, event construction, the typed wire
//! model, the relay transport abstraction and the reconnecting subscription
//! loop used by both the client and the wallet service.

#![forbid(unsafe_code)]

pub mod crypto;
pub mod durable;
pub mod error;
pub mod event;
pub mod info;
pub mod keys;
pub mod memory;
pub mod method;
pub mod pool;
pub mod relay;
pub mod types;

pub use crypto::{select_encryption, EncryptionScheme};
pub use durable::{run_durable, StopHandle, RECONNECT_DELAY};
pub use error::{NwcError, Result};
pub use info::WalletServiceInfo;
pub use memory::{MemoryRelay, MemoryRelayPool, PublishMode};
pub use method::{ErrorCode, Method, NotificationType};
pub use pool::{install_default_crypto_provider, NostrRelayPool};
pub use relay::{validate_relay_url, RelayTransport, Subscription};

pub use nostr_sdk;
