// SPDX-FileCopyrightText: © 2026 PrivKey LLC
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Wallet side of Nostr Wallet Connect.
//!
//! A [`WalletService`] listens for encrypted requests addressed to a wallet
//! key, runs them through a [`WalletHandler`] and answers with the scheme the
//! request used. It also publishes the wallet's info event, wallet-auth
//! acknowledgements and payment notifications.

#![forbid(unsafe_code)]

pub mod dispatch;
pub mod handler;
pub mod service;

pub use dispatch::{dispatch, Reply, WalletRequest};
pub use handler::{HandlerResult, RequestContext, WalletHandler};
pub use service::{ServiceConfig, ServiceHandle, WalletService, WalletServiceKeyPair};
