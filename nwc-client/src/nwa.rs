// SPDX-FileCopyrightText: © 2026 PrivKey LLC
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Wallet-auth provisioning.
//!
//! The app publishes a `nostr+walletauth://<app-pubkey>?...` URI listing the
//! permissions it wants. Once the wallet accepts, it publishes an info event
//! tagged to the app's pubkey; its author is the wallet pubkey of the new
//! connection.

#![forbid(unsafe_code)]

use std::ops::ControlFlow;
use std::sync::Arc;

use nwc_core::event::info_kind;
use nwc_core::keys::{derive_public_key, generate_secret, normalize_public_key, normalize_secret};
use nwc_core::nostr_sdk::prelude::*;
use nwc_core::types::BudgetRenewal;
use nwc_core::{
    run_durable, Method, NostrRelayPool, NotificationType, NwcError, RelayTransport, Result,
    StopHandle, RECONNECT_DELAY,
};
use parking_lot::Mutex;
use serde_json::Value;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use ::url::Url;
use zeroize::Zeroizing;

use crate::client::{ClientOptions, NwcClient};
use crate::config::ClientConfig;

pub const WALLET_AUTH_SCHEME: &str = "nostr+walletauth";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct NwaOptions {
    pub relay_urls: Vec<String>,
    pub request_methods: Vec<Method>,
    pub name: Option<String>,
    pub icon: Option<String>,
    pub return_to: Option<String>,
    pub notification_types: Option<Vec<NotificationType>>,
    pub max_amount: Option<u64>,
    pub budget_renewal: Option<BudgetRenewal>,
    pub expires_at: Option<u64>,
    pub isolated: bool,
    pub metadata: Option<Value>,
}

impl NwaOptions {
    fn check(&self) -> Result<()> {
        if self.relay_urls.is_empty() {
            return Err(NwcError::InvalidInput("Missing relay urls".into()));
        }
        if self.request_methods.is_empty() {
            return Err(NwcError::InvalidInput("Missing request methods".into()));
        }
        Ok(())
    }
}

/// Result of parsing a wallet-auth URI.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedWalletAuth {
    pub app_pubkey: String,
    pub options: NwaOptions,
}

fn join<T: std::fmt::Display>(items: &[T]) -> String {
    items
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" ")
}

fn split<T: From<String>>(value: &str) -> Vec<T> {
    value
        .split(' ')
        .filter(|s| !s.is_empty())
        .map(|s| T::from(s.to_string()))
        .collect()
}

pub struct NwaClient {
    options: NwaOptions,
    secret: Zeroizing<String>,
    app_pubkey: String,
    transport: Arc<dyn RelayTransport>,
    config: ClientConfig,
}

impl NwaClient {
    /// New requester. A fresh keypair is generated unless `secret` is given.
    pub async fn new(options: NwaOptions, secret: Option<&str>) -> Result<Self> {
        options.check()?;
        let secret = match secret {
            Some(secret) => normalize_secret(secret)?,
            None => generate_secret(),
        };
        let keys = nwc_core::keys::keys_from_secret(&secret)?;
        let transport = NostrRelayPool::new(keys, &options.relay_urls).await?;
        Self::with_transport(options, Some(secret.as_str()), Arc::new(transport))
    }

    pub fn with_transport(
        options: NwaOptions,
        secret: Option<&str>,
        transport: Arc<dyn RelayTransport>,
    ) -> Result<Self> {
        options.check()?;
        let secret = match secret {
            Some(secret) => normalize_secret(secret)?,
            None => generate_secret(),
        };
        let app_pubkey = derive_public_key(&secret)?;
        Ok(Self {
            options,
            secret,
            app_pubkey,
            transport,
            config: ClientConfig::default(),
        })
    }

    pub fn with_config(mut self, config: ClientConfig) -> Self {
        self.config = config;
        self
    }

    pub fn app_pubkey(&self) -> &str {
        &self.app_pubkey
    }

    pub fn options(&self) -> &NwaOptions {
        &self.options
    }

    /// `nostr+walletauth[+suffix]://<app-pubkey>?...` with spaces encoded as `%20`.
    pub fn connection_uri(&self, suffix: Option<&str>) -> String {
        let o = &self.options;
        let mut params: Vec<(&str, String)> = vec![("request_methods", join(&o.request_methods))];
        if let Some(name) = &o.name {
            params.push(("name", name.clone()));
        }
        if let Some(icon) = &o.icon {
            params.push(("icon", icon.clone()));
        }
        if let Some(return_to) = &o.return_to {
            params.push(("return_to", return_to.clone()));
        }
        if let Some(types) = &o.notification_types {
            params.push(("notification_types", join(types)));
        }
        if let Some(max_amount) = o.max_amount.filter(|a| *a > 0) {
            params.push(("max_amount", max_amount.to_string()));
        }
        if let Some(renewal) = o.budget_renewal {
            params.push(("budget_renewal", renewal.to_string()));
        }
        if let Some(expires_at) = o.expires_at.filter(|e| *e > 0) {
            params.push(("expires_at", expires_at.to_string()));
        }
        if o.isolated {
            params.push(("isolated", "true".into()));
        }
        if let Some(metadata) = &o.metadata {
            params.push(("metadata", metadata.to_string()));
        }
        for relay in &o.relay_urls {
            params.push(("relay", relay.clone()));
        }

        let query = params
            .iter()
            .map(|(k, v)| format!("{k}={}", urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&");
        let scheme = match suffix.filter(|s| !s.is_empty()) {
            Some(suffix) => format!("{WALLET_AUTH_SCHEME}+{suffix}"),
            None => WALLET_AUTH_SCHEME.to_string(),
        };
        format!("{scheme}://{}?{query}", self.app_pubkey)
    }

    pub fn parse(uri: &str) -> Result<ParsedWalletAuth> {
        if !uri.starts_with(WALLET_AUTH_SCHEME) {
            return Err(NwcError::InvalidInput(
                "Unexpected scheme. Should be nostr+walletauth:// or nostr+walletauth+specificapp://"
                    .into(),
            ));
        }
        let rest = uri
            .split_once(':')
            .map(|(_, rest)| rest.strip_prefix("//").unwrap_or(rest))
            .unwrap_or_default();
        let url = Url::parse(&format!("{WALLET_AUTH_SCHEME}://{rest}"))
            .map_err(|e| NwcError::InvalidInput(format!("invalid wallet auth URI: {e}")))?;

        let host = url.host_str().unwrap_or_default();
        if host.len() != 64 {
            return Err(NwcError::InvalidInput(
                "Incorrect app pubkey found in auth string".into(),
            ));
        }
        let app_pubkey = normalize_public_key(host)?;

        let mut options = NwaOptions::default();
        for (key, value) in url.query_pairs() {
            let value = value.into_owned();
            match key.as_ref() {
                "relay" => options.relay_urls.push(value),
                "request_methods" => options.request_methods = split(&value),
                "notification_types" => options.notification_types = Some(split(&value)),
                "name" if !value.is_empty() => options.name = Some(value),
                "icon" if !value.is_empty() => options.icon = Some(value),
                "return_to" if !value.is_empty() => options.return_to = Some(value),
                "max_amount" => options.max_amount = value.parse().ok(),
                "expires_at" => options.expires_at = value.parse().ok(),
                "budget_renewal" => options.budget_renewal = value.parse().ok(),
                "isolated" => options.isolated = value == "true",
                "metadata" => {
                    let metadata = serde_json::from_str(&value).map_err(|e| {
                        NwcError::InvalidInput(format!("invalid metadata in auth string: {e}"))
                    })?;
                    options.metadata = Some(metadata);
                }
                _ => {}
            }
        }

        if options.relay_urls.is_empty() {
            return Err(NwcError::InvalidInput(
                "No relay URL found in auth string".into(),
            ));
        }
        if options.request_methods.is_empty() {
            return Err(NwcError::InvalidInput(
                "No request methods found in auth string".into(),
            ));
        }

        Ok(ParsedWalletAuth {
            app_pubkey,
            options,
        })
    }

    fn client_for(&self, wallet_pubkey: &PublicKey) -> Result<NwcClient> {
        NwcClient::with_transport(
            ClientOptions {
                relay_urls: self.options.relay_urls.clone(),
                wallet_pubkey: wallet_pubkey.to_hex(),
                secret: Some(self.secret.clone()),
                lud16: None,
                config: self.config.clone(),
            },
            self.transport.clone(),
        )
    }

    /// Wait for the wallet's acknowledgement and hand the resulting client
    /// to `on_success`, exactly once.
    pub fn subscribe<F>(&self, on_success: F) -> Result<NwaSubscription>
    where
        F: FnOnce(NwcClient) + Send + 'static,
    {
        let app_pubkey = PublicKey::from_hex(&self.app_pubkey)
            .map_err(|e| NwcError::InvalidInput(format!("invalid app pubkey: {e}")))?;
        let (stop, stop_rx) = StopHandle::new();
        let cancelled = stop_rx.clone();
        let on_success = Arc::new(Mutex::new(Some(on_success)));
        let transport = self.transport.clone();
        let requester = Arc::new(self.clone_parts());

        let task = tokio::spawn(run_durable(
            "wallet-auth",
            stop_rx,
            RECONNECT_DELAY,
            move || {
                let transport = transport.clone();
                async move {
                    transport.ensure_connected().await?;
                    let filter = Filter::new().kind(info_kind()).pubkey(app_pubkey);
                    transport.subscribe(filter).await
                }
            },
            move |event| {
                let requester = requester.clone();
                let on_success = on_success.clone();
                let mut cancelled = cancelled.clone();
                async move {
                    let client = match requester.client_for(&event.pubkey) {
                        Ok(client) => client,
                        Err(e) => {
                            warn!(error = %e, "ignoring unusable wallet-auth acknowledgement");
                            return ControlFlow::Continue(());
                        }
                    };
                    info!(wallet = %event.pubkey, "wallet-auth acknowledged");

                    let fetched = tokio::select! {
                        _ = cancelled.wait_for(|stopped| *stopped) => None,
                        info = client.get_info() => Some(info),
                    };
                    match fetched {
                        Some(Ok(info)) => client.set_lud16(info.lud16),
                        Some(Err(e)) => warn!(error = %e, "failed to fetch get_info"),
                        None => {}
                    }
                    if *cancelled.borrow() {
                        debug!("wallet-auth cancelled before completion");
                        return ControlFlow::Break(());
                    }

                    let callback = on_success.lock().take();
                    if let Some(callback) = callback {
                        callback(client);
                    }
                    ControlFlow::Break(())
                }
            },
        ));

        Ok(NwaSubscription { stop, task })
    }

    fn clone_parts(&self) -> Self {
        Self {
            options: self.options.clone(),
            secret: self.secret.clone(),
            app_pubkey: self.app_pubkey.clone(),
            transport: self.transport.clone(),
            config: self.config.clone(),
        }
    }
}

/// Pending wallet-auth listener. Dropping it stops the listener.
pub struct NwaSubscription {
    stop: StopHandle,
    task: JoinHandle<()>,
}

impl NwaSubscription {
    /// Stop waiting. Idempotent.
    pub fn unsub(&self) {
        self.stop.stop();
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    pub async fn join(self) {
        let _ = self.task.await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nwc_core::MemoryRelayPool;

    fn client(options: NwaOptions) -> NwaClient {
        let (pool, _relay) = MemoryRelayPool::single("wss://relay.one");
        NwaClient::with_transport(options, None, Arc::new(pool)).unwrap()
    }

    fn base_options() -> NwaOptions {
        NwaOptions {
            relay_urls: vec!["wss://relay.one".into(), "wss://relay.two".into()],
            request_methods: vec![Method::GetInfo],
            name: Some("Test App".into()),
            icon: Some("https://example.com/icon.png".into()),
            return_to: Some("https://example.com/return".into()),
            ..Default::default()
        }
    }

    #[test]
    fn test_builds_connection_uri() {
        let nwa = client(base_options());
        let uri = nwa.connection_uri(None);
        assert!(uri.starts_with(&format!("nostr+walletauth://{}?", nwa.app_pubkey())));
        assert!(uri.contains("request_methods=get_info"));
        assert!(uri.contains("relay=wss%3A%2F%2Frelay.one"));
        assert!(uri.contains("relay=wss%3A%2F%2Frelay.two"));
        assert!(uri.contains("name=Test%20App"));
        assert!(!uri.contains("Test+App"));
    }

    #[test]
    fn test_full_roundtrip_with_suffix() {
        let options = NwaOptions {
            request_methods: vec![Method::GetInfo, Method::PayInvoice],
            notification_types: Some(vec![NotificationType::PaymentReceived]),
            max_amount: Some(100_000),
            budget_renewal: Some(BudgetRenewal::Monthly),
            expires_at: Some(1_900_000_000),
            isolated: true,
            metadata: Some(serde_json::json!({"app": "shop", "tier": 2})),
            ..base_options()
        };
        let nwa = client(options.clone());
        let uri = nwa.connection_uri(Some("myapp"));
        assert!(uri.starts_with("nostr+walletauth+myapp://"));
        assert!(uri.contains("request_methods=get_info%20pay_invoice"));

        let parsed = NwaClient::parse(&uri).unwrap();
        assert_eq!(parsed.app_pubkey, nwa.app_pubkey());
        assert_eq!(parsed.options, options);
    }

    #[test]
    fn test_parse_rejects_malformed() {
        let nwa = client(base_options());
        let pubkey = nwa.app_pubkey().to_string();

        let no_relay = format!("nostr+walletauth://{pubkey}?request_methods=get_info");
        assert!(matches!(NwaClient::parse(&no_relay), Err(NwcError::InvalidInput(_))));

        let no_methods = format!("nostr+walletauth://{pubkey}?relay=wss%3A%2F%2Frelay.one");
        assert!(matches!(NwaClient::parse(&no_methods), Err(NwcError::InvalidInput(_))));

        let short_key = "nostr+walletauth://abcd?relay=wss%3A%2F%2Fr&request_methods=get_info";
        assert!(matches!(NwaClient::parse(short_key), Err(NwcError::InvalidInput(_))));

        let wrong_scheme = format!("nostr+walletconnect://{pubkey}?relay=x&request_methods=get_info");
        assert!(matches!(NwaClient::parse(&wrong_scheme), Err(NwcError::InvalidInput(_))));
    }

    #[test]
    fn test_requires_relays_and_methods() {
        let (pool, _relay) = MemoryRelayPool::single("wss://relay.one");
        let transport: Arc<dyn RelayTransport> = Arc::new(pool);
        let no_methods = NwaOptions {
            request_methods: vec![],
            ..base_options()
        };
        assert!(NwaClient::with_transport(no_methods, None, transport.clone()).is_err());
        let no_relays = NwaOptions {
            relay_urls: vec![],
            ..base_options()
        };
        assert!(NwaClient::with_transport(no_relays, None, transport).is_err());
    }

    #[test]
    fn test_supplied_secret_is_used() {
        let secret = Keys::generate();
        let (pool, _relay) = MemoryRelayPool::single("wss://relay.one");
        let nwa = NwaClient::with_transport(
            base_options(),
            Some(&secret.secret_key().to_secret_hex()),
            Arc::new(pool),
        )
        .unwrap();
        assert_eq!(nwa.app_pubkey(), secret.public_key().to_hex());
    }
}
