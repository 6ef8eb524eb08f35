// SPDX-FileCopyrightText: © 2026 PrivKey LLC
// SPDX-License-Identifier: AGPL-3.0-or-later

#![forbid(unsafe_code)]

use nwc_core::keys::{normalize_public_key, normalize_secret};
use nwc_core::types::BudgetRenewal;
use nwc_core::{Method, NotificationType, NwcError, Result};
use serde_json::Value;
use url::Url;
use zeroize::Zeroizing;

pub const CONNECT_SCHEME: &str = "nostr+walletconnect";

const CONNECT_PREFIXES: [&str; 4] = [
    "nostr+walletconnect://",
    "nostrwalletconnect://",
    "nostr+walletconnect:",
    "nostrwalletconnect:",
];

/// Parsed `nostr+walletconnect://` connection string.
#[derive(Clone)]
pub struct ConnectUri {
    pub wallet_pubkey: String,
    pub relays: Vec<String>,
    pub secret: Option<Zeroizing<String>>,
    pub lud16: Option<String>,
}

impl std::fmt::Debug for ConnectUri {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectUri")
            .field("wallet_pubkey", &self.wallet_pubkey)
            .field("relays", &self.relays)
            .field("secret", &self.secret.as_ref().map(|_| "<redacted>"))
            .field("lud16", &self.lud16)
            .finish()
    }
}

impl ConnectUri {
    pub fn parse(input: &str) -> Result<Self> {
        let input = input.trim();
        let rest = CONNECT_PREFIXES
            .iter()
            .find_map(|prefix| input.strip_prefix(prefix))
            .ok_or_else(|| {
                NwcError::InvalidInput(format!("expected {CONNECT_SCHEME}:// connection string"))
            })?;

        let url = Url::parse(&format!("{CONNECT_SCHEME}://{rest}"))
            .map_err(|e| NwcError::InvalidInput(format!("invalid connection string: {e}")))?;

        let host = url
            .host_str()
            .ok_or_else(|| NwcError::InvalidInput("missing wallet pubkey".into()))?;
        let wallet_pubkey = normalize_public_key(host)?;

        let mut relays = Vec::new();
        let mut secret = None;
        let mut lud16 = None;
        for (key, value) in url.query_pairs() {
            match key.as_ref() {
                "relay" => relays.push(value.into_owned()),
                "secret" if !value.is_empty() => secret = Some(normalize_secret(&value)?),
                "lud16" if !value.is_empty() => lud16 = Some(value.into_owned()),
                _ => {}
            }
        }

        if relays.is_empty() {
            return Err(NwcError::InvalidInput(
                "No relay URL found in connection string".into(),
            ));
        }

        Ok(Self {
            wallet_pubkey,
            relays,
            secret,
            lud16,
        })
    }

    /// Render the connection string. `client_pubkey` is informational and
    /// only emitted when known.
    pub fn to_uri(&self, client_pubkey: Option<&str>, include_secret: bool) -> Result<String> {
        let mut uri = format!("{CONNECT_SCHEME}://{}?", self.wallet_pubkey);
        let relays: Vec<String> = self
            .relays
            .iter()
            .map(|r| format!("relay={}", urlencoding::encode(r)))
            .collect();
        uri.push_str(&relays.join("&"));

        if let Some(pubkey) = client_pubkey {
            uri.push_str(&format!("&pubkey={pubkey}"));
        }
        if include_secret {
            let secret = self
                .secret
                .as_ref()
                .ok_or_else(|| NwcError::InvalidInput("Missing secret key".into()))?;
            uri.push_str(&format!("&secret={}", secret.as_str()));
        }
        if let Some(lud16) = &self.lud16 {
            uri.push_str(&format!("&lud16={}", urlencoding::encode(lud16)));
        }
        Ok(uri)
    }
}

/// Options for a wallet's web authorization page.
#[derive(Debug, Clone, Default)]
pub struct AuthorizationUrlOptions {
    pub name: Option<String>,
    pub return_to: Option<String>,
    pub budget_renewal: Option<BudgetRenewal>,
    /// Unix seconds.
    pub expires_at: Option<u64>,
    pub max_amount: Option<u64>,
    pub request_methods: Option<Vec<Method>>,
    pub notification_types: Option<Vec<NotificationType>>,
    pub isolated: bool,
    pub metadata: Option<Value>,
}

fn join<T: std::fmt::Display>(items: &[T]) -> String {
    items
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Build the URL of a wallet's authorization page for `pubkey`.
pub fn authorization_url(
    base: &str,
    options: &AuthorizationUrlOptions,
    pubkey: &str,
) -> Result<Url> {
    if base.contains("/#/") {
        return Err(NwcError::InvalidInput(
            "hash router paths not supported".into(),
        ));
    }
    let mut url = Url::parse(base)
        .map_err(|e| NwcError::InvalidInput(format!("invalid authorization base: {e}")))?;
    let pubkey = normalize_public_key(pubkey)?;

    let mut params: Vec<(&str, String)> = Vec::new();
    if let Some(name) = &options.name {
        params.push(("name", name.clone()));
    }
    params.push(("pubkey", pubkey));
    if let Some(return_to) = &options.return_to {
        params.push(("return_to", return_to.clone()));
    }
    if let Some(renewal) = options.budget_renewal {
        params.push(("budget_renewal", renewal.as_str().to_string()));
    }
    if let Some(expires_at) = options.expires_at {
        params.push(("expires_at", expires_at.to_string()));
    }
    if let Some(max_amount) = options.max_amount.filter(|a| *a > 0) {
        params.push(("max_amount", max_amount.to_string()));
    }
    if let Some(methods) = &options.request_methods {
        params.push(("request_methods", join(methods)));
    }
    if let Some(types) = &options.notification_types {
        params.push(("notification_types", join(types)));
    }
    if options.isolated {
        params.push(("isolated", "true".to_string()));
    }
    if let Some(metadata) = &options.metadata {
        params.push(("metadata", metadata.to_string()));
    }

    // Parameters we set replace any the base already carries.
    let kept: Vec<(String, String)> = url
        .query_pairs()
        .into_owned()
        .filter(|(key, _)| !params.iter().any(|(name, _)| *name == key.as_str()))
        .collect();
    url.set_query(None);
    url.query_pairs_mut()
        .extend_pairs(&kept)
        .extend_pairs(&params);
    Ok(url)
}
