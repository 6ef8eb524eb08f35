// SPDX-FileCopyrightText: © 2026 PrivKey LLC
// SPDX-License-Identifier: AGPL-3.0-or-later

#![forbid(unsafe_code)]

use std::fmt;
use std::str::FromStr;

use nostr_sdk::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{NwcError, Result};
use crate::event::{NOTIFICATION_KIND_NIP04, NOTIFICATION_KIND_NIP44};

/// Payload encryption negotiated between client and wallet service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EncryptionScheme {
    #[serde(rename = "nip04")]
    Nip04,
    #[serde(rename = "nip44_v2")]
    Nip44V2,
}

impl EncryptionScheme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Nip04 => "nip04",
            Self::Nip44V2 => "nip44_v2",
        }
    }

    /// Value of the `v` tag on requests.
    pub fn version(&self) -> &'static str {
        match self {
            Self::Nip04 => "0.0",
            Self::Nip44V2 => "1.0",
        }
    }

    pub fn notification_kind(&self) -> Kind {
        match self {
            Self::Nip04 => Kind::Custom(NOTIFICATION_KIND_NIP04),
            Self::Nip44V2 => Kind::Custom(NOTIFICATION_KIND_NIP44),
        }
    }

    /// Scheme named by a request's `encryption` tag. Requests without the tag
    /// predate negotiation and use NIP-04.
    pub fn from_tag(tag: Option<&str>) -> Result<Self> {
        match tag {
            None => Ok(Self::Nip04),
            Some(value) => value.parse(),
        }
    }
}

impl fmt::Display for EncryptionScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EncryptionScheme {
    type Err = NwcError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "nip04" => Ok(Self::Nip04),
            "nip44_v2" => Ok(Self::Nip44V2),
            other => Err(NwcError::UnsupportedEncryption(format!(
                "unknown encryption scheme: {other}"
            ))),
        }
    }
}

/// Pick the strongest scheme the peer advertises.
pub fn select_encryption<S: AsRef<str>>(peer_schemes: &[S]) -> Option<EncryptionScheme> {
    let offers = |scheme: EncryptionScheme| peer_schemes.iter().any(|s| s.as_ref() == scheme.as_str());
    if offers(EncryptionScheme::Nip44V2) {
        Some(EncryptionScheme::Nip44V2)
    } else if offers(EncryptionScheme::Nip04) {
        Some(EncryptionScheme::Nip04)
    } else {
        None
    }
}

pub fn encrypt(
    secret_key: &SecretKey,
    peer: &PublicKey,
    plaintext: &str,
    scheme: EncryptionScheme,
) -> Result<String> {
    match scheme {
        EncryptionScheme::Nip04 => nip04::encrypt(secret_key, peer, plaintext)
            .map_err(|e| NwcError::Crypto(format!("nip04 encrypt: {e}"))),
        EncryptionScheme::Nip44V2 => {
            nip44::encrypt(secret_key, peer, plaintext, nip44::Version::V2)
                .map_err(|e| NwcError::Crypto(format!("nip44 encrypt: {e}")))
        }
    }
}

pub fn decrypt(
    secret_key: &SecretKey,
    peer: &PublicKey,
    ciphertext: &str,
    scheme: EncryptionScheme,
) -> Result<String> {
    match scheme {
        EncryptionScheme::Nip04 => nip04::decrypt(secret_key, peer, ciphertext)
            .map_err(|e| NwcError::Crypto(format!("nip04 decrypt: {e}"))),
        EncryptionScheme::Nip44V2 => nip44::decrypt(secret_key, peer, ciphertext)
            .map_err(|e| NwcError::Crypto(format!("nip44 decrypt: {e}"))),
    }
}
