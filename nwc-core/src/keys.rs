// SPDX-FileCopyrightText: © 2026 PrivKey LLC
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Key normalization and derivation.
//!
//! Secrets and public keys are accepted either as 64-character hex or in their
//! bech32 form (`nsec1...` / `npub1...`). Both forms resolve to the same 32-byte
//! representation used for signing and encryption.

#![forbid(unsafe_code)]

use nostr_sdk::prelude::*;
use zeroize::Zeroizing;

use crate::error::{NwcError, Result};

/// Parse a secret in hex or `nsec` form.
pub fn parse_secret(input: &str) -> Result<SecretKey> {
    let input = input.trim();
    if input.to_ascii_lowercase().starts_with("nsec") {
        return SecretKey::from_bech32(input)
            .map_err(|e| NwcError::InvalidInput(format!("invalid nsec: {e}")));
    }
    SecretKey::from_hex(input).map_err(|e| NwcError::InvalidInput(format!("invalid secret: {e}")))
}

/// Parse a public key in hex or `npub` form.
pub fn parse_public_key(input: &str) -> Result<PublicKey> {
    let input = input.trim();
    if input.to_ascii_lowercase().starts_with("npub") {
        return PublicKey::from_bech32(input)
            .map_err(|e| NwcError::InvalidInput(format!("invalid npub: {e}")));
    }
    PublicKey::from_hex(input).map_err(|e| NwcError::InvalidInput(format!("invalid pubkey: {e}")))
}

/// Normalize a secret to lowercase hex. Idempotent on hex input.
pub fn normalize_secret(input: &str) -> Result<Zeroizing<String>> {
    let secret = parse_secret(input)?;
    Ok(Zeroizing::new(secret.to_secret_hex()))
}

/// Normalize a public key to lowercase hex. Idempotent on hex input.
pub fn normalize_public_key(input: &str) -> Result<String> {
    Ok(parse_public_key(input)?.to_hex())
}

pub fn derive_public_key(secret: &str) -> Result<String> {
    let secret = parse_secret(secret)?;
    Ok(Keys::new(secret).public_key().to_hex())
}

pub fn keys_from_secret(secret: &str) -> Result<Keys> {
    Ok(Keys::new(parse_secret(secret)?))
}

pub fn generate_secret() -> Zeroizing<String> {
    Zeroizing::new(Keys::generate().secret_key().to_secret_hex())
}
