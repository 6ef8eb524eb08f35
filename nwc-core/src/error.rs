// SPDX-FileCopyrightText: © 2026 PrivKey LLC
// SPDX-License-Identifier: AGPL-3.0-or-later

#![forbid(unsafe_code)]

use thiserror::Error;

#[derive(Error, Debug)]
pub enum NwcError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Publish failed: {0}")]
    Publish(String),

    #[error("Publish timeout: {0}")]
    PublishTimeout(String),

    #[error("Reply timeout: {0}")]
    ReplyTimeout(String),

    #[error("Response decoding failed: {0}")]
    ResponseDecoding(String),

    #[error("Response validation failed: {0}")]
    ResponseValidation(String),

    #[error("Wallet error {code}: {message}")]
    Wallet { code: String, message: String },

    #[error("Unsupported encryption: {0}")]
    UnsupportedEncryption(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Crypto error: {0}")]
    Crypto(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl NwcError {
    pub fn wallet(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Wallet {
            code: code.into(),
            message: message.into(),
        }
    }

    /// Machine-readable code. Wallet errors pass the peer's code through verbatim.
    pub fn code(&self) -> &str {
        match self {
            Self::Network(_) => "NETWORK",
            Self::Publish(_) => "PUBLISH",
            Self::PublishTimeout(_) => "PUBLISH_TIMEOUT",
            Self::ReplyTimeout(_) => "REPLY_TIMEOUT",
            Self::ResponseDecoding(_) => "RESPONSE_DECODING",
            Self::ResponseValidation(_) => "RESPONSE_VALIDATION",
            Self::Wallet { code, .. } => code,
            Self::UnsupportedEncryption(_) => "UNSUPPORTED_ENCRYPTION",
            Self::InvalidInput(_) => "INVALID_INPUT",
            Self::Crypto(_) => "CRYPTO",
            Self::Json(_) => "JSON",
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::PublishTimeout(_) | Self::ReplyTimeout(_))
    }
}

pub type Result<T> = std::result::Result<T, NwcError>;
