// SPDX-FileCopyrightText: © 2026 PrivKey LLC
// SPDX-License-Identifier: AGPL-3.0-or-later

#![forbid(unsafe_code)]

use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! wire_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident { $($variant:ident => $wire:literal),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(from = "String", into = "String")]
        pub enum $name {
            $($variant,)+
            Other(String),
        }

        impl $name {
            pub fn as_str(&self) -> &str {
                match self {
                    $(Self::$variant => $wire,)+
                    Self::Other(s) => s.as_str(),
                }
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                match s {
                    $($wire => Self::$variant,)+
                    other => Self::Other(other.to_string()),
                }
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self::from(s.as_str())
            }
        }

        impl From<$name> for String {
            fn from(value: $name) -> Self {
                value.as_str().to_string()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

wire_enum! {
    /// Wallet method names. Unknown names survive as `Other`.
    pub enum Method {
        GetInfo => "get_info",
        GetBalance => "get_balance",
        GetBudget => "get_budget",
        PayInvoice => "pay_invoice",
        MultiPayInvoice => "multi_pay_invoice",
        PayKeysend => "pay_keysend",
        MultiPayKeysend => "multi_pay_keysend",
        MakeInvoice => "make_invoice",
        MakeHoldInvoice => "make_hold_invoice",
        SettleHoldInvoice => "settle_hold_invoice",
        CancelHoldInvoice => "cancel_hold_invoice",
        LookupInvoice => "lookup_invoice",
        ListTransactions => "list_transactions",
        SignMessage => "sign_message",
        CreateConnection => "create_connection",
    }
}

wire_enum! {
    pub enum NotificationType {
        PaymentReceived => "payment_received",
        PaymentSent => "payment_sent",
        HoldInvoiceAccepted => "hold_invoice_accepted",
    }
}

wire_enum! {
    /// Error codes carried in a wallet's `error.code`.
    pub enum ErrorCode {
        RateLimited => "RATE_LIMITED",
        NotImplemented => "NOT_IMPLEMENTED",
        InsufficientBalance => "INSUFFICIENT_BALANCE",
        QuotaExceeded => "QUOTA_EXCEEDED",
        Restricted => "RESTRICTED",
        Unauthorized => "UNAUTHORIZED",
        Internal => "INTERNAL",
        Generic => "OTHER",
        PaymentFailed => "PAYMENT_FAILED",
        NotFound => "NOT_FOUND",
        UnsupportedEncryption => "UNSUPPORTED_ENCRYPTION",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_wire_names() {
        assert_eq!(Method::from("get_balance"), Method::GetBalance);
        assert_eq!(Method::MultiPayKeysend.as_str(), "multi_pay_keysend");
        assert_eq!(
            Method::from("fetch_quote"),
            Method::Other("fetch_quote".into())
        );
    }

    #[test]
    fn test_serde_as_string() {
        let json = serde_json::to_string(&NotificationType::PaymentReceived).unwrap();
        assert_eq!(json, "\"payment_received\"");
        let parsed: ErrorCode = serde_json::from_str("\"QUOTA_EXCEEDED\"").unwrap();
        assert_eq!(parsed, ErrorCode::QuotaExceeded);
        let unknown: ErrorCode = serde_json::from_str("\"WHATEVER\"").unwrap();
        assert_eq!(unknown.as_str(), "WHATEVER");
        assert_eq!(ErrorCode::Generic.as_str(), "OTHER");
    }
}
