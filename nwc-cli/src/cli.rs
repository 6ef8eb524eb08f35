// SPDX-FileCopyrightText: © 2026 PrivKey LLC
// SPDX-License-Identifier: AGPL-3.0-or-later

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(name = "nwc")]
#[command(about = "Nostr Wallet Connect client")]
#[command(version)]
pub(crate) struct Cli {
    /// nostr+walletconnect:// URI of the wallet connection
    #[arg(long, global = true, env = "NWC_URI", hide_env_values = true)]
    pub uri: Option<String>,

    /// Relay to use instead of the URI's (repeatable)
    #[arg(long = "relay", global = true)]
    pub relays: Vec<String>,

    /// Seconds to wait for the wallet's reply
    #[arg(long, global = true, value_parser = clap::value_parser!(u64).range(1..))]
    pub timeout: Option<u64>,

    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub(crate) enum Commands {
    /// Wallet node information
    Info,
    /// Capabilities the wallet advertises on its relays
    ServiceInfo,
    Balance,
    Budget,
    Pay {
        invoice: String,
        /// Amount in msats, for zero-amount invoices
        #[arg(long)]
        amount: Option<u64>,
    },
    Keysend {
        pubkey: String,
        /// Amount in msats
        amount: u64,
        #[arg(long)]
        preimage: Option<String>,
    },
    MakeInvoice {
        /// Amount in msats
        amount: u64,
        #[arg(short, long)]
        description: Option<String>,
        /// Seconds until the invoice expires
        #[arg(long)]
        expiry: Option<u64>,
        /// Wait up to this many seconds for the invoice to be paid
        #[arg(long)]
        wait: Option<u64>,
    },
    Lookup {
        #[arg(long, conflicts_with = "invoice", required_unless_present = "invoice")]
        payment_hash: Option<String>,
        #[arg(long)]
        invoice: Option<String>,
    },
    Transactions {
        #[arg(long, default_value = "20")]
        limit: u64,
        #[arg(long)]
        offset: Option<u64>,
        #[arg(long)]
        unpaid: bool,
        #[arg(long = "type", value_enum)]
        transaction_type: Option<TxDirection>,
    },
    SignMessage {
        message: String,
    },
    /// Print wallet notifications until interrupted
    Listen {
        #[arg(long, value_delimiter = ',')]
        types: Vec<String>,
    },
    /// Ask a wallet for a new connection (wallet auth)
    Auth {
        #[arg(long, default_value = "nwc")]
        name: String,
        #[arg(
            long,
            value_delimiter = ',',
            default_value = "get_info,get_balance,pay_invoice,make_invoice,lookup_invoice"
        )]
        methods: Vec<String>,
        #[arg(long, value_delimiter = ',')]
        notifications: Vec<String>,
        /// Wallet-specific suffix for the scheme, e.g. "alby"
        #[arg(long)]
        suffix: Option<String>,
        /// Budget in msats
        #[arg(long)]
        max_amount: Option<u64>,
        #[arg(long, value_enum)]
        budget_renewal: Option<Renewal>,
        #[arg(long)]
        expires_at: Option<u64>,
        #[arg(long)]
        isolated: bool,
        /// Seconds to wait for the wallet to accept
        #[arg(long, default_value = "300")]
        wait: u64,
    },
}

#[derive(Clone, Copy, ValueEnum)]
pub(crate) enum TxDirection {
    Incoming,
    Outgoing,
}

#[derive(Clone, Copy, ValueEnum)]
pub(crate) enum Renewal {
    Daily,
    Weekly,
    Monthly,
    Yearly,
    Never,
}
