// SPDX-FileCopyrightText: © 2026 PrivKey LLC
// SPDX-License-Identifier: AGPL-3.0-or-later

#![forbid(unsafe_code)]

mod cli;
mod commands;
mod config;
mod error;
mod output;

use std::sync::atomic::{AtomicU64, Ordering};

use clap::Parser;
use tracing::debug;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Commands};
use crate::commands::Context;
use crate::config::{Config, LogLevel};
use crate::error::Result;
use crate::output::Output;

static REQUEST_COUNTER: AtomicU64 = AtomicU64::new(0);

fn next_request_id() -> String {
    let id = REQUEST_COUNTER.fetch_add(1, Ordering::SeqCst);
    format!("req-{id:08x}")
}

fn init_logging(level: LogLevel) {
    let use_json = std::env::var("NWC_LOG_JSON").is_ok();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.to_string()));

    if use_json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_span_events(FmtSpan::CLOSE)
            .with_current_span(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .without_time()
            .with_span_events(FmtSpan::CLOSE)
            .init();
    }
}

fn main() {
    let cli = Cli::parse();
    let out = Output::new();

    let cfg = Config::load(cli.config.as_deref());
    init_logging(cfg.as_ref().map(|c| c.log_level).unwrap_or_default());
    nwc_core::install_default_crypto_provider();

    let result = cfg.and_then(|cfg| run(&out, cli, &cfg));
    if let Err(e) = result {
        out.error(&e.to_string());
        std::process::exit(1);
    }
}

#[tracing::instrument(skip_all, fields(request_id = %next_request_id()))]
fn run(out: &Output, cli: Cli, cfg: &Config) -> Result<()> {
    let ctx = Context {
        uri: cli.uri,
        relays: cfg.relay_override(&cli.relays),
        reply_timeout: cfg.reply_timeout(cli.timeout),
    };
    debug!(relays = ?ctx.relays, "starting command");

    match cli.command {
        Commands::Info => commands::wallet::cmd_info(out, &ctx, cfg),
        Commands::ServiceInfo => commands::wallet::cmd_service_info(out, &ctx, cfg),
        Commands::Balance => commands::wallet::cmd_balance(out, &ctx, cfg),
        Commands::Budget => commands::wallet::cmd_budget(out, &ctx, cfg),
        Commands::Pay { invoice, amount } => {
            commands::wallet::cmd_pay(out, &ctx, cfg, &invoice, amount)
        }
        Commands::Keysend {
            pubkey,
            amount,
            preimage,
        } => commands::wallet::cmd_keysend(out, &ctx, cfg, &pubkey, amount, preimage),
        Commands::MakeInvoice {
            amount,
            description,
            expiry,
            wait,
        } => commands::wallet::cmd_make_invoice(out, &ctx, cfg, amount, description, expiry, wait),
        Commands::Lookup {
            payment_hash,
            invoice,
        } => commands::wallet::cmd_lookup(out, &ctx, cfg, payment_hash, invoice),
        Commands::Transactions {
            limit,
            offset,
            unpaid,
            transaction_type,
        } => commands::wallet::cmd_transactions(
            out,
            &ctx,
            cfg,
            limit,
            offset,
            unpaid,
            transaction_type,
        ),
        Commands::SignMessage { message } => {
            commands::wallet::cmd_sign_message(out, &ctx, cfg, &message)
        }
        Commands::Listen { types } => commands::listen::cmd_listen(out, &ctx, cfg, &types),
        Commands::Auth {
            name,
            methods,
            notifications,
            suffix,
            max_amount,
            budget_renewal,
            expires_at,
            isolated,
            wait,
        } => commands::auth::cmd_auth(
            out,
            &ctx,
            cfg,
            commands::auth::AuthArgs {
                name,
                methods,
                notifications,
                suffix,
                max_amount,
                budget_renewal,
                expires_at,
                isolated,
                wait,
            },
        ),
    }
}
