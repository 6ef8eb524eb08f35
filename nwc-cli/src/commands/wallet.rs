// SPDX-FileCopyrightText: © 2026 PrivKey LLC
// SPDX-License-Identifier: AGPL-3.0-or-later

use std::future::Future;
use std::time::Duration;

use nwc_client::NwcClient;
use nwc_core::types::{
    ListTransactionsRequest, LookupInvoiceRequest, MakeInvoiceRequest, PayInvoiceRequest,
    PayKeysendRequest, SignMessageRequest, TransactionType,
};

use crate::cli::TxDirection;
use crate::config::Config;
use crate::error::Result;
use crate::output::{format_msats, Details, Output, Table};

use super::{block_on, Context};

/// Connect, run `f` against the wallet, then close the relay connections.
fn with_client<T, F, Fut>(out: &Output, ctx: &Context, cfg: &Config, f: F) -> Result<T>
where
    F: FnOnce(NwcClient) -> Fut,
    Fut: Future<Output = nwc_core::Result<T>>,
{
    block_on(run_with_client(out, ctx, cfg, f))?
}

async fn run_with_client<T, F, Fut>(out: &Output, ctx: &Context, cfg: &Config, f: F) -> Result<T>
where
    F: FnOnce(NwcClient) -> Fut,
    Fut: Future<Output = nwc_core::Result<T>>,
{
    let spinner = out.spinner("Connecting to wallet...");
    let client = ctx.connect(cfg).await;
    spinner.finish();
    let client = client?;
    let result = f(client.clone()).await;
    client.close().await;
    Ok(result?)
}

pub fn cmd_info(out: &Output, ctx: &Context, cfg: &Config) -> Result<()> {
    let info = with_client(out, ctx, cfg, |client| async move { client.get_info().await })?;

    let methods: Vec<&str> = info.methods.iter().flatten().map(|m| m.as_str()).collect();
    let notifications: Vec<&str> = info
        .notifications
        .iter()
        .flatten()
        .map(|n| n.as_str())
        .collect();

    out.section("Wallet");
    out.details(
        Details::new()
            .opt("Alias", info.alias.as_deref())
            .opt("Pubkey", info.pubkey.as_deref())
            .opt("Network", info.network.as_deref())
            .opt("Block height", info.block_height)
            .opt("Block hash", info.block_hash.as_deref())
            .opt("Lightning address", info.lud16.as_deref())
            .list("Methods", &methods)
            .list("Notifications", &notifications),
    );
    Ok(())
}

pub fn cmd_service_info(out: &Output, ctx: &Context, cfg: &Config) -> Result<()> {
    let (info, scheme) = with_client(out, ctx, cfg, |client| async move {
        let info = client.wallet_service_info().await;
        let scheme = client.encryption_scheme().await;
        info.and_then(|info| scheme.map(|scheme| (info, scheme)))
    })?;

    let methods: Vec<&str> = info.capabilities.iter().map(|m| m.as_str()).collect();
    let notifications: Vec<&str> = info.notifications.iter().map(|n| n.as_str()).collect();

    out.section("Wallet service");
    out.details(
        Details::new()
            .list("Encryption", &info.encryptions)
            .key("Negotiated", scheme.as_str())
            .list("Methods", &methods)
            .list("Notifications", &notifications),
    );
    Ok(())
}

pub fn cmd_balance(out: &Output, ctx: &Context, cfg: &Config) -> Result<()> {
    let balance =
        with_client(out, ctx, cfg, |client| async move { client.get_balance().await })?;
    out.details(Details::new().key("Balance", format_msats(balance.balance)));
    out.emit(&balance.balance.to_string());
    Ok(())
}

pub fn cmd_budget(out: &Output, ctx: &Context, cfg: &Config) -> Result<()> {
    let budget =
        with_client(out, ctx, cfg, |client| async move { client.get_budget().await })?;

    if budget.total_budget.is_none() {
        out.note("No budget set for this connection.");
        return Ok(());
    }
    out.section("Budget");
    out.details(
        Details::new()
            .amount("Used", budget.used_budget)
            .amount("Total", budget.total_budget)
            .time("Renews", budget.renews_at)
            .opt("Period", budget.renewal_period),
    );
    Ok(())
}

pub fn cmd_pay(
    out: &Output,
    ctx: &Context,
    cfg: &Config,
    invoice: &str,
    amount: Option<u64>,
) -> Result<()> {
    let request = PayInvoiceRequest {
        amount,
        ..PayInvoiceRequest::new(invoice)
    };
    let paid = with_client(out, ctx, cfg, |client| async move {
        client.pay_invoice(request).await
    })?;

    out.success("Invoice paid");
    out.details(
        Details::new()
            .amount("Fees", paid.fees_paid)
            .opt("Preimage", paid.preimage.as_deref()),
    );
    if let Some(preimage) = &paid.preimage {
        out.emit(preimage);
    }
    Ok(())
}

pub fn cmd_keysend(
    out: &Output,
    ctx: &Context,
    cfg: &Config,
    pubkey: &str,
    amount: u64,
    preimage: Option<String>,
) -> Result<()> {
    let request = PayKeysendRequest {
        preimage,
        ..PayKeysendRequest::new(pubkey, amount)
    };
    let paid = with_client(out, ctx, cfg, |client| async move {
        client.pay_keysend(request).await
    })?;

    out.success(&format!("Sent {}", format_msats(amount)));
    out.details(
        Details::new()
            .amount("Fees", paid.fees_paid)
            .opt("Preimage", paid.preimage.as_deref()),
    );
    Ok(())
}

pub fn cmd_make_invoice(
    out: &Output,
    ctx: &Context,
    cfg: &Config,
    amount: u64,
    description: Option<String>,
    expiry: Option<u64>,
    wait: Option<u64>,
) -> Result<()> {
    let request = MakeInvoiceRequest {
        amount,
        description,
        expiry,
        ..Default::default()
    };

    with_client(out, ctx, cfg, |client| receive_invoice(out, client, request, wait))
}

async fn receive_invoice(
    out: &Output,
    client: NwcClient,
    request: MakeInvoiceRequest,
    wait: Option<u64>,
) -> nwc_core::Result<()> {
    let receive = client.receive(request).await?;
    out.success("Invoice created");
    out.details(&Details::transaction(receive.transaction()));
    if let Some(invoice) = receive.invoice() {
        out.emit(invoice);
    }

    if let Some(secs) = wait {
        let spinner = out.spinner("Waiting for payment...");
        let settled = receive.wait_paid(Duration::from_secs(secs)).await;
        spinner.finish();
        let settled = settled?;
        out.success("Invoice paid");
        out.details(Details::new().time("Settled", settled.settled_at));
    }
    Ok(())
}

pub fn cmd_lookup(
    out: &Output,
    ctx: &Context,
    cfg: &Config,
    payment_hash: Option<String>,
    invoice: Option<String>,
) -> Result<()> {
    let request = match (payment_hash, invoice) {
        (Some(hash), _) => LookupInvoiceRequest::by_payment_hash(hash),
        (None, Some(invoice)) => LookupInvoiceRequest::by_invoice(invoice),
        (None, None) => {
            return Err(crate::error::CliError::Usage(
                "pass --payment-hash or --invoice".into(),
            ))
        }
    };
    let tx = with_client(out, ctx, cfg, |client| async move {
        client.lookup_invoice(request).await
    })?;

    out.section("Invoice");
    out.details(&Details::transaction(&tx));
    Ok(())
}

pub fn cmd_transactions(
    out: &Output,
    ctx: &Context,
    cfg: &Config,
    limit: u64,
    offset: Option<u64>,
    unpaid: bool,
    direction: Option<TxDirection>,
) -> Result<()> {
    let request = ListTransactionsRequest {
        limit: Some(limit),
        offset,
        unpaid: unpaid.then_some(true),
        transaction_type: direction.map(|d| match d {
            TxDirection::Incoming => TransactionType::Incoming,
            TxDirection::Outgoing => TransactionType::Outgoing,
        }),
        ..Default::default()
    };
    let list = with_client(out, ctx, cfg, |client| async move {
        client.list_transactions(request).await
    })?;

    if list.transactions.is_empty() {
        out.note("No transactions found.");
        return Ok(());
    }

    out.table(&Table::transactions(&list.transactions));
    let shown = list.transactions.len();
    match list.total_count {
        Some(total) => out.note(&format!("\n{shown} of {total} transaction(s)")),
        None => out.note(&format!("\n{shown} transaction(s)")),
    }
    Ok(())
}

pub fn cmd_sign_message(out: &Output, ctx: &Context, cfg: &Config, message: &str) -> Result<()> {
    let request = SignMessageRequest {
        message: message.to_string(),
    };
    let signed = with_client(out, ctx, cfg, |client| async move {
        client.sign_message(request).await
    })?;

    out.details(
        Details::new()
            .field("Message", &signed.message)
            .key("Signature", &signed.signature),
    );
    out.emit(&signed.signature);
    Ok(())
}
