// SPDX-FileCopyrightText: © 2026 PrivKey LLC
// SPDX-License-Identifier: AGPL-3.0-or-later

use std::time::Duration;

use nwc_client::{NwaClient, NwaOptions};
use nwc_core::types::BudgetRenewal;
use nwc_core::{Method, NotificationType};
use tokio::sync::oneshot;
use tracing::info;

use crate::cli::Renewal;
use crate::config::Config;
use crate::error::{CliError, Result};
use crate::output::{Details, Output};

use super::{block_on, Context};

pub(crate) struct AuthArgs {
    pub name: String,
    pub methods: Vec<String>,
    pub notifications: Vec<String>,
    pub suffix: Option<String>,
    pub max_amount: Option<u64>,
    pub budget_renewal: Option<Renewal>,
    pub expires_at: Option<u64>,
    pub isolated: bool,
    pub wait: u64,
}

impl AuthArgs {
    fn options(&self, relay_urls: Vec<String>) -> NwaOptions {
        let notification_types = (!self.notifications.is_empty()).then(|| {
            self.notifications
                .iter()
                .map(|n| NotificationType::from(n.trim()))
                .collect()
        });
        NwaOptions {
            relay_urls,
            request_methods: self.methods.iter().map(|m| Method::from(m.trim())).collect(),
            name: Some(self.name.clone()),
            notification_types,
            max_amount: self.max_amount,
            budget_renewal: self.budget_renewal.map(|r| match r {
                Renewal::Daily => BudgetRenewal::Daily,
                Renewal::Weekly => BudgetRenewal::Weekly,
                Renewal::Monthly => BudgetRenewal::Monthly,
                Renewal::Yearly => BudgetRenewal::Yearly,
                Renewal::Never => BudgetRenewal::Never,
            }),
            expires_at: self.expires_at,
            isolated: self.isolated,
            ..Default::default()
        }
    }
}

pub(crate) fn cmd_auth(out: &Output, ctx: &Context, cfg: &Config, args: AuthArgs) -> Result<()> {
    let relays = if ctx.relays.is_empty() {
        vec![cfg.default_relay().to_string()]
    } else {
        ctx.relays.clone()
    };
    let options = args.options(relays);

    block_on(authorize(out, ctx, options, &args))?
}

async fn authorize(out: &Output, ctx: &Context, options: NwaOptions, args: &AuthArgs) -> Result<()> {
    let nwa = NwaClient::new(options, None)
        .await?
        .with_config(ctx.client_config());

    out.section("Open this in your wallet to approve the connection");
    out.emit(&nwa.connection_uri(args.suffix.as_deref()));

    let (tx, rx) = oneshot::channel();
    let subscription = nwa.subscribe(move |client| {
        let _ = tx.send(client);
    })?;

    let spinner = out.spinner("Waiting for the wallet...");
    let outcome = tokio::select! {
        client = rx => client.map_err(|_| CliError::Usage("wallet auth listener ended".into())),
        _ = tokio::time::sleep(Duration::from_secs(args.wait)) => {
            Err(CliError::Usage(format!("no wallet accepted within {}s", args.wait)))
        }
        _ = tokio::signal::ctrl_c() => Err(CliError::Usage("cancelled".into())),
    };
    spinner.finish();
    subscription.unsub();
    subscription.join().await;

    let client = outcome?;
    info!(wallet = %client.wallet_pubkey(), "connection approved");
    out.success("Wallet approved the connection");
    out.details(
        Details::new()
            .key("Wallet", client.wallet_pubkey())
            .opt("Lightning address", client.lud16()),
    );

    let uri = client.connect_uri(true)?;
    out.secret_warning();
    out.emit(&uri);
    client.close().await;
    Ok(())
}
