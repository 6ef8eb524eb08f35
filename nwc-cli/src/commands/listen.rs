// SPDX-FileCopyrightText: © 2026 PrivKey LLC
// SPDX-License-Identifier: AGPL-3.0-or-later

use nwc_core::NotificationType;
use tracing::warn;

use crate::config::Config;
use crate::error::Result;
use crate::output::Output;

use super::{block_on, Context};

pub fn cmd_listen(out: &Output, ctx: &Context, cfg: &Config, types: &[String]) -> Result<()> {
    let types: Option<Vec<NotificationType>> = if types.is_empty() {
        None
    } else {
        Some(types.iter().map(|t| NotificationType::from(t.trim())).collect())
    };
    for unknown in types.iter().flatten().filter(|t| matches!(t, NotificationType::Other(_))) {
        out.warn(&format!("unknown notification type: {unknown}"));
    }

    block_on(listen(out, ctx, cfg, types))?
}

async fn listen(
    out: &Output,
    ctx: &Context,
    cfg: &Config,
    types: Option<Vec<NotificationType>>,
) -> Result<()> {
    let client = ctx.connect(cfg).await?;
    let subscription = client.subscribe_notifications(
        |notification| match serde_json::to_string(&notification) {
            Ok(line) => println!("{line}"),
            Err(e) => warn!(error = %e, "failed to encode notification"),
        },
        types,
    );
    out.success("Listening for notifications (Ctrl-C to stop)");

    tokio::signal::ctrl_c().await?;
    subscription.unsubscribe();
    subscription.join().await;
    client.close().await;
    out.note("Stopped.");
    Ok(())
}
