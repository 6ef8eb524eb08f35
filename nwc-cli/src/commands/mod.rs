// SPDX-FileCopyrightText: © 2026 PrivKey LLC
// SPDX-License-Identifier: AGPL-3.0-or-later

pub mod auth;
pub mod listen;
pub mod wallet;

use std::future::Future;
use std::time::Duration;

use nwc_client::{ClientConfig, ClientOptions, NwcClient};
use tracing::debug;

use crate::config::Config;
use crate::error::Result;

/// Connection settings resolved from flags, environment and config.
pub(crate) struct Context {
    pub uri: Option<String>,
    /// Overrides the URI's relays when non-empty.
    pub relays: Vec<String>,
    pub reply_timeout: Option<Duration>,
}

impl Context {
    pub(crate) fn client_config(&self) -> ClientConfig {
        let mut config = ClientConfig::default();
        if let Some(timeout) = self.reply_timeout {
            config.method_reply_timeouts.clear();
            config = config.with_reply_timeout(timeout);
        }
        config
    }

    pub(crate) fn client_options(&self, cfg: &Config) -> Result<ClientOptions> {
        let uri = cfg.connection_uri(self.uri.as_deref())?;
        let mut options = ClientOptions::from_uri(&uri)?.with_config(self.client_config());
        if !self.relays.is_empty() {
            options.relay_urls = self.relays.clone();
        }
        Ok(options)
    }

    pub(crate) async fn connect(&self, cfg: &Config) -> Result<NwcClient> {
        let options = self.client_options(cfg)?;
        debug!(relays = ?options.relay_urls, wallet = %options.wallet_pubkey, "connecting");
        Ok(NwcClient::new(options).await?)
    }
}

pub(crate) fn block_on<F: Future>(future: F) -> Result<F::Output> {
    let rt = tokio::runtime::Runtime::new()?;
    Ok(rt.block_on(future))
}
