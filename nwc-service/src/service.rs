// SPDX-FileCopyrightText: © 2026 PrivKey LLC
// SPDX-License-Identifier: AGPL-3.0-or-later

#![forbid(unsafe_code)]

use std::ops::ControlFlow;
use std::sync::Arc;
use std::time::Duration;

use nwc_core::crypto::{decrypt, encrypt};
use nwc_core::event::{request_kind, response_kind, sign_event, tag, tag_value, EventTemplate};
use nwc_core::keys::{keys_from_secret, parse_public_key};
use nwc_core::nostr_sdk::{Event, Filter, Keys, PublicKey, Tag};
use nwc_core::types::{Notification, RequestPayload};
use nwc_core::{
    run_durable, EncryptionScheme, Method, NostrRelayPool, NotificationType, NwcError,
    RelayTransport, Result, StopHandle, WalletServiceInfo, RECONNECT_DELAY,
};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::dispatch::{dispatch, Reply};
use crate::handler::{RequestContext, WalletHandler};

pub struct ServiceConfig {
    /// Schemes advertised in the info event, strongest first.
    pub encryptions: Vec<EncryptionScheme>,
    pub max_request_size: usize,
    pub reconnect_delay: Duration,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            encryptions: vec![EncryptionScheme::Nip44V2, EncryptionScheme::Nip04],
            max_request_size: 64 * 1024,
            reconnect_delay: RECONNECT_DELAY,
        }
    }
}

/// The wallet side of one connection: the key the wallet answers with and
/// the client key it accepts requests from.
#[derive(Clone)]
pub struct WalletServiceKeyPair {
    wallet_keys: Keys,
    client_pubkey: PublicKey,
}

impl WalletServiceKeyPair {
    pub fn new(wallet_secret: &str, client_pubkey: &str) -> Result<Self> {
        Ok(Self {
            wallet_keys: keys_from_secret(wallet_secret)?,
            client_pubkey: parse_public_key(client_pubkey)?,
        })
    }

    pub fn from_keys(wallet_keys: Keys, client_pubkey: PublicKey) -> Self {
        Self {
            wallet_keys,
            client_pubkey,
        }
    }

    pub fn wallet_pubkey(&self) -> PublicKey {
        self.wallet_keys.public_key()
    }

    pub fn client_pubkey(&self) -> PublicKey {
        self.client_pubkey
    }
}

/// Answers wallet requests arriving over the relay transport.
pub struct WalletService {
    transport: Arc<dyn RelayTransport>,
    config: Arc<ServiceConfig>,
}

impl WalletService {
    pub async fn new(relay_urls: &[String], config: ServiceConfig) -> Result<Self> {
        let transport = NostrRelayPool::new(Keys::generate(), relay_urls).await?;
        Ok(Self::with_transport(Arc::new(transport), config))
    }

    pub fn with_transport(transport: Arc<dyn RelayTransport>, config: ServiceConfig) -> Self {
        Self {
            transport,
            config: Arc::new(config),
        }
    }

    pub fn transport(&self) -> Arc<dyn RelayTransport> {
        self.transport.clone()
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    fn info(&self, capabilities: &[Method], notifications: &[NotificationType]) -> WalletServiceInfo {
        WalletServiceInfo::new(
            &self.config.encryptions,
            capabilities.to_vec(),
            notifications.to_vec(),
        )
    }

    async fn publish_signed(&self, template: EventTemplate, keys: &Keys) -> Result<Event> {
        self.transport.ensure_connected().await?;
        let event = sign_event(template, keys)?;
        self.transport.publish(&event).await?;
        Ok(event)
    }

    /// Advertise the wallet's methods, notification types and encryption schemes.
    pub async fn publish_info_event(
        &self,
        wallet_secret: &str,
        capabilities: &[Method],
        notifications: &[NotificationType],
    ) -> Result<Event> {
        let keys = keys_from_secret(wallet_secret)?;
        let template = self.info(capabilities, notifications).to_template(None);
        let event = self.publish_signed(template, &keys).await?;
        info!(wallet = %keys.public_key(), "published wallet info");
        Ok(event)
    }

    /// Accept a wallet-auth request from `app_pubkey`. The acknowledgement
    /// doubles as the info event of the new connection.
    pub async fn publish_auth_ack(
        &self,
        wallet_secret: &str,
        app_pubkey: &str,
        capabilities: &[Method],
        notifications: &[NotificationType],
    ) -> Result<Event> {
        let keys = keys_from_secret(wallet_secret)?;
        let app = parse_public_key(app_pubkey)?;
        let template = self.info(capabilities, notifications).to_template(Some(app));
        let event = self.publish_signed(template, &keys).await?;
        info!(wallet = %keys.public_key(), app = %app, "acknowledged wallet auth");
        Ok(event)
    }

    /// Send `notification` to the client of `keypair`, encrypted with `scheme`.
    pub async fn publish_notification(
        &self,
        keypair: &WalletServiceKeyPair,
        notification: &Notification,
        scheme: EncryptionScheme,
    ) -> Result<Event> {
        let plaintext = serde_json::to_string(notification)?;
        let content = encrypt(
            keypair.wallet_keys.secret_key(),
            &keypair.client_pubkey,
            &plaintext,
            scheme,
        )?;
        let template = EventTemplate::new(scheme.notification_kind(), content)
            .tag(Tag::public_key(keypair.client_pubkey));
        let event = self.publish_signed(template, &keypair.wallet_keys).await?;
        debug!(kind = %notification.notification_type, "published notification");
        Ok(event)
    }

    /// Answer requests for `keypair` with `handler` until the handle is stopped.
    ///
    /// Each request is handled on its own task. A request that cannot be
    /// decrypted or decoded is logged and left unanswered.
    pub fn subscribe(
        &self,
        keypair: WalletServiceKeyPair,
        handler: Arc<dyn WalletHandler>,
    ) -> ServiceHandle {
        let (stop, stop_rx) = StopHandle::new();
        let transport = self.transport.clone();
        let open_transport = self.transport.clone();
        let config = self.config.clone();
        let filter = Filter::new()
            .kind(request_kind())
            .author(keypair.client_pubkey)
            .pubkey(keypair.wallet_pubkey());
        let keypair = Arc::new(keypair);

        let task = tokio::spawn(run_durable(
            "wallet-service",
            stop_rx,
            self.config.reconnect_delay,
            move || {
                let transport = open_transport.clone();
                let filter = filter.clone();
                async move {
                    transport.ensure_connected().await?;
                    transport.subscribe(filter).await
                }
            },
            move |event| {
                let request = IncomingRequest {
                    transport: transport.clone(),
                    config: config.clone(),
                    keypair: keypair.clone(),
                    handler: handler.clone(),
                };
                async move {
                    tokio::spawn(async move {
                        let request_id = event.id;
                        if let Err(e) = request.handle(event).await {
                            warn!(error = %e, request_id = %request_id, "dropping request");
                        }
                    });
                    ControlFlow::Continue(())
                }
            },
        ));

        ServiceHandle { stop, task }
    }
}

struct IncomingRequest {
    transport: Arc<dyn RelayTransport>,
    config: Arc<ServiceConfig>,
    keypair: Arc<WalletServiceKeyPair>,
    handler: Arc<dyn WalletHandler>,
}

impl IncomingRequest {
    async fn handle(self, event: Event) -> Result<()> {
        let scheme = EncryptionScheme::from_tag(tag_value(&event, "encryption"))?;
        let keys = &self.keypair.wallet_keys;

        let plaintext = decrypt(keys.secret_key(), &event.pubkey, &event.content, scheme)?;
        if plaintext.len() > self.config.max_request_size {
            return Err(NwcError::InvalidInput("request too large".into()));
        }
        let payload: RequestPayload = serde_json::from_str(&plaintext)?;
        debug!(method = %payload.method, request_id = %event.id, "wallet request");

        let ctx = RequestContext {
            request_id: event.id,
            requester: event.pubkey,
            wallet: keys.public_key(),
            encryption: scheme,
        };
        let replies = dispatch(self.handler.as_ref(), &ctx, payload).await;
        for reply in replies {
            let response = self.build_response(&event, scheme, reply)?;
            if let Err(e) = self.transport.publish(&response).await {
                error!(error = %e, request_id = %event.id, "failed to send response");
            }
        }
        Ok(())
    }

    fn build_response(&self, request: &Event, scheme: EncryptionScheme, reply: Reply) -> Result<Event> {
        let keys = &self.keypair.wallet_keys;
        let plaintext = serde_json::to_string(&reply.payload)?;
        let content = encrypt(keys.secret_key(), &request.pubkey, &plaintext, scheme)?;
        let mut template = EventTemplate::new(response_kind(), content)
            .tag(Tag::event(request.id))
            .tag(Tag::public_key(request.pubkey));
        if let Some(item) = reply.item {
            template = template.tag(tag("d", &[item.as_str()]));
        }
        sign_event(template, keys)
    }
}

/// Running request loop. Dropping it stops the loop; requests already being
/// handled still get their reply.
pub struct ServiceHandle {
    stop: StopHandle,
    task: JoinHandle<()>,
}

impl ServiceHandle {
    /// Idempotent.
    pub fn stop(&self) {
        self.stop.stop();
    }

    pub fn is_running(&self) -> bool {
        !self.stop.is_stopped() && !self.task.is_finished()
    }

    pub async fn join(self) {
        self.stop.stop();
        let _ = self.task.await;
    }
}
