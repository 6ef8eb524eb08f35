// SPDX-FileCopyrightText: © 2026 PrivKey LLC
// SPDX-License-Identifier: AGPL-3.0-or-later

#![forbid(unsafe_code)]

use std::collections::HashMap;
use std::sync::Arc;

use nwc_core::crypto::{decrypt, encrypt};
use nwc_core::event::{info_kind, request_kind, response_kind, sign_event, tag, tag_value, EventTemplate};
use nwc_core::keys::{keys_from_secret, parse_public_key};
use nwc_core::nostr_sdk::{Event, EventId, Filter, Keys, PublicKey, Tag};
use nwc_core::types::*;
use nwc_core::{
    select_encryption, EncryptionScheme, Method, NostrRelayPool, NwcError, RelayTransport,
    Result, Subscription, WalletServiceInfo,
};
use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::OnceCell;
use tokio::time::{sleep_until, timeout, timeout_at, Instant};
use tracing::{debug, warn};
use zeroize::Zeroizing;

use crate::config::{ClientConfig, Timeouts};
use crate::pending::{PendingGuard, PendingRequests};
use crate::uri::ConnectUri;

#[derive(Clone, Default)]
pub struct ClientOptions {
    pub relay_urls: Vec<String>,
    pub wallet_pubkey: String,
    pub secret: Option<Zeroizing<String>>,
    pub lud16: Option<String>,
    pub config: ClientConfig,
}

impl ClientOptions {
    pub fn from_uri(uri: &str) -> Result<Self> {
        let parsed = ConnectUri::parse(uri)?;
        Ok(Self {
            relay_urls: parsed.relays,
            wallet_pubkey: parsed.wallet_pubkey,
            secret: parsed.secret,
            lud16: parsed.lud16,
            config: ClientConfig::default(),
        })
    }

    pub fn with_config(mut self, config: ClientConfig) -> Self {
        self.config = config;
        self
    }
}

/// Request/reply client for one wallet connection.
///
/// Cheap to clone; clones share the relay pool, the negotiated encryption
/// scheme and the table of in-flight requests.
#[derive(Clone)]
pub struct NwcClient {
    inner: Arc<Inner>,
}

struct Inner {
    transport: Arc<dyn RelayTransport>,
    keys: Keys,
    secret: Zeroizing<String>,
    wallet_pubkey: PublicKey,
    relay_urls: Vec<String>,
    lud16: Mutex<Option<String>>,
    config: ClientConfig,
    encryption: OnceCell<EncryptionScheme>,
    pending: PendingRequests,
}

struct SentRequest {
    event_id: EventId,
    scheme: EncryptionScheme,
    subscription: Subscription,
    reply_deadline: Instant,
    _guard: PendingGuard,
}

impl NwcClient {
    pub async fn new(options: ClientOptions) -> Result<Self> {
        let secret = options
            .secret
            .clone()
            .ok_or_else(|| NwcError::InvalidInput("Missing secret key".into()))?;
        let keys = keys_from_secret(&secret)?;
        let transport = NostrRelayPool::with_connect_timeout(
            keys.clone(),
            &options.relay_urls,
            options.config.connect_timeout,
        )
        .await?;
        Self::with_transport(options, Arc::new(transport))
    }

    pub async fn from_uri(uri: &str) -> Result<Self> {
        Self::new(ClientOptions::from_uri(uri)?).await
    }

    /// Build a client over an existing transport. Relay URLs default to the
    /// transport's own.
    pub fn with_transport(
        options: ClientOptions,
        transport: Arc<dyn RelayTransport>,
    ) -> Result<Self> {
        let secret = options
            .secret
            .ok_or_else(|| NwcError::InvalidInput("Missing secret key".into()))?;
        let keys = keys_from_secret(&secret)?;
        let secret = Zeroizing::new(keys.secret_key().to_secret_hex());
        if options.wallet_pubkey.is_empty() {
            return Err(NwcError::InvalidInput("Missing wallet pubkey".into()));
        }
        let wallet_pubkey = parse_public_key(&options.wallet_pubkey)?;
        let relay_urls = if options.relay_urls.is_empty() {
            transport.relay_urls()
        } else {
            options.relay_urls
        };
        if relay_urls.is_empty() {
            return Err(NwcError::InvalidInput("Missing relay url".into()));
        }

        Ok(Self {
            inner: Arc::new(Inner {
                transport,
                keys,
                secret,
                wallet_pubkey,
                relay_urls,
                lud16: Mutex::new(options.lud16),
                config: options.config,
                encryption: OnceCell::new(),
                pending: PendingRequests::new(),
            }),
        })
    }

    pub fn public_key(&self) -> PublicKey {
        self.inner.keys.public_key()
    }

    pub fn wallet_pubkey(&self) -> PublicKey {
        self.inner.wallet_pubkey
    }

    pub fn relay_urls(&self) -> &[String] {
        &self.inner.relay_urls
    }

    pub fn lud16(&self) -> Option<String> {
        self.inner.lud16.lock().clone()
    }

    pub fn set_lud16(&self, lud16: Option<String>) {
        *self.inner.lud16.lock() = lud16;
    }

    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    pub fn transport(&self) -> Arc<dyn RelayTransport> {
        self.inner.transport.clone()
    }

    /// The negotiated scheme, once a request or subscription has negotiated it.
    pub fn encryption(&self) -> Option<EncryptionScheme> {
        self.inner.encryption.get().copied()
    }

    pub fn pending_count(&self) -> usize {
        self.inner.pending.len()
    }

    pub async fn is_connected(&self) -> bool {
        self.inner.transport.is_connected().await
    }

    pub async fn close(&self) {
        self.inner.transport.close().await;
    }

    pub fn connect_uri(&self, include_secret: bool) -> Result<String> {
        ConnectUri {
            wallet_pubkey: self.inner.wallet_pubkey.to_hex(),
            relays: self.inner.relay_urls.clone(),
            secret: Some(self.inner.secret.clone()),
            lud16: self.lud16(),
        }
        .to_uri(Some(&self.public_key().to_hex()), include_secret)
    }

    pub async fn wallet_service_info(&self) -> Result<WalletServiceInfo> {
        self.inner.transport.ensure_connected().await?;
        let filter = Filter::new()
            .kind(info_kind())
            .author(self.inner.wallet_pubkey)
            .limit(1);
        let event = self
            .inner
            .transport
            .fetch_event(filter, self.inner.config.info_fetch_timeout)
            .await?
            .ok_or_else(|| {
                NwcError::Network("no info event (kind 13194) returned from relay".into())
            })?;
        Ok(WalletServiceInfo::from_event(&event))
    }

    /// Negotiate the payload encryption once per client.
    pub async fn encryption_scheme(&self) -> Result<EncryptionScheme> {
        self.inner
            .encryption
            .get_or_try_init(|| async {
                let info = self.wallet_service_info().await?;
                let scheme = select_encryption(&info.encryptions).ok_or_else(|| {
                    NwcError::UnsupportedEncryption(
                        "no compatible encryption or version found between wallet and client"
                            .into(),
                    )
                })?;
                if scheme == EncryptionScheme::Nip04 {
                    warn!("wallet only supports NIP-04 encryption, which is deprecated");
                }
                debug!(scheme = %scheme, "encryption negotiated");
                Ok::<_, NwcError>(scheme)
            })
            .await
            .copied()
    }

    pub(crate) fn decrypt_from_wallet(&self, content: &str, scheme: EncryptionScheme) -> Result<String> {
        decrypt(
            self.inner.keys.secret_key(),
            &self.inner.wallet_pubkey,
            content,
            scheme,
        )
    }

    async fn send_request(
        &self,
        method: &Method,
        params: Value,
        timeouts: Timeouts,
    ) -> Result<SentRequest> {
        self.inner.transport.ensure_connected().await?;
        let scheme = self.encryption_scheme().await?;

        let payload = serde_json::to_string(&RequestPayload {
            method: method.clone(),
            params,
        })?;
        let content = encrypt(
            self.inner.keys.secret_key(),
            &self.inner.wallet_pubkey,
            &payload,
            scheme,
        )?;
        let event = sign_event(
            EventTemplate::new(request_kind(), content)
                .tag(Tag::public_key(self.inner.wallet_pubkey))
                .tag(tag("v", &[scheme.version()]))
                .tag(tag("encryption", &[scheme.as_str()])),
            &self.inner.keys,
        )?;

        let reply_deadline = Instant::now() + timeouts.reply;
        let guard = self.inner.pending.register(event.id);

        let filter = Filter::new()
            .kind(response_kind())
            .author(self.inner.wallet_pubkey)
            .event(event.id);
        let subscription = self.inner.transport.subscribe(filter).await?;

        debug!(method = %method, request_id = %event.id, "publishing request");
        tokio::select! {
            published = timeout(timeouts.publish, self.inner.transport.publish(&event)) => {
                match published {
                    Err(_) => {
                        return Err(NwcError::PublishTimeout(format!("publish timeout: {}", event.id)));
                    }
                    Ok(Err(NwcError::Publish(reason))) => {
                        return Err(NwcError::Publish(format!("failed to publish: {reason}")));
                    }
                    Ok(Err(e)) => return Err(NwcError::Publish(format!("failed to publish: {e}"))),
                    Ok(Ok(())) => {}
                }
            }
            _ = sleep_until(reply_deadline) => {
                return Err(NwcError::ReplyTimeout(format!("reply timeout: event {}", event.id)));
            }
        }

        Ok(SentRequest {
            event_id: event.id,
            scheme,
            subscription,
            reply_deadline,
            _guard: guard,
        })
    }

    /// Next reply for `sent`, or `ReplyTimeout` once its deadline passes.
    /// A subscription closed by the relay cannot deliver, so the call waits
    /// out the deadline.
    async fn next_reply(&self, sent: &mut SentRequest) -> Result<Event> {
        match timeout_at(sent.reply_deadline, sent.subscription.next()).await {
            Ok(Some(event)) => Ok(event),
            Ok(None) => {
                warn!(request_id = %sent.event_id, "response subscription closed");
                sleep_until(sent.reply_deadline).await;
                Err(NwcError::ReplyTimeout(format!("reply timeout: event {}", sent.event_id)))
            }
            Err(_) => Err(NwcError::ReplyTimeout(format!("reply timeout: event {}", sent.event_id))),
        }
    }

    fn decode_response(&self, event: &Event, scheme: EncryptionScheme) -> Result<ResponsePayload> {
        let plaintext = self
            .decrypt_from_wallet(&event.content, scheme)
            .map_err(|e| NwcError::ResponseDecoding(format!("failed to decrypt response: {e}")))?;
        serde_json::from_str(&plaintext)
            .map_err(|e| NwcError::ResponseDecoding(format!("failed to deserialize response: {e}")))
    }

    /// Run one request through publish and reply with explicit deadlines.
    #[tracing::instrument(skip_all, fields(method = %R::method()))]
    pub async fn execute<R: Nip47Request>(&self, request: &R, timeouts: Timeouts) -> Result<R::Response> {
        let params = serde_json::to_value(request)?;
        let mut sent = self.send_request(&R::method(), params, timeouts).await?;
        let event = self.next_reply(&mut sent).await?;
        sent.subscription.close();

        let response = self.decode_response(&event, sent.scheme)?;
        let result = extract_result(response)?;
        let typed: R::Response = serde_json::from_value(result.clone()).map_err(|e| {
            NwcError::ResponseValidation(format!("response from NWC failed validation: {result} ({e})"))
        })?;
        if !request.validate(&typed) {
            return Err(NwcError::ResponseValidation(format!(
                "response from NWC failed validation: {result}"
            )));
        }
        Ok(typed)
    }

    /// Run a batched request. Resolves only once every item has a reply and
    /// returns results in submission order.
    #[tracing::instrument(skip_all, fields(method = %R::method()))]
    pub async fn execute_multi<R: Nip47MultiRequest>(
        &self,
        mut request: R,
        timeouts: Timeouts,
    ) -> Result<Vec<MultiPayItem<R::Item>>> {
        let ids = request.assign_ids()?;
        let params = serde_json::to_value(&request)?;
        let mut sent = self.send_request(&R::method(), params, timeouts).await?;

        let mut collector = MultiCollector::new(ids);
        while !collector.is_complete() {
            let event = self.next_reply(&mut sent).await?;
            let Some(id) = tag_value(&event, "d").map(str::to_string) else {
                return Err(NwcError::ResponseValidation(
                    "No d tag found in response event".into(),
                ));
            };
            if !collector.expects(&id) {
                warn!(request_id = %sent.event_id, item = %id, "ignoring reply for unknown item");
                continue;
            }

            let response = self.decode_response(&event, sent.scheme)?;
            let result = extract_result(response)?;
            let typed: PayResponse = serde_json::from_value(result.clone()).map_err(|e| {
                NwcError::ResponseValidation(format!("response from NWC failed validation: {result} ({e})"))
            })?;
            if !R::validate_item(&typed) {
                return Err(NwcError::ResponseValidation(format!(
                    "response from NWC failed validation: {result}"
                )));
            }
            if !collector.insert(id.clone(), typed) {
                debug!(request_id = %sent.event_id, item = %id, "duplicate reply for item");
            }
        }
        sent.subscription.close();

        let items = std::mem::take(request.items_mut());
        collector.finish(items)
    }

    async fn call<R: Nip47Request>(&self, request: &R) -> Result<R::Response> {
        request.check()?;
        let timeouts = self.inner.config.timeouts_for(&R::method());
        self.execute(request, timeouts).await
    }

    pub async fn get_info(&self) -> Result<GetInfoResponse> {
        self.call(&GetInfoRequest {}).await
    }

    pub async fn get_balance(&self) -> Result<GetBalanceResponse> {
        self.call(&GetBalanceRequest {}).await
    }

    pub async fn get_budget(&self) -> Result<GetBudgetResponse> {
        self.call(&GetBudgetRequest {}).await
    }

    pub async fn pay_invoice(&self, request: PayInvoiceRequest) -> Result<PayResponse> {
        self.call(&request).await
    }

    pub async fn pay_keysend(&self, request: PayKeysendRequest) -> Result<PayResponse> {
        self.call(&request).await
    }

    pub async fn multi_pay_invoice(
        &self,
        request: MultiPayInvoiceRequest,
    ) -> Result<MultiPayInvoiceResponse> {
        for invoice in &request.invoices {
            invoice.check()?;
        }
        let timeouts = self.inner.config.timeouts_for(&Method::MultiPayInvoice);
        let invoices = self.execute_multi(request, timeouts).await?;
        Ok(MultiPayInvoiceResponse {
            invoices,
            errors: Vec::new(),
        })
    }

    pub async fn multi_pay_keysend(
        &self,
        request: MultiPayKeysendRequest,
    ) -> Result<MultiPayKeysendResponse> {
        for keysend in &request.keysends {
            keysend.check()?;
        }
        let timeouts = self.inner.config.timeouts_for(&Method::MultiPayKeysend);
        let keysends = self.execute_multi(request, timeouts).await?;
        Ok(MultiPayKeysendResponse {
            keysends,
            errors: Vec::new(),
        })
    }

    pub async fn make_invoice(&self, request: MakeInvoiceRequest) -> Result<Transaction> {
        self.call(&request).await
    }

    pub async fn make_hold_invoice(&self, request: MakeHoldInvoiceRequest) -> Result<Transaction> {
        self.call(&request).await
    }

    pub async fn settle_hold_invoice(
        &self,
        request: SettleHoldInvoiceRequest,
    ) -> Result<EmptyResponse> {
        self.call(&request).await
    }

    pub async fn cancel_hold_invoice(
        &self,
        request: CancelHoldInvoiceRequest,
    ) -> Result<EmptyResponse> {
        self.call(&request).await
    }

    pub async fn lookup_invoice(&self, request: LookupInvoiceRequest) -> Result<Transaction> {
        self.call(&request).await
    }

    pub async fn list_transactions(
        &self,
        request: ListTransactionsRequest,
    ) -> Result<ListTransactionsResponse> {
        self.call(&request).await
    }

    pub async fn sign_message(&self, request: SignMessageRequest) -> Result<SignMessageResponse> {
        self.call(&request).await
    }

    pub async fn create_connection(
        &self,
        request: CreateConnectionRequest,
    ) -> Result<CreateConnectionResponse> {
        self.call(&request).await
    }
}

fn extract_result(response: ResponsePayload) -> Result<Value> {
    if let Some(error) = response.error {
        return Err(error.into());
    }
    response.result.ok_or_else(|| {
        NwcError::ResponseValidation(format!(
            "response for {} carried neither result nor error",
            response.result_type
        ))
    })
}

/// Accumulates per-item replies of a batched request.
struct MultiCollector {
    ids: Vec<String>,
    results: HashMap<String, PayResponse>,
}

impl MultiCollector {
    fn new(ids: Vec<String>) -> Self {
        Self {
            ids,
            results: HashMap::new(),
        }
    }

    fn expects(&self, id: &str) -> bool {
        self.ids.iter().any(|expected| expected == id)
    }

    /// Returns false for a repeated reply to an item already collected.
    fn insert(&mut self, id: String, result: PayResponse) -> bool {
        self.results.insert(id, result).is_none()
    }

    fn is_complete(&self) -> bool {
        self.results.len() == self.ids.len()
    }

    fn finish<T>(mut self, items: Vec<T>) -> Result<Vec<MultiPayItem<T>>> {
        self.ids
            .iter()
            .zip(items)
            .map(|(id, item)| {
                let result = self.results.remove(id).ok_or_else(|| {
                    NwcError::ResponseValidation(format!("missing reply for item {id}"))
                })?;
                Ok(MultiPayItem {
                    id: id.clone(),
                    item,
                    result,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nwc_core::MemoryRelayPool;

    fn paid(preimage: &str) -> PayResponse {
        PayResponse {
            preimage: Some(preimage.into()),
            fees_paid: None,
        }
    }

    #[test]
    fn test_collector_orders_by_submission() {
        let mut collector = MultiCollector::new(vec!["0".into(), "1".into(), "2".into()]);
        assert!(collector.insert("2".into(), paid("c")));
        assert!(collector.insert("0".into(), paid("a")));
        assert!(!collector.is_complete());
        assert!(!collector.insert("0".into(), paid("a")));
        assert!(!collector.expects("7"));
        assert!(collector.insert("1".into(), paid("b")));
        assert!(collector.is_complete());

        let results = collector.finish(vec!["x", "y", "z"]).unwrap();
        let preimages: Vec<_> = results
            .iter()
            .map(|r| (r.item, r.result.preimage.clone().unwrap()))
            .collect();
        assert_eq!(
            preimages,
            vec![("x", "a".to_string()), ("y", "b".to_string()), ("z", "c".to_string())]
        );
    }

    #[test]
    fn test_extract_result() {
        let err = extract_result(ResponsePayload {
            result_type: "pay_invoice".into(),
            result: None,
            error: Some(WalletErrorPayload {
                code: "INSUFFICIENT_BALANCE".into(),
                message: "not enough".into(),
            }),
        })
        .unwrap_err();
        assert_eq!(err.code(), "INSUFFICIENT_BALANCE");

        let empty = extract_result(ResponsePayload {
            result_type: "get_balance".into(),
            result: None,
            error: None,
        })
        .unwrap_err();
        assert!(matches!(empty, NwcError::ResponseValidation(_)));
    }

    #[test]
    fn test_constructor_validation() {
        let (pool, _relay) = MemoryRelayPool::single("wss://relay.example");
        let transport: Arc<dyn RelayTransport> = Arc::new(pool);
        let wallet = Keys::generate().public_key().to_hex();

        let missing_secret = ClientOptions {
            wallet_pubkey: wallet.clone(),
            ..Default::default()
        };
        assert!(matches!(
            NwcClient::with_transport(missing_secret, transport.clone()),
            Err(NwcError::InvalidInput(_))
        ));

        let secret = Keys::generate().secret_key().to_secret_hex();
        let client = NwcClient::with_transport(
            ClientOptions {
                wallet_pubkey: wallet.clone(),
                secret: Some(Zeroizing::new(secret)),
                lud16: Some("alice@example.com".into()),
                ..Default::default()
            },
            transport,
        )
        .unwrap();
        assert_eq!(client.relay_urls(), ["wss://relay.example".to_string()]);
        assert!(client.encryption().is_none());

        let uri = client.connect_uri(true).unwrap();
        assert!(uri.starts_with(&format!("nostr+walletconnect://{wallet}?")));
        assert!(uri.contains(&format!("pubkey={}", client.public_key().to_hex())));
        assert!(uri.contains("lud16=alice%40example.com"));
        let reparsed = ClientOptions::from_uri(&uri).unwrap();
        assert_eq!(reparsed.wallet_pubkey, wallet);
    }
}
