// SPDX-FileCopyrightText: © 2026 PrivKey LLC
// SPDX-License-Identifier: AGPL-3.0-or-later

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use nwc_client::{ClientOptions, NwaClient, NwaOptions, NwcClient, Timeouts};
use nwc_core::crypto::encrypt;
use nwc_core::event::{info_kind, request_kind, response_kind, sign_event, tag, EventTemplate};
use nwc_core::nostr_sdk::{Event, EventId, Filter, Keys, Tag};
use nwc_core::types::*;
use nwc_core::{
    EncryptionScheme, ErrorCode, MemoryRelay, MemoryRelayPool, Method, NotificationType,
    NwcError, PublishMode, RelayTransport,
};
use nwc_service::{
    HandlerResult, RequestContext, ServiceConfig, ServiceHandle, WalletHandler, WalletService,
    WalletServiceKeyPair,
};
use serde_json::{json, Value};
use tokio::sync::{mpsc, oneshot, Notify};
use tokio::task::JoinHandle;
use zeroize::Zeroizing;

const METHODS: [Method; 6] = [
    Method::GetInfo,
    Method::GetBalance,
    Method::PayInvoice,
    Method::MultiPayInvoice,
    Method::MakeInvoice,
    Method::LookupInvoice,
];

#[derive(Default)]
struct TestWallet {
    lookups: AtomicUsize,
}

#[async_trait]
impl WalletHandler for TestWallet {
    async fn get_info(&self, _ctx: &RequestContext) -> HandlerResult<GetInfoResponse> {
        Some(Ok(GetInfoResponse {
            alias: Some("test wallet".into()),
            methods: Some(METHODS.to_vec()),
            lud16: Some("alice@example.com".into()),
            ..Default::default()
        }))
    }

    async fn get_balance(&self, _ctx: &RequestContext) -> HandlerResult<GetBalanceResponse> {
        Some(Ok(GetBalanceResponse { balance: 21_000 }))
    }

    async fn pay_invoice(
        &self,
        _ctx: &RequestContext,
        request: PayInvoiceRequest,
    ) -> HandlerResult<PayResponse> {
        Some(Ok(PayResponse {
            preimage: Some(format!("preimage-{}", request.invoice)),
            fees_paid: Some(1),
        }))
    }

    async fn make_invoice(
        &self,
        _ctx: &RequestContext,
        request: MakeInvoiceRequest,
    ) -> HandlerResult<Transaction> {
        Some(Ok(Transaction {
            transaction_type: Some(TransactionType::Incoming),
            invoice: Some("lnbc210n1test".into()),
            payment_hash: Some("hash-210".into()),
            amount: Some(request.amount),
            ..Default::default()
        }))
    }

    async fn lookup_invoice(
        &self,
        _ctx: &RequestContext,
        request: LookupInvoiceRequest,
    ) -> HandlerResult<Transaction> {
        let calls = self.lookups.fetch_add(1, Ordering::SeqCst) + 1;
        let settled = calls >= 2;
        Some(Ok(Transaction {
            invoice: Some("lnbc210n1test".into()),
            payment_hash: request.payment_hash,
            settled_at: settled.then_some(1_700_000_000),
            preimage: settled.then(|| "preimage".to_string()),
            ..Default::default()
        }))
    }
}

/// Holds every get_info call until released.
#[derive(Default)]
struct StalledInfoWallet {
    entered: Notify,
    release: Notify,
}

#[async_trait]
impl WalletHandler for StalledInfoWallet {
    async fn get_info(&self, _ctx: &RequestContext) -> HandlerResult<GetInfoResponse> {
        self.entered.notify_one();
        self.release.notified().await;
        Some(Ok(GetInfoResponse::default()))
    }
}

struct Harness {
    relays: Vec<MemoryRelay>,
    service: WalletService,
    wallet: Keys,
    app: Keys,
    handler: Arc<TestWallet>,
}

impl Harness {
    fn new() -> Self {
        Self::with_relays(vec![MemoryRelay::new("wss://relay.test")])
    }

    fn with_relays(relays: Vec<MemoryRelay>) -> Self {
        Self::with_config(relays, ServiceConfig::default())
    }

    fn with_config(relays: Vec<MemoryRelay>, config: ServiceConfig) -> Self {
        let service = WalletService::with_transport(
            Arc::new(MemoryRelayPool::new(relays.clone())),
            config,
        );
        Self {
            relays,
            service,
            wallet: Keys::generate(),
            app: Keys::generate(),
            handler: Arc::new(TestWallet::default()),
        }
    }

    fn relay(&self) -> &MemoryRelay {
        &self.relays[0]
    }

    fn pool(&self) -> Arc<dyn RelayTransport> {
        Arc::new(MemoryRelayPool::new(self.relays.clone()))
    }

    fn wallet_secret(&self) -> String {
        self.wallet.secret_key().to_secret_hex()
    }

    async fn publish_info(&self, notifications: &[NotificationType]) {
        self.service
            .publish_info_event(&self.wallet_secret(), &METHODS, notifications)
            .await
            .unwrap();
    }

    fn serve(&self) -> ServiceHandle {
        let keypair = WalletServiceKeyPair::from_keys(self.wallet.clone(), self.app.public_key());
        self.service.subscribe(keypair, self.handler.clone())
    }

    fn client(&self) -> NwcClient {
        NwcClient::with_transport(
            ClientOptions {
                wallet_pubkey: self.wallet.public_key().to_hex(),
                secret: Some(Zeroizing::new(self.app.secret_key().to_secret_hex())),
                ..Default::default()
            },
            self.pool(),
        )
        .unwrap()
    }

    /// Info published and a responder answering the next request with the
    /// events `script` builds instead of a wallet service.
    async fn scripted<F>(&self, script: F) -> JoinHandle<()>
    where
        F: FnOnce(&Replier) -> Vec<Event> + Send + 'static,
    {
        self.publish_info(&[]).await;
        let responder = tokio::spawn(scripted_responder(
            self.relays.clone(),
            self.wallet.clone(),
            self.app.clone(),
            script,
        ));
        wait_for_subscribers(self.relay(), 1).await;
        responder
    }

    /// Service loop subscribed and info published.
    async fn running(&self) -> (ServiceHandle, NwcClient) {
        self.publish_info(&[NotificationType::PaymentReceived]).await;
        let handle = self.serve();
        wait_for_subscribers(self.relay(), 1).await;
        (handle, self.client())
    }
}

async fn wait_for_subscribers(relay: &MemoryRelay, count: usize) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while relay.subscription_count() < count {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("subscribers never appeared");
}

#[tokio::test]
async fn test_get_balance_round_trip() {
    let h = Harness::new();
    let (_service, client) = h.running().await;

    let balance = client.get_balance().await.unwrap();
    assert_eq!(balance.balance, 21_000);
    assert_eq!(client.encryption(), Some(EncryptionScheme::Nip44V2));
    assert_eq!(client.pending_count(), 0);
}

#[tokio::test]
async fn test_missing_handler_surfaces_wallet_error() {
    let h = Harness::new();
    let (_service, client) = h.running().await;

    let err = client
        .pay_keysend(PayKeysendRequest::new(Keys::generate().public_key().to_hex(), 1000))
        .await
        .unwrap_err();
    assert!(matches!(err, NwcError::Wallet { .. }));
    assert_eq!(err.code(), "NOT_IMPLEMENTED");
}

#[tokio::test(start_paused = true)]
async fn test_publish_never_acknowledged_times_out_after_five_seconds() {
    let h = Harness::new();
    h.publish_info(&[]).await;
    h.relay().set_publish_mode(PublishMode::Hang);
    let client = h.client();

    let started = tokio::time::Instant::now();
    let err = client.get_balance().await.unwrap_err();
    let elapsed = started.elapsed();

    assert!(matches!(err, NwcError::PublishTimeout(_)), "{err}");
    assert!(elapsed >= Duration::from_secs(5), "{elapsed:?}");
    assert!(elapsed < Duration::from_millis(5_100), "{elapsed:?}");
    assert_eq!(client.pending_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_reply_timeout_fires_at_window() {
    let h = Harness::new();
    h.publish_info(&[]).await;
    let client = h.client();

    let timeouts = Timeouts {
        publish: Duration::from_secs(5),
        reply: Duration::from_secs(3),
    };
    let started = tokio::time::Instant::now();
    let err = client
        .execute(&GetBalanceRequest {}, timeouts)
        .await
        .unwrap_err();
    let elapsed = started.elapsed();

    assert!(matches!(err, NwcError::ReplyTimeout(_)), "{err}");
    assert!(elapsed >= Duration::from_secs(3), "{elapsed:?}");
    assert!(elapsed < Duration::from_millis(3_100), "{elapsed:?}");
}

#[tokio::test]
async fn test_rejected_publish_is_publish_error() {
    let h = Harness::new();
    h.publish_info(&[]).await;
    h.relay().set_publish_mode(PublishMode::Reject("blocked: spam".into()));

    let err = h.client().get_balance().await.unwrap_err();
    assert!(matches!(err, NwcError::Publish(_)), "{err}");
    assert!(err.to_string().contains("blocked: spam"));
}

#[tokio::test]
async fn test_first_relay_unreachable() {
    let down = MemoryRelay::new("wss://down.test");
    let up = MemoryRelay::new("wss://up.test");
    down.set_reachable(false);
    let h = Harness::with_relays(vec![down, up.clone()]);
    h.publish_info(&[]).await;
    let _service = h.serve();
    wait_for_subscribers(&up, 1).await;

    let client = h.client();
    assert!(client.is_connected().await);
    assert_eq!(client.get_balance().await.unwrap().balance, 21_000);
}

#[tokio::test]
async fn test_no_reachable_relay_is_network_error() {
    let relay = MemoryRelay::new("wss://down.test");
    relay.set_reachable(false);
    let h = Harness::with_relays(vec![relay]);

    let err = h.client().get_balance().await.unwrap_err();
    assert!(matches!(err, NwcError::Network(_)), "{err}");
}

#[tokio::test]
async fn test_nip04_only_wallet() {
    let h = Harness::with_config(
        vec![MemoryRelay::new("wss://relay.test")],
        ServiceConfig {
            encryptions: vec![EncryptionScheme::Nip04],
            ..Default::default()
        },
    );
    let (_service, client) = h.running().await;

    assert_eq!(client.get_balance().await.unwrap().balance, 21_000);
    assert_eq!(client.encryption(), Some(EncryptionScheme::Nip04));
}

#[tokio::test]
async fn test_unknown_encryption_is_unsupported() {
    let h = Harness::new();
    let info = sign_event(
        EventTemplate::new(info_kind(), "get_balance").tag(tag("encryption", &["nip99"])),
        &h.wallet,
    )
    .unwrap();
    h.pool().publish(&info).await.unwrap();

    let err = h.client().get_balance().await.unwrap_err();
    assert!(matches!(err, NwcError::UnsupportedEncryption(_)), "{err}");
}

#[tokio::test]
async fn test_get_info_and_service_info() {
    let h = Harness::new();
    let (_service, client) = h.running().await;

    let info = client.get_info().await.unwrap();
    assert_eq!(info.methods, Some(METHODS.to_vec()));

    let service_info = client.wallet_service_info().await.unwrap();
    assert!(service_info.supports(&Method::MultiPayInvoice));
    assert!(service_info.supports_notification(&NotificationType::PaymentReceived));
}

#[tokio::test]
async fn test_multi_pay_invoice_in_submission_order() {
    let h = Harness::new();
    let (_service, client) = h.running().await;

    let request = MultiPayInvoiceRequest {
        invoices: vec![
            PayInvoiceRequest::new("lnbc1"),
            PayInvoiceRequest::new("lnbc2"),
            PayInvoiceRequest::new("lnbc3"),
        ],
    };
    let results = client.multi_pay_invoice(request).await.unwrap().invoices;
    let ids: Vec<_> = results.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec!["0", "1", "2"]);
    for result in &results {
        assert_eq!(
            result.result.preimage.as_deref(),
            Some(format!("preimage-{}", result.item.invoice).as_str())
        );
    }
}

/// Builds wallet replies by hand, for wire shapes the service never emits.
struct Replier {
    wallet: Keys,
    app: Keys,
    request: EventId,
}

impl Replier {
    fn encrypted(&self, plaintext: &str) -> String {
        encrypt(
            self.wallet.secret_key(),
            &self.app.public_key(),
            plaintext,
            EncryptionScheme::Nip44V2,
        )
        .unwrap()
    }

    fn raw(&self, content: String, item: Option<&str>) -> Event {
        let mut template = EventTemplate::new(response_kind(), content)
            .tag(Tag::event(self.request))
            .tag(Tag::public_key(self.app.public_key()));
        if let Some(item) = item {
            template = template.tag(tag("d", &[item]));
        }
        sign_event(template, &self.wallet).unwrap()
    }

    fn payload(&self, payload: &ResponsePayload, item: Option<&str>) -> Event {
        let json = serde_json::to_string(payload).unwrap();
        self.raw(self.encrypted(&json), item)
    }

    fn ok(&self, method: Method, result: Value, item: Option<&str>) -> Event {
        self.payload(&ResponsePayload::ok(&method, result), item)
    }
}

/// Waits for one request and publishes the replies `script` builds for it.
async fn scripted_responder<F>(relays: Vec<MemoryRelay>, wallet: Keys, app: Keys, script: F)
where
    F: FnOnce(&Replier) -> Vec<Event>,
{
    let transport = MemoryRelayPool::new(relays);
    let mut requests = transport
        .subscribe(Filter::new().kind(request_kind()).author(app.public_key()))
        .await
        .unwrap();
    let request = requests.next().await.unwrap();
    let replier = Replier {
        wallet,
        app,
        request: request.id,
    };
    for reply in script(&replier) {
        transport.publish(&reply).await.unwrap();
    }
}

fn paid(preimage: &str) -> Value {
    json!({ "preimage": preimage })
}

fn two_invoices() -> MultiPayInvoiceRequest {
    let item = |id: &str| PayInvoiceRequest {
        id: Some(id.to_string()),
        ..PayInvoiceRequest::new(format!("lnbc-{id}"))
    };
    MultiPayInvoiceRequest {
        invoices: vec![item("a"), item("b")],
    }
}

#[tokio::test]
async fn test_multi_resolves_only_when_all_items_arrive() {
    let h = Harness::new();
    let responder = h
        .scripted(|r| {
            // out of order, with a stray item ahead of the real ones
            [("stray", "x"), ("c", "pc"), ("a", "pa"), ("b", "pb")]
                .into_iter()
                .map(|(item, preimage)| r.ok(Method::MultiPayKeysend, paid(preimage), Some(item)))
                .collect()
        })
        .await;

    let keysend = |id: &str| {
        let mut item = PayKeysendRequest::new(Keys::generate().public_key().to_hex(), 1000);
        item.id = Some(id.to_string());
        item
    };
    let request = MultiPayKeysendRequest {
        keysends: vec![keysend("a"), keysend("b"), keysend("c")],
    };
    let results = h.client().multi_pay_keysend(request).await.unwrap().keysends;
    responder.await.unwrap();

    let got: Vec<_> = results
        .iter()
        .map(|r| (r.id.as_str(), r.result.preimage.as_deref().unwrap()))
        .collect();
    assert_eq!(got, vec![("a", "pa"), ("b", "pb"), ("c", "pc")]);
}

#[tokio::test]
async fn test_undecryptable_reply_is_decoding_error() {
    let h = Harness::new();
    let _responder = h
        .scripted(|r| vec![r.raw("not-a-ciphertext".into(), None)])
        .await;

    let err = h.client().get_balance().await.unwrap_err();
    assert!(matches!(err, NwcError::ResponseDecoding(_)), "{err}");
}

#[tokio::test]
async fn test_unparseable_reply_is_decoding_error() {
    let h = Harness::new();
    let _responder = h
        .scripted(|r| vec![r.raw(r.encrypted("{ not json"), None)])
        .await;

    let err = h.client().get_balance().await.unwrap_err();
    assert!(matches!(err, NwcError::ResponseDecoding(_)), "{err}");
}

#[tokio::test]
async fn test_mistyped_result_fails_validation() {
    let h = Harness::new();
    let _responder = h
        .scripted(|r| vec![r.ok(Method::GetBalance, json!({ "balance": "lots" }), None)])
        .await;

    let err = h.client().get_balance().await.unwrap_err();
    assert!(matches!(err, NwcError::ResponseValidation(_)), "{err}");
    assert!(err.to_string().contains("lots"));
}

#[tokio::test]
async fn test_pay_invoice_empty_preimage_fails_validation() {
    let h = Harness::new();
    let _responder = h
        .scripted(|r| vec![r.ok(Method::PayInvoice, paid(""), None)])
        .await;

    let client = h.client();
    let err = client
        .pay_invoice(PayInvoiceRequest::new("lnbc1"))
        .await
        .unwrap_err();
    assert!(matches!(err, NwcError::ResponseValidation(_)), "{err}");
    assert_eq!(client.pending_count(), 0);
}

#[tokio::test]
async fn test_multi_item_error_fails_whole_call() {
    let h = Harness::new();
    let _responder = h
        .scripted(|r| {
            let failed = WalletErrorPayload::new(ErrorCode::PaymentFailed, "no route");
            vec![
                r.ok(Method::MultiPayInvoice, paid("pa"), Some("a")),
                r.payload(&ResponsePayload::err(&Method::MultiPayInvoice, failed), Some("b")),
            ]
        })
        .await;

    let client = h.client();
    let err = client.multi_pay_invoice(two_invoices()).await.unwrap_err();
    assert!(matches!(err, NwcError::Wallet { .. }), "{err}");
    assert_eq!(err.code(), "PAYMENT_FAILED");
    assert_eq!(client.pending_count(), 0);
}

#[tokio::test]
async fn test_multi_item_failing_validation_fails_whole_call() {
    let h = Harness::new();
    let _responder = h
        .scripted(|r| vec![r.ok(Method::MultiPayInvoice, paid(""), Some("a"))])
        .await;

    let err = h.client().multi_pay_invoice(two_invoices()).await.unwrap_err();
    assert!(matches!(err, NwcError::ResponseValidation(_)), "{err}");
}

#[tokio::test]
async fn test_multi_reply_without_d_tag_fails_whole_call() {
    let h = Harness::new();
    let _responder = h
        .scripted(|r| vec![r.ok(Method::MultiPayInvoice, paid("pa"), None)])
        .await;

    let err = h.client().multi_pay_invoice(two_invoices()).await.unwrap_err();
    assert!(matches!(err, NwcError::ResponseValidation(_)), "{err}");
    assert!(err.to_string().contains("No d tag"));
}

#[tokio::test]
async fn test_request_side_validation_publishes_nothing() {
    let h = Harness::new();
    let (_service, client) = h.running().await;
    client.encryption_scheme().await.unwrap();
    let watcher = h.pool();
    let mut requests = watcher
        .subscribe(Filter::new().kind(request_kind()))
        .await
        .unwrap();

    let rejected = [
        client
            .make_invoice(MakeInvoiceRequest::default())
            .await
            .unwrap_err(),
        client
            .make_hold_invoice(MakeHoldInvoiceRequest {
                amount: 1000,
                ..Default::default()
            })
            .await
            .unwrap_err(),
        client
            .lookup_invoice(LookupInvoiceRequest::default())
            .await
            .unwrap_err(),
        client
            .multi_pay_invoice(MultiPayInvoiceRequest { invoices: vec![] })
            .await
            .unwrap_err(),
        client
            .multi_pay_invoice(MultiPayInvoiceRequest {
                invoices: vec![
                    PayInvoiceRequest {
                        id: Some("x".into()),
                        ..PayInvoiceRequest::new("lnbc1")
                    },
                    PayInvoiceRequest {
                        id: Some("x".into()),
                        ..PayInvoiceRequest::new("lnbc2")
                    },
                ],
            })
            .await
            .unwrap_err(),
    ];
    for err in &rejected {
        assert!(matches!(err, NwcError::InvalidInput(_)), "{err}");
    }
    assert_eq!(client.pending_count(), 0);
    assert!(
        tokio::time::timeout(Duration::from_millis(100), requests.next())
            .await
            .is_err(),
        "a rejected request reached the relay"
    );

    // the watcher does see requests that pass the local checks
    client.get_balance().await.unwrap();
    let seen = tokio::time::timeout(Duration::from_secs(5), requests.next())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(seen.pubkey, h.app.public_key());
}

#[tokio::test]
async fn test_notifications_filtered_by_type() {
    let h = Harness::new();
    let (_service, client) = h.running().await;
    client.encryption_scheme().await.unwrap();

    let (tx, mut rx) = mpsc::unbounded_channel();
    let subscription = client.subscribe_notifications(
        move |notification| {
            let _ = tx.send(notification);
        },
        Some(vec![NotificationType::PaymentReceived]),
    );
    wait_for_subscribers(h.relay(), 2).await;

    let keypair = WalletServiceKeyPair::from_keys(h.wallet.clone(), h.app.public_key());
    for (kind, hash) in [
        (NotificationType::PaymentSent, "sent"),
        (NotificationType::PaymentReceived, "received"),
    ] {
        let notification = Notification {
            notification_type: kind,
            notification: Transaction {
                payment_hash: Some(hash.into()),
                ..Default::default()
            },
        };
        h.service
            .publish_notification(&keypair, &notification, EncryptionScheme::Nip44V2)
            .await
            .unwrap();
    }

    let delivered = tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(delivered.notification_type, NotificationType::PaymentReceived);
    assert_eq!(delivered.notification.payment_hash.as_deref(), Some("received"));
    assert!(rx.try_recv().is_err());

    assert!(subscription.is_active());
    subscription.unsubscribe();
    subscription.unsubscribe();
    subscription.join().await;
    assert_eq!(h.relay().subscription_count(), 1);
}

#[tokio::test]
async fn test_wallet_auth_handshake() {
    let h = Harness::new();
    let app_secret = h.app.secret_key().to_secret_hex();
    let nwa = NwaClient::with_transport(
        NwaOptions {
            relay_urls: vec!["wss://relay.test".into()],
            request_methods: vec![Method::GetInfo, Method::GetBalance],
            name: Some("Shop".into()),
            ..Default::default()
        },
        Some(app_secret.as_str()),
        h.pool(),
    )
    .unwrap();
    assert_eq!(nwa.app_pubkey(), h.app.public_key().to_hex());

    let parsed = NwaClient::parse(&nwa.connection_uri(None)).unwrap();
    assert_eq!(parsed.app_pubkey, nwa.app_pubkey());

    let (tx, rx) = oneshot::channel();
    let subscription = nwa
        .subscribe(move |client| {
            let _ = tx.send(client);
        })
        .unwrap();

    let _service = h.serve();
    wait_for_subscribers(h.relay(), 2).await;
    h.service
        .publish_auth_ack(
            &h.wallet_secret(),
            &parsed.app_pubkey,
            &parsed.options.request_methods,
            &[],
        )
        .await
        .unwrap();

    let client = tokio::time::timeout(Duration::from_secs(5), rx)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(client.wallet_pubkey(), h.wallet.public_key());
    assert_eq!(client.lud16().as_deref(), Some("alice@example.com"));
    assert_eq!(client.get_balance().await.unwrap().balance, 21_000);

    subscription.join().await;
}

#[tokio::test]
async fn test_wallet_auth_unsub_during_get_info_skips_callback() {
    let h = Harness::new();
    let app_secret = h.app.secret_key().to_secret_hex();
    let nwa = NwaClient::with_transport(
        NwaOptions {
            relay_urls: vec!["wss://relay.test".into()],
            request_methods: vec![Method::GetInfo],
            ..Default::default()
        },
        Some(app_secret.as_str()),
        h.pool(),
    )
    .unwrap();

    let called = Arc::new(AtomicBool::new(false));
    let subscription = nwa
        .subscribe({
            let called = called.clone();
            move |_client| called.store(true, Ordering::SeqCst)
        })
        .unwrap();

    let wallet = Arc::new(StalledInfoWallet::default());
    let keypair = WalletServiceKeyPair::from_keys(h.wallet.clone(), h.app.public_key());
    let _service = h.service.subscribe(keypair, wallet.clone());
    wait_for_subscribers(h.relay(), 2).await;
    h.service
        .publish_auth_ack(
            &h.wallet_secret(),
            nwa.app_pubkey(),
            &[Method::GetInfo],
            &[],
        )
        .await
        .unwrap();

    tokio::time::timeout(Duration::from_secs(5), wallet.entered.notified())
        .await
        .expect("get_info never reached the wallet");
    subscription.unsub();
    wallet.release.notify_one();

    tokio::time::timeout(Duration::from_secs(5), subscription.join())
        .await
        .expect("listener kept running after unsub");
    assert!(!called.load(Ordering::SeqCst));
}

#[tokio::test]
async fn test_receive_invoice_via_notification() {
    let h = Harness::new();
    let (_service, client) = h.running().await;

    let receive = client
        .receive(MakeInvoiceRequest {
            amount: 21_000,
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(receive.payment_hash().unwrap(), "hash-210");

    let waiter = tokio::spawn({
        let receive = receive.clone();
        async move { receive.wait_paid(Duration::from_secs(10)).await }
    });
    wait_for_subscribers(h.relay(), 2).await;

    let keypair = WalletServiceKeyPair::from_keys(h.wallet.clone(), h.app.public_key());
    let paid = Transaction {
        payment_hash: Some("hash-210".into()),
        preimage: Some("preimage".into()),
        settled_at: Some(1_700_000_000),
        ..Default::default()
    };
    h.service
        .publish_notification(
            &keypair,
            &Notification {
                notification_type: NotificationType::PaymentReceived,
                notification: paid.clone(),
            },
            EncryptionScheme::Nip44V2,
        )
        .await
        .unwrap();

    assert_eq!(waiter.await.unwrap().unwrap(), paid);
}

#[tokio::test]
async fn test_receive_invoice_polls_without_notifications() {
    let h = Harness::new();
    h.publish_info(&[]).await;
    let _service = h.serve();
    wait_for_subscribers(h.relay(), 1).await;
    let client = h.client();

    let receive = client
        .receive(MakeInvoiceRequest {
            amount: 21_000,
            ..Default::default()
        })
        .await
        .unwrap();
    let settled = receive.wait_paid(Duration::from_secs(10)).await.unwrap();
    assert!(settled.is_settled());
    assert_eq!(h.handler.lookups.load(Ordering::SeqCst), 2);
}
