// SPDX-FileCopyrightText: © 2026 PrivKey LLC
// SPDX-License-Identifier: AGPL-3.0-or-later

#![forbid(unsafe_code)]

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use nwc_core::types::{LookupInvoiceRequest, Transaction};
use nwc_core::{NotificationType, NwcError, Result};
use tokio::sync::mpsc;
use tokio::time::{sleep, timeout_at, Instant};
use tracing::{debug, warn};

use crate::client::NwcClient;

pub const LOOKUP_POLL_INTERVAL: Duration = Duration::from_secs(3);

/// Fields read from a BOLT11 payment request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedInvoice {
    pub payment_hash: String,
    pub satoshi: u64,
    pub timestamp: u64,
    pub expiry: Option<u64>,
    pub description: Option<String>,
}

/// Payment request decoder supplied by the application.
pub trait InvoiceDecoder: Send + Sync {
    fn decode(&self, invoice: &str) -> Result<DecodedInvoice>;
}

impl<F> InvoiceDecoder for F
where
    F: Fn(&str) -> Result<DecodedInvoice> + Send + Sync,
{
    fn decode(&self, invoice: &str) -> Result<DecodedInvoice> {
        self(invoice)
    }
}

/// An invoice created through `make_invoice`, waiting to be paid.
#[derive(Clone)]
pub struct ReceiveInvoice {
    client: NwcClient,
    transaction: Transaction,
    decoder: Option<Arc<dyn InvoiceDecoder>>,
}

impl fmt::Debug for ReceiveInvoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReceiveInvoice")
            .field("transaction", &self.transaction)
            .field("has_decoder", &self.decoder.is_some())
            .finish()
    }
}

impl ReceiveInvoice {
    pub fn new(client: NwcClient, transaction: Transaction) -> Self {
        Self {
            client,
            transaction,
            decoder: None,
        }
    }

    pub fn with_decoder(mut self, decoder: Arc<dyn InvoiceDecoder>) -> Self {
        self.decoder = Some(decoder);
        self
    }

    pub fn transaction(&self) -> &Transaction {
        &self.transaction
    }

    pub fn invoice(&self) -> Option<&str> {
        self.transaction.invoice.as_deref()
    }

    pub fn decode(&self) -> Result<DecodedInvoice> {
        let decoder = self
            .decoder
            .as_ref()
            .ok_or_else(|| NwcError::InvalidInput("no invoice decoder configured".into()))?;
        let invoice = self
            .invoice()
            .ok_or_else(|| NwcError::InvalidInput("transaction has no invoice".into()))?;
        decoder.decode(invoice)
    }

    /// From the transaction when the wallet returned one, else decoded from the invoice.
    pub fn payment_hash(&self) -> Result<String> {
        match self.transaction.payment_hash.as_deref() {
            Some(hash) if !hash.is_empty() => Ok(hash.to_string()),
            _ => Ok(self.decode()?.payment_hash),
        }
    }

    /// Wait until the invoice is settled or `timeout` elapses.
    ///
    /// Listens for `payment_received` notifications when the wallet
    /// advertises them, otherwise polls `lookup_invoice`.
    pub async fn wait_paid(&self, timeout: Duration) -> Result<Transaction> {
        let payment_hash = self.payment_hash()?;
        let deadline = Instant::now() + timeout;

        let notifies = match self.client.wallet_service_info().await {
            Ok(info) => info.supports_notification(&NotificationType::PaymentReceived),
            Err(e) => {
                warn!(error = %e, "failed to read wallet info, polling instead");
                false
            }
        };

        let waited = if notifies {
            timeout_at(deadline, self.wait_notified(&payment_hash)).await
        } else {
            timeout_at(deadline, self.poll_settled(&payment_hash)).await
        };
        match waited {
            Ok(result) => result,
            Err(_) => Err(NwcError::ReplyTimeout(format!(
                "invoice {payment_hash} not paid within {timeout:?}"
            ))),
        }
    }

    async fn wait_notified(&self, payment_hash: &str) -> Result<Transaction> {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let wanted = payment_hash.to_string();
        let _subscription = self.client.subscribe_notifications(
            move |notification| {
                if notification.notification.payment_hash.as_deref() == Some(wanted.as_str()) {
                    let _ = tx.send(notification.notification);
                }
            },
            Some(vec![NotificationType::PaymentReceived]),
        );
        rx.recv()
            .await
            .ok_or_else(|| NwcError::Network("notification listener ended".into()))
    }

    async fn poll_settled(&self, payment_hash: &str) -> Result<Transaction> {
        loop {
            match self
                .client
                .lookup_invoice(LookupInvoiceRequest::by_payment_hash(payment_hash))
                .await
            {
                Ok(transaction) if transaction.is_settled() => return Ok(transaction),
                Ok(_) => debug!(payment_hash, "invoice not settled yet"),
                Err(e) => warn!(error = %e, payment_hash, "lookup_invoice failed"),
            }
            sleep(LOOKUP_POLL_INTERVAL).await;
        }
    }
}

impl NwcClient {
    /// Create an invoice and return a handle that can wait for its payment.
    pub async fn receive(
        &self,
        request: nwc_core::types::MakeInvoiceRequest,
    ) -> Result<ReceiveInvoice> {
        let transaction = self.make_invoice(request).await?;
        Ok(ReceiveInvoice::new(self.clone(), transaction))
    }
}
