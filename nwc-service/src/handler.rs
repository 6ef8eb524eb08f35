// SPDX-FileCopyrightText: © 2026 PrivKey LLC
// SPDX-License-Identifier: AGPL-3.0-or-later

#![forbid(unsafe_code)]

use async_trait::async_trait;
use nwc_core::nostr_sdk::{EventId, PublicKey};
use nwc_core::types::*;
use nwc_core::EncryptionScheme;

/// `None` means the wallet does not implement the method and the requester
/// gets `NOT_IMPLEMENTED`.
pub type HandlerResult<T> = Option<std::result::Result<T, WalletErrorPayload>>;

/// Who sent the request being handled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    pub request_id: EventId,
    pub requester: PublicKey,
    pub wallet: PublicKey,
    pub encryption: EncryptionScheme,
}

/// Wallet backend. Implement the methods the wallet supports; the rest
/// answer `NOT_IMPLEMENTED`.
///
/// `multi_pay_invoice` and `multi_pay_keysend` are answered item by item
/// through [`pay_invoice`](Self::pay_invoice) and
/// [`pay_keysend`](Self::pay_keysend).
#[async_trait]
pub trait WalletHandler: Send + Sync {
    async fn get_info(&self, _ctx: &RequestContext) -> HandlerResult<GetInfoResponse> {
        None
    }

    async fn get_balance(&self, _ctx: &RequestContext) -> HandlerResult<GetBalanceResponse> {
        None
    }

    async fn get_budget(&self, _ctx: &RequestContext) -> HandlerResult<GetBudgetResponse> {
        None
    }

    async fn pay_invoice(
        &self,
        _ctx: &RequestContext,
        _request: PayInvoiceRequest,
    ) -> HandlerResult<PayResponse> {
        None
    }

    async fn pay_keysend(
        &self,
        _ctx: &RequestContext,
        _request: PayKeysendRequest,
    ) -> HandlerResult<PayResponse> {
        None
    }

    async fn make_invoice(
        &self,
        _ctx: &RequestContext,
        _request: MakeInvoiceRequest,
    ) -> HandlerResult<Transaction> {
        None
    }

    async fn make_hold_invoice(
        &self,
        _ctx: &RequestContext,
        _request: MakeHoldInvoiceRequest,
    ) -> HandlerResult<Transaction> {
        None
    }

    async fn settle_hold_invoice(
        &self,
        _ctx: &RequestContext,
        _request: SettleHoldInvoiceRequest,
    ) -> HandlerResult<EmptyResponse> {
        None
    }

    async fn cancel_hold_invoice(
        &self,
        _ctx: &RequestContext,
        _request: CancelHoldInvoiceRequest,
    ) -> HandlerResult<EmptyResponse> {
        None
    }

    async fn lookup_invoice(
        &self,
        _ctx: &RequestContext,
        _request: LookupInvoiceRequest,
    ) -> HandlerResult<Transaction> {
        None
    }

    async fn list_transactions(
        &self,
        _ctx: &RequestContext,
        _request: ListTransactionsRequest,
    ) -> HandlerResult<ListTransactionsResponse> {
        None
    }

    async fn sign_message(
        &self,
        _ctx: &RequestContext,
        _request: SignMessageRequest,
    ) -> HandlerResult<SignMessageResponse> {
        None
    }

    async fn create_connection(
        &self,
        _ctx: &RequestContext,
        _request: CreateConnectionRequest,
    ) -> HandlerResult<CreateConnectionResponse> {
        None
    }
}
