// SPDX-FileCopyrightText: © 2026 PrivKey LLC
// SPDX-License-Identifier: AGPL-3.0-or-later

#![forbid(unsafe_code)]

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::warn;

use nwc_core::types::*;
use nwc_core::{ErrorCode, Method};

use crate::handler::{HandlerResult, RequestContext, WalletHandler};

/// A decoded request, one variant per method this crate understands.
#[derive(Debug, Clone, PartialEq)]
pub enum WalletRequest {
    GetInfo,
    GetBalance,
    GetBudget,
    PayInvoice(PayInvoiceRequest),
    MultiPayInvoice(MultiPayInvoiceRequest),
    PayKeysend(PayKeysendRequest),
    MultiPayKeysend(MultiPayKeysendRequest),
    MakeInvoice(MakeInvoiceRequest),
    MakeHoldInvoice(MakeHoldInvoiceRequest),
    SettleHoldInvoice(SettleHoldInvoiceRequest),
    CancelHoldInvoice(CancelHoldInvoiceRequest),
    LookupInvoice(LookupInvoiceRequest),
    ListTransactions(ListTransactionsRequest),
    SignMessage(SignMessageRequest),
    CreateConnection(CreateConnectionRequest),
    Unknown(Method),
}

fn params<T: DeserializeOwned>(method: &Method, params: Value) -> Result<T, WalletErrorPayload> {
    let params = if params.is_null() {
        Value::Object(Default::default())
    } else {
        params
    };
    serde_json::from_value(params).map_err(|e| {
        WalletErrorPayload::new(ErrorCode::Generic, format!("invalid params for {method}: {e}"))
    })
}

impl WalletRequest {
    pub fn parse(payload: RequestPayload) -> Result<Self, WalletErrorPayload> {
        let RequestPayload { method, params: p } = payload;
        let request = match &method {
            Method::GetInfo => Self::GetInfo,
            Method::GetBalance => Self::GetBalance,
            Method::GetBudget => Self::GetBudget,
            Method::PayInvoice => Self::PayInvoice(params(&method, p)?),
            Method::MultiPayInvoice => Self::MultiPayInvoice(params(&method, p)?),
            Method::PayKeysend => Self::PayKeysend(params(&method, p)?),
            Method::MultiPayKeysend => Self::MultiPayKeysend(params(&method, p)?),
            Method::MakeInvoice => Self::MakeInvoice(params(&method, p)?),
            Method::MakeHoldInvoice => Self::MakeHoldInvoice(params(&method, p)?),
            Method::SettleHoldInvoice => Self::SettleHoldInvoice(params(&method, p)?),
            Method::CancelHoldInvoice => Self::CancelHoldInvoice(params(&method, p)?),
            Method::LookupInvoice => Self::LookupInvoice(params(&method, p)?),
            Method::ListTransactions => Self::ListTransactions(params(&method, p)?),
            Method::SignMessage => Self::SignMessage(params(&method, p)?),
            Method::CreateConnection => Self::CreateConnection(params(&method, p)?),
            Method::Other(_) => Self::Unknown(method.clone()),
        };
        Ok(request)
    }
}

/// One response event to publish. `item` is the `d` tag of a batched reply.
#[derive(Debug, Clone)]
pub struct Reply {
    pub item: Option<String>,
    pub payload: ResponsePayload,
}

impl Reply {
    fn single(payload: ResponsePayload) -> Self {
        Self {
            item: None,
            payload,
        }
    }
}

fn respond<T: Serialize>(method: &Method, result: HandlerResult<T>) -> ResponsePayload {
    match result {
        None => ResponsePayload::err(method, WalletErrorPayload::not_implemented(method)),
        Some(Err(error)) => ResponsePayload::err(method, error),
        Some(Ok(result)) => match serde_json::to_value(result) {
            Ok(value) => ResponsePayload::ok(method, value),
            Err(e) => {
                warn!(error = %e, method = %method, "failed to serialize handler result");
                ResponsePayload::err(
                    method,
                    WalletErrorPayload::new(ErrorCode::Internal, "failed to serialize result"),
                )
            }
        },
    }
}

fn item_id(id: Option<&str>, index: usize) -> String {
    id.map(str::to_string).unwrap_or_else(|| index.to_string())
}

/// Run `payload` through `handler`, producing the response event(s) to send.
pub async fn dispatch(
    handler: &dyn WalletHandler,
    ctx: &RequestContext,
    payload: RequestPayload,
) -> Vec<Reply> {
    let method = payload.method.clone();
    let request = match WalletRequest::parse(payload) {
        Ok(request) => request,
        Err(error) => return vec![Reply::single(ResponsePayload::err(&method, error))],
    };

    let payload = match request {
        WalletRequest::GetInfo => respond(&method, handler.get_info(ctx).await),
        WalletRequest::GetBalance => respond(&method, handler.get_balance(ctx).await),
        WalletRequest::GetBudget => respond(&method, handler.get_budget(ctx).await),
        WalletRequest::PayInvoice(r) => respond(&method, handler.pay_invoice(ctx, r).await),
        WalletRequest::PayKeysend(r) => respond(&method, handler.pay_keysend(ctx, r).await),
        WalletRequest::MultiPayInvoice(r) => {
            let mut replies = Vec::with_capacity(r.invoices.len());
            for (index, invoice) in r.invoices.into_iter().enumerate() {
                let item = item_id(invoice.id.as_deref(), index);
                let payload = respond(&method, handler.pay_invoice(ctx, invoice).await);
                replies.push(Reply {
                    item: Some(item),
                    payload,
                });
            }
            return replies;
        }
        WalletRequest::MultiPayKeysend(r) => {
            let mut replies = Vec::with_capacity(r.keysends.len());
            for (index, keysend) in r.keysends.into_iter().enumerate() {
                let item = item_id(keysend.id.as_deref(), index);
                let payload = respond(&method, handler.pay_keysend(ctx, keysend).await);
                replies.push(Reply {
                    item: Some(item),
                    payload,
                });
            }
            return replies;
        }
        WalletRequest::MakeInvoice(r) => respond(&method, handler.make_invoice(ctx, r).await),
        WalletRequest::MakeHoldInvoice(r) => {
            respond(&method, handler.make_hold_invoice(ctx, r).await)
        }
        WalletRequest::SettleHoldInvoice(r) => {
            respond(&method, handler.settle_hold_invoice(ctx, r).await)
        }
        WalletRequest::CancelHoldInvoice(r) => {
            respond(&method, handler.cancel_hold_invoice(ctx, r).await)
        }
        WalletRequest::LookupInvoice(r) => respond(&method, handler.lookup_invoice(ctx, r).await),
        WalletRequest::ListTransactions(r) => {
            respond(&method, handler.list_transactions(ctx, r).await)
        }
        WalletRequest::SignMessage(r) => respond(&method, handler.sign_message(ctx, r).await),
        WalletRequest::CreateConnection(r) => {
            respond(&method, handler.create_connection(ctx, r).await)
        }
        WalletRequest::Unknown(m) => {
            ResponsePayload::err(&m, WalletErrorPayload::not_implemented(&m))
        }
    };
    vec![Reply::single(payload)]
}
