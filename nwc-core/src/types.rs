// SPDX-FileCopyrightText: © 2026 PrivKey LLC
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Wire payloads for every wallet method.
//!
//! Each request type implements [`Nip47Request`], tying it to its method name,
//! its response type and the predicate a decoded response must satisfy.
//! Batched payment requests implement [`Nip47MultiRequest`] instead.

#![forbid(unsafe_code)]

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{NwcError, Result};
use crate::method::{ErrorCode, Method, NotificationType};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletErrorPayload {
    pub code: String,
    pub message: String,
}

impl WalletErrorPayload {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code: code.as_str().to_string(),
            message: message.into(),
        }
    }

    pub fn not_implemented(method: &Method) -> Self {
        Self::new(
            ErrorCode::NotImplemented,
            format!("{method} not supported by this wallet"),
        )
    }
}

impl From<WalletErrorPayload> for NwcError {
    fn from(payload: WalletErrorPayload) -> Self {
        NwcError::wallet(payload.code, payload.message)
    }
}

/// Decrypted content of a request event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestPayload {
    pub method: Method,
    #[serde(default)]
    pub params: Value,
}

/// Decrypted content of a response event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponsePayload {
    pub result_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<WalletErrorPayload>,
}

impl ResponsePayload {
    pub fn ok(method: &Method, result: Value) -> Self {
        Self {
            result_type: method.to_string(),
            result: Some(result),
            error: None,
        }
    }

    pub fn err(method: &Method, error: WalletErrorPayload) -> Self {
        Self {
            result_type: method.to_string(),
            result: None,
            error: Some(error),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub notification_type: NotificationType,
    pub notification: Transaction,
}

pub trait Nip47Request: Serialize + Send + Sync {
    type Response: DeserializeOwned + Serialize + Send;

    fn method() -> Method;

    /// Reject a request locally, before anything is published.
    fn check(&self) -> Result<()> {
        Ok(())
    }

    fn validate(&self, _response: &Self::Response) -> bool {
        true
    }
}

/// One entry of a batched payment, addressable by its `d` tag.
pub trait MultiItem: Serialize + DeserializeOwned + Clone + Send + Sync {
    fn id(&self) -> Option<&str>;
    fn set_id(&mut self, id: String);
}

pub trait Nip47MultiRequest: Serialize + Send + Sync {
    type Item: MultiItem;

    fn method() -> Method;
    fn items(&self) -> &[Self::Item];
    fn items_mut(&mut self) -> &mut Vec<Self::Item>;

    fn validate_item(result: &PayResponse) -> bool {
        result.preimage.as_deref().is_some_and(|p| !p.is_empty())
    }

    /// Give every item an id (its index when none was supplied) and return
    /// them in submission order.
    fn assign_ids(&mut self) -> Result<Vec<String>> {
        if self.items().is_empty() {
            return Err(NwcError::InvalidInput(format!(
                "{} requires at least one item",
                Self::method()
            )));
        }
        let mut seen = HashSet::new();
        let mut ids = Vec::with_capacity(self.items().len());
        for (index, item) in self.items_mut().iter_mut().enumerate() {
            let id = match item.id() {
                Some(id) => id.to_string(),
                None => {
                    let id = index.to_string();
                    item.set_id(id.clone());
                    id
                }
            };
            if !seen.insert(id.clone()) {
                return Err(NwcError::InvalidInput(format!("duplicate item id: {id}")));
            }
            ids.push(id);
        }
        Ok(ids)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BudgetRenewal {
    Daily,
    Weekly,
    Monthly,
    Yearly,
    Never,
}

impl BudgetRenewal {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
            Self::Yearly => "yearly",
            Self::Never => "never",
        }
    }
}

impl fmt::Display for BudgetRenewal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BudgetRenewal {
    type Err = NwcError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "daily" => Ok(Self::Daily),
            "weekly" => Ok(Self::Weekly),
            "monthly" => Ok(Self::Monthly),
            "yearly" => Ok(Self::Yearly),
            "never" => Ok(Self::Never),
            other => Err(NwcError::InvalidInput(format!(
                "unknown budget renewal: {other}"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    Incoming,
    Outgoing,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub transaction_type: Option<TransactionType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invoice: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preimage: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fees_paid: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settled_at: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settle_deadline: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

impl Transaction {
    fn has_invoice(&self) -> bool {
        self.invoice.as_deref().is_some_and(|i| !i.is_empty())
    }

    pub fn is_settled(&self) -> bool {
        self.settled_at.is_some() && self.preimage.as_deref().is_some_and(|p| !p.is_empty())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GetInfoRequest {}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GetInfoResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pubkey: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_height: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub methods: Option<Vec<Method>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notifications: Option<Vec<NotificationType>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lud16: Option<String>,
}

impl Nip47Request for GetInfoRequest {
    type Response = GetInfoResponse;

    fn method() -> Method {
        Method::GetInfo
    }

    fn validate(&self, response: &GetInfoResponse) -> bool {
        response.methods.is_some()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GetBalanceRequest {}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GetBalanceResponse {
    /// Millisatoshis.
    pub balance: u64,
}

impl Nip47Request for GetBalanceRequest {
    type Response = GetBalanceResponse;

    fn method() -> Method {
        Method::GetBalance
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GetBudgetRequest {}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GetBudgetResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub used_budget: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_budget: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub renews_at: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub renewal_period: Option<BudgetRenewal>,
}

impl Nip47Request for GetBudgetRequest {
    type Response = GetBudgetResponse;

    fn method() -> Method {
        Method::GetBudget
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PayInvoiceRequest {
    pub invoice: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

impl PayInvoiceRequest {
    pub fn new(invoice: impl Into<String>) -> Self {
        Self {
            invoice: invoice.into(),
            amount: None,
            id: None,
            metadata: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PayResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preimage: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fees_paid: Option<u64>,
}

impl Nip47Request for PayInvoiceRequest {
    type Response = PayResponse;

    fn method() -> Method {
        Method::PayInvoice
    }

    fn check(&self) -> Result<()> {
        if self.invoice.trim().is_empty() {
            return Err(NwcError::InvalidInput("invoice is required".into()));
        }
        Ok(())
    }

    fn validate(&self, response: &PayResponse) -> bool {
        response.preimage.as_deref().is_some_and(|p| !p.is_empty())
    }
}

impl MultiItem for PayInvoiceRequest {
    fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    fn set_id(&mut self, id: String) {
        self.id = Some(id);
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TlvRecord {
    #[serde(rename = "type")]
    pub record_type: u64,
    /// Hex-encoded value.
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PayKeysendRequest {
    pub amount: u64,
    pub pubkey: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preimage: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tlv_records: Vec<TlvRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

impl PayKeysendRequest {
    pub fn new(pubkey: impl Into<String>, amount: u64) -> Self {
        Self {
            amount,
            pubkey: pubkey.into(),
            preimage: None,
            tlv_records: Vec::new(),
            id: None,
        }
    }
}

impl Nip47Request for PayKeysendRequest {
    type Response = PayResponse;

    fn method() -> Method {
        Method::PayKeysend
    }

    fn check(&self) -> Result<()> {
        if self.amount == 0 {
            return Err(NwcError::InvalidInput("keysend amount must be non-zero".into()));
        }
        if self.pubkey.trim().is_empty() {
            return Err(NwcError::InvalidInput("keysend pubkey is required".into()));
        }
        Ok(())
    }

    fn validate(&self, response: &PayResponse) -> bool {
        response.preimage.as_deref().is_some_and(|p| !p.is_empty())
    }
}

impl MultiItem for PayKeysendRequest {
    fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    fn set_id(&mut self, id: String) {
        self.id = Some(id);
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MultiPayInvoiceRequest {
    pub invoices: Vec<PayInvoiceRequest>,
}

impl Nip47MultiRequest for MultiPayInvoiceRequest {
    type Item = PayInvoiceRequest;

    fn method() -> Method {
        Method::MultiPayInvoice
    }

    fn items(&self) -> &[PayInvoiceRequest] {
        &self.invoices
    }

    fn items_mut(&mut self) -> &mut Vec<PayInvoiceRequest> {
        &mut self.invoices
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MultiPayKeysendRequest {
    pub keysends: Vec<PayKeysendRequest>,
}

impl Nip47MultiRequest for MultiPayKeysendRequest {
    type Item = PayKeysendRequest;

    fn method() -> Method {
        Method::MultiPayKeysend
    }

    fn items(&self) -> &[PayKeysendRequest] {
        &self.keysends
    }

    fn items_mut(&mut self) -> &mut Vec<PayKeysendRequest> {
        &mut self.keysends
    }
}

/// Result for one item of a batched payment, paired with the item that produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MultiPayItem<T> {
    pub id: String,
    pub item: T,
    pub result: PayResponse,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MultiPayInvoiceResponse {
    pub invoices: Vec<MultiPayItem<PayInvoiceRequest>>,
    pub errors: Vec<WalletErrorPayload>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MultiPayKeysendResponse {
    pub keysends: Vec<MultiPayItem<PayKeysendRequest>>,
    pub errors: Vec<WalletErrorPayload>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MakeInvoiceRequest {
    /// Millisatoshis.
    pub amount: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

impl Nip47Request for MakeInvoiceRequest {
    type Response = Transaction;

    fn method() -> Method {
        Method::MakeInvoice
    }

    fn check(&self) -> Result<()> {
        if self.amount == 0 {
            return Err(NwcError::InvalidInput("No amount specified".into()));
        }
        Ok(())
    }

    fn validate(&self, response: &Transaction) -> bool {
        response.has_invoice()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MakeHoldInvoiceRequest {
    pub amount: u64,
    pub payment_hash: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_cltv_expiry_delta: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

impl Nip47Request for MakeHoldInvoiceRequest {
    type Response = Transaction;

    fn method() -> Method {
        Method::MakeHoldInvoice
    }

    fn check(&self) -> Result<()> {
        if self.amount == 0 {
            return Err(NwcError::InvalidInput("No amount specified".into()));
        }
        if self.payment_hash.trim().is_empty() {
            return Err(NwcError::InvalidInput("No payment hash specified".into()));
        }
        Ok(())
    }

    fn validate(&self, response: &Transaction) -> bool {
        response.has_invoice()
    }
}

/// Result of methods that return nothing but success.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EmptyResponse {}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SettleHoldInvoiceRequest {
    pub preimage: String,
}

impl Nip47Request for SettleHoldInvoiceRequest {
    type Response = EmptyResponse;

    fn method() -> Method {
        Method::SettleHoldInvoice
    }

    fn check(&self) -> Result<()> {
        if self.preimage.trim().is_empty() {
            return Err(NwcError::InvalidInput("No preimage specified".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CancelHoldInvoiceRequest {
    pub payment_hash: String,
}

impl Nip47Request for CancelHoldInvoiceRequest {
    type Response = EmptyResponse;

    fn method() -> Method {
        Method::CancelHoldInvoice
    }

    fn check(&self) -> Result<()> {
        if self.payment_hash.trim().is_empty() {
            return Err(NwcError::InvalidInput("No payment hash specified".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LookupInvoiceRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invoice: Option<String>,
}

impl LookupInvoiceRequest {
    pub fn by_payment_hash(payment_hash: impl Into<String>) -> Self {
        Self {
            payment_hash: Some(payment_hash.into()),
            invoice: None,
        }
    }

    pub fn by_invoice(invoice: impl Into<String>) -> Self {
        Self {
            payment_hash: None,
            invoice: Some(invoice.into()),
        }
    }
}

impl Nip47Request for LookupInvoiceRequest {
    type Response = Transaction;

    fn method() -> Method {
        Method::LookupInvoice
    }

    fn check(&self) -> Result<()> {
        let present = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.is_empty());
        if !present(&self.payment_hash) && !present(&self.invoice) {
            return Err(NwcError::InvalidInput(
                "payment_hash or invoice is required".into(),
            ));
        }
        Ok(())
    }

    fn validate(&self, response: &Transaction) -> bool {
        response.has_invoice()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ListTransactionsRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub until: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unpaid: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unpaid_outgoing: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unpaid_incoming: Option<bool>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub transaction_type: Option<TransactionType>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ListTransactionsResponse {
    pub transactions: Vec<Transaction>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_count: Option<u64>,
}

impl Nip47Request for ListTransactionsRequest {
    type Response = ListTransactionsResponse;

    fn method() -> Method {
        Method::ListTransactions
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignMessageRequest {
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignMessageResponse {
    pub message: String,
    pub signature: String,
}

impl Nip47Request for SignMessageRequest {
    type Response = SignMessageResponse;

    fn method() -> Method {
        Method::SignMessage
    }

    fn validate(&self, response: &SignMessageResponse) -> bool {
        response.message == self.message && !response.signature.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateConnectionRequest {
    pub pubkey: String,
    pub name: String,
    pub request_methods: Vec<Method>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notification_types: Option<Vec<NotificationType>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_amount: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub budget_renewal: Option<BudgetRenewal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub isolated: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateConnectionResponse {
    pub wallet_pubkey: String,
}

impl Nip47Request for CreateConnectionRequest {
    type Response = CreateConnectionResponse;

    fn method() -> Method {
        Method::CreateConnection
    }

    fn check(&self) -> Result<()> {
        crate::keys::normalize_public_key(&self.pubkey)?;
        if self.request_methods.is_empty() {
            return Err(NwcError::InvalidInput(
                "at least one request method is required".into(),
            ));
        }
        Ok(())
    }

    fn validate(&self, response: &CreateConnectionResponse) -> bool {
        !response.wallet_pubkey.is_empty()
    }
}
