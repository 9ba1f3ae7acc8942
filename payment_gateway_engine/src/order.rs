//! The order entity and its state machine.
//!
//! An order advances `Inited → PreCommit → {Committed | AsyncInfoRetrieved | Failed}`,
//! `AsyncInfoRetrieved → {Committed | Failed}` and `Committed → Refunded` (credit card only).
//! All transitions are explicit methods; the identity fields and total price are fixed at
//! construction.

use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
use pgw_common::Money;
use serde::{Deserialize, Serialize};

use crate::{channels::PaymentChannel, errors::OrderError};

//--------------------------------------      OrderId        ---------------------------------------------------------

/// The merchant trade number: the vendor-visible, merchant-assigned order identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrderId(pub String);

impl FromStr for OrderId {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.to_string()))
    }
}

impl From<String> for OrderId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl Display for OrderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl OrderId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

//--------------------------------------      LineItem       ---------------------------------------------------------

/// A single checkout line. Immutable after the order is created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub name: String,
    pub unit_price: Money,
    pub quantity: u32,
}

impl LineItem {
    pub fn new<S: Into<String>>(name: S, unit_price: Money, quantity: u32) -> Self {
        Self { name: name.into(), unit_price, quantity }
    }

    pub fn subtotal(&self) -> Money {
        self.unit_price * self.quantity
    }
}

//--------------------------------------     OrderState      ---------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderState {
    /// Created, but the checkout form has not been served yet.
    Inited,
    /// The signed form has been materialized; the vendor may call back at any moment.
    PreCommit,
    /// A two-phase channel has delivered its payment details; settlement is still outstanding.
    AsyncInfoRetrieved,
    /// Settlement confirmed. Terminal except for credit card refunds.
    Committed,
    /// The vendor reported a non-success return code. Terminal.
    Failed,
    /// A committed credit card order that has been voided or reversed. Terminal.
    Refunded,
}

impl Display for OrderState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderState::Inited => write!(f, "Inited"),
            OrderState::PreCommit => write!(f, "PreCommit"),
            OrderState::AsyncInfoRetrieved => write!(f, "AsyncInfoRetrieved"),
            OrderState::Committed => write!(f, "Committed"),
            OrderState::Failed => write!(f, "Failed"),
            OrderState::Refunded => write!(f, "Refunded"),
        }
    }
}

impl FromStr for OrderState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Inited" => Ok(Self::Inited),
            "PreCommit" => Ok(Self::PreCommit),
            "AsyncInfoRetrieved" => Ok(Self::AsyncInfoRetrieved),
            "Committed" => Ok(Self::Committed),
            "Failed" => Ok(Self::Failed),
            "Refunded" => Ok(Self::Refunded),
            s => Err(format!("Invalid order state: {s}")),
        }
    }
}

//--------------------------------------   AdditionalInfo    ---------------------------------------------------------

/// Channel-specific settlement details, set at most once per order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AdditionalInfo {
    CreditCard {
        card_last4: String,
        card_first6: String,
        eci: i64,
        auth_code: String,
        /// The vendor's authorization reference. Required before a refund can be issued.
        gwsr: String,
        process_date: String,
    },
    VirtualAccount {
        bank_code: String,
        virtual_account: String,
        expire_date: String,
    },
    CvsKiosk {
        payment_no: String,
        expire_date: String,
    },
    CvsBarcode {
        barcode1: String,
        barcode2: String,
        barcode3: String,
        expire_date: String,
    },
    WebAtm {
        bank_code: String,
    },
    ApplePay {
        auth_code: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedMessage {
    pub code: i64,
    pub message: String,
}

//--------------------------------------  Callback payloads  ---------------------------------------------------------

/// The parsed, authenticated content of a settlement callback.
#[derive(Debug, Clone)]
pub struct Settlement {
    pub merchant_id: String,
    pub order_id: OrderId,
    pub total_amount: Money,
    pub platform_trade_no: String,
    pub payment_type: String,
    pub additional_info: AdditionalInfo,
}

/// The parsed, authenticated content of an info-retrieval callback (two-phase channels).
#[derive(Debug, Clone)]
pub struct AsyncInfo {
    pub channel: PaymentChannel,
    pub platform_trade_no: String,
    pub additional_info: AdditionalInfo,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InfoOutcome {
    Retrieved,
    /// A second info callback for an order that already holds its payment details. The payload
    /// is ignored; the first callback wins.
    AlreadyRetrieved,
}

//--------------------------------------        Order        ---------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    id: OrderId,
    merchant_id: String,
    items: Vec<LineItem>,
    channel: PaymentChannel,
    state: OrderState,
    form_fields: Vec<(String, String)>,
    action_url: String,
    created_at: DateTime<Utc>,
    committed_at: Option<DateTime<Utc>>,
    platform_trade_no: Option<String>,
    payment_type: Option<String>,
    additional_info: Option<AdditionalInfo>,
    failed_message: Option<FailedMessage>,
}

impl Order {
    pub(crate) fn new(
        id: OrderId,
        merchant_id: String,
        items: Vec<LineItem>,
        channel: PaymentChannel,
        form_fields: Vec<(String, String)>,
        action_url: String,
    ) -> Self {
        Self {
            id,
            merchant_id,
            items,
            channel,
            state: OrderState::Inited,
            form_fields,
            action_url,
            created_at: Utc::now(),
            committed_at: None,
            platform_trade_no: None,
            payment_type: None,
            additional_info: None,
            failed_message: None,
        }
    }

    /// Rebuild an order from a vendor query response. The resulting order never enters the
    /// pending store; it exists so reconciliation callers get the same shape back.
    pub(crate) fn reconstruct(
        id: OrderId,
        merchant_id: String,
        items: Vec<LineItem>,
        channel: PaymentChannel,
        state: OrderState,
        platform_trade_no: Option<String>,
        payment_type: Option<String>,
        failed_message: Option<FailedMessage>,
    ) -> Self {
        Self {
            id,
            merchant_id,
            items,
            channel,
            state,
            form_fields: Vec::new(),
            action_url: String::new(),
            created_at: Utc::now(),
            committed_at: None,
            platform_trade_no,
            payment_type,
            additional_info: None,
            failed_message,
        }
    }

    pub fn id(&self) -> &OrderId {
        &self.id
    }

    pub fn merchant_id(&self) -> &str {
        &self.merchant_id
    }

    pub fn items(&self) -> &[LineItem] {
        &self.items
    }

    pub fn channel(&self) -> PaymentChannel {
        self.channel
    }

    pub fn state(&self) -> OrderState {
        self.state
    }

    pub fn form_fields(&self) -> &[(String, String)] {
        &self.form_fields
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn committed_at(&self) -> Option<DateTime<Utc>> {
        self.committed_at
    }

    pub fn platform_trade_no(&self) -> Option<&str> {
        self.platform_trade_no.as_deref()
    }

    pub fn payment_type(&self) -> Option<&str> {
        self.payment_type.as_deref()
    }

    pub fn additional_info(&self) -> Option<&AdditionalInfo> {
        self.additional_info.as_ref()
    }

    pub fn failed_message(&self) -> Option<&FailedMessage> {
        self.failed_message.as_ref()
    }

    /// The sum of `unit_price × quantity` over all line items. Fixed at construction.
    pub fn total_price(&self) -> Money {
        self.items.iter().map(LineItem::subtotal).sum()
    }

    /// An order is commitable while it is waiting for a settlement callback.
    pub fn commitable(&self) -> bool {
        matches!(self.state, OrderState::PreCommit | OrderState::AsyncInfoRetrieved)
    }

    /// Render the self-submitting checkout form. The first materialization advances the order
    /// from `Inited` to `PreCommit`; repeated calls re-render and keep `PreCommit`.
    pub fn materialize(&mut self) -> Result<String, OrderError> {
        match self.state {
            OrderState::Inited => self.state = OrderState::PreCommit,
            OrderState::PreCommit => {},
            s => return Err(OrderError::InvalidState(s)),
        }
        Ok(render_form("pgw-checkout", &self.action_url, &self.form_fields))
    }

    /// Settle the order. Requires an exact match on order id, merchant id and total amount;
    /// any mismatch is a hard error and leaves the order untouched.
    pub fn commit(&mut self, settlement: Settlement) -> Result<(), OrderError> {
        if !self.commitable() {
            return Err(OrderError::InvalidState(self.state));
        }
        if settlement.order_id != self.id {
            return Err(OrderError::SettlementMismatch(format!(
                "order id {} != {}",
                settlement.order_id, self.id
            )));
        }
        if settlement.merchant_id != self.merchant_id {
            return Err(OrderError::SettlementMismatch(format!(
                "merchant id {} != {}",
                settlement.merchant_id, self.merchant_id
            )));
        }
        if settlement.total_amount != self.total_price() {
            return Err(OrderError::SettlementMismatch(format!(
                "total amount {} != {}",
                settlement.total_amount,
                self.total_price()
            )));
        }
        self.platform_trade_no = Some(settlement.platform_trade_no);
        self.payment_type = Some(settlement.payment_type);
        // Two-phase channels already hold their info from the retrieval phase; keep it.
        if self.additional_info.is_none() {
            self.additional_info = Some(settlement.additional_info);
        }
        self.committed_at = Some(Utc::now());
        self.state = OrderState::Committed;
        Ok(())
    }

    /// Record the payment details delivered by a two-phase channel. The first successful
    /// callback wins; a repeat while already `AsyncInfoRetrieved` is ignored.
    pub fn retrieve_info(&mut self, info: AsyncInfo) -> Result<InfoOutcome, OrderError> {
        if info.channel != self.channel {
            return Err(OrderError::ChannelMismatch(info.channel));
        }
        match self.state {
            OrderState::AsyncInfoRetrieved => Ok(InfoOutcome::AlreadyRetrieved),
            OrderState::PreCommit => {
                self.platform_trade_no = Some(info.platform_trade_no);
                self.additional_info = Some(info.additional_info);
                self.state = OrderState::AsyncInfoRetrieved;
                Ok(InfoOutcome::Retrieved)
            },
            s => Err(OrderError::InvalidState(s)),
        }
    }

    /// Record a vendor failure code. Terminal; no further transitions are accepted.
    pub fn fail(&mut self, code: i64, message: String) -> Result<(), OrderError> {
        if !self.commitable() {
            return Err(OrderError::InvalidState(self.state));
        }
        self.failed_message = Some(FailedMessage { code, message });
        self.state = OrderState::Failed;
        Ok(())
    }

    /// `Committed → Refunded`. The gateway guards the channel and authorization checks; this
    /// only enforces the state transition.
    pub fn mark_refunded(&mut self) -> Result<(), OrderError> {
        if self.state != OrderState::Committed {
            return Err(OrderError::InvalidState(self.state));
        }
        self.state = OrderState::Refunded;
        Ok(())
    }
}

//--------------------------------------    Form rendering   ---------------------------------------------------------

pub(crate) fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;").replace('"', "&quot;")
}

/// Render a self-submitting HTML document POSTing `fields` to `action`.
pub(crate) fn render_form(form_id: &str, action: &str, fields: &[(String, String)]) -> String {
    let inputs = fields
        .iter()
        .map(|(k, v)| {
            format!(r#"    <input type="hidden" name="{}" value="{}"/>"#, html_escape(k), html_escape(v))
        })
        .collect::<Vec<_>>()
        .join("\n");
    format!(
        "<!DOCTYPE html>\n<html>\n<head><meta charset=\"utf-8\"></head>\n<body>\n  <form id=\"{form_id}\" \
         action=\"{}\" method=\"post\">\n{inputs}\n  </form>\n  \
         <script>document.getElementById(\"{form_id}\").submit();</script>\n</body>\n</html>\n",
        html_escape(action)
    )
}
