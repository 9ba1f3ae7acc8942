//! The JSON shapes of the merchant-facing API.
//!
//! The webhook endpoints deliberately do not appear here: the vendor speaks form-encoded
//! key/value pairs and is answered with a plaintext status line, never JSON.

use chrono::{DateTime, Utc};
use payment_gateway_engine::{
    bind_request::{BindRequest, BindState, BoundCard},
    channels::{ChannelOptions, PaymentChannel},
    order::{AdditionalInfo, FailedMessage, LineItem, Order, OrderState},
};
use pgw_common::Money;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize)]
pub struct NewOrderPayload {
    pub id: String,
    pub items: Vec<LineItem>,
    pub channel: PaymentChannel,
    #[serde(default)]
    pub options: ChannelOptions,
    #[serde(default)]
    pub description: String,
    pub client_redirect_url: Option<String>,
}

/// The merchant-facing view of an order. The signed form fields never leave through this
/// surface; shoppers receive them via the checkout HTML instead.
#[derive(Debug, Clone, Serialize)]
pub struct OrderResult {
    pub id: String,
    pub state: OrderState,
    pub channel: PaymentChannel,
    pub total_amount: Money,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checkout_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub platform_trade_no: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub additional_info: Option<AdditionalInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed_message: Option<FailedMessage>,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub committed_at: Option<DateTime<Utc>>,
}

impl OrderResult {
    pub fn new(order: &Order, checkout_url: Option<String>) -> Self {
        Self {
            id: order.id().as_str().to_string(),
            state: order.state(),
            channel: order.channel(),
            total_amount: order.total_price(),
            checkout_url,
            platform_trade_no: order.platform_trade_no().map(String::from),
            payment_type: order.payment_type().map(String::from),
            additional_info: order.additional_info().cloned(),
            failed_message: order.failed_message().cloned(),
            created_at: order.created_at(),
            committed_at: order.committed_at(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct BindCardPayload {
    pub member_id: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct BindCardResult {
    /// The full merchant member id (merchant id + member id), as the vendor will echo it back.
    pub member_id: String,
    pub state: BindState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bind_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub card: Option<BoundCard>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed_message: Option<FailedMessage>,
}

impl BindCardResult {
    pub fn new(request: &BindRequest, bind_url: Option<String>) -> Self {
        Self {
            member_id: request.member_id().to_string(),
            state: request.state(),
            bind_url,
            card: request.card().cloned(),
            failed_message: request.failed_message().cloned(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RefundResult {
    pub order_id: String,
    /// `"R"` for a capture reversal, `"N"` for a void.
    pub action: String,
}
