//! Gateway orchestration: prepare, query, refund, bind, and the inbound callback dispatch.
//!
//! The gateway owns the pending stores and the signer. Webhook handling is purely local —
//! parse, verify, one store mutation — and never holds a store lock across an await. The only
//! operations that touch the network are `query_order`, `refund` and `query_bound_card`, and
//! those snapshot the store before calling out.

use std::{collections::BTreeMap, fmt::Display, time::Duration};

use chrono::Utc;
use log::*;
use pgw_common::{Money, Secret};

use crate::{
    bind_request::{BindRequest, BoundCard},
    channels::{self, num_field, req_field, CallbackParseError, PaymentChannel, SETTLEMENT_SUCCESS_CODE},
    errors::{CallbackRejection, GatewayError, OrderError, ValidationError},
    events::{CardBoundEvent, EventProducers, InfoRetrievedEvent, OrderCommittedEvent},
    order::{AsyncInfo, FailedMessage, InfoOutcome, LineItem, Order, OrderId, OrderState, Settlement},
    signing::CheckMacSigner,
    store::{PendingStore, DEFAULT_TTL},
    vendor::{CreditAuthStatus, RestVendorApi, VendorApi},
};

const CHECKOUT_SUBMIT_PATH: &str = "/Cashier/AioCheckOut/V5";
const BIND_SUBMIT_PATH: &str = "/MerchantMember/BindingCardID";

//--------------------------------------   GatewayConfig    ----------------------------------------------------------

#[derive(Clone, Debug)]
pub struct GatewayConfig {
    pub merchant_id: String,
    pub hash_key: Secret<String>,
    pub hash_iv: Secret<String>,
    /// Base URL of the vendor's cashier API.
    pub vendor_base_url: String,
    /// The externally reachable base URL of this service, used to build callback URLs.
    pub public_url: String,
    pub checkout_path: String,
    pub settlement_callback_path: String,
    pub async_info_callback_path: String,
    pub bind_checkout_path: String,
    pub bind_callback_path: String,
    /// How long a prepared-but-unsettled entry stays in the store.
    pub store_ttl: Duration,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            merchant_id: String::default(),
            hash_key: Secret::default(),
            hash_iv: Secret::default(),
            vendor_base_url: "https://payment-stage.vendor.example".to_string(),
            public_url: "http://127.0.0.1:8470".to_string(),
            checkout_path: "/checkout".to_string(),
            settlement_callback_path: "/callback".to_string(),
            async_info_callback_path: "/async-informations".to_string(),
            bind_checkout_path: "/bind-card".to_string(),
            bind_callback_path: "/bind-card/callback".to_string(),
            store_ttl: DEFAULT_TTL,
        }
    }
}

//--------------------------------------  Request objects   ----------------------------------------------------------

#[derive(Debug, Clone)]
pub struct NewOrderRequest {
    pub id: OrderId,
    pub items: Vec<LineItem>,
    pub channel: PaymentChannel,
    pub options: channels::ChannelOptions,
    pub description: String,
    pub client_redirect_url: Option<String>,
}

/// Which refund action was issued against the vendor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefundAction {
    /// The capture was closed; a reversal (`"R"`) was issued.
    CaptureReversal,
    /// The authorization was still open; a void (`"N"`) was issued.
    Void,
}

impl RefundAction {
    pub fn wire_code(&self) -> &'static str {
        match self {
            RefundAction::CaptureReversal => "R",
            RefundAction::Void => "N",
        }
    }
}

impl Display for RefundAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.wire_code())
    }
}

//--------------------------------------      Gateway       ----------------------------------------------------------

pub struct Gateway<V> {
    config: GatewayConfig,
    signer: CheckMacSigner,
    vendor: V,
    orders: PendingStore<Order>,
    binds: PendingStore<BindRequest>,
    producers: EventProducers,
}

impl Gateway<RestVendorApi> {
    pub fn new(config: GatewayConfig, producers: EventProducers) -> Result<Self, GatewayError> {
        let vendor = RestVendorApi::new(&config.vendor_base_url)?;
        Ok(Self::with_vendor(config, vendor, producers))
    }
}

impl<V: VendorApi> Gateway<V> {
    pub fn with_vendor(config: GatewayConfig, vendor: V, producers: EventProducers) -> Self {
        let signer = CheckMacSigner::new(config.hash_key.clone(), config.hash_iv.clone());
        let orders = PendingStore::new(config.store_ttl);
        let binds = PendingStore::new(config.store_ttl);
        Self { config, signer, vendor, orders, binds, producers }
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    pub fn signer(&self) -> &CheckMacSigner {
        &self.signer
    }

    /// Snapshot of a pending order, if any.
    pub fn order(&self, id: &str) -> Option<Order> {
        self.orders.get(id)
    }

    /// Snapshot of a pending binding request, keyed by the full merchant member id.
    pub fn bind_request(&self, merchant_member_id: &str) -> Option<BindRequest> {
        self.binds.get(merchant_member_id)
    }

    /// Drop expired entries from both stores. Returns `(orders, bind_requests)` evicted.
    pub fn evict_expired(&self) -> (usize, usize) {
        (self.orders.evict_expired(), self.binds.evict_expired())
    }

    fn callback_url(&self, path: &str) -> String {
        format!("{}{path}", self.config.public_url.trim_end_matches('/'))
    }

    //--------------------------------------    Prepare     ----------------------------------------------------------

    /// Validate and stage a new checkout. Synchronous: validation errors are raised before any
    /// network or store interaction, and nothing leaves the process here.
    pub fn prepare_order(&self, request: NewOrderRequest) -> Result<Order, GatewayError> {
        if request.items.is_empty() {
            return Err(ValidationError::EmptyOrder.into());
        }
        let total: Money = request.items.iter().map(LineItem::subtotal).sum();
        channels::validate(request.channel, total, &request.options)?;
        let now = Utc::now();
        let mut fields = vec![
            ("MerchantID".to_string(), self.config.merchant_id.clone()),
            ("MerchantTradeNo".to_string(), request.id.as_str().to_string()),
            ("MerchantTradeDate".to_string(), now.format("%Y/%m/%d %H:%M:%S").to_string()),
            ("PaymentType".to_string(), "aio".to_string()),
            ("TotalAmount".to_string(), total.value().to_string()),
            ("TradeDesc".to_string(), request.description.clone()),
            ("ItemName".to_string(), item_name(&request.items)),
            ("ReturnURL".to_string(), self.callback_url(&self.config.settlement_callback_path)),
            ("NeedExtraPaidInfo".to_string(), "Y".to_string()),
            ("EncryptType".to_string(), "1".to_string()),
        ];
        if request.channel.two_phase() {
            fields.push(("PaymentInfoURL".to_string(), self.callback_url(&self.config.async_info_callback_path)));
        }
        if let Some(url) = &request.client_redirect_url {
            fields.push(("ClientBackURL".to_string(), url.clone()));
        }
        fields.extend(channels::outbound_fields(request.channel, &request.options));
        let signed = self.signer.sign(fields);
        let action = format!("{}{CHECKOUT_SUBMIT_PATH}", self.config.vendor_base_url.trim_end_matches('/'));
        let order = Order::new(
            request.id.clone(),
            self.config.merchant_id.clone(),
            request.items,
            request.channel,
            signed,
            action,
        );
        self.orders.insert(request.id.as_str().to_string(), order.clone())?;
        debug!("💳️ Order {} prepared on the {} channel for {total}", request.id, request.channel);
        Ok(order)
    }

    /// Serve the self-submitting checkout form for a pending order. The first call advances the
    /// order to `PreCommit`; an unknown, expired or already-settled id yields `None`.
    pub fn checkout_html(&self, id: &str) -> Option<String> {
        self.orders.with_entry(id, |order| order.materialize().ok()).flatten()
    }

    //--------------------------------------    Webhooks    ----------------------------------------------------------

    /// Authenticate and apply a settlement callback.
    ///
    /// The at-most-once guarantee lives here: after MAC verification, the order must still be
    /// commitable or the callback is answered `OrderNotFound` without mutating anything. The
    /// transition itself runs under the store's shard lock; the event is published after the
    /// lock is released.
    pub async fn handle_settlement(&self, fields: BTreeMap<String, String>) -> Result<(), CallbackRejection> {
        if !self.signer.verify(&fields) {
            warn!("📥️ Settlement callback failed MAC verification");
            return Err(CallbackRejection::CheckSumInvalid);
        }
        let id = match fields.get("MerchantTradeNo") {
            Some(id) => id.clone(),
            None => {
                warn!("📥️ Settlement callback carries no MerchantTradeNo");
                return Err(CallbackRejection::OrderNotFound);
            },
        };
        let rtn_code = num_field(&fields, "RtnCode").map_err(|e| {
            warn!("📥️ Settlement callback for {id}: {e}");
            CallbackRejection::OrderNotFound
        })?;
        let rtn_msg = fields.get("RtnMsg").cloned().unwrap_or_default();
        let committed = self
            .orders
            .with_entry(&id, |order| -> Result<Option<Order>, CallbackRejection> {
                if !order.commitable() {
                    debug!("📥️ Order {id} is not commitable ({}); dropping duplicate or late callback", order.state());
                    return Err(CallbackRejection::OrderNotFound);
                }
                if rtn_code != SETTLEMENT_SUCCESS_CODE {
                    info!("📥️ Settlement for order {id} reports failure {rtn_code}: {rtn_msg}");
                    order.fail(rtn_code, rtn_msg.clone()).map_err(|_| CallbackRejection::OrderNotFound)?;
                    return Ok(None);
                }
                let settlement = build_settlement(order.channel(), &fields).map_err(|e| {
                    warn!("📥️ Could not parse settlement callback for {id}: {e}");
                    CallbackRejection::OrderNotFound
                })?;
                order.commit(settlement).map_err(|e| {
                    error!("📥️ Settlement for order {id} rejected: {e}");
                    CallbackRejection::OrderNotFound
                })?;
                info!("📥️ Order {id} committed");
                Ok(Some(order.clone()))
            })
            .ok_or(CallbackRejection::OrderNotFound)??;
        if let Some(order) = committed {
            let event = OrderCommittedEvent::new(order);
            for producer in &self.producers.order_committed {
                producer.publish_event(event.clone()).await;
            }
        }
        Ok(())
    }

    /// Authenticate and apply an info-retrieval callback (two-phase channels).
    ///
    /// The callback's channel must match the channel the order was prepared for; a mismatch is
    /// answered `OrderNotFound`, never accepted as a different channel. A second successful
    /// info callback is ignored — the first one wins.
    pub async fn handle_async_info(&self, fields: BTreeMap<String, String>) -> Result<(), CallbackRejection> {
        if !self.signer.verify(&fields) {
            warn!("📥️ Info callback failed MAC verification");
            return Err(CallbackRejection::CheckSumInvalid);
        }
        let id = match fields.get("MerchantTradeNo") {
            Some(id) => id.clone(),
            None => {
                warn!("📥️ Info callback carries no MerchantTradeNo");
                return Err(CallbackRejection::OrderNotFound);
            },
        };
        let payment_type = fields.get("PaymentType").cloned().unwrap_or_default();
        let callback_channel = PaymentChannel::from_payment_type(&payment_type);
        let rtn_code = num_field(&fields, "RtnCode").map_err(|e| {
            warn!("📥️ Info callback for {id}: {e}");
            CallbackRejection::OrderNotFound
        })?;
        let rtn_msg = fields.get("RtnMsg").cloned().unwrap_or_default();
        let retrieved = self
            .orders
            .with_entry(&id, |order| -> Result<Option<Order>, CallbackRejection> {
                if !order.commitable() {
                    debug!("📥️ Order {id} is not commitable ({}); dropping info callback", order.state());
                    return Err(CallbackRejection::OrderNotFound);
                }
                let channel = match callback_channel {
                    Some(c) if c == order.channel() && c.two_phase() => c,
                    _ => {
                        warn!("📥️ Info callback payment type {payment_type} does not match order {id}");
                        return Err(CallbackRejection::OrderNotFound);
                    },
                };
                if channel.info_success_code() != Some(rtn_code) {
                    info!("📥️ Info retrieval for order {id} reports failure {rtn_code}: {rtn_msg}");
                    order.fail(rtn_code, rtn_msg.clone()).map_err(|_| CallbackRejection::OrderNotFound)?;
                    return Ok(None);
                }
                let additional_info = channels::parse_async_info(channel, &fields).map_err(|e| {
                    warn!("📥️ Could not parse info callback for {id}: {e}");
                    CallbackRejection::OrderNotFound
                })?;
                let info = AsyncInfo {
                    channel,
                    platform_trade_no: fields.get("TradeNo").cloned().unwrap_or_default(),
                    additional_info,
                };
                match order.retrieve_info(info).map_err(|e| {
                    warn!("📥️ Info callback for {id} rejected: {e}");
                    CallbackRejection::OrderNotFound
                })? {
                    InfoOutcome::Retrieved => {
                        info!("📥️ Payment details retrieved for order {id}");
                        Ok(Some(order.clone()))
                    },
                    InfoOutcome::AlreadyRetrieved => {
                        debug!("📥️ Order {id} already holds its payment details; later payload ignored");
                        Ok(None)
                    },
                }
            })
            .ok_or(CallbackRejection::OrderNotFound)??;
        if let Some(order) = retrieved {
            let event = InfoRetrievedEvent::new(order);
            for producer in &self.producers.info_retrieved {
                producer.publish_event(event.clone()).await;
            }
        }
        Ok(())
    }

    /// Authenticate and apply a card-binding callback.
    pub async fn handle_bind_callback(&self, fields: BTreeMap<String, String>) -> Result<(), CallbackRejection> {
        if !self.signer.verify(&fields) {
            warn!("📥️ Binding callback failed MAC verification");
            return Err(CallbackRejection::CheckSumInvalid);
        }
        let member_key = match fields.get("MerchantMemberID") {
            Some(id) => id.clone(),
            None => {
                warn!("📥️ Binding callback carries no MerchantMemberID");
                return Err(CallbackRejection::OrderNotFound);
            },
        };
        let rtn_code = num_field(&fields, "RtnCode").map_err(|e| {
            warn!("📥️ Binding callback for {member_key}: {e}");
            CallbackRejection::OrderNotFound
        })?;
        let rtn_msg = fields.get("RtnMsg").cloned().unwrap_or_default();
        let bound = self
            .binds
            .with_entry(&member_key, |request| -> Result<Option<BindRequest>, CallbackRejection> {
                if !request.pending() {
                    debug!("📥️ Binding request {member_key} is not pending; dropping callback");
                    return Err(CallbackRejection::OrderNotFound);
                }
                if rtn_code != SETTLEMENT_SUCCESS_CODE {
                    info!("📥️ Binding for {member_key} reports failure {rtn_code}: {rtn_msg}");
                    request.fail(rtn_code, rtn_msg.clone()).map_err(|_| CallbackRejection::OrderNotFound)?;
                    return Ok(None);
                }
                let card = build_bound_card(&fields).map_err(|e| {
                    warn!("📥️ Could not parse binding callback for {member_key}: {e}");
                    CallbackRejection::OrderNotFound
                })?;
                request.bind(card).map_err(|_| CallbackRejection::OrderNotFound)?;
                info!("📥️ Card bound for {member_key}");
                Ok(Some(request.clone()))
            })
            .ok_or(CallbackRejection::OrderNotFound)??;
        if let Some(request) = bound {
            let event = CardBoundEvent::new(request);
            for producer in &self.producers.card_bound {
                producer.publish_event(event.clone()).await;
            }
        }
        Ok(())
    }

    //--------------------------------------  Vendor calls  ----------------------------------------------------------

    /// Reconcile an order's state with the vendor, bypassing the local store.
    ///
    /// The status mapping is policy, not protocol: `0` is pre-commit, `1` is committed, the
    /// vendor's documented failure code maps to failed, and anything unrecognized folds into
    /// `Inited` as a "not yet started" bucket.
    pub async fn query_order(&self, id: &str) -> Result<Order, GatewayError> {
        let fields = self.signer.sign(vec![
            ("MerchantID".to_string(), self.config.merchant_id.clone()),
            ("MerchantTradeNo".to_string(), id.to_string()),
            ("TimeStamp".to_string(), Utc::now().timestamp().to_string()),
        ]);
        let response = self.vendor.query_trade_info(fields).await?;
        if !self.signer.verify(&response) {
            return Err(GatewayError::RemoteChecksumInvalid);
        }
        let status = response.get("TradeStatus").ok_or(GatewayError::MissingField("TradeStatus"))?;
        let state = match status.as_str() {
            "0" => OrderState::PreCommit,
            "1" => OrderState::Committed,
            "10200095" => OrderState::Failed,
            other => {
                warn!("💳️ Unrecognized trade status {other} for order {id}; reporting as Inited");
                OrderState::Inited
            },
        };
        let amount = num_field(&response, "TradeAmt").map_err(|_| GatewayError::MissingField("TradeAmt"))?;
        let payment_type = response.get("PaymentType").cloned();
        let channel = payment_type
            .as_deref()
            .and_then(PaymentChannel::from_payment_type)
            .ok_or_else(|| GatewayError::UnrecognizedField {
                field: "PaymentType",
                value: payment_type.clone().unwrap_or_default(),
            })?;
        let item = LineItem::new(response.get("ItemName").cloned().unwrap_or_default(), Money::from(amount), 1);
        let failed_message = (state == OrderState::Failed)
            .then(|| FailedMessage { code: 10_200_095, message: "Trade failed".to_string() });
        Ok(Order::reconstruct(
            OrderId(id.to_string()),
            self.config.merchant_id.clone(),
            vec![item],
            channel,
            state,
            response.get("TradeNo").cloned(),
            payment_type,
            failed_message,
        ))
    }

    /// Refund a committed credit card order.
    ///
    /// Local guards run first and never touch the network: the order must be a committed credit
    /// card order holding a non-empty authorization reference. Then the remote authorization
    /// status decides the action: a closed capture is reversed (`"R"`), an open authorization
    /// is voided (`"N"`), and anything else is a remote-state error with no action issued.
    pub async fn refund(&self, id: &str) -> Result<RefundAction, GatewayError> {
        let order = self.orders.get(id).ok_or_else(|| GatewayError::OrderNotFound(id.to_string()))?;
        if order.channel() != PaymentChannel::CreditCard {
            return Err(GatewayError::RefundNotAvailable(format!(
                "{} orders cannot be refunded",
                order.channel()
            )));
        }
        if order.state() != OrderState::Committed {
            return Err(GatewayError::RefundNotAvailable(format!("order {id} is {}", order.state())));
        }
        let gwsr = match order.additional_info() {
            Some(crate::order::AdditionalInfo::CreditCard { gwsr, .. }) if !gwsr.is_empty() => gwsr.clone(),
            _ => {
                return Err(GatewayError::RefundNotAvailable(format!(
                    "order {id} has no vendor authorization reference"
                )))
            },
        };
        let trade_no = order.platform_trade_no().unwrap_or_default().to_string();
        let total = order.total_price();
        let query = self.signer.sign(vec![
            ("MerchantID".to_string(), self.config.merchant_id.clone()),
            ("CreditRefundId".to_string(), gwsr),
            ("CreditAmount".to_string(), total.value().to_string()),
        ]);
        let info = self.vendor.query_credit_trade(query).await?;
        let action = match info.status {
            CreditAuthStatus::Closed => RefundAction::CaptureReversal,
            CreditAuthStatus::Authorized => RefundAction::Void,
            status => return Err(GatewayError::RemoteState(status)),
        };
        let fields = self.signer.sign(vec![
            ("MerchantID".to_string(), self.config.merchant_id.clone()),
            ("MerchantTradeNo".to_string(), id.to_string()),
            ("TradeNo".to_string(), trade_no),
            ("Action".to_string(), action.wire_code().to_string()),
            ("TotalAmount".to_string(), total.value().to_string()),
        ]);
        let result = self.vendor.do_action(fields).await?;
        if !result.is_success() {
            return Err(GatewayError::ActionRejected {
                action: action.wire_code(),
                code: result.rtn_code,
                message: result.rtn_msg,
            });
        }
        self.orders
            .with_entry(id, |order| order.mark_refunded())
            .ok_or_else(|| GatewayError::OrderNotFound(id.to_string()))??;
        info!("💳️ Order {id} refunded ({action})");
        Ok(action)
    }

    //--------------------------------------  Card binding  ----------------------------------------------------------

    /// Stage a card-binding request for a member. The store key (and the vendor-visible
    /// `MerchantMemberID`) is the merchant id concatenated with the member id.
    pub fn prepare_bind(&self, member_id: &str) -> Result<BindRequest, GatewayError> {
        let merchant_member_id = format!("{}{member_id}", self.config.merchant_id);
        let fields = vec![
            ("MerchantID".to_string(), self.config.merchant_id.clone()),
            ("MerchantMemberID".to_string(), merchant_member_id.clone()),
            ("ServerReplyURL".to_string(), self.callback_url(&self.config.bind_callback_path)),
        ];
        let signed = self.signer.sign(fields);
        let action = format!("{}{BIND_SUBMIT_PATH}", self.config.vendor_base_url.trim_end_matches('/'));
        let request =
            BindRequest::new(merchant_member_id.clone(), self.config.merchant_id.clone(), signed, action);
        self.binds.insert(merchant_member_id.clone(), request.clone())?;
        debug!("💳️ Binding request prepared for {merchant_member_id}");
        Ok(request)
    }

    /// Serve the binding form. Single-use: the second materialization is an error.
    pub fn bind_form_html(&self, merchant_member_id: &str) -> Option<Result<String, OrderError>> {
        self.binds.with_entry(merchant_member_id, |request| request.materialize())
    }

    /// Look up the card bound to a member at the vendor.
    pub async fn query_bound_card(&self, member_id: &str) -> Result<BoundCard, GatewayError> {
        let merchant_member_id = format!("{}{member_id}", self.config.merchant_id);
        let fields = self.signer.sign(vec![
            ("MerchantID".to_string(), self.config.merchant_id.clone()),
            ("MerchantMemberID".to_string(), merchant_member_id.clone()),
        ]);
        let response = self.vendor.query_member_binding(fields).await?;
        let count = response.get("Count").and_then(|v| v.parse::<u32>().ok()).unwrap_or(0);
        let card_id = response.get("CardID").cloned().unwrap_or_default();
        if count == 0 || card_id.is_empty() {
            return Err(GatewayError::NoCardFound(merchant_member_id));
        }
        Ok(BoundCard {
            card_id,
            card_first6: response.get("Card6No").cloned().unwrap_or_default(),
            card_last4: response.get("Card4No").cloned().unwrap_or_default(),
            binding_date: response.get("BindingDate").cloned().unwrap_or_default(),
        })
    }
}

fn item_name(items: &[LineItem]) -> String {
    items
        .iter()
        .map(|item| format!("{} {} x {}", item.name, item.unit_price.value(), item.quantity))
        .collect::<Vec<_>>()
        .join("#")
}

fn build_settlement(
    channel: PaymentChannel,
    fields: &BTreeMap<String, String>,
) -> Result<Settlement, CallbackParseError> {
    let additional_info = channels::parse_settlement_info(channel, fields)?;
    Ok(Settlement {
        merchant_id: req_field(fields, "MerchantID")?.to_string(),
        order_id: OrderId(req_field(fields, "MerchantTradeNo")?.to_string()),
        total_amount: Money::from(num_field(fields, "TradeAmt")?),
        platform_trade_no: req_field(fields, "TradeNo")?.to_string(),
        payment_type: req_field(fields, "PaymentType")?.to_string(),
        additional_info,
    })
}

fn build_bound_card(fields: &BTreeMap<String, String>) -> Result<BoundCard, CallbackParseError> {
    Ok(BoundCard {
        card_id: req_field(fields, "CardID")?.to_string(),
        card_first6: req_field(fields, "Card6No")?.to_string(),
        card_last4: req_field(fields, "Card4No")?.to_string(),
        binding_date: fields.get("BindingDate").cloned().unwrap_or_default(),
    })
}
