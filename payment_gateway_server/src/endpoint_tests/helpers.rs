use std::collections::BTreeMap;

use actix_web::{http::StatusCode, test, test::TestRequest, web, App};
use payment_gateway_engine::{
    channels::{ChannelOptions, PaymentChannel},
    events::EventProducers,
    gateway::{Gateway, GatewayConfig, NewOrderRequest},
    order::{LineItem, OrderId},
};
use pgw_common::{Money, Secret};

use crate::{endpoint_tests::mocks::MockVendor, routes};

pub const MERCHANT: &str = "2000132";

// Staging sandbox credentials; these are not secret.
pub fn test_config() -> GatewayConfig {
    GatewayConfig {
        merchant_id: MERCHANT.to_string(),
        hash_key: Secret::new("5294y06JbISpM5x9".to_string()),
        hash_iv: Secret::new("v77hoKGq4kWxNNIS".to_string()),
        public_url: "https://shop.example.com".to_string(),
        ..Default::default()
    }
}

pub fn test_gateway() -> web::Data<Gateway<MockVendor>> {
    gateway_with(MockVendor::new())
}

pub fn gateway_with(vendor: MockVendor) -> web::Data<Gateway<MockVendor>> {
    let _ = env_logger::try_init();
    web::Data::new(Gateway::with_vendor(test_config(), vendor, EventProducers::default()))
}

/// Mount the full route table against the shared gateway and dispatch a single test request.
pub async fn call(gateway: &web::Data<Gateway<MockVendor>>, req: TestRequest) -> (StatusCode, String) {
    let config = test_config();
    let app = App::new()
        .app_data(gateway.clone())
        .service(routes::health)
        .configure(|cfg| routes::register::<MockVendor>(cfg, &config));
    let service = test::init_service(app).await;
    let res = test::call_service(&service, req.to_request()).await;
    let status = res.status();
    let body = test::read_body(res).await;
    (status, String::from_utf8_lossy(&body).into_owned())
}

pub fn signed_form(gateway: &Gateway<MockVendor>, fields: Vec<(&str, &str)>) -> BTreeMap<String, String> {
    let fields = fields.into_iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
    gateway.signer().sign(fields).into_iter().collect()
}

pub fn credit_order(id: &str) -> NewOrderRequest {
    NewOrderRequest {
        id: OrderId(id.to_string()),
        items: vec![LineItem::new("Widget", Money::from(60), 2), LineItem::new("Gadget", Money::from(80), 1)],
        channel: PaymentChannel::CreditCard,
        options: ChannelOptions::default(),
        description: "Test order".to_string(),
        client_redirect_url: None,
    }
}

pub fn credit_settlement(gateway: &Gateway<MockVendor>, id: &str, amount: &str) -> BTreeMap<String, String> {
    signed_form(gateway, vec![
        ("MerchantID", MERCHANT),
        ("MerchantTradeNo", id),
        ("RtnCode", "1"),
        ("RtnMsg", "交易成功"),
        ("TradeNo", "2404261234567890"),
        ("TradeAmt", amount),
        ("PaymentDate", "2026/08/29 10:05:00"),
        ("PaymentType", "Credit_CreditCard"),
        ("card4no", "2222"),
        ("card6no", "431195"),
        ("eci", "0"),
        ("auth_code", "777777"),
        ("gwsr", "11943076"),
        ("process_date", "2026/08/29 10:05:00"),
    ])
}
