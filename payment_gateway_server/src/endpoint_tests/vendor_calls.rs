//! Endpoints that proxy to the vendor REST API, driven against the mocked client.

use actix_web::{http::StatusCode, test::TestRequest};
use payment_gateway_engine::{
    order::OrderState,
    vendor::{ActionResult, CreditAuthStatus, CreditTradeInfo},
};
use pgw_common::Money;

use super::{
    helpers::{call, credit_order, credit_settlement, gateway_with, signed_form, test_gateway, MERCHANT},
    mocks::MockVendor,
};

#[actix_web::test]
async fn query_endpoint_reports_remote_state() {
    let mut vendor = MockVendor::new();
    let signing_gw = test_gateway();
    let response = signed_form(&signing_gw, vec![
        ("MerchantID", MERCHANT),
        ("MerchantTradeNo", "T1"),
        ("TradeStatus", "1"),
        ("TradeNo", "2404261234567890"),
        ("TradeAmt", "200"),
        ("PaymentType", "Credit_CreditCard"),
        ("ItemName", "Widget 60 x 2#Gadget 80 x 1"),
    ]);
    vendor.expect_query_trade_info().returning(move |_| Ok(response.clone()));
    let gw = gateway_with(vendor);

    let (status, body) = call(&gw, TestRequest::get().uri("/query/T1")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains(r#""state":"Committed""#), "unexpected body: {body}");
    assert!(body.contains(r#""total_amount":200"#), "unexpected body: {body}");
}

#[actix_web::test]
async fn refund_endpoint_reverses_a_closed_capture() {
    let mut vendor = MockVendor::new();
    vendor
        .expect_query_credit_trade()
        .returning(|_| Ok(CreditTradeInfo { status: CreditAuthStatus::Closed, amount: Money::from(200) }));
    vendor.expect_do_action().returning(|_| {
        Ok(ActionResult {
            rtn_code: 1,
            rtn_msg: "OK".to_string(),
            merchant_trade_no: "T1".to_string(),
            trade_no: "2404261234567890".to_string(),
        })
    });
    let gw = gateway_with(vendor);
    gw.prepare_order(credit_order("T1")).unwrap();
    gw.checkout_html("T1");
    let form = credit_settlement(&gw, "T1", "200");
    let (status, _) = call(&gw, TestRequest::post().uri("/callback").set_form(&form)).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = call(&gw, TestRequest::post().uri("/refund/T1")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains(r#""action":"R""#), "unexpected body: {body}");
    assert_eq!(gw.order("T1").unwrap().state(), OrderState::Refunded);
}

#[actix_web::test]
async fn refund_endpoint_rejects_uncommitted_orders() {
    let gw = test_gateway();
    gw.prepare_order(credit_order("T1")).unwrap();
    let (status, body) = call(&gw, TestRequest::post().uri("/refund/T1")).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body.contains("Refund is not available"), "unexpected body: {body}");
}

#[actix_web::test]
async fn member_card_endpoint() {
    let mut vendor = MockVendor::new();
    vendor.expect_query_member_binding().returning(|_| {
        Ok([
            ("Count".to_string(), "1".to_string()),
            ("CardID".to_string(), "147253".to_string()),
            ("Card6No".to_string(), "431195".to_string()),
            ("Card4No".to_string(), "2222".to_string()),
            ("BindingDate".to_string(), "2026/08/29 10:00:00".to_string()),
        ]
        .into_iter()
        .collect())
    });
    let gw = gateway_with(vendor);
    let (status, body) = call(&gw, TestRequest::get().uri("/members/M0001/card")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains(r#""card_id":"147253""#), "unexpected body: {body}");

    let mut vendor = MockVendor::new();
    vendor
        .expect_query_member_binding()
        .returning(|_| Ok([("Count".to_string(), "0".to_string())].into_iter().collect()));
    let gw = gateway_with(vendor);
    let (status, body) = call(&gw, TestRequest::get().uri("/members/M0001/card")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body.contains("No bound card"), "unexpected body: {body}");
}
