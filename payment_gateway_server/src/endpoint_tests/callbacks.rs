use actix_web::{http::StatusCode, test::TestRequest};
use payment_gateway_engine::order::OrderState;

use super::helpers::{call, credit_order, credit_settlement, signed_form, test_gateway, MERCHANT};

#[actix_web::test]
async fn settlement_is_acknowledged_once() {
    let gw = test_gateway();
    gw.prepare_order(credit_order("T1")).unwrap();
    gw.checkout_html("T1");
    let form = credit_settlement(&gw, "T1", "200");

    let (status, body) = call(&gw, TestRequest::post().uri("/callback").set_form(&form)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "1|OK");
    assert_eq!(gw.order("T1").unwrap().state(), OrderState::Committed);

    // The vendor retries with the identical payload; the order must not move.
    let (status, body) = call(&gw, TestRequest::post().uri("/callback").set_form(&form)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, "0|OrderNotFound");
    assert_eq!(gw.order("T1").unwrap().state(), OrderState::Committed);
}

#[actix_web::test]
async fn tampered_settlement_is_rejected() {
    let gw = test_gateway();
    gw.prepare_order(credit_order("T1")).unwrap();
    gw.checkout_html("T1");
    let mut form = credit_settlement(&gw, "T1", "200");
    form.insert("TradeAmt".to_string(), "1".to_string());

    let (status, body) = call(&gw, TestRequest::post().uri("/callback").set_form(&form)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, "0|CheckSumInvalid");
    assert_eq!(gw.order("T1").unwrap().state(), OrderState::PreCommit);
}

#[actix_web::test]
async fn settlement_for_unknown_order_is_rejected() {
    let gw = test_gateway();
    let form = credit_settlement(&gw, "GHOST", "200");
    let (status, body) = call(&gw, TestRequest::post().uri("/callback").set_form(&form)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, "0|OrderNotFound");
}

#[actix_web::test]
async fn authenticated_failure_report_is_acknowledged() {
    let gw = test_gateway();
    gw.prepare_order(credit_order("T1")).unwrap();
    gw.checkout_html("T1");
    let form = signed_form(&gw, vec![
        ("MerchantID", MERCHANT),
        ("MerchantTradeNo", "T1"),
        ("RtnCode", "10100058"),
        ("RtnMsg", "付款失敗"),
        ("TradeNo", "2404261234567890"),
        ("TradeAmt", "200"),
        ("PaymentType", "Credit_CreditCard"),
    ]);
    // A failure the vendor reports is still a valid callback; acknowledge so it stops retrying.
    let (status, body) = call(&gw, TestRequest::post().uri("/callback").set_form(&form)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "1|OK");
    assert_eq!(gw.order("T1").unwrap().state(), OrderState::Failed);
}

fn atm_payload(id: &str) -> serde_json::Value {
    serde_json::json!({
        "id": id,
        "items": [{"name": "Widget", "unit_price": 500, "quantity": 1}],
        "channel": "VirtualAccount",
        "description": "Test order"
    })
}

#[actix_web::test]
async fn info_callback_flow_with_duplicate() {
    let gw = test_gateway();
    let (status, _) = call(&gw, TestRequest::post().uri("/order").set_json(&atm_payload("A1"))).await;
    assert_eq!(status, StatusCode::CREATED);
    call(&gw, TestRequest::get().uri("/checkout/A1")).await;

    let form = signed_form(&gw, vec![
        ("MerchantID", MERCHANT),
        ("MerchantTradeNo", "A1"),
        ("RtnCode", "2"),
        ("RtnMsg", "Get VirtualAccount Succeeded"),
        ("TradeNo", "2404269999999999"),
        ("TradeAmt", "500"),
        ("PaymentType", "ATM_LAND"),
        ("BankCode", "812"),
        ("vAccount", "9103522175887271"),
        ("ExpireDate", "2026/09/01"),
    ]);
    let (status, body) = call(&gw, TestRequest::post().uri("/async-informations").set_form(&form)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "1|OK");
    assert_eq!(gw.order("A1").unwrap().state(), OrderState::AsyncInfoRetrieved);

    // A duplicate info callback is ignored but still acknowledged.
    let (status, body) = call(&gw, TestRequest::post().uri("/async-informations").set_form(&form)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "1|OK");

    let (status, body) = call(&gw, TestRequest::get().uri("/order/A1")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("9103522175887271"), "unexpected body: {body}");
}
