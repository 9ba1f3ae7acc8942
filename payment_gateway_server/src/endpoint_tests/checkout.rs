use actix_web::{http::StatusCode, test::TestRequest};
use serde_json::json;

use super::helpers::{call, test_gateway};

#[actix_web::test]
async fn health_check() {
    let gw = test_gateway();
    let (status, body) = call(&gw, TestRequest::get().uri("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "👍️\n");
}

#[actix_web::test]
async fn create_order_and_serve_checkout_form() {
    let gw = test_gateway();
    let payload = json!({
        "id": "T1001",
        "items": [
            {"name": "Widget", "unit_price": 60, "quantity": 2},
            {"name": "Gadget", "unit_price": 80, "quantity": 1}
        ],
        "channel": "CreditCard",
        "description": "Test order"
    });
    let (status, body) = call(&gw, TestRequest::post().uri("/order").set_json(&payload)).await;
    assert_eq!(status, StatusCode::CREATED);
    assert!(body.contains(r#""state":"Inited""#), "unexpected body: {body}");
    assert!(body.contains(r#""total_amount":200"#), "unexpected body: {body}");
    assert!(body.contains("https://shop.example.com/checkout/T1001"), "unexpected body: {body}");

    let (status, html) = call(&gw, TestRequest::get().uri("/checkout/T1001")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(html.contains(r#"<form id="pgw-checkout""#));
    assert!(html.contains(r#"name="MerchantTradeNo" value="T1001""#));
    assert!(html.contains(r#"name="CheckMacValue""#));

    let (status, body) = call(&gw, TestRequest::get().uri("/order/T1001")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains(r#""state":"PreCommit""#), "unexpected body: {body}");
}

#[actix_web::test]
async fn unknown_checkout_is_not_found() {
    let gw = test_gateway();
    let (status, body) = call(&gw, TestRequest::get().uri("/checkout/NOPE")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body.contains("was not found"), "unexpected body: {body}");
}

#[actix_web::test]
async fn amount_bounds_are_enforced_at_the_edge() {
    let gw = test_gateway();
    // NT$4 is below the credit card minimum of NT$5.
    let payload = json!({
        "id": "T1002",
        "items": [{"name": "Sticker", "unit_price": 4, "quantity": 1}],
        "channel": "CreditCard",
        "description": "Test order"
    });
    let (status, body) = call(&gw, TestRequest::post().uri("/order").set_json(&payload)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("bounds"), "unexpected body: {body}");
}

#[actix_web::test]
async fn duplicate_order_id_is_a_conflict() {
    let gw = test_gateway();
    let payload = json!({
        "id": "T1003",
        "items": [{"name": "Widget", "unit_price": 100, "quantity": 1}],
        "channel": "CreditCard",
        "description": "Test order"
    });
    let (status, _) = call(&gw, TestRequest::post().uri("/order").set_json(&payload)).await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, body) = call(&gw, TestRequest::post().uri("/order").set_json(&payload)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body.contains("already pending"), "unexpected body: {body}");
}
