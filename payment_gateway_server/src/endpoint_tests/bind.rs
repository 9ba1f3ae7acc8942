use actix_web::{http::StatusCode, test::TestRequest};
use serde_json::json;

use super::helpers::{call, signed_form, test_gateway, MERCHANT};

#[actix_web::test]
async fn bind_card_flow() {
    let gw = test_gateway();
    let (status, body) = call(
        &gw,
        TestRequest::post().uri("/bind-card").set_json(&json!({"member_id": "M0001"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert!(body.contains(r#""member_id":"2000132M0001""#), "unexpected body: {body}");
    assert!(body.contains("https://shop.example.com/bind-card/2000132M0001"), "unexpected body: {body}");

    let (status, html) = call(&gw, TestRequest::get().uri("/bind-card/2000132M0001")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(html.contains(r#"<form id="pgw-bind-card""#));

    // The binding form is single use.
    let (status, body) = call(&gw, TestRequest::get().uri("/bind-card/2000132M0001")).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body.contains("already been materialized"), "unexpected body: {body}");

    let form = signed_form(&gw, vec![
        ("MerchantID", MERCHANT),
        ("MerchantMemberID", "2000132M0001"),
        ("RtnCode", "1"),
        ("RtnMsg", "OK"),
        ("CardID", "147253"),
        ("Card6No", "431195"),
        ("Card4No", "2222"),
        ("BindingDate", "2026/08/29 10:00:00"),
    ]);
    let (status, body) = call(&gw, TestRequest::post().uri("/bind-card/callback").set_form(&form)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "1|OK");

    let (status, body) = call(&gw, TestRequest::get().uri("/bind-card/2000132M0001/status")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains(r#""state":"Bound""#), "unexpected body: {body}");
    assert!(body.contains(r#""card_id":"147253""#), "unexpected body: {body}");

    // A replayed binding callback finds nothing pending.
    let (status, body) = call(&gw, TestRequest::post().uri("/bind-card/callback").set_form(&form)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, "0|OrderNotFound");
}

#[actix_web::test]
async fn bind_form_for_unknown_member_is_not_found() {
    let gw = test_gateway();
    let (status, _) = call(&gw, TestRequest::get().uri("/bind-card/2000132NOPE")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
