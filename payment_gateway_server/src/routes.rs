//! Request handler definitions
//!
//! Define each route and its handler here.
//! Handlers that are more than a line or two MUST go into a separate module. Keep this module
//! neat and tidy 🙏
//!
//! The webhook handlers answer with the vendor's plaintext contract rather than JSON: `1|OK`
//! acknowledges the callback (including authenticated failure reports), `0|CheckSumInvalid` and
//! `0|OrderNotFound` ask the vendor to retry or give up. Everything merchant-facing returns
//! JSON via [`crate::data_objects`].

use std::collections::BTreeMap;

use actix_web::{get, http::header::ContentType, web, HttpResponse, Responder};
use log::*;
use payment_gateway_engine::{
    gateway::{Gateway, NewOrderRequest},
    order::OrderId,
    GatewayConfig,
    GatewayError,
    VendorApi,
};

use crate::{
    data_objects::{BindCardPayload, BindCardResult, NewOrderPayload, OrderResult, RefundResult},
    errors::ServerError,
};

#[get("/health")]
pub async fn health() -> impl Responder {
    trace!("💻️ Received health check request");
    HttpResponse::Ok().body("👍️\n")
}

/// Mount every route except `/health` (which carries its own attribute) under the paths the
/// given configuration advertises to the vendor.
pub fn register<V: VendorApi + 'static>(cfg: &mut web::ServiceConfig, config: &GatewayConfig) {
    cfg.service(web::resource("/order").route(web::post().to(new_order::<V>)))
        .service(web::resource("/order/{id}").route(web::get().to(get_order::<V>)))
        .service(web::resource("/query/{id}").route(web::get().to(query_order::<V>)))
        .service(web::resource("/refund/{id}").route(web::post().to(refund::<V>)))
        .service(web::resource(format!("{}/{{id}}", config.checkout_path)).route(web::get().to(checkout::<V>)))
        .service(web::resource(config.settlement_callback_path.as_str()).route(web::post().to(settlement_callback::<V>)))
        .service(web::resource(config.async_info_callback_path.as_str()).route(web::post().to(info_callback::<V>)))
        .service(web::resource(config.bind_callback_path.as_str()).route(web::post().to(bind_callback::<V>)))
        .service(web::resource(config.bind_checkout_path.as_str()).route(web::post().to(bind_card::<V>)))
        .service(
            web::resource(format!("{}/{{member_id}}", config.bind_checkout_path))
                .route(web::get().to(bind_form::<V>)),
        )
        .service(
            web::resource(format!("{}/{{member_id}}/status", config.bind_checkout_path))
                .route(web::get().to(bind_status::<V>)),
        )
        .service(web::resource("/members/{member_id}/card").route(web::get().to(member_card::<V>)));
}

fn checkout_url(config: &GatewayConfig, id: &str) -> String {
    format!("{}{}/{id}", config.public_url.trim_end_matches('/'), config.checkout_path)
}

fn bind_url(config: &GatewayConfig, member_id: &str) -> String {
    format!("{}{}/{member_id}", config.public_url.trim_end_matches('/'), config.bind_checkout_path)
}

//--------------------------------------  Merchant routes  -----------------------------------------------------------

pub async fn new_order<V: VendorApi + 'static>(
    gateway: web::Data<Gateway<V>>,
    payload: web::Json<NewOrderPayload>,
) -> Result<HttpResponse, ServerError> {
    let payload = payload.into_inner();
    debug!("💻️ New order request {}", payload.id);
    let request = NewOrderRequest {
        id: OrderId(payload.id),
        items: payload.items,
        channel: payload.channel,
        options: payload.options,
        description: payload.description,
        client_redirect_url: payload.client_redirect_url,
    };
    let order = gateway.prepare_order(request)?;
    let url = checkout_url(gateway.config(), order.id().as_str());
    Ok(HttpResponse::Created().json(OrderResult::new(&order, Some(url))))
}

pub async fn get_order<V: VendorApi + 'static>(
    gateway: web::Data<Gateway<V>>,
    path: web::Path<String>,
) -> Result<HttpResponse, ServerError> {
    let id = path.into_inner();
    let order = gateway.order(&id).ok_or(GatewayError::OrderNotFound(id))?;
    Ok(HttpResponse::Ok().json(OrderResult::new(&order, None)))
}

pub async fn checkout<V: VendorApi + 'static>(
    gateway: web::Data<Gateway<V>>,
    path: web::Path<String>,
) -> Result<HttpResponse, ServerError> {
    let id = path.into_inner();
    debug!("💻️ Serving checkout form for order {id}");
    let html = gateway.checkout_html(&id).ok_or(GatewayError::OrderNotFound(id))?;
    Ok(HttpResponse::Ok().content_type(ContentType::html()).body(html))
}

pub async fn query_order<V: VendorApi + 'static>(
    gateway: web::Data<Gateway<V>>,
    path: web::Path<String>,
) -> Result<HttpResponse, ServerError> {
    let id = path.into_inner();
    debug!("💻️ Reconciling order {id} against the vendor");
    let order = gateway.query_order(&id).await?;
    Ok(HttpResponse::Ok().json(OrderResult::new(&order, None)))
}

pub async fn refund<V: VendorApi + 'static>(
    gateway: web::Data<Gateway<V>>,
    path: web::Path<String>,
) -> Result<HttpResponse, ServerError> {
    let id = path.into_inner();
    info!("💻️ Refund requested for order {id}");
    let action = gateway.refund(&id).await?;
    Ok(HttpResponse::Ok().json(RefundResult { order_id: id, action: action.wire_code().to_string() }))
}

//--------------------------------------  Card binding  --------------------------------------------------------------

pub async fn bind_card<V: VendorApi + 'static>(
    gateway: web::Data<Gateway<V>>,
    payload: web::Json<BindCardPayload>,
) -> Result<HttpResponse, ServerError> {
    let request = gateway.prepare_bind(&payload.member_id)?;
    let url = bind_url(gateway.config(), request.member_id());
    Ok(HttpResponse::Created().json(BindCardResult::new(&request, Some(url))))
}

pub async fn bind_form<V: VendorApi + 'static>(
    gateway: web::Data<Gateway<V>>,
    path: web::Path<String>,
) -> Result<HttpResponse, ServerError> {
    let member_id = path.into_inner();
    debug!("💻️ Serving card binding form for {member_id}");
    let html = gateway
        .bind_form_html(&member_id)
        .ok_or(GatewayError::OrderNotFound(member_id))?
        .map_err(GatewayError::from)?;
    Ok(HttpResponse::Ok().content_type(ContentType::html()).body(html))
}

pub async fn bind_status<V: VendorApi + 'static>(
    gateway: web::Data<Gateway<V>>,
    path: web::Path<String>,
) -> Result<HttpResponse, ServerError> {
    let member_id = path.into_inner();
    let request = gateway.bind_request(&member_id).ok_or(GatewayError::OrderNotFound(member_id))?;
    Ok(HttpResponse::Ok().json(BindCardResult::new(&request, None)))
}

pub async fn member_card<V: VendorApi + 'static>(
    gateway: web::Data<Gateway<V>>,
    path: web::Path<String>,
) -> Result<HttpResponse, ServerError> {
    let member_id = path.into_inner();
    let card = gateway.query_bound_card(&member_id).await?;
    Ok(HttpResponse::Ok().json(card))
}

//--------------------------------------  Vendor webhooks  -----------------------------------------------------------

pub async fn settlement_callback<V: VendorApi + 'static>(
    gateway: web::Data<Gateway<V>>,
    form: web::Form<BTreeMap<String, String>>,
) -> HttpResponse {
    trace!("📥️ Settlement callback received");
    match gateway.handle_settlement(form.into_inner()).await {
        Ok(()) => HttpResponse::Ok().body("1|OK"),
        Err(rejection) => HttpResponse::BadRequest().body(format!("0|{rejection}")),
    }
}

pub async fn info_callback<V: VendorApi + 'static>(
    gateway: web::Data<Gateway<V>>,
    form: web::Form<BTreeMap<String, String>>,
) -> HttpResponse {
    trace!("📥️ Payment info callback received");
    match gateway.handle_async_info(form.into_inner()).await {
        Ok(()) => HttpResponse::Ok().body("1|OK"),
        Err(rejection) => HttpResponse::BadRequest().body(format!("0|{rejection}")),
    }
}

pub async fn bind_callback<V: VendorApi + 'static>(
    gateway: web::Data<Gateway<V>>,
    form: web::Form<BTreeMap<String, String>>,
) -> HttpResponse {
    trace!("📥️ Card binding callback received");
    match gateway.handle_bind_callback(form.into_inner()).await {
        Ok(()) => HttpResponse::Ok().body("1|OK"),
        Err(rejection) => HttpResponse::BadRequest().body(format!("0|{rejection}")),
    }
}
