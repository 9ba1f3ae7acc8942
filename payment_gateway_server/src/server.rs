use std::time::Duration;

use actix_web::{dev::Server, http::KeepAlive, middleware::Logger, web, App, HttpServer};
use log::info;
use payment_gateway_engine::{
    events::{EventHandlers, EventHooks},
    gateway::Gateway,
    RestVendorApi,
};

use crate::{config::ServerConfig, errors::ServerError, expiry_worker::start_expiry_worker, routes};

/// Build the gateway, start the event handlers and the expiry sweeper, and serve until shutdown.
pub async fn run_server(config: ServerConfig, hooks: EventHooks) -> Result<(), ServerError> {
    let handlers = EventHandlers::new(config.event_buffer_size, hooks);
    let producers = handlers.producers();
    handlers.start_handlers().await;
    let gateway = Gateway::new(config.gateway.clone(), producers)
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let gateway = web::Data::new(gateway);
    let _sweeper = start_expiry_worker(gateway.clone());
    info!("💻️ Accepting checkouts for merchant {}", config.gateway.merchant_id);
    let srv = create_server_instance(config, gateway)?;
    srv.await.map_err(|e| ServerError::Unspecified(e.to_string()))
}

pub fn create_server_instance(
    config: ServerConfig,
    gateway: web::Data<Gateway<RestVendorApi>>,
) -> Result<Server, ServerError> {
    let gateway_config = config.gateway.clone();
    let srv = HttpServer::new(move || {
        let gateway_config = gateway_config.clone();
        App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("pgw::access_log"))
            .app_data(gateway.clone())
            .service(routes::health)
            .configure(move |cfg| routes::register::<RestVendorApi>(cfg, &gateway_config))
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .bind((config.host.as_str(), config.port))?
    .run();
    Ok(srv)
}
