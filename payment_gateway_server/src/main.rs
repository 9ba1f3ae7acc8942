use dotenvy::dotenv;
use log::info;
use payment_gateway_engine::events::EventHooks;
use payment_gateway_server::{cli::handle_command_line_args, config::ServerConfig, server::run_server};

#[actix_web::main]
async fn main() {
    dotenv().ok();
    env_logger::init();
    handle_command_line_args();
    let config = ServerConfig::from_env_or_default();

    let mut hooks = EventHooks::default();
    hooks.on_order_committed(|ev| {
        Box::pin(async move {
            info!("📬️ Order {} committed for {}", ev.order.id(), ev.order.total_price());
        })
    });
    info!("🚀️ Starting server on {}:{}", config.host, config.port);
    match run_server(config, hooks).await {
        Ok(_) => println!("Bye!"),
        Err(e) => eprintln!("{e}"),
    }
}
