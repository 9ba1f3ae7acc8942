use std::{env, time::Duration};

use log::*;
use payment_gateway_engine::GatewayConfig;
use pgw_common::Secret;

const DEFAULT_PGW_HOST: &str = "127.0.0.1";
const DEFAULT_PGW_PORT: u16 = 8470;
const DEFAULT_EVENT_BUFFER_SIZE: usize = 25;

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Buffer size of each event channel before publishers start applying backpressure.
    pub event_buffer_size: usize,
    pub gateway: GatewayConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_PGW_HOST.to_string(),
            port: DEFAULT_PGW_PORT,
            event_buffer_size: DEFAULT_EVENT_BUFFER_SIZE,
            gateway: GatewayConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self { host: host.to_string(), port, ..Default::default() }
    }

    pub fn from_env_or_default() -> Self {
        let defaults = GatewayConfig::default();
        let host = env::var("PGW_HOST").ok().unwrap_or_else(|| DEFAULT_PGW_HOST.into());
        let port = env::var("PGW_PORT")
            .map(|s| {
                s.parse::<u16>().unwrap_or_else(|e| {
                    error!(
                        "🪛️ {s} is not a valid port for PGW_PORT. {e} Using the default, {DEFAULT_PGW_PORT}, instead."
                    );
                    DEFAULT_PGW_PORT
                })
            })
            .ok()
            .unwrap_or(DEFAULT_PGW_PORT);
        let merchant_id = env::var("PGW_MERCHANT_ID").ok().unwrap_or_else(|| {
            error!("🪛️ PGW_MERCHANT_ID is not set. Please set it to your vendor-assigned merchant id.");
            String::default()
        });
        let hash_key = Secret::new(env::var("PGW_HASH_KEY").ok().unwrap_or_else(|| {
            error!("🪛️ PGW_HASH_KEY is not set. Webhook authentication cannot work without it.");
            String::default()
        }));
        let hash_iv = Secret::new(env::var("PGW_HASH_IV").ok().unwrap_or_else(|| {
            error!("🪛️ PGW_HASH_IV is not set. Webhook authentication cannot work without it.");
            String::default()
        }));
        let vendor_base_url = env::var("PGW_VENDOR_BASE_URL").ok().unwrap_or_else(|| {
            info!("🪛️ PGW_VENDOR_BASE_URL is not set. Using the staging default, {}.", defaults.vendor_base_url);
            defaults.vendor_base_url.clone()
        });
        let public_url = env::var("PGW_PUBLIC_URL").ok().unwrap_or_else(|| {
            error!(
                "🪛️ PGW_PUBLIC_URL is not set. The vendor cannot reach the callback endpoints without a publicly \
                 resolvable URL. Using {} for now.",
                defaults.public_url
            );
            defaults.public_url.clone()
        });
        let store_ttl = env::var("PGW_STORE_TTL")
            .map_err(|_| {
                info!(
                    "🪛️ PGW_STORE_TTL is not set. Pending entries expire after the default of {}s.",
                    defaults.store_ttl.as_secs()
                )
            })
            .and_then(|s| {
                s.parse::<u64>()
                    .map(Duration::from_secs)
                    .map_err(|e| warn!("🪛️ Invalid configuration value for PGW_STORE_TTL. {e}"))
            })
            .ok()
            .unwrap_or(defaults.store_ttl);
        let event_buffer_size = env::var("PGW_EVENT_BUFFER_SIZE")
            .ok()
            .and_then(|s| s.parse::<usize>().ok())
            .unwrap_or(DEFAULT_EVENT_BUFFER_SIZE);
        let gateway = GatewayConfig {
            merchant_id,
            hash_key,
            hash_iv,
            vendor_base_url,
            public_url,
            store_ttl,
            ..defaults
        };
        Self { host, port, event_buffer_size, gateway }
    }
}
