use actix_web::web;
use log::*;
use payment_gateway_engine::{gateway::Gateway, VendorApi};
use tokio::task::JoinHandle;

/// Starts the expiry worker. Do not await the returned JoinHandle, as it will run indefinitely.
///
/// The stores also drop lapsed entries lazily on access; this sweep exists so that abandoned
/// checkouts release memory even when nothing ever touches them again.
pub fn start_expiry_worker<V: VendorApi + 'static>(gateway: web::Data<Gateway<V>>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut timer = tokio::time::interval(std::time::Duration::from_secs(60));
        info!("🕰️ Pending entry expiry worker started");
        loop {
            timer.tick().await;
            let (orders, binds) = gateway.evict_expired();
            if orders + binds > 0 {
                info!("🕰️ Evicted {orders} expired orders and {binds} expired binding requests");
            } else {
                debug!("🕰️ No pending entries have expired");
            }
        }
    })
}
