//! # Payment Gateway Engine
//!
//! The core of the payment gateway adapter. It prepares signed checkout requests, authenticates
//! asynchronous vendor callbacks, and advances each order through a strict state machine with an
//! at-most-once settlement guarantee.
//!
//! The library is divided into the following areas:
//! 1. Request and callback authentication ([`signing`]). Every outbound form carries a keyed
//!    SHA-256 checksum over a canonicalized field set, and every inbound webhook is verified
//!    against the same scheme before anything else happens.
//! 2. The order and card-binding state machines ([`order`], [`bind_request`]). All state
//!    transitions go through explicit methods; there is no way to commit an order twice.
//! 3. The pending store ([`store`]), a TTL-bounded in-memory map that acts as the idempotency
//!    gate for inbound callbacks.
//! 4. The gateway orchestration ([`gateway`]), which owns the store, talks to the vendor REST
//!    API ([`vendor`]) for queries and refunds, and publishes events ([`events`]) when orders
//!    settle.
//!
//! Handlers for settlement and info-retrieval events are registered at construction time via
//! [`events::EventHooks`]; there is no global listener state.

pub mod bind_request;
pub mod channels;
pub mod errors;
pub mod events;
pub mod gateway;
pub mod order;
pub mod signing;
pub mod store;
pub mod vendor;

pub use errors::{CallbackRejection, GatewayError, OrderError, ValidationError};
pub use gateway::{Gateway, GatewayConfig, NewOrderRequest, RefundAction};
pub use signing::CheckMacSigner;
pub use vendor::{RestVendorApi, VendorApi};
