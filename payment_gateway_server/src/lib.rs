//! # Payment gateway server
//! This crate hosts the HTTP surface of the payment gateway. It is responsible for:
//! * Serving the merchant-facing API for preparing orders, querying state, and issuing refunds.
//! * Serving the self-submitting checkout and card-binding forms to shoppers.
//! * Receiving and authenticating the vendor's asynchronous webhook callbacks, and answering
//!   them with the two-part plaintext status lines the vendor expects (`1|OK`, `0|...`).
//!
//! ## Configuration
//! The server is configured via environment variables. See [config](config/index.html) for more
//! information.

pub mod cli;
pub mod config;
pub mod data_objects;
pub mod errors;
pub mod expiry_worker;
pub mod routes;
pub mod server;

#[cfg(test)]
mod endpoint_tests;
