//! Adapters: concrete implementations of the ports.

pub mod audit;
pub mod auth;
pub mod engine;
pub mod http;
pub mod store;
pub mod transport;
