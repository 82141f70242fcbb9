//! Credential verification adapters.

mod http;
mod static_token;

pub use http::HttpAuthVerifier;
pub use static_token::StaticAuthVerifier;
