//! Remote catalog API
//!
//! `ApiClient` maps each endpoint to a typed call; `Transport` is the seam
//! that actually moves bytes, backed by reqwest in production.

mod client;
#[cfg(test)]
pub(crate) mod testing;
mod transport;

pub use client::ApiClient;
pub use transport::{ApiRequest, ApiResponse, HttpTransport, Method, SharedTransport, Transport};
