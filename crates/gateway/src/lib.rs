//! Backend access for the agents client: the four-operation gateway contract
//! and its REST implementation.

pub mod client;
pub mod http;
pub mod wire;

/// Gateway trait consumed by the chat core.
pub use client::AgentsGateway;
/// REST implementation backed by `reqwest`.
pub use http::HttpGateway;
