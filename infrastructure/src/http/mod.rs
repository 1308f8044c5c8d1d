//! HTTP transport adapters (behind the `http-transport` feature)

mod endpoint;

pub use endpoint::HttpAgentEndpoint;
