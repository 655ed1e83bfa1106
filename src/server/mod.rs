//! HTTP server
//!
//! Serves the bootstrap page and binds each `/stream` request to its own
//! [`Broadcaster`](crate::stream::Broadcaster).

pub mod config;
pub mod listener;
pub mod page;
mod routes;

pub use config::ServerConfig;
pub use listener::StreamServer;
pub use page::render_index;
