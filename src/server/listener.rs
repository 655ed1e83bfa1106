//! Stream server listener
//!
//! Binds the HTTP listener and serves the routes until shut down. Shutting
//! down closes the frame slot first so every open event stream ends, then
//! lets in-flight connections drain.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::atomic::AtomicU64;
use std::sync::Arc;

use axum::Router;
use bytes::Bytes;
use tokio::net::TcpListener;
use tokio::sync::Semaphore;

use crate::crypto::CipherConfig;
use crate::error::Result;
use crate::server::config::ServerConfig;
use crate::server::page::render_index;
use crate::server::routes::{self, AppState};
use crate::slot::FrameSlot;
use crate::stats::StreamStats;

/// HTTP server for the bootstrap page and the event stream
pub struct StreamServer {
    config: ServerConfig,
    state: AppState,
}

impl StreamServer {
    /// Create a server publishing frames from `slot`
    pub fn new(
        config: ServerConfig,
        cipher: &CipherConfig,
        slot: Arc<FrameSlot>,
        stats: Arc<StreamStats>,
    ) -> Self {
        let connection_semaphore = if config.max_connections > 0 {
            Some(Arc::new(Semaphore::new(config.max_connections)))
        } else {
            None
        };

        let state = AppState {
            slot,
            stats,
            page: Bytes::from(render_index(cipher)),
            next_client_id: Arc::new(AtomicU64::new(1)),
            connection_semaphore,
        };

        Self { config, state }
    }

    /// Build the router without binding
    pub fn router(&self) -> Router {
        routes::router(self.state.clone())
    }

    /// Get the frame slot
    pub fn slot(&self) -> &Arc<FrameSlot> {
        &self.state.slot
    }

    /// Get the shared statistics
    pub fn stats(&self) -> &Arc<StreamStats> {
        &self.state.stats
    }

    /// Get the bind address
    pub fn bind_addr(&self) -> SocketAddr {
        self.config.bind_addr
    }

    /// Bind the configured address and serve until `shutdown` completes
    pub async fn run_until<F>(&self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let listener = TcpListener::bind(self.config.bind_addr).await?;
        self.serve(listener, shutdown).await
    }

    /// Serve on an already bound listener until `shutdown` completes
    pub async fn serve<F>(&self, listener: TcpListener, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        tracing::info!(addr = %listener.local_addr()?, "Stream server listening");

        // Spawn periodic stats logging
        let stats_handle = self.state.stats.spawn_reporter(self.config.stats_interval);

        let slot = Arc::clone(&self.state.slot);
        let app = self
            .router()
            .into_make_service_with_connect_info::<SocketAddr>();

        let result = axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                shutdown.await;
                tracing::info!("Shutdown signal received");
                slot.close();
            })
            .await;

        // Stop stats task on shutdown
        stats_handle.abort();

        result?;
        tracing::info!("Stream server stopped");
        Ok(())
    }
}
