//! GeoProx HTTP Server
//!
//! A thin HTTP REST API over `geoprox-api`, exposing nearby queries,
//! property writes, facet aggregation, and cache administration.
//!
//! # Endpoints
//!
//! - `GET /api/v1/properties` - paginated listing
//! - `GET /api/v1/properties/nearby` - cached nearest-neighbor query
//! - `GET /api/v1/properties/coordinate-range-indexing` - legacy range path
//! - `POST /api/v1/properties` - create (invalidates surrounding cells)
//! - `GET /api/v1/properties/get-property/:id` - fetch one record
//! - `GET /api/v1/properties/aggregate` - facet aggregation by locality
//! - `GET /api/v1/properties/cacheStats` - cache statistics
//! - `DELETE /api/v1/properties/clear-cache` - drop the cache
//! - `GET /health` - health check
//!
//! # Example
//!
//! ```ignore
//! use geoprox_server::{GeoproxServer, ServerConfig};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = ServerConfig::default();
//!     let server = GeoproxServer::new(config).unwrap();
//!     server.run().await.unwrap();
//! }
//! ```

pub mod config;
pub mod error;
pub mod rate_limit;
pub mod routes;
pub mod state;

pub use config::ServerConfig;
pub use error::{Result, ServerError};
pub use state::AppState;

use axum::Router;
use geoprox_cache::spawn_reconciler;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::info;

/// GeoProx HTTP Server
pub struct GeoproxServer {
    /// Application state
    state: Arc<AppState>,
    /// Configured router
    router: Router,
}

impl GeoproxServer {
    /// Create a new server with the given configuration
    pub fn new(config: ServerConfig) -> Result<Self> {
        let state = Arc::new(AppState::new(config)?);
        let router = routes::build_router(state.clone());
        Ok(Self { state, router })
    }

    /// Get a reference to the application state
    pub fn state(&self) -> &Arc<AppState> {
        &self.state
    }

    /// Get the router for testing
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server
    pub async fn run(self) -> std::io::Result<()> {
        let addr = self.state.config.listen_addr;
        let listener = TcpListener::bind(addr).await?;

        // Background score-index reconciliation
        let reconciler = spawn_reconciler(
            self.state.engine.cache().clone(),
            Duration::from_secs(self.state.config.reconcile_interval_secs),
        );

        info!(addr = %addr, "GeoProx server listening");
        let result = axum::serve(
            listener,
            self.router
                .into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await;

        reconciler.abort();
        result
    }
}
