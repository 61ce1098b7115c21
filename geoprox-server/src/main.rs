//! GeoProx Server CLI
//!
//! Run with: `cargo run -p geoprox-server -- --help`

use clap::Parser;
use geoprox_server::{GeoproxServer, ServerConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("geoprox_server=info".parse().unwrap())
                .add_directive("geoprox_api=info".parse().unwrap())
                .add_directive("geoprox_cache=info".parse().unwrap())
                .add_directive("tower_http=info".parse().unwrap()),
        )
        .init();

    let config = ServerConfig::parse();

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        addr = %config.listen_addr,
        cors = config.cors_enabled,
        rate_limit_per_min = config.rate_limit_per_min,
        default_radius_km = config.default_radius_km,
        "Starting GeoProx server"
    );

    let server = GeoproxServer::new(config)?;
    server.run().await.map_err(Into::into)
}
