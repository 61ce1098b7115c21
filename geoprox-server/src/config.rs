//! Server configuration

use clap::Parser;
use geoprox_api::EngineConfig;
use std::net::SocketAddr;

/// GeoProx HTTP server configuration.
///
/// Every flag can also come from the environment (`GEOPROX_*`).
#[derive(Parser, Debug, Clone)]
#[command(name = "geoprox-server")]
#[command(about = "Geospatial proximity cache HTTP server")]
pub struct ServerConfig {
    /// Listen address
    #[arg(long, default_value = "0.0.0.0:8080", env = "GEOPROX_LISTEN")]
    pub listen_addr: SocketAddr,

    /// Enable permissive CORS
    #[arg(
        long,
        default_value_t = true,
        action = clap::ArgAction::Set,
        env = "GEOPROX_CORS"
    )]
    pub cors_enabled: bool,

    /// Requests per minute allowed per client
    #[arg(long, default_value_t = 100, env = "GEOPROX_RATE_LIMIT_PER_MIN")]
    pub rate_limit_per_min: u32,

    /// Default nearby-query radius in km when the client omits one
    #[arg(long, default_value_t = 5.0, env = "GEOPROX_DEFAULT_RADIUS_KM")]
    pub default_radius_km: f64,

    /// Seconds between score-index reconciliation passes
    #[arg(long, default_value_t = 300, env = "GEOPROX_RECONCILE_INTERVAL_SECS")]
    pub reconcile_interval_secs: u64,

    /// Max items fetched per neighbor cell during cache warming
    #[arg(long, default_value_t = 10, env = "GEOPROX_WARM_LIMIT")]
    pub warm_limit: usize,

    /// Document store operation deadline in milliseconds
    #[arg(long, default_value_t = 5000, env = "GEOPROX_STORE_DEADLINE_MS")]
    pub store_deadline_ms: u64,

    /// KV operation deadline in milliseconds
    #[arg(long, default_value_t = 500, env = "GEOPROX_KV_DEADLINE_MS")]
    pub kv_deadline_ms: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            cors_enabled: true,
            rate_limit_per_min: 100,
            default_radius_km: 5.0,
            reconcile_interval_secs: 300,
            warm_limit: 10,
            store_deadline_ms: 5000,
            kv_deadline_ms: 500,
        }
    }
}

impl ServerConfig {
    /// Validate configuration at startup.
    pub fn validate(&self) -> Result<(), String> {
        if self.rate_limit_per_min == 0 {
            return Err("rate_limit_per_min must be at least 1".into());
        }
        if !(self.default_radius_km > 0.0) {
            return Err("default_radius_km must be positive".into());
        }
        if self.warm_limit == 0 || self.warm_limit > 100 {
            return Err("warm_limit must be between 1 and 100".into());
        }
        if self.reconcile_interval_secs == 0 {
            return Err("reconcile_interval_secs must be at least 1".into());
        }
        if self.store_deadline_ms == 0 || self.kv_deadline_ms == 0 {
            return Err("deadlines must be positive".into());
        }
        Ok(())
    }

    /// Engine knobs derived from the server flags.
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            store_deadline: std::time::Duration::from_millis(self.store_deadline_ms),
            kv_deadline: std::time::Duration::from_millis(self.kv_deadline_ms),
            warm_limit: self.warm_limit,
            ..EngineConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_validates() {
        assert!(ServerConfig::default().validate().is_ok());
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let cfg = ServerConfig {
            rate_limit_per_min: 0,
            ..Default::default()
        };
        assert!(cfg.validate().is_err());

        let cfg = ServerConfig {
            default_radius_km: -1.0,
            ..Default::default()
        };
        assert!(cfg.validate().is_err());

        let cfg = ServerConfig {
            warm_limit: 0,
            ..Default::default()
        };
        assert!(cfg.validate().is_err());
    }
}
