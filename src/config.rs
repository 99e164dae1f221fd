//! Process configuration, following the teacher corpus's `clap::Parser` +
//! `env` fallback convention (`spacedriveapp-spacedrive/apps/server/src/main.rs`).

use clap::Parser;

#[derive(Parser, Debug, Clone)]
#[command(name = "crewsync-server", about = "Maritime crew well-being sync core")]
pub struct Config {
    /// Address to bind the HTTP server on.
    #[arg(long, env = "BIND_ADDR", default_value = "0.0.0.0:8080")]
    pub bind_addr: String,

    /// Postgres connection string for the backing store.
    #[arg(long, env = "DATABASE_URL")]
    pub database_url: String,

    /// Maximum number of pooled Postgres connections.
    #[arg(long, env = "DATABASE_MAX_CONNECTIONS", default_value_t = 10)]
    pub database_max_connections: u32,

    /// HMAC secret used to verify bearer tokens (see `auth`).
    #[arg(long, env = "JWT_SECRET")]
    pub jwt_secret: String,

    /// Maximum accepted request body size, in bytes (spec.md §5 backpressure).
    #[arg(long, env = "MAX_BODY_BYTES", default_value_t = 10 * 1024 * 1024)]
    pub max_body_bytes: usize,

    /// Upper bound, in seconds, on a single sync call (spec.md §5 cancellation).
    #[arg(long, env = "SYNC_TIMEOUT_SECS", default_value_t = 30)]
    pub sync_timeout_secs: u64,
}
