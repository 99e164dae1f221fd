//! Tracing setup, grounded in
//! `spacedriveapp-spacedrive/apps/server/src/main.rs`'s `tracing_subscriber`
//! initialization.

pub fn init() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,crewsync_core=debug".into()),
        )
        .init();
}
