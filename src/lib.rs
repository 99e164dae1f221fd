pub mod auth;
pub mod config;
pub mod cursor;
pub mod domain;
pub mod error;
pub mod http;
pub mod merge;
pub mod orchestrator;
pub mod pull;
pub mod reconcile;
pub mod store;
pub mod telemetry;
