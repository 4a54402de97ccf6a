//! # BookPress Platform
//!
//! The `bookpress` server: every aggregate in one process, sharing a
//! [`LocalEventBus`](bookpress_runtime::LocalEventBus).
//!
//! - [`config`]: environment-based configuration
//! - [`bootstrap`]: stores, pipeline and event consumers
//! - [`api`] and [`server`]: command endpoints, document lookups, health
//! - [`runtime`]: reconnecting bus consumer and event forwarding
//! - [`telemetry`]: tracing and Prometheus setup

pub mod api;
pub mod bootstrap;
pub mod config;
pub mod runtime;
pub mod server;
pub mod telemetry;

pub use bootstrap::{BootstrapError, Services};
pub use config::Config;
pub use server::{AppError, AppState, build_router};
