//! Infrastructure layer: configuration, default catalog and service wiring.

pub mod config;
pub mod seed;
pub mod services;


pub use config::{ConfigError, WardenConfig};
pub use seed::{SeedReport, seed_default_catalog};
pub use services::{Services, bootstrap, bootstrap_from_env};
