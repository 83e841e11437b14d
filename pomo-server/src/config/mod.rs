//! Configuration management for the pomo server
//!
//! Loaded once at startup; the core holds it behind an `Arc`.

mod defaults;
mod loader;
mod schema;

pub use defaults::DEFAULT_CONFIG_TOML;
pub use loader::ConfigLoader;
pub use schema::*;
