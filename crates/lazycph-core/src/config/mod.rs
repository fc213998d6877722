//! lazycph configuration layer
//!
//! Every environment variable is read here; the rest of the workspace works
//! with the structured configs instead of calling `std::env::var` directly.
//!
//! - `loader`: env_optional, env_bool, env_secs helpers
//! - `schema`: TimeoutConfig, PathsConfig, ObservabilityConfig
//! - `env_keys`: key constants

pub mod env_keys;
pub mod loader;
pub mod schema;

pub use loader::{env_bool, env_optional, env_secs};
pub use schema::{ObservabilityConfig, PathsConfig, TimeoutConfig};
