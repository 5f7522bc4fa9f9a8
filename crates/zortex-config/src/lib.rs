//! Configuration schema and loading for the zortex gamification engine.
//!
//! Loading hierarchy: env > file > defaults, matching the rest of the
//! workspace's configuration conventions.

pub mod env;
pub mod error;
pub mod loader;
pub mod schema;

pub use error::{ConfigError, ConfigResult};
pub use loader::{default_config_file_path, load_config, load_config_from};
pub use schema::*;
