//! Configuration for shared ports.
//!
//! This module provides TOML-based configuration with environment variable overrides.
//!
//! # Configuration Resolution
//!
//! Configuration is loaded from the following locations (in order of priority):
//!
//! 1. `COMPORT_CONFIG` environment variable (explicit path)
//! 2. `./comport.toml` (current directory)
//! 3. `~/.config/shared-comport/comport.toml` (XDG on Linux/macOS)
//! 4. `%APPDATA%\shared-comport\comport.toml` (Windows)
//! 5. Built-in defaults (no file required)
//!
//! # Environment Overrides
//!
//! The pattern is: `COMPORT_<SECTION>_<KEY>`
//!
//! Examples:
//! - `COMPORT_PORTS_SUSPEND_DELAY_MS=1000`
//! - `COMPORT_PORTS_GATEWAY_PORT=950`
//! - `COMPORT_SERIAL_BAUD_RATE=115200`
//! - `COMPORT_LOGGING_LEVEL=shared_comport=debug`
//!
//! # Example
//!
//! ```rust,no_run
//! use shared_comport::config::ConfigLoader;
//! use shared_comport::{PortId, Registry};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ConfigLoader::load()?.into_config();
//! let id: PortId = config.resolve_port("plc").parse()?;
//! let port = Registry::global().acquire(&id, &config.port_options());
//! # Ok(())
//! # }
//! ```

mod error;
mod loader;
mod schema;

pub use error::{ConfigError, ConfigResult};
pub use loader::{get_default_config_path, resolve_config_path, ConfigLoader};
pub use schema::{Config, LogFormat, LoggingConfig, PortsConfig, SerialDefaults};
