//! Configuration loader with file resolution and environment override support.

use super::error::{ConfigError, ConfigResult};
use super::schema::{Config, LogFormat};
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Environment variable prefix for overrides
const ENV_PREFIX: &str = "COMPORT";

const CONFIG_FILE_NAME: &str = "comport.toml";

/// Environment variable for explicit config path
const CONFIG_PATH_ENV: &str = "COMPORT_CONFIG";

/// Directory name under the platform config directory
const APP_DIR: &str = "shared-comport";

/// Configuration loader with resolution and override logic.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    /// Resolved config file path (if any)
    pub config_path: Option<PathBuf>,
    /// The loaded configuration
    pub config: Config,
}

impl ConfigLoader {
    /// Load configuration using standard resolution order.
    ///
    /// Resolution priority (highest to lowest):
    /// 1. `COMPORT_CONFIG` environment variable (explicit path)
    /// 2. `./comport.toml` (current directory)
    /// 3. `~/.config/shared-comport/comport.toml` (XDG on Linux/macOS)
    /// 4. `%APPDATA%\shared-comport\comport.toml` (Windows)
    /// 5. Built-in defaults (no file required)
    ///
    /// Environment variables override file values; the result is validated.
    pub fn load() -> ConfigResult<Self> {
        let config_path = resolve_config_path();

        let mut config = match config_path {
            Some(ref path) => load_from_file(path)?,
            None => Config::default(),
        };
        apply_env_overrides(&mut config)?;
        config.validate()?;

        tracing::debug!(path = ?config_path, "Configuration loaded");
        Ok(Self { config_path, config })
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref().to_path_buf();
        if !path.exists() {
            return Err(ConfigError::NotFound(path));
        }

        let mut config = load_from_file(&path)?;
        apply_env_overrides(&mut config)?;
        config.validate()?;

        Ok(Self {
            config_path: Some(path),
            config,
        })
    }

    /// Create a loader with default configuration (no file, no overrides).
    pub fn with_defaults() -> Self {
        Self {
            config_path: None,
            config: Config::default(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Consume the loader and return the configuration.
    pub fn into_config(self) -> Config {
        self.config
    }

    /// Save the current configuration to a specific file.
    pub fn save_to(&self, path: impl AsRef<Path>) -> ConfigResult<()> {
        save_to_file(&self.config, path.as_ref())
    }
}

/// Resolve the configuration file path using standard locations.
pub fn resolve_config_path() -> Option<PathBuf> {
    // 1. Explicit environment variable
    if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
        let path = PathBuf::from(path);
        if path.exists() {
            return Some(path);
        }
        tracing::warn!(path = %path.display(), "COMPORT_CONFIG points to a missing file");
    }

    // 2. Current directory
    let cwd_config = PathBuf::from(CONFIG_FILE_NAME);
    if cwd_config.exists() {
        return Some(cwd_config);
    }

    // 3. XDG config directory (Linux/macOS) or APPDATA (Windows)
    get_default_config_path().filter(|path| path.exists())
}

/// Get the platform-specific config directory.
fn get_config_dir() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        std::env::var("APPDATA").ok().map(PathBuf::from)
    }

    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("XDG_CONFIG_HOME")
            .ok()
            .map(PathBuf::from)
            .or_else(|| {
                std::env::var("HOME")
                    .ok()
                    .map(|h| PathBuf::from(h).join(".config"))
            })
    }
}

/// Get the default config file path for creating new config files.
pub fn get_default_config_path() -> Option<PathBuf> {
    get_config_dir().map(|d| d.join(APP_DIR).join(CONFIG_FILE_NAME))
}

fn load_from_file(path: &Path) -> ConfigResult<Config> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
        path: path.to_path_buf(),
        source: e,
    })?;

    toml::from_str(&content).map_err(ConfigError::ParseError)
}

fn save_to_file(config: &Config, path: &Path) -> ConfigResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| ConfigError::WriteError {
            path: path.to_path_buf(),
            source: e,
        })?;
    }

    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content).map_err(|e| ConfigError::WriteError {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Read `COMPORT_<key>` and parse it, if set.
fn env_value<T>(key: &str) -> ConfigResult<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let var = format!("{ENV_PREFIX}_{key}");
    match std::env::var(&var) {
        Ok(val) => val
            .trim()
            .parse()
            .map(Some)
            .map_err(|e: T::Err| ConfigError::env_parse(var, e.to_string())),
        Err(_) => Ok(None),
    }
}

/// Apply environment variable overrides to the configuration.
///
/// Environment variables follow the pattern: `COMPORT_<SECTION>_<KEY>`
/// For example:
/// - `COMPORT_PORTS_SUSPEND_DELAY_MS=1000`
/// - `COMPORT_SERIAL_BAUD_RATE=115200`
/// - `COMPORT_LOGGING_LEVEL=debug`
fn apply_env_overrides(config: &mut Config) -> ConfigResult<()> {
    if let Some(v) = env_value("PORTS_SUSPEND_DELAY_MS")? {
        config.ports.suspend_delay_ms = v;
    }
    if let Some(v) = env_value("PORTS_CREATE_TIMEOUT_MS")? {
        config.ports.create_timeout_ms = v;
    }
    if let Some(v) = env_value("PORTS_READ_TIMEOUT_MS")? {
        config.ports.read_timeout_ms = v;
    }
    if let Some(v) = env_value("PORTS_DRAIN_TIMEOUT_MS")? {
        config.ports.drain_timeout_ms = v;
    }
    if let Some(v) = env_value("PORTS_GATEWAY_PORT")? {
        config.ports.gateway_port = v;
    }

    if let Some(v) = env_value("SERIAL_BAUD_RATE")? {
        config.serial.baud_rate = v;
    }
    if let Some(v) = env_value("SERIAL_TIMEOUT_MS")? {
        config.serial.timeout_ms = v;
    }
    if let Some(v) = env_value("SERIAL_WRITE_TIMEOUT_MS")? {
        config.serial.write_timeout_ms = v;
    }

    if let Some(v) = env_value::<String>("LOGGING_LEVEL")? {
        config.logging.level = v;
    }
    if let Some(v) = env_value::<LogFormat>("LOGGING_FORMAT")? {
        config.logging.format = v;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::env;
    use std::time::Duration;
    use tempfile::TempDir;

    fn write_config(dir: &TempDir, content: &str) -> PathBuf {
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_default_loader() {
        let loader = ConfigLoader::with_defaults();
        assert!(loader.config_path.is_none());
        assert_eq!(loader.config().ports.gateway_port, 4001);
    }

    #[test]
    #[serial]
    fn test_load_from_file() {
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir, "[ports]\nsuspend_delay_ms = 100\n");

        let loader = ConfigLoader::load_from(&path).unwrap();
        assert_eq!(loader.config_path.as_deref(), Some(path.as_path()));
        assert_eq!(
            loader.config().port_options().suspend_delay,
            Duration::from_millis(100)
        );
    }

    #[test]
    fn test_missing_file_is_not_found() {
        let dir = TempDir::new().unwrap();
        let err = ConfigLoader::load_from(dir.path().join("nope.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound(_)));
    }

    #[test]
    #[serial]
    fn test_invalid_file_fails_validation() {
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir, "[serial]\nbaud_rate = 0\n");
        let err = ConfigLoader::load_from(&path).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError { .. }));
    }

    #[test]
    #[serial]
    fn test_malformed_toml_is_parse_error() {
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir, "[ports\n");
        let err = ConfigLoader::load_from(&path).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }

    #[test]
    #[serial]
    fn test_env_override() {
        env::set_var("COMPORT_PORTS_GATEWAY_PORT", "950");
        env::set_var("COMPORT_LOGGING_FORMAT", "json");

        let mut config = Config::default();
        let result = apply_env_overrides(&mut config);

        env::remove_var("COMPORT_PORTS_GATEWAY_PORT");
        env::remove_var("COMPORT_LOGGING_FORMAT");

        result.unwrap();
        assert_eq!(config.ports.gateway_port, 950);
        assert_eq!(config.logging.format, LogFormat::Json);
    }

    #[test]
    #[serial]
    fn test_env_parse_error() {
        env::set_var("COMPORT_SERIAL_BAUD_RATE", "fast");

        let mut config = Config::default();
        let result = apply_env_overrides(&mut config);

        env::remove_var("COMPORT_SERIAL_BAUD_RATE");

        match result {
            Err(ConfigError::EnvParseError { var, .. }) => {
                assert_eq!(var, "COMPORT_SERIAL_BAUD_RATE")
            }
            other => panic!("expected EnvParseError, got {other:?}"),
        }
    }

    #[test]
    #[serial]
    fn test_explicit_path_env() {
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir, "[aliases]\nplc = \"10.0.0.2:4001\"\n");
        env::set_var(CONFIG_PATH_ENV, &path);

        let loaded = ConfigLoader::load();
        env::remove_var(CONFIG_PATH_ENV);

        let loader = loaded.unwrap();
        assert_eq!(loader.config().resolve_port("plc"), "10.0.0.2:4001");
    }

    #[test]
    fn test_save_and_reload() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join(CONFIG_FILE_NAME);

        let mut loader = ConfigLoader::with_defaults();
        loader.config.ports.suspend_delay_ms = 42;
        loader.save_to(&path).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let config: Config = toml::from_str(&content).unwrap();
        assert_eq!(config, loader.into_config());
    }
}
