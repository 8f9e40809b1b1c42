//! Configuration for the mathex command line
//!
//! Values are layered: built-in defaults, then the first configuration file
//! found, then `MATHEX_*` environment variables, then command-line flags.

use anyhow::{Context, Result};
use log::{debug, info};
use mathex_compiler::{CompilerConfig, MathDefinition};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Top-level configuration file layout
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MathexConfig {
    /// Parenthesis, separator, delimiter and operator spellings. A missing
    /// section selects the standard definition; a present one must spell
    /// out every symbol.
    #[serde(default = "MathDefinition::standard")]
    pub definition: MathDefinition,
    #[serde(default)]
    pub compiler: CompilerSection,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for MathexConfig {
    fn default() -> Self {
        Self {
            definition: MathDefinition::standard(),
            compiler: CompilerSection::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// Compiler tuning as it appears in a file (timeouts in milliseconds)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompilerSection {
    pub lock_timeout_ms: u64,
    pub cache_capacity: usize,
    pub max_extraction_passes: usize,
    pub trace_steps: bool,
}

impl Default for CompilerSection {
    fn default() -> Self {
        let defaults = CompilerConfig::default();
        Self {
            lock_timeout_ms: defaults.lock_timeout.as_millis() as u64,
            cache_capacity: defaults.cache_capacity,
            max_extraction_passes: defaults.max_extraction_passes,
            trace_steps: defaults.trace_steps,
        }
    }
}

impl From<&CompilerSection> for CompilerConfig {
    fn from(section: &CompilerSection) -> Self {
        CompilerConfig {
            lock_timeout: Duration::from_millis(section.lock_timeout_ms),
            cache_capacity: section.cache_capacity,
            max_extraction_passes: section.max_extraction_passes,
            trace_steps: section.trace_steps,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: LogLevel,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    #[default]
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn to_filter(self) -> log::LevelFilter {
        match self {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

impl MathexConfig {
    pub fn compiler_config(&self) -> CompilerConfig {
        CompilerConfig::from(&self.compiler)
    }
}

/// Configuration loader with file discovery and environment overrides
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from all sources with proper precedence
    pub fn load() -> Result<MathexConfig> {
        let mut config = Self::load_from_files()?;
        Self::apply_environment_variables(&mut config)?;
        Ok(config)
    }

    /// Load an explicit file, then apply environment overrides
    pub fn load_with_file(path: &Path) -> Result<MathexConfig> {
        let mut config = Self::load_from_file(path)?;
        Self::apply_environment_variables(&mut config)?;
        Ok(config)
    }

    fn load_from_files() -> Result<MathexConfig> {
        for path in Self::find_config_files() {
            if path.is_dir() {
                info!(
                    "Ignoring config directory path (expected file): {}",
                    path.display()
                );
                continue;
            }
            if path.exists() {
                info!("Loading configuration from: {}", path.display());
                return Self::load_from_file(&path);
            }
        }

        debug!("No configuration file found, using defaults");
        Ok(MathexConfig::default())
    }

    fn find_config_files() -> Vec<PathBuf> {
        let mut paths = Vec::new();

        if let Ok(config_path) = env::var("MATHEX_CONFIG") {
            if !config_path.is_empty() {
                paths.push(PathBuf::from(config_path));
            }
        }

        if let Ok(current_dir) = env::current_dir() {
            for name in [".mathex.toml", ".mathex.json", "mathex.toml", "mathex.json"] {
                paths.push(current_dir.join(name));
            }
        }

        paths
    }

    /// Load configuration from a specific file; the format follows the extension
    pub fn load_from_file(path: &Path) -> Result<MathexConfig> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config = match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse JSON config: {}", path.display()))?,
            Some("toml") => toml::from_str(&content)
                .with_context(|| format!("Failed to parse TOML config: {}", path.display()))?,
            _ => {
                if let Ok(config) = toml::from_str(&content) {
                    config
                } else if let Ok(config) = serde_json::from_str(&content) {
                    config
                } else {
                    return Err(anyhow::anyhow!(
                        "Could not parse config file {} (tried TOML, JSON)",
                        path.display()
                    ));
                }
            }
        };

        Ok(config)
    }

    pub fn save_to_file(config: &MathexConfig, path: &Path) -> Result<()> {
        let content = match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => serde_json::to_string_pretty(config)
                .context("Failed to serialize config as JSON")?,
            _ => toml::to_string_pretty(config).context("Failed to serialize config as TOML")?,
        };
        fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;
        Ok(())
    }

    pub fn apply_environment_variables(config: &mut MathexConfig) -> Result<()> {
        if let Ok(value) = env::var("MATHEX_LOCK_TIMEOUT_MS") {
            config.compiler.lock_timeout_ms = value
                .trim()
                .parse()
                .with_context(|| format!("Invalid MATHEX_LOCK_TIMEOUT_MS: {value}"))?;
        }

        if let Ok(value) = env::var("MATHEX_CACHE_CAPACITY") {
            config.compiler.cache_capacity = value
                .trim()
                .parse()
                .with_context(|| format!("Invalid MATHEX_CACHE_CAPACITY: {value}"))?;
        }

        if let Ok(value) = env::var("MATHEX_TRACE_STEPS") {
            if let Some(flag) = parse_bool(&value) {
                config.compiler.trace_steps = flag;
            }
        }

        if let Ok(value) = env::var("MATHEX_LOG_LEVEL") {
            if let Some(level) = parse_log_level(&value) {
                config.logging.level = level;
            }
        }

        Ok(())
    }

    pub fn generate_sample_config() -> String {
        toml::to_string_pretty(&MathexConfig::default())
            .unwrap_or_else(|_| "# Failed to generate config".to_string())
    }
}

pub fn parse_log_level(value: &str) -> Option<LogLevel> {
    match value.trim().to_lowercase().as_str() {
        "error" => Some(LogLevel::Error),
        "warn" | "warning" => Some(LogLevel::Warn),
        "info" => Some(LogLevel::Info),
        "debug" => Some(LogLevel::Debug),
        "trace" => Some(LogLevel::Trace),
        _ => None,
    }
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use once_cell::sync::Lazy;
    use std::sync::Mutex;
    use tempfile::TempDir;

    static ENV_GUARD: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

    #[test]
    fn defaults_mirror_compiler_config() {
        let config = MathexConfig::default();
        assert_eq!(config.compiler_config(), CompilerConfig::default());
        assert_eq!(config.definition, MathDefinition::standard());
        assert_eq!(config.logging.level, LogLevel::Warn);
    }

    #[test]
    fn omitted_sections_use_defaults() {
        let config: MathexConfig = toml::from_str(
            r#"
            [compiler]
            cache_capacity = 8
            "#,
        )
        .unwrap();
        assert_eq!(config.definition, MathDefinition::standard());
        assert_eq!(config.compiler.cache_capacity, 8);
        assert_eq!(
            config.compiler.lock_timeout_ms,
            CompilerSection::default().lock_timeout_ms
        );
    }

    #[test]
    fn definition_sections_must_name_every_symbol() {
        let err = toml::from_str::<MathexConfig>(
            r#"
            [definition]
            open_paren = "["
            separator = ";"
            string_delimiter = "'"
            "#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("close_paren"), "{err}");

        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join(".mathex.json");
        fs::write(
            &path,
            r#"{ "definition": { "open_paren": "(", "close_paren": ")",
                 "separator": ",", "string_delimiter": "'" } }"#,
        )
        .unwrap();
        let err = ConfigLoader::load_from_file(&path).unwrap_err();
        assert!(format!("{err:#}").contains("operators"), "{err:#}");
    }

    #[test]
    fn toml_and_json_files_round_trip() {
        let temp_dir = TempDir::new().unwrap();
        let mut config = MathexConfig::default();
        config.compiler.lock_timeout_ms = 250;
        config.logging.level = LogLevel::Debug;

        for name in [".mathex.toml", ".mathex.json"] {
            let path = temp_dir.path().join(name);
            ConfigLoader::save_to_file(&config, &path).unwrap();
            let loaded = ConfigLoader::load_from_file(&path).unwrap();
            assert_eq!(loaded, config, "{name}");
        }
    }

    #[test]
    fn unparseable_file_reports_path() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("broken.cfg");
        fs::write(&path, "{{ not config").unwrap();
        let err = ConfigLoader::load_from_file(&path).unwrap_err();
        assert!(err.to_string().contains("broken.cfg"));
    }

    #[test]
    fn environment_overrides_file_values() {
        let _lock = ENV_GUARD.lock().unwrap();
        env::set_var("MATHEX_LOCK_TIMEOUT_MS", "75");
        env::set_var("MATHEX_CACHE_CAPACITY", "3");
        env::set_var("MATHEX_LOG_LEVEL", "TRACE");
        let mut config = MathexConfig::default();
        ConfigLoader::apply_environment_variables(&mut config).unwrap();
        env::remove_var("MATHEX_LOCK_TIMEOUT_MS");
        env::remove_var("MATHEX_CACHE_CAPACITY");
        env::remove_var("MATHEX_LOG_LEVEL");

        assert_eq!(
            config.compiler_config().lock_timeout,
            Duration::from_millis(75)
        );
        assert_eq!(config.compiler.cache_capacity, 3);
        assert_eq!(config.logging.level, LogLevel::Trace);
    }

    #[test]
    fn invalid_numeric_override_is_an_error() {
        let _lock = ENV_GUARD.lock().unwrap();
        env::set_var("MATHEX_CACHE_CAPACITY", "lots");
        let mut config = MathexConfig::default();
        let result = ConfigLoader::apply_environment_variables(&mut config);
        env::remove_var("MATHEX_CACHE_CAPACITY");
        assert!(result.is_err());
    }

    #[test]
    fn explicit_config_env_path_is_searched_first() {
        let _lock = ENV_GUARD.lock().unwrap();
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("custom.toml");
        fs::write(&path, "[compiler]\nmax_extraction_passes = 42\n").unwrap();
        env::set_var("MATHEX_CONFIG", &path);
        let config = ConfigLoader::load();
        env::remove_var("MATHEX_CONFIG");
        assert_eq!(config.unwrap().compiler.max_extraction_passes, 42);
    }

    #[test]
    fn log_level_parsing() {
        assert_eq!(parse_log_level("Info"), Some(LogLevel::Info));
        assert_eq!(parse_log_level(" warning "), Some(LogLevel::Warn));
        assert_eq!(parse_log_level("loud"), None);
        assert_eq!(parse_bool("YES"), Some(true));
        assert_eq!(parse_bool("maybe"), None);
    }

    #[test]
    fn sample_config_parses_back() {
        let sample = ConfigLoader::generate_sample_config();
        let parsed: MathexConfig = toml::from_str(&sample).unwrap();
        assert_eq!(parsed, MathexConfig::default());
    }
}
