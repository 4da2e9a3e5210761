use std::net::SocketAddr;
use stoptalk_core::{grade::GradeBand, phase::DEFAULT_MAX_EXCHANGES};
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub log_level: Level,
    /// Band used when a request or session carries no readable grade level.
    pub default_grade: GradeBand,
    /// When set, every session's turn-signal choices replay from this seed.
    pub turn_signal_seed: Option<u64>,
    pub max_character_exchanges: u32,
}

impl Config {
    /// Loads configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }

        let bind_address_str =
            std::env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
        let bind_address = bind_address_str
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string()))?;

        let log_level_str = std::env::var("RUST_LOG").unwrap_or_else(|_| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        // Grade input is never rejected; unreadable values fall back like any other.
        let default_grade = std::env::var("DEFAULT_GRADE")
            .map(|raw| GradeBand::from_level(raw))
            .unwrap_or(GradeBand::SixToEight);

        let turn_signal_seed = match std::env::var("TURN_SIGNAL_SEED") {
            Ok(raw) => Some(raw.parse::<u64>().map_err(|e| {
                ConfigError::InvalidValue("TURN_SIGNAL_SEED".to_string(), e.to_string())
            })?),
            Err(_) => None,
        };

        let max_character_exchanges = match std::env::var("MAX_CHARACTER_EXCHANGES") {
            Ok(raw) => match raw.parse::<u32>() {
                Ok(n) if n >= 1 => n,
                _ => {
                    return Err(ConfigError::InvalidValue(
                        "MAX_CHARACTER_EXCHANGES".to_string(),
                        format!("'{}' is not a positive integer", raw),
                    ));
                }
            },
            Err(_) => DEFAULT_MAX_EXCHANGES,
        };

        Ok(Self {
            bind_address,
            log_level,
            default_grade,
            turn_signal_seed,
            max_character_exchanges,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::env;
    use tracing::Level;

    fn clear_env_vars() {
        unsafe {
            env::remove_var("BIND_ADDRESS");
            env::remove_var("RUST_LOG");
            env::remove_var("DEFAULT_GRADE");
            env::remove_var("TURN_SIGNAL_SEED");
            env::remove_var("MAX_CHARACTER_EXCHANGES");
        }
    }

    #[test]
    fn test_config_error_display() {
        let invalid_value =
            ConfigError::InvalidValue("TEST_VAR".to_string(), "bad_value".to_string());
        assert_eq!(
            format!("{}", invalid_value),
            "Invalid value for environment variable TEST_VAR: bad_value"
        );
    }

    #[test]
    #[serial]
    fn test_config_from_env_defaults() {
        clear_env_vars();

        let config = Config::from_env().expect("Config should load successfully");

        assert_eq!(config.bind_address.to_string(), "0.0.0.0:3000");
        assert_eq!(config.log_level, Level::INFO);
        assert_eq!(config.default_grade, GradeBand::SixToEight);
        assert_eq!(config.turn_signal_seed, None);
        assert_eq!(config.max_character_exchanges, 5);
    }

    #[test]
    #[serial]
    fn test_config_from_env_custom_values() {
        clear_env_vars();
        unsafe {
            env::set_var("BIND_ADDRESS", "127.0.0.1:8080");
            env::set_var("RUST_LOG", "debug");
            env::set_var("DEFAULT_GRADE", "K");
            env::set_var("TURN_SIGNAL_SEED", "42");
            env::set_var("MAX_CHARACTER_EXCHANGES", "3");
        }

        let config = Config::from_env().expect("Config should load successfully");

        assert_eq!(config.bind_address.to_string(), "127.0.0.1:8080");
        assert_eq!(config.log_level, Level::DEBUG);
        assert_eq!(config.default_grade, GradeBand::KToTwo);
        assert_eq!(config.turn_signal_seed, Some(42));
        assert_eq!(config.max_character_exchanges, 3);
        clear_env_vars();
    }

    #[test]
    #[serial]
    fn test_config_unreadable_default_grade_falls_back() {
        clear_env_vars();
        unsafe {
            env::set_var("DEFAULT_GRADE", "sophomore");
        }

        let config = Config::from_env().expect("Config should load successfully");
        assert_eq!(config.default_grade, GradeBand::SixToEight);
        clear_env_vars();
    }

    #[test]
    #[serial]
    fn test_config_invalid_bind_address() {
        clear_env_vars();
        unsafe {
            env::set_var("BIND_ADDRESS", "not-a-valid-address");
        }

        let ConfigError::InvalidValue(var, _) = Config::from_env().unwrap_err();
        assert_eq!(var, "BIND_ADDRESS");
        clear_env_vars();
    }

    #[test]
    #[serial]
    fn test_config_invalid_log_level() {
        clear_env_vars();
        unsafe {
            env::set_var("RUST_LOG", "not-a-level");
        }

        let ConfigError::InvalidValue(var, _) = Config::from_env().unwrap_err();
        assert_eq!(var, "RUST_LOG");
        clear_env_vars();
    }

    #[test]
    #[serial]
    fn test_config_invalid_seed() {
        clear_env_vars();
        unsafe {
            env::set_var("TURN_SIGNAL_SEED", "-1");
        }

        let ConfigError::InvalidValue(var, _) = Config::from_env().unwrap_err();
        assert_eq!(var, "TURN_SIGNAL_SEED");
        clear_env_vars();
    }

    #[test]
    #[serial]
    fn test_config_zero_exchanges_rejected() {
        clear_env_vars();
        unsafe {
            env::set_var("MAX_CHARACTER_EXCHANGES", "0");
        }

        let ConfigError::InvalidValue(var, msg) = Config::from_env().unwrap_err();
        assert_eq!(var, "MAX_CHARACTER_EXCHANGES");
        assert!(msg.contains("'0'"));
        clear_env_vars();
    }
}
