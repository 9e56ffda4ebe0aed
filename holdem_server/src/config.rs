//! Server configuration management.
//!
//! Consolidates all environment variable reads and provides validated configuration.

use holdem_engine::{TableConfig, TableError};

/// Most tables a single process will host.
const MAX_TABLES: usize = 64;

/// Complete server configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Settings every startup table is created with
    pub table_defaults: TableConfig,
    /// Number of tables to create on startup
    pub num_tables: usize,
}

impl ServerConfig {
    /// Load configuration from environment variables
    ///
    /// # Arguments
    ///
    /// * `num_tables_override` - Optional number of tables override (from CLI args)
    ///
    /// # Errors
    ///
    /// Returns error if a variable is set but can't be used
    pub fn from_env(num_tables_override: Option<usize>) -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok(), num_tables_override)
    }

    /// Same as [`ServerConfig::from_env`], reading variables through `lookup`.
    pub fn from_lookup(
        lookup: impl Fn(&str) -> Option<String>,
        num_tables_override: Option<usize>,
    ) -> Result<Self, ConfigError> {
        let defaults = TableConfig::default();
        let table_defaults = TableConfig {
            name: lookup("TABLE_NAME").unwrap_or(defaults.name),
            max_players: parse_or(&lookup, "TABLE_MAX_PLAYERS", defaults.max_players)?,
            small_blind: parse_or(&lookup, "TABLE_SMALL_BLIND", defaults.small_blind)?,
            big_blind: parse_or(&lookup, "TABLE_BIG_BLIND", defaults.big_blind)?,
            min_buy_in_bb: parse_or(&lookup, "TABLE_MIN_BUY_IN_BB", defaults.min_buy_in_bb)?,
            max_buy_in_bb: parse_or(&lookup, "TABLE_MAX_BUY_IN_BB", defaults.max_buy_in_bb)?,
            auto_start: parse_or(&lookup, "TABLE_AUTO_START", defaults.auto_start)?,
            shuffle_seed: lookup("SHUFFLE_SEED")
                .map(|v| parse("SHUFFLE_SEED", &v))
                .transpose()?,
        };

        let num_tables = match num_tables_override {
            Some(n) => n,
            None => parse_or(&lookup, "MAX_TABLES", 1)?,
        };

        Ok(ServerConfig {
            table_defaults,
            num_tables,
        })
    }

    /// Validate configuration after loading
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.num_tables == 0 || self.num_tables > MAX_TABLES {
            return Err(ConfigError::Invalid {
                var: "MAX_TABLES".to_string(),
                reason: format!("Must be between 1 and {MAX_TABLES}"),
            });
        }
        self.table_defaults.validate()?;
        Ok(())
    }

    /// Config for the `index`th startup table, counting from zero.
    #[must_use]
    pub fn table(&self, index: usize) -> TableConfig {
        let mut config = self.table_defaults.clone();
        if self.num_tables > 1 {
            config.name = format!("{} {}", config.name, index + 1);
        }
        config.shuffle_seed = config
            .shuffle_seed
            .map(|seed| seed.wrapping_add(index as u64));
        config
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration for {var}: {reason}")]
    Invalid { var: String, reason: String },

    #[error("Invalid table defaults: {0}")]
    Table(#[from] TableError),
}

fn parse<T>(key: &str, value: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value.trim().parse().map_err(|err: T::Err| ConfigError::Invalid {
        var: key.to_string(),
        reason: format!("'{value}': {err}"),
    })
}

/// Helper to parse an optional variable with default fallback
fn parse_or<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(value) => parse(key, &value),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)], tables: Option<usize>) -> Result<ServerConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ServerConfig::from_lookup(|key| vars.get(key).cloned(), tables)
    }

    #[test]
    fn test_defaults_without_environment() {
        let config = load(&[], None).unwrap();
        assert_eq!(config.table_defaults, TableConfig::default());
        assert_eq!(config.num_tables, 1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_variables_override_defaults() {
        let config = load(
            &[
                ("TABLE_SMALL_BLIND", "10"),
                ("TABLE_BIG_BLIND", "20"),
                ("TABLE_AUTO_START", "false"),
                ("SHUFFLE_SEED", "99"),
                ("MAX_TABLES", "3"),
            ],
            None,
        )
        .unwrap();
        assert_eq!(config.table_defaults.blinds().big, 20);
        assert!(!config.table_defaults.auto_start);
        assert_eq!(config.num_tables, 3);
        assert_eq!(config.table(2).shuffle_seed, Some(101));
        assert_eq!(config.table(0).name, "Default Table 1");
    }

    #[test]
    fn test_cli_override_wins() {
        let config = load(&[("MAX_TABLES", "3")], Some(5)).unwrap();
        assert_eq!(config.num_tables, 5);
    }

    #[test]
    fn test_unparsable_variable_is_an_error() {
        let err = load(&[("TABLE_BIG_BLIND", "twenty")], None).unwrap_err();
        assert!(err.to_string().contains("TABLE_BIG_BLIND"));
    }

    #[test]
    fn test_config_validation_big_blind_too_small() {
        let config = load(&[("TABLE_SMALL_BLIND", "20"), ("TABLE_BIG_BLIND", "10")], None).unwrap();
        assert!(matches!(config.validate(), Err(ConfigError::Table(_))));
    }

    #[test]
    fn test_config_validation_no_tables() {
        let config = load(&[], Some(0)).unwrap();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid { .. })
        ));
    }
}
