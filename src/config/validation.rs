use super::*;
use crate::sketch::{MAX_PRECISION, MIN_PRECISION};

/// Configuration validator
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate a partitioner configuration. `num_servers` is the size of the
    /// server list the power-of-choices router will be built with; the sticky
    /// router carries its own server count.
    pub fn validate(config: &PartitionerConfig, num_servers: usize) -> ConfigResult<()> {
        match config {
            PartitionerConfig::PowerOfChoices(poc) => {
                Self::validate_power_of_choices(poc, num_servers)
            }
            PartitionerConfig::Sticky(sticky) => {
                if num_servers != sticky.num_servers {
                    return Err(ConfigError::IncompatibleConfig {
                        reason: format!(
                            "sticky router configured for {} servers but {} supplied",
                            sticky.num_servers, num_servers
                        ),
                    });
                }
                Self::validate_sticky(sticky)
            }
        }
    }

    pub fn validate_power_of_choices(
        config: &PowerOfChoicesConfig,
        num_servers: usize,
    ) -> ConfigResult<()> {
        Self::validate_server_count(num_servers)?;

        if config.num_sources == 0 {
            return Err(ConfigError::InvalidValue {
                field: "num_sources".to_string(),
                value: config.num_sources.to_string(),
                reason: "Must be > 0".to_string(),
            });
        }

        if config.threshold == 0 {
            return Err(ConfigError::InvalidValue {
                field: "threshold".to_string(),
                value: config.threshold.to_string(),
                reason: "Must be > 0".to_string(),
            });
        }

        if config.default_choice_count == 0 {
            return Err(ConfigError::InvalidValue {
                field: "default_choice_count".to_string(),
                value: config.default_choice_count.to_string(),
                reason: "Must be > 0".to_string(),
            });
        }

        if config.choice_counts.len() > config.num_sources {
            return Err(ConfigError::IncompatibleConfig {
                reason: format!(
                    "{} choice count overrides given for {} sources",
                    config.choice_counts.len(),
                    config.num_sources
                ),
            });
        }

        if let Some(source) = config.choice_counts.iter().position(|&d| d == 0) {
            return Err(ConfigError::InvalidValue {
                field: format!("choice_counts[{}]", source),
                value: "0".to_string(),
                reason: "Must be > 0".to_string(),
            });
        }

        if config.topk_capacity == 0 {
            return Err(ConfigError::InvalidValue {
                field: "topk_capacity".to_string(),
                value: config.topk_capacity.to_string(),
                reason: "Must be > 0".to_string(),
            });
        }

        Ok(())
    }

    pub fn validate_sticky(config: &StickyConfig) -> ConfigResult<()> {
        Self::validate_server_count(config.num_servers)?;

        if !(config.delta > 0.0 && config.delta <= 1.0) {
            return Err(ConfigError::InvalidValue {
                field: "delta".to_string(),
                value: config.delta.to_string(),
                reason: "Must be in (0, 1]".to_string(),
            });
        }

        if !config.epsilon.is_finite() || config.epsilon < 0.0 {
            return Err(ConfigError::InvalidValue {
                field: "epsilon".to_string(),
                value: config.epsilon.to_string(),
                reason: "Must be a finite value >= 0".to_string(),
            });
        }

        if !(config.error_ratio > 0.0 && config.error_ratio <= 1.0) {
            return Err(ConfigError::InvalidValue {
                field: "error_ratio".to_string(),
                value: config.error_ratio.to_string(),
                reason: "Must be in (0, 1]".to_string(),
            });
        }

        if config.max_tracked_keys == Some(0) {
            return Err(ConfigError::InvalidValue {
                field: "max_tracked_keys".to_string(),
                value: "0".to_string(),
                reason: "Must be > 0 when set".to_string(),
            });
        }

        Self::validate_precision("global_precision", config.global_precision)?;
        Self::validate_precision("server_precision", config.server_precision)?;

        Ok(())
    }

    /// All servers handed to one router must share a load-sampling granularity
    pub fn validate_granularities(granularities: &[u64]) -> ConfigResult<()> {
        let Some(&first) = granularities.first() else {
            return Err(ConfigError::Empty { what: "servers" });
        };

        if let Some((index, &other)) = granularities
            .iter()
            .enumerate()
            .find(|&(_, &g)| g != first)
        {
            return Err(ConfigError::IncompatibleConfig {
                reason: format!(
                    "server {} has granularity {} but server 0 has {}",
                    index, other, first
                ),
            });
        }

        Ok(())
    }

    fn validate_server_count(num_servers: usize) -> ConfigResult<()> {
        if num_servers == 0 {
            return Err(ConfigError::InvalidValue {
                field: "num_servers".to_string(),
                value: num_servers.to_string(),
                reason: "Must be > 0".to_string(),
            });
        }
        Ok(())
    }

    fn validate_precision(field: &str, precision: u8) -> ConfigResult<()> {
        if !(MIN_PRECISION..=MAX_PRECISION).contains(&precision) {
            return Err(ConfigError::InvalidValue {
                field: field.to_string(),
                value: precision.to_string(),
                reason: format!("Must be in {}..={}", MIN_PRECISION, MAX_PRECISION),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_power_of_choices_ok() {
        let config = PowerOfChoicesConfig::new(2, 10);
        assert!(ConfigValidator::validate_power_of_choices(&config, 4).is_ok());
    }

    #[test]
    fn test_validate_zero_servers_or_sources() {
        let config = PowerOfChoicesConfig::new(2, 10);
        assert!(matches!(
            ConfigValidator::validate_power_of_choices(&config, 0),
            Err(ConfigError::InvalidValue { field, .. }) if field == "num_servers"
        ));

        let config = PowerOfChoicesConfig::new(0, 10);
        assert!(matches!(
            ConfigValidator::validate_power_of_choices(&config, 3),
            Err(ConfigError::InvalidValue { field, .. }) if field == "num_sources"
        ));
    }

    #[test]
    fn test_validate_threshold_and_choices() {
        let config = PowerOfChoicesConfig::new(1, 0);
        assert!(ConfigValidator::validate_power_of_choices(&config, 3).is_err());

        let mut config = PowerOfChoicesConfig::new(1, 2);
        config.default_choice_count = 0;
        assert!(ConfigValidator::validate_power_of_choices(&config, 3).is_err());

        let mut config = PowerOfChoicesConfig::new(1, 2);
        config.choice_counts = vec![2, 2];
        assert!(matches!(
            ConfigValidator::validate_power_of_choices(&config, 3),
            Err(ConfigError::IncompatibleConfig { .. })
        ));

        let mut config = PowerOfChoicesConfig::new(2, 2);
        config.choice_counts = vec![3, 0];
        assert!(matches!(
            ConfigValidator::validate_power_of_choices(&config, 3),
            Err(ConfigError::InvalidValue { field, .. }) if field == "choice_counts[1]"
        ));
    }

    #[test]
    fn test_validate_sticky_ranges() {
        assert!(ConfigValidator::validate_sticky(&StickyConfig::new(4, 0.1)).is_ok());
        assert!(ConfigValidator::validate_sticky(&StickyConfig::new(4, 1.0)).is_ok());
        assert!(ConfigValidator::validate_sticky(&StickyConfig::new(4, 0.0)).is_err());
        assert!(ConfigValidator::validate_sticky(&StickyConfig::new(4, 1.5)).is_err());
        assert!(ConfigValidator::validate_sticky(&StickyConfig::new(4, f64::NAN)).is_err());
        assert!(ConfigValidator::validate_sticky(&StickyConfig::new(0, 0.1)).is_err());
        assert!(
            ConfigValidator::validate_sticky(&StickyConfig::new(4, 0.1).with_epsilon(-0.5))
                .is_err()
        );
        assert!(
            ConfigValidator::validate_sticky(&StickyConfig::new(4, 0.1).with_max_tracked_keys(0))
                .is_err()
        );

        let mut config = StickyConfig::new(4, 0.1);
        config.server_precision = 2;
        assert!(matches!(
            ConfigValidator::validate_sticky(&config),
            Err(ConfigError::InvalidValue { field, .. }) if field == "server_precision"
        ));
    }

    #[test]
    fn test_validate_sticky_server_count_mismatch() {
        let config = PartitionerConfig::Sticky(StickyConfig::new(4, 0.1));
        assert!(ConfigValidator::validate(&config, 4).is_ok());
        assert!(matches!(
            ConfigValidator::validate(&config, 3),
            Err(ConfigError::IncompatibleConfig { .. })
        ));
    }

    #[test]
    fn test_validate_granularities() {
        assert!(ConfigValidator::validate_granularities(&[10, 10, 10]).is_ok());
        assert!(matches!(
            ConfigValidator::validate_granularities(&[]),
            Err(ConfigError::Empty { what: "servers" })
        ));
        let err = ConfigValidator::validate_granularities(&[10, 10, 20]).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Incompatible configuration: server 2 has granularity 20 but server 0 has 10"
        );
    }
}
