//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check that URLs and contract addresses parse
//! - Validate value ranges (timeouts > 0, percentile within 0..=100)
//!
//! Returns all validation errors, not just the first.

use alloy::primitives::Address;

use crate::config::schema::{ContractConfig, MinterConfig};

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path of the offending field.
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl std::error::Error for ValidationError {}

/// Validate a parsed configuration.
pub fn validate_config(config: &MinterConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if let Err(e) = config.network.rpc_url.parse::<url::Url>() {
        errors.push(ValidationError::new("network.rpc_url", format!("invalid URL: {}", e)));
    }
    for (i, failover) in config.network.failover_urls.iter().enumerate() {
        if let Err(e) = failover.parse::<url::Url>() {
            errors.push(ValidationError::new(
                format!("network.failover_urls[{}]", i),
                format!("invalid URL: {}", e),
            ));
        }
    }
    if config.network.rpc_timeout_secs == 0 {
        errors.push(ValidationError::new("network.rpc_timeout_secs", "must be greater than 0"));
    }

    validate_contract("contracts.token", &config.contracts.token, &mut errors);
    validate_contract("contracts.nft", &config.contracts.nft, &mut errors);

    if config.authorization.admin_key_env.trim().is_empty() {
        errors.push(ValidationError::new("authorization.admin_key_env", "must not be empty"));
    }

    let fees = &config.fees;
    if fees.history_blocks == 0 {
        errors.push(ValidationError::new("fees.history_blocks", "must be greater than 0"));
    }
    if !(0.0..=100.0).contains(&fees.reward_percentile) {
        errors.push(ValidationError::new("fees.reward_percentile", "must be within 0..=100"));
    }
    if fees.max_fee_gwei == 0 {
        errors.push(ValidationError::new("fees.max_fee_gwei", "must be greater than 0"));
    }
    if !(fees.gas_limit_multiplier >= 1.0) {
        errors.push(ValidationError::new("fees.gas_limit_multiplier", "must be at least 1.0"));
    }

    let confirmation = &config.confirmation;
    if confirmation.required_confirmations == 0 {
        errors.push(ValidationError::new(
            "confirmation.required_confirmations",
            "must be greater than 0",
        ));
    }
    if confirmation.timeout_ms == 0 {
        errors.push(ValidationError::new("confirmation.timeout_ms", "must be greater than 0"));
    }
    if confirmation.poll_interval_ms == 0 {
        errors.push(ValidationError::new(
            "confirmation.poll_interval_ms",
            "must be greater than 0",
        ));
    }

    if config.retries.enabled && config.retries.max_attempts == 0 {
        errors.push(ValidationError::new("retries.max_attempts", "must be greater than 0"));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn validate_contract(prefix: &str, contract: &ContractConfig, errors: &mut Vec<ValidationError>) {
    if contract.address.parse::<Address>().is_err() {
        errors.push(ValidationError::new(
            format!("{}.address", prefix),
            format!("invalid contract address '{}'", contract.address),
        ));
    }
    if contract.domain_version.is_empty() {
        errors.push(ValidationError::new(
            format!("{}.domain_version", prefix),
            "must not be empty",
        ));
    }
    if matches!(&contract.domain_name, Some(name) if name.is_empty()) {
        errors.push(ValidationError::new(
            format!("{}.domain_name", prefix),
            "must not be empty when set",
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&MinterConfig::default()).is_ok());
    }

    #[test]
    fn test_collects_all_errors() {
        let mut config = MinterConfig::default();
        config.network.rpc_url = "not a url".to_string();
        config.contracts.nft.address = "0x1234".to_string();
        config.fees.reward_percentile = 150.0;
        config.confirmation.timeout_ms = 0;

        let errors = validate_config(&config).unwrap_err();
        let fields: Vec<_> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(
            fields,
            vec![
                "network.rpc_url",
                "contracts.nft.address",
                "fees.reward_percentile",
                "confirmation.timeout_ms",
            ]
        );
    }

    #[test]
    fn test_rejects_shrinking_gas_multiplier() {
        let mut config = MinterConfig::default();
        config.fees.gas_limit_multiplier = 0.5;
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors[0].field, "fees.gas_limit_multiplier");
        assert!(errors[0].to_string().contains("at least 1.0"));
    }
}
