use serde::{Deserialize, Serialize};

use crate::errors::{LoanError, Result};
use crate::money::CurrencyCode;

/// loan origination limits
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoanConfig {
    /// largest accepted term count
    pub max_term_count: u32,
    /// accepted currencies, any valid code when unset
    pub allowed_currencies: Option<Vec<CurrencyCode>>,
    /// reloads attempted when a repayment loses a version race
    pub max_conflict_retries: u32,
    /// undrained service events kept before the oldest are dropped
    pub event_buffer_capacity: usize,
}

impl Default for LoanConfig {
    fn default() -> Self {
        Self {
            max_term_count: 360,
            allowed_currencies: None,
            max_conflict_retries: 3,
            event_buffer_capacity: 1024,
        }
    }
}

impl LoanConfig {
    /// restrict origination to the given currencies
    pub fn with_currencies(mut self, currencies: Vec<CurrencyCode>) -> Self {
        self.allowed_currencies = Some(currencies);
        self
    }

    pub fn with_conflict_retries(mut self, retries: u32) -> Self {
        self.max_conflict_retries = retries;
        self
    }

    pub fn with_event_buffer_capacity(mut self, capacity: usize) -> Self {
        self.event_buffer_capacity = capacity;
        self
    }

    pub fn with_max_term_count(mut self, max_term_count: u32) -> Self {
        self.max_term_count = max_term_count;
        self
    }

    /// parse from json, missing fields take defaults
    pub fn from_json(json: &str) -> Result<Self> {
        let config: LoanConfig = serde_json::from_str(json).map_err(|e| LoanError::InvalidArgument {
            message: format!("invalid loan configuration: {}", e),
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_term_count == 0 {
            return Err(LoanError::invalid("max_term_count must be at least 1"));
        }
        if self.event_buffer_capacity == 0 {
            return Err(LoanError::invalid("event_buffer_capacity must be at least 1"));
        }
        if let Some(allowed) = &self.allowed_currencies {
            if allowed.is_empty() {
                return Err(LoanError::invalid("allowed_currencies must not be empty when set"));
            }
        }
        Ok(())
    }

    pub fn check_term_count(&self, term_count: u32) -> Result<()> {
        if term_count > self.max_term_count {
            return Err(LoanError::invalid(format!(
                "term count {} exceeds maximum {}",
                term_count, self.max_term_count
            )));
        }
        Ok(())
    }

    pub fn check_currency(&self, currency: CurrencyCode) -> Result<()> {
        match &self.allowed_currencies {
            Some(allowed) if !allowed.contains(&currency) => Err(LoanError::invalid(format!(
                "currency {} is not supported",
                currency
            ))),
            _ => Ok(()),
        }
    }
}
