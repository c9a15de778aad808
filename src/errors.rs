use chrono::NaiveDate;
use thiserror::Error;

use crate::decimal::Money;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum LendingError {
    #[error("invalid loan terms: {message}")]
    InvalidLoanTerms {
        message: String,
    },

    #[error("fixed payment too low: minimum {minimum}, provided {provided}")]
    FixedPaymentTooLow {
        minimum: Money,
        provided: Money,
    },

    #[error("no eligible due date within {attempts} days of {start}")]
    DateRollExhausted {
        start: NaiveDate,
        attempts: u32,
    },

    #[error("invalid late fee policy: {message}")]
    InvalidLateFeePolicy {
        message: String,
    },

    #[error("calculation error: {message}")]
    CalculationError {
        message: String,
    },

    #[error("configuration error: {0}")]
    Configuration(String),
}

impl LendingError {
    pub(crate) fn invalid_terms(message: impl Into<String>) -> Self {
        LendingError::InvalidLoanTerms {
            message: message.into(),
        }
    }

    pub(crate) fn calculation(message: impl Into<String>) -> Self {
        LendingError::CalculationError {
            message: message.into(),
        }
    }
}

impl From<serde_json::Error> for LendingError {
    fn from(e: serde_json::Error) -> Self {
        LendingError::Configuration(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, LendingError>;
