use thiserror::Error;
use uuid::Uuid;

use crate::money::{CurrencyCode, Money};

#[derive(Error, Debug)]
pub enum LoanError {
    #[error("invalid argument: {message}")]
    InvalidArgument {
        message: String,
    },

    #[error("invalid repayment amount: {amount}")]
    InvalidRepaymentAmount {
        amount: Money,
    },

    #[error("currency mismatch: loan is {expected}, repayment is {provided}")]
    CurrencyMismatch {
        expected: CurrencyCode,
        provided: CurrencyCode,
    },

    #[error("overpayment rejected: outstanding {outstanding}, requested {requested}")]
    OverpaymentRejected {
        outstanding: Money,
        requested: Money,
    },

    #[error("loan not found: {id}")]
    LoanNotFound {
        id: Uuid,
    },

    #[error("invariant violation: {message}")]
    InvariantViolation {
        message: String,
    },

    #[error("persistence failure: {0}")]
    PersistenceFailure(#[from] StoreError),
}

impl LoanError {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        LoanError::InvalidArgument {
            message: message.into(),
        }
    }
}

/// failures reported by a loan store
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("loan already exists: {id}")]
    DuplicateLoan {
        id: Uuid,
    },

    #[error("loan not stored: {id}")]
    NotFound {
        id: Uuid,
    },

    #[error("concurrent modification of loan {id}: expected version {expected}, stored version {actual}")]
    VersionConflict {
        id: Uuid,
        expected: u64,
        actual: u64,
    },

    #[error("storage backend error: {message}")]
    Backend {
        message: String,
    },
}

pub type Result<T> = std::result::Result<T, LoanError>;
