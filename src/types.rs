use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::money::Money;

/// unique identifier for a loan
pub type LoanId = Uuid;

/// identifier of the borrowing user, resolved by the caller
pub type OwnerId = Uuid;

pub type ScheduledRepaymentId = Uuid;

pub type ReceivedRepaymentId = Uuid;

/// loan status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoanStatus {
    /// outstanding balance remains
    Due,
    /// fully paid off
    Repaid,
}

/// installment status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InstallmentStatus {
    /// nothing paid yet
    Due,
    /// reduced but not cleared
    Partial,
    /// cleared
    Repaid,
}

impl InstallmentStatus {
    /// status implied by an installment's original and outstanding amounts
    pub fn from_balances(amount: Money, outstanding: Money) -> Self {
        if outstanding.is_zero() {
            InstallmentStatus::Repaid
        } else if outstanding < amount {
            InstallmentStatus::Partial
        } else {
            InstallmentStatus::Due
        }
    }
}

/// portion of a received repayment applied to one installment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallmentAllocation {
    pub scheduled_repayment_id: ScheduledRepaymentId,
    pub installment_number: u32,
    pub applied: Money,
    pub remaining_outstanding: Money,
    pub status: InstallmentStatus,
}
