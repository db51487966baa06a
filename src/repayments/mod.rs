pub mod allocation;
pub mod schedule;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::money::{CurrencyCode, Money};
use crate::types::LoanId;

pub use allocation::{AllocationResult, RepaymentAllocator};
pub use schedule::{add_months, generate_schedule, RepaymentSchedule, ScheduledRepaymentDraft};

/// repayment submitted against a loan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepaymentRequest {
    pub loan_id: LoanId,
    pub amount: Money,
    pub currency_code: CurrencyCode,
    pub received_at: NaiveDate,
}

impl RepaymentRequest {
    pub fn new(loan_id: LoanId, amount: Money, currency_code: CurrencyCode, received_at: NaiveDate) -> Self {
        Self {
            loan_id,
            amount,
            currency_code,
            received_at,
        }
    }
}
