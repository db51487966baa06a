//! json views of loans for the http boundary
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::loan::{Loan, ReceivedRepayment, ScheduledRepayment};
use crate::money::{CurrencyCode, Money};
use crate::types::{InstallmentStatus, LoanId, LoanStatus, OwnerId, ReceivedRepaymentId};

/// serializable view of a loan and its schedule
#[derive(Debug, Serialize, Deserialize)]
pub struct LoanView {
    pub id: LoanId,
    pub owner_id: OwnerId,
    pub currency_code: CurrencyCode,
    pub status: LoanStatus,
    pub processed_at: NaiveDate,
    pub maturity_date: Option<NaiveDate>,
    pub term_count: u32,
    pub balances: BalanceView,
    pub scheduled_repayments: Vec<InstallmentView>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BalanceView {
    pub principal_amount: Money,
    pub outstanding_amount: Money,
    pub repaid_amount: Money,
    /// major-unit renderings, present when the exponent is known
    pub principal_major: Option<Decimal>,
    pub outstanding_major: Option<Decimal>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct InstallmentView {
    pub installment_number: u32,
    pub amount: Money,
    pub outstanding_amount: Money,
    pub due_date: NaiveDate,
    pub status: InstallmentStatus,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ReceivedRepaymentView {
    pub id: ReceivedRepaymentId,
    pub loan_id: LoanId,
    pub amount: Money,
    pub currency_code: CurrencyCode,
    pub received_at: NaiveDate,
}

impl From<&ScheduledRepayment> for InstallmentView {
    fn from(installment: &ScheduledRepayment) -> Self {
        InstallmentView {
            installment_number: installment.installment_number,
            amount: installment.amount,
            outstanding_amount: installment.outstanding_amount,
            due_date: installment.due_date,
            status: installment.status,
        }
    }
}

impl From<&ReceivedRepayment> for ReceivedRepaymentView {
    fn from(received: &ReceivedRepayment) -> Self {
        ReceivedRepaymentView {
            id: received.id,
            loan_id: received.loan_id,
            amount: received.amount,
            currency_code: received.currency_code,
            received_at: received.received_at,
        }
    }
}

impl LoanView {
    pub fn from_loan(loan: &Loan) -> Self {
        Self::build(loan, None)
    }

    /// include major-unit amounts for a currency with `exponent` decimal places
    pub fn with_exponent(loan: &Loan, exponent: u32) -> Self {
        Self::build(loan, Some(exponent))
    }

    fn build(loan: &Loan, exponent: Option<u32>) -> Self {
        LoanView {
            id: loan.id,
            owner_id: loan.owner_id,
            currency_code: loan.currency_code,
            status: loan.status,
            processed_at: loan.processed_at,
            maturity_date: loan.maturity_date(),
            term_count: loan.term_count,
            balances: BalanceView {
                principal_amount: loan.principal_amount,
                outstanding_amount: loan.outstanding_amount,
                repaid_amount: loan.total_repaid(),
                principal_major: exponent.map(|e| loan.principal_amount.to_major(e)),
                outstanding_major: exponent.map(|e| loan.outstanding_amount.to_major(e)),
            },
            scheduled_repayments: loan.scheduled_repayments.iter().map(InstallmentView::from).collect(),
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// convert to pretty-printed json string
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
