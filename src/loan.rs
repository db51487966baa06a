use chrono::{DateTime, NaiveDate, Utc};
use log::debug;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::{LoanError, Result};
use crate::money::{CurrencyCode, Money};
use crate::repayments::{AllocationResult, RepaymentAllocator, RepaymentSchedule, ScheduledRepaymentDraft};
use crate::types::{
    InstallmentStatus, LoanId, LoanStatus, OwnerId, ReceivedRepaymentId, ScheduledRepaymentId,
};

/// one installment of a loan's schedule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduledRepayment {
    pub id: ScheduledRepaymentId,
    /// owning loan, looked up by id
    pub loan_id: LoanId,
    pub installment_number: u32,
    pub amount: Money,
    pub outstanding_amount: Money,
    pub currency_code: CurrencyCode,
    pub due_date: NaiveDate,
    pub status: InstallmentStatus,
}

impl ScheduledRepayment {
    pub fn from_draft(draft: ScheduledRepaymentDraft, loan_id: LoanId, currency_code: CurrencyCode) -> Self {
        Self {
            id: Uuid::new_v4(),
            loan_id,
            installment_number: draft.installment_number,
            amount: draft.amount,
            outstanding_amount: draft.outstanding_amount,
            currency_code,
            due_date: draft.due_date,
            status: draft.status,
        }
    }

    pub fn paid_amount(&self) -> Money {
        self.amount - self.outstanding_amount
    }

    pub fn is_repaid(&self) -> bool {
        self.status == InstallmentStatus::Repaid
    }
}

/// ledger entry for money received against a loan, never modified
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceivedRepayment {
    pub id: ReceivedRepaymentId,
    pub loan_id: LoanId,
    pub amount: Money,
    pub currency_code: CurrencyCode,
    pub received_at: NaiveDate,
    /// when the entry was written
    pub recorded_at: DateTime<Utc>,
}

/// result of applying a repayment to a loan
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedRepayment {
    pub received: ReceivedRepayment,
    pub allocation: AllocationResult,
    /// this repayment cleared the loan
    pub loan_repaid: bool,
}

/// installment loan aggregate, owns its schedule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Loan {
    pub id: LoanId,
    pub owner_id: OwnerId,
    pub principal_amount: Money,
    pub currency_code: CurrencyCode,
    pub term_count: u32,
    pub outstanding_amount: Money,
    pub status: LoanStatus,
    pub processed_at: NaiveDate,
    pub created_at: DateTime<Utc>,
    /// bumped by the store on every successful update
    pub version: u64,
    pub scheduled_repayments: Vec<ScheduledRepayment>,
}

impl Loan {
    /// build a loan and its full schedule, nothing persisted
    pub fn originate(
        owner_id: OwnerId,
        principal_amount: Money,
        currency_code: CurrencyCode,
        term_count: u32,
        processed_at: NaiveDate,
        created_at: DateTime<Utc>,
    ) -> Result<Self> {
        let schedule = RepaymentSchedule::generate(principal_amount, term_count, processed_at)?;
        let id = Uuid::new_v4();

        let scheduled_repayments = schedule
            .installments
            .into_iter()
            .map(|draft| ScheduledRepayment::from_draft(draft, id, currency_code))
            .collect();

        let loan = Self {
            id,
            owner_id,
            principal_amount,
            currency_code,
            term_count,
            outstanding_amount: principal_amount,
            status: LoanStatus::Due,
            processed_at,
            created_at,
            version: 0,
            scheduled_repayments,
        };
        loan.check_invariants()?;

        Ok(loan)
    }

    /// check a repayment without touching the loan
    pub fn validate_repayment(&self, amount: Money, currency_code: CurrencyCode) -> Result<()> {
        if currency_code != self.currency_code {
            return Err(LoanError::CurrencyMismatch {
                expected: self.currency_code,
                provided: currency_code,
            });
        }

        if !amount.is_positive() {
            return Err(LoanError::InvalidRepaymentAmount { amount });
        }

        if amount > self.outstanding_amount {
            return Err(LoanError::OverpaymentRejected {
                outstanding: self.outstanding_amount,
                requested: amount,
            });
        }

        Ok(())
    }

    /// apply a repayment to outstanding installments, earliest due first
    ///
    /// Either every balance and status is updated or, on error, none is.
    pub fn apply_repayment(
        &mut self,
        amount: Money,
        currency_code: CurrencyCode,
        received_at: NaiveDate,
        recorded_at: DateTime<Utc>,
    ) -> Result<AppliedRepayment> {
        self.validate_repayment(amount, currency_code)?;

        let mut installments = self.scheduled_repayments.clone();
        let allocation = RepaymentAllocator::new().allocate(&mut installments, amount);

        if !allocation.unapplied.is_zero() || allocation.applied != amount {
            return Err(LoanError::InvariantViolation {
                message: format!(
                    "loan {} could not absorb {}: {} left unapplied",
                    self.id, amount, allocation.unapplied
                ),
            });
        }

        self.scheduled_repayments = installments;
        self.outstanding_amount -= allocation.applied;

        let loan_repaid = self.outstanding_amount.is_zero();
        if loan_repaid {
            self.status = LoanStatus::Repaid;
        }

        debug!(
            "loan {} received {} across {} installments, {} outstanding",
            self.id,
            amount,
            allocation.allocations.len(),
            self.outstanding_amount
        );

        let received = ReceivedRepayment {
            id: Uuid::new_v4(),
            loan_id: self.id,
            amount,
            currency_code,
            received_at,
            recorded_at,
        };

        Ok(AppliedRepayment {
            received,
            allocation,
            loan_repaid,
        })
    }

    pub fn is_repaid(&self) -> bool {
        self.status == LoanStatus::Repaid
    }

    /// principal paid so far
    pub fn total_repaid(&self) -> Money {
        self.principal_amount - self.outstanding_amount
    }

    /// earliest installment still owing
    pub fn next_due_installment(&self) -> Option<&ScheduledRepayment> {
        self.scheduled_repayments
            .iter()
            .filter(|i| i.outstanding_amount.is_positive())
            .min_by_key(|i| i.due_date)
    }

    /// installments owing with a due date before `as_of`
    pub fn overdue_installments(&self, as_of: NaiveDate) -> Vec<&ScheduledRepayment> {
        self.scheduled_repayments
            .iter()
            .filter(|i| i.outstanding_amount.is_positive() && i.due_date < as_of)
            .collect()
    }

    pub fn overdue_amount(&self, as_of: NaiveDate) -> Money {
        self.overdue_installments(as_of)
            .into_iter()
            .map(|i| i.outstanding_amount)
            .sum()
    }

    pub fn maturity_date(&self) -> Option<NaiveDate> {
        self.scheduled_repayments.last().map(|i| i.due_date)
    }

    /// verify the aggregate's balance and ordering invariants
    pub fn check_invariants(&self) -> Result<()> {
        let violation = |message: String| Err(LoanError::InvariantViolation { message });

        if self.scheduled_repayments.len() != self.term_count as usize {
            return violation(format!(
                "loan {} has {} installments for {} terms",
                self.id,
                self.scheduled_repayments.len(),
                self.term_count
            ));
        }

        let scheduled: Money = self.scheduled_repayments.iter().map(|i| i.amount).sum();
        if scheduled != self.principal_amount {
            return violation(format!(
                "loan {} schedules {} against principal {}",
                self.id, scheduled, self.principal_amount
            ));
        }

        let owing: Money = self.scheduled_repayments.iter().map(|i| i.outstanding_amount).sum();
        if owing != self.outstanding_amount {
            return violation(format!(
                "loan {} outstanding {} differs from installments {}",
                self.id, self.outstanding_amount, owing
            ));
        }

        if self.outstanding_amount.is_negative() || self.outstanding_amount > self.principal_amount {
            return violation(format!(
                "loan {} outstanding {} outside 0..={}",
                self.id, self.outstanding_amount, self.principal_amount
            ));
        }

        let expected_status = if self.outstanding_amount.is_zero() {
            LoanStatus::Repaid
        } else {
            LoanStatus::Due
        };
        if self.status != expected_status {
            return violation(format!(
                "loan {} is {:?} with {} outstanding",
                self.id, self.status, self.outstanding_amount
            ));
        }

        for installment in &self.scheduled_repayments {
            if installment.loan_id != self.id || installment.currency_code != self.currency_code {
                return violation(format!(
                    "installment {} does not belong to loan {}",
                    installment.id, self.id
                ));
            }
            if installment.outstanding_amount.is_negative()
                || installment.outstanding_amount > installment.amount
            {
                return violation(format!(
                    "installment {} outstanding {} outside 0..={}",
                    installment.installment_number, installment.outstanding_amount, installment.amount
                ));
            }
            let expected = InstallmentStatus::from_balances(installment.amount, installment.outstanding_amount);
            if installment.status != expected {
                return violation(format!(
                    "installment {} is {:?}, balances imply {:?}",
                    installment.installment_number, installment.status, expected
                ));
            }
        }

        for pair in self.scheduled_repayments.windows(2) {
            if pair[0].due_date >= pair[1].due_date {
                return violation(format!(
                    "loan {} due dates not increasing at installment {}",
                    self.id, pair[1].installment_number
                ));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use proptest::prelude::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn sgd() -> CurrencyCode {
        CurrencyCode::new("SGD").unwrap()
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 15, 9, 0, 0).unwrap()
    }

    fn loan(principal: i64, terms: u32) -> Loan {
        Loan::originate(Uuid::new_v4(), Money::from_minor(principal), sgd(), terms, date(2024, 1, 15), now())
            .unwrap()
    }

    #[test]
    fn test_origination() {
        let loan = loan(1000, 3);

        assert_eq!(loan.outstanding_amount, Money::from_minor(1000));
        assert_eq!(loan.status, LoanStatus::Due);
        assert_eq!(loan.scheduled_repayments.len(), 3);
        assert_eq!(loan.maturity_date(), Some(date(2024, 4, 15)));
        assert!(loan.scheduled_repayments.iter().all(|i| i.loan_id == loan.id));
        assert!(loan.check_invariants().is_ok());
    }

    #[test]
    fn test_origination_rejects_bad_terms() {
        let err = Loan::originate(Uuid::new_v4(), Money::from_minor(1000), sgd(), 0, date(2024, 1, 1), now());
        assert!(matches!(err, Err(LoanError::InvalidArgument { .. })));

        let err = Loan::originate(Uuid::new_v4(), Money::ZERO, sgd(), 3, date(2024, 1, 1), now());
        assert!(matches!(err, Err(LoanError::InvalidArgument { .. })));
    }

    #[test]
    fn test_full_repayment_in_installments() {
        let mut loan = loan(1000, 3);

        for (amount, expected_outstanding) in [(333, 667), (333, 334), (334, 0)] {
            loan.apply_repayment(Money::from_minor(amount), sgd(), date(2024, 2, 15), now())
                .unwrap();
            assert_eq!(loan.outstanding_amount, Money::from_minor(expected_outstanding));
            assert!(loan.check_invariants().is_ok());
        }

        assert_eq!(loan.status, LoanStatus::Repaid);
        assert!(loan.scheduled_repayments.iter().all(|i| i.is_repaid()));
        assert!(loan.next_due_installment().is_none());
    }

    #[test]
    fn test_single_payment_clears_loan() {
        let mut loan = loan(1000, 3);
        let applied = loan
            .apply_repayment(Money::from_minor(1000), sgd(), date(2024, 2, 1), now())
            .unwrap();

        assert!(applied.loan_repaid);
        assert_eq!(applied.allocation.allocations.len(), 3);
        assert_eq!(applied.received.amount, Money::from_minor(1000));
        assert_eq!(applied.received.loan_id, loan.id);
        assert!(loan.is_repaid());
    }

    #[test]
    fn test_partial_status() {
        let mut loan = loan(1000, 3);
        loan.apply_repayment(Money::from_minor(400), sgd(), date(2024, 2, 1), now())
            .unwrap();

        let statuses: Vec<_> = loan.scheduled_repayments.iter().map(|i| i.status).collect();
        assert_eq!(
            statuses,
            vec![InstallmentStatus::Repaid, InstallmentStatus::Partial, InstallmentStatus::Due]
        );
        assert_eq!(loan.next_due_installment().unwrap().installment_number, 2);
        assert_eq!(loan.scheduled_repayments[1].paid_amount(), Money::from_minor(67));
        assert_eq!(loan.total_repaid(), Money::from_minor(400));
        assert_eq!(loan.status, LoanStatus::Due);
    }

    #[test]
    fn test_overpayment_leaves_state_unchanged() {
        let mut loan = loan(1000, 3);
        loan.apply_repayment(Money::from_minor(100), sgd(), date(2024, 2, 1), now())
            .unwrap();
        let before = loan.clone();

        let err = loan
            .apply_repayment(Money::from_minor(901), sgd(), date(2024, 2, 2), now())
            .unwrap_err();
        assert!(matches!(
            err,
            LoanError::OverpaymentRejected { outstanding, requested }
                if outstanding == Money::from_minor(900) && requested == Money::from_minor(901)
        ));
        assert_eq!(loan, before);
    }

    #[test]
    fn test_currency_mismatch_leaves_state_unchanged() {
        let mut loan = loan(1000, 3);
        let before = loan.clone();

        let err = loan
            .apply_repayment(Money::from_minor(100), CurrencyCode::new("VND").unwrap(), date(2024, 2, 1), now())
            .unwrap_err();
        assert!(matches!(err, LoanError::CurrencyMismatch { .. }));
        assert_eq!(loan, before);
    }

    #[test]
    fn test_non_positive_amount_rejected() {
        let mut loan = loan(1000, 3);
        let before = loan.clone();

        for amount in [0, -50] {
            let err = loan
                .apply_repayment(Money::from_minor(amount), sgd(), date(2024, 2, 1), now())
                .unwrap_err();
            assert!(matches!(err, LoanError::InvalidRepaymentAmount { .. }));
        }
        assert_eq!(loan, before);
    }

    #[test]
    fn test_repaid_loan_rejects_further_payment() {
        let mut loan = loan(500, 1);
        loan.apply_repayment(Money::from_minor(500), sgd(), date(2024, 2, 1), now())
            .unwrap();

        let err = loan
            .apply_repayment(Money::from_minor(1), sgd(), date(2024, 3, 1), now())
            .unwrap_err();
        assert!(matches!(err, LoanError::OverpaymentRejected { .. }));
    }

    #[test]
    fn test_overdue_installments() {
        let mut loan = loan(900, 3);
        loan.apply_repayment(Money::from_minor(350), sgd(), date(2024, 2, 15), now())
            .unwrap();

        // due 2024-02-15 (repaid), 2024-03-15 (partial), 2024-04-15
        assert!(loan.overdue_installments(date(2024, 3, 15)).is_empty());
        let overdue = loan.overdue_installments(date(2024, 3, 16));
        assert_eq!(overdue.len(), 1);
        assert_eq!(overdue[0].installment_number, 2);
        assert_eq!(loan.overdue_amount(date(2024, 5, 1)), Money::from_minor(550));
    }

    #[test]
    fn test_invariant_check_detects_drift() {
        let mut loan = loan(1000, 3);
        loan.outstanding_amount = Money::from_minor(999);
        assert!(matches!(loan.check_invariants(), Err(LoanError::InvariantViolation { .. })));
    }

    #[test]
    fn test_zero_installments_for_tiny_principal() {
        let mut loan = Loan::originate(Uuid::new_v4(), Money::from_minor(2), sgd(), 3, date(2024, 1, 31), now()).unwrap();
        assert!(loan.check_invariants().is_ok());
        assert_eq!(loan.status, LoanStatus::Due);
        assert!(loan.scheduled_repayments[..2].iter().all(|i| i.is_repaid()));
        assert_eq!(loan.next_due_installment().unwrap().installment_number, 3);
        assert_eq!(loan.overdue_amount(date(2024, 12, 31)), Money::from_minor(2));

        let applied = loan.apply_repayment(Money::from_minor(2), sgd(), date(2024, 2, 1), now()).unwrap();
        assert_eq!(applied.allocation.allocations.len(), 1);
        assert_eq!(applied.allocation.allocations[0].installment_number, 3);
        assert!(applied.loan_repaid);
        assert!(loan.check_invariants().is_ok());
    }

    proptest! {
        #[test]
        fn prop_repayments_conserve_principal(
            principal in 1i64..=1_000_000,
            terms in 1u32..=60,
            cuts in proptest::collection::vec(1i64..=100_000, 0..12),
        ) {
            let mut loan = Loan::originate(
                Uuid::new_v4(), Money::from_minor(principal), sgd(), terms, date(2024, 1, 31), now(),
            ).unwrap();

            for cut in cuts {
                let amount = Money::from_minor(cut).min(loan.outstanding_amount);
                if amount.is_zero() {
                    break;
                }
                loan.apply_repayment(amount, sgd(), date(2024, 2, 1), now()).unwrap();
                prop_assert!(loan.check_invariants().is_ok());
            }

            let rest = loan.outstanding_amount;
            if rest.is_positive() {
                loan.apply_repayment(rest, sgd(), date(2024, 6, 1), now()).unwrap();
            }

            prop_assert_eq!(loan.outstanding_amount, Money::ZERO);
            prop_assert_eq!(loan.status, LoanStatus::Repaid);
            prop_assert!(loan.scheduled_repayments.iter().all(|i| i.outstanding_amount.is_zero()));
            prop_assert!(loan.check_invariants().is_ok());
        }
    }
}
