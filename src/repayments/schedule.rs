use chrono::{Months, NaiveDate};
use log::debug;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::errors::{LoanError, Result};
use crate::money::Money;
use crate::types::InstallmentStatus;

/// installment produced by the generator, not yet attached to a loan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduledRepaymentDraft {
    pub installment_number: u32,
    pub amount: Money,
    pub outstanding_amount: Money,
    pub due_date: NaiveDate,
    pub status: InstallmentStatus,
}

/// equal monthly installments of a principal, last one absorbing the remainder
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepaymentSchedule {
    pub principal: Money,
    pub term_count: u32,
    pub start_date: NaiveDate,
    /// exact principal / term_count
    pub raw_installment: Decimal,
    /// floor of the raw installment, paid on every term but the last
    pub base_installment: Money,
    pub installments: Vec<ScheduledRepaymentDraft>,
}

impl RepaymentSchedule {
    /// generate the schedule anchored at `start_date`
    pub fn generate(principal: Money, term_count: u32, start_date: NaiveDate) -> Result<Self> {
        if !principal.is_positive() {
            return Err(LoanError::invalid(format!(
                "principal must be positive, got {}",
                principal
            )));
        }
        if term_count == 0 {
            return Err(LoanError::invalid("term count must be at least 1"));
        }

        // every due date falls on or before maturity
        if add_months(start_date, term_count).is_none() {
            return Err(LoanError::invalid(format!(
                "maturity {} months after {} is out of range",
                term_count, start_date
            )));
        }

        let raw_installment = principal
            .as_decimal()
            .checked_div(Decimal::from(term_count))
            .ok_or_else(|| LoanError::invalid("installment amount out of range"))?;

        let (base_installment, leftover) = principal
            .split_floor(term_count)
            .ok_or_else(|| LoanError::invalid("term count must be at least 1"))?;

        let mut installments = Vec::with_capacity(term_count as usize);

        for i in 1..=term_count {
            let due_date = add_months(start_date, i).ok_or_else(|| {
                LoanError::invalid(format!(
                    "due date {} months after {} is out of range",
                    i, start_date
                ))
            })?;

            let amount = if i == term_count {
                final_installment(principal, base_installment, term_count)?
            } else {
                base_installment
            };

            // principal below the term count leaves leading installments at zero
            installments.push(ScheduledRepaymentDraft {
                installment_number: i,
                amount,
                outstanding_amount: amount,
                due_date,
                status: InstallmentStatus::from_balances(amount, amount),
            });
        }

        debug!(
            "generated {} installments of {} for principal {} (remainder {} on final installment)",
            term_count, base_installment, principal, leftover
        );

        Ok(Self {
            principal,
            term_count,
            start_date,
            raw_installment,
            base_installment,
            installments,
        })
    }

    pub fn get_installment(&self, installment_number: u32) -> Option<&ScheduledRepaymentDraft> {
        installment_number
            .checked_sub(1)
            .and_then(|idx| self.installments.get(idx as usize))
    }

    pub fn total_amount(&self) -> Money {
        self.installments.iter().map(|i| i.amount).sum()
    }

    /// date of the last installment
    pub fn maturity_date(&self) -> Option<NaiveDate> {
        self.installments.last().map(|i| i.due_date)
    }
}

/// generate the installments for a principal
pub fn generate_schedule(
    principal: Money,
    term_count: u32,
    start_date: NaiveDate,
) -> Result<Vec<ScheduledRepaymentDraft>> {
    RepaymentSchedule::generate(principal, term_count, start_date).map(|s| s.installments)
}

/// principal minus every base installment before it
fn final_installment(principal: Money, base: Money, term_count: u32) -> Result<Money> {
    base.checked_mul(i64::from(term_count - 1))
        .and_then(|paid| principal.checked_sub(paid))
        .ok_or_else(|| LoanError::InvariantViolation {
            message: format!("final installment overflow for principal {}", principal),
        })
}

/// calendar month addition, clamped to the end of shorter months
///
/// Jan 31 + 1 month is Feb 28 (Feb 29 in leap years). Each due date is
/// computed from the anchor, so Jan 31 + 2 months is Mar 31, not Mar 28.
pub fn add_months(date: NaiveDate, months: u32) -> Option<NaiveDate> {
    date.checked_add_months(Months::new(months))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rust_decimal::prelude::ToPrimitive;
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn amounts(schedule: &[ScheduledRepaymentDraft]) -> Vec<i64> {
        schedule.iter().map(|i| i.amount.minor()).collect()
    }

    #[test]
    fn test_remainder_on_last_installment() {
        let start = date(2024, 1, 15);
        let schedule = RepaymentSchedule::generate(Money::from_minor(1000), 3, start).unwrap();

        assert_eq!(amounts(&schedule.installments), vec![333, 333, 334]);
        assert_eq!(schedule.base_installment, Money::from_minor(333));
        assert_eq!(
            schedule.installments.iter().map(|i| i.due_date).collect::<Vec<_>>(),
            vec![date(2024, 2, 15), date(2024, 3, 15), date(2024, 4, 15)]
        );
        assert_eq!(schedule.maturity_date(), Some(date(2024, 4, 15)));
    }

    #[test]
    fn test_even_split() {
        let schedule = generate_schedule(Money::from_minor(100), 4, date(2024, 1, 1)).unwrap();
        assert_eq!(amounts(&schedule), vec![25, 25, 25, 25]);
    }

    #[test]
    fn test_small_principal() {
        let schedule = generate_schedule(Money::from_minor(10), 3, date(2024, 1, 1)).unwrap();
        assert_eq!(amounts(&schedule), vec![3, 3, 4]);

        // a remainder of several units still lands entirely on the last installment
        let schedule = generate_schedule(Money::from_minor(100), 7, date(2024, 1, 1)).unwrap();
        assert_eq!(amounts(&schedule), vec![14, 14, 14, 14, 14, 14, 16]);
    }

    #[test]
    fn test_single_term() {
        let schedule = generate_schedule(Money::from_minor(5000), 1, date(2024, 3, 10)).unwrap();
        assert_eq!(schedule.len(), 1);
        assert_eq!(schedule[0].amount, Money::from_minor(5000));
        assert_eq!(schedule[0].due_date, date(2024, 4, 10));
    }

    #[test]
    fn test_drafts_start_due() {
        let schedule = generate_schedule(Money::from_minor(1000), 3, date(2024, 1, 1)).unwrap();
        for draft in &schedule {
            assert_eq!(draft.outstanding_amount, draft.amount);
            assert_eq!(draft.status, InstallmentStatus::Due);
        }
    }

    #[test]
    fn test_month_end_clamping() {
        let schedule = generate_schedule(Money::from_minor(400), 4, date(2024, 1, 31)).unwrap();
        let dates: Vec<_> = schedule.iter().map(|i| i.due_date).collect();
        assert_eq!(
            dates,
            vec![date(2024, 2, 29), date(2024, 3, 31), date(2024, 4, 30), date(2024, 5, 31)]
        );

        assert_eq!(add_months(date(2023, 1, 31), 1), Some(date(2023, 2, 28)));
    }

    #[test]
    fn test_invalid_arguments() {
        let start = date(2024, 1, 1);
        assert!(matches!(
            generate_schedule(Money::ZERO, 3, start),
            Err(LoanError::InvalidArgument { .. })
        ));
        assert!(matches!(
            generate_schedule(Money::from_minor(-100), 3, start),
            Err(LoanError::InvalidArgument { .. })
        ));
        assert!(matches!(
            generate_schedule(Money::from_minor(100), 0, start),
            Err(LoanError::InvalidArgument { .. })
        ));
        assert!(matches!(
            generate_schedule(Money::from_minor(100), 2, NaiveDate::MAX),
            Err(LoanError::InvalidArgument { .. })
        ));
    }

    #[test]
    fn test_principal_below_term_count() {
        let schedule = generate_schedule(Money::from_minor(2), 3, date(2024, 1, 1)).unwrap();
        assert_eq!(amounts(&schedule), vec![0, 0, 2]);
        assert_eq!(schedule[0].status, InstallmentStatus::Repaid);
        assert_eq!(schedule[1].outstanding_amount, Money::ZERO);
        assert_eq!(schedule[2].status, InstallmentStatus::Due);
        assert_eq!(schedule[2].due_date, date(2024, 4, 1));
    }

    #[test]
    fn test_huge_term_count_is_rejected_before_allocating() {
        assert!(matches!(
            generate_schedule(Money::from_minor(i64::MAX), u32::MAX, date(2024, 1, 1)),
            Err(LoanError::InvalidArgument { .. })
        ));
        assert!(matches!(
            RepaymentSchedule::generate(Money::from_minor(1000), u32::MAX - 1, date(2024, 1, 1)),
            Err(LoanError::InvalidArgument { .. })
        ));
    }

    #[test]
    fn test_raw_installment() {
        let schedule = RepaymentSchedule::generate(Money::from_minor(1000), 4, date(2024, 1, 1)).unwrap();
        assert_eq!(schedule.raw_installment, dec!(250));
        assert_eq!(schedule.get_installment(4).unwrap().amount, Money::from_minor(250));
        assert!(schedule.get_installment(0).is_none());
        assert!(schedule.get_installment(5).is_none());
    }

    proptest! {
        #[test]
        fn prop_installments_sum_to_principal(principal in 1i64..=10_000_000_000, terms in 1u32..=480) {
            let schedule = RepaymentSchedule::generate(Money::from_minor(principal), terms, date(2024, 1, 31)).unwrap();
            prop_assert_eq!(schedule.installments.len(), terms as usize);
            prop_assert_eq!(schedule.total_amount(), Money::from_minor(principal));
            prop_assert_eq!(schedule.installments[0].due_date, date(2024, 2, 29));
            prop_assert!(schedule.installments.iter().all(|i| !i.amount.is_negative()));
            prop_assert!(schedule.installments.last().unwrap().amount.is_positive());
            for draft in &schedule.installments {
                prop_assert_eq!(draft.status, InstallmentStatus::from_balances(draft.amount, draft.amount));
            }
            for pair in schedule.installments.windows(2) {
                prop_assert!(pair[0].due_date < pair[1].due_date);
            }
        }

        #[test]
        fn prop_fraction_accumulation_matches(principal in 1i64..=1_000_000_000, terms in 1u32..=480) {
            let schedule = RepaymentSchedule::generate(Money::from_minor(principal), terms, date(2024, 1, 1)).unwrap();
            let raw = schedule.raw_installment;
            let base = raw.floor();
            let accumulated = base + ((raw - base) * Decimal::from(terms)).round();
            let last = schedule.installments.last().unwrap().amount.minor();
            prop_assert_eq!(accumulated.to_i64(), Some(last));
        }
    }
}
