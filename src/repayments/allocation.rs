use log::debug;
use serde::{Deserialize, Serialize};

use crate::loan::ScheduledRepayment;
use crate::money::Money;
use crate::types::{InstallmentAllocation, InstallmentStatus};

/// outcome of spreading one payment over a schedule
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AllocationResult {
    pub allocations: Vec<InstallmentAllocation>,
    pub applied: Money,
    /// left over once every installment is cleared
    pub unapplied: Money,
}

impl AllocationResult {
    /// installments this payment cleared
    pub fn repaid_installments(&self) -> impl Iterator<Item = &InstallmentAllocation> {
        self.allocations
            .iter()
            .filter(|a| a.status == InstallmentStatus::Repaid)
    }
}

/// applies payments to installments, earliest due date first
#[derive(Debug, Clone, Copy, Default)]
pub struct RepaymentAllocator;

impl RepaymentAllocator {
    pub fn new() -> Self {
        Self
    }

    /// consume `amount` against outstanding installments in due-date order
    ///
    /// Installments with nothing outstanding are skipped. Each touched
    /// installment becomes `Repaid` when cleared and `Partial` otherwise.
    pub fn allocate(&self, installments: &mut [ScheduledRepayment], amount: Money) -> AllocationResult {
        let mut order: Vec<usize> = (0..installments.len()).collect();
        order.sort_by_key(|&idx| (installments[idx].due_date, installments[idx].installment_number));

        let mut remaining = amount.max(Money::ZERO);
        let mut result = AllocationResult::default();

        for idx in order {
            if remaining.is_zero() {
                break;
            }

            let installment = &mut installments[idx];
            if !installment.outstanding_amount.is_positive() {
                continue;
            }

            let applied = remaining.min(installment.outstanding_amount);
            installment.outstanding_amount -= applied;
            installment.status =
                InstallmentStatus::from_balances(installment.amount, installment.outstanding_amount);
            remaining -= applied;
            result.applied += applied;

            debug!(
                "applied {} to installment {} due {}, {} outstanding",
                applied, installment.installment_number, installment.due_date, installment.outstanding_amount
            );

            result.allocations.push(InstallmentAllocation {
                scheduled_repayment_id: installment.id,
                installment_number: installment.installment_number,
                applied,
                remaining_outstanding: installment.outstanding_amount,
                status: installment.status,
            });
        }

        result.unapplied = remaining;
        result
    }
}
