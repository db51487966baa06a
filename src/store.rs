use std::collections::HashMap;

use log::warn;
use parking_lot::RwLock;

use crate::errors::StoreError;
use crate::loan::{Loan, ReceivedRepayment};
use crate::types::{LoanId, OwnerId};

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// persistence port for the loan aggregate
///
/// Both writes are all-or-nothing. `update_with_repayment` must refuse a loan
/// whose `version` no longer matches the stored one, so concurrent repayments
/// against the same loan are serialized by the store.
pub trait LoanStore: Send + Sync {
    /// insert a loan together with its scheduled repayments
    fn create_loan(&self, loan: &Loan) -> StoreResult<()>;

    /// replace the loan and its installments and append the received repayment,
    /// returning the new version
    fn update_with_repayment(&self, loan: &Loan, received: &ReceivedRepayment) -> StoreResult<u64>;

    fn find_loan(&self, id: LoanId) -> StoreResult<Option<Loan>>;

    fn loans_for_owner(&self, owner_id: OwnerId) -> StoreResult<Vec<Loan>>;

    fn received_repayments(&self, loan_id: LoanId) -> StoreResult<Vec<ReceivedRepayment>>;
}

#[derive(Debug, Default)]
struct Tables {
    loans: HashMap<LoanId, Loan>,
    received: HashMap<LoanId, Vec<ReceivedRepayment>>,
}

/// in-process store with optimistic versioning
#[derive(Debug, Default)]
pub struct InMemoryLoanStore {
    tables: RwLock<Tables>,
}

impl InMemoryLoanStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.tables.read().loans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl LoanStore for InMemoryLoanStore {
    fn create_loan(&self, loan: &Loan) -> StoreResult<()> {
        let mut tables = self.tables.write();
        if tables.loans.contains_key(&loan.id) {
            return Err(StoreError::DuplicateLoan { id: loan.id });
        }
        tables.loans.insert(loan.id, loan.clone());
        tables.received.insert(loan.id, Vec::new());
        Ok(())
    }

    fn update_with_repayment(&self, loan: &Loan, received: &ReceivedRepayment) -> StoreResult<u64> {
        let mut tables = self.tables.write();

        let stored_version = tables
            .loans
            .get(&loan.id)
            .map(|stored| stored.version)
            .ok_or(StoreError::NotFound { id: loan.id })?;

        if stored_version != loan.version {
            warn!(
                "rejected stale write to loan {}: version {} is behind {}",
                loan.id, loan.version, stored_version
            );
            return Err(StoreError::VersionConflict {
                id: loan.id,
                expected: loan.version,
                actual: stored_version,
            });
        }

        let mut updated = loan.clone();
        updated.version = stored_version + 1;
        let version = updated.version;

        tables.loans.insert(loan.id, updated);
        tables.received.entry(loan.id).or_default().push(received.clone());

        Ok(version)
    }

    fn find_loan(&self, id: LoanId) -> StoreResult<Option<Loan>> {
        Ok(self.tables.read().loans.get(&id).cloned())
    }

    fn loans_for_owner(&self, owner_id: OwnerId) -> StoreResult<Vec<Loan>> {
        let tables = self.tables.read();
        let mut loans: Vec<Loan> = tables
            .loans
            .values()
            .filter(|loan| loan.owner_id == owner_id)
            .cloned()
            .collect();
        loans.sort_by_key(|loan| (loan.processed_at, loan.created_at));
        Ok(loans)
    }

    fn received_repayments(&self, loan_id: LoanId) -> StoreResult<Vec<ReceivedRepayment>> {
        self.tables
            .read()
            .received
            .get(&loan_id)
            .cloned()
            .ok_or(StoreError::NotFound { id: loan_id })
    }
}
