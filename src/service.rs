use chrono::NaiveDate;
use hourglass_rs::{SafeTimeProvider, TimeSource};
use log::{info, warn};
use parking_lot::Mutex;

use crate::config::LoanConfig;
use crate::errors::{LoanError, Result, StoreError};
use crate::events::{Event, EventStore};
use crate::loan::{AppliedRepayment, Loan, ReceivedRepayment};
use crate::money::{CurrencyCode, Money};
use crate::repayments::RepaymentRequest;
use crate::store::LoanStore;
use crate::types::{LoanId, OwnerId};

/// entry point for creating loans and recording repayments
///
/// Every operation validates before touching the store and writes through a
/// single all-or-nothing store call. Events collect in a buffer bounded by
/// `LoanConfig::event_buffer_capacity`; callers drain it with `take_events`.
pub struct LoanService<S: LoanStore> {
    store: S,
    config: LoanConfig,
    time: SafeTimeProvider,
    events: Mutex<EventStore>,
}

impl<S: LoanStore> LoanService<S> {
    pub fn new(store: S, config: LoanConfig, time: SafeTimeProvider) -> Result<Self> {
        config.validate()?;
        let events = Mutex::new(EventStore::with_capacity(config.event_buffer_capacity));
        Ok(Self {
            store,
            config,
            time,
            events,
        })
    }

    /// service on the system clock
    pub fn with_system_time(store: S, config: LoanConfig) -> Result<Self> {
        Self::new(store, config, SafeTimeProvider::new(TimeSource::System))
    }

    pub fn config(&self) -> &LoanConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn time(&self) -> &SafeTimeProvider {
        &self.time
    }

    /// today according to the service clock
    pub fn today(&self) -> NaiveDate {
        self.time.now().date_naive()
    }

    /// create a loan with its schedule anchored at `processed_at`
    pub fn create_loan(
        &self,
        owner_id: OwnerId,
        principal_amount: Money,
        currency_code: CurrencyCode,
        term_count: u32,
        processed_at: NaiveDate,
    ) -> Result<Loan> {
        self.config.check_term_count(term_count)?;
        self.config.check_currency(currency_code)?;

        let now = self.time.now();
        let loan = Loan::originate(
            owner_id,
            principal_amount,
            currency_code,
            term_count,
            processed_at,
            now,
        )?;

        self.store.create_loan(&loan)?;

        info!(
            "created loan {} for owner {}: {} {} over {} terms from {}",
            loan.id, owner_id, principal_amount, currency_code, term_count, processed_at
        );

        self.events.lock().emit(Event::LoanCreated {
            loan_id: loan.id,
            owner_id,
            principal_amount,
            currency_code,
            term_count,
            processed_at,
            timestamp: now,
        });

        Ok(loan)
    }

    /// create a loan disbursed today
    pub fn create_loan_now(
        &self,
        owner_id: OwnerId,
        principal_amount: Money,
        currency_code: CurrencyCode,
        term_count: u32,
    ) -> Result<Loan> {
        self.create_loan(owner_id, principal_amount, currency_code, term_count, self.today())
    }

    /// apply a repayment to `loan` and persist it
    ///
    /// `loan` is only replaced once the store accepted the write; on any error
    /// it is left as it was.
    pub fn repay_loan(
        &self,
        loan: &mut Loan,
        amount: Money,
        currency_code: CurrencyCode,
        received_at: NaiveDate,
    ) -> Result<ReceivedRepayment> {
        let now = self.time.now();
        let mut working = loan.clone();

        let applied = match working.apply_repayment(amount, currency_code, received_at, now) {
            Ok(applied) => applied,
            Err(err) => {
                warn!("rejected repayment of {} on loan {}: {}", amount, loan.id, err);
                self.events.lock().emit(Event::RepaymentRejected {
                    loan_id: loan.id,
                    amount,
                    reason: err.to_string(),
                    timestamp: now,
                });
                return Err(err);
            }
        };

        working.version = self.store.update_with_repayment(&working, &applied.received)?;
        *loan = working;

        self.record_applied(loan, &applied);

        Ok(applied.received)
    }

    /// repay today
    pub fn repay_loan_now(
        &self,
        loan: &mut Loan,
        amount: Money,
        currency_code: CurrencyCode,
    ) -> Result<ReceivedRepayment> {
        let today = self.today();
        self.repay_loan(loan, amount, currency_code, today)
    }

    /// load the loan and repay it, reloading when another writer got there first
    pub fn repay(&self, request: RepaymentRequest) -> Result<ReceivedRepayment> {
        let mut attempt = 0;
        loop {
            let mut loan = self.find_loan(request.loan_id)?;
            match self.repay_loan(&mut loan, request.amount, request.currency_code, request.received_at) {
                Err(LoanError::PersistenceFailure(StoreError::VersionConflict { .. }))
                    if attempt < self.config.max_conflict_retries =>
                {
                    attempt += 1;
                    warn!(
                        "version conflict on loan {}, retrying ({}/{})",
                        request.loan_id, attempt, self.config.max_conflict_retries
                    );
                }
                result => return result,
            }
        }
    }

    pub fn find_loan(&self, id: LoanId) -> Result<Loan> {
        self.store.find_loan(id)?.ok_or(LoanError::LoanNotFound { id })
    }

    pub fn loans_for_owner(&self, owner_id: OwnerId) -> Result<Vec<Loan>> {
        Ok(self.store.loans_for_owner(owner_id)?)
    }

    pub fn received_repayments(&self, loan_id: LoanId) -> Result<Vec<ReceivedRepayment>> {
        match self.store.received_repayments(loan_id) {
            Err(StoreError::NotFound { id }) => Err(LoanError::LoanNotFound { id }),
            other => Ok(other?),
        }
    }

    pub fn take_events(&self) -> Vec<Event> {
        self.events.lock().take_events()
    }

    /// events not yet taken
    pub fn pending_events(&self) -> usize {
        self.events.lock().len()
    }

    /// events dropped since the last `take_events`
    pub fn dropped_events(&self) -> u64 {
        self.events.lock().dropped()
    }

    fn record_applied(&self, loan: &Loan, applied: &AppliedRepayment) {
        let now = applied.received.recorded_at;

        info!(
            "recorded repayment {} of {} {} on loan {}, {} outstanding",
            applied.received.id,
            applied.received.amount,
            applied.received.currency_code,
            loan.id,
            loan.outstanding_amount
        );

        let mut events = self.events.lock();
        events.emit(Event::RepaymentReceived {
            loan_id: loan.id,
            received_repayment_id: applied.received.id,
            amount: applied.received.amount,
            outstanding_after: loan.outstanding_amount,
            received_at: applied.received.received_at,
            timestamp: now,
        });

        for allocation in applied.allocation.repaid_installments() {
            if let Some(installment) = loan
                .scheduled_repayments
                .iter()
                .find(|i| i.id == allocation.scheduled_repayment_id)
            {
                events.emit(Event::InstallmentRepaid {
                    loan_id: loan.id,
                    installment_number: installment.installment_number,
                    due_date: installment.due_date,
                    timestamp: now,
                });
            }
        }

        if applied.loan_repaid {
            info!("loan {} fully repaid", loan.id);
            events.emit(Event::LoanRepaid {
                loan_id: loan.id,
                final_payment: applied.received.amount,
                timestamp: now,
            });
        }
    }
}
