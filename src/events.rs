use std::collections::VecDeque;

use chrono::{DateTime, NaiveDate, Utc};
use log::warn;
use serde::{Deserialize, Serialize};

use crate::money::{CurrencyCode, Money};
use crate::types::{LoanId, OwnerId, ReceivedRepaymentId};

/// events emitted by loan operations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Event {
    LoanCreated {
        loan_id: LoanId,
        owner_id: OwnerId,
        principal_amount: Money,
        currency_code: CurrencyCode,
        term_count: u32,
        processed_at: NaiveDate,
        timestamp: DateTime<Utc>,
    },
    RepaymentReceived {
        loan_id: LoanId,
        received_repayment_id: ReceivedRepaymentId,
        amount: Money,
        outstanding_after: Money,
        received_at: NaiveDate,
        timestamp: DateTime<Utc>,
    },
    InstallmentRepaid {
        loan_id: LoanId,
        installment_number: u32,
        due_date: NaiveDate,
        timestamp: DateTime<Utc>,
    },
    LoanRepaid {
        loan_id: LoanId,
        final_payment: Money,
        timestamp: DateTime<Utc>,
    },
    RepaymentRejected {
        loan_id: LoanId,
        amount: Money,
        reason: String,
        timestamp: DateTime<Utc>,
    },
}

/// bounded buffer of events waiting for a consumer
///
/// Once `capacity` events are pending the oldest is dropped for each new one.
/// Consumers drain with `take_events`, which also resets the drop count.
#[derive(Debug)]
pub struct EventStore {
    events: VecDeque<Event>,
    capacity: usize,
    dropped: u64,
}

impl EventStore {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            events: VecDeque::new(),
            capacity: capacity.max(1),
            dropped: 0,
        }
    }

    pub fn emit(&mut self, event: Event) {
        if self.events.len() >= self.capacity {
            if self.dropped == 0 {
                warn!(
                    "event buffer full at {} events, dropping oldest until drained",
                    self.capacity
                );
            }
            self.events.pop_front();
            self.dropped += 1;
        }
        self.events.push_back(event);
    }

    pub fn take_events(&mut self) -> Vec<Event> {
        self.dropped = 0;
        self.events.drain(..).collect()
    }

    /// events waiting to be taken
    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// events lost to the capacity bound since the last drain
    pub fn dropped(&self) -> u64 {
        self.dropped
    }
}
