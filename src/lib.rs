pub mod config;
pub mod errors;
pub mod events;
pub mod loan;
pub mod money;
pub mod repayments;
pub mod serialization;
pub mod service;
pub mod store;
pub mod types;

// re-export key types
pub use config::LoanConfig;
pub use errors::{LoanError, Result, StoreError};
pub use events::{Event, EventStore};
pub use loan::{AppliedRepayment, Loan, ReceivedRepayment, ScheduledRepayment};
pub use money::{CurrencyCode, Money};
pub use repayments::{
    generate_schedule, AllocationResult, RepaymentAllocator, RepaymentRequest, RepaymentSchedule,
    ScheduledRepaymentDraft,
};
pub use serialization::LoanView;
pub use service::LoanService;
pub use store::{InMemoryLoanStore, LoanStore};
pub use types::{
    InstallmentAllocation, InstallmentStatus, LoanId, LoanStatus, OwnerId, ReceivedRepaymentId,
    ScheduledRepaymentId,
};

// re-export external dependencies that users will need
pub use chrono;
pub use hourglass_rs::{SafeTimeProvider, TimeSource};
pub use rust_decimal::Decimal;
pub use uuid::Uuid;
