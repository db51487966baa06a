/// lifecycle - loan from creation to full repayment on a controlled clock
use installment_loans_rs::{
    CurrencyCode, Event, InMemoryLoanStore, LoanConfig, LoanService, Money, SafeTimeProvider,
    TimeSource, Uuid,
};
use installment_loans_rs::chrono::{Duration, TimeZone, Utc};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("=== repayment lifecycle ===\n");

    let time = SafeTimeProvider::new(TimeSource::Test(
        Utc.with_ymd_and_hms(2024, 1, 15, 9, 0, 0).unwrap()
    ));
    let controller = time.test_control().ok_or("test clock required")?;

    let service = LoanService::new(InMemoryLoanStore::new(), LoanConfig::default(), time)?;
    let thb = CurrencyCode::new("THB")?;

    let mut loan = service.create_loan_now(Uuid::new_v4(), Money::from_minor(100_000), thb, 6)?;
    println!("created loan {} on {}", loan.id, loan.processed_at);

    // pay a little over each installment so later ones go partial
    for month in 1..=5 {
        controller.advance(Duration::days(30));
        let received = service.repay_loan_now(&mut loan, Money::from_minor(18_000), thb)?;
        println!(
            "  month {}: paid {} on {}, outstanding {}",
            month, received.amount, received.received_at, loan.outstanding_amount
        );
    }

    // an overpayment is refused and changes nothing
    let outstanding = loan.outstanding_amount;
    if let Err(err) = service.repay_loan_now(&mut loan, outstanding + Money::from_minor(1), thb) {
        println!("  rejected: {}", err);
    }

    service.repay_loan_now(&mut loan, outstanding, thb)?;
    println!("\nfinal status: {:?}", loan.status);

    for event in service.take_events() {
        if let Event::InstallmentRepaid { installment_number, due_date, .. } = event {
            println!("  installment {} (due {}) repaid", installment_number, due_date);
        }
    }

    Ok(())
}
