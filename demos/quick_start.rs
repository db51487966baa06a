/// quick start - create a loan and look at its schedule
use installment_loans_rs::{CurrencyCode, InMemoryLoanStore, LoanConfig, LoanService, LoanView, Money, Uuid};
use installment_loans_rs::chrono::NaiveDate;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let service = LoanService::with_system_time(InMemoryLoanStore::new(), LoanConfig::default())?;

    // 10.00 SGD over 3 months
    let loan = service.create_loan(
        Uuid::new_v4(),
        Money::from_minor(1_000),
        CurrencyCode::new("SGD")?,
        3,
        NaiveDate::from_ymd_opt(2024, 1, 31).ok_or("bad date")?,
    )?;

    for installment in &loan.scheduled_repayments {
        println!(
            "#{} due {}: {}",
            installment.installment_number, installment.due_date, installment.amount
        );
    }

    println!("{}", LoanView::with_exponent(&loan, 2).to_json_pretty()?);

    Ok(())
}
