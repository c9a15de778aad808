/// quick start - build a schedule for a $10,000 loan
use lending_engine::chrono::NaiveDate;
use lending_engine::{AmortizationMethod, AmortizationScheduler, LoanTerms, Money, Rate};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    // 1% a month over 12 months, french (constant payment)
    let terms = LoanTerms::builder()
        .principal(Money::from_major(10_000))
        .monthly_rate(Rate::from_percentage(1))
        .term_length(12)
        .method(AmortizationMethod::French)
        .anchor_date(NaiveDate::from_ymd_opt(2024, 1, 15).ok_or("invalid anchor date")?)
        .build()?;

    let schedule = AmortizationScheduler::build_schedule(&terms)?;

    println!(
        "{:>4}  {:>10}  {:>10}  {:>10}  {:>10}  {:>12}",
        "#", "due", "principal", "interest", "total", "balance"
    );
    for installment in &schedule.installments {
        println!(
            "{:>4}  {}  {:>10}  {:>10}  {:>10}  {:>12}",
            installment.sequence.to_string(),
            installment.due_date,
            installment.principal_amount.round_cents().to_string(),
            installment.interest_amount.round_cents().to_string(),
            installment.total_amount.round_cents().to_string(),
            installment.running_balance_after.round_cents().to_string(),
        );
    }

    println!("\nperiodic payment: ${}", schedule.summary.periodic_payment.round_cents());
    println!("total interest:   ${}", schedule.summary.total_interest.round_cents());
    println!("total paid:       ${}", schedule.summary.total_payment.round_cents());

    Ok(())
}
