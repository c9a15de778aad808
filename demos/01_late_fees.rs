/// late fees - accrue mora on overdue installments with controlled time
use lending_engine::chrono::{Duration, TimeZone, Utc};
use lending_engine::{
    AmortizationScheduler, LateFeeAccrualEngine, LateFeePolicy, LoanTerms, Money, PaymentRecord,
    PaymentStatusEvaluator, Rate, SafeTimeProvider, TimeSource,
};
use rust_decimal_macros::dec;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    println!("=== late fee example ===\n");

    let time = SafeTimeProvider::new(TimeSource::Test(
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
    ));
    let controller = time.test_control().unwrap();

    // 0.5% of principal per day after a 3 day grace, capped at $50
    let policy = LateFeePolicy::daily(dec!(0.5), 3).with_cap(Money::from_major(50));

    let terms = LoanTerms::builder()
        .principal(Money::from_major(6_000))
        .monthly_rate(Rate::from_percentage(2))
        .term_length(6)
        .late_fee_policy(policy.clone())
        .build_with_time(&time)?;

    let mut schedule = AmortizationScheduler::build_schedule(&terms)?;
    println!(
        "loan starts {}, first due {}",
        time.now().format("%Y-%m-%d"),
        schedule.summary.first_due_date
    );

    // borrower pays the first installment in full and half of the second
    let first = schedule.installments[0].clone();
    let second = schedule.installments[1].clone();
    let payments = vec![
        PaymentRecord::new(first.total_amount, first.due_date),
        PaymentRecord::new(second.total_amount * dec!(0.5), second.due_date),
    ];
    schedule.installments[0].is_paid = true;

    let engine = LateFeeAccrualEngine::new(policy);
    for days in [30, 40, 60, 90] {
        controller.advance(Duration::days(days));
        let accrual = engine.accrue_now(&schedule.installments, &time)?;
        println!(
            "\n{}: {} overdue, late fees ${}",
            time.now().format("%Y-%m-%d"),
            accrual.overdue_count(),
            accrual.total
        );
        for fee in &accrual.details {
            println!(
                "  installment {} - {} days late, fee ${}{}",
                fee.sequence,
                fee.days_overdue,
                fee.outstanding_fee,
                if fee.cap_applied { " (capped)" } else { "" }
            );
        }
    }

    println!("\npayment status:");
    let statuses = PaymentStatusEvaluator::evaluate_schedule(&schedule.installments, &payments);
    for (sequence, status) in statuses {
        println!(
            "  {} due {} - paid ${} of ${} ({:?})",
            sequence,
            status.due_date,
            status.paid.round_cents(),
            status.due.round_cents(),
            status.state()
        );
    }

    Ok(())
}
