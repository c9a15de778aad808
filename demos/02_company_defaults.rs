/// company defaults - load loan defaults from json and compare methods
use lending_engine::chrono::{Datelike, NaiveDate, Weekday};
use lending_engine::{
    AmortizationMethod, AmortizationScheduler, LoanDefaults, LoanTermsBuilder,
    MinimumPaymentCalculator, Money,
};

const DEFAULTS: &str = r#"{
    "amortization_method": "French",
    "payment_frequency": "Biweekly",
    "monthly_rate_percent": "3",
    "closing_costs": "120",
    "excluded_weekdays": ["Sat", "Sun"],
    "late_fee_policy": {
        "enabled": true,
        "daily_rate_percent": "0.2",
        "grace_period_days": 5,
        "max_fee_per_installment": "0",
        "calculation_type": "Daily"
    }
}"#;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let defaults = LoanDefaults::from_json(DEFAULTS)?;
    let anchor = NaiveDate::from_ymd_opt(2024, 6, 3).ok_or("invalid anchor date")?;

    println!("=== methods under the same company defaults ===\n");
    for method in [
        AmortizationMethod::Simple,
        AmortizationMethod::French,
        AmortizationMethod::German,
        AmortizationMethod::American,
    ] {
        let terms = LoanTermsBuilder::from_defaults(&defaults)
            .principal(Money::from_major(3_000))
            .term_length(8)
            .method(method)
            .anchor_date(anchor)
            .build()?;

        let minimum = MinimumPaymentCalculator::compute_minimum(&terms)?;
        let schedule = AmortizationScheduler::build_schedule(&terms)?;
        println!(
            "{:?}: minimum ${}, interest ${}, total ${}, last due {}",
            method,
            minimum.ceil_cents(),
            schedule.summary.total_interest.round_cents(),
            schedule.summary.total_payment.round_cents(),
            schedule.summary.last_due_date,
        );
        assert!(schedule
            .installments
            .iter()
            .all(|i| !matches!(i.due_date.weekday(), Weekday::Sat | Weekday::Sun)));
    }

    // a fixed installment above the minimum sets the effective rate
    let terms = LoanTermsBuilder::from_defaults(&defaults)
        .principal(Money::from_major(3_000))
        .term_length(8)
        .anchor_date(anchor)
        .fixed_payment(Money::from_major(450))
        .build()?;
    let schedule = AmortizationScheduler::build_schedule(&terms)?;
    println!(
        "\nfixed $450: solved period rate {}%",
        schedule.summary.period_rate.as_percentage().round_dp(4)
    );

    println!("\n{}", defaults.to_json_pretty()?);

    Ok(())
}
