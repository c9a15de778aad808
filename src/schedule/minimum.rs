use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::config::LoanTerms;
use crate::decimal::{Money, Rate};
use crate::errors::Result;
use crate::schedule::amortization::annuity_payment;
use crate::types::AmortizationMethod;

/// horizon used for the indefinite-loan preview figure
pub const INDEFINITE_PREVIEW_PERIODS: u32 = 12;

/// smallest periodic payment the terms allow
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MinimumPayment {
    /// rounded up to the cent
    pub amount: Money,
    pub period_rate: Rate,
    pub periods_considered: u32,
}

/// computes the minimum periodic payment without building a schedule
pub struct MinimumPaymentCalculator;

impl MinimumPaymentCalculator {
    pub fn compute_minimum(terms: &LoanTerms) -> Result<Money> {
        Ok(Self::calculate(terms)?.amount)
    }

    pub fn calculate(terms: &LoanTerms) -> Result<MinimumPayment> {
        terms.validate()?;

        let principal = terms.principal.round_cents();
        let periods = match terms.amortization_method {
            AmortizationMethod::Indefinite => INDEFINITE_PREVIEW_PERIODS,
            _ => terms.term_length,
        };
        let n = Decimal::from(periods);
        let period_rate = terms.period_rate()?;
        let r = period_rate.as_decimal();

        let amount = match terms.amortization_method {
            AmortizationMethod::Simple => {
                let months = n * terms.payment_frequency.months_per_period();
                let total_interest = principal * terms.monthly_rate_or_zero().as_decimal() * months;
                (principal + total_interest) / n
            }
            AmortizationMethod::French => annuity_payment(principal, period_rate, periods),
            AmortizationMethod::German => principal / n + principal * r,
            AmortizationMethod::American | AmortizationMethod::Indefinite => principal * r,
        };

        Ok(MinimumPayment {
            amount: amount.ceil_cents(),
            period_rate,
            periods_considered: periods,
        })
    }

    /// whether `payment` meets the minimum within `tolerance` (a fraction, e.g. 0.01)
    pub fn accepts(minimum: Money, payment: Money, tolerance: Decimal) -> bool {
        payment >= minimum * (Decimal::ONE - tolerance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PaymentFrequency;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn minimum(terms: &LoanTerms) -> Money {
        MinimumPaymentCalculator::compute_minimum(terms).unwrap()
    }

    fn money(s: &str) -> Money {
        Money::from_str_exact(s).unwrap()
    }

    fn terms(
        method: AmortizationMethod,
        principal: i64,
        rate_percent: Decimal,
        term: u32,
    ) -> LoanTerms {
        LoanTerms::builder()
            .principal(Money::from_major(principal))
            .monthly_rate_percent(rate_percent)
            .term_length(term)
            .method(method)
            .anchor_date(NaiveDate::from_ymd_opt(2024, 1, 15).unwrap())
            .build()
            .unwrap()
    }

    #[test]
    fn test_simple_minimum() {
        let t = terms(AmortizationMethod::Simple, 100_000, dec!(2), 12);
        // (100000 + 24000) / 12 = 10333.333.. rounded up
        assert_eq!(minimum(&t), money("10333.34"));
    }

    #[test]
    fn test_french_minimum_is_annuity() {
        let t = terms(AmortizationMethod::French, 10_000, dec!(1), 12);
        // standard annuity at 1%/month over 12 months is 888.4879
        assert_eq!(minimum(&t), money("888.49"));
    }

    #[test]
    fn test_german_minimum_is_first_installment() {
        let t = terms(AmortizationMethod::German, 30_000, dec!(5), 3);
        assert_eq!(minimum(&t), Money::from_major(11_500));
    }

    #[test]
    fn test_interest_only_minimums() {
        let american = terms(AmortizationMethod::American, 50_000, dec!(3), 6);
        assert_eq!(minimum(&american), Money::from_major(1_500));

        let indefinite = terms(AmortizationMethod::Indefinite, 50_000, dec!(3), 0);
        let preview = MinimumPaymentCalculator::calculate(&indefinite).unwrap();
        assert_eq!(preview.amount, Money::from_major(1_500));
        assert_eq!(preview.periods_considered, INDEFINITE_PREVIEW_PERIODS);
    }

    #[test]
    fn test_minimum_rounds_up() {
        let t = terms(AmortizationMethod::German, 1_000, dec!(0), 3);
        // 333.333.. always rounds up
        assert_eq!(minimum(&t), money("333.34"));
    }

    #[test]
    fn test_weekly_simple_minimum_uses_month_equivalents() {
        let t = LoanTerms::builder()
            .principal(Money::from_major(4_000))
            .monthly_rate_percent(dec!(4))
            .term_length(8)
            .method(AmortizationMethod::Simple)
            .frequency(PaymentFrequency::Weekly)
            .anchor_date(NaiveDate::from_ymd_opt(2024, 1, 15).unwrap())
            .build()
            .unwrap();
        // 8 weeks = 2 months: interest 4000 * 0.04 * 2 = 320, (4000 + 320) / 8
        assert_eq!(minimum(&t), Money::from_major(540));
    }

    #[test]
    fn test_tolerance() {
        let floor = Money::from_major(1_000);
        assert!(MinimumPaymentCalculator::accepts(floor, Money::from_major(990), dec!(0.01)));
        assert!(!MinimumPaymentCalculator::accepts(floor, money("989.99"), dec!(0.01)));
    }
}
