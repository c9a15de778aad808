use chrono::NaiveDate;
use hourglass_rs::SafeTimeProvider;
use rust_decimal::{Decimal, MathematicalOps};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

use crate::config::LateFeePolicy;
use crate::decimal::Money;
use crate::errors::{LendingError, Result};
use crate::schedule::Installment;
use crate::types::{InstallmentSequence, LateFeeCalculation};

const DAYS_PER_FEE_MONTH: u32 = 30;

/// late fee breakdown for one overdue installment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstallmentLateFee {
    pub sequence: InstallmentSequence,
    pub due_date: NaiveDate,
    pub days_overdue: u32,
    /// days overdue past the grace period
    pub chargeable_days: u32,
    /// installment principal; interest is never charged late fees
    pub fee_base: Money,
    /// fee before the cap and before collected fees
    pub raw_fee: Money,
    pub cap_applied: bool,
    pub already_collected: Money,
    /// fee still owed, rounded to the cent
    pub outstanding_fee: Money,
}

/// accrued late fees across a schedule as of a date
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LateFeeAccrual {
    pub as_of: NaiveDate,
    /// outstanding fee keyed by installment number
    pub per_installment: BTreeMap<u32, Money>,
    pub details: Vec<InstallmentLateFee>,
    pub total: Money,
}

impl LateFeeAccrual {
    fn empty(as_of: NaiveDate) -> Self {
        Self {
            as_of,
            per_installment: BTreeMap::new(),
            details: Vec::new(),
            total: Money::ZERO,
        }
    }

    pub fn fee_for(&self, number: u32) -> Money {
        self.per_installment.get(&number).copied().unwrap_or(Money::ZERO)
    }

    pub fn overdue_count(&self) -> usize {
        self.details.len()
    }
}

/// engine for accruing late fees (mora) on overdue installments
///
/// accrual is a pure function of the installments, the policy and the date;
/// it is recomputed on demand and never stored
pub struct LateFeeAccrualEngine {
    pub policy: LateFeePolicy,
}

impl LateFeeAccrualEngine {
    pub fn new(policy: LateFeePolicy) -> Self {
        Self { policy }
    }

    /// accrue fees for every unpaid installment past due as of `as_of`
    pub fn accrue(&self, installments: &[Installment], as_of: NaiveDate) -> Result<LateFeeAccrual> {
        self.policy.validate()?;

        if !self.policy.enabled {
            return Ok(LateFeeAccrual::empty(as_of));
        }

        let mut accrual = LateFeeAccrual::empty(as_of);
        for installment in installments.iter().filter(|i| i.is_overdue(as_of)) {
            let fee = self.calculate_fee(installment, as_of)?;
            accrual.total += fee.outstanding_fee;
            accrual.per_installment.insert(installment.number(), fee.outstanding_fee);
            accrual.details.push(fee);
        }

        debug!(
            as_of = %as_of,
            overdue = accrual.details.len(),
            total = %accrual.total,
            "late fees accrued"
        );

        Ok(accrual)
    }

    /// accrue as of today's date from the time provider
    pub fn accrue_now(
        &self,
        installments: &[Installment],
        time_provider: &SafeTimeProvider,
    ) -> Result<LateFeeAccrual> {
        self.accrue(installments, time_provider.now().date_naive())
    }

    /// fee for a single installment; zero when paid, not yet due or within grace
    pub fn calculate_fee(
        &self,
        installment: &Installment,
        as_of: NaiveDate,
    ) -> Result<InstallmentLateFee> {
        let days_overdue = if installment.is_overdue(as_of) {
            installment.days_overdue(as_of)
        } else {
            0
        };
        let chargeable_days = days_overdue.saturating_sub(self.policy.grace_period_days);
        let fee_base = installment.principal_amount;

        let raw_fee = if self.policy.enabled && chargeable_days > 0 {
            self.raw_fee(fee_base, chargeable_days)?
        } else {
            Money::ZERO
        };

        let cap_applied = self.policy.is_capped() && raw_fee > self.policy.max_fee_per_installment;
        let capped = if cap_applied {
            self.policy.max_fee_per_installment
        } else {
            raw_fee
        };

        let outstanding_fee = (capped - installment.late_paid_amount).non_negative().round_cents();

        Ok(InstallmentLateFee {
            sequence: installment.sequence,
            due_date: installment.due_date,
            days_overdue,
            chargeable_days,
            fee_base,
            raw_fee,
            cap_applied,
            already_collected: installment.late_paid_amount,
            outstanding_fee,
        })
    }

    fn raw_fee(&self, base: Money, days: u32) -> Result<Money> {
        let rate = self.policy.daily_rate_percent / Decimal::ONE_HUNDRED;

        match self.policy.calculation_type {
            LateFeeCalculation::Daily => Ok(base * rate * Decimal::from(days)),
            LateFeeCalculation::Monthly => {
                let months = days.div_ceil(DAYS_PER_FEE_MONTH);
                Ok(base * rate * Decimal::from(months))
            }
            LateFeeCalculation::Compound => match (Decimal::ONE + rate).checked_powu(days as u64) {
                Some(factor) => base
                    .as_decimal()
                    .checked_mul(factor - Decimal::ONE)
                    .map(Money::from_decimal)
                    .or_else(|| self.saturated_fee())
                    .ok_or_else(|| compound_overflow(days)),
                None => self.saturated_fee().ok_or_else(|| compound_overflow(days)),
            },
        }
    }

    /// an overflowing compound fee is still bounded when a cap is set
    fn saturated_fee(&self) -> Option<Money> {
        self.policy
            .is_capped()
            .then_some(self.policy.max_fee_per_installment)
    }
}

fn compound_overflow(days: u32) -> LendingError {
    LendingError::calculation(format!("compound late fee overflows after {} days", days))
}

/// accrue late fees for `installments` under `policy` as of `as_of`
pub fn accrue(
    installments: &[Installment],
    policy: &LateFeePolicy,
    as_of: NaiveDate,
) -> Result<LateFeeAccrual> {
    LateFeeAccrualEngine::new(policy.clone()).accrue(installments, as_of)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use hourglass_rs::TimeSource;
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn installment(number: u32, due: NaiveDate, principal: i64, interest: i64) -> Installment {
        Installment {
            loan_id: Uuid::nil(),
            sequence: InstallmentSequence::Numbered(number),
            due_date: due,
            principal_amount: Money::from_major(principal),
            interest_amount: Money::from_major(interest),
            total_amount: Money::from_major(principal + interest),
            running_balance_after: Money::ZERO,
            is_paid: false,
            late_paid_amount: Money::ZERO,
        }
    }

    #[test]
    fn test_grace_period_boundary() {
        let engine = LateFeeAccrualEngine::new(LateFeePolicy::daily(dec!(1), 5));
        let rows = vec![installment(1, date(2024, 3, 10), 1_000, 200)];

        let within = engine.accrue(&rows, date(2024, 3, 15)).unwrap();
        assert_eq!(within.fee_for(1), Money::ZERO);
        assert_eq!(within.total, Money::ZERO);

        // one chargeable day on the principal only: 1000 * 1% * 1
        let after = engine.accrue(&rows, date(2024, 3, 16)).unwrap();
        assert_eq!(after.fee_for(1), Money::from_major(10));
        assert_eq!(after.details[0].days_overdue, 6);
        assert_eq!(after.details[0].chargeable_days, 1);
    }

    #[test]
    fn test_cap_enforced() {
        let policy = LateFeePolicy::daily(dec!(5), 0).with_cap(Money::from_major(100));
        let engine = LateFeeAccrualEngine::new(policy);
        let rows = vec![installment(1, date(2024, 3, 10), 1_000, 0)];

        // raw fee 1000 * 5% * 5 = 250
        let accrual = engine.accrue(&rows, date(2024, 3, 15)).unwrap();
        assert_eq!(accrual.details[0].raw_fee, Money::from_major(250));
        assert!(accrual.details[0].cap_applied);
        assert_eq!(accrual.fee_for(1), Money::from_major(100));
    }

    #[test]
    fn test_monthly_blocks_round_up() {
        let engine = LateFeeAccrualEngine::new(LateFeePolicy::monthly(dec!(5), 0));
        let rows = vec![installment(1, date(2024, 1, 1), 2_000, 0)];

        // 31 days is two started months
        let accrual = engine.accrue(&rows, date(2024, 2, 1)).unwrap();
        assert_eq!(accrual.fee_for(1), Money::from_major(200));

        let accrual = engine.accrue(&rows, date(2024, 1, 31)).unwrap();
        assert_eq!(accrual.fee_for(1), Money::from_major(100));
    }

    #[test]
    fn test_compound_fee() {
        let engine = LateFeeAccrualEngine::new(LateFeePolicy::compound(dec!(1), 0));
        let rows = vec![installment(1, date(2024, 1, 1), 1_000, 0)];

        // 1000 * (1.01^3 - 1) = 30.301
        let accrual = engine.accrue(&rows, date(2024, 1, 4)).unwrap();
        assert_eq!(accrual.fee_for(1), Money::from_str_exact("30.30").unwrap());
    }

    #[test]
    fn test_compound_overflow() {
        let rows = vec![installment(1, date(2000, 1, 1), 1_000, 0)];

        let uncapped = LateFeeAccrualEngine::new(LateFeePolicy::compound(dec!(50), 0));
        let err = uncapped.accrue(&rows, date(2024, 1, 1)).unwrap_err();
        assert!(matches!(err, LendingError::CalculationError { .. }));

        let capped = LateFeeAccrualEngine::new(
            LateFeePolicy::compound(dec!(50), 0).with_cap(Money::from_major(300)),
        );
        let accrual = capped.accrue(&rows, date(2024, 1, 1)).unwrap();
        assert_eq!(accrual.fee_for(1), Money::from_major(300));
    }

    #[test]
    fn test_collected_fees_are_not_recharged() {
        let engine = LateFeeAccrualEngine::new(LateFeePolicy::daily(dec!(1), 0));
        let mut row = installment(1, date(2024, 3, 10), 1_000, 0);

        // five days: 50 accrued
        row.late_paid_amount = Money::from_major(20);
        let accrual = engine.accrue(std::slice::from_ref(&row), date(2024, 3, 15)).unwrap();
        assert_eq!(accrual.fee_for(1), Money::from_major(30));
        assert_eq!(accrual.details[0].already_collected, Money::from_major(20));

        row.late_paid_amount = Money::from_major(80);
        let accrual = engine.accrue(std::slice::from_ref(&row), date(2024, 3, 15)).unwrap();
        assert_eq!(accrual.fee_for(1), Money::ZERO);
    }

    #[test]
    fn test_only_unpaid_overdue_installments_accrue() {
        let engine = LateFeeAccrualEngine::new(LateFeePolicy::daily(dec!(1), 0));
        let mut paid = installment(1, date(2024, 1, 10), 1_000, 0);
        paid.is_paid = true;
        let overdue = installment(2, date(2024, 2, 10), 1_000, 0);
        let due_today = installment(3, date(2024, 3, 10), 1_000, 0);
        let future = installment(4, date(2024, 4, 10), 1_000, 0);

        let accrual = engine
            .accrue(&[paid, overdue, due_today, future], date(2024, 3, 10))
            .unwrap();
        assert_eq!(accrual.overdue_count(), 1);
        // feb 10 to mar 10 in a leap year is 29 days
        assert_eq!(accrual.fee_for(2), Money::from_major(290));
        assert_eq!(accrual.total, Money::from_major(290));
        assert!(!accrual.per_installment.contains_key(&1));
    }

    #[test]
    fn test_total_sums_installments() {
        let policy = LateFeePolicy::daily(dec!(0.5), 2).with_cap(Money::from_major(40));
        let rows = vec![
            installment(1, date(2024, 1, 15), 1_000, 100),
            installment(2, date(2024, 2, 15), 1_000, 100),
            installment(3, date(2024, 3, 15), 1_000, 100),
        ];

        let accrual = accrue(&rows, &policy, date(2024, 3, 20)).unwrap();
        // chargeable days 63 and 32 both hit the cap; 3 days -> 1000 * 0.5% * 3
        assert_eq!(accrual.fee_for(1), Money::from_major(40));
        assert_eq!(accrual.fee_for(2), Money::from_major(40));
        assert_eq!(accrual.fee_for(3), Money::from_major(15));
        assert_eq!(accrual.total, Money::from_major(95));
    }

    #[test]
    fn test_accrual_is_idempotent() {
        let policy = LateFeePolicy::compound(dec!(0.3), 3).with_cap(Money::from_major(500));
        let rows = vec![
            installment(1, date(2024, 1, 15), 7_333, 120),
            installment(2, date(2024, 2, 15), 7_333, 110),
        ];

        let first = accrue(&rows, &policy, date(2024, 4, 2)).unwrap();
        let second = accrue(&rows, &policy, date(2024, 4, 2)).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_disabled_policy_accrues_nothing() {
        let rows = vec![installment(1, date(2024, 1, 15), 1_000, 0)];
        let accrual = accrue(&rows, &LateFeePolicy::disabled(), date(2024, 6, 1)).unwrap();
        assert_eq!(accrual.total, Money::ZERO);
        assert!(accrual.details.is_empty());
    }

    #[test]
    fn test_accrue_now_uses_time_provider() {
        let time = SafeTimeProvider::new(TimeSource::Test(
            Utc.with_ymd_and_hms(2024, 3, 20, 9, 30, 0).unwrap(),
        ));
        let engine = LateFeeAccrualEngine::new(LateFeePolicy::daily(dec!(1), 0));
        let rows = vec![installment(1, date(2024, 3, 10), 1_000, 0)];

        let accrual = engine.accrue_now(&rows, &time).unwrap();
        assert_eq!(accrual.as_of, date(2024, 3, 20));
        assert_eq!(accrual.fee_for(1), Money::from_major(100));
    }
}
