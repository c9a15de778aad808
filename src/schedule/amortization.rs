use chrono::NaiveDate;
use rust_decimal::{Decimal, MathematicalOps};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::LoanTerms;
use crate::decimal::{Money, Rate};
use crate::errors::{LendingError, Result};
use crate::schedule::dates::DueDateSequence;
use crate::schedule::minimum::MinimumPaymentCalculator;
use crate::types::{AmortizationMethod, InstallmentSequence, LoanId};

/// how far below the computed minimum a fixed payment may fall
pub const FIXED_PAYMENT_TOLERANCE: Decimal = dec!(0.01);

const RATE_SOLVER_ITERATIONS: u32 = 200;

/// one scheduled payment obligation; persisted verbatim by the caller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Installment {
    pub loan_id: LoanId,
    pub sequence: InstallmentSequence,
    pub due_date: NaiveDate,
    pub principal_amount: Money,
    pub interest_amount: Money,
    /// principal + interest, plus closing costs on the last installment
    pub total_amount: Money,
    pub running_balance_after: Money,
    /// set by the payment recording flow
    #[serde(default)]
    pub is_paid: bool,
    /// late fee already collected against this installment
    #[serde(default)]
    pub late_paid_amount: Money,
}

impl Installment {
    pub fn number(&self) -> u32 {
        self.sequence.number()
    }

    /// principal + interest, excluding closing costs
    pub fn scheduled_payment(&self) -> Money {
        self.principal_amount + self.interest_amount
    }

    pub fn is_overdue(&self, as_of: NaiveDate) -> bool {
        !self.is_paid && as_of > self.due_date
    }

    /// calendar days past the due date, zero when not yet due
    pub fn days_overdue(&self, as_of: NaiveDate) -> u32 {
        (as_of - self.due_date).num_days().max(0) as u32
    }
}

/// headline figures of a schedule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleSummary {
    /// principal + interest of the first installment
    pub periodic_payment: Money,
    /// everything the borrower pays, closing costs included
    pub total_payment: Money,
    pub total_interest: Money,
    pub total_principal: Money,
    pub closing_costs: Money,
    /// rate applied per period; solved from the fixed payment when one was given
    pub period_rate: Rate,
    pub installment_count: u32,
    pub first_due_date: NaiveDate,
    pub last_due_date: NaiveDate,
}

/// amortization schedule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AmortizationSchedule {
    pub loan_id: LoanId,
    pub principal: Money,
    pub amortization_method: AmortizationMethod,
    pub installments: Vec<Installment>,
    pub summary: ScheduleSummary,
}

impl AmortizationSchedule {
    /// get installment by its 1-based number
    pub fn installment(&self, number: u32) -> Option<&Installment> {
        number
            .checked_sub(1)
            .and_then(|index| self.installments.get(index as usize))
    }

    /// remaining balance after an installment
    pub fn balance_after(&self, number: u32) -> Money {
        self.installment(number)
            .map(|i| i.running_balance_after)
            .unwrap_or(self.principal)
    }

    /// first installment not yet paid
    pub fn current_installment(&self) -> Option<&Installment> {
        self.installments.iter().find(|i| !i.is_paid)
    }

    /// unpaid installments past their due date
    pub fn overdue(&self, as_of: NaiveDate) -> impl Iterator<Item = &Installment> {
        self.installments.iter().filter(move |i| i.is_overdue(as_of))
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// unrounded principal/interest split of one period
#[derive(Debug, Clone, Copy)]
struct Period {
    principal: Money,
    interest: Money,
}

/// builds installment schedules for every amortization method
pub struct AmortizationScheduler;

impl AmortizationScheduler {
    /// build the full schedule for `terms`
    pub fn build_schedule(terms: &LoanTerms) -> Result<AmortizationSchedule> {
        terms.validate()?;

        let principal = terms.principal.round_cents();
        let periods = terms.total_periods();

        if let Some(fixed) = terms.fixed_payment {
            Self::check_fixed_payment(terms, fixed)?;
        }

        let period_rate = match terms.fixed_payment {
            Some(fixed) => solve_period_rate(terms, principal, fixed)?,
            None => terms.period_rate()?,
        };

        debug!(
            loan_id = %terms.loan_id,
            method = ?terms.amortization_method,
            frequency = ?terms.payment_frequency,
            periods,
            period_rate = %period_rate,
            "building amortization schedule"
        );

        let raw = match terms.amortization_method {
            AmortizationMethod::Simple => simple_periods(terms, principal, periods),
            AmortizationMethod::French => {
                let payment = terms
                    .fixed_payment
                    .unwrap_or_else(|| annuity_payment(principal, period_rate, periods));
                french_periods(principal, period_rate, periods, payment)
            }
            AmortizationMethod::German => german_periods(principal, period_rate, periods),
            AmortizationMethod::American => american_periods(principal, period_rate, periods),
            AmortizationMethod::Indefinite => vec![Period {
                principal: Money::ZERO,
                interest: principal * period_rate.as_decimal(),
            }],
        };

        let due_dates = DueDateSequence::new(
            terms.first_payment_anchor_date,
            terms.payment_frequency,
            &terms.excluded_weekdays,
        )
        .take(raw.len())
        .collect::<Result<Vec<_>>>()?;

        let installments = finalize(terms, principal, &raw, &due_dates);
        let summary = summarize(terms, &installments, period_rate)?;

        debug!(
            loan_id = %terms.loan_id,
            installments = installments.len(),
            total_payment = %summary.total_payment,
            total_interest = %summary.total_interest,
            "schedule built"
        );

        Ok(AmortizationSchedule {
            loan_id: terms.loan_id,
            principal,
            amortization_method: terms.amortization_method,
            installments,
            summary,
        })
    }

    /// reject a fixed payment more than the tolerance below the computed minimum
    fn check_fixed_payment(terms: &LoanTerms, fixed: Money) -> Result<()> {
        // without a rate the interest-only methods have nothing to compare against
        if terms.monthly_rate.is_none() && terms.amortization_method.requires_rate() {
            return Ok(());
        }

        let minimum = MinimumPaymentCalculator::compute_minimum(&terms.without_fixed_payment())?;
        // amortizing payments must at least return the principal over the term
        let amortizing = terms.amortization_method.is_finite()
            && terms.amortization_method != AmortizationMethod::American;
        let repays_principal =
            !amortizing || fixed * Decimal::from(terms.total_periods()) >= terms.principal;

        if !repays_principal
            || !MinimumPaymentCalculator::accepts(minimum, fixed, FIXED_PAYMENT_TOLERANCE)
        {
            warn!(
                loan_id = %terms.loan_id,
                minimum = %minimum,
                provided = %fixed,
                "fixed payment below minimum"
            );
            return Err(LendingError::FixedPaymentTooLow {
                minimum,
                provided: fixed,
            });
        }
        Ok(())
    }
}

/// constant annuity payment `P * r (1+r)^n / ((1+r)^n - 1)`, or `P / n` at zero rate
///
/// when `(1+r)^n` overflows the payment is taken at its limit, `P * r`
pub(crate) fn annuity_payment(principal: Money, rate: Rate, periods: u32) -> Money {
    let n = Decimal::from(periods.max(1));
    let r = rate.as_decimal();
    if r <= Decimal::ZERO {
        return principal / n;
    }

    match (Decimal::ONE + r).checked_powu(periods as u64) {
        Some(compound) if compound > Decimal::ONE => {
            let factor = r * compound / (compound - Decimal::ONE);
            principal * factor
        }
        _ => principal * r,
    }
}

/// back-solve the period rate implied by a fixed installment amount
fn solve_period_rate(terms: &LoanTerms, principal: Money, fixed: Money) -> Result<Rate> {
    let p = principal.as_decimal();
    let n = Decimal::from(terms.total_periods().max(1));
    let f = fixed.as_decimal();

    let rate = match terms.amortization_method {
        // flat rate: interest per period over principal
        AmortizationMethod::Simple => (f - p / n) / p,
        AmortizationMethod::French => solve_annuity_rate(principal, fixed, terms.total_periods())?,
        // fixed amount is the first (largest) installment
        AmortizationMethod::German => (f - p / n) / p,
        AmortizationMethod::American | AmortizationMethod::Indefinite => f / p,
    };

    Ok(Rate::from_decimal(rate.max(Decimal::ZERO).round_dp(18)))
}

/// bisection on the annuity equation; the payment is increasing in the rate
fn solve_annuity_rate(principal: Money, payment: Money, periods: u32) -> Result<Decimal> {
    if payment <= annuity_payment(principal, Rate::ZERO, periods) {
        return Ok(Decimal::ZERO);
    }

    let mut low = Decimal::ZERO;
    // the payment always exceeds P * r, so r < payment / P
    let mut high = payment.as_decimal() / principal.as_decimal();
    let tolerance = dec!(0.000000000000001);

    for _ in 0..RATE_SOLVER_ITERATIONS {
        if high - low <= tolerance {
            break;
        }
        let mid = (low + high) / dec!(2);
        if annuity_payment(principal, Rate::from_decimal(mid), periods) < payment {
            low = mid;
        } else {
            high = mid;
        }
    }

    let solved = (low + high) / dec!(2);
    if solved.is_sign_negative() {
        return Err(LendingError::calculation("annuity rate solver diverged"));
    }
    Ok(solved)
}

fn simple_periods(terms: &LoanTerms, principal: Money, periods: u32) -> Vec<Period> {
    let n = Decimal::from(periods);
    let (principal_share, interest_share) = match terms.fixed_payment {
        Some(fixed) => {
            let total_interest = fixed * n - principal;
            let interest_share = total_interest / n;
            (fixed - interest_share, interest_share)
        }
        None => {
            let months = n * terms.payment_frequency.months_per_period();
            let total_interest = principal * terms.monthly_rate_or_zero().as_decimal() * months;
            (principal / n, total_interest / n)
        }
    };

    (0..periods)
        .map(|_| Period {
            principal: principal_share,
            interest: interest_share,
        })
        .collect()
}

fn french_periods(principal: Money, rate: Rate, periods: u32, payment: Money) -> Vec<Period> {
    let mut balance = principal;
    let mut schedule = Vec::with_capacity(periods as usize);

    for _ in 0..periods {
        let interest = balance * rate.as_decimal();
        let principal_portion = (payment - interest).non_negative().min(balance);
        balance -= principal_portion;
        schedule.push(Period {
            principal: principal_portion,
            interest,
        });
    }

    schedule
}

fn german_periods(principal: Money, rate: Rate, periods: u32) -> Vec<Period> {
    let principal_portion = principal / Decimal::from(periods);
    let mut balance = principal;
    let mut schedule = Vec::with_capacity(periods as usize);

    for _ in 0..periods {
        let interest = balance * rate.as_decimal();
        balance -= principal_portion;
        schedule.push(Period {
            principal: principal_portion,
            interest,
        });
    }

    schedule
}

fn american_periods(principal: Money, rate: Rate, periods: u32) -> Vec<Period> {
    let interest = principal * rate.as_decimal();
    (1..=periods)
        .map(|i| Period {
            principal: if i == periods { principal } else { Money::ZERO },
            interest,
        })
        .collect()
}

/// round to cents and attach dates, balances and closing costs
///
/// french rows round the total as a whole and the principal takes the
/// difference, so annuity totals stay identical; every other method rounds the
/// principal directly so constant principal shares stay constant. the last row
/// of a finite schedule absorbs the residual so the balance ends at exactly zero
fn finalize(
    terms: &LoanTerms,
    principal: Money,
    raw: &[Period],
    due_dates: &[NaiveDate],
) -> Vec<Installment> {
    let finite = terms.amortization_method.is_finite();
    let constant_total = terms.amortization_method == AmortizationMethod::French;
    let closing_costs = terms.closing_costs.round_cents();
    let count = raw.len();
    let mut retired = Money::ZERO;
    let mut installments = Vec::with_capacity(count);

    for (index, (period, due_date)) in raw.iter().zip(due_dates).enumerate() {
        let is_last = index + 1 == count;
        let interest_amount = period.interest.round_cents();
        let principal_amount = if is_last && finite {
            principal - retired
        } else if constant_total {
            let total = (period.principal + period.interest).round_cents();
            (total - interest_amount).min(principal - retired)
        } else {
            period.principal.round_cents().min(principal - retired)
        };
        retired += principal_amount;

        let mut total_amount = principal_amount + interest_amount;
        if is_last {
            total_amount += closing_costs;
        }

        let sequence = if finite {
            InstallmentSequence::Numbered(index as u32 + 1)
        } else {
            InstallmentSequence::OpenEnded
        };

        installments.push(Installment {
            loan_id: terms.loan_id,
            sequence,
            due_date: *due_date,
            principal_amount,
            interest_amount,
            total_amount,
            running_balance_after: principal - retired,
            is_paid: false,
            late_paid_amount: Money::ZERO,
        });
    }

    installments
}

fn summarize(
    terms: &LoanTerms,
    installments: &[Installment],
    period_rate: Rate,
) -> Result<ScheduleSummary> {
    let (first, last) = match (installments.first(), installments.last()) {
        (Some(first), Some(last)) => (first, last),
        _ => return Err(LendingError::calculation("schedule has no installments")),
    };

    Ok(ScheduleSummary {
        periodic_payment: first.scheduled_payment(),
        total_payment: installments.iter().map(|i| i.total_amount).sum(),
        total_interest: installments.iter().map(|i| i.interest_amount).sum(),
        total_principal: installments.iter().map(|i| i.principal_amount).sum(),
        closing_costs: terms.closing_costs.round_cents(),
        period_rate,
        installment_count: installments.len() as u32,
        first_due_date: first.due_date,
        last_due_date: last.due_date,
    })
}
