use chrono::{NaiveDate, Weekday};
use hourglass_rs::{SafeTimeProvider, TimeSource};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use uuid::Uuid;

use crate::decimal::{Money, Rate};
use crate::errors::{LendingError, Result};
use crate::types::{AmortizationMethod, LateFeeCalculation, LoanId, PaymentFrequency};

/// loan terms for one scheduling request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanTerms {
    pub loan_id: LoanId,
    pub principal: Money,
    /// monthly nominal rate; converted per frequency when scheduling
    pub monthly_rate: Option<Rate>,
    /// number of periods in the loan's own frequency unit
    pub term_length: u32,
    pub amortization_method: AmortizationMethod,
    pub payment_frequency: PaymentFrequency,
    /// loan start; the first installment falls one frequency step later
    pub first_payment_anchor_date: NaiveDate,
    /// added to the final installment's total only
    pub closing_costs: Money,
    #[serde(default)]
    pub excluded_weekdays: HashSet<Weekday>,
    /// total installment override; the effective rate is solved from it
    pub fixed_payment: Option<Money>,
    pub late_fee_policy: LateFeePolicy,
}

impl LoanTerms {
    pub fn builder() -> LoanTermsBuilder {
        LoanTermsBuilder::new()
    }

    /// number of installments the schedule will hold
    pub fn total_periods(&self) -> u32 {
        if self.amortization_method.is_finite() {
            self.term_length
        } else {
            1
        }
    }

    /// monthly nominal rate, zero when absent
    pub fn monthly_rate_or_zero(&self) -> Rate {
        self.monthly_rate.unwrap_or(Rate::ZERO)
    }

    /// nominal rate converted to one payment period
    pub fn period_rate(&self) -> Result<Rate> {
        self.monthly_rate_or_zero()
            .compounded(self.payment_frequency.months_per_period())
            .ok_or_else(|| {
                LendingError::calculation(format!(
                    "period rate overflow converting {} to {:?}",
                    self.monthly_rate_or_zero(),
                    self.payment_frequency
                ))
            })
    }

    /// check the terms describe a schedulable loan
    pub fn validate(&self) -> Result<()> {
        if !self.principal.is_positive() {
            return Err(LendingError::invalid_terms(format!(
                "principal must be positive, got {}",
                self.principal
            )));
        }

        if self.amortization_method.is_finite() && self.term_length == 0 {
            return Err(LendingError::invalid_terms("term length must be at least one period"));
        }

        match self.monthly_rate {
            Some(rate) if rate.is_negative() => {
                return Err(LendingError::invalid_terms(format!(
                    "rate cannot be negative, got {}",
                    rate
                )));
            }
            None if self.amortization_method.requires_rate() && self.fixed_payment.is_none() => {
                return Err(LendingError::invalid_terms(format!(
                    "{:?} amortization requires an interest rate",
                    self.amortization_method
                )));
            }
            _ => {}
        }

        if self.closing_costs.is_negative() {
            return Err(LendingError::invalid_terms(format!(
                "closing costs cannot be negative, got {}",
                self.closing_costs
            )));
        }

        if let Some(fixed) = self.fixed_payment {
            if !fixed.is_positive() {
                return Err(LendingError::invalid_terms(format!(
                    "fixed payment must be positive, got {}",
                    fixed
                )));
            }
        }

        Ok(())
    }

    /// same terms without the fixed payment override
    pub fn without_fixed_payment(&self) -> Self {
        Self {
            fixed_payment: None,
            ..self.clone()
        }
    }
}

/// late fee (mora) policy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LateFeePolicy {
    pub enabled: bool,
    /// percentage of the installment principal charged per policy unit
    pub daily_rate_percent: Decimal,
    pub grace_period_days: u32,
    /// per-installment ceiling; zero means uncapped
    pub max_fee_per_installment: Money,
    pub calculation_type: LateFeeCalculation,
}

impl Default for LateFeePolicy {
    fn default() -> Self {
        Self::disabled()
    }
}

impl LateFeePolicy {
    /// no late fees
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            daily_rate_percent: Decimal::ZERO,
            grace_period_days: 0,
            max_fee_per_installment: Money::ZERO,
            calculation_type: LateFeeCalculation::Daily,
        }
    }

    /// simple daily mora
    pub fn daily(daily_rate_percent: Decimal, grace_period_days: u32) -> Self {
        Self {
            enabled: true,
            daily_rate_percent,
            grace_period_days,
            max_fee_per_installment: Money::ZERO,
            calculation_type: LateFeeCalculation::Daily,
        }
    }

    /// common back-office default: 1% a day after three days of grace
    pub fn standard_daily() -> Self {
        Self::daily(dec!(1), 3)
    }

    /// per started month, e.g. 5% per month late
    pub fn monthly(monthly_rate_percent: Decimal, grace_period_days: u32) -> Self {
        Self {
            calculation_type: LateFeeCalculation::Monthly,
            ..Self::daily(monthly_rate_percent, grace_period_days)
        }
    }

    /// daily compounding mora
    pub fn compound(daily_rate_percent: Decimal, grace_period_days: u32) -> Self {
        Self {
            calculation_type: LateFeeCalculation::Compound,
            ..Self::daily(daily_rate_percent, grace_period_days)
        }
    }

    /// cap the fee charged against any single installment
    pub fn with_cap(mut self, max_fee: Money) -> Self {
        self.max_fee_per_installment = max_fee;
        self
    }

    pub fn is_capped(&self) -> bool {
        self.max_fee_per_installment.is_positive()
    }

    pub fn validate(&self) -> Result<()> {
        if self.daily_rate_percent < Decimal::ZERO {
            return Err(LendingError::InvalidLateFeePolicy {
                message: format!("rate cannot be negative, got {}", self.daily_rate_percent),
            });
        }
        if self.max_fee_per_installment.is_negative() {
            return Err(LendingError::InvalidLateFeePolicy {
                message: format!(
                    "fee cap cannot be negative, got {}",
                    self.max_fee_per_installment
                ),
            });
        }
        Ok(())
    }
}

/// company-wide defaults used to pre-populate new loans
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanDefaults {
    pub amortization_method: AmortizationMethod,
    pub payment_frequency: PaymentFrequency,
    /// monthly nominal rate as a percentage, e.g. 2.0 for 2% a month
    pub monthly_rate_percent: Option<Decimal>,
    #[serde(default)]
    pub closing_costs: Money,
    #[serde(default)]
    pub excluded_weekdays: HashSet<Weekday>,
    #[serde(default)]
    pub late_fee_policy: LateFeePolicy,
}

impl Default for LoanDefaults {
    fn default() -> Self {
        Self {
            amortization_method: AmortizationMethod::French,
            payment_frequency: PaymentFrequency::Monthly,
            monthly_rate_percent: None,
            closing_costs: Money::ZERO,
            excluded_weekdays: HashSet::new(),
            late_fee_policy: LateFeePolicy::disabled(),
        }
    }
}

impl LoanDefaults {
    pub fn from_json(json: &str) -> Result<Self> {
        let defaults: LoanDefaults = serde_json::from_str(json)?;
        defaults.late_fee_policy.validate()?;
        Ok(defaults)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// builder for loan terms
#[derive(Debug, Clone, Default)]
pub struct LoanTermsBuilder {
    loan_id: Option<LoanId>,
    principal: Option<Money>,
    monthly_rate: Option<Rate>,
    term_length: Option<u32>,
    amortization_method: Option<AmortizationMethod>,
    payment_frequency: Option<PaymentFrequency>,
    anchor_date: Option<NaiveDate>,
    closing_costs: Option<Money>,
    excluded_weekdays: HashSet<Weekday>,
    fixed_payment: Option<Money>,
    late_fee_policy: Option<LateFeePolicy>,
}

impl LoanTermsBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// start from company defaults; explicit setters still override
    pub fn from_defaults(defaults: &LoanDefaults) -> Self {
        Self {
            monthly_rate: defaults.monthly_rate_percent.map(Rate::from_percent),
            amortization_method: Some(defaults.amortization_method),
            payment_frequency: Some(defaults.payment_frequency),
            closing_costs: Some(defaults.closing_costs),
            excluded_weekdays: defaults.excluded_weekdays.clone(),
            late_fee_policy: Some(defaults.late_fee_policy.clone()),
            ..Self::default()
        }
    }

    pub fn loan_id(mut self, id: LoanId) -> Self {
        self.loan_id = Some(id);
        self
    }

    pub fn principal(mut self, principal: Money) -> Self {
        self.principal = Some(principal);
        self
    }

    pub fn monthly_rate(mut self, rate: Rate) -> Self {
        self.monthly_rate = Some(rate);
        self
    }

    /// monthly rate as a percentage figure, e.g. 2.0 for 2%
    pub fn monthly_rate_percent(self, percent: Decimal) -> Self {
        self.monthly_rate(Rate::from_percent(percent))
    }

    pub fn term_length(mut self, periods: u32) -> Self {
        self.term_length = Some(periods);
        self
    }

    pub fn method(mut self, method: AmortizationMethod) -> Self {
        self.amortization_method = Some(method);
        self
    }

    pub fn frequency(mut self, frequency: PaymentFrequency) -> Self {
        self.payment_frequency = Some(frequency);
        self
    }

    pub fn anchor_date(mut self, date: NaiveDate) -> Self {
        self.anchor_date = Some(date);
        self
    }

    pub fn closing_costs(mut self, costs: Money) -> Self {
        self.closing_costs = Some(costs);
        self
    }

    pub fn exclude_weekday(mut self, day: Weekday) -> Self {
        self.excluded_weekdays.insert(day);
        self
    }

    pub fn excluded_weekdays(mut self, days: impl IntoIterator<Item = Weekday>) -> Self {
        self.excluded_weekdays.extend(days);
        self
    }

    pub fn fixed_payment(mut self, payment: Money) -> Self {
        self.fixed_payment = Some(payment);
        self
    }

    pub fn late_fee_policy(mut self, policy: LateFeePolicy) -> Self {
        self.late_fee_policy = Some(policy);
        self
    }

    /// build, anchoring on today's system date when no anchor was given
    pub fn build(self) -> Result<LoanTerms> {
        let time = SafeTimeProvider::new(TimeSource::System);
        self.build_with_time(&time)
    }

    /// build with an explicit time provider for the default anchor date
    pub fn build_with_time(self, time_provider: &SafeTimeProvider) -> Result<LoanTerms> {
        let principal = self
            .principal
            .ok_or_else(|| LendingError::invalid_terms("principal is required"))?;
        let amortization_method = self.amortization_method.unwrap_or(AmortizationMethod::French);
        let term_length = match (self.term_length, amortization_method) {
            (Some(periods), _) => periods,
            (None, AmortizationMethod::Indefinite) => 1,
            (None, _) => return Err(LendingError::invalid_terms("term length is required")),
        };
        let late_fee_policy = self.late_fee_policy.unwrap_or_default();
        late_fee_policy.validate()?;

        let terms = LoanTerms {
            loan_id: self.loan_id.unwrap_or_else(Uuid::new_v4),
            principal,
            monthly_rate: self.monthly_rate,
            term_length,
            amortization_method,
            payment_frequency: self.payment_frequency.unwrap_or(PaymentFrequency::Monthly),
            first_payment_anchor_date: self
                .anchor_date
                .unwrap_or_else(|| time_provider.now().date_naive()),
            closing_costs: self.closing_costs.unwrap_or(Money::ZERO),
            excluded_weekdays: self.excluded_weekdays,
            fixed_payment: self.fixed_payment,
            late_fee_policy,
        };

        terms.validate()?;
        Ok(terms)
    }
}
