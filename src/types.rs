use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// unique identifier for a loan
pub type LoanId = Uuid;

/// how a payment splits between principal and interest over the term
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AmortizationMethod {
    /// flat interest on the original principal, equal shares each period
    Simple,
    /// constant payment annuity, interest on the running balance
    French,
    /// constant principal, declining interest and total
    German,
    /// interest only, principal repaid with the last payment
    American,
    /// perpetual interest, a single open-ended installment
    Indefinite,
}

impl AmortizationMethod {
    /// whether the schedule has a finite term that retires the principal
    pub fn is_finite(&self) -> bool {
        !matches!(self, AmortizationMethod::Indefinite)
    }

    /// whether a zero rate leaves nothing to charge
    pub fn requires_rate(&self) -> bool {
        matches!(self, AmortizationMethod::American | AmortizationMethod::Indefinite)
    }
}

/// unit by which due dates advance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrequencyStep {
    Days(u32),
    Months(u32),
}

/// payment frequency
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PaymentFrequency {
    Daily,
    Weekly,
    Biweekly,
    Monthly,
    Quarterly,
    Yearly,
}

impl PaymentFrequency {
    /// calendar step between consecutive due dates
    pub fn step(&self) -> FrequencyStep {
        match self {
            PaymentFrequency::Daily => FrequencyStep::Days(1),
            PaymentFrequency::Weekly => FrequencyStep::Days(7),
            PaymentFrequency::Biweekly => FrequencyStep::Days(14),
            PaymentFrequency::Monthly => FrequencyStep::Months(1),
            PaymentFrequency::Quarterly => FrequencyStep::Months(3),
            PaymentFrequency::Yearly => FrequencyStep::Months(12),
        }
    }

    /// length of one period in months: 30 days, 4 weeks or 2 biweeks to the month
    ///
    /// doubles as the exponent converting the monthly nominal rate into a
    /// period rate, `(1 + monthly)^months - 1`. that conversion is an
    /// approximation, not a day count convention, and is kept as is so
    /// balances match existing loans
    pub fn months_per_period(&self) -> Decimal {
        match self {
            PaymentFrequency::Daily => Decimal::ONE / dec!(30),
            PaymentFrequency::Weekly => dec!(0.25),
            PaymentFrequency::Biweekly => dec!(0.5),
            PaymentFrequency::Monthly => Decimal::ONE,
            PaymentFrequency::Quarterly => dec!(3),
            PaymentFrequency::Yearly => dec!(12),
        }
    }

    pub fn is_month_based(&self) -> bool {
        matches!(self.step(), FrequencyStep::Months(_))
    }
}

/// how overdue days turn into a late fee
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LateFeeCalculation {
    /// rate applied once per chargeable day
    Daily,
    /// rate applied once per started 30-day block
    Monthly,
    /// rate compounded daily
    Compound,
}

/// position of an installment within its schedule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum InstallmentSequence {
    Numbered(u32),
    /// the single installment of an indefinite loan, shown as "1/∞"
    OpenEnded,
}

impl InstallmentSequence {
    pub fn number(&self) -> u32 {
        match self {
            InstallmentSequence::Numbered(n) => *n,
            InstallmentSequence::OpenEnded => 1,
        }
    }
}

impl fmt::Display for InstallmentSequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InstallmentSequence::Numbered(n) => write!(f, "{}", n),
            InstallmentSequence::OpenEnded => write!(f, "1/∞"),
        }
    }
}
