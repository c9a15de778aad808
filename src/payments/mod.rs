pub mod status;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::decimal::Money;

pub use status::{InstallmentState, PaymentStatus, PaymentStatusEvaluator, SETTLED_EPSILON};

/// payment recorded against the installment due on `due_date`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentRecord {
    pub amount: Money,
    pub due_date: NaiveDate,
    /// part of `amount` that settled late fees
    #[serde(default)]
    pub late_fee_portion: Money,
}

impl PaymentRecord {
    pub fn new(amount: Money, due_date: NaiveDate) -> Self {
        Self {
            amount,
            due_date,
            late_fee_portion: Money::ZERO,
        }
    }

    pub fn with_late_fee(mut self, portion: Money) -> Self {
        self.late_fee_portion = portion;
        self
    }

    /// part of `amount` left for principal and interest
    pub fn installment_portion(&self) -> Money {
        (self.amount - self.late_fee_portion).non_negative()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payment_record_portions() {
        let due = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        let record =
            PaymentRecord::new(Money::from_major(520), due).with_late_fee(Money::from_major(20));
        assert_eq!(record.installment_portion(), Money::from_major(500));

        let fee_only =
            PaymentRecord::new(Money::from_major(10), due).with_late_fee(Money::from_major(25));
        assert_eq!(fee_only.installment_portion(), Money::ZERO);
    }

    #[test]
    fn test_payment_record_json_defaults_fee_portion() {
        let json = r#"{"amount":"250.00","due_date":"2024-05-01"}"#;
        let record: PaymentRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.amount, Money::from_major(250));
        assert_eq!(record.late_fee_portion, Money::ZERO);
    }
}
