use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::decimal::Money;
use crate::payments::PaymentRecord;
use crate::schedule::Installment;
use crate::types::InstallmentSequence;

/// remaining balances at or below half a cent count as settled
pub const SETTLED_EPSILON: Decimal = dec!(0.005);

/// progress of one installment; only incoming payments move it forward
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InstallmentState {
    Untouched,
    Partial,
    Complete,
}

/// payment status of the current installment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentStatus {
    pub due_date: NaiveDate,
    pub due: Money,
    pub paid: Money,
    pub remaining: Money,
    /// late fee portions of the matched payments
    pub late_fee_paid: Money,
    pub payment_count: usize,
    pub is_complete: bool,
    pub has_partial: bool,
}

impl PaymentStatus {
    pub fn state(&self) -> InstallmentState {
        if self.is_complete {
            InstallmentState::Complete
        } else if self.has_partial {
            InstallmentState::Partial
        } else {
            InstallmentState::Untouched
        }
    }
}

/// evaluates how much of an installment its payments cover
pub struct PaymentStatusEvaluator;

impl PaymentStatusEvaluator {
    /// status of the installment due on `due_date` given every payment on the loan
    pub fn evaluate(due: Money, due_date: NaiveDate, payments: &[PaymentRecord]) -> PaymentStatus {
        let matched: Vec<&PaymentRecord> =
            payments.iter().filter(|p| p.due_date == due_date).collect();

        let paid: Money = matched.iter().map(|p| p.amount).sum();
        let late_fee_paid: Money = matched.iter().map(|p| p.late_fee_portion).sum();
        let remaining = (due - paid).non_negative();
        let is_complete = remaining.approx_eq(Money::ZERO, SETTLED_EPSILON);

        PaymentStatus {
            due_date,
            due,
            paid,
            remaining,
            late_fee_paid,
            payment_count: matched.len(),
            is_complete,
            has_partial: !matched.is_empty() && !is_complete,
        }
    }

    /// status of a schedule row; closing costs on the last row are part of what is due
    pub fn evaluate_installment(
        installment: &Installment,
        payments: &[PaymentRecord],
    ) -> PaymentStatus {
        Self::evaluate(installment.total_amount, installment.due_date, payments)
    }

    /// status of every row in schedule order
    pub fn evaluate_schedule(
        installments: &[Installment],
        payments: &[PaymentRecord],
    ) -> Vec<(InstallmentSequence, PaymentStatus)> {
        installments
            .iter()
            .map(|i| (i.sequence, Self::evaluate_installment(i, payments)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn payment(amount: &str, due: NaiveDate) -> PaymentRecord {
        PaymentRecord::new(Money::from_str_exact(amount).unwrap(), due)
    }

    #[test]
    fn test_partial_payment() {
        let due_date = date(2024, 5, 1);
        let payments = [payment("400", due_date)];
        let status =
            PaymentStatusEvaluator::evaluate(Money::from_major(1_000), due_date, &payments);

        assert_eq!(status.paid, Money::from_major(400));
        assert_eq!(status.remaining, Money::from_major(600));
        assert!(status.has_partial);
        assert!(!status.is_complete);
        assert_eq!(status.state(), InstallmentState::Partial);
    }

    #[test]
    fn test_untouched_ignores_other_installments() {
        let status = PaymentStatusEvaluator::evaluate(
            Money::from_major(1_000),
            date(2024, 5, 1),
            &[payment("1000", date(2024, 4, 1))],
        );

        assert_eq!(status.paid, Money::ZERO);
        assert_eq!(status.payment_count, 0);
        assert!(!status.has_partial);
        assert_eq!(status.state(), InstallmentState::Untouched);
    }

    #[test]
    fn test_complete_within_epsilon() {
        let due_date = date(2024, 5, 1);
        let payments = [payment("600", due_date), payment("399.995", due_date)];
        let status =
            PaymentStatusEvaluator::evaluate(Money::from_major(1_000), due_date, &payments);

        assert!(status.is_complete);
        assert!(!status.has_partial);
        assert_eq!(status.state(), InstallmentState::Complete);
    }

    #[test]
    fn test_overpayment_floors_remaining() {
        let due_date = date(2024, 5, 1);
        let payments = [payment("1250", due_date)];
        let status =
            PaymentStatusEvaluator::evaluate(Money::from_major(1_000), due_date, &payments);
        assert_eq!(status.remaining, Money::ZERO);
        assert!(status.is_complete);
    }

    #[test]
    fn test_late_fee_portions_reported() {
        let due_date = date(2024, 5, 1);
        let record = PaymentRecord::new(Money::from_major(520), due_date)
            .with_late_fee(Money::from_major(20));
        let status =
            PaymentStatusEvaluator::evaluate(Money::from_major(1_000), due_date, &[record]);
        assert_eq!(status.late_fee_paid, Money::from_major(20));
        assert_eq!(status.paid, Money::from_major(520));
    }

    #[test]
    fn test_states_progress_with_payments() {
        let due_date = date(2024, 5, 1);
        let due = Money::from_major(900);
        let mut payments: Vec<PaymentRecord> = Vec::new();
        let state = |payments: &[PaymentRecord]| {
            PaymentStatusEvaluator::evaluate(due, due_date, payments).state()
        };

        assert_eq!(state(&payments), InstallmentState::Untouched);
        payments.push(payment("300", due_date));
        assert_eq!(state(&payments), InstallmentState::Partial);
        payments.push(payment("600", due_date));
        assert_eq!(state(&payments), InstallmentState::Complete);
    }

    #[test]
    fn test_evaluate_schedule_rows() {
        let row = |n: u32, due: NaiveDate| Installment {
            loan_id: Uuid::nil(),
            sequence: InstallmentSequence::Numbered(n),
            due_date: due,
            principal_amount: Money::from_major(450),
            interest_amount: Money::from_major(50),
            total_amount: Money::from_major(500),
            running_balance_after: Money::ZERO,
            is_paid: false,
            late_paid_amount: Money::ZERO,
        };
        let rows = [row(1, date(2024, 5, 1)), row(2, date(2024, 6, 1))];
        let payments = [payment("500", date(2024, 5, 1)), payment("100", date(2024, 6, 1))];

        let statuses = PaymentStatusEvaluator::evaluate_schedule(&rows, &payments);
        assert_eq!(statuses[0].1.state(), InstallmentState::Complete);
        assert_eq!(statuses[1].0, InstallmentSequence::Numbered(2));
        assert_eq!(statuses[1].1.remaining, Money::from_major(400));
    }
}
