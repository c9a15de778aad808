pub mod amortization;
pub mod dates;
pub mod minimum;

pub use amortization::{
    AmortizationSchedule, AmortizationScheduler, Installment, ScheduleSummary,
    FIXED_PAYMENT_TOLERANCE,
};
pub use dates::{DateRoller, DueDateSequence, MAX_ROLL_ATTEMPTS};
pub use minimum::{MinimumPayment, MinimumPaymentCalculator, INDEFINITE_PREVIEW_PERIODS};
