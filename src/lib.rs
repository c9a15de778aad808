pub mod config;
pub mod decimal;
pub mod errors;
pub mod fees;
pub mod payments;
pub mod schedule;
pub mod types;

// re-export key types
pub use config::{LateFeePolicy, LoanDefaults, LoanTerms, LoanTermsBuilder};
pub use decimal::{Money, Rate};
pub use errors::{LendingError, Result};
pub use fees::{InstallmentLateFee, LateFeeAccrual, LateFeeAccrualEngine};
pub use payments::{InstallmentState, PaymentRecord, PaymentStatus, PaymentStatusEvaluator};
pub use schedule::{
    AmortizationSchedule, AmortizationScheduler, DateRoller, DueDateSequence, Installment,
    MinimumPayment, MinimumPaymentCalculator, ScheduleSummary,
};
pub use types::{
    AmortizationMethod, FrequencyStep, InstallmentSequence, LateFeeCalculation, LoanId,
    PaymentFrequency,
};

// re-export external dependencies that users will need
pub use chrono;
pub use hourglass_rs::{SafeTimeProvider, TimeSource};
pub use rust_decimal::Decimal;
pub use uuid::Uuid;
