pub mod late_fee;

pub use late_fee::{accrue, InstallmentLateFee, LateFeeAccrual, LateFeeAccrualEngine};
