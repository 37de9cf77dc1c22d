pub mod discount;
pub mod plan;
pub mod refund;

pub use discount::Discount;
pub use plan::PaymentPlan;
pub use refund::Refund;
