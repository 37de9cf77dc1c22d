pub mod adjustments;
pub mod audit;
pub mod catalog;
pub mod decimal;
pub mod directory;
pub mod errors;
pub mod ledger;
pub mod office;
pub mod payments;
pub mod receipts;
pub mod types;
pub mod views;

// re-export key types
pub use adjustments::{Discount, PaymentPlan, Refund};
pub use audit::{AuditAction, AuditEntry, AuditTrail};
pub use catalog::{ExchangeRate, ExchangeRateTable, FeeCatalog, FeeComponents, FeeStructure, StructureKey};
pub use decimal::{Money, Rate};
pub use directory::{Directory, PaymentMethod, Student, User};
pub use errors::{FeesError, Result};
pub use ledger::{LedgerBook, LedgerSnapshot, StudentLedger};
pub use office::{CollectionSummary, FeeOffice};
pub use payments::{AgentPayment, Payment, PaymentRecorded, PaymentRequest};
pub use receipts::{Receipt, ReceiptBook, ReceiptSequencer};
pub use types::{
    AcademicContext, Currency, DiscountType, MethodKind, PaymentStatus, PlanStatus, RefundStatus,
    Role, ScholarType, TermName,
};
pub use views::{ReceiptView, StudentStatement};

// re-export external dependencies that users will need
pub use chrono;
pub use hourglass_rs::{SafeTimeProvider, TimeSource};
pub use rust_decimal::Decimal;
pub use uuid::Uuid;
