use thiserror::Error;
use uuid::Uuid;

use crate::decimal::{Money, Rate};
use crate::types::{PaymentStatus, PlanStatus, RefundStatus, Role, ScholarType, TermName};

#[derive(Error, Debug)]
pub enum FeesError {
    #[error("invalid payment amount: {amount}")]
    InvalidPaymentAmount {
        amount: Money,
    },

    #[error("invalid discount percentage: {percentage}")]
    InvalidPercentage {
        percentage: Rate,
    },

    #[error("payment plan must have at least one installment")]
    ZeroInstallments,

    #[error("invalid refund amount: {amount}")]
    InvalidRefundAmount {
        amount: Money,
    },

    #[error("payment method requires a reference number")]
    MissingReference,

    #[error("payment method is not active")]
    InactivePaymentMethod,

    #[error("student not found: {id}")]
    StudentNotFound {
        id: Uuid,
    },

    #[error("user not found: {id}")]
    UserNotFound {
        id: Uuid,
    },

    #[error("payment method not found: {id}")]
    PaymentMethodNotFound {
        id: Uuid,
    },

    #[error("payment not found: {id}")]
    PaymentNotFound {
        id: Uuid,
    },

    #[error("ledger not found for student {student} in {year} {term:?}")]
    LedgerNotFound {
        student: Uuid,
        year: i32,
        term: TermName,
    },

    #[error("refund not found: {id}")]
    RefundNotFound {
        id: Uuid,
    },

    #[error("payment plan not found: {id}")]
    PlanNotFound {
        id: Uuid,
    },

    #[error("receipt not found: {number}")]
    ReceiptNotFound {
        number: String,
    },

    #[error("fee structure not found for grade {grade} in {year} {term:?} ({scholar_type:?})")]
    FeeStructureNotFound {
        year: i32,
        term: TermName,
        grade: Uuid,
        scholar_type: ScholarType,
    },

    #[error("fee structure already defined for grade {grade} in {year} {term:?} ({scholar_type:?})")]
    DuplicateFeeStructure {
        year: i32,
        term: TermName,
        grade: Uuid,
        scholar_type: ScholarType,
    },

    #[error("receipt number already issued: {number}")]
    DuplicateReceiptNumber {
        number: String,
    },

    #[error("exchange rate already recorded for {from}->{to} on {date}")]
    DuplicateExchangeRate {
        from: String,
        to: String,
        date: chrono::NaiveDate,
    },

    #[error("ledger totals inconsistent: total_required {total_required}, outstanding {outstanding}")]
    LedgerInconsistent {
        total_required: Money,
        outstanding: Money,
    },

    #[error("invalid payment status transition: {from:?} -> {to:?}")]
    InvalidPaymentTransition {
        from: PaymentStatus,
        to: PaymentStatus,
    },

    #[error("invalid refund status transition: {from:?} -> {to:?}")]
    InvalidRefundTransition {
        from: RefundStatus,
        to: RefundStatus,
    },

    #[error("payment plan is not active: current status is {status:?}")]
    PlanNotActive {
        status: PlanStatus,
    },

    #[error("role {role:?} is not permitted to {action}")]
    NotAuthorized {
        role: Role,
        action: &'static str,
    },
}

pub type Result<T> = std::result::Result<T, FeesError>;
