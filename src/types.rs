use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// unique identifier for a student (opaque reference into the students module)
pub type StudentId = Uuid;

/// unique identifier for a user account (opaque reference into the accounts module)
pub type UserId = Uuid;

/// unique identifier for a grade (opaque reference into the classes module)
pub type GradeId = Uuid;

pub type PaymentId = Uuid;
pub type MethodId = Uuid;
pub type LedgerId = Uuid;
pub type DiscountId = Uuid;
pub type PlanId = Uuid;
pub type RefundId = Uuid;

/// currencies fees can be denominated in, no conversion at this layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Currency {
    Usd,
    Zwl,
    Zar,
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let code = match self {
            Currency::Usd => "USD",
            Currency::Zwl => "ZWL",
            Currency::Zar => "ZAR",
        };
        write!(f, "{}", code)
    }
}

/// school terms within an academic year
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TermName {
    Term1,
    Term2,
    Term3,
}

impl fmt::Display for TermName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TermName::Term1 => "Term 1",
            TermName::Term2 => "Term 2",
            TermName::Term3 => "Term 3",
        };
        write!(f, "{}", name)
    }
}

/// student categories billed under different fee structures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScholarType {
    DayScholar,
    Boarder,
}

/// account roles; capabilities are checked on the variant, never on strings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    Admin,
    Teacher,
    Student,
}

impl Role {
    pub fn can_record_payments(&self) -> bool {
        matches!(self, Role::Admin)
    }

    pub fn can_review_payments(&self) -> bool {
        matches!(self, Role::Admin)
    }

    pub fn can_approve_refunds(&self) -> bool {
        matches!(self, Role::Admin)
    }

    pub fn can_edit_ledgers(&self) -> bool {
        matches!(self, Role::Admin)
    }
}

/// payment lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentStatus {
    /// submitted but not yet reviewed, does not affect ledger totals
    Pending,
    /// trusted and applied to the ledger
    Verified,
    /// rejected on review
    Failed,
    /// withdrawn before review
    Cancelled,
}

/// refund lifecycle status, forward transitions only
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RefundStatus {
    Pending,
    Approved,
    Processed,
    Rejected,
}

/// payment plan status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlanStatus {
    Active,
    Completed,
    Cancelled,
    Defaulted,
}

/// discount categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DiscountType {
    Sibling,
    EarlyPayment,
    FullScholarship,
    PartialScholarship,
    StaffChild,
    Hardship,
}

/// ways a payment can be collected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MethodKind {
    Cash,
    Ecocash,
    BankTransfer,
    Zipit,
    Swipe,
    Cheque,
    Paynow,
    Innbucks,
}

impl fmt::Display for MethodKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MethodKind::Cash => "Cash",
            MethodKind::Ecocash => "Ecocash",
            MethodKind::BankTransfer => "Bank Transfer",
            MethodKind::Zipit => "ZIPIT",
            MethodKind::Swipe => "Swipe (POS)",
            MethodKind::Cheque => "Cheque",
            MethodKind::Paynow => "Paynow",
            MethodKind::Innbucks => "InnBucks",
        };
        write!(f, "{}", name)
    }
}

/// the academic year and term all ledger and payment operations run against.
/// passed in explicitly so the core never consults a global "current" flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AcademicContext {
    pub academic_year: i32,
    pub term: TermName,
}

impl AcademicContext {
    pub fn new(academic_year: i32, term: TermName) -> Self {
        Self { academic_year, term }
    }
}

impl fmt::Display for AcademicContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.term, self.academic_year)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_capabilities() {
        assert!(Role::Admin.can_record_payments());
        assert!(!Role::Teacher.can_record_payments());
        assert!(!Role::Student.can_record_payments());
        assert!(Role::Admin.can_approve_refunds());
        assert!(!Role::Student.can_approve_refunds());
    }

    #[test]
    fn test_context_display() {
        let ctx = AcademicContext::new(2025, TermName::Term1);
        assert_eq!(ctx.to_string(), "Term 1 2025");
    }
}
