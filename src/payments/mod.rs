pub mod agent;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::decimal::Money;
use crate::errors::{FeesError, Result};
use crate::types::{LedgerId, MethodId, PaymentId, PaymentStatus, StudentId, UserId};

pub use agent::AgentPayment;

/// a recorded fee payment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payment {
    pub id: PaymentId,
    pub student: StudentId,
    pub ledger: Option<LedgerId>,
    pub amount: Money,
    pub method: MethodId,
    pub reference_number: String,
    pub payment_date: DateTime<Utc>,
    pub recorded_by: UserId,
    pub status: PaymentStatus,
    pub notes: String,
    pub verified_at: Option<DateTime<Utc>>,
    pub verified_by: Option<UserId>,
}

impl Payment {
    /// admin-entered payment, trusted at entry
    pub fn verified(
        student: StudentId,
        ledger: LedgerId,
        amount: Money,
        method: MethodId,
        reference_number: String,
        recorded_by: UserId,
        when: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            student,
            ledger: Some(ledger),
            amount,
            method,
            reference_number,
            payment_date: when,
            recorded_by,
            status: PaymentStatus::Verified,
            notes: String::new(),
            verified_at: Some(when),
            verified_by: Some(recorded_by),
        }
    }

    /// self-service submission awaiting review, no ledger effect yet
    pub fn pending(
        student: StudentId,
        amount: Money,
        method: MethodId,
        reference_number: String,
        recorded_by: UserId,
        when: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            student,
            ledger: None,
            amount,
            method,
            reference_number,
            payment_date: when,
            recorded_by,
            status: PaymentStatus::Pending,
            notes: String::new(),
            verified_at: None,
            verified_by: None,
        }
    }

    pub fn is_verified(&self) -> bool {
        self.status == PaymentStatus::Verified
    }

    /// pending -> verified; a verified payment never reverts
    pub fn mark_verified(&mut self, reviewer: UserId, ledger: LedgerId, when: DateTime<Utc>) -> Result<()> {
        if self.status != PaymentStatus::Pending {
            return Err(FeesError::InvalidPaymentTransition {
                from: self.status,
                to: PaymentStatus::Verified,
            });
        }
        self.status = PaymentStatus::Verified;
        self.ledger = Some(ledger);
        self.verified_at = Some(when);
        self.verified_by = Some(reviewer);
        Ok(())
    }

    /// pending -> failed
    pub fn mark_failed(&mut self, reviewer: UserId, when: DateTime<Utc>) -> Result<()> {
        if self.status != PaymentStatus::Pending {
            return Err(FeesError::InvalidPaymentTransition {
                from: self.status,
                to: PaymentStatus::Failed,
            });
        }
        self.status = PaymentStatus::Failed;
        self.verified_at = Some(when);
        self.verified_by = Some(reviewer);
        Ok(())
    }

    /// pending -> cancelled, withdrawn before review
    pub fn cancel(&mut self) -> Result<()> {
        if self.status != PaymentStatus::Pending {
            return Err(FeesError::InvalidPaymentTransition {
                from: self.status,
                to: PaymentStatus::Cancelled,
            });
        }
        self.status = PaymentStatus::Cancelled;
        Ok(())
    }
}

/// input to payment recording, as received from the web layer
#[derive(Debug, Clone)]
pub struct PaymentRequest {
    pub student: StudentId,
    pub amount: Money,
    pub method: MethodId,
    pub reference_number: String,
    pub notes: String,
}

impl PaymentRequest {
    pub fn new(student: StudentId, amount: Money, method: MethodId) -> Self {
        Self {
            student,
            amount,
            method,
            reference_number: String::new(),
            notes: String::new(),
        }
    }

    pub fn with_reference(mut self, reference: impl Into<String>) -> Self {
        self.reference_number = reference.into();
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = notes.into();
        self
    }

    /// amount must be strictly positive
    pub fn validate_amount(&self) -> Result<()> {
        if !self.amount.is_positive() {
            return Err(FeesError::InvalidPaymentAmount { amount: self.amount });
        }
        Ok(())
    }
}

/// what a successful recording hands back to the caller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentRecorded {
    pub payment_id: PaymentId,
    pub receipt_number: String,
    pub previous_balance: Money,
    pub new_balance: Money,
}
