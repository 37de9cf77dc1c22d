use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::decimal::Money;
use crate::errors::{FeesError, Result};
use crate::types::{MethodId, RefundId, RefundStatus, StudentId, UserId};

/// an amount owed back to a student.
///
/// status only moves forward: pending -> approved -> processed, or
/// pending -> rejected. the ledger is never touched by a refund record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Refund {
    pub id: RefundId,
    pub student: StudentId,
    pub amount: Money,
    pub reason: String,
    pub refund_method: MethodId,
    pub status: RefundStatus,
    pub requested_by: UserId,
    pub approved_by: Option<UserId>,
    pub processed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Refund {
    pub fn new(
        student: StudentId,
        amount: Money,
        reason: impl Into<String>,
        refund_method: MethodId,
        requested_by: UserId,
        created_at: DateTime<Utc>,
    ) -> Result<Self> {
        if !amount.is_positive() {
            return Err(FeesError::InvalidRefundAmount { amount });
        }
        Ok(Self {
            id: Uuid::new_v4(),
            student,
            amount,
            reason: reason.into(),
            refund_method,
            status: RefundStatus::Pending,
            requested_by,
            approved_by: None,
            processed_at: None,
            created_at,
        })
    }

    /// pending -> approved; the approver is recorded
    pub fn approve(&mut self, approver: UserId) -> Result<()> {
        if self.status != RefundStatus::Pending {
            return Err(FeesError::InvalidRefundTransition {
                from: self.status,
                to: RefundStatus::Approved,
            });
        }
        self.status = RefundStatus::Approved;
        self.approved_by = Some(approver);
        Ok(())
    }

    /// approved -> processed; processed_at is stamped here and only here
    pub fn process(&mut self, when: DateTime<Utc>) -> Result<()> {
        if self.status != RefundStatus::Approved {
            return Err(FeesError::InvalidRefundTransition {
                from: self.status,
                to: RefundStatus::Processed,
            });
        }
        self.status = RefundStatus::Processed;
        self.processed_at = Some(when);
        Ok(())
    }

    /// pending -> rejected
    pub fn reject(&mut self) -> Result<()> {
        if self.status != RefundStatus::Pending {
            return Err(FeesError::InvalidRefundTransition {
                from: self.status,
                to: RefundStatus::Rejected,
            });
        }
        self.status = RefundStatus::Rejected;
        Ok(())
    }
}
