use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::decimal::{Money, Rate};
use crate::errors::{FeesError, Result};
use crate::types::{DiscountId, DiscountType, StudentId, UserId};

/// a declared reduction of a student's obligation.
///
/// the record itself is declarative: whoever computes "amount due" applies
/// it, the ledger arithmetic never sees it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Discount {
    pub id: DiscountId,
    pub student: StudentId,
    pub discount_type: DiscountType,
    pub percentage: Rate,
    pub fixed_amount: Money,
    pub reason: String,
    pub approved_by: UserId,
    pub approved_at: DateTime<Utc>,
    pub is_active: bool,
}

impl Discount {
    pub fn new(
        student: StudentId,
        discount_type: DiscountType,
        percentage: Rate,
        fixed_amount: Money,
        reason: impl Into<String>,
        approved_by: UserId,
        approved_at: DateTime<Utc>,
    ) -> Result<Self> {
        if !percentage.is_valid_percentage() {
            return Err(FeesError::InvalidPercentage { percentage });
        }
        Ok(Self {
            id: Uuid::new_v4(),
            student,
            discount_type,
            percentage,
            fixed_amount,
            reason: reason.into(),
            approved_by,
            approved_at,
            is_active: true,
        })
    }

    pub fn deactivate(&mut self) {
        self.is_active = false;
    }

    /// effective cut against what is owed: percentage part plus fixed part,
    /// never more than the amount owed. an inactive discount cuts nothing.
    pub fn reduction_against(&self, owed: Money) -> Money {
        if !self.is_active || !owed.is_positive() {
            return Money::ZERO;
        }
        let cut = owed.percentage(self.percentage) + self.fixed_amount;
        cut.min(owed)
    }
}

/// what remains owed after applying every active discount in turn
pub fn effective_amount_due(owed: Money, discounts: &[&Discount]) -> Money {
    let mut due = owed;
    for discount in discounts {
        due -= discount.reduction_against(due);
    }
    due
}
