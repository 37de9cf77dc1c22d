use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::decimal::Money;
use crate::errors::{FeesError, Result};
use crate::types::{LedgerId, PlanId, PlanStatus, StudentId, UserId};

/// installment schedule over a total amount.
///
/// the installment amount is fixed at creation and does not react to
/// partial payments made afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentPlan {
    pub id: PlanId,
    pub student: StudentId,
    pub ledger: Option<LedgerId>,
    pub total_amount: Money,
    pub number_of_installments: u32,
    pub installment_amount: Money,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub status: PlanStatus,
    pub created_by: UserId,
    pub created_at: DateTime<Utc>,
}

impl PaymentPlan {
    pub fn new(
        student: StudentId,
        ledger: Option<LedgerId>,
        total_amount: Money,
        number_of_installments: u32,
        start_date: NaiveDate,
        end_date: NaiveDate,
        created_by: UserId,
        created_at: DateTime<Utc>,
    ) -> Result<Self> {
        if number_of_installments == 0 {
            return Err(FeesError::ZeroInstallments);
        }
        if !total_amount.is_positive() {
            return Err(FeesError::InvalidPaymentAmount { amount: total_amount });
        }
        let installment_amount = total_amount / Decimal::from(number_of_installments);
        Ok(Self {
            id: Uuid::new_v4(),
            student,
            ledger,
            total_amount,
            number_of_installments,
            installment_amount,
            start_date,
            end_date,
            status: PlanStatus::Active,
            created_by,
            created_at,
        })
    }

    fn leave_active(&mut self, to: PlanStatus) -> Result<()> {
        if self.status != PlanStatus::Active {
            return Err(FeesError::PlanNotActive { status: self.status });
        }
        self.status = to;
        Ok(())
    }

    pub fn complete(&mut self) -> Result<()> {
        self.leave_active(PlanStatus::Completed)
    }

    pub fn cancel(&mut self) -> Result<()> {
        self.leave_active(PlanStatus::Cancelled)
    }

    pub fn mark_defaulted(&mut self) -> Result<()> {
        self.leave_active(PlanStatus::Defaulted)
    }
}
