use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::decimal::{Money, Rate};
use crate::errors::{FeesError, Result};
use crate::types::{StudentId, UserId};

/// mobile-money agent collection status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AgentPaymentStatus {
    Pending,
    Verified,
    PaidToAgent,
}

/// a fee payment collected in the field by a mobile-money agent.
/// the commission is computed once at creation from the agreed rate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentPayment {
    pub id: Uuid,
    pub agent_name: String,
    pub agent_phone: String,
    pub student: StudentId,
    pub amount: Money,
    pub reference: String,
    pub collected_at: DateTime<Utc>,
    pub recorded_by: UserId,
    pub status: AgentPaymentStatus,
    pub commission_rate: Rate,
    pub commission_amount: Money,
}

impl AgentPayment {
    pub fn new(
        agent_name: impl Into<String>,
        agent_phone: impl Into<String>,
        student: StudentId,
        amount: Money,
        reference: impl Into<String>,
        commission_rate: Rate,
        collected_at: DateTime<Utc>,
        recorded_by: UserId,
    ) -> Result<Self> {
        if !amount.is_positive() {
            return Err(FeesError::InvalidPaymentAmount { amount });
        }
        Ok(Self {
            id: Uuid::new_v4(),
            agent_name: agent_name.into(),
            agent_phone: agent_phone.into(),
            student,
            amount,
            reference: reference.into(),
            collected_at,
            recorded_by,
            status: AgentPaymentStatus::Pending,
            commission_rate,
            commission_amount: amount.percentage(commission_rate),
        })
    }

    pub fn mark_verified(&mut self) {
        if self.status == AgentPaymentStatus::Pending {
            self.status = AgentPaymentStatus::Verified;
        }
    }

    pub fn mark_paid_to_agent(&mut self) {
        if self.status == AgentPaymentStatus::Verified {
            self.status = AgentPaymentStatus::PaidToAgent;
        }
    }

    /// what the school keeps after the agent's cut
    pub fn net_amount(&self) -> Money {
        self.amount - self.commission_amount
    }
}
