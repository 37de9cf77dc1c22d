use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::decimal::Money;
use crate::types::{StudentId, UserId};

/// every fee-affecting action that gets audited
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuditAction {
    PaymentRecorded,
    PaymentVerified,
    ReceiptGenerated,
    DiscountApplied,
    PaymentPlanCreated,
    RefundRequested,
    RefundApproved,
    RefundProcessed,
    RefundRejected,
    LedgerEdited,
    FeeStructureChanged,
}

/// one audit trail entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: Uuid,
    pub actor: UserId,
    pub action: AuditAction,
    pub description: String,
    pub student: Option<StudentId>,
    pub amount: Option<Money>,
    pub timestamp: DateTime<Utc>,
}

/// append-only audit trail.
///
/// entries can be recorded and read, nothing else: no update, delete,
/// clear, or drain operation exists on this type.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct AuditTrail {
    entries: Vec<AuditEntry>,
}

impl AuditTrail {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(
        &mut self,
        actor: UserId,
        action: AuditAction,
        description: impl Into<String>,
        student: Option<StudentId>,
        amount: Option<Money>,
        timestamp: DateTime<Utc>,
    ) {
        self.entries.push(AuditEntry {
            id: Uuid::new_v4(),
            actor,
            action,
            description: description.into(),
            student,
            amount,
            timestamp,
        });
    }

    pub fn entries(&self) -> &[AuditEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn for_student(&self, student: StudentId) -> impl Iterator<Item = &AuditEntry> {
        self.entries
            .iter()
            .filter(move |e| e.student == Some(student))
    }

    pub fn for_action(&self, action: AuditAction) -> impl Iterator<Item = &AuditEntry> {
        self.entries.iter().filter(move |e| e.action == action)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entries_accumulate_in_order() {
        let mut trail = AuditTrail::new();
        let actor = Uuid::new_v4();
        let student = Uuid::new_v4();

        trail.record(
            actor,
            AuditAction::PaymentRecorded,
            "Payment of 100.00 recorded",
            Some(student),
            Some(Money::from_major(100)),
            Utc::now(),
        );
        trail.record(
            actor,
            AuditAction::LedgerEdited,
            "Opening balance set",
            Some(student),
            None,
            Utc::now(),
        );

        assert_eq!(trail.len(), 2);
        assert_eq!(trail.entries()[0].action, AuditAction::PaymentRecorded);
        assert_eq!(trail.entries()[1].action, AuditAction::LedgerEdited);
        assert_eq!(trail.for_student(student).count(), 2);
        assert_eq!(trail.for_action(AuditAction::PaymentRecorded).count(), 1);
    }
}
