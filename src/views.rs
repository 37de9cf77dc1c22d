/// serializable views handed to the surrounding web layer
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::decimal::Money;
use crate::errors::Result;
use crate::ledger::LedgerSnapshot;
use crate::office::FeeOffice;
use crate::types::{AcademicContext, PaymentStatus, StudentId};

/// one line of a student's payment history
#[derive(Debug, Serialize, Deserialize)]
pub struct PaymentLine {
    pub amount: Money,
    pub payment_date: DateTime<Utc>,
    pub status: PaymentStatus,
    pub reference_number: String,
    pub receipt_number: Option<String>,
}

/// a student's financial statement for the current term
#[derive(Debug, Serialize, Deserialize)]
pub struct StudentStatement {
    pub student: StudentId,
    pub admission_number: String,
    pub full_name: String,
    pub context: AcademicContext,
    pub ledger: LedgerSnapshot,
    pub amount_due_after_discounts: Money,
    pub flagged_for_followup: bool,
    pub payments: Vec<PaymentLine>,
}

impl StudentStatement {
    pub fn build(office: &FeeOffice, student: StudentId) -> Result<Self> {
        let record = office.directory().student(student)?;
        let ledger = office.ledgers().get(student, office.context())?;

        let payments = office
            .payment_history(student)
            .into_iter()
            .map(|p| PaymentLine {
                amount: p.amount,
                payment_date: p.payment_date,
                status: p.status,
                reference_number: p.reference_number.clone(),
                receipt_number: office
                    .receipts()
                    .for_payment(p.id)
                    .map(|r| r.receipt_number.clone()),
            })
            .collect();

        Ok(Self {
            student,
            admission_number: record.admission_number.clone(),
            full_name: record.full_name.clone(),
            context: office.context(),
            ledger: ledger.snapshot(),
            amount_due_after_discounts: office.amount_due(student)?,
            flagged_for_followup: ledger.flagged_for_followup,
            payments,
        })
    }

    /// convert to pretty-printed json string
    pub fn to_json_pretty(&self) -> std::result::Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// receipt data as handed out for download
#[derive(Debug, Serialize, Deserialize)]
pub struct ReceiptView {
    pub receipt_number: String,
    pub student: String,
    pub amount: Money,
    pub previous_balance: Money,
    pub new_balance: Money,
    pub date: String,
    pub method: String,
}

impl ReceiptView {
    pub fn build(office: &FeeOffice, receipt_number: &str) -> Result<Self> {
        let receipt = office.receipts().by_number(receipt_number)?;
        let payment = office.payment(receipt.payment)?;
        let student = office.directory().student(payment.student)?;
        let method = office.directory().method(payment.method)?;

        Ok(Self {
            receipt_number: receipt.receipt_number.clone(),
            student: student.full_name.clone(),
            amount: receipt.amount_paid,
            previous_balance: receipt.previous_balance,
            new_balance: receipt.new_balance,
            date: receipt.generated_at.format("%Y-%m-%d").to_string(),
            method: method.kind.to_string(),
        })
    }

    pub fn to_json_pretty(&self) -> std::result::Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
