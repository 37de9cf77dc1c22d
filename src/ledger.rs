use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

use crate::decimal::Money;
use crate::errors::{FeesError, Result};
use crate::types::{AcademicContext, LedgerId, StudentId, TermName};

/// read-only view of where a student stands right now
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    pub opening_balance: Money,
    pub term_fees: Money,
    pub total_required: Money,
    pub payments_made: Money,
    pub outstanding_balance: Money,
}

/// running balance for one student in one term.
///
/// balance fields are private: every mutation recomputes the derived totals
/// before returning, so a stale balance can never be observed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudentLedger {
    pub id: LedgerId,
    pub student: StudentId,
    pub academic_year: i32,
    pub term: TermName,

    opening_balance: Money,
    term_fees: Money,
    total_required: Money,
    payments_made: Money,
    outstanding_balance: Money,

    pub last_payment_date: Option<DateTime<Utc>>,
    pub flagged_for_followup: bool,
    pub notes: String,
}

impl StudentLedger {
    /// open a ledger with zero balances
    pub fn open(student: StudentId, ctx: AcademicContext) -> Self {
        Self {
            id: Uuid::new_v4(),
            student,
            academic_year: ctx.academic_year,
            term: ctx.term,
            opening_balance: Money::ZERO,
            term_fees: Money::ZERO,
            total_required: Money::ZERO,
            payments_made: Money::ZERO,
            outstanding_balance: Money::ZERO,
            last_payment_date: None,
            flagged_for_followup: false,
            notes: String::new(),
        }
    }

    pub fn opening_balance(&self) -> Money {
        self.opening_balance
    }

    pub fn term_fees(&self) -> Money {
        self.term_fees
    }

    pub fn total_required(&self) -> Money {
        self.total_required
    }

    pub fn payments_made(&self) -> Money {
        self.payments_made
    }

    /// may be negative: overpayment is credit, not an error
    pub fn outstanding_balance(&self) -> Money {
        self.outstanding_balance
    }

    /// recompute the derived totals; idempotent between mutations
    pub fn update_balances(&mut self) {
        self.total_required = self.opening_balance + self.term_fees;
        self.outstanding_balance = self.total_required - self.payments_made;
    }

    /// set arrears carried in from a previous term
    pub fn set_opening_balance(&mut self, amount: Money) {
        self.opening_balance = amount;
        self.update_balances();
    }

    pub fn set_term_fees(&mut self, amount: Money) {
        self.term_fees = amount;
        self.update_balances();
    }

    /// apply a verified payment and stamp the payment date
    pub fn apply_payment(&mut self, amount: Money, when: DateTime<Utc>) {
        self.payments_made += amount;
        self.last_payment_date = Some(when);
        self.update_balances();
    }

    pub fn snapshot(&self) -> LedgerSnapshot {
        LedgerSnapshot {
            opening_balance: self.opening_balance,
            term_fees: self.term_fees,
            total_required: self.total_required,
            payments_made: self.payments_made,
            outstanding_balance: self.outstanding_balance,
        }
    }

    /// verify the two balance equations hold
    pub fn check_consistency(&self) -> Result<()> {
        let required = self.opening_balance + self.term_fees;
        let outstanding = required - self.payments_made;
        if self.total_required != required || self.outstanding_balance != outstanding {
            return Err(FeesError::LedgerInconsistent {
                total_required: self.total_required,
                outstanding: self.outstanding_balance,
            });
        }
        Ok(())
    }
}

/// key a ledger is unique on
type LedgerKey = (StudentId, i32, TermName);

/// all ledgers, unique per (student, academic year, term)
#[derive(Debug, Default)]
pub struct LedgerBook {
    ledgers: HashMap<LedgerKey, StudentLedger>,
}

impl LedgerBook {
    pub fn new() -> Self {
        Self::default()
    }

    fn key(student: StudentId, ctx: AcademicContext) -> LedgerKey {
        (student, ctx.academic_year, ctx.term)
    }

    /// return the existing ledger or open one with zero balances
    pub fn get_or_create(&mut self, student: StudentId, ctx: AcademicContext) -> &mut StudentLedger {
        self.ledgers
            .entry(Self::key(student, ctx))
            .or_insert_with(|| StudentLedger::open(student, ctx))
    }

    pub fn get(&self, student: StudentId, ctx: AcademicContext) -> Result<&StudentLedger> {
        self.ledgers
            .get(&Self::key(student, ctx))
            .ok_or(FeesError::LedgerNotFound {
                student,
                year: ctx.academic_year,
                term: ctx.term,
            })
    }

    pub fn get_mut(&mut self, student: StudentId, ctx: AcademicContext) -> Result<&mut StudentLedger> {
        self.ledgers
            .get_mut(&Self::key(student, ctx))
            .ok_or(FeesError::LedgerNotFound {
                student,
                year: ctx.academic_year,
                term: ctx.term,
            })
    }

    pub fn flag_for_followup(&mut self, student: StudentId, ctx: AcademicContext) -> Result<()> {
        self.get_mut(student, ctx)?.flagged_for_followup = true;
        Ok(())
    }

    pub fn unflag_for_followup(&mut self, student: StudentId, ctx: AcademicContext) -> Result<()> {
        self.get_mut(student, ctx)?.flagged_for_followup = false;
        Ok(())
    }

    /// ledgers in the given context owing more than the floor, largest debt first
    pub fn arrears(&self, ctx: AcademicContext, min_outstanding: Money) -> Vec<&StudentLedger> {
        let mut owing: Vec<&StudentLedger> = self
            .ledgers
            .values()
            .filter(|l| {
                l.academic_year == ctx.academic_year
                    && l.term == ctx.term
                    && l.outstanding_balance > min_outstanding
            })
            .collect();
        owing.sort_by(|a, b| b.outstanding_balance.cmp(&a.outstanding_balance));
        owing
    }

    pub fn ledgers(&self) -> impl Iterator<Item = &StudentLedger> {
        self.ledgers.values()
    }
}
