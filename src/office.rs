use chrono::NaiveDate;
use hourglass_rs::SafeTimeProvider;
use rust_decimal::Decimal;
use tracing::{debug, info};

use crate::adjustments::discount::effective_amount_due;
use crate::adjustments::{Discount, PaymentPlan, Refund};
use crate::audit::{AuditAction, AuditTrail};
use crate::catalog::{ExchangeRate, ExchangeRateTable, FeeCatalog, FeeComponents, FeeStructure, StructureKey};
use crate::decimal::{Money, Rate};
use crate::directory::{Directory, PaymentMethod, Student, User};
use crate::errors::{FeesError, Result};
use crate::ledger::{LedgerBook, LedgerSnapshot, StudentLedger};
use crate::payments::{Payment, PaymentRecorded, PaymentRequest};
use crate::receipts::ReceiptBook;
use crate::types::{
    AcademicContext, DiscountId, DiscountType, MethodId, PaymentId, PaymentStatus, PlanId,
    RefundId, StudentId, UserId,
};
use std::collections::HashMap;

/// financial overview of the current term
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CollectionSummary {
    pub total_expected: Money,
    pub total_collected: Money,
    pub total_outstanding: Money,
    /// percentage of expected fees collected
    pub collection_rate: Rate,
    pub total_students: usize,
    pub fully_paid_students: usize,
}

/// the fee office: owns all fee state and every operation that mutates it.
///
/// runs against an explicit academic context rather than a global
/// "current term" flag, so callers control which term they operate on.
pub struct FeeOffice {
    context: AcademicContext,
    directory: Directory,
    catalog: FeeCatalog,
    rates: ExchangeRateTable,
    ledgers: LedgerBook,
    payments: HashMap<PaymentId, Payment>,
    receipts: ReceiptBook,
    discounts: Vec<Discount>,
    plans: HashMap<PlanId, PaymentPlan>,
    refunds: HashMap<RefundId, Refund>,
    audit: AuditTrail,
}

impl FeeOffice {
    pub fn new(context: AcademicContext) -> Self {
        Self {
            context,
            directory: Directory::new(),
            catalog: FeeCatalog::new(),
            rates: ExchangeRateTable::new(),
            ledgers: LedgerBook::new(),
            payments: HashMap::new(),
            receipts: ReceiptBook::new(),
            discounts: Vec::new(),
            plans: HashMap::new(),
            refunds: HashMap::new(),
            audit: AuditTrail::new(),
        }
    }

    pub fn context(&self) -> AcademicContext {
        self.context
    }

    /// move the office to a new term; existing ledgers are untouched
    pub fn set_context(&mut self, context: AcademicContext) {
        self.context = context;
    }

    // registration

    pub fn register_student(&mut self, student: Student) -> StudentId {
        self.directory.add_student(student)
    }

    pub fn register_user(&mut self, user: User) -> UserId {
        self.directory.add_user(user)
    }

    pub fn register_payment_method(&mut self, method: PaymentMethod) -> MethodId {
        self.directory.add_method(method)
    }

    pub fn directory(&self) -> &Directory {
        &self.directory
    }

    // fee structures

    pub fn define_fee_structure(
        &mut self,
        structure: FeeStructure,
        actor: UserId,
        time: &SafeTimeProvider,
    ) -> Result<()> {
        let user = self.directory.user(actor)?;
        if !user.role.can_edit_ledgers() {
            return Err(FeesError::NotAuthorized {
                role: user.role,
                action: "define fee structures",
            });
        }
        let total = structure.total_fee();
        let key = structure.key();
        self.catalog.define(structure)?;
        self.audit.record(
            actor,
            AuditAction::FeeStructureChanged,
            format!(
                "Fee structure defined for {} {}: total {}",
                key.term, key.academic_year, total
            ),
            None,
            Some(total),
            time.now(),
        );
        Ok(())
    }

    pub fn amend_fee_structure(
        &mut self,
        key: &StructureKey,
        components: FeeComponents,
        actor: UserId,
        time: &SafeTimeProvider,
    ) -> Result<Money> {
        let user = self.directory.user(actor)?;
        if !user.role.can_edit_ledgers() {
            return Err(FeesError::NotAuthorized {
                role: user.role,
                action: "amend fee structures",
            });
        }
        let total = self.catalog.amend_components(key, components)?;
        self.audit.record(
            actor,
            AuditAction::FeeStructureChanged,
            format!(
                "Fee structure amended for {} {}: total {}",
                key.term, key.academic_year, total
            ),
            None,
            Some(total),
            time.now(),
        );
        Ok(total)
    }

    pub fn catalog(&self) -> &FeeCatalog {
        &self.catalog
    }

    pub fn record_exchange_rate(&mut self, entry: ExchangeRate) -> Result<()> {
        self.rates.record(entry)
    }

    pub fn exchange_rates(&self) -> &ExchangeRateTable {
        &self.rates
    }

    // ledgers

    /// resolve or create the student's ledger for the current context.
    /// a freshly opened ledger is billed from the catalog when a matching
    /// fee structure exists.
    pub fn open_ledger(&mut self, student: StudentId) -> Result<LedgerSnapshot> {
        let record = self.directory.student(student)?;
        let key = StructureKey {
            academic_year: self.context.academic_year,
            term: self.context.term,
            grade: record.grade,
            scholar_type: record.scholar_type,
        };
        let term_fee = self.catalog.get(&key).map(|s| s.total_fee());

        let ledger = self.ledgers.get_or_create(student, self.context);
        if let Some(fee) = term_fee {
            if ledger.term_fees().is_zero() {
                ledger.set_term_fees(fee);
            }
        }
        Ok(ledger.snapshot())
    }

    /// current ledger snapshot; a missing ledger propagates as not-found
    pub fn ledger_snapshot(&self, student: StudentId) -> Result<LedgerSnapshot> {
        Ok(self.ledgers.get(student, self.context)?.snapshot())
    }

    pub fn set_opening_balance(
        &mut self,
        student: StudentId,
        amount: Money,
        actor: UserId,
        time: &SafeTimeProvider,
    ) -> Result<()> {
        self.edit_ledger(student, actor, time, "Opening balance set", |ledger| {
            ledger.set_opening_balance(amount)
        })
    }

    pub fn set_term_fees(
        &mut self,
        student: StudentId,
        amount: Money,
        actor: UserId,
        time: &SafeTimeProvider,
    ) -> Result<()> {
        self.edit_ledger(student, actor, time, "Term fees set", |ledger| {
            ledger.set_term_fees(amount)
        })
    }

    fn edit_ledger(
        &mut self,
        student: StudentId,
        actor: UserId,
        time: &SafeTimeProvider,
        what: &str,
        edit: impl FnOnce(&mut StudentLedger),
    ) -> Result<()> {
        let user = self.directory.user(actor)?;
        if !user.role.can_edit_ledgers() {
            return Err(FeesError::NotAuthorized {
                role: user.role,
                action: "edit ledgers",
            });
        }
        self.directory.student(student)?;
        let ledger = self.ledgers.get_or_create(student, self.context);
        edit(ledger);
        self.audit.record(
            actor,
            AuditAction::LedgerEdited,
            format!("{} for student {}", what, student),
            Some(student),
            None,
            time.now(),
        );
        Ok(())
    }

    /// follow-up flag only, no audit side effect
    pub fn flag_for_followup(&mut self, student: StudentId) -> Result<()> {
        self.ledgers.flag_for_followup(student, self.context)
    }

    pub fn unflag_for_followup(&mut self, student: StudentId) -> Result<()> {
        self.ledgers.unflag_for_followup(student, self.context)
    }

    pub fn arrears(&self, min_outstanding: Money) -> Vec<&StudentLedger> {
        self.ledgers.arrears(self.context, min_outstanding)
    }

    // payment recording

    /// admin path: record a trusted payment, apply it to the ledger, issue
    /// a receipt and write the audit entry.
    pub fn record_payment(
        &mut self,
        request: PaymentRequest,
        actor: UserId,
        time: &SafeTimeProvider,
    ) -> Result<PaymentRecorded> {
        let recorder = self.directory.user(actor)?;
        if !recorder.role.can_record_payments() {
            return Err(FeesError::NotAuthorized {
                role: recorder.role,
                action: "record payments",
            });
        }
        request.validate_amount()?;
        let student_name = self.directory.student(request.student)?.full_name.clone();
        let method = self.directory.active_method(request.method)?;
        if method.requires_reference && request.reference_number.trim().is_empty() {
            return Err(FeesError::MissingReference);
        }

        // every check that can fail has passed; from here the payment,
        // ledger update, receipt, and audit entry land together
        let now = time.now();
        let (ledger_id, previous_balance) = {
            let ledger = self.ledgers.get_or_create(request.student, self.context);
            (ledger.id, ledger.outstanding_balance())
        };
        let new_balance = previous_balance - request.amount;

        let mut payment = Payment::verified(
            request.student,
            ledger_id,
            request.amount,
            request.method,
            request.reference_number.clone(),
            actor,
            now,
        );
        payment.notes = request.notes.clone();
        let payment_id = payment.id;

        let receipt_number = self
            .receipts
            .issue(payment_id, request.amount, previous_balance, new_balance, actor, now)?
            .receipt_number
            .clone();

        self.ledgers
            .get_mut(request.student, self.context)?
            .apply_payment(request.amount, now);
        self.payments.insert(payment_id, payment);
        self.audit.record(
            actor,
            AuditAction::PaymentRecorded,
            format!("Payment of {} recorded for {}", request.amount, student_name),
            Some(request.student),
            Some(request.amount),
            now,
        );

        info!(
            student = %request.student,
            amount = %request.amount,
            receipt = %receipt_number,
            "payment recorded"
        );

        Ok(PaymentRecorded {
            payment_id,
            receipt_number,
            previous_balance,
            new_balance,
        })
    }

    /// self-service path: the payment sits pending and the ledger is not
    /// touched until review verifies it
    pub fn submit_payment(
        &mut self,
        request: PaymentRequest,
        submitter: UserId,
        time: &SafeTimeProvider,
    ) -> Result<PaymentId> {
        self.directory.user(submitter)?;
        request.validate_amount()?;
        self.directory.student(request.student)?;
        let method = self.directory.active_method(request.method)?;
        if method.requires_reference && request.reference_number.trim().is_empty() {
            return Err(FeesError::MissingReference);
        }

        let mut payment = Payment::pending(
            request.student,
            request.amount,
            request.method,
            request.reference_number,
            submitter,
            time.now(),
        );
        payment.notes = request.notes;
        let id = payment.id;
        self.payments.insert(id, payment);

        debug!(student = %request.student, amount = %request.amount, "payment submitted for review");
        Ok(id)
    }

    /// review a pending payment: verifying applies it to the ledger and
    /// issues a receipt; declining marks it failed and changes nothing else
    pub fn review_payment(
        &mut self,
        payment_id: PaymentId,
        reviewer: UserId,
        approve: bool,
        time: &SafeTimeProvider,
    ) -> Result<Option<PaymentRecorded>> {
        let user = self.directory.user(reviewer)?;
        if !user.role.can_review_payments() {
            return Err(FeesError::NotAuthorized {
                role: user.role,
                action: "review payments",
            });
        }
        let now = time.now();

        let (student, amount, status) = {
            let payment = self
                .payments
                .get(&payment_id)
                .ok_or(FeesError::PaymentNotFound { id: payment_id })?;
            (payment.student, payment.amount, payment.status)
        };
        if status != PaymentStatus::Pending {
            return Err(FeesError::InvalidPaymentTransition {
                from: status,
                to: if approve {
                    PaymentStatus::Verified
                } else {
                    PaymentStatus::Failed
                },
            });
        }

        if !approve {
            self.payments
                .get_mut(&payment_id)
                .ok_or(FeesError::PaymentNotFound { id: payment_id })?
                .mark_failed(reviewer, now)?;
            return Ok(None);
        }

        let (ledger_id, previous_balance) = {
            let ledger = self.ledgers.get_or_create(student, self.context);
            (ledger.id, ledger.outstanding_balance())
        };
        let new_balance = previous_balance - amount;

        let receipt_number = self
            .receipts
            .issue(payment_id, amount, previous_balance, new_balance, reviewer, now)?
            .receipt_number
            .clone();

        self.payments
            .get_mut(&payment_id)
            .ok_or(FeesError::PaymentNotFound { id: payment_id })?
            .mark_verified(reviewer, ledger_id, now)?;
        self.ledgers
            .get_mut(student, self.context)?
            .apply_payment(amount, now);
        self.audit.record(
            reviewer,
            AuditAction::PaymentVerified,
            format!("Payment of {} verified for student {}", amount, student),
            Some(student),
            Some(amount),
            now,
        );

        info!(student = %student, amount = %amount, receipt = %receipt_number, "payment verified");

        Ok(Some(PaymentRecorded {
            payment_id,
            receipt_number,
            previous_balance,
            new_balance,
        }))
    }

    /// withdraw a still-pending payment
    pub fn cancel_payment(&mut self, payment_id: PaymentId) -> Result<()> {
        self.payments
            .get_mut(&payment_id)
            .ok_or(FeesError::PaymentNotFound { id: payment_id })?
            .cancel()
    }

    pub fn payment(&self, payment_id: PaymentId) -> Result<&Payment> {
        self.payments
            .get(&payment_id)
            .ok_or(FeesError::PaymentNotFound { id: payment_id })
    }

    /// payments for a student, newest first
    pub fn payment_history(&self, student: StudentId) -> Vec<&Payment> {
        let mut history: Vec<&Payment> = self
            .payments
            .values()
            .filter(|p| p.student == student)
            .collect();
        history.sort_by(|a, b| b.payment_date.cmp(&a.payment_date));
        history
    }

    pub fn receipts(&self) -> &ReceiptBook {
        &self.receipts
    }

    // discounts, plans, refunds

    pub fn grant_discount(
        &mut self,
        student: StudentId,
        discount_type: DiscountType,
        percentage: Rate,
        fixed_amount: Money,
        reason: impl Into<String>,
        actor: UserId,
        time: &SafeTimeProvider,
    ) -> Result<DiscountId> {
        let user = self.directory.user(actor)?;
        if !user.role.can_edit_ledgers() {
            return Err(FeesError::NotAuthorized {
                role: user.role,
                action: "grant discounts",
            });
        }
        self.directory.student(student)?;
        let now = time.now();
        let discount = Discount::new(
            student,
            discount_type,
            percentage,
            fixed_amount,
            reason,
            actor,
            now,
        )?;
        let id = discount.id;
        let amount = discount.fixed_amount;
        self.discounts.push(discount);
        self.audit.record(
            actor,
            AuditAction::DiscountApplied,
            format!("{:?} discount granted to student {}", discount_type, student),
            Some(student),
            if amount.is_zero() { None } else { Some(amount) },
            now,
        );
        Ok(id)
    }

    pub fn active_discounts(&self, student: StudentId) -> Vec<&Discount> {
        self.discounts
            .iter()
            .filter(|d| d.student == student && d.is_active)
            .collect()
    }

    /// outstanding balance after active discounts; the ledger itself is
    /// never changed by a discount
    pub fn amount_due(&self, student: StudentId) -> Result<Money> {
        let outstanding = self.ledgers.get(student, self.context)?.outstanding_balance();
        Ok(effective_amount_due(
            outstanding,
            &self.active_discounts(student),
        ))
    }

    pub fn create_payment_plan(
        &mut self,
        student: StudentId,
        total_amount: Money,
        number_of_installments: u32,
        start_date: NaiveDate,
        end_date: NaiveDate,
        actor: UserId,
        time: &SafeTimeProvider,
    ) -> Result<PlanId> {
        let user = self.directory.user(actor)?;
        if !user.role.can_edit_ledgers() {
            return Err(FeesError::NotAuthorized {
                role: user.role,
                action: "create payment plans",
            });
        }
        self.directory.student(student)?;
        let ledger = self.ledgers.get(student, self.context).ok().map(|l| l.id);
        let now = time.now();
        let plan = PaymentPlan::new(
            student,
            ledger,
            total_amount,
            number_of_installments,
            start_date,
            end_date,
            actor,
            now,
        )?;
        let id = plan.id;
        self.plans.insert(id, plan);
        self.audit.record(
            actor,
            AuditAction::PaymentPlanCreated,
            format!(
                "Payment plan of {} over {} installments for student {}",
                total_amount, number_of_installments, student
            ),
            Some(student),
            Some(total_amount),
            now,
        );
        Ok(id)
    }

    pub fn plan(&self, id: PlanId) -> Result<&PaymentPlan> {
        self.plans.get(&id).ok_or(FeesError::PlanNotFound { id })
    }

    pub fn plan_mut(&mut self, id: PlanId) -> Result<&mut PaymentPlan> {
        self.plans.get_mut(&id).ok_or(FeesError::PlanNotFound { id })
    }

    pub fn request_refund(
        &mut self,
        student: StudentId,
        amount: Money,
        reason: impl Into<String>,
        refund_method: MethodId,
        requester: UserId,
        time: &SafeTimeProvider,
    ) -> Result<RefundId> {
        self.directory.user(requester)?;
        self.directory.student(student)?;
        self.directory.method(refund_method)?;
        let now = time.now();
        let refund = Refund::new(student, amount, reason, refund_method, requester, now)?;
        let id = refund.id;
        self.refunds.insert(id, refund);
        self.audit.record(
            requester,
            AuditAction::RefundRequested,
            format!("Refund of {} requested for student {}", amount, student),
            Some(student),
            Some(amount),
            now,
        );
        Ok(id)
    }

    pub fn approve_refund(
        &mut self,
        refund_id: RefundId,
        approver: UserId,
        time: &SafeTimeProvider,
    ) -> Result<()> {
        let user = self.directory.user(approver)?;
        if !user.role.can_approve_refunds() {
            return Err(FeesError::NotAuthorized {
                role: user.role,
                action: "approve refunds",
            });
        }
        let refund = self
            .refunds
            .get_mut(&refund_id)
            .ok_or(FeesError::RefundNotFound { id: refund_id })?;
        refund.approve(approver)?;
        let (student, amount) = (refund.student, refund.amount);
        self.audit.record(
            approver,
            AuditAction::RefundApproved,
            format!("Refund of {} approved for student {}", amount, student),
            Some(student),
            Some(amount),
            time.now(),
        );
        Ok(())
    }

    pub fn process_refund(
        &mut self,
        refund_id: RefundId,
        actor: UserId,
        time: &SafeTimeProvider,
    ) -> Result<()> {
        let user = self.directory.user(actor)?;
        if !user.role.can_approve_refunds() {
            return Err(FeesError::NotAuthorized {
                role: user.role,
                action: "process refunds",
            });
        }
        let now = time.now();
        let refund = self
            .refunds
            .get_mut(&refund_id)
            .ok_or(FeesError::RefundNotFound { id: refund_id })?;
        refund.process(now)?;
        let (student, amount) = (refund.student, refund.amount);
        self.audit.record(
            actor,
            AuditAction::RefundProcessed,
            format!("Refund of {} processed for student {}", amount, student),
            Some(student),
            Some(amount),
            now,
        );
        info!(student = %student, amount = %amount, "refund processed");
        Ok(())
    }

    pub fn reject_refund(
        &mut self,
        refund_id: RefundId,
        actor: UserId,
        time: &SafeTimeProvider,
    ) -> Result<()> {
        let user = self.directory.user(actor)?;
        if !user.role.can_approve_refunds() {
            return Err(FeesError::NotAuthorized {
                role: user.role,
                action: "reject refunds",
            });
        }
        let refund = self
            .refunds
            .get_mut(&refund_id)
            .ok_or(FeesError::RefundNotFound { id: refund_id })?;
        refund.reject()?;
        let (student, amount) = (refund.student, refund.amount);
        self.audit.record(
            actor,
            AuditAction::RefundRejected,
            format!("Refund of {} rejected for student {}", amount, student),
            Some(student),
            Some(amount),
            time.now(),
        );
        Ok(())
    }

    pub fn refund(&self, id: RefundId) -> Result<&Refund> {
        self.refunds.get(&id).ok_or(FeesError::RefundNotFound { id })
    }

    // reporting

    /// expected vs collected over the current context
    pub fn collection_summary(&self) -> CollectionSummary {
        let mut total_expected = Money::ZERO;
        let mut total_collected = Money::ZERO;
        let mut total_students = 0;
        let mut fully_paid_students = 0;

        for ledger in self.ledgers.ledgers() {
            if ledger.academic_year != self.context.academic_year || ledger.term != self.context.term
            {
                continue;
            }
            total_expected += ledger.total_required();
            total_collected += ledger.payments_made();
            total_students += 1;
            if !ledger.outstanding_balance().is_positive() {
                fully_paid_students += 1;
            }
        }

        let collection_rate = if total_expected.is_positive() {
            Rate::from_decimal(
                (total_collected.as_decimal() / total_expected.as_decimal() * Decimal::from(100))
                    .round_dp(2),
            )
        } else {
            Rate::ZERO
        };

        CollectionSummary {
            total_expected,
            total_collected,
            total_outstanding: total_expected - total_collected,
            collection_rate,
            total_students,
            fully_paid_students,
        }
    }

    /// verified amounts taken on a given day
    pub fn collections_on(&self, date: NaiveDate) -> Money {
        self.payments
            .values()
            .filter(|p| p.is_verified() && p.payment_date.date_naive() == date)
            .map(|p| p.amount)
            .sum()
    }

    pub fn audit(&self) -> &AuditTrail {
        &self.audit
    }

    pub(crate) fn ledgers(&self) -> &LedgerBook {
        &self.ledgers
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Currency, MethodKind, Role, ScholarType, TermName};
    use chrono::{TimeZone, Utc};
    use hourglass_rs::TimeSource;
    use uuid::Uuid;

    struct Fixture {
        office: FeeOffice,
        admin: UserId,
        student: StudentId,
        cash: MethodId,
        ecocash: MethodId,
    }

    fn test_time(year: i32) -> SafeTimeProvider {
        SafeTimeProvider::new(TimeSource::Test(
            Utc.with_ymd_and_hms(year, 3, 10, 9, 0, 0).unwrap(),
        ))
    }

    fn standard_components() -> FeeComponents {
        FeeComponents {
            tuition_fee: Money::from_major(200),
            exam_fee: Money::from_major(50),
            development_levy: Money::from_major(30),
            library_fee: Money::from_major(20),
            sports_levy: Money::from_major(15),
            ..FeeComponents::default()
        }
    }

    fn fixture() -> Fixture {
        let mut office = FeeOffice::new(AcademicContext::new(2025, TermName::Term1));
        let admin = office.register_user(User::new("bursar", "The Bursar", Role::Admin));
        let grade = Uuid::new_v4();
        let student = office.register_student(Student::new(
            "ADM-001",
            "Tinashe Ncube",
            grade,
            ScholarType::DayScholar,
        ));
        let cash = office.register_payment_method(PaymentMethod::new(MethodKind::Cash, false));
        let ecocash = office.register_payment_method(PaymentMethod::new(MethodKind::Ecocash, true));

        let time = test_time(2025);
        office
            .define_fee_structure(
                FeeStructure::new(
                    2025,
                    TermName::Term1,
                    grade,
                    ScholarType::DayScholar,
                    Currency::Usd,
                    standard_components(),
                ),
                admin,
                &time,
            )
            .unwrap();
        office.open_ledger(student).unwrap();

        Fixture {
            office,
            admin,
            student,
            cash,
            ecocash,
        }
    }

    #[test]
    fn test_open_ledger_bills_from_catalog() {
        let f = fixture();
        let snapshot = f.office.ledger_snapshot(f.student).unwrap();
        // scenario A/B: five components sum to 315.00
        assert_eq!(snapshot.term_fees, Money::from_str_exact("315.00").unwrap());
        assert_eq!(snapshot.total_required, Money::from_str_exact("315.00").unwrap());
        assert_eq!(snapshot.outstanding_balance, Money::from_str_exact("315.00").unwrap());
    }

    #[test]
    fn test_record_payment_flow() {
        let mut f = fixture();
        let time = test_time(2025);

        let outcome = f
            .office
            .record_payment(
                PaymentRequest::new(f.student, Money::from_major(100), f.cash),
                f.admin,
                &time,
            )
            .unwrap();

        assert_eq!(outcome.receipt_number, "RCP-2025-000001");
        assert_eq!(outcome.previous_balance, Money::from_major(315));
        assert_eq!(outcome.new_balance, Money::from_major(215));

        let snapshot = f.office.ledger_snapshot(f.student).unwrap();
        assert_eq!(snapshot.payments_made, Money::from_major(100));
        assert_eq!(snapshot.outstanding_balance, Money::from_major(215));

        // receipt snapshot matches the outcome
        let receipt = f.office.receipts().by_number("RCP-2025-000001").unwrap();
        assert_eq!(receipt.previous_balance, Money::from_major(315));
        assert_eq!(receipt.new_balance, Money::from_major(215));
        assert_eq!(receipt.amount_paid, Money::from_major(100));

        // exactly one audit entry for the recording
        assert_eq!(
            f.office
                .audit()
                .for_action(AuditAction::PaymentRecorded)
                .count(),
            1
        );
    }

    #[test]
    fn test_overpayment_becomes_credit() {
        let mut f = fixture();
        let time = test_time(2025);

        f.office
            .record_payment(
                PaymentRequest::new(f.student, Money::from_major(100), f.cash),
                f.admin,
                &time,
            )
            .unwrap();
        f.office
            .record_payment(
                PaymentRequest::new(f.student, Money::from_major(215), f.cash),
                f.admin,
                &time,
            )
            .unwrap();

        assert_eq!(
            f.office.ledger_snapshot(f.student).unwrap().outstanding_balance,
            Money::ZERO
        );

        // scenario C: paying again drives the balance negative, which is credit
        let outcome = f
            .office
            .record_payment(
                PaymentRequest::new(f.student, Money::from_major(50), f.cash),
                f.admin,
                &time,
            )
            .unwrap();
        assert_eq!(outcome.new_balance, Money::from_major(-50));
        assert_eq!(
            f.office.ledger_snapshot(f.student).unwrap().outstanding_balance,
            Money::from_major(-50)
        );
    }

    #[test]
    fn test_receipt_numbers_are_sequential_and_reset_by_year() {
        let mut f = fixture();
        let time_2025 = test_time(2025);

        for expected in ["RCP-2025-000001", "RCP-2025-000002"] {
            let outcome = f
                .office
                .record_payment(
                    PaymentRequest::new(f.student, Money::from_major(10), f.cash),
                    f.admin,
                    &time_2025,
                )
                .unwrap();
            assert_eq!(outcome.receipt_number, expected);
        }

        // scenario D: the first receipt of 2026 restarts the sequence
        let time_2026 = test_time(2026);
        let outcome = f
            .office
            .record_payment(
                PaymentRequest::new(f.student, Money::from_major(10), f.cash),
                f.admin,
                &time_2026,
            )
            .unwrap();
        assert_eq!(outcome.receipt_number, "RCP-2026-000001");
    }

    #[test]
    fn test_invalid_amount_leaves_no_trace() {
        let mut f = fixture();
        let time = test_time(2025);
        let before = f.office.ledger_snapshot(f.student).unwrap();

        let result = f.office.record_payment(
            PaymentRequest::new(f.student, Money::ZERO, f.cash),
            f.admin,
            &time,
        );
        assert!(matches!(result, Err(FeesError::InvalidPaymentAmount { .. })));

        // scenario E: no payment, receipt, ledger mutation, or audit entry
        assert_eq!(f.office.ledger_snapshot(f.student).unwrap(), before);
        assert!(f.office.payment_history(f.student).is_empty());
        assert!(f.office.receipts().receipts().is_empty());
        assert_eq!(
            f.office
                .audit()
                .for_action(AuditAction::PaymentRecorded)
                .count(),
            0
        );
        assert_eq!(f.office.receipts().sequencer().last_issued(2025), 0);
    }

    #[test]
    fn test_unknown_references_leave_no_trace() {
        let mut f = fixture();
        let time = test_time(2025);

        let result = f.office.record_payment(
            PaymentRequest::new(Uuid::new_v4(), Money::from_major(50), f.cash),
            f.admin,
            &time,
        );
        assert!(matches!(result, Err(FeesError::StudentNotFound { .. })));

        let result = f.office.record_payment(
            PaymentRequest::new(f.student, Money::from_major(50), Uuid::new_v4()),
            f.admin,
            &time,
        );
        assert!(matches!(result, Err(FeesError::PaymentMethodNotFound { .. })));

        assert!(f.office.receipts().receipts().is_empty());
        assert_eq!(
            f.office
                .audit()
                .for_action(AuditAction::PaymentRecorded)
                .count(),
            0
        );
    }

    #[test]
    fn test_reference_required_by_method() {
        let mut f = fixture();
        let time = test_time(2025);

        let result = f.office.record_payment(
            PaymentRequest::new(f.student, Money::from_major(50), f.ecocash),
            f.admin,
            &time,
        );
        assert!(matches!(result, Err(FeesError::MissingReference)));

        let outcome = f.office.record_payment(
            PaymentRequest::new(f.student, Money::from_major(50), f.ecocash)
                .with_reference("ECO-12345"),
            f.admin,
            &time,
        );
        assert!(outcome.is_ok());
    }

    #[test]
    fn test_non_admin_cannot_record() {
        let mut f = fixture();
        let time = test_time(2025);
        let teacher = f
            .office
            .register_user(User::new("mrs-dube", "Mrs Dube", Role::Teacher));

        let result = f.office.record_payment(
            PaymentRequest::new(f.student, Money::from_major(50), f.cash),
            teacher,
            &time,
        );
        assert!(matches!(
            result,
            Err(FeesError::NotAuthorized { role: Role::Teacher, .. })
        ));
    }

    #[test]
    fn test_pending_payment_only_counts_after_verification() {
        let mut f = fixture();
        let time = test_time(2025);
        let parent = f
            .office
            .register_user(User::new("parent", "A Parent", Role::Student));

        let payment_id = f
            .office
            .submit_payment(
                PaymentRequest::new(f.student, Money::from_major(80), f.ecocash)
                    .with_reference("ECO-777"),
                parent,
                &time,
            )
            .unwrap();

        // pending: ledger untouched, no receipt
        assert_eq!(
            f.office.ledger_snapshot(f.student).unwrap().payments_made,
            Money::ZERO
        );
        assert!(f.office.receipts().receipts().is_empty());

        let outcome = f
            .office
            .review_payment(payment_id, f.admin, true, &time)
            .unwrap()
            .expect("verified payments produce a receipt");

        assert_eq!(outcome.previous_balance, Money::from_major(315));
        assert_eq!(outcome.new_balance, Money::from_major(235));
        assert_eq!(
            f.office.ledger_snapshot(f.student).unwrap().payments_made,
            Money::from_major(80)
        );
        assert_eq!(
            f.office
                .audit()
                .for_action(AuditAction::PaymentVerified)
                .count(),
            1
        );

        // a second review of the same payment is an invalid transition
        assert!(f
            .office
            .review_payment(payment_id, f.admin, true, &time)
            .is_err());
    }

    #[test]
    fn test_declined_payment_changes_nothing() {
        let mut f = fixture();
        let time = test_time(2025);

        let payment_id = f
            .office
            .submit_payment(
                PaymentRequest::new(f.student, Money::from_major(80), f.cash),
                f.admin,
                &time,
            )
            .unwrap();

        let outcome = f
            .office
            .review_payment(payment_id, f.admin, false, &time)
            .unwrap();
        assert!(outcome.is_none());

        assert_eq!(
            f.office.ledger_snapshot(f.student).unwrap().payments_made,
            Money::ZERO
        );
        assert!(f.office.receipts().receipts().is_empty());
        assert_eq!(
            f.office.payment(payment_id).unwrap().status,
            PaymentStatus::Failed
        );
    }

    #[test]
    fn test_discount_reduces_amount_due_not_ledger() {
        let mut f = fixture();
        let time = test_time(2025);

        f.office
            .grant_discount(
                f.student,
                DiscountType::Sibling,
                Rate::from_percentage(10),
                Money::ZERO,
                "second child",
                f.admin,
                &time,
            )
            .unwrap();

        assert_eq!(
            f.office.amount_due(f.student).unwrap(),
            Money::from_str_exact("283.50").unwrap()
        );
        // ledger arithmetic ignores the discount
        assert_eq!(
            f.office.ledger_snapshot(f.student).unwrap().outstanding_balance,
            Money::from_major(315)
        );
        assert_eq!(
            f.office
                .audit()
                .for_action(AuditAction::DiscountApplied)
                .count(),
            1
        );
    }

    #[test]
    fn test_payment_plan_splits_exactly() {
        let mut f = fixture();
        let time = test_time(2025);
        let start = NaiveDate::from_ymd_opt(2025, 2, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2025, 5, 1).unwrap();

        // scenario F
        let plan_id = f
            .office
            .create_payment_plan(
                f.student,
                Money::from_str_exact("300.00").unwrap(),
                4,
                start,
                end,
                f.admin,
                &time,
            )
            .unwrap();
        assert_eq!(
            f.office.plan(plan_id).unwrap().installment_amount,
            Money::from_str_exact("75.00").unwrap()
        );

        let result = f.office.create_payment_plan(
            f.student,
            Money::from_major(300),
            0,
            start,
            end,
            f.admin,
            &time,
        );
        assert!(matches!(result, Err(FeesError::ZeroInstallments)));
    }

    #[test]
    fn test_refund_lifecycle_is_audited() {
        let mut f = fixture();
        let time = test_time(2025);

        let refund_id = f
            .office
            .request_refund(
                f.student,
                Money::from_major(40),
                "withdrew mid-term",
                f.cash,
                f.admin,
                &time,
            )
            .unwrap();
        f.office.approve_refund(refund_id, f.admin, &time).unwrap();
        f.office.process_refund(refund_id, f.admin, &time).unwrap();

        let refund = f.office.refund(refund_id).unwrap();
        assert!(refund.processed_at.is_some());

        for action in [
            AuditAction::RefundRequested,
            AuditAction::RefundApproved,
            AuditAction::RefundProcessed,
        ] {
            assert_eq!(f.office.audit().for_action(action).count(), 1);
        }

        // processing again is an invalid transition
        assert!(f.office.process_refund(refund_id, f.admin, &time).is_err());
    }

    #[test]
    fn test_collection_summary() {
        let mut f = fixture();
        let time = test_time(2025);

        let other = f.office.register_student(Student::new(
            "ADM-002",
            "Rudo Chirwa",
            Uuid::new_v4(),
            ScholarType::DayScholar,
        ));
        f.office
            .set_term_fees(other, Money::from_major(185), f.admin, &time)
            .unwrap();
        f.office
            .record_payment(
                PaymentRequest::new(f.student, Money::from_major(315), f.cash),
                f.admin,
                &time,
            )
            .unwrap();

        let summary = f.office.collection_summary();
        assert_eq!(summary.total_expected, Money::from_major(500));
        assert_eq!(summary.total_collected, Money::from_major(315));
        assert_eq!(summary.total_outstanding, Money::from_major(185));
        assert_eq!(summary.collection_rate, Rate::from_decimal(rust_decimal_macros::dec!(63.00)));
        assert_eq!(summary.total_students, 2);
        assert_eq!(summary.fully_paid_students, 1);
    }

    #[test]
    fn test_history_is_newest_first() {
        let mut f = fixture();

        let early = SafeTimeProvider::new(TimeSource::Test(
            Utc.with_ymd_and_hms(2025, 2, 1, 8, 0, 0).unwrap(),
        ));
        let late = SafeTimeProvider::new(TimeSource::Test(
            Utc.with_ymd_and_hms(2025, 4, 1, 8, 0, 0).unwrap(),
        ));

        f.office
            .record_payment(
                PaymentRequest::new(f.student, Money::from_major(10), f.cash),
                f.admin,
                &early,
            )
            .unwrap();
        f.office
            .record_payment(
                PaymentRequest::new(f.student, Money::from_major(20), f.cash),
                f.admin,
                &late,
            )
            .unwrap();

        let history = f.office.payment_history(f.student);
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].amount, Money::from_major(20));
        assert_eq!(history[1].amount, Money::from_major(10));

        assert_eq!(
            f.office.collections_on(NaiveDate::from_ymd_opt(2025, 4, 1).unwrap()),
            Money::from_major(20)
        );
    }

    #[test]
    fn test_snapshot_for_unknown_ledger_is_not_found() {
        let f = fixture();
        assert!(matches!(
            f.office.ledger_snapshot(Uuid::new_v4()),
            Err(FeesError::LedgerNotFound { .. })
        ));
    }
}
