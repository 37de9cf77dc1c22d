use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::decimal::{Money, Rate};
use crate::errors::{FeesError, Result};
use crate::types::{Currency, GradeId, ScholarType, TermName};

/// the twelve fee components a structure is priced from, all defaulting to zero
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct FeeComponents {
    pub tuition_fee: Money,
    pub exam_fee: Money,
    pub development_levy: Money,
    pub building_fund: Money,
    pub sports_levy: Money,
    pub library_fee: Money,
    pub laboratory_fee: Money,
    pub computer_lab_fee: Money,
    pub transport_fee: Money,
    pub boarding_fee: Money,
    pub extra_classes_fee: Money,
    pub activity_fee: Money,
}

impl FeeComponents {
    pub fn total(&self) -> Money {
        self.tuition_fee
            + self.exam_fee
            + self.development_levy
            + self.building_fund
            + self.sports_levy
            + self.library_fee
            + self.laboratory_fee
            + self.computer_lab_fee
            + self.transport_fee
            + self.boarding_fee
            + self.extra_classes_fee
            + self.activity_fee
    }
}

/// key a fee structure is unique on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StructureKey {
    pub academic_year: i32,
    pub term: TermName,
    pub grade: GradeId,
    pub scholar_type: ScholarType,
}

/// declared total obligation for a grade/term/scholar-type combination.
/// total_fee is derived and only reachable through recomputing operations,
/// so it always equals the component sum.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeeStructure {
    pub academic_year: i32,
    pub term: TermName,
    pub grade: GradeId,
    pub scholar_type: ScholarType,
    pub currency: Currency,
    components: FeeComponents,
    total_fee: Money,
    pub payment_deadline: Option<NaiveDate>,
    pub early_payment_discount: Rate,
    pub late_payment_penalty: Rate,
}

impl FeeStructure {
    pub fn new(
        academic_year: i32,
        term: TermName,
        grade: GradeId,
        scholar_type: ScholarType,
        currency: Currency,
        components: FeeComponents,
    ) -> Self {
        Self {
            academic_year,
            term,
            grade,
            scholar_type,
            currency,
            total_fee: components.total(),
            components,
            payment_deadline: None,
            early_payment_discount: Rate::ZERO,
            late_payment_penalty: Rate::ZERO,
        }
    }

    pub fn key(&self) -> StructureKey {
        StructureKey {
            academic_year: self.academic_year,
            term: self.term,
            grade: self.grade,
            scholar_type: self.scholar_type,
        }
    }

    pub fn components(&self) -> &FeeComponents {
        &self.components
    }

    /// replace the component amounts, recomputing the total
    pub fn set_components(&mut self, components: FeeComponents) {
        self.components = components;
        self.total_fee = components.total();
    }

    pub fn total_fee(&self) -> Money {
        self.total_fee
    }
}

/// catalog of fee structures, unique per (year, term, grade, scholar type)
#[derive(Debug, Default)]
pub struct FeeCatalog {
    structures: HashMap<StructureKey, FeeStructure>,
}

impl FeeCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// add a structure; a second structure for the same key is rejected
    pub fn define(&mut self, structure: FeeStructure) -> Result<()> {
        let key = structure.key();
        if self.structures.contains_key(&key) {
            return Err(FeesError::DuplicateFeeStructure {
                year: key.academic_year,
                term: key.term,
                grade: key.grade,
                scholar_type: key.scholar_type,
            });
        }
        self.structures.insert(key, structure);
        Ok(())
    }

    pub fn get(&self, key: &StructureKey) -> Option<&FeeStructure> {
        self.structures.get(key)
    }

    pub fn lookup(&self, key: &StructureKey) -> Result<&FeeStructure> {
        self.structures
            .get(key)
            .ok_or(FeesError::FeeStructureNotFound {
                year: key.academic_year,
                term: key.term,
                grade: key.grade,
                scholar_type: key.scholar_type,
            })
    }

    /// replace the components of an existing structure; the total is recomputed
    pub fn amend_components(&mut self, key: &StructureKey, components: FeeComponents) -> Result<Money> {
        let structure = self
            .structures
            .get_mut(key)
            .ok_or(FeesError::FeeStructureNotFound {
                year: key.academic_year,
                term: key.term,
                grade: key.grade,
                scholar_type: key.scholar_type,
            })?;
        structure.set_components(components);
        Ok(structure.total_fee())
    }

    pub fn structures(&self) -> impl Iterator<Item = &FeeStructure> {
        self.structures.values()
    }
}

/// a recorded exchange rate, static lookup only
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExchangeRate {
    pub from_currency: Currency,
    pub to_currency: Currency,
    pub rate: Decimal,
    pub date: NaiveDate,
}

/// static rate table, unique per (from, to, date); no conversion engine
#[derive(Debug, Default)]
pub struct ExchangeRateTable {
    rates: Vec<ExchangeRate>,
}

impl ExchangeRateTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, entry: ExchangeRate) -> Result<()> {
        let duplicate = self.rates.iter().any(|r| {
            r.from_currency == entry.from_currency
                && r.to_currency == entry.to_currency
                && r.date == entry.date
        });
        if duplicate {
            return Err(FeesError::DuplicateExchangeRate {
                from: entry.from_currency.to_string(),
                to: entry.to_currency.to_string(),
                date: entry.date,
            });
        }
        self.rates.push(entry);
        Ok(())
    }

    /// most recent rate on record for the pair
    pub fn latest(&self, from: Currency, to: Currency) -> Option<&ExchangeRate> {
        self.rates
            .iter()
            .filter(|r| r.from_currency == from && r.to_currency == to)
            .max_by_key(|r| r.date)
    }

    /// convert using the latest recorded rate, if any
    pub fn convert(&self, amount: Money, from: Currency, to: Currency) -> Option<Money> {
        if from == to {
            return Some(amount);
        }
        self.latest(from, to).map(|r| amount * r.rate)
    }
}
