use std::collections::HashMap;
use std::sync::Arc;

use chrono::NaiveDate;
use serde::Serialize;
use tracing::info;

use super::domain::{MealCategory, MealRecord};
use super::repository::{FieldFilter, FilterField, MealRecordStore, RecordQuery, RepositoryError};
use super::service::day_bounds;

/// Translation table from report filter keys to stored fields. Keys not
/// listed here name no stored field and therefore select nothing.
const FILTER_FIELDS: &[(&str, FilterField)] = &[
    ("email", FilterField::RegistrarEmail),
    ("turma", FilterField::ClassDescription),
    ("curso", FilterField::CourseName),
    ("tipoRefeicao", FilterField::CategoryLabel),
    ("nome", FilterField::StudentName),
    ("matricula", FilterField::Matricula),
];

/// Builds field filters from a caller-supplied filter map. Empty values
/// are skipped; unknown non-empty keys become impossible matches.
pub fn translate_filters(filters: &HashMap<String, String>) -> Vec<FieldFilter> {
    filters
        .iter()
        .filter(|(_, value)| !value.is_empty())
        .map(|(key, value)| {
            let field = FILTER_FIELDS
                .iter()
                .find(|(name, _)| *name == key.as_str())
                .map(|(_, field)| *field)
                .unwrap_or(FilterField::Unmatchable);
            FieldFilter::new(field, value)
        })
        .collect()
}

/// Per-category counts over the requested range, unfiltered except for
/// the range itself, plus the filtered total.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CategoryTotals {
    pub total: usize,
    pub contra_turno: usize,
    pub projeto: usize,
    pub estagio: usize,
    pub turma: usize,
}

/// Aggregated report: the requested range, the totals block, and the
/// filtered record listing.
#[derive(Debug, Clone, Serialize)]
pub struct MealReport {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub totals: CategoryTotals,
    pub records: Vec<MealRecord>,
}

/// Error raised by the report aggregator.
#[derive(Debug, thiserror::Error)]
pub enum MealReportError {
    #[error("start date must not be after end date")]
    InvalidDateRange,
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Computes categorized meal statistics over a date range. Reads only;
/// independent of the registration path.
pub struct MealReportAggregator<M> {
    meals: Arc<M>,
}

impl<M: MealRecordStore> MealReportAggregator<M> {
    pub fn new(meals: Arc<M>) -> Self {
        Self { meals }
    }

    /// Report covering the full start day through the full end day.
    /// The sub-queries are mutually independent; results are only
    /// combined at the end.
    pub fn report(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        filters: &HashMap<String, String>,
    ) -> Result<MealReport, MealReportError> {
        if start > end {
            return Err(MealReportError::InvalidDateRange);
        }

        let (range_start, _) = day_bounds(start);
        let (_, range_end) = day_bounds(end);

        let filtered = RecordQuery {
            start: range_start,
            end: range_end,
            category: None,
            filters: translate_filters(filters),
        };

        let category_query = |category: MealCategory| RecordQuery {
            start: range_start,
            end: range_end,
            category: Some(category),
            filters: Vec::new(),
        };

        let total = self.meals.count(&filtered)?;
        let contra_turno = self
            .meals
            .count(&category_query(MealCategory::CourseContraTurno))?;
        let projeto = self.meals.count(&category_query(MealCategory::Project))?;
        let estagio = self.meals.count(&category_query(MealCategory::Internship))?;
        let turma = self.meals.count(&category_query(MealCategory::ClassRelease))?;
        let records = self.meals.find(&filtered)?;

        info!(%start, %end, total, "meal report generated");

        Ok(MealReport {
            start,
            end,
            totals: CategoryTotals {
                total,
                contra_turno,
                projeto,
                estagio,
                turma,
            },
            records,
        })
    }
}
