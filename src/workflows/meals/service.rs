use std::sync::Arc;

use chrono::{Days, Local, NaiveDate, NaiveDateTime, NaiveTime};
use tracing::info;

use super::domain::{MealRecord, RegisteringUser, StudentId, StudentSnapshot};
use super::eligibility::EligibilityEvaluator;
use super::repository::{
    EntitlementSourceStore, MealRecordStore, RecordQuery, RepositoryError, StudentDirectory,
};

/// Time source injected into the registration path so tests can pin
/// "today".
pub trait Clock: Send + Sync {
    fn now(&self) -> NaiveDateTime;
}

/// Wall clock in local time, matching how registrations happen at the
/// cafeteria desk.
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// `[start of day, start of next day)` bounds for a calendar date.
pub fn day_bounds(day: NaiveDate) -> (NaiveDateTime, NaiveDateTime) {
    let start = day.and_time(NaiveTime::MIN);
    let end = (day + Days::new(1)).and_time(NaiveTime::MIN);
    (start, end)
}

/// Read-only check for an existing meal record on the given calendar
/// day.
pub struct DuplicateGuard<M> {
    meals: Arc<M>,
}

impl<M: MealRecordStore> DuplicateGuard<M> {
    pub fn new(meals: Arc<M>) -> Self {
        Self { meals }
    }

    pub fn has_registered_today(
        &self,
        student: &StudentId,
        today: NaiveDate,
    ) -> Result<bool, RepositoryError> {
        let (start, end) = day_bounds(today);
        self.meals.exists_between(student, start, end)
    }
}

/// Error raised by the registration service.
#[derive(Debug, thiserror::Error)]
pub enum MealRegistrationError {
    #[error("student not found")]
    StudentNotFound,
    #[error("student is not active")]
    StudentInactive,
    #[error("student is not entitled to a meal today")]
    NotEntitledToday,
    #[error("student already had a meal today")]
    AlreadyRegisteredToday,
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Service orchestrating student lookup, the eligibility chain, the
/// duplicate guard, and the single meal-record write.
pub struct MealRegistrationService<D, M> {
    directory: Arc<D>,
    meals: Arc<M>,
    guard: DuplicateGuard<M>,
    evaluator: EligibilityEvaluator,
    clock: Arc<dyn Clock>,
}

impl<D, M> MealRegistrationService<D, M>
where
    D: StudentDirectory + 'static,
    M: MealRecordStore + 'static,
{
    pub fn new<S>(directory: Arc<D>, sources: Arc<S>, meals: Arc<M>, clock: Arc<dyn Clock>) -> Self
    where
        S: EntitlementSourceStore + 'static,
    {
        Self::with_evaluator(directory, EligibilityEvaluator::standard(sources), meals, clock)
    }

    pub fn with_evaluator(
        directory: Arc<D>,
        evaluator: EligibilityEvaluator,
        meals: Arc<M>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let guard = DuplicateGuard::new(meals.clone());
        Self {
            directory,
            meals,
            guard,
            evaluator,
            clock,
        }
    }

    /// Register one meal for the student, returning the stored record.
    ///
    /// The eligibility check and the insert are not one atomic step; the
    /// store's per-(student, day) uniqueness constraint is what finally
    /// serializes concurrent registrations, and its conflict surfaces
    /// here as `AlreadyRegisteredToday`.
    pub fn register(
        &self,
        matricula: &StudentId,
        registered_by: RegisteringUser,
    ) -> Result<MealRecord, MealRegistrationError> {
        let now = self.clock.now();
        let today = now.date();

        let student = self
            .directory
            .fetch(matricula)?
            .ok_or(MealRegistrationError::StudentNotFound)?;

        if !student.active {
            return Err(MealRegistrationError::StudentInactive);
        }

        let entitlement = self
            .evaluator
            .evaluate(&student, today)?
            .ok_or(MealRegistrationError::NotEntitledToday)?;

        if self.guard.has_registered_today(matricula, today)? {
            return Err(MealRegistrationError::AlreadyRegisteredToday);
        }

        let record = MealRecord {
            student: StudentSnapshot::of(&student),
            category: entitlement.category,
            registered_at: now,
            registered_by,
        };

        let stored = self.meals.insert(record).map_err(|err| match err {
            RepositoryError::Conflict => MealRegistrationError::AlreadyRegisteredToday,
            other => MealRegistrationError::Repository(other),
        })?;

        info!(
            matricula = matricula.as_str(),
            category = entitlement.category.label(),
            source = entitlement.source.as_str(),
            "meal registered"
        );

        Ok(stored)
    }

    /// Count of meals registered on the current calendar day.
    pub fn total_today(&self) -> Result<usize, MealRegistrationError> {
        let (start, end) = day_bounds(self.clock.now().date());
        let query = RecordQuery {
            start,
            end,
            category: None,
            filters: Vec::new(),
        };
        Ok(self.meals.count(&query)?)
    }
}
