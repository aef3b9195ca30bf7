use std::sync::Arc;

use chrono::NaiveDate;

use super::domain::{MealCategory, Student};
use super::repository::{EntitlementSourceStore, RepositoryError};

/// A matched entitlement: the category that justifies today's meal and a
/// short description of the record that granted it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entitlement {
    pub category: MealCategory,
    pub source: String,
}

/// One eligibility source. Providers assume the caller already rejected
/// inactive students and receive `today` explicitly so they stay
/// deterministic.
pub trait EntitlementProvider: Send + Sync {
    fn try_match(
        &self,
        student: &Student,
        today: NaiveDate,
    ) -> Result<Option<Entitlement>, RepositoryError>;
}

/// Priority 1: the weekly contra-turno schedule of the student's course.
pub struct CourseContraTurnoProvider;

impl EntitlementProvider for CourseContraTurnoProvider {
    fn try_match(
        &self,
        student: &Student,
        today: NaiveDate,
    ) -> Result<Option<Entitlement>, RepositoryError> {
        let course = &student.class.course;
        if course.contra_turno.allows(today) {
            return Ok(Some(Entitlement {
                category: MealCategory::CourseContraTurno,
                source: course.name.clone(),
            }));
        }
        Ok(None)
    }
}

/// Priority 2: a project listing the student, whose date range covers
/// today and whose schedule flags today's weekday.
pub struct ActiveProjectProvider<S> {
    sources: Arc<S>,
}

impl<S> ActiveProjectProvider<S> {
    pub fn new(sources: Arc<S>) -> Self {
        Self { sources }
    }
}

impl<S: EntitlementSourceStore> EntitlementProvider for ActiveProjectProvider<S> {
    fn try_match(
        &self,
        student: &Student,
        today: NaiveDate,
    ) -> Result<Option<Entitlement>, RepositoryError> {
        for project in self.sources.projects_for(&student.matricula)? {
            if project.period.contains(today) && project.schedule.allows(today) {
                return Ok(Some(Entitlement {
                    category: MealCategory::Project,
                    source: project.description,
                }));
            }
        }
        Ok(None)
    }
}

/// Priority 3: an internship for the student, same date-range and
/// weekday test as projects.
pub struct ActiveInternshipProvider<S> {
    sources: Arc<S>,
}

impl<S> ActiveInternshipProvider<S> {
    pub fn new(sources: Arc<S>) -> Self {
        Self { sources }
    }
}

impl<S: EntitlementSourceStore> EntitlementProvider for ActiveInternshipProvider<S> {
    fn try_match(
        &self,
        student: &Student,
        today: NaiveDate,
    ) -> Result<Option<Entitlement>, RepositoryError> {
        for internship in self.sources.internships_for(&student.matricula)? {
            if internship.period.contains(today) && internship.schedule.allows(today) {
                return Ok(Some(Entitlement {
                    category: MealCategory::Internship,
                    source: internship.description,
                }));
            }
        }
        Ok(None)
    }
}

/// Priority 4: an administrator release window for the student's class
/// whose date equals today, ignoring time of day.
pub struct ClassReleaseProvider<S> {
    sources: Arc<S>,
}

impl<S> ClassReleaseProvider<S> {
    pub fn new(sources: Arc<S>) -> Self {
        Self { sources }
    }
}

impl<S: EntitlementSourceStore> EntitlementProvider for ClassReleaseProvider<S> {
    fn try_match(
        &self,
        student: &Student,
        today: NaiveDate,
    ) -> Result<Option<Entitlement>, RepositoryError> {
        for release in self.sources.releases_for_class(&student.class.id)? {
            if release.date == today {
                return Ok(Some(Entitlement {
                    category: MealCategory::ClassRelease,
                    source: release.description,
                }));
            }
        }
        Ok(None)
    }
}

/// Runs the providers in priority order and returns the first match.
pub struct EligibilityEvaluator {
    providers: Vec<Box<dyn EntitlementProvider>>,
}

impl EligibilityEvaluator {
    /// Standard chain: course contra-turno, then project, then
    /// internship, then class release.
    pub fn standard<S>(sources: Arc<S>) -> Self
    where
        S: EntitlementSourceStore + 'static,
    {
        Self::with_providers(vec![
            Box::new(CourseContraTurnoProvider),
            Box::new(ActiveProjectProvider::new(sources.clone())),
            Box::new(ActiveInternshipProvider::new(sources.clone())),
            Box::new(ClassReleaseProvider::new(sources)),
        ])
    }

    pub fn with_providers(providers: Vec<Box<dyn EntitlementProvider>>) -> Self {
        Self { providers }
    }

    /// First matching entitlement, or `None` when no source grants a
    /// meal today. The caller must have checked the active flag already.
    pub fn evaluate(
        &self,
        student: &Student,
        today: NaiveDate,
    ) -> Result<Option<Entitlement>, RepositoryError> {
        for provider in &self.providers {
            if let Some(entitlement) = provider.try_match(student, today)? {
                return Ok(Some(entitlement));
            }
        }
        Ok(None)
    }
}
