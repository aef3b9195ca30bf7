use std::collections::HashMap;
use std::sync::Mutex;

use chrono::NaiveDateTime;

use super::domain::{
    ClassMealRelease, Internship, MealCategory, MealRecord, Project, Student, StudentId,
};

/// Error enumeration for storage failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

/// Student lookup contract. Returns the student with class and course
/// references already resolved.
pub trait StudentDirectory: Send + Sync {
    fn fetch(&self, id: &StudentId) -> Result<Option<Student>, RepositoryError>;
}

/// Read access to the three record kinds the eligibility chain consults
/// beyond the student's own course.
pub trait EntitlementSourceStore: Send + Sync {
    fn projects_for(&self, student: &StudentId) -> Result<Vec<Project>, RepositoryError>;
    fn internships_for(&self, student: &StudentId) -> Result<Vec<Internship>, RepositoryError>;
    fn releases_for_class(&self, class_id: &str) -> Result<Vec<ClassMealRelease>, RepositoryError>;
}

/// Target field of a report filter, enumerated instead of resolved from
/// free-form key strings at query time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterField {
    RegistrarEmail,
    ClassDescription,
    CourseName,
    CategoryLabel,
    StudentName,
    Matricula,
    /// A key naming no stored field. Selects nothing.
    Unmatchable,
}

/// Case-insensitive partial match against one denormalized record field.
#[derive(Debug, Clone)]
pub struct FieldFilter {
    field: FilterField,
    needle: String,
}

impl FieldFilter {
    pub fn new(field: FilterField, needle: &str) -> Self {
        Self {
            field,
            needle: needle.to_lowercase(),
        }
    }

    pub fn field(&self) -> FilterField {
        self.field
    }

    pub fn matches(&self, record: &MealRecord) -> bool {
        let haystack = match self.field {
            FilterField::RegistrarEmail => record.registered_by.email.as_str(),
            FilterField::ClassDescription => record.student.turma.as_str(),
            FilterField::CourseName => record.student.course.as_str(),
            FilterField::CategoryLabel => record.category.label(),
            FilterField::StudentName => record.student.name.as_str(),
            FilterField::Matricula => record.student.matricula.as_str(),
            FilterField::Unmatchable => return false,
        };
        haystack.to_lowercase().contains(&self.needle)
    }
}

/// Range query with optional category restriction and field filters.
/// `end` is exclusive; callers hand in the start of the day after the
/// requested range.
#[derive(Debug, Clone)]
pub struct RecordQuery {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub category: Option<MealCategory>,
    pub filters: Vec<FieldFilter>,
}

impl RecordQuery {
    pub fn matches(&self, record: &MealRecord) -> bool {
        if record.registered_at < self.start || record.registered_at >= self.end {
            return false;
        }
        if let Some(category) = self.category {
            if record.category != category {
                return false;
            }
        }
        self.filters.iter().all(|filter| filter.matches(record))
    }
}

/// Meal record storage contract. `insert` owns the one-meal-per-day
/// uniqueness constraint: a second record for the same student and
/// calendar day must be rejected with [`RepositoryError::Conflict`],
/// even when two writers raced past the pre-insert guard check.
pub trait MealRecordStore: Send + Sync {
    fn insert(&self, record: MealRecord) -> Result<MealRecord, RepositoryError>;
    fn exists_between(
        &self,
        student: &StudentId,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<bool, RepositoryError>;
    fn count(&self, query: &RecordQuery) -> Result<usize, RepositoryError>;
    fn find(&self, query: &RecordQuery) -> Result<Vec<MealRecord>, RepositoryError>;
}

fn poisoned(store: &str) -> RepositoryError {
    RepositoryError::Unavailable(format!("{store} mutex poisoned"))
}

/// In-memory student directory backing the demo and tests.
#[derive(Default)]
pub struct MemoryStudentDirectory {
    students: Mutex<HashMap<StudentId, Student>>,
}

impl MemoryStudentDirectory {
    pub fn seed(&self, student: Student) {
        if let Ok(mut guard) = self.students.lock() {
            guard.insert(student.matricula.clone(), student);
        }
    }
}

impl StudentDirectory for MemoryStudentDirectory {
    fn fetch(&self, id: &StudentId) -> Result<Option<Student>, RepositoryError> {
        let guard = self
            .students
            .lock()
            .map_err(|_| poisoned("student directory"))?;
        Ok(guard.get(id).cloned())
    }
}

/// In-memory entitlement sources backing the demo and tests.
#[derive(Default)]
pub struct MemoryEntitlementSources {
    projects: Mutex<Vec<Project>>,
    internships: Mutex<Vec<Internship>>,
    releases: Mutex<Vec<ClassMealRelease>>,
}

impl MemoryEntitlementSources {
    pub fn seed_project(&self, project: Project) {
        if let Ok(mut guard) = self.projects.lock() {
            guard.push(project);
        }
    }

    pub fn seed_internship(&self, internship: Internship) {
        if let Ok(mut guard) = self.internships.lock() {
            guard.push(internship);
        }
    }

    pub fn seed_release(&self, release: ClassMealRelease) {
        if let Ok(mut guard) = self.releases.lock() {
            guard.push(release);
        }
    }
}

impl EntitlementSourceStore for MemoryEntitlementSources {
    fn projects_for(&self, student: &StudentId) -> Result<Vec<Project>, RepositoryError> {
        let guard = self.projects.lock().map_err(|_| poisoned("projects"))?;
        Ok(guard
            .iter()
            .filter(|project| project.students.contains(student))
            .cloned()
            .collect())
    }

    fn internships_for(&self, student: &StudentId) -> Result<Vec<Internship>, RepositoryError> {
        let guard = self.internships.lock().map_err(|_| poisoned("internships"))?;
        Ok(guard
            .iter()
            .filter(|internship| &internship.student == student)
            .cloned()
            .collect())
    }

    fn releases_for_class(&self, class_id: &str) -> Result<Vec<ClassMealRelease>, RepositoryError> {
        let guard = self.releases.lock().map_err(|_| poisoned("releases"))?;
        Ok(guard
            .iter()
            .filter(|release| release.class_id == class_id)
            .cloned()
            .collect())
    }
}

/// In-memory meal record store enforcing the per-(student, day)
/// uniqueness constraint under its own lock.
#[derive(Default)]
pub struct MemoryMealStore {
    records: Mutex<Vec<MealRecord>>,
}

impl MealRecordStore for MemoryMealStore {
    fn insert(&self, record: MealRecord) -> Result<MealRecord, RepositoryError> {
        let mut guard = self.records.lock().map_err(|_| poisoned("meal store"))?;
        let duplicate = guard.iter().any(|existing| {
            existing.student.matricula == record.student.matricula
                && existing.calendar_day() == record.calendar_day()
        });
        if duplicate {
            return Err(RepositoryError::Conflict);
        }
        guard.push(record.clone());
        Ok(record)
    }

    fn exists_between(
        &self,
        student: &StudentId,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<bool, RepositoryError> {
        let guard = self.records.lock().map_err(|_| poisoned("meal store"))?;
        Ok(guard.iter().any(|record| {
            &record.student.matricula == student
                && record.registered_at >= start
                && record.registered_at < end
        }))
    }

    fn count(&self, query: &RecordQuery) -> Result<usize, RepositoryError> {
        let guard = self.records.lock().map_err(|_| poisoned("meal store"))?;
        Ok(guard.iter().filter(|record| query.matches(record)).count())
    }

    fn find(&self, query: &RecordQuery) -> Result<Vec<MealRecord>, RepositoryError> {
        let guard = self.records.lock().map_err(|_| poisoned("meal store"))?;
        Ok(guard
            .iter()
            .filter(|record| query.matches(record))
            .cloned()
            .collect())
    }
}
