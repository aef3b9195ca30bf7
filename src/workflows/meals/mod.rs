//! Meal entitlement engine: the prioritized eligibility chain, the
//! one-meal-per-day registration path, and categorized reporting over
//! stored meal records.
//!
//! Persistence is consumed through the repository traits so the whole
//! module can be exercised against in-memory doubles.

pub mod domain;
pub mod eligibility;
pub mod report;
pub mod repository;
pub mod router;
pub mod service;

#[cfg(test)]
mod tests;

pub use domain::{
    ClassMealRelease, Course, DateRange, Internship, MealCategory, MealRecord, Project,
    RegisteringUser, SchoolClass, Student, StudentId, StudentSnapshot, WeekSchedule,
};
pub use eligibility::{
    ActiveInternshipProvider, ActiveProjectProvider, ClassReleaseProvider,
    CourseContraTurnoProvider, EligibilityEvaluator, Entitlement, EntitlementProvider,
};
pub use report::{CategoryTotals, MealReport, MealReportAggregator, MealReportError};
pub use repository::{
    EntitlementSourceStore, FieldFilter, FilterField, MealRecordStore, MemoryEntitlementSources,
    MemoryMealStore, MemoryStudentDirectory, RecordQuery, RepositoryError, StudentDirectory,
};
pub use router::{meal_router, MealApi, RegisterMealRequest};
pub use service::{
    day_bounds, Clock, DuplicateGuard, MealRegistrationError, MealRegistrationService, SystemClock,
};
