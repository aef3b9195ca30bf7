use std::sync::Arc;

use axum::response::Response;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Weekday};
use serde_json::Value;

use crate::workflows::meals::domain::{
    ClassMealRelease, Course, DateRange, Internship, MealCategory, MealRecord, Project,
    RegisteringUser, SchoolClass, Student, StudentId, StudentSnapshot, WeekSchedule,
};
use crate::workflows::meals::report::MealReportAggregator;
use crate::workflows::meals::repository::{
    MealRecordStore, MemoryEntitlementSources, MemoryMealStore, MemoryStudentDirectory,
    RecordQuery, RepositoryError,
};
use crate::workflows::meals::service::{Clock, MealRegistrationService};
use crate::workflows::meals::{meal_router, MealApi};

/// A Monday, so course schedules in fixtures flag `monday`.
pub(super) fn monday() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 6, 2).expect("valid date")
}

pub(super) fn at_noon(day: NaiveDate) -> NaiveDateTime {
    day.and_time(NaiveTime::from_hms_opt(12, 0, 0).expect("valid time"))
}

pub(super) fn schedule_on(weekday: Weekday) -> WeekSchedule {
    let mut schedule = WeekSchedule::none();
    match weekday {
        Weekday::Mon => schedule.monday = true,
        Weekday::Tue => schedule.tuesday = true,
        Weekday::Wed => schedule.wednesday = true,
        Weekday::Thu => schedule.thursday = true,
        Weekday::Fri => schedule.friday = true,
        Weekday::Sat => schedule.saturday = true,
        Weekday::Sun => schedule.sunday = true,
    }
    schedule
}

pub(super) fn course_with(contra_turno: WeekSchedule) -> Course {
    Course {
        id: "curso-inf".to_string(),
        name: "Técnico em Informática".to_string(),
        contra_turno,
    }
}

pub(super) fn class_with(course: Course) -> SchoolClass {
    SchoolClass {
        id: "turma-inf-2023".to_string(),
        description: "INF 2023".to_string(),
        course,
    }
}

pub(super) fn student(matricula: &str, active: bool, contra_turno: WeekSchedule) -> Student {
    Student {
        matricula: StudentId(matricula.to_string()),
        name: format!("Estudante {matricula}"),
        active,
        class: class_with(course_with(contra_turno)),
    }
}

pub(super) fn project_for(matricula: &str, period: DateRange, schedule: WeekSchedule) -> Project {
    Project {
        id: "proj-robotica".to_string(),
        description: "Clube de robótica".to_string(),
        period,
        schedule,
        students: vec![StudentId(matricula.to_string())],
    }
}

pub(super) fn internship_for(
    matricula: &str,
    period: DateRange,
    schedule: WeekSchedule,
) -> Internship {
    Internship {
        id: "estagio-ti".to_string(),
        description: "Estágio em TI".to_string(),
        period,
        schedule,
        student: StudentId(matricula.to_string()),
    }
}

pub(super) fn release_for(class_id: &str, date: NaiveDate) -> ClassMealRelease {
    ClassMealRelease {
        class_id: class_id.to_string(),
        date,
        description: "Liberação da turma".to_string(),
    }
}

pub(super) fn desk() -> RegisteringUser {
    RegisteringUser {
        name: "Atendente".to_string(),
        email: "atendente@escola.example".to_string(),
    }
}

pub(super) fn record_at(
    matricula: &str,
    category: MealCategory,
    at: NaiveDateTime,
) -> MealRecord {
    MealRecord {
        student: StudentSnapshot {
            name: format!("Estudante {matricula}"),
            matricula: StudentId(matricula.to_string()),
            course: "Técnico em Informática".to_string(),
            turma: "INF 2023".to_string(),
        },
        category,
        registered_at: at,
        registered_by: desk(),
    }
}

pub(super) struct FixedClock(pub NaiveDateTime);

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        self.0
    }
}

pub(super) struct Harness {
    pub directory: Arc<MemoryStudentDirectory>,
    pub sources: Arc<MemoryEntitlementSources>,
    pub meals: Arc<MemoryMealStore>,
    pub service: MealRegistrationService<MemoryStudentDirectory, MemoryMealStore>,
}

pub(super) fn harness_at(now: NaiveDateTime) -> Harness {
    let directory = Arc::new(MemoryStudentDirectory::default());
    let sources = Arc::new(MemoryEntitlementSources::default());
    let meals = Arc::new(MemoryMealStore::default());
    let service = MealRegistrationService::new(
        directory.clone(),
        sources.clone(),
        meals.clone(),
        Arc::new(FixedClock(now)),
    );
    Harness {
        directory,
        sources,
        meals,
        service,
    }
}

pub(super) fn aggregator(meals: Arc<MemoryMealStore>) -> MealReportAggregator<MemoryMealStore> {
    MealReportAggregator::new(meals)
}

pub(super) fn router_at(now: NaiveDateTime) -> (axum::Router, Harness) {
    let harness = harness_at(now);
    let api = MealApi {
        registration: MealRegistrationService::new(
            harness.directory.clone(),
            harness.sources.clone(),
            harness.meals.clone(),
            Arc::new(FixedClock(now)),
        ),
        reports: MealReportAggregator::new(harness.meals.clone()),
    };
    (meal_router(Arc::new(api)), harness)
}

/// Store that reports no record during the guard check but refuses the
/// insert, imitating a concurrent writer landing first.
#[derive(Default)]
pub(super) struct RacingMealStore {
    inner: MemoryMealStore,
}

impl MealRecordStore for RacingMealStore {
    fn insert(&self, _record: MealRecord) -> Result<MealRecord, RepositoryError> {
        Err(RepositoryError::Conflict)
    }

    fn exists_between(
        &self,
        _student: &StudentId,
        _start: NaiveDateTime,
        _end: NaiveDateTime,
    ) -> Result<bool, RepositoryError> {
        Ok(false)
    }

    fn count(&self, query: &RecordQuery) -> Result<usize, RepositoryError> {
        self.inner.count(query)
    }

    fn find(&self, query: &RecordQuery) -> Result<Vec<MealRecord>, RepositoryError> {
        self.inner.find(query)
    }
}

pub(super) struct UnavailableMealStore;

impl MealRecordStore for UnavailableMealStore {
    fn insert(&self, _record: MealRecord) -> Result<MealRecord, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn exists_between(
        &self,
        _student: &StudentId,
        _start: NaiveDateTime,
        _end: NaiveDateTime,
    ) -> Result<bool, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn count(&self, _query: &RecordQuery) -> Result<usize, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn find(&self, _query: &RecordQuery) -> Result<Vec<MealRecord>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
