use chrono::{Datelike, NaiveDate, NaiveDateTime, Weekday};
use serde::{Deserialize, Serialize};

/// Matrícula — the student's unique enrollment identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StudentId(pub String);

impl StudentId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Weekly schedule with one boolean slot per weekday. Every entitlement
/// source that depends on the day of the week (course contra-turno,
/// project, internship) carries one of these.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeekSchedule {
    pub monday: bool,
    pub tuesday: bool,
    pub wednesday: bool,
    pub thursday: bool,
    pub friday: bool,
    pub saturday: bool,
    pub sunday: bool,
}

impl WeekSchedule {
    pub const fn none() -> Self {
        Self {
            monday: false,
            tuesday: false,
            wednesday: false,
            thursday: false,
            friday: false,
            saturday: false,
            sunday: false,
        }
    }

    pub const fn for_weekday(&self, weekday: Weekday) -> bool {
        match weekday {
            Weekday::Mon => self.monday,
            Weekday::Tue => self.tuesday,
            Weekday::Wed => self.wednesday,
            Weekday::Thu => self.thursday,
            Weekday::Fri => self.friday,
            Weekday::Sat => self.saturday,
            Weekday::Sun => self.sunday,
        }
    }

    /// Weekday index: maps a calendar date to its weekday slot.
    pub fn allows(&self, date: NaiveDate) -> bool {
        self.for_weekday(date.weekday())
    }
}

/// Inclusive calendar date range, as projects and internships declare it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Course {
    pub id: String,
    pub name: String,
    pub contra_turno: WeekSchedule,
}

/// Turma — a class/cohort, resolved with its course the way the student
/// lookup returns it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchoolClass {
    pub id: String,
    pub description: String,
    pub course: Course,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Student {
    pub matricula: StudentId,
    pub name: String,
    pub active: bool,
    pub class: SchoolClass,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub id: String,
    pub description: String,
    pub period: DateRange,
    pub schedule: WeekSchedule,
    pub students: Vec<StudentId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Internship {
    pub id: String,
    pub description: String,
    pub period: DateRange,
    pub schedule: WeekSchedule,
    pub student: StudentId,
}

/// Administrator-defined single date on which a whole class is granted
/// meal eligibility regardless of individual schedules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassMealRelease {
    pub class_id: String,
    pub date: NaiveDate,
    pub description: String,
}

/// Entitlement source that justified a meal registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MealCategory {
    CourseContraTurno,
    Project,
    Internship,
    ClassRelease,
}

impl MealCategory {
    pub const fn ordered() -> [Self; 4] {
        [
            Self::CourseContraTurno,
            Self::Project,
            Self::Internship,
            Self::ClassRelease,
        ]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::CourseContraTurno => "Contra turno",
            Self::Project => "Projeto",
            Self::Internship => "Estágio",
            Self::ClassRelease => "Turma",
        }
    }
}

/// User operating the registration desk; the report's `email` filter
/// matches this snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisteringUser {
    pub name: String,
    pub email: String,
}

/// Denormalized student fields frozen into each meal record so reports
/// survive later changes to the student, course, or class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentSnapshot {
    pub name: String,
    pub matricula: StudentId,
    pub course: String,
    pub turma: String,
}

impl StudentSnapshot {
    pub fn of(student: &Student) -> Self {
        Self {
            name: student.name.clone(),
            matricula: student.matricula.clone(),
            course: student.class.course.name.clone(),
            turma: student.class.description.clone(),
        }
    }
}

/// The one record kind this engine writes. At most one may exist per
/// student and calendar day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MealRecord {
    pub student: StudentSnapshot,
    pub category: MealCategory,
    pub registered_at: NaiveDateTime,
    pub registered_by: RegisteringUser,
}

impl MealRecord {
    pub fn calendar_day(&self) -> NaiveDate {
        self.registered_at.date()
    }
}
