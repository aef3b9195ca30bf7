use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::json;

use super::domain::{RegisteringUser, StudentId};
use super::report::{MealReportAggregator, MealReportError};
use super::repository::{MealRecordStore, StudentDirectory};
use super::service::{MealRegistrationError, MealRegistrationService};

/// Registration and reporting services bundled as router state.
pub struct MealApi<D, M> {
    pub registration: MealRegistrationService<D, M>,
    pub reports: MealReportAggregator<M>,
}

/// Router builder exposing the registration and report endpoints.
pub fn meal_router<D, M>(api: Arc<MealApi<D, M>>) -> Router
where
    D: StudentDirectory + 'static,
    M: MealRecordStore + 'static,
{
    Router::new()
        .route("/api/v1/meals", post(register_handler::<D, M>))
        .route("/api/v1/meals/report", get(report_handler::<D, M>))
        .with_state(api)
}

#[derive(Debug, Deserialize)]
pub struct RegisterMealRequest {
    pub matricula: String,
    pub registered_by: RegisteringUser,
}

pub(crate) async fn register_handler<D, M>(
    State(api): State<Arc<MealApi<D, M>>>,
    axum::Json(request): axum::Json<RegisterMealRequest>,
) -> Response
where
    D: StudentDirectory + 'static,
    M: MealRecordStore + 'static,
{
    let matricula = StudentId(request.matricula);
    match api.registration.register(&matricula, request.registered_by) {
        Ok(record) => {
            // The record is already stored; a failed count must not turn
            // the response into an error.
            let total_today = match api.registration.total_today() {
                Ok(total) => total,
                Err(error) => {
                    tracing::warn!(%error, "total-today count failed after registration");
                    0
                }
            };
            let payload = json!({
                "record": record,
                "total_today": total_today,
            });
            (StatusCode::CREATED, axum::Json(payload)).into_response()
        }
        Err(error) => registration_error_response(error),
    }
}

fn registration_error_response(error: MealRegistrationError) -> Response {
    let status = match error {
        MealRegistrationError::StudentNotFound => StatusCode::NOT_FOUND,
        MealRegistrationError::StudentInactive | MealRegistrationError::NotEntitledToday => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        MealRegistrationError::AlreadyRegisteredToday => StatusCode::CONFLICT,
        MealRegistrationError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    let payload = json!({
        "error": error.to_string(),
    });
    (status, axum::Json(payload)).into_response()
}

pub(crate) async fn report_handler<D, M>(
    State(api): State<Arc<MealApi<D, M>>>,
    Query(params): Query<HashMap<String, String>>,
) -> Response
where
    D: StudentDirectory + 'static,
    M: MealRecordStore + 'static,
{
    let mut params = params;
    let start = params.remove("dataInicio");
    let end = params.remove("dataTermino");

    let (start, end) = match (parse_bound(start), parse_bound(end)) {
        (Some(start), Some(end)) => (start, end),
        _ => {
            let payload = json!({
                "error": "dataInicio and dataTermino are required as YYYY-MM-DD dates",
            });
            return (StatusCode::BAD_REQUEST, axum::Json(payload)).into_response();
        }
    };

    match api.reports.report(start, end, &params) {
        Ok(report) => (StatusCode::OK, axum::Json(report)).into_response(),
        Err(MealReportError::InvalidDateRange) => {
            let payload = json!({
                "error": MealReportError::InvalidDateRange.to_string(),
            });
            (StatusCode::BAD_REQUEST, axum::Json(payload)).into_response()
        }
        Err(other) => {
            let payload = json!({
                "error": other.to_string(),
            });
            (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(payload)).into_response()
        }
    }
}

fn parse_bound(raw: Option<String>) -> Option<NaiveDate> {
    let raw = raw?;
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").ok()
}
