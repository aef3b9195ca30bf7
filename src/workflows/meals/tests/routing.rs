use super::common::*;
use axum::http::StatusCode;
use chrono::Weekday;
use serde_json::json;
use std::sync::Arc;
use tower::ServiceExt;

use crate::workflows::meals::domain::WeekSchedule;
use crate::workflows::meals::report::MealReportAggregator;
use crate::workflows::meals::repository::MemoryStudentDirectory;
use crate::workflows::meals::service::MealRegistrationService;
use crate::workflows::meals::{meal_router, MealApi};

fn register_body(matricula: &str) -> axum::body::Body {
    axum::body::Body::from(
        serde_json::to_vec(&json!({
            "matricula": matricula,
            "registered_by": { "name": "Atendente", "email": "atendente@escola.example" },
        }))
        .expect("serializable body"),
    )
}

fn post_register(matricula: &str) -> axum::http::Request<axum::body::Body> {
    axum::http::Request::post("/api/v1/meals")
        .header(axum::http::header::CONTENT_TYPE, "application/json")
        .body(register_body(matricula))
        .expect("valid request")
}

fn get_report(query: &str) -> axum::http::Request<axum::body::Body> {
    axum::http::Request::get(format!("/api/v1/meals/report?{query}"))
        .body(axum::body::Body::empty())
        .expect("valid request")
}

#[tokio::test]
async fn register_route_creates_a_record() {
    let (router, harness) = router_at(at_noon(monday()));
    harness
        .directory
        .seed(student("20230001", true, schedule_on(Weekday::Mon)));

    let response = router
        .oneshot(post_register("20230001"))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::CREATED);
    let payload = read_json_body(response).await;
    assert_eq!(payload["total_today"], 1);
    assert_eq!(payload["record"]["student"]["matricula"], "20230001");
    assert_eq!(payload["record"]["category"], "course_contra_turno");
}

#[tokio::test]
async fn register_route_rejects_duplicates_with_conflict() {
    let (router, harness) = router_at(at_noon(monday()));
    harness
        .directory
        .seed(student("20230001", true, schedule_on(Weekday::Mon)));

    let first = router
        .clone()
        .oneshot(post_register("20230001"))
        .await
        .expect("route executes");
    assert_eq!(first.status(), StatusCode::CREATED);

    let second = router
        .oneshot(post_register("20230001"))
        .await
        .expect("route executes");
    assert_eq!(second.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn register_route_returns_not_found_for_unknown_student() {
    let (router, _harness) = router_at(at_noon(monday()));

    let response = router
        .oneshot(post_register("99999999"))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn register_route_rejects_inactive_students() {
    let (router, harness) = router_at(at_noon(monday()));
    harness
        .directory
        .seed(student("20230001", false, schedule_on(Weekday::Mon)));

    let response = router
        .oneshot(post_register("20230001"))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn register_route_rejects_unentitled_students() {
    let (router, harness) = router_at(at_noon(monday()));
    harness
        .directory
        .seed(student("20230001", true, WeekSchedule::none()));

    let response = router
        .oneshot(post_register("20230001"))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn register_route_maps_storage_failures_to_internal_error() {
    let directory = Arc::new(MemoryStudentDirectory::default());
    directory.seed(student("20230001", true, schedule_on(Weekday::Mon)));
    let sources = Arc::new(crate::workflows::meals::repository::MemoryEntitlementSources::default());
    let meals = Arc::new(UnavailableMealStore);
    let api = Arc::new(MealApi {
        registration: MealRegistrationService::new(
            directory,
            sources,
            meals.clone(),
            Arc::new(FixedClock(at_noon(monday()))),
        ),
        reports: MealReportAggregator::new(meals),
    });

    let response = meal_router(api)
        .oneshot(post_register("20230001"))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn report_route_returns_totals_and_records() {
    let (router, harness) = router_at(at_noon(monday()));
    harness
        .directory
        .seed(student("20230001", true, schedule_on(Weekday::Mon)));

    let created = router
        .clone()
        .oneshot(post_register("20230001"))
        .await
        .expect("route executes");
    assert_eq!(created.status(), StatusCode::CREATED);

    let response = router
        .oneshot(get_report("dataInicio=2025-06-02&dataTermino=2025-06-02"))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    assert_eq!(payload["totals"]["total"], 1);
    assert_eq!(payload["totals"]["contra_turno"], 1);
    assert_eq!(payload["records"].as_array().map(Vec::len), Some(1));
}

#[tokio::test]
async fn report_route_requires_both_dates() {
    let (router, _harness) = router_at(at_noon(monday()));

    let response = router
        .oneshot(get_report("dataInicio=2025-06-02"))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn report_route_rejects_unparsable_dates() {
    let (router, _harness) = router_at(at_noon(monday()));

    let response = router
        .oneshot(get_report("dataInicio=junho&dataTermino=2025-06-02"))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn report_route_rejects_inverted_ranges() {
    let (router, _harness) = router_at(at_noon(monday()));

    let response = router
        .oneshot(get_report("dataInicio=2025-06-03&dataTermino=2025-06-02"))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn report_route_passes_filters_through() {
    let (router, harness) = router_at(at_noon(monday()));
    harness
        .directory
        .seed(student("20230001", true, schedule_on(Weekday::Mon)));

    let created = router
        .clone()
        .oneshot(post_register("20230001"))
        .await
        .expect("route executes");
    assert_eq!(created.status(), StatusCode::CREATED);

    let response = router
        .oneshot(get_report(
            "dataInicio=2025-06-02&dataTermino=2025-06-02&curso=agropecu%C3%A1ria",
        ))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    assert_eq!(payload["totals"]["total"], 0);
    assert_eq!(payload["records"].as_array().map(Vec::len), Some(0));
}
