use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use axum_prometheus::PrometheusMetricLayer;
use chrono::{Datelike, Days, Local, NaiveDate, NaiveDateTime, NaiveTime};
use clap::{Args, Parser, Subcommand};
use metrics_exporter_prometheus::PrometheusHandle;
use refeitorio_engine::config::AppConfig;
use refeitorio_engine::error::AppError;
use refeitorio_engine::telemetry;
use refeitorio_engine::workflows::meals::{
    meal_router, ClassMealRelease, Clock, Course, DateRange, Internship, MealApi,
    MealRegistrationService, MealReportAggregator, MemoryEntitlementSources, MemoryMealStore,
    MemoryStudentDirectory, Project, RegisteringUser, SchoolClass, Student, StudentId, SystemClock,
    WeekSchedule,
};
use serde_json::json;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::info;

#[derive(Clone)]
struct AppState {
    readiness: Arc<AtomicBool>,
    metrics: PrometheusHandle,
}

#[derive(Parser, Debug)]
#[command(
    name = "Refeitorio Engine",
    about = "Run the meal entitlement engine from the command line",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Seed sample data, register meals, and print a report
    Demo(DemoArgs),
}

#[derive(Args, Debug, Default)]
struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    port: Option<u16>,
    /// Seed the in-memory stores with the demo dataset
    #[arg(long)]
    demo_data: bool,
}

#[derive(Args, Debug)]
struct DemoArgs {
    /// Registration day for the demo (defaults to today)
    #[arg(long, value_parser = parse_date)]
    today: Option<NaiveDate>,
}

#[tokio::main]
async fn main() {
    if let Err(err) = run_cli().await {
        eprintln!("application error: {err}");
        std::process::exit(1);
    }
}

async fn run_cli() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => run_server(args).await,
        Command::Demo(args) => run_demo(args),
    }
}

fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}

fn build_api(
    directory: Arc<MemoryStudentDirectory>,
    sources: Arc<MemoryEntitlementSources>,
    meals: Arc<MemoryMealStore>,
    clock: Arc<dyn Clock>,
) -> MealApi<MemoryStudentDirectory, MemoryMealStore> {
    MealApi {
        registration: MealRegistrationService::new(directory, sources, meals.clone(), clock),
        reports: MealReportAggregator::new(meals),
    }
}

async fn run_server(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let directory = Arc::new(MemoryStudentDirectory::default());
    let sources = Arc::new(MemoryEntitlementSources::default());
    let meals = Arc::new(MemoryMealStore::default());

    if args.demo_data {
        seed_demo_data(&directory, &sources, Local::now().date_naive());
        info!("demo dataset seeded");
    }

    let api = Arc::new(build_api(directory, sources, meals, Arc::new(SystemClock)));

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(AtomicBool::new(false));
    let state = AppState {
        readiness: readiness_flag.clone(),
        metrics: prometheus_handle,
    };

    let app = Router::new()
        .route("/health", get(healthcheck))
        .route("/ready", get(readiness_endpoint))
        .route("/metrics", get(metrics_endpoint))
        .with_state(state)
        .merge(meal_router(api))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "meal entitlement engine ready");

    axum::serve(listener, app).await?;
    Ok(())
}

async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

async fn readiness_endpoint(State(state): State<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

async fn metrics_endpoint(State(state): State<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

/// Fixed time source so the demo output is reproducible.
struct DemoClock(NaiveDateTime);

impl Clock for DemoClock {
    fn now(&self) -> NaiveDateTime {
        self.0
    }
}

fn weekday_only(day: NaiveDate) -> WeekSchedule {
    let mut schedule = WeekSchedule::none();
    match day.weekday() {
        chrono::Weekday::Mon => schedule.monday = true,
        chrono::Weekday::Tue => schedule.tuesday = true,
        chrono::Weekday::Wed => schedule.wednesday = true,
        chrono::Weekday::Thu => schedule.thursday = true,
        chrono::Weekday::Fri => schedule.friday = true,
        chrono::Weekday::Sat => schedule.saturday = true,
        chrono::Weekday::Sun => schedule.sunday = true,
    }
    schedule
}

fn seed_demo_data(
    directory: &MemoryStudentDirectory,
    sources: &MemoryEntitlementSources,
    today: NaiveDate,
) {
    let informatics = Course {
        id: "curso-inf".to_string(),
        name: "Técnico em Informática".to_string(),
        contra_turno: weekday_only(today),
    };
    let agro = Course {
        id: "curso-agro".to_string(),
        name: "Técnico em Agropecuária".to_string(),
        contra_turno: WeekSchedule::none(),
    };

    let turma_inf = SchoolClass {
        id: "turma-inf-2023".to_string(),
        description: "INF 2023".to_string(),
        course: informatics,
    };
    let turma_agro = SchoolClass {
        id: "turma-agro-2023".to_string(),
        description: "AGRO 2023".to_string(),
        course: agro,
    };

    directory.seed(Student {
        matricula: StudentId("20230001".to_string()),
        name: "Ana Souza".to_string(),
        active: true,
        class: turma_inf.clone(),
    });
    directory.seed(Student {
        matricula: StudentId("20230002".to_string()),
        name: "Bruno Lima".to_string(),
        active: true,
        class: turma_agro.clone(),
    });
    directory.seed(Student {
        matricula: StudentId("20230003".to_string()),
        name: "Carla Mendes".to_string(),
        active: false,
        class: turma_inf,
    });
    directory.seed(Student {
        matricula: StudentId("20230004".to_string()),
        name: "Diego Alves".to_string(),
        active: true,
        class: turma_agro.clone(),
    });

    sources.seed_project(Project {
        id: "proj-horta".to_string(),
        description: "Horta comunitária".to_string(),
        period: DateRange {
            start: today - Days::new(30),
            end: today + Days::new(30),
        },
        schedule: weekday_only(today),
        students: vec![StudentId("20230002".to_string())],
    });
    sources.seed_internship(Internship {
        id: "estagio-coop".to_string(),
        description: "Estágio na cooperativa".to_string(),
        period: DateRange {
            start: today - Days::new(10),
            end: today + Days::new(60),
        },
        schedule: weekday_only(today),
        student: StudentId("20230004".to_string()),
    });
    sources.seed_release(ClassMealRelease {
        class_id: turma_agro.id,
        date: today,
        description: "Semana de provas".to_string(),
    });
}

fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let today = args.today.unwrap_or_else(|| Local::now().date_naive());
    let noon = today.and_time(NaiveTime::from_hms_opt(12, 0, 0).unwrap_or(NaiveTime::MIN));

    let directory = Arc::new(MemoryStudentDirectory::default());
    let sources = Arc::new(MemoryEntitlementSources::default());
    let meals = Arc::new(MemoryMealStore::default());
    seed_demo_data(&directory, &sources, today);

    let api = build_api(directory, sources, meals, Arc::new(DemoClock(noon)));

    let desk = RegisteringUser {
        name: "Atendente".to_string(),
        email: "atendente@escola.example".to_string(),
    };

    println!("Meal entitlement demo ({today})");
    for matricula in ["20230001", "20230002", "20230003", "20230004", "20230001"] {
        let id = StudentId(matricula.to_string());
        match api.registration.register(&id, desk.clone()) {
            Ok(record) => println!(
                "- {matricula}: registered ({}) for {}",
                record.category.label(),
                record.student.name
            ),
            Err(err) => println!("- {matricula}: rejected ({err})"),
        }
    }

    let report = api.reports.report(today, today, &HashMap::new())?;

    println!("\nTotals for {today}");
    println!("- total: {}", report.totals.total);
    println!("- contra turno: {}", report.totals.contra_turno);
    println!("- projeto: {}", report.totals.projeto);
    println!("- estagio: {}", report.totals.estagio);
    println!("- turma: {}", report.totals.turma);

    println!("\nRecords");
    for record in &report.records {
        println!(
            "- {} | {} | {} | {}",
            record.student.matricula.as_str(),
            record.student.name,
            record.category.label(),
            record.registered_at
        );
    }

    Ok(())
}
