use axum::routing::{delete, get, post};
use axum::{middleware, Router};
use serde_json::{json, Value};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use campus_api::database::DatabaseManager;
use campus_api::handlers;
use campus_api::middleware::session_middleware;

#[tokio::main]
async fn main() {
    // Load .env if present so cargo run picks up DATABASE_URL etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt::init();

    let config = campus_api::config::config();
    tracing::info!("Starting Campus API in {:?} mode", config.environment);

    if let Err(e) = DatabaseManager::migrate().await {
        eprintln!("failed to run migrations: {}", e);
        std::process::exit(1);
    }

    let app = app();

    let port = std::env::var("CAMPUS_API_PORT")
        .ok()
        .or_else(|| std::env::var("PORT").ok())
        .and_then(|s| s.parse::<u16>().ok())
        .unwrap_or(3000);

    let bind_addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .unwrap_or_else(|e| panic!("failed to bind {}: {}", bind_addr, e));

    println!("Campus API listening on http://{}", bind_addr);

    axum::serve(listener, app).await.expect("server");
}

fn app() -> Router {
    Router::new()
        // Public
        .route("/", get(root))
        .route("/health", get(health))
        .route("/auth/login", post(handlers::auth::login))
        .route(
            "/payments/callback",
            post(handlers::payments::gateway_callback),
        )
        // Session-guarded API
        .merge(api_routes())
        // Global middleware
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

fn api_routes() -> Router {
    use campus_api::handlers::{
        assessments, auth, catalog, community, lessons, parents, payments, records, students,
        teachers,
    };

    Router::new()
        .route("/api/auth/whoami", get(auth::whoami))
        // People
        .route("/api/students", get(students::list).post(students::create))
        .route(
            "/api/students/:id",
            get(students::get)
                .put(students::update)
                .delete(students::delete),
        )
        .route("/api/teachers", get(teachers::list).post(teachers::create))
        .route(
            "/api/teachers/:id",
            get(teachers::get)
                .put(teachers::update)
                .delete(teachers::delete),
        )
        .route("/api/parents", get(parents::list).post(parents::create))
        .route(
            "/api/parents/:id",
            get(parents::get)
                .put(parents::update)
                .delete(parents::delete),
        )
        // Catalog
        .route(
            "/api/grades",
            get(catalog::list_grades).post(catalog::create_grade),
        )
        .route("/api/grades/:id", delete(catalog::delete_grade))
        .route(
            "/api/classes",
            get(catalog::list_classes).post(catalog::create_class),
        )
        .route(
            "/api/classes/:id",
            get(catalog::get_class)
                .put(catalog::update_class)
                .delete(catalog::delete_class),
        )
        .route(
            "/api/subjects",
            get(catalog::list_subjects).post(catalog::create_subject),
        )
        .route(
            "/api/subjects/:id",
            get(catalog::get_subject)
                .put(catalog::update_subject)
                .delete(catalog::delete_subject),
        )
        // Schedule
        .route("/api/lessons", get(lessons::list).post(lessons::create))
        .route(
            "/api/lessons/:id",
            get(lessons::get)
                .put(lessons::update)
                .delete(lessons::delete),
        )
        .route(
            "/api/exams",
            get(assessments::list_exams).post(assessments::create_exam),
        )
        .route(
            "/api/exams/:id",
            get(assessments::get_exam)
                .put(assessments::update_exam)
                .delete(assessments::delete_exam),
        )
        .route(
            "/api/assignments",
            get(assessments::list_assignments).post(assessments::create_assignment),
        )
        .route(
            "/api/assignments/:id",
            get(assessments::get_assignment)
                .put(assessments::update_assignment)
                .delete(assessments::delete_assignment),
        )
        // Records
        .route(
            "/api/results",
            get(records::list_results).post(records::create_result),
        )
        .route(
            "/api/results/:id",
            get(records::get_result)
                .put(records::update_result)
                .delete(records::delete_result),
        )
        .route(
            "/api/attendances",
            get(records::list_attendances).post(records::create_attendance),
        )
        .route(
            "/api/attendances/:id",
            get(records::get_attendance)
                .put(records::update_attendance)
                .delete(records::delete_attendance),
        )
        // Community
        .route(
            "/api/events",
            get(community::list_events).post(community::create_event),
        )
        .route(
            "/api/events/:id",
            get(community::get_event)
                .put(community::update_event)
                .delete(community::delete_event),
        )
        .route(
            "/api/announcements",
            get(community::list_announcements).post(community::create_announcement),
        )
        .route(
            "/api/announcements/:id",
            get(community::get_announcement)
                .put(community::update_announcement)
                .delete(community::delete_announcement),
        )
        .route(
            "/api/messages",
            get(community::list_messages).post(community::create_message),
        )
        .route(
            "/api/messages/:id",
            get(community::get_message).delete(community::delete_message),
        )
        .route(
            "/api/messages/:id/read",
            post(community::mark_message_read),
        )
        // Payments
        .route(
            "/api/payments",
            get(payments::list).post(payments::create),
        )
        .route("/api/payments/:id", get(payments::get))
        .route("/api/payments/:id/cancel", post(payments::cancel))
        .route(
            "/api/payments/sweep-overdue",
            post(payments::sweep_overdue),
        )
        .route_layer(middleware::from_fn(session_middleware))
}

async fn root() -> axum::response::Json<Value> {
    let version = env!("CARGO_PKG_VERSION");

    axum::response::Json(json!({
        "success": true,
        "data": {
            "name": "Campus API",
            "version": version,
            "description": "Role-scoped school management backend",
            "endpoints": {
                "home": "/ (public)",
                "auth": "/auth/login (public - token acquisition)",
                "payments_callback": "/payments/callback (public - signed gateway callbacks)",
                "api": "/api/* (session-guarded)",
            }
        }
    }))
}

async fn health() -> impl axum::response::IntoResponse {
    let now = chrono::Utc::now();

    match DatabaseManager::health_check().await {
        Ok(_) => (
            axum::http::StatusCode::OK,
            axum::response::Json(json!({
                "success": true,
                "data": {
                    "status": "ok",
                    "timestamp": now,
                    "database": "ok"
                }
            })),
        ),
        Err(e) => (
            axum::http::StatusCode::SERVICE_UNAVAILABLE,
            axum::response::Json(json!({
                "success": false,
                "error": "database unavailable",
                "data": {
                    "status": "degraded",
                    "timestamp": now,
                    "database_error": e.to_string()
                }
            })),
        ),
    }
}
