// 🌐 HTTP surface - JSON read pages + form-POST commands (axum)

use crate::commands::{self, CommandError, StaleViews, View};
use crate::queries;
use crate::store::{SqliteStore, StoreError};
use crate::validation::FormInput;
use axum::{
    extract::State,
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Json, Redirect, Response},
    routing::get,
    Form, Router,
};
use chrono::{Local, NaiveDateTime};
use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Header carrying the generation of the view a response belongs to
pub const VIEW_GENERATION_HEADER: &str = "x-view-generation";

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<Mutex<SqliteStore>>,
    pub views: Arc<StaleViews>,
    pub recent_window: usize,
    /// Clock used for "today" and "next"; local wall time in production
    pub clock: fn() -> NaiveDateTime,
}

fn local_now() -> NaiveDateTime {
    Local::now().naive_local()
}

impl AppState {
    pub fn new(store: SqliteStore, recent_window: usize) -> Self {
        AppState {
            store: Arc::new(Mutex::new(store)),
            views: Arc::new(StaleViews::new()),
            recent_window,
            clock: local_now,
        }
    }

    fn store(&self) -> Result<MutexGuard<'_, SqliteStore>, StoreError> {
        self.store
            .lock()
            .map_err(|_| StoreError::Unavailable("store lock poisoned".to_string()))
    }
}

/// API Response wrapper
#[derive(Serialize)]
struct ApiResponse<T> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }
}

fn with_generation(mut response: Response, state: &AppState, view: Option<View>) -> Response {
    if let Some(view) = view {
        let generation = state.views.generation(view);
        if let Ok(value) = HeaderValue::from_str(&generation.to_string()) {
            response.headers_mut().insert(VIEW_GENERATION_HEADER, value);
        }
    }
    response
}

/// Read paths fail closed: log the cause, answer 500
fn read_page<T, E>(
    state: &AppState,
    view: Option<View>,
    name: &'static str,
    load: impl FnOnce(&SqliteStore) -> Result<T, E>,
) -> Response
where
    T: Serialize,
    E: std::fmt::Display + From<StoreError>,
{
    let result = state
        .store()
        .map_err(E::from)
        .and_then(|store| load(&*store));

    let response = match result {
        Ok(data) => (StatusCode::OK, Json(ApiResponse::ok(data))).into_response(),
        Err(e) => {
            tracing::error!(page = name, error = %e, "failed to load page");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::<()> {
                    success: false,
                    data: None,
                    error: Some(format!("failed to load {}", name)),
                }),
            )
                .into_response()
        }
    };

    with_generation(response, state, view)
}

fn command_response(state: &AppState, result: Result<commands::Redirect, CommandError>) -> Response {
    match result {
        Ok(redirect) => with_generation(
            Redirect::to(redirect.location()).into_response(),
            state,
            Some(redirect.view),
        ),
        Err(err) => {
            let status = match &err {
                CommandError::Validation(_) | CommandError::UnknownPatient => {
                    StatusCode::UNPROCESSABLE_ENTITY
                }
                CommandError::Conflict => StatusCode::CONFLICT,
                CommandError::Persistence(_) => StatusCode::INTERNAL_SERVER_ERROR,
            };
            (status, Json(err.body())).into_response()
        }
    }
}

/// Run a command against the locked store
fn run_command(
    state: &AppState,
    entity: &'static str,
    command: impl FnOnce(&SqliteStore, &StaleViews) -> Result<commands::Redirect, CommandError>,
) -> Response {
    let result = match state.store() {
        Ok(store) => command(&*store, state.views.as_ref()),
        Err(e) => {
            tracing::error!(entity, error = %e, "store unavailable");
            Err(CommandError::Persistence(entity))
        }
    };
    command_response(state, result)
}

// ============================================================================
// Read Handlers
// ============================================================================

/// GET /api/health - Health check
async fn health_check() -> impl IntoResponse {
    Json(ApiResponse::ok("OK"))
}

/// GET /api/dashboard
async fn get_dashboard(State(state): State<AppState>) -> Response {
    let now = (state.clock)();
    read_page(&state, None, "dashboard", |store| queries::dashboard(store, now))
}

/// GET /api/patients
async fn get_patients(State(state): State<AppState>) -> Response {
    read_page(&state, Some(View::Patients), "patients", |store| {
        queries::patients_alphabetical(store)
    })
}

/// GET /api/agenda - today's appointments
async fn get_agenda(State(state): State<AppState>) -> Response {
    let now = (state.clock)();
    read_page(&state, Some(View::Agenda), "agenda", |store| {
        queries::todays_appointments(store, now)
    })
}

/// GET /api/procedures
async fn get_procedures(State(state): State<AppState>) -> Response {
    read_page(&state, Some(View::Procedures), "procedures", |store| {
        queries::procedures_alphabetical(store)
    })
}

/// GET /api/financial - recent ledger, KPIs, chart
async fn get_financial(State(state): State<AppState>) -> Response {
    let limit = state.recent_window;
    read_page(&state, Some(View::Financial), "financial", |store| {
        queries::financial_overview(store, limit)
    })
}

// ============================================================================
// Form Handlers
// ============================================================================

/// POST /patients
async fn post_patient(State(state): State<AppState>, Form(form): Form<FormInput>) -> Response {
    run_command(&state, "patient", |store, views| {
        commands::create_patient(store, views, &form)
    })
}

/// POST /agenda
async fn post_appointment(State(state): State<AppState>, Form(form): Form<FormInput>) -> Response {
    run_command(&state, "appointment", |store, views| {
        commands::create_appointment(store, views, &form)
    })
}

/// POST /procedures
async fn post_procedure(State(state): State<AppState>, Form(form): Form<FormInput>) -> Response {
    run_command(&state, "procedure", |store, views| {
        commands::create_procedure(store, views, &form)
    })
}

/// POST /financial
async fn post_transaction(State(state): State<AppState>, Form(form): Form<FormInput>) -> Response {
    run_command(&state, "transaction", |store, views| {
        commands::create_transaction(store, views, &form)
    })
}

pub fn router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/health", get(health_check))
        .route("/dashboard", get(get_dashboard))
        .route("/patients", get(get_patients))
        .route("/agenda", get(get_agenda))
        .route("/procedures", get(get_procedures))
        .route("/financial", get(get_financial));

    Router::new()
        .nest("/api", api_routes)
        .route("/patients", axum::routing::post(post_patient))
        .route("/agenda", axum::routing::post(post_appointment))
        .route("/procedures", axum::routing::post(post_procedure))
        .route("/financial", axum::routing::post(post_transaction))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{header, Request};
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    fn fixed_now() -> NaiveDateTime {
        chrono::NaiveDate::from_ymd_opt(2024, 2, 5)
            .unwrap()
            .and_hms_opt(8, 0, 0)
            .unwrap()
    }

    fn test_state() -> AppState {
        let mut state = AppState::new(SqliteStore::open_in_memory().unwrap(), 50);
        state.clock = fixed_now;
        state
    }

    fn post_form(uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get_req(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    async fn json_body(response: Response) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    const MARIA: &str = "name=Maria+Silva&email=maria%40example.com&phone=11999998888&cpf=12345678901";

    #[tokio::test]
    async fn test_health_is_ok() {
        let app = router(test_state());
        let response = app.oneshot(get_req("/api/health")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_create_patient_redirects_then_conflicts() {
        let state = test_state();

        let response = router(state.clone())
            .oneshot(post_form("/patients", MARIA))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers().get(header::LOCATION).unwrap(), "/patients");
        assert_eq!(response.headers().get(VIEW_GENERATION_HEADER).unwrap(), "1");

        let response = router(state.clone())
            .oneshot(post_form("/patients", MARIA))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CONFLICT);
        assert_eq!(
            json_body(response).await,
            serde_json::json!({ "error": "patient already exists" })
        );

        let response = router(state).oneshot(get_req("/api/patients")).await.unwrap();
        let body = json_body(response).await;
        assert_eq!(body["data"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_invalid_patient_returns_field_errors() {
        let app = router(test_state());
        let response = app
            .oneshot(post_form("/patients", "name=Maria+Silva&cpf=12345678"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let body = json_body(response).await;
        assert!(body["errors"]["cpf"].is_array());
    }

    #[tokio::test]
    async fn test_agenda_lists_todays_booking() {
        let state = test_state();

        router(state.clone())
            .oneshot(post_form("/patients", MARIA))
            .await
            .unwrap();
        let patient_id = {
            let store = state.store.lock().unwrap();
            queries::patients_alphabetical(&*store).unwrap()[0].id.clone()
        };

        let booking = format!(
            "patientId={}&date=2024-02-05&time=14%3A30&type=Consulta",
            patient_id
        );
        let response = router(state.clone())
            .oneshot(post_form("/agenda", &booking))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);

        let response = router(state.clone()).oneshot(get_req("/api/agenda")).await.unwrap();
        let body = json_body(response).await;
        let entry = &body["data"][0];
        assert_eq!(entry["patient_name"], "Maria Silva");
        assert_eq!(entry["status"], "pending");

        let response = router(state).oneshot(get_req("/api/dashboard")).await.unwrap();
        let body = json_body(response).await;
        assert_eq!(body["data"]["appointments_today"], 1);
        assert_eq!(body["data"]["next_appointment"]["patient_name"], "Maria Silva");
    }

    #[tokio::test]
    async fn test_oversized_amount_is_rejected_and_store_stays_usable() {
        let state = test_state();
        let huge = "description=Erro&type=INCOME&date=2024-02-05&amount=79228162514264337593543950335";

        for _ in 0..2 {
            let response = router(state.clone())
                .oneshot(post_form("/financial", huge))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

            let body = json_body(response).await;
            assert!(body["errors"]["amount"].is_array());
        }

        let financial = router(state.clone())
            .oneshot(get_req("/api/financial"))
            .await
            .unwrap();
        assert_eq!(financial.status(), StatusCode::OK);

        let created = router(state.clone())
            .oneshot(post_form("/patients", "name=Maria+Silva"))
            .await
            .unwrap();
        assert_eq!(created.status(), StatusCode::SEE_OTHER);

        let patients = router(state).oneshot(get_req("/api/patients")).await.unwrap();
        assert_eq!(patients.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_overflowing_ledger_fails_the_read_only() {
        use crate::entities::{FinancialRecord, NewFinancialRecord, RecordType};
        use crate::store::ClinicStore;

        let state = test_state();
        {
            // Lines written before amounts were capped
            let store = state.store.lock().unwrap();
            for _ in 0..2 {
                store
                    .insert_financial_record(&FinancialRecord::book(NewFinancialRecord {
                        description: "Legado".to_string(),
                        amount: rust_decimal::Decimal::MAX,
                        kind: RecordType::Income,
                        due_date: fixed_now().date(),
                    }))
                    .unwrap();
            }
        }

        for page in ["/api/financial", "/api/dashboard"] {
            let response = router(state.clone()).oneshot(get_req(page)).await.unwrap();
            assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR, "{}", page);
        }

        let response = router(state).oneshot(get_req("/api/patients")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_financial_page_aggregates() {
        let state = test_state();

        for body in [
            "description=Consulta&type=INCOME&amount=150%2C00&date=2024-02-05",
            "description=Aluguel&type=EXPENSE&amount=500%2C00&date=2024-02-06",
        ] {
            let response = router(state.clone())
                .oneshot(post_form("/financial", body))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::SEE_OTHER);
        }

        let response = router(state).oneshot(get_req("/api/financial")).await.unwrap();
        assert_eq!(response.headers().get(VIEW_GENERATION_HEADER).unwrap(), "2");

        let body = json_body(response).await;
        assert_eq!(body["data"]["summary"]["net_balance"], "-350.00");
        assert_eq!(body["data"]["chart"][0]["date"], "05/02");
        assert_eq!(body["data"]["chart"][1]["expense"], 500.0);
    }
}
