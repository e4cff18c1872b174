use axum::{
    Router,
    extract::{Path as AxumPath, State},
    http::StatusCode,
    response::Json,
    routing::get,
};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tower_http::cors::CorsLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::{OpenApi, ToSchema};
use utoipa_swagger_ui::SwaggerUi;

use registration_core::constants::DEFAULT_DATA_DIR;
use registration_core::{
    AddressFields, FileSources, FormState, FormStateReconciler, Observer, PatientUuidMap,
    RegistrationConfig, SourceError, SourceKind, StateEvent,
};
use registration_types::PatientUuid;

type ApiError = (StatusCode, &'static str);

/// Liveness response for monitoring and load balancers.
#[derive(Serialize, ToSchema)]
struct HealthRes {
    ok: bool,
    message: String,
}

/// Application state shared across REST API handlers
#[derive(Clone)]
struct AppState {
    reconciler: FormStateReconciler,
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health,
        new_registration,
        patient_form_state,
        patient_uuid_map,
        patient_address,
        master_index_form_state,
    ),
    components(schemas(HealthRes))
)]
struct ApiDoc;

/// Main entry point for the registration REST service
///
/// Serves reconciled registration form state read from a registration data directory.
///
/// # Environment Variables
/// - `REGISTRATION_REST_ADDR`: Server address (default: "0.0.0.0:3000")
/// - `REGISTRATION_DATA_DIR`: Registration data directory (default: "registration_data")
/// - `REGISTRATION_CONFIG`: YAML configuration file (optional; defaults apply when absent)
///
/// # Errors
/// Returns an error if:
/// - the logging/tracing configuration cannot be initialised,
/// - the data directory does not exist or the configuration file is invalid, or
/// - the server address cannot be bound or the HTTP server fails while running.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("registration=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let addr = std::env::var("REGISTRATION_REST_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".into());

    let data_dir = std::env::var("REGISTRATION_DATA_DIR").unwrap_or_else(|_| DEFAULT_DATA_DIR.into());
    let data_path = Path::new(&data_dir);
    if !data_path.exists() {
        anyhow::bail!(
            "Registration data directory does not exist: {}",
            data_path.display()
        );
    }

    let config_path = std::env::var("REGISTRATION_CONFIG").ok().map(PathBuf::from);
    let config = Arc::new(RegistrationConfig::load_or_default(config_path.as_deref())?);

    let sources = Arc::new(FileSources::new(data_path));
    let state = AppState {
        reconciler: FormStateReconciler::from_sources(config, sources),
    };

    tracing::info!("-- Starting registration REST API on {}", addr);

    let app = Router::new()
        .route("/health", get(health))
        .route("/registrations/new", get(new_registration))
        .route("/patients/:uuid/form-state", get(patient_form_state))
        .route("/patients/:uuid/uuid-map", get(patient_uuid_map))
        .route("/patients/:uuid/address", get(patient_address))
        .route(
            "/master-index/:source_id/form-state",
            get(master_index_form_state),
        )
        .merge(
            SwaggerUi::new("/swagger-ui/{_:.*}").url("/api-docs/openapi.json", ApiDoc::openapi()),
        )
        .layer(CorsLayer::permissive())
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn parse_patient_uuid(raw: &str) -> Result<PatientUuid, ApiError> {
    PatientUuid::parse(raw).map_err(|e| {
        tracing::debug!("rejecting patient uuid {raw}: {e}");
        (StatusCode::BAD_REQUEST, "Invalid patient uuid")
    })
}

fn settle_error(e: registration_core::RegistrationError) -> ApiError {
    tracing::error!("Reconciliation error: {:?}", e);
    (StatusCode::INTERNAL_SERVER_ERROR, "Internal error")
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Health check response", body = HealthRes)
    )
)]
/// Health check endpoint for the REST API
async fn health(State(_state): State<AppState>) -> Json<HealthRes> {
    Json(HealthRes {
        ok: true,
        message: "Registration REST API is alive".into(),
    })
}

#[utoipa::path(
    get,
    path = "/registrations/new",
    responses(
        (status = 200, description = "Blank form state with a freshly generated patient uuid")
    )
)]
/// Start a new registration
async fn new_registration(State(state): State<AppState>) -> Result<Json<FormState>, ApiError> {
    let mut handle = state.reconciler.local_edit(None);
    let form = handle.settled().await.map_err(settle_error)?;
    Ok(Json(form))
}

#[utoipa::path(
    get,
    path = "/patients/{uuid}/form-state",
    params(("uuid" = String, Path, description = "Patient uuid")),
    responses(
        (status = 200, description = "Reconciled form state"),
        (status = 400, description = "Invalid patient uuid"),
        (status = 500, description = "Internal server error")
    )
)]
/// Reconciled form state for editing a patient
///
/// Sources that fail are logged and left out; the form state is still returned. A patient
/// known only to the offline queue yields the queued draft.
async fn patient_form_state(
    State(state): State<AppState>,
    AxumPath(uuid): AxumPath<String>,
) -> Result<Json<FormState>, ApiError> {
    let patient_uuid = parse_patient_uuid(&uuid)?;
    let mut handle = state.reconciler.local_edit(Some(patient_uuid));
    let form = handle.settled().await.map_err(settle_error)?;
    Ok(Json(form))
}

#[utoipa::path(
    get,
    path = "/patients/{uuid}/uuid-map",
    params(("uuid" = String, Path, description = "Patient uuid")),
    responses(
        (status = 200, description = "Uuids of stored name, address and attribute records"),
        (status = 400, description = "Invalid patient uuid"),
        (status = 500, description = "Internal server error")
    )
)]
/// Uuid map for updating a patient's stored records
async fn patient_uuid_map(
    State(state): State<AppState>,
    AxumPath(uuid): AxumPath<String>,
) -> Result<Json<PatientUuidMap>, ApiError> {
    let patient_uuid = parse_patient_uuid(&uuid)?;
    let mut handle = state
        .reconciler
        .patient_uuid_map(Some(patient_uuid), PatientUuidMap::default());
    let map = handle.settled().await.map_err(settle_error)?;
    Ok(Json(map))
}

#[utoipa::path(
    get,
    path = "/patients/{uuid}/address",
    params(("uuid" = String, Path, description = "Patient uuid")),
    responses(
        (status = 200, description = "Initial address field values"),
        (status = 400, description = "Invalid patient uuid"),
        (status = 500, description = "Internal server error")
    )
)]
/// Initial address hierarchy values for a patient
async fn patient_address(
    State(state): State<AppState>,
    AxumPath(uuid): AxumPath<String>,
) -> Result<Json<AddressFields>, ApiError> {
    let patient_uuid = parse_patient_uuid(&uuid)?;
    let mut handle = state
        .reconciler
        .initial_address_field_values(Some(patient_uuid), AddressFields::new());
    let fields = handle.settled().await.map_err(settle_error)?;
    Ok(Json(fields))
}

#[utoipa::path(
    get,
    path = "/master-index/{source_id}/form-state",
    params(("source_id" = String, Path, description = "Master patient index source identifier")),
    responses(
        (status = 200, description = "Form state pre-filled from the master index record"),
        (status = 404, description = "No such master index record"),
        (status = 500, description = "Internal server error")
    )
)]
/// Form state pre-filled from a master patient index record
async fn master_index_form_state(
    State(state): State<AppState>,
    AxumPath(source_id): AxumPath<String>,
) -> Result<Json<FormState>, ApiError> {
    let not_found = Arc::new(AtomicBool::new(false));
    let flag = not_found.clone();
    let observer: Observer<FormState> = Arc::new(move |event| {
        if let StateEvent::SourceFailed {
            source: SourceKind::MasterIndex,
            error: SourceError::NotFound { .. },
        } = event
        {
            flag.store(true, Ordering::SeqCst);
        }
    });

    let mut handle = state
        .reconciler
        .clone()
        .with_observer(observer)
        .master_index_import(&source_id);
    let form = handle.settled().await.map_err(settle_error)?;

    if not_found.load(Ordering::SeqCst) {
        return Err((StatusCode::NOT_FOUND, "Master index record not found"));
    }
    Ok(Json(form))
}
