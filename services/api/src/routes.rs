use crate::infra::{AppState, HubState};
use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::Local;
use fiscal_hub::classifier::{classify_filename, ClassificationResult, ReviewStatus};
use fiscal_hub::documents::TextExtractor;
use fiscal_hub::error::AppError;
use fiscal_hub::obligations::{
    AuditEvent, AuditTrail, ClassificationRecord, ClassificationStore, CompanyDirectory,
    Competence, DocumentRef, Jurisdiction, ObligationClass, ObligationFilter, ObligationRecord,
    ObligationStore, StoreError, TaskStatus,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::warn;

pub(crate) fn with_hub_routes(state: HubState) -> Router {
    Router::new()
        .route(
            "/api/v1/maintenance/sync-monthly",
            post(sync_monthly_endpoint),
        )
        .route("/api/v1/tasks", get(list_tasks_endpoint))
        .route(
            "/api/v1/tasks/:task_id/documents",
            post(upload_document_endpoint),
        )
        .with_state(state)
        .route("/health", get(healthcheck))
        .route("/ready", get(readiness_endpoint))
        .route("/metrics", get(metrics_endpoint))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
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

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct SyncMonthlyParams {
    pub(crate) year: Option<i32>,
    pub(crate) month: Option<u32>,
}

#[derive(Debug, Serialize)]
pub(crate) struct SyncMonthlyResponse {
    pub(crate) ok: bool,
    pub(crate) competence: Competence,
    pub(crate) report: fiscal_hub::obligations::SyncReport,
}

/// Administrative trigger: forces a reconciliation for an arbitrary
/// year/month pair, defaulting to the current one.
pub(crate) async fn sync_monthly_endpoint(
    State(state): State<HubState>,
    Query(params): Query<SyncMonthlyParams>,
) -> Result<Json<SyncMonthlyResponse>, Response> {
    let competence = resolve_competence(params.year, params.month).map_err(bad_request)?;

    let report = state
        .engine
        .sync_month(competence)
        .map_err(|err| AppError::from(err).into_response())?;
    state.gate.mark(competence);

    Ok(Json(SyncMonthlyResponse {
        ok: true,
        competence,
        report,
    }))
}

fn resolve_competence(year: Option<i32>, month: Option<u32>) -> Result<Competence, String> {
    match (year, month) {
        (None, None) => Ok(Competence::from_date(Local::now().date_naive())),
        (Some(year), Some(month)) => {
            Competence::new(year, month).map_err(|err| err.to_string())
        }
        _ => Err("provide year and month together, or neither".to_string()),
    }
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct TaskListParams {
    pub(crate) competence: Option<String>,
    pub(crate) status: Option<String>,
    pub(crate) jurisdiction: Option<String>,
    pub(crate) company_id: Option<u64>,
}

/// Lists obligation records, lazily re-running the monthly sync when the
/// real-world competence has moved past the last synced one.
pub(crate) async fn list_tasks_endpoint(
    State(state): State<HubState>,
    Query(params): Query<TaskListParams>,
) -> Result<Json<Vec<ObligationRecord>>, Response> {
    let today = Competence::from_date(Local::now().date_naive());
    state
        .gate
        .ensure_current(today, || state.engine.sync_month(today))
        .map_err(|err| AppError::from(err).into_response())?;

    let mut filter = ObligationFilter {
        company_id: params.company_id,
        ..ObligationFilter::default()
    };
    if let Some(raw) = params.competence {
        filter.competence = Some(raw.parse().map_err(|err: fiscal_hub::obligations::InvalidCompetence| {
            bad_request(err.to_string())
        })?);
    }
    if let Some(raw) = params.status {
        filter.status = Some(
            raw.parse::<TaskStatus>()
                .map_err(|err| bad_request(err.to_string()))?,
        );
    }
    if let Some(raw) = params.jurisdiction {
        filter.jurisdiction = Some(
            raw.parse::<Jurisdiction>()
                .map_err(|err| bad_request(err.to_string()))?,
        );
    }

    let records = state.store.list(&filter).map_err(store_failure)?;
    Ok(Json(records))
}

#[derive(Debug, Deserialize)]
pub(crate) struct DocumentUploadRequest {
    pub(crate) filename: String,
    pub(crate) content_base64: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct DocumentUploadResponse {
    pub(crate) ok: bool,
    pub(crate) status: ReviewStatus,
    pub(crate) classification: ClassificationResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) artifact_path: Option<String>,
    pub(crate) suggestions: Vec<SuggestionView>,
}

/// Trimmed record view returned as a manual-resolution candidate.
#[derive(Debug, Serialize)]
pub(crate) struct SuggestionView {
    pub(crate) id: u64,
    pub(crate) title: String,
    pub(crate) tax_code: String,
    pub(crate) competence: Competence,
    pub(crate) class: ObligationClass,
    pub(crate) jurisdiction: Jurisdiction,
    pub(crate) status: TaskStatus,
}

impl From<ObligationRecord> for SuggestionView {
    fn from(record: ObligationRecord) -> Self {
        Self {
            id: record.id,
            title: record.title,
            tax_code: record.tax_code,
            competence: record.competence,
            class: record.class,
            jurisdiction: record.jurisdiction,
            status: record.status,
        }
    }
}

/// Accepts an uploaded document for a task: classifies the filename,
/// mirrors the outcome, and cross-checks the extracted content against the
/// task. Consistency findings notify the owner; they never reject the
/// upload.
pub(crate) async fn upload_document_endpoint(
    State(state): State<HubState>,
    Path(task_id): Path<u64>,
    Json(payload): Json<DocumentUploadRequest>,
) -> Result<Json<DocumentUploadResponse>, Response> {
    let bytes = BASE64
        .decode(payload.content_base64.as_bytes())
        .map_err(|_| bad_request("content_base64 is not valid base64".to_string()))?;
    if bytes.len() > state.max_upload_bytes {
        let message = format!(
            "document exceeds the {} byte upload limit",
            state.max_upload_bytes
        );
        return Err((
            StatusCode::PAYLOAD_TOO_LARGE,
            Json(json!({ "error": message })),
        )
            .into_response());
    }

    let task = state
        .store
        .get(task_id)
        .map_err(store_failure)?
        .ok_or_else(|| {
            (
                StatusCode::NOT_FOUND,
                Json(json!({ "error": "task not found" })),
            )
                .into_response()
        })?;

    state
        .store
        .attach_document(
            task_id,
            DocumentRef {
                filename: payload.filename.clone(),
            },
        )
        .map_err(store_failure)?;
    state.audit.record(AuditEvent {
        task_id,
        actor_id: None,
        action: "upload_document".to_string(),
        details: payload.filename.clone(),
    });

    let classification = classify_filename(&payload.filename);
    let status = classification.review_status();

    let record = ClassificationRecord {
        task_id,
        actor_id: None,
        status,
        result: classification.clone(),
    };
    let artifact_path = match state.archive.store(&record) {
        Ok(path) => Some(path.display().to_string()),
        Err(err) => {
            // The mirror is an audit convenience; losing it never fails the
            // upload.
            warn!(error = %err, "classification artifact not written");
            None
        }
    };
    state
        .classifications
        .insert(record)
        .map_err(store_failure)?;

    let suggestions = if status == ReviewStatus::NeedsReview {
        state
            .store
            .find_similar(task.company_id, &classification.raw_text, 5)
            .unwrap_or_default()
    } else {
        Vec::new()
    };

    if let Ok(Some(company)) = state.directory.get(task.company_id) {
        let extractor = state.extractor.clone();
        let text =
            match tokio::task::spawn_blocking(move || extractor.extract_text(&bytes)).await {
                Ok(text) => text,
                Err(_) => String::new(),
            };
        state.checker.check(&text, &task, &company, None);
    }

    Ok(Json(DocumentUploadResponse {
        ok: true,
        status,
        classification,
        artifact_path,
        suggestions: suggestions.into_iter().map(SuggestionView::from).collect(),
    }))
}

fn bad_request(message: String) -> Response {
    (StatusCode::BAD_REQUEST, Json(json!({ "error": message }))).into_response()
}

fn store_failure(err: StoreError) -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": err.to_string() })),
    )
        .into_response()
}
