//! # API REST
//!
//! REST API implementation for the DRC analyser.
//!
//! Handles:
//! - HTTP endpoints with axum
//! - OpenAPI/Swagger documentation
//! - REST-specific concerns (JSON serialization, CORS)
//!
//! Uses `api-shared` for request and response bodies. The analysis and extraction collaborators
//! and the history store are injected through [`AppState`], so the router never reads the
//! environment.

#![warn(rust_2018_idioms)]

use axum::{
    extract::{Path as AxumPath, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use std::sync::Arc;
use tokio::sync::Mutex;
use tower_http::cors::CorsLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use api_shared::{
    AnalyzeRes, CompareQuery, CompareRes, DeleteRes, EstimateEgfrReq, EstimateEgfrRes,
    ExtractReq, ExtractRes, HealthRes, HealthService, HistoryListRes, InvalidRecordRes,
    ValidateFieldReq, ValidateFieldRes, ValidateRecordRes,
};
use drc_core::{
    egfr, export, validation, AnalysisProvider, CoreError, CreatinineInput, FieldErrors,
    LabExtractor, LabField, PatientLabRecord, UploadedDocument, ANALYSIS_FAILED_MESSAGE,
};
use drc_history::{History, HistoryEntry, HistoryError};

/// Application state for the REST API server
///
/// The history list is loaded once at startup and guarded by an async mutex so that every
/// change is saved whole before the next request sees it.
#[derive(Clone)]
pub struct AppState {
    pub history: Arc<Mutex<History>>,
    pub analysis: Arc<dyn AnalysisProvider>,
    pub extractor: Arc<dyn LabExtractor>,
}

impl AppState {
    pub fn new(
        history: History,
        analysis: Arc<dyn AnalysisProvider>,
        extractor: Arc<dyn LabExtractor>,
    ) -> Self {
        Self {
            history: Arc::new(Mutex::new(history)),
            analysis,
            extractor,
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health,
        default_record,
        estimate_egfr,
        validate_field,
        validate_record,
        analyze,
        extract,
        list_history,
        get_history_entry,
        delete_history_entry,
        clear_history,
        compare_history,
        export_history_entry,
    ),
    components(schemas(
        HealthRes,
        EstimateEgfrReq,
        EstimateEgfrRes,
        ValidateFieldReq,
        ValidateFieldRes,
        ValidateRecordRes,
        AnalyzeRes,
        InvalidRecordRes,
        ExtractReq,
        ExtractRes,
        HistoryListRes,
        DeleteRes,
        CompareRes,
    ))
)]
pub struct ApiDoc;

/// Builds the router with Swagger UI and permissive CORS.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/records/default", get(default_record))
        .route("/egfr", post(estimate_egfr))
        .route("/validate/field", post(validate_field))
        .route("/validate/record", post(validate_record))
        .route("/analyses", post(analyze))
        .route("/extractions", post(extract))
        .route("/history", get(list_history).delete(clear_history))
        .route("/history/compare", get(compare_history))
        .route(
            "/history/:id",
            get(get_history_entry).delete(delete_history_entry),
        )
        .route("/history/:id/export", get(export_history_entry))
        .merge(
            SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()),
        )
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Health check response", body = HealthRes)
    )
)]
/// Health check endpoint for the REST API
#[axum::debug_handler]
async fn health(State(_state): State<AppState>) -> Json<HealthRes> {
    Json(HealthService::check_health())
}

#[utoipa::path(
    get,
    path = "/records/default",
    responses(
        (status = 200, description = "Seeded dialysis-patient record")
    )
)]
/// The record a new form starts from.
#[axum::debug_handler]
async fn default_record() -> Json<PatientLabRecord> {
    Json(PatientLabRecord::default())
}

#[utoipa::path(
    post,
    path = "/egfr",
    request_body = EstimateEgfrReq,
    responses(
        (status = 200, description = "eGFR estimate and stage", body = EstimateEgfrRes),
        (status = 422, description = "Creatinine and age must be positive")
    )
)]
/// Estimate eGFR (CKD-EPI 2021) and the stage to write back
///
/// # Errors
/// Returns `422 Unprocessable Entity` if creatinine or age is not positive.
#[axum::debug_handler]
async fn estimate_egfr(
    Json(req): Json<EstimateEgfrReq>,
) -> Result<Json<EstimateEgfrRes>, (StatusCode, &'static str)> {
    let input = CreatinineInput {
        creatinine: req.creatinine,
        age: req.age,
        sex: req.sex,
    };
    let Some(estimate) = egfr::estimate_egfr(&input) else {
        return Err((
            StatusCode::UNPROCESSABLE_ENTITY,
            "Creatinine and age must be positive",
        ));
    };

    let defaults = PatientLabRecord::default();
    let ckd_stage = egfr::final_stage(
        req.ckd_stage.unwrap_or(defaults.ckd_stage),
        req.dialysis_type.unwrap_or(defaults.dialysis_type),
        estimate.suggested_stage,
    );

    Ok(Json(EstimateEgfrRes {
        egfr: estimate.egfr,
        suggested_stage: estimate.suggested_stage,
        ckd_stage,
    }))
}

#[utoipa::path(
    post,
    path = "/validate/field",
    request_body = ValidateFieldReq,
    responses(
        (status = 200, description = "Validation message for one field", body = ValidateFieldRes),
        (status = 400, description = "Unknown field")
    )
)]
/// Validate a single form value
#[axum::debug_handler]
async fn validate_field(
    Json(req): Json<ValidateFieldReq>,
) -> Result<Json<ValidateFieldRes>, (StatusCode, &'static str)> {
    if LabField::from_name(&req.field).is_none() {
        return Err((StatusCode::BAD_REQUEST, "Unknown field"));
    }

    let message = validation::validate_field(&req.field, req.value.as_number())
        .map(|e| e.to_string())
        .unwrap_or_default();

    Ok(Json(ValidateFieldRes {
        field: req.field,
        valid: message.is_empty(),
        message,
    }))
}

#[utoipa::path(
    post,
    path = "/validate/record",
    responses(
        (status = 200, description = "Every violation in the record", body = ValidateRecordRes)
    )
)]
/// Validate every declared-range field of a record
#[axum::debug_handler]
async fn validate_record(Json(record): Json<PatientLabRecord>) -> Json<ValidateRecordRes> {
    let errors = validation::validate_record(&record);
    Json(ValidateRecordRes {
        valid: errors.is_clear(),
        errors,
    })
}

#[utoipa::path(
    post,
    path = "/analyses",
    responses(
        (status = 200, description = "Analysis result, recorded in history", body = AnalyzeRes),
        (status = 422, description = "Record failed validation", body = InvalidRecordRes),
        (status = 502, description = "Failed to get a valid analysis from the AI model."),
        (status = 500, description = "Internal server error")
    )
)]
/// Analyse a record and append the result to history
///
/// The record is validated first and never sent to the analysis model when any field is out of
/// range.
///
/// # Errors
/// Returns:
/// - `422 Unprocessable Entity` with every violation if the record is invalid,
/// - `502 Bad Gateway` with the generic analysis-failure message if the model call fails,
/// - `500 Internal Server Error` if the history cannot be saved.
#[axum::debug_handler]
async fn analyze(
    State(state): State<AppState>,
    Json(record): Json<PatientLabRecord>,
) -> Result<Json<AnalyzeRes>, Response> {
    let result =
        match drc_core::analyze_record(state.analysis.as_ref(), &record, &FieldErrors::new())
            .await
        {
            Ok(result) => result,
            Err(CoreError::InvalidRecord(errors)) => {
                return Err((
                    StatusCode::UNPROCESSABLE_ENTITY,
                    Json(InvalidRecordRes {
                        message: "Record failed validation".into(),
                        errors,
                    }),
                )
                    .into_response());
            }
            Err(e) => {
                tracing::error!("Analysis error: {:?}", e);
                return Err((StatusCode::BAD_GATEWAY, ANALYSIS_FAILED_MESSAGE).into_response());
            }
        };

    let mut history = state.history.lock().await;
    match history.record(record, result, chrono::Utc::now()) {
        Ok(entry) => Ok(Json(AnalyzeRes {
            id: entry.id,
            timestamp: entry.timestamp,
            result: entry.result,
        })),
        Err(e) => {
            tracing::error!("Record history error: {:?}", e);
            Err((StatusCode::INTERNAL_SERVER_ERROR, "Internal error").into_response())
        }
    }
}

#[utoipa::path(
    post,
    path = "/extractions",
    request_body = ExtractReq,
    responses(
        (status = 200, description = "Extracted values merged into the default record", body = ExtractRes),
        (status = 400, description = "Document is not valid base64"),
        (status = 502, description = "Extraction failed")
    )
)]
/// Read lab values out of an uploaded report
///
/// Extracted values are merged into the default record and validated; the returned error map
/// flags any that are out of range.
#[axum::debug_handler]
async fn extract(
    State(state): State<AppState>,
    Json(req): Json<ExtractReq>,
) -> Result<Json<ExtractRes>, (StatusCode, &'static str)> {
    let data = match STANDARD.decode(req.data.trim()) {
        Ok(data) => data,
        Err(e) => {
            tracing::error!("Invalid document encoding: {:?}", e);
            return Err((StatusCode::BAD_REQUEST, "Document is not valid base64"));
        }
    };

    let document = UploadedDocument {
        mime_type: req.mime_type,
        data,
    };

    match state.extractor.extract(&document).await {
        Ok(partial) => {
            let (record, errors) =
                drc_core::merge_extracted(PatientLabRecord::default(), &partial);
            Ok(Json(ExtractRes { record, errors }))
        }
        Err(e) => {
            tracing::error!("Extraction error: {:?}", e);
            Err((
                StatusCode::BAD_GATEWAY,
                "Failed to extract lab values from the document.",
            ))
        }
    }
}

#[utoipa::path(
    get,
    path = "/history",
    responses(
        (status = 200, description = "History entries, newest first", body = HistoryListRes)
    )
)]
#[axum::debug_handler]
async fn list_history(State(state): State<AppState>) -> Json<HistoryListRes> {
    let history = state.history.lock().await;
    Json(HistoryListRes {
        entries: history.entries().to_vec(),
    })
}

#[utoipa::path(
    get,
    path = "/history/{id}",
    params(("id" = String, Path, description = "History entry id")),
    responses(
        (status = 200, description = "History entry"),
        (status = 404, description = "History entry not found")
    )
)]
#[axum::debug_handler]
async fn get_history_entry(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<String>,
) -> Result<Json<HistoryEntry>, (StatusCode, &'static str)> {
    let history = state.history.lock().await;
    history
        .get(&id)
        .cloned()
        .map(Json)
        .ok_or((StatusCode::NOT_FOUND, "History entry not found"))
}

#[utoipa::path(
    delete,
    path = "/history/{id}",
    params(("id" = String, Path, description = "History entry id")),
    responses(
        (status = 200, description = "Entry deleted", body = DeleteRes),
        (status = 404, description = "History entry not found"),
        (status = 500, description = "Internal server error")
    )
)]
#[axum::debug_handler]
async fn delete_history_entry(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<String>,
) -> Result<Json<DeleteRes>, (StatusCode, &'static str)> {
    let mut history = state.history.lock().await;
    match history.delete(&id) {
        Ok(true) => Ok(Json(DeleteRes { deleted: true })),
        Ok(false) => Err((StatusCode::NOT_FOUND, "History entry not found")),
        Err(e) => {
            tracing::error!("Delete history error: {:?}", e);
            Err((StatusCode::INTERNAL_SERVER_ERROR, "Internal error"))
        }
    }
}

#[utoipa::path(
    delete,
    path = "/history",
    responses(
        (status = 200, description = "History cleared", body = DeleteRes),
        (status = 500, description = "Internal server error")
    )
)]
#[axum::debug_handler]
async fn clear_history(
    State(state): State<AppState>,
) -> Result<Json<DeleteRes>, (StatusCode, &'static str)> {
    let mut history = state.history.lock().await;
    match history.clear() {
        Ok(()) => Ok(Json(DeleteRes { deleted: true })),
        Err(e) => {
            tracing::error!("Clear history error: {:?}", e);
            Err((StatusCode::INTERNAL_SERVER_ERROR, "Internal error"))
        }
    }
}

#[utoipa::path(
    get,
    path = "/history/compare",
    params(CompareQuery),
    responses(
        (status = 200, description = "Lab trends between two entries, oldest first", body = CompareRes),
        (status = 400, description = "The same entry was given twice"),
        (status = 404, description = "History entry not found")
    )
)]
#[axum::debug_handler]
async fn compare_history(
    State(state): State<AppState>,
    Query(query): Query<CompareQuery>,
) -> Result<Json<CompareRes>, (StatusCode, &'static str)> {
    let history = state.history.lock().await;
    match history.compare(&query.a, &query.b) {
        Ok(comparison) => Ok(Json(CompareRes { comparison })),
        Err(HistoryError::NotFound(_)) => Err((StatusCode::NOT_FOUND, "History entry not found")),
        Err(HistoryError::InvalidComparison(_)) => Err((
            StatusCode::BAD_REQUEST,
            "Select two different history entries",
        )),
        Err(e) => {
            tracing::error!("Compare history error: {:?}", e);
            Err((StatusCode::INTERNAL_SERVER_ERROR, "Internal error"))
        }
    }
}

#[utoipa::path(
    get,
    path = "/history/{id}/export",
    params(("id" = String, Path, description = "History entry id")),
    responses(
        (status = 200, description = "Analysis result as a JSON attachment"),
        (status = 404, description = "History entry not found"),
        (status = 500, description = "Internal server error")
    )
)]
/// Download an entry's analysis result as `analise-drc-<timestamp>.json`
#[axum::debug_handler]
async fn export_history_entry(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<String>,
) -> Result<Response, (StatusCode, &'static str)> {
    let history = state.history.lock().await;
    let entry = history
        .get(&id)
        .ok_or((StatusCode::NOT_FOUND, "History entry not found"))?;

    let body = match export::export_result_json(&entry.result) {
        Ok(body) => body,
        Err(e) => {
            tracing::error!("Export error: {:?}", e);
            return Err((StatusCode::INTERNAL_SERVER_ERROR, "Internal error"));
        }
    };

    let disposition = format!(
        "attachment; filename=\"{}\"",
        export::export_file_name(chrono::Utc::now())
    );
    Ok((
        [
            (header::CONTENT_TYPE, "application/json".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        body,
    )
        .into_response())
}
