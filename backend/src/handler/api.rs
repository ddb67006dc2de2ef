use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing, Json, Router,
};
use rda_core::types::StoredDataFile;

use crate::{
    s3,
    stats::{self, BasicStats},
};

use super::{upload::is_valid_id, AppState};

type ApiError = (StatusCode, String);

pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/health", routing::get(get_health))
        .route("/files", routing::get(get_files))
        .route("/file/:id/stats/", routing::get(get_stats))
}

async fn get_health() -> &'static str {
    "OK"
}

async fn get_files(
    State(state): State<AppState>,
) -> Result<Json<Vec<StoredDataFile>>, (StatusCode, &'static str)> {
    let files = s3::list_data_files(&state.s3_client)
        .await
        .map_err(|error| {
            tracing::error!(%error, "failed to list data files from S3");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "failed to list data files from S3",
            )
        })?;
    Ok(Json(files))
}

fn not_found() -> ApiError {
    (StatusCode::NOT_FOUND, "no such data file".to_string())
}

async fn get_stats(
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<BasicStats>, ApiError> {
    if !is_valid_id(&id) {
        return Err(not_found());
    }
    let csv = s3::get_file(&state.s3_client, &id)
        .await
        .map_err(|error| {
            tracing::error!(%error, %id, "failed to fetch data file from S3");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "failed to fetch data file from S3".to_string(),
            )
        })?
        .ok_or_else(not_found)?;

    stats::basic_stats(&csv, state.altitude)
        .map(Json)
        .map_err(|error| {
            tracing::warn!(%error, %id, "data file cannot be summarized");
            (StatusCode::UNPROCESSABLE_ENTITY, error.to_string())
        })
}
