use axum::{
    body::Bytes,
    extract::{multipart::MultipartError, Multipart, State},
    http::StatusCode,
    Json,
};
use rda_core::types::{DataFile, UploadResponse};
use time::OffsetDateTime;

use crate::s3;

use super::{csrf::CsrfVerified, AppState};

pub const MAX_NAME_LENGTH: usize = 255;

const ID_CHARSET: &str = "abcdefghijklmnopqrstuvwxyz0123456789";

type UploadReply = (StatusCode, Json<UploadResponse>);

fn reject(status: StatusCode, error: impl Into<String>) -> UploadReply {
    (status, Json(UploadResponse::rejected(error)))
}

/// Ids are generated from `ID_CHARSET`, so anything else names no file.
pub fn is_valid_id(id: &str) -> bool {
    !id.is_empty() && id.bytes().all(|b| b.is_ascii_alphanumeric())
}

/// A body over the route's limit surfaces as a multipart stream error.
fn read_failed(error: MultipartError, max_size: usize) -> UploadReply {
    if error.status() == StatusCode::PAYLOAD_TOO_LARGE {
        tracing::warn!(%error, max_size, "upload exceeds body limit");
        return reject(
            StatusCode::PAYLOAD_TOO_LARGE,
            format!("File too large (max {max_size} bytes)."),
        );
    }
    tracing::warn!(%error, "failed to read multipart upload");
    reject(StatusCode::BAD_REQUEST, "Failed to read upload.")
}

/// Raw fields of the upload form, as they came off the wire.
#[derive(Default)]
struct UploadFields {
    name: Option<String>,
    description: Option<String>,
    file: Option<(Option<String>, Bytes)>,
}

#[derive(Debug)]
struct NewDataFile {
    name: String,
    description: String,
    filename: String,
    body: Bytes,
}

fn validate(fields: UploadFields, max_size: usize) -> Result<NewDataFile, UploadReply> {
    let name = fields.name.as_deref().map(str::trim).unwrap_or_default();
    if name.is_empty() {
        return Err(reject(StatusCode::BAD_REQUEST, "Name is required."));
    }
    if name.chars().count() > MAX_NAME_LENGTH {
        return Err(reject(
            StatusCode::BAD_REQUEST,
            format!("Name must be at most {MAX_NAME_LENGTH} characters."),
        ));
    }

    let Some((filename, body)) = fields.file else {
        return Err(reject(StatusCode::BAD_REQUEST, "No file provided."));
    };
    let filename = filename.unwrap_or_default();
    if filename.is_empty() {
        return Err(reject(StatusCode::BAD_REQUEST, "No file provided."));
    }
    let is_csv = filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.eq_ignore_ascii_case("csv"))
        .unwrap_or(false);
    if !is_csv {
        return Err(reject(
            StatusCode::BAD_REQUEST,
            "Only CSV files are accepted.",
        ));
    }
    if body.is_empty() {
        return Err(reject(StatusCode::BAD_REQUEST, "The uploaded file is empty."));
    }
    if body.len() > max_size {
        return Err(reject(
            StatusCode::PAYLOAD_TOO_LARGE,
            format!(
                "File too large: {} bytes (max {} bytes).",
                body.len(),
                max_size
            ),
        ));
    }

    Ok(NewDataFile {
        name: name.to_string(),
        description: fields.description.unwrap_or_default().trim().to_string(),
        filename,
        body,
    })
}

async fn read_fields(
    multipart: &mut Multipart,
    max_size: usize,
) -> Result<UploadFields, UploadReply> {
    let mut fields = UploadFields::default();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|error| read_failed(error, max_size))?
    {

        let name = field.name().unwrap_or_default().to_string();
        let read = match name.as_str() {
            "name" => field.text().await.map(|text| fields.name = Some(text)),
            "description" => field
                .text()
                .await
                .map(|text| fields.description = Some(text)),
            "file" if fields.file.is_none() => {
                let filename = field.file_name().map(str::to_string);
                field
                    .bytes()
                    .await
                    .map(|body| fields.file = Some((filename, body)))
            }
            _ => continue,
        };
        read.map_err(|error| read_failed(error, max_size))?;
    }
    Ok(fields)
}

pub async fn post_upload(
    _csrf: CsrfVerified,
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> UploadReply {
    match store(&state, &mut multipart).await {
        Ok(id) => {
            tracing::info!(%id, "data file uploaded");
            (StatusCode::OK, Json(UploadResponse::ok()))
        }
        Err(reply) => reply,
    }
}

async fn store(state: &AppState, multipart: &mut Multipart) -> Result<String, UploadReply> {
    let limits = state.limits;
    let fields = read_fields(multipart, limits.max_upload_size).await?;
    let new_file = validate(fields, limits.max_upload_size)?;

    let id = random_string::generate(limits.file_id_length, ID_CHARSET);
    let data_file = DataFile {
        name: new_file.name,
        filename: new_file.filename,
        description: new_file.description,
        size: new_file.body.len(),
        uploaded_at: OffsetDateTime::now_utc().unix_timestamp(),
    };

    s3::upload_file(&state.s3_client, &id, new_file.body.to_vec())
        .await
        .map_err(|error| {
            tracing::error!(%error, "failed to upload file to S3");
            reject(StatusCode::INTERNAL_SERVER_ERROR, "Failed to store file.")
        })?;
    // metadata last so a listed file always has its body
    s3::upload_metadata(&state.s3_client, &id, &data_file)
        .await
        .map_err(|error| {
            tracing::error!(%error, "failed to upload metadata to S3");
            reject(StatusCode::INTERNAL_SERVER_ERROR, "Failed to store file.")
        })?;

    Ok(id)
}
