use anyhow::{Context, Result};
use axum::{
    extract::{Path, State},
    headers,
    http::{HeaderMap, StatusCode},
    response::{Html, Redirect},
    Form, TypedHeader,
};
use bytesize::ByteSize;
use once_cell::sync::Lazy;
use rda_core::types::StoredDataFile;
use serde::{Deserialize, Serialize};
use tera::Tera;
use time::{format_description::well_known::Rfc3339, OffsetDateTime};

use crate::s3;

use super::{
    csrf,
    upload::{is_valid_id, MAX_NAME_LENGTH},
    AppState,
};

static TEMPLATES: Lazy<Tera> = Lazy::new(|| {
    let mut tera = Tera::default();
    tera.add_raw_template(
        "dashboard.html",
        include_str!("../../templates/dashboard.html"),
    )
    .context("failed to parse dashboard template")
    .unwrap();
    tera
});

#[derive(Serialize)]
struct FileRow {
    id: String,
    name: String,
    filename: String,
    description: String,
    size: String,
    uploaded_at: String,
}

impl From<StoredDataFile> for FileRow {
    fn from(stored: StoredDataFile) -> Self {
        let StoredDataFile { id, file } = stored;
        let uploaded_at = OffsetDateTime::from_unix_timestamp(file.uploaded_at)
            .ok()
            .and_then(|at| at.format(&Rfc3339).ok())
            .unwrap_or_else(|| file.uploaded_at.to_string());
        Self {
            id,
            name: file.name,
            filename: file.filename,
            description: file.description,
            size: ByteSize(file.size as u64).to_string(),
            uploaded_at,
        }
    }
}

/// Newest uploads first. `csrf_token` goes into each row's delete form.
fn render(mut files: Vec<StoredDataFile>, csrf_token: &str) -> Result<String> {
    files.sort_by(|a, b| b.file.uploaded_at.cmp(&a.file.uploaded_at));
    let rows = files.into_iter().map(FileRow::from).collect::<Vec<_>>();

    let mut context = tera::Context::new();
    context.insert("files", &rows);
    context.insert("max_name_length", &MAX_NAME_LENGTH);
    context.insert("csrf_token", csrf_token);
    TEMPLATES
        .render("dashboard.html", &context)
        .context("failed to render dashboard template")
}

pub async fn get_dashboard(
    cookies: Option<TypedHeader<headers::Cookie>>,
    State(state): State<AppState>,
) -> Result<(HeaderMap, Html<String>), (StatusCode, &'static str)> {
    let files = s3::list_data_files(&state.s3_client)
        .await
        .map_err(|error| {
            tracing::error!(%error, "failed to list data files from S3");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "failed to list data files from S3",
            )
        })?;
    let (token, headers) = csrf::ensure_token(cookies.as_deref());
    let page = render(files, &token).map_err(|error| {
        tracing::error!(%error, "failed to render dashboard");
        (StatusCode::INTERNAL_SERVER_ERROR, "failed to render dashboard")
    })?;

    Ok((headers, Html(page)))
}

#[derive(Deserialize)]
pub struct DeleteForm {
    #[serde(default)]
    csrfmiddlewaretoken: Option<String>,
}

pub async fn post_delete(
    Path(id): Path<String>,
    cookies: Option<TypedHeader<headers::Cookie>>,
    State(state): State<AppState>,
    Form(form): Form<DeleteForm>,
) -> Result<Redirect, (StatusCode, &'static str)> {
    if !csrf::verify(cookies.as_deref(), form.csrfmiddlewaretoken.as_deref()) {
        return Err((StatusCode::FORBIDDEN, csrf::REJECTION_MESSAGE));
    }
    if !is_valid_id(&id) {
        return Err((StatusCode::NOT_FOUND, "no such data file"));
    }

    s3::delete_data_file(&state.s3_client, &id)
        .await
        .map_err(|error| {
            tracing::error!(%error, %id, "failed to delete data file from S3");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "failed to delete data file from S3",
            )
        })?;
    tracing::info!(%id, "data file deleted");

    Ok(Redirect::to("/"))
}

#[cfg(test)]
mod tests {
    use rda_core::types::DataFile;

    use super::*;

    fn stored(id: &str, name: &str, uploaded_at: i64) -> StoredDataFile {
        StoredDataFile {
            id: id.to_string(),
            file: DataFile {
                name: name.to_string(),
                filename: format!("{id}.csv"),
                description: String::new(),
                size: 2048,
                uploaded_at,
            },
        }
    }

    #[test]
    fn page_carries_the_wired_markup() {
        let page = render(Vec::new(), "tok").unwrap();
        assert!(page.contains(r#"id="uploadModal""#));
        assert!(page.contains(r#"id="uploadForm""#));
        assert!(page.contains(r#"action="/upload/""#));
        assert!(page.contains("btn btn-success"));
        assert!(page.contains("No data files uploaded yet."));
    }

    #[test]
    fn files_are_listed_newest_first() {
        let page = render(vec![
            stored("old", "first launch", 1_700_000_000),
            stored("new", "second launch", 1_764_167_400),
        ], "tok")
        .unwrap();
        let newer = page.find("second launch").unwrap();
        let older = page.find("first launch").unwrap();
        assert!(newer < older);
        assert!(page.contains("2.0 KiB") || page.contains("2.0 KB"));
        assert!(page.contains("2025-11-26T14:30:00Z"));
    }

    #[test]
    fn names_are_escaped() {
        let page = render(vec![stored("x", "<script>alert(1)</script>", 0)], "tok").unwrap();
        assert!(!page.contains("<script>alert(1)</script>"));
        assert!(page.contains("&lt;script&gt;"));
    }

    #[test]
    fn rows_link_stats_and_delete() {
        let page = render(vec![stored("abc123", "launch", 0)], "tok456").unwrap();
        assert!(page.contains(r#"href="/api/file/abc123/stats/""#));
        assert!(page.contains(r#"action="/file/abc123/delete/""#));
        assert!(page.contains(r#"name="csrfmiddlewaretoken" value="tok456""#));
    }
}
