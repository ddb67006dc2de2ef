mod api;
mod csrf;
mod dashboard;
mod upload;

use axum::{
    extract::DefaultBodyLimit,
    http::{header, Request},
    middleware::Next,
    response::Response,
    routing, Router,
};
use tower_http::services::ServeDir;

use crate::{config::CONFIG, stats::AltitudeOffset};

/// Room left for the text fields and multipart framing around the file.
const FORM_OVERHEAD: usize = 64 * 1024;

#[derive(Clone, Copy, Debug)]
pub struct UploadLimits {
    /// Largest accepted data file, in bytes.
    pub max_upload_size: usize,
    pub file_id_length: usize,
}

#[derive(Clone)]
pub struct AppState {
    s3_client: aws_sdk_s3::Client,
    limits: UploadLimits,
    altitude: AltitudeOffset,
}

pub fn create_router(s3_client: aws_sdk_s3::Client) -> Router {
    let state = AppState {
        s3_client,
        limits: UploadLimits {
            max_upload_size: CONFIG.max_upload_size,
            file_id_length: CONFIG.file_id_length,
        },
        altitude: AltitudeOffset {
            city_altitude_msnm: CONFIG.city_altitude_msnm,
            sensor_zero_altitude: CONFIG.sensor_zero_altitude,
        },
    };

    app_router(state)
        .nest_service("/static", ServeDir::new(&CONFIG.static_dir))
        .layer(axum::middleware::from_fn(server_header_middleware))
}

/// Every route that needs state, without the static files.
fn app_router(state: AppState) -> Router {
    let body_limit = DefaultBodyLimit::max(state.limits.max_upload_size + FORM_OVERHEAD);

    Router::new()
        .route("/", routing::get(dashboard::get_dashboard))
        .route("/upload/", routing::post(upload::post_upload).layer(body_limit))
        .route("/file/:id/delete/", routing::post(dashboard::post_delete))
        .nest("/api", api::create_router())
        .with_state(state)
        .layer(tower_http::trace::TraceLayer::new_for_http())
}

async fn server_header_middleware<B>(req: Request<B>, next: Next<B>) -> Response {
    let mut resp = next.run(req).await;
    resp.headers_mut().insert(
        header::SERVER,
        header::HeaderValue::from_static(concat!(
            env!("CARGO_PKG_NAME"),
            "/",
            env!("CARGO_PKG_VERSION")
        )),
    );
    resp
}
