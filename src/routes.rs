use axum::body::Body;
use axum::handler::Handler;
use axum::routing::{get, post};
use axum::{Extension, Router};
use http_body::Limited;
use tower_http::limit::RequestBodyLimitLayer;

use crate::state::AppState;
use crate::{err, handlers};

// Paths match the links already shared by the old site.
pub const REGISTRATION: &str = "/registration.php";
pub const PROCESS_REGISTRATION: &str = "/backend/process_registration.php";
pub const LISTING: &str = "/select.php";
pub const EDIT: &str = "/update.php";
pub const PROCESS_UPDATE: &str = "/backend/update.php";
pub const DELETE: &str = "/delete.php";

/// Room for the text fields and multipart framing around the file part.
const FORM_OVERHEAD_BYTES: usize = 64 * 1024;

pub fn router(state: AppState) -> Router {
    let body_limit = state.max_upload_bytes + FORM_OVERHEAD_BYTES;
    Router::<Limited<Body>>::new()
        .route("/", get(handlers::index))
        .route(REGISTRATION, get(handlers::registration_form))
        .route(PROCESS_REGISTRATION, post(handlers::process_registration))
        .route(LISTING, get(handlers::listing))
        .route(EDIT, get(handlers::edit_form))
        .route(PROCESS_UPDATE, post(handlers::process_update))
        .route(DELETE, get(handlers::delete_student))
        .route("/uploads/:name", get(handlers::serve_upload))
        .fallback(err::handler404.into_service())
        .layer(Extension(state))
        .layer(RequestBodyLimitLayer::new(body_limit))
}
