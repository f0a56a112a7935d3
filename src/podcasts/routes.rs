// src/podcasts/routes.rs

use axum::{extract::DefaultBodyLimit, routing::get, Router};

use super::handlers;
use super::validators::MAX_SOURCE_FILE_BYTES;

/// Room for the other form fields next to a maximum-size document
const FORM_OVERHEAD_BYTES: usize = 1024 * 1024;

pub fn podcasts_routes() -> Router {
    Router::new()
        .route("/podcasts", get(handlers::index).post(handlers::store))
        // Registered before the slug route; "create" is never issued as a slug
        .route("/podcasts/create", get(handlers::create_form))
        .route(
            "/podcasts/:slug",
            get(handlers::show).delete(handlers::destroy),
        )
        .route("/podcasts/:slug/scripts", get(handlers::list_scripts))
        .route(
            "/podcasts/:slug/segments",
            get(handlers::list_segments).post(handlers::add_segment),
        )
        .layer(DefaultBodyLimit::max(
            MAX_SOURCE_FILE_BYTES + FORM_OVERHEAD_BYTES,
        ))
}
