// src/podcasts/handlers.rs

use axum::{
    extract::{multipart::MultipartError, Extension, Multipart, Path},
    http::StatusCode,
    response::{IntoResponse, Json, Redirect},
};
use serde_json::json;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, warn};

use super::models::{CreatePodcast, CreateSegmentRequest, MessageResponse, UploadedFile};
use super::services::PodcastsService;
use super::validators::{ALLOWED_SOURCE_EXTENSIONS, MAX_SOURCE_FILE_BYTES};
use crate::auth::AuthedUser;
use crate::common::{ApiError, AppState};

fn multipart_error(e: MultipartError) -> ApiError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::PayloadTooLarge("Source file exceeds 20MB limit".to_string())
    } else {
        ApiError::BadRequest(format!("Invalid form data: {}", e.body_text()))
    }
}

/// GET /podcasts - Podcasts owned by the current user
pub async fn index(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    authed: AuthedUser,
) -> Result<impl IntoResponse, ApiError> {
    let db = state_lock.read().await.db.clone();
    let podcasts = PodcastsService::new(db).list_for_owner(&authed.id).await?;

    Ok(Json(json!({ "podcasts": podcasts })))
}

/// GET /podcasts/create - What the create form accepts
pub async fn create_form(_authed: AuthedUser) -> impl IntoResponse {
    Json(json!({
        "fields": {
            "title": { "required": true, "max_length": 255 },
            "description": { "required": false },
            "topic": { "required": true, "max_length": 255 },
            "tone": { "required": true, "max_length": 255 },
            "duration_minutes": { "required": false, "max_length": 10 },
            "source_text": { "required": false },
            "source_file": {
                "required": false,
                "types": ALLOWED_SOURCE_EXTENSIONS,
                "max_bytes": MAX_SOURCE_FILE_BYTES,
            },
        }
    }))
}

/// POST /podcasts - Create a podcast from a multipart form
pub async fn store(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    authed: AuthedUser,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let state = state_lock.read().await.clone();
    let mut form = CreatePodcast::default();

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };

        if name == "source_file" {
            let original_name = field.file_name().unwrap_or_default().to_string();
            let data = field.bytes().await.map_err(multipart_error)?;
            // Browsers send an empty part when no file was picked
            if original_name.is_empty() && data.is_empty() {
                continue;
            }
            if data.len() > MAX_SOURCE_FILE_BYTES {
                warn!(user_id = %authed.id, size = data.len(), "Source file too large");
                return Err(ApiError::PayloadTooLarge(
                    "Source file exceeds 20MB limit".to_string(),
                ));
            }
            form.source_file = Some(UploadedFile {
                original_name,
                data,
            });
            continue;
        }

        let value = field.text().await.map_err(multipart_error)?;
        match name.as_str() {
            "title" => form.title = value,
            "description" => form.description = Some(value),
            "topic" => form.topic = value,
            "tone" => form.tone = value,
            "duration_minutes" => form.duration_minutes = Some(value),
            "source_text" => form.source_text = Some(value),
            _ => {}
        }
    }

    info!(user_id = %authed.id, has_file = form.source_file.is_some(), "Creating podcast");

    let podcast = PodcastsService::new(state.db.clone())
        .create(&authed.id, form, &state.storage)
        .await?;

    Ok(Redirect::to(&format!("/podcasts/{}", podcast.slug)))
}

/// GET /podcasts/:slug - Podcast with its first script
pub async fn show(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    authed: AuthedUser,
    Path(slug): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state_lock.read().await.db.clone();
    let detail = PodcastsService::new(db).detail(&authed.id, &slug).await?;

    Ok(Json(detail))
}

/// DELETE /podcasts/:slug
pub async fn destroy(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    authed: AuthedUser,
    Path(slug): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let state = state_lock.read().await.clone();
    PodcastsService::new(state.db.clone())
        .delete(&authed.id, &slug, &state.storage)
        .await?;

    Ok(Json(MessageResponse {
        message: "Podcast deleted".to_string(),
    }))
}

/// GET /podcasts/:slug/scripts
pub async fn list_scripts(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    authed: AuthedUser,
    Path(slug): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state_lock.read().await.db.clone();
    let service = PodcastsService::new(db);
    let podcast = service.find_owned_by_slug(&authed.id, &slug).await?;
    let scripts = service.list_scripts(&podcast.id).await?;

    Ok(Json(json!({ "scripts": scripts })))
}

/// GET /podcasts/:slug/segments
pub async fn list_segments(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    authed: AuthedUser,
    Path(slug): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state_lock.read().await.db.clone();
    let service = PodcastsService::new(db);
    let podcast = service.find_owned_by_slug(&authed.id, &slug).await?;
    let segments = service.list_segments(&podcast.id).await?;

    Ok(Json(json!({ "segments": segments })))
}

/// POST /podcasts/:slug/segments
pub async fn add_segment(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    authed: AuthedUser,
    Path(slug): Path<String>,
    Json(payload): Json<CreateSegmentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state_lock.read().await.db.clone();
    let service = PodcastsService::new(db);
    let podcast = service.find_owned_by_slug(&authed.id, &slug).await?;
    let segment = service.add_segment(&podcast, payload).await?;

    Ok((StatusCode::CREATED, Json(segment)))
}
