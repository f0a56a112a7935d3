// src/podcasts/models.rs

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

fn serialize_int_as_bool<S>(value: &i64, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_bool(*value != 0)
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Podcast {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub slug: String,
    pub description: Option<String>,
    pub topic: String,
    pub tone: String,
    pub duration_minutes: Option<String>,
    pub status: String,
    #[serde(serialize_with = "serialize_int_as_bool")]
    pub file_uploaded: i64,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PodcastScript {
    pub id: String,
    pub podcast_id: String,
    pub speaker: Option<String>,
    pub raw_text: Option<String>,
    pub final_text: Option<String>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PodcastFile {
    pub id: String,
    pub podcast_id: String,
    pub original_name: String,
    pub file_path: String,
    pub file_type: String,
    pub file_size: i64,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PodcastAudioSegment {
    pub id: String,
    pub podcast_id: String,
    pub script_id: String,
    pub file_path: String,
    pub voice_id: Option<String>,
    pub order: i64,
    pub duration: Option<String>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PodcastOutput {
    pub id: String,
    pub podcast_id: String,
    pub file_path: String,
    pub format: String,
    pub duration: Option<String>,
    pub status: String,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

/// Source document received with a create request
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub original_name: String,
    pub data: Bytes,
}

/// Podcast creation form, assembled from multipart fields
#[derive(Debug, Clone, Default)]
pub struct CreatePodcast {
    pub title: String,
    pub description: Option<String>,
    pub topic: String,
    pub tone: String,
    pub duration_minutes: Option<String>,
    pub source_text: Option<String>,
    pub source_file: Option<UploadedFile>,
}

#[derive(Debug, Deserialize)]
pub struct CreateSegmentRequest {
    pub script_id: String,
    pub file_path: String,
    pub voice_id: Option<String>,
    pub duration: Option<String>,
    pub order: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct PodcastDetail {
    pub podcast: Podcast,
    pub script: Option<PodcastScript>,
    pub files: Vec<PodcastFile>,
    pub outputs: Vec<PodcastOutput>,
}

#[derive(Serialize)]
pub struct MessageResponse {
    pub message: String,
}
