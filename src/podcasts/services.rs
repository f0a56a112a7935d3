// src/podcasts/services.rs

use sqlx::{SqliteConnection, SqlitePool};
use tracing::{info, warn};

use super::models::{
    CreatePodcast, CreateSegmentRequest, Podcast, PodcastAudioSegment, PodcastDetail,
    PodcastFile, PodcastOutput, PodcastScript,
};
use super::slug::generate_unique_slug;
use super::storage::SourceStorage;
use super::validators::{
    validate_source_file, PodcastValidator, SegmentValidator, MAX_SOURCE_FILE_BYTES,
};
use crate::common::{
    generate_file_id, generate_podcast_id, generate_script_id, generate_segment_id,
    is_unique_violation, ApiError, Validator,
};

/// Speaker recorded on the script created from inline source text
pub const DEFAULT_SPEAKER: &str = "Host";

const PODCAST_COLUMNS: &str = "id, user_id, title, slug, description, topic, tone, \
     duration_minutes, status, file_uploaded, created_at, updated_at";

const SLUG_INSERT_ATTEMPTS: usize = 3;

/// Order for the next segment of a podcast: one past the current maximum
pub async fn next_segment_order(
    conn: &mut SqliteConnection,
    podcast_id: &str,
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar(
        r#"SELECT COALESCE(MAX("order"), 0) + 1 FROM podcast_audio_segments WHERE podcast_id = ?"#,
    )
    .bind(podcast_id)
    .fetch_one(&mut *conn)
    .await
}

pub struct PodcastsService {
    db: SqlitePool,
}

impl PodcastsService {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    // ============================================================================
    // Podcast CRUD Operations
    // ============================================================================

    pub async fn count_for_owner(&self, user_id: &str) -> Result<i64, ApiError> {
        let count = sqlx::query_scalar("SELECT COUNT(*) FROM podcasts WHERE user_id = ?")
            .bind(user_id)
            .fetch_one(&self.db)
            .await?;
        Ok(count)
    }

    /// Podcasts owned by the user, newest first
    pub async fn list_for_owner(&self, user_id: &str) -> Result<Vec<Podcast>, ApiError> {
        let sql = format!(
            "SELECT {} FROM podcasts WHERE user_id = ? ORDER BY created_at DESC, rowid DESC",
            PODCAST_COLUMNS
        );
        let podcasts = sqlx::query_as::<_, Podcast>(&sql)
            .bind(user_id)
            .fetch_all(&self.db)
            .await?;
        Ok(podcasts)
    }

    /// Podcast by slug; other users' podcasts are reported as missing
    pub async fn find_owned_by_slug(&self, user_id: &str, slug: &str) -> Result<Podcast, ApiError> {
        let sql = format!(
            "SELECT {} FROM podcasts WHERE slug = ? AND user_id = ?",
            PODCAST_COLUMNS
        );
        sqlx::query_as::<_, Podcast>(&sql)
            .bind(slug)
            .bind(user_id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| ApiError::NotFound("Podcast not found".to_string()))
    }

    /// Create a podcast with its optional initial script and source file
    pub async fn create(
        &self,
        user_id: &str,
        form: CreatePodcast,
        storage: &SourceStorage,
    ) -> Result<Podcast, ApiError> {
        if let Some(file) = &form.source_file {
            if file.data.len() > MAX_SOURCE_FILE_BYTES {
                return Err(ApiError::PayloadTooLarge(
                    "Source file exceeds 20MB limit".to_string(),
                ));
            }
        }

        let validation_result = PodcastValidator.validate(&form);
        if !validation_result.is_valid {
            return Err(ApiError::from(validation_result));
        }

        let stored_file = match &form.source_file {
            Some(file) => {
                let ext = validate_source_file(file).map_err(ApiError::ValidationError)?;
                let path = storage.store(&ext, &file.data).await?;
                Some((path, ext))
            }
            None => None,
        };

        match self.insert_podcast(user_id, &form, stored_file.as_ref()).await {
            Ok(podcast) => {
                info!(
                    podcast_id = %podcast.id,
                    slug = %podcast.slug,
                    user_id = %user_id,
                    file_uploaded = podcast.file_uploaded != 0,
                    "Created podcast"
                );
                Ok(podcast)
            }
            Err(e) => {
                if let Some((path, _)) = &stored_file {
                    storage.remove(path).await;
                }
                Err(e)
            }
        }
    }

    async fn insert_podcast(
        &self,
        user_id: &str,
        form: &CreatePodcast,
        stored_file: Option<&(String, String)>,
    ) -> Result<Podcast, ApiError> {
        let mut tx = self.db.begin().await?;
        let podcast_id = generate_podcast_id();
        let description = form.description.as_deref().filter(|d| !d.trim().is_empty());
        let duration = form
            .duration_minutes
            .as_deref()
            .filter(|d| !d.trim().is_empty());

        let mut attempt = 0;
        let slug = loop {
            attempt += 1;
            let slug = generate_unique_slug(&mut tx, &form.title).await?;

            let inserted = sqlx::query(
                r#"
                INSERT INTO podcasts (
                    id, user_id, title, slug, description, topic, tone,
                    duration_minutes, status, file_uploaded
                )
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, 'draft', ?)
                "#,
            )
            .bind(&podcast_id)
            .bind(user_id)
            .bind(form.title.trim())
            .bind(&slug)
            .bind(description)
            .bind(form.topic.trim())
            .bind(form.tone.trim())
            .bind(duration)
            .bind(stored_file.is_some())
            .execute(&mut *tx)
            .await;

            match inserted {
                Ok(_) => break slug,
                // Another request took the slug after our check
                Err(e) if is_unique_violation(&e) && attempt < SLUG_INSERT_ATTEMPTS => {
                    warn!(slug = %slug, attempt, "Slug taken concurrently, retrying");
                }
                Err(e) => return Err(ApiError::DatabaseError(e)),
            }
        };

        if let Some(text) = form.source_text.as_deref().filter(|t| !t.trim().is_empty()) {
            sqlx::query(
                "INSERT INTO podcast_scripts (id, podcast_id, speaker, raw_text, final_text) VALUES (?, ?, ?, ?, NULL)",
            )
            .bind(generate_script_id())
            .bind(&podcast_id)
            .bind(DEFAULT_SPEAKER)
            .bind(text)
            .execute(&mut *tx)
            .await?;
        }

        if let (Some((path, ext)), Some(file)) = (stored_file, &form.source_file) {
            sqlx::query(
                "INSERT INTO podcast_files (id, podcast_id, original_name, file_path, file_type, file_size) VALUES (?, ?, ?, ?, ?, ?)",
            )
            .bind(generate_file_id())
            .bind(&podcast_id)
            .bind(&file.original_name)
            .bind(path)
            .bind(ext)
            .bind(file.data.len() as i64)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        self.find_owned_by_slug(user_id, &slug).await
    }

    pub async fn first_script(&self, podcast_id: &str) -> Result<Option<PodcastScript>, ApiError> {
        let script = sqlx::query_as::<_, PodcastScript>(
            r#"
            SELECT id, podcast_id, speaker, raw_text, final_text, created_at, updated_at
            FROM podcast_scripts
            WHERE podcast_id = ?
            ORDER BY created_at ASC, rowid ASC
            LIMIT 1
            "#,
        )
        .bind(podcast_id)
        .fetch_optional(&self.db)
        .await?;
        Ok(script)
    }

    pub async fn list_scripts(&self, podcast_id: &str) -> Result<Vec<PodcastScript>, ApiError> {
        let scripts = sqlx::query_as::<_, PodcastScript>(
            r#"
            SELECT id, podcast_id, speaker, raw_text, final_text, created_at, updated_at
            FROM podcast_scripts
            WHERE podcast_id = ?
            ORDER BY created_at ASC, rowid ASC
            "#,
        )
        .bind(podcast_id)
        .fetch_all(&self.db)
        .await?;
        Ok(scripts)
    }

    pub async fn list_files(&self, podcast_id: &str) -> Result<Vec<PodcastFile>, ApiError> {
        let files = sqlx::query_as::<_, PodcastFile>(
            r#"
            SELECT id, podcast_id, original_name, file_path, file_type, file_size,
                   created_at, updated_at
            FROM podcast_files
            WHERE podcast_id = ?
            ORDER BY created_at ASC, rowid ASC
            "#,
        )
        .bind(podcast_id)
        .fetch_all(&self.db)
        .await?;
        Ok(files)
    }

    pub async fn list_outputs(&self, podcast_id: &str) -> Result<Vec<PodcastOutput>, ApiError> {
        let outputs = sqlx::query_as::<_, PodcastOutput>(
            r#"
            SELECT id, podcast_id, file_path, format, duration, status, created_at, updated_at
            FROM podcast_outputs
            WHERE podcast_id = ?
            ORDER BY created_at DESC, rowid DESC
            "#,
        )
        .bind(podcast_id)
        .fetch_all(&self.db)
        .await?;
        Ok(outputs)
    }

    /// Podcast plus its first script, source files and rendered outputs
    pub async fn detail(&self, user_id: &str, slug: &str) -> Result<PodcastDetail, ApiError> {
        let podcast = self.find_owned_by_slug(user_id, slug).await?;
        let script = self.first_script(&podcast.id).await?;
        let files = self.list_files(&podcast.id).await?;
        let outputs = self.list_outputs(&podcast.id).await?;

        Ok(PodcastDetail {
            podcast,
            script,
            files,
            outputs,
        })
    }

    /// Delete a podcast; scripts, files, segments and outputs cascade
    pub async fn delete(
        &self,
        user_id: &str,
        slug: &str,
        storage: &SourceStorage,
    ) -> Result<(), ApiError> {
        let podcast = self.find_owned_by_slug(user_id, slug).await?;
        let files = self.list_files(&podcast.id).await?;

        sqlx::query("DELETE FROM podcasts WHERE id = ?")
            .bind(&podcast.id)
            .execute(&self.db)
            .await?;

        for file in files {
            storage.remove(&file.file_path).await;
        }

        info!(podcast_id = %podcast.id, user_id = %user_id, "Deleted podcast");
        Ok(())
    }

    // ============================================================================
    // Audio Segments
    // ============================================================================

    pub async fn list_segments(
        &self,
        podcast_id: &str,
    ) -> Result<Vec<PodcastAudioSegment>, ApiError> {
        let segments = sqlx::query_as::<_, PodcastAudioSegment>(
            r#"
            SELECT id, podcast_id, script_id, file_path, voice_id, "order", duration,
                   created_at, updated_at
            FROM podcast_audio_segments
            WHERE podcast_id = ?
            ORDER BY "order" ASC
            "#,
        )
        .bind(podcast_id)
        .fetch_all(&self.db)
        .await?;
        Ok(segments)
    }

    /// Append an audio segment. Without an explicit order the segment goes
    /// after the current last one.
    pub async fn add_segment(
        &self,
        podcast: &Podcast,
        request: CreateSegmentRequest,
    ) -> Result<PodcastAudioSegment, ApiError> {
        let validation_result = SegmentValidator.validate(&request);
        if !validation_result.is_valid {
            return Err(ApiError::from(validation_result));
        }

        let mut tx = self.db.begin().await?;

        let script_owner: Option<String> =
            sqlx::query_scalar("SELECT podcast_id FROM podcast_scripts WHERE id = ?")
                .bind(&request.script_id)
                .fetch_optional(&mut *tx)
                .await?;
        if script_owner.as_deref() != Some(podcast.id.as_str()) {
            return Err(ApiError::ValidationError(
                "script_id: Script does not belong to this podcast".to_string(),
            ));
        }

        let order = match request.order {
            Some(order) => order,
            None => next_segment_order(&mut tx, &podcast.id).await?,
        };

        let segment_id = generate_segment_id();
        sqlx::query(
            r#"
            INSERT INTO podcast_audio_segments (
                id, podcast_id, script_id, file_path, voice_id, "order", duration
            )
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&segment_id)
        .bind(&podcast.id)
        .bind(&request.script_id)
        .bind(request.file_path.trim())
        .bind(&request.voice_id)
        .bind(order)
        .bind(&request.duration)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                ApiError::ValidationError(format!(
                    "order: Segment {} already exists for this podcast",
                    order
                ))
            } else {
                ApiError::DatabaseError(e)
            }
        })?;

        let segment = sqlx::query_as::<_, PodcastAudioSegment>(
            r#"
            SELECT id, podcast_id, script_id, file_path, voice_id, "order", duration,
                   created_at, updated_at
            FROM podcast_audio_segments
            WHERE id = ?
            "#,
        )
        .bind(&segment_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        info!(
            podcast_id = %podcast.id,
            segment_id = %segment.id,
            order = segment.order,
            "Added audio segment"
        );
        Ok(segment)
    }
}
