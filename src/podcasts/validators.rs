// src/podcasts/validators.rs

use infer::Infer;

use super::models::{CreatePodcast, CreateSegmentRequest, UploadedFile};
use crate::common::{ValidationResult, Validator};

/// Upload limit for source documents: 20MB
pub const MAX_SOURCE_FILE_BYTES: usize = 20 * 1024 * 1024;

pub const ALLOWED_SOURCE_EXTENSIONS: [&str; 4] = ["pdf", "txt", "doc", "docx"];

const MAX_STRING_LEN: usize = 255;
const MAX_DURATION_LEN: usize = 10;

pub struct PodcastValidator;

impl Validator<CreatePodcast> for PodcastValidator {
    fn validate(&self, data: &CreatePodcast) -> ValidationResult {
        let mut result = ValidationResult::new();

        result.require_text("title", &data.title, MAX_STRING_LEN);
        result.require_text("topic", &data.topic, MAX_STRING_LEN);
        result.require_text("tone", &data.tone, MAX_STRING_LEN);
        result.limit_chars(
            "duration_minutes",
            data.duration_minutes.as_deref(),
            MAX_DURATION_LEN,
        );

        if let Some(file) = &data.source_file {
            if let Err(message) = validate_source_file(file) {
                result.add_error("source_file", &message);
            }
        }

        result
    }
}

/// Lowercased extension of an uploaded file name
pub fn file_extension(name: &str) -> Option<String> {
    let (stem, ext) = name.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

/// Extension allow-list plus a content sniff so a renamed binary can't pass
/// as a document. Size is checked separately since it maps to a 413.
pub fn validate_source_file(file: &UploadedFile) -> Result<String, String> {
    let type_error = || {
        format!(
            "The source file must be a file of type: {}",
            ALLOWED_SOURCE_EXTENSIONS.join(", ")
        )
    };

    let ext = file_extension(&file.original_name).ok_or_else(type_error)?;
    if !ALLOWED_SOURCE_EXTENSIONS.contains(&ext.as_str()) {
        return Err(type_error());
    }

    let detected = Infer::new().get(&file.data).map(|kind| kind.mime_type());
    let content_ok = match ext.as_str() {
        "pdf" => detected == Some("application/pdf"),
        "doc" => matches!(
            detected,
            Some("application/msword") | Some("application/x-ole-storage")
        ),
        "docx" => matches!(
            detected,
            Some("application/vnd.openxmlformats-officedocument.wordprocessingml.document")
                | Some("application/zip")
        ),
        // Plain text: nothing binary recognised and no NUL bytes
        _ => detected.is_none() && !file.data.contains(&0u8),
    };

    if content_ok {
        Ok(ext)
    } else {
        Err(type_error())
    }
}

pub struct SegmentValidator;

impl Validator<CreateSegmentRequest> for SegmentValidator {
    fn validate(&self, data: &CreateSegmentRequest) -> ValidationResult {
        let mut result = ValidationResult::new();

        if data.script_id.trim().is_empty() {
            result.add_error("script_id", "The script_id field is required");
        }
        result.require_text("file_path", &data.file_path, MAX_STRING_LEN);

        if let Some(order) = data.order {
            if order < 1 {
                result.add_error("order", "Order must be at least 1");
            }
        }

        result
    }
}
