// Field validation shared by request validators

#[derive(Debug)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

/// Errors collected across every field of a request
#[derive(Debug)]
pub struct ValidationResult {
    pub is_valid: bool,
    pub errors: Vec<ValidationError>,
}

impl ValidationResult {
    pub fn new() -> Self {
        Self {
            is_valid: true,
            errors: Vec::new(),
        }
    }

    pub fn add_error(&mut self, field: &str, message: &str) {
        self.is_valid = false;
        self.errors.push(ValidationError {
            field: field.to_string(),
            message: message.to_string(),
        });
    }

    /// Non-blank text of at most `max_chars` characters
    pub fn require_text(&mut self, field: &str, value: &str, max_chars: usize) {
        if value.trim().is_empty() {
            self.add_error(field, &format!("The {} field is required", field));
        } else {
            self.limit_chars(field, Some(value), max_chars);
        }
    }

    /// Optional text that must not exceed `max_chars` characters
    pub fn limit_chars(&mut self, field: &str, value: Option<&str>, max_chars: usize) {
        if value.map_or(false, |v| v.chars().count() > max_chars) {
            self.add_error(
                field,
                &format!("The {} field must not exceed {} characters", field, max_chars),
            );
        }
    }

    /// `field: message` pairs joined for an error response
    pub fn summary(&self) -> String {
        self.errors
            .iter()
            .map(|e| format!("{}: {}", e.field, e.message))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl Default for ValidationResult {
    fn default() -> Self {
        Self::new()
    }
}

pub trait Validator<T> {
    fn validate(&self, data: &T) -> ValidationResult;
}
