// src/common/id_generator.rs
//! Crockford Base32 ID Generator
//!
//! Generates human-readable, prefixed IDs using Crockford Base32 encoding.
//! Format: PREFIX_XXXXXX (e.g., P_K7NP3X for podcasts)
//!
//! The alphabet excludes I, L, O and U so ids survive being read aloud.

use rand::Rng;

/// Crockford Base32 alphabet (excludes I, L, O, U to avoid confusion)
const CROCKFORD_ALPHABET: &[u8; 32] = b"0123456789ABCDEFGHJKMNPQRSTVWXYZ";

/// Entity type prefixes for ID generation
#[derive(Debug, Clone, Copy)]
pub enum EntityPrefix {
    /// User account (U_)
    User,
    /// Podcast (P_)
    Podcast,
    /// Podcast script (S_)
    Script,
    /// Uploaded source file (F_)
    File,
    /// Audio segment (A_)
    AudioSegment,
    /// Rendered output (O_); rows come from the rendering pipeline
    #[cfg(test)]
    Output,
}

impl EntityPrefix {
    /// Get the string prefix for this entity type
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityPrefix::User => "U",
            EntityPrefix::Podcast => "P",
            EntityPrefix::Script => "S",
            EntityPrefix::File => "F",
            EntityPrefix::AudioSegment => "A",
            #[cfg(test)]
            EntityPrefix::Output => "O",
        }
    }
}

/// Generate a random Crockford Base32 string of specified length
fn generate_crockford_string(length: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..length)
        .map(|_| {
            let idx = rng.gen_range(0..32);
            CROCKFORD_ALPHABET[idx] as char
        })
        .collect()
}

/// Generate a prefixed ID using Crockford Base32 encoding
///
/// User ids carry 10 random characters since they are created by an
/// unauthenticated flow; the rest use 8.
pub fn generate_id(prefix: EntityPrefix) -> String {
    let length = match prefix {
        EntityPrefix::User => 10,
        _ => 8,
    };
    format!("{}_{}", prefix.as_str(), generate_crockford_string(length))
}

/// Generate a raw Crockford Base32 string without prefix
/// Useful for filenames and slug suffixes
pub fn generate_raw_id(length: usize) -> String {
    generate_crockford_string(length)
}

pub fn generate_user_id() -> String {
    generate_id(EntityPrefix::User)
}

pub fn generate_podcast_id() -> String {
    generate_id(EntityPrefix::Podcast)
}

pub fn generate_script_id() -> String {
    generate_id(EntityPrefix::Script)
}

pub fn generate_file_id() -> String {
    generate_id(EntityPrefix::File)
}

pub fn generate_segment_id() -> String {
    generate_id(EntityPrefix::AudioSegment)
}

#[cfg(test)]
pub fn generate_output_id() -> String {
    generate_id(EntityPrefix::Output)
}
