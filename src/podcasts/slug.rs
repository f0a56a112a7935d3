// src/podcasts/slug.rs
//! Slugs for podcast URLs
//!
//! The base slug comes from the title; on collision a random five character
//! suffix is appended and the check repeats.

use sqlx::SqliteConnection;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

use crate::common::{generate_raw_id, ApiError};

/// Paths under `/podcasts/` that a slug must never shadow
const RESERVED_SLUGS: [&str; 1] = ["create"];

const FALLBACK_SLUG: &str = "podcast";
const MAX_SLUG_ATTEMPTS: usize = 10;

/// Latin letters that have no canonical decomposition to ASCII
fn fold_letter(c: char) -> Option<&'static str> {
    let folded = match c {
        'ß' => "ss",
        'æ' | 'Æ' => "ae",
        'œ' | 'Œ' => "oe",
        'ø' | 'Ø' => "o",
        'đ' | 'Đ' | 'ð' | 'Ð' => "d",
        'ł' | 'Ł' => "l",
        'þ' | 'Þ' => "th",
        'ı' => "i",
        _ => return None,
    };
    Some(folded)
}

/// Fold accented Latin text to ASCII: "Café Ørsted" becomes "Cafe Orsted"
fn to_ascii(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.nfkd().filter(|c| !is_combining_mark(*c)) {
        match fold_letter(c) {
            Some(folded) => out.push_str(folded),
            None => out.push(c),
        }
    }
    out
}

/// Lowercase ASCII slug with single dashes between words
///
/// Scripts without an ASCII folding (CJK, Cyrillic, ...) are dropped, so a
/// title written entirely in them falls back to the generic slug.
pub fn slugify(title: &str) -> String {
    let expanded = to_ascii(title).replace('@', " at ");
    let mut slug = String::with_capacity(expanded.len());
    let mut pending_dash = false;

    for c in expanded.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }

    slug
}

fn with_suffix(base: &str) -> String {
    format!("{}-{}", base, generate_raw_id(5).to_lowercase())
}

async fn slug_taken(conn: &mut SqliteConnection, slug: &str) -> Result<bool, ApiError> {
    if RESERVED_SLUGS.contains(&slug) {
        return Ok(true);
    }
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM podcasts WHERE slug = ?")
        .bind(slug)
        .fetch_one(&mut *conn)
        .await?;
    Ok(count > 0)
}

/// Pick a slug for `title` that no podcast uses yet
pub async fn generate_unique_slug(
    conn: &mut SqliteConnection,
    title: &str,
) -> Result<String, ApiError> {
    let mut base = slugify(title);
    if base.is_empty() {
        base = FALLBACK_SLUG.to_string();
    }

    let mut candidate = base.clone();
    for _ in 0..MAX_SLUG_ATTEMPTS {
        if !slug_taken(conn, &candidate).await? {
            return Ok(candidate);
        }
        candidate = with_suffix(&base);
    }

    Err(ApiError::InternalServer(format!(
        "Could not allocate a unique slug for '{}'",
        base
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::migrations::test_pool;

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("My First Podcast"), "my-first-podcast");
        assert_eq!(slugify("  Rust -- in   Production!! "), "rust-in-production");
        assert_eq!(slugify("Ask me @ midnight"), "ask-me-at-midnight");
        assert_eq!(slugify("Episode 42: The Answer"), "episode-42-the-answer");
        assert_eq!(slugify("!!!"), "");
    }

    #[test]
    fn test_slugify_folds_accented_latin() {
        assert_eq!(slugify("Café Talk"), "cafe-talk");
        assert_eq!(slugify("Crème Brûlée Über Alles"), "creme-brulee-uber-alles");
        assert_eq!(slugify("Straße & Smørrebrød"), "strasse-smorrebrod");
        assert_eq!(slugify("Ｒｕｓｔ　Ｎｏｔｅｓ"), "rust-notes");
        assert_eq!(slugify("播客"), "");
    }

    async fn insert_podcast(pool: &sqlx::SqlitePool, id: &str, slug: &str) {
        sqlx::query("INSERT INTO users (id, name, email, password) VALUES ('U_OWNER', 'O', 'o@example.com', 'x') ON CONFLICT DO NOTHING")
            .execute(pool)
            .await
            .unwrap();
        sqlx::query(
            "INSERT INTO podcasts (id, user_id, title, slug, topic, tone) VALUES (?, 'U_OWNER', 't', ?, 'x', 'y')",
        )
        .bind(id)
        .bind(slug)
        .execute(pool)
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_unique_slug_uses_base_when_free() {
        let pool = test_pool().await;
        let mut conn = pool.acquire().await.unwrap();

        let slug = generate_unique_slug(&mut conn, "Daily Rust").await.unwrap();
        assert_eq!(slug, "daily-rust");
    }

    #[tokio::test]
    async fn test_unique_slug_appends_suffix_on_collision() {
        let pool = test_pool().await;
        insert_podcast(&pool, "P_1", "daily-rust").await;

        let mut conn = pool.acquire().await.unwrap();
        let slug = generate_unique_slug(&mut conn, "Daily Rust").await.unwrap();

        assert_ne!(slug, "daily-rust");
        assert!(slug.starts_with("daily-rust-"));
        let suffix = &slug["daily-rust-".len()..];
        assert_eq!(suffix.len(), 5);
        assert!(suffix.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[tokio::test]
    async fn test_reserved_and_empty_titles() {
        let pool = test_pool().await;
        let mut conn = pool.acquire().await.unwrap();

        let slug = generate_unique_slug(&mut conn, "Create").await.unwrap();
        assert!(slug.starts_with("create-"));

        let slug = generate_unique_slug(&mut conn, "???").await.unwrap();
        assert_eq!(slug, "podcast");

        let slug = generate_unique_slug(&mut conn, "Ñandú").await.unwrap();
        assert_eq!(slug, "nandu");
    }
}
