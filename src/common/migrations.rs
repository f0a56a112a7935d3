// src/common/migrations.rs
//! Database migration and schema management

use sqlx::SqlitePool;
use tracing::{info, warn};

/// Run all database migrations
///
/// Tables are created if they don't exist. With `reset` the schema is
/// dropped first.
pub async fn run_migrations(pool: &SqlitePool, reset: bool) -> Result<(), sqlx::Error> {
    if reset {
        warn!("⚠️  RESET_DB=true - Dropping all tables and recreating schema...");
        drop_all_tables(pool).await?;
        info!("✅ Dropped old tables");
    }

    sqlx::query("PRAGMA foreign_keys = ON").execute(pool).await?;

    create_account_tables(pool).await?;
    create_podcast_tables(pool).await?;
    create_indexes(pool).await?;

    info!("✅ Database migration completed successfully!");

    Ok(())
}

async fn drop_all_tables(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    // Drop tables in reverse dependency order
    let tables = [
        "podcast_outputs",
        "podcast_audio_segments",
        "podcast_files",
        "podcast_scripts",
        "podcasts",
        "users",
    ];

    for table in tables {
        sqlx::query(&format!("DROP TABLE IF EXISTS {}", table))
            .execute(pool)
            .await?;
    }

    Ok(())
}

async fn create_account_tables(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    // password is NOT NULL even for OAuth-only accounts
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            email TEXT UNIQUE NOT NULL,
            password TEXT NOT NULL,
            provider TEXT,
            provider_id TEXT,
            avatar TEXT,
            email_verified_at TEXT,
            remember_token TEXT,
            created_at TEXT DEFAULT (datetime('now')),
            updated_at TEXT DEFAULT (datetime('now'))
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_podcast_tables(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS podcasts (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL,
            title TEXT NOT NULL,
            slug TEXT NOT NULL UNIQUE,
            description TEXT,
            topic TEXT NOT NULL,
            tone TEXT NOT NULL,
            duration_minutes TEXT,
            status TEXT NOT NULL DEFAULT 'draft',
            file_uploaded INTEGER NOT NULL DEFAULT 0,
            created_at TEXT DEFAULT (datetime('now')),
            updated_at TEXT DEFAULT (datetime('now')),
            FOREIGN KEY(user_id) REFERENCES users(id) ON DELETE CASCADE
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS podcast_scripts (
            id TEXT PRIMARY KEY,
            podcast_id TEXT NOT NULL,
            speaker TEXT,
            raw_text TEXT,
            final_text TEXT,
            created_at TEXT DEFAULT (datetime('now')),
            updated_at TEXT DEFAULT (datetime('now')),
            FOREIGN KEY(podcast_id) REFERENCES podcasts(id) ON DELETE CASCADE
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS podcast_files (
            id TEXT PRIMARY KEY,
            podcast_id TEXT NOT NULL,
            original_name TEXT NOT NULL,
            file_path TEXT NOT NULL,
            file_type TEXT NOT NULL,
            file_size INTEGER NOT NULL,
            created_at TEXT DEFAULT (datetime('now')),
            updated_at TEXT DEFAULT (datetime('now')),
            FOREIGN KEY(podcast_id) REFERENCES podcasts(id) ON DELETE CASCADE
        )
        "#,
    )
    .execute(pool)
    .await?;

    // "order" is unique per podcast; segments go away with either parent
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS podcast_audio_segments (
            id TEXT PRIMARY KEY,
            podcast_id TEXT NOT NULL,
            script_id TEXT NOT NULL,
            file_path TEXT NOT NULL,
            voice_id TEXT,
            "order" INTEGER NOT NULL DEFAULT 1 CHECK ("order" >= 0),
            duration TEXT,
            created_at TEXT DEFAULT (datetime('now')),
            updated_at TEXT DEFAULT (datetime('now')),
            UNIQUE(podcast_id, "order"),
            FOREIGN KEY(podcast_id) REFERENCES podcasts(id) ON DELETE CASCADE,
            FOREIGN KEY(script_id) REFERENCES podcast_scripts(id) ON DELETE CASCADE
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS podcast_outputs (
            id TEXT PRIMARY KEY,
            podcast_id TEXT NOT NULL,
            file_path TEXT NOT NULL,
            format TEXT NOT NULL DEFAULT 'mp3',
            duration TEXT,
            status TEXT NOT NULL DEFAULT 'pending',
            created_at TEXT DEFAULT (datetime('now')),
            updated_at TEXT DEFAULT (datetime('now')),
            FOREIGN KEY(podcast_id) REFERENCES podcasts(id) ON DELETE CASCADE
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_indexes(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    let indexes = [
        // A provider subject links to at most one account
        r#"CREATE UNIQUE INDEX IF NOT EXISTS idx_users_provider_identity
           ON users(provider, provider_id)
           WHERE provider IS NOT NULL AND provider_id IS NOT NULL"#,
        "CREATE INDEX IF NOT EXISTS idx_podcasts_user_created ON podcasts(user_id, created_at)",
        "CREATE INDEX IF NOT EXISTS idx_podcast_scripts_podcast ON podcast_scripts(podcast_id, created_at)",
        "CREATE INDEX IF NOT EXISTS idx_podcast_files_podcast ON podcast_files(podcast_id)",
        "CREATE INDEX IF NOT EXISTS idx_podcast_segments_script ON podcast_audio_segments(script_id)",
        "CREATE INDEX IF NOT EXISTS idx_podcast_outputs_podcast ON podcast_outputs(podcast_id)",
    ];

    for sql in indexes {
        sqlx::query(sql).execute(pool).await?;
    }

    Ok(())
}

#[cfg(test)]
pub(crate) async fn test_pool() -> SqlitePool {
    use sqlx::sqlite::SqlitePoolOptions;

    // A single connection keeps every query on the same in-memory database
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();

    run_migrations(&pool, false).await.unwrap();
    pool
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_migrations_are_idempotent() {
        let pool = test_pool().await;
        run_migrations(&pool, false).await.unwrap();
        run_migrations(&pool, true).await.unwrap();

        let tables: Vec<(String,)> = sqlx::query_as(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
        )
        .fetch_all(&pool)
        .await
        .unwrap();

        let names: Vec<&str> = tables.iter().map(|(n,)| n.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "podcast_audio_segments",
                "podcast_files",
                "podcast_outputs",
                "podcast_scripts",
                "podcasts",
                "users",
            ]
        );
    }

    #[tokio::test]
    async fn test_provider_identity_is_unique() {
        let pool = test_pool().await;

        sqlx::query(
            "INSERT INTO users (id, name, email, password, provider, provider_id) VALUES ('U_1', 'A', 'a@example.com', 'x', 'google', 'g-1')",
        )
        .execute(&pool)
        .await
        .unwrap();

        let dup = sqlx::query(
            "INSERT INTO users (id, name, email, password, provider, provider_id) VALUES ('U_2', 'B', 'b@example.com', 'x', 'google', 'g-1')",
        )
        .execute(&pool)
        .await;
        assert!(dup.is_err());

        // Unlinked accounts don't collide with each other
        for (id, email) in [("U_3", "c@example.com"), ("U_4", "d@example.com")] {
            sqlx::query("INSERT INTO users (id, name, email, password) VALUES (?, 'C', ?, 'x')")
                .bind(id)
                .bind(email)
                .execute(&pool)
                .await
                .unwrap();
        }
    }
}
