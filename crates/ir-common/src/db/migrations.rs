use deadpool_postgres::PoolError;
use thiserror::Error;
use tokio_postgres::Error as PgError;
use tracing::{info, instrument};

use crate::db::PgPool;

#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("failed to get postgres connection: {0}")]
    Pool(#[from] PoolError),
    #[error("failed to run migration: {0}")]
    Postgres(#[from] PgError),
}

struct Migration {
    id: i32,
    description: &'static str,
    sql: &'static str,
}

const MIGRATIONS: &[Migration] = &[
    Migration {
        id: 1,
        description: "users, candidate profiles, skills, identity directory",
        sql: r#"
CREATE TABLE IF NOT EXISTS profile.users (
    id TEXT PRIMARY KEY,
    full_name TEXT,
    country TEXT,
    timezone TEXT,
    bio TEXT,
    phone TEXT,
    location TEXT,
    linkedin_url TEXT,
    github_url TEXT,
    avatar_url TEXT,
    revision_notes TEXT,
    created_at TIMESTAMPTZ DEFAULT NOW()
);

CREATE TABLE IF NOT EXISTS profile.candidate_profiles (
    id TEXT PRIMARY KEY,
    user_id TEXT,
    headline TEXT,
    bio TEXT,
    experience TEXT,
    portfolio_url TEXT,
    intro_video_url TEXT,
    status TEXT NOT NULL DEFAULT 'DRAFT',
    submitted_at TIMESTAMPTZ,
    revision_notes TEXT,
    profile_completion DOUBLE PRECISION DEFAULT 0,
    hourly_rate DOUBLE PRECISION,
    availability TEXT,
    hours_per_week INTEGER,
    is_ready BOOLEAN NOT NULL DEFAULT false,
    avatar_url TEXT,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at TIMESTAMPTZ
);

CREATE TABLE IF NOT EXISTS profile.skills (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS profile.candidate_skills (
    candidate_id TEXT NOT NULL REFERENCES profile.candidate_profiles(id) ON DELETE CASCADE,
    skill_id TEXT NOT NULL REFERENCES profile.skills(id) ON DELETE CASCADE,
    PRIMARY KEY (candidate_id, skill_id)
);

CREATE TABLE IF NOT EXISTS profile.identity_directory (
    id TEXT PRIMARY KEY,
    email TEXT NOT NULL
);
"#,
    },
    Migration {
        id: 2,
        description: "lookup indexes for link key, recency scan and email",
        sql: r#"
CREATE INDEX IF NOT EXISTS idx_candidate_profiles_user_id
    ON profile.candidate_profiles(user_id);
CREATE INDEX IF NOT EXISTS idx_candidate_profiles_recency
    ON profile.candidate_profiles(updated_at DESC NULLS LAST, id);
CREATE INDEX IF NOT EXISTS idx_identity_directory_email
    ON profile.identity_directory(lower(email));
"#,
    },
];

/// Highest migration id this build knows how to apply.
pub const SCHEMA_VERSION: i32 = MIGRATIONS[MIGRATIONS.len() - 1].id;

/// Highest applied migration id, `None` on an empty ledger.
pub async fn applied_schema_version(pool: &PgPool) -> Result<Option<i32>, MigrationError> {
    let client = pool.get().await?;
    let row = client
        .query_one("SELECT max(id) FROM profile.schema_migrations", &[])
        .await?;
    Ok(row.try_get(0)?)
}

#[instrument(skip(pool))]
pub async fn run_migrations(pool: &PgPool) -> Result<(), MigrationError> {
    let mut client = pool.get().await?;
    client
        .batch_execute(
            "CREATE SCHEMA IF NOT EXISTS profile;
             CREATE TABLE IF NOT EXISTS profile.schema_migrations (
                id INTEGER PRIMARY KEY,
                description TEXT NOT NULL,
                applied_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
             );",
        )
        .await?;

    for migration in MIGRATIONS {
        let applied: bool = client
            .query_one(
                "SELECT EXISTS (SELECT 1 FROM profile.schema_migrations WHERE id = $1)",
                &[&migration.id],
            )
            .await?
            .try_get(0)?;

        if applied {
            continue;
        }

        let tx = client.transaction().await?;
        tx.batch_execute(migration.sql).await?;
        tx.execute(
            "INSERT INTO profile.schema_migrations (id, description) VALUES ($1, $2)",
            &[&migration.id, &migration.description],
        )
        .await?;
        tx.commit().await?;

        info!(
            id = migration.id,
            description = migration.description,
            "migration_applied"
        );
    }

    Ok(())
}
