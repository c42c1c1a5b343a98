//! Durable job storage with dedupe-aware bulk upsert.

use std::str::FromStr;

use anyhow::Context;
use jobsink_core::{Job, JobDraft, JobPatch};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqlitePool};
use thiserror::Error;
use tracing::{debug, warn};

pub const CRATE_NAME: &str = "jobsink-storage";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("no stored job with id {0}")]
    NotFound(String),
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

/// Store over one `jobs` table. The UNIQUE index on `job_id` is the
/// engine-level backstop behind every dedupe decision made here.
#[derive(Debug, Clone)]
pub struct JobStore {
    pool: SqlitePool,
}

impl JobStore {
    /// Opens (creating if missing) the database at `url` and applies the
    /// schema.
    pub async fn connect(url: &str) -> anyhow::Result<Self> {
        let options = SqliteConnectOptions::from_str(url)
            .with_context(|| format!("parsing database url {url}"))?
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .connect_with(options)
            .await
            .context("opening job database")?;
        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    /// In-memory store for tests. Single connection: the database lives and
    /// dies with it, so a larger pool would see empty schemas.
    pub async fn in_memory() -> anyhow::Result<Self> {
        let options =
            SqliteConnectOptions::from_str("sqlite::memory:").context("parsing memory url")?;
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .context("opening in-memory job database")?;
        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    async fn migrate(&self) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS jobs (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                job_title TEXT NOT NULL DEFAULT '',
                company_name TEXT NOT NULL DEFAULT '',
                location TEXT NOT NULL DEFAULT '',
                description TEXT NOT NULL DEFAULT '',
                date_posted TEXT NOT NULL DEFAULT '',
                job_type TEXT NOT NULL DEFAULT '',
                salary TEXT NOT NULL DEFAULT '',
                benefits TEXT NOT NULL DEFAULT '',
                application_link TEXT NOT NULL DEFAULT '',
                related_links TEXT NOT NULL DEFAULT '',
                job_id TEXT NOT NULL UNIQUE
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .context("creating jobs table")?;
        sqlx::query("CREATE INDEX IF NOT EXISTS idx_jobs_job_title ON jobs (job_title)")
            .execute(&self.pool)
            .await
            .context("creating job_title index")?;
        sqlx::query("CREATE INDEX IF NOT EXISTS idx_jobs_company_name ON jobs (company_name)")
            .execute(&self.pool)
            .await
            .context("creating company_name index")?;
        Ok(())
    }

    /// Inserts every draft whose `job_id` is not already stored, as one
    /// transaction, and returns how many rows were inserted.
    ///
    /// The existence check and the staged inserts are not atomic against
    /// other writers; the UNIQUE index closes that window. When a concurrent
    /// writer lands the same key between check and commit, the engine rejects
    /// the commit, the whole batch rolls back, and this call still returns
    /// normally; the duplicate batch simply isn't persisted.
    pub async fn bulk_upsert(&self, drafts: &[JobDraft]) -> Result<usize, StoreError> {
        match self.insert_missing(drafts).await {
            Ok(inserted) => {
                debug!(staged = drafts.len(), inserted, "bulk upsert committed");
                Ok(inserted)
            }
            Err(err) if is_unique_violation(&err) => {
                warn!(error = %err, "uniqueness race during bulk upsert; batch rolled back");
                Ok(0)
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn insert_missing(&self, drafts: &[JobDraft]) -> Result<usize, sqlx::Error> {
        let mut tx = self.pool.begin().await?;
        let mut inserted = 0usize;
        for draft in drafts {
            let existing = sqlx::query("SELECT id FROM jobs WHERE job_id = ?")
                .bind(&draft.job_id)
                .fetch_optional(&mut *tx)
                .await?;
            if existing.is_some() {
                continue;
            }
            sqlx::query(
                r#"
                INSERT INTO jobs (
                    job_title, company_name, location, description, date_posted,
                    job_type, salary, benefits, application_link, related_links, job_id
                )
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&draft.job_title)
            .bind(&draft.company_name)
            .bind(&draft.location)
            .bind(&draft.description)
            .bind(&draft.date_posted)
            .bind(&draft.job_type)
            .bind(&draft.salary)
            .bind(&draft.benefits)
            .bind(&draft.application_link)
            .bind(&draft.related_links)
            .bind(&draft.job_id)
            .execute(&mut *tx)
            .await?;
            inserted += 1;
        }
        tx.commit().await?;
        Ok(inserted)
    }

    pub async fn get_by_id(&self, job_id: &str) -> Result<Option<Job>, StoreError> {
        let row = sqlx::query("SELECT * FROM jobs WHERE job_id = ?")
            .bind(job_id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(|r| job_from_row(&r)).transpose().map_err(Into::into)
    }

    pub async fn get_all(&self) -> Result<Vec<Job>, StoreError> {
        let rows = sqlx::query("SELECT * FROM jobs ORDER BY id")
            .fetch_all(&self.pool)
            .await?;
        rows.iter()
            .map(job_from_row)
            .collect::<Result<Vec<_>, _>>()
            .map_err(Into::into)
    }

    /// Deletes the job with the given natural key. No-op when absent.
    pub async fn delete_by_id(&self, job_id: &str) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM jobs WHERE job_id = ?")
            .bind(job_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn delete_all(&self) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM jobs").execute(&self.pool).await?;
        Ok(())
    }

    /// Replaces the fields set in `patch`, leaving the rest untouched.
    /// Fails with [`StoreError::NotFound`] when no row has this `job_id`.
    pub async fn update(&self, job_id: &str, patch: &JobPatch) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE jobs SET
                job_title = COALESCE(?, job_title),
                company_name = COALESCE(?, company_name),
                location = COALESCE(?, location),
                description = COALESCE(?, description),
                date_posted = COALESCE(?, date_posted),
                job_type = COALESCE(?, job_type),
                salary = COALESCE(?, salary),
                benefits = COALESCE(?, benefits),
                application_link = COALESCE(?, application_link),
                related_links = COALESCE(?, related_links)
            WHERE job_id = ?
            "#,
        )
        .bind(&patch.job_title)
        .bind(&patch.company_name)
        .bind(&patch.location)
        .bind(&patch.description)
        .bind(&patch.date_posted)
        .bind(&patch.job_type)
        .bind(&patch.salary)
        .bind(&patch.benefits)
        .bind(&patch.application_link)
        .bind(&patch.related_links)
        .bind(job_id)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(job_id.to_string()));
        }
        Ok(())
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db) => db.is_unique_violation(),
        _ => false,
    }
}

fn job_from_row(row: &SqliteRow) -> Result<Job, sqlx::Error> {
    Ok(Job {
        id: row.try_get("id")?,
        job_title: row.try_get("job_title")?,
        company_name: row.try_get("company_name")?,
        location: row.try_get("location")?,
        description: row.try_get("description")?,
        date_posted: row.try_get("date_posted")?,
        job_type: row.try_get("job_type")?,
        salary: row.try_get("salary")?,
        benefits: row.try_get("benefits")?,
        application_link: row.try_get("application_link")?,
        related_links: row.try_get("related_links")?,
        job_id: row.try_get("job_id")?,
    })
}
