//! Persistence layer for challenge records.
//!
//! The sync pipeline only ever talks to the [`ChallengeStore`] trait:
//! `find_by_title` / `create` / `update`. Postgres backs the real thing;
//! [`MemoryChallengeStore`] backs tests.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use thiserror::Error;
use tokio::sync::Mutex;
use uuid::Uuid;

use chalsync_core::{Challenge, ChallengeDraft, ChallengeUpdate};

pub const CRATE_NAME: &str = "chalsync-storage";

#[derive(Debug, Error)]
pub enum StoreError {
    /// The unique constraint on `title` rejected a create. Callers treat
    /// this as "someone else won the insert race", not as a failure.
    #[error("a challenge titled `{0}` already exists")]
    DuplicateTitle(String),
    #[error(transparent)]
    Database(#[from] sqlx::Error),
    #[error("running database migrations: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),
}

/// Persistence contract for challenge records.
///
/// `update` takes the immutable `title` key plus an explicit
/// [`ChallengeUpdate`] payload, so the key column can never be rewritten by
/// a sync run.
#[async_trait]
pub trait ChallengeStore: Send + Sync {
    async fn find_by_title(&self, title: &str) -> Result<Option<Challenge>, StoreError>;
    async fn create(&self, draft: &ChallengeDraft) -> Result<Challenge, StoreError>;
    async fn update(&self, title: &str, update: &ChallengeUpdate) -> Result<(), StoreError>;
}

/// Postgres-backed store.
#[derive(Debug, Clone)]
pub struct PgChallengeStore {
    pool: PgPool,
}

impl PgChallengeStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let pool = PgPool::connect(database_url).await?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Applies the embedded migrations (the `challenges` table and its
    /// unique `title` constraint).
    pub async fn run_migrations(&self) -> Result<(), StoreError> {
        sqlx::migrate!().run(&self.pool).await?;
        tracing::debug!("challenge schema migrations applied");
        Ok(())
    }
}

fn row_to_challenge(row: &PgRow) -> Result<Challenge, sqlx::Error> {
    Ok(Challenge {
        id: row.try_get("id")?,
        title: row.try_get("title")?,
        full_title: row.try_get("full_title")?,
        author: row.try_get("author")?,
        course: row.try_get("course")?,
        week: row.try_get("week")?,
        topics: row.try_get("topics")?,
        description: row.try_get("description")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

#[async_trait]
impl ChallengeStore for PgChallengeStore {
    async fn find_by_title(&self, title: &str) -> Result<Option<Challenge>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT id, title, full_title, author, course, week, topics,
                   description, created_at, updated_at
              FROM challenges
             WHERE title = $1
            "#,
        )
        .bind(title)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(row_to_challenge).transpose().map_err(StoreError::from)
    }

    async fn create(&self, draft: &ChallengeDraft) -> Result<Challenge, StoreError> {
        let now = Utc::now();
        let challenge = Challenge {
            id: Uuid::new_v4(),
            title: draft.title.clone(),
            full_title: draft.full_title.clone(),
            author: draft.author.clone(),
            course: draft.course.clone(),
            week: draft.week.clone(),
            topics: draft.topics.clone(),
            description: draft.description.clone(),
            created_at: now,
            updated_at: now,
        };

        let result = sqlx::query(
            r#"
            INSERT INTO challenges
                (id, title, full_title, author, course, week, topics,
                 description, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(challenge.id)
        .bind(&challenge.title)
        .bind(&challenge.full_title)
        .bind(&challenge.author)
        .bind(&challenge.course)
        .bind(&challenge.week)
        .bind(&challenge.topics)
        .bind(&challenge.description)
        .bind(challenge.created_at)
        .bind(challenge.updated_at)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(challenge),
            Err(err) => {
                if err
                    .as_database_error()
                    .is_some_and(|db| db.is_unique_violation())
                {
                    return Err(StoreError::DuplicateTitle(draft.title.clone()));
                }
                Err(err.into())
            }
        }
    }

    async fn update(&self, title: &str, update: &ChallengeUpdate) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            UPDATE challenges
               SET full_title = $2,
                   author = $3,
                   course = $4,
                   week = $5,
                   topics = $6,
                   description = $7,
                   updated_at = $8
             WHERE title = $1
            "#,
        )
        .bind(title)
        .bind(&update.full_title)
        .bind(&update.author)
        .bind(&update.course)
        .bind(&update.week)
        .bind(&update.topics)
        .bind(&update.description)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

/// In-memory store with the same uniqueness semantics as the Postgres one.
/// Used by pipeline tests; never by the CLI.
#[derive(Debug, Default)]
pub struct MemoryChallengeStore {
    records: Mutex<BTreeMap<String, Challenge>>,
}

impl MemoryChallengeStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.records.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.lock().await.is_empty()
    }
}

#[async_trait]
impl ChallengeStore for MemoryChallengeStore {
    async fn find_by_title(&self, title: &str) -> Result<Option<Challenge>, StoreError> {
        Ok(self.records.lock().await.get(title).cloned())
    }

    async fn create(&self, draft: &ChallengeDraft) -> Result<Challenge, StoreError> {
        let mut records = self.records.lock().await;
        if records.contains_key(&draft.title) {
            return Err(StoreError::DuplicateTitle(draft.title.clone()));
        }
        let now = Utc::now();
        let challenge = Challenge {
            id: Uuid::new_v4(),
            title: draft.title.clone(),
            full_title: draft.full_title.clone(),
            author: draft.author.clone(),
            course: draft.course.clone(),
            week: draft.week.clone(),
            topics: draft.topics.clone(),
            description: draft.description.clone(),
            created_at: now,
            updated_at: now,
        };
        records.insert(challenge.title.clone(), challenge.clone());
        Ok(challenge)
    }

    async fn update(&self, title: &str, update: &ChallengeUpdate) -> Result<(), StoreError> {
        let mut records = self.records.lock().await;
        if let Some(existing) = records.get_mut(title) {
            existing.full_title = update.full_title.clone();
            existing.author = update.author.clone();
            existing.course = update.course.clone();
            existing.week = update.week.clone();
            existing.topics = update.topics.clone();
            existing.description = update.description.clone();
            existing.updated_at = Utc::now();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft(title: &str, author: Option<&str>) -> ChallengeDraft {
        ChallengeDraft {
            title: title.to_string(),
            full_title: None,
            author: author.map(ToString::to_string),
            course: None,
            week: None,
            topics: None,
            description: format!("description of {title}"),
        }
    }

    #[tokio::test]
    async fn create_then_find_round_trips() {
        let store = MemoryChallengeStore::new();
        let created = store.create(&draft("foo", Some("ada"))).await.expect("create");

        let found = store
            .find_by_title("foo")
            .await
            .expect("find")
            .expect("present");
        assert_eq!(found, created);
        assert!(store.find_by_title("bar").await.expect("find").is_none());
    }

    #[tokio::test]
    async fn second_create_with_same_title_is_a_duplicate() {
        let store = MemoryChallengeStore::new();
        store.create(&draft("foo", None)).await.expect("create");

        let err = store.create(&draft("foo", None)).await.expect_err("conflict");
        assert!(matches!(err, StoreError::DuplicateTitle(title) if title == "foo"));
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn update_overwrites_fields_but_never_the_key() {
        let store = MemoryChallengeStore::new();
        let created = store.create(&draft("foo", Some("ada"))).await.expect("create");

        let newer = draft("foo", Some("grace"));
        store
            .update("foo", &newer.to_update())
            .await
            .expect("update");

        let found = store
            .find_by_title("foo")
            .await
            .expect("find")
            .expect("present");
        assert_eq!(found.author.as_deref(), Some("grace"));
        assert_eq!(found.title, "foo");
        assert_eq!(found.id, created.id);
        assert_eq!(found.created_at, created.created_at);
    }
}
