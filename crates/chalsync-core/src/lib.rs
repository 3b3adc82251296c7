//! Core domain model for chalsync.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const CRATE_NAME: &str = "chalsync-core";

/// Parsed handoff contract from the problem scanner into the synchronizer.
///
/// One draft per qualifying markdown file. `title` is the filename stem and
/// the synchronization key; every other field comes from the file's front
/// matter (absent key resolves to `None`) except `description`, which holds
/// the fully transformed file text with the front-matter block still in it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChallengeDraft {
    pub title: String,
    pub full_title: Option<String>,
    pub author: Option<String>,
    pub course: Option<String>,
    pub week: Option<String>,
    pub topics: Option<Vec<String>>,
    pub description: String,
}

impl ChallengeDraft {
    /// Projects the mutable fields onto an update payload. The key field
    /// (`title`) deliberately has no path into a [`ChallengeUpdate`].
    pub fn to_update(&self) -> ChallengeUpdate {
        ChallengeUpdate {
            full_title: self.full_title.clone(),
            author: self.author.clone(),
            course: self.course.clone(),
            week: self.week.clone(),
            topics: self.topics.clone(),
            description: self.description.clone(),
        }
    }
}

/// The set of fields a sync run is allowed to overwrite on an existing
/// record. `title` is immutable once created and `id`/`created_at` belong to
/// the store, so none of them appear here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChallengeUpdate {
    pub full_title: Option<String>,
    pub author: Option<String>,
    pub course: Option<String>,
    pub week: Option<String>,
    pub topics: Option<Vec<String>>,
    pub description: String,
}

/// Canonical persisted challenge record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Challenge {
    pub id: Uuid,
    pub title: String,
    pub full_title: Option<String>,
    pub author: Option<String>,
    pub course: Option<String>,
    pub week: Option<String>,
    pub topics: Option<Vec<String>>,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
