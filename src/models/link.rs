use crate::db::DbResult;
use crate::models::types::{AccountId, LinkId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio_postgres::Row;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Link {
    pub id: LinkId,
    /// Owner (profile/account id)
    pub user_id: AccountId,
    pub title: String,
    pub url: String,
    /// Zero-based display order within the owner's list
    pub position: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Link {
    pub fn try_from_row(row: &Row) -> DbResult<Self> {
        Ok(Self {
            id: row.try_get::<_, LinkId>("id")?,
            user_id: row.try_get::<_, AccountId>("user_id")?,
            title: row.try_get("title")?,
            url: row.try_get("url")?,
            position: row.try_get("position")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

/// A link that passed title/url normalization and is ready to be stored.
#[derive(Debug, Clone)]
pub struct NewLink {
    pub user_id: AccountId,
    pub title: String,
    pub url: String,
    pub position: i32,
}

impl NewLink {
    pub fn into_link(self) -> Link {
        let now = Utc::now();
        Link {
            id: LinkId::new(),
            user_id: self.user_id,
            title: self.title,
            url: self.url,
            position: self.position,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LinkChanges {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}
