use crate::db::DbResult;
use crate::models::link::Link;
use crate::models::types::AccountId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio_postgres::Row;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Profile {
    /// Same id as the owning account
    pub id: AccountId,
    /// Canonical username (unique)
    pub username: String,
    pub display_name: Option<String>,
    pub bio: Option<String>,
    pub avatar_url: Option<String>,
    /// Set by an admin, shown as a badge
    pub verified: bool,
    /// Opaque theme blob owned by the frontend
    pub theme_settings: Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Profile {
    pub fn new(id: AccountId, username: String, display_name: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            id,
            username,
            display_name,
            bio: None,
            avatar_url: None,
            verified: false,
            theme_settings: Value::Object(Default::default()),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn try_from_row(row: &Row) -> DbResult<Self> {
        Ok(Self {
            id: row.try_get::<_, AccountId>("id")?,
            username: row.try_get("username")?,
            display_name: row.try_get("display_name")?,
            bio: row.try_get("bio")?,
            avatar_url: row.try_get("avatar_url")?,
            verified: row.try_get("verified")?,
            theme_settings: row.try_get("theme_settings")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    /// Applies a set of changes in place. Does not touch `updated_at`.
    pub fn apply(&mut self, changes: &ProfileChanges) {
        if let Some(username) = &changes.username {
            self.username = username.clone();
        }
        if let Some(display_name) = &changes.display_name {
            self.display_name = Some(display_name.clone());
        }
        if let Some(bio) = &changes.bio {
            self.bio = Some(bio.clone());
        }
        if let Some(avatar_url) = &changes.avatar_url {
            self.avatar_url = Some(avatar_url.clone());
        }
        if let Some(theme) = &changes.theme_settings {
            self.theme_settings = theme.clone();
        }
    }
}

/// Partial profile update. `None` leaves a field alone.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfileChanges {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub theme_settings: Option<Value>,
}

impl ProfileChanges {
    pub fn is_empty(&self) -> bool {
        self.username.is_none()
            && self.display_name.is_none()
            && self.bio.is_none()
            && self.avatar_url.is_none()
            && self.theme_settings.is_none()
    }

    /// Folds `newer` on top of `self`; fields set in `newer` win.
    pub fn merge(&mut self, newer: ProfileChanges) {
        if newer.username.is_some() {
            self.username = newer.username;
        }
        if newer.display_name.is_some() {
            self.display_name = newer.display_name;
        }
        if newer.bio.is_some() {
            self.bio = newer.bio;
        }
        if newer.avatar_url.is_some() {
            self.avatar_url = newer.avatar_url;
        }
        if newer.theme_settings.is_some() {
            self.theme_settings = newer.theme_settings;
        }
    }
}

/// What visitors of `/{username}` get to see.
#[derive(Debug, Clone, Serialize)]
pub struct PublicProfile {
    pub profile: Profile,
    pub links: Vec<Link>,
}

/// One row for the sitemap: the username and when it last changed.
#[derive(Debug, Clone)]
pub struct SitemapEntry {
    pub username: String,
    pub updated_at: DateTime<Utc>,
}

/// Row of the admin user listing.
#[derive(Debug, Clone, Serialize)]
pub struct UserSummary {
    pub id: AccountId,
    pub email: String,
    pub username: Option<String>,
    pub display_name: Option<String>,
    pub link_count: i64,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_keeps_latest_value_per_field() {
        let mut pending = ProfileChanges {
            bio: Some("first".into()),
            display_name: Some("Ada".into()),
            ..Default::default()
        };
        pending.merge(ProfileChanges {
            bio: Some("second".into()),
            ..Default::default()
        });

        assert_eq!(pending.bio.as_deref(), Some("second"));
        assert_eq!(pending.display_name.as_deref(), Some("Ada"));
        assert!(pending.username.is_none());
    }

    #[test]
    fn apply_only_touches_set_fields() {
        let mut p = Profile::new(AccountId::new(), "ada".into(), Some("Ada".into()));
        p.apply(&ProfileChanges {
            bio: Some("hello".into()),
            ..Default::default()
        });
        assert_eq!(p.bio.as_deref(), Some("hello"));
        assert_eq!(p.display_name.as_deref(), Some("Ada"));
        assert_eq!(p.username, "ada");
        assert!(ProfileChanges::default().is_empty());
    }
}
