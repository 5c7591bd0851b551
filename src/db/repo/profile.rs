use crate::db::DbResult;
use crate::models::profile::{Profile, ProfileChanges, SitemapEntry};
use crate::models::types::AccountId;

#[async_trait::async_trait]
pub trait ProfileRepo: Send + Sync {
    async fn get_by_id(&self, id: AccountId) -> DbResult<Option<Profile>>;
    async fn get_by_username(&self, username: &str) -> DbResult<Option<Profile>>;
    /// Uniqueness lookup for a canonical username
    async fn username_exists(&self, username: &str) -> DbResult<bool>;
    /// Stores a new profile. A username (or id) that is already taken surfaces
    /// as `DbError::UniqueViolation`, which is how racing claims are settled.
    async fn insert_profile(&self, profile: Profile) -> DbResult<Profile>;
    /// Applies the changes and bumps `updated_at`. `DbError::NotFound` if there is no profile.
    async fn update_profile(&self, id: AccountId, changes: &ProfileChanges) -> DbResult<Profile>;
    async fn delete_profile(&self, id: AccountId) -> DbResult<bool>;
    /// All usernames ordered alphabetically
    async fn sitemap_entries(&self) -> DbResult<Vec<SitemapEntry>>;
}
