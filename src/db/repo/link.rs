use crate::db::DbResult;
use crate::models::link::{Link, NewLink};
use crate::models::types::{AccountId, LinkId};

#[async_trait::async_trait]
pub trait LinkRepo: Send + Sync {
    /// All links of a user in display order
    async fn list_for_user(&self, user_id: AccountId) -> DbResult<Vec<Link>>;
    async fn get(&self, link_id: LinkId) -> DbResult<Option<Link>>;
    async fn count_for_user(&self, user_id: AccountId) -> DbResult<i64>;
    async fn insert_link(&self, link: NewLink) -> DbResult<Link>;
    /// Updates title and/or url. Values must already be normalized.
    async fn update_link(&self, link_id: LinkId, title: Option<&str>, url: Option<&str>) -> DbResult<Link>;
    async fn delete_link(&self, link_id: LinkId) -> DbResult<bool>;
    /// Sets `position` to the index in `ordered` for each link owned by `user_id`
    async fn set_positions(&self, user_id: AccountId, ordered: &[LinkId]) -> DbResult<()>;
    async fn delete_for_user(&self, user_id: AccountId) -> DbResult<u64>;
}
