use crate::db::DbResult;
use crate::models::account::Account;
use crate::models::profile::UserSummary;
use crate::models::types::AccountId;

#[async_trait::async_trait]
pub trait AccountRepo: Send + Sync {
    /// Looks up an account by its (lowercased) email address
    async fn get_by_email(&self, email: &str) -> DbResult<Option<Account>>;
    async fn get_by_id(&self, account_id: AccountId) -> DbResult<Option<Account>>;
    /// Stores a new account. A taken email surfaces as `DbError::UniqueViolation`.
    async fn insert_account(&self, account: Account) -> DbResult<Account>;
    async fn update_last_login(&self, account_id: AccountId) -> DbResult<()>;
    /// Returns false when there was nothing to delete
    async fn delete_account(&self, account_id: AccountId) -> DbResult<bool>;
    /// Every account with its profile (if claimed) and number of links, newest first
    async fn list_summaries(&self) -> DbResult<Vec<UserSummary>>;
}
