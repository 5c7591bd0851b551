use crate::config::Config;
use crate::db::repo::{AccountRepo, LinkRepo, ProfileRepo};
use crate::models::account::Account;
use crate::models::profile::UserSummary;
use crate::models::types::AccountId;
use crate::services::{ServiceError, ServiceResult};
use crate::state::session::SessionStore;
use std::sync::Arc;
use tracing::{error, info, warn};

pub struct AdminService {
    config: Arc<Config>,
    accounts: Arc<dyn AccountRepo>,
    profiles: Arc<dyn ProfileRepo>,
    links: Arc<dyn LinkRepo>,
    sessions: Arc<SessionStore>,
}

impl AdminService {
    pub fn new(
        config: Arc<Config>,
        accounts: Arc<dyn AccountRepo>,
        profiles: Arc<dyn ProfileRepo>,
        links: Arc<dyn LinkRepo>,
        sessions: Arc<SessionStore>,
    ) -> Self {
        Self {
            config,
            accounts,
            profiles,
            links,
            sessions,
        }
    }

    pub fn is_admin(&self, account: &Account) -> bool {
        self.config.is_admin_email(&account.email)
    }

    fn require_admin(&self, account: &Account) -> ServiceResult<()> {
        if self.is_admin(account) {
            return Ok(());
        }
        warn!(account = %account.id, "[AdminService] admin access denied");
        Err(ServiceError::Forbidden)
    }

    pub async fn list_users(&self, requester: &Account) -> ServiceResult<Vec<UserSummary>> {
        self.require_admin(requester)?;
        Ok(self.accounts.list_summaries().await?)
    }

    pub async fn delete_user(&self, requester: &Account, user_id: AccountId) -> ServiceResult<()> {
        self.require_admin(requester)?;
        if requester.id == user_id {
            return Err(ServiceError::Conflict("admins cannot delete their own account".into()));
        }
        self.purge_user(user_id).await
    }

    /// Removes links, then the profile, then the account, and ends its sessions.
    /// No permission check; callers decide who may do this.
    pub async fn purge_user(&self, user_id: AccountId) -> ServiceResult<()> {
        if self.accounts.get_by_id(user_id).await?.is_none() {
            return Err(ServiceError::NotFound { entity: "account" });
        }

        let removed_links = self.links.delete_for_user(user_id).await.map_err(|e| {
            error!(account = %user_id, error = %e, "[AdminService] failed to delete user links");
            e
        })?;
        self.profiles.delete_profile(user_id).await.map_err(|e| {
            error!(account = %user_id, error = %e, "[AdminService] failed to delete user profile");
            e
        })?;
        self.accounts.delete_account(user_id).await.map_err(|e| {
            error!(account = %user_id, error = %e, "[AdminService] failed to delete account");
            e
        })?;
        let sessions = self.sessions.revoke_account(user_id);

        info!(account = %user_id, removed_links, sessions, "[AdminService] user deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repo::MemoryRepository;
    use crate::models::link::NewLink;
    use crate::models::profile::Profile;

    struct Fixture {
        admin: AdminService,
        repo: Arc<MemoryRepository>,
        sessions: Arc<SessionStore>,
        root: Account,
        user: Account,
    }

    async fn fixture() -> Fixture {
        let repo = Arc::new(MemoryRepository::new());
        let sessions = Arc::new(SessionStore::default());
        let config = Arc::new(Config {
            admin_emails: vec!["root@example.com".into()],
            ..Config::default()
        });

        let root = repo
            .insert_account(Account::new("root@example.com".into(), "hash".into()))
            .await
            .unwrap();
        let user = repo
            .insert_account(Account::new("ada@example.com".into(), "hash".into()))
            .await
            .unwrap();
        repo.insert_profile(Profile::new(user.id, "ada".into(), None))
            .await
            .unwrap();
        repo.insert_link(NewLink {
            user_id: user.id,
            title: "Blog".into(),
            url: "https://example.com".into(),
            position: 0,
        })
        .await
        .unwrap();

        let admin = AdminService::new(config, repo.clone(), repo.clone(), repo.clone(), sessions.clone());
        Fixture {
            admin,
            repo,
            sessions,
            root,
            user,
        }
    }

    #[tokio::test]
    async fn non_admins_are_forbidden() {
        let fx = fixture().await;
        assert!(matches!(
            fx.admin.list_users(&fx.user).await,
            Err(ServiceError::Forbidden)
        ));
        assert!(matches!(
            fx.admin.delete_user(&fx.user, fx.root.id).await,
            Err(ServiceError::Forbidden)
        ));
    }

    #[tokio::test]
    async fn list_users_counts_links() {
        let fx = fixture().await;
        let users = fx.admin.list_users(&fx.root).await.unwrap();
        assert_eq!(users.len(), 2);

        let ada = users.iter().find(|u| u.id == fx.user.id).unwrap();
        assert_eq!(ada.username.as_deref(), Some("ada"));
        assert_eq!(ada.link_count, 1);
    }

    #[tokio::test]
    async fn delete_user_removes_everything() {
        let fx = fixture().await;
        let token = fx.sessions.create(fx.user.id);

        fx.admin.delete_user(&fx.root, fx.user.id).await.unwrap();

        assert!(AccountRepo::get_by_id(fx.repo.as_ref(), fx.user.id).await.unwrap().is_none());
        assert!(!fx.repo.username_exists("ada").await.unwrap());
        assert_eq!(fx.repo.count_for_user(fx.user.id).await.unwrap(), 0);
        assert!(fx.sessions.resolve(&token).is_none());

        assert!(matches!(
            fx.admin.delete_user(&fx.root, fx.user.id).await,
            Err(ServiceError::NotFound { entity: "account" })
        ));
        assert!(matches!(
            fx.admin.delete_user(&fx.root, fx.root.id).await,
            Err(ServiceError::Conflict(_))
        ));
    }
}
