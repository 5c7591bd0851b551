use crate::db::DbResult;
use crate::db::error::DbError;
use crate::db::repo::{AccountRepo, LinkRepo, ProfileRepo};
use crate::models::account::Account;
use crate::models::link::{Link, NewLink};
use crate::models::profile::{Profile, ProfileChanges, SitemapEntry, UserSummary};
use crate::models::types::{AccountId, LinkId};
use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

/// Process-local store implementing every repository trait. Used for tests and
/// for running the server without Postgres. Uniqueness of emails and usernames
/// is enforced with index maps that are claimed before the record is written.
#[derive(Default)]
pub struct MemoryRepository {
    accounts: DashMap<AccountId, Account>,
    emails: DashMap<String, AccountId>,
    profiles: DashMap<AccountId, Profile>,
    usernames: DashMap<String, AccountId>,
    links: DashMap<LinkId, Link>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claims `key` for `owner` in an index map; false if someone else holds it.
    fn claim(index: &DashMap<String, AccountId>, key: &str, owner: AccountId) -> bool {
        let holder = *index.entry(key.to_string()).or_insert(owner);
        holder == owner
    }

    fn links_of(&self, user_id: AccountId) -> Vec<Link> {
        let mut links: Vec<Link> = self
            .links
            .iter()
            .filter(|l| l.user_id == user_id)
            .map(|l| l.value().clone())
            .collect();
        links.sort_by(|a, b| a.position.cmp(&b.position).then(a.created_at.cmp(&b.created_at)));
        links
    }
}

#[async_trait]
impl AccountRepo for MemoryRepository {
    async fn get_by_email(&self, email: &str) -> DbResult<Option<Account>> {
        let Some(id) = self.emails.get(email).map(|e| *e.value()) else {
            return Ok(None);
        };
        Ok(self.accounts.get(&id).map(|a| a.value().clone()))
    }

    async fn get_by_id(&self, account_id: AccountId) -> DbResult<Option<Account>> {
        Ok(self.accounts.get(&account_id).map(|a| a.value().clone()))
    }

    async fn insert_account(&self, account: Account) -> DbResult<Account> {
        let Entry::Vacant(slot) = self.accounts.entry(account.id) else {
            return Err(DbError::UniqueViolation);
        };
        if !Self::claim(&self.emails, &account.email, account.id) {
            return Err(DbError::UniqueViolation);
        }
        slot.insert(account.clone());
        Ok(account)
    }

    async fn update_last_login(&self, account_id: AccountId) -> DbResult<()> {
        if let Some(mut account) = self.accounts.get_mut(&account_id) {
            account.last_login = Some(Utc::now());
        }
        Ok(())
    }

    async fn delete_account(&self, account_id: AccountId) -> DbResult<bool> {
        let Some((_, account)) = self.accounts.remove(&account_id) else {
            return Ok(false);
        };
        self.emails.remove(&account.email);

        // mirror the ON DELETE CASCADE of the schema
        if let Some((_, profile)) = self.profiles.remove(&account_id) {
            self.usernames.remove(&profile.username);
        }
        self.links.retain(|_, l| l.user_id != account_id);
        Ok(true)
    }

    async fn list_summaries(&self) -> DbResult<Vec<UserSummary>> {
        let accounts: Vec<Account> = self.accounts.iter().map(|a| a.value().clone()).collect();

        let mut out: Vec<UserSummary> = accounts
            .into_iter()
            .map(|account| {
                let profile = self.profiles.get(&account.id).map(|p| p.value().clone());
                let link_count = self.links.iter().filter(|l| l.user_id == account.id).count() as i64;
                UserSummary {
                    id: account.id,
                    email: account.email,
                    username: profile.as_ref().map(|p| p.username.clone()),
                    display_name: profile.and_then(|p| p.display_name),
                    link_count,
                    created_at: account.created_at,
                }
            })
            .collect();
        out.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(out)
    }
}

#[async_trait]
impl ProfileRepo for MemoryRepository {
    async fn get_by_id(&self, id: AccountId) -> DbResult<Option<Profile>> {
        Ok(self.profiles.get(&id).map(|p| p.value().clone()))
    }

    async fn get_by_username(&self, username: &str) -> DbResult<Option<Profile>> {
        let Some(id) = self.usernames.get(username).map(|e| *e.value()) else {
            return Ok(None);
        };
        Ok(self.profiles.get(&id).map(|p| p.value().clone()))
    }

    async fn username_exists(&self, username: &str) -> DbResult<bool> {
        Ok(self.usernames.contains_key(username))
    }

    async fn insert_profile(&self, profile: Profile) -> DbResult<Profile> {
        if !self.accounts.contains_key(&profile.id) {
            return Err(DbError::ForeignKey);
        }

        // the vacant slot stays locked until the username is claimed and the profile written
        let Entry::Vacant(slot) = self.profiles.entry(profile.id) else {
            return Err(DbError::UniqueViolation);
        };
        if !Self::claim(&self.usernames, &profile.username, profile.id) {
            return Err(DbError::UniqueViolation);
        }
        slot.insert(profile.clone());
        Ok(profile)
    }

    async fn update_profile(&self, id: AccountId, changes: &ProfileChanges) -> DbResult<Profile> {
        let Some(current) = self.profiles.get(&id).map(|p| p.value().clone()) else {
            return Err(DbError::NotFound);
        };

        if let Some(new_name) = changes.username.as_ref().filter(|n| **n != current.username) {
            if !Self::claim(&self.usernames, new_name, id) {
                return Err(DbError::UniqueViolation);
            }
            self.usernames.remove(&current.username);
        }

        let mut updated = current;
        updated.apply(changes);
        updated.updated_at = Utc::now();
        self.profiles.insert(id, updated.clone());
        Ok(updated)
    }

    async fn delete_profile(&self, id: AccountId) -> DbResult<bool> {
        let Some((_, profile)) = self.profiles.remove(&id) else {
            return Ok(false);
        };
        self.usernames.remove(&profile.username);
        self.links.retain(|_, l| l.user_id != id);
        Ok(true)
    }

    async fn sitemap_entries(&self) -> DbResult<Vec<SitemapEntry>> {
        let mut entries: Vec<SitemapEntry> = self
            .profiles
            .iter()
            .map(|p| SitemapEntry {
                username: p.username.clone(),
                updated_at: p.updated_at,
            })
            .collect();
        entries.sort_by(|a, b| a.username.cmp(&b.username));
        Ok(entries)
    }
}

#[async_trait]
impl LinkRepo for MemoryRepository {
    async fn list_for_user(&self, user_id: AccountId) -> DbResult<Vec<Link>> {
        Ok(self.links_of(user_id))
    }

    async fn get(&self, link_id: LinkId) -> DbResult<Option<Link>> {
        Ok(self.links.get(&link_id).map(|l| l.value().clone()))
    }

    async fn count_for_user(&self, user_id: AccountId) -> DbResult<i64> {
        Ok(self.links.iter().filter(|l| l.user_id == user_id).count() as i64)
    }

    async fn insert_link(&self, link: NewLink) -> DbResult<Link> {
        if !self.profiles.contains_key(&link.user_id) {
            return Err(DbError::ForeignKey);
        }
        let link = link.into_link();
        self.links.insert(link.id, link.clone());
        Ok(link)
    }

    async fn update_link(&self, link_id: LinkId, title: Option<&str>, url: Option<&str>) -> DbResult<Link> {
        let Some(mut link) = self.links.get_mut(&link_id) else {
            return Err(DbError::NotFound);
        };
        if let Some(title) = title {
            link.title = title.to_string();
        }
        if let Some(url) = url {
            link.url = url.to_string();
        }
        link.updated_at = Utc::now();
        Ok(link.value().clone())
    }

    async fn delete_link(&self, link_id: LinkId) -> DbResult<bool> {
        Ok(self.links.remove(&link_id).is_some())
    }

    async fn set_positions(&self, user_id: AccountId, ordered: &[LinkId]) -> DbResult<()> {
        let now = Utc::now();
        for (position, link_id) in ordered.iter().enumerate() {
            let Some(mut link) = self.links.get_mut(link_id) else {
                continue;
            };
            if link.user_id == user_id {
                link.position = i32::try_from(position).map_err(|_| DbError::Decode("position overflow".into()))?;
                link.updated_at = now;
            }
        }
        Ok(())
    }

    async fn delete_for_user(&self, user_id: AccountId) -> DbResult<u64> {
        let before = self.links.len();
        self.links.retain(|_, l| l.user_id != user_id);
        Ok((before - self.links.len()) as u64)
    }
}
