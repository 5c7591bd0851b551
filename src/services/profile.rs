use crate::db::error::DbError;
use crate::db::repo::{LinkRepo, ProfileRepo};
use crate::models::profile::{Profile, ProfileChanges, PublicProfile};
use crate::models::types::AccountId;
use crate::services::{ServiceError, ServiceResult, UsernameService};
use linkbio_core::normalize_url;
use linkbio_core::username::sanitize;
use std::sync::Arc;
use tracing::info;

pub const MAX_DISPLAY_NAME_LEN: usize = 50;
pub const MAX_BIO_LEN: usize = 160;

pub struct ProfileService {
    usernames: Arc<UsernameService>,
    profiles: Arc<dyn ProfileRepo>,
    links: Arc<dyn LinkRepo>,
}

fn bounded(field: &'static str, label: &str, value: &str, max: usize) -> ServiceResult<String> {
    let value = value.trim();
    if value.chars().count() > max {
        return Err(ServiceError::Validation {
            field,
            message: format!("{label} must be {max} characters or less"),
        });
    }
    Ok(value.to_string())
}

impl ProfileService {
    pub fn new(usernames: Arc<UsernameService>, profiles: Arc<dyn ProfileRepo>, links: Arc<dyn LinkRepo>) -> Self {
        Self {
            usernames,
            profiles,
            links,
        }
    }

    pub fn usernames(&self) -> &UsernameService {
        &self.usernames
    }

    /// Creates the profile that goes with a fresh account.
    pub async fn setup(&self, account_id: AccountId, raw_username: &str, display_name: Option<&str>) -> ServiceResult<Profile> {
        if self.profiles.get_by_id(account_id).await?.is_some() {
            return Err(ServiceError::Conflict("profile already exists".into()));
        }

        let username = self.usernames.claimable(raw_username).await?;
        let display_name = match display_name.map(str::trim).filter(|d| !d.is_empty()) {
            Some(d) => bounded("display_name", "Display name", d, MAX_DISPLAY_NAME_LEN)?,
            None => username.to_string(),
        };

        let profile = Profile::new(account_id, username.to_string(), Some(display_name));
        match self.profiles.insert_profile(profile).await {
            Ok(profile) => {
                info!(account = %account_id, username = %profile.username, "[ProfileService] profile created");
                Ok(profile)
            }
            Err(DbError::UniqueViolation) => Err(ServiceError::UsernameTaken(username.into_inner())),
            Err(DbError::ForeignKey) => Err(ServiceError::NotFound { entity: "account" }),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn me(&self, account_id: AccountId) -> ServiceResult<Profile> {
        self.profiles
            .get_by_id(account_id)
            .await?
            .ok_or(ServiceError::NotFound { entity: "profile" })
    }

    /// Profile plus ordered links, looked up by the username in the address bar.
    pub async fn public(&self, username: &str) -> ServiceResult<PublicProfile> {
        let username = sanitize(username);
        let profile = self
            .profiles
            .get_by_username(&username)
            .await?
            .ok_or(ServiceError::NotFound { entity: "profile" })?;
        let links = self.links.list_for_user(profile.id).await?;
        Ok(PublicProfile { profile, links })
    }

    /// Checks and normalizes a change set against the current profile. Fields that
    /// would not change anything are dropped.
    pub async fn prepare(&self, current: &Profile, changes: ProfileChanges) -> ServiceResult<ProfileChanges> {
        let mut out = ProfileChanges::default();

        if let Some(raw) = changes.username {
            let sanitized = sanitize(&raw);
            if sanitized != current.username {
                out.username = Some(self.usernames.claimable(&raw).await?.into_inner());
            }
        }
        if let Some(d) = changes.display_name {
            out.display_name = Some(bounded("display_name", "Display name", &d, MAX_DISPLAY_NAME_LEN)?);
        }
        if let Some(b) = changes.bio {
            out.bio = Some(bounded("bio", "Bio", &b, MAX_BIO_LEN)?);
        }
        if let Some(a) = changes.avatar_url {
            let a = a.trim();
            // empty clears the picture
            out.avatar_url = Some(if a.is_empty() {
                String::new()
            } else {
                normalize_url(a).map_err(|e| ServiceError::Validation {
                    field: "avatar_url",
                    message: e.to_string(),
                })?
            });
        }
        if let Some(theme) = changes.theme_settings {
            if !theme.is_object() {
                return Err(ServiceError::Validation {
                    field: "theme_settings",
                    message: "theme settings must be an object".into(),
                });
            }
            out.theme_settings = Some(theme);
        }
        Ok(out)
    }

    pub async fn update(&self, account_id: AccountId, changes: ProfileChanges) -> ServiceResult<Profile> {
        let current = self.me(account_id).await?;
        let changes = self.prepare(&current, changes).await?;
        if changes.is_empty() {
            return Ok(current);
        }

        let renamed = changes.username.clone();
        match self.profiles.update_profile(account_id, &changes).await {
            Ok(profile) => Ok(profile),
            Err(DbError::UniqueViolation) => Err(ServiceError::UsernameTaken(renamed.unwrap_or_default())),
            Err(DbError::NotFound) => Err(ServiceError::NotFound { entity: "profile" }),
            Err(e) => Err(e.into()),
        }
    }
}
