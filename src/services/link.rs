use crate::db::repo::{LinkRepo, ProfileRepo};
use crate::models::link::{Link, LinkChanges, NewLink};
use crate::models::types::{AccountId, LinkId};
use crate::services::{ServiceError, ServiceResult};
use linkbio_core::{move_item, normalize_title, normalize_url};
use std::sync::Arc;
use tracing::debug;

pub struct LinkService {
    links: Arc<dyn LinkRepo>,
    profiles: Arc<dyn ProfileRepo>,
}

impl LinkService {
    pub fn new(links: Arc<dyn LinkRepo>, profiles: Arc<dyn ProfileRepo>) -> Self {
        Self { links, profiles }
    }

    pub async fn list(&self, account_id: AccountId) -> ServiceResult<Vec<Link>> {
        Ok(self.links.list_for_user(account_id).await?)
    }

    /// Appends a link at the end of the account's list.
    pub async fn add(&self, account_id: AccountId, title: &str, url: &str) -> ServiceResult<Link> {
        let title = normalize_title(title)?;
        let url = normalize_url(url)?;

        if self.profiles.get_by_id(account_id).await?.is_none() {
            return Err(ServiceError::NotFound { entity: "profile" });
        }

        let position = i32::try_from(self.links.count_for_user(account_id).await?)
            .map_err(|_| ServiceError::InvalidInput("too many links".into()))?;

        let link = self
            .links
            .insert_link(NewLink {
                user_id: account_id,
                title,
                url,
                position,
            })
            .await?;
        debug!(account = %account_id, link = %link.id, "[LinkService] link added");
        Ok(link)
    }

    pub async fn update(&self, account_id: AccountId, link_id: LinkId, changes: LinkChanges) -> ServiceResult<Link> {
        self.owned(account_id, link_id).await?;

        let title = changes.title.as_deref().map(normalize_title).transpose()?;
        let url = changes.url.as_deref().map(normalize_url).transpose()?;

        Ok(self.links.update_link(link_id, title.as_deref(), url.as_deref()).await?)
    }

    pub async fn delete(&self, account_id: AccountId, link_id: LinkId) -> ServiceResult<()> {
        self.owned(account_id, link_id).await?;
        self.links.delete_link(link_id).await?;

        // close the gap left behind
        let remaining: Vec<LinkId> = self.links.list_for_user(account_id).await?.iter().map(|l| l.id).collect();
        self.links.set_positions(account_id, &remaining).await?;
        Ok(())
    }

    /// Moves the link at index `from` to index `to` and renumbers the whole list 0..n.
    pub async fn reorder(&self, account_id: AccountId, from: usize, to: usize) -> ServiceResult<Vec<Link>> {
        let mut links = self.links.list_for_user(account_id).await?;
        move_item(&mut links, from, to)?;

        let ordered: Vec<LinkId> = links.iter().map(|l| l.id).collect();
        self.links.set_positions(account_id, &ordered).await?;

        for (position, link) in links.iter_mut().enumerate() {
            link.position = i32::try_from(position).map_err(|_| ServiceError::InvalidInput("too many links".into()))?;
        }
        Ok(links)
    }

    async fn owned(&self, account_id: AccountId, link_id: LinkId) -> ServiceResult<Link> {
        match self.links.get(link_id).await? {
            Some(link) if link.user_id == account_id => Ok(link),
            _ => Err(ServiceError::NotFound { entity: "link" }),
        }
    }
}
