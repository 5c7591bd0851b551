use crate::db::error::DbError;
use crate::db::repo::link::LinkRepo;
use crate::db::{Db, DbResult, map_row_opt, map_rows};
use crate::models::link::{Link, NewLink};
use crate::models::types::{AccountId, LinkId};
use std::sync::Arc;

pub struct LinkRepository {
    db: Arc<Db>,
}

impl LinkRepository {
    pub fn new(db: Arc<Db>) -> Self {
        Self { db }
    }
}

#[async_trait::async_trait]
impl LinkRepo for LinkRepository {
    async fn list_for_user(&self, user_id: AccountId) -> DbResult<Vec<Link>> {
        let client = self.db.get_client().await?;

        let stmt = client
            .prepare_cached("SELECT * FROM links WHERE user_id = $1 ORDER BY position, created_at")
            .await?;

        let rows = client.query(&stmt, &[&user_id]).await?;
        map_rows(&rows, Link::try_from_row, "LinkRepo::list_for_user")
    }

    async fn get(&self, link_id: LinkId) -> DbResult<Option<Link>> {
        let client = self.db.get_client().await?;

        let stmt = client.prepare_cached("SELECT * FROM links WHERE id = $1").await?;

        let row_opt = client.query_opt(&stmt, &[&link_id]).await?;
        map_row_opt(row_opt, Link::try_from_row, &format!("LinkRepo::get id={}", link_id))
    }

    async fn count_for_user(&self, user_id: AccountId) -> DbResult<i64> {
        let client = self.db.get_client().await?;

        let stmt = client
            .prepare_cached("SELECT COUNT(*) FROM links WHERE user_id = $1")
            .await?;

        let row = client.query_one(&stmt, &[&user_id]).await?;
        Ok(row.try_get(0)?)
    }

    async fn insert_link(&self, link: NewLink) -> DbResult<Link> {
        let link = link.into_link();
        let client = self.db.get_client().await?;

        let stmt = client
            .prepare_cached(
                r#"
                INSERT INTO links (id, user_id, title, url, position, created_at, updated_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                RETURNING *
                "#,
            )
            .await?;

        let row = client
            .query_one(
                &stmt,
                &[
                    &link.id,
                    &link.user_id,
                    &link.title,
                    &link.url,
                    &link.position,
                    &link.created_at,
                    &link.updated_at,
                ],
            )
            .await?;

        Link::try_from_row(&row)
    }

    async fn update_link(&self, link_id: LinkId, title: Option<&str>, url: Option<&str>) -> DbResult<Link> {
        let client = self.db.get_client().await?;

        let stmt = client
            .prepare_cached(
                r#"
                UPDATE links SET
                    title      = COALESCE($2, title),
                    url        = COALESCE($3, url),
                    updated_at = NOW()
                WHERE id = $1
                RETURNING *
                "#,
            )
            .await?;

        let row_opt = client.query_opt(&stmt, &[&link_id, &title, &url]).await?;
        map_row_opt(
            row_opt,
            Link::try_from_row,
            &format!("LinkRepo::update_link id={}", link_id),
        )?
        .ok_or(DbError::NotFound)
    }

    async fn delete_link(&self, link_id: LinkId) -> DbResult<bool> {
        let client = self.db.get_client().await?;

        let stmt = client.prepare_cached("DELETE FROM links WHERE id = $1").await?;
        let n = client.execute(&stmt, &[&link_id]).await?;

        Ok(n > 0)
    }

    async fn set_positions(&self, user_id: AccountId, ordered: &[LinkId]) -> DbResult<()> {
        let mut client = self.db.get_client().await?;
        let tx = client.transaction().await?;

        let stmt = tx
            .prepare_cached(
                "UPDATE links SET position = $1, updated_at = NOW() WHERE id = $2 AND user_id = $3",
            )
            .await?;

        for (position, link_id) in ordered.iter().enumerate() {
            let position = i32::try_from(position).map_err(|_| DbError::Decode("position overflow".into()))?;
            tx.execute(&stmt, &[&position, link_id, &user_id]).await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn delete_for_user(&self, user_id: AccountId) -> DbResult<u64> {
        let client = self.db.get_client().await?;

        let stmt = client.prepare_cached("DELETE FROM links WHERE user_id = $1").await?;
        Ok(client.execute(&stmt, &[&user_id]).await?)
    }
}
