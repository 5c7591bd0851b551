use crate::db::error::DbError;
use crate::db::repo::profile::ProfileRepo;
use crate::db::{Db, DbResult, map_row_opt, map_rows};
use crate::models::profile::{Profile, ProfileChanges, SitemapEntry};
use crate::models::types::AccountId;
use std::sync::Arc;

pub struct ProfileRepository {
    db: Arc<Db>,
}

impl ProfileRepository {
    pub fn new(db: Arc<Db>) -> Self {
        Self { db }
    }
}

#[async_trait::async_trait]
impl ProfileRepo for ProfileRepository {
    async fn get_by_id(&self, id: AccountId) -> DbResult<Option<Profile>> {
        let client = self.db.get_client().await?;

        let stmt = client.prepare_cached("SELECT * FROM profiles WHERE id = $1").await?;

        let row_opt = client.query_opt(&stmt, &[&id]).await?;
        map_row_opt(
            row_opt,
            Profile::try_from_row,
            &format!("ProfileRepo::get_by_id id={}", id),
        )
    }

    async fn get_by_username(&self, username: &str) -> DbResult<Option<Profile>> {
        let client = self.db.get_client().await?;

        let stmt = client
            .prepare_cached("SELECT * FROM profiles WHERE username = $1")
            .await?;

        let row_opt = client.query_opt(&stmt, &[&username]).await?;
        map_row_opt(
            row_opt,
            Profile::try_from_row,
            &format!("ProfileRepo::get_by_username username={}", username),
        )
    }

    async fn username_exists(&self, username: &str) -> DbResult<bool> {
        let client = self.db.get_client().await?;

        let stmt = client
            .prepare_cached("SELECT EXISTS (SELECT 1 FROM profiles WHERE username = $1)")
            .await?;

        let row = client.query_one(&stmt, &[&username]).await?;
        Ok(row.try_get(0)?)
    }

    async fn insert_profile(&self, profile: Profile) -> DbResult<Profile> {
        let client = self.db.get_client().await?;

        let stmt = client
            .prepare_cached(
                r#"
                INSERT INTO profiles (id, username, display_name, bio, avatar_url, verified,
                                      theme_settings, created_at, updated_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
                RETURNING *
                "#,
            )
            .await?;

        let row = client
            .query_one(
                &stmt,
                &[
                    &profile.id,
                    &profile.username,
                    &profile.display_name,
                    &profile.bio,
                    &profile.avatar_url,
                    &profile.verified,
                    &profile.theme_settings,
                    &profile.created_at,
                    &profile.updated_at,
                ],
            )
            .await?;

        Profile::try_from_row(&row)
    }

    async fn update_profile(&self, id: AccountId, changes: &ProfileChanges) -> DbResult<Profile> {
        let client = self.db.get_client().await?;

        let stmt = client
            .prepare_cached(
                r#"
                UPDATE profiles SET
                    username       = COALESCE($2, username),
                    display_name   = COALESCE($3, display_name),
                    bio            = COALESCE($4, bio),
                    avatar_url     = COALESCE($5, avatar_url),
                    theme_settings = COALESCE($6, theme_settings),
                    updated_at     = NOW()
                WHERE id = $1
                RETURNING *
                "#,
            )
            .await?;

        let row_opt = client
            .query_opt(
                &stmt,
                &[
                    &id,
                    &changes.username,
                    &changes.display_name,
                    &changes.bio,
                    &changes.avatar_url,
                    &changes.theme_settings,
                ],
            )
            .await?;

        map_row_opt(
            row_opt,
            Profile::try_from_row,
            &format!("ProfileRepo::update_profile id={}", id),
        )?
        .ok_or(DbError::NotFound)
    }

    async fn delete_profile(&self, id: AccountId) -> DbResult<bool> {
        let client = self.db.get_client().await?;

        let stmt = client.prepare_cached("DELETE FROM profiles WHERE id = $1").await?;
        let n = client.execute(&stmt, &[&id]).await?;

        Ok(n > 0)
    }

    async fn sitemap_entries(&self) -> DbResult<Vec<SitemapEntry>> {
        let client = self.db.get_client().await?;

        let stmt = client
            .prepare_cached("SELECT username, updated_at FROM profiles ORDER BY username")
            .await?;

        let rows = client.query(&stmt, &[]).await?;
        map_rows(
            &rows,
            |row| {
                Ok(SitemapEntry {
                    username: row.try_get("username")?,
                    updated_at: row.try_get("updated_at")?,
                })
            },
            "ProfileRepo::sitemap_entries",
        )
    }
}
