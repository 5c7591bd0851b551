use crate::db::repo::account::AccountRepo;
use crate::db::{Db, DbResult, map_row_opt, map_rows};
use crate::models::account::Account;
use crate::models::profile::UserSummary;
use crate::models::types::AccountId;
use std::sync::Arc;
use tokio_postgres::Row;

pub struct AccountRepository {
    db: Arc<Db>,
}

impl AccountRepository {
    pub fn new(db: Arc<Db>) -> Self {
        Self { db }
    }
}

fn summary_from_row(row: &Row) -> DbResult<UserSummary> {
    Ok(UserSummary {
        id: row.try_get::<_, AccountId>("id")?,
        email: row.try_get("email")?,
        username: row.try_get("username")?,
        display_name: row.try_get("display_name")?,
        link_count: row.try_get("link_count")?,
        created_at: row.try_get("created_at")?,
    })
}

#[async_trait::async_trait]
impl AccountRepo for AccountRepository {
    async fn get_by_email(&self, email: &str) -> DbResult<Option<Account>> {
        let client = self.db.get_client().await?;

        let stmt = client
            .prepare_cached("SELECT * FROM accounts WHERE email = $1")
            .await?;

        let row_opt = client.query_opt(&stmt, &[&email]).await?;
        map_row_opt(row_opt, Account::try_from_row, "AccountRepo::get_by_email")
    }

    async fn get_by_id(&self, account_id: AccountId) -> DbResult<Option<Account>> {
        let client = self.db.get_client().await?;

        let stmt = client.prepare_cached("SELECT * FROM accounts WHERE id = $1").await?;

        let row_opt = client.query_opt(&stmt, &[&account_id]).await?;
        map_row_opt(
            row_opt,
            Account::try_from_row,
            &format!("AccountRepo::get_by_id id={}", account_id),
        )
    }

    async fn insert_account(&self, account: Account) -> DbResult<Account> {
        let client = self.db.get_client().await?;

        let stmt = client
            .prepare_cached(
                r#"
                INSERT INTO accounts (id, email, password_hash, created_at)
                VALUES ($1, $2, $3, $4)
                RETURNING *
                "#,
            )
            .await?;

        let row = client
            .query_one(
                &stmt,
                &[&account.id, &account.email, &account.password_hash, &account.created_at],
            )
            .await?;

        Account::try_from_row(&row)
    }

    async fn update_last_login(&self, account_id: AccountId) -> DbResult<()> {
        let client = self.db.get_client().await?;

        let stmt = client
            .prepare_cached("UPDATE accounts SET last_login = NOW() WHERE id = $1")
            .await?;
        client.execute(&stmt, &[&account_id]).await?;

        Ok(())
    }

    async fn delete_account(&self, account_id: AccountId) -> DbResult<bool> {
        let client = self.db.get_client().await?;

        let stmt = client.prepare_cached("DELETE FROM accounts WHERE id = $1").await?;
        let n = client.execute(&stmt, &[&account_id]).await?;

        Ok(n > 0)
    }

    async fn list_summaries(&self) -> DbResult<Vec<UserSummary>> {
        let client = self.db.get_client().await?;

        let stmt = client
            .prepare_cached(
                r#"
                SELECT a.id, a.email, a.created_at, p.username, p.display_name,
                       COUNT(l.id) AS link_count
                FROM accounts a
                LEFT JOIN profiles p ON p.id = a.id
                LEFT JOIN links l ON l.user_id = a.id
                GROUP BY a.id, a.email, a.created_at, p.username, p.display_name
                ORDER BY a.created_at DESC
                "#,
            )
            .await?;

        let rows = client.query(&stmt, &[]).await?;
        map_rows(&rows, summary_from_row, "AccountRepo::list_summaries")
    }
}
