use crate::db::DbResult;
use crate::models::types::AccountId;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio_postgres::Row;

#[derive(Debug, Clone, Serialize)]
pub struct Account {
    /// Unique Account ID, also the id of the profile (if any)
    pub id: AccountId,
    /// Email address used to sign in (distinct, lowercased)
    pub email: String,
    /// Hashed password (argon)
    #[serde(skip_serializing)]
    pub password_hash: String,
    /// Account creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last login timestamp
    pub last_login: Option<DateTime<Utc>>,
}

impl Account {
    pub fn new(email: String, password_hash: String) -> Self {
        Self {
            id: AccountId::new(),
            email,
            password_hash,
            created_at: Utc::now(),
            last_login: None,
        }
    }

    pub fn try_from_row(row: &Row) -> DbResult<Self> {
        Ok(Self {
            id: row.try_get::<_, AccountId>("id")?,
            email: row.try_get("email")?,
            password_hash: row.try_get("password_hash")?,
            created_at: row.try_get("created_at")?,
            last_login: row.try_get("last_login")?,
        })
    }
}
