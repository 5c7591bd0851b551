use crate::db::error::DbError;
use crate::db::repo::AccountRepo;
use crate::models::account::Account;
use crate::services::{ServiceError, ServiceResult};
use crate::state::session::SessionStore;
use argon2::Argon2;
use password_hash::rand_core::OsRng;
use password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub const MIN_PASSWORD_LEN: usize = 6;

/// Result of a successful sign-up or sign-in.
#[derive(Debug, Clone, Serialize)]
pub struct AuthGrant {
    pub account: Account,
    /// Bearer token for the API
    pub token: String,
    /// One-time code for `/auth/callback`
    pub code: String,
}

pub struct AuthService {
    repo: Arc<dyn AccountRepo>,
    sessions: Arc<SessionStore>,
    argon: Argon2<'static>,
}

/// Lowercases and trims an email, rejecting anything that is obviously not one.
pub fn normalize_email(input: &str) -> ServiceResult<String> {
    let email = input.trim().to_lowercase();
    let invalid = || ServiceError::Validation {
        field: "email",
        message: "Please enter a valid email address".into(),
    };

    let (local, domain) = email.split_once('@').ok_or_else(invalid)?;
    if local.is_empty()
        || domain.contains('@')
        || !domain.contains('.')
        || domain.starts_with('.')
        || domain.ends_with('.')
        || email.chars().any(char::is_whitespace)
    {
        return Err(invalid());
    }
    Ok(email)
}

impl AuthService {
    pub fn new(repo: Arc<dyn AccountRepo>, sessions: Arc<SessionStore>) -> Self {
        let argon = Argon2::default();
        Self { repo, sessions, argon }
    }

    pub async fn register(&self, email: &str, password: &str) -> ServiceResult<AuthGrant> {
        let email = normalize_email(email)?;
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(ServiceError::Validation {
                field: "password",
                message: format!("Password must be at least {MIN_PASSWORD_LEN} characters"),
            });
        }

        if self.repo.get_by_email(&email).await?.is_some() {
            return Err(ServiceError::Conflict("an account with this email already exists".into()));
        }

        let salt = SaltString::generate(&mut OsRng);
        let hash = self.argon.hash_password(password.as_bytes(), &salt)?.to_string();

        let account = match self.repo.insert_account(Account::new(email, hash)).await {
            Ok(account) => account,
            Err(DbError::UniqueViolation) => {
                return Err(ServiceError::Conflict("an account with this email already exists".into()));
            }
            Err(e) => return Err(e.into()),
        };

        info!(account = %account.id, "[AuthService] account registered");
        Ok(self.grant(account))
    }

    pub async fn login(&self, email: &str, password: &str) -> ServiceResult<AuthGrant> {
        let email = email.trim().to_lowercase();

        let Some(account) = self.repo.get_by_email(&email).await? else {
            warn!("[AuthService] login failed for '{}': not found", email);
            return Err(ServiceError::Unauthorized);
        };

        let parsed = PasswordHash::new(&account.password_hash)?;
        if self.argon.verify_password(password.as_bytes(), &parsed).is_err() {
            warn!("[AuthService] login failed for '{}': invalid password", email);
            return Err(ServiceError::Unauthorized);
        }

        self.repo.update_last_login(account.id).await?;
        Ok(self.grant(account))
    }

    pub fn logout(&self, token: &str) -> bool {
        self.sessions.revoke(token)
    }

    /// Resolves a bearer token to its account.
    pub async fn authenticate(&self, token: &str) -> ServiceResult<Account> {
        let account_id = self.sessions.resolve(token).ok_or(ServiceError::Unauthorized)?;
        match self.repo.get_by_id(account_id).await? {
            Some(account) => Ok(account),
            None => {
                // account was deleted while the session was alive
                self.sessions.revoke(token);
                Err(ServiceError::Unauthorized)
            }
        }
    }

    /// Trades a one-time code for the account and a fresh session token.
    pub async fn exchange_code(&self, code: &str) -> ServiceResult<(Account, String)> {
        let account_id = self.sessions.redeem_code(code).ok_or(ServiceError::Unauthorized)?;
        let account = self
            .repo
            .get_by_id(account_id)
            .await?
            .ok_or(ServiceError::Unauthorized)?;
        let token = self.sessions.create(account.id);
        Ok((account, token))
    }

    fn grant(&self, account: Account) -> AuthGrant {
        let token = self.sessions.create(account.id);
        let code = self.sessions.issue_code(account.id);
        debug!(account = %account.id, sessions = self.sessions.session_count(), "[AuthService] session started");
        AuthGrant { account, token, code }
    }
}
