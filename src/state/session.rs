use crate::models::types::AccountId;
use dashmap::DashMap;
use rand::Rng;
use rand::distr::Alphanumeric;
use std::time::Duration;
use tokio::time::Instant;

const TOKEN_LEN: usize = 48;
const CODE_LEN: usize = 32;

/// One-time codes handed to the OAuth callback expire after this long.
pub const CODE_TTL: Duration = Duration::from_secs(5 * 60);
pub const SESSION_TTL: Duration = Duration::from_secs(30 * 24 * 3600);

#[derive(Debug, Clone)]
pub struct Session {
    pub account_id: AccountId,
    pub expires: Instant,
}

#[derive(Debug, Clone)]
struct PendingCode {
    account_id: AccountId,
    expires: Instant,
}

/// Bearer sessions and one-time exchange codes, kept in memory. Restarting the
/// server logs everybody out.
pub struct SessionStore {
    sessions: DashMap<String, Session>,
    codes: DashMap<String, PendingCode>,
    code_ttl: Duration,
    session_ttl: Duration,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new(CODE_TTL, SESSION_TTL)
    }
}

fn random_token(len: usize) -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

impl SessionStore {
    pub fn new(code_ttl: Duration, session_ttl: Duration) -> Self {
        Self {
            sessions: DashMap::new(),
            codes: DashMap::new(),
            code_ttl,
            session_ttl,
        }
    }

    /// Starts a session for the account. Expired sessions are pruned on the way.
    pub fn create(&self, account_id: AccountId) -> String {
        let now = Instant::now();
        self.sessions.retain(|_, s| s.expires > now);

        let token = random_token(TOKEN_LEN);
        self.sessions.insert(
            token.clone(),
            Session {
                account_id,
                expires: now + self.session_ttl,
            },
        );
        token
    }

    pub fn resolve(&self, token: &str) -> Option<AccountId> {
        let now = Instant::now();
        let session = self.sessions.get(token).map(|s| s.value().clone())?;
        if session.expires > now {
            return Some(session.account_id);
        }
        self.sessions.remove_if(token, |_, s| s.expires <= now);
        None
    }

    /// Number of stored sessions, expired ones not yet pruned included.
    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    pub fn revoke(&self, token: &str) -> bool {
        self.sessions.remove(token).is_some()
    }

    /// Drops every session and pending code of an account. Returns the number of sessions removed.
    pub fn revoke_account(&self, account_id: AccountId) -> usize {
        let before = self.sessions.len();
        self.sessions.retain(|_, s| s.account_id != account_id);
        self.codes.retain(|_, c| c.account_id != account_id);
        before.saturating_sub(self.sessions.len())
    }

    pub fn issue_code(&self, account_id: AccountId) -> String {
        let now = Instant::now();
        self.codes.retain(|_, c| c.expires > now);

        let code = random_token(CODE_LEN);
        self.codes.insert(
            code.clone(),
            PendingCode {
                account_id,
                expires: now + self.code_ttl,
            },
        );
        code
    }

    /// Consumes a code. A code works at most once, and not after it expired.
    pub fn redeem_code(&self, code: &str) -> Option<AccountId> {
        let (_, pending) = self.codes.remove(code)?;
        (pending.expires > Instant::now()).then_some(pending.account_id)
    }
}
