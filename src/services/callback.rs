use crate::db::repo::ProfileRepo;
use crate::services::AuthService;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, warn};

pub const AUTH_ERROR_PATH: &str = "/auth/auth-error";
pub const SETUP_PROFILE_PATH: &str = "/auth/setup-profile";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthFlow {
    Signup,
    Signin,
}

impl AuthFlow {
    /// Unknown or missing values count as a sign-in.
    pub fn from_param(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some(v) if v.eq_ignore_ascii_case("signup") => AuthFlow::Signup,
            _ => AuthFlow::Signin,
        }
    }
}

/// Query string of `/auth/callback`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub flow: Option<String>,
    pub next: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackRedirect {
    /// No code at all: continue to the requested page
    Next(String),
    AuthError,
    SetupProfile,
    Profile(String),
}

impl CallbackRedirect {
    pub fn path(&self) -> String {
        match self {
            CallbackRedirect::Next(next) => next.clone(),
            CallbackRedirect::AuthError => AUTH_ERROR_PATH.to_string(),
            CallbackRedirect::SetupProfile => SETUP_PROFILE_PATH.to_string(),
            CallbackRedirect::Profile(username) => format!("/{username}"),
        }
    }

    /// Absolute location on `origin`.
    pub fn location(&self, origin: &str) -> String {
        format!("{}{}", origin.trim_end_matches('/'), self.path())
    }
}

#[derive(Debug, Clone)]
pub struct CallbackOutcome {
    pub redirect: CallbackRedirect,
    /// Session created by a successful code exchange
    pub session: Option<String>,
}

/// Only same-site relative paths are followed; everything else goes to `/`.
/// Control and non-ASCII characters are refused since the result ends up in a `Location` header.
pub fn safe_next(next: Option<&str>) -> String {
    match next.map(str::trim) {
        Some(n)
            if n.starts_with('/')
                && !n.starts_with("//")
                && !n.contains('\\')
                && n.chars().all(|c| c.is_ascii() && !c.is_ascii_control()) =>
        {
            n.to_string()
        }
        _ => "/".to_string(),
    }
}

pub struct CallbackService {
    auth: Arc<AuthService>,
    profiles: Arc<dyn ProfileRepo>,
}

impl CallbackService {
    pub fn new(auth: Arc<AuthService>, profiles: Arc<dyn ProfileRepo>) -> Self {
        Self { auth, profiles }
    }

    /// Decides where the browser goes after the identity provider sent it back.
    /// Failures never surface as errors, only as a redirect to the error page.
    pub async fn handle(&self, params: &CallbackParams) -> CallbackOutcome {
        let flow = AuthFlow::from_param(params.flow.as_deref());

        let Some(code) = params.code.as_deref().filter(|c| !c.trim().is_empty()) else {
            return CallbackOutcome {
                redirect: CallbackRedirect::Next(safe_next(params.next.as_deref())),
                session: None,
            };
        };

        let (account, token) = match self.auth.exchange_code(code.trim()).await {
            Ok(pair) => pair,
            Err(e) => {
                warn!(error = %e, "[CallbackService] code exchange failed");
                return CallbackOutcome {
                    redirect: CallbackRedirect::AuthError,
                    session: None,
                };
            }
        };

        let redirect = match self.profiles.get_by_id(account.id).await {
            Ok(Some(profile)) => {
                info!(account = %account.id, ?flow, username = %profile.username, "[CallbackService] signed in");
                CallbackRedirect::Profile(profile.username)
            }
            Ok(None) => CallbackRedirect::SetupProfile,
            Err(e) => {
                warn!(error = %e, "[CallbackService] profile lookup failed");
                self.auth.logout(&token);
                return CallbackOutcome {
                    redirect: CallbackRedirect::AuthError,
                    session: None,
                };
            }
        };

        CallbackOutcome {
            redirect,
            session: Some(token),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::DbResult;
    use crate::db::error::DbError;
    use crate::db::repo::MemoryRepository;
    use crate::models::profile::{Profile, ProfileChanges, SitemapEntry};
    use crate::models::types::AccountId;
    use crate::state::session::SessionStore;
    use async_trait::async_trait;

    /// Profile store that is down.
    struct Unreachable;

    #[async_trait]
    impl ProfileRepo for Unreachable {
        async fn get_by_id(&self, _: AccountId) -> DbResult<Option<Profile>> {
            Err(DbError::Decode("connection reset".into()))
        }
        async fn get_by_username(&self, _: &str) -> DbResult<Option<Profile>> {
            Ok(None)
        }
        async fn username_exists(&self, _: &str) -> DbResult<bool> {
            Ok(false)
        }
        async fn insert_profile(&self, p: Profile) -> DbResult<Profile> {
            Ok(p)
        }
        async fn update_profile(&self, _: AccountId, _: &ProfileChanges) -> DbResult<Profile> {
            Err(DbError::NotFound)
        }
        async fn delete_profile(&self, _: AccountId) -> DbResult<bool> {
            Ok(false)
        }
        async fn sitemap_entries(&self) -> DbResult<Vec<SitemapEntry>> {
            Ok(Vec::new())
        }
    }

    struct Fixture {
        repo: Arc<MemoryRepository>,
        auth: Arc<AuthService>,
        callback: CallbackService,
    }

    fn fixture() -> Fixture {
        let repo = Arc::new(MemoryRepository::new());
        let auth = Arc::new(AuthService::new(repo.clone(), Arc::new(SessionStore::default())));
        let callback = CallbackService::new(auth.clone(), repo.clone());
        Fixture { repo, auth, callback }
    }

    fn params(code: Option<&str>, flow: Option<&str>, next: Option<&str>) -> CallbackParams {
        CallbackParams {
            code: code.map(Into::into),
            flow: flow.map(Into::into),
            next: next.map(Into::into),
        }
    }

    #[test]
    fn next_must_be_relative() {
        assert_eq!(safe_next(None), "/");
        assert_eq!(safe_next(Some("/dashboard")), "/dashboard");
        assert_eq!(safe_next(Some("https://evil.example")), "/");
        assert_eq!(safe_next(Some("//evil.example")), "/");
        assert_eq!(safe_next(Some("/\\evil.example")), "/");
        assert_eq!(safe_next(Some("/a\nb")), "/");
        assert_eq!(safe_next(Some("/a\r\nSet-Cookie: x=1")), "/");
        assert_eq!(safe_next(Some("/tab\there")), "/");
        assert_eq!(safe_next(Some("/caf\u{e9}")), "/");
        assert_eq!(safe_next(Some("/search?q=1%20x")), "/search?q=1%20x");
    }

    #[test]
    fn flow_defaults_to_signin() {
        assert_eq!(AuthFlow::from_param(Some("signup")), AuthFlow::Signup);
        assert_eq!(AuthFlow::from_param(Some("whatever")), AuthFlow::Signin);
        assert_eq!(AuthFlow::from_param(None), AuthFlow::Signin);
    }

    #[tokio::test]
    async fn missing_code_follows_next() {
        let fx = fixture();
        let out = fx.callback.handle(&params(None, None, Some("/welcome"))).await;
        assert_eq!(out.redirect, CallbackRedirect::Next("/welcome".into()));
        assert!(out.session.is_none());
        assert_eq!(out.redirect.location("https://123l.ink/"), "https://123l.ink/welcome");
    }

    #[tokio::test]
    async fn bad_code_goes_to_error_page() {
        let fx = fixture();
        let out = fx.callback.handle(&params(Some("nope"), Some("signin"), None)).await;
        assert_eq!(out.redirect, CallbackRedirect::AuthError);
        assert_eq!(out.redirect.path(), "/auth/auth-error");
    }

    #[tokio::test]
    async fn failed_profile_lookup_revokes_the_new_session() {
        let sessions = Arc::new(SessionStore::default());
        let auth = Arc::new(AuthService::new(Arc::new(MemoryRepository::new()), sessions.clone()));
        let callback = CallbackService::new(auth.clone(), Arc::new(Unreachable));

        let grant = auth.register("ada@example.com", "secret1").await.unwrap();
        assert_eq!(sessions.session_count(), 1);

        let out = callback.handle(&params(Some(&grant.code), Some("signin"), None)).await;
        assert_eq!(out.redirect, CallbackRedirect::AuthError);
        assert!(out.session.is_none());
        // only the session from registering is left
        assert_eq!(sessions.session_count(), 1);
        assert!(auth.authenticate(&grant.token).await.is_ok());
    }

    #[tokio::test]
    async fn new_account_is_sent_to_setup() {
        let fx = fixture();
        let grant = fx.auth.register("ada@example.com", "secret1").await.unwrap();

        let out = fx.callback.handle(&params(Some(&grant.code), Some("signup"), None)).await;
        assert_eq!(out.redirect, CallbackRedirect::SetupProfile);
        let token = out.session.unwrap();
        assert_eq!(fx.auth.authenticate(&token).await.unwrap().id, grant.account.id);
    }

    #[tokio::test]
    async fn existing_profile_lands_on_public_page_for_both_flows() {
        let fx = fixture();
        for (email, flow) in [("ada@example.com", "signup"), ("bob@example.com", "signin")] {
            let grant = fx.auth.register(email, "secret1").await.unwrap();
            let username = email.split('@').next().unwrap().to_string() + "-page";
            fx.repo
                .insert_profile(Profile::new(grant.account.id, username.clone(), None))
                .await
                .unwrap();

            let out = fx.callback.handle(&params(Some(&grant.code), Some(flow), None)).await;
            assert_eq!(out.redirect, CallbackRedirect::Profile(username.clone()));
            assert_eq!(out.redirect.path(), format!("/{username}"));
        }
    }
}
