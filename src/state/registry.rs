use crate::config::Config;
use crate::db::Db;
use crate::db::repo::{AccountRepo, AccountRepository, LinkRepo, LinkRepository, MemoryRepository};
use crate::db::repo::{ProfileRepo, ProfileRepository};
use crate::services::{
    AdminService, AuthService, Autosave, CallbackService, LinkService, ProfileService, SitemapService, UsernameService,
};
use crate::state::session::{CODE_TTL, SessionStore};
use std::sync::Arc;

pub struct Repos {
    pub account: Arc<dyn AccountRepo>,
    pub profile: Arc<dyn ProfileRepo>,
    pub link: Arc<dyn LinkRepo>,
}

impl Repos {
    pub fn postgres(db: Arc<Db>) -> Self {
        Self {
            account: Arc::new(AccountRepository::new(db.clone())),
            profile: Arc::new(ProfileRepository::new(db.clone())),
            link: Arc::new(LinkRepository::new(db)),
        }
    }

    /// Everything in process memory, gone on restart.
    pub fn memory() -> Self {
        let store = Arc::new(MemoryRepository::new());
        Self {
            account: store.clone(),
            profile: store.clone(),
            link: store,
        }
    }
}

pub struct Services {
    pub username: Arc<UsernameService>,
    pub auth: Arc<AuthService>,
    pub callback: Arc<CallbackService>,
    pub profile: Arc<ProfileService>,
    pub autosave: Arc<Autosave>,
    pub link: Arc<LinkService>,
    pub admin: Arc<AdminService>,
    pub sitemap: Arc<SitemapService>,
}

pub struct Registry {
    pub repos: Arc<Repos>,
    pub services: Arc<Services>,
    pub sessions: Arc<SessionStore>,
    pub config: Arc<Config>,
}

impl Registry {
    pub fn new(repos: Repos, config: Arc<Config>) -> Self {
        let repos = Arc::new(repos);
        let sessions = Arc::new(SessionStore::new(CODE_TTL, config.session_ttl()));

        let username_service = Arc::new(UsernameService::new(
            Arc::new(config.username_rules()),
            repos.profile.clone(),
        ));
        let auth_service = Arc::new(AuthService::new(repos.account.clone(), sessions.clone()));
        let profile_service = Arc::new(ProfileService::new(
            username_service.clone(),
            repos.profile.clone(),
            repos.link.clone(),
        ));

        let services = Arc::new(Services {
            username: username_service,
            callback: Arc::new(CallbackService::new(auth_service.clone(), repos.profile.clone())),
            auth: auth_service,
            autosave: Arc::new(Autosave::new(profile_service.clone(), config.autosave_delay())),
            profile: profile_service,
            link: Arc::new(LinkService::new(repos.link.clone(), repos.profile.clone())),
            admin: Arc::new(AdminService::new(
                config.clone(),
                repos.account.clone(),
                repos.profile.clone(),
                repos.link.clone(),
                sessions.clone(),
            )),
            sitemap: Arc::new(SitemapService::new(repos.profile.clone(), &config.public_base_url)),
        });

        Self {
            repos,
            services,
            sessions,
            config,
        }
    }
}
