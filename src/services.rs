mod admin;
mod auth;
mod autosave;
pub mod callback;
mod error;
mod link;
mod profile;
mod sitemap;
mod username;

pub use admin::AdminService;
pub use auth::{AuthGrant, AuthService, MIN_PASSWORD_LEN, normalize_email};
pub use autosave::Autosave;
pub use callback::{CallbackOutcome, CallbackParams, CallbackRedirect, CallbackService};
pub use link::LinkService;
pub use profile::ProfileService;
pub use sitemap::SitemapService;
pub use username::{UsernameCheck, UsernameService};

pub use error::{ServiceError, ServiceResult};
