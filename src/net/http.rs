use axum::{
    Json, Router,
    extract::{FromRequestParts, Path, Query, State},
    http::{HeaderMap, HeaderValue, StatusCode, header, request::Parts},
    response::{IntoResponse, Redirect, Response},
    routing::{get, patch, post},
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::Registry;
use crate::error::{AppResult, InfraError};
use crate::models::account::Account;
use crate::models::link::{Link, LinkChanges};
use crate::models::profile::{Profile, ProfileChanges, PublicProfile, UserSummary};
use crate::models::types::{AccountId, LinkId};
use crate::services::{CallbackParams, ServiceError, UsernameCheck};

pub const SESSION_COOKIE: &str = "linkbio_session";

#[derive(Clone)]
pub struct HttpAppCtx {
    registry: Arc<Registry>,
}

pub fn router(registry: Arc<Registry>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/sitemap.xml", get(sitemap))
        .route("/auth/callback", get(auth_callback))
        .route("/api/username/check", get(check_username))
        .route("/api/auth/register", post(register))
        .route("/api/auth/login", post(login))
        .route("/api/auth/logout", post(logout))
        .route("/api/profile", get(get_profile).post(setup_profile).patch(edit_profile))
        .route("/api/profile/flush", post(flush_profile))
        .route("/api/profile/suggestion", get(username_suggestion))
        .route("/api/profiles/{username}", get(public_profile))
        .route("/api/links", get(list_links).post(add_link))
        .route("/api/links/reorder", post(reorder_links))
        .route("/api/links/{id}", patch(update_link).delete(delete_link))
        .route("/api/admin/users", get(admin_list_users))
        .route("/api/admin/users/{id}", axum::routing::delete(admin_delete_user))
        .with_state(HttpAppCtx { registry })
        .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any))
        .layer(TraceLayer::new_for_http())
}

/// Run the HTTP API until ctrl-c, then write out edits still waiting for autosave.
pub async fn serve(addr: std::net::SocketAddr, registry: Arc<Registry>) -> AppResult<()> {
    let autosave = registry.services.autosave.clone();
    let app = router(registry);

    let listener = tokio::net::TcpListener::bind(&addr).await.map_err(InfraError::from)?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(InfraError::from)?;

    let saved = autosave.flush_all().await?;
    tracing::info!(saved, "pending profile edits written");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "cannot listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}

/// Service errors rendered as `{"error": "...", "field": ...}` with a matching status.
pub struct ApiError(ServiceError);

impl From<ServiceError> for ApiError {
    fn from(e: ServiceError) -> Self {
        ApiError(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            ServiceError::NotFound { .. } => StatusCode::NOT_FOUND,
            ServiceError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            ServiceError::Validation { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            ServiceError::UsernameTaken(_) | ServiceError::Conflict(_) => StatusCode::CONFLICT,
            ServiceError::Unauthorized => StatusCode::UNAUTHORIZED,
            ServiceError::Forbidden => StatusCode::FORBIDDEN,
            ServiceError::PasswordHash(_) | ServiceError::Database(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let field = match &self.0 {
            ServiceError::Validation { field, .. } => Some(*field),
            ServiceError::UsernameTaken(_) => Some("username"),
            _ => None,
        };

        let message = if status.is_server_error() {
            tracing::error!(error = ?self.0, "request failed");
            "Internal server error".to_string()
        } else {
            self.0.to_string()
        };

        (status, Json(json!({ "error": message, "field": field }))).into_response()
    }
}

type ApiResult<T> = Result<T, ApiError>;

/// Bearer token from `Authorization`, or the session cookie set by the callback.
fn session_token(headers: &HeaderMap) -> Option<&str> {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty());
    if bearer.is_some() {
        return bearer;
    }

    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value)
}

/// The signed-in account of a request.
pub struct CurrentAccount(pub Account);

impl FromRequestParts<HttpAppCtx> for CurrentAccount {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &HttpAppCtx) -> Result<Self, Self::Rejection> {
        let token = session_token(&parts.headers).ok_or(ServiceError::Unauthorized)?;
        let account = state.registry.services.auth.authenticate(token).await?;
        Ok(CurrentAccount(account))
    }
}

async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

async fn sitemap(State(state): State<HttpAppCtx>) -> impl IntoResponse {
    let xml = state.registry.services.sitemap.generate().await;
    (
        [
            (header::CONTENT_TYPE, "application/xml"),
            (header::CACHE_CONTROL, "public, max-age=3600"),
        ],
        xml,
    )
}

async fn auth_callback(State(state): State<HttpAppCtx>, Query(params): Query<CallbackParams>) -> Response {
    let outcome = state.registry.services.callback.handle(&params).await;
    let location = outcome.redirect.location(&state.registry.config.public_base_url);

    let mut response = Redirect::temporary(&location).into_response();
    if let Some(token) = outcome.session {
        let cookie = format!("{SESSION_COOKIE}={token}; Path=/; HttpOnly; SameSite=Lax");
        match HeaderValue::from_str(&cookie) {
            Ok(v) => {
                response.headers_mut().insert(header::SET_COOKIE, v);
            }
            Err(e) => tracing::warn!(error = %e, "cannot encode session cookie"),
        }
    }
    response
}

#[derive(Debug, Deserialize)]
struct UsernameQuery {
    #[serde(default)]
    username: String,
}

async fn check_username(
    State(state): State<HttpAppCtx>,
    Query(q): Query<UsernameQuery>,
) -> ApiResult<Json<UsernameCheck>> {
    Ok(Json(state.registry.services.username.check(&q.username).await?))
}

#[derive(Debug, Deserialize)]
struct Credentials {
    email: String,
    password: String,
}

async fn register(State(state): State<HttpAppCtx>, Json(body): Json<Credentials>) -> ApiResult<impl IntoResponse> {
    let grant = state.registry.services.auth.register(&body.email, &body.password).await?;
    Ok((StatusCode::CREATED, Json(grant)))
}

async fn login(State(state): State<HttpAppCtx>, Json(body): Json<Credentials>) -> ApiResult<impl IntoResponse> {
    let grant = state.registry.services.auth.login(&body.email, &body.password).await?;
    Ok(Json(grant))
}

async fn logout(State(state): State<HttpAppCtx>, headers: HeaderMap) -> StatusCode {
    if let Some(token) = session_token(&headers) {
        state.registry.services.auth.logout(token);
    }
    StatusCode::NO_CONTENT
}

async fn get_profile(State(state): State<HttpAppCtx>, CurrentAccount(account): CurrentAccount) -> ApiResult<Json<Profile>> {
    Ok(Json(state.registry.services.profile.me(account.id).await?))
}

#[derive(Debug, Deserialize)]
struct SuggestionQuery {
    #[serde(default)]
    name: String,
}

async fn username_suggestion(
    State(state): State<HttpAppCtx>,
    CurrentAccount(account): CurrentAccount,
    Query(q): Query<SuggestionQuery>,
) -> ApiResult<Json<UsernameCheck>> {
    Ok(Json(state.registry.services.username.suggest(&q.name, &account.email).await?))
}

#[derive(Debug, Deserialize)]
struct SetupRequest {
    /// Blank means "use the suggestion"
    #[serde(default)]
    username: String,
    #[serde(default)]
    display_name: Option<String>,
}

async fn setup_profile(
    State(state): State<HttpAppCtx>,
    CurrentAccount(account): CurrentAccount,
    Json(body): Json<SetupRequest>,
) -> ApiResult<impl IntoResponse> {
    let display_name = body.display_name.as_deref();
    let username = match body.username.trim() {
        "" => linkbio_core::suggest_username(display_name.unwrap_or_default(), &account.email),
        raw => raw.to_string(),
    };

    let profile = state
        .registry
        .services
        .profile
        .setup(account.id, &username, display_name)
        .await?;
    Ok((StatusCode::CREATED, Json(profile)))
}

/// Queues the edit; it is written after the autosave delay or on flush.
async fn edit_profile(
    State(state): State<HttpAppCtx>,
    CurrentAccount(account): CurrentAccount,
    Json(changes): Json<ProfileChanges>,
) -> ApiResult<impl IntoResponse> {
    // fail fast for edits to a profile that does not exist
    state.registry.services.profile.me(account.id).await?;
    state.registry.services.autosave.schedule(account.id, changes)?;
    Ok((StatusCode::ACCEPTED, Json(json!({ "pending": true }))))
}

async fn flush_profile(State(state): State<HttpAppCtx>, CurrentAccount(account): CurrentAccount) -> ApiResult<Json<Profile>> {
    let services = &state.registry.services;
    let profile = match services.autosave.flush(account.id).await? {
        Some(profile) => profile,
        None => services.profile.me(account.id).await?,
    };
    Ok(Json(profile))
}

async fn public_profile(State(state): State<HttpAppCtx>, Path(username): Path<String>) -> ApiResult<Json<PublicProfile>> {
    Ok(Json(state.registry.services.profile.public(&username).await?))
}

async fn list_links(State(state): State<HttpAppCtx>, CurrentAccount(account): CurrentAccount) -> ApiResult<Json<Vec<Link>>> {
    Ok(Json(state.registry.services.link.list(account.id).await?))
}

#[derive(Debug, Deserialize)]
struct NewLinkRequest {
    title: String,
    url: String,
}

async fn add_link(
    State(state): State<HttpAppCtx>,
    CurrentAccount(account): CurrentAccount,
    Json(body): Json<NewLinkRequest>,
) -> ApiResult<impl IntoResponse> {
    let link = state.registry.services.link.add(account.id, &body.title, &body.url).await?;
    Ok((StatusCode::CREATED, Json(link)))
}

async fn update_link(
    State(state): State<HttpAppCtx>,
    CurrentAccount(account): CurrentAccount,
    Path(id): Path<LinkId>,
    Json(changes): Json<LinkChanges>,
) -> ApiResult<Json<Link>> {
    Ok(Json(state.registry.services.link.update(account.id, id, changes).await?))
}

async fn delete_link(
    State(state): State<HttpAppCtx>,
    CurrentAccount(account): CurrentAccount,
    Path(id): Path<LinkId>,
) -> ApiResult<StatusCode> {
    state.registry.services.link.delete(account.id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
struct ReorderRequest {
    from: usize,
    to: usize,
}

async fn reorder_links(
    State(state): State<HttpAppCtx>,
    CurrentAccount(account): CurrentAccount,
    Json(body): Json<ReorderRequest>,
) -> ApiResult<Json<Vec<Link>>> {
    Ok(Json(state.registry.services.link.reorder(account.id, body.from, body.to).await?))
}

async fn admin_list_users(
    State(state): State<HttpAppCtx>,
    CurrentAccount(account): CurrentAccount,
) -> ApiResult<Json<Vec<UserSummary>>> {
    Ok(Json(state.registry.services.admin.list_users(&account).await?))
}

async fn admin_delete_user(
    State(state): State<HttpAppCtx>,
    CurrentAccount(account): CurrentAccount,
    Path(id): Path<AccountId>,
) -> ApiResult<impl IntoResponse> {
    state.registry.services.admin.delete_user(&account, id).await?;
    Ok(Json(json!({ "success": true, "message": "User deleted successfully" })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::error::DbError;

    #[test]
    fn token_from_bearer_or_cookie() {
        let mut headers = HeaderMap::new();
        assert_eq!(session_token(&headers), None);

        headers.insert(header::COOKIE, HeaderValue::from_static("theme=dark; linkbio_session=abc"));
        assert_eq!(session_token(&headers), Some("abc"));

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer xyz"));
        assert_eq!(session_token(&headers), Some("xyz"));
    }

    #[test]
    fn internal_errors_are_not_leaked() {
        let res = ApiError(ServiceError::Database(DbError::Decode("db password is hunter2".into()))).into_response();
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let res = ApiError(ServiceError::UsernameTaken("ada".into())).into_response();
        assert_eq!(res.status(), StatusCode::CONFLICT);
    }
}
