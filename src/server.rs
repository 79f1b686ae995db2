//!
//! catalog-auth HTTP server
//! ------------------------
//! Axum front for the authentication core.
//!
//! Responsibilities:
//! - `POST /login`, `POST /register`, `POST /logout`, `POST /check` (unprotected entry points).
//! - Cookie carrier handling (`session_token`, see `cookie`).
//! - Gating every route under `/api/v1` through the `AuthorizationGate`; handlers receive the
//!   resolved identity as an explicit [`Authenticated`] argument.
//! - `{body: ...}` / `{err: ...}` response envelopes and per-request access logging.

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Context;
use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRequestParts, Request, State};
use axum::http::request::Parts;
use axum::http::{header, HeaderMap, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use serde_json::json;
use tracing::{debug, info, warn};

use crate::config::AuthConfig;
use crate::error::{AuthError, AuthResult};
use crate::identity::{
    require_role, AuthorizationGate, Credentials, NewUser, PasswordHasher, Role, SessionContext, SessionManager,
};
use crate::storage::{InMemoryUserStore, KvStore};

pub mod cookie;

use cookie::{clear_session_cookie, session_cookie, set_session_cookie};

/// Shared server state injected into all handlers.
#[derive(Clone)]
pub struct AppState {
    pub sessions: SessionManager,
    pub gate: AuthorizationGate,
}

impl AppState {
    pub fn new(sessions: SessionManager) -> Self {
        let gate = AuthorizationGate::new(sessions.clone());
        Self { sessions, gate }
    }
}

/// Identity resolved by the gate for the current request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Authenticated(pub SessionContext);

impl<S: Send + Sync> FromRequestParts<S> for Authenticated {
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        // Only present when the route sits behind `require_session`.
        parts.extensions.get::<Authenticated>().copied().ok_or(AuthError::Unauthorized)
    }
}

#[derive(Debug, Serialize)]
struct Envelope<T: Serialize> {
    body: T,
}

fn ok_body<T: Serialize>(body: T) -> Json<Envelope<T>> { Json(Envelope { body }) }

/// Bare `local@domain` address: both sides are RFC 5322 dot-atoms. Display names, angle
/// brackets, quoted local parts and domain literals are not accepted.
static EMAIL_RE: Lazy<Result<Regex, regex::Error>> = Lazy::new(|| {
    Regex::new(
        r"^[A-Za-z0-9!#$%&'*+/=?^_`{|}~-]+(?:\.[A-Za-z0-9!#$%&'*+/=?^_`{|}~-]+)*@[A-Za-z0-9!#$%&'*+/=?^_`{|}~-]+(?:\.[A-Za-z0-9!#$%&'*+/=?^_`{|}~-]+)*$",
    )
});

fn is_valid_email(email: &str) -> bool {
    match EMAIL_RE.as_ref() {
        Ok(re) => re.is_match(email),
        Err(e) => {
            tracing::error!(error = %e, "email pattern failed to compile");
            false
        }
    }
}

fn check_credentials(email: &str, password: &str) -> AuthResult<()> {
    if email.is_empty() || password.is_empty() || !is_valid_email(email) {
        return Err(AuthError::WrongCredentials);
    }
    Ok(())
}

/// Login and registration are only for callers without a live session.
fn reject_if_authenticated(state: &AppState, headers: &HeaderMap) -> AuthResult<()> {
    match state.gate.authenticate(session_cookie(headers).as_ref()) {
        Ok(ctx) => {
            warn!(user_id = ctx.user_id, "already authenticated");
            Err(AuthError::Unauthorized)
        }
        Err(e) if e.http_status().is_server_error() => {
            // The caller proceeds as anonymous; the store failure must still leave a trace.
            warn!(error = %e, "session lookup failed, treating caller as unauthenticated");
            Ok(())
        }
        Err(e) => {
            debug!(error = %e, "no live session on carrier");
            Ok(())
        }
    }
}

async fn login(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<Credentials>, JsonRejection>,
) -> AuthResult<Response> {
    reject_if_authenticated(&state, &headers)?;
    let Json(mut credentials) = payload.map_err(|e| AuthError::bad_request(e.body_text()))?;
    credentials.email = credentials.email.trim().to_string();
    check_credentials(&credentials.email, &credentials.password)?;

    let (session, user_id) = state.sessions.login(&credentials)?;
    info!(user_id, "login");
    let mut h = HeaderMap::new();
    h.insert(header::SET_COOKIE, set_session_cookie(&session)?);
    Ok((StatusCode::OK, h, ok_body(json!({ "id": user_id }))).into_response())
}

async fn register(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<NewUser>, JsonRejection>,
) -> AuthResult<Response> {
    reject_if_authenticated(&state, &headers)?;
    let Json(mut user) = payload.map_err(|e| AuthError::bad_request(e.body_text()))?;
    user.email = user.email.trim().to_string();
    check_credentials(&user.email, &user.password)?;

    let credentials = user.credentials();
    let id = state.sessions.register(user)?;
    let (session, _) = state.sessions.login(&credentials)?;
    info!(user_id = id, "registered");
    let mut h = HeaderMap::new();
    h.insert(header::SET_COOKIE, set_session_cookie(&session)?);
    Ok((StatusCode::OK, h, ok_body(json!({ "id": id }))).into_response())
}

async fn logout(State(state): State<AppState>, headers: HeaderMap) -> AuthResult<Response> {
    let Some(carrier) = session_cookie(&headers) else {
        return Err(AuthError::Unauthorized);
    };
    let ctx = state.gate.authenticate(Some(&carrier))?;
    state.sessions.logout(&carrier.token)?;
    info!(user_id = ctx.user_id, "logout");
    let mut h = HeaderMap::new();
    h.insert(header::SET_COOKIE, clear_session_cookie(state.sessions.clock().now())?);
    Ok((StatusCode::NO_CONTENT, h).into_response())
}

async fn check() -> StatusCode { StatusCode::NO_CONTENT }

async fn current_session(Authenticated(identity): Authenticated) -> impl IntoResponse {
    ok_body(json!({ "id": identity.user_id, "role": identity.role }))
}

async fn moderation_probe(Authenticated(identity): Authenticated) -> AuthResult<StatusCode> {
    require_role(&identity, Role::Moderator)?;
    Ok(StatusCode::NO_CONTENT)
}

/// Gate middleware for protected routes: resolve the carrier or reject the request.
async fn require_session(State(state): State<AppState>, mut request: Request, next: Next) -> AuthResult<Response> {
    let identity = state.gate.authenticate(session_cookie(request.headers()).as_ref())?;
    request.extensions_mut().insert(Authenticated(identity));
    Ok(next.run(request).await)
}

async fn access_log(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let started = Instant::now();
    let response = next.run(request).await;
    info!(
        target: "access",
        %method,
        path = %path,
        status = response.status().as_u16(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "request"
    );
    response
}

pub fn router(state: AppState) -> Router { router_with(state, Router::new()) }

/// Full router with extra application routes mounted under `/api/v1` behind the gate.
pub fn router_with(state: AppState, protected: Router<AppState>) -> Router {
    let api = Router::new()
        .route("/session", get(current_session))
        .route("/moderation", get(moderation_probe))
        .merge(protected)
        .route_layer(middleware::from_fn_with_state(state.clone(), require_session));

    Router::new()
        .route("/login", post(login))
        .route("/register", post(register))
        .route("/logout", post(logout))
        .route("/check", post(check))
        .nest("/api/v1", api)
        .layer(middleware::from_fn(access_log))
        .with_state(state)
}

/// Wire the in-memory stores and the session manager from configuration.
pub fn build_state(config: &AuthConfig) -> anyhow::Result<(AppState, KvStore)> {
    let hasher = PasswordHasher::new(config.hash).context("While building password hasher")?;
    let sessions_store = KvStore::default();
    let manager = SessionManager::new(Arc::new(InMemoryUserStore::new()), Arc::new(sessions_store.clone()), hasher)
        .with_ttl(config.session_ttl()?);
    Ok((AppState::new(manager), sessions_store))
}

/// Start the HTTP server bound to `config.http_addr`.
pub async fn run(config: AuthConfig) -> anyhow::Result<()> {
    config.validate()?;
    let (state, sessions_store) = build_state(&config)?;

    // Start background session sweeper
    if config.sweep_interval_secs > 0 {
        let interval = Duration::from_secs(config.sweep_interval_secs);
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(interval).await;
                let removed = sessions_store.sweep();
                if removed > 0 { debug!(removed, "session_sweep"); }
            }
        });
    } else {
        info!("session sweeper disabled");
    }

    let app = router(state);
    info!("Starting server on {}", config.http_addr);
    let listener = tokio::net::TcpListener::bind(config.http_addr)
        .await
        .with_context(|| format!("While binding {}", config.http_addr))?;
    axum::serve(listener, app).await?;
    Ok(())
}
