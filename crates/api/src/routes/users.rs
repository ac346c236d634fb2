//! User route handlers: registration, login, logout, profile, admin listing.

use axum::{extract::State, http::StatusCode};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use super::{ApiJson, ApiQuery, Created, Data, PageQuery};
use crate::db::UserRepository;
use crate::error::{Result, clear_sentry_user, set_sentry_user};
use crate::middleware::{RequireAccount, RequireAdmin, RequireAuth, clear_current_user, set_current_user};
use crate::models::{CurrentUser, Page, User};
use crate::services::auth::AuthService;
use crate::state::AppState;
use crate::validation::FieldErrors;

/// Registration body.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub name: String,
}

/// Login body.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

async fn start_session(session: &Session, user: &User) -> Result<()> {
    let current = CurrentUser {
        id: user.id,
        email: user.email.clone(),
    };
    set_current_user(session, &current).await?;
    set_sentry_user(&user.id, Some(user.email.as_str()));
    Ok(())
}

/// Create an account and log it in.
#[instrument(skip_all)]
pub async fn register(
    State(state): State<AppState>,
    session: Session,
    ApiJson(body): ApiJson<RegisterRequest>,
) -> Result<Created<User>> {
    let user = AuthService::new(state.pool())
        .register(&body.email, &body.password, &body.name)
        .await?;

    start_session(&session, &user).await?;

    Ok(Created(user))
}

/// Log in with email and password.
#[instrument(skip_all)]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    ApiJson(body): ApiJson<LoginRequest>,
) -> Result<Data<User>> {
    let user = AuthService::new(state.pool())
        .login(&body.email, &body.password)
        .await
        .inspect_err(|_| tracing::info!("login failed"))?;

    start_session(&session, &user).await?;
    tracing::info!(user_id = %user.id, "user logged in");

    Ok(Data(user))
}

/// End the session.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn logout(RequireAuth(user): RequireAuth, session: Session) -> Result<StatusCode> {
    clear_current_user(&session).await?;
    clear_sentry_user();

    Ok(StatusCode::NO_CONTENT)
}

/// The logged-in user.
pub async fn me(RequireAccount(user): RequireAccount) -> Data<User> {
    Data(user)
}

/// List users, newest first.
#[instrument(skip_all, fields(admin_id = %admin.id))]
pub async fn list(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    ApiQuery(query): ApiQuery<PageQuery>,
) -> Result<Data<Page<User>>> {
    let mut errors = FieldErrors::new();
    let page = query.validate(&mut errors);
    errors.finish()?;

    let users = UserRepository::new(state.pool()).list(page).await?;
    Ok(Data(users))
}
