use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Response;
use axum::Form;
use std::sync::Arc;
use tower_sessions::Session;
use tracing::info;

use crate::config::AdminConfig;
use crate::db::{self, DbPool, SessionUser, User, UserType};
use crate::sessions::SESSION_USER_KEY;
use crate::AppState;

use super::error::WebError;
use super::templates::{LoginTemplate, SignupTemplate};
use super::validation::{validate_login, validate_signup, LoginForm, SignupForm};
use super::{found, render_template, render_template_with_status};

/// Hash a password using Argon2
pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let hash = argon2.hash_password(password.as_bytes(), &salt)?;
    Ok(hash.to_string())
}

/// Verify a password against a hash
pub fn verify_password(password: &str, hash: &str) -> bool {
    let parsed_hash = match PasswordHash::new(hash) {
        Ok(h) => h,
        Err(_) => return false,
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok()
}

pub async fn signup_page() -> Response {
    render_template(SignupTemplate { error: None })
}

/// Create an account and log the new user in.
///
/// The unique index on `users.email` is the duplicate check; there is no
/// look-before-insert, so two racing signups for one email cannot both win.
pub async fn signup_submit(
    State(state): State<Arc<AppState>>,
    session: Session,
    Form(form): Form<SignupForm>,
) -> Result<Response, WebError> {
    let new_user = match validate_signup(form) {
        Ok(new_user) => new_user,
        Err(errors) => return Ok(signup_error(errors.join(", "))),
    };

    let password_hash =
        hash_password(&new_user.password).map_err(|e| WebError::PasswordHash(e.to_string()))?;
    let user = User::new(new_user.name, new_user.email, password_hash);

    let inserted = sqlx::query(
        "INSERT INTO users (id, name, email, password_hash, user_type, created_at, updated_at)
         VALUES (?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&user.id)
    .bind(&user.name)
    .bind(&user.email)
    .bind(&user.password_hash)
    .bind(user.user_type)
    .bind(&user.created_at)
    .bind(&user.updated_at)
    .execute(&state.db)
    .await;

    if let Err(err) = inserted {
        if db::is_unique_violation(&err) {
            return Ok(signup_error("That email is already registered".to_string()));
        }
        return Err(err.into());
    }

    info!("Registered user {} <{}>", user.name, user.email);
    session
        .insert(SESSION_USER_KEY, SessionUser::from(&user))
        .await?;
    Ok(found("/members"))
}

pub async fn login_page() -> Response {
    render_template(LoginTemplate { error: None })
}

/// Check credentials and start a session.
///
/// Unknown email and bad password get distinct messages, matching the
/// form's long-standing behavior.
pub async fn login_submit(
    State(state): State<Arc<AppState>>,
    session: Session,
    Form(form): Form<LoginForm>,
) -> Result<Response, WebError> {
    let credentials = match validate_login(form) {
        Ok(credentials) => credentials,
        Err(errors) => return Ok(login_error(errors.join(", "))),
    };

    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = ?")
        .bind(&credentials.email)
        .fetch_optional(&state.db)
        .await?;

    let Some(user) = user else {
        return Ok(login_error("No account found with that email".to_string()));
    };

    if !verify_password(&credentials.password, &user.password_hash) {
        return Ok(login_error("Incorrect password".to_string()));
    }

    info!("User {} logged in", user.email);
    session
        .insert(SESSION_USER_KEY, SessionUser::from(&user))
        .await?;
    Ok(found("/members"))
}

/// Drop the session (server-side record and cookie) and go home. Safe to
/// hit while logged out.
pub async fn logout(session: Session) -> Result<Response, WebError> {
    session.flush().await?;
    Ok(found("/"))
}

fn signup_error(message: String) -> Response {
    render_template_with_status(
        StatusCode::BAD_REQUEST,
        SignupTemplate {
            error: Some(message),
        },
    )
}

fn login_error(message: String) -> Response {
    render_template_with_status(
        StatusCode::BAD_REQUEST,
        LoginTemplate {
            error: Some(message),
        },
    )
}

/// Make sure the configured bootstrap admin exists with the admin role.
///
/// Runs once at startup. An existing account under that email is promoted
/// in place (its password is left alone); otherwise the account is created.
pub async fn ensure_admin(db: &DbPool, admin: &AdminConfig) -> anyhow::Result<()> {
    let email = admin.email.trim().to_lowercase();

    let existing = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = ?")
        .bind(&email)
        .fetch_optional(db)
        .await?;

    match existing {
        Some(user) if user.user_type.is_admin() => {}
        Some(user) => {
            sqlx::query("UPDATE users SET user_type = ?, updated_at = ? WHERE id = ?")
                .bind(UserType::Admin)
                .bind(chrono::Utc::now().to_rfc3339())
                .bind(&user.id)
                .execute(db)
                .await?;
            info!("Promoted existing account {} to admin", email);
        }
        None => {
            let password_hash = hash_password(&admin.password)
                .map_err(|e| anyhow::anyhow!("Failed to hash admin password: {}", e))?;
            let mut user = User::new(admin.name.clone(), email.clone(), password_hash);
            user.user_type = UserType::Admin;

            sqlx::query(
                "INSERT INTO users (id, name, email, password_hash, user_type, created_at, updated_at)
                 VALUES (?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(&user.id)
            .bind(&user.name)
            .bind(&user.email)
            .bind(&user.password_hash)
            .bind(user.user_type)
            .bind(&user.created_at)
            .bind(&user.updated_at)
            .execute(db)
            .await?;
            info!("Created admin account {}", email);
        }
    }

    Ok(())
}
