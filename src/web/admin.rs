use axum::extract::{Path, State};
use axum::response::Response;
use std::sync::Arc;
use tracing::{info, warn};

use crate::db::{SessionUser, UserType};
use crate::AppState;

use super::error::WebError;
use super::guards::RequireAdmin;
use super::templates::{AdminTemplate, UserRow};
use super::{found, render_template};

/// Admin panel: every account with promote/demote controls.
pub async fn list_users(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
) -> Result<Response, WebError> {
    let users = sqlx::query_as::<_, UserRow>(
        "SELECT name, email, user_type FROM users ORDER BY name COLLATE NOCASE",
    )
    .fetch_all(&state.db)
    .await?;

    Ok(render_template(AdminTemplate { users }))
}

pub async fn promote(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> Result<Response, WebError> {
    set_user_type(&state, &admin, &name, UserType::Admin).await
}

pub async fn demote(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> Result<Response, WebError> {
    set_user_type(&state, &admin, &name, UserType::User).await
}

/// Apply a role change to every account with the given display name.
///
/// Display names are not unique, so this can touch several rows at once;
/// accounts are keyed by id everywhere else. Either way the browser lands
/// back on the panel, which shows the result.
async fn set_user_type(
    state: &AppState,
    acting: &SessionUser,
    name: &str,
    user_type: UserType,
) -> Result<Response, WebError> {
    let result = sqlx::query("UPDATE users SET user_type = ?, updated_at = ? WHERE name = ?")
        .bind(user_type)
        .bind(chrono::Utc::now().to_rfc3339())
        .bind(name)
        .execute(&state.db)
        .await?;

    match result.rows_affected() {
        0 => warn!(
            "{} requested a role change for unknown user {:?}",
            acting.email, name
        ),
        n => info!(
            "{} set {} account(s) named {:?} to {}",
            acting.email, n, name, user_type
        ),
    }

    Ok(found("/admin"))
}
