//! Request guards for the protected areas of the site.
//!
//! Handlers take [`RequireUser`] or [`RequireAdmin`] as an extractor; the
//! rejection carries the response for visitors who don't qualify, so route
//! bodies only ever see an authenticated user.

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use tower_sessions::Session;

use crate::db::SessionUser;
use crate::sessions::SESSION_USER_KEY;

use super::templates::MessageTemplate;
use super::{found, render_template_with_status};

/// Read the user snapshot out of the session, if one is logged in.
///
/// A store failure reads as "not logged in"; guards then redirect rather
/// than surface a 500 on every protected page.
pub async fn session_user(session: &Session) -> Option<SessionUser> {
    session
        .get::<SessionUser>(SESSION_USER_KEY)
        .await
        .ok()
        .flatten()
}

/// Extractor that admits any authenticated user.
pub struct RequireUser(pub SessionUser);

/// Rejection for unauthenticated visitors: send them to the login form.
pub struct AuthRedirect;

impl IntoResponse for AuthRedirect {
    fn into_response(self) -> Response {
        found("/login")
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for RequireUser
where
    S: Send + Sync,
{
    type Rejection = AuthRedirect;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let session = Session::from_request_parts(parts, state)
            .await
            .map_err(|_| AuthRedirect)?;
        match session_user(&session).await {
            Some(user) => Ok(RequireUser(user)),
            None => Err(AuthRedirect),
        }
    }
}

/// Extractor that admits only administrators.
pub struct RequireAdmin(pub SessionUser);

pub enum AdminRejection {
    /// Nobody is logged in at all; same redirect as any protected page.
    NotLoggedIn,
    /// Logged in, but the session's role is not admin.
    Forbidden,
}

impl IntoResponse for AdminRejection {
    fn into_response(self) -> Response {
        match self {
            AdminRejection::NotLoggedIn => found("/login"),
            AdminRejection::Forbidden => render_template_with_status(
                StatusCode::FORBIDDEN,
                MessageTemplate {
                    title: "403 Forbidden".to_string(),
                    message: "You do not have permission to view this page.".to_string(),
                },
            ),
        }
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for RequireAdmin
where
    S: Send + Sync,
{
    type Rejection = AdminRejection;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let session = Session::from_request_parts(parts, state)
            .await
            .map_err(|_| AdminRejection::NotLoggedIn)?;
        match session_user(&session).await {
            Some(user) if user.user_type.is_admin() => Ok(RequireAdmin(user)),
            Some(_) => Err(AdminRejection::Forbidden),
            None => Err(AdminRejection::NotLoggedIn),
        }
    }
}
