use axum::response::Response;
use rand::Rng;
use tower_sessions::Session;

use super::guards::{session_user, RequireUser};
use super::render_template;
use super::templates::{HomeTemplate, MembersTemplate};

/// Images the members page rotates through, served from `static/img/`.
const MEMBER_IMAGES: [&str; 3] = [
    "/static/img/member-1.gif",
    "/static/img/member-2.gif",
    "/static/img/member-3.gif",
];

/// Landing page. Public, but greets the visitor when a session exists.
pub async fn home(session: Session) -> Response {
    let user = session_user(&session).await;
    render_template(HomeTemplate { user })
}

/// Members-only area with a randomly picked image per request.
pub async fn members(RequireUser(user): RequireUser) -> Response {
    let image = MEMBER_IMAGES[rand::rng().random_range(0..MEMBER_IMAGES.len())];
    render_template(MembersTemplate {
        name: user.name,
        image,
    })
}
