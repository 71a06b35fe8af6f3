mod admin;
pub mod auth;
mod error;
mod guards;
mod pages;
mod templates;
mod validation;

use askama::Template;
use axum::http::{header, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tower_sessions::service::SignedCookie;
use tower_sessions::SessionManagerLayer;
use tower_sessions_sqlx_store::SqliteStore;

use crate::AppState;

use templates::MessageTemplate;

// Helper to render templates and handle errors
fn render_template<T: Template>(template: T) -> Response {
    render_template_with_status(StatusCode::OK, template)
}

fn render_template_with_status<T: Template>(status: StatusCode, template: T) -> Response {
    match template.render() {
        Ok(html) => (status, Html(html)).into_response(),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, format!("Template error: {}", e))
            .into_response(),
    }
}

// These flows answer 302 Found; `Redirect::to` would send 303.
fn found(location: &'static str) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, location)]).into_response()
}

pub fn create_router(
    state: Arc<AppState>,
    session_layer: SessionManagerLayer<SqliteStore, SignedCookie>,
) -> Router {
    Router::new()
        // Public pages
        .route("/", get(pages::home))
        .route("/signup", get(auth::signup_page))
        .route("/signup", post(auth::signup_submit))
        .route("/login", get(auth::login_page))
        .route("/login", post(auth::login_submit))
        .route("/logout", get(auth::logout))
        // Session-gated pages
        .route("/members", get(pages::members))
        // Admin pages
        .route("/admin", get(admin::list_users))
        .route("/admin/promote/:name", get(admin::promote))
        .route("/admin/demote/:name", get(admin::demote))
        .route("/health", get(health_check))
        .nest_service("/static", ServeDir::new("static"))
        .fallback(not_found)
        .layer(session_layer)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health_check() -> &'static str {
    "OK"
}

async fn not_found() -> Response {
    render_template_with_status(
        StatusCode::NOT_FOUND,
        MessageTemplate {
            title: "404 Not Found".to_string(),
            message: "The page you requested does not exist.".to_string(),
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AdminConfig, Config, SessionConfig};
    use crate::db::{self, DbPool};
    use crate::sessions;
    use axum::body::Body;
    use axum::http::Request;
    use tempfile::TempDir;
    use tower::ServiceExt;

    struct TestApp {
        router: Router,
        db: DbPool,
        _data_dir: TempDir,
    }

    async fn test_app() -> TestApp {
        let data_dir = tempfile::tempdir().unwrap();
        let db = db::init(data_dir.path()).await.unwrap();

        let config = Config {
            session: SessionConfig {
                secret: Some("test-secret".to_string()),
                ttl_secs: 3600,
            },
            ..Config::default()
        };

        let store = SqliteStore::new(db.clone());
        store.migrate().await.unwrap();
        let session_layer = sessions::session_layer(store, &config.session);

        let state = Arc::new(AppState::new(config, db.clone()));
        TestApp {
            router: create_router(state, session_layer),
            db,
            _data_dir: data_dir,
        }
    }

    fn get_request(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn get_with_cookie(uri: &str, cookie: &str) -> Request<Body> {
        Request::builder()
            .uri(uri)
            .header(header::COOKIE, cookie)
            .body(Body::empty())
            .unwrap()
    }

    fn post_form(uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn send(app: &TestApp, request: Request<Body>) -> Response {
        app.router.clone().oneshot(request).await.unwrap()
    }

    /// The session cookie pair out of a response's `Set-Cookie` header.
    fn session_cookie(response: &Response) -> String {
        response
            .headers()
            .get(header::SET_COOKIE)
            .expect("response should carry a session cookie")
            .to_str()
            .unwrap()
            .split(';')
            .next()
            .unwrap()
            .to_string()
    }

    async fn body_string(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    async fn user_count(app: &TestApp) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&app.db)
            .await
            .unwrap()
    }

    /// Sign up an account and hand back its session cookie.
    async fn signup(app: &TestApp, name: &str, email: &str, password: &str) -> String {
        let response = send(
            app,
            post_form(
                "/signup",
                &format!("name={}&email={}&password={}", name, email, password),
            ),
        )
        .await;
        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(response.headers()[header::LOCATION], "/members");
        session_cookie(&response)
    }

    /// Log in and hand back a fresh session cookie.
    async fn login(app: &TestApp, email: &str, password: &str) -> String {
        let response = send(
            app,
            post_form("/login", &format!("email={}&password={}", email, password)),
        )
        .await;
        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(response.headers()[header::LOCATION], "/members");
        session_cookie(&response)
    }

    async fn make_admin(app: &TestApp, email: &str, password: &str) {
        auth::ensure_admin(
            &app.db,
            &AdminConfig {
                email: email.to_string(),
                password: password.to_string(),
                name: "Administrator".to_string(),
            },
        )
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_health_endpoint_responds() {
        let app = test_app().await;
        let response = send(&app, get_request("/health")).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_string(response).await, "OK");
    }

    #[tokio::test]
    async fn test_signup_logs_the_new_user_in() {
        let app = test_app().await;
        let cookie = signup(&app, "Ann", "ann@example.com", "password1").await;
        assert_eq!(user_count(&app).await, 1);

        let response = send(&app, get_with_cookie("/members", &cookie)).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_string(response).await.contains("Ann"));
    }

    #[tokio::test]
    async fn test_signup_rejects_duplicate_email_case_insensitively() {
        let app = test_app().await;
        signup(&app, "Ann", "ann@example.com", "password1").await;

        let response = send(
            &app,
            post_form(
                "/signup",
                "name=Imposter&email=ANN%40EXAMPLE.COM&password=password2",
            ),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(body_string(response)
            .await
            .contains("That email is already registered"));
        assert_eq!(user_count(&app).await, 1);
    }

    #[tokio::test]
    async fn test_signup_reports_all_validation_errors() {
        let app = test_app().await;
        let response = send(&app, post_form("/signup", "")).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = body_string(response).await;
        assert!(body.contains("Name is required"));
        assert!(body.contains("Email is required"));
        assert!(body.contains("Password is required"));
    }

    #[tokio::test]
    async fn test_signup_rejects_short_passwords() {
        let app = test_app().await;
        let response = send(
            &app,
            post_form("/signup", "name=Ann&email=ann%40example.com&password=short"),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(body_string(response)
            .await
            .contains("Password must be between 8 and 64 characters"));
    }

    #[tokio::test]
    async fn test_signup_ignores_unknown_form_fields() {
        let app = test_app().await;
        let response = send(
            &app,
            post_form(
                "/signup",
                "name=Ann&email=ann%40example.com&password=password1&favorite=teal",
            ),
        )
        .await;
        assert_eq!(response.status(), StatusCode::FOUND);
    }

    #[tokio::test]
    async fn test_login_distinguishes_unknown_email_from_wrong_password() {
        let app = test_app().await;
        signup(&app, "Ann", "ann@example.com", "password1").await;

        let response = send(
            &app,
            post_form("/login", "email=bob%40example.com&password=password1"),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(body_string(response)
            .await
            .contains("No account found with that email"));

        let response = send(
            &app,
            post_form("/login", "email=ann%40example.com&password=password2"),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        // A failed login never starts a session.
        assert!(response.headers().get(header::SET_COOKIE).is_none());
        assert!(body_string(response).await.contains("Incorrect password"));
    }

    #[tokio::test]
    async fn test_login_accepts_differently_cased_email() {
        let app = test_app().await;
        signup(&app, "Ann", "ann@example.com", "password1").await;
        let cookie = login(&app, "Ann%40Example.COM", "password1").await;

        let response = send(&app, get_with_cookie("/members", &cookie)).await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_members_requires_a_session() {
        let app = test_app().await;
        let response = send(&app, get_request("/members")).await;
        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(response.headers()[header::LOCATION], "/login");
    }

    #[tokio::test]
    async fn test_members_shows_one_of_the_rotating_images() {
        let app = test_app().await;
        let cookie = signup(&app, "Ann", "ann@example.com", "password1").await;

        let response = send(&app, get_with_cookie("/members", &cookie)).await;
        assert!(body_string(response).await.contains("/static/img/member-"));
    }

    #[tokio::test]
    async fn test_logout_invalidates_the_session() {
        let app = test_app().await;
        let cookie = signup(&app, "Ann", "ann@example.com", "password1").await;

        let response = send(&app, get_with_cookie("/logout", &cookie)).await;
        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(response.headers()[header::LOCATION], "/");

        // The old cookie no longer matches a stored session.
        let response = send(&app, get_with_cookie("/members", &cookie)).await;
        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(response.headers()[header::LOCATION], "/login");
    }

    #[tokio::test]
    async fn test_logout_while_anonymous_still_redirects_home() {
        let app = test_app().await;
        let response = send(&app, get_request("/logout")).await;
        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(response.headers()[header::LOCATION], "/");
    }

    #[tokio::test]
    async fn test_logging_in_replaces_the_current_session_user() {
        let app = test_app().await;
        signup(&app, "Ann", "ann@example.com", "password1").await;
        let cookie = signup(&app, "Bob", "bob@example.com", "password1").await;

        // Bob's browser logs in as Ann without logging out first.
        let response = send(
            &app,
            Request::builder()
                .method("POST")
                .uri("/login")
                .header(header::COOKIE, &cookie)
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(Body::from("email=ann%40example.com&password=password1"))
                .unwrap(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::FOUND);

        let response = send(&app, get_with_cookie("/members", &cookie)).await;
        let body = body_string(response).await;
        assert!(body.contains("Ann"));
        assert!(!body.contains("Bob"));
    }

    #[tokio::test]
    async fn test_admin_panel_requires_login_then_role() {
        let app = test_app().await;

        let response = send(&app, get_request("/admin")).await;
        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(response.headers()[header::LOCATION], "/login");

        let cookie = signup(&app, "Ann", "ann@example.com", "password1").await;
        let response = send(&app, get_with_cookie("/admin", &cookie)).await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        // Role-change routes sit behind the same guard.
        let response = send(&app, get_with_cookie("/admin/promote/Ann", &cookie)).await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_admin_panel_lists_every_account() {
        let app = test_app().await;
        signup(&app, "Ann", "ann@example.com", "password1").await;
        make_admin(&app, "root@example.com", "rootpassword").await;
        let cookie = login(&app, "root%40example.com", "rootpassword").await;

        let response = send(&app, get_with_cookie("/admin", &cookie)).await;
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_string(response).await;
        assert!(body.contains("ann@example.com"));
        assert!(body.contains("root@example.com"));
    }

    #[tokio::test]
    async fn test_promotion_takes_effect_on_next_login() {
        let app = test_app().await;
        let ann_cookie = signup(&app, "Ann", "ann@example.com", "password1").await;
        make_admin(&app, "root@example.com", "rootpassword").await;
        let root_cookie = login(&app, "root%40example.com", "rootpassword").await;

        let response = send(&app, get_with_cookie("/admin/promote/Ann", &root_cookie)).await;
        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(response.headers()[header::LOCATION], "/admin");

        // Ann's live session still carries the old role.
        let response = send(&app, get_with_cookie("/admin", &ann_cookie)).await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        // A fresh login picks up the promotion.
        let fresh_cookie = login(&app, "ann%40example.com", "password1").await;
        let response = send(&app, get_with_cookie("/admin", &fresh_cookie)).await;
        assert_eq!(response.status(), StatusCode::OK);

        // And demotion works the same way.
        let response = send(&app, get_with_cookie("/admin/demote/Ann", &root_cookie)).await;
        assert_eq!(response.status(), StatusCode::FOUND);
        let fresh_cookie = login(&app, "ann%40example.com", "password1").await;
        let response = send(&app, get_with_cookie("/admin", &fresh_cookie)).await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_role_change_for_unknown_name_still_redirects_back() {
        let app = test_app().await;
        make_admin(&app, "root@example.com", "rootpassword").await;
        let cookie = login(&app, "root%40example.com", "rootpassword").await;

        let response = send(&app, get_with_cookie("/admin/promote/Nobody", &cookie)).await;
        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(response.headers()[header::LOCATION], "/admin");
    }

    #[tokio::test]
    async fn test_home_greets_logged_in_users() {
        let app = test_app().await;

        let response = send(&app, get_request("/")).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_string(response).await.contains("Sign up"));

        let cookie = signup(&app, "Ann", "ann@example.com", "password1").await;
        let response = send(&app, get_with_cookie("/", &cookie)).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_string(response).await.contains("Ann"));
    }

    #[tokio::test]
    async fn test_unmatched_routes_render_the_404_page() {
        let app = test_app().await;
        let response = send(&app, get_request("/no-such-page")).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(body_string(response).await.contains("404 Not Found"));
    }
}
