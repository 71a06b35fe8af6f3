//! Session store and cookie configuration.
//!
//! Sessions live server-side in the same SQLite database as user accounts
//! (table owned by [`SqliteStore`]); the browser only carries a signed
//! session-id cookie. The signing key is derived from the configured secret
//! so cookies stay valid across restarts.

use sha2::{Digest, Sha512};
use tower_sessions::cookie::time::Duration;
use tower_sessions::cookie::{Key, SameSite};
use tower_sessions::service::SignedCookie;
use tower_sessions::{Expiry, SessionManagerLayer};
use tower_sessions_sqlx_store::SqliteStore;
use tracing::warn;

use crate::config::SessionConfig;

/// Name of the session-id cookie.
pub const SESSION_COOKIE: &str = "clubroom_session";

/// Session key under which the authenticated user snapshot is stored.
pub const SESSION_USER_KEY: &str = "user";

/// Derive the cookie signing key from the configured secret.
///
/// Any secret length is accepted; SHA-512 stretches it to the 64 bytes the
/// key type requires. Without a secret a random key is generated, which
/// invalidates all outstanding cookies on restart.
pub fn signing_key(config: &SessionConfig) -> Key {
    match &config.secret {
        Some(secret) => {
            let digest = Sha512::digest(secret.as_bytes());
            Key::from(digest.as_slice())
        }
        None => {
            warn!("No session secret configured; sessions will not survive a restart");
            Key::generate()
        }
    }
}

/// Build the session middleware: HTTP-only signed cookie, fixed
/// time-to-live from the last write, matching store-side expiry.
pub fn session_layer(
    store: SqliteStore,
    config: &SessionConfig,
) -> SessionManagerLayer<SqliteStore, SignedCookie> {
    SessionManagerLayer::new(store)
        .with_name(SESSION_COOKIE)
        .with_http_only(true)
        .with_same_site(SameSite::Lax)
        .with_secure(false)
        .with_expiry(Expiry::OnInactivity(Duration::seconds(
            config.ttl_secs as i64,
        )))
        .with_signed(signing_key(config))
}
