// Askama template definitions

use askama::Template;
use sqlx::FromRow;

use crate::db::{SessionUser, UserType};

// One row of the admin user table (no password hash leaves the db layer)
#[derive(Debug, FromRow)]
pub struct UserRow {
    pub name: String,
    pub email: String,
    pub user_type: UserType,
}

// Landing page template
#[derive(Template)]
#[template(path = "index.html")]
pub struct HomeTemplate {
    pub user: Option<SessionUser>,
}

// Signup form template
#[derive(Template)]
#[template(path = "signup.html")]
pub struct SignupTemplate {
    pub error: Option<String>,
}

// Login form template
#[derive(Template)]
#[template(path = "login.html")]
pub struct LoginTemplate {
    pub error: Option<String>,
}

// Members area template
#[derive(Template)]
#[template(path = "members.html")]
pub struct MembersTemplate {
    pub name: String,
    pub image: &'static str,
}

// Admin panel template
#[derive(Template)]
#[template(path = "admin.html")]
pub struct AdminTemplate {
    pub users: Vec<UserRow>,
}

// Plain status-page template (used for 403 and 404 pages)
#[derive(Template)]
#[template(path = "message.html")]
pub struct MessageTemplate {
    pub title: String,
    pub message: String,
}
