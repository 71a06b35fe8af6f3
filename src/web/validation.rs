use lazy_static::lazy_static;
use regex::Regex;
use serde::Deserialize;

/// Maximum display name length, counted in characters.
pub const NAME_MAX_LEN: usize = 30;
/// Password length bounds, counted in characters.
pub const PASSWORD_MIN_LEN: usize = 8;
pub const PASSWORD_MAX_LEN: usize = 64;

lazy_static! {
    // One non-space local part, an @, a domain with at least one dot.
    static ref EMAIL_REGEX: Regex = Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap();
}

/// Raw signup form body. Missing fields deserialize as empty strings and
/// fall through to validation instead of failing form extraction.
#[derive(Debug, Deserialize)]
pub struct SignupForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// Raw login form body.
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// A signup that passed validation, with normalized name and email.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password: String,
}

/// A login attempt with the email normalized to its stored form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

pub fn validate_name(name: &str) -> Result<(), String> {
    if name.is_empty() {
        return Err("Name is required".to_string());
    }
    if name.chars().count() > NAME_MAX_LEN {
        return Err(format!("Name too long (max {} characters)", NAME_MAX_LEN));
    }
    Ok(())
}

pub fn validate_email(email: &str) -> Result<(), String> {
    if email.is_empty() {
        return Err("Email is required".to_string());
    }
    if !EMAIL_REGEX.is_match(email) {
        return Err("Invalid email address".to_string());
    }
    Ok(())
}

pub fn validate_password(password: &str) -> Result<(), String> {
    if password.is_empty() {
        return Err("Password is required".to_string());
    }
    let length = password.chars().count();
    if length < PASSWORD_MIN_LEN || length > PASSWORD_MAX_LEN {
        return Err(format!(
            "Password must be between {} and {} characters",
            PASSWORD_MIN_LEN, PASSWORD_MAX_LEN
        ));
    }
    Ok(())
}

/// Validate a signup form. The name is trimmed, the email is trimmed and
/// lowercased before any checks so equality against stored accounts is
/// case-insensitive. Errors come back in field order.
pub fn validate_signup(form: SignupForm) -> Result<NewUser, Vec<String>> {
    let name = form.name.trim().to_string();
    let email = form.email.trim().to_lowercase();

    let mut errors = Vec::new();
    if let Err(e) = validate_name(&name) {
        errors.push(e);
    }
    if let Err(e) = validate_email(&email) {
        errors.push(e);
    }
    if let Err(e) = validate_password(&form.password) {
        errors.push(e);
    }

    if errors.is_empty() {
        Ok(NewUser {
            name,
            email,
            password: form.password,
        })
    } else {
        Err(errors)
    }
}

/// Validate a login form. Only presence is checked; a well-formed email
/// that matches no account is reported by the login handler, not here.
pub fn validate_login(form: LoginForm) -> Result<Credentials, Vec<String>> {
    let email = form.email.trim().to_lowercase();

    let mut errors = Vec::new();
    if email.is_empty() {
        errors.push("Email is required".to_string());
    }
    if form.password.is_empty() {
        errors.push("Password is required".to_string());
    }

    if errors.is_empty() {
        Ok(Credentials {
            email,
            password: form.password,
        })
    } else {
        Err(errors)
    }
}
