//! Field rules for user records.
//!
//! Every check runs; callers get the full ordered list of violations rather
//! than the first one.

use lazy_static::lazy_static;
use regex::Regex;

use super::repo_types::{Provider, SocialsPatch};

const NAME_MAX: usize = 49;
const USERNAME_MIN: usize = 5;
const USERNAME_MAX: usize = 29;
const PASSWORD_MIN: usize = 8;
const PASSWORD_MAX: usize = 25;

lazy_static! {
    static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    static ref HANDLE_CHARS_RE: Regex = Regex::new(r"^[a-zA-Z0-9._]+$").unwrap();
    static ref DOUBLE_SEPARATOR_RE: Regex = Regex::new(r"[._]{2}").unwrap();
    static ref DIGIT_RE: Regex = Regex::new(r"[0-9]").unwrap();
    static ref LOWER_RE: Regex = Regex::new(r"[a-z]").unwrap();
    static ref UPPER_RE: Regex = Regex::new(r"[A-Z]").unwrap();
    static ref SPECIAL_RE: Regex = Regex::new(r#"[.,!@#$%^&+=*()\[\]{}<;~"':>_-]"#).unwrap();
}

/// Signup fields after normalization and validation.
#[derive(Debug, Clone)]
pub struct SignupFields {
    pub name: String,
    pub username: String,
    pub email: String,
    pub password: String,
}

pub fn normalize_username(raw: &str) -> String {
    raw.trim().to_lowercase()
}

pub fn normalize_email(raw: &str) -> String {
    raw.trim().to_lowercase()
}

fn present(raw: Option<&str>) -> Option<&str> {
    raw.filter(|v| !v.trim().is_empty())
}

/// Pattern rules shared by usernames and social handles.
pub fn handle_violations(handle: &str) -> Vec<&'static str> {
    let mut out = Vec::new();
    if handle.starts_with(['.', '_']) {
        out.push("No . or _ at the beginning");
    }
    if DOUBLE_SEPARATOR_RE.is_match(handle) {
        out.push("No __ or _. or ._ or .. inside");
    }
    if !HANDLE_CHARS_RE.is_match(handle) {
        out.push("Only letters, numbers, . and _ allowed");
    }
    if handle.ends_with(['.', '_']) {
        out.push("No . or _ at the end");
    }
    out
}

fn name_violations(name: Option<&str>, out: &mut Vec<String>) {
    match present(name) {
        None => out.push("Name is required".into()),
        Some(name) if name.trim().chars().count() > NAME_MAX => {
            out.push("Name must be shorter than 50 characters".into())
        }
        Some(_) => {}
    }
}

fn username_violations(username: &str, out: &mut Vec<String>) {
    if username.is_empty() {
        out.push("Username is required".into());
        return;
    }
    let len = username.chars().count();
    if len < USERNAME_MIN {
        out.push("Username must be longer than 4 characters".into());
    }
    if len > USERNAME_MAX {
        out.push("Username must be shorter than 30 characters".into());
    }
    out.extend(handle_violations(username).into_iter().map(String::from));
}

fn email_violations(email: &str, out: &mut Vec<String>) {
    if email.is_empty() {
        out.push("Email is required".into());
    } else if !EMAIL_RE.is_match(email) {
        out.push("Please provide a valid email".into());
    }
}

pub fn password_violations(password: Option<&str>) -> Vec<String> {
    let Some(password) = password.filter(|p| !p.is_empty()) else {
        return vec!["Password is required".into()];
    };

    let mut out = Vec::new();
    let len = password.chars().count();
    if len < PASSWORD_MIN {
        out.push("Password must be at least 8 characters".into());
    }
    if len > PASSWORD_MAX {
        out.push("Password must be shorter than 26 characters".into());
    }
    if !DIGIT_RE.is_match(password) {
        out.push("Password must contain at least 1 number".into());
    }
    if !LOWER_RE.is_match(password) {
        out.push("Password must contain at least 1 lowercase letter".into());
    }
    if !UPPER_RE.is_match(password) {
        out.push("Password must contain at least 1 uppercase letter".into());
    }
    if !SPECIAL_RE.is_match(password) {
        out.push(
            "Password must contain at least 1 special character: .,!@#$%^&+=*()[]{}<;~\"':>_-"
                .into(),
        );
    }
    out
}

/// Normalizes and checks all signup fields at once.
pub fn check_signup(
    name: Option<&str>,
    username: Option<&str>,
    email: Option<&str>,
    password: Option<&str>,
) -> Result<SignupFields, Vec<String>> {
    let username = normalize_username(username.unwrap_or_default());
    let email = normalize_email(email.unwrap_or_default());

    let mut violations = Vec::new();
    name_violations(name, &mut violations);
    username_violations(&username, &mut violations);
    email_violations(&email, &mut violations);
    violations.extend(password_violations(password));

    if !violations.is_empty() {
        return Err(violations);
    }

    Ok(SignupFields {
        name: name.unwrap_or_default().trim().to_string(),
        username,
        email,
        password: password.unwrap_or_default().to_string(),
    })
}

/// Trims handles, turns empty strings into unsets and checks set handles.
pub fn check_socials(mut patch: SocialsPatch) -> Result<SocialsPatch, Vec<String>> {
    let mut violations = Vec::new();
    for provider in Provider::ALL {
        let slot = patch.get_mut(provider);
        if let Some(value) = slot {
            let trimmed = value.as_deref().map(str::trim).unwrap_or_default();
            if trimmed.is_empty() {
                *value = None;
                continue;
            }
            violations.extend(
                handle_violations(trimmed)
                    .into_iter()
                    .map(|m| format!("{}: {m}", provider.as_str())),
            );
            *value = Some(trimmed.to_string());
        }
    }

    if violations.is_empty() {
        Ok(patch)
    } else {
        Err(violations)
    }
}
