use serde::{Deserialize, Serialize};

use crate::users::CurrentUser;

/// Request body for signup. Missing fields are reported by validation.
#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    pub name: Option<String>,
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

/// Request body for login.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: Option<String>,
    pub password: Option<String>,
}

/// `data` of signup, login and getMe responses.
#[derive(Debug, Serialize)]
pub struct UserData {
    pub user: CurrentUser,
}
