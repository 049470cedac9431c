use serde::{Deserialize, Serialize};

/// Response envelope used by the account backend on every endpoint:
/// `{ "response": { ... }, "message": "..." }`. Both fields are
/// optional on the wire; rejections usually carry only `message`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseEnvelope<T> {
    #[serde(default)]
    pub response: Option<T>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationRequest {
    pub email: String,
    pub phone: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VerificationResponse {
    #[serde(default)]
    pub phone_valid: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignupRequest {
    pub first_name: String,
    pub last_name: String,
    pub password: String,
    pub email: String,
    pub phone: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Account payload returned by signup and login. Login responses may
/// omit the token, in which case any previously cached token stays in
/// effect.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AccountResponse {
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub firstname: Option<String>,
    #[serde(default)]
    pub lastname: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PasswordResetRequest {
    pub email: String,
}
