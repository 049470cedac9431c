use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::Client;
use shared::{
    domain::{AuthEvent, FormPanel, HeaderState, NameParts, Session},
    error::AuthError,
    protocol::{
        AccountResponse, LoginRequest, PasswordResetRequest, ResponseEnvelope, SignupRequest,
        VerificationRequest, VerificationResponse,
    },
};
use tokio::sync::broadcast;
use tracing::{info, warn};

pub mod durable_credentials;
pub use durable_credentials::DurableCredentialCache;

const PASSWORD_MIN_LEN: usize = 8;
const WAITING_LABEL: &str = "Please wait...";
const SENDING_LABEL: &str = "Sending...";
const PHONE_INVALID_MESSAGE: &str = "Please enter a valid phone number.";

/// Persistent name/value cache for session credentials. Implementations
/// must apply the store's expiry policy on reads; writes are atomic
/// single-key upserts with last-write-wins semantics.
#[async_trait]
pub trait CredentialCache: Send + Sync {
    async fn get(&self, name: &str) -> Result<Option<String>>;
    async fn set(&self, name: &str, value: &str) -> Result<()>;
    async fn remove(&self, name: &str) -> Result<()>;
}

pub struct MissingCredentialCache;

#[async_trait]
impl CredentialCache for MissingCredentialCache {
    async fn get(&self, name: &str) -> Result<Option<String>> {
        Err(anyhow!("credential cache unavailable, cannot read '{name}'"))
    }

    async fn set(&self, name: &str, _value: &str) -> Result<()> {
        Err(anyhow!(
            "credential cache unavailable, cannot write '{name}'"
        ))
    }

    async fn remove(&self, name: &str) -> Result<()> {
        Err(anyhow!(
            "credential cache unavailable, cannot remove '{name}'"
        ))
    }
}

/// User-visible notification channel (toast layer, status bar, ...).
pub trait NotificationSink: Send + Sync {
    fn success(&self, message: &str);
    fn error(&self, message: &str);
}

/// Fallback sink that routes notifications through tracing when no
/// toast layer is wired up.
pub struct LogNotificationSink;

impl NotificationSink for LogNotificationSink {
    fn success(&self, message: &str) {
        info!("{message}");
    }

    fn error(&self, message: &str) {
        tracing::error!("{message}");
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PhoneCheck {
    /// No validator wired up or nothing to validate; signup proceeds
    /// with an empty phone.
    Unavailable,
    /// Number is valid; carries the E.164 formatted form.
    Valid(String),
    Invalid,
}

pub trait PhoneValidator: Send + Sync {
    fn check(&self, raw_phone: &str) -> PhoneCheck;
}

pub struct MissingPhoneValidator;

impl PhoneValidator for MissingPhoneValidator {
    fn check(&self, _raw_phone: &str) -> PhoneCheck {
        PhoneCheck::Unavailable
    }
}

/// Submit-button model for one form: disabled while a submission is in
/// flight, with the label swapped for a waiting label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitAffordance {
    pub enabled: bool,
    pub label: String,
}

impl SubmitAffordance {
    fn idle(label: &str) -> Self {
        Self {
            enabled: true,
            label: label.to_string(),
        }
    }
}

#[derive(Debug)]
struct UiBoard {
    visible: Option<FormPanel>,
    affordances: HashMap<FormPanel, SubmitAffordance>,
}

impl UiBoard {
    fn new() -> Self {
        let mut affordances = HashMap::new();
        affordances.insert(FormPanel::Signup, SubmitAffordance::idle("Sign Up"));
        affordances.insert(FormPanel::Login, SubmitAffordance::idle("Log In"));
        affordances.insert(
            FormPanel::ForgotPassword,
            SubmitAffordance::idle("Reset Password"),
        );
        Self {
            visible: None,
            affordances,
        }
    }
}

/// Restores the submit affordance when the submission settles, whatever
/// the outcome. Held across every await in a submission path.
struct SubmitGuard {
    ui: Arc<Mutex<UiBoard>>,
    panel: FormPanel,
    original_label: String,
}

impl Drop for SubmitGuard {
    fn drop(&mut self) {
        if let Ok(mut board) = self.ui.lock() {
            if let Some(affordance) = board.affordances.get_mut(&self.panel) {
                affordance.enabled = true;
                affordance.label = self.original_label.clone();
            }
        }
    }
}

/// Drives signup, login, logout, and password-reset interactions
/// against the account backend, keeps the credential cache consistent
/// with the outcome, and broadcasts [`AuthEvent`] transitions to
/// whoever subscribed.
pub struct SessionController {
    http: Client,
    server_url: String,
    credentials: Arc<dyn CredentialCache>,
    notifications: Arc<dyn NotificationSink>,
    phone_validator: Arc<dyn PhoneValidator>,
    ui: Arc<Mutex<UiBoard>>,
    events: broadcast::Sender<AuthEvent>,
}

impl SessionController {
    pub fn new(server_url: impl Into<String>) -> Arc<Self> {
        Self::new_with_dependencies(
            server_url,
            Arc::new(MissingCredentialCache),
            Arc::new(LogNotificationSink),
            Arc::new(MissingPhoneValidator),
        )
    }

    pub fn new_with_credentials(
        server_url: impl Into<String>,
        credentials: Arc<dyn CredentialCache>,
    ) -> Arc<Self> {
        Self::new_with_dependencies(
            server_url,
            credentials,
            Arc::new(LogNotificationSink),
            Arc::new(MissingPhoneValidator),
        )
    }

    pub fn new_with_dependencies(
        server_url: impl Into<String>,
        credentials: Arc<dyn CredentialCache>,
        notifications: Arc<dyn NotificationSink>,
        phone_validator: Arc<dyn PhoneValidator>,
    ) -> Arc<Self> {
        let (events, _) = broadcast::channel(64);
        Arc::new(Self {
            http: Client::new(),
            server_url: server_url.into().trim_end_matches('/').to_string(),
            credentials,
            notifications,
            phone_validator,
            ui: Arc::new(Mutex::new(UiBoard::new())),
            events,
        })
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<AuthEvent> {
        self.events.subscribe()
    }

    /// Shows the requested panel, hiding every other one first.
    pub fn open_panel(&self, panel: FormPanel) {
        if let Ok(mut board) = self.ui.lock() {
            board.visible = Some(panel);
        }
    }

    pub fn close_all_panels(&self) {
        if let Ok(mut board) = self.ui.lock() {
            board.visible = None;
        }
    }

    pub fn visible_panel(&self) -> Option<FormPanel> {
        self.ui.lock().ok().and_then(|board| board.visible)
    }

    pub fn submit_affordance(&self, panel: FormPanel) -> Option<SubmitAffordance> {
        self.ui
            .lock()
            .ok()
            .and_then(|board| board.affordances.get(&panel).cloned())
    }

    fn begin_submit(&self, panel: FormPanel, waiting_label: &str) -> SubmitGuard {
        let mut original_label = String::new();
        if let Ok(mut board) = self.ui.lock() {
            if let Some(affordance) = board.affordances.get_mut(&panel) {
                original_label = affordance.label.clone();
                affordance.enabled = false;
                affordance.label = waiting_label.to_string();
            }
        }
        SubmitGuard {
            ui: Arc::clone(&self.ui),
            panel,
            original_label,
        }
    }

    /// Validates and submits a signup. Client-side checks (phone,
    /// password length, confirmation) reject before anything goes on
    /// the wire; the backend then verifies the email/phone pair before
    /// the account is created.
    pub async fn sign_up(
        &self,
        full_name: &str,
        email: &str,
        raw_phone: &str,
        password: &str,
        confirm_password: &str,
    ) -> Result<(), AuthError> {
        let phone = match self.phone_validator.check(raw_phone) {
            PhoneCheck::Valid(formatted) => formatted,
            PhoneCheck::Unavailable => String::new(),
            PhoneCheck::Invalid => return Err(AuthError::validation(PHONE_INVALID_MESSAGE)),
        };

        if password.len() < PASSWORD_MIN_LEN {
            return Err(AuthError::validation(
                "Password must be at least 8 characters long.",
            ));
        }
        if password != confirm_password {
            return Err(AuthError::validation(
                "Password and confirm password does not match!",
            ));
        }

        let name = NameParts::from_full_name(full_name);
        let email = email.trim().to_string();
        let _guard = self.begin_submit(FormPanel::Signup, WAITING_LABEL);

        let verification: ResponseEnvelope<VerificationResponse> = self
            .http
            .post(format!("{}/email_phone_verification", self.server_url))
            .json(&VerificationRequest {
                email: email.clone(),
                phone: phone.clone(),
            })
            .send()
            .await
            .map_err(transport)?
            .json()
            .await
            .map_err(transport)?;

        // The backend rejects identically whether or not a phone was
        // supplied; only the body is consulted, never the status.
        if let Some(result) = verification.response {
            if !result.phone_valid {
                return Err(AuthError::validation(PHONE_INVALID_MESSAGE));
            }
        }

        let response = self
            .http
            .post(format!("{}/signup", self.server_url))
            .json(&SignupRequest {
                first_name: name.first,
                last_name: name.last,
                password: password.to_string(),
                email: email.clone(),
                phone,
            })
            .send()
            .await
            .map_err(transport)?;
        let status = response.status();
        let body: ResponseEnvelope<AccountResponse> =
            response.json().await.map_err(transport)?;

        let ResponseEnvelope { response, message } = body;
        let account = if status.is_success() {
            response.filter(|account| account.token.is_some())
        } else {
            None
        };
        let Some(account) = account else {
            return Err(AuthError::remote(
                message.unwrap_or_else(|| "Unknown error".to_string()),
            ));
        };
        let token = account.token.unwrap_or_default();

        self.store(credentials::USER_EMAIL, &email).await;
        self.store(credentials::AUTH_TOKEN, &token).await;
        self.store(
            credentials::USER_FIRST_NAME,
            account.firstname.as_deref().unwrap_or_default(),
        )
        .await;
        self.store(
            credentials::USER_LAST_NAME,
            account.lastname.as_deref().unwrap_or_default().trim(),
        )
        .await;

        info!("signup completed for {email}");
        self.notifications.success("Sign up Successful");
        self.close_all_panels();
        let _ = self.events.send(AuthEvent::LoggedIn);
        Ok(())
    }

    pub async fn log_in(&self, email: &str, password: &str) -> Result<(), AuthError> {
        let email = email.trim().to_string();
        let _guard = self.begin_submit(FormPanel::Login, WAITING_LABEL);

        let response = self
            .http
            .post(format!("{}/login", self.server_url))
            .json(&LoginRequest {
                email: email.clone(),
                password: password.to_string(),
            })
            .send()
            .await
            .map_err(transport)?;
        let status = response.status();
        let body: ResponseEnvelope<AccountResponse> =
            response.json().await.map_err(transport)?;

        let ResponseEnvelope { response, message } = body;
        let account = if status.is_success() { response } else { None };
        let Some(account) = account else {
            return Err(AuthError::remote(
                message.unwrap_or_else(|| "Invalid credentials".to_string()),
            ));
        };

        self.store(credentials::USER_EMAIL, &email).await;
        // A missing token means the previously cached token stays in
        // effect.
        if let Some(token) = &account.token {
            self.store(credentials::AUTH_TOKEN, token).await;
        }
        self.store(
            credentials::USER_FIRST_NAME,
            account.firstname.as_deref().unwrap_or_default(),
        )
        .await;
        self.store(
            credentials::USER_LAST_NAME,
            account.lastname.as_deref().unwrap_or_default(),
        )
        .await;

        info!("login completed for {email}");
        self.notifications.success("Login Successful!");
        self.close_all_panels();
        let _ = self.events.send(AuthEvent::LoggedIn);
        Ok(())
    }

    /// Logs out locally no matter what the backend says: the API call
    /// is best-effort and its failure is only logged.
    pub async fn log_out(&self) {
        if let Some(token) = self.cached(credentials::AUTH_TOKEN).await {
            let result = self
                .http
                .post(format!("{}/logout", self.server_url))
                .bearer_auth(&token)
                .send()
                .await;
            if let Err(err) = result {
                warn!("logout API call failed: {err}");
            }
        }

        for name in credentials::SESSION_ENTRIES {
            self.discard(name).await;
        }

        let _ = self.events.send(AuthEvent::LoggedOut);
        self.notifications.success("Logged out successfully");
    }

    pub async fn request_password_reset(&self, email: &str) -> Result<(), AuthError> {
        let email = email.trim().to_string();
        let _guard = self.begin_submit(FormPanel::ForgotPassword, SENDING_LABEL);

        let response = self
            .http
            .post(format!("{}/password_reset", self.server_url))
            .json(&PasswordResetRequest { email })
            .send()
            .await
            .map_err(transport)?;
        let status = response.status();
        let body: ResponseEnvelope<serde_json::Value> =
            response.json().await.map_err(transport)?;

        if !status.is_success() {
            return Err(AuthError::remote(
                body.message.unwrap_or_else(|| "Please try again".to_string()),
            ));
        }

        self.notifications
            .success("Password reset instructions have been sent to your email!");
        self.open_panel(FormPanel::RequestPasswordConfirmation);
        Ok(())
    }

    /// Reads the cached session and reports which visual state the UI
    /// should adopt. Called at startup and by listeners on every
    /// [`AuthEvent`].
    pub async fn reconcile_ui(&self) -> HeaderState {
        let email = self.cached(credentials::USER_EMAIL).await;
        let token = self.cached(credentials::AUTH_TOKEN).await;
        if email.is_some() && token.is_some() {
            HeaderState::Authenticated
        } else {
            HeaderState::Anonymous
        }
    }

    /// The cached session, if one is fully present.
    pub async fn session(&self) -> Option<Session> {
        let email = self.cached(credentials::USER_EMAIL).await?;
        let auth_token = self.cached(credentials::AUTH_TOKEN).await?;
        Some(Session {
            email,
            auth_token,
            first_name: self
                .cached(credentials::USER_FIRST_NAME)
                .await
                .unwrap_or_default(),
            last_name: self
                .cached(credentials::USER_LAST_NAME)
                .await
                .unwrap_or_default(),
        })
    }

    /// Cache read that treats failures and empty values as absent; a
    /// missing cache only costs a warning, never a failed flow.
    async fn cached(&self, name: &str) -> Option<String> {
        match self.credentials.get(name).await {
            Ok(value) => value.filter(|value| !value.is_empty()),
            Err(err) => {
                warn!("credential cache read failed for '{name}': {err}");
                None
            }
        }
    }

    async fn store(&self, name: &str, value: &str) {
        if let Err(err) = self.credentials.set(name, value).await {
            warn!("credential cache write failed for '{name}': {err}");
        }
    }

    async fn discard(&self, name: &str) {
        if let Err(err) = self.credentials.remove(name).await {
            warn!("credential cache removal failed for '{name}': {err}");
        }
    }
}

fn transport(err: reqwest::Error) -> AuthError {
    AuthError::network(err.to_string())
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
