use serde::{Deserialize, Serialize};

/// Locally cached authenticated-user identity.
///
/// A session counts as logged in only when both the email and the auth
/// token are present and non-empty; everything else is anonymous.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub email: String,
    pub auth_token: String,
    pub first_name: String,
    pub last_name: String,
}

impl Session {
    pub fn is_logged_in(&self) -> bool {
        !self.email.is_empty() && !self.auth_token.is_empty()
    }
}

/// One modal-like section among the auth flows. At most one is visible
/// at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormPanel {
    Login,
    Signup,
    ForgotPassword,
    RequestPasswordConfirmation,
}

/// Zero-payload signal broadcast to listeners on login/logout
/// transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthEvent {
    LoggedIn,
    LoggedOut,
}

/// Visual state listeners should adopt after reconciling against the
/// cached session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HeaderState {
    Authenticated,
    Anonymous,
}

/// First/last name pair derived from a free-form full name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameParts {
    pub first: String,
    pub last: String,
}

impl NameParts {
    /// Splits a full name on single spaces: the first token becomes the
    /// first name, the remaining tokens (joined by spaces) the last
    /// name. A missing last name defaults to a single space, which the
    /// account backend expects for mononyms.
    pub fn from_full_name(full_name: &str) -> Self {
        let trimmed = full_name.trim();
        let mut tokens = trimmed.split(' ');
        let first = tokens.next().unwrap_or_default().to_string();
        let last = tokens.collect::<Vec<_>>().join(" ");
        let last = if last.is_empty() {
            " ".to_string()
        } else {
            last
        };
        Self { first, last }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_name_splits_into_first_and_rest() {
        let parts = NameParts::from_full_name("Ada Lovelace");
        assert_eq!(parts.first, "Ada");
        assert_eq!(parts.last, "Lovelace");

        let parts = NameParts::from_full_name("Ada King Lovelace");
        assert_eq!(parts.first, "Ada");
        assert_eq!(parts.last, "King Lovelace");
    }

    #[test]
    fn mononym_gets_single_space_last_name() {
        let parts = NameParts::from_full_name("Ada");
        assert_eq!(parts.first, "Ada");
        assert_eq!(parts.last, " ");
    }

    #[test]
    fn empty_name_yields_empty_first_and_space_last() {
        let parts = NameParts::from_full_name("   ");
        assert_eq!(parts.first, "");
        assert_eq!(parts.last, " ");
    }

    #[test]
    fn session_requires_both_email_and_token() {
        let mut session = Session {
            email: "ada@example.com".into(),
            auth_token: "tok".into(),
            first_name: "Ada".into(),
            last_name: "Lovelace".into(),
        };
        assert!(session.is_logged_in());

        session.auth_token.clear();
        assert!(!session.is_logged_in());
    }
}
