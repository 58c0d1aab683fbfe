use serde::{Deserialize, Serialize};

use crate::model::UserId;

/// Portal account as cached after login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub email: String,
    pub name: Option<String>,
    #[serde(default)]
    pub is_staff: bool,
}

impl User {
    /// Placeholder kept when the login response carries no profile.
    #[must_use]
    pub fn placeholder(email: &str) -> Self {
        Self {
            id: UserId::new(0),
            email: email.to_owned(),
            name: Some(email.to_owned()),
            is_staff: false,
        }
    }

    /// Email as the grading endpoint expects it.
    #[must_use]
    pub fn normalized_email(&self) -> String {
        self.email.trim().to_lowercase()
    }

    #[must_use]
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.email)
    }
}

/// Token pair plus profile, stored in a single slot.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub access_token: String,
    pub refresh_token: String,
    pub user: User,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("access_token", &"<redacted>")
            .field("refresh_token", &"<redacted>")
            .field("user", &self.user)
            .finish()
    }
}
