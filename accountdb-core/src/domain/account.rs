//! Account domain model

use std::fmt;

use serde::{Deserialize, Serialize};

/// A user identity record as stored in `accountsettings`
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: i64,
    pub username: String,
    pub email: String,
    /// One-way digest of the password; never serialized outward
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub email_verified: bool,
}

impl fmt::Debug for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Account")
            .field("id", &self.id)
            .field("username", &self.username)
            .field("email", &self.email)
            .field("password_hash", &"<redacted>")
            .field("email_verified", &self.email_verified)
            .finish()
    }
}

/// Partial update of an account's profile fields.
///
/// A `None` field leaves the stored column untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountUpdate {
    pub new_username: Option<String>,
    pub new_email: Option<String>,
}

impl AccountUpdate {
    pub fn new(new_username: Option<String>, new_email: Option<String>) -> Self {
        Self {
            new_username,
            new_email,
        }
    }

    /// Change only the username
    pub fn username(new_username: impl Into<String>) -> Self {
        Self::new(Some(new_username.into()), None)
    }

    /// Change only the email
    pub fn email(new_email: impl Into<String>) -> Self {
        Self::new(None, Some(new_email.into()))
    }

    /// True when neither field is set
    pub fn is_empty(&self) -> bool {
        self.new_username.is_none() && self.new_email.is_none()
    }

    /// Reject present-but-blank values
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.new_username.as_deref().is_some_and(|u| u.trim().is_empty()) {
            return Err("new username cannot be empty");
        }
        if self.new_email.as_deref().is_some_and(|e| e.trim().is_empty()) {
            return Err("new email cannot be empty");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Account {
        Account {
            id: 1,
            username: "alice".to_string(),
            email: "a@x.com".to_string(),
            password_hash: "$argon2id$v=19$m=19456,t=2,p=1$c2FsdA$aGFzaA".to_string(),
            email_verified: false,
        }
    }

    #[test]
    fn test_debug_redacts_digest() {
        let rendered = format!("{:?}", sample());
        assert!(rendered.contains("<redacted>"));
        assert!(!rendered.contains("argon2id"));
    }

    #[test]
    fn test_serialize_skips_digest() {
        let json = serde_json::to_value(sample()).unwrap();
        assert!(json.get("password_hash").is_none());
        assert_eq!(json["username"], "alice");
        assert_eq!(json["email_verified"], false);
    }

    #[test]
    fn test_update_emptiness_and_validation() {
        assert!(AccountUpdate::default().is_empty());
        assert!(!AccountUpdate::email("b@x.com").is_empty());

        assert!(AccountUpdate::username("bob").validate().is_ok());
        assert!(AccountUpdate::username("  ").validate().is_err());
        assert!(AccountUpdate::email("").validate().is_err());
    }
}
