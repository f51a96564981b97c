//! Explicit signed-in identity context.
//!
//! Every service call receives the caller's identity as an argument instead
//! of reading ambient auth state, so callers decide what "signed in" means
//! (an OAuth session, a CLI flag, a test fixture).

use serde::{Deserialize, Serialize};

use crate::{
    errors::{GraphError, ValidationError, ValidationIssue},
    id::UserId,
    validators::{is_valid_email, is_valid_url},
};

/// The identity-provider view of the current user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: UserId,
    pub display_name: Option<String>,
    pub photo_url: Option<String>,
    pub email: Option<String>,
}

impl Identity {
    pub fn new(id: UserId) -> Self {
        Self {
            id,
            display_name: None,
            photo_url: None,
            email: None,
        }
    }

    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = Some(display_name.into());
        self
    }

    pub fn with_photo_url(mut self, photo_url: impl Into<String>) -> Self {
        self.photo_url = Some(photo_url.into());
        self
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// Checks provider-supplied attributes before they are persisted.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut issues = Vec::new();
        if let Some(email) = &self.email
            && !is_valid_email(email)
        {
            issues.push(ValidationIssue::new("email", "invalid_email", "Email address is not valid."));
        }
        if let Some(photo_url) = &self.photo_url
            && !is_valid_url(photo_url)
        {
            issues.push(ValidationIssue::new("photo_url", "invalid_url", "Photo URL is not valid."));
        }
        if issues.is_empty() {
            Ok(())
        } else {
            Err(ValidationError::new(issues))
        }
    }
}

/// Resolves an optional identity into a signed-in one.
pub fn require(identity: Option<&Identity>) -> Result<&Identity, GraphError> {
    identity.ok_or(GraphError::AuthRequired)
}
