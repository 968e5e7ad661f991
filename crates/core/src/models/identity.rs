//! Caller identity handed in by the session layer

use serde::{Deserialize, Serialize};

/// The acting user, as supplied by whoever owns the session.
///
/// Nothing here is authenticated; the email string is trusted as-is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub email: String,
    pub name: Option<String>,
    /// Organization name when acting on behalf of an NGO
    pub organization: Option<String>,
    pub is_admin: bool,
}

impl Identity {
    pub fn volunteer(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            name: None,
            organization: None,
            is_admin: false,
        }
    }

    pub fn organization(email: impl Into<String>, organization: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            name: None,
            organization: Some(organization.into()),
            is_admin: false,
        }
    }

    pub fn admin(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            name: None,
            organization: None,
            is_admin: true,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Role derived from the identity flags
    pub fn role(&self) -> PlatformRole {
        if self.is_admin {
            PlatformRole::Admin
        } else if self.organization.is_some() {
            PlatformRole::Organization
        } else {
            PlatformRole::Volunteer
        }
    }
}

/// Platform roles, ordered by privilege
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PlatformRole {
    Volunteer = 1,
    Organization = 2,
    Admin = 3,
}
