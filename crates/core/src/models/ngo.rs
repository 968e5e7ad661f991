//! NGO registration requests and their moderation state

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NgoStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
}

/// An organization asking to publish events on the platform
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NgoRegistration {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub city: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    pub status: NgoStatus,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approved_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rejection_reason: Option<String>,
}

impl NgoRegistration {
    pub fn new(draft: NgoDraft) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: draft.name,
            email: draft.email,
            city: draft.city,
            description: draft.description,
            phone: draft.phone,
            website: draft.website,
            status: NgoStatus::Pending,
            created_at: Utc::now(),
            approved_at: None,
            rejection_reason: None,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.status == NgoStatus::Pending
    }
}

/// Input submitted by an organization applying for approval
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NgoDraft {
    pub name: String,
    pub email: String,
    pub city: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub website: Option<String>,
}

impl NgoDraft {
    pub fn new(name: impl Into<String>, email: impl Into<String>, city: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            city: city.into(),
            ..Default::default()
        }
    }
}
