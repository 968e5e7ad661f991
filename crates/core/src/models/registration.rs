//! Volunteer registrations embedded in an event

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Event;

/// One volunteer's sign-up for one event
///
/// The email is the de-duplication key within an event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    /// Any further volunteer-supplied fields
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
    pub registered_at: DateTime<Utc>,
}

/// Volunteer details submitted with a registration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VolunteerData {
    pub email: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl VolunteerData {
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            ..Default::default()
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_phone(mut self, phone: impl Into<String>) -> Self {
        self.phone = Some(phone.into());
        self
    }

    pub fn with_field(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }

    fn into_registration(self, registered_at: DateTime<Utc>) -> Registration {
        Registration {
            email: self.email,
            name: self.name,
            phone: self.phone,
            extra: self.extra,
            registered_at,
        }
    }
}

/// Result of a registration or cancellation attempt
///
/// Every variant is an expected business outcome, not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrationOutcome {
    Registered,
    Unregistered,
    EventNotFound,
    AtCapacity,
    AlreadyRegistered,
}

impl RegistrationOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Registered | Self::Unregistered)
    }

    /// User-facing message for this outcome
    pub fn message(&self) -> &'static str {
        match self {
            Self::Registered => "You have successfully registered for the event",
            Self::Unregistered => "Your registration for the event has been cancelled",
            Self::EventNotFound => "Event not found",
            Self::AtCapacity => "Event is at capacity: the maximum number of participants is reached",
            Self::AlreadyRegistered => "You are already registered for this event",
        }
    }
}

impl Event {
    pub fn is_registered(&self, email: &str) -> bool {
        self.registered_volunteers.iter().any(|r| r.email == email)
    }

    pub fn is_full(&self) -> bool {
        self.registered_volunteers.len() >= self.max_participants as usize
    }

    pub fn spots_left(&self) -> u32 {
        self.max_participants
            .saturating_sub(self.registered_volunteers.len() as u32)
    }

    /// Add a registration, checking capacity before duplicates
    pub fn register(&mut self, volunteer: VolunteerData, now: DateTime<Utc>) -> RegistrationOutcome {
        if self.is_full() {
            return RegistrationOutcome::AtCapacity;
        }

        if self.is_registered(&volunteer.email) {
            return RegistrationOutcome::AlreadyRegistered;
        }

        self.registered_volunteers
            .push(volunteer.into_registration(now));
        self.sync_participants();
        RegistrationOutcome::Registered
    }

    /// Remove every registration for `email`; succeeds when there is none
    pub fn unregister(&mut self, email: &str) -> RegistrationOutcome {
        self.registered_volunteers.retain(|r| r.email != email);
        self.sync_participants();
        RegistrationOutcome::Unregistered
    }

    /// Recompute the cached participant count
    pub fn sync_participants(&mut self) {
        self.participants = self.registered_volunteers.len() as u32;
    }
}
