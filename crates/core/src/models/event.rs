//! Event model - a published activity open to volunteers

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Registration;

/// Capacity applied when a draft does not state one
pub const DEFAULT_MAX_PARTICIPANTS: u32 = 50;

/// Cover image applied when a draft does not carry one
pub const DEFAULT_EVENT_IMAGE: &str = "https://images.unsplash.com/photo-1542601906990-b4d3fb778b09?ixlib=rb-4.0.3&auto=format&fit=crop&w=1000&q=80";

/// Event identifier, assigned from the publish timestamp in milliseconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(pub i64);

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for EventId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(EventId)
    }
}

/// Visibility state of an event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventStatus {
    #[default]
    Active,
    Inactive,
    Archived,
}

impl EventStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Inactive => "inactive",
            Self::Archived => "archived",
        }
    }
}

impl FromStr for EventStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "active" => Ok(Self::Active),
            "inactive" => Ok(Self::Inactive),
            "archived" => Ok(Self::Archived),
            other => Err(format!("unknown event status '{}'", other)),
        }
    }
}

/// Who the event is aimed at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    #[default]
    Public,
    Volunteer,
}

/// A published event
///
/// `participants` is a cached copy of `registered_volunteers.len()` and is
/// only ever written by the registration methods.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: EventId,
    pub title: String,
    pub description: String,
    /// Point in time used for filtering and ordering, as stored
    pub date: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,
    pub category: String,
    pub city: String,
    pub address: String,
    pub organization: String,
    pub image: String,
    pub participants: u32,
    pub max_participants: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_phone: Option<String>,
    #[serde(default)]
    pub requirements: String,
    #[serde(default)]
    pub skills: Vec<String>,
    pub is_public: bool,
    pub created_at: DateTime<Utc>,
    pub status: EventStatus,
    #[serde(default)]
    pub registered_volunteers: Vec<Registration>,
    #[serde(rename = "type", default)]
    pub kind: EventKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,
}

impl Event {
    /// Build a fresh event from a draft, filling every default
    pub fn from_draft(draft: EventDraft, id: EventId, created_at: DateTime<Utc>) -> Self {
        let date = draft
            .start_date
            .clone()
            .or(draft.date)
            .unwrap_or_default();

        Self {
            id,
            title: draft.title,
            description: draft.description,
            date,
            start_date: draft.start_date,
            end_date: draft.end_date,
            category: draft.category,
            city: draft.city,
            address: draft.address,
            organization: draft.organization,
            image: draft
                .image
                .unwrap_or_else(|| DEFAULT_EVENT_IMAGE.to_string()),
            participants: 0,
            max_participants: draft
                .max_participants
                .filter(|max| *max > 0)
                .unwrap_or(DEFAULT_MAX_PARTICIPANTS),
            contact_email: draft.contact_email,
            contact_phone: draft.contact_phone,
            requirements: draft.requirements.unwrap_or_default(),
            skills: draft.skills,
            is_public: true,
            created_at,
            status: EventStatus::Active,
            registered_volunteers: Vec::new(),
            kind: draft.kind.unwrap_or_default(),
            created_by: draft.created_by,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == EventStatus::Active
    }

    /// Parsed `date`, if it is in a recognised format
    pub fn starts_at(&self) -> Option<DateTime<Utc>> {
        parse_event_date(&self.date)
    }

    /// Whether the event date is at or after `now`
    pub fn is_upcoming(&self, now: DateTime<Utc>) -> bool {
        self.starts_at().is_some_and(|at| at >= now)
    }

    /// Apply a partial update; registration state is never touched
    pub fn apply(&mut self, update: EventUpdate) {
        if let Some(title) = update.title {
            self.title = title;
        }
        if let Some(description) = update.description {
            self.description = description;
        }
        if let Some(date) = update.date {
            self.date = date;
        }
        if let Some(start_date) = update.start_date {
            self.start_date = Some(start_date);
        }
        if let Some(end_date) = update.end_date {
            self.end_date = Some(end_date);
        }
        if let Some(category) = update.category {
            self.category = category;
        }
        if let Some(city) = update.city {
            self.city = city;
        }
        if let Some(address) = update.address {
            self.address = address;
        }
        if let Some(organization) = update.organization {
            self.organization = organization;
        }
        if let Some(image) = update.image {
            self.image = image;
        }
        if let Some(contact_email) = update.contact_email {
            self.contact_email = Some(contact_email);
        }
        if let Some(contact_phone) = update.contact_phone {
            self.contact_phone = Some(contact_phone);
        }
        if let Some(requirements) = update.requirements {
            self.requirements = requirements;
        }
        if let Some(skills) = update.skills {
            self.skills = skills;
        }
        if let Some(status) = update.status {
            self.status = status;
        }
    }
}

/// Input for publishing an event
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventDraft {
    #[serde(default)]
    pub id: Option<EventId>,
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub end_date: Option<String>,
    pub category: String,
    pub city: String,
    pub address: String,
    pub organization: String,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub max_participants: Option<u32>,
    #[serde(default)]
    pub contact_email: Option<String>,
    #[serde(default)]
    pub contact_phone: Option<String>,
    #[serde(default)]
    pub requirements: Option<String>,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(rename = "type", default)]
    pub kind: Option<EventKind>,
    #[serde(default)]
    pub created_by: Option<String>,
}

impl EventDraft {
    pub fn new(
        title: impl Into<String>,
        description: impl Into<String>,
        category: impl Into<String>,
        city: impl Into<String>,
        address: impl Into<String>,
        organization: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            category: category.into(),
            city: city.into(),
            address: address.into(),
            organization: organization.into(),
            ..Default::default()
        }
    }

    pub fn on(mut self, date: impl Into<String>) -> Self {
        self.date = Some(date.into());
        self
    }

    pub fn starting(mut self, start_date: impl Into<String>) -> Self {
        self.start_date = Some(start_date.into());
        self
    }

    pub fn ending(mut self, end_date: impl Into<String>) -> Self {
        self.end_date = Some(end_date.into());
        self
    }

    pub fn with_capacity(mut self, max_participants: u32) -> Self {
        self.max_participants = Some(max_participants);
        self
    }

    pub fn with_id(mut self, id: EventId) -> Self {
        self.id = Some(id);
        self
    }

    pub fn created_by(mut self, creator: impl Into<String>) -> Self {
        self.created_by = Some(creator.into());
        self
    }
}

/// Partial update for an existing event
///
/// Identity, creation time, capacity and registration state are not
/// reachable through this type.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub date: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub category: Option<String>,
    pub city: Option<String>,
    pub address: Option<String>,
    pub organization: Option<String>,
    pub image: Option<String>,
    pub contact_email: Option<String>,
    pub contact_phone: Option<String>,
    pub requirements: Option<String>,
    pub skills: Option<Vec<String>>,
    pub status: Option<EventStatus>,
}

impl EventUpdate {
    pub fn status(status: EventStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }
}

/// Parse a stored event date
///
/// Accepts RFC 3339, `YYYY-MM-DDTHH:MM[:SS]` (space separator too) and a
/// bare `YYYY-MM-DD`, which is read as midnight UTC.
pub fn parse_event_date(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }

    for fmt in [
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%d %H:%M",
    ] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(naive.and_utc());
        }
    }

    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn draft() -> EventDraft {
        EventDraft::new(
            "Park cleanup",
            "Bring gloves",
            "ecology",
            "Dubna",
            "Central park",
            "Eco Dubna",
        )
    }

    #[test]
    fn test_from_draft_defaults() {
        let now = Utc::now();
        let event = Event::from_draft(draft().on("2030-06-15"), EventId(7), now);

        assert_eq!(event.id, EventId(7));
        assert_eq!(event.date, "2030-06-15");
        assert_eq!(event.status, EventStatus::Active);
        assert_eq!(event.participants, 0);
        assert_eq!(event.max_participants, DEFAULT_MAX_PARTICIPANTS);
        assert_eq!(event.image, DEFAULT_EVENT_IMAGE);
        assert!(event.registered_volunteers.is_empty());
        assert!(event.is_public);
        assert_eq!(event.created_at, now);
    }

    #[test]
    fn test_start_date_wins_over_date() {
        let event = Event::from_draft(
            draft().on("2030-01-01").starting("2030-02-02T10:00"),
            EventId(1),
            Utc::now(),
        );
        assert_eq!(event.date, "2030-02-02T10:00");
        assert_eq!(event.start_date.as_deref(), Some("2030-02-02T10:00"));
    }

    #[test]
    fn test_zero_capacity_falls_back_to_default() {
        let event = Event::from_draft(draft().with_capacity(0), EventId(1), Utc::now());
        assert_eq!(event.max_participants, DEFAULT_MAX_PARTICIPANTS);
    }

    #[test]
    fn test_apply_update_leaves_registrations() {
        let mut event = Event::from_draft(draft().with_capacity(3), EventId(1), Utc::now());
        event.apply(EventUpdate {
            title: Some("River cleanup".to_string()),
            status: Some(EventStatus::Archived),
            ..Default::default()
        });

        assert_eq!(event.title, "River cleanup");
        assert_eq!(event.status, EventStatus::Archived);
        assert_eq!(event.max_participants, 3);
        assert_eq!(event.participants, 0);
    }

    #[test]
    fn test_parse_event_date_formats() {
        let midnight = Utc.with_ymd_and_hms(2024, 6, 15, 0, 0, 0).unwrap();
        assert_eq!(parse_event_date("2024-06-15"), Some(midnight));

        let ten = Utc.with_ymd_and_hms(2024, 6, 15, 10, 0, 0).unwrap();
        assert_eq!(parse_event_date("2024-06-15T10:00"), Some(ten));
        assert_eq!(parse_event_date("2024-06-15 10:00:00"), Some(ten));
        assert_eq!(parse_event_date("2024-06-15T13:00:00+03:00"), Some(ten));

        assert_eq!(parse_event_date("soon"), None);
        assert_eq!(parse_event_date(""), None);
    }

    #[test]
    fn test_serialized_layout_uses_storage_keys() {
        let event = Event::from_draft(draft().on("2030-06-15"), EventId(1), Utc::now());
        let value = serde_json::to_value(&event).unwrap();

        assert_eq!(value["maxParticipants"], 50);
        assert_eq!(value["registeredVolunteers"], serde_json::json!([]));
        assert_eq!(value["status"], "active");
        assert_eq!(value["type"], "public");
        assert!(value.get("startDate").is_none());
    }

    #[test]
    fn test_status_from_str() {
        assert_eq!("Archived".parse::<EventStatus>(), Ok(EventStatus::Archived));
        assert!("gone".parse::<EventStatus>().is_err());
    }
}
