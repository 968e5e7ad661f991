//! Calendar export of published events

use serde::{Deserialize, Serialize};

use crate::models::{Event, EventId};

/// Flat record consumed by calendar widgets
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarEntry {
    pub id: EventId,
    pub title: String,
    pub start: String,
    pub end: String,
    pub description: String,
    pub location: String,
    pub organizer: String,
    pub category: String,
    pub participants: u32,
    pub max_participants: u32,
    pub url: String,
}

impl From<&Event> for CalendarEntry {
    fn from(event: &Event) -> Self {
        Self {
            id: event.id,
            title: event.title.clone(),
            start: event.start_date.clone().unwrap_or_else(|| event.date.clone()),
            end: event.end_date.clone().unwrap_or_else(|| event.date.clone()),
            description: event.description.clone(),
            location: format!("{}, {}", event.address, event.city),
            organizer: event.organization.clone(),
            category: event.category.clone(),
            participants: event.participants,
            max_participants: event.max_participants,
            url: format!("event-details.html?id={}", event.id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::EventDraft;
    use chrono::Utc;

    #[test]
    fn test_entry_from_event() {
        let draft = EventDraft::new("Concert", "Charity", "culture", "Ozersk", "Lenina 5", "Choir")
            .starting("2030-04-01T18:00")
            .with_capacity(20);
        let event = Event::from_draft(draft, EventId(42), Utc::now());
        let entry = CalendarEntry::from(&event);

        assert_eq!(entry.start, "2030-04-01T18:00");
        // No end date falls back to the event date
        assert_eq!(entry.end, "2030-04-01T18:00");
        assert_eq!(entry.location, "Lenina 5, Ozersk");
        assert_eq!(entry.url, "event-details.html?id=42");
        assert_eq!(entry.max_participants, 20);
    }
}
