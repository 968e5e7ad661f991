//! Developer guardrails and invariants
//!
//! Debug assertions for detecting impossible states during development.
//! These checks are compiled out in release builds.

use std::collections::HashSet;

use crate::models::{Event, EventId};

/// Validate that an event's registration state is internally consistent
pub fn assert_event_invariants(event: &Event) {
    debug_assert!(
        event.participants as usize == event.registered_volunteers.len(),
        "Event {} caches {} participants but holds {} registrations",
        event.id,
        event.participants,
        event.registered_volunteers.len()
    );

    debug_assert!(
        event.registered_volunteers.len() <= event.max_participants as usize,
        "Event {} holds {} registrations over capacity {}",
        event.id,
        event.registered_volunteers.len(),
        event.max_participants
    );

    debug_assert!(
        has_unique_emails(event),
        "Event {} holds duplicate registration emails",
        event.id
    );
}

/// Validate that no two events in a collection share an id
pub fn assert_collection_invariants(events: &[Event]) {
    let mut seen: HashSet<EventId> = HashSet::with_capacity(events.len());
    for event in events {
        debug_assert!(seen.insert(event.id), "Duplicate event id {}", event.id);
        assert_event_invariants(event);
    }
}

fn has_unique_emails(event: &Event) -> bool {
    let mut seen = HashSet::with_capacity(event.registered_volunteers.len());
    event
        .registered_volunteers
        .iter()
        .all(|r| seen.insert(r.email.as_str()))
}
