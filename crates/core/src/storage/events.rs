//! Event storage operations
//!
//! The whole event collection is one document; every mutation reads it,
//! changes it and writes it back against the version it read.

use std::collections::BTreeSet;

use chrono::{DateTime, Duration, Utc};
use rusqlite::Connection;
use tracing::{debug, info, instrument, warn};

use super::kv::{Change, KvStore};
use crate::calendar::CalendarEntry;
use crate::error::{Error, Result};
use crate::invariants::{assert_collection_invariants, assert_event_invariants};
use crate::models::{
    Event, EventDraft, EventId, EventStatus, EventUpdate, Identity, Registration,
    RegistrationOutcome, VolunteerData,
};
use crate::permissions::{require, PermissionMatrix, PlatformAction};
use crate::query::{self, EventFilter};
use crate::stats::{EventsStats, OrganizationStats, VolunteerStats};

/// Storage key of the event collection
pub const EVENTS_KEY: &str = "publicEvents";

/// Categories considered when recommending events
const RECOMMENDED_CATEGORIES: usize = 2;

pub struct EventStore<'a> {
    conn: &'a Connection,
}

impl<'a> EventStore<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    fn kv(&self) -> KvStore<'a> {
        KvStore::new(self.conn)
    }

    /// Every stored event, any status, in storage order
    pub fn all(&self) -> Result<Vec<Event>> {
        Ok(self.kv().load(EVENTS_KEY)?.items)
    }

    // ==================== Mutations ====================

    /// Publish a draft, filling defaults and assigning an id
    #[instrument(skip(self, draft), fields(title = %draft.title))]
    pub fn publish(&self, draft: EventDraft) -> Result<Event> {
        let now = Utc::now();
        let event = self.kv().modify(EVENTS_KEY, |events: &mut Vec<Event>| {
            let id = match draft.id {
                Some(id) if !events.iter().any(|e| e.id == id) => id,
                Some(id) => {
                    warn!(%id, "Draft id already taken, assigning a fresh one");
                    next_id(events, now)
                }
                None => next_id(events, now),
            };

            let event = Event::from_draft(draft, id, now);
            events.push(event.clone());
            assert_collection_invariants(events);
            Change::Write(event)
        })?;

        info!(event_id = %event.id, "Published event");
        Ok(event)
    }

    /// Publish on behalf of an identity, recording it as the creator
    pub fn publish_as(&self, actor: &Identity, mut draft: EventDraft) -> Result<Event> {
        require(actor, PlatformAction::PublishEvent)?;
        if draft.created_by.is_none() {
            draft.created_by = Some(actor.email.clone());
        }
        self.publish(draft)
    }

    /// Merge fields into an event; false if no event has that id
    #[instrument(skip(self, update))]
    pub fn update(&self, id: EventId, update: EventUpdate) -> Result<bool> {
        let updated = self.kv().modify(EVENTS_KEY, |events: &mut Vec<Event>| {
            match events.iter_mut().find(|e| e.id == id) {
                Some(event) => {
                    event.apply(update);
                    assert_event_invariants(event);
                    Change::Write(true)
                }
                None => Change::Keep(false),
            }
        })?;

        if updated {
            debug!(event_id = %id, "Updated event");
        }
        Ok(updated)
    }

    /// Update guarded by ownership: the creator, its organization or an admin
    pub fn update_as(&self, actor: &Identity, id: EventId, update: EventUpdate) -> Result<bool> {
        match self.get_by_id(id)? {
            Some(event) => {
                ensure_can_manage(actor, &event)?;
                self.update(id, update)
            }
            None => Ok(false),
        }
    }

    /// Change only the status
    pub fn set_status(&self, id: EventId, status: EventStatus) -> Result<bool> {
        self.update(id, EventUpdate::status(status))
    }

    /// Remove an event; a missing id is a no-op
    #[instrument(skip(self))]
    pub fn unpublish(&self, id: EventId) -> Result<()> {
        let removed = self.kv().modify(EVENTS_KEY, |events: &mut Vec<Event>| {
            let before = events.len();
            events.retain(|e| e.id != id);
            if events.len() == before {
                Change::Keep(false)
            } else {
                Change::Write(true)
            }
        })?;

        if removed {
            info!(event_id = %id, "Unpublished event");
        }
        Ok(())
    }

    /// Removal guarded by ownership
    pub fn unpublish_as(&self, actor: &Identity, id: EventId) -> Result<()> {
        if let Some(event) = self.get_by_id(id)? {
            ensure_can_manage(actor, &event)?;
        }
        self.unpublish(id)
    }

    // ==================== Registrations ====================

    /// Sign a volunteer up: existence, then capacity, then duplicate email
    ///
    /// Only active events accept registrations.
    #[instrument(skip(self, volunteer), fields(email = %volunteer.email))]
    pub fn register_volunteer(
        &self,
        id: EventId,
        volunteer: VolunteerData,
    ) -> Result<RegistrationOutcome> {
        let now = Utc::now();
        let outcome = self.kv().modify(EVENTS_KEY, |events: &mut Vec<Event>| {
            let Some(event) = events.iter_mut().find(|e| e.id == id && e.is_active()) else {
                return Change::Keep(RegistrationOutcome::EventNotFound);
            };

            let outcome = event.register(volunteer, now);
            assert_event_invariants(event);
            if outcome.is_success() {
                Change::Write(outcome)
            } else {
                Change::Keep(outcome)
            }
        })?;

        debug!(event_id = %id, ?outcome, "Registration attempt");
        Ok(outcome)
    }

    /// Cancel a registration; succeeds even when the email was not registered
    #[instrument(skip(self))]
    pub fn unregister_volunteer(&self, id: EventId, email: &str) -> Result<RegistrationOutcome> {
        let outcome = self.kv().modify(EVENTS_KEY, |events: &mut Vec<Event>| {
            let Some(event) = events.iter_mut().find(|e| e.id == id) else {
                return Change::Keep(RegistrationOutcome::EventNotFound);
            };

            let before = event.registered_volunteers.len();
            let outcome = event.unregister(email);
            assert_event_invariants(event);
            if event.registered_volunteers.len() == before {
                Change::Keep(outcome)
            } else {
                Change::Write(outcome)
            }
        })?;

        debug!(event_id = %id, ?outcome, "Unregistration attempt");
        Ok(outcome)
    }

    pub fn is_registered(&self, id: EventId, email: &str) -> Result<bool> {
        Ok(self
            .get_by_id(id)?
            .is_some_and(|event| event.is_registered(email)))
    }

    /// Registrations of an event, in registration order
    pub fn event_volunteers(&self, id: EventId) -> Result<Vec<Registration>> {
        Ok(self
            .get_by_id(id)?
            .map(|event| event.registered_volunteers)
            .unwrap_or_default())
    }

    // ==================== Queries ====================

    /// Look up an event of any status
    pub fn get_by_id(&self, id: EventId) -> Result<Option<Event>> {
        Ok(self.all()?.into_iter().find(|e| e.id == id))
    }

    /// Filtered view, soonest first
    pub fn query(&self, filter: &EventFilter) -> Result<Vec<Event>> {
        Ok(filter.apply(self.all()?))
    }

    /// Free-text search on top of a filter
    pub fn search(&self, text: &str, filter: &EventFilter) -> Result<Vec<Event>> {
        let filter = filter.clone().search(text);
        self.query(&filter)
    }

    pub fn by_category(&self, category: &str, limit: usize) -> Result<Vec<Event>> {
        let mut events = self.query(&EventFilter::new().category(category))?;
        events.truncate(limit);
        Ok(events)
    }

    pub fn by_city(&self, city: &str, limit: usize) -> Result<Vec<Event>> {
        let mut events = self.query(&EventFilter::new().city(city))?;
        events.truncate(limit);
        Ok(events)
    }

    /// Active events dated from now on, soonest first
    pub fn upcoming(&self, limit: usize) -> Result<Vec<Event>> {
        self.upcoming_from(Utc::now(), limit)
    }

    pub fn upcoming_from(&self, now: DateTime<Utc>, limit: usize) -> Result<Vec<Event>> {
        Ok(self
            .query(&EventFilter::new())?
            .into_iter()
            .filter(|e| e.is_upcoming(now))
            .take(limit)
            .collect())
    }

    /// Active events with the most participants first
    pub fn popular(&self, limit: usize) -> Result<Vec<Event>> {
        let mut events = self.query(&EventFilter::new())?;
        query::sort_by_participants(&mut events);
        events.truncate(limit);
        Ok(events)
    }

    /// Most recently created active events first
    pub fn recent(&self, limit: usize) -> Result<Vec<Event>> {
        let mut events = self.query(&EventFilter::new())?;
        query::sort_by_created(&mut events);
        events.truncate(limit);
        Ok(events)
    }

    /// Active events the volunteer is registered for
    pub fn by_volunteer(&self, email: &str) -> Result<Vec<Event>> {
        Ok(self
            .query(&EventFilter::new())?
            .into_iter()
            .filter(|e| e.is_registered(email))
            .collect())
    }

    /// Upcoming events in the volunteer's two favourite categories that
    /// they have not joined yet
    pub fn recommended(&self, email: &str, limit: usize) -> Result<Vec<Event>> {
        self.recommended_from(email, Utc::now(), limit)
    }

    pub fn recommended_from(
        &self,
        email: &str,
        now: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<Event>> {
        let active = self.query(&EventFilter::new())?;
        let joined: Vec<Event> = active
            .iter()
            .filter(|e| e.is_registered(email))
            .cloned()
            .collect();
        let favourites = query::top_categories(&joined, RECOMMENDED_CATEGORIES);

        Ok(active
            .into_iter()
            .filter(|e| {
                favourites.contains(&e.category) && !e.is_registered(email) && e.is_upcoming(now)
            })
            .take(limit)
            .collect())
    }

    /// Organization view: its events of every status unless one is given,
    /// newest first
    pub fn organization_events(
        &self,
        organization: &str,
        status: Option<EventStatus>,
    ) -> Result<Vec<Event>> {
        let mut events: Vec<Event> = self
            .all()?
            .into_iter()
            .filter(|e| e.organization == organization)
            .filter(|e| status.map_or(true, |s| e.status == s))
            .collect();
        query::sort_by_created(&mut events);
        Ok(events)
    }

    // ==================== Statistics & exchange ====================

    pub fn stats(&self) -> Result<EventsStats> {
        let events = self.query(&EventFilter::new())?;
        Ok(EventsStats::compute(&events, Utc::now()))
    }

    pub fn organization_stats(&self, organization: &str) -> Result<OrganizationStats> {
        let events = self.query(&EventFilter::new().organization(organization))?;
        Ok(OrganizationStats::compute(&events, Utc::now()))
    }

    pub fn volunteer_stats(&self, email: &str) -> Result<VolunteerStats> {
        let events = self.by_volunteer(email)?;
        Ok(VolunteerStats::compute(&events, Utc::now()))
    }

    /// Active events as calendar entries, soonest first
    pub fn export_calendar(&self) -> Result<Vec<CalendarEntry>> {
        Ok(self
            .query(&EventFilter::new())?
            .iter()
            .map(CalendarEntry::from)
            .collect())
    }

    /// Add drafts whose id is not stored yet; returns the collection size
    ///
    /// Imported events start over with no registrations.
    #[instrument(skip(self, drafts), fields(count = drafts.len()))]
    pub fn import(&self, drafts: Vec<EventDraft>) -> Result<usize> {
        let now = Utc::now();
        let (added, total) = self.kv().modify(EVENTS_KEY, |events: &mut Vec<Event>| {
            let mut added = 0;
            for draft in drafts {
                if let Some(id) = draft.id {
                    if events.iter().any(|e| e.id == id) {
                        continue;
                    }
                }
                let id = draft.id.unwrap_or_else(|| next_id(events, now));
                events.push(Event::from_draft(draft, id, now));
                added += 1;
            }
            assert_collection_invariants(events);

            let total = events.len();
            if added > 0 {
                Change::Write((added, total))
            } else {
                Change::Keep((added, total))
            }
        })?;

        info!(added, total, "Imported events");
        Ok(total)
    }

    /// Drop inactive events dated more than `days_old` days ago
    pub fn cleanup(&self, days_old: i64) -> Result<usize> {
        let cutoff = Duration::try_days(days_old)
            .and_then(|age| Utc::now().checked_sub_signed(age))
            .ok_or_else(|| {
                Error::InvalidOperation(format!("cleanup age out of range: {days_old} days"))
            })?;
        self.cleanup_before(cutoff)
    }

    #[instrument(skip(self))]
    pub fn cleanup_before(&self, cutoff: DateTime<Utc>) -> Result<usize> {
        let removed = self.kv().modify(EVENTS_KEY, |events: &mut Vec<Event>| {
            let before = events.len();
            events.retain(|e| e.is_active() || e.starts_at().map_or(true, |at| at >= cutoff));
            let removed = before - events.len();
            if removed > 0 {
                Change::Write(removed)
            } else {
                Change::Keep(0)
            }
        })?;

        if removed > 0 {
            info!(removed, %cutoff, "Cleaned up old events");
        }
        Ok(removed)
    }

    /// Fill an empty store with sample events; returns how many were added
    pub fn seed_samples(&self) -> Result<usize> {
        if !self.all()?.is_empty() {
            return Ok(0);
        }
        let samples = sample_events();
        let count = samples.len();
        self.import(samples)?;
        Ok(count)
    }
}

/// Millisecond timestamp, bumped past every id already in use
fn next_id(events: &[Event], now: DateTime<Utc>) -> EventId {
    let max_existing = events.iter().map(|e| e.id.0).max().unwrap_or(0);
    match max_existing.checked_add(1) {
        Some(next) => EventId(now.timestamp_millis().max(next)),
        None => smallest_unused_id(events),
    }
}

/// Lowest positive id not yet taken
fn smallest_unused_id(events: &[Event]) -> EventId {
    let taken: BTreeSet<i64> = events.iter().map(|e| e.id.0).collect();
    let mut candidate = 1;
    for id in taken.range(1..) {
        if *id != candidate {
            break;
        }
        candidate += 1;
    }
    EventId(candidate)
}

fn ensure_can_manage(actor: &Identity, event: &Event) -> Result<()> {
    if PermissionMatrix::can_manage_event(actor, event) {
        Ok(())
    } else {
        Err(Error::PermissionDenied(format!(
            "{} cannot manage event {}",
            actor.email, event.id
        )))
    }
}

fn sample_events() -> Vec<EventDraft> {
    vec![
        EventDraft::new(
            "Park cleanup day",
            "Join us to clean up the city park. Gloves and bags provided.",
            "ecology",
            "Dubna",
            "Central Park, main entrance",
            "Eco Dubna",
        )
        .with_id(EventId(1))
        .on("2030-06-15")
        .with_capacity(30),
        EventDraft::new(
            "Charity run",
            "Five kilometres for the children's hospital.",
            "sport",
            "Obninsk",
            "City stadium",
            "Run For Good",
        )
        .with_id(EventId(2))
        .on("2030-07-01")
        .with_capacity(100),
        EventDraft::new(
            "Reading to seniors",
            "Weekly reading afternoons at the care home.",
            "social",
            "Sarov",
            "Care home, Lenina 12",
            "Warm Hearts",
        )
        .with_id(EventId(3))
        .on("2030-06-20")
        .with_capacity(10),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::Database;

    fn draft(title: &str, city: &str, category: &str, date: &str) -> EventDraft {
        EventDraft::new(title, "Helping out", category, city, "Main street 1", "Good Deeds").on(date)
    }

    #[test]
    fn test_publish_then_get_round_trip() {
        let db = Database::open_in_memory().unwrap();
        let store = EventStore::new(&db.conn);

        let input = draft("Cleanup", "Dubna", "ecology", "2030-01-01").with_capacity(12);
        let published = store.publish(input.clone()).unwrap();
        let loaded = store.get_by_id(published.id).unwrap().unwrap();

        assert_eq!(loaded, published);
        assert_eq!(loaded, Event::from_draft(input, published.id, published.created_at));
        assert_eq!(loaded.status, EventStatus::Active);
        assert_eq!(loaded.participants, 0);
        assert!(loaded.registered_volunteers.is_empty());
    }

    #[test]
    fn test_ids_are_unique() {
        let db = Database::open_in_memory().unwrap();
        let store = EventStore::new(&db.conn);

        let a = store.publish(draft("A", "Dubna", "ecology", "2030-01-01")).unwrap();
        let b = store.publish(draft("B", "Dubna", "ecology", "2030-01-01")).unwrap();
        let c = store
            .publish(draft("C", "Dubna", "ecology", "2030-01-01").with_id(a.id))
            .unwrap();

        assert!(b.id > a.id);
        assert_ne!(c.id, a.id);
        assert_eq!(store.all().unwrap().len(), 3);
    }

    #[test]
    fn test_update_and_missing_update() {
        let db = Database::open_in_memory().unwrap();
        let store = EventStore::new(&db.conn);
        let event = store.publish(draft("A", "Dubna", "ecology", "2030-01-01")).unwrap();

        let update = EventUpdate {
            city: Some("Sarov".to_string()),
            ..Default::default()
        };
        assert!(store.update(event.id, update.clone()).unwrap());
        assert_eq!(store.get_by_id(event.id).unwrap().unwrap().city, "Sarov");

        assert!(!store.update(EventId(-1), update).unwrap());
    }

    #[test]
    fn test_unpublish_is_idempotent() {
        let db = Database::open_in_memory().unwrap();
        let store = EventStore::new(&db.conn);
        let event = store.publish(draft("A", "Dubna", "ecology", "2030-01-01")).unwrap();

        store.unpublish(event.id).unwrap();
        store.unpublish(event.id).unwrap();
        assert!(store.get_by_id(event.id).unwrap().is_none());
    }

    #[test]
    fn test_capacity_scenario() {
        let db = Database::open_in_memory().unwrap();
        let store = EventStore::new(&db.conn);
        let event = store
            .publish(draft("A", "Dubna", "ecology", "2030-01-01").with_capacity(1))
            .unwrap();

        let first = store
            .register_volunteer(event.id, VolunteerData::new("a@x.com"))
            .unwrap();
        assert_eq!(first, RegistrationOutcome::Registered);
        assert_eq!(store.get_by_id(event.id).unwrap().unwrap().participants, 1);

        let second = store
            .register_volunteer(event.id, VolunteerData::new("b@x.com"))
            .unwrap();
        assert_eq!(second, RegistrationOutcome::AtCapacity);
        assert!(!second.is_success());

        let stored = store.get_by_id(event.id).unwrap().unwrap();
        assert_eq!(stored.participants, 1);
        assert_eq!(stored.registered_volunteers.len(), 1);
    }

    #[test]
    fn test_duplicate_registration() {
        let db = Database::open_in_memory().unwrap();
        let store = EventStore::new(&db.conn);
        let event = store.publish(draft("A", "Dubna", "ecology", "2030-01-01")).unwrap();

        store
            .register_volunteer(event.id, VolunteerData::new("a@x.com").with_name("Anna"))
            .unwrap();
        let again = store
            .register_volunteer(event.id, VolunteerData::new("a@x.com"))
            .unwrap();

        assert_eq!(again, RegistrationOutcome::AlreadyRegistered);
        assert_eq!(store.event_volunteers(event.id).unwrap().len(), 1);
        assert!(store.is_registered(event.id, "a@x.com").unwrap());
        assert!(!store.is_registered(event.id, "b@x.com").unwrap());
    }

    #[test]
    fn test_register_missing_or_inactive_event() {
        let db = Database::open_in_memory().unwrap();
        let store = EventStore::new(&db.conn);

        let missing = store
            .register_volunteer(EventId(99), VolunteerData::new("a@x.com"))
            .unwrap();
        assert_eq!(missing, RegistrationOutcome::EventNotFound);

        let event = store.publish(draft("A", "Dubna", "ecology", "2030-01-01")).unwrap();
        store.set_status(event.id, EventStatus::Archived).unwrap();
        let archived = store
            .register_volunteer(event.id, VolunteerData::new("a@x.com"))
            .unwrap();
        assert_eq!(archived, RegistrationOutcome::EventNotFound);
    }

    #[test]
    fn test_unregister() {
        let db = Database::open_in_memory().unwrap();
        let store = EventStore::new(&db.conn);
        let event = store.publish(draft("A", "Dubna", "ecology", "2030-01-01")).unwrap();
        store
            .register_volunteer(event.id, VolunteerData::new("a@x.com"))
            .unwrap();

        let stranger = store.unregister_volunteer(event.id, "nobody@x.com").unwrap();
        assert_eq!(stranger, RegistrationOutcome::Unregistered);
        assert_eq!(store.event_volunteers(event.id).unwrap().len(), 1);

        let member = store.unregister_volunteer(event.id, "a@x.com").unwrap();
        assert!(member.is_success());
        let stored = store.get_by_id(event.id).unwrap().unwrap();
        assert_eq!(stored.participants, 0);
        assert!(stored.registered_volunteers.is_empty());

        let missing = store.unregister_volunteer(EventId(99), "a@x.com").unwrap();
        assert_eq!(missing, RegistrationOutcome::EventNotFound);
    }

    #[test]
    fn test_participants_track_registrations() {
        let db = Database::open_in_memory().unwrap();
        let store = EventStore::new(&db.conn);
        let event = store
            .publish(draft("A", "Dubna", "ecology", "2030-01-01").with_capacity(3))
            .unwrap();

        for email in ["a@x.com", "b@x.com", "a@x.com", "c@x.com", "d@x.com"] {
            store
                .register_volunteer(event.id, VolunteerData::new(email))
                .unwrap();
            let stored = store.get_by_id(event.id).unwrap().unwrap();
            assert_eq!(stored.participants as usize, stored.registered_volunteers.len());
        }
        store.unregister_volunteer(event.id, "b@x.com").unwrap();

        let stored = store.get_by_id(event.id).unwrap().unwrap();
        let emails: Vec<&str> = stored
            .registered_volunteers
            .iter()
            .map(|r| r.email.as_str())
            .collect();
        assert_eq!(emails, vec!["a@x.com", "c@x.com"]);
        assert_eq!(stored.participants, 2);
    }

    #[test]
    fn test_query_city_and_default_status() {
        let db = Database::open_in_memory().unwrap();
        let store = EventStore::new(&db.conn);
        store.publish(draft("A", "Dubna", "ecology", "2030-01-02")).unwrap();
        store.publish(draft("B", "Dubna Oblast", "ecology", "2030-01-01")).unwrap();
        store.publish(draft("C", "Sarov", "ecology", "2030-01-03")).unwrap();
        let hidden = store.publish(draft("D", "Dubna", "ecology", "2030-01-04")).unwrap();
        store.set_status(hidden.id, EventStatus::Inactive).unwrap();

        let titles: Vec<String> = store
            .query(&EventFilter::new().city("Dubna"))
            .unwrap()
            .into_iter()
            .map(|e| e.title)
            .collect();
        assert_eq!(titles, vec!["B", "A"]);

        let all_active = store.query(&EventFilter::new()).unwrap();
        assert_eq!(all_active.len(), 3);
        assert!(all_active.iter().all(|e| e.status == EventStatus::Active));

        let inactive = store
            .query(&EventFilter::new().status(EventStatus::Inactive))
            .unwrap();
        assert_eq!(inactive.len(), 1);
    }

    #[test]
    fn test_upcoming_popular_recent() {
        let db = Database::open_in_memory().unwrap();
        let store = EventStore::new(&db.conn);
        let past = store.publish(draft("Past", "Dubna", "ecology", "2001-01-01")).unwrap();
        let later = store.publish(draft("Later", "Dubna", "ecology", "2099-06-01")).unwrap();
        let sooner = store.publish(draft("Sooner", "Dubna", "ecology", "2099-01-01")).unwrap();

        let upcoming = store.upcoming(10).unwrap();
        let ids: Vec<EventId> = upcoming.iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![sooner.id, later.id]);
        assert_eq!(store.upcoming(1).unwrap().len(), 1);

        store.register_volunteer(later.id, VolunteerData::new("a@x.com")).unwrap();
        store.register_volunteer(later.id, VolunteerData::new("b@x.com")).unwrap();
        store.register_volunteer(past.id, VolunteerData::new("a@x.com")).unwrap();
        let popular = store.popular(2).unwrap();
        assert_eq!(popular[0].id, later.id);
        assert_eq!(popular[1].id, past.id);

        let recent = store.recent(1).unwrap();
        assert_eq!(recent[0].id, sooner.id);
    }

    #[test]
    fn test_by_volunteer_and_recommended() {
        let db = Database::open_in_memory().unwrap();
        let store = EventStore::new(&db.conn);
        let e1 = store.publish(draft("E1", "Dubna", "ecology", "2099-01-01")).unwrap();
        let e2 = store.publish(draft("E2", "Dubna", "ecology", "2099-02-01")).unwrap();
        let s1 = store.publish(draft("S1", "Dubna", "sport", "2099-01-05")).unwrap();
        store.publish(draft("C1", "Dubna", "culture", "2099-01-06")).unwrap();
        let e3 = store.publish(draft("E3", "Dubna", "ecology", "2099-03-01")).unwrap();
        let s2 = store.publish(draft("S2", "Dubna", "sport", "2099-04-01")).unwrap();
        store.publish(draft("E-old", "Dubna", "ecology", "2001-01-01")).unwrap();
        store.publish(draft("A1", "Dubna", "animals", "2099-01-01")).unwrap();

        let me = "me@x.com";
        for id in [e1.id, e2.id, s1.id] {
            store.register_volunteer(id, VolunteerData::new(me)).unwrap();
        }

        let mine: Vec<EventId> = store.by_volunteer(me).unwrap().iter().map(|e| e.id).collect();
        assert_eq!(mine, vec![e1.id, s1.id, e2.id]);

        let recommended: Vec<EventId> = store
            .recommended(me, 10)
            .unwrap()
            .iter()
            .map(|e| e.id)
            .collect();
        assert_eq!(recommended, vec![e3.id, s2.id]);
        assert_eq!(store.recommended(me, 1).unwrap().len(), 1);
        assert!(store.recommended("nobody@x.com", 10).unwrap().is_empty());
    }

    #[test]
    fn test_organization_view_is_derived() {
        let db = Database::open_in_memory().unwrap();
        let store = EventStore::new(&db.conn);
        let mut other = draft("Other", "Dubna", "ecology", "2030-01-01");
        other.organization = "Someone Else".to_string();
        store.publish(other).unwrap();
        let first = store.publish(draft("First", "Dubna", "ecology", "2030-01-01")).unwrap();
        let second = store.publish(draft("Second", "Dubna", "ecology", "2030-01-01")).unwrap();
        store.set_status(first.id, EventStatus::Archived).unwrap();

        let view = store.organization_events("Good Deeds", None).unwrap();
        let ids: Vec<EventId> = view.iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![second.id, first.id]);

        // Registrations show up without a second write
        store.register_volunteer(second.id, VolunteerData::new("a@x.com")).unwrap();
        let view = store
            .organization_events("Good Deeds", Some(EventStatus::Active))
            .unwrap();
        assert_eq!(view.len(), 1);
        assert_eq!(view[0].participants, 1);
    }

    #[test]
    fn test_update_as_requires_ownership() {
        let db = Database::open_in_memory().unwrap();
        let store = EventStore::new(&db.conn);
        let owner = Identity::volunteer("owner@x.com");
        let event = store
            .publish_as(&owner, draft("A", "Dubna", "ecology", "2030-01-01"))
            .unwrap();
        assert_eq!(event.created_by.as_deref(), Some("owner@x.com"));

        let update = EventUpdate {
            title: Some("B".to_string()),
            ..Default::default()
        };
        let stranger = Identity::volunteer("other@x.com");
        assert!(matches!(
            store.update_as(&stranger, event.id, update.clone()),
            Err(Error::PermissionDenied(_))
        ));
        assert!(matches!(
            store.unpublish_as(&stranger, event.id),
            Err(Error::PermissionDenied(_))
        ));

        assert!(store.update_as(&owner, event.id, update).unwrap());
        store.unpublish_as(&Identity::admin("root@x.com"), event.id).unwrap();
        assert!(store.get_by_id(event.id).unwrap().is_none());
    }

    #[test]
    fn test_import_skips_known_ids() {
        let db = Database::open_in_memory().unwrap();
        let store = EventStore::new(&db.conn);

        assert_eq!(store.seed_samples().unwrap(), 3);
        assert_eq!(store.seed_samples().unwrap(), 0);

        let total = store
            .import(vec![
                draft("Dup", "Dubna", "ecology", "2030-01-01").with_id(EventId(1)),
                draft("New", "Dubna", "ecology", "2030-01-01").with_id(EventId(10)),
            ])
            .unwrap();
        assert_eq!(total, 4);
        assert_eq!(store.get_by_id(EventId(1)).unwrap().unwrap().title, "Park cleanup day");
    }

    #[test]
    fn test_cleanup_keeps_active_events() {
        let db = Database::open_in_memory().unwrap();
        let store = EventStore::new(&db.conn);
        let old_active = store.publish(draft("A", "Dubna", "ecology", "2001-01-01")).unwrap();
        let old_archived = store.publish(draft("B", "Dubna", "ecology", "2001-01-01")).unwrap();
        let new_archived = store.publish(draft("C", "Dubna", "ecology", "2099-01-01")).unwrap();
        store.set_status(old_archived.id, EventStatus::Archived).unwrap();
        store.set_status(new_archived.id, EventStatus::Archived).unwrap();

        assert_eq!(store.cleanup(30).unwrap(), 1);
        assert!(store.get_by_id(old_active.id).unwrap().is_some());
        assert!(store.get_by_id(old_archived.id).unwrap().is_none());
        assert!(store.get_by_id(new_archived.id).unwrap().is_some());
        assert_eq!(store.cleanup(30).unwrap(), 0);
    }

    #[test]
    fn test_ids_after_largest_possible_id() {
        let db = Database::open_in_memory().unwrap();
        let store = EventStore::new(&db.conn);

        store
            .import(vec![draft("Max", "Dubna", "ecology", "2030-01-01").with_id(EventId(i64::MAX))])
            .unwrap();
        store
            .import(vec![draft("One", "Dubna", "ecology", "2030-01-01").with_id(EventId(1))])
            .unwrap();

        let a = store.publish(draft("A", "Dubna", "ecology", "2030-01-01")).unwrap();
        let b = store.publish(draft("B", "Dubna", "ecology", "2030-01-01")).unwrap();
        assert_eq!(a.id, EventId(2));
        assert_eq!(b.id, EventId(3));

        let total = store
            .import(vec![draft("C", "Dubna", "ecology", "2030-01-01")])
            .unwrap();
        assert_eq!(total, 5);
    }

    #[test]
    fn test_cleanup_age_out_of_range() {
        let db = Database::open_in_memory().unwrap();
        let store = EventStore::new(&db.conn);
        let event = store.publish(draft("A", "Dubna", "ecology", "2001-01-01")).unwrap();
        store.set_status(event.id, EventStatus::Archived).unwrap();

        assert!(matches!(
            store.cleanup(i64::MAX / 1000),
            Err(Error::InvalidOperation(_))
        ));
        assert!(matches!(
            store.cleanup(i64::MIN),
            Err(Error::InvalidOperation(_))
        ));
        assert!(store.get_by_id(event.id).unwrap().is_some());
    }

    #[test]
    fn test_concurrent_registrations_are_not_lost() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("heroes.db");
        let first = Database::open(&path).unwrap();
        let second = Database::open(&path).unwrap();
        let event = first
            .events()
            .publish(draft("A", "Dubna", "ecology", "2030-01-01"))
            .unwrap();

        // The first handle reads, then the second registers before it writes back
        let stale = first.kv().load::<Event>(EVENTS_KEY).unwrap();
        assert_eq!(
            second
                .events()
                .register_volunteer(event.id, VolunteerData::new("b@x.com"))
                .unwrap(),
            RegistrationOutcome::Registered
        );

        let mut items = stale.items;
        items[0].register(VolunteerData::new("a@x.com"), Utc::now());
        let err = first.kv().save(EVENTS_KEY, &items, stale.version).unwrap_err();
        assert!(matches!(err, Error::Conflict { .. }));
        assert!(first.events().is_registered(event.id, "b@x.com").unwrap());

        // A fresh attempt through the store sees both volunteers
        assert_eq!(
            first
                .events()
                .register_volunteer(event.id, VolunteerData::new("a@x.com"))
                .unwrap(),
            RegistrationOutcome::Registered
        );
        let volunteers = second.events().event_volunteers(event.id).unwrap();
        let emails: Vec<&str> = volunteers.iter().map(|r| r.email.as_str()).collect();
        assert_eq!(emails, vec!["b@x.com", "a@x.com"]);
        assert_eq!(second.events().get_by_id(event.id).unwrap().unwrap().participants, 2);
    }

    #[test]
    fn test_stats_and_export() {
        let db = Database::open_in_memory().unwrap();
        let store = EventStore::new(&db.conn);
        store.seed_samples().unwrap();
        store
            .register_volunteer(EventId(1), VolunteerData::new("a@x.com"))
            .unwrap();

        let stats = store.stats().unwrap();
        assert_eq!(stats.total_events, 3);
        assert_eq!(stats.total_participants, 1);
        assert_eq!(stats.total_organizations, 3);

        let org = store.organization_stats("Eco Dubna").unwrap();
        assert_eq!(org.total_events, 1);
        assert_eq!(org.avg_participants, 1.0);

        let mine = store.volunteer_stats("a@x.com").unwrap();
        assert_eq!(mine.total_events, 1);
        assert_eq!(mine.favorite_category.as_deref(), Some("ecology"));

        let calendar = store.export_calendar().unwrap();
        assert_eq!(calendar.len(), 3);
        assert_eq!(calendar[0].id, EventId(1));
    }
}
