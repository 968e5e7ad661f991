//! Storage repository traits
//!
//! These traits define the storage interface, allowing for different
//! implementations (SQLite, mock, a future shared backend).

use uuid::Uuid;

use crate::error::Result;
use crate::models::{
    Event, EventDraft, EventId, EventUpdate, Identity, NewsDraft, NewsId, NewsItem, NewsUpdate,
    NgoDraft, NgoRegistration, Registration, RegistrationOutcome, VolunteerData,
};
use crate::query::EventFilter;

use super::news::NewsFilter;

/// Event repository operations
pub trait EventRepository {
    /// Publish a draft with defaults filled in
    fn publish_event(&self, draft: EventDraft) -> Result<Event>;

    /// Merge fields into an event
    fn update_event(&self, id: EventId, update: EventUpdate) -> Result<bool>;

    /// Remove an event
    fn unpublish_event(&self, id: EventId) -> Result<()>;

    /// Find event by ID
    fn find_event_by_id(&self, id: EventId) -> Result<Option<Event>>;

    /// Filtered events, soonest first
    fn query_events(&self, filter: &EventFilter) -> Result<Vec<Event>>;

    /// Sign a volunteer up
    fn register_volunteer(&self, id: EventId, volunteer: VolunteerData)
        -> Result<RegistrationOutcome>;

    /// Cancel a volunteer's registration
    fn unregister_volunteer(&self, id: EventId, email: &str) -> Result<RegistrationOutcome>;

    /// Check a registration
    fn is_volunteer_registered(&self, id: EventId, email: &str) -> Result<bool>;

    /// List an event's registrations
    fn list_event_volunteers(&self, id: EventId) -> Result<Vec<Registration>>;
}

/// News repository operations
pub trait NewsRepository {
    fn add_news(&self, actor: &Identity, draft: NewsDraft) -> Result<NewsItem>;

    fn update_news(&self, actor: &Identity, id: NewsId, update: NewsUpdate)
        -> Result<Option<NewsItem>>;

    fn delete_news(&self, actor: &Identity, id: NewsId) -> Result<()>;

    fn list_news(&self, filter: &NewsFilter) -> Result<Vec<NewsItem>>;
}

/// NGO moderation operations
pub trait NgoRepository {
    fn register_ngo(&self, draft: NgoDraft) -> Result<NgoRegistration>;

    fn list_pending_ngos(&self) -> Result<Vec<NgoRegistration>>;

    fn approve_ngo(&self, actor: &Identity, id: Uuid) -> Result<bool>;

    fn reject_ngo(&self, actor: &Identity, id: Uuid, reason: &str) -> Result<bool>;
}

/// Combined storage interface
///
/// Provides access to all repository operations.
pub trait Storage: EventRepository + NewsRepository + NgoRepository {}

// Blanket implementation: any type implementing all traits implements Storage
impl<T> Storage for T where T: EventRepository + NewsRepository + NgoRepository {}
