//! SQLite-backed key-value storage for Heroes

mod events;
mod favorites;
mod kv;
mod migrations;
mod news;
mod ngo;
mod parse;
mod traits;

use rusqlite::Connection;
use std::path::Path;
use tracing::instrument;
use uuid::Uuid;

use crate::error::Result;
use crate::models::{
    Event, EventDraft, EventId, EventUpdate, Identity, NewsDraft, NewsId, NewsItem, NewsUpdate,
    NgoDraft, NgoRegistration, Registration, RegistrationOutcome, VolunteerData,
};
use crate::query::EventFilter;

pub use events::{EventStore, EVENTS_KEY};
pub use favorites::{FavoriteKind, FavoritesStore, UserFavorites, FAVORITES_KEY};
pub use kv::{Change, KvEntry, KvStore, Snapshot};
pub use news::{NewsFilter, NewsStore, NEWS_KEY};
pub use ngo::{NgoStore, NGO_KEY};
pub use traits::{EventRepository, NewsRepository, NgoRepository, Storage};

/// Main database handle
///
/// Open it once at startup and hand out references; every store borrows
/// its connection.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open or create database at the given path
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Open in-memory database (for testing)
    #[instrument]
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Initialize database schema via migrations
    fn init(&self) -> Result<()> {
        migrations::run_migrations(&self.conn)?;
        Ok(())
    }

    /// Get current schema version
    pub fn schema_version(&self) -> u32 {
        migrations::applied_version(&self.conn).unwrap_or(0)
    }

    /// Raw versioned documents
    pub fn kv(&self) -> KvStore<'_> {
        KvStore::new(&self.conn)
    }

    /// Get event store
    pub fn events(&self) -> EventStore<'_> {
        EventStore::new(&self.conn)
    }

    /// Get news store
    pub fn news(&self) -> NewsStore<'_> {
        NewsStore::new(&self.conn)
    }

    /// Get NGO registration store
    pub fn ngos(&self) -> NgoStore<'_> {
        NgoStore::new(&self.conn)
    }

    /// Get favorites store
    pub fn favorites(&self) -> FavoritesStore<'_> {
        FavoritesStore::new(&self.conn)
    }
}

// Implement repository traits for Database
// This enables using Database through the trait interface

impl EventRepository for Database {
    fn publish_event(&self, draft: EventDraft) -> Result<Event> {
        self.events().publish(draft)
    }

    fn update_event(&self, id: EventId, update: EventUpdate) -> Result<bool> {
        self.events().update(id, update)
    }

    fn unpublish_event(&self, id: EventId) -> Result<()> {
        self.events().unpublish(id)
    }

    fn find_event_by_id(&self, id: EventId) -> Result<Option<Event>> {
        self.events().get_by_id(id)
    }

    fn query_events(&self, filter: &EventFilter) -> Result<Vec<Event>> {
        self.events().query(filter)
    }

    fn register_volunteer(
        &self,
        id: EventId,
        volunteer: VolunteerData,
    ) -> Result<RegistrationOutcome> {
        self.events().register_volunteer(id, volunteer)
    }

    fn unregister_volunteer(&self, id: EventId, email: &str) -> Result<RegistrationOutcome> {
        self.events().unregister_volunteer(id, email)
    }

    fn is_volunteer_registered(&self, id: EventId, email: &str) -> Result<bool> {
        self.events().is_registered(id, email)
    }

    fn list_event_volunteers(&self, id: EventId) -> Result<Vec<Registration>> {
        self.events().event_volunteers(id)
    }
}

impl NewsRepository for Database {
    fn add_news(&self, actor: &Identity, draft: NewsDraft) -> Result<NewsItem> {
        self.news().add(actor, draft)
    }

    fn update_news(
        &self,
        actor: &Identity,
        id: NewsId,
        update: NewsUpdate,
    ) -> Result<Option<NewsItem>> {
        self.news().update(actor, id, update)
    }

    fn delete_news(&self, actor: &Identity, id: NewsId) -> Result<()> {
        self.news().delete(actor, id)
    }

    fn list_news(&self, filter: &NewsFilter) -> Result<Vec<NewsItem>> {
        self.news().list(filter)
    }
}

impl NgoRepository for Database {
    fn register_ngo(&self, draft: NgoDraft) -> Result<NgoRegistration> {
        self.ngos().register(draft)
    }

    fn list_pending_ngos(&self) -> Result<Vec<NgoRegistration>> {
        self.ngos().pending()
    }

    fn approve_ngo(&self, actor: &Identity, id: Uuid) -> Result<bool> {
        self.ngos().approve(actor, id)
    }

    fn reject_ngo(&self, actor: &Identity, id: Uuid, reason: &str) -> Result<bool> {
        self.ngos().reject(actor, id, reason)
    }
}
