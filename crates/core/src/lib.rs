//! Heroes Core Library
//!
//! Event catalogue, volunteer registration, news, NGO moderation and
//! storage for the Heroes volunteering platform.

pub mod calendar;
pub mod error;
pub mod invariants;
pub mod models;
pub mod permissions;
pub mod query;
pub mod stats;
pub mod storage;

pub use calendar::CalendarEntry;
pub use error::{Error, Result};
pub use models::*;
pub use permissions::*;
pub use query::EventFilter;
pub use stats::{EventsStats, OrganizationStats, VolunteerStats};
pub use storage::{
    Database, EventRepository, EventStore, FavoriteKind, FavoritesStore, NewsFilter,
    NewsRepository, NewsStore, NgoRepository, NgoStore, Storage, UserFavorites,
};
