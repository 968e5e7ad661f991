//! Per-user favorites

use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use super::kv::{Change, KvStore};
use crate::error::Result;

/// Storage key of the favorites collection
pub const FAVORITES_KEY: &str = "userFavorites";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FavoriteKind {
    News,
    Events,
    Materials,
}

/// Favorite item ids of one user, grouped by kind
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserFavorites {
    pub user: String,
    #[serde(default)]
    pub news: Vec<String>,
    #[serde(default)]
    pub events: Vec<String>,
    #[serde(default)]
    pub materials: Vec<String>,
}

impl UserFavorites {
    fn empty(user: &str) -> Self {
        Self {
            user: user.to_string(),
            ..Default::default()
        }
    }

    pub fn items(&self, kind: FavoriteKind) -> &[String] {
        match kind {
            FavoriteKind::News => &self.news,
            FavoriteKind::Events => &self.events,
            FavoriteKind::Materials => &self.materials,
        }
    }

    fn items_mut(&mut self, kind: FavoriteKind) -> &mut Vec<String> {
        match kind {
            FavoriteKind::News => &mut self.news,
            FavoriteKind::Events => &mut self.events,
            FavoriteKind::Materials => &mut self.materials,
        }
    }
}

pub struct FavoritesStore<'a> {
    conn: &'a Connection,
}

impl<'a> FavoritesStore<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    fn kv(&self) -> KvStore<'a> {
        KvStore::new(self.conn)
    }

    /// Favorites of a user; empty lists for an unknown user
    pub fn get(&self, user: &str) -> Result<UserFavorites> {
        Ok(self
            .kv()
            .load::<UserFavorites>(FAVORITES_KEY)?
            .items
            .into_iter()
            .find(|f| f.user == user)
            .unwrap_or_else(|| UserFavorites::empty(user)))
    }

    /// Add an item; adding it twice keeps one copy
    pub fn add(&self, user: &str, item: &str, kind: FavoriteKind) -> Result<()> {
        self.kv()
            .modify(FAVORITES_KEY, |all: &mut Vec<UserFavorites>| {
                let index = match all.iter().position(|f| f.user == user) {
                    Some(index) => index,
                    None => {
                        all.push(UserFavorites::empty(user));
                        all.len() - 1
                    }
                };

                let items = all[index].items_mut(kind);
                if items.iter().any(|i| i == item) {
                    Change::Keep(())
                } else {
                    items.push(item.to_string());
                    Change::Write(())
                }
            })
    }

    /// Remove an item; a missing item is a no-op
    pub fn remove(&self, user: &str, item: &str, kind: FavoriteKind) -> Result<()> {
        self.kv()
            .modify(FAVORITES_KEY, |all: &mut Vec<UserFavorites>| {
                let Some(favorites) = all.iter_mut().find(|f| f.user == user) else {
                    return Change::Keep(());
                };

                let items = favorites.items_mut(kind);
                let before = items.len();
                items.retain(|i| i != item);
                if items.len() == before {
                    Change::Keep(())
                } else {
                    Change::Write(())
                }
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::Database;

    #[test]
    fn test_unknown_user_is_empty() {
        let db = Database::open_in_memory().unwrap();
        let store = FavoritesStore::new(&db.conn);

        let favorites = store.get("nobody@x.com").unwrap();
        assert_eq!(favorites.user, "nobody@x.com");
        assert!(favorites.items(FavoriteKind::Events).is_empty());
    }

    #[test]
    fn test_add_is_idempotent() {
        let db = Database::open_in_memory().unwrap();
        let store = FavoritesStore::new(&db.conn);

        store.add("a@x.com", "42", FavoriteKind::Events).unwrap();
        store.add("a@x.com", "42", FavoriteKind::Events).unwrap();
        store.add("a@x.com", "7", FavoriteKind::News).unwrap();
        store.add("b@x.com", "42", FavoriteKind::Events).unwrap();

        let favorites = store.get("a@x.com").unwrap();
        assert_eq!(favorites.events, vec!["42"]);
        assert_eq!(favorites.news, vec!["7"]);
        assert!(favorites.materials.is_empty());
    }

    #[test]
    fn test_remove() {
        let db = Database::open_in_memory().unwrap();
        let store = FavoritesStore::new(&db.conn);

        store.add("a@x.com", "42", FavoriteKind::Events).unwrap();
        store.remove("a@x.com", "42", FavoriteKind::Events).unwrap();
        store.remove("a@x.com", "42", FavoriteKind::Events).unwrap();
        store.remove("ghost@x.com", "1", FavoriteKind::News).unwrap();

        assert!(store.get("a@x.com").unwrap().events.is_empty());
    }
}
