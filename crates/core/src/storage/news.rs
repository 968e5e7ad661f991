//! News storage operations
//!
//! Writes are reserved for administrators; reads are open.

use chrono::Utc;
use rusqlite::Connection;
use tracing::{info, instrument};

use super::kv::{Change, KvStore};
use crate::error::Result;
use crate::models::{
    Identity, NewsDraft, NewsId, NewsItem, NewsStatus, NewsUpdate, ALL_CITIES,
};
use crate::permissions::{require, PlatformAction};

/// Storage key of the news collection
pub const NEWS_KEY: &str = "platformNews";

/// Author recorded when the admin identity carries no name
const DEFAULT_AUTHOR: &str = "Administrator";

/// Filter over news items
///
/// `"all"` in `city` or `category` disables that criterion. Leaving
/// `status` unset narrows to published items.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewsFilter {
    pub city: Option<String>,
    pub category: Option<String>,
    pub status: Option<NewsStatus>,
    pub search: Option<String>,
}

impl NewsFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn city(mut self, city: impl Into<String>) -> Self {
        self.city = Some(city.into());
        self
    }

    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn status(mut self, status: NewsStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn search(mut self, text: impl Into<String>) -> Self {
        self.search = Some(text.into());
        self
    }

    pub fn matches(&self, item: &NewsItem) -> bool {
        if let Some(city) = selective(&self.city) {
            if item.city != city && item.city != ALL_CITIES {
                return false;
            }
        }

        if let Some(category) = selective(&self.category) {
            if item.category != category {
                return false;
            }
        }

        if item.status != self.status.unwrap_or(NewsStatus::Published) {
            return false;
        }

        if let Some(term) = self.search.as_deref().filter(|t| !t.is_empty()) {
            let term = term.to_lowercase();
            let hit = item.title.to_lowercase().contains(&term)
                || item.content.to_lowercase().contains(&term)
                || item.tags.iter().any(|t| t.to_lowercase().contains(&term));
            if !hit {
                return false;
            }
        }

        true
    }
}

fn selective(value: &Option<String>) -> Option<&str> {
    value
        .as_deref()
        .filter(|v| !v.is_empty() && *v != ALL_CITIES)
}

pub struct NewsStore<'a> {
    conn: &'a Connection,
}

impl<'a> NewsStore<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    fn kv(&self) -> KvStore<'a> {
        KvStore::new(self.conn)
    }

    /// Add a news item at the front of the feed
    #[instrument(skip(self, actor, draft), fields(actor = %actor.email))]
    pub fn add(&self, actor: &Identity, draft: NewsDraft) -> Result<NewsItem> {
        require(actor, PlatformAction::ManageNews)?;

        let now = Utc::now();
        let author = actor
            .name
            .clone()
            .unwrap_or_else(|| DEFAULT_AUTHOR.to_string());

        let item = self.kv().modify(NEWS_KEY, |news: &mut Vec<NewsItem>| {
            let max_existing = news.iter().map(|n| n.id.0).max().unwrap_or(0);
            let item = NewsItem {
                id: NewsId(now.timestamp_millis().max(max_existing + 1)),
                title: draft.title,
                content: draft.content,
                excerpt: draft.excerpt,
                image: draft.image,
                author,
                date: draft.date,
                city: draft.city,
                category: draft.category,
                tags: draft.tags,
                status: draft.status.unwrap_or_default(),
                views: 0,
                created_at: now,
            };
            news.insert(0, item.clone());
            Change::Write(item)
        })?;

        info!(news_id = %item.id, "Added news item");
        Ok(item)
    }

    /// Update a news item; `None` if it does not exist
    #[instrument(skip(self, actor, update), fields(actor = %actor.email))]
    pub fn update(
        &self,
        actor: &Identity,
        id: NewsId,
        update: NewsUpdate,
    ) -> Result<Option<NewsItem>> {
        require(actor, PlatformAction::ManageNews)?;

        self.kv().modify(NEWS_KEY, |news: &mut Vec<NewsItem>| {
            match news.iter_mut().find(|n| n.id == id) {
                Some(item) => {
                    item.apply(update);
                    Change::Write(Some(item.clone()))
                }
                None => Change::Keep(None),
            }
        })
    }

    /// Delete a news item; a missing id is a no-op
    #[instrument(skip(self, actor), fields(actor = %actor.email))]
    pub fn delete(&self, actor: &Identity, id: NewsId) -> Result<()> {
        require(actor, PlatformAction::ManageNews)?;

        self.kv().modify(NEWS_KEY, |news: &mut Vec<NewsItem>| {
            let before = news.len();
            news.retain(|n| n.id != id);
            if news.len() == before {
                Change::Keep(())
            } else {
                Change::Write(())
            }
        })
    }

    /// Filtered feed, newest first
    pub fn list(&self, filter: &NewsFilter) -> Result<Vec<NewsItem>> {
        let mut news: Vec<NewsItem> = self
            .kv()
            .load::<NewsItem>(NEWS_KEY)?
            .items
            .into_iter()
            .filter(|n| filter.matches(n))
            .collect();
        news.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(news)
    }

    /// Fetch a published item and count the view
    pub fn view(&self, id: NewsId) -> Result<Option<NewsItem>> {
        self.kv().modify(NEWS_KEY, |news: &mut Vec<NewsItem>| {
            match news.iter_mut().find(|n| n.id == id && n.is_published()) {
                Some(item) => {
                    item.views += 1;
                    Change::Write(Some(item.clone()))
                }
                None => Change::Keep(None),
            }
        })
    }

    /// Published items with the most views first
    pub fn popular(&self, limit: usize) -> Result<Vec<NewsItem>> {
        let mut news = self.list(&NewsFilter::new())?;
        news.sort_by(|a, b| b.views.cmp(&a.views));
        news.truncate(limit);
        Ok(news)
    }

    pub fn by_category(&self, category: &str, limit: usize) -> Result<Vec<NewsItem>> {
        let mut news = self.list(&NewsFilter::new().category(category))?;
        news.truncate(limit);
        Ok(news)
    }
}
