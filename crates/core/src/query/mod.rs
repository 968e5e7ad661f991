//! Event query and filter layer
//!
//! Predicates and orderings applied to a snapshot of the event collection.
//! Nothing here touches storage.

use std::cmp::Ordering;
use std::collections::HashMap;

use crate::models::{Event, EventStatus};

/// Filter over published events
///
/// Every field is optional and set fields combine with AND. Leaving
/// `status` unset narrows to active events; it never means "any status".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventFilter {
    /// Case-insensitive substring of the city
    pub city: Option<String>,
    /// Exact category
    pub category: Option<String>,
    /// Exact, string-equal event date
    pub date: Option<String>,
    /// Exact organization name
    pub organization: Option<String>,
    pub status: Option<EventStatus>,
    /// Case-insensitive substring of title, description, organization,
    /// category or city
    pub search: Option<String>,
}

impl EventFilter {
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

    pub fn date(mut self, date: impl Into<String>) -> Self {
        self.date = Some(date.into());
        self
    }

    pub fn organization(mut self, organization: impl Into<String>) -> Self {
        self.organization = Some(organization.into());
        self
    }

    pub fn status(mut self, status: EventStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn search(mut self, text: impl Into<String>) -> Self {
        self.search = Some(text.into());
        self
    }

    /// Status this filter selects, applying the active-only default
    pub fn effective_status(&self) -> EventStatus {
        self.status.unwrap_or(EventStatus::Active)
    }

    /// Check a single event against every set criterion
    pub fn matches(&self, event: &Event) -> bool {
        if let Some(city) = non_empty(&self.city) {
            if !contains_ci(&event.city, city) {
                return false;
            }
        }

        if let Some(category) = non_empty(&self.category) {
            if event.category != category {
                return false;
            }
        }

        if let Some(date) = non_empty(&self.date) {
            if event.date != date {
                return false;
            }
        }

        if let Some(organization) = non_empty(&self.organization) {
            if event.organization != organization {
                return false;
            }
        }

        if event.status != self.effective_status() {
            return false;
        }

        if let Some(term) = non_empty(&self.search) {
            let hit = [
                &event.title,
                &event.description,
                &event.organization,
                &event.category,
                &event.city,
            ]
            .into_iter()
            .any(|field| contains_ci(field, term));
            if !hit {
                return false;
            }
        }

        true
    }

    /// Filter a snapshot and sort it soonest first
    pub fn apply(&self, events: Vec<Event>) -> Vec<Event> {
        let mut matched: Vec<Event> = events.into_iter().filter(|e| self.matches(e)).collect();
        sort_by_date(&mut matched);
        matched
    }
}

// Empty strings behave like an unset filter
fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

/// Chronological order, soonest first; unparseable dates go last
pub fn sort_by_date(events: &mut [Event]) {
    events.sort_by(|a, b| match (a.starts_at(), b.starts_at()) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });
}

/// Most participants first; ties keep their prior order
pub fn sort_by_participants(events: &mut [Event]) {
    events.sort_by(|a, b| b.participants.cmp(&a.participants));
}

/// Newest creation first
pub fn sort_by_created(events: &mut [Event]) {
    events.sort_by(|a, b| b.created_at.cmp(&a.created_at));
}

/// Count events per category
pub fn count_by_category<'a, I>(events: I) -> HashMap<String, usize>
where
    I: IntoIterator<Item = &'a Event>,
{
    let mut counts = HashMap::new();
    for event in events {
        *counts.entry(event.category.clone()).or_insert(0) += 1;
    }
    counts
}

/// The `n` most frequent categories, most frequent first
///
/// Equal counts are broken by first appearance in `events`.
pub fn top_categories(events: &[Event], n: usize) -> Vec<String> {
    let mut ranked: Vec<(String, usize, usize)> = Vec::new();
    for (position, event) in events.iter().enumerate() {
        match ranked.iter_mut().find(|entry| entry.0 == event.category) {
            Some(entry) => entry.1 += 1,
            None => ranked.push((event.category.clone(), 1, position)),
        }
    }

    ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.2.cmp(&b.2)));
    ranked.into_iter().take(n).map(|(c, _, _)| c).collect()
}
