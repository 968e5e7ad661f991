//! Aggregate figures over event snapshots

use std::collections::{BTreeSet, HashMap};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::Event;
use crate::query::{count_by_category, top_categories};

/// Platform-wide numbers over active events
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EventsStats {
    pub total_events: usize,
    pub upcoming_events: usize,
    pub total_participants: u64,
    pub total_organizations: usize,
    pub by_category: HashMap<String, usize>,
    pub by_city: HashMap<String, usize>,
}

impl EventsStats {
    pub fn compute(events: &[Event], now: DateTime<Utc>) -> Self {
        let mut by_city = HashMap::new();
        for event in events {
            *by_city.entry(event.city.clone()).or_insert(0) += 1;
        }

        Self {
            total_events: events.len(),
            upcoming_events: events.iter().filter(|e| e.is_upcoming(now)).count(),
            total_participants: events.iter().map(|e| e.participants as u64).sum(),
            total_organizations: events
                .iter()
                .map(|e| e.organization.as_str())
                .collect::<BTreeSet<_>>()
                .len(),
            by_category: count_by_category(events),
            by_city,
        }
    }
}

/// Numbers for one organization's active events
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct OrganizationStats {
    pub total_events: usize,
    pub upcoming_events: usize,
    pub total_participants: u64,
    /// Mean participants per event, rounded to one decimal
    pub avg_participants: f64,
    pub by_category: HashMap<String, usize>,
}

impl OrganizationStats {
    pub fn compute(events: &[Event], now: DateTime<Utc>) -> Self {
        let total_events = events.len();
        let total_participants: u64 = events.iter().map(|e| e.participants as u64).sum();
        let avg_participants = if total_events > 0 {
            (total_participants as f64 / total_events as f64 * 10.0).round() / 10.0
        } else {
            0.0
        };

        Self {
            total_events,
            upcoming_events: events.iter().filter(|e| e.is_upcoming(now)).count(),
            total_participants,
            avg_participants,
            by_category: count_by_category(events),
        }
    }
}

/// A volunteer's participation history
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct VolunteerStats {
    pub total_events: usize,
    pub upcoming_events: usize,
    pub completed_events: usize,
    pub favorite_category: Option<String>,
    /// Distinct organizations, in first-seen order
    pub organizations: Vec<String>,
}

impl VolunteerStats {
    /// `events` are the events the volunteer is registered for
    pub fn compute(events: &[Event], now: DateTime<Utc>) -> Self {
        let upcoming_events = events.iter().filter(|e| e.is_upcoming(now)).count();

        let mut organizations: Vec<String> = Vec::new();
        for event in events {
            if !organizations.contains(&event.organization) {
                organizations.push(event.organization.clone());
            }
        }

        Self {
            total_events: events.len(),
            upcoming_events,
            completed_events: events.len() - upcoming_events,
            favorite_category: top_categories(events, 1).into_iter().next(),
            organizations,
        }
    }
}
