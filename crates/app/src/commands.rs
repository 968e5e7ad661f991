//! Command-line interface
//!
//! Each subcommand runs against a borrowed database and produces a JSON
//! document for the terminal.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use heroes_core::{
    Database, EventDraft, EventFilter, EventId, EventStatus, FavoriteKind, Identity, NewsFilter,
    VolunteerData,
};
use serde_json::{json, Value};
use tracing::debug;

use crate::error::AppResult;

#[derive(Parser, Debug)]
#[command(name = "heroes")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Heroes - volunteering events, registrations and news")]
pub struct Cli {
    /// Configuration file (defaults to heroes.toml in the config directory)
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Event filter options shared by listing commands
#[derive(Args, Debug, Default)]
pub struct FilterArgs {
    /// City, case-insensitive partial match
    #[arg(long)]
    city: Option<String>,

    #[arg(long)]
    category: Option<String>,

    /// Exact event date (YYYY-MM-DD)
    #[arg(long)]
    date: Option<String>,

    #[arg(long = "org")]
    organization: Option<String>,

    /// active, inactive or archived (default active)
    #[arg(long)]
    status: Option<EventStatus>,
}

impl FilterArgs {
    fn to_filter(&self) -> EventFilter {
        let mut filter = EventFilter::new();
        if let Some(city) = &self.city {
            filter = filter.city(city);
        }
        if let Some(category) = &self.category {
            filter = filter.category(category);
        }
        if let Some(date) = &self.date {
            filter = filter.date(date);
        }
        if let Some(organization) = &self.organization {
            filter = filter.organization(organization);
        }
        if let Some(status) = self.status {
            filter = filter.status(status);
        }
        filter
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List events, soonest first
    List {
        #[command(flatten)]
        filter: FilterArgs,
    },
    /// Free-text search over events
    Search {
        text: String,
        #[command(flatten)]
        filter: FilterArgs,
    },
    /// Show one event of any status
    Show { id: EventId },
    /// Active events that have not started yet
    Upcoming {
        #[arg(default_value_t = 10)]
        limit: usize,
    },
    /// Active events with the most participants
    Popular {
        #[arg(default_value_t = 10)]
        limit: usize,
    },
    /// Most recently published active events
    Recent {
        #[arg(default_value_t = 10)]
        limit: usize,
    },
    /// Every event of one organization, newest first
    Org {
        organization: String,
        #[arg(long)]
        status: Option<EventStatus>,
    },
    /// Publish a new event
    Publish {
        #[arg(long)]
        title: String,
        #[arg(long, default_value = "")]
        description: String,
        #[arg(long)]
        category: String,
        #[arg(long)]
        city: String,
        #[arg(long)]
        address: String,
        #[arg(long = "org")]
        organization: String,
        #[arg(long)]
        date: Option<String>,
        #[arg(long)]
        capacity: Option<u32>,
        /// Publish on behalf of this email
        #[arg(long = "as", value_name = "EMAIL")]
        actor: Option<String>,
        #[arg(long, requires = "actor")]
        admin: bool,
    },
    /// Change an event's status
    Status { id: EventId, status: EventStatus },
    /// Remove an event
    Unpublish {
        id: EventId,
        /// Remove on behalf of this email (ownership is checked)
        #[arg(long = "as", value_name = "EMAIL")]
        actor: Option<String>,
        #[arg(long = "org", requires = "actor")]
        organization: Option<String>,
        #[arg(long, requires = "actor", conflicts_with = "organization")]
        admin: bool,
    },
    /// Import event drafts from a JSON array
    Import { file: PathBuf },
    /// Export active events as calendar entries
    Export,
    /// Publish the sample events into an empty catalogue
    Seed,
    /// Remove inactive events older than the given number of days
    Cleanup {
        #[arg(default_value_t = 30, allow_negative_numbers = true)]
        days: i64,
    },
    /// Register a volunteer for an event
    Register {
        id: EventId,
        email: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        phone: Option<String>,
    },
    /// Cancel a volunteer's registration
    Unregister { id: EventId, email: String },
    /// Check whether a volunteer is registered
    Registered { id: EventId, email: String },
    /// List an event's volunteers
    Volunteers { id: EventId },
    /// Active events a volunteer is registered for
    Mine { email: String },
    /// Upcoming events in a volunteer's favourite categories
    Recommended {
        email: String,
        #[arg(default_value_t = 10)]
        limit: usize,
    },
    /// Platform, organization or volunteer statistics
    Stats {
        #[arg(long = "org")]
        organization: Option<String>,
        #[arg(long, conflicts_with = "organization")]
        volunteer: Option<String>,
    },
    /// Published news, newest first
    News {
        #[arg(long)]
        city: Option<String>,
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        search: Option<String>,
    },
    /// NGO registrations awaiting moderation
    Ngos,
    /// A user's favorites
    Favorites { email: String },
}

/// Acting identity from `--as`, shaped by `--admin` or an organization
fn identity(actor: Option<&str>, organization: Option<&str>, admin: bool) -> Option<Identity> {
    let email = actor.filter(|e| !e.is_empty())?;
    Some(if admin {
        Identity::admin(email)
    } else if let Some(organization) = organization.filter(|o| !o.is_empty()) {
        Identity::organization(email, organization)
    } else {
        Identity::volunteer(email)
    })
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Self::List { .. } => "list",
            Self::Search { .. } => "search",
            Self::Show { .. } => "show",
            Self::Upcoming { .. } => "upcoming",
            Self::Popular { .. } => "popular",
            Self::Recent { .. } => "recent",
            Self::Org { .. } => "org",
            Self::Publish { .. } => "publish",
            Self::Status { .. } => "status",
            Self::Unpublish { .. } => "unpublish",
            Self::Import { .. } => "import",
            Self::Export => "export",
            Self::Seed => "seed",
            Self::Cleanup { .. } => "cleanup",
            Self::Register { .. } => "register",
            Self::Unregister { .. } => "unregister",
            Self::Registered { .. } => "registered",
            Self::Volunteers { .. } => "volunteers",
            Self::Mine { .. } => "mine",
            Self::Recommended { .. } => "recommended",
            Self::Stats { .. } => "stats",
            Self::News { .. } => "news",
            Self::Ngos => "ngos",
            Self::Favorites { .. } => "favorites",
        }
    }

    pub fn run(&self, db: &Database) -> AppResult<Value> {
        debug!(command = self.name(), "Running command");
        let events = db.events();

        let output = match self {
            Self::List { filter } => json!(events.query(&filter.to_filter())?),
            Self::Search { text, filter } => json!(events.search(text, &filter.to_filter())?),
            Self::Show { id } => json!(events.get_by_id(*id)?),
            Self::Upcoming { limit } => json!(events.upcoming(*limit)?),
            Self::Popular { limit } => json!(events.popular(*limit)?),
            Self::Recent { limit } => json!(events.recent(*limit)?),
            Self::Org {
                organization,
                status,
            } => json!(events.organization_events(organization, *status)?),

            Self::Publish {
                title,
                description,
                category,
                city,
                address,
                organization,
                date,
                capacity,
                actor,
                admin,
            } => {
                let mut draft =
                    EventDraft::new(title, description, category, city, address, organization);
                if let Some(date) = date {
                    draft = draft.on(date);
                }
                if let Some(capacity) = capacity {
                    draft = draft.with_capacity(*capacity);
                }
                let event = match identity(actor.as_deref(), Some(organization.as_str()), *admin) {
                    Some(actor) => events.publish_as(&actor, draft)?,
                    None => events.publish(draft)?,
                };
                json!(event)
            }
            Self::Status { id, status } => json!({ "updated": events.set_status(*id, *status)? }),
            Self::Unpublish {
                id,
                actor,
                organization,
                admin,
            } => {
                match identity(actor.as_deref(), organization.as_deref(), *admin) {
                    Some(actor) => events.unpublish_as(&actor, *id)?,
                    None => events.unpublish(*id)?,
                }
                json!({ "removed": id })
            }
            Self::Import { file } => {
                let drafts: Vec<EventDraft> =
                    serde_json::from_str(&std::fs::read_to_string(file)?)?;
                json!({ "total": events.import(drafts)? })
            }
            Self::Export => json!(events.export_calendar()?),
            Self::Seed => json!({ "added": events.seed_samples()? }),
            Self::Cleanup { days } => json!({ "removed": events.cleanup(*days)? }),

            Self::Register {
                id,
                email,
                name,
                phone,
            } => {
                let mut volunteer = VolunteerData::new(email);
                if let Some(name) = name {
                    volunteer = volunteer.with_name(name);
                }
                if let Some(phone) = phone {
                    volunteer = volunteer.with_phone(phone);
                }
                let outcome = events.register_volunteer(*id, volunteer)?;
                json!({ "success": outcome.is_success(), "message": outcome.message() })
            }
            Self::Unregister { id, email } => {
                let outcome = events.unregister_volunteer(*id, email)?;
                json!({ "success": outcome.is_success(), "message": outcome.message() })
            }
            Self::Registered { id, email } => {
                json!({ "registered": events.is_registered(*id, email)? })
            }
            Self::Volunteers { id } => json!(events.event_volunteers(*id)?),
            Self::Mine { email } => json!(events.by_volunteer(email)?),
            Self::Recommended { email, limit } => json!(events.recommended(email, *limit)?),

            Self::Stats {
                organization,
                volunteer,
            } => match (organization, volunteer) {
                (Some(organization), _) => json!(events.organization_stats(organization)?),
                (None, Some(email)) => json!(events.volunteer_stats(email)?),
                (None, None) => json!(events.stats()?),
            },
            Self::News {
                city,
                category,
                search,
            } => {
                let mut filter = NewsFilter::new();
                if let Some(city) = city {
                    filter = filter.city(city);
                }
                if let Some(category) = category {
                    filter = filter.category(category);
                }
                if let Some(text) = search {
                    filter = filter.search(text);
                }
                json!(db.news().list(&filter)?)
            }
            Self::Ngos => json!(db.ngos().pending()?),
            Self::Favorites { email } => {
                let favorites = db.favorites().get(email)?;
                json!({
                    "events": favorites.items(FavoriteKind::Events),
                    "news": favorites.items(FavoriteKind::News),
                    "materials": favorites.items(FavoriteKind::Materials),
                })
            }
        };

        Ok(output)
    }
}
