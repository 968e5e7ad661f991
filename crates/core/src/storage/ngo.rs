//! NGO registration storage and moderation

use chrono::Utc;
use rusqlite::Connection;
use tracing::{info, instrument};
use uuid::Uuid;

use super::kv::{Change, KvStore};
use crate::error::{Error, Result};
use crate::models::{Identity, NgoDraft, NgoRegistration, NgoStatus};
use crate::permissions::{require, PlatformAction};

/// Storage key of the NGO registration collection
pub const NGO_KEY: &str = "ngoRegistrations";

pub struct NgoStore<'a> {
    conn: &'a Connection,
}

impl<'a> NgoStore<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    fn kv(&self) -> KvStore<'a> {
        KvStore::new(self.conn)
    }

    /// Submit an organization for approval
    #[instrument(skip(self, draft), fields(name = %draft.name))]
    pub fn register(&self, draft: NgoDraft) -> Result<NgoRegistration> {
        if draft.name.trim().is_empty() {
            return Err(Error::InvalidOperation("NGO name is required".to_string()));
        }
        if !draft.email.contains('@') {
            return Err(Error::InvalidOperation(format!(
                "invalid contact email: {}",
                draft.email
            )));
        }

        let registration = NgoRegistration::new(draft);
        let stored = registration.clone();
        self.kv()
            .modify(NGO_KEY, |all: &mut Vec<NgoRegistration>| {
                all.push(stored);
                Change::Write(())
            })?;

        info!(ngo_id = %registration.id, "NGO registration submitted");
        Ok(registration)
    }

    pub fn find_by_id(&self, id: Uuid) -> Result<Option<NgoRegistration>> {
        Ok(self.all()?.into_iter().find(|r| r.id == id))
    }

    pub fn pending(&self) -> Result<Vec<NgoRegistration>> {
        self.with_status(NgoStatus::Pending)
    }

    pub fn approved(&self) -> Result<Vec<NgoRegistration>> {
        self.with_status(NgoStatus::Approved)
    }

    /// Approve a pending registration; false if none has that id
    #[instrument(skip(self, actor), fields(actor = %actor.email))]
    pub fn approve(&self, actor: &Identity, id: Uuid) -> Result<bool> {
        require(actor, PlatformAction::ModerateNgos)?;

        let approved = self
            .kv()
            .modify(NGO_KEY, |all: &mut Vec<NgoRegistration>| {
                match all.iter_mut().find(|r| r.id == id && r.is_pending()) {
                    Some(registration) => {
                        registration.status = NgoStatus::Approved;
                        registration.approved_at = Some(Utc::now());
                        Change::Write(true)
                    }
                    None => Change::Keep(false),
                }
            })?;

        if approved {
            info!(ngo_id = %id, "NGO approved");
        }
        Ok(approved)
    }

    /// Reject a pending registration with a reason; false if none has that id
    #[instrument(skip(self, actor, reason), fields(actor = %actor.email))]
    pub fn reject(&self, actor: &Identity, id: Uuid, reason: &str) -> Result<bool> {
        require(actor, PlatformAction::ModerateNgos)?;

        let rejected = self
            .kv()
            .modify(NGO_KEY, |all: &mut Vec<NgoRegistration>| {
                match all.iter_mut().find(|r| r.id == id && r.is_pending()) {
                    Some(registration) => {
                        registration.status = NgoStatus::Rejected;
                        registration.rejection_reason = Some(reason.to_string());
                        Change::Write(true)
                    }
                    None => Change::Keep(false),
                }
            })?;

        if rejected {
            info!(ngo_id = %id, "NGO rejected");
        }
        Ok(rejected)
    }

    fn all(&self) -> Result<Vec<NgoRegistration>> {
        Ok(self.kv().load(NGO_KEY)?.items)
    }

    fn with_status(&self, status: NgoStatus) -> Result<Vec<NgoRegistration>> {
        Ok(self
            .all()?
            .into_iter()
            .filter(|r| r.status == status)
            .collect())
    }
}
