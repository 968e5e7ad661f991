//! Permission system for platform operations

use crate::error::{Error, Result};
use crate::models::{Event, Identity, PlatformRole};

/// Actions that can be performed on the platform
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlatformAction {
    // Volunteering
    RegisterForEvent,

    // Events
    PublishEvent,
    EditAnyEvent,
    RemoveAnyEvent,

    // News
    ManageNews,

    // Moderation
    ModerateNgos,
}

impl PlatformAction {
    fn describe(&self) -> &'static str {
        match self {
            Self::RegisterForEvent => "register for events",
            Self::PublishEvent => "publish events",
            Self::EditAnyEvent => "edit other organizations' events",
            Self::RemoveAnyEvent => "remove other organizations' events",
            Self::ManageNews => "manage news",
            Self::ModerateNgos => "moderate organizations",
        }
    }
}

/// Permission matrix for platform roles
pub struct PermissionMatrix;

impl PermissionMatrix {
    /// Check if a role has permission to perform an action
    pub fn can_perform(role: PlatformRole, action: PlatformAction) -> bool {
        match action {
            PlatformAction::RegisterForEvent => role >= PlatformRole::Volunteer,
            PlatformAction::PublishEvent => role >= PlatformRole::Volunteer,

            // Admin only
            PlatformAction::EditAnyEvent => role == PlatformRole::Admin,
            PlatformAction::RemoveAnyEvent => role == PlatformRole::Admin,
            PlatformAction::ManageNews => role == PlatformRole::Admin,
            PlatformAction::ModerateNgos => role == PlatformRole::Admin,
        }
    }

    /// Whether `actor` created or represents the owner of `event`
    pub fn owns_event(actor: &Identity, event: &Event) -> bool {
        if event.created_by.as_deref() == Some(actor.email.as_str()) {
            return true;
        }
        actor
            .organization
            .as_deref()
            .is_some_and(|org| org == event.organization)
    }

    /// Whether `actor` may change or remove `event`
    pub fn can_manage_event(actor: &Identity, event: &Event) -> bool {
        Self::owns_event(actor, event)
            || Self::can_perform(actor.role(), PlatformAction::EditAnyEvent)
    }
}

/// Fail with `PermissionDenied` unless the actor's role allows the action
pub fn require(actor: &Identity, action: PlatformAction) -> Result<()> {
    if PermissionMatrix::can_perform(actor.role(), action) {
        Ok(())
    } else {
        Err(Error::PermissionDenied(format!(
            "{} is not allowed to {}",
            actor.email,
            action.describe()
        )))
    }
}
