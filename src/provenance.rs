//! Write-once provenance of an IU and the links between IUs.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::ids::{CreatorId, IuId};
use crate::unit::{AnyIu, WeakIu};

/// Non-owning reference from one IU to another.
///
/// The target's identity is recorded alongside the weak pointer, so a link still says what it
/// pointed at after the target has been dropped.
#[derive(Debug, Clone, Serialize)]
pub struct IuLink {
    creator: CreatorId,
    iuid: IuId,
    #[serde(rename = "type")]
    type_name: &'static str,
    #[serde(skip)]
    target: WeakIu,
}

impl IuLink {
    /// Links a live IU.
    pub fn to(iu: &AnyIu) -> Self {
        Self {
            creator: iu.creator().clone(),
            iuid: iu.iuid(),
            type_name: iu.type_name(),
            target: iu.downgrade(),
        }
    }

    /// Links an IU that is known only by identity (e.g. one held by another process).
    pub fn detached(creator: CreatorId, iuid: IuId, type_name: &'static str) -> Self {
        Self {
            creator,
            iuid,
            type_name,
            target: WeakIu::Detached,
        }
    }

    pub fn creator(&self) -> &CreatorId {
        &self.creator
    }

    pub fn iuid(&self) -> IuId {
        self.iuid
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// The target, if it is still alive in this process.
    pub fn resolve(&self) -> Option<AnyIu> {
        self.target.upgrade()
    }

    pub fn is_orphaned(&self) -> bool {
        self.resolve().is_none()
    }

    /// Whether this link refers to `iu`.
    pub fn points_to(&self, iu: &AnyIu) -> bool {
        self.iuid == iu.iuid() && self.creator == *iu.creator() && self.type_name == iu.type_name()
    }
}

impl PartialEq for IuLink {
    fn eq(&self, other: &Self) -> bool {
        self.creator == other.creator
            && self.iuid == other.iuid
            && self.type_name == other.type_name
    }
}

impl Eq for IuLink {}

/// Creator, identity, links and creation time of an IU.
///
/// Built with the consuming setters below; once moved into an IU only shared references are
/// handed out, so none of it changes afterwards.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Provenance {
    creator: CreatorId,
    iuid: IuId,
    previous_iu: Option<IuLink>,
    grounded_in: Option<IuLink>,
    created_at: DateTime<Utc>,
}

impl Provenance {
    pub fn new(creator: CreatorId, iuid: IuId) -> Self {
        Self {
            creator,
            iuid,
            previous_iu: None,
            grounded_in: None,
            created_at: Utc::now(),
        }
    }

    #[must_use]
    pub fn previous_iu(mut self, link: impl Into<Option<IuLink>>) -> Self {
        self.previous_iu = link.into();
        self
    }

    #[must_use]
    pub fn grounded_in(mut self, link: impl Into<Option<IuLink>>) -> Self {
        self.grounded_in = link.into();
        self
    }

    #[must_use]
    pub fn created_at(mut self, at: DateTime<Utc>) -> Self {
        self.created_at = at;
        self
    }

    pub fn creator(&self) -> &CreatorId {
        &self.creator
    }

    pub fn iuid(&self) -> IuId {
        self.iuid
    }

    pub fn previous(&self) -> Option<&IuLink> {
        self.previous_iu.as_ref()
    }

    pub fn grounding(&self) -> Option<&IuLink> {
        self.grounded_in.as_ref()
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.created_at
    }
}
