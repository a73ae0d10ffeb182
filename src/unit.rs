//! The incremental unit contract and the closed set of known IU kinds.

use std::sync::{Arc, Weak};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::watch;

use crate::ids::{CreatorId, IuId};
use crate::motor_action::{MotorActionRequest, MotorActionRequestIu};
use crate::provenance::{IuLink, Provenance};
use crate::robot_state::{RobotState, RobotStateIu};

/// Contract shared by every IU variant.
///
/// Provenance is fixed at construction. The payload changes only through the variant's own
/// setter, which goes through a [`crate::payload::PayloadCell`].
pub trait IncrementalUnit: Send + Sync + 'static {
    /// Human-readable tag of the IU kind. Unique among sibling variants.
    const TYPE: &'static str;

    type Payload: Clone + Send + Sync;

    fn provenance(&self) -> &Provenance;

    /// What the IU currently asserts, or `None` before it has been populated.
    fn payload(&self) -> Option<Self::Payload>;

    /// Number of payload updates applied so far.
    fn revision(&self) -> u64;

    /// Receiver notified with the new revision on every payload update.
    fn subscribe(&self) -> watch::Receiver<u64>;

    fn type_name(&self) -> &'static str {
        Self::TYPE
    }

    fn iuid(&self) -> IuId {
        self.provenance().iuid()
    }

    fn creator(&self) -> &CreatorId {
        self.provenance().creator()
    }

    fn previous_iu(&self) -> Option<&IuLink> {
        self.provenance().previous()
    }

    fn grounded_in(&self) -> Option<&IuLink> {
        self.provenance().grounding()
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.provenance().timestamp()
    }

    fn is_populated(&self) -> bool {
        self.revision() > 0
    }
}

/// Shared handle to an IU of any known kind.
#[derive(Debug, Clone)]
pub enum AnyIu {
    RobotState(Arc<RobotStateIu>),
    MotorActionRequest(Arc<MotorActionRequestIu>),
}

impl AnyIu {
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::RobotState(_) => RobotStateIu::TYPE,
            Self::MotorActionRequest(_) => MotorActionRequestIu::TYPE,
        }
    }

    pub fn provenance(&self) -> &Provenance {
        match self {
            Self::RobotState(iu) => iu.provenance(),
            Self::MotorActionRequest(iu) => iu.provenance(),
        }
    }

    pub fn iuid(&self) -> IuId {
        self.provenance().iuid()
    }

    pub fn creator(&self) -> &CreatorId {
        self.provenance().creator()
    }

    pub fn revision(&self) -> u64 {
        match self {
            Self::RobotState(iu) => iu.revision(),
            Self::MotorActionRequest(iu) => iu.revision(),
        }
    }

    pub fn as_robot_state(&self) -> Option<&Arc<RobotStateIu>> {
        match self {
            Self::RobotState(iu) => Some(iu),
            _ => None,
        }
    }

    pub fn as_motor_action_request(&self) -> Option<&Arc<MotorActionRequestIu>> {
        match self {
            Self::MotorActionRequest(iu) => Some(iu),
            _ => None,
        }
    }

    pub fn downgrade(&self) -> WeakIu {
        match self {
            Self::RobotState(iu) => WeakIu::RobotState(Arc::downgrade(iu)),
            Self::MotorActionRequest(iu) => WeakIu::MotorActionRequest(Arc::downgrade(iu)),
        }
    }

    /// Whether both handles refer to the same IU object.
    pub fn ptr_eq(&self, other: &AnyIu) -> bool {
        match (self, other) {
            (Self::RobotState(a), Self::RobotState(b)) => Arc::ptr_eq(a, b),
            (Self::MotorActionRequest(a), Self::MotorActionRequest(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }

    /// Consistent read-only view of the IU for logging and inspection.
    pub fn snapshot(&self) -> IuSnapshot {
        let (payload, revision) = match self {
            Self::RobotState(iu) => {
                let (state, revision) = iu.snapshot();
                (PayloadSnapshot::RobotState(state), revision)
            }
            Self::MotorActionRequest(iu) => {
                let (request, revision) = iu.snapshot();
                (PayloadSnapshot::MotorActionRequest(request), revision)
            }
        };

        let prov = self.provenance();
        IuSnapshot {
            type_name: self.type_name(),
            creator: prov.creator().clone(),
            iuid: prov.iuid(),
            previous_iu: prov.previous().map(IuLink::iuid),
            grounded_in: prov.grounding().map(IuLink::iuid),
            created_at: prov.timestamp(),
            revision,
            payload,
        }
    }
}

impl From<Arc<RobotStateIu>> for AnyIu {
    fn from(iu: Arc<RobotStateIu>) -> Self {
        Self::RobotState(iu)
    }
}

impl From<Arc<MotorActionRequestIu>> for AnyIu {
    fn from(iu: Arc<MotorActionRequestIu>) -> Self {
        Self::MotorActionRequest(iu)
    }
}

/// Non-owning counterpart of [`AnyIu`].
#[derive(Debug, Clone, Default)]
pub enum WeakIu {
    RobotState(Weak<RobotStateIu>),
    MotorActionRequest(Weak<MotorActionRequestIu>),
    /// No local target; the IU lives elsewhere or was never held here.
    #[default]
    Detached,
}

impl WeakIu {
    pub fn upgrade(&self) -> Option<AnyIu> {
        match self {
            Self::RobotState(iu) => iu.upgrade().map(AnyIu::RobotState),
            Self::MotorActionRequest(iu) => iu.upgrade().map(AnyIu::MotorActionRequest),
            Self::Detached => None,
        }
    }
}

/// Payload part of an [`IuSnapshot`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "payload")]
pub enum PayloadSnapshot {
    RobotState(Option<RobotState>),
    MotorActionRequest(Option<MotorActionRequest>),
}

/// Point-in-time view of an IU.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IuSnapshot {
    #[serde(rename = "type")]
    pub type_name: &'static str,
    pub creator: CreatorId,
    pub iuid: IuId,
    pub previous_iu: Option<IuId>,
    pub grounded_in: Option<IuId>,
    pub created_at: DateTime<Utc>,
    pub revision: u64,
    pub payload: PayloadSnapshot,
}
