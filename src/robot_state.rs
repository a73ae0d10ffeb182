//! Robot state snapshots and the IU that carries them.

use std::collections::HashMap;

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::watch;
use tracing::debug;

use crate::payload::PayloadCell;
use crate::provenance::Provenance;
use crate::unit::IncrementalUnit;

/// Attribute under which producers conventionally store the robot pose.
pub const POSE_ATTRIBUTE: &str = "pose";

/// Robot pose as `x`, `y`, `z`, decoded from a state attribute.
///
/// Backed by nalgebra so consumers can do vector math on poses directly.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Vector3D(pub Vector3<f64>);

impl Vector3D {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self(Vector3::new(x, y, z))
    }

    /// Decodes a `[x, y, z]` JSON array; anything else is not a pose.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value.as_array()?.as_slice() {
            [x, y, z] => Some(Self::new(x.as_f64()?, y.as_f64()?, z.as_f64()?)),
            _ => None,
        }
    }

    pub fn x(&self) -> f64 {
        self.0.x
    }

    pub fn y(&self) -> f64 {
        self.0.y
    }

    pub fn z(&self) -> f64 {
        self.0.z
    }

    pub fn distance_to(&self, other: &Vector3D) -> f64 {
        (self.0 - other.0).norm()
    }
}

/// Named robot attributes at one point in time.
///
/// No schema is enforced; the producer decides what the attributes mean.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RobotState(HashMap<String, Value>);

impl RobotState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(key.into(), value.into())
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    pub fn into_inner(self) -> HashMap<String, Value> {
        self.0
    }

    /// The `"pose"` attribute read as `[x, y, z]`, if it has that shape.
    pub fn pose(&self) -> Option<Vector3D> {
        self.get(POSE_ATTRIBUTE).and_then(Vector3D::from_value)
    }
}

impl From<HashMap<String, Value>> for RobotState {
    fn from(map: HashMap<String, Value>) -> Self {
        Self(map)
    }
}

impl<K: Into<String>> FromIterator<(K, Value)> for RobotState {
    fn from_iter<T: IntoIterator<Item = (K, Value)>>(iter: T) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

/// IU carrying a snapshot of robot state.
///
/// The state is the payload: both are read from one cell and cannot disagree.
#[derive(Debug)]
pub struct RobotStateIu {
    provenance: Provenance,
    state: PayloadCell<RobotState>,
}

impl RobotStateIu {
    pub fn new(provenance: Provenance) -> Self {
        Self {
            provenance,
            state: PayloadCell::empty(),
        }
    }

    /// Constructs the IU and populates it before anyone else can see it.
    pub fn with_state(provenance: Provenance, state: RobotState) -> Self {
        let iu = Self::new(provenance);
        iu.set_state(state);
        iu
    }

    /// Replaces the whole state snapshot. Partial updates are the caller's read-modify-write.
    pub fn set_state(&self, state: RobotState) {
        let attributes = state.len();
        let revision = self.state.replace(state);
        debug!(
            creator = %self.provenance.creator(),
            iuid = %self.provenance.iuid(),
            iu_type = Self::TYPE,
            revision,
            attributes,
            "robot state replaced"
        );
    }

    pub fn state(&self) -> Option<RobotState> {
        self.state.get()
    }

    /// Reads one attribute without cloning the whole state.
    pub fn attribute(&self, key: &str) -> Option<Value> {
        self.state.read(|state| state.and_then(|s| s.get(key).cloned()))
    }

    pub fn pose(&self) -> Option<Vector3D> {
        self.state.read(|state| state.and_then(RobotState::pose))
    }

    pub(crate) fn snapshot(&self) -> (Option<RobotState>, u64) {
        self.state.snapshot()
    }
}

impl IncrementalUnit for RobotStateIu {
    const TYPE: &'static str = "Robot State IU";

    type Payload = RobotState;

    fn provenance(&self) -> &Provenance {
        &self.provenance
    }

    fn payload(&self) -> Option<RobotState> {
        self.state()
    }

    fn revision(&self) -> u64 {
        self.state.revision()
    }

    fn subscribe(&self) -> watch::Receiver<u64> {
        self.state.subscribe()
    }
}
