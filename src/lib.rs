//! Incremental units (IUs) for robot state and motor action processing.
//!
//! This crate defines:
//! - [`IncrementalUnit`]: the contract every IU kind honors. Provenance (creator, id,
//!   `previous_iu`, `grounded_in`, creation time) is fixed at construction; only the payload is
//!   revised in place, through one update path per IU.
//! - [`RobotStateIu`]: a snapshot of named robot attributes.
//! - [`MotorActionRequestIu`]: requested motor actions plus flow/execution correlation ids.
//! - [`AnyIu`]: a shared handle over the known IU kinds, used for dispatch by consumers.
//! - [`Producer`]: allocates ids for one creator and chains the IUs it builds.
//!
//! Links between IUs are weak: an IU graph never keeps its members alive, and a link whose
//! target is gone is reported as orphaned rather than as an error.

pub mod error;
pub mod ids;
pub mod motor_action;
pub mod payload;
pub mod producer;
pub mod provenance;
pub mod robot_state;
pub mod unit;

pub use error::{IuError, IuResult};
pub use ids::{CreatorId, ExecutionId, FlowId, IuId, IuidAllocator};
pub use motor_action::{ActionPrimitive, MotorActionRequest, MotorActionRequestIu};
pub use producer::{Producer, ProducerConfig};
pub use provenance::{IuLink, Provenance};
pub use robot_state::{RobotState, RobotStateIu, Vector3D};
pub use unit::{AnyIu, IncrementalUnit, IuSnapshot, PayloadSnapshot, WeakIu};
