//! Construction of IUs on behalf of one producing module.
//!
//! A [`Producer`] allocates identifiers from the module's namespace, stamps provenance, and
//! chains each new IU to the one it created before. It holds only weak links, so the chain
//! never keeps an IU alive.

use std::sync::{Arc, Mutex, PoisonError};

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::error::IuResult;
use crate::ids::{CreatorId, IuId, IuidAllocator};
use crate::motor_action::MotorActionRequestIu;
use crate::provenance::{IuLink, Provenance};
use crate::robot_state::RobotStateIu;
use crate::unit::{AnyIu, IncrementalUnit};

/// Producer settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProducerConfig {
    /// First id handed out by the allocator.
    pub first_iuid: u64,
    /// Link each new IU to the previously created one via `previous_iu`.
    pub link_previous: bool,
}

impl Default for ProducerConfig {
    fn default() -> Self {
        Self {
            first_iuid: 1,
            link_previous: true,
        }
    }
}

impl ProducerConfig {
    /// Parses a JSON config. Missing fields take their defaults.
    pub fn from_json(raw: &str) -> IuResult<Self> {
        Ok(serde_json::from_str(raw)?)
    }
}

/// Builds IUs for one creator.
#[derive(Debug)]
pub struct Producer {
    config: ProducerConfig,
    ids: IuidAllocator,
    /// Head of this producer's sequence.
    last: Mutex<Option<IuLink>>,
}

impl Producer {
    pub fn new(creator: impl Into<CreatorId>) -> Self {
        Self::with_config(creator, ProducerConfig::default())
    }

    pub fn with_config(creator: impl Into<CreatorId>, config: ProducerConfig) -> Self {
        let ids = IuidAllocator::new(creator.into(), config.first_iuid);
        Self {
            config,
            ids,
            last: Mutex::new(None),
        }
    }

    pub fn creator(&self) -> &CreatorId {
        self.ids.creator()
    }

    pub fn config(&self) -> &ProducerConfig {
        &self.config
    }

    /// Link to the most recently created IU, if any.
    pub fn last_link(&self) -> Option<IuLink> {
        self.last
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn create_robot_state(&self, grounded_in: Option<&AnyIu>) -> IuResult<Arc<RobotStateIu>> {
        self.create(None, grounded_in, RobotStateIu::new)
    }

    pub fn create_robot_state_with_id(
        &self,
        iuid: IuId,
        grounded_in: Option<&AnyIu>,
    ) -> IuResult<Arc<RobotStateIu>> {
        self.create(Some(iuid), grounded_in, RobotStateIu::new)
    }

    pub fn create_motor_action_request(
        &self,
        grounded_in: Option<&AnyIu>,
    ) -> IuResult<Arc<MotorActionRequestIu>> {
        self.create(None, grounded_in, MotorActionRequestIu::new)
    }

    pub fn create_motor_action_request_with_id(
        &self,
        iuid: IuId,
        grounded_in: Option<&AnyIu>,
    ) -> IuResult<Arc<MotorActionRequestIu>> {
        self.create(Some(iuid), grounded_in, MotorActionRequestIu::new)
    }

    #[instrument(level = "trace", skip_all, fields(creator = %self.creator(), iu_type = T::TYPE))]
    fn create<T>(
        &self,
        iuid: Option<IuId>,
        grounded_in: Option<&AnyIu>,
        build: impl FnOnce(Provenance) -> T,
    ) -> IuResult<Arc<T>>
    where
        T: IncrementalUnit,
        Arc<T>: Into<AnyIu>,
    {
        // Held across allocation so ids and the previous_iu chain advance together.
        let mut last = self.last.lock().unwrap_or_else(PoisonError::into_inner);

        let iuid = match iuid {
            Some(id) => self.ids.claim(id)?,
            None => self.ids.allocate()?,
        };

        let previous = if self.config.link_previous {
            last.clone()
        } else {
            None
        };
        let provenance = Provenance::new(self.creator().clone(), iuid)
            .previous_iu(previous)
            .grounded_in(grounded_in.map(IuLink::to));

        let iu = Arc::new(build(provenance));
        let handle: AnyIu = Arc::clone(&iu).into();
        *last = Some(IuLink::to(&handle));

        debug!(
            creator = %self.creator(),
            iuid = %iuid,
            iu_type = T::TYPE,
            previous_iu = ?iu.previous_iu().map(IuLink::iuid),
            grounded_in = ?iu.grounded_in().map(IuLink::iuid),
            "iu created"
        );
        Ok(iu)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::error::IuError;
    use crate::motor_action::ActionPrimitive;
    use crate::robot_state::RobotState;

    #[test]
    fn robot_state_scenario() {
        let producer = Producer::new("M1");
        let iu = producer.create_robot_state(None).unwrap();
        iu.set_state(
            RobotState::new()
                .with("battery", 0.8)
                .with("pose", json!([0, 0, 0])),
        );

        assert_eq!(iu.iuid(), IuId::new(1));
        assert_eq!(iu.creator().as_str(), "M1");
        assert!(iu.previous_iu().is_none());
        assert!(iu.grounded_in().is_none());
        assert_eq!(
            serde_json::to_value(iu.payload().unwrap()).unwrap(),
            json!({ "battery": 0.8, "pose": [0, 0, 0] })
        );
        assert_eq!(iu.type_name(), "Robot State IU");
    }

    #[test]
    fn motor_action_scenario() {
        let producer = Producer::new("camera-planner");
        let iu = producer.create_motor_action_request(None).unwrap();

        iu.set_motor_action(["turn_head_left"], "1200:abc", "exec-1");
        iu.set_motor_action(["zoom_in"], "1200:abc", "exec-2");

        let request = iu.request().unwrap();
        assert_eq!(request.motor_action, vec![ActionPrimitive::new("zoom_in")]);
        assert_eq!(request.flow_uuid.as_str(), "1200:abc");
        assert_eq!(request.execution_uuid.as_str(), "exec-2");
    }

    #[test]
    fn sequence_is_chained_through_previous_iu() {
        let producer = Producer::new("M1");
        let first = producer.create_robot_state(None).unwrap();
        let second = producer.create_robot_state(None).unwrap();
        let third = producer.create_motor_action_request(None).unwrap();

        assert_ne!(first.iuid(), second.iuid());
        assert_ne!(second.iuid(), third.iuid());

        let prev = second.previous_iu().unwrap();
        assert_eq!(prev.iuid(), first.iuid());
        assert!(prev
            .resolve()
            .unwrap()
            .ptr_eq(&AnyIu::from(Arc::clone(&first))));
        assert_eq!(third.previous_iu().unwrap().iuid(), second.iuid());
        assert_eq!(
            producer.last_link().unwrap().type_name(),
            "IAC Request Camera IU"
        );
    }

    #[test]
    fn chain_does_not_own_earlier_ius() {
        let producer = Producer::new("M1");
        let first = producer.create_robot_state(None).unwrap();
        let second = producer.create_robot_state(None).unwrap();

        drop(first);
        let prev = second.previous_iu().unwrap();
        assert!(prev.is_orphaned());
        assert_eq!(prev.iuid(), IuId::new(1));
    }

    #[test]
    fn grounding_links_other_kinds() {
        let vision = Producer::new("vision");
        let planner = Producer::new("planner");

        let state: AnyIu = vision.create_robot_state(None).unwrap().into();
        let request = planner.create_motor_action_request(Some(&state)).unwrap();

        let ground = request.grounded_in().unwrap();
        assert!(ground.points_to(&state));
        assert_eq!(ground.creator().as_str(), "vision");
        assert_eq!(ground.type_name(), "Robot State IU");
        assert!(request.previous_iu().is_none());
    }

    #[test]
    fn explicit_ids_propagate_invalid_identifier() {
        let producer = Producer::new("M1");
        producer
            .create_robot_state_with_id(IuId::new(10), None)
            .unwrap();

        let err = producer
            .create_motor_action_request_with_id(IuId::new(10), None)
            .unwrap_err();
        assert!(matches!(
            err,
            IuError::InvalidIdentifier { iuid, .. } if iuid == IuId::new(10)
        ));

        // A failed creation does not move the chain head.
        assert_eq!(producer.last_link().unwrap().iuid(), IuId::new(10));
    }

    #[test]
    fn unlinked_producer_leaves_previous_empty() {
        let config = ProducerConfig {
            first_iuid: 100,
            link_previous: false,
        };
        let producer = Producer::with_config("M1", config);
        producer.create_robot_state(None).unwrap();
        let second = producer.create_robot_state(None).unwrap();

        assert_eq!(second.iuid(), IuId::new(101));
        assert!(second.previous_iu().is_none());
    }

    #[test]
    fn provenance_is_unchanged_by_setters() {
        let producer = Producer::new("M1");
        let base: AnyIu = producer.create_robot_state(None).unwrap().into();
        let iu = producer.create_motor_action_request(Some(&base)).unwrap();
        let before = iu.provenance().clone();

        iu.set_motor_action(["a"], "f", "e1");
        iu.set_motor_action(["b"], "f", "e2");

        assert_eq!(iu.provenance(), &before);
        assert_eq!(iu.previous_iu(), before.previous());
        assert_eq!(iu.grounded_in(), before.grounding());
    }

    #[test]
    fn config_from_json_fills_defaults() {
        let config = ProducerConfig::from_json(r#"{ "first_iuid": 7 }"#).unwrap();
        assert_eq!(config.first_iuid, 7);
        assert!(config.link_previous);

        assert_eq!(
            ProducerConfig::from_json("{}").unwrap(),
            ProducerConfig::default()
        );
        assert!(matches!(
            ProducerConfig::from_json("not json"),
            Err(IuError::InvalidConfig(_))
        ));
    }
}
