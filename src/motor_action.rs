//! Motor action requests and their correlation ids.

use std::fmt;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::debug;

use crate::ids::{ExecutionId, FlowId};
use crate::payload::PayloadCell;
use crate::provenance::Provenance;
use crate::unit::IncrementalUnit;

/// One physical action, e.g. `"turn_head_left"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActionPrimitive(String);

impl ActionPrimitive {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ActionPrimitive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ActionPrimitive {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for ActionPrimitive {
    fn from(name: String) -> Self {
        Self(name)
    }
}

/// The requested actions together with the ids a response is matched on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MotorActionRequest {
    pub motor_action: Vec<ActionPrimitive>,
    pub flow_uuid: FlowId,
    pub execution_uuid: ExecutionId,
}

impl MotorActionRequest {
    pub fn new<I, A>(
        motor_action: I,
        flow_uuid: impl Into<FlowId>,
        execution_uuid: impl Into<ExecutionId>,
    ) -> Self
    where
        I: IntoIterator<Item = A>,
        A: Into<ActionPrimitive>,
    {
        Self {
            motor_action: motor_action.into_iter().map(Into::into).collect(),
            flow_uuid: flow_uuid.into(),
            execution_uuid: execution_uuid.into(),
        }
    }

    /// True when a response carrying `flow` and `execution` answers this request.
    pub fn matches(&self, flow: &FlowId, execution: &ExecutionId) -> bool {
        self.flow_uuid == *flow && self.execution_uuid == *execution
    }
}

/// IU requesting a motor action, e.g. moving the camera to get a better view.
#[derive(Debug)]
pub struct MotorActionRequestIu {
    provenance: Provenance,
    request: PayloadCell<MotorActionRequest>,
}

impl MotorActionRequestIu {
    pub fn new(provenance: Provenance) -> Self {
        Self {
            provenance,
            request: PayloadCell::empty(),
        }
    }

    /// Sets the actions and both correlation ids in one update.
    ///
    /// A second call replaces all three; nothing carries over from the previous request.
    pub fn set_motor_action<I, A>(
        &self,
        motor_action: I,
        flow_uuid: impl Into<FlowId>,
        execution_uuid: impl Into<ExecutionId>,
    ) where
        I: IntoIterator<Item = A>,
        A: Into<ActionPrimitive>,
    {
        self.set_request(MotorActionRequest::new(
            motor_action,
            flow_uuid,
            execution_uuid,
        ));
    }

    pub fn set_request(&self, request: MotorActionRequest) {
        let flow = request.flow_uuid.clone();
        let execution = request.execution_uuid.clone();
        let actions = request.motor_action.len();
        let revision = self.request.replace(request);
        debug!(
            creator = %self.provenance.creator(),
            iuid = %self.provenance.iuid(),
            iu_type = Self::TYPE,
            revision,
            flow_uuid = %flow,
            execution_uuid = %execution,
            actions,
            "motor action request set"
        );
    }

    /// All three fields from a single read.
    pub fn request(&self) -> Option<MotorActionRequest> {
        self.request.get()
    }

    pub fn motor_action(&self) -> Option<Vec<ActionPrimitive>> {
        self.request
            .read(|r| r.map(|r| r.motor_action.clone()))
    }

    pub fn flow_uuid(&self) -> Option<FlowId> {
        self.request.read(|r| r.map(|r| r.flow_uuid.clone()))
    }

    pub fn execution_uuid(&self) -> Option<ExecutionId> {
        self.request.read(|r| r.map(|r| r.execution_uuid.clone()))
    }

    /// Correlates a response with this request on both ids. `iuid` plays no part.
    pub fn matches(&self, flow: &FlowId, execution: &ExecutionId) -> bool {
        self.request
            .read(|r| r.is_some_and(|r| r.matches(flow, execution)))
    }

    pub(crate) fn snapshot(&self) -> (Option<MotorActionRequest>, u64) {
        self.request.snapshot()
    }
}

impl IncrementalUnit for MotorActionRequestIu {
    const TYPE: &'static str = "IAC Request Camera IU";

    type Payload = MotorActionRequest;

    fn provenance(&self) -> &Provenance {
        &self.provenance
    }

    fn payload(&self) -> Option<MotorActionRequest> {
        self.request()
    }

    fn revision(&self) -> u64 {
        self.request.revision()
    }

    fn subscribe(&self) -> watch::Receiver<u64> {
        self.request.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::ids::{CreatorId, IuId};

    fn fresh() -> MotorActionRequestIu {
        MotorActionRequestIu::new(Provenance::new(CreatorId::new("planner"), IuId::new(1)))
    }

    #[test]
    fn fields_are_absent_until_set() {
        let iu = fresh();
        assert_eq!(iu.motor_action(), None);
        assert_eq!(iu.flow_uuid(), None);
        assert_eq!(iu.execution_uuid(), None);
        assert_eq!(iu.payload(), None);
        assert!(!iu.matches(&FlowId::new("f"), &ExecutionId::new("e")));
    }

    #[test]
    fn set_motor_action_sets_all_three() {
        let iu = fresh();
        iu.set_motor_action(["turn_head_left"], "1200:abc", "exec-1");

        assert_eq!(
            iu.motor_action(),
            Some(vec![ActionPrimitive::new("turn_head_left")])
        );
        assert_eq!(iu.flow_uuid(), Some(FlowId::new("1200:abc")));
        assert_eq!(iu.execution_uuid(), Some(ExecutionId::new("exec-1")));
        assert_eq!(iu.type_name(), "IAC Request Camera IU");
    }

    #[test]
    fn second_call_replaces_everything() {
        let iu = fresh();
        iu.set_motor_action(["turn_head_left"], "1200:abc", "exec-1");
        iu.set_motor_action(["zoom_in"], "1200:abc", "exec-2");

        let request = iu.request().unwrap();
        assert_eq!(request.motor_action, vec![ActionPrimitive::new("zoom_in")]);
        assert_eq!(request.flow_uuid, FlowId::new("1200:abc"));
        assert_eq!(request.execution_uuid, ExecutionId::new("exec-2"));

        iu.set_motor_action(Vec::<ActionPrimitive>::new(), "1300:def", "exec-1");
        let request = iu.request().unwrap();
        assert!(request.motor_action.is_empty());
        assert_eq!(request.flow_uuid, FlowId::new("1300:def"));
        assert_eq!(iu.revision(), 3);
    }

    #[test]
    fn matching_requires_both_ids() {
        let iu = fresh();
        iu.set_motor_action(["zoom_in"], "1200:abc", "exec-2");

        let flow = FlowId::new("1200:abc");
        assert!(iu.matches(&flow, &ExecutionId::new("exec-2")));
        assert!(!iu.matches(&flow, &ExecutionId::new("exec-1")));
        assert!(!iu.matches(&FlowId::new("1300:abc"), &ExecutionId::new("exec-2")));
    }

    #[test]
    fn provenance_survives_updates() {
        let iu = fresh();
        let before = iu.provenance().clone();
        iu.set_motor_action(["a"], "f1", "e1");
        iu.set_motor_action(["b"], "f2", "e2");
        assert_eq!(iu.provenance(), &before);
    }

    #[test]
    fn concurrent_readers_never_see_mixed_fields() {
        let iu = Arc::new(fresh());
        iu.set_motor_action(["act-0"], "flow-0", "exec-0");

        std::thread::scope(|s| {
            let writer = Arc::clone(&iu);
            s.spawn(move || {
                for i in 1..500 {
                    writer.set_motor_action(
                        [format!("act-{i}")],
                        format!("flow-{i}"),
                        format!("exec-{i}"),
                    );
                }
            });

            for _ in 0..4 {
                let reader = Arc::clone(&iu);
                s.spawn(move || {
                    for _ in 0..500 {
                        let r = reader.request().expect("populated before readers start");
                        let n = r.flow_uuid.as_str().trim_start_matches("flow-");
                        assert_eq!(r.execution_uuid.as_str(), format!("exec-{n}"));
                        assert_eq!(r.motor_action[0].as_str(), format!("act-{n}"));
                    }
                });
            }
        });

        assert_eq!(iu.revision(), 500);
    }

    #[test]
    fn request_serializes_with_field_names() {
        let request = MotorActionRequest::new(["turn_head_left", "zoom_in"], "1200:abc", "exec-1");
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "motor_action": ["turn_head_left", "zoom_in"],
                "flow_uuid": "1200:abc",
                "execution_uuid": "exec-1",
            })
        );
    }
}
