//! Identity and correlation handles.

use std::collections::HashSet;
use std::fmt;
use std::sync::{Mutex, PoisonError};

use serde::{Deserialize, Serialize};

use crate::error::{IuError, IuResult};

/// Process-unique identity of an incremental unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IuId(u64);

impl IuId {
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for IuId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque handle of the module that produced an IU.
///
/// This is an identifier, not a pointer: an IU stays valid after its creator is gone.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CreatorId(String);

impl CreatorId {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CreatorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CreatorId {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

/// Correlation id grouping related motor action requests into one logical flow.
///
/// The value is caller-supplied and treated as opaque.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FlowId(String);

impl FlowId {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FlowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for FlowId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for FlowId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Correlation id of one concrete execution attempt within a flow.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExecutionId(String);

impl ExecutionId {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ExecutionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ExecutionId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for ExecutionId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Ids in `[first, next)` are issued. `claimed` holds only explicitly claimed ids outside that
/// range; `next == None` means everything from `first` upward is issued.
#[derive(Debug)]
struct Namespace {
    first: u64,
    next: Option<u64>,
    claimed: HashSet<IuId>,
}

impl Namespace {
    fn in_allocated_range(&self, iuid: IuId) -> bool {
        let id = iuid.value();
        id >= self.first && self.next.map_or(true, |next| id < next)
    }

    fn is_issued(&self, iuid: IuId) -> bool {
        self.in_allocated_range(iuid) || self.claimed.contains(&iuid)
    }
}

/// Identifier namespace of a single creator.
///
/// Ids are handed out in increasing order by [`IuidAllocator::allocate`]; ids chosen by the
/// caller go through [`IuidAllocator::claim`]. Either way an id is issued at most once.
/// Sequentially allocated ids cost no memory; only claims ahead of (or below) the allocation
/// range are remembered, and only until the range reaches them.
#[derive(Debug)]
pub struct IuidAllocator {
    creator: CreatorId,
    namespace: Mutex<Namespace>,
}

impl IuidAllocator {
    pub fn new(creator: CreatorId, first: u64) -> Self {
        Self {
            creator,
            namespace: Mutex::new(Namespace {
                first,
                next: Some(first),
                claimed: HashSet::new(),
            }),
        }
    }

    pub fn creator(&self) -> &CreatorId {
        &self.creator
    }

    /// Issues the next unused id.
    pub fn allocate(&self) -> IuResult<IuId> {
        let mut ns = self.namespace.lock().unwrap_or_else(PoisonError::into_inner);

        // Skip over ids that were claimed explicitly; once inside the range they need no entry.
        while let Some(candidate) = ns.next {
            ns.next = candidate.checked_add(1);
            let id = IuId::new(candidate);
            if !ns.claimed.remove(&id) {
                return Ok(id);
            }
        }

        Err(IuError::IdentifiersExhausted(self.creator.clone()))
    }

    /// Reserves a caller-chosen id.
    pub fn claim(&self, iuid: IuId) -> IuResult<IuId> {
        let mut ns = self.namespace.lock().unwrap_or_else(PoisonError::into_inner);
        if ns.in_allocated_range(iuid) || !ns.claimed.insert(iuid) {
            return Err(IuError::InvalidIdentifier {
                creator: self.creator.clone(),
                iuid,
            });
        }
        Ok(iuid)
    }

    pub fn is_issued(&self, iuid: IuId) -> bool {
        self.namespace
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_issued(iuid)
    }
}
