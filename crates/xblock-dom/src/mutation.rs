//! Child-list mutation records.

use crate::node::NodeId;

/// Who caused a mutation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MutationOrigin {
    /// The host page's own rendering.
    #[default]
    Host,
    /// The annotator's own insertions, which must not re-trigger scheduling.
    Extension,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationRecord {
    pub target: NodeId,
    pub added: Vec<NodeId>,
    pub removed: Vec<NodeId>,
    pub origin: MutationOrigin,
}

impl MutationRecord {
    pub fn is_host(&self) -> bool {
        self.origin == MutationOrigin::Host
    }
}
