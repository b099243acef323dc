//! Tree manipulation errors.

use thiserror::Error;

use crate::node::NodeId;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomError {
    #[error("unknown node {0}")]
    UnknownNode(NodeId),

    #[error("node {0} is not an element")]
    NotAnElement(NodeId),

    #[error("node {0} cannot have children")]
    NotAContainer(NodeId),

    #[error("node {child} is not a child of {parent}")]
    NotAChild { parent: NodeId, child: NodeId },

    #[error("inserting {child} into {parent} would create a cycle")]
    Cycle { parent: NodeId, child: NodeId },

    #[error("the document root cannot be moved or removed")]
    RootImmutable,
}
