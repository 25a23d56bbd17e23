use crate::document::NodeId;

#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    #[error("node {0:?} does not exist in this document")]
    NodeNotFound(NodeId),

    #[error("node {0:?} is not an element")]
    NotAnElement(NodeId),

    #[error("node {0:?} is not a text node")]
    NotAText(NodeId),

    #[error("node {0:?} is detached from the document tree")]
    DetachedNode(NodeId),

    #[error("document root cannot be removed")]
    RootRemoval,
}

pub type Result<T> = std::result::Result<T, IndexError>;
