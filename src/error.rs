use std::fmt;

use crate::view::{Axis, NodeId};

#[derive(Clone, Debug, PartialEq)]
pub enum UiError {
    InvalidQuantization {
        axis: Axis,
        multiple: f32,
        offset: f32,
    },
    InvalidNineSlice(&'static str),
    UnknownNode(NodeId),
    NotAContainer(NodeId),
    SelfParent(NodeId),
    WouldCycle {
        parent: NodeId,
        child: NodeId,
    },
    NotAChild {
        parent: NodeId,
        child: NodeId,
    },
    IndexOutOfRange {
        index: usize,
        len: usize,
    },
}

impl fmt::Display for UiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidQuantization {
                axis,
                multiple,
                offset,
            } => write!(
                f,
                "invalid {axis:?} quantization: multiple={multiple}, offset={offset} (both must be >= 0)"
            ),
            Self::InvalidNineSlice(message) => write!(f, "invalid nine-slice: {message}"),
            Self::UnknownNode(id) => write!(f, "unknown node: {id:?}"),
            Self::NotAContainer(id) => write!(f, "node is not a container: {id:?}"),
            Self::SelfParent(id) => write!(f, "node cannot be its own parent: {id:?}"),
            Self::WouldCycle { parent, child } => write!(
                f,
                "attaching {child:?} under {parent:?} would create a cycle"
            ),
            Self::NotAChild { parent, child } => {
                write!(f, "{child:?} is not a child of {parent:?}")
            }
            Self::IndexOutOfRange { index, len } => {
                write!(f, "child index {index} out of range for {len} children")
            }
        }
    }
}

impl std::error::Error for UiError {}
