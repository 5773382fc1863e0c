//! Structural errors raised by the Function Network data model.

use thiserror::Error;

use crate::id::{AttributeIndex, PortId};
use crate::port::{PortRole, WirePair};

#[derive(Debug, Error)]
pub enum CoreError {
    /// A wire endpoint addresses past the end of its role table.
    #[error(
        "wire {wire_index} in {pair:?} addresses {} port {index}, \
         but the table has {table_len} entries",
        .role.label()
    )]
    WireOutOfRange {
        pair: WirePair,
        wire_index: usize,
        role: PortRole,
        index: PortId,
        table_len: usize,
    },

    /// A box's `contents` field addresses past the end of the attribute
    /// registry.
    #[error("box contents address {index} exceeds the attribute registry ({table_len} entries)")]
    AttributeOutOfRange {
        index: AttributeIndex,
        table_len: usize,
    },

    /// A reserved attribute slot was never filled with a graph.
    #[error("attribute slot {index} was reserved but never registered")]
    EmptyAttributeSlot { index: AttributeIndex },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_error_names_role_label() {
        let err = CoreError::WireOutOfRange {
            pair: WirePair::FuncInToOuterIn,
            wire_index: 0,
            role: PortRole::OuterIn,
            index: PortId(5),
            table_len: 2,
        };
        let msg = err.to_string();
        assert!(msg.contains("outer-in port 5"));
        assert!(msg.contains("2 entries"));
    }
}
