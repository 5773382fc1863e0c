//! Index newtypes for Function Network entities.
//!
//! All addressing in a Function Network is 1-based position inside an
//! append-only table. The newtypes keep a box address from being used where
//! a port address is expected, and an attribute index from being confused
//! with either.

use std::fmt;

use serde::{Deserialize, Serialize};

/// 1-based position of a port inside one of a graph's role tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PortId(pub u32);

/// 1-based position of a box inside one of a graph's box tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BoxId(pub u32);

/// 1-based position of an entry in the module's attribute registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AttributeIndex(pub u32);

/// 1-based position of a bundle in the module's metadata table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MetadataIndex(pub u32);

impl fmt::Display for PortId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for BoxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for AttributeIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for MetadataIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl PortId {
    /// Converts the 1-based address into a 0-based slice index.
    pub fn slot(self) -> usize {
        self.0 as usize - 1
    }
}

impl BoxId {
    /// Converts the 1-based address into a 0-based slice index.
    pub fn slot(self) -> usize {
        self.0 as usize - 1
    }
}

impl AttributeIndex {
    /// Converts the 1-based address into a 0-based slice index.
    pub fn slot(self) -> usize {
        self.0 as usize - 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_display_inner_value() {
        assert_eq!(format!("{}", PortId(7)), "7");
        assert_eq!(format!("{}", BoxId(2)), "2");
        assert_eq!(format!("{}", AttributeIndex(13)), "13");
        assert_eq!(format!("{}", MetadataIndex(1)), "1");
    }

    #[test]
    fn slot_is_zero_based() {
        assert_eq!(PortId(1).slot(), 0);
        assert_eq!(BoxId(4).slot(), 3);
        assert_eq!(AttributeIndex(10).slot(), 9);
    }

    #[test]
    fn serde_roundtrip() {
        let id = PortId(42);
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "42");
        let back: PortId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, back);
    }
}
