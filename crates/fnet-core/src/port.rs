//! Ports, wires, and the role vocabulary that partitions them.
//!
//! A port's identity is its 1-based position in its role table at the time
//! it was appended; wires address ports by that position alone. An endpoint
//! may also be explicitly unresolved, which serializes as `-1` to keep the
//! downstream schema stable.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::id::{BoxId, MetadataIndex, PortId};
use crate::value::LiteralValue;

/// The eight port roles. Each role is a distinct ordered table per graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PortRole {
    /// The graph's own inputs (formal parameters).
    OuterIn,
    /// The graph's own outputs (return slots).
    OuterOut,
    /// Call-site inputs of a box within its parent graph.
    FuncIn,
    /// Call-site outputs of a box within its parent graph.
    FuncOut,
    /// Values flowing into a conditional box from its parent.
    CondIn,
    /// Values flowing out of a conditional box into its parent.
    CondOut,
    /// Values flowing into a loop box from its parent.
    LoopIn,
    /// Values flowing out of a loop box into its parent.
    LoopOut,
}

impl PortRole {
    /// Short lowercase label used in diagnostics.
    pub fn label(self) -> &'static str {
        match self {
            PortRole::OuterIn => "outer-in",
            PortRole::OuterOut => "outer-out",
            PortRole::FuncIn => "function-in",
            PortRole::FuncOut => "function-out",
            PortRole::CondIn => "conditional-in",
            PortRole::CondOut => "conditional-out",
            PortRole::LoopIn => "loop-in",
            PortRole::LoopOut => "loop-out",
        }
    }
}

/// A graph interface slot.
///
/// `name` is present when the port denotes a named source variable and
/// absent for anonymous intermediate values. `box_id` addresses the owning
/// box within the box table its role implies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Port {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub box_id: BoxId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<LiteralValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<MetadataIndex>,
}

impl Port {
    /// An anonymous port on the given box.
    pub fn anonymous(box_id: BoxId) -> Self {
        Port {
            name: None,
            box_id,
            default_value: None,
            metadata: None,
        }
    }

    /// A named port on the given box.
    pub fn named(name: impl Into<String>, box_id: BoxId) -> Self {
        Port {
            name: Some(name.into()),
            box_id,
            default_value: None,
            metadata: None,
        }
    }

    pub fn with_default(mut self, value: LiteralValue) -> Self {
        self.default_value = Some(value);
        self
    }

    pub fn with_metadata(mut self, metadata: Option<MetadataIndex>) -> Self {
        self.metadata = metadata;
        self
    }
}

/// One end of a wire: a resolved 1-based port address, or explicitly
/// unresolved. Unresolved endpoints are a diagnosable, non-fatal condition;
/// they serialize as `-1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    Port(PortId),
    Unresolved,
}

impl Endpoint {
    pub fn port(id: u32) -> Self {
        Endpoint::Port(PortId(id))
    }

    pub fn is_unresolved(self) -> bool {
        matches!(self, Endpoint::Unresolved)
    }

    pub fn as_port(self) -> Option<PortId> {
        match self {
            Endpoint::Port(id) => Some(id),
            Endpoint::Unresolved => None,
        }
    }
}

impl From<PortId> for Endpoint {
    fn from(id: PortId) -> Self {
        Endpoint::Port(id)
    }
}

impl Serialize for Endpoint {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Endpoint::Port(id) => serializer.serialize_i64(id.0 as i64),
            Endpoint::Unresolved => serializer.serialize_i64(-1),
        }
    }
}

impl<'de> Deserialize<'de> for Endpoint {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = i64::deserialize(deserializer)?;
        match raw {
            -1 => Ok(Endpoint::Unresolved),
            n if n >= 1 && n <= u32::MAX as i64 => Ok(Endpoint::port(n as u32)),
            other => Err(D::Error::custom(format!(
                "invalid wire endpoint {other}: expected -1 or a 1-based index"
            ))),
        }
    }
}

/// A directed connection between two ports, stored in the table specific to
/// the role pair it connects.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Wire {
    pub src: Endpoint,
    pub tgt: Endpoint,
}

impl Wire {
    pub fn new(src: impl Into<Endpoint>, tgt: impl Into<Endpoint>) -> Self {
        Wire {
            src: src.into(),
            tgt: tgt.into(),
        }
    }
}

/// The role-pair tables a wire may live in. The first role names the wire's
/// source table, the second its target table, both within one graph (the
/// loop-init pairs address the init graph's outer interface from the parent).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WirePair {
    /// function-in -> outer-in: a box input fed by the graph's own input.
    FuncInToOuterIn,
    /// outer-out -> function-out: a graph output fed by a box output.
    OuterOutToFuncOut,
    /// function-in -> function-out: a box input fed by another box's output.
    FuncInToFuncOut,
    /// outer-out -> outer-in: an input passed through unchanged.
    OuterOutToOuterIn,
    /// conditional-in -> function-out.
    CondInToFuncOut,
    /// conditional-in -> outer-in.
    CondInToOuterIn,
    /// outer-out -> conditional-out.
    OuterOutToCondOut,
    /// loop-in -> function-out.
    LoopInToFuncOut,
    /// loop-in -> outer-in.
    LoopInToOuterIn,
    /// function-in -> loop-out.
    FuncInToLoopOut,
    /// outer-out -> loop-out.
    OuterOutToLoopOut,
    /// condition argument: predicate call input -> control-box input.
    CondArg,
    /// loop-init argument: init graph outer-in -> loop-in.
    InitArg,
    /// loop-init seed: loop-in -> init graph outer-out.
    InitSeed,
}

impl WirePair {
    /// Every role-pair table, in declaration order.
    pub const ALL: [WirePair; 14] = [
        WirePair::FuncInToOuterIn,
        WirePair::OuterOutToFuncOut,
        WirePair::FuncInToFuncOut,
        WirePair::OuterOutToOuterIn,
        WirePair::CondInToFuncOut,
        WirePair::CondInToOuterIn,
        WirePair::OuterOutToCondOut,
        WirePair::LoopInToFuncOut,
        WirePair::LoopInToOuterIn,
        WirePair::FuncInToLoopOut,
        WirePair::OuterOutToLoopOut,
        WirePair::CondArg,
        WirePair::InitArg,
        WirePair::InitSeed,
    ];

    /// Role table the `src` endpoint of wires in this pair indexes into.
    pub fn src_role(self) -> PortRole {
        match self {
            WirePair::FuncInToOuterIn | WirePair::FuncInToFuncOut | WirePair::FuncInToLoopOut => {
                PortRole::FuncIn
            }
            WirePair::OuterOutToFuncOut
            | WirePair::OuterOutToOuterIn
            | WirePair::OuterOutToCondOut
            | WirePair::OuterOutToLoopOut => PortRole::OuterOut,
            WirePair::CondInToFuncOut | WirePair::CondInToOuterIn => PortRole::CondIn,
            WirePair::LoopInToFuncOut | WirePair::LoopInToOuterIn | WirePair::InitSeed => {
                PortRole::LoopIn
            }
            WirePair::CondArg => PortRole::FuncIn,
            WirePair::InitArg => PortRole::OuterIn,
        }
    }

    /// Role table the `tgt` endpoint of wires in this pair indexes into.
    pub fn tgt_role(self) -> PortRole {
        match self {
            WirePair::FuncInToOuterIn | WirePair::CondInToOuterIn => PortRole::OuterIn,
            WirePair::OuterOutToFuncOut | WirePair::CondInToFuncOut | WirePair::LoopInToFuncOut => {
                PortRole::FuncOut
            }
            WirePair::FuncInToFuncOut => PortRole::FuncOut,
            WirePair::OuterOutToOuterIn => PortRole::OuterIn,
            WirePair::OuterOutToCondOut => PortRole::CondOut,
            WirePair::LoopInToOuterIn => PortRole::OuterIn,
            WirePair::FuncInToLoopOut | WirePair::OuterOutToLoopOut => PortRole::LoopOut,
            // Condition arguments target the control box's input ports;
            // loops and conditionals share this table, loops resolve it
            // against loop-in and conditionals against conditional-in.
            WirePair::CondArg => PortRole::LoopIn,
            WirePair::InitArg => PortRole::LoopIn,
            WirePair::InitSeed => PortRole::OuterOut,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_serializes_unresolved_as_minus_one() {
        let json = serde_json::to_string(&Endpoint::Unresolved).unwrap();
        assert_eq!(json, "-1");
        let back: Endpoint = serde_json::from_str("-1").unwrap();
        assert!(back.is_unresolved());
    }

    #[test]
    fn endpoint_serializes_port_as_index() {
        let json = serde_json::to_string(&Endpoint::port(3)).unwrap();
        assert_eq!(json, "3");
        let back: Endpoint = serde_json::from_str("3").unwrap();
        assert_eq!(back.as_port(), Some(PortId(3)));
    }

    #[test]
    fn endpoint_rejects_zero_and_garbage() {
        assert!(serde_json::from_str::<Endpoint>("0").is_err());
        assert!(serde_json::from_str::<Endpoint>("-7").is_err());
    }

    #[test]
    fn wire_roundtrip() {
        let wire = Wire::new(Endpoint::port(2), Endpoint::Unresolved);
        let json = serde_json::to_string(&wire).unwrap();
        assert_eq!(json, r#"{"src":2,"tgt":-1}"#);
        let back: Wire = serde_json::from_str(&json).unwrap();
        assert_eq!(wire, back);
    }

    #[test]
    fn every_pair_names_both_roles() {
        for pair in WirePair::ALL {
            // Exercise both lookups; a missing match arm would not compile,
            // this guards against a label/role mixup instead.
            let _ = pair.src_role().label();
            let _ = pair.tgt_role().label();
        }
    }

    #[test]
    fn named_port_keeps_name() {
        let p = Port::named("x", BoxId(1));
        assert_eq!(p.name.as_deref(), Some("x"));
        assert_eq!(p.box_id, BoxId(1));
        assert!(p.default_value.is_none());
    }
}
