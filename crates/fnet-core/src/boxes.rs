//! Box variants: the nodes of a Function Network graph.
//!
//! Plain computational boxes ([`BoxFunction`]) live in a graph's frame or
//! inner box table. Control boxes ([`BoxConditional`], [`BoxLoop`]) have
//! their own tables and hold box addresses of their constituent parts.

use serde::{Deserialize, Serialize};

use crate::id::{AttributeIndex, BoxId, MetadataIndex};
use crate::value::LiteralValue;

/// What a [`BoxFunction`] computes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BoxKind {
    /// The top-level frame of a module graph.
    Module,
    /// Calls another graph, or is a graph's own outer frame.
    Function,
    /// A standalone computed value with its own wrapper graph.
    Expression,
    /// Boolean-valued, used as a loop or conditional condition.
    Predicate,
    /// A constant value.
    Literal,
    /// A built-in operator or function with known arity, inlined in place.
    Primitive,
    /// A reference to an imported item.
    Import,
}

/// A computational box.
///
/// `contents` is the attribute-registry address of the graph this box calls,
/// set for Function/Expression/Predicate call boxes and absent for inlined
/// primitives and literals. `value` is set only for Literal boxes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoxFunction {
    pub kind: BoxKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contents: Option<AttributeIndex>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<LiteralValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<MetadataIndex>,
}

impl BoxFunction {
    pub fn new(kind: BoxKind) -> Self {
        BoxFunction {
            kind,
            name: None,
            contents: None,
            value: None,
            metadata: None,
        }
    }

    /// A named function frame or call box with no contents yet.
    pub fn function(name: impl Into<String>) -> Self {
        BoxFunction::new(BoxKind::Function).with_name(name)
    }

    /// A call box referencing a registered graph.
    pub fn call(kind: BoxKind, contents: AttributeIndex) -> Self {
        BoxFunction {
            contents: Some(contents),
            ..BoxFunction::new(kind)
        }
    }

    /// A literal constant box.
    pub fn literal(value: LiteralValue) -> Self {
        BoxFunction {
            value: Some(value),
            ..BoxFunction::new(BoxKind::Literal)
        }
    }

    /// A named primitive box, inlined at its use site.
    pub fn primitive(name: impl Into<String>) -> Self {
        BoxFunction::new(BoxKind::Primitive).with_name(name)
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_metadata(mut self, metadata: Option<MetadataIndex>) -> Self {
        self.metadata = metadata;
        self
    }
}

/// A conditional control box: condition, then-branch, and optional
/// else-branch, each addressed into the owning graph's inner box table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BoxConditional {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<BoxId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body_if: Option<BoxId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body_else: Option<BoxId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<MetadataIndex>,
}

/// A loop control box: optional pre-header, condition, and body, each
/// addressed into the owning graph's inner box table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BoxLoop {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub init: Option<BoxId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<BoxId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<BoxId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<MetadataIndex>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn function_box_carries_name() {
        let b = BoxFunction::function("foo");
        assert_eq!(b.kind, BoxKind::Function);
        assert_eq!(b.name.as_deref(), Some("foo"));
        assert!(b.contents.is_none());
    }

    #[test]
    fn call_box_carries_contents() {
        let b = BoxFunction::call(BoxKind::Expression, AttributeIndex(4));
        assert_eq!(b.kind, BoxKind::Expression);
        assert_eq!(b.contents, Some(AttributeIndex(4)));
    }

    #[test]
    fn literal_box_carries_value() {
        let b = BoxFunction::literal(LiteralValue::string("hi"));
        assert_eq!(b.kind, BoxKind::Literal);
        assert!(b.value.is_some());
    }

    #[test]
    fn control_boxes_default_empty() {
        let c = BoxConditional::default();
        assert!(c.condition.is_none() && c.body_if.is_none() && c.body_else.is_none());
        let l = BoxLoop::default();
        assert!(l.init.is_none() && l.condition.is_none() && l.body.is_none());
    }

    #[test]
    fn serde_skips_absent_fields() {
        let json = serde_json::to_string(&BoxFunction::primitive("add")).unwrap();
        assert_eq!(json, r#"{"kind":"Primitive","name":"add"}"#);
    }
}
