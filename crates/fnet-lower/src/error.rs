//! Errors and warnings raised while lowering.
//!
//! The split follows the pass's error taxonomy: unresolved references
//! degrade to warnings plus an unresolved wire endpoint, while structural
//! problems (node shapes the pass cannot lower, broken loop interfaces)
//! abort the whole module. Every fatal error is wrapped with the source
//! span of the statement it occurred under before it reaches the caller.

use fnet_cast::SourceSpan;
use fnet_core::CoreError;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LowerError {
    /// A fatal error, annotated with the node it occurred under.
    #[error("lowering {kind} at {span}: {source}")]
    AtNode {
        kind: &'static str,
        span: SourceSpan,
        #[source]
        source: Box<LowerError>,
    },

    /// A structurally valid CAST node in a position the pass cannot lower.
    #[error("cannot lower a {kind} node {context}")]
    UnsupportedNode {
        kind: &'static str,
        context: &'static str,
    },

    /// A loop predicate reads a variable with no same-named loop-in port on
    /// the enclosing loop interface.
    #[error("loop predicate reads `{name}` but the loop has no loop-in port by that name")]
    MissingLoopInPort { name: String },

    /// A loop pre-header must end with the three-value iteration protocol.
    #[error("loop pre-header produced {found} function-out ports, expected at least 3")]
    LoopInitArity { found: usize },

    #[error(transparent)]
    Core(#[from] CoreError),
}

impl LowerError {
    /// Wraps an error with the span of the node being lowered, unless it is
    /// already located.
    pub fn at(kind: &'static str, span: SourceSpan, err: LowerError) -> LowerError {
        match err {
            located @ LowerError::AtNode { .. } => located,
            other => LowerError::AtNode {
                kind,
                span,
                source: Box::new(other),
            },
        }
    }
}

/// Non-fatal conditions collected during the pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Error)]
pub enum LowerWarning {
    /// A variable read with no environment binding; wired unresolved.
    #[error("unresolved variable `{name}`")]
    UnresolvedVariable { name: String },

    /// A wire was emitted with an unresolved endpoint because the value it
    /// should carry does not exist yet in the graph.
    #[error("unresolved {table} wire endpoint")]
    UnresolvedWire { table: &'static str },

    /// A method call whose receiver could not be matched to any record.
    #[error("unresolved attribute call `{receiver}.{attr}`")]
    UnresolvedAttributeCall { receiver: String, attr: String },

    /// A keyword argument naming no formal parameter of the callee.
    #[error("call to `{func}` has no parameter named `{keyword}`")]
    UnknownKeywordArgument { func: String, keyword: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn at_node_does_not_double_wrap() {
        let inner = LowerError::MissingLoopInPort { name: "k".into() };
        let once = LowerError::at("Loop", SourceSpan::row(3), inner);
        let twice = LowerError::at("FunctionDef", SourceSpan::row(1), once);
        match twice {
            LowerError::AtNode { kind, .. } => assert_eq!(kind, "Loop"),
            other => panic!("expected AtNode, got {other}"),
        }
    }

    #[test]
    fn messages_carry_context() {
        let err = LowerError::at(
            "Loop",
            SourceSpan::row(9),
            LowerError::MissingLoopInPort { name: "i".into() },
        );
        let msg = err.to_string();
        assert!(msg.contains("line 9"));
        assert!(msg.contains("`i`"));
    }
}
