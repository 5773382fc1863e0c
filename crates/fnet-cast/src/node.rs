//! CAST nodes: the scope-annotated tree the lowering pass consumes.
//!
//! The front-end has already resolved scopes (every [`CastData::Name`]
//! carries a module-unique identity) and precomputed the variable-usage
//! facts on loops and conditionals; this crate only defines the shapes.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::ops::{BinOp, UnOp};
use crate::span::SourceSpan;

/// A tree node: payload plus source location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CastNode {
    pub data: CastData,
    #[serde(default)]
    pub span: SourceSpan,
}

impl CastNode {
    pub fn new(data: CastData, span: SourceSpan) -> Self {
        CastNode { data, span }
    }

    /// A node with no source counterpart.
    pub fn synthetic(data: CastData) -> Self {
        CastNode::new(data, SourceSpan::default())
    }

    /// Short label for diagnostics.
    pub fn kind(&self) -> &'static str {
        self.data.kind()
    }
}

/// A formal parameter or record field: a name with an optional default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Param {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<Box<CastNode>>,
}

impl Param {
    pub fn new(name: impl Into<String>) -> Self {
        Param {
            name: name.into(),
            default_value: None,
        }
    }

    pub fn with_default(mut self, value: CastNode) -> Self {
        self.default_value = Some(Box::new(value));
        self
    }
}

/// Scope-resolved variable identities used in the loop/conditional usage
/// facts, keyed by the front-end's per-variable id. Insertion order is the
/// order ports will be created in, so it is semantic.
pub type UsedVars = IndexMap<u32, String>;

/// The closed set of node shapes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CastData {
    /// `left = right`. `left` is a Name, Tuple, or Attribute target.
    Assignment {
        left: Box<CastNode>,
        right: Box<CastNode>,
    },

    /// `value.attr`.
    Attribute {
        value: Box<CastNode>,
        attr: String,
    },

    BinaryOp {
        op: BinOp,
        left: Box<CastNode>,
        right: Box<CastNode>,
    },

    UnaryOp {
        op: UnOp,
        value: Box<CastNode>,
    },

    /// `func(arguments...)`. `func` is a Name or an Attribute. A keyword
    /// argument arrives as an Assignment node in `arguments`.
    Call {
        func: Box<CastNode>,
        arguments: Vec<CastNode>,
    },

    FunctionDef {
        name: String,
        args: Vec<Param>,
        body: Vec<CastNode>,
    },

    /// A constant. `value_type` names the source-level type; `source_type`
    /// carries the front-end's raw type string when it differs.
    Literal {
        value_type: String,
        value: serde_json::Value,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        source_type: Option<String>,
    },

    /// A loop with optional pre-header statements. `used_vars` lists every
    /// variable the loop reads or writes, in port-creation order.
    Loop {
        init: Vec<CastNode>,
        expr: Box<CastNode>,
        body: Vec<CastNode>,
        used_vars: UsedVars,
    },

    /// A conditional. `expr_used_vars` are the names the test reads,
    /// `vars_accessed_before_mod` the names either branch reads before
    /// possibly writing, `modified_vars` the names either branch writes.
    If {
        expr: Box<CastNode>,
        body: Vec<CastNode>,
        orelse: Vec<CastNode>,
        expr_used_vars: UsedVars,
        vars_accessed_before_mod: UsedVars,
        modified_vars: UsedVars,
    },

    Import {
        name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        alias: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        symbol: Option<String>,
        #[serde(default)]
        star: bool,
    },

    Return {
        value: Box<CastNode>,
    },

    /// A scope-resolved variable reference.
    Name {
        name: String,
        id: u32,
    },

    RecordDef {
        name: String,
        bases: Vec<String>,
        /// FunctionDef nodes; a function named `__init__` is the
        /// constructor.
        funcs: Vec<CastNode>,
        fields: Vec<Param>,
    },

    Tuple {
        values: Vec<CastNode>,
    },
}

impl CastData {
    pub fn kind(&self) -> &'static str {
        match self {
            CastData::Assignment { .. } => "Assignment",
            CastData::Attribute { .. } => "Attribute",
            CastData::BinaryOp { .. } => "BinaryOp",
            CastData::UnaryOp { .. } => "UnaryOp",
            CastData::Call { .. } => "Call",
            CastData::FunctionDef { .. } => "FunctionDef",
            CastData::Literal { .. } => "Literal",
            CastData::Loop { .. } => "Loop",
            CastData::If { .. } => "If",
            CastData::Import { .. } => "Import",
            CastData::Return { .. } => "Return",
            CastData::Name { .. } => "Name",
            CastData::RecordDef { .. } => "RecordDef",
            CastData::Tuple { .. } => "Tuple",
        }
    }
}
