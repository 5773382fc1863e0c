//! Operator vocabularies for CAST expression nodes.

use serde::{Deserialize, Serialize};

/// Binary operators the front-end may emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BinOp {
    Add,
    Sub,
    Mult,
    Div,
    FloorDiv,
    Mod,
    Pow,
    LShift,
    RShift,
    BitOr,
    BitXor,
    BitAnd,
    And,
    Or,
    Eq,
    NotEq,
    Lt,
    Lte,
    Gt,
    Gte,
    In,
    NotIn,
}

/// Unary operators the front-end may emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnOp {
    UAdd,
    USub,
    Not,
    Invert,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ops_serialize_by_variant_name() {
        assert_eq!(serde_json::to_string(&BinOp::FloorDiv).unwrap(), "\"FloorDiv\"");
        assert_eq!(serde_json::to_string(&UnOp::USub).unwrap(), "\"USub\"");
    }
}
