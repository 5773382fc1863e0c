//! The primitive-operator table: which callee names are built in, which of
//! those are always inlined, and the shorthand names operator nodes lower to.

use fnet_cast::{BinOp, UnOp};

/// Built-in functions lowered as Primitive boxes rather than calls to a
/// registered graph.
const PRIMITIVES: &[&str] = &[
    "abs", "all", "any", "bool", "float", "int", "iter", "len", "list", "max", "min", "next",
    "pack", "print", "range", "round", "str", "sum", "tuple", "unpack", "_get", "_set", "_iter",
    "_next", "new_Record", "new_Field", "get", "set",
];

pub fn is_primitive(name: &str) -> bool {
    PRIMITIVES.contains(&name)
}

/// Primitives that are inlined even when their result feeds an assignment;
/// everything else gets a wrapper Expression graph in that position.
pub fn is_inline(name: &str) -> bool {
    matches!(name, "iter" | "next" | "range" | "_iter" | "_next")
}

/// Shorthand a binary operator box is named with.
pub fn binop_name(op: BinOp) -> &'static str {
    match op {
        BinOp::Add => "+",
        BinOp::Sub => "-",
        BinOp::Mult => "*",
        BinOp::Div => "/",
        BinOp::FloorDiv => "//",
        BinOp::Mod => "%",
        BinOp::Pow => "**",
        BinOp::LShift => "<<",
        BinOp::RShift => ">>",
        BinOp::BitOr => "|",
        BinOp::BitXor => "^",
        BinOp::BitAnd => "&",
        BinOp::And => "and",
        BinOp::Or => "or",
        BinOp::Eq => "==",
        BinOp::NotEq => "!=",
        BinOp::Lt => "<",
        BinOp::Lte => "<=",
        BinOp::Gt => ">",
        BinOp::Gte => ">=",
        BinOp::In => "in",
        BinOp::NotIn => "not in",
    }
}

/// Unary operator boxes keep the operator's CAST name.
pub fn unop_name(op: UnOp) -> &'static str {
    match op {
        UnOp::UAdd => "UAdd",
        UnOp::USub => "USub",
        UnOp::Not => "Not",
        UnOp::Invert => "Invert",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inline_primitives_are_primitives() {
        for name in ["iter", "next", "range"] {
            assert!(is_primitive(name));
            assert!(is_inline(name));
        }
    }

    #[test]
    fn print_is_not_inline() {
        assert!(is_primitive("print"));
        assert!(!is_inline("print"));
    }

    #[test]
    fn user_names_are_not_primitive() {
        assert!(!is_primitive("simulate"));
    }

    #[test]
    fn add_shorthand() {
        assert_eq!(binop_name(BinOp::Add), "+");
        assert_eq!(unop_name(UnOp::USub), "USub");
    }
}
