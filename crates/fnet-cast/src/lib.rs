//! The Common Abstract Syntax Tree (CAST): the scope-resolved tree IR the
//! lowering pass consumes. Produced by an external front-end; this crate is
//! the shape contract only.

pub mod module;
pub mod node;
pub mod ops;
pub mod span;

// Re-export commonly used types
pub use module::CastModule;
pub use node::{CastData, CastNode, Param, UsedVars};
pub use ops::{BinOp, UnOp};
pub use span::SourceSpan;
