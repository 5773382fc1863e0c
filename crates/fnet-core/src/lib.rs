//! Data model of the Function Network IR: hierarchical graphs of boxes
//! connected by ports and wires, gathered in a module with an attribute
//! registry and a metadata table.
//!
//! Everything here is append-only and 1-based; see [`graph::FnGraph`] for
//! the addressing contract.

pub mod boxes;
pub mod error;
pub mod graph;
pub mod id;
pub mod module;
pub mod port;
pub mod value;

// Re-export commonly used types
pub use boxes::{BoxConditional, BoxFunction, BoxKind, BoxLoop};
pub use error::CoreError;
pub use graph::FnGraph;
pub use id::{AttributeIndex, BoxId, MetadataIndex, PortId};
pub use module::{
    Attribute, FnModule, ImportKind, ImportReference, Metadata, MetadataBundle, SCHEMA,
    SCHEMA_VERSION,
};
pub use port::{Endpoint, Port, PortRole, Wire, WirePair};
pub use value::LiteralValue;
