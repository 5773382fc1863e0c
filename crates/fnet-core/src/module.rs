//! The module container: one root graph plus the attribute registry every
//! call box resolves its `contents` against.
//!
//! Registration is append-only and returns the new entry's 1-based
//! [`AttributeIndex`]. A slot may be reserved before its graph exists, which
//! is how forward references between function definitions resolve without a
//! second pass: callers wire against the reserved index, and the definition
//! fills the slot in later.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::error::CoreError;
use crate::graph::FnGraph;
use crate::id::{AttributeIndex, MetadataIndex};

/// One entry in the module's attribute registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Attribute {
    Fn(FnGraph),
    Import(ImportReference),
}

/// Where an import resolves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImportKind {
    /// Part of the source language's standard distribution.
    Native,
    /// Anything else; resolution is deferred to downstream tooling.
    Other,
}

/// A registered import: the dotted source path plus the symbol pulled from
/// it, if the import named one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportReference {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub symbol: Option<String>,
    pub kind: ImportKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<MetadataIndex>,
}

/// Module-level and entity-level metadata records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Metadata {
    /// How and when this module was produced.
    Provenance { method: String, timestamp: String },
    /// Source location of the entity the bundle is attached to.
    SourceSpan {
        row_start: u32,
        row_end: u32,
        col_start: u32,
        col_end: u32,
    },
    /// The source files this module was lowered from.
    SourceCollection { name: String, files: Vec<String> },
    /// The source-level type of a literal, as the front-end reported it.
    SourceDataType { data_type: String },
}

/// Metadata records attached to one entity. Most entities carry one or two.
pub type MetadataBundle = SmallVec<[Metadata; 2]>;

/// A complete Function Network module.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FnModule {
    pub schema: String,
    pub schema_version: String,
    pub name: String,
    /// The module-level graph; its frame is the module box.
    pub root: FnGraph,
    /// Registry of every nested graph and import, addressed by the
    /// `contents` field of call boxes anywhere in the module.
    pub attributes: Vec<Attribute>,
    pub metadata_collection: Vec<MetadataBundle>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<MetadataIndex>,
}

pub const SCHEMA: &str = "FN";
pub const SCHEMA_VERSION: &str = "0.1.5";

impl FnModule {
    pub fn new(name: impl Into<String>) -> Self {
        FnModule {
            schema: SCHEMA.to_owned(),
            schema_version: SCHEMA_VERSION.to_owned(),
            name: name.into(),
            root: FnGraph::new(),
            attributes: Vec::new(),
            metadata_collection: Vec::new(),
            metadata: None,
        }
    }

    // -----------------------------------------------------------------------
    // Attribute registry
    // -----------------------------------------------------------------------

    /// Registers a finished graph and returns its address.
    pub fn register(&mut self, graph: FnGraph) -> AttributeIndex {
        self.attributes.push(Attribute::Fn(graph));
        AttributeIndex(self.attributes.len() as u32)
    }

    /// Registers an import reference and returns its address.
    pub fn register_import(&mut self, import: ImportReference) -> AttributeIndex {
        self.attributes.push(Attribute::Import(import));
        AttributeIndex(self.attributes.len() as u32)
    }

    /// Reserves a slot for a graph that does not exist yet. The placeholder
    /// is an empty graph; [`FnModule::replace_fn`] fills it in.
    pub fn reserve(&mut self) -> AttributeIndex {
        self.register(FnGraph::new())
    }

    /// Fills a previously reserved slot.
    ///
    /// Also used to write back a graph that was built locally and is now
    /// complete. The slot must exist and must be a graph slot.
    pub fn replace_fn(&mut self, index: AttributeIndex, graph: FnGraph) {
        debug_assert!(index.slot() < self.attributes.len());
        self.attributes[index.slot()] = Attribute::Fn(graph);
    }

    /// The graph registered at `index`, if the slot holds one.
    pub fn graph(&self, index: AttributeIndex) -> Option<&FnGraph> {
        match self.attributes.get(index.slot()) {
            Some(Attribute::Fn(g)) => Some(g),
            _ => None,
        }
    }

    /// Finds a registered graph whose frame box carries the given name.
    pub fn find_fn_by_name(&self, name: &str) -> Option<AttributeIndex> {
        self.attributes.iter().position(|a| match a {
            Attribute::Fn(g) => g.name() == Some(name),
            Attribute::Import(_) => false,
        })
        .map(|i| AttributeIndex(i as u32 + 1))
    }

    // -----------------------------------------------------------------------
    // Metadata
    // -----------------------------------------------------------------------

    /// Appends a metadata bundle and returns its address.
    pub fn insert_metadata(&mut self, bundle: MetadataBundle) -> MetadataIndex {
        self.metadata_collection.push(bundle);
        MetadataIndex(self.metadata_collection.len() as u32)
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    /// Structural check over the whole module: every wire endpoint is in
    /// range within its graph, every box `contents` address resolves inside
    /// the attribute registry, and no reserved slot is still the frameless
    /// placeholder [`FnModule::reserve`] installed.
    pub fn check(&self) -> Result<(), CoreError> {
        self.check_graph(&self.root)?;
        for (i, attr) in self.attributes.iter().enumerate() {
            if let Attribute::Fn(g) = attr {
                if g.frame.is_empty() {
                    return Err(CoreError::EmptyAttributeSlot {
                        index: AttributeIndex(i as u32 + 1),
                    });
                }
                self.check_graph(g)?;
            }
        }
        Ok(())
    }

    fn check_graph(&self, graph: &FnGraph) -> Result<(), CoreError> {
        graph.check_wires()?;
        let table_len = self.attributes.len();
        for b in graph.frame.iter().chain(graph.boxes.iter()) {
            if let Some(index) = b.contents {
                if index.slot() >= table_len {
                    return Err(CoreError::AttributeOutOfRange { index, table_len });
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::boxes::{BoxFunction, BoxKind};
    use smallvec::smallvec;

    #[test]
    fn register_returns_one_based_index() {
        let mut m = FnModule::new("m");
        let a = m.register(FnGraph::with_frame(BoxFunction::function("f")));
        let b = m.register(FnGraph::with_frame(BoxFunction::function("g")));
        assert_eq!(a, AttributeIndex(1));
        assert_eq!(b, AttributeIndex(2));
        assert_eq!(m.graph(b).unwrap().name(), Some("g"));
    }

    #[test]
    fn reserve_then_replace() {
        let mut m = FnModule::new("m");
        let slot = m.reserve();
        assert!(m.graph(slot).unwrap().frame.is_empty());
        m.replace_fn(slot, FnGraph::with_frame(BoxFunction::function("late")));
        assert_eq!(m.graph(slot).unwrap().name(), Some("late"));
    }

    #[test]
    fn find_fn_by_name_skips_imports() {
        let mut m = FnModule::new("m");
        m.register_import(ImportReference {
            name: "math".into(),
            symbol: None,
            kind: ImportKind::Native,
            metadata: None,
        });
        let g = m.register(FnGraph::with_frame(BoxFunction::function("math")));
        assert_eq!(m.find_fn_by_name("math"), Some(g));
    }

    #[test]
    fn check_catches_dangling_contents() {
        let mut m = FnModule::new("m");
        m.root
            .add_box(BoxFunction::call(BoxKind::Expression, AttributeIndex(3)));
        assert!(matches!(
            m.check(),
            Err(CoreError::AttributeOutOfRange { .. })
        ));
    }

    #[test]
    fn check_catches_unfilled_reserved_slot() {
        let mut m = FnModule::new("m");
        m.root
            .add_frame(BoxFunction::new(BoxKind::Module).with_name("m"));
        let slot = m.reserve();
        assert!(matches!(
            m.check(),
            Err(CoreError::EmptyAttributeSlot { index }) if index == slot
        ));
        m.replace_fn(slot, FnGraph::with_frame(BoxFunction::function("late")));
        assert!(m.check().is_ok());
    }

    #[test]
    fn metadata_indexes_are_one_based() {
        let mut m = FnModule::new("m");
        let i = m.insert_metadata(smallvec![Metadata::Provenance {
            method: "cast-lowering".into(),
            timestamp: "2026-01-01T00:00:00Z".into(),
        }]);
        assert_eq!(i, MetadataIndex(1));
        assert_eq!(m.metadata_collection.len(), 1);
    }

    #[test]
    fn module_serde_roundtrip() {
        let mut m = FnModule::new("example");
        let frame = m.root.add_frame(BoxFunction::new(BoxKind::Module).with_name("example"));
        m.root
            .add_outer_out(crate::port::Port::named("x", frame));
        let json = serde_json::to_string(&m).unwrap();
        let back: FnModule = serde_json::from_str(&json).unwrap();
        assert_eq!(m, back);
    }
}
