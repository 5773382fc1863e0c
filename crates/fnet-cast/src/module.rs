//! The CAST module wrapper: one source file's worth of top-level nodes.

use serde::{Deserialize, Serialize};

use crate::node::CastNode;
use crate::span::SourceSpan;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CastModule {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_file: Option<String>,
    pub body: Vec<CastNode>,
    #[serde(default)]
    pub span: SourceSpan,
}

impl CastModule {
    pub fn new(name: impl Into<String>, body: Vec<CastNode>) -> Self {
        CastModule {
            name: name.into(),
            source_file: None,
            body,
            span: SourceSpan::default(),
        }
    }

    pub fn with_source_file(mut self, path: impl Into<String>) -> Self {
        self.source_file = Some(path.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn module_roundtrip() {
        let m = CastModule::new("example", vec![]).with_source_file("example.py");
        let json = serde_json::to_string(&m).unwrap();
        let back: CastModule = serde_json::from_str(&json).unwrap();
        assert_eq!(m, back);
    }
}
