//! The lowering pass context: module-wide state, the statement dispatcher,
//! and the environment-wiring helpers every visitor shares.
//!
//! Graphs are always built locally and handed to visitors as `&mut FnGraph`;
//! registration into the module's attribute table happens either after the
//! graph is complete or through a reserved slot when nested lowering must
//! register further graphs in between (see the control-flow visitors).

use indexmap::IndexMap;
use smallvec::smallvec;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, warn};

use fnet_cast::{CastData, CastModule, CastNode, SourceSpan};
use fnet_core::{
    AttributeIndex, BoxFunction, BoxKind, Endpoint, FnGraph, FnModule, Metadata, MetadataIndex,
    Port, PortId, PortRole, Wire, WirePair,
};

use crate::env::{BindingOrigin, Tier, VarBinding, VarEnv};
use crate::error::{LowerError, LowerWarning};

pub(crate) type Result<T> = std::result::Result<T, LowerError>;

/// The immediate structural context of the node being lowered. Selects the
/// conditional wiring regime and the tier new bindings land in. Loop bodies
/// and conditional branches lower their statements as `FunctionDef`: their
/// graphs are function-shaped and carry their own interface ports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Parent {
    Module,
    FunctionDef,
    Loop,
}

/// One source-level import statement's accumulated facts.
#[derive(Debug, Default)]
pub(crate) struct ImportEntry {
    pub alias: Option<String>,
    pub symbols: Vec<String>,
    pub star: bool,
}

pub struct Lowerer {
    pub(crate) module: FnModule,
    pub(crate) env: VarEnv,
    /// record name -> method name -> registered graph. The constructor is
    /// registered under the method name `new`.
    pub(crate) records: IndexMap<String, IndexMap<String, AttributeIndex>>,
    /// variable name -> record name, for resolving method calls on values
    /// built by a record constructor.
    pub(crate) initialized_records: IndexMap<String, String>,
    pub(crate) imports: IndexMap<String, ImportEntry>,
    /// function name -> formal parameter names, prescanned from the module
    /// body so keyword arguments can be matched before the callee is lowered.
    pub(crate) function_arguments: IndexMap<String, Vec<String>>,
    pub(crate) warnings: Vec<LowerWarning>,
}

impl Lowerer {
    pub fn new(module_name: impl Into<String>) -> Self {
        Lowerer {
            module: FnModule::new(module_name),
            env: VarEnv::new(),
            records: IndexMap::new(),
            initialized_records: IndexMap::new(),
            imports: IndexMap::new(),
            function_arguments: IndexMap::new(),
            warnings: Vec::new(),
        }
    }

    /// Runs the whole pass over one CAST module.
    pub fn run(mut self, cast: &CastModule) -> Result<(FnModule, Vec<LowerWarning>)> {
        let files = cast
            .source_file
            .clone()
            .into_iter()
            .collect::<Vec<String>>();
        let module_meta = self.module.insert_metadata(smallvec![
            Metadata::SourceCollection {
                name: cast.name.clone(),
                files,
            },
            Self::provenance(),
        ]);
        self.module.metadata = Some(module_meta);

        self.build_function_arguments_table(&cast.body);

        let mut root = FnGraph::new();
        let md = self.span_metadata(cast.span);
        root.add_frame(
            BoxFunction::new(BoxKind::Module)
                .with_name("module")
                .with_metadata(md),
        );

        for node in &cast.body {
            self.visit_statement(&mut root, node, Parent::Module)?;
        }

        self.module.root = root;
        self.module.check()?;
        Ok((self.module, self.warnings))
    }

    // -----------------------------------------------------------------------
    // Statement dispatch
    // -----------------------------------------------------------------------

    /// The visit boundary: lowers one statement, annotating any error with
    /// the statement's kind and span.
    pub(crate) fn visit_statement(
        &mut self,
        g: &mut FnGraph,
        node: &CastNode,
        parent: Parent,
    ) -> Result<()> {
        debug!(kind = node.kind(), span = %node.span, "lowering statement");
        self.visit_statement_inner(g, node, parent)
            .map_err(|e| LowerError::at(node.kind(), node.span, e))
    }

    fn visit_statement_inner(
        &mut self,
        g: &mut FnGraph,
        node: &CastNode,
        parent: Parent,
    ) -> Result<()> {
        match &node.data {
            CastData::Assignment { left, right } => {
                self.visit_assignment(g, left, right, node.span, parent)
            }
            CastData::Call { func, arguments } => {
                self.visit_call(g, func, arguments, false, node.span)?;
                Ok(())
            }
            CastData::FunctionDef { name, args, body } => {
                self.visit_function_def(name, args, body, node.span)
            }
            CastData::RecordDef {
                name,
                bases,
                funcs,
                fields,
            } => self.visit_record_def(name, bases, funcs, fields, node.span),
            CastData::Loop {
                init,
                expr,
                body,
                used_vars,
            } => self.visit_loop(g, init, expr, body, used_vars, node.span),
            CastData::If {
                expr,
                body,
                orelse,
                expr_used_vars,
                vars_accessed_before_mod,
                modified_vars,
            } => self.visit_if(
                g,
                expr,
                body,
                orelse,
                expr_used_vars,
                vars_accessed_before_mod,
                modified_vars,
                parent,
                node.span,
            ),
            CastData::Import {
                name,
                alias,
                symbol,
                star,
            } => {
                self.visit_import(g, name, alias.as_deref(), symbol.as_deref(), *star, parent);
                Ok(())
            }
            CastData::Return { value } => self.visit_return(g, value, node.span),
            // A bare expression statement produces its boxes and leaves the
            // value dangling; a bare name produces nothing.
            CastData::Literal { .. }
            | CastData::BinaryOp { .. }
            | CastData::UnaryOp { .. }
            | CastData::Attribute { .. }
            | CastData::Tuple { .. } => self.visit_expr(g, node),
            CastData::Name { .. } => Ok(()),
        }
    }

    // -----------------------------------------------------------------------
    // Environment wiring
    // -----------------------------------------------------------------------

    /// Wires a function-in port to the value of a named variable.
    ///
    /// In an Expression or Predicate graph the variable becomes (or reuses)
    /// a named outer-in interface port; in a Function or Module graph it is
    /// resolved through the variable environment.
    pub(crate) fn wire_name(&mut self, g: &mut FnGraph, fin: PortId, name: &str) {
        if self.is_interface_frame(g) {
            let oin = match g.find_outer_in(name) {
                Some(id) => id,
                None => {
                    let frame = g.frame_id();
                    g.add_outer_in(Port::named(name, frame))
                }
            };
            g.add_wire(WirePair::FuncInToOuterIn, Wire::new(fin, oin));
        } else {
            self.wire_from_env(g, fin, name);
        }
    }

    /// Emits the wire a resolved variable read requires. The tier and the
    /// binding's origin select the wire table: loop-bound locals read from
    /// the loop's loop-out, arguments from the enclosing outer-in, and
    /// everything else from the defining box's function-out.
    pub(crate) fn wire_from_env(&mut self, g: &mut FnGraph, fin: PortId, name: &str) {
        match self.env.resolve(name) {
            Some((Tier::Local, b)) => match b.origin {
                BindingOrigin::Loop => {
                    g.add_wire(WirePair::FuncInToLoopOut, Wire::new(fin, b.index));
                }
                _ => {
                    g.add_wire(WirePair::FuncInToFuncOut, Wire::new(fin, b.index));
                }
            },
            Some((Tier::Args, b)) => {
                g.add_wire(WirePair::FuncInToOuterIn, Wire::new(fin, b.index));
            }
            Some((Tier::Global, b)) => {
                g.add_wire(WirePair::FuncInToFuncOut, Wire::new(fin, b.index));
            }
            None => {
                self.warn(LowerWarning::UnresolvedVariable { name: name.into() });
                g.add_wire(
                    WirePair::FuncInToFuncOut,
                    Wire::new(fin, Endpoint::Unresolved),
                );
            }
        }
    }

    /// Binds a freshly assigned variable: module-scope statements bind into
    /// the global tier, everything else into the local tier.
    pub(crate) fn add_var_to_env(
        &mut self,
        name: &str,
        origin: BindingOrigin,
        port: Port,
        index: PortId,
        parent: Parent,
    ) {
        let tier = if parent == Parent::Module {
            Tier::Global
        } else {
            Tier::Local
        };
        self.env.bind(tier, name, VarBinding::new(origin, port, index));
    }

    // -----------------------------------------------------------------------
    // Shared plumbing
    // -----------------------------------------------------------------------

    /// Expression and Predicate graphs collect variable reads as interface
    /// ports; Function and Module graphs resolve them through the
    /// environment.
    pub(crate) fn is_interface_frame(&self, g: &FnGraph) -> bool {
        matches!(
            g.frame.first().map(|b| b.kind),
            Some(BoxKind::Expression | BoxKind::Predicate)
        )
    }

    pub(crate) fn warn(&mut self, warning: LowerWarning) {
        warn!("{warning}");
        self.warnings.push(warning);
    }

    /// Metadata index for a node's source span; synthetic spans carry none.
    pub(crate) fn span_metadata(&mut self, span: SourceSpan) -> Option<MetadataIndex> {
        if span.is_synthetic() {
            return None;
        }
        Some(self.module.insert_metadata(smallvec![Metadata::SourceSpan {
            row_start: span.row_start,
            row_end: span.row_end,
            col_start: span.col_start,
            col_end: span.col_end,
        }]))
    }

    fn provenance() -> Metadata {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs().to_string())
            .unwrap_or_default();
        Metadata::Provenance {
            method: "fnet-cast-lowering".into(),
            timestamp,
        }
    }

    /// Value produced by the most recent box, or unresolved (plus warning)
    /// if nothing has produced one yet.
    pub(crate) fn last_value(&mut self, g: &FnGraph, table: &'static str) -> Endpoint {
        let ep = g.last_port(PortRole::FuncOut);
        if ep.is_unresolved() {
            self.warn(LowerWarning::UnresolvedWire { table });
        }
        ep
    }

    /// Prescans top-level declarations so keyword arguments can be matched
    /// against formal parameter names before the callee is lowered.
    fn build_function_arguments_table(&mut self, nodes: &[CastNode]) {
        for node in nodes {
            match &node.data {
                CastData::FunctionDef { name, args, .. } => {
                    self.function_arguments
                        .insert(name.clone(), args.iter().map(|a| a.name.clone()).collect());
                }
                CastData::RecordDef { funcs, .. } => {
                    self.build_function_arguments_table(funcs);
                }
                _ => {}
            }
        }
    }
}
