//! Expression lowering: literals, operators, calls, tuples, and assignment
//! right-hand sides.
//!
//! The central rule lives in [`Lowerer::wire_name`] (see pass.rs): inside an
//! Expression or Predicate graph a variable operand becomes a named outer-in
//! port, shared by every later use of the same name, while a computed
//! operand is wired function-in to its producing function-out directly.

use smallvec::SmallVec;
use tracing::debug;

use fnet_cast::{BinOp, CastData, CastNode, SourceSpan, UnOp};
use fnet_core::{
    BoxFunction, BoxId, BoxKind, Endpoint, FnGraph, LiteralValue, Metadata, Port, PortRole, Wire,
    WirePair,
};

use crate::env::BindingOrigin;
use crate::error::{LowerError, LowerWarning};
use crate::pass::{Lowerer, Parent, Result};
use crate::primitives;

/// Where an operand's value comes from: a named variable (wired through the
/// interface or environment) or a value some box already produced.
enum Operand {
    Var(String),
    Value(Endpoint),
}

impl Lowerer {
    /// Lowers an expression into `g`, leaving its value as the most recent
    /// function-out port.
    pub(crate) fn visit_expr(&mut self, g: &mut FnGraph, node: &CastNode) -> Result<()> {
        match &node.data {
            CastData::Literal {
                value_type,
                value,
                source_type,
            } => {
                self.visit_literal(g, value_type, value, source_type.as_deref(), node.span);
                Ok(())
            }
            CastData::BinaryOp { op, left, right } => {
                self.visit_binary_op(g, *op, left, right, node.span)
            }
            CastData::UnaryOp { op, value } => self.visit_unary_op(g, *op, value, node.span),
            CastData::Call { func, arguments } => {
                self.visit_call(g, func, arguments, false, node.span)?;
                Ok(())
            }
            CastData::Tuple { values } => {
                for v in values {
                    self.visit_expr(g, v)?;
                }
                Ok(())
            }
            CastData::Attribute { value, attr } => {
                self.visit_attribute(g, value, attr, node.span)
            }
            // A bare name produces no boxes; its consumers wire it.
            CastData::Name { .. } => Ok(()),
            _ => Err(LowerError::UnsupportedNode {
                kind: node.kind(),
                context: "in expression position",
            }),
        }
    }

    /// One Literal box with one function-out, no inputs.
    pub(crate) fn visit_literal(
        &mut self,
        g: &mut FnGraph,
        value_type: &str,
        value: &serde_json::Value,
        source_type: Option<&str>,
        span: SourceSpan,
    ) {
        let mut bundle: SmallVec<[Metadata; 2]> = SmallVec::new();
        if !span.is_synthetic() {
            bundle.push(Metadata::SourceSpan {
                row_start: span.row_start,
                row_end: span.row_end,
                col_start: span.col_start,
                col_end: span.col_end,
            });
        }
        if let Some(dt) = source_type {
            bundle.push(Metadata::SourceDataType {
                data_type: dt.to_owned(),
            });
        }
        let md = if bundle.is_empty() {
            None
        } else {
            Some(self.module.insert_metadata(bundle))
        };
        let b = g.add_box(
            BoxFunction::literal(LiteralValue::new(value_type, value.clone())).with_metadata(md),
        );
        g.add_func_out(Port::anonymous(b));
    }

    // -----------------------------------------------------------------------
    // Operators
    // -----------------------------------------------------------------------

    fn visit_binary_op(
        &mut self,
        g: &mut FnGraph,
        op: BinOp,
        left: &CastNode,
        right: &CastNode,
        span: SourceSpan,
    ) -> Result<()> {
        // Operands are lowered before the operator box so their boxes come
        // first in the table.
        let l = self.lower_operand(g, left)?;
        let r = self.lower_operand(g, right)?;
        let md = self.span_metadata(span);
        let b = g.add_box(BoxFunction::primitive(primitives::binop_name(op)).with_metadata(md));
        self.attach_operand(g, b, l);
        self.attach_operand(g, b, r);
        g.add_func_out(Port::anonymous(b));
        Ok(())
    }

    fn visit_unary_op(
        &mut self,
        g: &mut FnGraph,
        op: UnOp,
        value: &CastNode,
        span: SourceSpan,
    ) -> Result<()> {
        let operand = self.lower_operand(g, value)?;
        let md = self.span_metadata(span);
        let b = g.add_box(BoxFunction::primitive(primitives::unop_name(op)).with_metadata(md));
        self.attach_operand(g, b, operand);
        g.add_func_out(Port::anonymous(b));
        Ok(())
    }

    /// Attribute read. `self.field` (or any named receiver) lowers to a
    /// field-name literal feeding a `get` primitive; attribute access on an
    /// imported module lowers to an Import box.
    fn visit_attribute(
        &mut self,
        g: &mut FnGraph,
        value: &CastNode,
        attr: &str,
        span: SourceSpan,
    ) -> Result<()> {
        match &value.data {
            CastData::Name { name, .. } if self.imports.contains_key(name) => {
                let b = g.add_box(BoxFunction::new(BoxKind::Import).with_name(format!("{name}.{attr}")));
                g.add_func_out(Port::anonymous(b));
                Ok(())
            }
            CastData::Name { name, .. } => {
                let lit = g.add_box(BoxFunction::literal(LiteralValue::string(attr)));
                let field = g.add_func_out(Port::anonymous(lit));
                let md = self.span_metadata(span);
                let b = g.add_box(BoxFunction::primitive("get").with_metadata(md));
                let recv = g.add_func_in(Port::anonymous(b));
                self.wire_name(g, recv, name);
                let fin = g.add_func_in(Port::anonymous(b));
                g.add_wire(WirePair::FuncInToFuncOut, Wire::new(fin, field));
                g.add_func_out(Port::anonymous(b));
                Ok(())
            }
            _ => Err(LowerError::UnsupportedNode {
                kind: value.kind(),
                context: "as an attribute receiver",
            }),
        }
    }

    fn lower_operand(&mut self, g: &mut FnGraph, node: &CastNode) -> Result<Operand> {
        match &node.data {
            CastData::Name { name, .. } => Ok(Operand::Var(name.clone())),
            _ => {
                self.visit_expr(g, node)?;
                Ok(Operand::Value(self.last_value(g, "function-in to function-out")))
            }
        }
    }

    /// Appends one function-in on `box_id` and wires it to the operand.
    fn attach_operand(&mut self, g: &mut FnGraph, box_id: BoxId, operand: Operand) {
        let fin = g.add_func_in(Port::anonymous(box_id));
        match operand {
            Operand::Var(name) => self.wire_name(g, fin, &name),
            Operand::Value(ep) => g.add_wire(WirePair::FuncInToFuncOut, Wire::new(fin, ep)),
        }
    }

    // -----------------------------------------------------------------------
    // Calls
    // -----------------------------------------------------------------------

    /// Lowers a call, returning the call box's address. Exactly one
    /// anonymous function-out is produced; assignment renames it.
    ///
    /// `from_assignment` selects the wrapped form for primitives: a
    /// primitive feeding an assignment gets its own Expression graph so the
    /// assigned value has an addressable defining graph, except for the
    /// always-inlined iteration primitives.
    pub(crate) fn visit_call(
        &mut self,
        g: &mut FnGraph,
        func: &CastNode,
        arguments: &[CastNode],
        from_assignment: bool,
        span: SourceSpan,
    ) -> Result<BoxId> {
        match &func.data {
            CastData::Name { name, .. } => {
                if primitives::is_primitive(name) {
                    if !from_assignment || primitives::is_inline(name) {
                        self.lower_inline_primitive(g, name, arguments, span)
                    } else {
                        self.lower_wrapped_primitive(g, name, arguments, span)
                    }
                } else if let Some(idx) = self.records.get(name).and_then(|t| t.get("new")).copied()
                {
                    self.lower_user_call(g, name, idx, arguments, span)
                } else if let Some(qualified) = self.imported_symbol(name) {
                    self.lower_import_call(g, &qualified, arguments, span)
                } else {
                    let idx = self.lookup_or_stub(name);
                    self.lower_user_call(g, name, idx, arguments, span)
                }
            }
            CastData::Attribute { value, attr } => {
                self.lower_attribute_call(g, value, attr, arguments, span)
            }
            _ => Err(LowerError::UnsupportedNode {
                kind: func.kind(),
                context: "as a call target",
            }),
        }
    }

    /// The registered graph for `name`, synthesizing a forward-reference
    /// stub (frame named, body empty) if the definition has not been
    /// lowered yet. A later definition fills the stub's slot.
    pub(crate) fn lookup_or_stub(&mut self, name: &str) -> fnet_core::AttributeIndex {
        if let Some(idx) = self.module.find_fn_by_name(name) {
            idx
        } else {
            debug!(name, "forward reference, registering stub graph");
            self.module
                .register(FnGraph::with_frame(BoxFunction::function(name)))
        }
    }

    fn imported_symbol(&self, name: &str) -> Option<String> {
        self.imports.iter().find_map(|(module, entry)| {
            entry
                .symbols
                .iter()
                .any(|s| s == name)
                .then(|| format!("{module}.{name}"))
        })
    }

    /// A primitive inlined in place: one Primitive box, no nested graph.
    fn lower_inline_primitive(
        &mut self,
        g: &mut FnGraph,
        name: &str,
        arguments: &[CastNode],
        span: SourceSpan,
    ) -> Result<BoxId> {
        let args = self.lower_arguments(g, arguments, None)?;
        let md = self.span_metadata(span);
        let b = g.add_box(BoxFunction::primitive(name).with_metadata(md));
        self.attach_arguments(g, b, args);
        g.add_func_out(Port::anonymous(b));
        Ok(b)
    }

    /// A primitive feeding an assignment: the primitive is inlined inside a
    /// fresh Expression graph whose interface carries the variable operands,
    /// and the parent calls that graph.
    fn lower_wrapped_primitive(
        &mut self,
        g: &mut FnGraph,
        name: &str,
        arguments: &[CastNode],
        span: SourceSpan,
    ) -> Result<BoxId> {
        let mut e = FnGraph::with_frame(BoxFunction::new(BoxKind::Expression));
        self.lower_inline_primitive(&mut e, name, arguments, span)?;
        let frame = e.frame_id();
        let opo = e.add_outer_out(Port::anonymous(frame));
        let val = self.last_value(&e, "outer-out to function-out");
        e.add_wire(WirePair::OuterOutToFuncOut, Wire::new(opo, val));

        let interface: Vec<Option<String>> = e.outer_in.iter().map(|p| p.name.clone()).collect();
        let idx = self.module.register(e);

        let md = self.span_metadata(span);
        let b = g.add_box(
            BoxFunction::call(BoxKind::Expression, idx)
                .with_name(name)
                .with_metadata(md),
        );
        self.wire_interface_inputs(g, b, &interface);
        g.add_func_out(Port::anonymous(b));
        Ok(b)
    }

    fn lower_user_call(
        &mut self,
        g: &mut FnGraph,
        name: &str,
        idx: fnet_core::AttributeIndex,
        arguments: &[CastNode],
        span: SourceSpan,
    ) -> Result<BoxId> {
        let args = self.lower_arguments(g, arguments, Some(name))?;
        let md = self.span_metadata(span);
        let b = g.add_box(
            BoxFunction::call(BoxKind::Function, idx)
                .with_name(name)
                .with_metadata(md),
        );
        self.attach_arguments(g, b, args);
        g.add_func_out(Port::anonymous(b));
        Ok(b)
    }

    fn lower_import_call(
        &mut self,
        g: &mut FnGraph,
        qualified: &str,
        arguments: &[CastNode],
        span: SourceSpan,
    ) -> Result<BoxId> {
        let args = self.lower_arguments(g, arguments, None)?;
        let md = self.span_metadata(span);
        let b = g.add_box(BoxFunction::new(BoxKind::Import).with_name(qualified).with_metadata(md));
        self.attach_arguments(g, b, args);
        g.add_func_out(Port::anonymous(b));
        Ok(b)
    }

    /// A method or module-attribute call. The receiver's record (tracked at
    /// construction time) selects the method graph; imported modules lower
    /// to Import boxes; anything else degrades to an Import box with a
    /// warning.
    fn lower_attribute_call(
        &mut self,
        g: &mut FnGraph,
        value: &CastNode,
        attr: &str,
        arguments: &[CastNode],
        span: SourceSpan,
    ) -> Result<BoxId> {
        let receiver = match &value.data {
            CastData::Name { name, .. } => name.clone(),
            _ => {
                return Err(LowerError::UnsupportedNode {
                    kind: value.kind(),
                    context: "as a method-call receiver",
                })
            }
        };

        if self.imports.contains_key(&receiver) {
            return self.lower_import_call(g, &format!("{receiver}.{attr}"), arguments, span);
        }

        if let Some(record) = self.initialized_records.get(&receiver).cloned() {
            if let Some(idx) = self.records.get(&record).and_then(|t| t.get(attr)).copied() {
                // The receiver is the method's first argument.
                let recv = Operand::Var(receiver);
                let mut args = vec![(None, recv)];
                args.extend(self.lower_arguments(g, arguments, None)?);
                let md = self.span_metadata(span);
                let b = g.add_box(
                    BoxFunction::call(BoxKind::Function, idx)
                        .with_name(format!("{record}:{attr}"))
                        .with_metadata(md),
                );
                self.attach_arguments(g, b, args);
                g.add_func_out(Port::anonymous(b));
                return Ok(b);
            }
        }

        self.warn(LowerWarning::UnresolvedAttributeCall {
            receiver: receiver.clone(),
            attr: attr.to_owned(),
        });
        self.lower_import_call(g, &format!("{receiver}.{attr}"), arguments, span)
    }

    /// Lowers call arguments in order. A keyword argument (an Assignment
    /// node) carries its parameter name onto the function-in port; positional
    /// arguments follow the operand rule.
    fn lower_arguments(
        &mut self,
        g: &mut FnGraph,
        arguments: &[CastNode],
        callee: Option<&str>,
    ) -> Result<Vec<(Option<String>, Operand)>> {
        let mut out = Vec::with_capacity(arguments.len());
        for arg in arguments {
            match &arg.data {
                CastData::Assignment { left, right } => {
                    let keyword = match &left.data {
                        CastData::Name { name, .. } => name.clone(),
                        _ => {
                            return Err(LowerError::UnsupportedNode {
                                kind: left.kind(),
                                context: "as a keyword-argument name",
                            })
                        }
                    };
                    if let Some(callee) = callee {
                        if let Some(params) = self.function_arguments.get(callee) {
                            if !params.contains(&keyword) {
                                self.warn(LowerWarning::UnknownKeywordArgument {
                                    func: callee.to_owned(),
                                    keyword: keyword.clone(),
                                });
                            }
                        }
                    }
                    let op = self.lower_operand(g, right)?;
                    out.push((Some(keyword), op));
                }
                _ => out.push((None, self.lower_operand(g, arg)?)),
            }
        }
        Ok(out)
    }

    fn attach_arguments(
        &mut self,
        g: &mut FnGraph,
        box_id: BoxId,
        args: Vec<(Option<String>, Operand)>,
    ) {
        for (keyword, op) in args {
            let fin = match keyword {
                Some(n) => g.add_func_in(Port::named(n, box_id)),
                None => g.add_func_in(Port::anonymous(box_id)),
            };
            match op {
                Operand::Var(name) => self.wire_name(g, fin, &name),
                Operand::Value(ep) => g.add_wire(WirePair::FuncInToFuncOut, Wire::new(fin, ep)),
            }
        }
    }

    /// Parent-side inputs for a registered Expression graph: one anonymous
    /// function-in per interface port, wired by the interface port's name.
    pub(crate) fn wire_interface_inputs(
        &mut self,
        g: &mut FnGraph,
        box_id: BoxId,
        interface: &[Option<String>],
    ) {
        for name in interface {
            let fin = g.add_func_in(Port::anonymous(box_id));
            match name {
                Some(n) => self.wire_name(g, fin, n),
                None => {
                    self.warn(LowerWarning::UnresolvedWire {
                        table: "function-in to function-out",
                    });
                    g.add_wire(
                        WirePair::FuncInToFuncOut,
                        Wire::new(fin, Endpoint::Unresolved),
                    );
                }
            }
        }
    }

    // -----------------------------------------------------------------------
    // Assignment
    // -----------------------------------------------------------------------

    pub(crate) fn visit_assignment(
        &mut self,
        g: &mut FnGraph,
        left: &CastNode,
        right: &CastNode,
        span: SourceSpan,
        parent: Parent,
    ) -> Result<()> {
        // `self.field = value` updates the record value in place.
        if let CastData::Attribute { value, attr } = &left.data {
            if matches!(&value.data, CastData::Name { name, .. } if name == "self") {
                return self.lower_self_field_set(g, attr, right, span, parent);
            }
        }

        match &right.data {
            CastData::Call { func, arguments } => {
                let _ = self.visit_call(g, func, arguments, true, right.span)?;
                if let (
                    CastData::Name { name: target, .. },
                    CastData::Name { name: callee, .. },
                ) = (&left.data, &func.data)
                {
                    if self.records.contains_key(callee) {
                        self.initialized_records.insert(target.clone(), callee.clone());
                    }
                }
                match &left.data {
                    CastData::Tuple { values } => self.create_unpack(g, values, span, parent),
                    _ => self.name_last_output(g, left, parent),
                }
            }

            // x = y: a passthrough Expression graph, one input straight to
            // one output.
            CastData::Name { name, .. } => {
                let mut e = FnGraph::new();
                let fb = e.add_frame(BoxFunction::new(BoxKind::Expression));
                let opi = e.add_outer_in(Port::anonymous(fb));
                let opo = e.add_outer_out(Port::anonymous(fb));
                e.add_wire(WirePair::OuterOutToOuterIn, Wire::new(opo, opi));
                let idx = self.module.register(e);

                let md = self.span_metadata(span);
                let b = g.add_box(BoxFunction::call(BoxKind::Expression, idx).with_metadata(md));
                let fin = g.add_func_in(Port::anonymous(b));
                self.wire_name(g, fin, name);
                self.add_output_binding(g, b, left, parent)
            }

            // Every other right-hand side gets a wrapper Expression graph so
            // the assigned value has a uniquely addressable defining graph.
            _ => {
                let mut e = FnGraph::with_frame(BoxFunction::new(BoxKind::Expression));
                match &right.data {
                    CastData::Tuple { values } => {
                        self.pack_values(&mut e, values, right.span)?;
                    }
                    _ => self.visit_expr(&mut e, right)?,
                }
                let frame = e.frame_id();
                let opo = e.add_outer_out(Port::anonymous(frame));
                let val = self.last_value(&e, "outer-out to function-out");
                e.add_wire(WirePair::OuterOutToFuncOut, Wire::new(opo, val));

                let interface: Vec<Option<String>> =
                    e.outer_in.iter().map(|p| p.name.clone()).collect();
                let idx = self.module.register(e);

                let md = self.span_metadata(span);
                let b = g.add_box(BoxFunction::call(BoxKind::Expression, idx).with_metadata(md));
                self.wire_interface_inputs(g, b, &interface);

                match &left.data {
                    CastData::Tuple { values } => {
                        g.add_func_out(Port::anonymous(b));
                        self.create_unpack(g, values, span, parent)
                    }
                    _ => self.add_output_binding(g, b, left, parent),
                }
            }
        }
    }

    /// Appends a named function-out on `box_id` for the assignment target
    /// and binds the target in the environment.
    fn add_output_binding(
        &mut self,
        g: &mut FnGraph,
        box_id: BoxId,
        left: &CastNode,
        parent: Parent,
    ) -> Result<()> {
        let name = target_name(left)?;
        let md = self.span_metadata(left.span);
        let pof = g.add_func_out(Port::named(name.clone(), box_id).with_metadata(md));
        let port = g.ports(PortRole::FuncOut)[pof.slot()].clone();
        self.add_var_to_env(&name, BindingOrigin::Other, port, pof, parent);
        Ok(())
    }

    /// Names the callee's existing anonymous function-out after the
    /// assignment target and binds it.
    fn name_last_output(&mut self, g: &mut FnGraph, left: &CastNode, parent: Parent) -> Result<()> {
        let name = target_name(left)?;
        let id = match g.last_port(PortRole::FuncOut) {
            Endpoint::Port(id) => id,
            Endpoint::Unresolved => {
                self.warn(LowerWarning::UnresolvedVariable { name });
                return Ok(());
            }
        };
        if let Some(p) = g.port_mut(PortRole::FuncOut, id) {
            p.name = Some(name.clone());
        }
        let port = g.ports(PortRole::FuncOut)[id.slot()].clone();
        self.add_var_to_env(&name, BindingOrigin::Other, port, id, parent);
        Ok(())
    }

    /// Tuple assignment target: one unpack Primitive consuming the most
    /// recent value, one named function-out per element, each bound
    /// separately.
    pub(crate) fn create_unpack(
        &mut self,
        g: &mut FnGraph,
        values: &[CastNode],
        span: SourceSpan,
        parent: Parent,
    ) -> Result<()> {
        let src = self.last_value(g, "unpack input");
        let md = self.span_metadata(span);
        let b = g.add_box(BoxFunction::primitive("unpack").with_metadata(md));
        let fin = g.add_func_in(Port::anonymous(b));
        g.add_wire(WirePair::FuncInToFuncOut, Wire::new(fin, src));
        for v in values {
            let name = target_name(v)?;
            let pof = g.add_func_out(Port::named(name.clone(), b));
            let port = g.ports(PortRole::FuncOut)[pof.slot()].clone();
            self.add_var_to_env(&name, BindingOrigin::Other, port, pof, parent);
        }
        Ok(())
    }

    /// The symmetric pack Primitive: merges several values into one
    /// function-out. Used for tuple returns and tuple right-hand sides.
    pub(crate) fn pack_values(
        &mut self,
        g: &mut FnGraph,
        values: &[CastNode],
        span: SourceSpan,
    ) -> Result<BoxId> {
        let mut args = Vec::with_capacity(values.len());
        for v in values {
            args.push((None, self.lower_operand(g, v)?));
        }
        let md = self.span_metadata(span);
        let b = g.add_box(BoxFunction::primitive("pack").with_metadata(md));
        self.attach_arguments(g, b, args);
        g.add_func_out(Port::anonymous(b));
        Ok(b)
    }

    /// `self.field = value`: a field-name literal, a `new_Field` primitive,
    /// and a `set` primitive producing the updated record, which rebinds
    /// `self` so later field writes chain off it.
    fn lower_self_field_set(
        &mut self,
        g: &mut FnGraph,
        attr: &str,
        value: &CastNode,
        span: SourceSpan,
        parent: Parent,
    ) -> Result<()> {
        let lit = g.add_box(BoxFunction::literal(LiteralValue::string(attr)));
        let field_name = g.add_func_out(Port::anonymous(lit));

        let nf = g.add_box(BoxFunction::primitive("new_Field"));
        let recv = g.add_func_in(Port::anonymous(nf));
        self.wire_name(g, recv, "self");
        let fin = g.add_func_in(Port::anonymous(nf));
        g.add_wire(WirePair::FuncInToFuncOut, Wire::new(fin, field_name));
        let field = g.add_func_out(Port::anonymous(nf));

        let operand = self.lower_operand(g, value)?;
        let md = self.span_metadata(span);
        let set = g.add_box(BoxFunction::primitive("set").with_metadata(md));
        let recv = g.add_func_in(Port::anonymous(set));
        self.wire_name(g, recv, "self");
        let fin = g.add_func_in(Port::anonymous(set));
        g.add_wire(WirePair::FuncInToFuncOut, Wire::new(fin, field));
        self.attach_operand(g, set, operand);

        let pof = g.add_func_out(Port::named("self", set));
        let port = g.ports(PortRole::FuncOut)[pof.slot()].clone();
        self.add_var_to_env("self", BindingOrigin::Other, port, pof, parent);
        Ok(())
    }
}

fn target_name(node: &CastNode) -> Result<String> {
    match &node.data {
        CastData::Name { name, .. } => Ok(name.clone()),
        CastData::Attribute { attr, .. } => Ok(attr.clone()),
        _ => Err(LowerError::UnsupportedNode {
            kind: node.kind(),
            context: "as an assignment target",
        }),
    }
}
