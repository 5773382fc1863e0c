//! Declaration lowering: function definitions, returns, record definitions,
//! and imports.

use indexmap::IndexMap;

use fnet_cast::{CastData, CastNode, Param, SourceSpan};
use fnet_core::{
    AttributeIndex, BoxFunction, BoxId, BoxKind, Endpoint, FnGraph, ImportKind, ImportReference,
    LiteralValue, Port, PortRole, Wire, WirePair,
};

use crate::env::{BindingOrigin, Tier, VarBinding};
use crate::error::LowerWarning;
use crate::pass::{Lowerer, Parent, Result};

impl Lowerer {
    // -----------------------------------------------------------------------
    // Function definitions
    // -----------------------------------------------------------------------

    /// Lowers a function definition into its own registered graph. If a
    /// forward reference already stubbed the name, the definition fills that
    /// slot instead of registering a second one.
    pub(crate) fn visit_function_def(
        &mut self,
        name: &str,
        args: &[Param],
        body: &[CastNode],
        span: SourceSpan,
    ) -> Result<()> {
        let idx = self.lookup_or_stub(name);
        let md = self.span_metadata(span);
        let mut g = FnGraph::with_frame(BoxFunction::function(name).with_metadata(md));
        let frame = g.frame_id();

        let scope = self.env.enter_scope();
        for param in args {
            self.bind_param(&mut g, frame, param);
        }
        let result = self.handle_body(&mut g, body, Parent::FunctionDef);
        self.module.replace_fn(idx, g);
        self.env.restore(scope);
        result
    }

    /// One named outer-in per formal parameter, carrying the literal default
    /// if the source declared one, bound into the argument tier.
    fn bind_param(&mut self, g: &mut FnGraph, frame: BoxId, param: &Param) {
        let mut port = Port::named(param.name.clone(), frame);
        if let Some(default) = &param.default_value {
            if let CastData::Literal {
                value_type, value, ..
            } = &default.data
            {
                port = port.with_default(LiteralValue::new(value_type, value.clone()));
            }
        }
        let opi = g.add_outer_in(port);
        let bound = g.outer_in[opi.slot()].clone();
        self.env.bind(
            Tier::Args,
            param.name.clone(),
            VarBinding::new(BindingOrigin::Argument, bound, opi),
        );
    }

    /// Lowers a function-shaped body into `g` and wires its outer-outs.
    ///
    /// A trailing return statement drives the wiring directly. Otherwise any
    /// named outer-outs the body introduced (through control flow) are wired
    /// to whatever value is live under that name at the end.
    pub(crate) fn handle_body(
        &mut self,
        g: &mut FnGraph,
        body: &[CastNode],
        parent: Parent,
    ) -> Result<()> {
        self.env.clear_local();
        for node in body {
            self.visit_statement(g, node, parent)?;
        }
        if let Some(CastData::Return { value }) = body.last().map(|n| &n.data) {
            self.wire_return_node(g, value)?;
        } else {
            let opos: Vec<(u32, Option<String>)> = g
                .outer_out
                .iter()
                .enumerate()
                .map(|(i, p)| (i as u32 + 1, p.name.clone()))
                .collect();
            for (i, name) in opos {
                let Some(name) = name else { continue };
                let resolved = self
                    .env
                    .resolve(&name)
                    .map(|(tier, b)| (tier, b.origin, b.index));
                let src = Endpoint::port(i);
                match resolved {
                    Some((Tier::Local, BindingOrigin::Loop, idx)) => {
                        g.add_wire(WirePair::OuterOutToLoopOut, Wire::new(src, idx));
                    }
                    Some((Tier::Local, _, idx)) => {
                        g.add_wire(WirePair::OuterOutToFuncOut, Wire::new(src, idx));
                    }
                    Some((Tier::Args, _, idx)) => {
                        g.add_wire(WirePair::OuterOutToOuterIn, Wire::new(src, idx));
                    }
                    _ => {}
                }
            }
        }
        self.env.clear_local();
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Returns
    // -----------------------------------------------------------------------

    /// A return statement adds the outer-out its value will flow through;
    /// the wire itself is emitted by [`Lowerer::handle_body`] once the whole
    /// body has been lowered.
    pub(crate) fn visit_return(
        &mut self,
        g: &mut FnGraph,
        value: &CastNode,
        span: SourceSpan,
    ) -> Result<()> {
        match &value.data {
            // Names and tuples are wired later; computed values are lowered
            // now so their boxes sit before the outer-out.
            CastData::Name { .. } | CastData::Tuple { .. } => {}
            _ => self.visit_expr(g, value)?,
        }
        let frame = g.frame_id();
        let md = self.span_metadata(span);
        g.add_outer_out(Port::anonymous(frame).with_metadata(md));
        Ok(())
    }

    fn wire_return_node(&mut self, g: &mut FnGraph, value: &CastNode) -> Result<()> {
        match &value.data {
            CastData::Name { name, .. } => {
                self.wire_return_name(g, name, Endpoint::port(1));
                Ok(())
            }
            CastData::Tuple { values } => self.pack_return_tuple(g, values, value.span),
            _ => {
                let val = self.last_value(g, "outer-out to function-out");
                let opo = g.last_port(PortRole::OuterOut);
                if opo.is_unresolved() {
                    self.warn(LowerWarning::UnresolvedWire {
                        table: "outer-out to function-out",
                    });
                }
                g.add_wire(WirePair::OuterOutToFuncOut, Wire::new(opo, val));
                Ok(())
            }
        }
    }

    /// Returning a variable: the tier and origin of its binding select the
    /// wire table, exactly as for a variable read.
    fn wire_return_name(&mut self, g: &mut FnGraph, name: &str, opo: Endpoint) {
        let resolved = self
            .env
            .resolve(name)
            .map(|(tier, b)| (tier, b.origin, b.index));
        match resolved {
            Some((Tier::Local, BindingOrigin::Loop, idx)) => {
                g.add_wire(WirePair::OuterOutToLoopOut, Wire::new(opo, idx));
            }
            Some((Tier::Local, _, idx)) | Some((Tier::Global, _, idx)) => {
                g.add_wire(WirePair::OuterOutToFuncOut, Wire::new(opo, idx));
            }
            Some((Tier::Args, _, idx)) => {
                g.add_wire(WirePair::OuterOutToOuterIn, Wire::new(opo, idx));
            }
            None => {
                self.warn(LowerWarning::UnresolvedVariable { name: name.into() });
            }
        }
    }

    /// A tuple return merges its elements through one pack Primitive whose
    /// output feeds the return outer-out.
    fn pack_return_tuple(
        &mut self,
        g: &mut FnGraph,
        values: &[CastNode],
        span: SourceSpan,
    ) -> Result<()> {
        self.pack_values(g, values, span)?;
        let val = self.last_value(g, "outer-out to function-out");
        let opo = g.last_port(PortRole::OuterOut);
        if opo.is_unresolved() {
            self.warn(LowerWarning::UnresolvedWire {
                table: "outer-out to function-out",
            });
        }
        g.add_wire(WirePair::OuterOutToFuncOut, Wire::new(opo, val));
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Record definitions
    // -----------------------------------------------------------------------

    /// Lowers a record definition to a constructor graph named `new:<record>`
    /// plus one graph per method named `<record>:<method>`, all registered in
    /// the records table so constructor and method calls resolve by name.
    pub(crate) fn visit_record_def(
        &mut self,
        name: &str,
        bases: &[String],
        funcs: &[CastNode],
        fields: &[Param],
        span: SourceSpan,
    ) -> Result<()> {
        // Registered eagerly so methods can construct their own record.
        self.records.insert(name.to_owned(), IndexMap::new());

        let ctor_idx = self.module.reserve();
        self.record_methods_mut(name).insert("new".into(), ctor_idx);
        self.lower_record_constructor(name, bases, funcs, fields, span, ctor_idx)?;

        for f in funcs {
            if let CastData::FunctionDef {
                name: method,
                args,
                body,
            } = &f.data
            {
                if method == "__init__" {
                    continue;
                }
                let idx = self.module.reserve();
                self.record_methods_mut(name).insert(method.clone(), idx);

                let md = self.span_metadata(f.span);
                let mut m = FnGraph::with_frame(
                    BoxFunction::function(format!("{name}:{method}")).with_metadata(md),
                );
                let frame = m.frame_id();
                let scope = self.env.enter_scope();
                for param in args {
                    self.bind_param(&mut m, frame, param);
                }
                let result = self.handle_body(&mut m, body, Parent::FunctionDef);
                self.module.replace_fn(idx, m);
                self.env.restore(scope);
                result?;
            }
        }
        Ok(())
    }

    /// The constructor graph: its interface is the `__init__` parameters
    /// minus `self` plus a trailing `obj` for the inherited value, its body
    /// seeds a record value with `new_Record` and threads it through the
    /// field writes, and its single outer-out is the finished record.
    fn lower_record_constructor(
        &mut self,
        name: &str,
        bases: &[String],
        funcs: &[CastNode],
        fields: &[Param],
        span: SourceSpan,
        ctor_idx: AttributeIndex,
    ) -> Result<()> {
        let init = funcs.iter().find_map(|f| match &f.data {
            CastData::FunctionDef {
                name: fname,
                args,
                body,
            } if fname == "__init__" => Some((args, body)),
            _ => None,
        });

        let md = self.span_metadata(span);
        let mut c =
            FnGraph::with_frame(BoxFunction::function(format!("new:{name}")).with_metadata(md));
        let frame = c.frame_id();
        let scope = self.env.enter_scope();

        let params: Vec<Param> = match init {
            Some((args, _)) => args.iter().filter(|p| p.name != "self").cloned().collect(),
            None => fields.to_vec(),
        };
        for param in &params {
            self.bind_param(&mut c, frame, param);
        }
        self.bind_param(&mut c, frame, &Param::new("obj"));

        // Seed the record value: name literal, base literal (or none), and
        // the inherited obj feed new_Record.
        let lit_name = c.add_box(BoxFunction::literal(LiteralValue::string(name)));
        let name_out = c.add_func_out(Port::anonymous(lit_name));
        let base_value = match bases.first() {
            Some(base) => LiteralValue::string(base.clone()),
            None => LiteralValue::none(),
        };
        let lit_base = c.add_box(BoxFunction::literal(base_value));
        let base_out = c.add_func_out(Port::anonymous(lit_base));

        let nr = c.add_box(BoxFunction::primitive("new_Record"));
        let fin = c.add_func_in(Port::anonymous(nr));
        c.add_wire(WirePair::FuncInToFuncOut, Wire::new(fin, name_out));
        let fin = c.add_func_in(Port::anonymous(nr));
        c.add_wire(WirePair::FuncInToFuncOut, Wire::new(fin, base_out));
        let fin = c.add_func_in(Port::anonymous(nr));
        self.wire_name(&mut c, fin, "obj");
        let record_out = c.add_func_out(Port::named("self", nr));
        let bound = c.func_out[record_out.slot()].clone();
        self.env.bind(
            Tier::Local,
            "self",
            VarBinding::new(BindingOrigin::Other, bound, record_out),
        );

        // Field writes chain off the record value through `self`, each
        // rebinding it. The local tier is deliberately not cleared first.
        let result = (|| -> Result<()> {
            match init {
                Some((_, body)) => {
                    for stmt in body.iter() {
                        self.visit_statement(&mut c, stmt, Parent::FunctionDef)?;
                    }
                }
                None => {
                    for field in fields {
                        let stmt = field_init_statement(field);
                        self.visit_statement(&mut c, &stmt, Parent::FunctionDef)?;
                    }
                }
            }
            Ok(())
        })();

        let opo = c.add_outer_out(Port::anonymous(frame));
        let val = self.last_value(&c, "outer-out to function-out");
        c.add_wire(WirePair::OuterOutToFuncOut, Wire::new(opo, val));
        self.module.replace_fn(ctor_idx, c);
        self.env.restore(scope);
        result
    }

    fn record_methods_mut(&mut self, name: &str) -> &mut IndexMap<String, AttributeIndex> {
        self.records
            .entry(name.to_owned())
            .or_default()
    }

    // -----------------------------------------------------------------------
    // Imports
    // -----------------------------------------------------------------------

    /// Records an import in both the source-level table (driving call
    /// resolution) and the module's attribute registry. A symbol import also
    /// injects a stub box so later reads of the symbol resolve to a port.
    pub(crate) fn visit_import(
        &mut self,
        g: &mut FnGraph,
        name: &str,
        alias: Option<&str>,
        symbol: Option<&str>,
        star: bool,
        parent: Parent,
    ) {
        let entry = self.imports.entry(name.to_owned()).or_default();
        if entry.alias.is_none() {
            entry.alias = alias.map(str::to_owned);
        }
        entry.star |= star;
        if let Some(sym) = symbol {
            if !entry.symbols.iter().any(|s| s == sym) {
                entry.symbols.push(sym.to_owned());
            }
        }

        self.module.register_import(ImportReference {
            name: name.to_owned(),
            symbol: symbol.map(str::to_owned),
            kind: import_kind(name),
            metadata: None,
        });

        if let Some(sym) = symbol {
            let b = g.add_box(
                BoxFunction::new(BoxKind::Expression).with_name(format!("{name}.{sym}")),
            );
            let pof = g.add_func_out(Port::named(sym, b));
            let port = g.func_out[pof.slot()].clone();
            self.add_var_to_env(sym, BindingOrigin::Import, port, pof, parent);
        }
    }
}

/// Synthesizes `self.<field> = <field>` for a record declared with fields
/// but no `__init__`.
fn field_init_statement(field: &Param) -> CastNode {
    let receiver = CastNode::synthetic(CastData::Name {
        name: "self".into(),
        id: 0,
    });
    let left = CastNode::synthetic(CastData::Attribute {
        value: Box::new(receiver),
        attr: field.name.clone(),
    });
    let right = CastNode::synthetic(CastData::Name {
        name: field.name.clone(),
        id: 0,
    });
    CastNode::synthetic(CastData::Assignment {
        left: Box::new(left),
        right: Box::new(right),
    })
}

/// Imports from the source language's standard distribution are tagged
/// Native; everything else is deferred to downstream tooling.
fn import_kind(name: &str) -> ImportKind {
    const NATIVE: &[&str] = &[
        "math",
        "random",
        "sys",
        "os",
        "time",
        "itertools",
        "functools",
        "json",
        "re",
    ];
    let root = name.split('.').next().unwrap_or(name);
    if NATIVE.contains(&root) {
        ImportKind::Native
    } else {
        ImportKind::Other
    }
}
