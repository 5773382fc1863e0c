//! Control-flow lowering: loops and conditionals.
//!
//! A loop becomes up to three registered graphs (pre-header, predicate,
//! body) behind one Loop box; a conditional becomes two or three (predicate,
//! then, optional else) behind one Conditional box. Both read their
//! incoming values through the control box's own port roles and hand
//! results back through the matching out roles.

use fnet_cast::{CastData, CastNode, SourceSpan, UsedVars};
use fnet_core::{
    BoxConditional, BoxFunction, BoxId, BoxKind, BoxLoop, Endpoint, FnGraph, Port, PortRole, Wire,
    WirePair,
};

use crate::env::{BindingOrigin, Tier, VarBinding};
use crate::error::{LowerError, LowerWarning};
use crate::pass::{Lowerer, Parent, Result};

impl Lowerer {
    /// Loop protocol. Order matters and mirrors the data dependencies:
    /// loop-in ports first (fed from the enclosing scope), then the optional
    /// pre-header, the predicate, the body, and finally the loop-out ports
    /// that every used variable is rebound to.
    pub(crate) fn visit_loop(
        &mut self,
        g: &mut FnGraph,
        init: &[CastNode],
        expr: &CastNode,
        body: &[CastNode],
        used_vars: &UsedVars,
        span: SourceSpan,
    ) -> Result<()> {
        let md = self.span_metadata(span);
        let bl = g.add_loop(BoxLoop {
            metadata: md,
            ..Default::default()
        });

        // One loop-in per used variable, fed from wherever the variable
        // currently lives outside the loop.
        for name in used_vars.values() {
            let pil = g.add_port(PortRole::LoopIn, Port::named(name.clone(), bl));
            let resolved = self
                .env
                .resolve(name)
                .map(|(tier, b)| (tier, b.index));
            match resolved {
                Some((Tier::Args, idx)) => {
                    g.add_wire(WirePair::LoopInToOuterIn, Wire::new(pil, idx));
                }
                Some((_, idx)) => {
                    g.add_wire(WirePair::LoopInToFuncOut, Wire::new(pil, idx));
                }
                None => {
                    self.warn(LowerWarning::UnresolvedVariable { name: name.clone() });
                    g.add_wire(
                        WirePair::LoopInToFuncOut,
                        Wire::new(pil, Endpoint::Unresolved),
                    );
                }
            }
        }

        let init_bf = if init.is_empty() {
            None
        } else {
            Some(self.lower_loop_init(g, init, span)?)
        };
        let pred_bf = self.lower_loop_predicate(g, expr)?;
        let body_bf = self.lower_loop_body(g, body, used_vars)?;

        // Rebind every used variable to the loop's out port so code after
        // the loop reads its final value. Loop results always land in the
        // local tier, module scope included, so the origin survives and a
        // later read wires to the loop-out rather than the pre-loop value.
        for name in used_vars.values() {
            let pol = g.add_port(PortRole::LoopOut, Port::named(name.clone(), bl));
            let port = g.loop_out[pol.slot()].clone();
            self.env.bind(
                Tier::Local,
                name.clone(),
                VarBinding::new(BindingOrigin::Loop, port, pol),
            );
        }

        let slot = bl.slot();
        g.loops[slot].init = init_bf;
        g.loops[slot].condition = Some(pred_bf);
        g.loops[slot].body = Some(body_bf);
        Ok(())
    }

    /// The pre-header graph: lowered like a function body, ending in the
    /// three-value iteration interface (has-next, next, exhausted) whose
    /// function-outs are wired positionally to three outer-outs.
    fn lower_loop_init(
        &mut self,
        g: &mut FnGraph,
        init: &[CastNode],
        span: SourceSpan,
    ) -> Result<BoxId> {
        let idx = self.module.reserve();
        let mut init_fn = FnGraph::with_frame(BoxFunction::new(BoxKind::Function));
        let frame = init_fn.frame_id();
        let scope = self.env.enter_scope();

        for line in init {
            // Iterator construction reads from the enclosing scope; the
            // names its nested call arguments reference become the
            // pre-header's interface ports.
            if let CastData::Assignment { right, .. } = &line.data {
                if let CastData::Call { func, arguments } = &right.data {
                    if matches!(&func.data, CastData::Name { name, .. } if name == "iter" || name == "_iter")
                    {
                        for arg in arguments {
                            if let CastData::Call {
                                arguments: inner, ..
                            } = &arg.data
                            {
                                for ca in inner {
                                    if let CastData::Name { name, .. } = &ca.data {
                                        let opi =
                                            init_fn.add_outer_in(Port::named(name.clone(), frame));
                                        let port = init_fn.outer_in[opi.slot()].clone();
                                        self.env.bind(
                                            Tier::Args,
                                            name.clone(),
                                            VarBinding::new(
                                                BindingOrigin::Argument,
                                                port,
                                                opi,
                                            ),
                                        );
                                    }
                                }
                            }
                        }
                    }
                }
            }
            self.visit_statement(&mut init_fn, line, Parent::Loop)?;
        }

        // The last three function-outs are the iteration interface; wire
        // them 1:1, in order, to three outer-outs.
        let n = init_fn.func_out.len();
        if n < 3 {
            self.env.restore(scope);
            return Err(LowerError::LoopInitArity { found: n });
        }
        for k in [n - 2, n - 1, n] {
            let name = init_fn.func_out[k - 1].name.clone();
            let opo = init_fn.add_port(
                PortRole::OuterOut,
                Port {
                    name,
                    box_id: frame,
                    default_value: None,
                    metadata: None,
                },
            );
            init_fn.add_wire(
                WirePair::OuterOutToFuncOut,
                Wire::new(opo, Endpoint::port(k as u32)),
            );
        }

        let interface: Vec<String> = init_fn
            .outer_in
            .iter()
            .filter_map(|p| p.name.clone())
            .collect();
        let seeds: Vec<Option<String>> = init_fn.outer_out.iter().map(|p| p.name.clone()).collect();
        self.module.replace_fn(idx, init_fn);
        self.env.restore(scope);

        let md = self.span_metadata(span);
        let bf = g.add_box(BoxFunction::call(BoxKind::Function, idx).with_metadata(md));
        for name in &interface {
            g.add_func_in(Port::named(name.clone(), bf));
        }
        for _ in &seeds {
            g.add_func_out(Port::anonymous(bf));
        }

        // Name-matched wires between the loop interface and the pre-header
        // graph's outer interface.
        let pil_names: Vec<Option<String>> = g.loop_in.iter().map(|p| p.name.clone()).collect();
        for (i, pil_name) in pil_names.iter().enumerate() {
            let pil = Endpoint::port(i as u32 + 1);
            for (j, opi_name) in interface.iter().enumerate() {
                if pil_name.as_deref() == Some(opi_name.as_str()) {
                    g.add_wire(
                        WirePair::InitArg,
                        Wire::new(Endpoint::port(j as u32 + 1), pil),
                    );
                }
            }
            for (j, opo_name) in seeds.iter().enumerate() {
                if pil_name.is_some() && pil_name == opo_name {
                    g.add_wire(
                        WirePair::InitSeed,
                        Wire::new(pil, Endpoint::port(j as u32 + 1)),
                    );
                }
            }
        }
        Ok(bf)
    }

    /// The predicate graph. Every variable the test reads must match a
    /// same-named loop-in port; a miss is a hard failure.
    fn lower_loop_predicate(&mut self, g: &mut FnGraph, expr: &CastNode) -> Result<BoxId> {
        let idx = self.module.reserve();
        let mut pred = FnGraph::with_frame(BoxFunction::new(BoxKind::Predicate));
        self.visit_expr(&mut pred, expr)?;
        let frame = pred.frame_id();
        let opo = pred.add_outer_out(Port::anonymous(frame));
        let val = self.last_value(&pred, "outer-out to function-out");
        pred.add_wire(WirePair::OuterOutToFuncOut, Wire::new(opo, val));

        let interface: Vec<String> = pred
            .outer_in
            .iter()
            .filter_map(|p| p.name.clone())
            .collect();
        // The loop interface owns these names from here on.
        for p in &mut pred.outer_in {
            p.name = None;
        }
        self.module.replace_fn(idx, pred);

        let md = self.span_metadata(expr.span);
        let bf = g.add_box(BoxFunction::call(BoxKind::Predicate, idx).with_metadata(md));
        for name in &interface {
            let pil = g
                .find_loop_in(name)
                .ok_or_else(|| LowerError::MissingLoopInPort { name: name.clone() })?;
            let fin = g.add_func_in(Port::anonymous(bf));
            g.add_wire(WirePair::CondArg, Wire::new(fin, pil));
        }
        g.add_func_out(Port::anonymous(bf));
        Ok(bf)
    }

    /// The body graph: one named outer-in and one named outer-out per used
    /// variable, lowered like a function body against a fresh scope.
    fn lower_loop_body(
        &mut self,
        g: &mut FnGraph,
        body: &[CastNode],
        used_vars: &UsedVars,
    ) -> Result<BoxId> {
        let idx = self.module.reserve();
        let md = self.span_metadata(body.first().map(|n| n.span).unwrap_or_default());
        let bf = g.add_box(BoxFunction::call(BoxKind::Function, idx).with_metadata(md));
        for name in used_vars.values() {
            g.add_func_in(Port::anonymous(bf));
            g.add_func_out(Port::named(name.clone(), bf));
        }

        let mut body_fn = FnGraph::with_frame(BoxFunction::new(BoxKind::Function));
        let frame = body_fn.frame_id();
        let scope = self.env.enter_scope();
        for name in used_vars.values() {
            let opi = body_fn.add_outer_in(Port::named(name.clone(), frame));
            let port = body_fn.outer_in[opi.slot()].clone();
            self.env.bind(
                Tier::Args,
                name.clone(),
                VarBinding::new(BindingOrigin::Argument, port, opi),
            );
            body_fn.add_outer_out(Port::named(name.clone(), frame));
        }
        // The body graph is function-shaped; statements inside it, nested
        // conditionals included, are lowered as function-body statements.
        let result = self.handle_body(&mut body_fn, body, Parent::FunctionDef);
        self.module.replace_fn(idx, body_fn);
        self.env.restore(scope);
        result?;
        Ok(bf)
    }

    /// Conditional protocol: condition-in ports for the values read before
    /// modification, condition-out ports for the variables either branch
    /// modifies, and a predicate plus one graph per branch. Both branches
    /// present the same interface shape; a variable modified in only one
    /// branch is an implicit passthrough in the other, not an explicit wire.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn visit_if(
        &mut self,
        g: &mut FnGraph,
        expr: &CastNode,
        body: &[CastNode],
        orelse: &[CastNode],
        expr_used_vars: &UsedVars,
        vars_accessed_before_mod: &UsedVars,
        modified_vars: &UsedVars,
        parent: Parent,
        span: SourceSpan,
    ) -> Result<()> {
        let md = self.span_metadata(span);
        let bc = g.add_conditional(BoxConditional {
            metadata: md,
            ..Default::default()
        });

        for _ in vars_accessed_before_mod.values() {
            g.add_port(PortRole::CondIn, Port::anonymous(bc));
        }
        for name in modified_vars.values() {
            g.add_port(PortRole::CondOut, Port::named(name.clone(), bc));
        }

        // Incoming-value wire. Inside a function-shaped body (a function
        // definition, a loop body, a branch) the value comes from the
        // enclosing interface; at module scope or in a loop pre-header it
        // comes from the most recent computed value.
        let pic = g.last_port(PortRole::CondIn);
        if parent == Parent::FunctionDef {
            let opi = g.last_port(PortRole::OuterIn);
            if pic.is_unresolved() || opi.is_unresolved() {
                self.warn(LowerWarning::UnresolvedWire {
                    table: "conditional-in to outer-in",
                });
            }
            g.add_wire(WirePair::CondInToOuterIn, Wire::new(pic, opi));
        } else {
            let pof = g.last_port(PortRole::FuncOut);
            if pic.is_unresolved() || pof.is_unresolved() {
                self.warn(LowerWarning::UnresolvedWire {
                    table: "conditional-in to function-out",
                });
            }
            g.add_wire(WirePair::CondInToFuncOut, Wire::new(pic, pof));
        }

        // Predicate.
        let pred_idx = self.module.reserve();
        let mut pred = FnGraph::with_frame(BoxFunction::new(BoxKind::Predicate));
        self.visit_expr(&mut pred, expr)?;
        let frame = pred.frame_id();
        let opo = pred.add_outer_out(Port::anonymous(frame));
        let val = self.last_value(&pred, "outer-out to function-out");
        pred.add_wire(WirePair::OuterOutToFuncOut, Wire::new(opo, val));
        self.module.replace_fn(pred_idx, pred);

        let pmd = self.span_metadata(expr.span);
        let pred_bf = g.add_box(BoxFunction::call(BoxKind::Predicate, pred_idx).with_metadata(pmd));
        let fin = g.add_func_in(Port::anonymous(pred_bf));
        g.add_func_out(Port::anonymous(pred_bf));
        if pic.is_unresolved() {
            self.warn(LowerWarning::UnresolvedWire {
                table: "condition argument",
            });
        }
        g.add_wire(WirePair::CondArg, Wire::new(fin, pic));

        // Branches.
        let then_bf = self.lower_branch(g, body, expr_used_vars, modified_vars)?;
        let else_bf = if orelse.is_empty() {
            None
        } else {
            Some(self.lower_branch(g, orelse, expr_used_vars, modified_vars)?)
        };

        let slot = bc.slot();
        g.conditionals[slot].condition = Some(pred_bf);
        g.conditionals[slot].body_if = Some(then_bf);
        g.conditionals[slot].body_else = else_bf;
        Ok(())
    }

    fn lower_branch(
        &mut self,
        g: &mut FnGraph,
        body: &[CastNode],
        expr_used_vars: &UsedVars,
        modified_vars: &UsedVars,
    ) -> Result<BoxId> {
        let idx = self.module.reserve();
        let md = self.span_metadata(body.first().map(|n| n.span).unwrap_or_default());
        let bf = g.add_box(BoxFunction::call(BoxKind::Function, idx).with_metadata(md));
        for _ in expr_used_vars.values() {
            g.add_func_in(Port::anonymous(bf));
        }
        for name in modified_vars.values() {
            g.add_func_out(Port::named(name.clone(), bf));
        }

        let mut branch = FnGraph::with_frame(BoxFunction::new(BoxKind::Function));
        let frame = branch.frame_id();
        let scope = self.env.enter_scope();
        // Interface shape is positional and shared with the sibling branch;
        // the names live only in the environment.
        for name in expr_used_vars.values() {
            let opi = branch.add_outer_in(Port::anonymous(frame));
            let port = branch.outer_in[opi.slot()].clone();
            self.env.bind(
                Tier::Args,
                name.clone(),
                VarBinding::new(BindingOrigin::Argument, port, opi),
            );
        }
        for name in modified_vars.values() {
            branch.add_outer_out(Port::named(name.clone(), frame));
        }
        let result = self.handle_body(&mut branch, body, Parent::FunctionDef);
        self.module.replace_fn(idx, branch);
        self.env.restore(scope);
        result?;
        Ok(bf)
    }
}
