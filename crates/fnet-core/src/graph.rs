//! The Function Network graph: role-partitioned, append-only tables of
//! boxes, ports, and wires.
//!
//! All mutations go through the `add_*` methods, which append and return the
//! new entry's 1-based address. Nothing is ever removed or reordered; the
//! address returned at append time is the entry's identity for the lifetime
//! of the graph, and every wire that references it depends on that.

use serde::{Deserialize, Serialize};

use crate::boxes::{BoxConditional, BoxFunction, BoxLoop};
use crate::error::CoreError;
use crate::id::{BoxId, PortId};
use crate::port::{Endpoint, Port, PortRole, Wire, WirePair};

/// One graph in the Function Network hierarchy.
///
/// `frame` holds the graph's own outer box (its interface frame); `boxes`
/// holds the call, expression, literal, and primitive boxes nested inside
/// it. Conditional and loop control boxes have their own tables, as do the
/// eight port roles and the fourteen wire role-pairs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FnGraph {
    // Boxes.
    pub frame: Vec<BoxFunction>,
    pub boxes: Vec<BoxFunction>,
    pub conditionals: Vec<BoxConditional>,
    pub loops: Vec<BoxLoop>,

    // Ports, one table per role.
    pub outer_in: Vec<Port>,
    pub outer_out: Vec<Port>,
    pub func_in: Vec<Port>,
    pub func_out: Vec<Port>,
    pub cond_in: Vec<Port>,
    pub cond_out: Vec<Port>,
    pub loop_in: Vec<Port>,
    pub loop_out: Vec<Port>,

    // Wires, one table per role pair.
    pub w_fin_oin: Vec<Wire>,
    pub w_oout_fout: Vec<Wire>,
    pub w_fin_fout: Vec<Wire>,
    pub w_oout_oin: Vec<Wire>,
    pub w_cin_fout: Vec<Wire>,
    pub w_cin_oin: Vec<Wire>,
    pub w_oout_cout: Vec<Wire>,
    pub w_lin_fout: Vec<Wire>,
    pub w_lin_oin: Vec<Wire>,
    pub w_fin_lout: Vec<Wire>,
    pub w_oout_lout: Vec<Wire>,
    pub w_cond_args: Vec<Wire>,
    pub w_init_args: Vec<Wire>,
    pub w_init_seed: Vec<Wire>,
}

impl FnGraph {
    pub fn new() -> Self {
        FnGraph::default()
    }

    /// A graph whose frame is the single given box.
    pub fn with_frame(frame_box: BoxFunction) -> Self {
        let mut g = FnGraph::new();
        g.add_frame(frame_box);
        g
    }

    // -----------------------------------------------------------------------
    // Box appends
    // -----------------------------------------------------------------------

    /// Appends a box to the outer frame table and returns its address.
    pub fn add_frame(&mut self, b: BoxFunction) -> BoxId {
        self.frame.push(b);
        BoxId(self.frame.len() as u32)
    }

    /// Appends an inner box and returns its address.
    pub fn add_box(&mut self, b: BoxFunction) -> BoxId {
        self.boxes.push(b);
        BoxId(self.boxes.len() as u32)
    }

    /// Appends a conditional control box and returns its address.
    pub fn add_conditional(&mut self, b: BoxConditional) -> BoxId {
        self.conditionals.push(b);
        BoxId(self.conditionals.len() as u32)
    }

    /// Appends a loop control box and returns its address.
    pub fn add_loop(&mut self, b: BoxLoop) -> BoxId {
        self.loops.push(b);
        BoxId(self.loops.len() as u32)
    }

    /// Address of the graph's own frame box (there is always at most one
    /// frame box per graph in this pass).
    pub fn frame_id(&self) -> BoxId {
        BoxId(self.frame.len().max(1) as u32)
    }

    // -----------------------------------------------------------------------
    // Port appends and lookups
    // -----------------------------------------------------------------------

    /// Appends a port to the given role table and returns its address.
    /// Appends cannot fail; callers are responsible for valid box addresses.
    pub fn add_port(&mut self, role: PortRole, port: Port) -> PortId {
        let table = self.ports_mut(role);
        table.push(port);
        PortId(table.len() as u32)
    }

    pub fn add_outer_in(&mut self, port: Port) -> PortId {
        self.add_port(PortRole::OuterIn, port)
    }

    pub fn add_outer_out(&mut self, port: Port) -> PortId {
        self.add_port(PortRole::OuterOut, port)
    }

    pub fn add_func_in(&mut self, port: Port) -> PortId {
        self.add_port(PortRole::FuncIn, port)
    }

    pub fn add_func_out(&mut self, port: Port) -> PortId {
        self.add_port(PortRole::FuncOut, port)
    }

    /// Read-only view of a role table.
    pub fn ports(&self, role: PortRole) -> &[Port] {
        match role {
            PortRole::OuterIn => &self.outer_in,
            PortRole::OuterOut => &self.outer_out,
            PortRole::FuncIn => &self.func_in,
            PortRole::FuncOut => &self.func_out,
            PortRole::CondIn => &self.cond_in,
            PortRole::CondOut => &self.cond_out,
            PortRole::LoopIn => &self.loop_in,
            PortRole::LoopOut => &self.loop_out,
        }
    }

    fn ports_mut(&mut self, role: PortRole) -> &mut Vec<Port> {
        match role {
            PortRole::OuterIn => &mut self.outer_in,
            PortRole::OuterOut => &mut self.outer_out,
            PortRole::FuncIn => &mut self.func_in,
            PortRole::FuncOut => &mut self.func_out,
            PortRole::CondIn => &mut self.cond_in,
            PortRole::CondOut => &mut self.cond_out,
            PortRole::LoopIn => &mut self.loop_in,
            PortRole::LoopOut => &mut self.loop_out,
        }
    }

    /// Address of the most recently appended port of a role, or an
    /// unresolved endpoint if the table is still empty.
    pub fn last_port(&self, role: PortRole) -> Endpoint {
        match self.ports(role).len() {
            0 => Endpoint::Unresolved,
            n => Endpoint::port(n as u32),
        }
    }

    /// Finds a named port in a role table, returning its address.
    pub fn find_port(&self, role: PortRole, name: &str) -> Option<PortId> {
        self.ports(role)
            .iter()
            .position(|p| p.name.as_deref() == Some(name))
            .map(|i| PortId(i as u32 + 1))
    }

    /// Finds an outer-in port by name; used to share one interface port
    /// between multiple reads of the same variable.
    pub fn find_outer_in(&self, name: &str) -> Option<PortId> {
        self.find_port(PortRole::OuterIn, name)
    }

    /// Finds a loop-in port by name on the enclosing loop interface.
    pub fn find_loop_in(&self, name: &str) -> Option<PortId> {
        self.find_port(PortRole::LoopIn, name)
    }

    /// Mutable access to a port, e.g. to attach a name after the fact.
    pub fn port_mut(&mut self, role: PortRole, id: PortId) -> Option<&mut Port> {
        self.ports_mut(role).get_mut(id.slot())
    }

    // -----------------------------------------------------------------------
    // Wire appends
    // -----------------------------------------------------------------------

    /// Appends a wire to the given role-pair table.
    pub fn add_wire(&mut self, pair: WirePair, wire: Wire) {
        self.wires_mut(pair).push(wire);
    }

    /// Read-only view of a role-pair table.
    pub fn wires(&self, pair: WirePair) -> &[Wire] {
        match pair {
            WirePair::FuncInToOuterIn => &self.w_fin_oin,
            WirePair::OuterOutToFuncOut => &self.w_oout_fout,
            WirePair::FuncInToFuncOut => &self.w_fin_fout,
            WirePair::OuterOutToOuterIn => &self.w_oout_oin,
            WirePair::CondInToFuncOut => &self.w_cin_fout,
            WirePair::CondInToOuterIn => &self.w_cin_oin,
            WirePair::OuterOutToCondOut => &self.w_oout_cout,
            WirePair::LoopInToFuncOut => &self.w_lin_fout,
            WirePair::LoopInToOuterIn => &self.w_lin_oin,
            WirePair::FuncInToLoopOut => &self.w_fin_lout,
            WirePair::OuterOutToLoopOut => &self.w_oout_lout,
            WirePair::CondArg => &self.w_cond_args,
            WirePair::InitArg => &self.w_init_args,
            WirePair::InitSeed => &self.w_init_seed,
        }
    }

    fn wires_mut(&mut self, pair: WirePair) -> &mut Vec<Wire> {
        match pair {
            WirePair::FuncInToOuterIn => &mut self.w_fin_oin,
            WirePair::OuterOutToFuncOut => &mut self.w_oout_fout,
            WirePair::FuncInToFuncOut => &mut self.w_fin_fout,
            WirePair::OuterOutToOuterIn => &mut self.w_oout_oin,
            WirePair::CondInToFuncOut => &mut self.w_cin_fout,
            WirePair::CondInToOuterIn => &mut self.w_cin_oin,
            WirePair::OuterOutToCondOut => &mut self.w_oout_cout,
            WirePair::LoopInToFuncOut => &mut self.w_lin_fout,
            WirePair::LoopInToOuterIn => &mut self.w_lin_oin,
            WirePair::FuncInToLoopOut => &mut self.w_fin_lout,
            WirePair::OuterOutToLoopOut => &mut self.w_oout_lout,
            WirePair::CondArg => &mut self.w_cond_args,
            WirePair::InitArg => &mut self.w_init_args,
            WirePair::InitSeed => &mut self.w_init_seed,
        }
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    /// Checks that every resolved wire endpoint addresses an existing port
    /// in the role table its pair implies.
    ///
    /// Cross-graph pairs (loop-init argument/seed) address the init graph's
    /// outer interface, so only their same-graph side is checked here.
    pub fn check_wires(&self) -> Result<(), CoreError> {
        for pair in WirePair::ALL {
            for (i, wire) in self.wires(pair).iter().enumerate() {
                let cross_graph_src = matches!(pair, WirePair::InitArg);
                let cross_graph_tgt = matches!(pair, WirePair::InitSeed);
                if !cross_graph_src {
                    self.check_endpoint(pair, i, wire.src, pair.src_role())?;
                }
                if !cross_graph_tgt {
                    self.check_endpoint(pair, i, wire.tgt, pair.tgt_role())?;
                }
            }
        }
        Ok(())
    }

    fn check_endpoint(
        &self,
        pair: WirePair,
        wire_index: usize,
        endpoint: Endpoint,
        mut role: PortRole,
    ) -> Result<(), CoreError> {
        // The condition-argument table is shared by loops and conditionals;
        // accept an address into either control interface.
        if pair == WirePair::CondArg && role == PortRole::LoopIn {
            if let Endpoint::Port(id) = endpoint {
                if id.slot() < self.loop_in.len() || id.slot() < self.cond_in.len() {
                    return Ok(());
                }
            }
            role = if self.loop_in.len() >= self.cond_in.len() {
                PortRole::LoopIn
            } else {
                PortRole::CondIn
            };
        }
        if let Endpoint::Port(id) = endpoint {
            let len = self.ports(role).len();
            if id.slot() >= len {
                return Err(CoreError::WireOutOfRange {
                    pair,
                    wire_index,
                    role,
                    index: id,
                    table_len: len,
                });
            }
        }
        Ok(())
    }

    /// The graph's display name, taken from its frame box.
    pub fn name(&self) -> Option<&str> {
        self.frame.first().and_then(|b| b.name.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::boxes::BoxKind;
    use proptest::prelude::*;

    #[test]
    fn append_returns_one_based_address() {
        let mut g = FnGraph::new();
        let b = g.add_box(BoxFunction::primitive("add"));
        assert_eq!(b, BoxId(1));
        let p1 = g.add_func_in(Port::anonymous(b));
        let p2 = g.add_func_in(Port::anonymous(b));
        assert_eq!(p1, PortId(1));
        assert_eq!(p2, PortId(2));
    }

    #[test]
    fn last_port_on_empty_table_is_unresolved() {
        let g = FnGraph::new();
        assert!(g.last_port(PortRole::FuncOut).is_unresolved());
    }

    #[test]
    fn find_outer_in_by_name() {
        let mut g = FnGraph::with_frame(BoxFunction::function("f"));
        let frame = g.frame_id();
        g.add_outer_in(Port::named("x", frame));
        g.add_outer_in(Port::named("y", frame));
        assert_eq!(g.find_outer_in("y"), Some(PortId(2)));
        assert_eq!(g.find_outer_in("z"), None);
    }

    #[test]
    fn check_wires_accepts_valid_and_unresolved() {
        let mut g = FnGraph::with_frame(BoxFunction::function("f"));
        let b = g.add_box(BoxFunction::primitive("add"));
        let fin = g.add_func_in(Port::anonymous(b));
        let fout = g.add_func_out(Port::anonymous(b));
        g.add_wire(WirePair::FuncInToFuncOut, Wire::new(fin, fout));
        g.add_wire(
            WirePair::FuncInToFuncOut,
            Wire::new(fin, Endpoint::Unresolved),
        );
        assert!(g.check_wires().is_ok());
    }

    #[test]
    fn check_wires_rejects_out_of_range() {
        let mut g = FnGraph::new();
        g.add_wire(
            WirePair::FuncInToFuncOut,
            Wire::new(Endpoint::port(1), Endpoint::Unresolved),
        );
        let err = g.check_wires().unwrap_err();
        assert!(matches!(err, CoreError::WireOutOfRange { .. }));
    }

    #[test]
    fn graph_name_comes_from_frame() {
        let g = FnGraph::with_frame(BoxFunction::function("foo"));
        assert_eq!(g.name(), Some("foo"));
        assert_eq!(FnGraph::new().name(), None);
    }

    #[test]
    fn module_frame_box_kind() {
        let g = FnGraph::with_frame(BoxFunction::new(BoxKind::Module).with_name("module"));
        assert_eq!(g.frame[0].kind, BoxKind::Module);
    }

    proptest! {
        /// Port identity stability: the address returned at append time
        /// equals the port's position for the lifetime of the graph, no
        /// matter how many later appends happen to any role.
        #[test]
        fn port_addresses_are_stable(appends in proptest::collection::vec(0usize..8, 1..64)) {
            let roles = [
                PortRole::OuterIn, PortRole::OuterOut,
                PortRole::FuncIn, PortRole::FuncOut,
                PortRole::CondIn, PortRole::CondOut,
                PortRole::LoopIn, PortRole::LoopOut,
            ];
            let mut g = FnGraph::new();
            let mut log: Vec<(PortRole, PortId, String)> = Vec::new();
            for (n, &pick) in appends.iter().enumerate() {
                let role = roles[pick];
                let name = format!("v{n}");
                let id = g.add_port(role, Port::named(name.clone(), BoxId(1)));
                log.push((role, id, name));
            }
            for (role, id, name) in log {
                prop_assert_eq!(g.ports(role)[id.slot()].name.as_deref(), Some(name.as_str()));
            }
        }
    }
}
