//! The three-tier variable environment.
//!
//! Every bound variable maps to the port that currently carries its value.
//! Resolution is innermost-first: local, then args, then global. Entering a
//! nested scope (function body, loop body, conditional branch) moves the
//! live `args`/`local` tiers out into a [`ScopeFrame`] and installs empty
//! ones; restoring moves them back. The caller's tiers are untouched by
//! anything the nested scope did.

use indexmap::IndexMap;

use fnet_core::{Port, PortId};

/// Which tier a binding lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    Local,
    Args,
    Global,
}

/// The construct that bound a variable. Drives which wire table a read of
/// the variable lands in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingOrigin {
    /// Bound to a loop-out port after a loop.
    Loop,
    /// A formal parameter.
    Argument,
    /// An imported symbol injected as a stub value.
    Import,
    /// An ordinary assignment.
    Other,
}

/// One variable's current resolution: the port carrying its value and that
/// port's address in its role table.
#[derive(Debug, Clone, PartialEq)]
pub struct VarBinding {
    pub origin: BindingOrigin,
    pub port: Port,
    pub index: PortId,
}

impl VarBinding {
    pub fn new(origin: BindingOrigin, port: Port, index: PortId) -> Self {
        VarBinding {
            origin,
            port,
            index,
        }
    }
}

/// Saved `args`/`local` tiers, returned by [`VarEnv::enter_scope`].
#[derive(Debug, Default)]
pub struct ScopeFrame {
    args: IndexMap<String, VarBinding>,
    local: IndexMap<String, VarBinding>,
}

#[derive(Debug, Default)]
pub struct VarEnv {
    global: IndexMap<String, VarBinding>,
    args: IndexMap<String, VarBinding>,
    local: IndexMap<String, VarBinding>,
}

impl VarEnv {
    pub fn new() -> Self {
        VarEnv::default()
    }

    pub fn bind(&mut self, tier: Tier, name: impl Into<String>, binding: VarBinding) {
        self.tier_mut(tier).insert(name.into(), binding);
    }

    /// Innermost-first lookup. Shadowing is implicit and not diagnosed.
    pub fn resolve(&self, name: &str) -> Option<(Tier, &VarBinding)> {
        if let Some(b) = self.local.get(name) {
            Some((Tier::Local, b))
        } else if let Some(b) = self.args.get(name) {
            Some((Tier::Args, b))
        } else if let Some(b) = self.global.get(name) {
            Some((Tier::Global, b))
        } else {
            None
        }
    }

    pub fn tier(&self, tier: Tier) -> &IndexMap<String, VarBinding> {
        match tier {
            Tier::Local => &self.local,
            Tier::Args => &self.args,
            Tier::Global => &self.global,
        }
    }

    fn tier_mut(&mut self, tier: Tier) -> &mut IndexMap<String, VarBinding> {
        match tier {
            Tier::Local => &mut self.local,
            Tier::Args => &mut self.args,
            Tier::Global => &mut self.global,
        }
    }

    /// Moves `args` and `local` out and installs fresh empty tiers. O(1).
    pub fn enter_scope(&mut self) -> ScopeFrame {
        ScopeFrame {
            args: std::mem::take(&mut self.args),
            local: std::mem::take(&mut self.local),
        }
    }

    /// Reinstalls the tiers saved by [`VarEnv::enter_scope`], discarding
    /// whatever the nested scope bound.
    pub fn restore(&mut self, frame: ScopeFrame) {
        self.args = frame.args;
        self.local = frame.local;
    }

    /// Drops all local bindings. Used at function-body entry and exit.
    pub fn clear_local(&mut self) {
        self.local.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fnet_core::BoxId;

    fn binding(index: u32) -> VarBinding {
        VarBinding::new(
            BindingOrigin::Other,
            Port::anonymous(BoxId(1)),
            PortId(index),
        )
    }

    #[test]
    fn resolution_is_innermost_first() {
        let mut env = VarEnv::new();
        env.bind(Tier::Global, "x", binding(1));
        env.bind(Tier::Args, "x", binding(2));
        env.bind(Tier::Local, "x", binding(3));
        let (tier, b) = env.resolve("x").unwrap();
        assert_eq!(tier, Tier::Local);
        assert_eq!(b.index, PortId(3));
    }

    #[test]
    fn args_win_over_global() {
        let mut env = VarEnv::new();
        env.bind(Tier::Global, "y", binding(1));
        env.bind(Tier::Args, "y", binding(2));
        assert_eq!(env.resolve("y").unwrap().0, Tier::Args);
    }

    #[test]
    fn scope_isolation() {
        let mut env = VarEnv::new();
        env.bind(Tier::Args, "a", binding(1));
        env.bind(Tier::Local, "l", binding(2));
        let before_args = env.tier(Tier::Args).clone();
        let before_local = env.tier(Tier::Local).clone();

        let frame = env.enter_scope();
        assert!(env.resolve("a").is_none());
        env.bind(Tier::Args, "inner", binding(9));
        env.bind(Tier::Local, "l", binding(10));
        env.restore(frame);

        assert_eq!(env.tier(Tier::Args), &before_args);
        assert_eq!(env.tier(Tier::Local), &before_local);
        assert!(env.resolve("inner").is_none());
    }

    #[test]
    fn globals_survive_scope_entry() {
        let mut env = VarEnv::new();
        env.bind(Tier::Global, "g", binding(4));
        let frame = env.enter_scope();
        assert_eq!(env.resolve("g").unwrap().0, Tier::Global);
        env.restore(frame);
    }
}
