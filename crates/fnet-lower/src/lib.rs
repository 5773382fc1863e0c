//! Lowering from CAST (the scope-annotated source tree) to a Function
//! Network module.
//!
//! The pass walks the tree once, top to bottom. Statements append boxes,
//! ports, and wires to the graph under construction; nested constructs
//! (function bodies, expression wrappers, loop and conditional parts) build
//! their own graphs and register them in the module's attribute table. A
//! three-tier variable environment maps names to the ports currently
//! carrying their values, which is what turns the tree into a dataflow
//! graph: every variable read becomes a wire back to its defining port.
//!
//! Unresolvable references degrade to warnings plus explicitly unresolved
//! wire endpoints; structural problems abort with a [`LowerError`] carrying
//! the offending statement's source span.

mod control;
mod decl;
mod env;
mod error;
mod expr;
mod pass;
mod primitives;

pub use env::{BindingOrigin, Tier, VarBinding, VarEnv};
pub use error::{LowerError, LowerWarning};
pub use pass::Lowerer;

use fnet_cast::CastModule;
use fnet_core::FnModule;

/// A lowered module plus the non-fatal conditions encountered on the way.
#[derive(Debug)]
pub struct LowerOutput {
    pub module: FnModule,
    pub warnings: Vec<LowerWarning>,
}

/// Lowers one CAST module to a Function Network module.
pub fn lower_module(cast: &CastModule) -> Result<LowerOutput, LowerError> {
    let (module, warnings) = Lowerer::new(cast.name.clone()).run(cast)?;
    Ok(LowerOutput { module, warnings })
}
