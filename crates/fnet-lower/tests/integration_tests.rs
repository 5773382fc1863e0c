//! End-to-end lowering tests.
//!
//! Each test builds a small CAST module with the node builders below, lowers
//! it via `fnet_lower::lower_module()`, and asserts on the resulting module:
//! attribute registry contents, box/port tables, and wire tables.
//!
//! Tests cover:
//! - Expression wrapping and literal/operator lowering
//! - Interface-port sharing for repeated variable reads
//! - Assignment forms: call results, tuple unpack, passthrough
//! - Forward references between function definitions
//! - Loop and conditional protocols, including post-loop rebinding
//! - Returns: names, tuples, computed values
//! - Records, method calls, imports, keyword arguments
//! - Warning behavior for unresolved references

use fnet_cast::{BinOp, CastData, CastModule, CastNode, Param, SourceSpan, UsedVars};
use fnet_core::{
    Attribute, AttributeIndex, BoxId, BoxKind, Endpoint, FnGraph, FnModule, ImportKind, WirePair,
};
use fnet_lower::{lower_module, LowerWarning};

// ---------------------------------------------------------------------------
// Node builders
// ---------------------------------------------------------------------------

fn name(n: &str) -> CastNode {
    CastNode::synthetic(CastData::Name {
        name: n.into(),
        id: 0,
    })
}

fn int(v: i64) -> CastNode {
    CastNode::synthetic(CastData::Literal {
        value_type: "Integer".into(),
        value: serde_json::json!(v),
        source_type: None,
    })
}

fn assign(left: CastNode, right: CastNode) -> CastNode {
    CastNode::synthetic(CastData::Assignment {
        left: Box::new(left),
        right: Box::new(right),
    })
}

fn binop(op: BinOp, left: CastNode, right: CastNode) -> CastNode {
    CastNode::synthetic(CastData::BinaryOp {
        op,
        left: Box::new(left),
        right: Box::new(right),
    })
}

fn call(func: CastNode, arguments: Vec<CastNode>) -> CastNode {
    CastNode::synthetic(CastData::Call {
        func: Box::new(func),
        arguments,
    })
}

fn fdef(fname: &str, params: &[&str], body: Vec<CastNode>) -> CastNode {
    CastNode::synthetic(CastData::FunctionDef {
        name: fname.into(),
        args: params.iter().map(|p| Param::new(*p)).collect(),
        body,
    })
}

fn ret(value: CastNode) -> CastNode {
    CastNode::synthetic(CastData::Return {
        value: Box::new(value),
    })
}

fn tuple(values: Vec<CastNode>) -> CastNode {
    CastNode::synthetic(CastData::Tuple { values })
}

fn used(names: &[&str]) -> UsedVars {
    names
        .iter()
        .enumerate()
        .map(|(i, n)| (i as u32 + 1, (*n).to_string()))
        .collect()
}

fn lower(body: Vec<CastNode>) -> (FnModule, Vec<LowerWarning>) {
    let out = lower_module(&CastModule::new("test", body)).expect("lowering should succeed");
    (out.module, out.warnings)
}

fn graph(m: &FnModule, idx: u32) -> &FnGraph {
    m.graph(AttributeIndex(idx)).expect("graph slot")
}

fn port_names(table: &[fnet_core::Port]) -> Vec<Option<&str>> {
    table.iter().map(|p| p.name.as_deref()).collect()
}

fn wire_pairs(g: &FnGraph, pair: WirePair) -> Vec<(Endpoint, Endpoint)> {
    g.wires(pair).iter().map(|w| (w.src, w.tgt)).collect()
}

fn ep(i: u32) -> Endpoint {
    Endpoint::port(i)
}

// ---------------------------------------------------------------------------
// Expressions and assignments
// ---------------------------------------------------------------------------

#[test]
fn literal_binop_assignment_builds_wrapper_expression() {
    // x = 2 + 3
    let (m, warnings) = lower(vec![assign(name("x"), binop(BinOp::Add, int(2), int(3)))]);
    assert!(warnings.is_empty());
    assert_eq!(m.attributes.len(), 1);

    let e = graph(&m, 1);
    assert_eq!(e.frame[0].kind, BoxKind::Expression);
    assert_eq!(e.boxes.len(), 3);
    assert_eq!(e.boxes[0].kind, BoxKind::Literal);
    assert_eq!(e.boxes[1].kind, BoxKind::Literal);
    assert_eq!(e.boxes[2].kind, BoxKind::Primitive);
    assert_eq!(e.boxes[2].name.as_deref(), Some("+"));
    // Both operator inputs read the literals' outputs.
    assert_eq!(
        wire_pairs(e, WirePair::FuncInToFuncOut),
        vec![(ep(1), ep(1)), (ep(2), ep(2))]
    );
    // The wrapper's single output reads the operator's output.
    assert_eq!(
        wire_pairs(e, WirePair::OuterOutToFuncOut),
        vec![(ep(1), ep(3))]
    );
    assert!(e.outer_in.is_empty());

    // The module calls the wrapper and names its output after the target.
    let root = &m.root;
    assert_eq!(root.boxes.len(), 1);
    assert_eq!(root.boxes[0].kind, BoxKind::Expression);
    assert_eq!(root.boxes[0].contents, Some(AttributeIndex(1)));
    assert_eq!(port_names(&root.func_out), vec![Some("x")]);
}

#[test]
fn repeated_reads_share_one_interface_port() {
    // x = 2; y = x * x
    let (m, warnings) = lower(vec![
        assign(name("x"), int(2)),
        assign(name("y"), binop(BinOp::Mult, name("x"), name("x"))),
    ]);
    assert!(warnings.is_empty());

    let e = graph(&m, 2);
    assert_eq!(port_names(&e.outer_in), vec![Some("x")]);
    // Two reads, one port.
    assert_eq!(
        wire_pairs(e, WirePair::FuncInToOuterIn),
        vec![(ep(1), ep(1)), (ep(2), ep(1))]
    );

    // The call site feeds the shared port from x's defining output once.
    assert_eq!(
        wire_pairs(&m.root, WirePair::FuncInToFuncOut),
        vec![(ep(1), ep(1))]
    );
    assert_eq!(port_names(&m.root.func_out), vec![Some("x"), Some("y")]);
}

#[test]
fn parameter_read_twice_shares_its_interface_port() {
    // def square(x): return x * x
    let (m, warnings) = lower(vec![fdef(
        "square",
        &["x"],
        vec![ret(binop(BinOp::Mult, name("x"), name("x")))],
    )]);
    assert!(warnings.is_empty());

    let f = graph(&m, 1);
    assert_eq!(port_names(&f.outer_in), vec![Some("x")]);
    assert_eq!(f.boxes.len(), 1);
    assert_eq!(f.boxes[0].name.as_deref(), Some("*"));
    // Two reads, two wires, one interface port.
    assert_eq!(
        wire_pairs(f, WirePair::FuncInToOuterIn),
        vec![(ep(1), ep(1)), (ep(2), ep(1))]
    );
    assert_eq!(
        wire_pairs(f, WirePair::OuterOutToFuncOut),
        vec![(ep(1), ep(1))]
    );
}

#[test]
fn name_assignment_is_a_passthrough_graph() {
    // x = 2; y = x
    let (m, warnings) = lower(vec![assign(name("x"), int(2)), assign(name("y"), name("x"))]);
    assert!(warnings.is_empty());

    let p = graph(&m, 2);
    assert_eq!(p.frame[0].kind, BoxKind::Expression);
    assert!(p.boxes.is_empty());
    assert_eq!(p.outer_in.len(), 1);
    assert_eq!(p.outer_out.len(), 1);
    assert_eq!(
        wire_pairs(p, WirePair::OuterOutToOuterIn),
        vec![(ep(1), ep(1))]
    );

    assert_eq!(
        wire_pairs(&m.root, WirePair::FuncInToFuncOut),
        vec![(ep(1), ep(1))]
    );
    assert_eq!(port_names(&m.root.func_out), vec![Some("x"), Some("y")]);
}

#[test]
fn tuple_target_unpacks_the_call_result() {
    // a, b = f()
    let (m, warnings) = lower(vec![assign(
        tuple(vec![name("a"), name("b")]),
        call(name("f"), vec![]),
    )]);
    assert!(warnings.is_empty());

    let root = &m.root;
    assert_eq!(root.boxes.len(), 2);
    assert_eq!(root.boxes[0].name.as_deref(), Some("f"));
    assert_eq!(root.boxes[1].kind, BoxKind::Primitive);
    assert_eq!(root.boxes[1].name.as_deref(), Some("unpack"));
    // The unpack input reads the call's anonymous output.
    assert_eq!(
        wire_pairs(root, WirePair::FuncInToFuncOut),
        vec![(ep(1), ep(1))]
    );
    assert_eq!(
        port_names(&root.func_out),
        vec![None, Some("a"), Some("b")]
    );
}

#[test]
fn unresolved_variable_degrades_to_a_warning() {
    // y = x + 1 with x never bound
    let (m, warnings) = lower(vec![assign(
        name("y"),
        binop(BinOp::Add, name("x"), int(1)),
    )]);
    assert!(warnings
        .iter()
        .any(|w| matches!(w, LowerWarning::UnresolvedVariable { name } if name == "x")));
    let wires = wire_pairs(&m.root, WirePair::FuncInToFuncOut);
    assert_eq!(wires.len(), 1);
    assert!(wires[0].1.is_unresolved());
    assert!(m.check().is_ok());
}

// ---------------------------------------------------------------------------
// Functions and returns
// ---------------------------------------------------------------------------

#[test]
fn forward_reference_reuses_the_stub_slot() {
    // f(); def f(): return 2
    let (m, warnings) = lower(vec![
        CastNode::synthetic(CastData::Call {
            func: Box::new(name("f")),
            arguments: vec![],
        }),
        fdef("f", &[], vec![ret(int(2))]),
    ]);
    assert!(warnings.is_empty());

    // One registered graph: the call's stub, filled in by the definition.
    assert_eq!(m.attributes.len(), 1);
    let f = graph(&m, 1);
    assert_eq!(f.name(), Some("f"));
    assert_eq!(f.boxes.len(), 1);
    assert_eq!(f.boxes[0].kind, BoxKind::Literal);
    assert_eq!(
        wire_pairs(f, WirePair::OuterOutToFuncOut),
        vec![(ep(1), ep(1))]
    );
    assert_eq!(m.root.boxes[0].contents, Some(AttributeIndex(1)));
}

#[test]
fn returning_an_argument_wires_output_to_input() {
    // def id(a): return a
    let (m, warnings) = lower(vec![fdef("id", &["a"], vec![ret(name("a"))])]);
    assert!(warnings.is_empty());
    let f = graph(&m, 1);
    assert_eq!(port_names(&f.outer_in), vec![Some("a")]);
    assert_eq!(f.outer_out.len(), 1);
    assert_eq!(
        wire_pairs(f, WirePair::OuterOutToOuterIn),
        vec![(ep(1), ep(1))]
    );
}

#[test]
fn tuple_return_packs_its_elements() {
    // def pair(a, b): return (a, b)
    let (m, warnings) = lower(vec![fdef(
        "pair",
        &["a", "b"],
        vec![ret(tuple(vec![name("a"), name("b")]))],
    )]);
    assert!(warnings.is_empty());
    let f = graph(&m, 1);
    assert_eq!(f.boxes.len(), 1);
    assert_eq!(f.boxes[0].name.as_deref(), Some("pack"));
    assert_eq!(
        wire_pairs(f, WirePair::FuncInToOuterIn),
        vec![(ep(1), ep(1)), (ep(2), ep(2))]
    );
    assert_eq!(
        wire_pairs(f, WirePair::OuterOutToFuncOut),
        vec![(ep(1), ep(1))]
    );
}

#[test]
fn unknown_keyword_argument_warns() {
    // def f(a): return a; z = f(b=1)
    let (m, warnings) = lower(vec![
        fdef("f", &["a"], vec![ret(name("a"))]),
        assign(name("z"), call(name("f"), vec![assign(name("b"), int(1))])),
    ]);
    assert!(warnings
        .iter()
        .any(|w| matches!(w, LowerWarning::UnknownKeywordArgument { func, keyword }
            if func == "f" && keyword == "b")));
    // The keyword still names the call input.
    assert_eq!(port_names(&m.root.func_in), vec![Some("b")]);
}

// ---------------------------------------------------------------------------
// Loops
// ---------------------------------------------------------------------------

#[test]
fn loop_protocol_and_post_loop_rebinding() {
    // def countdown(n):
    //     while n > 0: n = n - 1
    //     return n
    let loop_node = CastNode::synthetic(CastData::Loop {
        init: vec![],
        expr: Box::new(binop(BinOp::Gt, name("n"), int(0))),
        body: vec![assign(name("n"), binop(BinOp::Sub, name("n"), int(1)))],
        used_vars: used(&["n"]),
    });
    let (m, warnings) = lower(vec![fdef(
        "countdown",
        &["n"],
        vec![loop_node, ret(name("n"))],
    )]);
    assert!(warnings.is_empty());

    let f = graph(&m, 1);
    assert_eq!(f.loops.len(), 1);
    assert_eq!(f.loops[0].init, None);
    assert_eq!(f.loops[0].condition, Some(BoxId(1)));
    assert_eq!(f.loops[0].body, Some(BoxId(2)));

    // The loop-in is fed from the function argument.
    assert_eq!(port_names(&f.loop_in), vec![Some("n")]);
    assert_eq!(
        wire_pairs(f, WirePair::LoopInToOuterIn),
        vec![(ep(1), ep(1))]
    );
    // The predicate call reads the loop-in by name.
    assert_eq!(wire_pairs(f, WirePair::CondArg), vec![(ep(1), ep(1))]);
    // The return reads the loop-out, not the argument.
    assert_eq!(port_names(&f.loop_out), vec![Some("n")]);
    assert_eq!(
        wire_pairs(f, WirePair::OuterOutToLoopOut),
        vec![(ep(1), ep(1))]
    );
    assert!(wire_pairs(f, WirePair::OuterOutToOuterIn).is_empty());

    // Predicate: interface positions match the loop-in, names cleared.
    let pred = graph(&m, 2);
    assert_eq!(pred.frame[0].kind, BoxKind::Predicate);
    assert_eq!(port_names(&pred.outer_in), vec![None]);
    assert_eq!(pred.outer_out.len(), 1);

    // Body: one named input and output per used variable, output wired to
    // the rebound local.
    let body = graph(&m, 3);
    assert_eq!(port_names(&body.outer_in), vec![Some("n")]);
    assert_eq!(port_names(&body.outer_out), vec![Some("n")]);
    assert_eq!(
        wire_pairs(body, WirePair::OuterOutToFuncOut),
        vec![(ep(1), ep(1))]
    );
}

#[test]
fn module_scope_post_loop_read_resolves_to_loop_out() {
    // x = 2
    // while x > 0: x = x - 1
    // y = x + 1
    // The read of x after the loop must see the loop-out, not the pre-loop
    // value, even though x was first bound at module scope.
    let loop_node = CastNode::synthetic(CastData::Loop {
        init: vec![],
        expr: Box::new(binop(BinOp::Gt, name("x"), int(0))),
        body: vec![assign(name("x"), binop(BinOp::Sub, name("x"), int(1)))],
        used_vars: used(&["x"]),
    });
    let (m, warnings) = lower(vec![
        assign(name("x"), int(2)),
        loop_node,
        assign(name("y"), binop(BinOp::Add, name("x"), int(1))),
    ]);
    assert!(warnings.is_empty());

    let root = &m.root;
    assert_eq!(port_names(&root.loop_out), vec![Some("x")]);
    // The loop-in is fed from the pre-loop value.
    assert_eq!(
        wire_pairs(root, WirePair::LoopInToFuncOut),
        vec![(ep(1), ep(1))]
    );
    // The post-loop read wires to the loop-out; nothing reads the pre-loop
    // value directly.
    assert_eq!(
        wire_pairs(root, WirePair::FuncInToLoopOut),
        vec![(ep(3), ep(1))]
    );
    assert!(wire_pairs(root, WirePair::FuncInToFuncOut).is_empty());
}

#[test]
fn loop_predicate_missing_interface_port_is_fatal() {
    // The predicate reads m, but the loop's interface only carries n.
    let loop_node = CastNode::synthetic(CastData::Loop {
        init: vec![],
        expr: Box::new(binop(BinOp::Gt, name("m"), int(0))),
        body: vec![assign(name("n"), int(0))],
        used_vars: used(&["n"]),
    });
    let err = lower_module(&CastModule::new(
        "test",
        vec![fdef("f", &["n", "m"], vec![loop_node])],
    ))
    .unwrap_err();
    assert!(err.to_string().contains("no loop-in port"));
}

// ---------------------------------------------------------------------------
// Conditionals
// ---------------------------------------------------------------------------

#[test]
fn conditional_protocol_inside_a_function() {
    // def clamp(x):
    //     if x > 0: y = 1
    //     else:     y = 2
    //     return y       (y is not rebound after the conditional)
    let if_node = CastNode::synthetic(CastData::If {
        expr: Box::new(binop(BinOp::Gt, name("x"), int(0))),
        body: vec![assign(name("y"), int(1))],
        orelse: vec![assign(name("y"), int(2))],
        expr_used_vars: used(&["x"]),
        vars_accessed_before_mod: used(&["x"]),
        modified_vars: used(&["y"]),
    });
    let (m, warnings) = lower(vec![fdef("clamp", &["x"], vec![if_node, ret(name("y"))])]);

    let f = graph(&m, 1);
    assert_eq!(f.conditionals.len(), 1);
    assert_eq!(f.conditionals[0].condition, Some(BoxId(1)));
    assert_eq!(f.conditionals[0].body_if, Some(BoxId(2)));
    assert_eq!(f.conditionals[0].body_else, Some(BoxId(3)));

    assert_eq!(f.cond_in.len(), 1);
    assert_eq!(port_names(&f.cond_out), vec![Some("y")]);
    // Directly inside a function body, the incoming value comes from the
    // enclosing interface.
    assert_eq!(
        wire_pairs(f, WirePair::CondInToOuterIn),
        vec![(ep(1), ep(1))]
    );
    assert!(wire_pairs(f, WirePair::CondInToFuncOut).is_empty());
    assert_eq!(wire_pairs(f, WirePair::CondArg), vec![(ep(1), ep(1))]);

    // Both branches present the same interface shape: anonymous inputs per
    // test-read variable, named outputs per modified variable.
    for idx in [3u32, 5] {
        let branch = graph(&m, idx);
        assert_eq!(port_names(&branch.outer_in), vec![None]);
        assert_eq!(port_names(&branch.outer_out), vec![Some("y")]);
        assert_eq!(
            wire_pairs(branch, WirePair::OuterOutToFuncOut),
            vec![(ep(1), ep(1))]
        );
    }

    // No rebinding after the conditional: the return of y degrades to an
    // unresolved-variable warning.
    assert!(warnings
        .iter()
        .any(|w| matches!(w, LowerWarning::UnresolvedVariable { name } if name == "y")));
}

#[test]
fn conditional_inside_a_loop_body_reads_the_interface() {
    // def f(x):
    //     while x > 0:
    //         x = 2
    //         if x > 0: y = 1
    // The loop body graph is function-shaped, so its conditional reads the
    // incoming value from the body's own interface, not the last value.
    let if_node = CastNode::synthetic(CastData::If {
        expr: Box::new(binop(BinOp::Gt, name("x"), int(0))),
        body: vec![assign(name("y"), int(1))],
        orelse: vec![],
        expr_used_vars: used(&["x"]),
        vars_accessed_before_mod: used(&["x"]),
        modified_vars: used(&["y"]),
    });
    let loop_node = CastNode::synthetic(CastData::Loop {
        init: vec![],
        expr: Box::new(binop(BinOp::Gt, name("x"), int(0))),
        body: vec![assign(name("x"), int(2)), if_node],
        used_vars: used(&["x"]),
    });
    let (m, _warnings) = lower(vec![fdef("f", &["x"], vec![loop_node])]);

    // The loop body graph holds the conditional.
    let body = graph(&m, 3);
    assert_eq!(body.conditionals.len(), 1);
    assert_eq!(
        wire_pairs(body, WirePair::CondInToOuterIn),
        vec![(ep(1), ep(1))]
    );
    assert!(wire_pairs(body, WirePair::CondInToFuncOut).is_empty());
    assert_eq!(body.conditionals[0].body_else, None);
}

#[test]
fn module_level_conditional_reads_the_last_value() {
    // x = 2; if x > 0: y = 1  -- at module scope there is no enclosing
    // interface, so the incoming wire reads the last computed value.
    let if_node = CastNode::synthetic(CastData::If {
        expr: Box::new(binop(BinOp::Gt, name("x"), int(0))),
        body: vec![assign(name("y"), int(1))],
        orelse: vec![],
        expr_used_vars: used(&["x"]),
        vars_accessed_before_mod: used(&["x"]),
        modified_vars: used(&["y"]),
    });
    let (m, _warnings) = lower(vec![assign(name("x"), int(2)), if_node]);

    let root = &m.root;
    assert_eq!(root.conditionals.len(), 1);
    assert_eq!(
        wire_pairs(root, WirePair::CondInToFuncOut),
        vec![(ep(1), ep(1))]
    );
    assert!(wire_pairs(root, WirePair::CondInToOuterIn).is_empty());
}

// ---------------------------------------------------------------------------
// Records and imports
// ---------------------------------------------------------------------------

#[test]
fn record_constructor_and_method_call() {
    // class Point:
    //     def __init__(self, x, y): self.x = x; self.y = y
    //     def norm(self): return 0
    // p = Point(1, 2); d = p.norm()
    let init = fdef(
        "__init__",
        &["self", "x", "y"],
        vec![
            assign(
                CastNode::synthetic(CastData::Attribute {
                    value: Box::new(name("self")),
                    attr: "x".into(),
                }),
                name("x"),
            ),
            assign(
                CastNode::synthetic(CastData::Attribute {
                    value: Box::new(name("self")),
                    attr: "y".into(),
                }),
                name("y"),
            ),
        ],
    );
    let norm = fdef("norm", &["self"], vec![ret(int(0))]);
    let record = CastNode::synthetic(CastData::RecordDef {
        name: "Point".into(),
        bases: vec![],
        funcs: vec![init, norm],
        fields: vec![],
    });
    let (m, warnings) = lower(vec![
        record,
        assign(name("p"), call(name("Point"), vec![int(1), int(2)])),
        assign(
            name("d"),
            call(
                CastNode::synthetic(CastData::Attribute {
                    value: Box::new(name("p")),
                    attr: "norm".into(),
                }),
                vec![],
            ),
        ),
    ]);
    assert!(warnings.is_empty());

    // Constructor: interface is the init parameters minus self, plus obj.
    let ctor = graph(&m, 1);
    assert_eq!(ctor.name(), Some("new:Point"));
    assert_eq!(
        port_names(&ctor.outer_in),
        vec![Some("x"), Some("y"), Some("obj")]
    );
    assert_eq!(ctor.boxes[2].name.as_deref(), Some("new_Record"));
    // Two field writes: each a name literal, a new_Field, and a set.
    assert_eq!(ctor.boxes.len(), 9);
    assert_eq!(ctor.boxes[5].name.as_deref(), Some("set"));
    assert_eq!(ctor.outer_out.len(), 1);
    // The finished record is the last set's output.
    assert_eq!(
        wire_pairs(ctor, WirePair::OuterOutToFuncOut),
        vec![(ep(1), ep(9))]
    );

    let method = graph(&m, 2);
    assert_eq!(method.name(), Some("Point:norm"));
    assert_eq!(port_names(&method.outer_in), vec![Some("self")]);

    // The constructor call carries the record name; the method call carries
    // record:method and the receiver as its first argument.
    let root = &m.root;
    let ctor_call = root
        .boxes
        .iter()
        .find(|b| b.name.as_deref() == Some("Point"))
        .expect("constructor call box");
    assert_eq!(ctor_call.contents, Some(AttributeIndex(1)));
    let method_call = root
        .boxes
        .iter()
        .find(|b| b.name.as_deref() == Some("Point:norm"))
        .expect("method call box");
    assert_eq!(method_call.contents, Some(AttributeIndex(2)));
}

#[test]
fn symbol_import_registers_and_injects_a_stub() {
    // from math import sqrt; r = sqrt(4)
    let import = CastNode::synthetic(CastData::Import {
        name: "math".into(),
        alias: None,
        symbol: Some("sqrt".into()),
        star: false,
    });
    let (m, warnings) = lower(vec![
        import,
        assign(name("r"), call(name("sqrt"), vec![int(4)])),
    ]);
    assert!(warnings.is_empty());

    assert_eq!(m.attributes.len(), 1);
    match &m.attributes[0] {
        Attribute::Import(i) => {
            assert_eq!(i.name, "math");
            assert_eq!(i.symbol.as_deref(), Some("sqrt"));
            assert_eq!(i.kind, ImportKind::Native);
        }
        other => panic!("expected an import attribute, got {other:?}"),
    }

    let root = &m.root;
    // Stub box for the symbol, the argument literal, and the Import call.
    assert_eq!(root.boxes.len(), 3);
    assert_eq!(root.boxes[0].name.as_deref(), Some("math.sqrt"));
    assert_eq!(root.boxes[2].kind, BoxKind::Import);
    assert_eq!(root.boxes[2].name.as_deref(), Some("math.sqrt"));
    assert_eq!(port_names(&root.func_out), vec![Some("sqrt"), None, Some("r")]);
}

// ---------------------------------------------------------------------------
// Module shape
// ---------------------------------------------------------------------------

#[test]
fn module_carries_schema_and_provenance() {
    let cast = CastModule::new("example", vec![assign(name("x"), int(1))])
        .with_source_file("example.py");
    let out = lower_module(&cast).unwrap();
    let m = out.module;
    assert_eq!(m.schema, "FN");
    assert_eq!(m.schema_version, "0.1.5");
    assert_eq!(m.name, "example");
    assert_eq!(m.root.frame[0].kind, BoxKind::Module);
    assert!(m.metadata.is_some());
    assert!(m.check().is_ok());
}

#[test]
fn lowered_module_roundtrips_through_json() {
    let loop_node = CastNode::synthetic(CastData::Loop {
        init: vec![],
        expr: Box::new(binop(BinOp::Gt, name("n"), int(0))),
        body: vec![assign(name("n"), binop(BinOp::Sub, name("n"), int(1)))],
        used_vars: used(&["n"]),
    });
    let (m, _) = lower(vec![fdef(
        "countdown",
        &["n"],
        vec![loop_node, ret(name("n"))],
    )]);
    let json = serde_json::to_string(&m).unwrap();
    let back: FnModule = serde_json::from_str(&json).unwrap();
    assert_eq!(m, back);
}

#[test]
fn spans_become_metadata_records() {
    let node = CastNode::new(
        CastData::Assignment {
            left: Box::new(name("x")),
            right: Box::new(CastNode::new(
                CastData::Literal {
                    value_type: "Integer".into(),
                    value: serde_json::json!(7),
                    source_type: Some("int".into()),
                },
                SourceSpan::row(3),
            )),
        },
        SourceSpan::row(3),
    );
    let (m, _) = lower(vec![node]);
    // Module-level bundle plus at least the literal's span/type bundle.
    assert!(m.metadata_collection.len() >= 2);
}
