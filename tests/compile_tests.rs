//! End-to-end tests for the body finalizer, driving the compiler through
//! the public lowering API and through the instruction builder directly.

use bumpalo::Bump;
use zamc::core::test_utils::{
    CollectingReporter, TestFunc, TestProfile, TestReducer, TestUseDefs,
};
use zamc::{
    BinOp, CaseLabel, DoubleKey, Expr, Flavor, Ident, IdentKind, Inst, Op, Operand, Options,
    Session, Stmt, SwitchCase, ZType, ZamCompiler,
};

type TestCompiler<'r, 's, 'a> = ZamCompiler<
    'a,
    TestFunc<'a>,
    TestProfile<'a>,
    TestUseDefs<'a>,
    TestReducer<'s, 'a>,
    &'r mut CollectingReporter,
>;

fn compiler<'r, 's, 'a>(
    session: &'s Session<'a>,
    func: TestFunc<'a>,
    profile: TestProfile<'a>,
    use_defs: TestUseDefs<'a>,
    body: Stmt<'a>,
    options: Options,
    reporter: &'r mut CollectingReporter,
) -> TestCompiler<'r, 's, 'a> {
    ZamCompiler::new(
        func,
        profile,
        body,
        use_defs,
        TestReducer::new(session),
        reporter,
        options,
    )
    .expect("compiler construction")
}

fn int_local<'a>(session: &Session<'a>, name: &str) -> Ident<'a> {
    session.ident(name, ZType::Int, IdentKind::Local)
}

#[test]
fn single_forward_branch_encodes_final_number() {
    let arena = Bump::new();
    let session = Session::new(&arena);
    let mut reporter = CollectingReporter::new();
    let mut c = compiler(
        &session,
        TestFunc::new("s1"),
        TestProfile {
            locals: vec![int_local(&session, "n")],
            ..Default::default()
        },
        TestUseDefs::default(),
        Stmt::Block(Vec::new()),
        Options::default(),
        &mut reporter,
    );

    let b = c.builder_mut();
    let mut a = Inst::with_operands(Op::IfFalse, [Operand::Slot(0), Operand::Branch(0)]);
    a.target_slot = 1;
    let a = b.emit(a);
    let ret = b.emit(Inst::new(Op::Return));
    b.set_target(a, ret);

    let body = c.compile_body().expect("compiles");
    assert_eq!(body.insts().len(), 2);
    assert_eq!(body.insts()[0].operands[1], Operand::Branch(1));
}

#[test]
fn branch_over_dead_code_is_tightened() {
    let arena = Bump::new();
    let session = Session::new(&arena);
    let mut reporter = CollectingReporter::new();
    let mut c = compiler(
        &session,
        TestFunc::new("s2"),
        TestProfile {
            locals: vec![int_local(&session, "n")],
            ..Default::default()
        },
        TestUseDefs::default(),
        Stmt::Block(Vec::new()),
        Options::default(),
        &mut reporter,
    );

    let b = c.builder_mut();
    let mut a = Inst::with_operands(Op::IfFalse, [Operand::Slot(0), Operand::Branch(0)]);
    a.target_slot = 1;
    let a = b.emit(a);
    // Retired by the optimizer: a copy of a slot onto itself.
    b.emit(Inst::with_operands(
        Op::Assign,
        [Operand::Slot(0), Operand::Slot(0)],
    ));
    let ret = b.emit(Inst::new(Op::Return));
    b.set_target(a, ret);

    let body = c.compile_body().expect("compiles");
    assert_eq!(body.insts().len(), 2);
    assert_eq!(body.insts()[0].op, Op::IfFalse);
    assert_eq!(body.insts()[1].op, Op::Return);
    assert_eq!(body.insts()[0].operands[1], Operand::Branch(1));
}

#[test]
fn simple_loop_gets_depth_and_start_labels() {
    let arena = Bump::new();
    let session = Session::new(&arena);
    let mut reporter = CollectingReporter::new();
    let mut c = compiler(
        &session,
        TestFunc::new("s3"),
        TestProfile {
            locals: vec![int_local(&session, "n")],
            ..Default::default()
        },
        TestUseDefs::default(),
        Stmt::Block(Vec::new()),
        Options::default(),
        &mut reporter,
    );

    let b = c.builder_mut();
    let head = b.emit(Inst::with_operands(
        Op::Const,
        [Operand::Slot(0), Operand::Int(0)],
    ));
    b.emit(Inst::with_operands(
        Op::Add,
        [Operand::Slot(0), Operand::Slot(0), Operand::Slot(0)],
    ));
    let mut back = Inst::with_operands(Op::IfFalse, [Operand::Slot(0), Operand::Branch(0)]);
    back.target_slot = 1;
    let back = b.emit(back);
    b.set_target(back, head);

    let body = c.compile_body().expect("compiles");
    assert_eq!(body.insts().len(), 3);
    assert!(body.insts()[0].loop_start);
    for inst in body.insts() {
        assert_eq!(inst.loop_depth, 1);
    }
}

#[test]
fn branch_to_pending_encodes_one_past_the_end() {
    let arena = Bump::new();
    let session = Session::new(&arena);
    let mut reporter = CollectingReporter::new();
    let mut c = compiler(
        &session,
        TestFunc::new("s4"),
        TestProfile {
            locals: vec![int_local(&session, "n")],
            ..Default::default()
        },
        TestUseDefs::default(),
        Stmt::Block(Vec::new()),
        Options::default(),
        &mut reporter,
    );

    let b = c.builder_mut();
    let mut a = Inst::with_operands(Op::IfFalse, [Operand::Slot(0), Operand::Branch(0)]);
    a.target_slot = 1;
    let a = b.emit(a);
    b.branch_to_next(a);

    let body = c.compile_body().expect("compiles");
    assert_eq!(body.insts().len(), 1);
    assert_eq!(body.insts()[0].operands[1], Operand::Branch(1));
}

#[test]
fn hook_breaks_become_hook_break_instructions() {
    let arena = Bump::new();
    let session = Session::new(&arena);
    let mut reporter = CollectingReporter::new();
    let mut func = TestFunc::new("s5");
    func.flavor = Flavor::Hook;
    let c = compiler(
        &session,
        func,
        TestProfile::default(),
        TestUseDefs::default(),
        Stmt::Block(vec![Stmt::Break]),
        Options::default(),
        &mut reporter,
    );

    let body = c.compile_body().expect("hook breaks are not errors");
    assert_eq!(body.insts().len(), 1);
    assert_eq!(body.insts()[0].op, Op::HookBreakX);
    assert!(reporter.errors.is_empty());
}

#[test]
fn stray_next_fails_compilation() {
    let arena = Bump::new();
    let session = Session::new(&arena);
    let mut reporter = CollectingReporter::new();
    let c = compiler(
        &session,
        TestFunc::new("s6"),
        TestProfile::default(),
        TestUseDefs::default(),
        Stmt::Block(vec![Stmt::Next]),
        Options::default(),
        &mut reporter,
    );

    assert!(c.compile_body().is_none());
    assert_eq!(reporter.errors.len(), 1);
    assert!(reporter.errors[0].contains("next"));
}

#[test]
fn stray_break_fails_outside_hooks() {
    let arena = Bump::new();
    let session = Session::new(&arena);
    let mut reporter = CollectingReporter::new();
    let c = compiler(
        &session,
        TestFunc::new("stray_break"),
        TestProfile::default(),
        TestUseDefs::default(),
        Stmt::Block(vec![Stmt::Break]),
        Options::default(),
        &mut reporter,
    );

    assert!(c.compile_body().is_none());
    assert!(reporter.errors[0].contains("break"));
}

#[test]
fn stray_fallthrough_fails_compilation() {
    let arena = Bump::new();
    let session = Session::new(&arena);
    let mut reporter = CollectingReporter::new();
    let c = compiler(
        &session,
        TestFunc::new("stray_ft"),
        TestProfile::default(),
        TestUseDefs::default(),
        Stmt::Block(vec![Stmt::Fallthrough]),
        Options::default(),
        &mut reporter,
    );

    assert!(c.compile_body().is_none());
    assert!(reporter.errors[0].contains("fallthrough"));
}

#[test]
fn residual_catches_are_an_internal_error() {
    let arena = Bump::new();
    let session = Session::new(&arena);
    let mut reporter = CollectingReporter::new();
    let mut c = compiler(
        &session,
        TestFunc::new("catches"),
        TestProfile::default(),
        TestUseDefs::default(),
        Stmt::Block(Vec::new()),
        Options::default(),
        &mut reporter,
    );

    let b = c.builder_mut();
    b.push_catches();
    let site = b.emit(Inst::with_operands(Op::Goto, [Operand::Branch(0)]));
    b.add_catch(site);

    assert!(c.compile_body().is_none());
    assert_eq!(reporter.internal.len(), 1);
    assert!(reporter.internal[0].contains("inline return"));
}

#[test]
fn empty_body_without_globals_is_empty() {
    let arena = Bump::new();
    let session = Session::new(&arena);
    let mut reporter = CollectingReporter::new();
    let c = compiler(
        &session,
        TestFunc::new("empty"),
        TestProfile::default(),
        TestUseDefs::default(),
        Stmt::Block(Vec::new()),
        Options::default(),
        &mut reporter,
    );

    let body = c.compile_body().expect("compiles");
    assert!(body.insts().is_empty());
    assert_eq!(body.num_iters(), 0);
}

#[test]
fn empty_body_with_globals_synchronizes_them() {
    let arena = Bump::new();
    let session = Session::new(&arena);
    let g = session.ident("g", ZType::Int, IdentKind::Global);
    let mut reporter = CollectingReporter::new();
    let c = compiler(
        &session,
        TestFunc::new("sync"),
        TestProfile {
            globals: vec![g],
            ..Default::default()
        },
        TestUseDefs::default(),
        Stmt::Block(Vec::new()),
        Options::default(),
        &mut reporter,
    );

    let body = c.compile_body().expect("compiles");
    assert_eq!(body.insts().len(), 1);
    assert_eq!(body.insts()[0].op, Op::SyncGlobals);
    assert_eq!(body.globals().len(), 1);
}

#[test]
fn non_return_tail_gets_global_sync_before_finalization() {
    let arena = Bump::new();
    let session = Session::new(&arena);
    let g = session.ident("g", ZType::Int, IdentKind::Global);
    let x = int_local(&session, "x");
    let mut reporter = CollectingReporter::new();
    let c = compiler(
        &session,
        TestFunc::new("tail"),
        TestProfile {
            globals: vec![g],
            locals: vec![x],
            ..Default::default()
        },
        TestUseDefs::default(),
        Stmt::Block(vec![Stmt::Assign {
            target: x,
            value: Expr::IntLit(7),
        }]),
        Options::default(),
        &mut reporter,
    );

    let body = c.compile_body().expect("compiles");
    assert_eq!(body.insts().last().unwrap().op, Op::SyncGlobals);
}

#[test]
fn return_tail_skips_global_sync() {
    let arena = Bump::new();
    let session = Session::new(&arena);
    let g = session.ident("g", ZType::Int, IdentKind::Global);
    let mut reporter = CollectingReporter::new();
    let c = compiler(
        &session,
        TestFunc::new("ret_tail"),
        TestProfile {
            globals: vec![g],
            ..Default::default()
        },
        TestUseDefs::default(),
        Stmt::Block(vec![Stmt::Return(None)]),
        Options::default(),
        &mut reporter,
    );

    let body = c.compile_body().expect("compiles");
    assert!(body.insts().iter().all(|i| i.op != Op::SyncGlobals));
}

#[test]
fn unused_parameters_get_slots_but_no_load() {
    let arena = Bump::new();
    let session = Session::new(&arena);
    let p = session.ident("p", ZType::Int, IdentKind::Param);
    let q = session.ident("q", ZType::Int, IdentKind::Param);
    let mut func = TestFunc::new("params");
    func.params = vec![p, q];
    let mut reporter = CollectingReporter::new();
    let c = compiler(
        &session,
        func,
        TestProfile::default(),
        TestUseDefs::using([p]),
        Stmt::Block(vec![Stmt::Return(Some(Expr::Id(p)))]),
        Options {
            no_zam_opt: true,
            ..Default::default()
        },
        &mut reporter,
    );

    let body = c.compile_body().expect("compiles");
    let loads: Vec<_> = body
        .insts()
        .iter()
        .filter(|i| i.op == Op::LoadParam)
        .collect();
    assert_eq!(loads.len(), 1, "only the used parameter is loaded");
    assert_eq!(loads[0].operands[0], Operand::Slot(0));
    // Both parameters still occupy frame slots.
    assert_eq!(body.frame_size(), 2);
}

#[test]
fn managed_slots_track_identifier_types() {
    let arena = Bump::new();
    let session = Session::new(&arena);
    let n = int_local(&session, "n");
    let s = session.ident("s", ZType::String, IdentKind::Local);
    let mut reporter = CollectingReporter::new();
    let c = compiler(
        &session,
        TestFunc::new("managed"),
        TestProfile {
            locals: vec![n, s],
            ..Default::default()
        },
        TestUseDefs::default(),
        Stmt::Block(Vec::new()),
        Options {
            no_zam_opt: true,
            ..Default::default()
        },
        &mut reporter,
    );

    let body = c.compile_body().expect("compiles");
    assert_eq!(body.managed_slots(), &[1]);
}

#[test]
fn full_pipeline_produces_a_consistent_body() {
    let arena = Bump::new();
    let session = Session::new(&arena);
    let g = session.ident("g", ZType::Int, IdentKind::Global);
    let p = session.ident("p", ZType::Int, IdentKind::Param);
    let x = int_local(&session, "x");
    let y = int_local(&session, "y");
    let v = session.ident("v", ZType::Vector, IdentKind::Local);
    let e = int_local(&session, "e");

    let mut func = TestFunc::new("kitchen_sink");
    func.params = vec![p];

    let ast = Stmt::Block(vec![
        // x = p + 1
        Stmt::Assign {
            target: x,
            value: Expr::Bin(BinOp::Add, Box::new(Expr::Id(p)), Box::new(Expr::IntLit(1))),
        },
        // while x < 10 { if x == 5 { break } x = x + 1 }
        Stmt::While {
            cond: Expr::Bin(BinOp::Lt, Box::new(Expr::Id(x)), Box::new(Expr::IntLit(10))),
            body: Box::new(Stmt::Block(vec![
                Stmt::If {
                    cond: Expr::Bin(
                        BinOp::Eq,
                        Box::new(Expr::Id(x)),
                        Box::new(Expr::IntLit(5)),
                    ),
                    then_body: Box::new(Stmt::Break),
                    else_body: None,
                },
                Stmt::Assign {
                    target: x,
                    value: Expr::Bin(
                        BinOp::Add,
                        Box::new(Expr::Id(x)),
                        Box::new(Expr::IntLit(1)),
                    ),
                },
            ])),
        },
        // switch x { case 1, 2: y = 1; case 3: fallthrough; default: y = 2 }
        Stmt::Switch {
            value: Expr::Id(x),
            cases: vec![
                SwitchCase {
                    labels: vec![CaseLabel::Int(1), CaseLabel::Int(2)],
                    body: vec![
                        Stmt::Assign {
                            target: y,
                            value: Expr::IntLit(1),
                        },
                        Stmt::Break,
                    ],
                },
                SwitchCase {
                    labels: vec![CaseLabel::Int(3)],
                    body: vec![Stmt::Fallthrough],
                },
                SwitchCase {
                    labels: Vec::new(),
                    body: vec![
                        Stmt::Assign {
                            target: y,
                            value: Expr::IntLit(2),
                        },
                        Stmt::Break,
                    ],
                },
            ],
            default: Some(2),
        },
        // for e in v { y = y + e; next }
        Stmt::ForEach {
            var: e,
            vector: v,
            body: Box::new(Stmt::Block(vec![
                Stmt::Assign {
                    target: y,
                    value: Expr::Bin(BinOp::Add, Box::new(Expr::Id(y)), Box::new(Expr::Id(e))),
                },
                Stmt::Next,
            ])),
        },
        // g = x
        Stmt::Assign {
            target: g,
            value: Expr::Id(x),
        },
        Stmt::Return(Some(Expr::Id(x))),
    ]);

    let mut reporter = CollectingReporter::new();
    let c = compiler(
        &session,
        func,
        TestProfile {
            globals: vec![g],
            locals: vec![x, y, v, e],
            non_recursive: true,
        },
        TestUseDefs::using([p]),
        ast,
        Options::default(),
        &mut reporter,
    );

    let body = c.compile_body().expect("compiles without errors");
    let len = body.insts().len();
    assert!(len > 0);

    // Density, liveness, resolved branch operands.
    for (i, inst) in body.insts().iter().enumerate() {
        assert_eq!(inst.num, i);
        assert!(inst.live);
        if inst.target.is_some() {
            match inst.operands[inst.target_slot] {
                Operand::Branch(n) => assert!((n as usize) <= len),
                ref other => panic!("unresolved branch operand {other:?}"),
            }
        }
        for operand in &inst.operands {
            if let Operand::Slot(s) = operand {
                assert!((*s as usize) < body.frame_size());
            }
        }
    }

    assert_eq!(body.insts()[0].op, Op::LoadParam);
    assert_eq!(body.num_iters(), 1);
    assert!(body.non_recursive());
    assert_eq!(body.globals().len(), 1);

    // One int switch, concretized onto live final instructions.
    assert_eq!(body.int_cases().len(), 1);
    let table = &body.int_cases()[0];
    assert_eq!(table.len(), 3);
    for &target in table.values() {
        assert!(target < len);
        assert!(body.insts()[target].live);
    }
    assert!(body.uint_cases().is_empty());
    assert!(body.double_cases().is_empty());
    assert!(body.str_cases().is_empty());

    // The loop left its mark.
    assert!(body.insts().iter().any(|i| i.loop_depth > 0));
    assert!(body.insts().iter().any(|i| i.loop_start));
    assert!(body.insts().iter().any(|i| i.op == Op::IterInit));
}

#[test]
fn string_and_double_switches_use_their_own_tables() {
    let arena = Bump::new();
    let session = Session::new(&arena);
    let s = session.ident("s", ZType::String, IdentKind::Local);
    let d = session.ident("d", ZType::Double, IdentKind::Local);
    let y = int_local(&session, "y");

    let ast = Stmt::Block(vec![
        Stmt::Switch {
            value: Expr::Id(s),
            cases: vec![SwitchCase {
                labels: vec![CaseLabel::Str("tcp".to_string())],
                body: vec![
                    Stmt::Assign {
                        target: y,
                        value: Expr::IntLit(1),
                    },
                    Stmt::Break,
                ],
            }],
            default: None,
        },
        Stmt::Switch {
            value: Expr::Id(d),
            cases: vec![SwitchCase {
                labels: vec![CaseLabel::Double(2.5)],
                body: vec![Stmt::Break],
            }],
            default: None,
        },
    ]);

    let mut reporter = CollectingReporter::new();
    let c = compiler(
        &session,
        TestFunc::new("switches"),
        TestProfile {
            locals: vec![s, d, y],
            ..Default::default()
        },
        TestUseDefs::default(),
        ast,
        Options::default(),
        &mut reporter,
    );

    let body = c.compile_body().expect("compiles");
    assert_eq!(body.str_cases().len(), 1);
    assert!(body.str_cases()[0].contains_key("tcp"));
    assert_eq!(body.double_cases().len(), 1);
    assert!(body.double_cases()[0].contains_key(&DoubleKey::from(2.5)));
    for table in body.str_cases() {
        for &t in table.values() {
            assert!(t < body.insts().len());
        }
    }
}

#[test]
fn mixed_case_types_are_rejected() {
    let arena = Bump::new();
    let session = Session::new(&arena);
    let x = int_local(&session, "x");

    let ast = Stmt::Switch {
        value: Expr::Id(x),
        cases: vec![SwitchCase {
            labels: vec![CaseLabel::Int(1), CaseLabel::Str("one".to_string())],
            body: vec![Stmt::Break],
        }],
        default: None,
    };

    let mut reporter = CollectingReporter::new();
    let c = compiler(
        &session,
        TestFunc::new("mixed"),
        TestProfile {
            locals: vec![x],
            ..Default::default()
        },
        TestUseDefs::default(),
        ast,
        Options::default(),
        &mut reporter,
    );

    assert!(c.compile_body().is_none());
    assert!(reporter.errors[0].contains("mix"));
}

#[test]
fn dump_is_pure_and_prints_the_frame() {
    let arena = Bump::new();
    let session = Session::new(&arena);
    let n = int_local(&session, "n");
    let mut reporter = CollectingReporter::new();
    let mut c = compiler(
        &session,
        TestFunc::new("dumped"),
        TestProfile {
            locals: vec![n],
            ..Default::default()
        },
        TestUseDefs::default(),
        Stmt::Block(Vec::new()),
        Options::default(),
        &mut reporter,
    );

    c.builder_mut().emit(Inst::with_operands(
        Op::Const,
        [Operand::Slot(0), Operand::Int(3)],
    ));

    let mut first = String::new();
    c.dump(&mut first).unwrap();
    let mut second = String::new();
    c.dump(&mut second).unwrap();

    assert_eq!(first, second, "dumping must not mutate state");
    assert!(first.contains("frame[0] = n"));
    assert!(first.contains("0: const f0 3"));
}

#[test]
fn dump_option_does_not_disturb_compilation() {
    let arena = Bump::new();
    let session = Session::new(&arena);
    let n = int_local(&session, "n");
    let mut reporter = CollectingReporter::new();
    let c = compiler(
        &session,
        TestFunc::new("dump_opt"),
        TestProfile {
            locals: vec![n],
            ..Default::default()
        },
        TestUseDefs::default(),
        Stmt::Block(vec![Stmt::Assign {
            target: n,
            value: Expr::IntLit(1),
        }]),
        Options {
            dump_code: true,
            ..Default::default()
        },
        &mut reporter,
    );

    let body = c.compile_body().expect("compiles");
    assert!(!body.insts().is_empty());
}
