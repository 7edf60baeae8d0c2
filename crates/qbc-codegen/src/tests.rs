// SPDX-License-Identifier: (MIT OR Apache-2.0)

//! Code generation tests - build syntax trees by hand, compile them, then
//! inspect the IR or run it with the reference evaluator.

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::collections::HashMap;
    use std::rc::Rc;

    use pretty_assertions::assert_eq;
    use qbc_ir::interp::Interpreter;
    use qbc_ir::{FuncBuilder, IrType, Linkage, Module, Signature, Terminator, Value};

    use crate::ast::*;
    use crate::{
        compile_program, CodegenError, CodegenErrorKind, CodegenOptions, Codegen, Context, Emitter, OpResult,
        PrintMode, TypeDescriptor, TypeRef, TypeTable,
    };

    // ── AST construction helpers ────────────────────────────────

    struct Ast {
        ids: RefCell<NodeIdGen>,
        types: TypeTable,
    }

    impl Ast {
        fn new() -> Self {
            Ast { ids: RefCell::new(NodeIdGen::new()), types: TypeTable::with_builtins() }
        }

        fn id(&self) -> NodeId {
            self.ids.borrow_mut().next()
        }

        fn long(&self) -> TypeRef {
            self.types.long()
        }

        fn expr(&self, kind: ExprKind) -> Expr {
            Expr { id: self.id(), kind, span: Span::default() }
        }

        fn num(&self, n: i64) -> Expr {
            self.expr(ExprKind::Number(n))
        }

        fn text(&self, s: &str) -> Expr {
            self.expr(ExprKind::Str(s.to_string()))
        }

        fn name(&self, name: &str) -> Expr {
            self.expr(ExprKind::Name(name.to_string()))
        }

        fn bin(&self, op: MathOp, lhs: Expr, rhs: Expr) -> Expr {
            self.expr(ExprKind::Binary { op, lhs: Box::new(lhs), rhs: Box::new(rhs) })
        }

        fn call(&self, callee: &str, args: Vec<Expr>) -> Expr {
            self.expr(ExprKind::Call { callee: callee.to_string(), args })
        }

        fn stmt(&self, kind: StmtKind) -> Stmt {
            Stmt { id: self.id(), kind, span: Span::default() }
        }

        fn dim(&self, name: &str, ty: TypeRef) -> Stmt {
            self.stmt(StmtKind::Dim(DimStmt { name: name.to_string(), ty }))
        }

        fn assign(&self, target: &str, value: Expr) -> Stmt {
            self.stmt(StmtKind::Assign { target: target.to_string(), value })
        }

        fn ret(&self, value: Option<Expr>) -> Stmt {
            self.stmt(StmtKind::Return(value))
        }

        fn block(&self, stmts: Vec<Stmt>) -> Block {
            Block { id: self.id(), stmts, span: Span::default() }
        }

        fn if_(&self, cond: Expr, then: Vec<Stmt>, otherwise: Option<Vec<Stmt>>) -> Stmt {
            self.stmt(StmtKind::If {
                cond,
                then_block: self.block(then),
                else_block: otherwise.map(|stmts| self.block(stmts)),
            })
        }

        fn for_(&self, var: &str, start: Expr, end: Expr, step: Option<Expr>, body: Vec<Stmt>) -> Stmt {
            self.stmt(StmtKind::For { var: var.to_string(), start, end, step, body: self.block(body) })
        }

        fn print(&self, args: Vec<Expr>, newline: bool) -> Stmt {
            self.stmt(StmtKind::Print(PrintStmt { destination: None, args, newline }))
        }

        fn decl(&self, name: &str, params: &[(&str, TypeRef)], ret: Option<TypeRef>, body: Option<Vec<Stmt>>) -> FunctionDecl {
            FunctionDecl {
                id: self.id(),
                name: name.to_string(),
                linkage: Linkage::Internal,
                params: params
                    .iter()
                    .map(|(name, ty)| Param { id: self.id(), name: name.to_string(), ty: ty.clone(), span: Span::default() })
                    .collect(),
                ret,
                variadic: false,
                body: body.map(|stmts| self.block(stmts)),
                span: Span::default(),
            }
        }

        fn func(&self, name: &str, params: &[(&str, TypeRef)], ret: Option<TypeRef>, body: Vec<Stmt>) -> Stmt {
            self.stmt(StmtKind::Function(self.decl(name, params, ret, Some(body))))
        }

        fn program(&self, stmts: Vec<Stmt>) -> Program {
            Program { body: self.block(stmts) }
        }
    }

    fn compile(program: Program) -> Module {
        match compile_program(program, CodegenOptions::default()) {
            Ok(module) => module,
            Err(errors) => panic!("compilation failed: {:?}", errors),
        }
    }

    fn compile_err(program: Program) -> Vec<CodegenError> {
        match compile_program(program, CodegenOptions::default()) {
            Ok(module) => panic!("expected errors, got:\n{}", module),
            Err(errors) => errors,
        }
    }

    fn run(module: &Module, name: &str, args: &[i64]) -> Option<i64> {
        Interpreter::new(module).call(name, args).unwrap()
    }

    fn block_names(module: &Module, func: &str) -> Vec<String> {
        module
            .function_by_name(func)
            .unwrap()
            .blocks_in_layout()
            .map(|b| b.name.clone())
            .collect()
    }

    fn slot_names(module: &Module, func: &str) -> Vec<String> {
        module.function_by_name(func).unwrap().slots.iter().map(|s| s.name.clone()).collect()
    }

    /// A type that records what code generation does with its storage.
    #[derive(Debug)]
    struct Recorded {
        log: Rc<RefCell<Vec<String>>>,
        names: RefCell<HashMap<Value, String>>,
    }

    impl TypeDescriptor for Recorded {
        fn name(&self) -> &str {
            "recorded"
        }

        fn size(&self) -> u32 {
            8
        }

        fn ir_type(&self) -> IrType {
            IrType::I64
        }

        fn allocate(&self, em: &mut Emitter<'_>, hint: &str) -> OpResult<Value> {
            let slot = em.ir.stack_alloc(IrType::I64, hint);
            self.names.borrow_mut().insert(slot, hint.to_string());
            self.log.borrow_mut().push(format!("allocate {}", hint));
            Ok(slot)
        }

        fn destroy(&self, _em: &mut Emitter<'_>, storage: Value) -> OpResult<()> {
            let name = self.names.borrow().get(&storage).cloned().unwrap_or_default();
            self.log.borrow_mut().push(format!("destroy {}", name));
            Ok(())
        }
    }

    // ═══════════════════════════════════════════════════════════
    // Scopes and declarations
    // ═══════════════════════════════════════════════════════════

    #[test]
    fn teardown_runs_in_reverse_declaration_order() {
        let a = Ast::new();
        let log = Rc::new(RefCell::new(Vec::new()));
        let ty: TypeRef = Rc::new(Recorded { log: log.clone(), names: RefCell::new(HashMap::new()) });
        let program = a.program(vec![
            a.stmt(StmtKind::Block(a.block(vec![
                a.dim("m", ty.clone()),
                a.dim("a", ty.clone()),
                a.dim("z", ty.clone()),
            ]))),
            a.ret(Some(a.num(0))),
        ]);
        compile(program);
        assert_eq!(
            *log.borrow(),
            vec!["allocate m", "allocate a", "allocate z", "destroy z", "destroy a", "destroy m"]
        );
    }

    #[test]
    fn duplicate_declaration_in_one_scope_fails() {
        let a = Ast::new();
        let program = a.program(vec![a.dim("x", a.long()), a.dim("x", a.long())]);
        let errors = compile_err(program);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].kind, CodegenErrorKind::DuplicateSymbol { name: "x".to_string() });
    }

    #[test]
    fn nested_block_may_shadow() {
        let a = Ast::new();
        let program = a.program(vec![
            a.dim("x", a.long()),
            a.assign("x", a.num(1)),
            a.stmt(StmtKind::Block(a.block(vec![a.dim("x", a.long()), a.assign("x", a.num(2))]))),
            a.ret(Some(a.name("x"))),
        ]);
        let module = compile(program);
        assert_eq!(run(&module, "main", &[]), Some(1));
    }

    #[test]
    fn undefined_name_is_reported() {
        let a = Ast::new();
        let errors = compile_err(a.program(vec![a.assign("nope", a.num(1))]));
        assert_eq!(errors[0].kind, CodegenErrorKind::UndefinedSymbol { name: "nope".to_string() });
    }

    #[test]
    fn empty_statement_keeps_insertion_point() {
        let a = Ast::new();
        let mut cg = Codegen::new(CodegenOptions::default());
        let f = cg
            .module
            .declare_function("f", Linkage::Internal, Signature::new(vec![], IrType::Void))
            .unwrap();
        let entry = FuncBuilder::define(&mut cg.module, f, "entrypoint").unwrap().current_block();
        let global = cg.global_context();
        let ctx = Context { function: Some(f), block: Some(entry), ..global };

        let stmt = a.stmt(StmtKind::Block(a.block(vec![a.stmt(StmtKind::Empty)])));
        assert_eq!(cg.gen_stmt(&stmt, ctx).unwrap(), entry);
        assert_eq!(cg.module().function(f).blocks.len(), 1);
    }

    #[test]
    fn statement_outside_function_is_a_contract_violation() {
        let a = Ast::new();
        let mut cg = Codegen::new(CodegenOptions::default());
        let ctx = cg.global_context();
        let err = cg.gen_stmt(&a.stmt(StmtKind::Empty), ctx).unwrap_err();
        assert!(matches!(err.kind, CodegenErrorKind::ContractViolation(_)));
    }

    // ═══════════════════════════════════════════════════════════
    // Control flow
    // ═══════════════════════════════════════════════════════════

    #[test]
    fn if_without_else_has_no_false_block() {
        let a = Ast::new();
        let program = a.program(vec![a.func(
            "sign",
            &[("n", a.long())],
            Some(a.long()),
            vec![
                a.dim("r", a.long()),
                a.if_(a.bin(MathOp::Gt, a.name("n"), a.num(0)), vec![a.assign("r", a.num(1))], None),
                a.ret(Some(a.name("r"))),
            ],
        )]);
        let module = compile(program);

        let names = block_names(&module, "sign");
        assert!(!names.contains(&"cond_false".to_string()));
        let func = module.function_by_name("sign").unwrap();
        let cont = func.blocks_in_layout().find(|b| b.name == "continue").unwrap().id;
        assert_eq!(func.predecessors(cont).len(), 2);

        assert_eq!(run(&module, "sign", &[5]), Some(1));
        assert_eq!(run(&module, "sign", &[-3]), Some(0));
    }

    #[test]
    fn if_else_picks_one_branch() {
        let a = Ast::new();
        let program = a.program(vec![a.func(
            "pick",
            &[("n", a.long())],
            Some(a.long()),
            vec![
                a.dim("r", a.long()),
                a.if_(
                    a.bin(MathOp::Eq, a.name("n"), a.num(2)),
                    vec![a.assign("r", a.num(20))],
                    Some(vec![a.assign("r", a.num(30))]),
                ),
                a.ret(Some(a.name("r"))),
            ],
        )]);
        let module = compile(program);
        assert_eq!(
            block_names(&module, "pick"),
            ["entrypoint", "cond_true", "cond_false", "continue", "after_return", "ret"]
        );
        assert_eq!(run(&module, "pick", &[2]), Some(20));
        assert_eq!(run(&module, "pick", &[7]), Some(30));
    }

    #[test]
    fn comparison_is_minus_one_when_true() {
        let a = Ast::new();
        let program = a.program(vec![a.ret(Some(a.bin(MathOp::Lt, a.num(1), a.num(2))))]);
        let module = compile(program);
        assert_eq!(run(&module, "main", &[]), Some(-1));
    }

    #[test]
    fn for_loop_runs_body_five_times() {
        let a = Ast::new();
        let program = a.program(vec![
            a.dim("i", a.long()),
            a.dim("count", a.long()),
            a.for_(
                "i",
                a.num(1),
                a.num(5),
                Some(a.num(1)),
                vec![a.assign("count", a.bin(MathOp::Add, a.name("count"), a.num(1)))],
            ),
            a.ret(Some(a.bin(
                MathOp::Add,
                a.bin(MathOp::Mul, a.name("count"), a.num(100)),
                a.name("i"),
            ))),
        ]);
        let module = compile(program);
        let names = block_names(&module, "main");
        for name in ["for", "forbody", "forend"] {
            assert!(names.contains(&name.to_string()), "missing block {}", name);
        }
        assert_eq!(run(&module, "main", &[]), Some(506));
    }

    #[test]
    fn while_loop_counts_down() {
        let a = Ast::new();
        let program = a.program(vec![
            a.dim("n", a.long()),
            a.dim("sum", a.long()),
            a.assign("n", a.num(4)),
            a.stmt(StmtKind::While {
                cond: a.name("n"),
                body: a.block(vec![
                    a.assign("sum", a.bin(MathOp::Add, a.name("sum"), a.name("n"))),
                    a.assign("n", a.bin(MathOp::Sub, a.name("n"), a.num(1))),
                ]),
            }),
            a.ret(Some(a.name("sum"))),
        ]);
        let module = compile(program);
        let names = block_names(&module, "main");
        let body = names.iter().position(|n| n == "whileloop").unwrap();
        let end = names.iter().position(|n| n == "whileend").unwrap();
        assert!(end > body);
        assert_eq!(run(&module, "main", &[]), Some(10));
    }

    #[test]
    fn for_loop_with_step_two_visits_every_other_value() {
        let a = Ast::new();
        let program = a.program(vec![
            a.dim("i", a.long()),
            a.dim("count", a.long()),
            a.for_(
                "i",
                a.num(1),
                a.num(9),
                Some(a.num(2)),
                vec![a.assign("count", a.bin(MathOp::Add, a.name("count"), a.num(1)))],
            ),
            a.ret(Some(a.bin(
                MathOp::Add,
                a.bin(MathOp::Mul, a.name("count"), a.num(100)),
                a.name("i"),
            ))),
        ]);
        let module = compile(program);
        // 1, 3, 5, 7, 9; the variable ends one step past the bound
        assert_eq!(run(&module, "main", &[]), Some(511));
    }

    // ═══════════════════════════════════════════════════════════
    // Functions, arguments and RETURN
    // ═══════════════════════════════════════════════════════════

    #[test]
    fn unassigned_argument_has_no_private_slot() {
        let a = Ast::new();
        let program = a.program(vec![a.func(
            "inc",
            &[("a", a.long())],
            Some(a.long()),
            vec![a.ret(Some(a.bin(MathOp::Add, a.name("a"), a.num(1))))],
        )]);
        let module = compile(program);
        assert_eq!(slot_names(&module, "inc"), vec!["retval".to_string()]);
        assert_eq!(run(&module, "inc", &[41]), Some(42));
    }

    #[test]
    fn assigned_argument_gets_exactly_one_private_slot() {
        let a = Ast::new();
        let program = a.program(vec![
            a.func(
                "twice",
                &[("a", a.long())],
                Some(a.long()),
                vec![
                    a.assign("a", a.bin(MathOp::Add, a.name("a"), a.num(1))),
                    a.assign("a", a.bin(MathOp::Mul, a.name("a"), a.num(2))),
                    a.ret(Some(a.name("a"))),
                ],
            ),
            a.dim("x", a.long()),
            a.dim("y", a.long()),
            a.assign("x", a.num(3)),
            a.assign("y", a.call("twice", vec![a.name("x")])),
            a.ret(Some(a.bin(MathOp::Add, a.bin(MathOp::Mul, a.name("x"), a.num(100)), a.name("y")))),
        ]);
        let module = compile(program);
        let slots = slot_names(&module, "twice");
        assert_eq!(slots.iter().filter(|s| *s == "a").count(), 1);
        assert_eq!(run(&module, "twice", &[3]), Some(8));
        // the caller's variable is untouched
        assert_eq!(run(&module, "main", &[]), Some(308));
    }

    #[test]
    fn argument_written_in_one_branch_is_valid_on_the_other() {
        let a = Ast::new();
        let program = a.program(vec![a.func(
            "clamp",
            &[("a", a.long())],
            Some(a.long()),
            vec![
                a.if_(a.bin(MathOp::Gt, a.name("a"), a.num(10)), vec![a.assign("a", a.num(10))], None),
                a.ret(Some(a.name("a"))),
            ],
        )]);
        let module = compile(program);
        assert_eq!(run(&module, "clamp", &[5]), Some(5));
        assert_eq!(run(&module, "clamp", &[50]), Some(10));
    }

    #[test]
    fn argument_decremented_in_while_loop_terminates() {
        let a = Ast::new();
        let program = a.program(vec![a.func(
            "countdown",
            &[("n", a.long())],
            Some(a.long()),
            vec![
                a.dim("k", a.long()),
                a.stmt(StmtKind::While {
                    cond: a.bin(MathOp::Gt, a.name("n"), a.num(0)),
                    body: a.block(vec![
                        a.assign("n", a.bin(MathOp::Sub, a.name("n"), a.num(1))),
                        a.assign("k", a.bin(MathOp::Add, a.name("k"), a.num(1))),
                    ]),
                }),
                a.ret(Some(a.name("k"))),
            ],
        )]);
        let module = compile(program);
        let slots = slot_names(&module, "countdown");
        assert_eq!(slots.iter().filter(|s| *s == "n").count(), 1);
        let result = Interpreter::new(&module).with_step_limit(100_000).call("countdown", &[3]);
        assert_eq!(result.unwrap(), Some(3));
        assert_eq!(run(&module, "countdown", &[0]), Some(0));
    }

    #[test]
    fn argument_may_be_for_loop_variable() {
        let a = Ast::new();
        let program = a.program(vec![
            a.func(
                "tail_sum",
                &[("i", a.long())],
                Some(a.long()),
                vec![
                    a.dim("s", a.long()),
                    a.for_(
                        "i",
                        a.name("i"),
                        a.num(4),
                        None,
                        vec![a.assign("s", a.bin(MathOp::Add, a.name("s"), a.name("i")))],
                    ),
                    a.ret(Some(a.name("s"))),
                ],
            ),
            a.dim("x", a.long()),
            a.assign("x", a.num(2)),
            a.ret(Some(a.bin(
                MathOp::Add,
                a.bin(MathOp::Mul, a.name("x"), a.num(100)),
                a.call("tail_sum", vec![a.name("x")]),
            ))),
        ]);
        let module = compile(program);
        assert_eq!(run(&module, "tail_sum", &[1]), Some(10));
        // the caller's variable is untouched
        assert_eq!(run(&module, "main", &[]), Some(209));
    }

    #[test]
    fn write_to_local_shadowing_argument_leaves_argument_unsaved() {
        let a = Ast::new();
        let program = a.program(vec![a.func(
            "keep",
            &[("a", a.long())],
            Some(a.long()),
            vec![
                a.stmt(StmtKind::Block(a.block(vec![a.dim("a", a.long()), a.assign("a", a.num(5))]))),
                a.ret(Some(a.name("a"))),
            ],
        )]);
        let module = compile(program);
        let slots = slot_names(&module, "keep");
        assert_eq!(slots.iter().filter(|s| *s == "a").count(), 1);
        assert_eq!(run(&module, "keep", &[3]), Some(3));
    }

    #[test]
    fn typed_function_without_return_yields_default() {
        let a = Ast::new();
        let program = a.program(vec![a.func("zero", &[], Some(a.long()), vec![a.dim("x", a.long())])]);
        let module = compile(program);
        let func = module.function_by_name("zero").unwrap();
        let last = func.blocks_in_layout().last().unwrap();
        assert_eq!(
            last.terminator,
            Some(Terminator::Ret { value: Some(Value::iconst(IrType::I64, 0)) })
        );
        assert_eq!(run(&module, "zero", &[]), Some(0));
    }

    #[test]
    fn untyped_function_returns_void() {
        let a = Ast::new();
        let program = a.program(vec![a.func("nothing", &[], None, vec![a.ret(None)])]);
        let module = compile(program);
        let func = module.function_by_name("nothing").unwrap();
        assert_eq!(func.sig.ret, IrType::Void);
        assert_eq!(run(&module, "nothing", &[]), None);
    }

    #[test]
    fn return_listing_shares_one_exit_block() {
        let a = Ast::new();
        let module = compile(a.program(vec![a.ret(Some(a.num(1)))]));
        let main = module.get_function("main").unwrap();
        let expected = "\
define export i64 @main() {
entrypoint.0:
    slot0 = alloca i64 \"retval\"
    store 0, slot0
    store 1, slot0
    br ret.1
after_return.2:
    br ret.1
ret.1:
    v0 = load i64 slot0
    ret v0
}
";
        assert_eq!(module.display_function(main), expected);
    }

    #[test]
    fn return_inside_loop_releases_loop_locals() {
        let a = Ast::new();
        let program = a.program(vec![a.stmt(StmtKind::While {
            cond: a.num(1),
            body: a.block(vec![a.dim("s", a.types.string()), a.ret(Some(a.num(5)))]),
        })]);
        let module = compile(program);
        let mut interp = Interpreter::new(&module);
        assert_eq!(interp.call("main", &[]).unwrap(), Some(5));
        let calls: Vec<_> = interp.extern_calls().iter().map(|c| c.name.as_str()).collect();
        assert_eq!(calls, vec!["brt_string_release"]);
    }

    #[test]
    fn recursion_resolves_own_name() {
        let a = Ast::new();
        let program = a.program(vec![a.func(
            "fact",
            &[("n", a.long())],
            Some(a.long()),
            vec![
                a.if_(a.bin(MathOp::Le, a.name("n"), a.num(1)), vec![a.ret(Some(a.num(1)))], None),
                a.ret(Some(a.bin(
                    MathOp::Mul,
                    a.name("n"),
                    a.call("fact", vec![a.bin(MathOp::Sub, a.name("n"), a.num(1))]),
                ))),
            ],
        )]);
        let module = compile(program);
        assert_eq!(run(&module, "fact", &[5]), Some(120));
    }

    #[test]
    fn prototype_may_precede_definition() {
        let a = Ast::new();
        let program = a.program(vec![
            a.stmt(StmtKind::Function(a.decl("seven", &[], Some(a.long()), None))),
            a.func("seven", &[], Some(a.long()), vec![a.ret(Some(a.num(7)))]),
            a.ret(Some(a.call("seven", vec![]))),
        ]);
        let module = compile(program);
        assert_eq!(run(&module, "main", &[]), Some(7));
    }

    #[test]
    fn second_definition_is_a_duplicate() {
        let a = Ast::new();
        let program = a.program(vec![
            a.func("f", &[], Some(a.long()), vec![a.ret(Some(a.num(1)))]),
            a.func("f", &[], Some(a.long()), vec![a.ret(Some(a.num(1)))]),
        ]);
        let errors = compile_err(program);
        assert_eq!(errors[0].kind, CodegenErrorKind::DuplicateSymbol { name: "f".to_string() });
    }

    #[test]
    fn integer_operands_are_widened_and_narrowed() {
        let a = Ast::new();
        let program = a.program(vec![
            a.dim("i", a.types.integer()),
            a.assign("i", a.num(5)),
            a.ret(Some(a.bin(MathOp::Add, a.name("i"), a.num(1)))),
        ]);
        let module = compile(program);
        assert_eq!(run(&module, "main", &[]), Some(6));
    }

    #[test]
    fn return_errors_are_reported() {
        let a = Ast::new();
        let program = a.program(vec![
            a.func("proc", &[], None, vec![a.ret(Some(a.num(1)))]),
            a.func("value", &[], Some(a.long()), vec![a.ret(None)]),
        ]);
        let errors = compile_err(program);
        assert_eq!(
            errors.into_iter().map(|e| e.kind).collect::<Vec<_>>(),
            vec![
                CodegenErrorKind::UnexpectedReturnValue { function: "proc".to_string() },
                CodegenErrorKind::MissingReturnValue { function: "value".to_string() },
            ]
        );
    }

    #[test]
    fn call_errors_are_reported() {
        let a = Ast::new();
        let program = a.program(vec![
            a.func("one", &[("x", a.long())], Some(a.long()), vec![a.ret(Some(a.name("x")))]),
            a.dim("v", a.long()),
            a.assign("v", a.call("one", vec![])),
        ]);
        let errors = compile_err(program);
        assert_eq!(
            errors[0].kind,
            CodegenErrorKind::ArityMismatch { name: "one".to_string(), expected: 1, found: 0 }
        );

        let a = Ast::new();
        let program = a.program(vec![a.dim("v", a.long()), a.stmt(StmtKind::Expr(a.call("v", vec![])))]);
        let errors = compile_err(program);
        assert_eq!(errors[0].kind, CodegenErrorKind::NotCallable { name: "v".to_string() });
    }

    #[test]
    fn nested_function_is_rejected() {
        let a = Ast::new();
        let program = a.program(vec![a.func(
            "outer",
            &[],
            None,
            vec![a.func("inner", &[], None, vec![])],
        )]);
        let errors = compile_err(program);
        assert!(matches!(errors[0].kind, CodegenErrorKind::ContractViolation(_)));
    }

    // ═══════════════════════════════════════════════════════════
    // PRINT and strings
    // ═══════════════════════════════════════════════════════════

    #[test]
    fn print_format_follows_argument_types() {
        let a = Ast::new();
        let program = a.program(vec![
            a.dim("i", a.types.integer()),
            a.print(vec![a.num(1), a.text("hi"), a.name("i")], true),
            a.ret(Some(a.num(0))),
        ]);
        let module = compile(program);
        let mut interp = Interpreter::new(&module);
        interp.call("main", &[]).unwrap();
        let call = &interp.extern_calls()[0];
        assert_eq!(call.name, "printf");
        assert_eq!(interp.string_at(call.args[0]), Some("%ld\t%s\t%d\t\n"));
        assert_eq!(interp.string_at(call.args[2]), Some("hi"));
    }

    #[test]
    fn runtime_print_passes_destination() {
        let a = Ast::new();
        let stmt = a.stmt(StmtKind::Print(PrintStmt {
            destination: Some(a.num(3)),
            args: vec![a.num(9)],
            newline: false,
        }));
        let program = a.program(vec![stmt, a.ret(Some(a.num(0)))]);
        let options = CodegenOptions { print_mode: PrintMode::Runtime, ..CodegenOptions::default() };
        let module = compile_program(program, options).unwrap();
        let mut interp = Interpreter::new(&module);
        interp.call("main", &[]).unwrap();
        let call = &interp.extern_calls()[0];
        assert_eq!(call.name, "brt_print");
        assert_eq!(call.args[0], 3);
        assert_eq!(interp.string_at(call.args[1]), Some("%ld\t"));
        assert_eq!(call.args[2], 9);
    }

    #[test]
    fn printing_a_procedure_result_is_rejected() {
        let a = Ast::new();
        let program = a.program(vec![
            a.func("proc", &[], None, vec![]),
            a.print(vec![a.call("proc", vec![])], true),
        ]);
        let errors = compile_err(program);
        assert_eq!(
            errors[0].kind,
            CodegenErrorKind::UnsupportedPrintArgument { ty: "void".to_string(), size: 0 }
        );
    }

    #[test]
    fn string_variable_is_assigned_then_released() {
        let a = Ast::new();
        let program = a.program(vec![
            a.dim("s", a.types.string()),
            a.assign("s", a.text("x")),
            a.ret(Some(a.num(0))),
        ]);
        let module = compile(program);
        let mut interp = Interpreter::new(&module);
        interp.call("main", &[]).unwrap();
        let calls: Vec<_> = interp.extern_calls().iter().map(|c| c.name.as_str()).collect();
        assert_eq!(calls, vec!["brt_string_assign", "brt_string_release"]);
    }

    #[test]
    fn string_subtraction_is_unsupported() {
        let a = Ast::new();
        let program = a.program(vec![a.stmt(StmtKind::Expr(a.bin(MathOp::Sub, a.text("a"), a.text("b"))))]);
        let errors = compile_err(program);
        assert_eq!(
            errors[0].kind,
            CodegenErrorKind::UnsupportedOperator { op: "-".to_string(), ty: "string".to_string() }
        );
    }

    #[test]
    fn mixing_string_and_number_is_a_type_mismatch() {
        let a = Ast::new();
        let program = a.program(vec![a.dim("n", a.long()), a.assign("n", a.text("x"))]);
        let errors = compile_err(program);
        assert_eq!(
            errors[0].kind,
            CodegenErrorKind::TypeMismatch { expected: "long".to_string(), found: "string".to_string() }
        );
    }

    #[test]
    fn errors_of_several_functions_are_collected() {
        let a = Ast::new();
        let program = a.program(vec![
            a.func("f", &[], None, vec![a.assign("missing", a.num(1))]),
            a.func("g", &[], None, vec![a.ret(None)]),
            a.func("h", &[], None, vec![a.stmt(StmtKind::Expr(a.name("gone")))]),
        ]);
        let errors = compile_err(program);
        assert_eq!(errors.len(), 2);
    }
}
