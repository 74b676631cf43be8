//! End-to-end behaviour of the front end: tokenizing, parsing, name
//! resolution and diagnostic output.

use terra_core::{
    Ast, BinaryOp, Diagnostics, Frontend, FrontendConfig, LiteralValue, NodeId, NodeKind, ScopeId,
    Stage, SymbolKind, TokenKind,
};

fn compile(source: &str) -> (Ast, Diagnostics) {
    let (ast, diagnostics) = Frontend::default().compile(source, "test.tr");
    (ast.expect("no fatal diagnostic"), diagnostics)
}

fn flushed(diagnostics: &Diagnostics) -> String {
    let mut out = Vec::new();
    diagnostics.flush(&mut out).unwrap();
    String::from_utf8(out).unwrap().trim_end().to_string()
}

fn messages(diagnostics: &Diagnostics) -> Vec<String> {
    diagnostics.iter().map(|d| d.message.clone()).collect()
}

fn body(ast: &Ast, function: NodeId) -> Vec<NodeId> {
    let NodeKind::FunctionDecl(func) = &ast.node(function).kind else {
        panic!("expected function, found {}", ast.node(function).kind.label());
    };
    let NodeKind::Block(block) = &ast.node(func.body.unwrap()).kind else {
        panic!("expected block");
    };
    ast.list(block.statements).to_vec()
}

#[test]
fn test_add_function_end_to_end() {
    let (ast, diagnostics) = compile("func add(i32: a, b): i32 { return a + b }");
    assert_eq!(diagnostics.error_count(), 0);

    assert!(matches!(ast.node(ast.root).kind, NodeKind::Program { .. }));
    assert_eq!(ast.functions().len(), 1);

    let add = ast.functions()[0];
    assert_eq!(ast.name_text(add), Some("add"));
    let NodeKind::FunctionDecl(func) = &ast.node(add).kind else {
        panic!("expected function");
    };

    let groups = ast.list(func.params);
    assert_eq!(groups.len(), 1);
    let NodeKind::ParamGroup(group) = &ast.node(groups[0]).kind else {
        panic!("expected param group");
    };
    assert_eq!(ast.name_text(group.ty), Some("i32"));
    let params: Vec<_> = ast
        .list(group.names)
        .iter()
        .map(|&n| ast.name_text(n).unwrap())
        .collect();
    assert_eq!(params, ["a", "b"]);

    let returns: Vec<_> = ast
        .list(func.return_types)
        .iter()
        .map(|&n| ast.name_text(n).unwrap())
        .collect();
    assert_eq!(returns, ["i32"]);

    let statements = body(&ast, add);
    assert_eq!(statements.len(), 1);
    let NodeKind::Return { values } = &ast.node(statements[0]).kind else {
        panic!("expected return");
    };
    let values = ast.list(*values);
    assert_eq!(values.len(), 1);
    let NodeKind::Binary(binary) = &ast.node(values[0]).kind else {
        panic!("expected binary");
    };
    assert_eq!(binary.op, BinaryOp::Add);
    assert_eq!(ast.name_text(binary.left), Some("a"));
    assert_eq!(ast.name_text(binary.right), Some("b"));

    for operand in [binary.left, binary.right] {
        let symbol = ast.identifier(operand).unwrap().symbol.unwrap();
        assert_eq!(ast.scopes.symbol(symbol).kind, SymbolKind::Parameter);
    }
}

#[test]
fn test_forward_reference_resolves() {
    let (ast, diagnostics) =
        compile("func a(): i32 { return b() } func b(): i32 { return 0 }");
    assert!(diagnostics.is_empty(), "{:?}", messages(&diagnostics));

    let statements = body(&ast, ast.functions()[0]);
    let NodeKind::Return { values } = &ast.node(statements[0]).kind else {
        panic!("expected return");
    };
    let NodeKind::Call(call) = &ast.node(ast.list(*values)[0]).kind else {
        panic!("expected call");
    };
    let symbol = ast.identifier(call.callee).unwrap().symbol.unwrap();
    let symbol = ast.scopes.symbol(symbol);
    assert_eq!(symbol.kind, SymbolKind::Function);
    // Backfilled with the later declaration.
    assert_eq!(symbol.decl, Some(ast.functions()[1]));
}

#[test]
fn test_redeclaration_reports_once_and_keeps_symbol() {
    let (ast, diagnostics) = compile("func f(): void { var i32: x; var i32: x; x = 1 }");
    assert_eq!(diagnostics.error_count(), 1);
    assert_eq!(messages(&diagnostics), ["Redeclaration of variable: 'x'"]);
    assert_eq!(diagnostics.iter().next().unwrap().code, "P003");

    let statements = body(&ast, ast.functions()[0]);
    let NodeKind::Assign(assign) = &ast.node(statements[2]).kind else {
        panic!("expected assignment");
    };
    let target = ast.identifier(ast.list(assign.targets)[0]).unwrap();
    let symbol = ast.scopes.symbol(target.symbol.unwrap());
    assert_eq!(symbol.kind, SymbolKind::Variable);
    assert_eq!(symbol.decl, Some(statements[1]));
}

#[test]
fn test_panic_mode_is_bounded_to_one_statement() {
    let source = "func f(): i32 {
    var i32 x;
    var i32: y;
    return y
}";
    let (ast, diagnostics) = compile(source);

    assert_eq!(diagnostics.error_count(), 1);
    assert_eq!(
        messages(&diagnostics),
        ["Expected ':' after variable type, found identifier 'x'"]
    );

    let statements = body(&ast, ast.functions()[0]);
    let labels: Vec<_> = statements
        .iter()
        .map(|&s| ast.node(s).kind.label())
        .collect();
    assert_eq!(labels, ["VarDecl", "VarDecl", "Return"]);
}

#[test]
fn test_recovery_continues_with_next_function() {
    let source = "func broken(: i32 { return 1 }
func ok(): i32 { return 2 }";
    let (ast, diagnostics) = compile(source);

    assert!(diagnostics.has_errors());
    assert_eq!(ast.functions().len(), 2);
    assert_eq!(ast.name_text(ast.functions()[1]), Some("ok"));
    assert_eq!(body(&ast, ast.functions()[1]).len(), 1);
}

#[test]
fn test_block_scopes_nest_under_enclosing_scope() {
    let source = "func f(i32: a): void { var i32: b; { var i32: c; { c = a } } }";
    let (ast, diagnostics) = compile(source);
    assert!(diagnostics.is_empty(), "{:?}", messages(&diagnostics));

    fn check(ast: &Ast, node: NodeId, enclosing: ScopeId) {
        let inner = match &ast.node(node).kind {
            NodeKind::FunctionDecl(func) => {
                assert_eq!(ast.scopes.parent(func.scope), Some(enclosing));
                func.scope
            }
            NodeKind::Block(block) => {
                assert_eq!(ast.scopes.parent(block.scope), Some(enclosing));
                block.scope
            }
            _ => enclosing,
        };
        for child in ast.children(node) {
            check(ast, child, inner);
        }
    }
    check(&ast, ast.root, ast.global_scope);
    assert_eq!(ast.scopes.parent(ast.global_scope), None);
}

#[test]
fn test_builtin_types_seeded_without_declaration() {
    let (ast, _) = compile("");
    for builtin in ["i8", "i16", "i32", "i64", "u8", "u16", "u32", "u64", "bool", "void"] {
        let name = ast.interner.get(builtin).unwrap();
        let symbol = ast
            .scopes
            .lookup(&ast.interner, ast.global_scope, name)
            .unwrap();
        assert_eq!(ast.scopes.symbol(symbol).decl, None);
    }
}

#[test]
fn test_numeric_literals() {
    let frontend = Frontend::default();

    let mut diagnostics = Diagnostics::new();
    let tokens = frontend.tokenize("42 3.5", "num.tr", &mut diagnostics).unwrap();
    assert_eq!(tokens[0].kind, TokenKind::Integer);
    assert_eq!(tokens[0].value, Some(LiteralValue::Integer(42)));
    assert_eq!(tokens[1].kind, TokenKind::Float);
    assert_eq!(tokens[1].value, Some(LiteralValue::Float(3.5)));
    assert!(diagnostics.is_empty());

    let long = "9".repeat(200);
    let mut diagnostics = Diagnostics::new();
    frontend.tokenize(&long, "num.tr", &mut diagnostics).unwrap();
    assert_eq!(diagnostics.error_count(), 1);
    let diagnostic = diagnostics.iter().next().unwrap();
    assert_eq!(diagnostic.stage, Stage::Lexer);
    assert_eq!(diagnostic.code, "L002");
}

#[test]
fn test_flushed_diagnostics_are_ordered_and_positioned() {
    let source = "func main(): i32 {
    var i32: x;
    var i32: x;
    y = 1;
    return x @ 2
}";
    let (_, diagnostics) = Frontend::default().compile(source, "demo.tr");

    insta::assert_snapshot!(flushed(&diagnostics), @r"
    [ERROR] demo.tr:5:14: unexpected character '@'
    [ERROR] demo.tr:3:14: Redeclaration of variable: 'x'
    [ERROR] demo.tr:4:5: Undeclared identifier: 'y'
    ");
}

#[test]
fn test_error_limit_summary_line() {
    let config = FrontendConfig {
        error_limit: Some(2),
        ..FrontendConfig::default()
    };
    let (_, diagnostics) =
        Frontend::new(config).compile("func f(): i32 { return a + b + c + d }", "limit.tr");

    assert_eq!(diagnostics.error_count(), 4);
    insta::assert_snapshot!(flushed(&diagnostics), @r"
    [ERROR] limit.tr:1:24: Undeclared identifier: 'a'
    [ERROR] limit.tr:1:28: Undeclared identifier: 'b'
    [INFO] 2 further errors suppressed
    ");
}

#[test]
fn test_missing_function_name_does_not_define() {
    let (ast, diagnostics) = compile("func (): void { }");
    assert_eq!(
        messages(&diagnostics),
        ["Expected function name, found '('"]
    );
    assert_eq!(ast.functions().len(), 1);
    assert_eq!(ast.name_text(ast.functions()[0]), Some(""));
}

#[test]
fn test_clean_program_resolves_every_identifier() {
    let source = "func main(): i32 { x: i32 = twice(20); return x + 2 }
func twice(i64: v): i64 { w: i64 = v + v; return w }";
    let (ast, diagnostics) = compile(source);
    assert!(diagnostics.is_empty(), "{:?}", messages(&diagnostics));

    let identifiers: Vec<_> = ast
        .descendants()
        .into_iter()
        .filter_map(|id| ast.identifier(id))
        .collect();
    assert!(identifiers.len() > 10);
    assert!(identifiers.iter().all(|ident| ident.symbol.is_some()));
}

#[test]
fn test_release_tears_down_arena() {
    let (mut ast, _) = compile("func f(): void { }");
    assert!(ast.arena.node_count() > 0);
    ast.release();
    ast.release();
    assert!(ast.arena.is_released());
    assert_eq!(ast.arena.node_count(), 0);
}

#[test]
fn test_prescan_skips_nested_braces_and_functions() {
    let source = "func a(): i32 { { { } } func inner(): i32 { return 1 } return c() }
func c(): i32 { return inner() }";
    let (ast, diagnostics) = compile(source);
    assert_eq!(messages(&diagnostics), ["Undeclared identifier: 'inner'"]);
    assert_eq!(ast.functions().len(), 2);

    let c = ast.interner.get("c").unwrap();
    let symbol = ast
        .scopes
        .lookup_current(&ast.interner, ast.global_scope, c)
        .unwrap();
    let symbol = ast.scopes.symbol(symbol);
    assert_eq!(symbol.kind, SymbolKind::Function);
    assert_eq!(symbol.decl, Some(ast.functions()[1]));

    let inner = ast.interner.get("inner").unwrap();
    assert!(ast
        .scopes
        .lookup_current(&ast.interner, ast.global_scope, inner)
        .is_none());
}

#[test]
fn test_deep_nesting_compiles_without_overflow() {
    let depth = 100_000;
    let source = format!(
        "func f(): i32 {{ {}return {}1{}{} }}",
        "{".repeat(depth),
        "(".repeat(depth),
        ")".repeat(depth),
        "}".repeat(depth)
    );
    let (ast, diagnostics) = compile(&source);
    assert!(diagnostics.is_empty(), "{:?}", messages(&diagnostics));
    assert_eq!(ast.descendants().len(), depth + 7);
}
