//! Debug dumps for tokens, the AST and the scope chain.

use colored::Colorize;
use serde_json::{json, Map, Value};
use terra_core::stack::ensure_sufficient_stack;
use terra_core::{Ast, NodeId, NodeKind, Token};

pub fn tokens_human(tokens: &[Token]) -> String {
    let mut out = String::new();
    for token in tokens {
        let position = format!("{}:{}", token.span.start.line, token.span.start.column);
        let mut line = format!("{:>7}  {:<20}", position, format!("{:?}", token.kind));
        if !token.text.is_empty() {
            line.push_str(&format!(" {:?}", token.text));
        }
        if let Some(ref value) = token.value {
            line.push_str(&format!(" = {:?}", value));
        }
        out.push_str(line.trim_end());
        out.push('\n');
    }
    out
}

pub fn tokens_json(tokens: &[Token]) -> serde_json::Result<String> {
    serde_json::to_string_pretty(tokens)
}

/// Indented tree, one node per line.
pub fn ast_tree(ast: &Ast) -> String {
    let mut out = String::new();
    write_tree(ast, ast.root, 0, &mut out);
    out
}

fn write_tree(ast: &Ast, id: NodeId, depth: usize, out: &mut String) {
    ensure_sufficient_stack(|| write_tree_node(ast, id, depth, out))
}

fn write_tree_node(ast: &Ast, id: NodeId, depth: usize, out: &mut String) {
    let node = ast.node(id);
    out.push_str(&"  ".repeat(depth));
    out.push_str(&node.kind.label().cyan().to_string());
    let detail = node_detail(ast, id);
    if !detail.is_empty() {
        out.push(' ');
        out.push_str(&detail);
    }
    out.push_str(
        &format!(" @{}:{}", node.span.start.line, node.span.start.column)
            .dimmed()
            .to_string(),
    );
    out.push('\n');

    for child in ast.children(id) {
        write_tree(ast, child, depth + 1, out);
    }
}

fn node_detail(ast: &Ast, id: NodeId) -> String {
    match &ast.node(id).kind {
        NodeKind::Identifier(ident) => {
            let text = ast.interner.resolve(ident.name);
            match ident.symbol {
                Some(symbol) => format!("{} -> {}", text, ast.scopes.symbol(symbol).kind),
                None => format!("{} {}", text, "(unresolved)".red()),
            }
        }
        NodeKind::IntegerLiteral(value) => value.to_string(),
        NodeKind::Binary(binary) => binary.op.symbol().to_string(),
        NodeKind::FunctionDecl(func) => ast.name_text(func.name).unwrap_or_default().to_string(),
        NodeKind::Block(block) => format!("scope#{}", block.scope.index()),
        _ => String::new(),
    }
}

/// Pretty-printed JSON, written node by node so that deeply nested trees
/// never become a deeply nested `Value`.
pub fn ast_json(ast: &Ast) -> serde_json::Result<String> {
    let mut out = String::new();
    write_json(ast, ast.root, 0, &mut out)?;
    Ok(out)
}

fn write_json(ast: &Ast, id: NodeId, depth: usize, out: &mut String) -> serde_json::Result<()> {
    ensure_sufficient_stack(|| {
        let pad = "  ".repeat(depth + 1);
        out.push('{');
        for (i, (key, value)) in node_fields(ast, id).iter().enumerate() {
            if i > 0 {
                out.push(',');
            }
            out.push('\n');
            out.push_str(&pad);
            out.push_str(&serde_json::to_string(key)?);
            out.push_str(": ");
            let text = serde_json::to_string_pretty(value)?;
            out.push_str(&text.replace('\n', &format!("\n{pad}")));
        }

        let children = ast.children(id);
        if !children.is_empty() {
            out.push_str(",\n");
            out.push_str(&pad);
            out.push_str("\"children\": [");
            for (i, child) in children.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push('\n');
                out.push_str(&pad);
                out.push_str("  ");
                write_json(ast, child, depth + 2, out)?;
            }
            out.push('\n');
            out.push_str(&pad);
            out.push(']');
        }

        out.push('\n');
        out.push_str(&"  ".repeat(depth));
        out.push('}');
        Ok(())
    })
}

/// The scalar fields of one node; children are written separately.
fn node_fields(ast: &Ast, id: NodeId) -> Map<String, Value> {
    let node = ast.node(id);
    let mut fields = Map::new();
    fields.insert("id".into(), json!(id.index()));
    fields.insert("kind".into(), json!(node.kind.label()));
    fields.insert("span".into(), json!(node.span));
    match &node.kind {
        NodeKind::Identifier(ident) => {
            fields.insert("name".into(), json!(ast.interner.resolve(ident.name)));
            fields.insert("symbol".into(), json!(ident.symbol.map(|s| s.index())));
        }
        NodeKind::IntegerLiteral(v) => {
            fields.insert("value".into(), json!(v));
        }
        NodeKind::Binary(binary) => {
            fields.insert("op".into(), json!(binary.op.symbol()));
        }
        NodeKind::FunctionDecl(func) => {
            fields.insert("scope".into(), json!(func.scope.index()));
        }
        NodeKind::Block(block) => {
            fields.insert("scope".into(), json!(block.scope.index()));
        }
        _ => {}
    }
    fields
}

/// Every scope in creation order with the symbols defined directly in it.
pub fn scopes(ast: &Ast) -> String {
    let mut out = String::new();
    for scope in ast.scopes.scope_ids() {
        let parent = match ast.scopes.parent(scope) {
            Some(parent) => format!("parent scope#{}", parent.index()),
            None => "global".to_string(),
        };
        out.push_str(&format!(
            "{} ({})\n",
            format!("scope#{}", scope.index()).bold(),
            parent
        ));

        let mut symbols = ast.scopes.symbols_in(scope);
        symbols.sort();
        for id in symbols {
            let symbol = ast.scopes.symbol(id);
            let decl = match symbol.decl {
                Some(node) => {
                    let span = ast.node(node).span;
                    format!("declared at {}:{}", span.start.line, span.start.column)
                }
                None => "builtin".dimmed().to_string(),
            };
            out.push_str(&format!(
                "  {:<12} {:<10} {}\n",
                ast.interner.resolve(symbol.name),
                symbol.kind.to_string(),
                decl
            ));
        }
    }
    out
}
