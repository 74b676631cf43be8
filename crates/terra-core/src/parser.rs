//! Parser for the Terra language.
//!
//! Recursive descent over the token sequence with name resolution done
//! inline: every identifier use is interned and looked up as soon as it is
//! parsed, every declaration is checked against the active scope before it
//! is defined. Syntax errors put the parser in panic mode; the block loop
//! resynchronises at the next statement boundary.

use crate::arena::{AstArena, NodeId};
use crate::ast::*;
use crate::config::FrontendConfig;
use crate::diagnostics::{Diagnostic, Diagnostics, Stage};
use crate::intern::{Interner, Name};
use crate::lexer::{Token, TokenKind};
use crate::scope::{ScopeId, ScopeTable, SymbolId, SymbolKind};
use crate::span::Span;
use crate::stack::ensure_sufficient_stack;

const PARAMS_CAPACITY: usize = 4;
const NAMES_CAPACITY: usize = 4;
const ARGS_CAPACITY: usize = 4;
const RETURN_TYPES_CAPACITY: usize = 2;
const RETURN_VALUES_CAPACITY: usize = 2;
const TARGETS_CAPACITY: usize = 2;
const STATEMENTS_CAPACITY: usize = 8;
const PROGRAM_CAPACITY: usize = 4;

/// What a statement starting with an identifier turns out to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementShape {
    /// `x: i32 = ...`
    ShortDecl,
    /// `a, b = ...`
    Assign,
    /// Anything else, parsed as an expression.
    Expression,
}

/// Classify the statement starting at `start` without consuming anything.
///
/// Scans over a run of identifiers and commas: a `:` means a short
/// declaration, a `=` means an assignment, anything else an expression.
pub fn classify_statement(tokens: &[Token], start: usize) -> StatementShape {
    for token in tokens.iter().skip(start) {
        match token.kind {
            TokenKind::Colon => return StatementShape::ShortDecl,
            TokenKind::Assign => return StatementShape::Assign,
            TokenKind::Identifier | TokenKind::Comma => continue,
            _ => return StatementShape::Expression,
        }
    }
    StatementShape::Expression
}

/// Parser for the Terra language.
pub struct Parser<'a> {
    tokens: &'a [Token],
    /// Stands in for a missing trailing `Eof`.
    eof: Token,
    pos: usize,
    panic_mode: bool,
    file: &'a str,
    diagnostics: &'a mut Diagnostics,
    arena: AstArena,
    interner: Interner,
    scopes: ScopeTable,
    /// Innermost scope last. Never empty: the global scope is at the bottom.
    scope_stack: Vec<ScopeId>,
    global_scope: ScopeId,
}

impl<'a> Parser<'a> {
    /// `tokens` normally ends with an `Eof` token, as produced by the lexer.
    /// Reading past the end of the slice behaves as if one were there.
    pub fn new(
        tokens: &'a [Token],
        file: &'a str,
        config: &FrontendConfig,
        diagnostics: &'a mut Diagnostics,
    ) -> Self {
        let mut interner = Interner::with_buckets(config.intern_buckets);
        let mut scopes = ScopeTable::with_bucket_count(config.scope_buckets);
        let global_scope = scopes.new_scope(None);
        scopes.seed_builtins(&mut interner, global_scope);

        let end = tokens.last().map_or(Span::default(), |t| Span::point(t.span.end));

        Self {
            tokens,
            eof: Token::new(TokenKind::Eof, "", end),
            pos: 0,
            panic_mode: false,
            file,
            diagnostics,
            arena: AstArena::with_page_size(config.arena_page_size),
            interner,
            scopes,
            scope_stack: vec![global_scope],
            global_scope,
        }
    }

    /// Parse the entire program.
    pub fn parse(mut self) -> Ast {
        let start_span = self.current_span();

        self.declare_functions();

        let functions = self.arena.alloc_list(PROGRAM_CAPACITY);
        while !self.is_at_end() {
            if self.check(TokenKind::Func) {
                self.panic_mode = false;
                let function = self.parse_function();
                self.arena.push(functions, function);
                self.panic_mode = false;
            } else {
                if !self.panic_mode {
                    let token = self.current();
                    if token.kind != TokenKind::Error {
                        self.error(
                            "P005",
                            format!("Expected 'func' at top level, found {}", token.describe()),
                            token.span,
                        );
                    }
                    self.panic_mode = true;
                }
                self.advance();
            }
        }

        let span = start_span.merge(&self.current_span());
        let root = self.arena.alloc(Node::new(NodeKind::Program { functions }, span));

        tracing::debug!(
            file = self.file,
            nodes = self.arena.node_count(),
            lists = self.arena.list_count(),
            scopes = self.scopes.scope_count(),
            symbols = self.scopes.symbol_count(),
            "parsed program"
        );

        Ast {
            root,
            arena: self.arena,
            interner: self.interner,
            scopes: self.scopes,
            global_scope: self.global_scope,
        }
    }

    /// Register every top-level function name before the full parse so that
    /// calls may precede definitions. Leaves the position unchanged.
    fn declare_functions(&mut self) {
        let start = self.pos;
        let mut declared = 0usize;

        while !self.is_at_end() {
            if !self.check(TokenKind::Func) {
                self.advance();
                continue;
            }
            self.advance();
            if !self.check(TokenKind::Identifier) {
                continue;
            }

            let name_token = self.advance();
            let name = self.interner.intern(&name_token.text);
            if self
                .scopes
                .lookup_current(&self.interner, self.global_scope, name)
                .is_none()
            {
                self.scopes
                    .define(&self.interner, self.global_scope, name, SymbolKind::Function, None);
                declared += 1;
            }

            while !self.is_at_end() && !self.check(TokenKind::LBrace) {
                self.advance();
            }
            self.skip_balanced_braces();
        }

        tracing::debug!(declared, "pre-declared top-level functions");
        self.pos = start;
    }

    /// Skip from a `{` to just past its matching `}`.
    fn skip_balanced_braces(&mut self) {
        let mut depth = 0usize;
        while !self.is_at_end() {
            match self.current().kind {
                TokenKind::LBrace => depth += 1,
                TokenKind::RBrace => depth = depth.saturating_sub(1),
                _ => {}
            }
            self.advance();
            if depth == 0 {
                break;
            }
        }
    }

    /// `func NAME '(' [group {',' group}] ')' ':' returnTypes block`
    fn parse_function(&mut self) -> NodeId {
        let start_span = self.current_span();
        self.consume(TokenKind::Func, "'func'");

        let name_token = self.consume(TokenKind::Identifier, "function name");
        let (name, name_span) = self.name_of(name_token.as_ref());
        let name_node = self.arena.alloc(Node::new(
            NodeKind::Identifier(Identifier { name, symbol: None }),
            name_span,
        ));

        let outer_scope = self.current_scope();
        let function_scope = self.scopes.new_scope(Some(outer_scope));
        let params = self.arena.alloc_list(PARAMS_CAPACITY);
        let return_types = self.arena.alloc_list(RETURN_TYPES_CAPACITY);
        let node = self.arena.alloc(Node::new(
            NodeKind::FunctionDecl(FunctionDecl {
                name: name_node,
                params,
                return_types,
                body: None,
                scope: function_scope,
            }),
            start_span,
        ));

        if name != Name::EMPTY {
            let symbol = self.declare_function(name, name_span, node);
            if let NodeKind::Identifier(ident) = &mut self.arena[name_node].kind {
                ident.symbol = Some(symbol);
            }
        }

        self.consume(TokenKind::LParen, "'(' after function name");
        self.push_scope(function_scope);

        if !self.check(TokenKind::RParen) && !self.is_at_end() {
            loop {
                let group = self.parse_param_group();
                self.arena.push(params, group);
                if !self.match_kind(TokenKind::Comma) {
                    break;
                }
            }
        }

        self.consume(TokenKind::RParen, "')' after parameters");
        self.consume(TokenKind::Colon, "':' before return types");

        if self.match_kind(TokenKind::LParen) {
            loop {
                let ty = self.parse_type_name();
                self.arena.push(return_types, ty);
                if !self.match_kind(TokenKind::Comma) {
                    break;
                }
            }
            self.consume(TokenKind::RParen, "')' after return types");
        } else {
            let ty = self.parse_type_name();
            self.arena.push(return_types, ty);
        }

        let body = self.parse_block();
        self.pop_scope(outer_scope);

        let span = start_span.merge(&self.previous_span());
        let record = &mut self.arena[node];
        record.span = span;
        if let NodeKind::FunctionDecl(func) = &mut record.kind {
            func.body = Some(body);
        }
        node
    }

    /// Define a function in the active scope, backfilling a forward
    /// declaration left by the pre-scan when there is one.
    fn declare_function(&mut self, name: Name, span: Span, node: NodeId) -> SymbolId {
        let scope = self.current_scope();
        let existing = self.scopes.lookup_current(&self.interner, scope, name);

        match existing.map(|id| (id, self.scopes.symbol(id).clone())) {
            Some((id, symbol)) if symbol.kind == SymbolKind::Function && symbol.decl.is_none() => {
                self.scopes.set_decl(id, node);
                id
            }
            Some(_) => {
                self.error(
                    "P003",
                    format!("Redeclaration of function: '{}'", self.interner.resolve(name)),
                    span,
                );
                self.scopes
                    .define(&self.interner, scope, name, SymbolKind::Function, Some(node))
            }
            None => self
                .scopes
                .define(&self.interner, scope, name, SymbolKind::Function, Some(node)),
        }
    }

    /// `TYPE ':' NAME {',' NAME}` where the names share the type.
    ///
    /// A comma followed by `IDENT ':'` starts the next group and is left for
    /// the caller.
    fn parse_param_group(&mut self) -> NodeId {
        let start_span = self.current_span();
        let ty = self.parse_type_name();
        self.consume(TokenKind::Colon, "':' after parameter type");

        let names = self.arena.alloc_list(NAMES_CAPACITY);
        let group = self.arena.alloc(Node::new(
            NodeKind::ParamGroup(TypedNames { ty, names }),
            start_span,
        ));

        loop {
            let name = self.parse_declared_name(SymbolKind::Parameter, group, "parameter name");
            self.arena.push(names, name);

            let next_group = self.check(TokenKind::Comma)
                && self.peek_kind(1) == TokenKind::Identifier
                && self.peek_kind(2) == TokenKind::Colon;
            if next_group || !self.match_kind(TokenKind::Comma) {
                break;
            }
        }

        self.arena[group].span = start_span.merge(&self.previous_span());
        group
    }

    /// `'{' { statement } '}'` in a fresh child scope.
    fn parse_block(&mut self) -> NodeId {
        ensure_sufficient_stack(|| self.parse_block_inner())
    }

    fn parse_block_inner(&mut self) -> NodeId {
        let start_span = self.current_span();
        if self.consume(TokenKind::LBrace, "'{'").is_some() {
            self.panic_mode = false;
        }

        let outer_scope = self.current_scope();
        let scope = self.scopes.new_scope(Some(outer_scope));
        self.push_scope(scope);

        let statements = self.arena.alloc_list(STATEMENTS_CAPACITY);
        while !self.check(TokenKind::RBrace) && !self.is_at_end() {
            if self.match_kind(TokenKind::Semicolon) {
                continue;
            }
            let before = self.pos;
            if let Some(statement) = self.parse_statement() {
                self.arena.push(statements, statement);
            }

            if self.panic_mode {
                self.synchronize();
            } else {
                self.match_kind(TokenKind::Semicolon);
                if self.pos == before {
                    // A statement that consumed nothing would loop forever.
                    self.advance();
                }
            }
        }

        self.consume(TokenKind::RBrace, "'}' after block");
        self.pop_scope(outer_scope);

        let span = start_span.merge(&self.previous_span());
        self.arena
            .alloc(Node::new(NodeKind::Block(Block { statements, scope }), span))
    }

    /// Discard tokens through the next `;`, or up to a `}`, then leave panic mode.
    fn synchronize(&mut self) {
        let start = self.pos;
        while !self.is_at_end() {
            match self.current().kind {
                TokenKind::RBrace => break,
                TokenKind::Semicolon => {
                    self.advance();
                    break;
                }
                _ => {
                    self.advance();
                }
            }
        }
        tracing::trace!(skipped = self.pos - start, "synchronized after syntax error");
        self.panic_mode = false;
    }

    fn parse_statement(&mut self) -> Option<NodeId> {
        match self.current().kind {
            TokenKind::Func => Some(self.parse_function()),
            TokenKind::Return => Some(self.parse_return()),
            TokenKind::Var => Some(self.parse_var_decl()),
            TokenKind::LBrace => Some(self.parse_block()),
            TokenKind::Identifier => match classify_statement(self.tokens, self.pos) {
                StatementShape::ShortDecl => Some(self.parse_short_decl()),
                StatementShape::Assign => Some(self.parse_assign()),
                StatementShape::Expression => self.parse_expression(),
            },
            _ => self.parse_expression(),
        }
    }

    /// `'return' [expr {',' expr}]`
    fn parse_return(&mut self) -> NodeId {
        let start_span = self.current_span();
        self.consume(TokenKind::Return, "'return'");

        let values = self.arena.alloc_list(RETURN_VALUES_CAPACITY);
        let ends_statement = self.check(TokenKind::RBrace)
            || self.check(TokenKind::Semicolon)
            || self.is_at_end();
        if !ends_statement {
            loop {
                match self.parse_expression() {
                    Some(value) => self.arena.push(values, value),
                    None => break,
                }
                if !self.match_kind(TokenKind::Comma) {
                    break;
                }
            }
        }

        let span = start_span.merge(&self.previous_span());
        self.arena.alloc(Node::new(NodeKind::Return { values }, span))
    }

    /// `'var' TYPE ':' NAME {',' NAME}`
    fn parse_var_decl(&mut self) -> NodeId {
        let start_span = self.current_span();
        self.consume(TokenKind::Var, "'var'");

        let ty = self.parse_type_name();
        self.consume(TokenKind::Colon, "':' after variable type");

        let names = self.arena.alloc_list(NAMES_CAPACITY);
        let node = self.arena.alloc(Node::new(
            NodeKind::VarDecl(TypedNames { ty, names }),
            start_span,
        ));

        loop {
            let name = self.parse_declared_name(SymbolKind::Variable, node, "variable name");
            self.arena.push(names, name);
            if !self.match_kind(TokenKind::Comma) {
                break;
            }
        }

        self.arena[node].span = start_span.merge(&self.previous_span());
        node
    }

    /// `NAME ':' TYPE '=' expr`; the name is defined after the initializer.
    fn parse_short_decl(&mut self) -> NodeId {
        let start_span = self.current_span();
        let name_token = self.consume(TokenKind::Identifier, "variable name");
        let (name, name_span) = self.name_of(name_token.as_ref());
        let name_node = self.arena.alloc(Node::new(
            NodeKind::Identifier(Identifier { name, symbol: None }),
            name_span,
        ));

        self.consume(TokenKind::Colon, "':' after variable name");
        let ty = self.parse_type_name();
        self.consume(TokenKind::Assign, "'=' in short declaration");
        let value = self.parse_expression();

        let span = start_span.merge(&self.previous_span());
        let node = self.arena.alloc(Node::new(
            NodeKind::ShortDecl(ShortDecl {
                name: name_node,
                ty,
                value,
            }),
            span,
        ));

        if name != Name::EMPTY {
            let symbol = self.declare(name, name_span, SymbolKind::Variable, node);
            if let NodeKind::Identifier(ident) = &mut self.arena[name_node].kind {
                ident.symbol = Some(symbol);
            }
        }
        node
    }

    /// `NAME {',' NAME} '=' expr`
    fn parse_assign(&mut self) -> NodeId {
        let start_span = self.current_span();
        let targets = self.arena.alloc_list(TARGETS_CAPACITY);

        loop {
            let target = self.parse_identifier_use("assignment target");
            self.arena.push(targets, target);
            if !self.match_kind(TokenKind::Comma) {
                break;
            }
        }

        self.consume(TokenKind::Assign, "'=' in assignment");
        let value = self.parse_expression();

        let span = start_span.merge(&self.previous_span());
        self.arena
            .alloc(Node::new(NodeKind::Assign(Assign { targets, value }), span))
    }

    /// `primary {('+' | '-') primary}`, left-associative.
    fn parse_expression(&mut self) -> Option<NodeId> {
        ensure_sufficient_stack(|| self.parse_expression_inner())
    }

    fn parse_expression_inner(&mut self) -> Option<NodeId> {
        let mut left = self.parse_primary()?;

        loop {
            let op = match self.current().kind {
                TokenKind::Plus => BinaryOp::Add,
                TokenKind::Minus => BinaryOp::Sub,
                _ => break,
            };
            self.advance();

            let Some(right) = self.parse_primary() else {
                break;
            };
            let span = self.arena[left].span.merge(&self.arena[right].span);
            left = self
                .arena
                .alloc(Node::new(NodeKind::Binary(Binary { op, left, right }), span));
        }

        Some(left)
    }

    fn parse_primary(&mut self) -> Option<NodeId> {
        match self.current().kind {
            TokenKind::Integer => {
                let token = self.advance();
                let value = token.int_value().unwrap_or_default();
                Some(
                    self.arena
                        .alloc(Node::new(NodeKind::IntegerLiteral(value), token.span)),
                )
            }
            TokenKind::Identifier => {
                let callee = self.parse_identifier_use("identifier");
                if self.check(TokenKind::LParen) {
                    Some(self.parse_call(callee))
                } else {
                    Some(callee)
                }
            }
            TokenKind::LParen => {
                self.advance();
                let inner = self.parse_expression();
                self.consume(TokenKind::RParen, "')' after expression");
                inner
            }
            _ => {
                let token = self.current().clone();
                self.report_expected("P004", "expression", &token);
                None
            }
        }
    }

    /// `callee '(' [expr {',' expr}] ')'`
    fn parse_call(&mut self, callee: NodeId) -> NodeId {
        self.consume(TokenKind::LParen, "'('");
        let args = self.arena.alloc_list(ARGS_CAPACITY);

        if !self.check(TokenKind::RParen) {
            loop {
                match self.parse_expression() {
                    Some(arg) => self.arena.push(args, arg),
                    None => break,
                }
                if !self.match_kind(TokenKind::Comma) {
                    break;
                }
            }
        }
        self.consume(TokenKind::RParen, "')' after arguments");

        let span = self.arena[callee].span.merge(&self.previous_span());
        self.arena
            .alloc(Node::new(NodeKind::Call(Call { callee, args }), span))
    }

    /// An identifier reference, resolved against the scope chain.
    fn parse_identifier_use(&mut self, what: &str) -> NodeId {
        let token = self.consume(TokenKind::Identifier, what);
        let (name, span) = self.name_of(token.as_ref());
        let symbol = if name == Name::EMPTY {
            None
        } else {
            self.resolve(name, span)
        };
        self.arena.alloc(Node::new(
            NodeKind::Identifier(Identifier { name, symbol }),
            span,
        ))
    }

    /// Type names are ordinary identifier uses.
    fn parse_type_name(&mut self) -> NodeId {
        self.parse_identifier_use("type name")
    }

    /// A declared name: checked for redeclaration, then defined with `decl`.
    fn parse_declared_name(&mut self, kind: SymbolKind, decl: NodeId, what: &str) -> NodeId {
        let token = self.consume(TokenKind::Identifier, what);
        let (name, span) = self.name_of(token.as_ref());
        let symbol = if name == Name::EMPTY {
            None
        } else {
            Some(self.declare(name, span, kind, decl))
        };
        self.arena.alloc(Node::new(
            NodeKind::Identifier(Identifier { name, symbol }),
            span,
        ))
    }

    fn resolve(&mut self, name: Name, span: Span) -> Option<SymbolId> {
        let symbol = self
            .scopes
            .lookup(&self.interner, self.current_scope(), name);
        if symbol.is_none() {
            self.error(
                "P002",
                format!("Undeclared identifier: '{}'", self.interner.resolve(name)),
                span,
            );
        }
        symbol
    }

    /// Define `name` in the active scope, reporting a same-scope redeclaration.
    /// The new symbol is defined either way so later lookups find it.
    fn declare(&mut self, name: Name, span: Span, kind: SymbolKind, decl: NodeId) -> SymbolId {
        let scope = self.current_scope();
        if self
            .scopes
            .lookup_current(&self.interner, scope, name)
            .is_some()
        {
            self.error(
                "P003",
                format!("Redeclaration of {}: '{}'", kind, self.interner.resolve(name)),
                span,
            );
        }
        self.scopes
            .define(&self.interner, scope, name, kind, Some(decl))
    }

    /// Intern a name token; a missing token yields the empty name at the
    /// current position.
    fn name_of(&mut self, token: Option<&Token>) -> (Name, Span) {
        match token {
            Some(token) => (self.interner.intern(&token.text), token.span),
            None => (Name::EMPTY, Span::point(self.current_span().start)),
        }
    }

    // Scope helpers

    fn current_scope(&self) -> ScopeId {
        self.scope_stack
            .last()
            .copied()
            .unwrap_or(self.global_scope)
    }

    fn push_scope(&mut self, scope: ScopeId) {
        tracing::trace!(scope = scope.index(), depth = self.scope_stack.len(), "enter scope");
        self.scope_stack.push(scope);
    }

    fn pop_scope(&mut self, expected_outer: ScopeId) {
        self.scope_stack.pop();
        debug_assert_eq!(self.current_scope(), expected_outer);
        tracing::trace!(scope = expected_outer.index(), "leave scope");
    }

    // Token helpers

    fn current(&self) -> &Token {
        self.tokens.get(self.pos).unwrap_or(&self.eof)
    }

    fn peek_kind(&self, offset: usize) -> TokenKind {
        self.tokens
            .get(self.pos + offset)
            .map_or(TokenKind::Eof, |t| t.kind)
    }

    fn current_span(&self) -> Span {
        self.current().span
    }

    fn previous_span(&self) -> Span {
        match self.pos.checked_sub(1).and_then(|i| self.tokens.get(i)) {
            Some(token) => token.span,
            None => self.current_span(),
        }
    }

    fn check(&self, kind: TokenKind) -> bool {
        self.current().kind == kind
    }

    fn is_at_end(&self) -> bool {
        self.current().kind == TokenKind::Eof
    }

    fn advance(&mut self) -> Token {
        let token = self.current().clone();
        if !self.is_at_end() {
            self.pos += 1;
        }
        token
    }

    fn match_kind(&mut self, kind: TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Consume a token of `kind`, or report "Expected ..." and enter panic mode.
    fn consume(&mut self, kind: TokenKind, what: &str) -> Option<Token> {
        if self.check(kind) {
            return Some(self.advance());
        }
        let token = self.current().clone();
        self.report_expected("P001", what, &token);
        None
    }

    fn report_expected(&mut self, code: &str, what: &str, found: &Token) {
        // Lexical errors were already reported by the lexer.
        if !self.panic_mode && found.kind != TokenKind::Error {
            self.error(
                code,
                format!("Expected {}, found {}", what, found.describe()),
                found.span,
            );
        }
        self.panic_mode = true;
    }

    fn error(&mut self, code: &str, message: String, span: Span) {
        self.diagnostics.push(
            Diagnostic::error(code, message)
                .with_stage(Stage::Parser)
                .with_file(self.file)
                .with_span(span)
                .build(),
        );
    }
}
