//! Terra Core Library
//!
//! This crate provides the front end of the Terra language: tokenizing,
//! parsing into an arena-allocated AST, inline name resolution against a
//! scope chain, and diagnostic collection.

pub mod arena;
pub mod ast;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod intern;
pub mod lexer;
pub mod parser;
pub mod scope;
pub mod span;
pub mod stack;

pub use arena::{AstArena, ListId, NodeId};
pub use ast::*;
pub use config::FrontendConfig;
pub use diagnostics::{Diagnostic, DiagnosticSeverity, Diagnostics, DiagnosticsOutput, Stage};
pub use error::{FrontendError, FrontendResult};
pub use intern::{Interner, Name};
pub use lexer::{Lexer, LiteralValue, Token, TokenKind};
pub use parser::Parser;
pub use scope::{ScopeId, ScopeTable, Symbol, SymbolId, SymbolKind};
pub use span::{Position, Span};

/// One configured front end; each call is an independent compilation.
#[derive(Debug, Clone, Default)]
pub struct Frontend {
    config: FrontendConfig,
}

impl Frontend {
    pub fn new(config: FrontendConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &FrontendConfig {
        &self.config
    }

    /// Tokenize `source`, appending lexical diagnostics to `diagnostics`.
    #[tracing::instrument(level = "debug", skip_all, fields(file = file))]
    pub fn tokenize(
        &self,
        source: &str,
        file: &str,
        diagnostics: &mut Diagnostics,
    ) -> FrontendResult<Vec<Token>> {
        let tokens = Lexer::new(source, file).tokenize(diagnostics)?;
        tracing::debug!(tokens = tokens.len(), errors = diagnostics.error_count(), "tokenized");
        Ok(tokens)
    }

    /// Tokenize and parse `source`.
    ///
    /// The AST is `None` only when a Fatal diagnostic stopped the
    /// compilation; otherwise it is returned even when errors were reported.
    #[tracing::instrument(level = "debug", skip_all, fields(file = file))]
    pub fn compile(&self, source: &str, file: &str) -> (Option<Ast>, Diagnostics) {
        let mut diagnostics = Diagnostics::with_error_limit(self.config.error_limit);

        let tokens = match self.tokenize(source, file, &mut diagnostics) {
            Ok(tokens) => tokens,
            Err(err) => {
                tracing::debug!(%err, "compilation stopped");
                return (None, diagnostics);
            }
        };

        let ast = Parser::new(&tokens, file, &self.config, &mut diagnostics).parse();
        tracing::debug!(
            errors = diagnostics.error_count(),
            functions = ast.functions().len(),
            "compiled"
        );
        (Some(ast), diagnostics)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compile_clean_program() {
        let frontend = Frontend::default();
        let (ast, diagnostics) =
            frontend.compile("func add(i32: a, b): i32 { return a + b }", "add.tr");

        assert!(diagnostics.is_empty());
        let ast = ast.unwrap();
        assert_eq!(ast.functions().len(), 1);
        assert_eq!(ast.name_text(ast.functions()[0]), Some("add"));
    }

    #[test]
    fn test_compile_collects_lexer_and_parser_errors() {
        let frontend = Frontend::default();
        let (ast, diagnostics) = frontend.compile("func f(): i32 { return # + y }", "bad.tr");

        assert!(ast.is_some());
        let stages: Vec<_> = diagnostics.iter().map(|d| d.stage).collect();
        assert_eq!(stages, vec![Stage::Lexer]);
        assert!(diagnostics.has_errors());
    }

    #[test]
    fn test_error_limit_applies() {
        let config = FrontendConfig {
            error_limit: Some(1),
            ..FrontendConfig::default()
        };
        let frontend = Frontend::new(config);
        let (_, diagnostics) = frontend.compile("func f(): i32 { return a + b + c }", "limit.tr");

        assert_eq!(diagnostics.error_count(), 3);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics.suppressed_count(), 2);
    }

    #[test]
    fn test_small_capacities_behave_like_defaults() {
        let config = FrontendConfig {
            error_limit: None,
            intern_buckets: 1,
            scope_buckets: 1,
            arena_page_size: 2,
        };
        let source = "func f(i32: a, b): i32 { x: i32 = a - b; return g(x) }
                      func g(i32: v): i32 { return v }";

        let (small, small_diagnostics) = Frontend::new(config).compile(source, "cap.tr");
        let (large, large_diagnostics) = Frontend::default().compile(source, "cap.tr");

        assert!(small_diagnostics.is_empty());
        assert!(large_diagnostics.is_empty());
        let (small, large) = (small.unwrap(), large.unwrap());
        assert_eq!(small.arena.node_count(), large.arena.node_count());
        assert!(small.arena.page_count() > large.arena.page_count());
    }
}
