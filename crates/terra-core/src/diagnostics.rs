//! Diagnostic types for error reporting.
//!
//! A single [`Diagnostics`] sink is created per compilation and passed
//! explicitly to the lexer and the parser. Records are append-only and keep
//! their emission order.

use std::fmt;
use std::io::{self, Write};

use serde::{Deserialize, Serialize};

use crate::error::FrontendError;
use crate::span::Span;

/// Compilation stage that produced a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Lexer,
    Parser,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Lexer => f.write_str("lexer"),
            Stage::Parser => f.write_str("parser"),
        }
    }
}

/// Severity level of a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticSeverity {
    Info,
    Warning,
    Error,
    Fatal,
}

impl fmt::Display for DiagnosticSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            DiagnosticSeverity::Info => "INFO",
            DiagnosticSeverity::Warning => "WARNING",
            DiagnosticSeverity::Error => "ERROR",
            DiagnosticSeverity::Fatal => "FATAL",
        };
        f.write_str(label)
    }
}

/// A diagnostic message with source location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Stage that reported the diagnostic
    pub stage: Stage,
    /// Severity of the diagnostic
    pub severity: DiagnosticSeverity,
    /// Error code (e.g., "P001")
    pub code: String,
    /// Human-readable message
    pub message: String,
    /// Source file path
    pub file: String,
    /// Source span
    pub span: Span,
    /// Optional help text
    #[serde(skip_serializing_if = "Option::is_none")]
    pub help: Option<String>,
}

impl Diagnostic {
    pub fn info(code: impl Into<String>, message: impl Into<String>) -> DiagnosticBuilder {
        DiagnosticBuilder::new(DiagnosticSeverity::Info, code.into(), message.into())
    }

    pub fn warning(code: impl Into<String>, message: impl Into<String>) -> DiagnosticBuilder {
        DiagnosticBuilder::new(DiagnosticSeverity::Warning, code.into(), message.into())
    }

    pub fn error(code: impl Into<String>, message: impl Into<String>) -> DiagnosticBuilder {
        DiagnosticBuilder::new(DiagnosticSeverity::Error, code.into(), message.into())
    }

    pub fn fatal(code: impl Into<String>, message: impl Into<String>) -> DiagnosticBuilder {
        DiagnosticBuilder::new(DiagnosticSeverity::Fatal, code.into(), message.into())
    }

    /// Render as `[SEVERITY] file:line:col: message`.
    pub fn render(&self) -> String {
        format!(
            "[{}] {}:{}:{}: {}",
            self.severity, self.file, self.span.start.line, self.span.start.column, self.message
        )
    }
}

/// Builder for constructing diagnostics.
pub struct DiagnosticBuilder {
    stage: Stage,
    severity: DiagnosticSeverity,
    code: String,
    message: String,
    file: Option<String>,
    span: Option<Span>,
    help: Option<String>,
}

impl DiagnosticBuilder {
    pub fn new(severity: DiagnosticSeverity, code: String, message: String) -> Self {
        Self {
            stage: Stage::Parser,
            severity,
            code,
            message,
            file: None,
            span: None,
            help: None,
        }
    }

    pub fn with_stage(mut self, stage: Stage) -> Self {
        self.stage = stage;
        self
    }

    pub fn with_file(mut self, file: impl Into<String>) -> Self {
        self.file = Some(file.into());
        self
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = Some(span);
        self
    }

    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    pub fn build(self) -> Diagnostic {
        Diagnostic {
            stage: self.stage,
            severity: self.severity,
            code: self.code,
            message: self.message,
            file: self.file.unwrap_or_default(),
            span: self.span.unwrap_or_default(),
            help: self.help,
        }
    }
}

/// Collection of diagnostics for one compilation.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct Diagnostics {
    diagnostics: Vec<Diagnostic>,
    error_count: usize,
    #[serde(skip)]
    error_limit: Option<usize>,
    suppressed: usize,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stop storing Error diagnostics once `limit` of them have been recorded.
    /// Suppressed errors still count towards [`Diagnostics::error_count`].
    pub fn with_error_limit(limit: Option<usize>) -> Self {
        Self {
            error_limit: limit,
            ..Self::default()
        }
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        tracing::trace!(
            code = %diagnostic.code,
            severity = %diagnostic.severity,
            line = diagnostic.span.start.line,
            column = diagnostic.span.start.column,
            "{}",
            diagnostic.message
        );

        if diagnostic.severity == DiagnosticSeverity::Error {
            self.error_count += 1;
            if self.error_limit.is_some_and(|limit| self.error_count > limit) {
                self.suppressed += 1;
                return;
            }
        }
        self.diagnostics.push(diagnostic);
    }

    /// Record a Fatal diagnostic and return the error the caller must
    /// propagate. The host is responsible for flushing and terminating.
    pub fn fatal(&mut self, diagnostic: Diagnostic) -> FrontendError {
        let error = FrontendError::Fatal {
            stage: diagnostic.stage,
            file: diagnostic.file.clone(),
            line: diagnostic.span.start.line,
            column: diagnostic.span.start.column,
            message: diagnostic.message.clone(),
        };
        self.diagnostics.push(Diagnostic {
            severity: DiagnosticSeverity::Fatal,
            ..diagnostic
        });
        error
    }

    pub fn extend(&mut self, other: Diagnostics) {
        for diagnostic in other {
            self.push(diagnostic);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }

    pub fn len(&self) -> usize {
        self.diagnostics.len()
    }

    /// Number of Error diagnostics reported, including suppressed ones.
    pub fn error_count(&self) -> usize {
        self.error_count
    }

    /// Number of Error diagnostics dropped by the error limit.
    pub fn suppressed_count(&self) -> usize {
        self.suppressed
    }

    pub fn has_errors(&self) -> bool {
        self.error_count > 0 || self.has_fatal()
    }

    pub fn has_fatal(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity == DiagnosticSeverity::Fatal)
    }

    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(|d| {
            matches!(
                d.severity,
                DiagnosticSeverity::Error | DiagnosticSeverity::Fatal
            )
        })
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == DiagnosticSeverity::Warning)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter()
    }

    /// Write every diagnostic, in emission order, one per line.
    pub fn flush<W: Write>(&self, out: &mut W) -> io::Result<()> {
        for diagnostic in &self.diagnostics {
            writeln!(out, "{}", diagnostic.render())?;
        }
        if self.suppressed > 0 {
            writeln!(
                out,
                "[{}] {} further error{} suppressed",
                DiagnosticSeverity::Info,
                self.suppressed,
                if self.suppressed == 1 { "" } else { "s" }
            )?;
        }
        out.flush()
    }

    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.diagnostics
    }
}

impl IntoIterator for Diagnostics {
    type Item = Diagnostic;
    type IntoIter = std::vec::IntoIter<Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.diagnostics.into_iter()
    }
}

/// JSON output format for diagnostics.
#[derive(Debug, Serialize, Deserialize)]
pub struct DiagnosticsOutput {
    pub version: String,
    pub status: String,
    pub errors: Vec<Diagnostic>,
    pub warnings: Vec<Diagnostic>,
    pub summary: DiagnosticsSummary,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DiagnosticsSummary {
    pub total_errors: usize,
    pub total_warnings: usize,
    pub suppressed_errors: usize,
}

impl DiagnosticsOutput {
    pub fn from_diagnostics(diagnostics: &Diagnostics) -> Self {
        let errors: Vec<_> = diagnostics.errors().cloned().collect();
        let warnings: Vec<_> = diagnostics.warnings().cloned().collect();

        Self {
            version: "1.0".to_string(),
            status: if diagnostics.has_errors() { "error" } else { "ok" }.to_string(),
            summary: DiagnosticsSummary {
                total_errors: diagnostics.error_count(),
                total_warnings: warnings.len(),
                suppressed_errors: diagnostics.suppressed_count(),
            },
            errors,
            warnings,
        }
    }

    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
