//! Diagnostic rendering for `terra check`.

use colored::Colorize;
use miette::{GraphicalReportHandler, LabeledSpan, MietteDiagnostic, NamedSource, Report, Severity};
use terra_core::{Diagnostic, DiagnosticSeverity, Diagnostics};

/// Human-readable output in the style of `rustc`.
pub fn human(diagnostics: &Diagnostics, source: &str) {
    for diag in diagnostics.iter() {
        let severity_str = match diag.severity {
            DiagnosticSeverity::Fatal => "fatal".red().bold(),
            DiagnosticSeverity::Error => "error".red().bold(),
            DiagnosticSeverity::Warning => "warning".yellow().bold(),
            DiagnosticSeverity::Info => "info".blue().bold(),
        };
        println!(
            "{}{} {} {}",
            severity_str,
            format!("[{}]", diag.code).dimmed(),
            ":".bold(),
            diag.message
        );
        println!(
            "  {} {}:{}:{}",
            "-->".blue().bold(),
            diag.file,
            diag.span.start.line,
            diag.span.start.column
        );
        if let Some(line) = source_line(source, diag.span.start.line) {
            let gutter = diag.span.start.line.to_string();
            let pad = " ".repeat(gutter.len());
            println!(" {} {}", pad, "|".blue().bold());
            println!(" {} {} {}", gutter.blue().bold(), "|".blue().bold(), line);
            println!(
                " {} {} {}{}",
                pad,
                "|".blue().bold(),
                " ".repeat(diag.span.start.column.saturating_sub(1)),
                underline(diag, line).red().bold()
            );
        }
        if let Some(ref help) = diag.help {
            println!(" {} {}: {}", "=".blue().bold(), "help".bold(), help);
        }
        println!();
    }

    if diagnostics.suppressed_count() > 0 {
        println!(
            "{}: {} further error{} suppressed",
            "note".bold(),
            diagnostics.suppressed_count(),
            if diagnostics.suppressed_count() == 1 { "" } else { "s" }
        );
    }
}

/// One graphical report per diagnostic, drawn over the source text.
pub fn fancy(diagnostics: &Diagnostics, source: &str, file: &str) {
    let handler = GraphicalReportHandler::new();
    for diag in diagnostics.iter() {
        let report = Report::new(to_miette(diag))
            .with_source_code(NamedSource::new(file, source.to_string()));
        let mut out = String::new();
        match handler.render_report(&mut out, &*report) {
            Ok(()) => print!("{}", out),
            Err(_) => println!("{}", diag.render()),
        }
    }
}

fn to_miette(diag: &Diagnostic) -> MietteDiagnostic {
    let severity = match diag.severity {
        DiagnosticSeverity::Fatal | DiagnosticSeverity::Error => Severity::Error,
        DiagnosticSeverity::Warning => Severity::Warning,
        DiagnosticSeverity::Info => Severity::Advice,
    };
    let label = LabeledSpan::at(diag.span.range(), diag.stage.to_string());
    let mut report = MietteDiagnostic::new(diag.message.clone())
        .with_code(diag.code.clone())
        .with_severity(severity)
        .with_label(label);
    if let Some(ref help) = diag.help {
        report = report.with_help(help.clone());
    }
    report
}

fn source_line(source: &str, line: usize) -> Option<&str> {
    source.lines().nth(line.checked_sub(1)?)
}

/// Carets under the reported span, clipped to the line.
fn underline(diag: &Diagnostic, line: &str) -> String {
    let available = line
        .chars()
        .count()
        .saturating_sub(diag.span.start.column.saturating_sub(1));
    let width = if diag.span.end.line == diag.span.start.line {
        diag.span.end.column.saturating_sub(diag.span.start.column)
    } else {
        available
    };
    "^".repeat(width.clamp(1, available.max(1)))
}
