use std::fmt;
use std::io::IsTerminal;
use std::ops::Range;
use std::path::Path;

use ariadne::{sources, Config, Label, Report, ReportKind};

use crate::parser::{AnalyzeError, SyntaxError};
use crate::tokenizer::{LexError, Position};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DiagnosticStage {
    Tokenize,
    Parse,
}

impl fmt::Display for DiagnosticStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DiagnosticStage::Tokenize => "tokenize",
            DiagnosticStage::Parse => "parse",
        };
        f.write_str(name)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SourceLabel {
    pub span: Range<usize>,
    pub message: String,
}

/// One error report against a single source file.
#[derive(Clone, Debug)]
pub struct Diagnostic {
    pub code: String,
    pub stage: DiagnosticStage,
    pub message: String,
    pub file_id: String,
    pub source: String,
    pub labels: Vec<SourceLabel>,
    pub notes: Vec<String>,
}

impl Diagnostic {
    pub fn new(
        code: impl Into<String>,
        stage: DiagnosticStage,
        message: impl Into<String>,
        file_id: impl Into<String>,
        source: impl Into<String>,
    ) -> Self {
        Self {
            code: code.into(),
            stage,
            message: message.into(),
            file_id: file_id.into(),
            source: source.into(),
            labels: Vec::new(),
            notes: Vec::new(),
        }
    }

    pub fn with_label(mut self, span: Range<usize>, message: impl Into<String>) -> Self {
        self.labels.push(SourceLabel {
            span,
            message: message.into(),
        });
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }

    pub fn render_plain(&self) -> String {
        self.render_with_color(false)
    }

    fn render_with_color(&self, use_color: bool) -> String {
        let primary_span = self
            .labels
            .first()
            .map(|label| sanitize_span(&label.span))
            .unwrap_or_else(|| 0..next_char_boundary(&self.source, 0));

        let mut report = Report::build(
            ReportKind::Error,
            (self.file_id.clone(), primary_span.clone()),
        )
        .with_code(self.code.clone())
        .with_message(format!("error[{}:{}]: {}", self.stage, self.code, self.message))
        .with_config(Config::default().with_color(use_color));

        for label in &self.labels {
            report = report.with_label(
                Label::new((self.file_id.clone(), sanitize_span(&label.span)))
                    .with_message(label.message.clone()),
            );
        }

        for note in &self.notes {
            report = report.with_note(note.clone());
        }

        let mut output = Vec::new();
        let source_entries = vec![(self.file_id.clone(), self.source.clone())];
        match report.finish().write(sources(source_entries), &mut output) {
            Ok(()) => String::from_utf8_lossy(&output).trim_end().to_string(),
            Err(_) => self.fallback_render(),
        }
    }

    fn fallback_render(&self) -> String {
        let mut out = format!("error[{}:{}]: {}", self.stage, self.code, self.message);
        for label in &self.labels {
            out.push('\n');
            out.push_str(&label.message);
        }
        for note in &self.notes {
            out.push('\n');
            out.push_str("note: ");
            out.push_str(note);
        }
        out
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render_plain())
    }
}

#[derive(Clone, Debug, Default)]
pub struct DiagnosticBundle {
    pub diagnostics: Vec<Diagnostic>,
}

impl DiagnosticBundle {
    pub fn render_plain(&self) -> String {
        self.render_all(false)
    }

    pub fn render_terminal_auto(&self) -> String {
        self.render_all(std::io::stderr().is_terminal())
    }

    fn render_all(&self, use_color: bool) -> String {
        self.diagnostics
            .iter()
            .map(|diagnostic| diagnostic.render_with_color(use_color))
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

impl fmt::Display for DiagnosticBundle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render_plain())
    }
}

/// Reports every lexical error, or the single syntax error, of a failed
/// analysis against its source.
pub fn diagnostics_from_analyze_error(
    source: &str,
    source_path: Option<&Path>,
    error: &AnalyzeError,
) -> DiagnosticBundle {
    let file_id = file_id_from_path(source_path);
    let diagnostics = match error {
        AnalyzeError::Lexical(errors) => errors
            .iter()
            .map(|error| diagnostic_from_lex_error(&file_id, source, error))
            .collect(),
        AnalyzeError::Syntax(error) => vec![diagnostic_from_syntax_error(&file_id, source, error)],
        AnalyzeError::Empty => vec![Diagnostic::new(
            "RS-PARSE-002",
            DiagnosticStage::Parse,
            "nothing to analyze",
            file_id,
            source,
        )
        .with_note("the source contains no statements")],
    };
    DiagnosticBundle { diagnostics }
}

fn diagnostic_from_lex_error(file_id: &str, source: &str, error: &LexError) -> Diagnostic {
    Diagnostic::new(
        "RS-LEX-001",
        DiagnosticStage::Tokenize,
        "lexical error",
        file_id,
        source,
    )
    .with_label(span_from_position(source, &error.position), error.message.clone())
    .with_note(format!(
        "at line {}, column {}",
        error.position.line, error.position.column
    ))
}

fn diagnostic_from_syntax_error(file_id: &str, source: &str, error: &SyntaxError) -> Diagnostic {
    let diagnostic = Diagnostic::new(
        "RS-PARSE-001",
        DiagnosticStage::Parse,
        "syntax error",
        file_id,
        source,
    );
    match &error.position {
        Some(position) => diagnostic
            .with_label(span_from_position(source, position), error.message.clone())
            .with_note(format!(
                "at line {}, column {}",
                position.line, position.column
            )),
        None => diagnostic.with_note(error.message.clone()),
    }
}

pub fn file_id_from_path(path: Option<&Path>) -> String {
    path.map(|value| value.display().to_string())
        .unwrap_or_else(|| "<memory>".to_string())
}

pub fn span_from_position(source: &str, position: &Position) -> Range<usize> {
    let start = position.offset.min(source.len());
    let end = next_char_boundary(source, start);
    sanitize_span(&(start..end))
}

pub fn sanitize_span(span: &Range<usize>) -> Range<usize> {
    if span.end <= span.start {
        span.start..span.start.saturating_add(1)
    } else {
        span.clone()
    }
}

pub fn next_char_boundary(source: &str, start: usize) -> usize {
    if start >= source.len() {
        return start.saturating_add(1);
    }
    let mut iter = source[start..].char_indices();
    let _ = iter.next();
    if let Some((delta, _)) = iter.next() {
        start + delta
    } else {
        source.len()
    }
}
