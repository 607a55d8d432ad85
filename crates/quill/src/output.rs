//! Output formatting for diagnostics and summaries.

use crate::cli::OutputFormat;
use crate::orchestrator::CompileSummary;
use camino::Utf8Path;
use miette::{Diagnostic, NamedSource, SourceSpan};
use thiserror::Error;

/// A template error rendered with its source.
#[derive(Debug, Error, Diagnostic)]
#[error("{message}")]
#[diagnostic(code(quill::compile))]
pub struct TemplateDiagnostic {
    message: String,
    #[source_code]
    source_code: NamedSource<String>,
    #[label("{code}")]
    span: Option<SourceSpan>,
    code: &'static str,
}

impl TemplateDiagnostic {
    pub fn new(file: &Utf8Path, source: &str, error: &quill_compiler::Error) -> Self {
        let span = error
            .span()
            .filter(|span| !span.is_empty() || span.start > 0)
            .map(|span| SourceSpan::from((span.start as usize, span.len() as usize)));
        let message = match error.line() {
            Some(line) => format!("{} (line {})", error.message(), line),
            None => error.message().to_string(),
        };
        Self {
            message,
            source_code: NamedSource::new(file.as_str(), source.to_string()),
            span,
            code: error.code(),
        }
    }
}

/// Formatter for diagnostic output.
pub struct OutputFormatter {
    format: OutputFormat,
}

impl OutputFormatter {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Print a template error.
    pub fn print_error(&self, file: &Utf8Path, source: &str, error: &quill_compiler::Error) {
        match self.format {
            OutputFormat::Human => {
                let report = miette::Report::new(TemplateDiagnostic::new(file, source, error));
                eprintln!("{:?}", report);
            }
            OutputFormat::Json => println!("{}", error_json(file, error)),
            OutputFormat::Machine => println!("{}", error_line(file, error)),
        }
    }

    /// Print a failure that is not about template contents.
    pub fn print_io_error(&self, file: &Utf8Path, message: &str) {
        match self.format {
            OutputFormat::Human => eprintln!("\x1b[31merror\x1b[0m: {}: {}", file, message),
            OutputFormat::Json => println!(
                "{}",
                serde_json::json!({
                    "type": "error",
                    "file": file.as_str(),
                    "code": "io",
                    "message": message,
                })
            ),
            OutputFormat::Machine => println!("{}:0: io: {}", file, message),
        }
    }

    pub fn print_summary(&self, summary: &CompileSummary) {
        match self.format {
            OutputFormat::Human => print_summary_human(summary),
            OutputFormat::Json => println!(
                "{}",
                serde_json::json!({
                    "type": "summary",
                    "files": summary.file_count,
                    "written": summary.written_count,
                    "errors": summary.error_count,
                    "duration_ms": summary.duration_ms,
                })
            ),
            OutputFormat::Machine => {}
        }
    }
}

fn print_summary_human(summary: &CompileSummary) {
    println!();
    if summary.error_count == 0 {
        println!(
            "\x1b[32m✓\x1b[0m Compiled {} template{} ({}ms)",
            summary.file_count,
            plural(summary.file_count),
            summary.duration_ms
        );
    } else {
        println!(
            "\x1b[31m✗\x1b[0m Found {} error{} in {} template{}",
            summary.error_count,
            plural(summary.error_count),
            summary.file_count,
            plural(summary.file_count)
        );
        println!("Time: {}ms", summary.duration_ms);
    }
}

fn plural(count: usize) -> &'static str {
    if count == 1 {
        ""
    } else {
        "s"
    }
}

fn error_json(file: &Utf8Path, error: &quill_compiler::Error) -> serde_json::Value {
    serde_json::json!({
        "type": "error",
        "file": file.as_str(),
        "line": error.line(),
        "code": error.code(),
        "message": error.message(),
        "span": error.span().map(|span| serde_json::json!({
            "start": span.start,
            "end": span.end,
        })),
    })
}

fn error_line(file: &Utf8Path, error: &quill_compiler::Error) -> String {
    format!(
        "{}:{}: {}: {}",
        file,
        error.line().unwrap_or(0),
        error.code(),
        error.message().replace('\n', " ")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use quill_compiler::EnvironmentOptions;

    fn error(source: &str) -> quill_compiler::Error {
        let env = quill_core::environment(EnvironmentOptions::default()).unwrap();
        env.compile(source, "page.html").unwrap_err()
    }

    #[test]
    fn test_machine_line() {
        let err = error("{if x}a");
        assert_eq!(
            error_line(Utf8Path::new("page.html"), &err),
            "page.html:1: unclosed-tag: Unexpected end of template, expected \"endif\""
        );
    }

    #[test]
    fn test_json_fields() {
        let err = error("{a == b == c}");
        let json = error_json(Utf8Path::new("page.html"), &err);
        assert_eq!(json["code"], "non-associative");
        assert_eq!(json["line"], 1);
        assert_eq!(json["file"], "page.html");
    }

    #[test]
    fn test_diagnostic_labels_span() {
        let err = error("{a == b == c}");
        let diagnostic = TemplateDiagnostic::new(Utf8Path::new("page.html"), "{a == b == c}", &err);
        assert!(diagnostic.span.is_some());
        assert_eq!(diagnostic.code, "non-associative");
    }
}
