//! Discovers templates, compiles them in parallel and writes the output.

use crate::cli::Args;
use crate::config::Config;
use crate::output::OutputFormatter;
use camino::{Utf8Path, Utf8PathBuf};
use miette::{miette, IntoDiagnostic, Result};
use quill_compiler::{CompiledTemplate, Environment};
use rayon::prelude::*;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Result of a compile run.
#[derive(Debug, Default)]
pub struct CompileSummary {
    pub file_count: usize,
    pub written_count: usize,
    pub error_count: usize,
    pub duration_ms: u64,
}

/// What happened to one template.
enum Outcome {
    Compiled { written: bool },
    Failed { source: String, error: quill_compiler::Error },
    Io(String),
}

pub struct Orchestrator {
    config: Config,
    args: Args,
    env: Environment,
    formatter: OutputFormatter,
}

impl Orchestrator {
    pub fn new(args: Args) -> Result<Self> {
        let config = Config::load(&args)?;
        let env = quill_core::environment(config.environment.clone())
            .map_err(|e| miette!("Failed to build the template environment: {}", e))?;
        let formatter = OutputFormatter::new(args.output);

        Ok(Self {
            config,
            args,
            env,
            formatter,
        })
    }

    /// Compile every template once.
    pub fn run_once(&self) -> Result<CompileSummary> {
        let start = Instant::now();

        let templates = self.find_templates();
        info!(count = templates.len(), root = %self.config.root, "found templates");

        let outcomes: Vec<(Utf8PathBuf, Outcome)> = templates
            .par_iter()
            .map(|relative| (relative.clone(), self.process(relative)))
            .collect();

        let mut summary = CompileSummary {
            file_count: templates.len(),
            ..CompileSummary::default()
        };
        for (relative, outcome) in &outcomes {
            match outcome {
                Outcome::Compiled { written } => {
                    if *written {
                        summary.written_count += 1;
                    }
                }
                Outcome::Failed { source, error } => {
                    summary.error_count += 1;
                    self.formatter.print_error(relative, source, error);
                }
                Outcome::Io(message) => {
                    summary.error_count += 1;
                    self.formatter.print_io_error(relative, message);
                }
            }
        }
        summary.duration_ms = start.elapsed().as_millis() as u64;

        if self.args.timings {
            eprintln!("\nTiming: {}ms", summary.duration_ms);
        }
        self.formatter.print_summary(&summary);

        Ok(summary)
    }

    /// Compile, then recompile whenever a template changes.
    pub fn run_watch(&self) -> Result<()> {
        use notify::{Config as NotifyConfig, RecommendedWatcher, RecursiveMode, Watcher};
        use std::sync::mpsc::{channel, RecvTimeoutError};
        use std::time::Duration;

        eprintln!("Watching {} for changes...\n", self.config.root);
        if let Err(e) = self.run_once() {
            eprintln!("{:?}", e);
        }

        let (tx, rx) = channel();
        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<notify::Event>| {
                if let Ok(event) = res {
                    let _ = tx.send(event);
                }
            },
            NotifyConfig::default().with_poll_interval(Duration::from_millis(500)),
        )
        .into_diagnostic()?;
        watcher
            .watch(self.config.root.as_std_path(), RecursiveMode::Recursive)
            .into_diagnostic()?;

        loop {
            match rx.recv_timeout(Duration::from_millis(100)) {
                Ok(event) => {
                    if !event.paths.iter().any(|p| self.is_template(p)) {
                        continue;
                    }
                    // Editors emit bursts of events for one save.
                    while rx.recv_timeout(Duration::from_millis(50)).is_ok() {}
                    debug!(paths = ?event.paths, "change detected");
                    eprintln!("File change detected. Recompiling...\n");
                    if let Err(e) = self.run_once() {
                        eprintln!("{:?}", e);
                    }
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }

        Ok(())
    }

    /// Template paths relative to the root, sorted.
    fn find_templates(&self) -> Vec<Utf8PathBuf> {
        let mut templates: Vec<Utf8PathBuf> = walkdir::WalkDir::new(&self.config.root)
            .follow_links(true)
            .into_iter()
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(e) => {
                    warn!(error = %e, "skipping unreadable entry");
                    None
                }
            })
            .filter(|entry| entry.file_type().is_file())
            .filter_map(|entry| self.relative(entry.path()))
            .filter(|relative| self.config.should_process(relative))
            .collect();
        templates.sort();
        templates
    }

    fn relative(&self, path: &std::path::Path) -> Option<Utf8PathBuf> {
        let relative = path.strip_prefix(&self.config.root).ok()?;
        Utf8PathBuf::from_path_buf(relative.to_path_buf()).ok()
    }

    fn is_template(&self, path: &std::path::Path) -> bool {
        self.relative(path)
            .is_some_and(|relative| self.config.should_process(&relative))
    }

    fn process(&self, relative: &Utf8Path) -> Outcome {
        let path = self.config.root.join(relative);
        let source = match std::fs::read_to_string(&path) {
            Ok(source) => source,
            Err(e) => return Outcome::Io(format!("Failed to read {}: {}", path, e)),
        };

        let compiled = match self.env.compile(&source, &template_name(relative)) {
            Ok(compiled) => compiled,
            Err(error) => return Outcome::Failed { source, error },
        };
        debug!(
            template = %relative,
            class = %compiled.class_name,
            parent = ?compiled.parent_template(),
            "compiled"
        );

        if self.args.check {
            return Outcome::Compiled { written: false };
        }
        match self.write(relative, &compiled) {
            Ok(()) => Outcome::Compiled { written: true },
            Err(message) => Outcome::Io(message),
        }
    }

    fn write(&self, relative: &Utf8Path, compiled: &CompiledTemplate) -> Result<(), String> {
        let target = self.config.output_path(relative);
        if let Some(dir) = target.parent() {
            std::fs::create_dir_all(dir)
                .map_err(|e| format!("Failed to create {}: {}", dir, e))?;
        }
        std::fs::write(&target, &compiled.code)
            .map_err(|e| format!("Failed to write {}: {}", target, e))
    }
}

/// Template names always use `/` separators.
fn template_name(relative: &Utf8Path) -> String {
    relative
        .components()
        .map(|c| c.as_str())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::OutputFormat;
    use pretty_assertions::assert_eq;

    fn write(root: &Utf8Path, relative: &str, contents: &str) {
        let path = root.join(relative);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, contents).unwrap();
    }

    fn orchestrator(root: &Utf8Path, check: bool) -> Orchestrator {
        let args = Args {
            input: Some(root.as_std_path().to_path_buf()),
            out: Some(root.join("out").into_std_path_buf()),
            output: OutputFormat::Machine,
            check,
            ..Args::default()
        };
        Orchestrator::new(args).unwrap()
    }

    fn temp_root() -> (tempfile::TempDir, Utf8PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
        (dir, root)
    }

    #[test]
    fn test_template_name_uses_slashes() {
        assert_eq!(template_name(Utf8Path::new("pages/index.html")), "pages/index.html");
    }

    #[test]
    fn test_compiles_and_writes() {
        let (_dir, root) = temp_root();
        write(&root, "index.html", "Hello {name}");
        write(&root, "pages/about.tpl", "{if x}a{endif}");
        write(&root, "notes.md", "ignored");

        let summary = orchestrator(&root, false).run_once().unwrap();
        assert_eq!(summary.file_count, 2);
        assert_eq!(summary.written_count, 2);
        assert_eq!(summary.error_count, 0);

        let code = std::fs::read_to_string(root.join("out/index.html.js")).unwrap();
        assert!(code.contains("class Template_index_html extends Template {"));
        let code = std::fs::read_to_string(root.join("out/pages/about.tpl.js")).unwrap();
        assert!(code.contains(r#"super(env, "pages/about.tpl");"#));
    }

    #[test]
    fn test_errors_are_counted() {
        let (_dir, root) = temp_root();
        write(&root, "good.html", "ok");
        write(&root, "bad.html", "{if x}");

        let summary = orchestrator(&root, false).run_once().unwrap();
        assert_eq!(summary.file_count, 2);
        assert_eq!(summary.error_count, 1);
        assert!(!root.join("out/bad.html.js").exists());
        assert!(root.join("out/good.html.js").exists());
    }

    #[test]
    fn test_check_writes_nothing() {
        let (_dir, root) = temp_root();
        write(&root, "index.html", "Hello");

        let summary = orchestrator(&root, true).run_once().unwrap();
        assert_eq!(summary.written_count, 0);
        assert!(!root.join("out").exists());
    }

    #[test]
    fn test_generated_files_are_not_rediscovered() {
        let (_dir, root) = temp_root();
        write(&root, "index.html", "Hello");

        let orchestrator = orchestrator(&root, false);
        orchestrator.run_once().unwrap();
        let summary = orchestrator.run_once().unwrap();
        assert_eq!(summary.file_count, 1);
    }
}
