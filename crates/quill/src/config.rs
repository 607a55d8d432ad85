//! Configuration loading: `quill.json` merged with command-line flags.

use crate::cli::Args;
use camino::{Utf8Path, Utf8PathBuf};
use globset::{Glob, GlobSet, GlobSetBuilder};
use miette::{miette, IntoDiagnostic, Result, WrapErr};
use quill_compiler::EnvironmentOptions;
use serde::Deserialize;
use tracing::debug;

pub const CONFIG_FILE: &str = "quill.json";

const DEFAULT_INCLUDE: &[&str] = &["**/*.tpl", "**/*.html"];
const DEFAULT_EXCLUDE: &[&str] = &["**/node_modules/**", "**/.git/**"];

/// Contents of `quill.json`. Environment options sit at the top level.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConfigFile {
    #[serde(flatten)]
    pub environment: EnvironmentOptions,
    pub include: Option<Vec<String>>,
    pub exclude: Vec<String>,
    /// Output directory, relative to the config file.
    pub out_dir: Option<Utf8PathBuf>,
    /// Appended to each template path to name its output file.
    pub extension: Option<String>,
}

impl ConfigFile {
    pub fn load(path: &Utf8Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .into_diagnostic()
            .wrap_err_with(|| format!("Failed to read {}", path))?;
        serde_json::from_str(&text)
            .into_diagnostic()
            .wrap_err_with(|| format!("Invalid configuration in {}", path))
    }

    /// The nearest `quill.json` in `start` or one of its ancestors.
    pub fn find(start: &Utf8Path) -> Option<Utf8PathBuf> {
        start
            .ancestors()
            .map(|dir| dir.join(CONFIG_FILE))
            .find(|candidate| candidate.is_file())
    }
}

/// Resolved settings for one run.
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory templates are discovered in; template names are relative
    /// to it.
    pub root: Utf8PathBuf,
    pub config_path: Option<Utf8PathBuf>,
    pub environment: EnvironmentOptions,
    pub out_dir: Utf8PathBuf,
    pub extension: String,
    include: GlobSet,
    exclude: GlobSet,
}

impl Config {
    pub fn load(args: &Args) -> Result<Self> {
        let root = match &args.input {
            Some(input) => utf8(input.clone())?,
            None => utf8(std::env::current_dir().into_diagnostic()?)?,
        };
        let root = root
            .canonicalize_utf8()
            .into_diagnostic()
            .wrap_err_with(|| format!("Cannot open input directory {}", root))?;

        let config_path = match &args.config {
            Some(path) => Some(utf8(path.clone())?),
            None => ConfigFile::find(&root),
        };
        let file = match &config_path {
            Some(path) => ConfigFile::load(path)?,
            None => ConfigFile::default(),
        };
        debug!(config = ?config_path, "configuration");

        Self::resolve(root, config_path, file, args)
    }

    /// Merge a parsed config file with flags; flags win.
    pub fn resolve(
        root: Utf8PathBuf,
        config_path: Option<Utf8PathBuf>,
        file: ConfigFile,
        args: &Args,
    ) -> Result<Self> {
        let mut environment = file.environment;
        if let Some(mode) = args.autofilter {
            environment.autofilter = mode;
        }

        let base = config_path
            .as_deref()
            .and_then(Utf8Path::parent)
            .map_or_else(|| root.clone(), Utf8Path::to_path_buf);
        let out_dir = match (&args.out, file.out_dir) {
            (Some(out), _) => utf8(out.clone())?,
            (None, Some(dir)) => base.join(dir),
            (None, None) => root.clone(),
        };

        let include = match file.include {
            Some(patterns) => glob_set(patterns.iter().map(String::as_str))?,
            None => glob_set(DEFAULT_INCLUDE.iter().copied())?,
        };
        let exclude = glob_set(
            DEFAULT_EXCLUDE
                .iter()
                .copied()
                .chain(file.exclude.iter().map(String::as_str))
                .chain(args.ignore.iter().map(String::as_str)),
        )?;

        Ok(Self {
            root,
            config_path,
            environment,
            out_dir,
            extension: file.extension.unwrap_or_else(|| ".js".to_string()),
            include,
            exclude,
        })
    }

    /// Whether a path relative to the root names a template to compile.
    pub fn should_process(&self, relative: &Utf8Path) -> bool {
        self.include.is_match(relative) && !self.exclude.is_match(relative)
    }

    /// Where the compiled form of a template is written.
    pub fn output_path(&self, relative: &Utf8Path) -> Utf8PathBuf {
        self.out_dir
            .join(format!("{}{}", relative, self.extension))
    }
}

fn glob_set<'a>(patterns: impl IntoIterator<Item = &'a str>) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = Glob::new(pattern)
            .into_diagnostic()
            .wrap_err_with(|| format!("Invalid glob pattern \"{}\"", pattern))?;
        builder.add(glob);
    }
    builder.build().into_diagnostic()
}

fn utf8(path: std::path::PathBuf) -> Result<Utf8PathBuf> {
    Utf8PathBuf::from_path_buf(path)
        .map_err(|path| miette!("Path is not valid UTF-8: {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use quill_compiler::AutofilterMode;

    fn temp_root() -> (tempfile::TempDir, Utf8PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
        (dir, root)
    }

    #[test]
    fn test_find_walks_upwards() {
        let (_dir, root) = temp_root();
        let nested = root.join("a/b");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(root.join(CONFIG_FILE), "{}").unwrap();
        assert_eq!(ConfigFile::find(&nested), Some(root.join(CONFIG_FILE)));
    }

    #[test]
    fn test_config_file_fields() {
        let file: ConfigFile = serde_json::from_str(
            r#"{
                "autofilter": "off",
                "closingTagPrefix": "/",
                "classPrefix": "View",
                "include": ["**/*.qtpl"],
                "exclude": ["drafts/**"],
                "outDir": "build",
                "extension": ".mjs"
            }"#,
        )
        .unwrap();
        assert_eq!(file.environment.autofilter, AutofilterMode::Off);
        assert_eq!(file.environment.lexer.closing_tag_prefix, "/");
        assert_eq!(file.environment.class_prefix, "View");
        assert_eq!(file.environment.max_nesting, 64);
        assert_eq!(file.include, Some(vec!["**/*.qtpl".to_string()]));
        assert_eq!(file.out_dir, Some(Utf8PathBuf::from("build")));
    }

    #[test]
    fn test_defaults() {
        let (_dir, root) = temp_root();
        let config = Config::resolve(root.clone(), None, ConfigFile::default(), &Args::default())
            .unwrap();
        assert!(config.should_process(Utf8Path::new("pages/index.html")));
        assert!(config.should_process(Utf8Path::new("mail.tpl")));
        assert!(!config.should_process(Utf8Path::new("app.js")));
        assert!(!config.should_process(Utf8Path::new("node_modules/x/page.html")));
        assert_eq!(
            config.output_path(Utf8Path::new("pages/index.html")),
            root.join("pages/index.html.js")
        );
    }

    #[test]
    fn test_flags_override_file() {
        let (_dir, root) = temp_root();
        let file: ConfigFile =
            serde_json::from_str(r#"{"autofilter": "on", "outDir": "build"}"#).unwrap();
        let args = Args {
            out: Some(root.join("dist").into_std_path_buf()),
            autofilter: Some(AutofilterMode::Off),
            ignore: vec!["**/drafts/**".to_string()],
            ..Args::default()
        };
        let config = Config::resolve(root.clone(), None, file, &args).unwrap();
        assert_eq!(config.environment.autofilter, AutofilterMode::Off);
        assert_eq!(config.out_dir, root.join("dist"));
        assert!(!config.should_process(Utf8Path::new("drafts/page.html")));
    }

    #[test]
    fn test_out_dir_is_relative_to_config() {
        let (_dir, root) = temp_root();
        let file: ConfigFile = serde_json::from_str(r#"{"outDir": "build"}"#).unwrap();
        let config_path = Some(root.join(CONFIG_FILE));
        let config =
            Config::resolve(root.join("templates"), config_path, file, &Args::default()).unwrap();
        assert_eq!(config.out_dir, root.join("build"));
    }

    #[test]
    fn test_invalid_glob() {
        let (_dir, root) = temp_root();
        let file: ConfigFile = serde_json::from_str(r#"{"include": ["a/[b"]}"#).unwrap();
        assert!(Config::resolve(root, None, file, &Args::default()).is_err());
    }
}
