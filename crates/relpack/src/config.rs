use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

use crate::combine::Combine;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Project root; every other path is resolved relative to it
    pub root: PathBuf,

    /// Source tree consumed by the compiler stage
    pub src_dir: PathBuf,

    /// Compiled-output directory, produced by the compiler and read by the bundler
    pub out_dir: PathBuf,

    /// Release directory; `dev/` and `min/` variants are written beneath it
    pub release_dir: PathBuf,

    /// Logical module namespace; intra-project references resolve through a
    /// path alias from this namespace to the compiled-output directory
    pub namespace: String,

    /// Entry module registering the language contribution
    pub contribution_entry: String,

    /// Entry module implementing the editing mode
    pub mode_entry: String,

    /// Entry module running the background worker
    pub worker_entry: String,

    /// Public type-declaration file copied verbatim into the minified release
    pub declaration: PathBuf,

    /// Project metadata file exposing the declared semantic version
    pub metadata: PathBuf,

    /// Verbosity flag forwarded to the compiler stage
    pub verbose_compile: bool,

    /// Compiler options forwarded to the compiler stage as an opaque table
    #[serde(rename = "compiler-options")]
    pub compiler_options: toml::Table,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            src_dir: PathBuf::from("src"),
            out_dir: PathBuf::from("out"),
            release_dir: PathBuf::from("release"),
            namespace: "vs/language/yaml".to_owned(),
            contribution_entry: "monaco.contribution".to_owned(),
            mode_entry: "yamlMode".to_owned(),
            worker_entry: "yamlWorker".to_owned(),
            declaration: PathBuf::from("src/monaco.d.ts"),
            metadata: PathBuf::from("package.json"),
            verbose_compile: false,
            compiler_options: toml::Table::new(),
        }
    }
}

impl Combine for Config {
    fn combine(self, other: Self) -> Self {
        let defaults = Self::default();
        macro_rules! pick {
            ($field:ident) => {
                if self.$field != defaults.$field {
                    self.$field
                } else {
                    other.$field
                }
            };
        }
        Self {
            root: pick!(root),
            src_dir: pick!(src_dir),
            out_dir: pick!(out_dir),
            release_dir: pick!(release_dir),
            namespace: pick!(namespace),
            contribution_entry: pick!(contribution_entry),
            mode_entry: pick!(mode_entry),
            worker_entry: pick!(worker_entry),
            declaration: pick!(declaration),
            metadata: pick!(metadata),
            verbose_compile: self.verbose_compile || other.verbose_compile,
            compiler_options: if self.compiler_options.is_empty() {
                other.compiler_options
            } else {
                self.compiler_options
            },
        }
    }
}

impl Config {
    /// Absolute-ish path helpers, all rooted at `self.root`.
    pub fn src_path(&self) -> PathBuf {
        self.root.join(&self.src_dir)
    }

    pub fn out_path(&self) -> PathBuf {
        self.root.join(&self.out_dir)
    }

    pub fn release_path(&self) -> PathBuf {
        self.root.join(&self.release_dir)
    }

    pub fn dev_release_path(&self) -> PathBuf {
        self.release_path().join("dev")
    }

    pub fn min_release_path(&self) -> PathBuf {
        self.release_path().join("min")
    }

    /// Root of the on-disk third-party dependency layout.
    pub fn dependencies_path(&self) -> PathBuf {
        self.root.join("dependencies")
    }

    pub fn declaration_path(&self) -> PathBuf {
        self.root.join(&self.declaration)
    }

    pub fn metadata_path(&self) -> PathBuf {
        self.root.join(&self.metadata)
    }

    /// Read and parse one configuration file.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read configuration: {:?}", path))?;
        toml::from_str(&content)
            .with_context(|| format!("Malformed configuration: {:?}", path))
    }

    /// Load the effective configuration. The tool always runs against one
    /// project, so there are exactly three layers: an explicit `--config`
    /// file beats `RELPACK_*` environment variables, which beat a
    /// `relpack.toml` next to the project being packaged. Defaults fill
    /// whatever the layers leave unset.
    pub fn load(cli_config_path: Option<&Path>) -> Result<Self> {
        Self::load_layered(Path::new("."), cli_config_path)
    }

    fn load_layered(project_dir: &Path, cli_config_path: Option<&Path>) -> Result<Self> {
        let mut config = Self::default();

        let project_file = project_dir.join("relpack.toml");
        if project_file.is_file() {
            log::debug!("Using project configuration {:?}", project_file);
            config = Self::load_from_file(&project_file)?.combine(config);
        }

        config = EnvConfig::from_env().apply_to(config);

        if let Some(path) = cli_config_path {
            log::debug!("Using configuration override {:?}", path);
            config = Self::load_from_file(path)?.combine(config);
        }

        Ok(config)
    }
}

/// Configuration values from environment variables with RELPACK_ prefix
#[derive(Debug, Clone, Default)]
pub struct EnvConfig {
    pub root: Option<PathBuf>,
    pub src_dir: Option<PathBuf>,
    pub out_dir: Option<PathBuf>,
    pub release_dir: Option<PathBuf>,
    pub namespace: Option<String>,
    pub verbose_compile: Option<bool>,
}

impl EnvConfig {
    /// Load configuration from environment variables with RELPACK_ prefix
    pub fn from_env() -> Self {
        let path_var = |name: &str| env::var(name).ok().map(PathBuf::from);

        Self {
            root: path_var("RELPACK_ROOT"),
            src_dir: path_var("RELPACK_SRC_DIR"),
            out_dir: path_var("RELPACK_OUT_DIR"),
            release_dir: path_var("RELPACK_RELEASE_DIR"),
            namespace: env::var("RELPACK_NAMESPACE").ok(),
            verbose_compile: env::var("RELPACK_VERBOSE_COMPILE")
                .ok()
                .and_then(|v| parse_bool(&v)),
        }
    }

    /// Apply environment config to base config
    pub fn apply_to(self, mut config: Config) -> Config {
        if let Some(root) = self.root {
            config.root = root;
        }
        if let Some(src_dir) = self.src_dir {
            config.src_dir = src_dir;
        }
        if let Some(out_dir) = self.out_dir {
            config.out_dir = out_dir;
        }
        if let Some(release_dir) = self.release_dir {
            config.release_dir = release_dir;
        }
        if let Some(namespace) = self.namespace {
            config.namespace = namespace;
        }
        if let Some(verbose_compile) = self.verbose_compile {
            config.verbose_compile = verbose_compile;
        }
        config
    }
}

/// Parse a boolean value from string, supporting various common formats
fn parse_bool(value: &str) -> Option<bool> {
    match value.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}
