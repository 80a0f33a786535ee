use anyhow::{Context, Result};
use indexmap::{IndexMap, IndexSet};
use log::{debug, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::locator::PackageLocator;
use crate::util::normalize_line_endings;

/// A named runtime dependency to be bundled.
///
/// `location` is `None` when the locator could not find the package on
/// disk; the entry stays in the list (the configuration is best-effort) but
/// contributes nothing to the output.
#[derive(Debug, Clone, PartialEq)]
pub struct PackageEntry {
    pub name: String,
    pub location: Option<PathBuf>,
    pub main: String,
}

/// The composed configuration for one output artifact. Constructed fresh
/// per artifact per pipeline run, never mutated afterwards, consumed exactly
/// once by the bundler.
#[derive(Debug, Clone)]
pub struct BundleSpec {
    /// Base resolution directory for module ids without an alias match
    pub base_dir: PathBuf,
    /// Fully-namespaced entry module id
    pub entry: String,
    /// Output file name, always `<entry id>.js`
    pub out_file: String,
    /// Module ids excluded from this bundle (bundled separately)
    pub exclude: Vec<String>,
    /// Logical namespace -> directory aliases
    pub path_aliases: IndexMap<String, PathBuf>,
    /// Ordered named-package entries; order is part of the contract
    pub packages: Vec<PackageEntry>,
}

/// An emitted file, prior to banner stamping and minification.
#[derive(Debug, Clone)]
pub struct Artifact {
    pub name: String,
    pub contents: String,
}

/// Builds bundler configurations with the fixed release policy: resolution
/// is rooted at the compiled-output directory, the logical namespace aliases
/// to that same directory, and the runtime package list is a fixed ordered
/// set resolved through the locator.
#[derive(Debug)]
pub struct BundleSpecBuilder<'a> {
    config: &'a Config,
    locator: &'a PackageLocator,
}

impl<'a> BundleSpecBuilder<'a> {
    pub fn new(config: &'a Config, locator: &'a PackageLocator) -> Self {
        Self { config, locator }
    }

    /// Compose the configuration for one entry module. Never fails outright:
    /// packages the locator cannot find are carried with an absent location.
    pub fn build(&self, entry_id: &str, exclude: &[&str]) -> BundleSpec {
        let out_dir = self.config.out_path();

        let mut path_aliases = IndexMap::new();
        path_aliases.insert(self.config.namespace.clone(), out_dir.clone());

        BundleSpec {
            base_dir: out_dir.clone(),
            entry: format!("{}/{}", self.config.namespace, entry_id),
            out_file: format!("{}.js", entry_id),
            exclude: exclude.iter().map(|id| (*id).to_owned()).collect(),
            path_aliases,
            packages: self.packages(&out_dir),
        }
    }

    /// The fixed, ordered runtime package set of the language service.
    fn packages(&self, out_dir: &Path) -> Vec<PackageEntry> {
        let compiled = |name: &str, dir: &str, main: &str| PackageEntry {
            name: name.to_owned(),
            location: Some(out_dir.join(dir)),
            main: main.to_owned(),
        };
        let external = |name: &str, lib: &str, container: Option<&str>, main: &str| PackageEntry {
            name: name.to_owned(),
            location: self.locator.locate(name, lib, container),
            main: main.to_owned(),
        };

        let uri = external("vscode-uri", "lib", Some("vscode-json-languageservice"), "index");

        vec![
            compiled("yaml-ast-parser", "yaml-ast-parser", "index"),
            external("js-yaml", "dist", None, "js-yaml"),
            external("vscode-json-languageservice", "", None, "jsonLanguageService"),
            external("vscode-languageserver-types", "lib", None, "main"),
            uri.clone(),
            external("jsonc-parser", "lib", Some("vscode-json-languageservice"), "main"),
            // vscode-uri is listed twice; the duplicate is kept deliberately
            // to preserve entry order
            uri,
            compiled("vscode-nls", "fillers", "vscode-nls"),
            compiled("os", "fillers", "os"),
        ]
    }
}

/// Quoted strings inside module source; candidates for module references.
static QUOTED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"["']([A-Za-z0-9_$.\-/]+)["']"#).expect("quoted pattern is valid"));

/// Produce one self-contained artifact from a bundle configuration.
///
/// Resolved packages are inlined first in declared order (deduplicated by
/// resolved main file, so the duplicated configuration entry does not double
/// its content), then every project-namespace module reachable from the
/// entry, dependencies before dependents, entry last. Excluded modules are
/// neither inlined nor traversed.
pub fn bundle(spec: &BundleSpec) -> Result<Artifact> {
    let mut contents = String::new();

    let mut inlined_mains = IndexSet::new();
    for package in &spec.packages {
        let Some(location) = &package.location else {
            continue;
        };
        let main = location.join(format!("{}.js", package.main));
        if !inlined_mains.insert(main.clone()) {
            continue;
        }
        match fs::read_to_string(&main) {
            Ok(text) => {
                debug!("Inlining package {} from {:?}", package.name, main);
                push_module(&mut contents, &package.name, &text);
            }
            Err(err) => {
                warn!(
                    "Skipping package {}: cannot read {:?}: {}",
                    package.name, main, err
                );
            }
        }
    }

    inline_project_modules(spec, &mut contents)?;

    Ok(Artifact {
        name: spec.out_file.clone(),
        contents: normalize_line_endings(contents),
    })
}

/// Depth-first, post-order inlining of namespace modules starting at the
/// entry: each module's references are inlined before the module itself, the
/// entry module comes last. Excluded ids are pruned from the traversal.
fn inline_project_modules(spec: &BundleSpec, contents: &mut String) -> Result<()> {
    let mut visited: IndexSet<String> = IndexSet::new();
    let mut stack: Vec<(String, bool)> = vec![(spec.entry.clone(), false)];

    while let Some((id, expanded)) = stack.pop() {
        if expanded {
            let path = resolve_module_path(spec, &id);
            let is_entry = id == spec.entry;
            match fs::read_to_string(&path) {
                Ok(text) => push_module(contents, &id, &text),
                Err(err) if is_entry => {
                    return Err(err)
                        .with_context(|| format!("Failed to read entry module: {:?}", path));
                }
                Err(err) => {
                    warn!("Skipping module {}: cannot read {:?}: {}", id, path, err);
                }
            }
            continue;
        }

        // `visited` doubles as cycle protection: a module is expanded once
        if !visited.insert(id.clone()) || spec.exclude.iter().any(|ex| *ex == id) {
            continue;
        }

        let path = resolve_module_path(spec, &id);
        let references = match fs::read_to_string(&path) {
            Ok(text) => module_references(spec, &text),
            Err(_) => Vec::new(),
        };

        stack.push((id, true));
        // Reversed so references emit in their declared order
        for reference in references.into_iter().rev() {
            if !visited.contains(&reference) && !spec.exclude.iter().any(|ex| *ex == reference) {
                stack.push((reference, false));
            }
        }
    }

    Ok(())
}

/// Map a namespaced module id onto the compiled-output file system through
/// the path-alias table, falling back to the base resolution directory.
fn resolve_module_path(spec: &BundleSpec, id: &str) -> PathBuf {
    for (alias, dir) in &spec.path_aliases {
        if let Some(rest) = id.strip_prefix(&format!("{}/", alias)) {
            return dir.join(format!("{}.js", rest));
        }
        if id == alias {
            return dir.clone();
        }
    }
    spec.base_dir.join(format!("{}.js", id))
}

/// Extract project-namespace module ids referenced from module text.
fn module_references(spec: &BundleSpec, text: &str) -> Vec<String> {
    let mut references = Vec::new();
    for captures in QUOTED.captures_iter(text) {
        let Some(id) = captures.get(1) else { continue };
        let id = id.as_str();
        let in_namespace = spec
            .path_aliases
            .keys()
            .any(|alias| id.starts_with(&format!("{}/", alias)));
        if in_namespace && !references.iter().any(|r| r == id) {
            references.push(id.to_owned());
        }
    }
    references
}

fn push_module(contents: &mut String, id: &str, text: &str) {
    contents.push_str(&format!("// module {}\n", id));
    contents.push_str(text);
    if !text.ends_with('\n') {
        contents.push('\n');
    }
}
