use anyhow::{Context, Result};
use log::{debug, info};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::config::Config;

/// Configuration object handed to the compiler stage: a verbosity flag plus
/// the project's full compiler option table, passed through opaquely.
#[derive(Debug, Clone)]
pub struct CompileOptions {
    pub verbose: bool,
    pub options: toml::Table,
}

impl CompileOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            verbose: config.verbose_compile,
            options: config.compiler_options.clone(),
        }
    }
}

/// Seam for the external module transpiler. The packaging pipeline only
/// requires that each source file maps to one compiled output text.
pub trait Compiler {
    fn compile(&self, source: &str, path: &Path, options: &CompileOptions) -> Result<String>;
}

/// Default stage: modules are shipped as written.
#[derive(Debug, Default)]
pub struct PassthroughCompiler;

impl Compiler for PassthroughCompiler {
    fn compile(&self, source: &str, path: &Path, options: &CompileOptions) -> Result<String> {
        if options.verbose {
            debug!("Compiling {:?}", path);
        }
        Ok(source.to_owned())
    }
}

/// Remove the compiled-output directory. A directory that is already absent
/// is not an error.
pub fn clean_out(config: &Config) -> Result<()> {
    remove_dir_if_present(&config.out_path())
}

/// Remove the release directory. A directory that is already absent is not
/// an error.
pub fn clean_release(config: &Config) -> Result<()> {
    remove_dir_if_present(&config.release_path())
}

fn remove_dir_if_present(dir: &Path) -> Result<()> {
    match fs::remove_dir_all(dir) {
        Ok(()) => {
            info!("Removed {:?}", dir);
            Ok(())
        }
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(err).with_context(|| format!("Failed to remove {:?}", dir)),
    }
}

/// Compile every source module under the source tree into the output
/// directory, preserving relative layout. In incremental mode, sources whose
/// compiled output is already newer are skipped. Any per-file failure aborts
/// the stage.
pub fn compile(config: &Config, compiler: &dyn Compiler, incremental: bool) -> Result<()> {
    let src_dir = config.src_path();
    let out_dir = config.out_path();
    let options = CompileOptions::from_config(config);

    if !src_dir.is_dir() {
        anyhow::bail!("Source tree not found at {:?}", src_dir);
    }

    let mut compiled = 0usize;
    let mut skipped = 0usize;

    for entry in WalkDir::new(&src_dir).follow_links(false) {
        let entry = entry.with_context(|| format!("Failed to walk source tree {:?}", src_dir))?;
        let path = entry.path();
        if !is_source_module(path) {
            continue;
        }

        let relative = path
            .strip_prefix(&src_dir)
            .expect("walked path is under the source tree");
        let target = out_dir.join(relative);

        if incremental && is_up_to_date(path, &target) {
            debug!("Up to date: {:?}", relative);
            skipped += 1;
            continue;
        }

        let source = fs::read_to_string(path)
            .with_context(|| format!("Failed to read source file: {:?}", path))?;
        let output = compiler
            .compile(&source, path, &options)
            .with_context(|| format!("Failed to compile {:?}", path))?;

        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create output directory {:?}", parent))?;
        }
        fs::write(&target, output)
            .with_context(|| format!("Failed to write compiled output: {:?}", target))?;
        compiled += 1;
    }

    info!(
        "Compiled {} module(s) into {:?} ({} up to date)",
        compiled, out_dir, skipped
    );
    Ok(())
}

fn is_source_module(path: &Path) -> bool {
    path.is_file()
        && path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("js"))
}

fn is_up_to_date(source: &Path, target: &Path) -> bool {
    let Ok(source_modified) = fs::metadata(source).and_then(|m| m.modified()) else {
        return false;
    };
    let Ok(target_modified) = fs::metadata(target).and_then(|m| m.modified()) else {
        return false;
    };
    target_modified >= source_modified
}

/// Collect modification times of every source module, keyed by path. The
/// watch command compares successive snapshots to decide when to recompile.
pub fn source_snapshot(config: &Config) -> Vec<(PathBuf, std::time::SystemTime)> {
    let mut snapshot = Vec::new();
    for entry in WalkDir::new(config.src_path())
        .follow_links(false)
        .into_iter()
        .filter_map(|e| e.ok())
    {
        let path = entry.path();
        if !is_source_module(path) {
            continue;
        }
        if let Ok(modified) = fs::metadata(path).and_then(|m| m.modified()) {
            snapshot.push((path.to_path_buf(), modified));
        }
    }
    snapshot.sort();
    snapshot
}
