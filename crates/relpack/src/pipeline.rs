use anyhow::{Context, Result};
use log::{debug, info};
use std::fs;
use std::path::Path;

use crate::banner;
use crate::bundle::{self, Artifact, BundleSpecBuilder};
use crate::config::Config;
use crate::git;
use crate::locator::PackageLocator;
use crate::metadata::ProjectMetadata;
use crate::minify::{CommentPolicy, minify};

/// Task entry point for the bundling half of the release. Cleaning and
/// compiling run beforehand as task-graph prerequisites.
pub fn release(config: &Config) -> Result<()> {
    ReleasePipeline::new(config).run()
}

/// Orchestrates bundling, banner stamping and artifact emission.
///
/// The compiled-output directory must be fully written before this runs; the
/// task graph guarantees that ordering. Dependency-resolution misses degrade
/// individual bundles (§ locator); everything else here is fatal.
#[derive(Debug)]
pub struct ReleasePipeline<'a> {
    config: &'a Config,
}

impl<'a> ReleasePipeline<'a> {
    pub fn new(config: &'a Config) -> Self {
        Self { config }
    }

    pub fn run(&self) -> Result<()> {
        let metadata = ProjectMetadata::load(&self.config.metadata_path())?;
        let commit = git::resolve_head(&self.config.root);
        if commit.is_none() {
            debug!("Repository head could not be resolved; stamping unknown version");
        }
        let banner = banner::compose(&metadata.name, &metadata.version, commit.as_deref());

        // Fan-in: each artifact stays a discrete named entry
        let artifacts = self.bundle_all()?;

        let dev_dir = self.config.dev_release_path();
        let min_dir = self.config.min_release_path();
        fs::create_dir_all(&dev_dir)
            .with_context(|| format!("Failed to create {:?}", dev_dir))?;
        fs::create_dir_all(&min_dir)
            .with_context(|| format!("Failed to create {:?}", min_dir))?;

        for artifact in &artifacts {
            let stamped = banner::prepend(&banner, &artifact.contents);
            write_artifact(&dev_dir, &artifact.name, &stamped)?;

            let minified = minify(&stamped, CommentPolicy::Important);
            write_artifact(&min_dir, &artifact.name, &minified)?;
        }

        self.copy_declaration(&min_dir)?;

        info!(
            "Release complete: {} artifact(s) in {:?}",
            artifacts.len(),
            self.config.release_path()
        );
        Ok(())
    }

    /// Build and bundle the three entry modules. The contribution bundle
    /// excludes the mode module, which ships as its own artifact; the other
    /// two carry no exclusions.
    fn bundle_all(&self) -> Result<Vec<Artifact>> {
        let locator = PackageLocator::new(self.config.dependencies_path());
        let builder = BundleSpecBuilder::new(self.config, &locator);

        let mode_id = format!("{}/{}", self.config.namespace, self.config.mode_entry);
        let specs = [
            builder.build(&self.config.contribution_entry, &[mode_id.as_str()]),
            builder.build(&self.config.mode_entry, &[]),
            builder.build(&self.config.worker_entry, &[]),
        ];

        specs.iter().map(bundle::bundle).collect()
    }

    /// Copy the public type-declaration file into the minified release
    /// directory. Unrelated to bundling; runs unconditionally.
    fn copy_declaration(&self, min_dir: &Path) -> Result<()> {
        let declaration = self.config.declaration_path();
        let file_name = declaration
            .file_name()
            .with_context(|| format!("Declaration path has no file name: {:?}", declaration))?;
        let target = min_dir.join(file_name);
        fs::copy(&declaration, &target).with_context(|| {
            format!("Failed to copy declaration {:?} to {:?}", declaration, target)
        })?;
        debug!("Copied declaration to {:?}", target);
        Ok(())
    }
}

fn write_artifact(dir: &Path, name: &str, contents: &str) -> Result<()> {
    let path = dir.join(name);
    fs::write(&path, contents).with_context(|| format!("Failed to write artifact: {:?}", path))
}
