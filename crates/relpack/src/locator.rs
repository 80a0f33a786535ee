use log::error;
use std::path::{Path, PathBuf};

/// Locates named runtime dependencies on disk.
///
/// Dependencies normally live flattened at `<root>/dependencies/<name>`, but
/// a package that used to be vendored inside a "container" package may still
/// sit nested under `<root>/dependencies/<container>/dependencies/<name>`.
/// Candidates are tried in that order and the first existing directory wins.
///
/// The existence check is injected so candidate search stays unit-testable
/// without a real file system.
pub struct PackageLocator {
    dependencies_root: PathBuf,
    exists: Box<dyn Fn(&Path) -> bool>,
}

impl std::fmt::Debug for PackageLocator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PackageLocator")
            .field("dependencies_root", &self.dependencies_root)
            .finish_non_exhaustive()
    }
}

impl PackageLocator {
    pub fn new(dependencies_root: PathBuf) -> Self {
        Self::with_exists_fn(dependencies_root, |path| path.is_dir())
    }

    pub fn with_exists_fn(
        dependencies_root: PathBuf,
        exists: impl Fn(&Path) -> bool + 'static,
    ) -> Self {
        Self {
            dependencies_root,
            exists: Box::new(exists),
        }
    }

    /// Return the first existing candidate directory for `name`, or `None`.
    ///
    /// A miss is diagnosed on the console naming every candidate searched:
    /// both paths when a container fallback is declared, just the flattened
    /// path otherwise. Callers treat a miss as "this dependency cannot be
    /// bundled" and proceed with a degraded configuration rather than
    /// halting the pipeline.
    pub fn locate(
        &self,
        name: &str,
        lib_path: &str,
        container: Option<&str>,
    ) -> Option<PathBuf> {
        let candidates = self.candidates(name, lib_path, container);

        if let Some(found) = candidates.iter().find(|path| (self.exists)(path)) {
            return Some(found.clone());
        }

        let searched = candidates
            .iter()
            .map(|path| path.display().to_string())
            .collect::<Vec<_>>()
            .join(" or ");
        error!("Unable to find {} dependency at {}", name, searched);
        None
    }

    /// Ordered candidate directories: flattened location first, then the
    /// container-nested fallback when a container is declared.
    fn candidates(&self, name: &str, lib_path: &str, container: Option<&str>) -> Vec<PathBuf> {
        let join_lib = |dir: PathBuf| {
            if lib_path.is_empty() {
                dir
            } else {
                dir.join(lib_path)
            }
        };

        let mut candidates = vec![join_lib(self.dependencies_root.join(name))];
        if let Some(container) = container {
            candidates.push(join_lib(
                self.dependencies_root
                    .join(container)
                    .join("dependencies")
                    .join(name),
            ));
        }
        candidates
    }
}
