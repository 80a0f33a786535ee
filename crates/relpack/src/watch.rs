use anyhow::Result;
use log::{error, info};
use std::path::PathBuf;
use std::time::{Duration, SystemTime};

use crate::compile::{self, PassthroughCompiler, source_snapshot};
use crate::config::Config;

type Snapshot = Vec<(PathBuf, SystemTime)>;

/// Poll the source tree and re-run the incremental compile whenever a module
/// changes. A full compile is expected to have run already (the watch
/// command declares it as a prerequisite). Runs until interrupted.
pub fn watch(config: &Config, poll_interval: Duration) -> Result<()> {
    let mut snapshot = source_snapshot(config);
    info!(
        "Watching {:?} ({} module(s))",
        config.src_path(),
        snapshot.len()
    );

    loop {
        std::thread::sleep(poll_interval);
        poll_once(config, &mut snapshot);
    }
}

/// One polling round: recompile when the snapshot changed. Compile errors
/// are reported and the watch keeps running; the next save gets another
/// chance.
fn poll_once(config: &Config, snapshot: &mut Snapshot) -> bool {
    let current = source_snapshot(config);
    if current == *snapshot {
        return false;
    }

    info!("Source change detected, recompiling");
    if let Err(err) = compile::compile(config, &PassthroughCompiler, true) {
        error!("Recompile failed: {:#}", err);
    }
    *snapshot = current;
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_poll_detects_changes_and_recompiles() {
        let temp = TempDir::new().unwrap();
        let config = Config {
            root: temp.path().to_path_buf(),
            ..Default::default()
        };
        fs::create_dir_all(config.src_path()).unwrap();
        fs::write(config.src_path().join("a.js"), "var a = 1;\n").unwrap();

        let mut snapshot = source_snapshot(&config);
        assert!(!poll_once(&config, &mut snapshot));

        fs::write(config.src_path().join("b.js"), "var b = 2;\n").unwrap();
        assert!(poll_once(&config, &mut snapshot));
        assert!(config.out_path().join("b.js").exists());

        // Snapshot was advanced; no further change is reported
        assert!(!poll_once(&config, &mut snapshot));
    }
}
