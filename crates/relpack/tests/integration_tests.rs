use std::fs;
use std::path::Path;

use tempfile::TempDir;

use relpack::compile::{self, PassthroughCompiler};
use relpack::config::Config;
use relpack::pipeline;

const SHA_LOOSE: &str = "a1b2c3d4e5f6a7b8c9d0e1f2a3b4c5d6e7f8a9b0";
const SHA_PACKED: &str = "c3d4e5f6a7b8c9d0e1f2a3b4c5d6e7f8a9b0c1d2";

/// A minimal but complete project: three entry modules, one shared helper,
/// the public declaration file, project metadata, and one on-disk runtime
/// dependency. No repository files; tests add those as needed.
fn project_fixture() -> (TempDir, Config) {
    let temp = TempDir::new().unwrap();
    let config = Config {
        root: temp.path().to_path_buf(),
        ..Default::default()
    };

    let src = config.src_path();
    fs::create_dir_all(&src).unwrap();
    fs::write(
        src.join("monaco.contribution.js"),
        "require('vs/language/yaml/yamlMode');\nvar contribution = 1;\n",
    )
    .unwrap();
    fs::write(
        src.join("yamlMode.js"),
        "require('vs/language/yaml/languageFeatures');\nvar mode = 1;\n",
    )
    .unwrap();
    fs::write(src.join("languageFeatures.js"), "var features = 1;\n").unwrap();
    fs::write(src.join("yamlWorker.js"), "var worker = 1;\n").unwrap();
    fs::write(src.join("monaco.d.ts"), "declare namespace monaco {}\n").unwrap();

    fs::write(
        temp.path().join("package.json"),
        r#"{ "name": "monaco-yaml", "version": "0.4.1" }"#,
    )
    .unwrap();

    let js_yaml = config.dependencies_path().join("js-yaml/dist");
    fs::create_dir_all(&js_yaml).unwrap();
    fs::write(js_yaml.join("js-yaml.js"), "var jsyaml = {};\n").unwrap();

    (temp, config)
}

fn release(config: &Config) {
    compile::compile(config, &PassthroughCompiler, false).unwrap();
    pipeline::release(config).unwrap();
}

fn read(dir: &Path, name: &str) -> String {
    fs::read_to_string(dir.join(name)).unwrap()
}

#[test]
fn test_release_with_loose_ref_stamps_commit_identifier() {
    let (_temp, config) = project_fixture();
    let git = config.root.join(".git");
    fs::create_dir_all(git.join("refs/heads")).unwrap();
    fs::write(git.join("HEAD"), "ref: refs/heads/main\n").unwrap();
    fs::write(git.join("refs/heads/main"), format!("{SHA_LOOSE}\n")).unwrap();

    release(&config);

    let dev = config.dev_release_path();
    for artifact in ["monaco.contribution.js", "yamlMode.js", "yamlWorker.js"] {
        let contents = read(&dev, artifact);
        assert!(
            contents.contains(&format!("0.4.1({SHA_LOOSE})")),
            "{artifact} carries the resolved version"
        );
        assert!(contents.starts_with("/*!"));
    }
}

#[test]
fn test_release_with_packed_ref_stamps_commit_identifier() {
    let (_temp, config) = project_fixture();
    let git = config.root.join(".git");
    fs::create_dir_all(&git).unwrap();
    fs::write(git.join("HEAD"), "ref: refs/heads/main\n").unwrap();
    fs::write(
        git.join("packed-refs"),
        format!(
            "# pack-refs with: peeled fully-peeled sorted \n\
             {SHA_PACKED} refs/heads/main\n"
        ),
    )
    .unwrap();

    release(&config);

    let contents = read(&config.dev_release_path(), "yamlMode.js");
    assert!(contents.contains(&format!("0.4.1({SHA_PACKED})")));
}

#[test]
fn test_release_without_repository_stamps_unknown_and_still_completes() {
    let (_temp, config) = project_fixture();

    release(&config);

    let dev = config.dev_release_path();
    let min = config.min_release_path();
    for artifact in ["monaco.contribution.js", "yamlMode.js", "yamlWorker.js"] {
        assert!(read(&dev, artifact).contains("0.4.1(unknown)"));
        assert!(min.join(artifact).exists());
    }
}

#[test]
fn test_release_with_missing_dependency_degrades_but_completes() {
    let (_temp, config) = project_fixture();
    fs::remove_dir_all(config.dependencies_path()).unwrap();

    release(&config);

    let mode = read(&config.dev_release_path(), "yamlMode.js");
    assert!(!mode.contains("var jsyaml"));
    assert!(mode.contains("var mode = 1;"));
}

#[test]
fn test_contribution_bundle_excludes_the_mode_module() {
    let (_temp, config) = project_fixture();

    release(&config);

    let dev = config.dev_release_path();
    let contribution = read(&dev, "monaco.contribution.js");
    assert!(contribution.contains("var contribution = 1;"));
    assert!(!contribution.contains("var mode = 1;"));

    // The mode ships as its own artifact, helpers inlined before it
    let mode = read(&dev, "yamlMode.js");
    let features_at = mode.find("var features = 1;").unwrap();
    let mode_at = mode.find("var mode = 1;").unwrap();
    assert!(features_at < mode_at);
}

#[test]
fn test_resolved_dependencies_are_inlined() {
    let (_temp, config) = project_fixture();

    release(&config);

    let mode = read(&config.dev_release_path(), "yamlMode.js");
    assert_eq!(mode.matches("var jsyaml = {};").count(), 1);
}

#[test]
fn test_minified_artifacts_keep_only_the_banner_comment() {
    let (_temp, config) = project_fixture();
    fs::write(
        config.src_path().join("yamlWorker.js"),
        "// worker scaffolding\nvar worker = 1; /* inline */\n",
    )
    .unwrap();

    release(&config);

    let min = read(&config.min_release_path(), "yamlWorker.js");
    assert!(min.starts_with("/*!"));
    assert!(min.contains("var worker = 1;"));
    assert!(!min.contains("worker scaffolding"));
    assert!(!min.contains("/* inline */"));
}

#[test]
fn test_declaration_is_copied_into_the_minified_release() {
    let (_temp, config) = project_fixture();

    release(&config);

    assert_eq!(
        read(&config.min_release_path(), "monaco.d.ts"),
        "declare namespace monaco {}\n"
    );
}

#[test]
fn test_release_without_metadata_is_fatal() {
    let (_temp, config) = project_fixture();
    fs::remove_file(config.metadata_path()).unwrap();

    compile::compile(&config, &PassthroughCompiler, false).unwrap();
    assert!(pipeline::release(&config).is_err());
}

#[test]
fn test_release_without_declaration_is_fatal() {
    let (_temp, config) = project_fixture();
    fs::remove_file(config.declaration_path()).unwrap();

    compile::compile(&config, &PassthroughCompiler, false).unwrap();
    assert!(pipeline::release(&config).is_err());
}
